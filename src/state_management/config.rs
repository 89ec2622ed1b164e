use dioxus::prelude::*;

pub const SIMULATOR_LATENCY_ENV: &str = "INFRA_CONSOLE_SIMULATOR_LATENCY_MS";
pub const ALERT_TIMEOUT_ENV: &str = "INFRA_CONSOLE_ALERT_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Artificial delay of every simulator answer
    pub simulator_latency_ms: u64,
    /// Time before an alert closes itself
    pub alert_timeout_ms: u64,
}
impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            simulator_latency_ms: 150,
            alert_timeout_ms: 5000,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from the variables returned by `lookup`, keeping the
    /// default for any absent or invalid value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read_ms = |name: &str, default: u64| match lookup(name) {
            Some(value) => value.trim().parse().unwrap_or_else(|e| {
                log::warn!("Ignoring {name}={value:?} ({e}), using {default}");
                default
            }),
            None => default,
        };
        config.simulator_latency_ms = read_ms(SIMULATOR_LATENCY_ENV, config.simulator_latency_ms);
        config.alert_timeout_ms = read_ms(ALERT_TIMEOUT_ENV, config.alert_timeout_ms);
        config
    }
}

pub static CONSOLE_CONFIG: GlobalSignal<ConsoleConfig> = Signal::global(ConsoleConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(ConsoleConfig::from_lookup(lookup(&[])), ConsoleConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            (SIMULATOR_LATENCY_ENV, "0"),
            (ALERT_TIMEOUT_ENV, " 2500 "),
        ]));
        assert_eq!(
            config,
            ConsoleConfig {
                simulator_latency_ms: 0,
                alert_timeout_ms: 2500,
            }
        );
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = ConsoleConfig::from_lookup(lookup(&[(SIMULATOR_LATENCY_ENV, "fast")]));
        assert_eq!(config.simulator_latency_ms, 150);
    }
}
