#![allow(unused)]

use crate::prelude::*;

use uuid::Uuid;

use std::collections::VecDeque;
use std::time::Duration;

use crate::context_loader::{NotificationLevel, NotificationSink};
use crate::utils::CCStr;

static ALERTS: GlobalSignal<VecDeque<Alert>> = Signal::global(|| VecDeque::new());

/// Maximum number of alerts to display at once
const MAX_ALERTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertClass {
    Success,
    Warn,
    Error,
    Info,
}
impl core::fmt::Display for AlertClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "alert-success",
            Self::Warn => "alert-warning",
            Self::Error => "alert-error",
            Self::Info => "alert-info",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    uuid: Uuid,
    alert_class: AlertClass,
    title: CCStr,
    message: CCStr,
    timeout_ms: u64,
}
impl Alert {
    pub fn custom(
        alert_class: AlertClass,
        title: impl Into<CCStr>,
        message: impl Into<CCStr>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            alert_class,
            title: title.into(),
            message: message.into(),
            timeout_ms,
        }
    }

    fn with_default_timeout(alert_class: AlertClass, title: &str, message: impl Into<CCStr>) -> Self {
        let timeout_ms = state_management::CONSOLE_CONFIG.peek().alert_timeout_ms;
        Self::custom(alert_class, title, message, timeout_ms)
    }

    pub fn success(message: impl Into<CCStr>) -> Self {
        Self::with_default_timeout(AlertClass::Success, "Success", message)
    }
    pub fn warn(message: impl Into<CCStr>) -> Self {
        Self::with_default_timeout(AlertClass::Warn, "Warning", message)
    }
    pub fn error(message: impl Into<CCStr>) -> Self {
        Self::with_default_timeout(AlertClass::Error, "Error", message)
    }
    pub fn info(message: impl Into<CCStr>) -> Self {
        Self::with_default_timeout(AlertClass::Info, "Info", message)
    }
}

/// Appends `alert`, dropping the oldest ones beyond [`MAX_ALERTS`]
fn push_bounded(alerts: &mut VecDeque<Alert>, alert: Alert) {
    while alerts.len() >= MAX_ALERTS {
        alerts.pop_front();
    }
    alerts.push_back(alert);
}

pub fn add_alert(alert: Alert) {
    push_bounded(&mut ALERTS.write(), alert);
}

pub fn alert_success(message: impl Into<CCStr>) {
    add_alert(Alert::success(message));
}

pub fn alert_error(message: impl Into<CCStr>) {
    add_alert(Alert::error(message));
}

pub fn alert_warn(message: impl Into<CCStr>) {
    add_alert(Alert::warn(message));
}

pub fn alert_info(message: impl Into<CCStr>) {
    add_alert(Alert::info(message));
}

/// Shows loader notices as alerts
///
/// Must only be notified from tasks running on the UI thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertNotificationSink;
impl NotificationSink for AlertNotificationSink {
    fn notify(&self, message: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Info => alert_info(message),
            NotificationLevel::Error => alert_error(message),
        }
    }
}

#[component]
pub fn AlertsContainer() -> Element {
    rsx! {
        div { class: "fixed z-50 top-2 w-[90%] left-[5%] md:w-[60%] md:left-[20%] lg:w-1/2 lg:left-1/4",
            for alert in ALERTS().iter() {
                AlertDisplay { key: "{alert.uuid}", alert: alert.clone() }
            }
        }
    }
}

#[component]
pub fn AlertDisplay(alert: Alert) -> Element {
    log::debug!("AlertDisplay Rendered: {alert:?}");
    fn close_alert(uuid: Uuid) {
        ALERTS.write().retain(|a| a.uuid != uuid);
    }

    // Set up auto-dismiss
    spawn(async move {
        log::debug!("Countdown to close alert: {}", alert.uuid);
        tokio::time::sleep(Duration::from_millis(alert.timeout_ms)).await;
        log::debug!("Closing alert: {}", alert.uuid);
        close_alert(alert.uuid);
    });

    use_drop(move || log::debug!("AlertDisplay Dropped: {}", alert.uuid));

    rsx! {
        div {
            role: "alert",
            class: "alert p-1 rounded-xl mb-1 gap-1 md:gap-4 {alert.alert_class}",
            b { class: "text-sm", "{alert.title}" }
            span { class: "text-xs", "{alert.message}" }
            button {
                class: "btn btn-circle btn-outline btn-xs",
                onclick: move |_| close_alert(alert.uuid),
                "✕"
            }
        }
    }
}
