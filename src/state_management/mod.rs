mod config;
mod loaders;
mod simulator;

use std::sync::Arc;

use dioxus::prelude::*;

use crate::components::alerts::AlertNotificationSink;
use crate::context_loader::{ContextStore, LoaderContext, LoaderRegistry};

pub use loaders::create_ssh_key;
pub use simulator::{InfrastructureSimulator, SimulatorError};

/// Starts the context store service, registers the loaders and provides the
/// [`LoaderContext`] to the whole component tree
pub fn use_init_services() -> LoaderContext {
    log::debug!("init_services - start");
    let api = use_context_provider(|| {
        let config = config::CONSOLE_CONFIG.peek().clone();
        log::info!("init_services - {config:?}");
        InfrastructureSimulator::new(config.simulator_latency_ms)
    });
    let context = use_context_provider(move || {
        let (store, service) = ContextStore::new();
        spawn_forever(service.run());

        let registry = LoaderRegistry::new();
        loaders::register_infrastructure_loaders(&registry, api);
        LoaderContext::new(registry, store).with_notifications(Arc::new(AlertNotificationSink))
    });
    log::debug!("init_services - finished");
    context
}

pub fn use_loader_context() -> LoaderContext {
    use_context()
}

pub fn use_infrastructure_api() -> InfrastructureSimulator {
    use_context()
}

pub mod prelude {
    pub use super::config::ConsoleConfig;

    pub mod state_management {
        pub use super::super::config::CONSOLE_CONFIG;
        pub use super::super::loaders::{
            CHARTS_LOADER_KEY, FLAVORS_LOADER_KEY, HOSTS_LOADER_KEY, NODES_LOADER_KEY,
            SSH_KEYS_LOADER_KEY, TENANTS_LOADER_KEY, VOLUMES_LOADER_KEY,
            VOLUME_SNAPSHOTS_LOADER_KEY, VOLUME_TYPES_LOADER_KEY,
        };
        pub use crate::context_loader::CLUSTERS_LOADER_KEY;
        pub use super::super::{create_ssh_key, use_infrastructure_api, use_loader_context};
    }
}
