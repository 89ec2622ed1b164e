#![windows_subsystem = "windows"]
mod components;
mod context_loader;
mod helper_hooks;
mod state_management;
mod utils;
mod views;

mod prelude {
    pub use super::components::alerts::{alert_error, alert_success, alert_warn};
    pub use super::helper_hooks::prelude::*;
    pub use super::state_management::prelude::*;
    pub use dioxus::prelude::*;
}

use serde::{Deserialize, Serialize};

use components::alerts::AlertsContainer;
use prelude::*;

use utils::CCStr;
use views::{
    clusters::{ClusterListView, ClusterNodesView},
    inventory::{ChartListView, FlavorListView, HostListView, SshKeyListView, TenantListView},
    main_layout::MainLayout,
    ssh_key_create::SshKeyCreateView,
    storage::StorageView,
};

#[derive(Clone, Routable, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rustfmt::skip]
pub enum Route {
    #[layout(MainLayout)]
        #[route("/")]
        HostListView {},
        #[nest("/clusters")]
            #[route("/")]
            ClusterListView {},
            #[route("/:cluster_id/nodes")]
            ClusterNodesView { cluster_id: CCStr },
        #[end_nest]
        #[route("/storage")]
        StorageView {},
        #[route("/charts")]
        ChartListView {},
        #[route("/tenants")]
        TenantListView {},
        #[route("/flavors")]
        FlavorListView {},
        #[nest("/ssh-keys")]
            #[route("/")]
            SshKeyListView {},
            #[route("/add")]
            SshKeyCreateView {},
        #[end_nest]
    #[end_layout]
    #[route("/:..route")]
    PageNotFound { route: Vec<String> },
}

static TITLE: &'static str = "Infrastructure Console";

#[allow(non_snake_case)]
fn App() -> Element {
    log::debug!("App reload");

    _ = crate::state_management::use_init_services();

    use_drop(|| log::debug!("App Dropped"));

    rsx! {
        document::Title { "{TITLE}" }

        div { id: "app", class: "text-base",
            AlertsContainer {}
            Router::<Route> {}
        }
    }
}

#[component]
fn PageNotFound(route: Vec<String>) -> Element {
    rsx! {
        h1 { "Page not found" }
        p { "We are terribly sorry, but the page you requested doesn't exist." }
        pre { color: "red", "log:\nattemped to navigate to: {route:?}" }
        Link { to: Route::HostListView {}, "Back to the hosts" }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    log::info!("starting app");

    #[cfg(feature = "desktop")]
    {
        use dioxus::desktop::{Config, WindowBuilder};
        LaunchBuilder::desktop()
            .with_cfg(
                Config::new().with_menu(None).with_window(
                    WindowBuilder::new()
                        .with_title(TITLE)
                        .with_inner_size(dioxus::desktop::LogicalSize::new(1600, 900))
                        .with_resizable(true),
                ),
            )
            .launch(App)
    }

    #[cfg(not(feature = "desktop"))]
    dioxus::launch(App)
}
