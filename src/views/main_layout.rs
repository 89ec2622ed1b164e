use crate::prelude::*;

use crate::{context_loader::ALL_CLUSTERS, utils::CCStr, Route};

#[component]
pub fn MainLayout() -> Element {
    log::debug!("MainLayout reload");

    use_drop(|| log::debug!("MainLayout Dropped"));

    rsx! {
        div { class: "relative min-h-dvh",
            header { class: "bg-base-100 fixed top-0 w-full z-20 shadow-lg shadow-base-content/10",
                NavBar {}
            }
            main { class: "pt-16 pb-16 mx-8", Outlet::<Route> {} }
            footer { class: "absolute bottom-px w-full h-12 px-8 z-0",
                div { class: "h-px border-t border-solid border-gray-500" }
                Footer {}
            }
        }
    }
}

#[component]
fn NavBar() -> Element {
    log::debug!("NavBar reload");

    use_drop(|| log::debug!("NavBar Dropped"));

    rsx! {
        nav { class: "h-12 px-2 flex flex-row gap-2",
            div { class: "h-full flex flex-none content-center",
                div { class: "self-center text-lg font-black text-nowrap", "{crate::TITLE}" }
            }
            div { class: "basis-10" }
            NavLink { route: Route::HostListView {}, "Hosts" }
            NavLink { route: Route::ClusterListView {}, "Clusters" }
            NavLink {
                route: Route::ClusterNodesView {
                    cluster_id: CCStr::from(ALL_CLUSTERS),
                },
                "Nodes"
            }
            NavLink { route: Route::StorageView {}, "Storage" }
            NavLink { route: Route::ChartListView {}, "Charts" }
            NavLink { route: Route::TenantListView {}, "Tenants" }
            NavLink { route: Route::FlavorListView {}, "Flavors" }
            NavLink { route: Route::SshKeyListView {}, "SSH keys" }
            div { class: "grow" }
        }
    }
}

#[component]
fn NavLink(route: Route, children: Element) -> Element {
    rsx! {
        div { class: "basis-10 content-center flex",
            Link {
                class: "h-full px-4 content-center text-lg text-nowrap font-bold uppercase hover:bg-primary/10",
                active_class: "bg-primary/10 text-primary",
                to: route,
                {children}
            }
        }
    }
}

#[component]
fn Footer() -> Element {
    let config = state_management::CONSOLE_CONFIG();
    rsx! {
        div { class: "h-full text-xs text-right content-center",
            "Simulated backend latency: {config.simulator_latency_ms} ms"
        }
    }
}
