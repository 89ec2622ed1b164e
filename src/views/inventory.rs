use crate::prelude::*;

use crate::{components::data_table::Column, context_loader::Params, utils::CCStr, Route};

use super::{LoaderTable, TitledView};

const HOST_COLUMNS: &[Column] = &[
    Column::new("id", "ID"),
    Column::new("hypervisorHostname", "Hostname"),
    Column::new("state", "State"),
    Column::new("vcpus", "vCPUs"),
    Column::new("memoryMb", "Memory (MB)"),
];

const TENANT_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("description", "Description"),
];

const FLAVOR_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("vcpus", "vCPUs"),
    Column::new("ram", "RAM (MB)"),
    Column::new("disk", "Disk (GB)"),
];

const CHART_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("version", "Version"),
    Column::new("appVersion", "App version"),
    Column::new("description", "Description"),
    Column::new("repo", "Repository"),
];

const SSH_KEY_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("fingerprint", "Fingerprint"),
];

#[component]
pub fn HostListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("Hosts"),
            subtitle: CCStr::from("Hypervisors of the OpenStack deployment."),
            LoaderTable {
                loader_key: state_management::HOSTS_LOADER_KEY,
                params: Params::new(),
                columns: HOST_COLUMNS,
                row_key: "id",
                // Host states change often
                refetch_on_mount: true,
            }
        }
    }
}

#[component]
pub fn TenantListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("Tenants"),
            subtitle: CCStr::from("OpenStack projects."),
            LoaderTable {
                loader_key: state_management::TENANTS_LOADER_KEY,
                params: Params::new(),
                columns: TENANT_COLUMNS,
                row_key: "id",
                refetch_on_mount: false,
            }
        }
    }
}

#[component]
pub fn FlavorListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("Flavors"),
            subtitle: CCStr::from("Instance sizes available to tenants."),
            LoaderTable {
                loader_key: state_management::FLAVORS_LOADER_KEY,
                params: Params::new(),
                columns: FLAVOR_COLUMNS,
                row_key: "id",
                refetch_on_mount: false,
            }
        }
    }
}

#[component]
pub fn SshKeyListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("SSH keys"),
            subtitle: CCStr::from("Keypairs injected in new instances."),
            right: rsx! {
                Link { class: "btn btn-primary", to: Route::SshKeyCreateView {}, "Add SSH key" }
            },
            LoaderTable {
                loader_key: state_management::SSH_KEYS_LOADER_KEY,
                params: Params::new(),
                columns: SSH_KEY_COLUMNS,
                row_key: "name",
                refetch_on_mount: false,
            }
        }
    }
}

/// Helm charts are shared by every cluster
#[component]
pub fn ChartListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("Charts"),
            subtitle: CCStr::from("Helm charts available to the Kubernetes clusters."),
            LoaderTable {
                loader_key: state_management::CHARTS_LOADER_KEY,
                params: Params::new(),
                columns: CHART_COLUMNS,
                row_key: "id",
                refetch_on_mount: false,
            }
        }
    }
}
