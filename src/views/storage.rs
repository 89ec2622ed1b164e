use crate::prelude::*;

use crate::{components::data_table::Column, context_loader::Params, utils::CCStr};

use super::{LoaderTable, TitledView};

const VOLUME_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("status", "Status"),
    Column::new("size", "Size (GB)"),
    Column::new("volumeType", "Type"),
    Column::new("tenantId", "Tenant"),
];

const VOLUME_TYPE_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("description", "Description"),
];

const VOLUME_SNAPSHOT_COLUMNS: &[Column] = &[
    Column::new("name", "Name"),
    Column::new("volumeId", "Volume"),
    Column::new("size", "Size (GB)"),
    Column::new("status", "Status"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageTab {
    Volumes,
    VolumeTypes,
    VolumeSnapshots,
}
impl StorageTab {
    const ALL: [StorageTab; 3] = [Self::Volumes, Self::VolumeTypes, Self::VolumeSnapshots];

    fn label(self) -> &'static str {
        match self {
            Self::Volumes => "Volumes",
            Self::VolumeTypes => "Volume Types",
            Self::VolumeSnapshots => "Volume Snapshots",
        }
    }
}

/// Volumes, volume types and volume snapshots, one tab each
#[component]
pub fn StorageView() -> Element {
    log::debug!("StorageView Rendered");

    let mut current = use_signal(|| StorageTab::Volumes);

    use_drop(|| log::debug!("StorageView Dropped"));

    rsx! {
        TitledView {
            title: CCStr::from("Storage"),
            subtitle: CCStr::from("Block storage of the OpenStack deployment."),
            div { role: "tablist", class: "tabs tabs-border mb-4",
                for tab in StorageTab::ALL {
                    button {
                        key: "{tab.label()}",
                        role: "tab",
                        class: "tab",
                        class: if current() == tab { "tab-active" },
                        onclick: move |_| current.set(tab),
                        "{tab.label()}"
                    }
                }
            }
            {match current() {
                StorageTab::Volumes => rsx! {
                    LoaderTable {
                        key: "volumes",
                        loader_key: state_management::VOLUMES_LOADER_KEY,
                        params: Params::new(),
                        columns: VOLUME_COLUMNS,
                        row_key: "id",
                        refetch_on_mount: false,
                    }
                },
                StorageTab::VolumeTypes => rsx! {
                    LoaderTable {
                        key: "volume-types",
                        loader_key: state_management::VOLUME_TYPES_LOADER_KEY,
                        params: Params::new(),
                        columns: VOLUME_TYPE_COLUMNS,
                        row_key: "id",
                        refetch_on_mount: false,
                    }
                },
                StorageTab::VolumeSnapshots => rsx! {
                    LoaderTable {
                        key: "volume-snapshots",
                        loader_key: state_management::VOLUME_SNAPSHOTS_LOADER_KEY,
                        params: Params::new(),
                        columns: VOLUME_SNAPSHOT_COLUMNS,
                        row_key: "id",
                        refetch_on_mount: false,
                    }
                },
            }}
        }
    }
}
