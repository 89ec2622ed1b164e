use crate::prelude::*;

use serde_json::{json, Value};

use crate::{
    components::data_table::Column,
    context_loader::{Params, ALL_CLUSTERS, DEFAULT_CLUSTER_ID_KEY},
    utils::{display_value, CCStr},
    Route,
};

use super::{LoaderTable, TitledView};

const CLUSTER_COLUMNS: &[Column] = &[
    Column::new("uuid", "UUID"),
    Column::new("name", "Name"),
    Column::new("hasMasterNode", "Master node"),
];

const NODE_COLUMNS: &[Column] = &[
    Column::new("uuid", "UUID"),
    Column::new("name", "Name"),
    Column::new("clusterName", "Cluster"),
    Column::new("status", "Status"),
];

#[component]
pub fn ClusterListView() -> Element {
    rsx! {
        TitledView {
            title: CCStr::from("Clusters"),
            subtitle: CCStr::from("Kubernetes clusters and their nodes."),
            right: rsx! {
                ClusterLinks {}
            },
            LoaderTable {
                loader_key: state_management::CLUSTERS_LOADER_KEY,
                params: Params::new(),
                columns: CLUSTER_COLUMNS,
                row_key: "uuid",
                refetch_on_mount: false,
            }
        }
    }
}

#[component]
fn ClusterLinks() -> Element {
    let clusters = helper_hooks::use_data_loader(
        state_management::CLUSTERS_LOADER_KEY,
        Params::new(),
        false,
    );

    let links = use_memo(move || {
        clusters
            .data()
            .iter()
            .filter_map(|cluster| {
                let uuid = cluster.get("uuid").and_then(Value::as_str)?;
                Some((CCStr::from(uuid), display_value(cluster.get("name"))))
            })
            .collect::<Vec<_>>()
    });

    rsx! {
        div { class: "flex flex-wrap gap-2 content-center",
            for (uuid , name) in links() {
                Link {
                    key: "{uuid}",
                    class: "btn btn-sm btn-outline",
                    to: Route::ClusterNodesView {
                        cluster_id: uuid.clone(),
                    },
                    "{name} nodes"
                }
            }
            Link {
                class: "btn btn-sm btn-outline btn-primary",
                to: Route::ClusterNodesView {
                    cluster_id: CCStr::from(ALL_CLUSTERS),
                },
                "All nodes"
            }
        }
    }
}

#[component]
pub fn ClusterNodesView(cluster_id: CCStr) -> Element {
    log::debug!("ClusterNodesView({cluster_id}) Rendered");

    let all_clusters = cluster_id.as_ref() == ALL_CLUSTERS;
    let subtitle = if all_clusters {
        CCStr::from("Nodes of every cluster.")
    } else {
        CCStr::from(format!("Nodes of cluster {cluster_id}."))
    };
    let mut params = Params::new();
    params.insert(DEFAULT_CLUSTER_ID_KEY.to_owned(), json!(cluster_id.as_ref()));

    rsx! {
        TitledView { title: CCStr::from("Nodes"), subtitle,
            LoaderTable {
                key: "{cluster_id}",
                loader_key: state_management::NODES_LOADER_KEY,
                params,
                columns: NODE_COLUMNS,
                row_key: "uuid",
                // Nodes listed for every cluster never match the cluster scoped cache
                refetch_on_mount: all_clusters,
            }
        }
    }
}
