use serde_json::Value;

use super::{
    error::LoaderError,
    loader::{
        preload_fn, ContextLoader, ContextLoaderOptions, FetchFn, LoadFromContext, Preloaded,
    },
    params::Params,
    registry::LoaderRegistry,
};
use crate::utils::{is_truthy, CCStr};

/// `clusterId` value meaning no specific cluster
pub const ALL_CLUSTERS: &str = "__all__";
pub const DEFAULT_CLUSTER_ID_KEY: &str = "clusterId";
/// Key of the loader providing the cluster list
pub const CLUSTERS_LOADER_KEY: &str = "clusters";
const CLUSTERS_PRELOAD: &str = "clusters";

#[derive(Debug, Clone)]
pub struct ClusterLoaderOptions {
    cluster_id_key: CCStr,
    filter_master_nodes: bool,
    base: ContextLoaderOptions,
}
impl Default for ClusterLoaderOptions {
    fn default() -> Self {
        Self {
            cluster_id_key: CCStr::from(DEFAULT_CLUSTER_ID_KEY),
            filter_master_nodes: false,
            base: ContextLoaderOptions::default(),
        }
    }
}

impl ClusterLoaderOptions {
    pub fn new(base: ContextLoaderOptions) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    pub fn with_cluster_id_key(mut self, cluster_id_key: impl Into<CCStr>) -> Self {
        self.cluster_id_key = cluster_id_key.into();
        self
    }

    /// Only consider clusters having a master node when picking the default one
    pub fn with_filter_master_nodes(mut self, filter_master_nodes: bool) -> Self {
        self.filter_master_nodes = filter_master_nodes;
        self
    }
}

/// Builds and registers a [`ContextLoader`] scoped by the selected cluster
///
/// The cache is indexed by the cluster id param. When the caller gives no
/// cluster id, the first known cluster is selected, or [`ALL_CLUSTERS`] when
/// there is none.
pub fn cluster_context_loader(
    registry: &LoaderRegistry,
    key: impl Into<CCStr>,
    fetch: FetchFn,
    options: ClusterLoaderOptions,
) -> ContextLoader {
    let ClusterLoaderOptions {
        cluster_id_key,
        filter_master_nodes,
        base,
    } = options;

    let parse_key = cluster_id_key.clone();
    let options = base
        .with_index_by(cluster_id_key)
        .with_preload(
            CLUSTERS_PRELOAD,
            preload_fn(move |load_from_context| {
                preload_clusters(load_from_context, filter_master_nodes)
            }),
        )
        .with_parse_params(move |preloaded: &Preloaded, params| {
            let clusters = preloaded
                .get(CLUSTERS_PRELOAD)
                .map(Vec::as_slice)
                .unwrap_or_default();
            resolve_cluster_id(clusters, params, &parse_key)
        });

    registry.create_context_loader(key, fetch, options)
}

async fn preload_clusters(
    load_from_context: LoadFromContext,
    filter_master_nodes: bool,
) -> Result<Vec<Value>, LoaderError> {
    let clusters = load_from_context
        .load(CLUSTERS_LOADER_KEY, Params::new(), false)
        .await?;
    if !filter_master_nodes {
        return Ok(clusters);
    }
    Ok(clusters
        .into_iter()
        .filter(|cluster| cluster.get("hasMasterNode").is_some_and(is_truthy))
        .collect())
}

/// Fills `cluster_id_key` in `params`: the given value, else the plain
/// `clusterId` param, else the first cluster uuid, else [`ALL_CLUSTERS`]
pub(crate) fn resolve_cluster_id(clusters: &[Value], mut params: Params, cluster_id_key: &str) -> Params {
    let given = |field: &str| params.get(field).filter(|v| is_truthy(v)).cloned();
    let cluster_id = given(cluster_id_key)
        .or_else(|| given(DEFAULT_CLUSTER_ID_KEY))
        .or_else(|| {
            clusters
                .first()
                .and_then(|cluster| cluster.get("uuid"))
                .filter(|uuid| !uuid.is_null())
                .cloned()
        })
        .unwrap_or_else(|| Value::from(ALL_CLUSTERS));
    params.insert(cluster_id_key.to_owned(), cluster_id);
    params
}
