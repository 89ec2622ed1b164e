use serde_json::Value;

use crate::context_loader::{
    cluster_context_loader, data_mapper, fetch_fn, ClusterLoaderOptions, ContextLoaderOptions,
    FetchError, LoadFromContext, LoaderContext, LoaderError, LoaderRegistry, Params,
    ALL_CLUSTERS, CLUSTERS_LOADER_KEY, DEFAULT_CLUSTER_ID_KEY,
};
use crate::utils::CCStr;

use super::simulator::{to_entities, InfrastructureSimulator, SimulatorError};

pub const NODES_LOADER_KEY: &str = "nodes";
pub const HOSTS_LOADER_KEY: &str = "hosts";
pub const TENANTS_LOADER_KEY: &str = "tenants";
pub const FLAVORS_LOADER_KEY: &str = "flavors";
pub const SSH_KEYS_LOADER_KEY: &str = "sshKeys";
pub const VOLUMES_LOADER_KEY: &str = "volumes";
pub const VOLUME_TYPES_LOADER_KEY: &str = "volumeTypes";
pub const VOLUME_SNAPSHOTS_LOADER_KEY: &str = "volumeSnapshots";
pub const CHARTS_LOADER_KEY: &str = "charts";

/// Registers the loaders of every entity the console displays
pub fn register_infrastructure_loaders(registry: &LoaderRegistry, api: InfrastructureSimulator) {
    log::debug!("register_infrastructure_loaders - start");

    let clusters_api = api.clone();
    registry.create_context_loader(
        CLUSTERS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_clusters(clusters_api.clone())),
        ContextLoaderOptions::default().with_unique_identifier("uuid"),
    );

    let nodes_api = api.clone();
    cluster_context_loader(
        registry,
        NODES_LOADER_KEY,
        fetch_fn(move |params, _| fetch_nodes(nodes_api.clone(), params)),
        ClusterLoaderOptions::new(
            ContextLoaderOptions::default()
                .with_unique_identifier("uuid")
                .with_data_mapper(data_mapper(with_cluster_names)),
        ),
    );

    let hosts_api = api.clone();
    registry.create_context_loader(
        HOSTS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_hosts(hosts_api.clone())),
        ContextLoaderOptions::default(),
    );

    let tenants_api = api.clone();
    registry.create_context_loader(
        TENANTS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_tenants(tenants_api.clone())),
        ContextLoaderOptions::default(),
    );

    let flavors_api = api.clone();
    registry.create_context_loader(
        FLAVORS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_flavors(flavors_api.clone())),
        ContextLoaderOptions::default(),
    );

    let volumes_api = api.clone();
    registry.create_context_loader(
        VOLUMES_LOADER_KEY,
        fetch_fn(move |_, _| fetch_volumes(volumes_api.clone())),
        ContextLoaderOptions::default(),
    );

    let volume_types_api = api.clone();
    registry.create_context_loader(
        VOLUME_TYPES_LOADER_KEY,
        fetch_fn(move |_, _| fetch_volume_types(volume_types_api.clone())),
        ContextLoaderOptions::default().with_entity_name("volume type"),
    );

    let volume_snapshots_api = api.clone();
    registry.create_context_loader(
        VOLUME_SNAPSHOTS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_volume_snapshots(volume_snapshots_api.clone())),
        ContextLoaderOptions::default().with_entity_name("volume snapshot"),
    );

    let charts_api = api.clone();
    registry.create_context_loader(
        CHARTS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_charts(charts_api.clone())),
        ContextLoaderOptions::default()
            .with_success_message("Helm charts of the stable repository retrieved")
            .with_error_message("Unable to list the Helm charts of the stable repository"),
    );

    registry.create_context_loader(
        SSH_KEYS_LOADER_KEY,
        fetch_fn(move |_, _| fetch_ssh_keys(api.clone())),
        ContextLoaderOptions::default()
            .with_unique_identifier("name")
            .with_entity_name("SSH key"),
    );

    log::debug!("register_infrastructure_loaders - finished");
}

async fn fetch_clusters(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("clusters", api.clusters().await)?)
}

async fn fetch_nodes(api: InfrastructureSimulator, params: Params) -> Result<Vec<Value>, FetchError> {
    let cluster_id = params
        .get(DEFAULT_CLUSTER_ID_KEY)
        .and_then(Value::as_str)
        .unwrap_or(ALL_CLUSTERS);
    Ok(to_entities("nodes", api.nodes(cluster_id).await?)?)
}

async fn fetch_hosts(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("hosts", api.hosts().await)?)
}

async fn fetch_tenants(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("tenants", api.tenants().await)?)
}

async fn fetch_flavors(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("flavors", api.flavors().await)?)
}

async fn fetch_ssh_keys(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("ssh keys", api.ssh_keys().await)?)
}

async fn fetch_volumes(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("volumes", api.volumes().await)?)
}

async fn fetch_volume_types(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("volume types", api.volume_types().await)?)
}

async fn fetch_volume_snapshots(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("volume snapshots", api.volume_snapshots().await)?)
}

async fn fetch_charts(api: InfrastructureSimulator) -> Result<Vec<Value>, FetchError> {
    Ok(to_entities("charts", api.charts().await)?)
}

/// Creates an SSH key and adds it to the cached `sshKeys` entities
///
/// Lists already served from the cache show the new key without refetching.
pub async fn create_ssh_key(
    context: &LoaderContext,
    api: &InfrastructureSimulator,
    name: &str,
    public_key: &str,
) -> Result<Value, FetchError> {
    let loader = context.registry().lookup(SSH_KEYS_LOADER_KEY)?;
    let created = api.create_ssh_key(name, public_key).await?;
    let entity = serde_json::to_value(created).map_err(|source| SimulatorError::Serialization {
        entity: "ssh keys",
        source,
    })?;

    let key = loader.key().clone();
    let unique_identifier = CCStr::from(loader.options().unique_identifier());
    let cached = entity.clone();
    context
        .store()
        .set_context(move |state| state.merge_items(&key, &[cached], &unique_identifier))
        .await;
    log::info!("SSH key {name} created");
    Ok(entity)
}

/// Adds the `clusterName` of each node, resolved through the clusters loader
async fn with_cluster_names(
    nodes: Vec<Value>,
    _params: Params,
    load_from_context: LoadFromContext,
) -> Result<Vec<Value>, LoaderError> {
    let clusters = load_from_context
        .load(CLUSTERS_LOADER_KEY, Params::new(), false)
        .await?;
    Ok(nodes
        .into_iter()
        .map(|mut node| {
            let name = clusters
                .iter()
                .find(|cluster| cluster.get("uuid") == node.get("clusterId"))
                .and_then(|cluster| cluster.get("name").cloned())
                .unwrap_or(Value::Null);
            if let Some(node) = node.as_object_mut() {
                node.insert("clusterName".to_owned(), name);
            }
            node
        })
        .collect())
}
