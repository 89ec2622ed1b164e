use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context_loader::ALL_CLUSTERS;
use crate::utils::{async_sleep, CCStr};

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("unknown cluster {uuid}")]
    UnknownCluster { uuid: CCStr },
    #[error("an SSH key named {name} already exists")]
    DuplicateSshKey { name: CCStr },
    #[error("invalid SSH key: {reason}")]
    InvalidSshKey { reason: &'static str },
    #[error("could not serialize {entity}: {source}")]
    Serialization {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub uuid: CCStr,
    pub name: CCStr,
    pub has_master_node: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub uuid: CCStr,
    pub name: CCStr,
    pub cluster_id: CCStr,
    pub status: CCStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: CCStr,
    pub hypervisor_hostname: CCStr,
    pub state: CCStr,
    pub vcpus: u32,
    pub memory_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: CCStr,
    pub name: CCStr,
    pub description: CCStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: CCStr,
    pub name: CCStr,
    pub vcpus: u32,
    pub ram: u64,
    pub disk: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshKey {
    pub name: CCStr,
    pub fingerprint: CCStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: CCStr,
    pub name: CCStr,
    pub status: CCStr,
    /// Size in GB
    pub size: u64,
    pub volume_type: CCStr,
    pub tenant_id: CCStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeType {
    pub id: CCStr,
    pub name: CCStr,
    pub description: CCStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshot {
    pub id: CCStr,
    pub name: CCStr,
    pub volume_id: CCStr,
    pub size: u64,
    pub status: CCStr,
}

/// Helm chart of the `stable` repository, shared by every cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: CCStr,
    pub name: CCStr,
    pub description: CCStr,
    pub version: CCStr,
    pub app_version: CCStr,
    pub repo: CCStr,
}

#[derive(Debug, Default)]
struct Inventory {
    clusters: Vec<Cluster>,
    nodes: Vec<Node>,
    hosts: Vec<Host>,
    tenants: Vec<Tenant>,
    flavors: Vec<Flavor>,
    volumes: Vec<Volume>,
    volume_types: Vec<VolumeType>,
    volume_snapshots: Vec<VolumeSnapshot>,
    charts: Vec<Chart>,
    ssh_keys: RwLock<Vec<SshKey>>,
}

impl Inventory {
    fn seeded() -> Self {
        let cluster = |uuid: &str, name: &str, has_master_node| Cluster {
            uuid: uuid.into(),
            name: name.into(),
            has_master_node,
        };
        let node = |uuid: &str, name: &str, cluster_id: &str, status: &str| Node {
            uuid: uuid.into(),
            name: name.into(),
            cluster_id: cluster_id.into(),
            status: status.into(),
        };
        let host = |id: &str, hostname: &str, state: &str, vcpus, memory_mb| Host {
            id: id.into(),
            hypervisor_hostname: hostname.into(),
            state: state.into(),
            vcpus,
            memory_mb,
        };
        let flavor = |id: &str, name: &str, vcpus, ram, disk| Flavor {
            id: id.into(),
            name: name.into(),
            vcpus,
            ram,
            disk,
        };
        let volume = |id: &str, name: &str, status: &str, size, volume_type: &str, tenant_id: &str| {
            Volume {
                id: id.into(),
                name: name.into(),
                status: status.into(),
                size,
                volume_type: volume_type.into(),
                tenant_id: tenant_id.into(),
            }
        };
        let chart = |id: &str, name: &str, description: &str, version: &str, app_version: &str| {
            Chart {
                id: id.into(),
                name: name.into(),
                description: description.into(),
                version: version.into(),
                app_version: app_version.into(),
                repo: "stable".into(),
            }
        };
        Self {
            clusters: vec![
                cluster("c1a3e2f0", "production", true),
                cluster("c2b7d9a4", "staging", true),
                cluster("c3f1c5e8", "sandbox", false),
            ],
            nodes: vec![
                node("n-0001", "prod-master-0", "c1a3e2f0", "ok"),
                node("n-0002", "prod-worker-0", "c1a3e2f0", "ok"),
                node("n-0003", "prod-worker-1", "c1a3e2f0", "converging"),
                node("n-0004", "staging-master-0", "c2b7d9a4", "ok"),
                node("n-0005", "staging-worker-0", "c2b7d9a4", "failed"),
                node("n-0006", "sandbox-worker-0", "c3f1c5e8", "ok"),
            ],
            hosts: vec![
                host("1", "compute-01.dc1", "up", 48, 262_144),
                host("2", "compute-02.dc1", "up", 48, 262_144),
                host("3", "compute-03.dc1", "down", 32, 131_072),
            ],
            tenants: vec![
                Tenant {
                    id: "t-admin".into(),
                    name: "admin".into(),
                    description: "Administrative tenant".into(),
                },
                Tenant {
                    id: "t-service".into(),
                    name: "service".into(),
                    description: "Tenant for OpenStack services".into(),
                },
                Tenant {
                    id: "t-dev".into(),
                    name: "dev".into(),
                    description: "Development workloads".into(),
                },
            ],
            flavors: vec![
                flavor("f-1", "m1.tiny", 1, 512, 1),
                flavor("f-2", "m1.small", 1, 2048, 20),
                flavor("f-3", "m1.medium", 2, 4096, 40),
                flavor("f-4", "m1.large", 4, 8192, 80),
            ],
            volumes: vec![
                volume("v-01", "pg-data", "in-use", 100, "ssd", "t-service"),
                volume("v-02", "build-cache", "available", 50, "hdd", "t-dev"),
                volume("v-03", "backups", "in-use", 500, "hdd", "t-admin"),
            ],
            volume_types: vec![
                VolumeType {
                    id: "vt-ssd".into(),
                    name: "ssd".into(),
                    description: "Replicated SSD pool".into(),
                },
                VolumeType {
                    id: "vt-hdd".into(),
                    name: "hdd".into(),
                    description: "Capacity HDD pool".into(),
                },
            ],
            volume_snapshots: vec![
                VolumeSnapshot {
                    id: "vs-01".into(),
                    name: "pg-data-nightly".into(),
                    volume_id: "v-01".into(),
                    size: 100,
                    status: "available".into(),
                },
                VolumeSnapshot {
                    id: "vs-02".into(),
                    name: "backups-weekly".into(),
                    volume_id: "v-03".into(),
                    size: 500,
                    status: "creating".into(),
                },
            ],
            charts: vec![
                chart("stable/nginx-ingress", "nginx-ingress", "Ingress controller using NGINX", "1.1.2", "0.21.0"),
                chart("stable/prometheus", "prometheus", "Monitoring system and time series database", "8.4.1", "2.6.0"),
                chart("stable/redis", "redis", "In-memory data structure store", "5.1.3", "4.0.12"),
            ],
            ssh_keys: RwLock::new(vec![
                SshKey {
                    name: "ops".into(),
                    fingerprint: "3f:a2:9c:11:0b:57:d4:e8:90:12:7a:6e:c3:44:5d:0f".into(),
                },
                SshKey {
                    name: "ci".into(),
                    fingerprint: "a1:07:bb:2e:93:c8:4f:60:1d:e9:72:35:8a:f0:6c:b4".into(),
                },
            ]),
        }
    }
}

/// In-process stand-in for the OpenStack and Kubernetes APIs
///
/// Every call waits `latency_ms` before answering with the seeded inventory.
#[derive(Debug, Clone)]
pub struct InfrastructureSimulator {
    latency_ms: u64,
    inventory: Arc<Inventory>,
}

impl InfrastructureSimulator {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency_ms,
            inventory: Arc::new(Inventory::seeded()),
        }
    }

    async fn respond<T: Clone>(&self, records: &[T]) -> Vec<T> {
        if self.latency_ms > 0 {
            async_sleep(self.latency_ms).await;
        }
        records.to_vec()
    }

    pub async fn clusters(&self) -> Vec<Cluster> {
        log::debug!("simulator - list clusters");
        self.respond(&self.inventory.clusters).await
    }

    /// Nodes of the cluster `cluster_id`, or of every cluster for [`ALL_CLUSTERS`]
    pub async fn nodes(&self, cluster_id: &str) -> Result<Vec<Node>, SimulatorError> {
        log::debug!("simulator - list nodes of {cluster_id}");
        if cluster_id == ALL_CLUSTERS {
            return Ok(self.respond(&self.inventory.nodes).await);
        }
        if !self.inventory.clusters.iter().any(|c| c.uuid.as_ref() == cluster_id) {
            return Err(SimulatorError::UnknownCluster {
                uuid: cluster_id.into(),
            });
        }
        let nodes: Vec<Node> = self
            .inventory
            .nodes
            .iter()
            .filter(|n| n.cluster_id.as_ref() == cluster_id)
            .cloned()
            .collect();
        Ok(self.respond(&nodes).await)
    }

    pub async fn hosts(&self) -> Vec<Host> {
        log::debug!("simulator - list hosts");
        self.respond(&self.inventory.hosts).await
    }

    pub async fn tenants(&self) -> Vec<Tenant> {
        log::debug!("simulator - list tenants");
        self.respond(&self.inventory.tenants).await
    }

    pub async fn flavors(&self) -> Vec<Flavor> {
        log::debug!("simulator - list flavors");
        self.respond(&self.inventory.flavors).await
    }

    pub async fn volumes(&self) -> Vec<Volume> {
        log::debug!("simulator - list volumes");
        self.respond(&self.inventory.volumes).await
    }

    pub async fn volume_types(&self) -> Vec<VolumeType> {
        log::debug!("simulator - list volume types");
        self.respond(&self.inventory.volume_types).await
    }

    pub async fn volume_snapshots(&self) -> Vec<VolumeSnapshot> {
        log::debug!("simulator - list volume snapshots");
        self.respond(&self.inventory.volume_snapshots).await
    }

    pub async fn charts(&self) -> Vec<Chart> {
        log::debug!("simulator - list charts");
        self.respond(&self.inventory.charts).await
    }

    pub async fn ssh_keys(&self) -> Vec<SshKey> {
        log::debug!("simulator - list ssh keys");
        let ssh_keys = self
            .inventory
            .ssh_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.respond(&ssh_keys).await
    }

    /// Registers a new keypair named `name` and returns it with its fingerprint
    pub async fn create_ssh_key(&self, name: &str, public_key: &str) -> Result<SshKey, SimulatorError> {
        log::debug!("simulator - create ssh key {name}");
        let name = name.trim();
        let public_key = public_key.trim();
        if name.is_empty() {
            return Err(SimulatorError::InvalidSshKey {
                reason: "the name is empty",
            });
        }
        if !public_key.starts_with("ssh-") && !public_key.starts_with("ecdsa-") {
            return Err(SimulatorError::InvalidSshKey {
                reason: "the public key is not in OpenSSH format",
            });
        }
        let ssh_key = SshKey {
            name: name.into(),
            fingerprint: random_fingerprint().into(),
        };
        {
            let mut ssh_keys = self
                .inventory
                .ssh_keys
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if ssh_keys.iter().any(|k| k.name.as_ref() == name) {
                return Err(SimulatorError::DuplicateSshKey { name: name.into() });
            }
            ssh_keys.push(ssh_key.clone());
        }
        Ok(self.respond(&[ssh_key]).await.remove(0))
    }
}

/// Colon separated MD5-sized fingerprint
fn random_fingerprint() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Serializes simulator records into loader entities
pub fn to_entities<T: Serialize>(
    entity: &'static str,
    records: Vec<T>,
) -> Result<Vec<Value>, SimulatorError> {
    records
        .into_iter()
        .map(|record| {
            serde_json::to_value(record)
                .map_err(|source| SimulatorError::Serialization { entity, source })
        })
        .collect()
}
