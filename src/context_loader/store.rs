use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::params::{merge_unique, Fingerprint};
use crate::utils::CCStr;

/// Shared cache state of every context loader
///
/// `cached_params` records, per loader key, the fingerprints already resolved.
/// `cached_data` holds, per loader key, the entities fetched so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextState {
    cached_params: HashMap<CCStr, Vec<Fingerprint>>,
    cached_data: HashMap<CCStr, Vec<Value>>,
}

impl ContextState {
    pub fn cached_params(&self, key: &str) -> Option<&[Fingerprint]> {
        self.cached_params.get(key).map(Vec::as_slice)
    }

    pub fn cached_data(&self, key: &str) -> &[Value] {
        self.cached_data.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_satisfied(&self, key: &str, fingerprint: &Fingerprint) -> bool {
        self.cached_params(key)
            .is_some_and(|fingerprints| fingerprints.contains(fingerprint))
    }

    /// Cached entities of `key` matching `fingerprint`
    pub fn cached_items(&self, key: &str, fingerprint: &Fingerprint) -> Vec<Value> {
        self.cached_data(key)
            .iter()
            .filter(|entity| fingerprint.matches(entity))
            .cloned()
            .collect()
    }

    pub(crate) fn init_params(&mut self, key: &CCStr) {
        self.cached_params.entry(key.clone()).or_default();
    }

    pub(crate) fn invalidate(&mut self, key: &CCStr, fingerprint: &Fingerprint) {
        if let Some(entities) = self.cached_data.get_mut(key) {
            entities.retain(|entity| !fingerprint.matches(entity));
        }
    }

    pub(crate) fn merge_items(&mut self, key: &CCStr, fetched: &[Value], unique_identifier: &str) {
        let existing = self.cached_data.remove(key).unwrap_or_default();
        self.cached_data
            .insert(key.clone(), merge_unique(existing, fetched, unique_identifier));
    }

    pub(crate) fn record_params(&mut self, key: &CCStr, fingerprint: Fingerprint) {
        let fingerprints = self.cached_params.entry(key.clone()).or_default();
        if !fingerprints.contains(&fingerprint) {
            fingerprints.push(fingerprint);
        }
    }
}

type ContextUpdater = Box<dyn FnOnce(&mut ContextState) + Send>;

/// Commands for the context store service
pub struct ContextStoreCommand {
    updater: ContextUpdater,
    result: oneshot::Sender<()>,
}
impl core::fmt::Debug for ContextStoreCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStoreCommand").finish_non_exhaustive()
    }
}

static NEXT_STORE_ID: AtomicUsize = AtomicUsize::new(0);

/// Accessor of the shared [`ContextState`]
///
/// Reads go straight to the state. Writes are queued to a single writer,
/// the [`ContextStoreService`], which applies them one at a time in arrival order.
#[derive(Debug, Clone)]
pub struct ContextStore {
    id: usize,
    state: Arc<RwLock<ContextState>>,
    commands: mpsc::UnboundedSender<ContextStoreCommand>,
}

/// The single writer of a [`ContextStore`], to be run on the async runtime
#[derive(Debug)]
pub struct ContextStoreService {
    id: usize,
    state: Arc<RwLock<ContextState>>,
    commands: mpsc::UnboundedReceiver<ContextStoreCommand>,
}

impl ContextStore {
    pub fn new() -> (Self, ContextStoreService) {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(RwLock::new(ContextState::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id,
                state: state.clone(),
                commands: tx,
            },
            ContextStoreService {
                id,
                state,
                commands: rx,
            },
        )
    }

    /// Creates a store and spawns its service on the current tokio runtime
    pub fn spawn() -> Self {
        let (store, service) = Self::new();
        tokio::spawn(service.run());
        store
    }

    /// Identity of the underlying state, shared by all clones of this store
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn get_context<R>(&self, selector: impl FnOnce(&ContextState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        selector(&*state)
    }

    /// Queues `updater` and waits until the service applied it
    pub async fn set_context(&self, updater: impl FnOnce(&mut ContextState) + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let cmd = ContextStoreCommand {
            updater: Box::new(updater),
            result: tx,
        };
        if self.commands.send(cmd).is_err() {
            log::error!("context_store {} - service is not running, update dropped", self.id);
            return;
        }
        if rx.await.is_err() {
            log::error!("context_store {} - service stopped before applying the update", self.id);
        }
    }
}

impl ContextStoreService {
    pub async fn run(mut self) {
        log::info!("context_store_service {} - start", self.id);
        while let Some(cmd) = self.commands.recv().await {
            log::debug!("context_store_service {} - Processing command {cmd:?}...", self.id);
            let ContextStoreCommand { updater, result } = cmd;
            {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                updater(&mut *state);
            }
            // The caller may have given up waiting, nothing to do about it
            let _ = result.send(());
            log::debug!("context_store_service {} - Command processed", self.id);
        }
        log::info!("context_store_service {} - stop", self.id);
    }
}
