use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{
    error::LoaderError,
    loader::{ContextLoader, ContextLoaderOptions, FetchFn},
};
use crate::utils::CCStr;

/// Named set of context loaders, resolvable at call time
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: Arc<RwLock<HashMap<CCStr, ContextLoader>>>,
}
impl core::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaders = self.loaders.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LoaderRegistry")
            .field("keys", &loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `loader` under `key`, replacing any previous binding
    pub fn register(&self, key: impl Into<CCStr>, loader: ContextLoader) {
        let key = key.into();
        let mut loaders = self.loaders.write().unwrap_or_else(PoisonError::into_inner);
        if loaders.insert(key.clone(), loader).is_some() {
            log::warn!("Context Loader with key {key} was already registered, replacing it");
        } else {
            log::debug!("Context Loader with key {key} registered");
        }
    }

    pub fn lookup(&self, key: &str) -> Result<ContextLoader, LoaderError> {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound {
                key: CCStr::from(key),
            })
    }

    /// Builds a [`ContextLoader`] and registers it under `key`
    pub fn create_context_loader(
        &self,
        key: impl Into<CCStr>,
        fetch: FetchFn,
        options: ContextLoaderOptions,
    ) -> ContextLoader {
        let loader = ContextLoader::new(key, fetch, options);
        self.register(loader.key().clone(), loader.clone());
        loader
    }
}
