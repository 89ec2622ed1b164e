//! Context-cached data loading
//!
//! A [`ContextLoader`] fetches entities for a key, caches them in the shared
//! [`ContextStore`] indexed by a [`Fingerprint`] of the request params, and
//! answers later requests with the same fingerprint from the cache. Loaders
//! live in a [`LoaderRegistry`] so that any code holding a [`LoaderContext`]
//! can resolve them by key.

mod cluster;
mod error;
mod loader;
mod notify;
mod params;
mod registry;
mod store;

pub use cluster::{
    cluster_context_loader, ClusterLoaderOptions, ALL_CLUSTERS, CLUSTERS_LOADER_KEY,
    DEFAULT_CLUSTER_ID_KEY,
};
pub use error::{FetchError, LoaderError};
pub use loader::{
    data_mapper, fetch_fn, preload_fn, ContextLoader, ContextLoaderOptions, DataMapperFn,
    FetchFn, LoadFromContext, LoadOptions, LoadRequest, LoaderContext, Preloaded,
    DEFAULT_UNIQUE_IDENTIFIER,
};
pub use notify::{LogNotificationSink, NotificationLevel, NotificationSink};
pub use params::{Fingerprint, Params};
pub use registry::LoaderRegistry;
pub use store::{ContextState, ContextStore, ContextStoreService};
