use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use super::{
    error::{FetchError, LoaderError},
    notify::{LogNotificationSink, NotificationSink},
    params::{canonical_params, Fingerprint, Params},
    registry::LoaderRegistry,
    store::ContextStore,
};
use crate::utils::CCStr;

pub const DEFAULT_UNIQUE_IDENTIFIER: &str = "id";

pub type FetchFuture = BoxFuture<'static, Result<Vec<Value>, FetchError>>;
pub type FetchFn = Arc<dyn Fn(Params, LoadFromContext) -> FetchFuture + Send + Sync>;
pub type DataMapperFn = Arc<
    dyn Fn(Vec<Value>, Params, LoadFromContext) -> BoxFuture<'static, Result<Vec<Value>, LoaderError>>
        + Send
        + Sync,
>;
pub type PreloadFn =
    Arc<dyn Fn(LoadFromContext) -> BoxFuture<'static, Result<Vec<Value>, LoaderError>> + Send + Sync>;
/// Results of the preload stages, by stage name
pub type Preloaded = HashMap<CCStr, Vec<Value>>;
pub type ParseParamsFn = Arc<dyn Fn(&Preloaded, Params) -> Params + Send + Sync>;
pub type SuccessMessageFn = Arc<dyn Fn(&Params) -> String + Send + Sync>;
pub type ErrorMessageFn = Arc<dyn Fn(&FetchError, &Params) -> String + Send + Sync>;
pub type OnSuccess = Arc<dyn Fn(&str, &Params) + Send + Sync>;
pub type OnError = Arc<dyn Fn(&str, &FetchError, &Params) + Send + Sync>;

type SharedLoad = Shared<BoxFuture<'static, Result<Vec<Value>, LoaderError>>>;

pub fn fetch_fn<F, Fut>(f: F) -> FetchFn
where
    F: Fn(Params, LoadFromContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Value>, FetchError>> + Send + 'static,
{
    Arc::new(move |params, load_from_context| f(params, load_from_context).boxed())
}

pub fn data_mapper<F, Fut>(f: F) -> DataMapperFn
where
    F: Fn(Vec<Value>, Params, LoadFromContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Value>, LoaderError>> + Send + 'static,
{
    Arc::new(move |items, params, load_from_context| f(items, params, load_from_context).boxed())
}

pub fn preload_fn<F, Fut>(f: F) -> PreloadFn
where
    F: Fn(LoadFromContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Value>, LoaderError>> + Send + 'static,
{
    Arc::new(move |load_from_context| f(load_from_context).boxed())
}

/// `"sshKeys"` becomes `"Sshkeys"`
fn default_entity_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

/// Configuration of a [`ContextLoader`]
#[derive(Clone)]
pub struct ContextLoaderOptions {
    unique_identifier: CCStr,
    entity_name: Option<CCStr>,
    index_by: Vec<CCStr>,
    data_mapper: Option<DataMapperFn>,
    success_message: Option<SuccessMessageFn>,
    error_message: Option<ErrorMessageFn>,
    preload: Vec<(CCStr, PreloadFn)>,
    parse_params: Option<ParseParamsFn>,
}
impl Default for ContextLoaderOptions {
    fn default() -> Self {
        Self {
            unique_identifier: CCStr::from(DEFAULT_UNIQUE_IDENTIFIER),
            entity_name: None,
            index_by: Vec::new(),
            data_mapper: None,
            success_message: None,
            error_message: None,
            preload: Vec::new(),
            parse_params: None,
        }
    }
}
impl core::fmt::Debug for ContextLoaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoaderOptions")
            .field("unique_identifier", &self.unique_identifier)
            .field("entity_name", &self.entity_name)
            .field("index_by", &self.index_by)
            .field(
                "preload",
                &self.preload.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl ContextLoaderOptions {
    /// Field used to deduplicate entities when merging them in the cache
    pub fn with_unique_identifier(mut self, unique_identifier: impl Into<CCStr>) -> Self {
        self.unique_identifier = unique_identifier.into();
        self
    }

    /// Name used in the default success and error messages
    pub fn with_entity_name(mut self, entity_name: impl Into<CCStr>) -> Self {
        self.entity_name = Some(entity_name.into());
        self
    }

    /// Indexes the cache on a single params field
    pub fn with_index_by(self, field: impl Into<CCStr>) -> Self {
        self.with_index_by_all([field])
    }

    /// Indexes the cache on several params fields, in order
    pub fn with_index_by_all<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CCStr>,
    {
        self.index_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Transformation applied to the returned items, fresh or cached
    pub fn with_data_mapper(mut self, data_mapper: DataMapperFn) -> Self {
        self.data_mapper = Some(data_mapper);
        self
    }

    pub fn with_success_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.with_success_message_fn(move |_| message.clone())
    }

    pub fn with_success_message_fn(
        mut self,
        message: impl Fn(&Params) -> String + Send + Sync + 'static,
    ) -> Self {
        self.success_message = Some(Arc::new(message));
        self
    }

    pub fn with_error_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.with_error_message_fn(move |_, _| message.clone())
    }

    pub fn with_error_message_fn(
        mut self,
        message: impl Fn(&FetchError, &Params) -> String + Send + Sync + 'static,
    ) -> Self {
        self.error_message = Some(Arc::new(message));
        self
    }

    /// Adds a stage run before params parsing, its result exposed under `name`
    pub fn with_preload(mut self, name: impl Into<CCStr>, preload: PreloadFn) -> Self {
        self.preload.push((name.into(), preload));
        self
    }

    /// Final resolution of the params, before the fingerprint is computed
    pub fn with_parse_params(
        mut self,
        parse_params: impl Fn(&Preloaded, Params) -> Params + Send + Sync + 'static,
    ) -> Self {
        self.parse_params = Some(Arc::new(parse_params));
        self
    }

    pub fn unique_identifier(&self) -> &str {
        &self.unique_identifier
    }

    pub fn index_by(&self) -> &[CCStr] {
        &self.index_by
    }
}

/// Per-call callbacks of a load
///
/// Without callbacks, successes are logged at `info` level and failures at
/// `error` level. Callbacks take part in the identity of a call: two calls only
/// coalesce when they share the very same callbacks.
#[derive(Clone, Default)]
pub struct LoadOptions {
    on_success: Option<OnSuccess>,
    on_error: Option<OnError>,
}
impl core::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl LoadOptions {
    pub fn with_on_success(mut self, on_success: impl Fn(&str, &Params) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(on_success));
        self
    }

    pub fn with_on_error(
        mut self,
        on_error: impl Fn(&str, &FetchError, &Params) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    fn success(&self, message: &str, params: &Params) {
        match &self.on_success {
            Some(on_success) => on_success(message, params),
            None => log::info!("{message}"),
        }
    }

    fn error(&self, message: &str, err: &FetchError, params: &Params) {
        match &self.on_error {
            Some(on_error) => on_error(message, err, params),
            None => log::error!("{message}: {err}"),
        }
    }

    fn identity(&self) -> (usize, usize) {
        (
            self.on_success
                .as_ref()
                .map_or(0, |cb| Arc::as_ptr(cb) as *const () as usize),
            self.on_error
                .as_ref()
                .map_or(0, |cb| Arc::as_ptr(cb) as *const () as usize),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub params: Params,
    pub refetch: bool,
    pub options: LoadOptions,
}
impl LoadRequest {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn with_refetch(mut self, refetch: bool) -> Self {
        self.refetch = refetch;
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }
}

/// Everything a load needs from its surroundings: the loaders, the shared
/// store and where to send notices
#[derive(Clone)]
pub struct LoaderContext {
    registry: LoaderRegistry,
    store: ContextStore,
    notifications: Arc<dyn NotificationSink>,
}
impl core::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("registry", &self.registry)
            .field("store", &self.store.id())
            .finish_non_exhaustive()
    }
}

impl LoaderContext {
    pub fn new(registry: LoaderRegistry, store: ContextStore) -> Self {
        Self {
            registry,
            store,
            notifications: Arc::new(LogNotificationSink),
        }
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationSink> {
        &self.notifications
    }

    /// Resolves the loader registered under `key` and runs `request` through it
    pub async fn load(&self, key: &str, request: LoadRequest) -> Result<Vec<Value>, LoaderError> {
        let loader = self.registry.lookup(key)?;
        loader.load(self, request).await
    }
}

/// Handle given to fetch functions, data mappers and preload stages to load
/// other registered entities through the same context and callbacks
#[derive(Debug, Clone)]
pub struct LoadFromContext {
    context: LoaderContext,
    options: LoadOptions,
}

impl LoadFromContext {
    pub async fn load(&self, key: &str, params: Params, refetch: bool) -> Result<Vec<Value>, LoaderError> {
        let request = LoadRequest {
            params,
            refetch,
            options: self.options.clone(),
        };
        self.context.load(key, request).await
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CallKey {
    store: usize,
    params: String,
    refetch: bool,
    callbacks: (usize, usize),
}
impl CallKey {
    fn new(context: &LoaderContext, request: &LoadRequest) -> Self {
        Self {
            store: context.store.id(),
            params: canonical_params(&request.params),
            refetch: request.refetch,
            callbacks: request.options.identity(),
        }
    }
}

/// What a single read of the store says about a fingerprint
enum CacheLookup {
    Uninitialized,
    Miss,
    Hit(Vec<Value>),
}

/// Memoized, parameter-indexed fetch function caching its results in the
/// [`ContextStore`]
///
/// Clones share the same in-flight calls.
#[derive(Clone)]
pub struct ContextLoader {
    inner: Arc<ContextLoaderInner>,
}
impl core::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoader")
            .field("key", &self.inner.key)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

struct ContextLoaderInner {
    key: CCStr,
    fetch: FetchFn,
    options: ContextLoaderOptions,
    success_message: SuccessMessageFn,
    error_message: ErrorMessageFn,
    in_flight: Mutex<HashMap<CallKey, SharedLoad>>,
}

impl ContextLoader {
    pub fn new(key: impl Into<CCStr>, fetch: FetchFn, options: ContextLoaderOptions) -> Self {
        let key = key.into();
        let entity_name = options
            .entity_name
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| default_entity_name(&key));

        let success_message = options.success_message.clone().unwrap_or_else(|| {
            let message = format!("Successfully retrieved {entity_name} items");
            Arc::new(move |_: &Params| message.clone())
        });
        let error_message = options.error_message.clone().unwrap_or_else(|| {
            let message = format!("Error when trying to retrieve {entity_name} items");
            Arc::new(move |_: &FetchError, _: &Params| message.clone())
        });

        Self {
            inner: Arc::new(ContextLoaderInner {
                key,
                fetch,
                options,
                success_message,
                error_message,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn key(&self) -> &CCStr {
        &self.inner.key
    }

    pub fn options(&self) -> &ContextLoaderOptions {
        &self.inner.options
    }

    /// Loads the entities answering `request`
    ///
    /// A call identical to one still in flight joins it instead of starting
    /// again. Fetch failures are reported to the `on_error` callback and
    /// resolve to an empty list; only a lookup of an unknown loader key, from a
    /// preload stage or a data mapper, comes back as an error.
    pub fn load(
        &self,
        context: &LoaderContext,
        request: LoadRequest,
    ) -> impl Future<Output = Result<Vec<Value>, LoaderError>> + Send + 'static {
        let call_key = CallKey::new(context, &request);
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = in_flight.get(&call_key) {
            log::debug!("context_loader {} - joining in-flight call", self.inner.key);
            return pending.clone();
        }

        let inner = self.inner.clone();
        let context = context.clone();
        let settled = call_key.clone();
        let load = async move {
            let result = inner.resolve(&context, request).await;
            inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&settled);
            result
        }
        .boxed()
        .shared();
        in_flight.insert(call_key, load.clone());
        load
    }
}

impl ContextLoaderInner {
    async fn resolve(
        &self,
        context: &LoaderContext,
        request: LoadRequest,
    ) -> Result<Vec<Value>, LoaderError> {
        let LoadRequest {
            params,
            refetch,
            options,
        } = request;
        let load_from_context = LoadFromContext {
            context: context.clone(),
            options: options.clone(),
        };
        let params = self.parse_params(&load_from_context, params).await?;
        let fingerprint = Fingerprint::project(&params, &self.options.index_by);
        let store = context.store();

        if !refetch {
            let lookup = store.get_context(|state| match state.cached_params(&self.key) {
                None => CacheLookup::Uninitialized,
                Some(fingerprints) if fingerprints.contains(&fingerprint) => {
                    CacheLookup::Hit(state.cached_items(&self.key, &fingerprint))
                }
                Some(_) => CacheLookup::Miss,
            });
            match lookup {
                CacheLookup::Hit(items) => {
                    log::debug!("context_loader {} - cache hit for {fingerprint:?}", self.key);
                    return self.map_data(items, params, load_from_context).await;
                }
                CacheLookup::Miss => (),
                CacheLookup::Uninitialized => {
                    let key = self.key.clone();
                    store.set_context(move |state| state.init_params(&key)).await;
                }
            }
        }

        log::debug!("context_loader {} - fetching {fingerprint:?} (refetch: {refetch})", self.key);
        match (self.fetch)(params.clone(), load_from_context.clone()).await {
            Ok(fetched) => {
                let key = self.key.clone();
                let unique_identifier = self.options.unique_identifier.clone();
                let items = fetched.clone();
                store
                    .set_context(move |state| {
                        if refetch {
                            state.invalidate(&key, &fingerprint);
                        }
                        state.merge_items(&key, &items, &unique_identifier);
                        state.record_params(&key, fingerprint);
                    })
                    .await;
                options.success(&(self.success_message)(&params), &params);
                self.map_data(fetched, params, load_from_context).await
            }
            Err(err) => {
                options.error(&(self.error_message)(&err, &params), &err, &params);
                Ok(Vec::new())
            }
        }
    }

    async fn parse_params(
        &self,
        load_from_context: &LoadFromContext,
        params: Params,
    ) -> Result<Params, LoaderError> {
        let mut preloaded = Preloaded::new();
        for (name, preload) in &self.options.preload {
            preloaded.insert(name.clone(), preload(load_from_context.clone()).await?);
        }
        Ok(match &self.options.parse_params {
            Some(parse_params) => parse_params(&preloaded, params),
            None => params,
        })
    }

    async fn map_data(
        &self,
        items: Vec<Value>,
        params: Params,
        load_from_context: LoadFromContext,
    ) -> Result<Vec<Value>, LoaderError> {
        match &self.options.data_mapper {
            Some(data_mapper) => data_mapper(items, params, load_from_context).await,
            None => Ok(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    fn context() -> LoaderContext {
        LoaderContext::new(LoaderRegistry::new(), ContextStore::spawn())
    }

    /// Fetch function returning `items` and counting its invocations
    fn counted(calls: &Arc<AtomicUsize>, items: Vec<Value>) -> FetchFn {
        let calls = calls.clone();
        fetch_fn(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items = items.clone();
            async move {
                tokio::task::yield_now().await;
                Ok(items)
            }
        })
    }

    fn ids(items: &[Value]) -> Vec<i64> {
        let mut ids: Vec<i64> = items.iter().filter_map(|e| e["id"].as_i64()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn entity_name_is_capitalized_key() {
        assert_eq!(default_entity_name("sshKeys"), "Sshkeys");
        assert_eq!(default_entity_name("hosts"), "Hosts");
        assert_eq!(default_entity_name(""), "");
    }

    #[tokio::test]
    async fn cache_hit_does_not_fetch_again() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        ctx.registry().create_context_loader(
            "hosts",
            counted(&calls, vec![json!({"id": 1}), json!({"id": 2})]),
            ContextLoaderOptions::default(),
        );

        let first = ctx.load("hosts", LoadRequest::default()).await.unwrap();
        let second = ctx.load("hosts", LoadRequest::default()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ids(&first), vec![1, 2]);
        assert_eq!(ids(&second), vec![1, 2]);
    }

    #[tokio::test]
    async fn distinct_fingerprints_fetch_separately() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        ctx.registry().create_context_loader(
            "widgets",
            fetch_fn(move |params: Params, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                let group = params["group"].clone();
                async move { Ok(vec![json!({"id": group.to_string(), "group": group})]) }
            }),
            ContextLoaderOptions::default().with_index_by("group"),
        );

        let x = ctx
            .load("widgets", LoadRequest::new(params(json!({"group": "x"}))))
            .await
            .unwrap();
        let y = ctx
            .load("widgets", LoadRequest::new(params(json!({"group": "y"}))))
            .await
            .unwrap();
        let x_again = ctx
            .load("widgets", LoadRequest::new(params(json!({"group": "x", "page": 3}))))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(x, x_again);
        assert_ne!(x, y);
    }

    #[tokio::test]
    async fn refetch_invalidates_only_its_fingerprint() {
        let ctx = context();
        let round = Arc::new(AtomicUsize::new(0));
        let counter = round.clone();
        ctx.registry().create_context_loader(
            "widgets",
            fetch_fn(move |params: Params, _| {
                let round = counter.fetch_add(1, Ordering::SeqCst);
                let group = params["group"].as_str().unwrap_or_default().to_owned();
                async move {
                    Ok(match (group.as_str(), round) {
                        ("x", 0) => vec![json!({"id": 1, "group": "x"}), json!({"id": 2, "group": "x"})],
                        ("y", _) => vec![json!({"id": 10, "group": "y"})],
                        _ => vec![json!({"id": 3, "group": "x"})],
                    })
                }
            }),
            ContextLoaderOptions::default().with_index_by("group"),
        );

        ctx.load("widgets", LoadRequest::new(params(json!({"group": "x"}))))
            .await
            .unwrap();
        ctx.load("widgets", LoadRequest::new(params(json!({"group": "y"}))))
            .await
            .unwrap();
        let refetched = ctx
            .load(
                "widgets",
                LoadRequest::new(params(json!({"group": "x"}))).with_refetch(true),
            )
            .await
            .unwrap();

        assert_eq!(ids(&refetched), vec![3]);
        let cached = ctx.store().get_context(|state| ids(state.cached_data("widgets")));
        assert_eq!(cached, vec![3, 10]);
    }

    #[tokio::test]
    async fn merge_keeps_newest_entity_per_identifier() {
        let ctx = context();
        let round = Arc::new(AtomicUsize::new(0));
        let counter = round.clone();
        ctx.registry().create_context_loader(
            "nodes",
            fetch_fn(move |_, _| {
                let round = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(if round == 0 {
                        vec![json!({"uuid": "a", "status": "old"}), json!({"uuid": "b", "status": "old"})]
                    } else {
                        vec![json!({"uuid": "b", "status": "new"}), json!({"uuid": "c", "status": "new"})]
                    })
                }
            }),
            ContextLoaderOptions::default()
                .with_unique_identifier("uuid")
                .with_index_by("region"),
        );

        ctx.load("nodes", LoadRequest::new(params(json!({"region": "east"}))))
            .await
            .unwrap();
        ctx.load("nodes", LoadRequest::new(params(json!({"region": "west"}))))
            .await
            .unwrap();

        let cached = ctx.store().get_context(|state| state.cached_data("nodes").to_vec());
        assert_eq!(cached.len(), 3);
        assert!(cached.contains(&json!({"uuid": "a", "status": "old"})));
        assert!(cached.contains(&json!({"uuid": "b", "status": "new"})));
        assert!(cached.contains(&json!({"uuid": "c", "status": "new"})));
    }

    #[tokio::test]
    async fn identical_concurrent_calls_are_coalesced() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        ctx.registry().create_context_loader(
            "tenants",
            counted(&calls, vec![json!({"id": 7})]),
            ContextLoaderOptions::default(),
        );
        let request = LoadRequest::new(params(json!({"region": "east"})));

        let (a, b) = futures_util::future::join(
            ctx.load("tenants", request.clone()),
            ctx.load("tenants", request),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn refetching_calls_coalesce_too() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ctx.registry().create_context_loader(
            "flavors",
            counted(&calls, vec![json!({"id": 1})]),
            ContextLoaderOptions::default(),
        );
        let request = LoadRequest::default().with_refetch(true);

        let first = loader.load(&ctx, request.clone());
        let second = loader.load(&ctx, request.clone());
        let (a, b) = futures_util::future::join(first, second).await;
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Settled calls are forgotten, a new refetch hits the fetch function again
        loader.load(&ctx, request).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn calls_with_different_callbacks_do_not_coalesce() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = ctx.registry().create_context_loader(
            "hosts",
            counted(&calls, vec![json!({"id": 1})]),
            ContextLoaderOptions::default(),
        );
        let quiet = LoadRequest::default()
            .with_refetch(true)
            .with_options(LoadOptions::default().with_on_success(|_, _| ()));
        let loud = LoadRequest::default().with_refetch(true);

        let (a, b) = futures_util::future::join(loader.load(&ctx, quiet), loader.load(&ctx, loud)).await;
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failures_are_swallowed_and_reported() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        ctx.registry().create_context_loader(
            "sshKeys",
            fetch_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::from("keystone unavailable")) }
            }),
            ContextLoaderOptions::default(),
        );
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let options = LoadOptions::default().with_on_error(move |message, err, _| {
            sink.lock().unwrap().push(format!("{message} ({err})"));
        });

        for _ in 0..2 {
            let items = ctx
                .load("sshKeys", LoadRequest::default().with_options(options.clone()))
                .await
                .unwrap();
            assert!(items.is_empty());
        }

        // Failures are not cached: both calls reached the fetch function
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *reported.lock().unwrap(),
            vec![
                "Error when trying to retrieve Sshkeys items (keystone unavailable)".to_owned(),
                "Error when trying to retrieve Sshkeys items (keystone unavailable)".to_owned(),
            ]
        );
        assert!(ctx
            .store()
            .get_context(|state| state.cached_params("sshKeys").is_some_and(<[_]>::is_empty)));
    }

    #[tokio::test]
    async fn custom_messages_receive_params() {
        let ctx = context();
        ctx.registry().create_context_loader(
            "hosts",
            fetch_fn(|_, _| async { Ok(vec![]) }),
            ContextLoaderOptions::default()
                .with_success_message_fn(|params| format!("Loaded hosts of {}", params["region"])),
        );
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let options = LoadOptions::default().with_on_success(move |message, _| {
            sink.lock().unwrap().push(message.to_owned());
        });

        ctx.load(
            "hosts",
            LoadRequest::new(params(json!({"region": "east"}))).with_options(options),
        )
        .await
        .unwrap();

        assert_eq!(*messages.lock().unwrap(), vec![r#"Loaded hosts of "east""#.to_owned()]);
    }

    #[tokio::test]
    async fn fixed_messages_reach_callbacks() {
        let ctx = context();
        ctx.registry().create_context_loader(
            "charts",
            fetch_fn(|_, _| async { Ok(vec![json!({"id": "c1"})]) }),
            ContextLoaderOptions::default()
                .with_success_message("Charts retrieved")
                .with_error_message("Charts unavailable"),
        );
        ctx.registry().create_context_loader(
            "volumes",
            fetch_fn(|_, _| async { Err(FetchError::from("storage down")) }),
            ContextLoaderOptions::default()
                .with_success_message("Volumes retrieved")
                .with_error_message("Volumes unavailable"),
        );
        let messages = Arc::new(Mutex::new(Vec::new()));
        let (successes, errors) = (messages.clone(), messages.clone());
        let options = LoadOptions::default()
            .with_on_success(move |message, _| {
                successes.lock().unwrap().push(format!("ok: {message}"));
            })
            .with_on_error(move |message, _, _| {
                errors.lock().unwrap().push(format!("err: {message}"));
            });

        ctx.load("charts", LoadRequest::default().with_options(options.clone()))
            .await
            .unwrap();
        ctx.load("volumes", LoadRequest::default().with_options(options))
            .await
            .unwrap();

        assert_eq!(
            *messages.lock().unwrap(),
            vec!["ok: Charts retrieved".to_owned(), "err: Volumes unavailable".to_owned()]
        );
    }

    #[tokio::test]
    async fn data_mapper_applies_to_cached_and_fresh_items() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        ctx.registry().create_context_loader(
            "clusters",
            counted(&calls, vec![json!({"uuid": "a", "name": "alpha"})]),
            ContextLoaderOptions::default().with_unique_identifier("uuid"),
        );
        ctx.registry().create_context_loader(
            "nodes",
            counted(&calls, vec![json!({"uuid": "n1", "clusterUuid": "a"})]),
            ContextLoaderOptions::default()
                .with_unique_identifier("uuid")
                .with_data_mapper(data_mapper(|items: Vec<Value>, _, load_from_context: LoadFromContext| async move {
                    let clusters = load_from_context.load("clusters", Params::new(), false).await?;
                    Ok::<Vec<Value>, LoaderError>(items
                        .into_iter()
                        .map(|mut node| {
                            let name = clusters
                                .iter()
                                .find(|c| c["uuid"] == node["clusterUuid"])
                                .map(|c| c["name"].clone())
                                .unwrap_or(Value::Null);
                            node["clusterName"] = name;
                            node
                        })
                        .collect())
                })),
        );

        let fresh = ctx.load("nodes", LoadRequest::default()).await.unwrap();
        let cached = ctx.load("nodes", LoadRequest::default()).await.unwrap();

        assert_eq!(fresh, cached);
        assert_eq!(fresh[0]["clusterName"], json!("alpha"));
        // one fetch for nodes, one for clusters
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // the cache keeps the raw entities
        assert_eq!(
            ctx.store().get_context(|state| state.cached_data("nodes").to_vec()),
            vec![json!({"uuid": "n1", "clusterUuid": "a"})]
        );
    }

    #[tokio::test]
    async fn unknown_key_lookup_is_an_error() {
        let ctx = context();
        let err = ctx.load("volumes", LoadRequest::default()).await.unwrap_err();
        assert_eq!(
            err,
            LoaderError::NotFound {
                key: CCStr::from("volumes")
            }
        );
    }

    #[tokio::test]
    async fn unknown_key_inside_fetch_is_a_fetch_failure() {
        let ctx = context();
        ctx.registry().create_context_loader(
            "volumes",
            fetch_fn(|_, load_from_context: LoadFromContext| async move {
                Ok::<_, FetchError>(load_from_context.load("storage", Params::new(), false).await?)
            }),
            ContextLoaderOptions::default(),
        );
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let options = LoadOptions::default().with_on_error(move |_, err, _| {
            assert!(matches!(err, FetchError::Loader(LoaderError::NotFound { .. })));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let items = ctx
            .load("volumes", LoadRequest::default().with_options(options))
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn widgets_scenario() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        ctx.registry().create_context_loader(
            "widgets",
            fetch_fn(move |_, _| {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(if call == 0 {
                        vec![json!({"id": 1, "group": "x"}), json!({"id": 2, "group": "x"})]
                    } else {
                        vec![json!({"id": 2, "group": "x"}), json!({"id": 3, "group": "x"})]
                    })
                }
            }),
            ContextLoaderOptions::default()
                .with_unique_identifier("id")
                .with_index_by("group"),
        );
        let request = LoadRequest::new(params(json!({"group": "x"})));

        let first = ctx.load("widgets", request.clone()).await.unwrap();
        assert_eq!(ids(&first), vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = ctx.load("widgets", request.clone()).await.unwrap();
        assert_eq!(ids(&second), vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let third = ctx
            .load("widgets", request.with_refetch(true))
            .await
            .unwrap();
        assert_eq!(ids(&third), vec![2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let fingerprint = Fingerprint::from(params(json!({"group": "x"})));
        let cached = ctx
            .store()
            .get_context(|state| ids(&state.cached_items("widgets", &fingerprint)));
        assert_eq!(cached, vec![2, 3]);
    }
}
