use dioxus::prelude::*;

use serde_json::Value;

use crate::context_loader::{LoadOptions, LoadRequest, LoaderContext, NotificationLevel, Params};
use crate::state_management::use_loader_context;
use crate::utils::{log_error, CCStr};

/// Identifies one triggered load of a [DataLoaderState]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    refetch: bool,
}
impl LoadTicket {
    pub fn refetch(&self) -> bool {
        self.refetch
    }
}

/// Observable state of a data loader binding
///
/// Every triggered load increments the generation and the in-flight counter.
/// When a load settles, only the latest generation may replace `data`, so an
/// older load finishing late never overwrites a newer answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataLoaderState {
    data: Vec<Value>,
    in_flight: usize,
    generation: u64,
    refetch_pending: bool,
    key: CCStr,
    params: Params,
}

impl DataLoaderState {
    pub fn new(refetch_on_mount: bool) -> Self {
        Self {
            refetch_pending: refetch_on_mount,
            ..Default::default()
        }
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Key and params of the last triggered load
    pub fn target(&self) -> (CCStr, Params) {
        (self.key.clone(), self.params.clone())
    }

    /// Starts a load of `key` with `params`, consuming the mount refetch flag
    pub fn begin_load(&mut self, key: CCStr, params: Params) -> LoadTicket {
        self.key = key;
        self.params = params;
        let refetch = std::mem::take(&mut self.refetch_pending);
        self.next_ticket(refetch)
    }

    /// Starts a new load of the last key and params
    pub fn begin_reload(&mut self, refetch: bool) -> LoadTicket {
        self.next_ticket(refetch)
    }

    fn next_ticket(&mut self, refetch: bool) -> LoadTicket {
        self.generation += 1;
        self.in_flight += 1;
        LoadTicket {
            generation: self.generation,
            refetch,
        }
    }

    /// Settles the load of `ticket`; returns true if `data` was replaced
    pub fn finish_load(&mut self, ticket: LoadTicket, data: Vec<Value>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.generation == self.generation {
            self.data = data;
            true
        } else {
            false
        }
    }
}

/// Loads through a [LoaderContext], turning every failure into a notification
#[derive(Clone)]
pub struct DataLoader {
    context: LoaderContext,
    options: LoadOptions,
}

impl DataLoader {
    pub fn new(context: LoaderContext) -> Self {
        let notifications = context.notifications().clone();
        // Created once per binding so every call shares the same callback and coalesces
        let options = LoadOptions::default().with_on_error(move |message, err, _params| {
            log::error!("{message}: {err}");
            notifications.notify(message, NotificationLevel::Error);
        });
        Self { context, options }
    }

    pub async fn load(&self, key: &str, params: Params, refetch: bool) -> Vec<Value> {
        let request = LoadRequest::new(params)
            .with_refetch(refetch)
            .with_options(self.options.clone());
        match self.context.load(key, request).await {
            Ok(items) => items,
            Err(e) => {
                let message = log_error(e);
                self.context
                    .notifications()
                    .notify(&message, NotificationLevel::Error);
                vec![]
            }
        }
    }
}

/// Handle returned by [use_data_loader]
#[derive(Clone, Copy)]
pub struct DataLoaderHandle {
    state: Signal<DataLoaderState>,
    loader: CopyValue<DataLoader>,
}

impl DataLoaderHandle {
    pub fn data(&self) -> Vec<Value> {
        self.state.read().data().to_vec()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading()
    }

    pub fn reload(&self, refetch: bool) {
        let mut state = self.state;
        let ticket = state.write().begin_reload(refetch);
        self.run(ticket);
    }

    fn trigger(&self, key: CCStr, params: Params) {
        let mut state = self.state;
        let ticket = state.write().begin_load(key, params);
        self.run(ticket);
    }

    fn run(&self, ticket: LoadTicket) {
        let mut state = self.state;
        let loader = self.loader.peek().clone();
        let (key, params) = state.peek().target();
        log::debug!("DataLoaderHandle - load {key} {params:?} ({ticket:?})");
        spawn(async move {
            let items = loader.load(&key, params, ticket.refetch()).await;
            if !state.write().finish_load(ticket, items) {
                log::debug!("DataLoaderHandle - discarding stale answer for {key}");
            }
        });
    }
}

/// Binds the loader registered under `key` to the component
///
/// Loads when the component mounts and again whenever `key` or `params`
/// change. With `refetch_on_mount`, the first load bypasses the cache.
pub fn use_data_loader(
    key: impl Into<CCStr>,
    params: Params,
    refetch_on_mount: bool,
) -> DataLoaderHandle {
    let context = use_loader_context();
    let state = use_signal(|| DataLoaderState::new(refetch_on_mount));
    let loader = use_hook(|| CopyValue::new(DataLoader::new(context)));
    let handle = DataLoaderHandle { state, loader };

    let key: CCStr = key.into();
    use_effect(use_reactive((&key, &params), move |(key, params)| {
        handle.trigger(key, params)
    }));

    handle
}
