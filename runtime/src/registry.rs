use crate::RegistryConfig;
use crate::error::RegistryError;
use crate::metrics::{
    ACTIONS_TOTAL, CONTROLS_EXECUTED, CONTROLS_FAILED, REDUCER_DURATION_SECONDS, RESOLVERS_STARTED,
};
use serde_json::{Value, json};
use sitekit_data_core::stringify::stringify_object;
use sitekit_data_core::{Action, ActionCreator, Resume, Routine, State, Step, StoreFragment};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Notify, RwLock, broadcast};

/// An action applied to a store's reducer, as seen by subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedAction {
    /// Name of the store whose reducer received the action
    pub store: String,
    /// The action
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolutionStatus {
    Started,
    Finished,
}

struct StoreEntry {
    name: String,
    fragment: StoreFragment,
    state: RwLock<State>,
    /// Resolution status by selector, then by canonical argument key
    resolutions: Mutex<HashMap<String, HashMap<String, ResolutionStatus>>>,
    resolved: Notify,
}

impl StoreEntry {
    fn new(name: String, fragment: StoreFragment) -> Self {
        Self {
            state: RwLock::new(fragment.initial_state.clone()),
            name,
            fragment,
            resolutions: Mutex::new(HashMap::new()),
            resolved: Notify::new(),
        }
    }

    /// Mark the resolution as started. Returns false if it already was.
    async fn claim(&self, selector: &str, key: &str) -> bool {
        let mut resolutions = self.resolutions.lock().await;
        let by_args = resolutions.entry(selector.to_string()).or_default();
        if by_args.contains_key(key) {
            return false;
        }
        by_args.insert(key.to_string(), ResolutionStatus::Started);
        true
    }

    async fn finish(&self, selector: &str, key: &str) {
        {
            let mut resolutions = self.resolutions.lock().await;
            if let Some(status) = resolutions.get_mut(selector).and_then(|by_args| by_args.get_mut(key)) {
                *status = ResolutionStatus::Finished;
            }
        }
        self.resolved.notify_waiters();
    }

    async fn status(&self, selector: &str, key: &str) -> Option<ResolutionStatus> {
        let resolutions = self.resolutions.lock().await;
        resolutions.get(selector).and_then(|by_args| by_args.get(key)).copied()
    }

    async fn invalidate(&self, selector: &str) {
        let removed = self.resolutions.lock().await.remove(selector);
        if removed.is_some() {
            tracing::debug!(store = %self.name, selector, "invalidated resolutions");
        }
        self.resolved.notify_waiters();
    }

    async fn select(&self, selector: &str, args: &[Value]) -> Result<Value, RegistryError> {
        let selector_fn = self.fragment.selectors.get(selector).ok_or_else(|| {
            RegistryError::UnknownSelector {
                store: self.name.clone(),
                selector: selector.to_string(),
            }
        })?;

        let state = self.state.read().await;
        Ok(selector_fn.select(&state, args))
    }
}

fn resolution_key(args: &[Value]) -> String {
    stringify_object(&Value::Array(args.to_vec()))
}

/// Registry of named stores.
///
/// Cheap to clone; clones share the same stores. The registry is an explicit
/// object owned by the application, so independent registries (one per test,
/// for instance) never see each other's stores.
///
/// # Concurrency
///
/// - Reducers run while holding the store's state write lock; readers see
///   either the state before or after an action, never a mix
/// - Controls run without any lock held, so routines of the same store
///   interleave at their `await` points
/// - Applied actions are broadcast to subscribers after the lock is released
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: RegistryConfig,
    stores: RwLock<HashMap<String, Arc<StoreEntry>>>,
    actions: broadcast::Sender<DispatchedAction>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with a custom configuration
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let (actions, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            inner: Arc::new(RegistryInner {
                config,
                stores: RwLock::new(HashMap::new()),
                actions,
            }),
        }
    }

    /// The registry's configuration
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Register a store under `name`, starting from its initial state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StoreAlreadyRegistered`] if the name is taken.
    #[tracing::instrument(skip(self, fragment))]
    pub async fn register_store(&self, name: &str, fragment: StoreFragment) -> Result<(), RegistryError> {
        let mut stores = self.inner.stores.write().await;
        if stores.contains_key(name) {
            return Err(RegistryError::StoreAlreadyRegistered(name.to_string()));
        }

        tracing::debug!(
            actions = fragment.actions.len(),
            selectors = fragment.selectors.len(),
            resolvers = fragment.resolvers.len(),
            "registered store"
        );
        stores.insert(name.to_string(), Arc::new(StoreEntry::new(name.to_string(), fragment)));
        Ok(())
    }

    /// Names of every registered store, sorted
    pub async fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.stores.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn entry(&self, store: &str) -> Result<Arc<StoreEntry>, RegistryError> {
        self.inner
            .stores
            .read()
            .await
            .get(store)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStore(store.to_string()))
    }

    /// Call the action creator `action` of `store` with `args`.
    ///
    /// A plain creator's action goes to its control if the store has one for
    /// that type, otherwise to the reducer; the result is the control's value
    /// or the action itself. A routine creator is driven to completion and its
    /// completion value returned.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownStore`] / [`RegistryError::UnknownAction`]
    /// - [`RegistryError::Store`] if the creator rejects `args`
    /// - [`RegistryError::Unhandled`] if a control or routine fails and nothing
    ///   handles the error
    #[tracing::instrument(skip(self, args))]
    pub async fn dispatch(&self, store: &str, action: &str, args: Vec<Value>) -> Result<Value, RegistryError> {
        let entry = self.entry(store).await?;
        let creator = entry.fragment.actions.get(action).cloned().ok_or_else(|| {
            RegistryError::UnknownAction {
                store: store.to_string(),
                action: action.to_string(),
            }
        })?;

        match creator {
            ActionCreator::Plain(create) => {
                let action = create(args.as_slice())?;
                self.dispatch_to(&entry, action).await
            },
            ActionCreator::Routine(create) => self.run_routine(&entry, create(args.as_slice())).await,
        }
    }

    /// Dispatch an already-built action to `store`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownStore`]
    /// - [`RegistryError::Unhandled`] if the action's control fails
    #[tracing::instrument(skip(self, action), fields(kind = %action.kind))]
    pub async fn dispatch_action(&self, store: &str, action: Action) -> Result<Value, RegistryError> {
        let entry = self.entry(store).await?;
        self.dispatch_to(&entry, action).await
    }

    async fn dispatch_to(&self, entry: &StoreEntry, action: Action) -> Result<Value, RegistryError> {
        let echo = json!({ "type": action.kind, "payload": action.payload });
        let has_control = entry.fragment.controls.contains_key(&action.kind);

        match self.handle_yield(entry, action).await {
            Ok(value) if has_control => Ok(value),
            Ok(_) => Ok(echo),
            Err(error) => Err(RegistryError::Unhandled(error)),
        }
    }

    /// Evaluate `selector` of `store` against the current state.
    ///
    /// If the selector has a resolver that has not run for these `args`, it is
    /// started in the background (unless disabled in [`RegistryConfig`]) and
    /// the current, possibly empty, value is returned right away. Subscribe
    /// to actions or use [`Registry::resolve_select`] to observe the result.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStore`] / [`RegistryError::UnknownSelector`]
    #[tracing::instrument(skip(self, args))]
    pub async fn select(&self, store: &str, selector: &str, args: &[Value]) -> Result<Value, RegistryError> {
        let entry = self.entry(store).await?;
        let value = entry.select(selector, args).await?;

        if self.inner.config.resolve_on_select && entry.fragment.resolvers.contains_key(selector) {
            let key = resolution_key(args);
            if entry.claim(selector, &key).await {
                let registry = self.clone();
                let selector = selector.to_string();
                let args = args.to_vec();
                tokio::spawn(async move {
                    registry.run_resolution(entry, selector, key, args).await;
                });
            }
        }

        Ok(value)
    }

    /// Run the selector's resolver for `args` if it has not run yet, wait for
    /// it (or for a resolution already in progress) to finish, then select.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStore`] / [`RegistryError::UnknownSelector`]
    #[tracing::instrument(skip(self, args))]
    pub async fn resolve_select(&self, store: &str, selector: &str, args: &[Value]) -> Result<Value, RegistryError> {
        let entry = self.entry(store).await?;
        if !entry.fragment.selectors.contains_key(selector) {
            return Err(RegistryError::UnknownSelector {
                store: store.to_string(),
                selector: selector.to_string(),
            });
        }

        if entry.fragment.resolvers.contains_key(selector) {
            let key = resolution_key(args);
            if entry.claim(selector, &key).await {
                self.run_resolution(Arc::clone(&entry), selector.to_string(), key, args.to_vec())
                    .await;
            } else {
                loop {
                    let notified = entry.resolved.notified();
                    if entry.status(selector, &key).await != Some(ResolutionStatus::Started) {
                        break;
                    }
                    notified.await;
                }
            }
        }

        entry.select(selector, args).await
    }

    /// Whether the resolver of `selector` has finished for `args`
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStore`]
    pub async fn has_finished_resolution(
        &self,
        store: &str,
        selector: &str,
        args: &[Value],
    ) -> Result<bool, RegistryError> {
        let entry = self.entry(store).await?;
        Ok(entry.status(selector, &resolution_key(args)).await == Some(ResolutionStatus::Finished))
    }

    /// Forget every resolution of `selector`, so the next read runs its
    /// resolver again
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStore`]
    pub async fn invalidate_resolution_for_store_selector(
        &self,
        store: &str,
        selector: &str,
    ) -> Result<(), RegistryError> {
        self.entry(store).await?.invalidate(selector).await;
        Ok(())
    }

    /// Snapshot of a store's state
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStore`]
    pub async fn state(&self, store: &str) -> Result<State, RegistryError> {
        Ok(self.entry(store).await?.state.read().await.clone())
    }

    /// Subscribe to every action applied to any store's reducer from now on.
    ///
    /// Subscribers that fall more than the configured broadcast capacity
    /// behind receive a `Lagged` error and miss the skipped actions.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<DispatchedAction> {
        self.inner.actions.subscribe()
    }

    async fn run_resolution(&self, entry: Arc<StoreEntry>, selector: String, key: String, args: Vec<Value>) {
        let Some(resolver) = entry.fragment.resolvers.get(&selector).cloned() else {
            entry.finish(&selector, &key).await;
            return;
        };

        metrics::counter!(RESOLVERS_STARTED).increment(1);
        tracing::debug!(store = %entry.name, selector = %selector, "starting resolver");

        if let Err(error) = self.run_routine(&entry, resolver.routine(&args)).await {
            tracing::warn!(
                store = %entry.name,
                selector = %selector,
                error = %error,
                "resolver failed"
            );
        }

        entry.finish(&selector, &key).await;
    }

    /// Drive `routine` to completion.
    ///
    /// Delegated routines are kept on an explicit stack: the top routine is
    /// the one being resumed, and its completion (or failure) resumes the
    /// routine below it.
    async fn run_routine(&self, entry: &StoreEntry, routine: Box<dyn Routine>) -> Result<Value, RegistryError> {
        let mut stack: Vec<Box<dyn Routine>> = vec![routine];
        let mut input = Resume::Start;

        while let Some(current) = stack.last_mut() {
            match current.resume(input) {
                Step::Yield(action) => {
                    input = match self.handle_yield(entry, action).await {
                        Ok(value) => Resume::Value(value),
                        Err(error) => Resume::Error(error),
                    };
                },
                Step::Delegate(routine) => {
                    stack.push(routine);
                    input = Resume::Start;
                },
                Step::Select { selector, args } => {
                    input = Resume::Value(entry.select(&selector, &args).await?);
                },
                Step::Invalidate { selector } => {
                    entry.invalidate(&selector).await;
                    input = Resume::Value(Value::Null);
                },
                Step::Complete(value) => {
                    stack.pop();
                    if stack.is_empty() {
                        return Ok(value);
                    }
                    input = Resume::Value(value);
                },
                Step::Fail(error) => {
                    stack.pop();
                    if stack.is_empty() {
                        return Err(RegistryError::Unhandled(error));
                    }
                    input = Resume::Error(error);
                },
            }
        }

        Ok(Value::Null)
    }

    /// Run the control for `action`, or apply it to the reducer when there
    /// is none
    async fn handle_yield(&self, entry: &StoreEntry, action: Action) -> Result<Value, Value> {
        let Some(control) = entry.fragment.controls.get(&action.kind) else {
            self.apply(entry, action).await;
            return Ok(Value::Null);
        };

        metrics::counter!(CONTROLS_EXECUTED).increment(1);
        tracing::debug!(store = %entry.name, action = %action.kind, "running control");

        let kind = action.kind.clone();
        let result = control.call(action).await;
        if let Err(error) = &result {
            metrics::counter!(CONTROLS_FAILED).increment(1);
            tracing::debug!(store = %entry.name, action = %kind, error = %error, "control failed");
        }
        result
    }

    /// Reduce `action` into the store's state and broadcast it.
    ///
    /// The broadcast happens under the write lock, so subscribers see a
    /// store's actions in the order they were applied.
    async fn apply(&self, entry: &StoreEntry, action: Action) {
        let mut state = entry.state.write().await;
        tracing::trace!(store = %entry.name, action = %action.kind, "applying action");

        let start = Instant::now();
        let current = std::mem::take(&mut *state);
        *state = entry.fragment.reducer.reduce(current, &action);
        metrics::histogram!(REDUCER_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
        metrics::counter!(ACTIONS_TOTAL).increment(1);

        // No subscribers is fine
        let _ = self.inner.actions.send(DispatchedAction {
            store: entry.name.clone(),
            action,
        });
    }
}
