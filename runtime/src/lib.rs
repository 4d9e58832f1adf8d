//! # Site Kit Data Runtime
//!
//! The [`Registry`](registry::Registry) that runs stores defined with
//! `sitekit-data-core`.
//!
//! ## Core Components
//!
//! - **Registry**: owns every registered store and its state
//! - **Dispatch**: applies plain actions and drives routines, running controls
//!   for the actions they yield
//! - **Resolution**: runs a selector's resolver once per argument set, on the
//!   first read
//!
//! ## Example
//!
//! ```
//! use sitekit_data_core::{StoreFragment, combine_stores};
//! use sitekit_data_runtime::registry::Registry;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::new();
//! registry
//!     .register_store(
//!         "core/site",
//!         StoreFragment::new().with_selector("getReferenceURL", |state, _| {
//!             state.get("referenceURL").cloned().unwrap_or_default()
//!         }),
//!     )
//!     .await
//!     .unwrap();
//!
//! let value = registry.select("core/site", "getReferenceURL", &[]).await.unwrap();
//! assert_eq!(value, json!(null));
//! # });
//! ```

/// Metric names recorded by the registry
pub mod metrics;

/// The store registry
pub mod registry;

pub use registry::{DispatchedAction, Registry};

/// Error types for the registry
pub mod error {
    use serde_json::Value;
    use sitekit_data_core::StoreError;
    use thiserror::Error;

    /// Errors that can occur during registry operations
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum RegistryError {
        /// No store is registered under this name
        #[error("Store {0:?} is not registered")]
        UnknownStore(String),

        /// A store is already registered under this name
        #[error("Store {0:?} is already registered")]
        StoreAlreadyRegistered(String),

        /// The store has no action creator of this name
        #[error("Store {store:?} has no action {action:?}")]
        UnknownAction {
            /// Store name
            store: String,
            /// Action creator name
            action: String,
        },

        /// The store has no selector of this name
        #[error("Store {store:?} has no selector {selector:?}")]
        UnknownSelector {
            /// Store name
            store: String,
            /// Selector name
            selector: String,
        },

        /// An action creator rejected its input
        #[error(transparent)]
        Store(#[from] StoreError),

        /// A routine or control failed and nothing handled the error
        ///
        /// Carries the error value as the control produced it.
        #[error("Unhandled error: {0}")]
        Unhandled(Value),
    }
}

/// Registry configuration
///
/// # Example
///
/// ```
/// use sitekit_data_runtime::RegistryConfig;
///
/// let config = RegistryConfig::default()
///     .with_broadcast_capacity(64)
///     .with_resolve_on_select(false);
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of applied actions buffered for slow subscribers
    pub broadcast_capacity: usize,
    /// Whether `select` starts the selector's resolver on first read
    pub resolve_on_select: bool,
}

impl RegistryConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, resolve_on_select: bool) -> Self {
        Self {
            broadcast_capacity,
            resolve_on_select,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Enable or disable resolver spawning on `select`
    #[must_use]
    pub const fn with_resolve_on_select(mut self, enabled: bool) -> Self {
        self.resolve_on_select = enabled;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            resolve_on_select: true,
        }
    }
}
