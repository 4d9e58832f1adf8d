//! # Site Kit Data Stores
//!
//! The data stores of Site Kit, each a combination of fetch stores and a
//! hand-written fragment, plus [`HttpApi`](http::HttpApi), the production
//! [`Api`].
//!
//! | Store | Module |
//! |-------|--------|
//! | `core/site` | [`site`] |
//! | `core/user` | [`user`] |
//! | `modules/adsense` | [`adsense`] |
//! | `modules/tagmanager` | [`tagmanager`] |
//!
//! ## Example
//!
//! ```no_run
//! use sitekit_data_runtime::Registry;
//! use sitekit_data_stores::config::SiteBootstrap;
//! use sitekit_data_stores::{http::HttpApi, register_all, user};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//! let api = Arc::new(HttpApi::from_env()?);
//! register_all(&registry, api, &SiteBootstrap::from_env()?).await?;
//!
//! let authenticated = registry
//!     .resolve_select(user::STORE_NAME, "isAuthenticated", &[])
//!     .await?;
//! println!("authenticated: {authenticated}");
//! # Ok(())
//! # }
//! ```

pub mod adsense;
pub mod config;
pub mod http;
pub mod site;
pub mod tagmanager;
pub mod user;
pub mod validation;

use config::SiteBootstrap;
use sitekit_data_core::Api;
use sitekit_data_runtime::Registry;
use sitekit_data_runtime::error::RegistryError;
use std::sync::Arc;

/// Build every store against `api` and register it on `registry`.
///
/// `bootstrap` seeds the `core/site` info selectors.
///
/// # Errors
///
/// Returns [`RegistryError::StoreAlreadyRegistered`] if one of the store
/// names is taken, or [`RegistryError::Store`] if a store fails to build.
pub async fn register_all(
    registry: &Registry,
    api: Arc<dyn Api>,
    bootstrap: &SiteBootstrap,
) -> Result<(), RegistryError> {
    registry
        .register_store(site::STORE_NAME, site::store(Arc::clone(&api), bootstrap)?)
        .await?;
    registry.register_store(user::STORE_NAME, user::store(Arc::clone(&api))?).await?;
    registry.register_store(adsense::STORE_NAME, adsense::store(Arc::clone(&api))?).await?;
    registry.register_store(tagmanager::STORE_NAME, tagmanager::store(api)?).await?;

    tracing::info!("registered Site Kit data stores");
    Ok(())
}
