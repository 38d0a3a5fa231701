//! Plugin-key to constructor table used for configuration-driven loading.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::adapters::{CourtListenerAdapter, GovInfoAdapter, WestlawAdapter};
use crate::config::AdapterConfig;
use crate::data_source::LegalSource;
use crate::error::RegistryError;
use crate::http_client::HttpClient;

/// Builds an adapter instance for one configuration record.
pub type AdapterConstructor =
    Arc<dyn Fn(&AdapterConfig, Arc<dyn HttpClient>) -> Arc<dyn LegalSource> + Send + Sync>;

/// Explicit table of adapter constructors keyed by plugin name.
#[derive(Clone)]
pub struct AdapterFactory {
    http_client: Arc<dyn HttpClient>,
    constructors: BTreeMap<String, AdapterConstructor>,
}

impl AdapterFactory {
    /// Empty table sharing `http_client` with every adapter it builds.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            constructors: BTreeMap::new(),
        }
    }

    /// Table preloaded with the built-in adapters.
    pub fn builtin(http_client: Arc<dyn HttpClient>) -> Self {
        let mut factory = Self::new(http_client);
        factory.register("courtlistener", |config, http| {
            Arc::new(CourtListenerAdapter::with_http_client(http).with_id(config.id.clone()))
        });
        factory.register("govinfo", |config, http| {
            Arc::new(GovInfoAdapter::with_http_client(http).with_id(config.id.clone()))
        });
        factory.register("westlaw", |config, http| {
            Arc::new(WestlawAdapter::with_http_client(http).with_id(config.id.clone()))
        });
        factory
    }

    /// Adds or replaces the constructor for `plugin`.
    pub fn register<F>(&mut self, plugin: impl Into<String>, constructor: F)
    where
        F: Fn(&AdapterConfig, Arc<dyn HttpClient>) -> Arc<dyn LegalSource> + Send + Sync + 'static,
    {
        self.constructors.insert(plugin.into(), Arc::new(constructor));
    }

    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn build(&self, config: &AdapterConfig) -> Result<Arc<dyn LegalSource>, RegistryError> {
        let plugin = config.plugin_key();
        let constructor =
            self.constructors
                .get(plugin)
                .ok_or_else(|| RegistryError::UnknownPlugin {
                    plugin: plugin.to_owned(),
                })?;
        Ok(constructor(config, Arc::clone(&self.http_client)))
    }
}

impl Debug for AdapterFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("plugins", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
