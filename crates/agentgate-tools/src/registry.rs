//! In-memory server registry.
//!
//! An injected, explicitly owned store. Cloning a [`ServerRegistry`] yields
//! another handle onto the same map.

use agentgate_protocol::{GatewayError, GatewayResult, ServerConfig, Transport};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Arc<RwLock<IndexMap<String, ServerConfig>>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: impl IntoIterator<Item = ServerConfig>) -> Self {
        let registry = Self::new();
        for config in configs {
            registry.upsert(config);
        }
        registry
    }

    /// Insert or overwrite by name.
    #[instrument(skip(self, config), fields(server = %config.name, transport = %config.transport))]
    pub fn register(&self, config: ServerConfig) -> GatewayResult<()> {
        config.validate()?;
        self.upsert(config);
        info!("server registered");
        Ok(())
    }

    fn upsert(&self, config: ServerConfig) {
        self.servers.write().insert(config.name.clone(), config);
    }

    /// Remove by name. Returns whether an entry existed.
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.servers.write().shift_remove(name).is_some();
        if removed {
            info!("server removed");
        }
        removed
    }

    /// Replace the entry stored under `name` with `config`, which may carry a
    /// different name. The removal and insertion happen under one lock.
    #[instrument(skip(self, config), fields(new_name = %config.name))]
    pub fn replace(&self, name: &str, config: ServerConfig) -> GatewayResult<()> {
        config.validate()?;
        let mut servers = self.servers.write();
        if servers.shift_remove(name).is_none() {
            return Err(not_found(name));
        }
        servers.insert(config.name.clone(), config);
        info!("server replaced");
        Ok(())
    }

    /// Consistent snapshot in registration order.
    pub fn list(&self) -> Vec<ServerConfig> {
        self.servers.read().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> GatewayResult<ServerConfig> {
        self.servers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    pub fn contains_endpoint(&self, base_url: &str, transport: Transport) -> bool {
        self.servers
            .read()
            .values()
            .any(|config| config.base_url == base_url && config.transport == transport)
    }

    pub fn names(&self) -> Vec<String> {
        self.servers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }

    fn unknown(&self, name: &str) -> GatewayError {
        let mut known = self.names();
        known.sort();
        let known = if known.is_empty() {
            "none".to_owned()
        } else {
            known.join(", ")
        };
        GatewayError::NotFound(format!("server '{name}' (known servers: {known})"))
    }
}

fn not_found(name: &str) -> GatewayError {
    GatewayError::NotFound(format!("server '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, base_url: &str) -> ServerConfig {
        ServerConfig::new(name, base_url, Transport::JsonRpc)
    }

    #[test]
    fn register_upserts_by_name() {
        let registry = ServerRegistry::new();
        registry.register(config("a", "http://one")).unwrap();
        registry.register(config("a", "http://two")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().base_url, "http://two");
    }

    #[test]
    fn remove_reports_presence() {
        let registry = ServerRegistry::from_configs([config("a", "http://one")]);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn get_unknown_lists_known_names() {
        let registry = ServerRegistry::from_configs([config("b", "http://b"), config("a", "http://a")]);
        let error = registry.get("zzz").unwrap_err();
        assert!(matches!(error, GatewayError::NotFound(_)));
        assert!(error.to_string().contains("known servers: a, b"));
    }

    #[test]
    fn replace_renames_atomically() {
        let registry = ServerRegistry::from_configs([config("old", "http://x"), config("keep", "http://k")]);
        registry.replace("old", config("new", "http://x")).unwrap();
        assert_eq!(registry.names(), vec!["keep", "new"]);
        assert!(matches!(
            registry.replace("ghost", config("ghost", "http://g")),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let registry = ServerRegistry::new();
        assert!(registry.register(config("", "http://x")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let registry = ServerRegistry::new();
        let handle = registry.clone();
        handle.register(config("a", "http://a")).unwrap();
        assert!(registry.contains_endpoint("http://a", Transport::JsonRpc));
        assert!(!registry.contains_endpoint("http://a", Transport::DeviceRest));
    }
}
