//! Service domain: the shared registry of published services and
//! transformers.
//!
//! A domain outlives the deployments that register into it. Several
//! deployments may register concurrently from different threads; both maps
//! are `DashMap`s.

pub mod transformer;

use std::sync::Arc;

use dashmap::DashMap;
use yardline_core::{QName, ServiceInterface};

pub use transformer::{
    DeclaredTransformer, Transformer, TransformerCatalog, TransformerError, TransformerFactory,
    TransformerRegistry,
};

/// Handle to a service registered in a [`ServiceDomain`].
#[derive(Debug, Clone)]
pub struct ServiceReference {
    name: QName,
    interface: Arc<ServiceInterface>,
}

impl ServiceReference {
    #[must_use]
    pub fn new(name: QName, interface: Arc<ServiceInterface>) -> Self {
        Self { name, interface }
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    #[must_use]
    pub fn interface(&self) -> &Arc<ServiceInterface> {
        &self.interface
    }
}

/// Registry of services and transformers shared by deployments.
#[derive(Debug)]
pub struct ServiceDomain {
    name: String,
    services: DashMap<QName, ServiceReference>,
    transformers: TransformerRegistry,
}

impl ServiceDomain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: DashMap::new(),
            transformers: TransformerRegistry::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publishes a service. A service already registered under `name` is
    /// replaced.
    pub fn register_service(
        &self,
        name: QName,
        interface: Arc<ServiceInterface>,
    ) -> ServiceReference {
        let reference = ServiceReference::new(name.clone(), interface);
        if self.services.insert(name.clone(), reference.clone()).is_some() {
            tracing::warn!("service {} re-registered in domain {}", name, self.name);
        } else {
            tracing::debug!("registered service {} in domain {}", name, self.name);
        }
        reference
    }

    pub fn unregister_service(&self, name: &QName) -> Option<ServiceReference> {
        let removed = self.services.remove(name).map(|(_, r)| r);
        if removed.is_some() {
            tracing::debug!("unregistered service {} from domain {}", name, self.name);
        }
        removed
    }

    #[must_use]
    pub fn get_service(&self, name: &QName) -> Option<ServiceReference> {
        self.services.get(name).map(|entry| entry.value().clone())
    }

    /// Registered service names, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<QName> {
        let mut names: Vec<QName> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn transformer_registry(&self) -> &TransformerRegistry {
        &self.transformers
    }
}
