//! Pluggable binding components.
//!
//! An [`Activator`] implements one or more binding types (`soap`, `camel`,
//! ...). The [`ActivatorRegistry`] maps binding types to factories; a
//! deployment instantiates one [`Component`] per registered binding type and
//! drives the activators through the lifecycle.

use std::fmt;
use std::sync::Arc;

use yardline_core::ServiceInterface;

use crate::config::Environment;
use crate::descriptor::{ConfigNode, ServiceDecl};
use crate::domain::{ServiceDomain, ServiceReference};

/// A binding implementation managed by a deployment.
///
/// Every method returns `anyhow::Result` since activators come from outside
/// the runtime. Only `name` and `init` are required.
pub trait Activator: Send {
    fn name(&self) -> &str;

    /// Receives the component configuration. Called once, during
    /// deployment `init`.
    fn init(&mut self, config: &ConfigNode) -> anyhow::Result<()>;

    fn start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Publishes a service. The default registers the interface in the
    /// domain.
    fn activate_service(
        &mut self,
        domain: &ServiceDomain,
        service: &ServiceDecl,
        interface: Arc<ServiceInterface>,
    ) -> anyhow::Result<ServiceReference> {
        Ok(domain.register_service(service.name.clone(), interface))
    }

    /// Withdraws a service. The default unregisters it from the domain.
    fn deactivate_service(
        &mut self,
        domain: &ServiceDomain,
        reference: &ServiceReference,
    ) -> anyhow::Result<()> {
        domain.unregister_service(reference.name());
        Ok(())
    }
}

/// Activator relying entirely on the default service registration.
#[derive(Debug, Clone, Default)]
pub struct PassThroughActivator {
    name: String,
    config: ConfigNode,
}

impl PassThroughActivator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigNode::empty(),
        }
    }

    /// Configuration received in `init`.
    #[must_use]
    pub fn config(&self) -> &ConfigNode {
        &self.config
    }
}

impl Activator for PassThroughActivator {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, config: &ConfigNode) -> anyhow::Result<()> {
        self.config = config.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// An activator with its configuration and the binding types it serves.
pub struct Component {
    name: String,
    activation_types: Vec<String>,
    activator: Box<dyn Activator>,
    config: ConfigNode,
    domain: Option<Arc<ServiceDomain>>,
}

impl Component {
    /// Creates a component serving the binding type `name`.
    pub fn new(name: impl Into<String>, activator: Box<dyn Activator>, config: ConfigNode) -> Self {
        let name = name.into();
        Self {
            activation_types: vec![name.clone()],
            name,
            activator,
            config,
            domain: None,
        }
    }

    /// Adds another binding type served by this component.
    #[must_use]
    pub fn with_activation_type(mut self, binding_type: impl Into<String>) -> Self {
        self.activation_types.push(binding_type.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn activation_types(&self) -> &[String] {
        &self.activation_types
    }

    #[must_use]
    pub fn serves(&self, binding_type: &str) -> bool {
        self.activation_types.iter().any(|t| t == binding_type)
    }

    #[must_use]
    pub fn config(&self) -> &ConfigNode {
        &self.config
    }

    #[must_use]
    pub fn activator(&self) -> &dyn Activator {
        self.activator.as_ref()
    }

    pub fn activator_mut(&mut self) -> &mut dyn Activator {
        self.activator.as_mut()
    }

    /// Hands the component configuration to the activator.
    pub(crate) fn init_activator(&mut self) -> anyhow::Result<()> {
        self.activator.init(&self.config)
    }

    /// Binds the component to the domain its services are published in.
    pub fn bind(&mut self, domain: Arc<ServiceDomain>) {
        self.domain = Some(domain);
    }

    #[must_use]
    pub fn domain(&self) -> Option<&Arc<ServiceDomain>> {
        self.domain.as_ref()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("activation_types", &self.activation_types)
            .field("activator", &self.activator.name())
            .field("bound", &self.domain.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ActivatorRegistry
// ---------------------------------------------------------------------------

/// Creates a fresh activator instance.
pub type ActivatorFactory = Arc<dyn Fn() -> Box<dyn Activator> + Send + Sync>;

/// Binding type -> activator factory, in registration order.
#[derive(Clone, Default)]
pub struct ActivatorRegistry {
    factories: Vec<(String, ActivatorFactory)>,
}

impl ActivatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any previous factory for the same
    /// binding type while keeping its position.
    pub fn register(
        &mut self,
        binding_type: impl Into<String>,
        factory: impl Fn() -> Box<dyn Activator> + Send + Sync + 'static,
    ) {
        let binding_type = binding_type.into();
        let factory: ActivatorFactory = Arc::new(factory);
        match self.factories.iter_mut().find(|(t, _)| *t == binding_type) {
            Some(slot) => slot.1 = factory,
            None => self.factories.push((binding_type, factory)),
        }
    }

    /// Instantiates the activator for a binding type. Absence is not an
    /// error here; the deployment decides what a missing activator means.
    #[must_use]
    pub fn resolve(&self, binding_type: &str) -> Option<Box<dyn Activator>> {
        self.factories
            .iter()
            .find(|(t, _)| t == binding_type)
            .map(|(_, factory)| factory())
    }

    /// Registered binding types, in registration order.
    #[must_use]
    pub fn binding_types(&self) -> Vec<&str> {
        self.factories.iter().map(|(t, _)| t.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// One component per registered binding type, configured from the
    /// environment properties under `<binding_type>.`.
    #[must_use]
    pub fn components(&self, environment: &Environment) -> Vec<Component> {
        self.factories
            .iter()
            .map(|(binding_type, factory)| {
                let config = ConfigNode::from_properties(
                    binding_type.as_str(),
                    environment.properties_with_prefix(binding_type),
                );
                Component::new(binding_type.as_str(), factory(), config)
            })
            .collect()
    }
}

impl fmt::Debug for ActivatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivatorRegistry")
            .field("binding_types", &self.binding_types())
            .finish()
    }
}
