//! Deployment lifecycle engine.
//!
//! A [`Deployment`] takes an [`AppDescriptor`] through
//! `init -> start -> stop -> destroy`, resolving an activator for every
//! declared service binding and publishing the services into a shared
//! [`ServiceDomain`].
//!
//! `start` resolves everything (activators, interfaces, transformers) before
//! the domain is touched, so a resolution failure leaves no partial
//! registration behind.

pub mod listener;
pub mod state;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use uuid::Uuid;
use yardline_core::{
    ContractReadError, InterfaceCatalog, InterfaceError, QName, ServiceInterface,
    UnknownInterfaceTypeError, WsdlReader,
};

pub use listener::{DeploymentListener, LoggingListener};
pub use state::{LifecycleState, Phase};

use crate::activator::{Activator, Component};
use crate::config::RuntimeConfig;
use crate::descriptor::{AppDescriptor, InterfaceDecl, ServiceDecl};
use crate::domain::{ServiceDomain, ServiceReference, Transformer, TransformerCatalog, TransformerError};
use listener::notify_all;

/// Errors raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("No activator found for binding type '{binding_type}' used by service {service}")]
    MissingActivator { service: QName, binding_type: String },
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("deployment is not bound to a service domain")]
    Unbound,
    #[error(transparent)]
    UnknownInterfaceType(#[from] UnknownInterfaceTypeError),
    #[error("Invalid interface for service {service}: {source}")]
    Interface {
        service: QName,
        #[source]
        source: InterfaceError,
    },
    #[error(transparent)]
    ContractRead(#[from] ContractReadError),
    #[error("Unknown transformer type '{transformer_type}'")]
    UnknownTransformerType { transformer_type: String },
    #[error("failed to create transformer of type '{transformer_type}': {source}")]
    TransformerFactory {
        transformer_type: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Activator for component '{component}' failed: {source}")]
    Activator {
        component: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<TransformerError> for DeploymentError {
    fn from(e: TransformerError) -> Self {
        match e {
            TransformerError::UnknownType { transformer_type } => {
                Self::UnknownTransformerType { transformer_type }
            }
            TransformerError::Factory {
                transformer_type,
                source,
            } => Self::TransformerFactory {
                transformer_type,
                source,
            },
        }
    }
}

fn activator_error(component: &Component, source: anyhow::Error) -> DeploymentError {
    DeploymentError::Activator {
        component: component.name().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Start plan
// ---------------------------------------------------------------------------

/// Everything `start` needs, resolved before any side effect.
struct StartPlan {
    domain: Arc<ServiceDomain>,
    services: Vec<ResolvedService>,
    transformers: Vec<Arc<dyn Transformer>>,
}

struct ResolvedService {
    component: usize,
    decl: ServiceDecl,
    interface: Arc<ServiceInterface>,
}

struct DeployedService {
    component: usize,
    reference: ServiceReference,
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// One application instance moving through the lifecycle.
///
/// Lifecycle operations take `&mut self`; share a deployment across threads
/// as `Arc<parking_lot::Mutex<Deployment>>`. Observers on other threads can
/// watch [`state_handle`](Self::state_handle) without locking.
pub struct Deployment {
    id: Uuid,
    descriptor: AppDescriptor,
    reader: WsdlReader,
    interfaces: InterfaceCatalog,
    transformer_catalog: TransformerCatalog,
    state: Arc<ArcSwap<LifecycleState>>,
    domain: Option<Arc<ServiceDomain>>,
    components: Vec<Component>,
    listeners: Vec<Arc<dyn DeploymentListener>>,
    deployed: Vec<DeployedService>,
    transformers: Vec<Arc<dyn Transformer>>,
}

impl Deployment {
    /// Creates a deployment in the `New` state. WSDL locations resolve
    /// against the configured search roots.
    #[must_use]
    pub fn new(descriptor: AppDescriptor, config: &RuntimeConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            reader: WsdlReader::with_resolver(config.resolver()),
            interfaces: InterfaceCatalog::new(),
            transformer_catalog: TransformerCatalog::new(),
            state: Arc::new(ArcSwap::from_pointee(LifecycleState::New)),
            domain: None,
            components: Vec::new(),
            listeners: Vec::new(),
            deployed: Vec::new(),
            transformers: Vec::new(),
        }
    }

    /// Native interfaces available to services declared as `native`.
    #[must_use]
    pub fn with_interface_catalog(mut self, catalog: InterfaceCatalog) -> Self {
        self.interfaces = catalog;
        self
    }

    #[must_use]
    pub fn with_transformer_catalog(mut self, catalog: TransformerCatalog) -> Self {
        self.transformer_catalog = catalog;
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn DeploymentListener>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &AppDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Shared handle to the lifecycle state for lock-free observers.
    #[must_use]
    pub fn state_handle(&self) -> Arc<ArcSwap<LifecycleState>> {
        Arc::clone(&self.state)
    }

    #[must_use]
    pub fn domain(&self) -> Option<&Arc<ServiceDomain>> {
        self.domain.as_ref()
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Activator of the component serving `binding_type`.
    #[must_use]
    pub fn find_activator(&self, binding_type: &str) -> Option<&dyn Activator> {
        self.components
            .iter()
            .find(|c| c.serves(binding_type))
            .map(Component::activator)
    }

    /// Names of the services this deployment currently has published, in
    /// registration order.
    #[must_use]
    pub fn deployed_services(&self) -> Vec<QName> {
        self.deployed
            .iter()
            .map(|d| d.reference.name().clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Binds the deployment to `domain` and initializes every component's
    /// activator with its configuration. No service is registered.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::InvalidTransition`] unless the deployment
    /// is `New`, or [`DeploymentError::Activator`] if an activator rejects
    /// its configuration (the deployment returns to `New`).
    pub fn init(
        &mut self,
        domain: Arc<ServiceDomain>,
        components: Vec<Component>,
    ) -> Result<(), DeploymentError> {
        let previous = self.begin(Phase::Init)?;
        notify_all(&self.listeners, "initializing", |l| l.initializing(self));

        if let Err(e) = self.init_components(domain, components) {
            self.set_state(previous);
            return Err(e);
        }

        self.complete(Phase::Init);
        notify_all(&self.listeners, "initialized", |l| l.initialized(self));
        Ok(())
    }

    /// Resolves and publishes every declared service and transformer.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::InvalidTransition`] unless the deployment
    /// is `Initialized`. Resolution errors (missing activator, unknown
    /// interface type, unreadable WSDL, unknown transformer type) leave the
    /// domain untouched; activator failures while publishing roll back what
    /// was registered. Either way the deployment returns to `Initialized`.
    pub fn start(&mut self) -> Result<(), DeploymentError> {
        let previous = self.begin(Phase::Start)?;
        notify_all(&self.listeners, "starting", |l| l.starting(self));

        let result = self.resolve().and_then(|plan| self.apply(plan));
        if let Err(e) = result {
            tracing::warn!("deployment {} failed to start: {}", self.name(), e);
            self.set_state(previous);
            return Err(e);
        }

        self.complete(Phase::Start);
        notify_all(&self.listeners, "started", |l| l.started(self));
        Ok(())
    }

    /// Withdraws the deployment's services and transformers and stops the
    /// activators. Activator errors are logged and do not halt the teardown.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::InvalidTransition`] unless the deployment
    /// is `Started`.
    pub fn stop(&mut self) -> Result<(), DeploymentError> {
        self.begin(Phase::Stop)?;
        notify_all(&self.listeners, "stopping", |l| l.stopping(self));

        if let Some(domain) = self.domain.clone() {
            self.undeploy(&domain);
        }
        self.stop_components(self.components.len());

        self.complete(Phase::Stop);
        notify_all(&self.listeners, "stopped", |l| l.stopped(self));
        Ok(())
    }

    /// Destroys the components. The deployment cannot be used afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::InvalidTransition`] unless the deployment
    /// is `Initialized` or `Stopped`.
    pub fn destroy(&mut self) -> Result<(), DeploymentError> {
        self.begin(Phase::Destroy)?;
        notify_all(&self.listeners, "destroying", |l| l.destroying(self));

        for component in self.components.iter_mut().rev() {
            if let Err(e) = component.activator_mut().destroy() {
                tracing::warn!("failed to destroy component {}: {:#}", component.name(), e);
            }
        }
        self.components.clear();
        self.domain = None;

        self.complete(Phase::Destroy);
        notify_all(&self.listeners, "destroyed", |l| l.destroyed(self));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase internals
    // -----------------------------------------------------------------------

    fn set_state(&self, state: LifecycleState) {
        self.state.store(Arc::new(state));
    }

    /// Checks the entry condition and moves to the phase's transitional
    /// state. Returns the state the phase began from.
    fn begin(&self, phase: Phase) -> Result<LifecycleState, DeploymentError> {
        let current = self.state();
        if !phase.can_enter_from(current) {
            return Err(DeploymentError::InvalidTransition {
                from: current,
                to: phase.transitional(),
            });
        }
        self.set_state(phase.transitional());
        tracing::info!("deployment {} {}", self.name(), phase.transitional());
        Ok(current)
    }

    fn complete(&self, phase: Phase) {
        self.set_state(phase.completed());
        tracing::info!("deployment {} {}", self.name(), phase.completed());
    }

    fn init_components(
        &mut self,
        domain: Arc<ServiceDomain>,
        mut components: Vec<Component>,
    ) -> Result<(), DeploymentError> {
        let mut failure = None;
        for (index, component) in components.iter_mut().enumerate() {
            component.bind(Arc::clone(&domain));
            if let Err(source) = component.init_activator() {
                failure = Some((index, activator_error(component, source)));
                break;
            }
            tracing::debug!("initialized component {}", component.name());
        }
        if let Some((initialized, e)) = failure {
            for component in components[..initialized].iter_mut().rev() {
                if let Err(err) = component.activator_mut().destroy() {
                    tracing::warn!("failed to destroy component {}: {:#}", component.name(), err);
                }
            }
            return Err(e);
        }
        self.domain = Some(domain);
        self.components = components;
        Ok(())
    }

    fn resolve(&self) -> Result<StartPlan, DeploymentError> {
        let domain = self.domain.clone().ok_or(DeploymentError::Unbound)?;

        let mut services = Vec::with_capacity(self.descriptor.services.len());
        for decl in &self.descriptor.services {
            let binding_type = &decl.binding.binding_type;
            let component = self
                .components
                .iter()
                .position(|c| c.serves(binding_type))
                .ok_or_else(|| DeploymentError::MissingActivator {
                    service: decl.name.clone(),
                    binding_type: binding_type.clone(),
                })?;
            let interface = self.build_interface(decl)?;
            services.push(ResolvedService {
                component,
                decl: decl.clone(),
                interface: Arc::new(interface),
            });
        }

        let transformers = self
            .descriptor
            .transformers
            .iter()
            .map(|decl| self.transformer_catalog.create(decl))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StartPlan {
            domain,
            services,
            transformers,
        })
    }

    fn build_interface(&self, decl: &ServiceDecl) -> Result<ServiceInterface, DeploymentError> {
        match &decl.interface {
            InterfaceDecl::Native { type_name } => self
                .interfaces
                .resolve(type_name)?
                .to_interface()
                .map_err(|source| DeploymentError::Interface {
                    service: decl.name.clone(),
                    source,
                }),
            InterfaceDecl::Wsdl {
                location,
                port_type,
            } => Ok(self.reader.read_interface(location, port_type.as_deref())?),
        }
    }

    fn apply(&mut self, plan: StartPlan) -> Result<(), DeploymentError> {
        let StartPlan {
            domain,
            services,
            transformers,
        } = plan;

        let mut started = 0;
        let mut failure = None;
        for component in &mut self.components {
            if let Err(source) = component.activator_mut().start() {
                failure = Some(activator_error(component, source));
                break;
            }
            started += 1;
        }
        if let Some(e) = failure {
            self.stop_components(started);
            return Err(e);
        }

        let registry = domain.transformer_registry();
        for transformer in transformers {
            registry.add_transformer(Arc::clone(&transformer));
            self.transformers.push(transformer);
        }

        for ResolvedService {
            component,
            decl,
            interface,
        } in services
        {
            let activated = self.components[component]
                .activator_mut()
                .activate_service(&domain, &decl, interface);
            match activated {
                Ok(reference) => {
                    tracing::debug!(
                        "deployed service {} through component {}",
                        decl.name,
                        self.components[component].name()
                    );
                    self.deployed.push(DeployedService {
                        component,
                        reference,
                    });
                    notify_all(&self.listeners, "service_deployed", |l| {
                        l.service_deployed(self, &decl)
                    });
                }
                Err(source) => {
                    let e = activator_error(&self.components[component], source);
                    self.undeploy(&domain);
                    self.stop_components(self.components.len());
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Deactivates published services in reverse order and removes the
    /// transformers this deployment registered.
    fn undeploy(&mut self, domain: &ServiceDomain) {
        while let Some(DeployedService {
            component,
            reference,
        }) = self.deployed.pop()
        {
            let Some(component) = self.components.get_mut(component) else {
                continue;
            };
            if let Err(e) = component.activator_mut().deactivate_service(domain, &reference) {
                tracing::warn!("failed to deactivate service {}: {:#}", reference.name(), e);
            }
        }

        let registry = domain.transformer_registry();
        for transformer in self.transformers.drain(..) {
            if !registry.remove_registered(&transformer) {
                tracing::debug!(
                    "transformer {} from {} to {} was replaced; leaving it registered",
                    transformer.name(),
                    transformer.from_type(),
                    transformer.to_type()
                );
            }
        }
    }

    /// Stops the first `count` components in reverse order.
    fn stop_components(&mut self, count: usize) {
        for component in self.components.iter_mut().take(count).rev() {
            if let Err(e) = component.activator_mut().stop() {
                tracing::warn!("failed to stop component {}: {:#}", component.name(), e);
            }
        }
    }
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("state", &self.state())
            .field("components", &self.components)
            .field("deployed", &self.deployed_services())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use yardline_core::{ExchangePattern, MethodSignature, NativeInterface};

    use super::*;
    use crate::activator::{ActivatorRegistry, PassThroughActivator};
    use crate::config::Environment;
    use crate::descriptor::{BindingDecl, ConfigNode, TransformerDecl};

    const NS: &str = "urn:orders";

    /// Records hook invocations; optionally fails every hook.
    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingListener {
        fn failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn record(&self, event: &str) -> anyhow::Result<()> {
            self.events.lock().push(event.to_string());
            if self.fail {
                anyhow::bail!("listener error");
            }
            Ok(())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl DeploymentListener for RecordingListener {
        fn initializing(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("initializing")
        }
        fn initialized(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("initialized")
        }
        fn starting(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("starting")
        }
        fn service_deployed(&self, d: &Deployment, service: &ServiceDecl) -> anyhow::Result<()> {
            assert!(d.domain().unwrap().get_service(&service.name).is_some());
            self.record(&format!("service_deployed:{}", service.name.local_name()))
        }
        fn started(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("started")
        }
        fn stopping(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("stopping")
        }
        fn stopped(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("stopped")
        }
        fn destroying(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("destroying")
        }
        fn destroyed(&self, _: &Deployment) -> anyhow::Result<()> {
            self.record("destroyed")
        }
    }

    /// Activator that refuses to publish services named `Bad`.
    struct PickyActivator;

    impl Activator for PickyActivator {
        fn name(&self) -> &str {
            "picky"
        }

        fn init(&mut self, _config: &ConfigNode) -> anyhow::Result<()> {
            Ok(())
        }

        fn activate_service(
            &mut self,
            domain: &ServiceDomain,
            service: &ServiceDecl,
            interface: Arc<ServiceInterface>,
        ) -> anyhow::Result<ServiceReference> {
            if service.name.local_name() == "Bad" {
                anyhow::bail!("cannot publish {}", service.name);
            }
            Ok(domain.register_service(service.name.clone(), interface))
        }
    }

    fn native_service(name: &str, binding_type: &str) -> ServiceDecl {
        ServiceDecl {
            name: QName::new(NS, name),
            interface: InterfaceDecl::Native {
                type_name: "orders.OrderService".to_string(),
            },
            binding: BindingDecl {
                binding_type: binding_type.to_string(),
                config: ConfigNode::empty(),
            },
        }
    }

    fn catalog() -> InterfaceCatalog {
        let mut catalog = InterfaceCatalog::new();
        catalog.register(NativeInterface::new(
            "orders.OrderService",
            vec![
                MethodSignature::new("submit", Some("orders.Order"), Some("int")),
                MethodSignature::new("cancel", Some("int"), None),
            ],
        ));
        catalog
    }

    fn registry() -> ActivatorRegistry {
        let mut registry = ActivatorRegistry::new();
        registry.register("soap", || Box::new(PassThroughActivator::new("soap")) as Box<dyn Activator>);
        registry.register("picky", || Box::new(PickyActivator) as Box<dyn Activator>);
        registry
    }

    fn deployment(services: Vec<ServiceDecl>) -> Deployment {
        let descriptor = AppDescriptor {
            name: "orders-app".to_string(),
            services,
            transformers: Vec::new(),
        };
        Deployment::new(descriptor, &RuntimeConfig::default()).with_interface_catalog(catalog())
    }

    fn init(deployment: &mut Deployment) -> Arc<ServiceDomain> {
        let domain = Arc::new(ServiceDomain::new("test"));
        deployment
            .init(Arc::clone(&domain), registry().components(&Environment::new()))
            .unwrap();
        domain
    }

    const FULL_LIFECYCLE: [&str; 9] = [
        "initializing",
        "initialized",
        "starting",
        "service_deployed:OrderService",
        "started",
        "stopping",
        "stopped",
        "destroying",
        "destroyed",
    ];

    fn run_full_lifecycle(listener: Arc<RecordingListener>) {
        let mut d = deployment(vec![native_service("OrderService", "soap")]);
        d.add_listener(listener);
        let domain = init(&mut d);
        d.start().unwrap();
        assert_eq!(domain.service_count(), 1);
        d.stop().unwrap();
        assert_eq!(domain.service_count(), 0);
        d.destroy().unwrap();
        assert_eq!(d.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn notifications_follow_lifecycle_order() {
        let listener = Arc::new(RecordingListener::default());
        run_full_lifecycle(Arc::clone(&listener));
        assert_eq!(listener.events(), FULL_LIFECYCLE);
    }

    #[test]
    fn failing_listener_does_not_interrupt_lifecycle() {
        let listener = Arc::new(RecordingListener::failing());
        run_full_lifecycle(Arc::clone(&listener));
        assert_eq!(listener.events(), FULL_LIFECYCLE);
    }

    #[test]
    fn later_listeners_still_notified_after_failure() {
        let failing = Arc::new(RecordingListener::failing());
        let ok = Arc::new(RecordingListener::default());
        let mut d = deployment(Vec::new());
        d.add_listener(failing);
        d.add_listener(Arc::clone(&ok) as Arc<dyn DeploymentListener>);
        init(&mut d);
        assert_eq!(ok.events(), vec!["initializing", "initialized"]);
    }

    #[test]
    fn missing_activator_aborts_start() {
        let mut d = deployment(vec![
            native_service("OrderService", "soap"),
            native_service("Ledger", "jms"),
        ]);
        let domain = init(&mut d);

        let err = d.start().unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::MissingActivator { ref binding_type, .. } if binding_type == "jms"
        ));
        assert_eq!(domain.service_count(), 0);
        assert_eq!(d.state(), LifecycleState::Initialized);
        assert!(d.deployed_services().is_empty());
    }

    #[test]
    fn unknown_interface_type_message() {
        let mut service = native_service("OrderService", "soap");
        service.interface = InterfaceDecl::Native {
            type_name: "org.acme.Blah".to_string(),
        };
        let mut d = deployment(vec![service]);
        let domain = init(&mut d);

        let err = d.start().unwrap_err();
        assert_eq!(err.to_string(), "Failed to load Service interface type 'org.acme.Blah'.");
        assert_eq!(domain.service_count(), 0);
    }

    #[test]
    fn wsdl_interface_is_read_from_search_roots() {
        let mut config = RuntimeConfig::default();
        config
            .wsdl_search_roots
            .push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../core-rust/fixtures"));

        let mut service = native_service("HelloService", "soap");
        service.interface = InterfaceDecl::Wsdl {
            location: "HelloWebService.wsdl".to_string(),
            port_type: Some("HelloWebService".to_string()),
        };
        let descriptor = AppDescriptor {
            name: "hello".to_string(),
            services: vec![service],
            transformers: Vec::new(),
        };
        let mut d = Deployment::new(descriptor, &config);
        let domain = init(&mut d);
        d.start().unwrap();

        let reference = domain.get_service(&QName::new(NS, "HelloService")).unwrap();
        let op = reference.interface().operation("sayHello").unwrap();
        assert_eq!(op.input_type(), &QName::new("urn:yardline-metadata-wsdl", "sayHello"));
        assert_eq!(op.pattern(), ExchangePattern::RequestResponse);
    }

    fn transforming_deployment(name: &str) -> Deployment {
        let mut transformers = TransformerCatalog::new();
        transformers.register_declared("xslt");
        let descriptor = AppDescriptor {
            name: name.to_string(),
            services: vec![native_service(&format!("{name}-svc"), "soap")],
            transformers: vec![TransformerDecl {
                from: QName::new(NS, "submit"),
                to: QName::new("urn:legacy", "order"),
                transformer_type: "xslt".to_string(),
            }],
        };
        Deployment::new(descriptor, &RuntimeConfig::default())
            .with_interface_catalog(catalog())
            .with_transformer_catalog(transformers)
    }

    #[test]
    fn transformers_registered_and_removed() {
        let mut d = transforming_deployment("orders-app");
        let domain = init(&mut d);

        d.start().unwrap();
        let registry = domain.transformer_registry();
        assert!(registry.has_transformer(&QName::new(NS, "submit"), &QName::new("urn:legacy", "order")));

        d.stop().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn stopping_keeps_transformer_replaced_by_another_deployment() {
        let domain = Arc::new(ServiceDomain::new("shared"));
        let mut first = transforming_deployment("first");
        let mut second = transforming_deployment("second");
        for d in [&mut first, &mut second] {
            d.init(Arc::clone(&domain), registry().components(&Environment::new()))
                .unwrap();
            d.start().unwrap();
        }

        let from = QName::new(NS, "submit");
        let to = QName::new("urn:legacy", "order");
        first.stop().unwrap();
        assert!(domain.transformer_registry().has_transformer(&from, &to));

        second.stop().unwrap();
        assert!(domain.transformer_registry().is_empty());
    }

    #[test]
    fn unknown_transformer_type_leaves_domain_untouched() {
        let descriptor = AppDescriptor {
            name: "orders-app".to_string(),
            services: vec![native_service("OrderService", "soap")],
            transformers: vec![TransformerDecl {
                from: QName::new(NS, "a"),
                to: QName::new(NS, "b"),
                transformer_type: "smooks".to_string(),
            }],
        };
        let mut d = Deployment::new(descriptor, &RuntimeConfig::default())
            .with_interface_catalog(catalog());
        let domain = init(&mut d);

        let err = d.start().unwrap_err();
        assert!(matches!(err, DeploymentError::UnknownTransformerType { .. }));
        assert_eq!(domain.service_count(), 0);
        assert!(domain.transformer_registry().is_empty());
    }

    #[test]
    fn activation_failure_rolls_back() {
        let mut d = deployment(vec![
            native_service("Good", "picky"),
            native_service("Bad", "picky"),
        ]);
        let domain = init(&mut d);

        let err = d.start().unwrap_err();
        assert!(matches!(err, DeploymentError::Activator { ref component, .. } if component == "picky"));
        assert_eq!(domain.service_count(), 0);
        assert_eq!(d.state(), LifecycleState::Initialized);

        // Still destroyable after a failed start.
        d.destroy().unwrap();
    }

    /// Counts `destroy` calls.
    struct CountingActivator {
        destroyed: Arc<AtomicUsize>,
    }

    impl Activator for CountingActivator {
        fn name(&self) -> &str {
            "counting"
        }

        fn init(&mut self, _config: &ConfigNode) -> anyhow::Result<()> {
            Ok(())
        }

        fn destroy(&mut self) -> anyhow::Result<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenActivator;

    impl Activator for BrokenActivator {
        fn name(&self) -> &str {
            "broken"
        }

        fn init(&mut self, _config: &ConfigNode) -> anyhow::Result<()> {
            anyhow::bail!("bad configuration")
        }
    }

    #[test]
    fn failed_init_destroys_initialized_components() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let mut registry = ActivatorRegistry::new();
        registry.register("soap", move || {
            Box::new(CountingActivator {
                destroyed: Arc::clone(&counter),
            }) as Box<dyn Activator>
        });
        registry.register("broken", || Box::new(BrokenActivator) as Box<dyn Activator>);

        let mut d = deployment(Vec::new());
        let err = d
            .init(Arc::new(ServiceDomain::new("test")), registry.components(&Environment::new()))
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Activator { ref component, .. } if component == "broken"));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(d.state(), LifecycleState::New);
        assert!(d.components().is_empty());
    }

    #[test]
    fn invalid_transitions_rejected() {
        let mut d = deployment(Vec::new());
        assert!(matches!(
            d.start(),
            Err(DeploymentError::InvalidTransition {
                from: LifecycleState::New,
                to: LifecycleState::Starting
            })
        ));
        assert!(d.stop().is_err());
        assert!(d.destroy().is_err());

        init(&mut d);
        assert!(d.stop().is_err());
        let again = d.init(Arc::new(ServiceDomain::new("x")), Vec::new());
        assert!(matches!(again, Err(DeploymentError::InvalidTransition { .. })));

        d.destroy().unwrap();
        assert!(d.start().is_err());
        assert_eq!(d.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn find_activator_by_binding_type() {
        let mut d = deployment(Vec::new());
        assert!(d.find_activator("soap").is_none());
        init(&mut d);
        assert_eq!(d.find_activator("soap").unwrap().name(), "soap");
        assert!(d.find_activator("jms").is_none());
    }

    #[test]
    fn state_handle_visible_across_threads() {
        let mut d = deployment(vec![native_service("OrderService", "soap")]);
        let handle = d.state_handle();
        init(&mut d);
        d.start().unwrap();

        let observed = std::thread::spawn(move || **handle.load()).join().unwrap();
        assert_eq!(observed, LifecycleState::Started);
    }

    #[test]
    fn concurrent_deployments_share_domain() {
        let domain = Arc::new(ServiceDomain::new("shared"));
        let deployments: Vec<_> = (0..4)
            .map(|i| Arc::new(Mutex::new(deployment(vec![native_service(&format!("Svc{i}"), "soap")]))))
            .collect();

        std::thread::scope(|s| {
            for d in &deployments {
                let domain = Arc::clone(&domain);
                s.spawn(move || {
                    let mut d = d.lock();
                    d.init(domain, registry().components(&Environment::new())).unwrap();
                    d.start().unwrap();
                });
            }
        });

        assert_eq!(domain.service_count(), 4);
        for d in &deployments {
            assert_eq!(d.lock().deployed_services().len(), 1);
        }
    }
}
