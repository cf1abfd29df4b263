//! Top-level runtime: one service domain plus one deployment.

use std::sync::Arc;

use yardline_core::InterfaceCatalog;

use crate::activator::ActivatorRegistry;
use crate::config::RuntimeConfig;
use crate::deployment::{Deployment, DeploymentError, DeploymentListener, LifecycleState};
use crate::descriptor::AppDescriptor;
use crate::domain::{ServiceDomain, TransformerCatalog};

/// Owns a [`ServiceDomain`] and drives a [`Deployment`] of one application
/// into it.
#[derive(Debug)]
pub struct ServiceRuntime {
    config: RuntimeConfig,
    activators: ActivatorRegistry,
    domain: Arc<ServiceDomain>,
    deployment: Deployment,
}

impl ServiceRuntime {
    /// Creates a runtime whose domain is named after the node.
    #[must_use]
    pub fn new(
        descriptor: AppDescriptor,
        config: RuntimeConfig,
        activators: ActivatorRegistry,
    ) -> Self {
        let domain = Arc::new(ServiceDomain::new(config.node_name.clone()));
        let deployment = Deployment::new(descriptor, &config);
        Self {
            config,
            activators,
            domain,
            deployment,
        }
    }

    #[must_use]
    pub fn with_interface_catalog(mut self, catalog: InterfaceCatalog) -> Self {
        self.deployment = self.deployment.with_interface_catalog(catalog);
        self
    }

    #[must_use]
    pub fn with_transformer_catalog(mut self, catalog: TransformerCatalog) -> Self {
        self.deployment = self.deployment.with_transformer_catalog(catalog);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn DeploymentListener>) {
        self.deployment.add_listener(listener);
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn domain(&self) -> &Arc<ServiceDomain> {
        &self.domain
    }

    #[must_use]
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Initializes (if needed) and starts the deployment. Components are
    /// built from the activator registry and the configured environment.
    ///
    /// # Errors
    ///
    /// Propagates the [`DeploymentError`] of the failing phase.
    pub fn start(&mut self) -> Result<(), DeploymentError> {
        if self.deployment.state() == LifecycleState::New {
            let components = self.activators.components(&self.config.environment);
            self.deployment.init(Arc::clone(&self.domain), components)?;
        }
        self.deployment.start()
    }

    /// Stops (if started) and destroys the deployment.
    ///
    /// # Errors
    ///
    /// Propagates the [`DeploymentError`] of the failing phase.
    pub fn stop(&mut self) -> Result<(), DeploymentError> {
        if self.deployment.state() == LifecycleState::Started {
            self.deployment.stop()?;
        }
        self.deployment.destroy()
    }
}
