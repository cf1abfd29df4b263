//! Yardline Runtime: service domain, binding activators, and the deployment
//! lifecycle engine.

pub mod activator;
pub mod config;
pub mod deployment;
pub mod descriptor;
pub mod domain;
pub mod logging;
pub mod runtime;

pub use activator::{Activator, ActivatorFactory, ActivatorRegistry, Component, PassThroughActivator};
pub use config::{ConfigError, Environment, RuntimeConfig};
pub use deployment::{Deployment, DeploymentError, DeploymentListener, LifecycleState};
pub use descriptor::{AppDescriptor, BindingDecl, ConfigNode, InterfaceDecl, ServiceDecl, TransformerDecl};
pub use domain::{ServiceDomain, ServiceReference, Transformer, TransformerCatalog, TransformerRegistry};
pub use runtime::ServiceRuntime;
