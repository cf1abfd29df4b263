//! Observers of deployment lifecycle transitions.

use std::sync::Arc;

use super::Deployment;
use crate::descriptor::ServiceDecl;

/// Receives lifecycle notifications from a [`Deployment`].
///
/// Every hook defaults to a no-op. Errors returned by a hook are logged and
/// otherwise ignored: they never interrupt the transition or keep later
/// listeners from being notified.
#[allow(unused_variables)]
pub trait DeploymentListener: Send + Sync {
    fn initializing(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn initialized(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn starting(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per service, after it is visible in the domain.
    fn service_deployed(&self, deployment: &Deployment, service: &ServiceDecl) -> anyhow::Result<()> {
        Ok(())
    }

    fn started(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn stopping(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn stopped(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn destroying(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }

    fn destroyed(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Calls `hook` on every listener in order, logging failures.
pub(crate) fn notify_all<F>(listeners: &[Arc<dyn DeploymentListener>], event: &str, hook: F)
where
    F: Fn(&dyn DeploymentListener) -> anyhow::Result<()>,
{
    for listener in listeners {
        if let Err(e) = hook(listener.as_ref()) {
            tracing::warn!("deployment listener failed on {}: {:#}", event, e);
        }
    }
}

/// Listener that logs every transition at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl LoggingListener {
    fn log(event: &str, deployment: &Deployment) {
        tracing::info!("deployment {} ({}) {}", deployment.name(), deployment.id(), event);
    }
}

impl DeploymentListener for LoggingListener {
    fn initializing(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("initializing", deployment);
        Ok(())
    }

    fn initialized(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("initialized", deployment);
        Ok(())
    }

    fn starting(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("starting", deployment);
        Ok(())
    }

    fn service_deployed(&self, deployment: &Deployment, service: &ServiceDecl) -> anyhow::Result<()> {
        tracing::info!(
            "deployment {} deployed service {} via {}",
            deployment.name(),
            service.name,
            service.binding.binding_type
        );
        Ok(())
    }

    fn started(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("started", deployment);
        Ok(())
    }

    fn stopping(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("stopping", deployment);
        Ok(())
    }

    fn stopped(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("stopped", deployment);
        Ok(())
    }

    fn destroying(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("destroying", deployment);
        Ok(())
    }

    fn destroyed(&self, deployment: &Deployment) -> anyhow::Result<()> {
        Self::log("destroyed", deployment);
        Ok(())
    }
}
