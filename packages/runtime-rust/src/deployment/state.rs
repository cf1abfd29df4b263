//! Deployment lifecycle states and the transitions between them.
//!
//! State machine: New -> Initializing -> Initialized -> Starting -> Started
//! -> Stopping -> Stopped -> Destroying -> Destroyed. `destroy` may also be
//! entered straight from `Initialized`.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    New,
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
    Destroying,
    Destroyed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Destroying => "destroying",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// One of the four lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Start,
    Stop,
    Destroy,
}

impl Phase {
    /// State held while the phase runs.
    #[must_use]
    pub fn transitional(self) -> LifecycleState {
        match self {
            Self::Init => LifecycleState::Initializing,
            Self::Start => LifecycleState::Starting,
            Self::Stop => LifecycleState::Stopping,
            Self::Destroy => LifecycleState::Destroying,
        }
    }

    /// State reached when the phase completes.
    #[must_use]
    pub fn completed(self) -> LifecycleState {
        match self {
            Self::Init => LifecycleState::Initialized,
            Self::Start => LifecycleState::Started,
            Self::Stop => LifecycleState::Stopped,
            Self::Destroy => LifecycleState::Destroyed,
        }
    }

    /// Whether the phase may begin from `state`.
    #[must_use]
    pub fn can_enter_from(self, state: LifecycleState) -> bool {
        matches!(
            (self, state),
            (Self::Init, LifecycleState::New)
                | (Self::Start, LifecycleState::Initialized)
                | (Self::Stop, LifecycleState::Started)
                | (Self::Destroy, LifecycleState::Initialized | LifecycleState::Stopped)
        )
    }
}
