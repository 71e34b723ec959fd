use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Lifecycle state shared by the controller, its loops, and its call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Constructed, not yet initialized.
    Idle,
    /// Background loops running, decisions accepted.
    Active,
    /// Shut down; terminal.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Cloneable lifecycle handle backed by a watch channel.
///
/// Loops hold a [`LifecycleWatch`] and exit as soon as the state leaves
/// [`LifecycleState::Active`].
#[derive(Debug, Clone)]
pub struct Lifecycle {
    sender: Arc<watch::Sender<LifecycleState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Creates a handle in the idle state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(LifecycleState::Idle);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.sender.borrow()
    }

    /// Whether decisions and loops may run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Moves `Idle -> Active`. Returns `false` from any other state.
    pub fn activate(&self) -> bool {
        self.sender.send_if_modified(|state| {
            if *state == LifecycleState::Idle {
                *state = LifecycleState::Active;
                true
            } else {
                false
            }
        })
    }

    /// Moves to `Stopped`. Returns `false` when already stopped.
    pub fn stop(&self) -> bool {
        self.sender.send_if_modified(|state| {
            if *state == LifecycleState::Stopped {
                false
            } else {
                *state = LifecycleState::Stopped;
                true
            }
        })
    }

    /// Subscribes a loop to state changes.
    #[must_use]
    pub fn watch(&self) -> LifecycleWatch {
        LifecycleWatch {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving side used by background loops.
#[derive(Debug, Clone)]
pub struct LifecycleWatch {
    receiver: watch::Receiver<LifecycleState>,
}

impl LifecycleWatch {
    /// Whether the owner is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.receiver.borrow() == LifecycleState::Active
    }

    /// Resolves once the state is no longer `Active`, or the owner is dropped.
    pub async fn deactivated(&mut self) {
        // A closed channel means the owning handle is gone.
        let _ = self
            .receiver
            .wait_for(|state| *state != LifecycleState::Active)
            .await;
    }
}
