//! Lifecycle states shared by configurations, logger configs, appenders and filters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Linear lifecycle: `Initializing -> Initialized -> Starting -> Started -> Stopping -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifeCycleState {
    Initializing = 0,
    Initialized = 1,
    Starting = 2,
    Started = 3,
    Stopping = 4,
    Stopped = 5,
}

impl LifeCycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifeCycleState::Initializing,
            1 => LifeCycleState::Initialized,
            2 => LifeCycleState::Starting,
            3 => LifeCycleState::Started,
            4 => LifeCycleState::Stopping,
            _ => LifeCycleState::Stopped,
        }
    }

    /// Upper-case name used in status messages
    pub fn to_str(&self) -> &'static str {
        match self {
            LifeCycleState::Initializing => "INITIALIZING",
            LifeCycleState::Initialized => "INITIALIZED",
            LifeCycleState::Starting => "STARTING",
            LifeCycleState::Started => "STARTED",
            LifeCycleState::Stopping => "STOPPING",
            LifeCycleState::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Atomic holder for a [`LifeCycleState`]
///
/// # Example
///
/// ```
/// use rust_logger_config::core::{LifeCycleState, StateCell};
///
/// let state = StateCell::new();
/// assert!(state.transition(LifeCycleState::Initializing, LifeCycleState::Starting));
/// // Only one caller wins a transition.
/// assert!(!state.transition(LifeCycleState::Initializing, LifeCycleState::Starting));
/// state.set(LifeCycleState::Started);
/// assert_eq!(state.get().to_string(), "STARTED");
/// ```
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// A cell in the `Initializing` state
    pub const fn new() -> Self {
        Self(AtomicU8::new(LifeCycleState::Initializing as u8))
    }

    #[inline]
    pub fn get(&self) -> LifeCycleState {
        LifeCycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: LifeCycleState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`; returns false if the current state was not `from`
    pub fn transition(&self, from: LifeCycleState, to: LifeCycleState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Start and stop for every component the configuration owns
pub trait LifeCycle: Send + Sync {
    fn state(&self) -> LifeCycleState;

    /// Move to `Started`, starting owned filters and resources first
    fn start(&self);

    /// Stop, waiting at most `timeout` for in-flight work. Returns true when
    /// the component stopped cleanly.
    fn stop(&self, timeout: Duration) -> bool;

    fn is_started(&self) -> bool {
        self.state() == LifeCycleState::Started
    }

    fn is_stopped(&self) -> bool {
        self.state() == LifeCycleState::Stopped
    }
}
