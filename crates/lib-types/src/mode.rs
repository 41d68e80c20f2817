//! Lifecycle modes of an FMU instance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current phase of one instance in the FMI 2.0 state machine.
///
/// Model exchange walks `Instantiated → InitializationMode →
/// {EventMode ⇄ ContinuousTimeMode} → Terminated`; co-simulation uses
/// `StepComplete`/`StepInProgress` instead of the event/continuous pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleMode {
    /// Instance created, `fmi2EnterInitializationMode` not yet called.
    Instantiated,
    /// Between enter and exit of initialization.
    InitializationMode,
    /// Model exchange: discrete states may change.
    EventMode,
    /// Model exchange: the integrator is advancing continuous states.
    ContinuousTimeMode,
    /// Co-simulation: ready for the next `fmi2DoStep`.
    StepComplete,
    /// Co-simulation: an asynchronous `fmi2DoStep` returned pending.
    StepInProgress,
    /// Terminated explicitly or by a fatal status. Absorbing.
    Terminated,
}

impl LifecycleMode {
    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instantiated => "Instantiated",
            Self::InitializationMode => "InitializationMode",
            Self::EventMode => "EventMode",
            Self::ContinuousTimeMode => "ContinuousTimeMode",
            Self::StepComplete => "StepComplete",
            Self::StepInProgress => "StepInProgress",
            Self::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for LifecycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
