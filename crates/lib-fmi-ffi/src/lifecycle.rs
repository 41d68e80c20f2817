//! Lifecycle/state guard.
//!
//! Each dispatched [`Operation`] declares the modes it is legal in and the
//! mode it leads to. [`ModeGuard`] rejects out-of-mode calls before the
//! unit is called and applies transitions once the unit has answered.
//!
//! ```text
//! Instantiated -> InitializationMode -> EventMode <-> ContinuousTimeMode -> Terminated   (ME)
//! Instantiated -> InitializationMode -> StepComplete <-> StepInProgress -> Terminated    (CS)
//! ```

use crate::diagnostics::Severity;
use crate::error::{FmiResult, StateError};
use lib_types::{InterfaceKind, LifecycleMode, Status};
use LifecycleMode::*;

/// Every call the dispatcher can make on an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetTypesPlatform,
    GetVersion,
    SetDebugLogging,
    FreeInstance,
    SetupExperiment,
    EnterInitializationMode,
    ExitInitializationMode,
    Terminate,
    Reset,
    GetReal,
    GetInteger,
    GetBoolean,
    GetString,
    SetReal,
    SetInteger,
    SetBoolean,
    SetString,
    GetFmuState,
    SetFmuState,
    FreeFmuState,
    SerializedFmuStateSize,
    SerializeFmuState,
    DeserializeFmuState,
    GetDirectionalDerivative,
    // Model exchange
    EnterEventMode,
    NewDiscreteStates,
    EnterContinuousTimeMode,
    CompletedIntegratorStep,
    SetTime,
    SetContinuousStates,
    GetDerivatives,
    GetEventIndicators,
    GetContinuousStates,
    GetNominalsOfContinuousStates,
    // Co-simulation
    SetRealInputDerivatives,
    GetRealOutputDerivatives,
    DoStep,
    CancelStep,
    GetStatus,
    GetRealStatus,
    GetIntegerStatus,
    GetBooleanStatus,
    GetStringStatus,
}

const ANY_ACTIVE: &[LifecycleMode] = &[
    Instantiated,
    InitializationMode,
    EventMode,
    ContinuousTimeMode,
    StepComplete,
    StepInProgress,
];
const AFTER_INSTANTIATION: &[LifecycleMode] = &[InitializationMode, EventMode, ContinuousTimeMode, StepComplete];
/// Everything but a running asynchronous step.
const SETTABLE: &[LifecycleMode] = &[
    Instantiated,
    InitializationMode,
    EventMode,
    ContinuousTimeMode,
    StepComplete,
];

impl Operation {
    /// Standard procedure name.
    pub fn symbol(self) -> &'static str {
        use Operation::*;
        match self {
            GetTypesPlatform => "fmi2GetTypesPlatform",
            GetVersion => "fmi2GetVersion",
            SetDebugLogging => "fmi2SetDebugLogging",
            FreeInstance => "fmi2FreeInstance",
            SetupExperiment => "fmi2SetupExperiment",
            EnterInitializationMode => "fmi2EnterInitializationMode",
            ExitInitializationMode => "fmi2ExitInitializationMode",
            Terminate => "fmi2Terminate",
            Reset => "fmi2Reset",
            GetReal => "fmi2GetReal",
            GetInteger => "fmi2GetInteger",
            GetBoolean => "fmi2GetBoolean",
            GetString => "fmi2GetString",
            SetReal => "fmi2SetReal",
            SetInteger => "fmi2SetInteger",
            SetBoolean => "fmi2SetBoolean",
            SetString => "fmi2SetString",
            GetFmuState => "fmi2GetFMUstate",
            SetFmuState => "fmi2SetFMUstate",
            FreeFmuState => "fmi2FreeFMUstate",
            SerializedFmuStateSize => "fmi2SerializedFMUstateSize",
            SerializeFmuState => "fmi2SerializeFMUstate",
            DeserializeFmuState => "fmi2DeSerializeFMUstate",
            GetDirectionalDerivative => "fmi2GetDirectionalDerivative",
            EnterEventMode => "fmi2EnterEventMode",
            NewDiscreteStates => "fmi2NewDiscreteStates",
            EnterContinuousTimeMode => "fmi2EnterContinuousTimeMode",
            CompletedIntegratorStep => "fmi2CompletedIntegratorStep",
            SetTime => "fmi2SetTime",
            SetContinuousStates => "fmi2SetContinuousStates",
            GetDerivatives => "fmi2GetDerivatives",
            GetEventIndicators => "fmi2GetEventIndicators",
            GetContinuousStates => "fmi2GetContinuousStates",
            GetNominalsOfContinuousStates => "fmi2GetNominalsOfContinuousStates",
            SetRealInputDerivatives => "fmi2SetRealInputDerivatives",
            GetRealOutputDerivatives => "fmi2GetRealOutputDerivatives",
            DoStep => "fmi2DoStep",
            CancelStep => "fmi2CancelStep",
            GetStatus => "fmi2GetStatus",
            GetRealStatus => "fmi2GetRealStatus",
            GetIntegerStatus => "fmi2GetIntegerStatus",
            GetBooleanStatus => "fmi2GetBooleanStatus",
            GetStringStatus => "fmi2GetStringStatus",
        }
    }

    /// Severity of the record logged for this call: verbose for lifecycle
    /// calls, debug for high-frequency data exchange.
    pub fn severity(self) -> Severity {
        use Operation::*;
        match self {
            GetTypesPlatform | GetVersion | SetDebugLogging | FreeInstance | SetupExperiment
            | EnterInitializationMode | ExitInitializationMode | Terminate | Reset
            | EnterEventMode | NewDiscreteStates | EnterContinuousTimeMode | CancelStep
            | GetFmuState | SetFmuState | FreeFmuState | SerializedFmuStateSize
            | SerializeFmuState | DeserializeFmuState => Severity::Verbose,
            _ => Severity::Debug,
        }
    }

    /// Modes in which the operation may be called.
    pub fn allowed_modes(self) -> &'static [LifecycleMode] {
        use Operation::*;
        match self {
            GetTypesPlatform | GetVersion | SetDebugLogging | FreeInstance | Reset => ANY_ACTIVE,
            SetupExperiment | EnterInitializationMode => &[Instantiated],
            ExitInitializationMode => &[InitializationMode],
            Terminate => &[EventMode, ContinuousTimeMode, StepComplete],
            GetReal | GetInteger | GetBoolean | GetString | GetDirectionalDerivative => {
                AFTER_INSTANTIATION
            }
            SetReal | SetInteger | SetBoolean | SetString => SETTABLE,
            GetFmuState | SetFmuState | FreeFmuState | SerializedFmuStateSize
            | SerializeFmuState | DeserializeFmuState => SETTABLE,
            EnterEventMode => &[InitializationMode, ContinuousTimeMode],
            NewDiscreteStates | EnterContinuousTimeMode => &[EventMode],
            CompletedIntegratorStep | SetTime | SetContinuousStates | GetDerivatives
            | GetEventIndicators => &[ContinuousTimeMode],
            GetContinuousStates => &[InitializationMode, EventMode, ContinuousTimeMode],
            GetNominalsOfContinuousStates => {
                &[Instantiated, InitializationMode, EventMode, ContinuousTimeMode]
            }
            SetRealInputDerivatives => &[Instantiated, InitializationMode, StepComplete],
            GetRealOutputDerivatives | DoStep => &[StepComplete],
            CancelStep => &[StepInProgress],
            GetStatus | GetRealStatus | GetIntegerStatus | GetBooleanStatus | GetStringStatus => {
                &[StepComplete, StepInProgress]
            }
        }
    }

    /// Mode after the unit accepted the call, `None` when it stays put.
    pub fn transition(self, kind: InterfaceKind) -> Option<LifecycleMode> {
        use Operation::*;
        match self {
            EnterInitializationMode => Some(InitializationMode),
            ExitInitializationMode => Some(match kind {
                InterfaceKind::ModelExchange => EventMode,
                InterfaceKind::CoSimulation => StepComplete,
            }),
            Terminate => Some(Terminated),
            Reset => Some(Instantiated),
            EnterEventMode => Some(EventMode),
            EnterContinuousTimeMode => Some(ContinuousTimeMode),
            DoStep | CancelStep => Some(StepComplete),
            _ => None,
        }
    }
}

/// Mode state of one instance.
#[derive(Clone, Debug)]
pub struct ModeGuard {
    kind: InterfaceKind,
    mode: LifecycleMode,
    fatal: bool,
}

impl ModeGuard {
    pub fn new(kind: InterfaceKind) -> Self {
        Self {
            kind,
            mode: Instantiated,
            fatal: false,
        }
    }

    pub fn mode(&self) -> LifecycleMode {
        self.mode
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    /// The unit reported `fatal`; it must not be called again.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Reject `operation` if it may not be called now.
    pub fn check(&self, operation: Operation) -> FmiResult<()> {
        if self.mode.is_terminated() {
            return Err(StateError::AlreadyTerminated {
                operation: operation.symbol(),
            }
            .into());
        }
        if !operation.allowed_modes().contains(&self.mode) {
            return Err(StateError::IllegalMode {
                operation: operation.symbol(),
                mode: self.mode,
            }
            .into());
        }
        Ok(())
    }

    /// Apply the unit's answer to `operation`.
    pub fn apply(&mut self, operation: Operation, status: Status) {
        let previous = self.mode;
        match status {
            Status::Fatal => {
                self.fatal = true;
                self.mode = Terminated;
            }
            Status::Pending if operation == Operation::DoStep => self.mode = StepInProgress,
            s if s.is_success() => {
                if let Some(next) = operation.transition(self.kind) {
                    self.mode = next;
                }
            }
            _ => {}
        }
        if self.mode != previous {
            tracing::trace!(
                operation = operation.symbol(),
                from = %previous,
                to = %self.mode,
                "Mode transition"
            );
        }
    }

    /// An asynchronous step reported completion through a status getter.
    pub fn finish_pending_step(&mut self) {
        if self.mode == StepInProgress {
            self.mode = StepComplete;
        }
    }
}
