//! Dynamic binding table.
//!
//! Resolves every FMI 2.0 procedure the requested interface needs, once,
//! into typed function pointers. Mandatory procedures that are missing make
//! binding fail; optional ones are recorded as absent. No procedure is
//! called while binding.

use crate::callbacks::CallbackFunctions;
use crate::error::{BindingError, FmiResult};
use crate::loader::SymbolResolver;
use lib_types::{EventInfo, FmiVersion, InterfaceKind};
use std::ffi::{c_char, c_double, c_int, c_uint, c_void};
use std::sync::Arc;

/// `fmi2Component`.
pub type Component = *mut c_void;
/// `fmi2FMUstate`.
pub type RawFmuState = *mut c_void;
/// `fmi2Boolean`.
pub type FmiBoolean = c_int;
/// `fmi2Status`.
pub type RawStatus = c_int;

// ---------------------------------------------------------------
// Common procedures
// ---------------------------------------------------------------

pub type GetTypesPlatformFn = unsafe extern "C" fn() -> *const c_char;
pub type GetVersionFn = unsafe extern "C" fn() -> *const c_char;
pub type SetDebugLoggingFn =
    unsafe extern "C" fn(Component, FmiBoolean, usize, *const *const c_char) -> RawStatus;
pub type InstantiateFn = unsafe extern "C" fn(
    instance_name: *const c_char,
    fmu_type: c_int,
    guid: *const c_char,
    resource_location: *const c_char,
    functions: *const CallbackFunctions,
    visible: FmiBoolean,
    logging_on: FmiBoolean,
) -> Component;
pub type FreeInstanceFn = unsafe extern "C" fn(Component);
pub type SetupExperimentFn = unsafe extern "C" fn(
    Component,
    tolerance_defined: FmiBoolean,
    tolerance: c_double,
    start_time: c_double,
    stop_time_defined: FmiBoolean,
    stop_time: c_double,
) -> RawStatus;
pub type ComponentFn = unsafe extern "C" fn(Component) -> RawStatus;
pub type GetRealFn = unsafe extern "C" fn(Component, *const c_uint, usize, *mut c_double) -> RawStatus;
pub type GetIntegerFn = unsafe extern "C" fn(Component, *const c_uint, usize, *mut c_int) -> RawStatus;
pub type GetBooleanFn = unsafe extern "C" fn(Component, *const c_uint, usize, *mut FmiBoolean) -> RawStatus;
pub type GetStringFn =
    unsafe extern "C" fn(Component, *const c_uint, usize, *mut *const c_char) -> RawStatus;
pub type SetRealFn = unsafe extern "C" fn(Component, *const c_uint, usize, *const c_double) -> RawStatus;
pub type SetIntegerFn = unsafe extern "C" fn(Component, *const c_uint, usize, *const c_int) -> RawStatus;
pub type SetBooleanFn =
    unsafe extern "C" fn(Component, *const c_uint, usize, *const FmiBoolean) -> RawStatus;
pub type SetStringFn =
    unsafe extern "C" fn(Component, *const c_uint, usize, *const *const c_char) -> RawStatus;
pub type GetFmuStateFn = unsafe extern "C" fn(Component, *mut RawFmuState) -> RawStatus;
pub type SetFmuStateFn = unsafe extern "C" fn(Component, RawFmuState) -> RawStatus;
pub type FreeFmuStateFn = unsafe extern "C" fn(Component, *mut RawFmuState) -> RawStatus;
pub type SerializedFmuStateSizeFn = unsafe extern "C" fn(Component, RawFmuState, *mut usize) -> RawStatus;
pub type SerializeFmuStateFn =
    unsafe extern "C" fn(Component, RawFmuState, *mut c_char, usize) -> RawStatus;
pub type DeserializeFmuStateFn =
    unsafe extern "C" fn(Component, *const c_char, usize, *mut RawFmuState) -> RawStatus;
pub type GetDirectionalDerivativeFn = unsafe extern "C" fn(
    Component,
    unknown_refs: *const c_uint,
    n_unknown: usize,
    known_refs: *const c_uint,
    n_known: usize,
    dv_known: *const c_double,
    dv_unknown: *mut c_double,
) -> RawStatus;

// ---------------------------------------------------------------
// Model exchange procedures
// ---------------------------------------------------------------

pub type NewDiscreteStatesFn = unsafe extern "C" fn(Component, *mut EventInfo) -> RawStatus;
pub type CompletedIntegratorStepFn = unsafe extern "C" fn(
    Component,
    no_set_fmu_state_prior: FmiBoolean,
    enter_event_mode: *mut FmiBoolean,
    terminate_simulation: *mut FmiBoolean,
) -> RawStatus;
pub type SetTimeFn = unsafe extern "C" fn(Component, c_double) -> RawStatus;
pub type SetContinuousStatesFn = unsafe extern "C" fn(Component, *const c_double, usize) -> RawStatus;
/// Shared by the derivative, event indicator, state and nominal getters.
pub type GetRealVectorFn = unsafe extern "C" fn(Component, *mut c_double, usize) -> RawStatus;

// ---------------------------------------------------------------
// Co-simulation procedures
// ---------------------------------------------------------------

pub type SetRealInputDerivativesFn = unsafe extern "C" fn(
    Component,
    *const c_uint,
    usize,
    orders: *const c_int,
    values: *const c_double,
) -> RawStatus;
pub type GetRealOutputDerivativesFn = unsafe extern "C" fn(
    Component,
    *const c_uint,
    usize,
    orders: *const c_int,
    values: *mut c_double,
) -> RawStatus;
pub type DoStepFn = unsafe extern "C" fn(
    Component,
    current_communication_point: c_double,
    communication_step_size: c_double,
    no_set_fmu_state_prior: FmiBoolean,
) -> RawStatus;
pub type GetStatusFn = unsafe extern "C" fn(Component, c_int, *mut RawStatus) -> RawStatus;
pub type GetRealStatusFn = unsafe extern "C" fn(Component, c_int, *mut c_double) -> RawStatus;
pub type GetIntegerStatusFn = unsafe extern "C" fn(Component, c_int, *mut c_int) -> RawStatus;
pub type GetBooleanStatusFn = unsafe extern "C" fn(Component, c_int, *mut FmiBoolean) -> RawStatus;
pub type GetStringStatusFn = unsafe extern "C" fn(Component, c_int, *mut *const c_char) -> RawStatus;

/// Procedures both interfaces export.
#[derive(Clone, Copy, Debug)]
pub struct CommonFunctions {
    pub get_types_platform: GetTypesPlatformFn,
    pub get_version: GetVersionFn,
    pub set_debug_logging: SetDebugLoggingFn,
    pub instantiate: InstantiateFn,
    pub free_instance: FreeInstanceFn,
    pub setup_experiment: SetupExperimentFn,
    pub enter_initialization_mode: ComponentFn,
    pub exit_initialization_mode: ComponentFn,
    pub terminate: ComponentFn,
    pub reset: ComponentFn,
    pub get_real: GetRealFn,
    pub get_integer: GetIntegerFn,
    pub get_boolean: GetBooleanFn,
    pub get_string: GetStringFn,
    pub set_real: SetRealFn,
    pub set_integer: SetIntegerFn,
    pub set_boolean: SetBooleanFn,
    pub set_string: SetStringFn,
    pub get_fmu_state: Option<GetFmuStateFn>,
    pub set_fmu_state: Option<SetFmuStateFn>,
    pub free_fmu_state: Option<FreeFmuStateFn>,
    pub serialized_fmu_state_size: Option<SerializedFmuStateSizeFn>,
    pub serialize_fmu_state: Option<SerializeFmuStateFn>,
    pub deserialize_fmu_state: Option<DeserializeFmuStateFn>,
    pub get_directional_derivative: Option<GetDirectionalDerivativeFn>,
}

/// Model exchange procedures.
#[derive(Clone, Copy, Debug)]
pub struct MeFunctions {
    pub enter_event_mode: ComponentFn,
    pub new_discrete_states: NewDiscreteStatesFn,
    pub enter_continuous_time_mode: ComponentFn,
    pub set_time: SetTimeFn,
    pub set_continuous_states: SetContinuousStatesFn,
    pub get_derivatives: GetRealVectorFn,
    pub get_event_indicators: GetRealVectorFn,
    pub get_continuous_states: GetRealVectorFn,
    pub completed_integrator_step: Option<CompletedIntegratorStepFn>,
    pub get_nominals_of_continuous_states: Option<GetRealVectorFn>,
}

/// Co-simulation procedures.
#[derive(Clone, Copy, Debug)]
pub struct CsFunctions {
    pub do_step: DoStepFn,
    pub set_real_input_derivatives: Option<SetRealInputDerivativesFn>,
    pub get_real_output_derivatives: Option<GetRealOutputDerivativesFn>,
    pub cancel_step: Option<ComponentFn>,
    pub get_status: Option<GetStatusFn>,
    pub get_real_status: Option<GetRealStatusFn>,
    pub get_integer_status: Option<GetIntegerStatusFn>,
    pub get_boolean_status: Option<GetBooleanStatusFn>,
    pub get_string_status: Option<GetStringStatusFn>,
}

/// Interface-specific part of the table.
#[derive(Clone, Copy, Debug)]
pub enum InterfaceFunctions {
    ModelExchange(MeFunctions),
    CoSimulation(CsFunctions),
}

/// Resolved procedures for one interface of one loaded module.
///
/// Immutable after construction; share it in an `Arc` between handles
/// instantiated from the same module.
pub struct BindingTable {
    module: Arc<dyn SymbolResolver>,
    kind: InterfaceKind,
    common: CommonFunctions,
    functions: InterfaceFunctions,
}

struct Resolver<'a> {
    module: &'a dyn SymbolResolver,
    kind: InterfaceKind,
    missing_optional: Vec<&'static str>,
}

impl Resolver<'_> {
    fn mandatory<F: Copy>(&mut self, symbol: &'static str) -> FmiResult<F> {
        let raw = self.module.resolve(symbol).ok_or(BindingError::MissingMandatorySymbol {
            symbol,
            kind: self.kind,
        })?;
        // SAFETY: Every call site pairs a symbol name with the signature
        // the standard defines for it.
        Ok(unsafe { raw.cast::<F>() })
    }

    fn optional<F: Copy>(&mut self, symbol: &'static str) -> Option<F> {
        match self.module.resolve(symbol) {
            // SAFETY: See `mandatory`.
            Some(raw) => Some(unsafe { raw.cast::<F>() }),
            None => {
                self.missing_optional.push(symbol);
                None
            }
        }
    }

    fn common(&mut self) -> FmiResult<CommonFunctions> {
        Ok(CommonFunctions {
            get_types_platform: self.mandatory("fmi2GetTypesPlatform")?,
            get_version: self.mandatory("fmi2GetVersion")?,
            set_debug_logging: self.mandatory("fmi2SetDebugLogging")?,
            instantiate: self.mandatory("fmi2Instantiate")?,
            free_instance: self.mandatory("fmi2FreeInstance")?,
            setup_experiment: self.mandatory("fmi2SetupExperiment")?,
            enter_initialization_mode: self.mandatory("fmi2EnterInitializationMode")?,
            exit_initialization_mode: self.mandatory("fmi2ExitInitializationMode")?,
            terminate: self.mandatory("fmi2Terminate")?,
            reset: self.mandatory("fmi2Reset")?,
            get_real: self.mandatory("fmi2GetReal")?,
            get_integer: self.mandatory("fmi2GetInteger")?,
            get_boolean: self.mandatory("fmi2GetBoolean")?,
            get_string: self.mandatory("fmi2GetString")?,
            set_real: self.mandatory("fmi2SetReal")?,
            set_integer: self.mandatory("fmi2SetInteger")?,
            set_boolean: self.mandatory("fmi2SetBoolean")?,
            set_string: self.mandatory("fmi2SetString")?,
            get_fmu_state: self.optional("fmi2GetFMUstate"),
            set_fmu_state: self.optional("fmi2SetFMUstate"),
            free_fmu_state: self.optional("fmi2FreeFMUstate"),
            serialized_fmu_state_size: self.optional("fmi2SerializedFMUstateSize"),
            serialize_fmu_state: self.optional("fmi2SerializeFMUstate"),
            deserialize_fmu_state: self.optional("fmi2DeSerializeFMUstate"),
            get_directional_derivative: self.optional("fmi2GetDirectionalDerivative"),
        })
    }

    fn model_exchange(&mut self) -> FmiResult<MeFunctions> {
        Ok(MeFunctions {
            enter_event_mode: self.mandatory("fmi2EnterEventMode")?,
            new_discrete_states: self.mandatory("fmi2NewDiscreteStates")?,
            enter_continuous_time_mode: self.mandatory("fmi2EnterContinuousTimeMode")?,
            set_time: self.mandatory("fmi2SetTime")?,
            set_continuous_states: self.mandatory("fmi2SetContinuousStates")?,
            get_derivatives: self.mandatory("fmi2GetDerivatives")?,
            get_event_indicators: self.mandatory("fmi2GetEventIndicators")?,
            get_continuous_states: self.mandatory("fmi2GetContinuousStates")?,
            completed_integrator_step: self.optional("fmi2CompletedIntegratorStep"),
            get_nominals_of_continuous_states: self.optional("fmi2GetNominalsOfContinuousStates"),
        })
    }

    fn co_simulation(&mut self) -> FmiResult<CsFunctions> {
        Ok(CsFunctions {
            do_step: self.mandatory("fmi2DoStep")?,
            set_real_input_derivatives: self.optional("fmi2SetRealInputDerivatives"),
            get_real_output_derivatives: self.optional("fmi2GetRealOutputDerivatives"),
            cancel_step: self.optional("fmi2CancelStep"),
            get_status: self.optional("fmi2GetStatus"),
            get_real_status: self.optional("fmi2GetRealStatus"),
            get_integer_status: self.optional("fmi2GetIntegerStatus"),
            get_boolean_status: self.optional("fmi2GetBooleanStatus"),
            get_string_status: self.optional("fmi2GetStringStatus"),
        })
    }
}

impl BindingTable {
    /// Resolve the procedures of `kind` for a module exported for `version`.
    ///
    /// Common procedures are resolved first, then the interface-specific
    /// ones in the order the standard lists them, so the error names the
    /// first mandatory symbol that is missing.
    pub fn bind(
        module: Arc<dyn SymbolResolver>,
        kind: InterfaceKind,
        version: FmiVersion,
    ) -> FmiResult<Self> {
        if version != FmiVersion::V2_0 {
            return Err(BindingError::IncompatibleVersion { version }.into());
        }

        let mut resolver = Resolver {
            module: module.as_ref(),
            kind,
            missing_optional: Vec::new(),
        };
        let common = resolver.common()?;
        let functions = match kind {
            InterfaceKind::ModelExchange => InterfaceFunctions::ModelExchange(resolver.model_exchange()?),
            InterfaceKind::CoSimulation => InterfaceFunctions::CoSimulation(resolver.co_simulation()?),
        };

        tracing::debug!(
            module = %module.describe(),
            kind = %kind,
            missing_optional = ?resolver.missing_optional,
            "Bound FMI procedures"
        );

        Ok(Self {
            module,
            kind,
            common,
            functions,
        })
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    /// The module the procedures were resolved from.
    pub fn module(&self) -> &Arc<dyn SymbolResolver> {
        &self.module
    }

    pub fn common(&self) -> &CommonFunctions {
        &self.common
    }

    pub fn model_exchange(&self) -> Option<&MeFunctions> {
        match &self.functions {
            InterfaceFunctions::ModelExchange(me) => Some(me),
            InterfaceFunctions::CoSimulation(_) => None,
        }
    }

    pub fn co_simulation(&self) -> Option<&CsFunctions> {
        match &self.functions {
            InterfaceFunctions::CoSimulation(cs) => Some(cs),
            InterfaceFunctions::ModelExchange(_) => None,
        }
    }
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field("module", &self.module.describe())
            .field("kind", &self.kind)
            .field("functions", &self.functions)
            .finish()
    }
}
