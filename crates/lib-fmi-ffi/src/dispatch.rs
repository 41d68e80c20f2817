//! Call dispatcher.
//!
//! A [`UnitHandle`] owns one instantiated component of a bound unit. Every
//! public operation:
//!
//! 1. checks that the instance still exists and that the call is legal in
//!    the current mode,
//! 2. checks buffer lengths against the model's declared counts,
//! 3. emits exactly one diagnostic record,
//! 4. calls the resolved procedure,
//! 5. returns the unit's status unchanged and applies the mode transition.
//!
//! Steps 1 and 2 fail before anything crosses the native boundary.

use crate::binding::{
    BindingTable, Component, CsFunctions, FmiBoolean, GetVersionFn, MeFunctions, RawFmuState, RawStatus,
};
use crate::callbacks::{read_c_string, Callbacks};
use crate::config::DispatchConfig;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{BindingError, FmiError, FmiResult, PreconditionError, StateError};
use crate::lifecycle::{ModeGuard, Operation};
use lib_modeldesc::ModelDescription;
use lib_types::{EventInfo, InterfaceKind, LifecycleMode, Status, StatusKind, ValueReference};
use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Snapshot of an instance's internal state, owned by the unit.
///
/// Only meaningful for the handle that produced it; release it with
/// [`UnitHandle::free_fmu_state`].
#[derive(Debug, PartialEq, Eq)]
pub struct FmuState(NonNull<c_void>);

impl FmuState {
    pub fn as_ptr(&self) -> RawFmuState {
        self.0.as_ptr()
    }
}

/// Outcome of `fmi2CompletedIntegratorStep`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegratorStep {
    pub status: Status,
    pub enter_event_mode: bool,
    pub terminate_simulation: bool,
}

/// One instantiated unit.
///
/// # Thread Safety
///
/// The native instance is not reentrant. All operations take `&mut self`,
/// so at most one call is in flight per handle. The handle is `Send` but
/// intentionally `!Sync`; wrap it in a `Mutex` to share it between
/// threads. Distinct handles are independent.
pub struct UnitHandle {
    bindings: Arc<BindingTable>,
    model: Arc<ModelDescription>,
    component: Option<NonNull<c_void>>,
    guard: ModeGuard,
    sink: Arc<dyn DiagnosticSink>,
    instance_name: String,

    // The unit keeps pointers into these until it is freed.
    _callbacks: Callbacks,

    _not_sync: PhantomData<Cell<()>>,
}

// SAFETY: The component and callback pointers are only used through
// `&mut self`, so moving the handle to another thread moves exclusive
// access with it.
unsafe impl Send for UnitHandle {}

fn c_string(name: &str, value: &str) -> FmiResult<CString> {
    CString::new(value).map_err(|_| FmiError::invalid_parameter(name, "Contains null byte"))
}

fn check_len(operation: Operation, expected: usize, actual: usize) -> FmiResult<()> {
    if expected != actual {
        return Err(FmiError::buffer_mismatch(operation.symbol(), expected, actual));
    }
    Ok(())
}

fn optional<F>(slot: Option<F>, operation: Operation) -> FmiResult<F> {
    slot.ok_or(FmiError::NotSupported {
        operation: operation.symbol(),
    })
}

fn to_boolean(value: bool) -> FmiBoolean {
    FmiBoolean::from(value)
}

impl UnitHandle {
    /// Call `fmi2Instantiate` for the table's interface.
    ///
    /// `resource_location` is the URI of the unit's `resources` folder.
    /// If `config.debug_categories` is non-empty, `fmi2SetDebugLogging` is
    /// called right after instantiation.
    pub fn instantiate(
        bindings: Arc<BindingTable>,
        model: Arc<ModelDescription>,
        sink: Arc<dyn DiagnosticSink>,
        resource_location: &str,
        config: &DispatchConfig,
    ) -> FmiResult<Self> {
        let kind = bindings.kind();
        if !model.kind().supports(kind) {
            return Err(BindingError::UnsupportedKind { kind }.into());
        }
        let identifier = model
            .model_identifier(kind)
            .ok_or(BindingError::UnsupportedKind { kind })?;
        let instance_name = config
            .module_name
            .clone()
            .unwrap_or_else(|| identifier.to_string());

        let c_name = c_string("instance_name", &instance_name)?;
        let c_guid = c_string("guid", model.guid())?;
        let c_resources = c_string("resource_location", resource_location)?;

        let callbacks = Callbacks::new(sink.clone(), instance_name.clone());

        sink.log(
            Severity::Verbose,
            &instance_name,
            &format!("fmi2Instantiate(kind = {kind}, guid = {})", model.guid()),
        );
        let instantiate = bindings.common().instantiate;
        // SAFETY: All strings are NUL-terminated and outlive the call; the
        // callback table and its context stay put until the handle drops.
        let raw = unsafe {
            instantiate(
                c_name.as_ptr(),
                kind as c_int,
                c_guid.as_ptr(),
                c_resources.as_ptr(),
                callbacks.as_ptr(),
                to_boolean(config.visible),
                to_boolean(config.logging_on),
            )
        };
        let component = NonNull::new(raw).ok_or_else(|| FmiError::InstantiationFailed {
            instance: instance_name.clone(),
        })?;

        tracing::info!(
            instance = %instance_name,
            model = %model.model_name(),
            kind = %kind,
            "Instantiated unit"
        );

        let mut handle = Self {
            bindings,
            model,
            component: Some(component),
            guard: ModeGuard::new(kind),
            sink,
            instance_name,
            _callbacks: callbacks,
            _not_sync: PhantomData,
        };

        if !config.debug_categories.is_empty() {
            let categories: Vec<&str> = config.debug_categories.iter().map(String::as_str).collect();
            let status = handle.set_debug_logging(config.logging_on, &categories)?;
            if !status.is_success() {
                tracing::warn!(
                    instance = %handle.instance_name,
                    status = %status,
                    "fmi2SetDebugLogging rejected configured categories"
                );
            }
        }

        Ok(handle)
    }

    pub fn mode(&self) -> LifecycleMode {
        self.guard.mode()
    }

    pub fn kind(&self) -> InterfaceKind {
        self.guard.kind()
    }

    pub fn model(&self) -> &Arc<ModelDescription> {
        &self.model
    }

    pub fn bindings(&self) -> &Arc<BindingTable> {
        &self.bindings
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// The unit returned `fatal` at some point.
    pub fn is_fatal(&self) -> bool {
        self.guard.is_fatal()
    }

    pub fn is_freed(&self) -> bool {
        self.component.is_none()
    }

    #[cfg(test)]
    pub(crate) fn raw_component(&self) -> Option<Component> {
        self.component.map(NonNull::as_ptr)
    }

    // ---------------------------------------------------------------
    // Dispatch plumbing
    // ---------------------------------------------------------------

    fn live(&self, operation: Operation) -> FmiResult<Component> {
        let component = self.component.ok_or(PreconditionError::NullHandle {
            operation: operation.symbol(),
        })?;
        Ok(component.as_ptr())
    }

    /// Handle and mode checks; slot checks come between the two.
    fn begin(&self, operation: Operation) -> FmiResult<Component> {
        let component = self.live(operation)?;
        self.guard.check(operation)?;
        Ok(component)
    }

    fn slot<F>(&self, slot: Option<F>, operation: Operation) -> FmiResult<F> {
        self.live(operation)?;
        optional(slot, operation)
    }

    fn me(&self, operation: Operation) -> FmiResult<MeFunctions> {
        self.slot(self.bindings.model_exchange().copied(), operation)
    }

    fn cs(&self, operation: Operation) -> FmiResult<CsFunctions> {
        self.slot(self.bindings.co_simulation().copied(), operation)
    }

    /// Log, call, translate the status and apply the transition.
    fn invoke<C>(&mut self, operation: Operation, detail: String, call: C) -> Status
    where
        C: FnOnce() -> RawStatus,
    {
        self.sink.log(
            operation.severity(),
            &self.instance_name,
            &format!("{}({detail})", operation.symbol()),
        );

        let raw = call();
        let status = Status::from_raw(raw).unwrap_or_else(|| {
            tracing::error!(
                instance = %self.instance_name,
                operation = operation.symbol(),
                code = raw,
                "Unknown status code, treating as fatal"
            );
            Status::Fatal
        });

        self.guard.apply(operation, status);
        if status == Status::Fatal {
            tracing::error!(
                instance = %self.instance_name,
                operation = operation.symbol(),
                "Unit reported fatal status, instance terminated"
            );
        }
        status
    }

    fn call_simple(&mut self, operation: Operation, f: crate::binding::ComponentFn) -> FmiResult<Status> {
        let c = self.begin(operation)?;
        // SAFETY: `c` is the live component the procedure was resolved for.
        Ok(self.invoke(operation, String::new(), || unsafe { f(c) }))
    }

    // ---------------------------------------------------------------
    // Common procedures
    // ---------------------------------------------------------------

    /// `fmi2GetVersion`; needs no instance and is legal in every mode
    /// until the unit reports `fatal`.
    pub fn get_version(&self) -> FmiResult<String> {
        self.static_string(Operation::GetVersion, self.bindings.common().get_version)
    }

    /// `fmi2GetTypesPlatform`; same rules as [`get_version`](Self::get_version).
    pub fn get_types_platform(&self) -> FmiResult<String> {
        self.static_string(Operation::GetTypesPlatform, self.bindings.common().get_types_platform)
    }

    fn static_string(&self, operation: Operation, f: GetVersionFn) -> FmiResult<String> {
        if self.guard.is_fatal() {
            return Err(StateError::AlreadyTerminated {
                operation: operation.symbol(),
            }
            .into());
        }
        self.sink.log(
            operation.severity(),
            &self.instance_name,
            &format!("{}()", operation.symbol()),
        );
        // SAFETY: Returns a static string owned by the unit.
        Ok(unsafe { read_c_string(f()) }.unwrap_or_default())
    }

    pub fn set_debug_logging(&mut self, logging_on: bool, categories: &[&str]) -> FmiResult<Status> {
        let op = Operation::SetDebugLogging;
        let f = self.bindings.common().set_debug_logging;
        let c = self.begin(op)?;
        let owned = categories
            .iter()
            .map(|cat| c_string("categories", cat))
            .collect::<FmiResult<Vec<_>>>()?;
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        let detail = format!("loggingOn = {logging_on}, categories = {categories:?}");
        // SAFETY: `pointers` refers into `owned`, both alive for the call.
        Ok(self.invoke(op, detail, || unsafe {
            f(c, to_boolean(logging_on), pointers.len(), pointers.as_ptr())
        }))
    }

    pub fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> FmiResult<Status> {
        let op = Operation::SetupExperiment;
        let f = self.bindings.common().setup_experiment;
        let c = self.begin(op)?;
        let detail = format!("tolerance = {tolerance:?}, start = {start_time}, stop = {stop_time:?}");
        // SAFETY: Plain values only.
        Ok(self.invoke(op, detail, || unsafe {
            f(
                c,
                to_boolean(tolerance.is_some()),
                tolerance.unwrap_or(0.0),
                start_time,
                to_boolean(stop_time.is_some()),
                stop_time.unwrap_or(0.0),
            )
        }))
    }

    pub fn enter_initialization_mode(&mut self) -> FmiResult<Status> {
        let f = self.bindings.common().enter_initialization_mode;
        self.call_simple(Operation::EnterInitializationMode, f)
    }

    /// Leaves initialization for event mode (model exchange) or step
    /// complete (co-simulation).
    pub fn exit_initialization_mode(&mut self) -> FmiResult<Status> {
        let f = self.bindings.common().exit_initialization_mode;
        self.call_simple(Operation::ExitInitializationMode, f)
    }

    pub fn terminate(&mut self) -> FmiResult<Status> {
        let f = self.bindings.common().terminate;
        self.call_simple(Operation::Terminate, f)
    }

    pub fn reset(&mut self) -> FmiResult<Status> {
        let f = self.bindings.common().reset;
        self.call_simple(Operation::Reset, f)
    }

    /// Release the native instance. Called on drop if not called before.
    ///
    /// After a fatal status the unit must not be called at all, so the
    /// instance is abandoned instead of freed.
    pub fn free_instance(&mut self) -> FmiResult<()> {
        let op = Operation::FreeInstance;
        let component = self.component.take().ok_or(PreconditionError::NullHandle {
            operation: op.symbol(),
        })?;

        if self.guard.is_fatal() {
            self.sink.log(
                Severity::Warning,
                &self.instance_name,
                "fmi2FreeInstance skipped after fatal status",
            );
            return Ok(());
        }

        let f = self.bindings.common().free_instance;
        self.sink.log(op.severity(), &self.instance_name, "fmi2FreeInstance()");
        // SAFETY: The component is live and is never used again.
        unsafe { f(component.as_ptr()) };
        tracing::debug!(instance = %self.instance_name, mode = %self.mode(), "Freed unit instance");
        Ok(())
    }

    pub fn get_real(&mut self, vrs: &[ValueReference], values: &mut [f64]) -> FmiResult<Status> {
        let op = Operation::GetReal;
        let f = self.bindings.common().get_real;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: Both buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr())
        }))
    }

    pub fn get_integer(&mut self, vrs: &[ValueReference], values: &mut [i32]) -> FmiResult<Status> {
        let op = Operation::GetInteger;
        let f = self.bindings.common().get_integer;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: Both buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr())
        }))
    }

    /// `values` is only written when the unit reports success.
    pub fn get_boolean(&mut self, vrs: &[ValueReference], values: &mut [bool]) -> FmiResult<Status> {
        let op = Operation::GetBoolean;
        let f = self.bindings.common().get_boolean;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        let mut raw: Vec<FmiBoolean> = vec![0; vrs.len()];
        // SAFETY: Both buffers hold `vrs.len()` elements.
        let status = self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), raw.as_mut_ptr())
        });
        if status.is_success() {
            for (value, raw) in values.iter_mut().zip(&raw) {
                *value = *raw != 0;
            }
        }
        Ok(status)
    }

    /// Strings are copied out immediately; the unit may reuse its buffers
    /// on the next call. Like [`get_boolean`](Self::get_boolean), `values`
    /// is only written on success.
    pub fn get_string(&mut self, vrs: &[ValueReference], values: &mut [String]) -> FmiResult<Status> {
        let op = Operation::GetString;
        let f = self.bindings.common().get_string;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        let mut raw: Vec<*const c_char> = vec![ptr::null(); vrs.len()];
        // SAFETY: Both buffers hold `vrs.len()` elements.
        let status = self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), raw.as_mut_ptr())
        });
        if status.is_success() {
            for (value, raw) in values.iter_mut().zip(&raw) {
                // SAFETY: The unit returns null or valid C strings.
                *value = unsafe { read_c_string(*raw) }.unwrap_or_default();
            }
        }
        Ok(status)
    }

    pub fn set_real(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiResult<Status> {
        let op = Operation::SetReal;
        let f = self.bindings.common().set_real;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: Both buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), values.as_ptr())
        }))
    }

    pub fn set_integer(&mut self, vrs: &[ValueReference], values: &[i32]) -> FmiResult<Status> {
        let op = Operation::SetInteger;
        let f = self.bindings.common().set_integer;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: Both buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), values.as_ptr())
        }))
    }

    pub fn set_boolean(&mut self, vrs: &[ValueReference], values: &[bool]) -> FmiResult<Status> {
        let op = Operation::SetBoolean;
        let f = self.bindings.common().set_boolean;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        let raw: Vec<FmiBoolean> = values.iter().map(|&v| to_boolean(v)).collect();
        // SAFETY: Both buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), raw.as_ptr())
        }))
    }

    pub fn set_string(&mut self, vrs: &[ValueReference], values: &[&str]) -> FmiResult<Status> {
        let op = Operation::SetString;
        let f = self.bindings.common().set_string;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), values.len())?;
        let owned = values
            .iter()
            .map(|v| c_string("values", v))
            .collect::<FmiResult<Vec<_>>>()?;
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        // SAFETY: `pointers` refers into `owned`, both alive for the call.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), pointers.as_ptr())
        }))
    }

    /// `fmi2GetFMUstate`. An existing snapshot in `state` is overwritten
    /// by the unit; otherwise a new one is created.
    pub fn get_fmu_state(&mut self, state: &mut Option<FmuState>) -> FmiResult<Status> {
        let op = Operation::GetFmuState;
        let f = self.slot(self.bindings.common().get_fmu_state, op)?;
        let c = self.begin(op)?;
        let mut raw = state.as_ref().map_or(ptr::null_mut(), FmuState::as_ptr);
        // SAFETY: `raw` is null or a snapshot this unit created.
        let status = self.invoke(op, String::new(), || unsafe { f(c, &mut raw) });
        *state = NonNull::new(raw).map(FmuState);
        Ok(status)
    }

    pub fn set_fmu_state(&mut self, state: &FmuState) -> FmiResult<Status> {
        let op = Operation::SetFmuState;
        let f = self.slot(self.bindings.common().set_fmu_state, op)?;
        let c = self.begin(op)?;
        let raw = state.as_ptr();
        // SAFETY: `raw` is a snapshot this unit created.
        Ok(self.invoke(op, String::new(), || unsafe { f(c, raw) }))
    }

    pub fn free_fmu_state(&mut self, state: &mut Option<FmuState>) -> FmiResult<Status> {
        let op = Operation::FreeFmuState;
        let f = self.slot(self.bindings.common().free_fmu_state, op)?;
        let c = self.begin(op)?;
        let mut raw = state.as_ref().map_or(ptr::null_mut(), FmuState::as_ptr);
        // SAFETY: `raw` is null or a snapshot this unit created.
        let status = self.invoke(op, String::new(), || unsafe { f(c, &mut raw) });
        *state = NonNull::new(raw).map(FmuState);
        Ok(status)
    }

    /// Size in bytes of the serialized form of `state`.
    pub fn serialized_fmu_state_size(&mut self, state: &FmuState) -> FmiResult<(Status, usize)> {
        let op = Operation::SerializedFmuStateSize;
        let f = self.slot(self.bindings.common().serialized_fmu_state_size, op)?;
        let c = self.begin(op)?;
        let raw = state.as_ptr();
        let mut size = 0usize;
        // SAFETY: `raw` is a snapshot this unit created.
        let status = self.invoke(op, String::new(), || unsafe { f(c, raw, &mut size) });
        Ok((status, size))
    }

    /// Serialize `state` into `buffer`, which must be exactly as long as
    /// [`serialized_fmu_state_size`](Self::serialized_fmu_state_size) said.
    pub fn serialize_fmu_state(&mut self, state: &FmuState, buffer: &mut [u8]) -> FmiResult<Status> {
        let op = Operation::SerializeFmuState;
        let f = self.slot(self.bindings.common().serialize_fmu_state, op)?;
        let c = self.begin(op)?;
        let raw = state.as_ptr();
        // SAFETY: The unit writes at most `buffer.len()` bytes.
        Ok(self.invoke(op, format!("size = {}", buffer.len()), || unsafe {
            f(c, raw, buffer.as_mut_ptr().cast(), buffer.len())
        }))
    }

    pub fn deserialize_fmu_state(
        &mut self,
        bytes: &[u8],
        state: &mut Option<FmuState>,
    ) -> FmiResult<Status> {
        let op = Operation::DeserializeFmuState;
        let f = self.slot(self.bindings.common().deserialize_fmu_state, op)?;
        let c = self.begin(op)?;
        let mut raw = state.as_ref().map_or(ptr::null_mut(), FmuState::as_ptr);
        // SAFETY: The unit reads `bytes.len()` bytes.
        let status = self.invoke(op, format!("size = {}", bytes.len()), || unsafe {
            f(c, bytes.as_ptr().cast(), bytes.len(), &mut raw)
        });
        *state = NonNull::new(raw).map(FmuState);
        Ok(status)
    }

    /// Directional derivative `dv_unknown = J * dv_known` of the unknowns
    /// with respect to the knowns.
    pub fn get_directional_derivative(
        &mut self,
        unknowns: &[ValueReference],
        knowns: &[ValueReference],
        dv_known: &[f64],
        dv_unknown: &mut [f64],
    ) -> FmiResult<Status> {
        let op = Operation::GetDirectionalDerivative;
        let f = self.slot(self.bindings.common().get_directional_derivative, op)?;
        let c = self.begin(op)?;
        check_len(op, knowns.len(), dv_known.len())?;
        check_len(op, unknowns.len(), dv_unknown.len())?;
        let detail = format!("nUnknown = {}, nKnown = {}", unknowns.len(), knowns.len());
        // SAFETY: Every buffer matches its reference list.
        Ok(self.invoke(op, detail, || unsafe {
            f(
                c,
                unknowns.as_ptr(),
                unknowns.len(),
                knowns.as_ptr(),
                knowns.len(),
                dv_known.as_ptr(),
                dv_unknown.as_mut_ptr(),
            )
        }))
    }

    // ---------------------------------------------------------------
    // Model exchange
    // ---------------------------------------------------------------

    pub fn enter_event_mode(&mut self) -> FmiResult<Status> {
        let op = Operation::EnterEventMode;
        let f = self.me(op)?.enter_event_mode;
        self.call_simple(op, f)
    }

    pub fn new_discrete_states(&mut self, event_info: &mut EventInfo) -> FmiResult<Status> {
        let op = Operation::NewDiscreteStates;
        let f = self.me(op)?.new_discrete_states;
        let c = self.begin(op)?;
        // SAFETY: `EventInfo` has the layout of `fmi2EventInfo`.
        Ok(self.invoke(op, String::new(), || unsafe { f(c, event_info) }))
    }

    pub fn enter_continuous_time_mode(&mut self) -> FmiResult<Status> {
        let op = Operation::EnterContinuousTimeMode;
        let f = self.me(op)?.enter_continuous_time_mode;
        self.call_simple(op, f)
    }

    pub fn completed_integrator_step(&mut self, no_set_fmu_state_prior: bool) -> FmiResult<IntegratorStep> {
        let op = Operation::CompletedIntegratorStep;
        let f = optional(self.me(op)?.completed_integrator_step, op)?;
        let c = self.begin(op)?;
        let mut enter_event_mode: FmiBoolean = 0;
        let mut terminate_simulation: FmiBoolean = 0;
        let detail = format!("noSetFMUStatePriorToCurrentPoint = {no_set_fmu_state_prior}");
        // SAFETY: Both out-parameters are valid for writes.
        let status = self.invoke(op, detail, || unsafe {
            f(
                c,
                to_boolean(no_set_fmu_state_prior),
                &mut enter_event_mode,
                &mut terminate_simulation,
            )
        });
        Ok(IntegratorStep {
            status,
            enter_event_mode: enter_event_mode != 0,
            terminate_simulation: terminate_simulation != 0,
        })
    }

    pub fn set_time(&mut self, time: f64) -> FmiResult<Status> {
        let op = Operation::SetTime;
        let f = self.me(op)?.set_time;
        let c = self.begin(op)?;
        // SAFETY: Plain value.
        Ok(self.invoke(op, format!("time = {time}"), || unsafe { f(c, time) }))
    }

    pub fn set_continuous_states(&mut self, states: &[f64]) -> FmiResult<Status> {
        let op = Operation::SetContinuousStates;
        let f = self.me(op)?.set_continuous_states;
        let c = self.begin(op)?;
        check_len(op, self.model.number_of_continuous_states(), states.len())?;
        // SAFETY: `states` holds exactly nx values.
        Ok(self.invoke(op, format!("nx = {}", states.len()), || unsafe {
            f(c, states.as_ptr(), states.len())
        }))
    }

    fn get_state_vector(
        &mut self,
        op: Operation,
        f: crate::binding::GetRealVectorFn,
        expected: usize,
        values: &mut [f64],
    ) -> FmiResult<Status> {
        let c = self.begin(op)?;
        check_len(op, expected, values.len())?;
        // SAFETY: `values` holds exactly the declared number of elements.
        Ok(self.invoke(op, format!("n = {}", values.len()), || unsafe {
            f(c, values.as_mut_ptr(), values.len())
        }))
    }

    /// Buffer length must equal the number of continuous states.
    pub fn get_derivatives(&mut self, derivatives: &mut [f64]) -> FmiResult<Status> {
        let op = Operation::GetDerivatives;
        let f = self.me(op)?.get_derivatives;
        let nx = self.model.number_of_continuous_states();
        self.get_state_vector(op, f, nx, derivatives)
    }

    /// Buffer length must equal the number of event indicators.
    pub fn get_event_indicators(&mut self, indicators: &mut [f64]) -> FmiResult<Status> {
        let op = Operation::GetEventIndicators;
        let f = self.me(op)?.get_event_indicators;
        let ni = self.model.number_of_event_indicators();
        self.get_state_vector(op, f, ni, indicators)
    }

    pub fn get_continuous_states(&mut self, states: &mut [f64]) -> FmiResult<Status> {
        let op = Operation::GetContinuousStates;
        let f = self.me(op)?.get_continuous_states;
        let nx = self.model.number_of_continuous_states();
        self.get_state_vector(op, f, nx, states)
    }

    pub fn get_nominals_of_continuous_states(&mut self, nominals: &mut [f64]) -> FmiResult<Status> {
        let op = Operation::GetNominalsOfContinuousStates;
        let f = optional(self.me(op)?.get_nominals_of_continuous_states, op)?;
        let nx = self.model.number_of_continuous_states();
        self.get_state_vector(op, f, nx, nominals)
    }

    // ---------------------------------------------------------------
    // Co-simulation
    // ---------------------------------------------------------------

    pub fn set_real_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &[f64],
    ) -> FmiResult<Status> {
        let op = Operation::SetRealInputDerivatives;
        let f = optional(self.cs(op)?.set_real_input_derivatives, op)?;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), orders.len())?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: All buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), orders.as_ptr(), values.as_ptr())
        }))
    }

    pub fn get_real_output_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &mut [f64],
    ) -> FmiResult<Status> {
        let op = Operation::GetRealOutputDerivatives;
        let f = optional(self.cs(op)?.get_real_output_derivatives, op)?;
        let c = self.begin(op)?;
        check_len(op, vrs.len(), orders.len())?;
        check_len(op, vrs.len(), values.len())?;
        // SAFETY: All buffers hold `vrs.len()` elements.
        Ok(self.invoke(op, format!("nvr = {}", vrs.len()), || unsafe {
            f(c, vrs.as_ptr(), vrs.len(), orders.as_ptr(), values.as_mut_ptr())
        }))
    }

    /// Advance from `current` by `step`. A `pending` answer moves the
    /// handle to `StepInProgress` until a status getter reports the end.
    pub fn do_step(&mut self, current: f64, step: f64, no_set_fmu_state_prior: bool) -> FmiResult<Status> {
        let op = Operation::DoStep;
        let f = self.cs(op)?.do_step;
        let c = self.begin(op)?;
        let detail = format!("t = {current}, h = {step}");
        // SAFETY: Plain values.
        Ok(self.invoke(op, detail, || unsafe {
            f(c, current, step, to_boolean(no_set_fmu_state_prior))
        }))
    }

    pub fn cancel_step(&mut self) -> FmiResult<Status> {
        let op = Operation::CancelStep;
        let f = optional(self.cs(op)?.cancel_step, op)?;
        self.call_simple(op, f)
    }

    /// `fmi2GetStatus`. Asking for `DoStepStatus` while a step is pending
    /// completes the step once the unit no longer reports `pending`.
    pub fn get_status(&mut self, kind: StatusKind) -> FmiResult<(Status, Status)> {
        let op = Operation::GetStatus;
        let f = optional(self.cs(op)?.get_status, op)?;
        let c = self.begin(op)?;
        let mut value: RawStatus = Status::Pending.as_raw();
        // SAFETY: `value` is valid for writes.
        let status = self.invoke(op, format!("{kind:?}"), || unsafe { f(c, kind as c_int, &mut value) });
        let value = Status::from_raw(value).unwrap_or(Status::Fatal);
        if status.is_success() && kind == StatusKind::DoStepStatus && value != Status::Pending {
            self.guard.finish_pending_step();
        }
        Ok((status, value))
    }

    pub fn get_real_status(&mut self, kind: StatusKind) -> FmiResult<(Status, f64)> {
        let op = Operation::GetRealStatus;
        let f = optional(self.cs(op)?.get_real_status, op)?;
        let c = self.begin(op)?;
        let mut value = 0.0;
        // SAFETY: `value` is valid for writes.
        let status = self.invoke(op, format!("{kind:?}"), || unsafe { f(c, kind as c_int, &mut value) });
        Ok((status, value))
    }

    pub fn get_integer_status(&mut self, kind: StatusKind) -> FmiResult<(Status, i32)> {
        let op = Operation::GetIntegerStatus;
        let f = optional(self.cs(op)?.get_integer_status, op)?;
        let c = self.begin(op)?;
        let mut value = 0;
        // SAFETY: `value` is valid for writes.
        let status = self.invoke(op, format!("{kind:?}"), || unsafe { f(c, kind as c_int, &mut value) });
        Ok((status, value))
    }

    pub fn get_boolean_status(&mut self, kind: StatusKind) -> FmiResult<(Status, bool)> {
        let op = Operation::GetBooleanStatus;
        let f = optional(self.cs(op)?.get_boolean_status, op)?;
        let c = self.begin(op)?;
        let mut value: FmiBoolean = 0;
        // SAFETY: `value` is valid for writes.
        let status = self.invoke(op, format!("{kind:?}"), || unsafe { f(c, kind as c_int, &mut value) });
        Ok((status, value != 0))
    }

    pub fn get_string_status(&mut self, kind: StatusKind) -> FmiResult<(Status, String)> {
        let op = Operation::GetStringStatus;
        let f = optional(self.cs(op)?.get_string_status, op)?;
        let c = self.begin(op)?;
        let mut value: *const c_char = ptr::null();
        // SAFETY: `value` is valid for writes.
        let status = self.invoke(op, format!("{kind:?}"), || unsafe { f(c, kind as c_int, &mut value) });
        // SAFETY: The unit returns null or a valid C string.
        Ok((status, unsafe { read_c_string(value) }.unwrap_or_default()))
    }
}

impl Drop for UnitHandle {
    fn drop(&mut self) {
        if self.component.is_some() {
            // Best-effort free, log but don't propagate errors
            if let Err(e) = self.free_instance() {
                tracing::warn!(error = %e, "Error during instance cleanup");
            }
        }
    }
}

impl std::fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHandle")
            .field("instance", &self.instance_name)
            .field("kind", &self.kind())
            .field("mode", &self.mode())
            .field("fatal", &self.is_fatal())
            .field("freed", &self.is_freed())
            .finish()
    }
}
