//! In-process stand-in for a native unit, used by the unit tests.
//!
//! The stub procedures operate on a leaked [`FakeUnit`] reached through the
//! component pointer. Nothing is ever deallocated; `fmi2FreeInstance` only
//! marks the unit as freed so tests can inspect it afterwards.

use crate::binding::{Component, FmiBoolean, RawFmuState, RawStatus};
use crate::callbacks::CallbackFunctions;
use crate::config::DispatchConfig;
use crate::diagnostics::CaptureSink;
use crate::dispatch::UnitHandle;
use crate::loader::{RawSymbol, SymbolResolver};
use crate::BindingTable;
use lib_modeldesc::ModelDescription;
use lib_types::{EventInfo, FmiVersion, InterfaceKind, Status};
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::sync::Arc;

pub(crate) const FAIL_GUID: &str = "{fail}";

const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fmiModelDescription fmiVersion="2.0" modelName="Ball" guid="{GUID}" numberOfEventIndicators="1">
  <ModelExchange modelIdentifier="ball" canGetAndSetFMUstate="true" canSerializeFMUstate="true"/>
  <CoSimulation modelIdentifier="ball" canRunAsynchronuously="true" maxOutputDerivativeOrder="1"/>
  <ModelVariables>
    <ScalarVariable name="h" valueReference="0" causality="output" initial="exact"><Real start="1"/></ScalarVariable>
    <ScalarVariable name="der(h)" valueReference="1"><Real derivative="1"/></ScalarVariable>
    <ScalarVariable name="v" valueReference="2" causality="output" initial="exact"><Real start="0"/></ScalarVariable>
    <ScalarVariable name="der(v)" valueReference="3"><Real derivative="3"/></ScalarVariable>
    <ScalarVariable name="g" valueReference="4" causality="parameter" variability="fixed"><Real start="-9.81"/></ScalarVariable>
  </ModelVariables>
  <ModelStructure>
    <Outputs><Unknown index="1"/><Unknown index="3"/></Outputs>
    <Derivatives><Unknown index="2"/><Unknown index="4"/></Derivatives>
  </ModelStructure>
</fmiModelDescription>
"#;

pub(crate) fn model_with_guid(guid: &str) -> Arc<ModelDescription> {
    Arc::new(ModelDescription::parse(&MODEL.replace("{GUID}", guid)).unwrap())
}

/// Same model without the `<ModelExchange>` element.
pub(crate) fn cs_only_model() -> Arc<ModelDescription> {
    let text = MODEL
        .replace("{GUID}", "{ball-cs}")
        .lines()
        .filter(|line| !line.trim_start().starts_with("<ModelExchange"))
        .collect::<Vec<_>>()
        .join("\n");
    Arc::new(ModelDescription::parse(&text).unwrap())
}

/// Two continuous states, one event indicator, both interfaces.
pub(crate) fn me_model() -> Arc<ModelDescription> {
    model_with_guid("{ball-0001}")
}

/// State of one fake instance.
#[derive(Debug, Default)]
pub(crate) struct FakeUnit {
    pub name: String,
    pub calls: Vec<&'static str>,
    /// Returned by the next status-returning call instead of `ok`.
    pub next_status: Option<RawStatus>,
    pub freed: bool,
    pub time: f64,
    pub states: Vec<f64>,
    pub reals: HashMap<u32, f64>,
    pub integers: HashMap<u32, c_int>,
    pub booleans: HashMap<u32, FmiBoolean>,
    pub strings: HashMap<u32, CString>,
    pub logging_categories: Vec<String>,
    functions: Option<*const CallbackFunctions>,
}

impl FakeUnit {
    fn record(&mut self, call: &'static str) -> RawStatus {
        self.calls.push(call);
        self.next_status.take().unwrap_or(Status::Ok.as_raw())
    }
}

/// Fake unit behind a live handle.
pub(crate) fn fake_unit(handle: &UnitHandle) -> &'static mut FakeUnit {
    let component = handle.raw_component().unwrap();
    // SAFETY: Stub components are leaked `FakeUnit`s.
    unsafe { unit(component) }
}

unsafe fn unit<'a>(component: Component) -> &'a mut FakeUnit {
    unsafe { &mut *(component as *mut FakeUnit) }
}

unsafe fn slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

unsafe fn slice_mut<'a, T>(ptr: *mut T, len: usize) -> &'a mut [T] {
    if len == 0 {
        &mut []
    } else {
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }
}

// ---------------------------------------------------------------
// Common procedures
// ---------------------------------------------------------------

unsafe extern "C" fn get_types_platform() -> *const c_char {
    b"default\0".as_ptr().cast()
}

unsafe extern "C" fn get_version() -> *const c_char {
    b"2.0\0".as_ptr().cast()
}

unsafe extern "C" fn set_debug_logging(
    c: Component,
    logging_on: FmiBoolean,
    n: usize,
    categories: *const *const c_char,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.logging_categories = unsafe { slice(categories, n) }
        .iter()
        .map(|&p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
        .collect();
    if logging_on != 0 {
        if let Some(functions) = unit.functions {
            let functions = unsafe { &*functions };
            if let Some(logger) = functions.logger {
                let name = CString::new(unit.name.clone()).unwrap();
                unsafe {
                    logger(
                        functions.component_environment,
                        name.as_ptr(),
                        Status::Ok.as_raw(),
                        b"logAll\0".as_ptr().cast(),
                        b"debug logging enabled\0".as_ptr().cast(),
                    )
                };
            }
        }
    }
    unit.record("fmi2SetDebugLogging")
}

unsafe extern "C" fn instantiate_unit(
    instance_name: *const c_char,
    _kind: c_int,
    guid: *const c_char,
    _resource_location: *const c_char,
    functions: *const CallbackFunctions,
    _visible: FmiBoolean,
    _logging_on: FmiBoolean,
) -> Component {
    let guid = unsafe { CStr::from_ptr(guid) }.to_string_lossy();
    if guid == FAIL_GUID {
        return std::ptr::null_mut();
    }
    let unit = FakeUnit {
        name: unsafe { CStr::from_ptr(instance_name) }.to_string_lossy().into_owned(),
        calls: vec!["fmi2Instantiate"],
        states: vec![1.0, 0.0],
        functions: Some(functions),
        ..Default::default()
    };
    Box::into_raw(Box::new(unit)).cast()
}

unsafe extern "C" fn free_instance(c: Component) {
    let unit = unsafe { unit(c) };
    unit.calls.push("fmi2FreeInstance");
    unit.freed = true;
}

unsafe extern "C" fn setup_experiment(
    c: Component,
    _tolerance_defined: FmiBoolean,
    _tolerance: f64,
    start_time: f64,
    _stop_time_defined: FmiBoolean,
    _stop_time: f64,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.time = start_time;
    unit.record("fmi2SetupExperiment")
}

macro_rules! component_stub {
    ($name:ident, $symbol:literal) => {
        unsafe extern "C" fn $name(c: Component) -> RawStatus {
            unsafe { unit(c) }.record($symbol)
        }
    };
}

component_stub!(enter_initialization_mode, "fmi2EnterInitializationMode");
component_stub!(exit_initialization_mode, "fmi2ExitInitializationMode");
component_stub!(terminate, "fmi2Terminate");
component_stub!(reset, "fmi2Reset");
component_stub!(enter_event_mode, "fmi2EnterEventMode");
component_stub!(enter_continuous_time_mode, "fmi2EnterContinuousTimeMode");
component_stub!(cancel_step, "fmi2CancelStep");

unsafe extern "C" fn get_real(c: Component, vr: *const c_uint, n: usize, values: *mut f64) -> RawStatus {
    let unit = unsafe { unit(c) };
    let out = unsafe { slice_mut(values, n) };
    for (value, vr) in out.iter_mut().zip(unsafe { slice(vr, n) }) {
        *value = unit.reals.get(vr).copied().unwrap_or_default();
    }
    unit.record("fmi2GetReal")
}

unsafe extern "C" fn get_integer(c: Component, vr: *const c_uint, n: usize, values: *mut c_int) -> RawStatus {
    let unit = unsafe { unit(c) };
    let out = unsafe { slice_mut(values, n) };
    for (value, vr) in out.iter_mut().zip(unsafe { slice(vr, n) }) {
        *value = unit.integers.get(vr).copied().unwrap_or_default();
    }
    unit.record("fmi2GetInteger")
}

unsafe extern "C" fn get_boolean(
    c: Component,
    vr: *const c_uint,
    n: usize,
    values: *mut FmiBoolean,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    let out = unsafe { slice_mut(values, n) };
    for (value, vr) in out.iter_mut().zip(unsafe { slice(vr, n) }) {
        *value = unit.booleans.get(vr).copied().unwrap_or_default();
    }
    unit.record("fmi2GetBoolean")
}

unsafe extern "C" fn get_string(
    c: Component,
    vr: *const c_uint,
    n: usize,
    values: *mut *const c_char,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    let out = unsafe { slice_mut(values, n) };
    for (value, vr) in out.iter_mut().zip(unsafe { slice(vr, n) }) {
        *value = unit.strings.get(vr).map_or(std::ptr::null(), |s| s.as_ptr());
    }
    unit.record("fmi2GetString")
}

unsafe extern "C" fn set_real(c: Component, vr: *const c_uint, n: usize, values: *const f64) -> RawStatus {
    let unit = unsafe { unit(c) };
    for (vr, value) in unsafe { slice(vr, n) }.iter().zip(unsafe { slice(values, n) }) {
        unit.reals.insert(*vr, *value);
    }
    unit.record("fmi2SetReal")
}

unsafe extern "C" fn set_integer(c: Component, vr: *const c_uint, n: usize, values: *const c_int) -> RawStatus {
    let unit = unsafe { unit(c) };
    for (vr, value) in unsafe { slice(vr, n) }.iter().zip(unsafe { slice(values, n) }) {
        unit.integers.insert(*vr, *value);
    }
    unit.record("fmi2SetInteger")
}

unsafe extern "C" fn set_boolean(
    c: Component,
    vr: *const c_uint,
    n: usize,
    values: *const FmiBoolean,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    for (vr, value) in unsafe { slice(vr, n) }.iter().zip(unsafe { slice(values, n) }) {
        unit.booleans.insert(*vr, *value);
    }
    unit.record("fmi2SetBoolean")
}

unsafe extern "C" fn set_string(
    c: Component,
    vr: *const c_uint,
    n: usize,
    values: *const *const c_char,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    for (vr, value) in unsafe { slice(vr, n) }.iter().zip(unsafe { slice(values, n) }) {
        unit.strings.insert(*vr, unsafe { CStr::from_ptr(*value) }.to_owned());
    }
    unit.record("fmi2SetString")
}

// ---------------------------------------------------------------
// FMU state: a snapshot of the real values, serialized as
// (u32 reference, f64 value) pairs in little endian.
// ---------------------------------------------------------------

type Snapshot = HashMap<u32, f64>;

unsafe extern "C" fn get_fmu_state(c: Component, state: *mut RawFmuState) -> RawStatus {
    let unit = unsafe { unit(c) };
    let snapshot = unit.reals.clone();
    unsafe {
        if (*state).is_null() {
            *state = Box::into_raw(Box::new(snapshot)).cast();
        } else {
            *(*state as *mut Snapshot) = snapshot;
        }
    }
    unit.record("fmi2GetFMUstate")
}

unsafe extern "C" fn set_fmu_state(c: Component, state: RawFmuState) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.reals = unsafe { &*(state as *const Snapshot) }.clone();
    unit.record("fmi2SetFMUstate")
}

unsafe extern "C" fn free_fmu_state(c: Component, state: *mut RawFmuState) -> RawStatus {
    unsafe {
        if !(*state).is_null() {
            drop(Box::from_raw(*state as *mut Snapshot));
            *state = std::ptr::null_mut();
        }
    }
    unsafe { unit(c) }.record("fmi2FreeFMUstate")
}

unsafe extern "C" fn serialized_fmu_state_size(c: Component, state: RawFmuState, size: *mut usize) -> RawStatus {
    let snapshot = unsafe { &*(state as *const Snapshot) };
    unsafe { *size = snapshot.len() * 12 };
    unsafe { unit(c) }.record("fmi2SerializedFMUstateSize")
}

unsafe extern "C" fn serialize_fmu_state(
    c: Component,
    state: RawFmuState,
    buffer: *mut c_char,
    size: usize,
) -> RawStatus {
    let snapshot = unsafe { &*(state as *const Snapshot) };
    let mut bytes = Vec::with_capacity(size);
    for (vr, value) in snapshot {
        bytes.extend_from_slice(&vr.to_le_bytes());
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    let out = unsafe { slice_mut(buffer.cast::<u8>(), size) };
    out.copy_from_slice(&bytes);
    unsafe { unit(c) }.record("fmi2SerializeFMUstate")
}

unsafe extern "C" fn deserialize_fmu_state(
    c: Component,
    buffer: *const c_char,
    size: usize,
    state: *mut RawFmuState,
) -> RawStatus {
    let bytes = unsafe { slice(buffer.cast::<u8>(), size) };
    let snapshot: Snapshot = bytes
        .chunks_exact(12)
        .map(|chunk| {
            let vr = u32::from_le_bytes(chunk[..4].try_into().unwrap());
            let value = f64::from_le_bytes(chunk[4..].try_into().unwrap());
            (vr, value)
        })
        .collect();
    unsafe { *state = Box::into_raw(Box::new(snapshot)).cast() };
    unsafe { unit(c) }.record("fmi2DeSerializeFMUstate")
}

// ---------------------------------------------------------------
// Model exchange: x' = -x, one time event at t = 0.5
// ---------------------------------------------------------------

unsafe extern "C" fn new_discrete_states(c: Component, info: *mut EventInfo) -> RawStatus {
    let info = unsafe { &mut *info };
    *info = EventInfo {
        next_event_time_defined: 1,
        next_event_time: 0.5,
        ..Default::default()
    };
    unsafe { unit(c) }.record("fmi2NewDiscreteStates")
}

unsafe extern "C" fn completed_integrator_step(
    c: Component,
    _no_set_prior: FmiBoolean,
    enter_event_mode: *mut FmiBoolean,
    terminate_simulation: *mut FmiBoolean,
) -> RawStatus {
    let unit = unsafe { unit(c) };
    unsafe {
        *enter_event_mode = FmiBoolean::from(unit.time >= 0.5);
        *terminate_simulation = 0;
    }
    unit.record("fmi2CompletedIntegratorStep")
}

unsafe extern "C" fn set_time(c: Component, time: f64) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.time = time;
    unit.record("fmi2SetTime")
}

unsafe extern "C" fn set_continuous_states(c: Component, x: *const f64, nx: usize) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.states = unsafe { slice(x, nx) }.to_vec();
    unit.record("fmi2SetContinuousStates")
}

unsafe extern "C" fn get_derivatives(c: Component, dx: *mut f64, nx: usize) -> RawStatus {
    let unit = unsafe { unit(c) };
    for (d, x) in unsafe { slice_mut(dx, nx) }.iter_mut().zip(&unit.states) {
        *d = -x;
    }
    unit.record("fmi2GetDerivatives")
}

unsafe extern "C" fn get_event_indicators(c: Component, z: *mut f64, ni: usize) -> RawStatus {
    let unit = unsafe { unit(c) };
    for z in unsafe { slice_mut(z, ni) } {
        *z = 0.5 - unit.time;
    }
    unit.record("fmi2GetEventIndicators")
}

unsafe extern "C" fn get_continuous_states(c: Component, x: *mut f64, nx: usize) -> RawStatus {
    let unit = unsafe { unit(c) };
    unsafe { slice_mut(x, nx) }.copy_from_slice(&unit.states);
    unit.record("fmi2GetContinuousStates")
}

unsafe extern "C" fn get_nominals(c: Component, x: *mut f64, nx: usize) -> RawStatus {
    unsafe { slice_mut(x, nx) }.fill(1.0);
    unsafe { unit(c) }.record("fmi2GetNominalsOfContinuousStates")
}

// ---------------------------------------------------------------
// Co-simulation
// ---------------------------------------------------------------

unsafe extern "C" fn do_step(c: Component, current: f64, step: f64, _no_set_prior: FmiBoolean) -> RawStatus {
    let unit = unsafe { unit(c) };
    unit.time = current + step;
    unit.record("fmi2DoStep")
}

unsafe extern "C" fn get_real_output_derivatives(
    c: Component,
    _vr: *const c_uint,
    n: usize,
    _orders: *const c_int,
    values: *mut f64,
) -> RawStatus {
    unsafe { slice_mut(values, n) }.fill(0.0);
    unsafe { unit(c) }.record("fmi2GetRealOutputDerivatives")
}

unsafe extern "C" fn set_real_input_derivatives(
    c: Component,
    _vr: *const c_uint,
    _n: usize,
    _orders: *const c_int,
    _values: *const f64,
) -> RawStatus {
    unsafe { unit(c) }.record("fmi2SetRealInputDerivatives")
}

unsafe extern "C" fn get_status(c: Component, _kind: c_int, value: *mut RawStatus) -> RawStatus {
    unsafe { *value = Status::Ok.as_raw() };
    unsafe { unit(c) }.record("fmi2GetStatus")
}

unsafe extern "C" fn get_real_status(c: Component, _kind: c_int, value: *mut f64) -> RawStatus {
    let unit = unsafe { unit(c) };
    unsafe { *value = unit.time };
    unit.record("fmi2GetRealStatus")
}

unsafe extern "C" fn get_boolean_status(c: Component, _kind: c_int, value: *mut FmiBoolean) -> RawStatus {
    unsafe { *value = 0 };
    unsafe { unit(c) }.record("fmi2GetBooleanStatus")
}

// ---------------------------------------------------------------
// Module
// ---------------------------------------------------------------

/// Symbol table standing in for a loaded binary.
#[derive(Clone, Debug, Default)]
pub(crate) struct StubModule {
    symbols: HashMap<&'static str, RawSymbol>,
}

macro_rules! symbols {
    ($($symbol:literal => $f:expr),+ $(,)?) => {
        vec![$(($symbol, RawSymbol::new($f as *mut c_void).unwrap())),+]
    };
}

impl StubModule {
    fn common() -> Self {
        let symbols = symbols![
            "fmi2GetTypesPlatform" => get_types_platform as unsafe extern "C" fn() -> *const c_char,
            "fmi2GetVersion" => get_version as unsafe extern "C" fn() -> *const c_char,
            "fmi2SetDebugLogging" => set_debug_logging as crate::binding::SetDebugLoggingFn,
            "fmi2Instantiate" => instantiate_unit as crate::binding::InstantiateFn,
            "fmi2FreeInstance" => free_instance as crate::binding::FreeInstanceFn,
            "fmi2SetupExperiment" => setup_experiment as crate::binding::SetupExperimentFn,
            "fmi2EnterInitializationMode" => enter_initialization_mode as crate::binding::ComponentFn,
            "fmi2ExitInitializationMode" => exit_initialization_mode as crate::binding::ComponentFn,
            "fmi2Terminate" => terminate as crate::binding::ComponentFn,
            "fmi2Reset" => reset as crate::binding::ComponentFn,
            "fmi2GetReal" => get_real as crate::binding::GetRealFn,
            "fmi2GetInteger" => get_integer as crate::binding::GetIntegerFn,
            "fmi2GetBoolean" => get_boolean as crate::binding::GetBooleanFn,
            "fmi2GetString" => get_string as crate::binding::GetStringFn,
            "fmi2SetReal" => set_real as crate::binding::SetRealFn,
            "fmi2SetInteger" => set_integer as crate::binding::SetIntegerFn,
            "fmi2SetBoolean" => set_boolean as crate::binding::SetBooleanFn,
            "fmi2SetString" => set_string as crate::binding::SetStringFn,
        ];
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }

    fn with(mut self, symbols: Vec<(&'static str, RawSymbol)>) -> Self {
        self.symbols.extend(symbols);
        self
    }

    /// Model exchange export without the FMU state family.
    pub fn model_exchange() -> Self {
        Self::common().with(symbols![
            "fmi2EnterEventMode" => enter_event_mode as crate::binding::ComponentFn,
            "fmi2NewDiscreteStates" => new_discrete_states as crate::binding::NewDiscreteStatesFn,
            "fmi2EnterContinuousTimeMode" => enter_continuous_time_mode as crate::binding::ComponentFn,
            "fmi2CompletedIntegratorStep" => completed_integrator_step as crate::binding::CompletedIntegratorStepFn,
            "fmi2SetTime" => set_time as crate::binding::SetTimeFn,
            "fmi2SetContinuousStates" => set_continuous_states as crate::binding::SetContinuousStatesFn,
            "fmi2GetDerivatives" => get_derivatives as crate::binding::GetRealVectorFn,
            "fmi2GetEventIndicators" => get_event_indicators as crate::binding::GetRealVectorFn,
            "fmi2GetContinuousStates" => get_continuous_states as crate::binding::GetRealVectorFn,
            "fmi2GetNominalsOfContinuousStates" => get_nominals as crate::binding::GetRealVectorFn,
        ])
    }

    /// Co-simulation export; `fmi2GetIntegerStatus` and
    /// `fmi2GetStringStatus` are left out.
    pub fn co_simulation() -> Self {
        Self::common().with(symbols![
            "fmi2DoStep" => do_step as crate::binding::DoStepFn,
            "fmi2CancelStep" => cancel_step as crate::binding::ComponentFn,
            "fmi2SetRealInputDerivatives" => set_real_input_derivatives as crate::binding::SetRealInputDerivativesFn,
            "fmi2GetRealOutputDerivatives" => get_real_output_derivatives as crate::binding::GetRealOutputDerivativesFn,
            "fmi2GetStatus" => get_status as crate::binding::GetStatusFn,
            "fmi2GetRealStatus" => get_real_status as crate::binding::GetRealStatusFn,
            "fmi2GetBooleanStatus" => get_boolean_status as crate::binding::GetBooleanStatusFn,
        ])
    }

    pub fn with_fmu_state(self) -> Self {
        self.with(symbols![
            "fmi2GetFMUstate" => get_fmu_state as crate::binding::GetFmuStateFn,
            "fmi2SetFMUstate" => set_fmu_state as crate::binding::SetFmuStateFn,
            "fmi2FreeFMUstate" => free_fmu_state as crate::binding::FreeFmuStateFn,
            "fmi2SerializedFMUstateSize" => serialized_fmu_state_size as crate::binding::SerializedFmuStateSizeFn,
            "fmi2SerializeFMUstate" => serialize_fmu_state as crate::binding::SerializeFmuStateFn,
            "fmi2DeSerializeFMUstate" => deserialize_fmu_state as crate::binding::DeserializeFmuStateFn,
        ])
    }

    pub fn without(mut self, symbol: &str) -> Self {
        self.symbols.remove(symbol);
        self
    }

    pub fn shared(self) -> Arc<dyn SymbolResolver> {
        Arc::new(self)
    }
}

impl SymbolResolver for StubModule {
    fn resolve(&self, symbol: &str) -> Option<RawSymbol> {
        self.symbols.get(symbol).copied()
    }

    fn describe(&self) -> String {
        "<stub module>".to_string()
    }
}

/// Bind `module` for `kind` and instantiate the test model.
pub(crate) fn instantiate(module: StubModule, kind: InterfaceKind) -> (UnitHandle, Arc<CaptureSink>) {
    let bindings = Arc::new(BindingTable::bind(module.shared(), kind, FmiVersion::V2_0).unwrap());
    let sink = Arc::new(CaptureSink::new());
    let handle = UnitHandle::instantiate(
        bindings,
        me_model(),
        sink.clone(),
        "file:///tmp/ball/resources",
        &DispatchConfig::default(),
    )
    .unwrap();
    (handle, sink)
}

/// Model exchange handle that went through initialization.
pub(crate) fn me_handle_in_event_mode() -> (UnitHandle, Arc<CaptureSink>) {
    let (mut handle, sink) = instantiate(StubModule::model_exchange(), InterfaceKind::ModelExchange);
    handle.enter_initialization_mode().unwrap();
    handle.exit_initialization_mode().unwrap();
    (handle, sink)
}
