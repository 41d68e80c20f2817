//! FMI 2.0 vocabulary types.
//!
//! These enums mirror the enumerations of the FMI 2.0 standard that are
//! shared between the model description and the native call interface:
//! status codes, base types, causality, variability and friends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value reference of a variable. Unique only within one [`BaseType`].
pub type ValueReference = u32;

/// Error converting an attribute string into one of the enums below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `FromStr` and `Display` for enums that appear as
/// attribute values in the model description.
macro_rules! attribute_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Spelling used in the model description.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Status code returned by every native FMI procedure.
///
/// This is not an error type: it is handed back to the host verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Discard = 2,
    Error = 3,
    Fatal = 4,
    Pending = 5,
}

attribute_enum!(Status, "status", {
    Ok => "ok",
    Warning => "warning",
    Discard => "discard",
    Error => "error",
    Fatal => "fatal",
    Pending => "pending",
});

impl Status {
    /// Convert the raw integer returned across the C boundary.
    pub fn from_raw(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_raw() == code)
    }

    /// Raw integer value as defined by the standard.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// `true` for `Ok` and `Warning`, the two statuses after which a
    /// requested mode change has taken effect.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Warning)
    }
}

/// Version of the FMI standard a unit was exported for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FmiVersion {
    V1_0,
    V2_0,
}

attribute_enum!(FmiVersion, "FMI version", {
    V1_0 => "1.0",
    V2_0 => "2.0",
});

impl FmiVersion {
    /// Parse the `fmiVersion` attribute. FMI 2.0 release candidates
    /// (`2.0RC1`, ...) are accepted as 2.0.
    pub fn from_attribute(value: &str) -> Result<Self, UnknownVariant> {
        let value = value.trim();
        if value.starts_with("2.0") {
            Ok(Self::V2_0)
        } else {
            value.parse()
        }
    }
}

/// Interfaces a unit declares in its description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FmuKind {
    ModelExchange,
    CoSimulation,
    ModelExchangeAndCoSimulation,
}

impl FmuKind {
    /// Build from the presence of the ME / CS elements.
    pub fn from_flags(model_exchange: bool, co_simulation: bool) -> Option<Self> {
        match (model_exchange, co_simulation) {
            (true, true) => Some(Self::ModelExchangeAndCoSimulation),
            (true, false) => Some(Self::ModelExchange),
            (false, true) => Some(Self::CoSimulation),
            (false, false) => None,
        }
    }

    /// Whether the unit can be driven through the given interface.
    pub fn supports(self, interface: InterfaceKind) -> bool {
        matches!(
            (self, interface),
            (Self::ModelExchangeAndCoSimulation, _)
                | (Self::ModelExchange, InterfaceKind::ModelExchange)
                | (Self::CoSimulation, InterfaceKind::CoSimulation)
        )
    }
}

/// The single interface one binding table and one instance are built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum InterfaceKind {
    ModelExchange = 0,
    CoSimulation = 1,
}

attribute_enum!(InterfaceKind, "interface kind", {
    ModelExchange => "ModelExchange",
    CoSimulation => "CoSimulation",
});

/// Base type of a scalar variable.
///
/// The discriminants define the "sorted by type" order of variable lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Real = 0,
    Integer = 1,
    Boolean = 2,
    String = 3,
    Enumeration = 4,
}

attribute_enum!(BaseType, "base type", {
    Real => "Real",
    Integer => "Integer",
    Boolean => "Boolean",
    String => "String",
    Enumeration => "Enumeration",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Causality {
    Parameter,
    CalculatedParameter,
    Input,
    Output,
    #[default]
    Local,
    Independent,
}

attribute_enum!(Causality, "causality", {
    Parameter => "parameter",
    CalculatedParameter => "calculatedParameter",
    Input => "input",
    Output => "output",
    Local => "local",
    Independent => "independent",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    #[default]
    Continuous,
}

attribute_enum!(Variability, "variability", {
    Constant => "constant",
    Fixed => "fixed",
    Tunable => "tunable",
    Discrete => "discrete",
    Continuous => "continuous",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

attribute_enum!(Initial, "initial", {
    Exact => "exact",
    Approx => "approx",
    Calculated => "calculated",
});

/// Relationship of a variable to its alias-group base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AliasKind {
    #[default]
    NoAlias,
    Alias,
    NegatedAlias,
}

attribute_enum!(AliasKind, "alias kind", {
    NoAlias => "noAlias",
    Alias => "alias",
    NegatedAlias => "negatedAlias",
});

impl AliasKind {
    /// Sign to apply to the base value to obtain this variable's value.
    pub fn sign(self) -> f64 {
        match self {
            Self::NegatedAlias => -1.0,
            _ => 1.0,
        }
    }
}

/// Sensitivity classification of one dependency entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DependencyFactorKind {
    #[default]
    Dependent = 0,
    Constant = 1,
    Fixed = 2,
    Tunable = 3,
    Discrete = 4,
}

attribute_enum!(DependencyFactorKind, "dependency kind", {
    Dependent => "dependent",
    Constant => "constant",
    Fixed => "fixed",
    Tunable => "tunable",
    Discrete => "discrete",
});

impl DependencyFactorKind {
    pub fn from_raw(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| *k as u8 == code)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingConvention {
    #[default]
    Flat,
    Structured,
}

attribute_enum!(NamingConvention, "naming convention", {
    Flat => "flat",
    Structured => "structured",
});

/// Selector for the co-simulation status getters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusKind {
    DoStepStatus = 0,
    PendingStatus = 1,
    LastSuccessfulTime = 2,
    Terminated = 3,
}

/// Start value of a scalar variable, typed by its base type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StartValue {
    Real(f64),
    Integer(i32),
    Boolean(bool),
    String(String),
    Enumeration(i32),
}

impl StartValue {
    pub fn base_type(&self) -> BaseType {
        match self {
            Self::Real(_) => BaseType::Real,
            Self::Integer(_) => BaseType::Integer,
            Self::Boolean(_) => BaseType::Boolean,
            Self::String(_) => BaseType::String,
            Self::Enumeration(_) => BaseType::Enumeration,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) | Self::Enumeration(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Integer(v) | Self::Enumeration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Event information filled in by `fmi2NewDiscreteStates`.
///
/// Layout matches `fmi2EventInfo` so a `&mut EventInfo` can be passed to
/// the native procedure directly.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct EventInfo {
    pub new_discrete_states_needed: i32,
    pub terminate_simulation: i32,
    pub nominals_of_continuous_states_changed: i32,
    pub values_of_continuous_states_changed: i32,
    pub next_event_time_defined: i32,
    pub next_event_time: f64,
}

impl EventInfo {
    pub fn new_discrete_states_needed(&self) -> bool {
        self.new_discrete_states_needed != 0
    }

    pub fn terminate_simulation(&self) -> bool {
        self.terminate_simulation != 0
    }

    pub fn nominals_changed(&self) -> bool {
        self.nominals_of_continuous_states_changed != 0
    }

    pub fn states_changed(&self) -> bool {
        self.values_of_continuous_states_changed != 0
    }

    /// Time of the next scheduled time event, if the unit announced one.
    pub fn next_event_time(&self) -> Option<f64> {
        (self.next_event_time_defined != 0).then_some(self.next_event_time)
    }
}
