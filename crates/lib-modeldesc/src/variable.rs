//! Scalar variables and simple type definitions.

use lib_types::{AliasKind, BaseType, Causality, Initial, StartValue, ValueReference, Variability};

/// One `<ScalarVariable>` of the model.
///
/// Attributes not given on the variable itself are inherited from its
/// declared type when the model is built, so `unit`, `min`, `max`,
/// `nominal` and `quantity` are the effective values.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value_reference: ValueReference,
    pub base_type: BaseType,
    pub description: Option<String>,
    pub causality: Causality,
    pub variability: Variability,
    pub initial: Option<Initial>,
    /// Name of the `<SimpleType>` this variable refers to.
    pub declared_type: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub display_unit: Option<String>,
    pub relative_quantity: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub nominal: Option<f64>,
    pub unbounded: bool,
    pub start: Option<StartValue>,
    /// 1-based index of the state this variable is the derivative of.
    pub derivative: Option<usize>,
    pub reinit: bool,
    pub can_handle_multiple_set_per_time_instant: bool,

    pub(crate) index: usize,
    pub(crate) alias_kind: AliasKind,
    pub(crate) alias_group: usize,
}

impl Variable {
    /// 0-based position in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Role of this variable inside its alias group.
    pub fn alias_kind(&self) -> AliasKind {
        self.alias_kind
    }

    pub fn is_alias(&self) -> bool {
        self.alias_kind != AliasKind::NoAlias
    }

    pub fn is_negated_alias(&self) -> bool {
        self.alias_kind == AliasKind::NegatedAlias
    }

    /// Identifier of the alias group; equal for all members of a group.
    pub fn alias_group(&self) -> usize {
        self.alias_group
    }

    pub fn is_state_derivative(&self) -> bool {
        self.derivative.is_some()
    }
}

/// One `<Item>` of an enumeration type.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumerationItem {
    pub name: String,
    pub value: i32,
    pub description: Option<String>,
}

/// One `<SimpleType>` of the type definitions.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub base_type: BaseType,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub display_unit: Option<String>,
    pub relative_quantity: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub nominal: Option<f64>,
    pub unbounded: bool,
    pub items: Vec<EnumerationItem>,
}

impl TypeDefinition {
    pub fn item_by_value(&self, value: i32) -> Option<&EnumerationItem> {
        self.items.iter().find(|i| i.value == value)
    }

    pub fn item_by_name(&self, name: &str) -> Option<&EnumerationItem> {
        self.items.iter().find(|i| i.name == name)
    }
}
