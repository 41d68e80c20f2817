//! The model data model.
//!
//! [`ModelDescription`] is built once from a parsed description (see
//! [`builder`](crate::builder)) and is immutable afterwards. It is `Send +
//! Sync` and is meant to be shared by reference (typically in an `Arc`)
//! between the dispatch layer and the host.

use crate::alias::AliasIndex;
use crate::dependencies::{Dependency, DependencyCategory, DependencyRecord};
use crate::variable::{TypeDefinition, Variable};
use crate::variable_list::{SortOrder, VariableList};
use lib_types::{BaseType, FmiVersion, FmuKind, InterfaceKind, NamingConvention, Unit, ValueReference};

/// Capability flags of one interface (`<ModelExchange>` or `<CoSimulation>`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceInfo {
    pub model_identifier: String,
    pub needs_execution_tool: bool,
    pub can_be_instantiated_only_once_per_process: bool,
    pub can_not_use_memory_management_functions: bool,
    pub can_get_and_set_fmu_state: bool,
    pub can_serialize_fmu_state: bool,
    pub provides_directional_derivative: bool,
    /// Model exchange only.
    pub completed_integrator_step_not_needed: bool,
    /// Co-simulation only.
    pub can_handle_variable_communication_step_size: bool,
    /// Co-simulation only.
    pub can_interpolate_inputs: bool,
    /// Co-simulation only.
    pub max_output_derivative_order: u32,
    /// Co-simulation only.
    pub can_run_asynchronuously: bool,
    pub source_files: Vec<String>,
}

/// Capability selector for [`ModelDescription::capability`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    MeNeedsExecutionTool,
    MeCompletedIntegratorStepNotNeeded,
    MeCanBeInstantiatedOnlyOncePerProcess,
    MeCanNotUseMemoryManagementFunctions,
    MeCanGetAndSetFmuState,
    MeCanSerializeFmuState,
    MeProvidesDirectionalDerivatives,
    CsNeedsExecutionTool,
    CsCanHandleVariableCommunicationStepSize,
    CsCanInterpolateInputs,
    CsMaxOutputDerivativeOrder,
    CsCanRunAsynchronuously,
    CsCanBeInstantiatedOnlyOncePerProcess,
    CsCanNotUseMemoryManagementFunctions,
    CsCanGetAndSetFmuState,
    CsCanSerializeFmuState,
    CsProvidesDirectionalDerivatives,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DefaultExperiment {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub tolerance: Option<f64>,
    pub step_size: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Header attributes of `<fmiModelDescription>`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub fmi_version: FmiVersion,
    pub model_name: String,
    pub guid: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub copyright: Option<String>,
    pub license: Option<String>,
    pub generation_tool: Option<String>,
    pub generation_date_and_time: Option<String>,
    pub naming_convention: NamingConvention,
    pub number_of_event_indicators: usize,
}

/// `<ModelStructure>`: unknown lists (0-based variable positions) and
/// their dependency records.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ModelStructure {
    pub(crate) outputs: Vec<usize>,
    pub(crate) derivatives: Vec<usize>,
    pub(crate) discrete_states: Vec<usize>,
    pub(crate) initial_unknowns: Vec<usize>,
    pub(crate) outputs_deps: Option<DependencyRecord>,
    pub(crate) derivatives_deps: Option<DependencyRecord>,
    pub(crate) discrete_states_deps: Option<DependencyRecord>,
    pub(crate) initial_unknowns_deps: Option<DependencyRecord>,
}

impl ModelStructure {
    pub(crate) fn unknowns(&self, category: DependencyCategory) -> &[usize] {
        match category {
            DependencyCategory::Outputs => &self.outputs,
            DependencyCategory::Derivatives => &self.derivatives,
            DependencyCategory::DiscreteStates => &self.discrete_states,
            DependencyCategory::InitialUnknowns => &self.initial_unknowns,
        }
    }

    pub(crate) fn record(&self, category: DependencyCategory) -> Option<&DependencyRecord> {
        match category {
            DependencyCategory::Outputs => self.outputs_deps.as_ref(),
            DependencyCategory::Derivatives => self.derivatives_deps.as_ref(),
            DependencyCategory::DiscreteStates => self.discrete_states_deps.as_ref(),
            DependencyCategory::InitialUnknowns => self.initial_unknowns_deps.as_ref(),
        }
    }
}

/// In-memory model of one unit's description.
#[derive(Clone, Debug)]
pub struct ModelDescription {
    pub(crate) info: ModelInfo,
    pub(crate) kind: FmuKind,
    pub(crate) model_exchange: Option<InterfaceInfo>,
    pub(crate) co_simulation: Option<InterfaceInfo>,
    pub(crate) default_experiment: DefaultExperiment,
    pub(crate) units: Vec<Unit>,
    pub(crate) type_definitions: Vec<TypeDefinition>,
    pub(crate) log_categories: Vec<LogCategory>,
    pub(crate) vendors: Vec<String>,
    pub(crate) variables: Vec<Variable>,
    /// Variable positions sorted by name.
    pub(crate) name_order: Vec<usize>,
    /// Variable positions sorted by (base type, value reference, position).
    pub(crate) reference_order: Vec<usize>,
    pub(crate) aliases: AliasIndex,
    pub(crate) structure: ModelStructure,
}

impl ModelDescription {
    // ---------------------------------------------------------------
    // General information
    // ---------------------------------------------------------------

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn fmi_version(&self) -> FmiVersion {
        self.info.fmi_version
    }

    pub fn model_name(&self) -> &str {
        &self.info.model_name
    }

    pub fn guid(&self) -> &str {
        &self.info.guid
    }

    pub fn kind(&self) -> FmuKind {
        self.kind
    }

    pub fn interface(&self, kind: InterfaceKind) -> Option<&InterfaceInfo> {
        match kind {
            InterfaceKind::ModelExchange => self.model_exchange.as_ref(),
            InterfaceKind::CoSimulation => self.co_simulation.as_ref(),
        }
    }

    pub fn model_identifier(&self, kind: InterfaceKind) -> Option<&str> {
        self.interface(kind).map(|i| i.model_identifier.as_str())
    }

    /// Capability value; flags are 0/1, `CsMaxOutputDerivativeOrder` is
    /// the order itself. Capabilities of an absent interface are 0.
    pub fn capability(&self, capability: Capability) -> u32 {
        use Capability::*;
        let me = self.model_exchange.as_ref();
        let cs = self.co_simulation.as_ref();
        let flag = |info: Option<&InterfaceInfo>, f: fn(&InterfaceInfo) -> bool| {
            info.map_or(0, |i| u32::from(f(i)))
        };
        match capability {
            MeNeedsExecutionTool => flag(me, |i| i.needs_execution_tool),
            MeCompletedIntegratorStepNotNeeded => flag(me, |i| i.completed_integrator_step_not_needed),
            MeCanBeInstantiatedOnlyOncePerProcess => flag(me, |i| i.can_be_instantiated_only_once_per_process),
            MeCanNotUseMemoryManagementFunctions => flag(me, |i| i.can_not_use_memory_management_functions),
            MeCanGetAndSetFmuState => flag(me, |i| i.can_get_and_set_fmu_state),
            MeCanSerializeFmuState => flag(me, |i| i.can_serialize_fmu_state),
            MeProvidesDirectionalDerivatives => flag(me, |i| i.provides_directional_derivative),
            CsNeedsExecutionTool => flag(cs, |i| i.needs_execution_tool),
            CsCanHandleVariableCommunicationStepSize => {
                flag(cs, |i| i.can_handle_variable_communication_step_size)
            }
            CsCanInterpolateInputs => flag(cs, |i| i.can_interpolate_inputs),
            CsMaxOutputDerivativeOrder => cs.map_or(0, |i| i.max_output_derivative_order),
            CsCanRunAsynchronuously => flag(cs, |i| i.can_run_asynchronuously),
            CsCanBeInstantiatedOnlyOncePerProcess => flag(cs, |i| i.can_be_instantiated_only_once_per_process),
            CsCanNotUseMemoryManagementFunctions => flag(cs, |i| i.can_not_use_memory_management_functions),
            CsCanGetAndSetFmuState => flag(cs, |i| i.can_get_and_set_fmu_state),
            CsCanSerializeFmuState => flag(cs, |i| i.can_serialize_fmu_state),
            CsProvidesDirectionalDerivatives => flag(cs, |i| i.provides_directional_derivative),
        }
    }

    pub fn default_experiment(&self) -> &DefaultExperiment {
        &self.default_experiment
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn type_definitions(&self) -> &[TypeDefinition] {
        &self.type_definitions
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_definitions.iter().find(|t| t.name == name)
    }

    pub fn log_categories(&self) -> &[LogCategory] {
        &self.log_categories
    }

    /// Tool names that left vendor annotations.
    pub fn vendors(&self) -> &[String] {
        &self.vendors
    }

    pub fn number_of_event_indicators(&self) -> usize {
        self.info.number_of_event_indicators
    }

    /// One continuous state per entry of `<Derivatives>`.
    pub fn number_of_continuous_states(&self) -> usize {
        self.structure.derivatives.len()
    }

    // ---------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variable at a 1-based index, the convention used by the model
    /// structure and by `derivative` attributes.
    pub fn variable_by_index(&self, index: usize) -> Option<&Variable> {
        index.checked_sub(1).and_then(|i| self.variables.get(i))
    }

    /// Case-sensitive lookup by name, O(log n).
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.name_order
            .binary_search_by(|&i| self.variables[i].name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|pos| &self.variables[self.name_order[pos]])
    }

    /// Lookup by base type and value reference, O(log n). Returns the
    /// base of the alias group that owns the reference.
    pub fn variable_by_vr(&self, base_type: BaseType, vr: ValueReference) -> Option<&Variable> {
        let key = (base_type, vr);
        let pos = self.reference_order.partition_point(|&i| {
            let v = &self.variables[i];
            (v.base_type, v.value_reference) < key
        });
        let candidate = self.variables.get(*self.reference_order.get(pos)?)?;
        if (candidate.base_type, candidate.value_reference) != key {
            return None;
        }
        self.alias_base(candidate)
    }

    /// Resolve one dependency entry. The "depends on all" marker has no
    /// variable and yields `None`.
    pub fn resolve_dependency(&self, dependency: Dependency) -> Option<&Variable> {
        dependency
            .variable_index()
            .and_then(|i| self.variable_by_index(i))
    }

    /// The state variable a derivative refers to.
    pub fn derivative_of(&self, variable: &Variable) -> Option<&Variable> {
        variable.derivative.and_then(|i| self.variable_by_index(i))
    }

    pub fn variable_unit(&self, variable: &Variable) -> Option<&Unit> {
        variable.unit.as_deref().and_then(|name| self.unit(name))
    }

    pub fn variable_type(&self, variable: &Variable) -> Option<&TypeDefinition> {
        variable
            .declared_type
            .as_deref()
            .and_then(|name| self.type_definition(name))
    }

    /// This model's copy of `variable`, or `None` if it was taken from a
    /// different model.
    fn own<'a>(&'a self, variable: &Variable) -> Option<&'a Variable> {
        let own = self.variables.get(variable.index)?;
        (std::ptr::eq(own, variable) || own == variable).then_some(own)
    }

    // ---------------------------------------------------------------
    // Aliases
    // ---------------------------------------------------------------

    /// The unique non-alias variable of `variable`'s alias group.
    ///
    /// `None` if `variable` does not belong to this model.
    pub fn alias_base(&self, variable: &Variable) -> Option<&Variable> {
        let own = self.own(variable)?;
        self.variables.get(self.aliases.group(own.alias_group).base())
    }

    /// All members of `variable`'s alias group: base, then aliases, then
    /// negated aliases. Index 0 is always the base.
    pub fn aliases_of(&self, variable: &Variable) -> Option<VariableList<'_>> {
        let own = self.own(variable)?;
        Some(
            self.aliases
                .group(own.alias_group)
                .members
                .iter()
                .filter_map(|&i| self.variables.get(i))
                .collect(),
        )
    }

    /// Number of distinct alias groups (= number of distinct values).
    pub fn alias_group_count(&self) -> usize {
        self.aliases.len()
    }

    // ---------------------------------------------------------------
    // Variable lists
    // ---------------------------------------------------------------

    /// All variables in the requested order.
    pub fn variable_list(&self, order: SortOrder) -> VariableList<'_> {
        match order {
            SortOrder::Declaration => self.variables.iter().collect(),
            SortOrder::Name => self.name_order.iter().map(|&i| &self.variables[i]).collect(),
            SortOrder::TypeAndValueReference => self
                .reference_order
                .iter()
                .map(|&i| &self.variables[i])
                .collect(),
        }
    }

    pub fn single_variable_list<'a>(&'a self, variable: &Variable) -> Option<VariableList<'a>> {
        self.own(variable).map(VariableList::single)
    }

    /// Variables listed under one model-structure category, in the order
    /// of the description.
    pub fn unknowns_list(&self, category: DependencyCategory) -> VariableList<'_> {
        self.structure
            .unknowns(category)
            .iter()
            .map(|&i| &self.variables[i])
            .collect()
    }

    pub fn outputs_list(&self) -> VariableList<'_> {
        self.unknowns_list(DependencyCategory::Outputs)
    }

    pub fn derivatives_list(&self) -> VariableList<'_> {
        self.unknowns_list(DependencyCategory::Derivatives)
    }

    pub fn discrete_states_list(&self) -> VariableList<'_> {
        self.unknowns_list(DependencyCategory::DiscreteStates)
    }

    pub fn initial_unknowns_list(&self) -> VariableList<'_> {
        self.unknowns_list(DependencyCategory::InitialUnknowns)
    }

    /// Continuous states, in the order of their derivatives. This is the
    /// order of the state vector exchanged with the unit.
    pub fn continuous_states_list(&self) -> VariableList<'_> {
        self.derivatives_list()
            .iter()
            .filter_map(|d| self.derivative_of(d))
            .collect()
    }

    // ---------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------

    /// Dependency record of a category. `None` means the description
    /// declared no dependency information for it at all; a record whose
    /// rows are empty means "declared as independent".
    pub fn dependencies(&self, category: DependencyCategory) -> Option<&DependencyRecord> {
        self.structure.record(category)
    }

    pub fn outputs_dependencies(&self) -> Option<&DependencyRecord> {
        self.dependencies(DependencyCategory::Outputs)
    }

    pub fn derivatives_dependencies(&self) -> Option<&DependencyRecord> {
        self.dependencies(DependencyCategory::Derivatives)
    }

    pub fn discrete_states_dependencies(&self) -> Option<&DependencyRecord> {
        self.dependencies(DependencyCategory::DiscreteStates)
    }

    pub fn initial_unknowns_dependencies(&self) -> Option<&DependencyRecord> {
        self.dependencies(DependencyCategory::InitialUnknowns)
    }
}
