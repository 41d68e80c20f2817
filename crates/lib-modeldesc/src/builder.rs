//! Build a [`ModelDescription`] from a [`DescNode`] tree.
//!
//! Attribute inheritance from declared types, alias grouping, index
//! validation and dependency compression all happen here, once. Every
//! inconsistency in the description is reported as a [`DescriptionError`].

use crate::alias::AliasIndex;
use crate::dependencies::{Dependency, DependencyCategory, DependencyRecord, UnknownRow};
use crate::error::{DescResult, DescriptionError};
use crate::model::{
    DefaultExperiment, InterfaceInfo, LogCategory, ModelDescription, ModelInfo, ModelStructure,
};
use crate::node::DescNode;
use crate::variable::{EnumerationItem, TypeDefinition, Variable};
use crate::xml;
use lib_types::{
    AliasKind, BaseType, BaseUnit, DependencyFactorKind, DisplayUnit, FmiVersion, FmuKind,
    InterfaceKind, StartValue, Unit,
};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;

const ROOT: &str = "fmiModelDescription";

impl ModelDescription {
    /// Parse a description document and build the model.
    pub fn parse(document: &str) -> DescResult<Self> {
        Self::from_node(&xml::parse_document(document)?)
    }

    /// Read and build the model from a `modelDescription.xml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> DescResult<Self> {
        Self::from_node(&xml::parse_file(path)?)
    }

    /// Build the model from an already parsed element tree.
    pub fn from_node(root: &DescNode) -> DescResult<Self> {
        if root.name != ROOT {
            return Err(DescriptionError::missing_element(ROOT, root.line));
        }

        let info = parse_info(root)?;
        let model_exchange = root
            .child(InterfaceKind::ModelExchange.as_str())
            .map(|n| parse_interface(n, InterfaceKind::ModelExchange))
            .transpose()?;
        let co_simulation = root
            .child(InterfaceKind::CoSimulation.as_str())
            .map(|n| parse_interface(n, InterfaceKind::CoSimulation))
            .transpose()?;
        let kind = FmuKind::from_flags(model_exchange.is_some(), co_simulation.is_some())
            .ok_or_else(|| DescriptionError::missing_element("ModelExchange or CoSimulation", root.line))?;

        let units = match root.child("UnitDefinitions") {
            Some(defs) => defs.children_named("Unit").map(parse_unit).collect::<DescResult<_>>()?,
            None => Vec::new(),
        };
        let type_definitions = match root.child("TypeDefinitions") {
            Some(defs) => defs
                .children_named("SimpleType")
                .map(parse_simple_type)
                .collect::<DescResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        let log_categories = match root.child("LogCategories") {
            Some(cats) => cats
                .children_named("Category")
                .map(|c| -> DescResult<LogCategory> {
                    Ok(LogCategory {
                        name: c.required_attr("name")?.to_string(),
                        description: c.attr("description").map(str::to_string),
                    })
                })
                .collect::<DescResult<_>>()?,
            None => Vec::new(),
        };
        let vendors = match root.child("VendorAnnotations") {
            Some(annotations) => annotations
                .children_named("Tool")
                .map(|t| t.required_attr("name").map(str::to_string))
                .collect::<DescResult<_>>()?,
            None => Vec::new(),
        };
        let default_experiment = match root.child("DefaultExperiment") {
            Some(exp) => DefaultExperiment {
                start_time: exp.parse_attr("startTime")?,
                stop_time: exp.parse_attr("stopTime")?,
                tolerance: exp.parse_attr("tolerance")?,
                step_size: exp.parse_attr("stepSize")?,
            },
            None => DefaultExperiment::default(),
        };

        let model_variables = root
            .child("ModelVariables")
            .ok_or_else(|| DescriptionError::missing_element("ModelVariables", root.line))?;
        let mut variables = Vec::new();
        let mut declared_alias = Vec::new();
        let mut seen = HashSet::new();
        for (index, node) in model_variables.children_named("ScalarVariable").enumerate() {
            let (variable, alias) = parse_variable(node, index, &type_definitions)?;
            if !seen.insert(variable.name.clone()) {
                return Err(DescriptionError::DuplicateName {
                    name: variable.name,
                });
            }
            variables.push(variable);
            declared_alias.push(alias);
        }

        let count = variables.len();
        for v in &variables {
            if let Some(state) = v.derivative {
                check_index(state, count, || format!("derivative of '{}'", v.name))?;
            }
        }

        let structure = match root.child("ModelStructure") {
            Some(node) => parse_structure(node, &variables)?,
            None => ModelStructure::default(),
        };

        let aliases = AliasIndex::build(&mut variables, &declared_alias)?;

        let mut name_order: Vec<usize> = (0..count).collect();
        name_order.sort_by(|&a, &b| variables[a].name.as_bytes().cmp(variables[b].name.as_bytes()));
        let mut reference_order: Vec<usize> = (0..count).collect();
        reference_order.sort_by_key(|&i| (variables[i].base_type, variables[i].value_reference, i));

        tracing::debug!(
            model = %info.model_name,
            kind = ?kind,
            variables = count,
            alias_groups = aliases.len(),
            states = structure.derivatives.len(),
            event_indicators = info.number_of_event_indicators,
            "Built model description"
        );

        Ok(ModelDescription {
            info,
            kind,
            model_exchange,
            co_simulation,
            default_experiment,
            units,
            type_definitions,
            log_categories,
            vendors,
            variables,
            name_order,
            reference_order,
            aliases,
            structure,
        })
    }
}

fn parse_info(root: &DescNode) -> DescResult<ModelInfo> {
    let raw_version = root.required_attr("fmiVersion")?;
    let fmi_version = match FmiVersion::from_attribute(raw_version) {
        Ok(FmiVersion::V2_0) => FmiVersion::V2_0,
        _ => {
            return Err(DescriptionError::UnsupportedVersion {
                version: raw_version.to_string(),
            })
        }
    };

    let text = |name: &str| root.attr(name).map(str::to_string);
    Ok(ModelInfo {
        fmi_version,
        model_name: root.required_attr("modelName")?.to_string(),
        guid: root.required_attr("guid")?.to_string(),
        description: text("description"),
        author: text("author"),
        version: text("version"),
        copyright: text("copyright"),
        license: text("license"),
        generation_tool: text("generationTool"),
        generation_date_and_time: text("generationDateAndTime"),
        naming_convention: root.parse_attr("variableNamingConvention")?.unwrap_or_default(),
        number_of_event_indicators: root.parse_attr("numberOfEventIndicators")?.unwrap_or(0),
    })
}

fn parse_interface(node: &DescNode, kind: InterfaceKind) -> DescResult<InterfaceInfo> {
    let mut info = InterfaceInfo {
        model_identifier: node.required_attr("modelIdentifier")?.to_string(),
        needs_execution_tool: node.bool_attr("needsExecutionTool", false)?,
        can_be_instantiated_only_once_per_process: node
            .bool_attr("canBeInstantiatedOnlyOncePerProcess", false)?,
        can_not_use_memory_management_functions: node
            .bool_attr("canNotUseMemoryManagementFunctions", false)?,
        can_get_and_set_fmu_state: node.bool_attr("canGetAndSetFMUstate", false)?,
        can_serialize_fmu_state: node.bool_attr("canSerializeFMUstate", false)?,
        provides_directional_derivative: node.bool_attr("providesDirectionalDerivative", false)?,
        source_files: match node.child("SourceFiles") {
            Some(files) => files
                .children_named("File")
                .map(|f| f.required_attr("name").map(str::to_string))
                .collect::<DescResult<_>>()?,
            None => Vec::new(),
        },
        ..Default::default()
    };

    match kind {
        InterfaceKind::ModelExchange => {
            info.completed_integrator_step_not_needed =
                node.bool_attr("completedIntegratorStepNotNeeded", false)?;
        }
        InterfaceKind::CoSimulation => {
            info.can_handle_variable_communication_step_size =
                node.bool_attr("canHandleVariableCommunicationStepSize", false)?;
            info.can_interpolate_inputs = node.bool_attr("canInterpolateInputs", false)?;
            info.max_output_derivative_order =
                node.parse_attr("maxOutputDerivativeOrder")?.unwrap_or(0);
            info.can_run_asynchronuously = node.bool_attr("canRunAsynchronuously", false)?;
        }
    }
    Ok(info)
}

fn parse_unit(node: &DescNode) -> DescResult<Unit> {
    let mut unit = Unit::new(node.required_attr("name")?);
    if let Some(base) = node.child("BaseUnit") {
        let exponent = |name: &str| -> DescResult<i32> { Ok(base.parse_attr(name)?.unwrap_or(0)) };
        unit.base_unit = Some(BaseUnit {
            kg: exponent("kg")?,
            m: exponent("m")?,
            s: exponent("s")?,
            a: exponent("A")?,
            k: exponent("K")?,
            mol: exponent("mol")?,
            cd: exponent("cd")?,
            rad: exponent("rad")?,
            factor: base.parse_attr("factor")?.unwrap_or(1.0),
            offset: base.parse_attr("offset")?.unwrap_or(0.0),
        });
    }
    for display in node.children_named("DisplayUnit") {
        unit.display_units.push(DisplayUnit {
            name: display.required_attr("name")?.to_string(),
            factor: display.parse_attr("factor")?.unwrap_or(1.0),
            offset: display.parse_attr("offset")?.unwrap_or(0.0),
        });
    }
    Ok(unit)
}

/// The single child naming the base type (`<Real .../>`, `<Integer/>` ...).
fn type_element<'a>(node: &'a DescNode) -> DescResult<(BaseType, &'a DescNode)> {
    node.children
        .iter()
        .find_map(|c| c.name.parse::<BaseType>().ok().map(|t| (t, c)))
        .ok_or_else(|| {
            DescriptionError::missing_element(format!("{} type element", node.name), node.line)
        })
}

fn parse_simple_type(node: &DescNode) -> DescResult<TypeDefinition> {
    let (base_type, element) = type_element(node)?;
    let items = element
        .children_named("Item")
        .map(|item| -> DescResult<EnumerationItem> {
            Ok(EnumerationItem {
                name: item.required_attr("name")?.to_string(),
                value: item
                    .parse_attr("value")?
                    .ok_or_else(|| DescriptionError::missing_attribute("Item.value", item.line))?,
                description: item.attr("description").map(str::to_string),
            })
        })
        .collect::<DescResult<_>>()?;

    Ok(TypeDefinition {
        name: node.required_attr("name")?.to_string(),
        description: node.attr("description").map(str::to_string),
        base_type,
        quantity: element.attr("quantity").map(str::to_string),
        unit: element.attr("unit").map(str::to_string),
        display_unit: element.attr("displayUnit").map(str::to_string),
        relative_quantity: element.bool_attr("relativeQuantity", false)?,
        min: element.parse_attr("min")?,
        max: element.parse_attr("max")?,
        nominal: element.parse_attr("nominal")?,
        unbounded: element.bool_attr("unbounded", false)?,
        items,
    })
}

fn parse_start(element: &DescNode, base_type: BaseType) -> DescResult<Option<StartValue>> {
    Ok(match base_type {
        BaseType::Real => element.parse_attr("start")?.map(StartValue::Real),
        BaseType::Integer => element.parse_attr("start")?.map(StartValue::Integer),
        BaseType::Enumeration => element.parse_attr("start")?.map(StartValue::Enumeration),
        BaseType::String => element.attr("start").map(|s| StartValue::String(s.to_string())),
        BaseType::Boolean => match element.attr("start") {
            None => None,
            Some(_) => Some(StartValue::Boolean(element.bool_attr("start", false)?)),
        },
    })
}

fn parse_variable(
    node: &DescNode,
    index: usize,
    types: &[TypeDefinition],
) -> DescResult<(Variable, Option<AliasKind>)> {
    let name = node.required_attr("name")?.to_string();
    let value_reference = node
        .parse_attr("valueReference")?
        .ok_or_else(|| DescriptionError::missing_attribute("ScalarVariable.valueReference", node.line))?;
    let (base_type, element) = type_element(node)?;

    let declared_type = element.attr("declaredType").map(str::to_string);
    let declared = match &declared_type {
        Some(type_name) => {
            let def = types.iter().find(|t| &t.name == type_name).ok_or_else(|| {
                DescriptionError::invalid_value(
                    format!("{}.declaredType", element.name),
                    element.line,
                    format!("no type definition named '{type_name}'"),
                )
            })?;
            if def.base_type != base_type {
                return Err(DescriptionError::invalid_value(
                    format!("{}.declaredType", element.name),
                    element.line,
                    format!("'{type_name}' is a {} type", def.base_type),
                ));
            }
            Some(def)
        }
        None => None,
    };

    let inherit_text = |attr: &str, fallback: Option<&Option<String>>| {
        element
            .attr(attr)
            .map(str::to_string)
            .or_else(|| fallback.and_then(|f| f.clone()))
    };
    let inherit_number = |attr: &str, fallback: Option<Option<f64>>| -> DescResult<Option<f64>> {
        Ok(element.parse_attr(attr)?.or(fallback.flatten()))
    };

    let variable = Variable {
        name,
        value_reference,
        base_type,
        description: node.attr("description").map(str::to_string),
        causality: node.parse_attr("causality")?.unwrap_or_default(),
        variability: node.parse_attr("variability")?.unwrap_or_default(),
        initial: node.parse_attr("initial")?,
        quantity: inherit_text("quantity", declared.map(|d| &d.quantity)),
        unit: inherit_text("unit", declared.map(|d| &d.unit)),
        display_unit: inherit_text("displayUnit", declared.map(|d| &d.display_unit)),
        relative_quantity: element
            .bool_attr("relativeQuantity", declared.map_or(false, |d| d.relative_quantity))?,
        min: inherit_number("min", declared.map(|d| d.min))?,
        max: inherit_number("max", declared.map(|d| d.max))?,
        nominal: inherit_number("nominal", declared.map(|d| d.nominal))?,
        unbounded: element.bool_attr("unbounded", declared.map_or(false, |d| d.unbounded))?,
        start: parse_start(element, base_type)?,
        derivative: element.parse_attr("derivative")?,
        reinit: element.bool_attr("reinit", false)?,
        can_handle_multiple_set_per_time_instant: node
            .bool_attr("canHandleMultipleSetPerTimeInstant", true)?,
        declared_type,
        index,
        alias_kind: AliasKind::NoAlias,
        alias_group: 0,
    };

    let alias = node.parse_attr::<AliasKind>("alias")?;
    Ok((variable, alias))
}

fn check_index(index: usize, count: usize, context: impl FnOnce() -> String) -> DescResult<usize> {
    if index == 0 || index > count {
        return Err(DescriptionError::InvalidIndex {
            context: context(),
            index,
            count,
        });
    }
    Ok(index)
}

fn parse_structure(node: &DescNode, variables: &[Variable]) -> DescResult<ModelStructure> {
    let mut structure = ModelStructure::default();
    for category in DependencyCategory::ALL {
        let Some(list) = node.child(category.element_name()) else {
            continue;
        };
        let (unknowns, record) = parse_unknowns(list, category, variables)?;
        match category {
            DependencyCategory::Outputs => {
                structure.outputs = unknowns;
                structure.outputs_deps = record;
            }
            DependencyCategory::Derivatives => {
                structure.derivatives = unknowns;
                structure.derivatives_deps = record;
            }
            DependencyCategory::DiscreteStates => {
                structure.discrete_states = unknowns;
                structure.discrete_states_deps = record;
            }
            DependencyCategory::InitialUnknowns => {
                structure.initial_unknowns = unknowns;
                structure.initial_unknowns_deps = record;
            }
        }
    }
    Ok(structure)
}

/// Unknown positions (0-based) of one category plus its dependency record.
fn parse_unknowns(
    list: &DescNode,
    category: DependencyCategory,
    variables: &[Variable],
) -> DescResult<(Vec<usize>, Option<DependencyRecord>)> {
    let count = variables.len();
    let mut unknowns = Vec::new();
    let mut rows = Vec::new();
    let mut any_declared = false;

    for unknown in list.children_named("Unknown") {
        let context = || format!("{} unknown at line {}", category.element_name(), unknown.line);
        let index = unknown
            .parse_attr::<usize>("index")?
            .ok_or_else(|| DescriptionError::missing_attribute("Unknown.index", unknown.line))?;
        check_index(index, count, context)?;

        if category == DependencyCategory::Derivatives && variables[index - 1].derivative.is_none() {
            return Err(DescriptionError::invalid_value(
                "Unknown.index",
                unknown.line,
                format!("'{}' is not a state derivative", variables[index - 1].name),
            ));
        }
        unknowns.push(index - 1);

        let row = match unknown.attr("dependencies") {
            None => UnknownRow {
                dependencies: vec![Dependency::All],
                factor_kinds: None,
            },
            Some(raw) => {
                any_declared = true;
                let dependencies = raw
                    .split_whitespace()
                    .map(|token| -> DescResult<Dependency> {
                        let dep: usize = token.parse().map_err(|_| {
                            DescriptionError::invalid_value(
                                "Unknown.dependencies",
                                unknown.line,
                                format!("'{token}' is not an index"),
                            )
                        })?;
                        let dep = check_index(dep, count, context)?;
                        Ok(NonZeroUsize::new(dep).map_or(Dependency::All, Dependency::Variable))
                    })
                    .collect::<DescResult<Vec<_>>>()?;
                let factor_kinds = unknown
                    .attr("dependenciesKind")
                    .map(|kinds| {
                        kinds
                            .split_whitespace()
                            .map(|k| {
                                k.parse::<DependencyFactorKind>().map_err(|e| {
                                    DescriptionError::invalid_value(
                                        "Unknown.dependenciesKind",
                                        unknown.line,
                                        e.to_string(),
                                    )
                                })
                            })
                            .collect::<DescResult<Vec<_>>>()
                    })
                    .transpose()?;
                UnknownRow {
                    dependencies,
                    factor_kinds,
                }
            }
        };
        rows.push(row);
    }

    let record = if any_declared {
        Some(DependencyRecord::from_rows(rows)?)
    } else {
        None
    };
    Ok((unknowns, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable_list::SortOrder;
    use crate::Capability;
    use lib_types::{Causality, Variability};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fmiModelDescription fmiVersion="2.0" modelName="BouncingBall"
    guid="{8c4e810f-3df3-4a00-8276-176fa3c9f000}" description="A bouncing ball"
    author="Test" numberOfEventIndicators="1" variableNamingConvention="structured">
  <ModelExchange modelIdentifier="bouncingBall" canGetAndSetFMUstate="true">
    <SourceFiles><File name="bouncingBall.c"/></SourceFiles>
  </ModelExchange>
  <CoSimulation modelIdentifier="bouncingBall" canHandleVariableCommunicationStepSize="true"
      maxOutputDerivativeOrder="2"/>
  <UnitDefinitions>
    <Unit name="m"><BaseUnit m="1"/><DisplayUnit name="mm" factor="1000"/></Unit>
    <Unit name="m/s"><BaseUnit m="1" s="-1"/></Unit>
  </UnitDefinitions>
  <TypeDefinitions>
    <SimpleType name="Position"><Real quantity="Length" unit="m" min="0"/></SimpleType>
    <SimpleType name="Mode">
      <Enumeration>
        <Item name="falling" value="1"/>
        <Item name="resting" value="2"/>
      </Enumeration>
    </SimpleType>
  </TypeDefinitions>
  <LogCategories><Category name="logAll" description="everything"/></LogCategories>
  <DefaultExperiment startTime="0" stopTime="3" tolerance="1e-6"/>
  <VendorAnnotations><Tool name="Dymola"/></VendorAnnotations>
  <ModelVariables>
    <ScalarVariable name="h" valueReference="0" causality="output" variability="continuous" initial="exact">
      <Real declaredType="Position" start="1"/>
    </ScalarVariable>
    <ScalarVariable name="der(h)" valueReference="1" causality="local" variability="continuous">
      <Real unit="m/s" derivative="1"/>
    </ScalarVariable>
    <ScalarVariable name="v" valueReference="2" causality="output" variability="continuous" initial="exact">
      <Real unit="m/s" start="0" reinit="true"/>
    </ScalarVariable>
    <ScalarVariable name="der(v)" valueReference="3" causality="local" variability="continuous">
      <Real derivative="3"/>
    </ScalarVariable>
    <ScalarVariable name="g" valueReference="4" causality="parameter" variability="fixed" initial="exact">
      <Real start="-9.81"/>
    </ScalarVariable>
    <ScalarVariable name="height" valueReference="0" causality="local" alias="alias">
      <Real/>
    </ScalarVariable>
    <ScalarVariable name="depth" valueReference="0" causality="local" alias="negatedAlias">
      <Real/>
    </ScalarVariable>
    <ScalarVariable name="mode" valueReference="0" causality="local" variability="discrete">
      <Enumeration declaredType="Mode" start="1"/>
    </ScalarVariable>
    <ScalarVariable name="bounces" valueReference="0" causality="output" variability="discrete">
      <Integer start="0"/>
    </ScalarVariable>
  </ModelVariables>
  <ModelStructure>
    <Outputs>
      <Unknown index="1" dependencies="" />
      <Unknown index="3" dependencies="1 5" dependenciesKind="dependent fixed"/>
      <Unknown index="9"/>
    </Outputs>
    <Derivatives>
      <Unknown index="2"/>
      <Unknown index="4"/>
    </Derivatives>
  </ModelStructure>
</fmiModelDescription>
"#;

    fn model() -> ModelDescription {
        ModelDescription::parse(SAMPLE).unwrap()
    }

    #[test]
    fn test_header_and_capabilities() {
        let md = model();
        assert_eq!(md.model_name(), "BouncingBall");
        assert_eq!(md.fmi_version(), FmiVersion::V2_0);
        assert_eq!(md.kind(), FmuKind::ModelExchangeAndCoSimulation);
        assert_eq!(md.model_identifier(InterfaceKind::ModelExchange), Some("bouncingBall"));
        assert_eq!(md.capability(Capability::MeCanGetAndSetFmuState), 1);
        assert_eq!(md.capability(Capability::MeCanSerializeFmuState), 0);
        assert_eq!(md.capability(Capability::CsMaxOutputDerivativeOrder), 2);
        assert_eq!(md.capability(Capability::CsCanHandleVariableCommunicationStepSize), 1);
        assert_eq!(md.number_of_event_indicators(), 1);
        assert_eq!(md.number_of_continuous_states(), 2);
        assert_eq!(md.default_experiment().stop_time, Some(3.0));
        assert_eq!(md.default_experiment().step_size, None);
        assert_eq!(md.vendors(), &["Dymola".to_string()]);
        assert_eq!(md.log_categories()[0].name, "logAll");
        assert_eq!(
            md.interface(InterfaceKind::ModelExchange).unwrap().source_files,
            vec!["bouncingBall.c".to_string()]
        );
    }

    #[test]
    fn test_declared_type_inheritance() {
        let md = model();
        let h = md.variable_by_name("h").unwrap();
        assert_eq!(h.unit.as_deref(), Some("m"));
        assert_eq!(h.quantity.as_deref(), Some("Length"));
        assert_eq!(h.min, Some(0.0));
        assert_eq!(h.start, Some(StartValue::Real(1.0)));
        assert_eq!(md.variable_unit(h).unwrap().display_unit("mm").unwrap().factor, 1000.0);

        let mode = md.variable_by_name("mode").unwrap();
        let ty = md.variable_type(mode).unwrap();
        assert_eq!(ty.item_by_value(2).map(|i| i.name.as_str()), Some("resting"));

        let g = md.variable_by_name("g").unwrap();
        assert_eq!(g.causality, Causality::Parameter);
        assert_eq!(g.variability, Variability::Fixed);
    }

    #[test]
    fn test_lookup_by_name_and_reference() {
        let md = model();
        assert!(md.variable_by_name("H").is_none());
        assert_eq!(md.variable_by_name("der(v)").unwrap().value_reference, 3);

        // Same value reference, different base types.
        assert_eq!(md.variable_by_vr(BaseType::Real, 0).unwrap().name, "h");
        assert_eq!(md.variable_by_vr(BaseType::Integer, 0).unwrap().name, "bounces");
        assert_eq!(md.variable_by_vr(BaseType::Enumeration, 0).unwrap().name, "mode");
        assert!(md.variable_by_vr(BaseType::Boolean, 0).is_none());
        assert!(md.variable_by_vr(BaseType::Real, 99).is_none());
    }

    #[test]
    fn test_alias_groups() {
        let md = model();
        for v in md.variables() {
            let base = md.alias_base(v).unwrap();
            assert!(std::ptr::eq(md.alias_base(base).unwrap(), base));
            assert!(std::ptr::eq(md.aliases_of(v).unwrap().first().unwrap(), base));
        }

        let depth = md.variable_by_name("depth").unwrap();
        assert!(depth.is_negated_alias());
        assert_eq!(md.alias_base(depth).unwrap().name, "h");
        assert_eq!(md.aliases_of(depth).unwrap().names(), vec!["h", "height", "depth"]);
        assert_eq!(md.alias_group_count(), md.variable_count() - 2);
        assert_eq!(md.aliases_of(md.variable_by_name("g").unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_variable_from_other_model_is_rejected() {
        let md = model();
        let small = ModelDescription::parse(
            r#"<fmiModelDescription fmiVersion="2.0" modelName="Small" guid="{s}">
  <CoSimulation modelIdentifier="small"/>
  <ModelVariables>
    <ScalarVariable name="x" valueReference="0"><Real/></ScalarVariable>
  </ModelVariables>
  <ModelStructure/>
</fmiModelDescription>"#,
        )
        .unwrap();

        // Out of range for the small model.
        let bounces = md.variable_by_name("bounces").unwrap();
        assert!(small.alias_base(bounces).is_none());
        assert!(small.aliases_of(bounces).is_none());
        assert!(small.single_variable_list(bounces).is_none());

        // In range, but a different variable.
        let x = small.variable_by_name("x").unwrap();
        assert!(md.alias_base(x).is_none());
        assert!(md.aliases_of(x).is_none());
    }

    #[test]
    fn test_sort_orders_are_permutations() {
        let md = model();
        let declaration = md.variable_list(SortOrder::Declaration);
        for order in [SortOrder::Name, SortOrder::TypeAndValueReference] {
            let sorted = md.variable_list(order);
            assert_eq!(sorted.len(), declaration.len());
            assert!(declaration.iter().all(|v| sorted.contains(v)));
            assert_eq!(sorted, md.variable_list(order));
            assert_eq!(sorted, declaration.sorted(order));
        }

        let by_name = md.variable_list(SortOrder::Name);
        assert_eq!(by_name.names()[..3], ["bounces", "depth", "der(h)"]);

        let by_reference = md.variable_list(SortOrder::TypeAndValueReference);
        assert_eq!(
            by_reference.names(),
            vec!["h", "height", "depth", "der(h)", "v", "der(v)", "g", "bounces", "mode"]
        );
    }

    #[test]
    fn test_structure_lists() {
        let md = model();
        assert_eq!(md.outputs_list().names(), vec!["h", "v", "bounces"]);
        assert_eq!(md.derivatives_list().names(), vec!["der(h)", "der(v)"]);
        assert_eq!(md.continuous_states_list().names(), vec!["h", "v"]);
        assert!(md.discrete_states_list().is_empty());
    }

    #[test]
    fn test_dependency_records() {
        let md = model();
        let outputs = md.outputs_dependencies().unwrap();
        assert_eq!(outputs.row_count(), 3);
        assert_eq!(outputs.start_indices(), &[0, 0, 2, 3]);

        assert!(outputs.row(0).unwrap().is_empty());
        let row1 = outputs.row(1).unwrap();
        assert!(row1.kinds_declared());
        assert_eq!(row1.factor_kinds(), &[DependencyFactorKind::Dependent, DependencyFactorKind::Fixed]);
        let resolved: Vec<_> = row1
            .dependencies()
            .iter()
            .filter_map(|d| md.resolve_dependency(*d))
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(resolved, vec!["h", "g"]);

        let row2 = outputs.row(2).unwrap();
        assert!(row2.depends_on_all());
        assert!(!row2.kinds_declared());
        assert!(md.resolve_dependency(Dependency::All).is_none());

        // Rows exist but none declares dependencies: nothing declared.
        assert!(md.derivatives_dependencies().is_none());
        assert!(md.discrete_states_dependencies().is_none());
        assert!(md.initial_unknowns_dependencies().is_none());
    }

    #[test]
    fn test_rejects_bad_descriptions() {
        let v1 = r#"<fmiModelDescription fmiVersion="1.0" modelName="x" guid="g"><ModelExchange modelIdentifier="x"/><ModelVariables/></fmiModelDescription>"#;
        assert!(matches!(
            ModelDescription::parse(v1),
            Err(DescriptionError::UnsupportedVersion { .. })
        ));

        let no_interface = r#"<fmiModelDescription fmiVersion="2.0" modelName="x" guid="g"><ModelVariables/></fmiModelDescription>"#;
        assert!(matches!(
            ModelDescription::parse(no_interface),
            Err(DescriptionError::Missing { .. })
        ));

        let duplicate = r#"<fmiModelDescription fmiVersion="2.0" modelName="x" guid="g">
<CoSimulation modelIdentifier="x"/>
<ModelVariables>
<ScalarVariable name="a" valueReference="0"><Real/></ScalarVariable>
<ScalarVariable name="a" valueReference="1"><Real/></ScalarVariable>
</ModelVariables></fmiModelDescription>"#;
        assert!(matches!(
            ModelDescription::parse(duplicate),
            Err(DescriptionError::DuplicateName { name }) if name == "a"
        ));

        let bad_index = r#"<fmiModelDescription fmiVersion="2.0" modelName="x" guid="g">
<CoSimulation modelIdentifier="x"/>
<ModelVariables><ScalarVariable name="a" valueReference="0" causality="output"><Real/></ScalarVariable></ModelVariables>
<ModelStructure><Outputs><Unknown index="1" dependencies="2"/></Outputs></ModelStructure>
</fmiModelDescription>"#;
        assert!(matches!(
            ModelDescription::parse(bad_index),
            Err(DescriptionError::InvalidIndex { index: 2, count: 1, .. })
        ));

        let two_bases = r#"<fmiModelDescription fmiVersion="2.0" modelName="x" guid="g">
<CoSimulation modelIdentifier="x"/>
<ModelVariables>
<ScalarVariable name="a" valueReference="0" alias="noAlias"><Real/></ScalarVariable>
<ScalarVariable name="b" valueReference="0" alias="noAlias"><Real/></ScalarVariable>
</ModelVariables></fmiModelDescription>"#;
        assert!(matches!(
            ModelDescription::parse(two_bases),
            Err(DescriptionError::AliasConflict { value_reference: 0, .. })
        ));
    }

    #[test]
    fn test_from_programmatic_node() {
        let root = DescNode::new(ROOT)
            .with_attr("fmiVersion", "2.0")
            .with_attr("modelName", "tiny")
            .with_attr("guid", "{0}")
            .with_child(DescNode::new("CoSimulation").with_attr("modelIdentifier", "tiny"))
            .with_child(
                DescNode::new("ModelVariables").with_child(
                    DescNode::new("ScalarVariable")
                        .with_attr("name", "flag")
                        .with_attr("valueReference", "7")
                        .with_child(DescNode::new("Boolean").with_attr("start", "true")),
                ),
            );
        let md = ModelDescription::from_node(&root).unwrap();
        assert_eq!(md.kind(), FmuKind::CoSimulation);
        let flag = md.variable_by_vr(BaseType::Boolean, 7).unwrap();
        assert_eq!(flag.start, Some(StartValue::Boolean(true)));
        assert!(md.outputs_dependencies().is_none());
        assert_eq!(md.number_of_continuous_states(), 0);
    }
}
