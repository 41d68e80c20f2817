//! Print what a model description declares and, optionally, what its
//! binary exports.
//!
//! ```text
//! cargo run --example inspect_model -- path/to/modelDescription.xml [path/to/extracted/fmu [dispatch.toml]]
//! ```
//!
//! With an extracted unit, the binary is also instantiated once to ask for
//! its version; the optional dispatch file sets the log threshold and call
//! deadline. Set `RUST_LOG=debug` to see the reader's and the binder's log
//! output.

use anyhow::{Context, Result};
use lib_fmi_ffi::loader::binary_path;
use lib_fmi_ffi::{call_protected, BindingTable, DispatchConfig, FmuLibrary, TracingSink, UnitHandle};
use lib_modeldesc::{DependencyCategory, ModelDescription, SortOrder};
use lib_types::InterfaceKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let description_path: PathBuf = args
        .next()
        .context("usage: inspect_model <modelDescription.xml> [fmu-root [dispatch.toml]]")?
        .into();
    let fmu_root = args.next().map(PathBuf::from);
    let config = match args.next() {
        Some(path) => DispatchConfig::load(&path).with_context(|| format!("Failed to load {path}"))?,
        None => DispatchConfig::default(),
    };

    let model = ModelDescription::from_file(&description_path)
        .with_context(|| format!("Failed to read {}", description_path.display()))?;

    print_header(&model);
    print_variables(&model);
    print_structure(&model);

    if let Some(root) = fmu_root {
        inspect_binary(Arc::new(model), &root, &config)?;
    }

    Ok(())
}

fn print_header(model: &ModelDescription) {
    let info = model.info();
    println!("Model:       {} (FMI {})", info.model_name, info.fmi_version);
    println!("GUID:        {}", info.guid);
    if let Some(tool) = &info.generation_tool {
        println!("Generated:   {tool}");
    }
    println!("Kind:        {:?}", model.kind());
    for kind in InterfaceKind::ALL {
        if let Some(id) = model.model_identifier(*kind) {
            println!("  {kind}: {id}");
        }
    }
    println!("States:      {}", model.number_of_continuous_states());
    println!("Indicators:  {}", model.number_of_event_indicators());

    let experiment = model.default_experiment();
    println!(
        "Experiment:  start={:?} stop={:?} tol={:?} step={:?}",
        experiment.start_time, experiment.stop_time, experiment.tolerance, experiment.step_size
    );
    for unit in model.units() {
        println!("Unit:        {}", unit.name);
    }
}

fn print_variables(model: &ModelDescription) {
    println!("\nVariables ({} alias groups):", model.alias_group_count());
    for variable in model.variable_list(SortOrder::TypeAndValueReference).iter() {
        let alias = match model.alias_base(variable) {
            Some(base) if variable.is_alias() => format!(" -> {}", base.name),
            _ => String::new(),
        };
        println!(
            "  {:>4} {:<12} {:<24} {:<10} {:<10}{}",
            variable.value_reference,
            variable.base_type.to_string(),
            variable.name,
            variable.causality.to_string(),
            variable.variability.to_string(),
            alias
        );
    }
}

fn print_structure(model: &ModelDescription) {
    for category in DependencyCategory::ALL {
        let unknowns = model.unknowns_list(category);
        if unknowns.is_empty() {
            continue;
        }
        println!("\n{}:", category.element_name());
        let record = model.dependencies(category);
        for (row_index, unknown) in unknowns.iter().enumerate() {
            let deps = match record.and_then(|r| r.row(row_index)) {
                None => "(not declared)".to_string(),
                Some(row) if row.depends_on_all() => "all knowns".to_string(),
                Some(row) => row
                    .dependencies()
                    .iter()
                    .filter_map(|d| model.resolve_dependency(*d))
                    .map(|v| v.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            println!("  {:<24} <- {deps}", unknown.name);
        }
    }
}

fn inspect_binary(model: Arc<ModelDescription>, root: &std::path::Path, config: &DispatchConfig) -> Result<()> {
    let kind = if model.kind().supports(InterfaceKind::ModelExchange) {
        InterfaceKind::ModelExchange
    } else {
        InterfaceKind::CoSimulation
    };
    let identifier = model
        .model_identifier(kind)
        .context("Model has no identifier for the chosen interface")?;
    let path = binary_path(root, identifier);

    let library = FmuLibrary::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let table = BindingTable::bind(library, kind, model.fmi_version())
        .with_context(|| format!("Failed to bind {kind} procedures"))?;

    println!("\nBinary:      {}", path.display());
    let common = table.common();
    println!("  FMU state:            {}", common.get_fmu_state.is_some());
    println!("  Serialize FMU state:  {}", common.serialize_fmu_state.is_some());
    println!("  Directional derivs:   {}", common.get_directional_derivative.is_some());
    if let Some(me) = table.model_exchange() {
        println!("  Completed step:       {}", me.completed_integrator_step.is_some());
    }
    if let Some(cs) = table.co_simulation() {
        println!("  Cancel step:          {}", cs.cancel_step.is_some());
    }

    let resources = format!("file://{}", root.join("resources").display());
    let sink = Arc::new(TracingSink::from_config(config));
    let handle = UnitHandle::instantiate(Arc::new(table), model, sink, &resources, config)
        .context("Failed to instantiate the unit")?;
    let handle = Arc::new(Mutex::new(handle));
    let (version, platform) = call_protected(&handle, config, |unit| {
        Ok::<_, lib_fmi_ffi::FmiError>((unit.get_version()?, unit.get_types_platform()?))
    })??;
    println!("  Version:              {version}");
    println!("  Types platform:       {platform}");
    Ok(())
}
