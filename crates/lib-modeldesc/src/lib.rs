//! # lib-modeldesc
//!
//! Model description reader and in-memory model for FMI 2.0 units.
//!
//! This crate provides:
//! - a small `nom` reader that turns `modelDescription.xml` into a generic
//!   [`DescNode`] tree
//! - the [`ModelDescription`] built from that tree: variables, types, units,
//!   alias groups and name/reference indices
//! - [`VariableList`] views in declaration, name or type/reference order
//! - row-compressed [`DependencyRecord`]s for the model structure
//!
//! The model is immutable once built and can be shared freely between
//! threads.

mod builder;
pub mod dependencies;
pub mod error;
pub mod model;
pub mod node;
pub mod variable;
pub mod variable_list;
pub mod xml;

mod alias;

pub use dependencies::{
    Dependency, DependencyCategory, DependencyError, DependencyRecord, DependencyRow, UnknownRow,
};
pub use error::{DescResult, DescriptionError};
pub use model::{Capability, DefaultExperiment, InterfaceInfo, LogCategory, ModelDescription, ModelInfo};
pub use node::DescNode;
pub use variable::{EnumerationItem, TypeDefinition, Variable};
pub use variable_list::{SortOrder, VariableList};
