//! # lib-types
//!
//! Core type definitions shared by the FMU import kernel.
//!
//! This crate provides the vocabulary used throughout the workspace:
//! - FMI 2.0 enumerations (status, base type, causality, variability, ...)
//! - Lifecycle modes of an FMU instance
//! - Unit definitions with SI and display-unit conversions

pub mod fmi;
pub mod mode;
pub mod units;

pub use fmi::*;
pub use mode::LifecycleMode;
pub use units::{BaseUnit, DisplayUnit, Unit};
