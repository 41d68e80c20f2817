//! # lib-fmi-ffi
//!
//! Safe binding and call dispatch for native FMI 2.0 binaries.
//!
//! This crate turns a unit's shared library into typed, mode-checked calls:
//!
//! - Dynamic library loading with `libloading`
//! - A binding table of every FMI 2.0 procedure, resolved once per module
//! - A lifecycle guard that rejects calls made in the wrong mode
//! - A dispatcher that checks buffer lengths against the model description,
//!   logs each call to a diagnostic sink and returns the unit's status verbatim
//! - Deadline-protected calls on a worker thread
//!
//! # Safety
//!
//! Native units are trusted to follow the FMI 2.0 calling conventions. The
//! checks done here are the ones the standard puts on the caller: legal
//! call order, buffer sizes and not touching an instance after a fatal
//! status.

pub mod binding;
pub mod callbacks;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use binding::BindingTable;
pub use config::DispatchConfig;
pub use diagnostics::{CaptureSink, DiagnosticRecord, DiagnosticSink, Severity, TracingSink};
pub use dispatch::{FmuState, IntegratorStep, UnitHandle};
pub use error::{BindingError, FmiError, FmiResult, PreconditionError, StateError};
pub use lifecycle::{ModeGuard, Operation};
pub use loader::{FmuLibrary, LibraryFormat, RawSymbol, SymbolResolver};
pub use watchdog::{abandoned_workers, call_protected, call_with_deadline};
