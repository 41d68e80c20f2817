//! Dynamic library loading for FMU binaries.
//!
//! The binding layer only needs a way to look up exported symbols, which
//! is the [`SymbolResolver`] trait. [`FmuLibrary`] implements it on top of
//! `libloading`; tests implement it with in-process function tables.

use crate::error::{FmiError, FmiResult};
use libloading::Library;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

/// Address of an exported procedure, not yet given a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

impl RawSymbol {
    /// Wrap an address, `None` for null.
    pub fn new(address: *mut c_void) -> Option<Self> {
        NonNull::new(address).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the address as a typed function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be an `unsafe extern "C" fn` type whose signature matches
    /// the exported procedure exactly.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>(),
            "symbol cast to a non-pointer type"
        );
        // SAFETY: Caller guarantees F is a function pointer of the right signature.
        unsafe { std::mem::transmute_copy::<*mut c_void, F>(&self.0.as_ptr()) }
    }
}

// Code addresses are immutable and valid for as long as the module is
// loaded, which the binding table guarantees by holding the resolver.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

/// Symbol lookup capability of a loaded native module.
pub trait SymbolResolver: Send + Sync {
    /// Address of `symbol`, `None` when it is not exported.
    fn resolve(&self, symbol: &str) -> Option<RawSymbol>;

    /// Human-readable origin, used in log records.
    fn describe(&self) -> String {
        "<in-process module>".to_string()
    }
}

/// Loaded FMU binary.
pub struct FmuLibrary {
    library: Library,

    /// Path to the library file.
    pub path: PathBuf,

    pub format: LibraryFormat,
}

impl FmuLibrary {
    /// Load an FMU binary from a shared library file.
    ///
    /// Loading runs the library's initializers; the binary is trusted to
    /// be a well-formed FMI 2.0 export.
    pub fn load<P: AsRef<Path>>(path: P) -> FmiResult<Arc<Self>> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        // SAFETY: Loading foreign code is inherently unsafe; libloading
        // reports missing files and unresolved dependencies as errors.
        let library =
            unsafe { Library::new(path) }.map_err(|e| FmiError::load_error(&path_str, e))?;

        tracing::info!(path = %path_str, "Loaded FMU library");

        Ok(Arc::new(Self {
            library,
            path: path.to_path_buf(),
            format: LibraryFormat::from_path(path),
        }))
    }
}

impl SymbolResolver for FmuLibrary {
    fn resolve(&self, symbol: &str) -> Option<RawSymbol> {
        // SAFETY: The address is only reinterpreted by the binding table,
        // with the signature the standard assigns to this name.
        let address = unsafe { self.library.get::<*mut c_void>(symbol.as_bytes()) }.ok()?;
        RawSymbol::new(*address)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl std::fmt::Debug for FmuLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FmuLibrary")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish()
    }
}

/// Platform-specific library format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryFormat {
    /// Windows DLL.
    Dll,
    /// Linux/Unix shared object.
    So,
    /// macOS dynamic library.
    Dylib,
    /// Unknown format.
    Unknown,
}

impl LibraryFormat {
    /// Detect format from file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("dll") | Some("DLL") => Self::Dll,
            Some("so") => Self::So,
            Some("dylib") => Self::Dylib,
            _ => Self::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Dll => "dll",
            Self::So => "so",
            Self::Dylib => "dylib",
            Self::Unknown => "",
        }
    }

    /// Get the default format for the current platform.
    #[cfg(target_os = "windows")]
    pub fn native() -> Self {
        Self::Dll
    }

    #[cfg(target_os = "linux")]
    pub fn native() -> Self {
        Self::So
    }

    #[cfg(target_os = "macos")]
    pub fn native() -> Self {
        Self::Dylib
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    pub fn native() -> Self {
        Self::Unknown
    }
}

/// Platform folder under `binaries/` in an extracted FMU.
pub fn platform_folder() -> &'static str {
    match (std::env::consts::OS, cfg!(target_pointer_width = "64")) {
        ("windows", true) => "win64",
        ("windows", false) => "win32",
        ("macos", _) => "darwin64",
        (_, true) => "linux64",
        (_, false) => "linux32",
    }
}

/// Path of the binary for `model_identifier` inside an extracted FMU
/// rooted at `fmu_root`: `binaries/<platform>/<identifier>.<ext>`.
pub fn binary_path<P: AsRef<Path>>(fmu_root: P, model_identifier: &str) -> PathBuf {
    fmu_root
        .as_ref()
        .join("binaries")
        .join(platform_folder())
        .join(model_identifier)
        .with_extension(LibraryFormat::native().extension())
}
