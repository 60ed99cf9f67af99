//! Python module discovery.
//!
//! Maps files and directories given on the command line to dotted module
//! names, together with the directory that has to be on the analyzer's
//! search path for those names to import.

mod discover;
mod resolve;

use std::path::PathBuf;
use thiserror::Error;

pub use discover::{find_modules, ModuleDiscovery};
pub use resolve::{absolute_path, is_package_dir, module_file, ModuleInfo};

/// File that marks a directory as an importable package.
pub const PACKAGE_INIT: &str = "__init__.py";

/// Extension of Python source files, without the dot.
pub const SOURCE_EXTENSION: &str = "py";

/// Errors raised while resolving or discovering modules.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("No such file or folder: '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("invalid module name in {:?}: base name contains a dot", .0)]
    InvalidName(PathBuf),
    #[error("unsupported source extension in {:?}", .0)]
    UnsupportedExtension(PathBuf),
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("module {module:?} not found under {}", root.display())]
    Unresolvable { module: String, root: PathBuf },
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
