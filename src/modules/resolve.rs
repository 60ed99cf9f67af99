//! Resolution of filesystem paths to dotted module names.

use std::path::{Component, Path, PathBuf};

use super::{ModuleError, PACKAGE_INIT, SOURCE_EXTENSION};

/// A module or package found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInfo {
    /// Dotted module name, e.g. `pkg.sub.leaf`.
    pub name: String,
    /// Path as it was found during discovery.
    pub path: PathBuf,
    /// Nearest ancestor that is not a package. `name` imports from here.
    pub root_dir: PathBuf,
}

impl ModuleInfo {
    /// Resolve a package directory into a module.
    ///
    /// Walks upward while parents are packages too, so `a/b/c` with an
    /// `__init__.py` in each of them resolves to `a.b.c` rooted at the
    /// parent of `a`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ModuleError> {
        let dir = dir.as_ref();
        if !is_package_dir(dir) {
            return Err(ModuleError::NotFound(dir.join(PACKAGE_INIT)));
        }

        let mut root_dir = absolute_path(dir)?;
        log::debug!("Getting package name from dir {:?}", root_dir);

        let mut names = Vec::new();
        while is_package_dir(&root_dir) {
            let name = match root_dir.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => break,
            };
            if name.contains('.') {
                return Err(ModuleError::InvalidName(root_dir));
            }
            names.push(name);
            if !root_dir.pop() {
                break;
            }
            log::debug!("Getting package name from dir {:?}", root_dir);
        }
        names.reverse();

        Ok(Self {
            name: names.join("."),
            path: dir.to_path_buf(),
            root_dir,
        })
    }

    /// Resolve a Python source file into a module.
    ///
    /// A file inside a package is named after the package, so
    /// `pkg/mod.py` becomes `pkg.mod`; a loose file keeps its own base name
    /// and its directory becomes the root.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self, ModuleError> {
        let file = file.as_ref();
        log::debug!("Getting module name from file {:?}", file);

        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| ModuleError::InvalidName(file.to_path_buf()))?;
        if stem.contains('.') {
            return Err(ModuleError::InvalidName(file.to_path_buf()));
        }
        if let Some(ext) = file.extension() {
            if ext != SOURCE_EXTENSION {
                return Err(ModuleError::UnsupportedExtension(file.to_path_buf()));
            }
        }

        let parent = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (name, root_dir) = if is_package_dir(&parent) {
            let package = Self::from_dir(&parent)?;
            (format!("{}.{}", package.name, stem), package.root_dir)
        } else {
            (stem, absolute_path(&parent)?)
        };

        Ok(Self {
            name,
            path: file.to_path_buf(),
            root_dir,
        })
    }
}

/// Whether `dir` is a directory holding a package initializer.
pub fn is_package_dir<P: AsRef<Path>>(dir: P) -> bool {
    let dir = dir.as_ref();
    dir.is_dir() && dir.join(PACKAGE_INIT).is_file()
}

/// Map a dotted module name back to the file that defines it.
///
/// Packages resolve to their `__init__.py`, plain modules to `<name>.py`.
pub fn module_file<P: AsRef<Path>>(root_dir: P, name: &str) -> Result<PathBuf, ModuleError> {
    let root_dir = root_dir.as_ref();
    let relative: PathBuf = name.split('.').collect();

    let package_dir = root_dir.join(&relative);
    if is_package_dir(&package_dir) {
        return Ok(package_dir.join(PACKAGE_INIT));
    }

    let source = root_dir.join(relative.with_extension(SOURCE_EXTENSION));
    if source.is_file() {
        return Ok(source);
    }

    Err(ModuleError::Unresolvable {
        module: name.to_string(),
        root: root_dir.to_path_buf(),
    })
}

/// Make `path` absolute and drop `.` and `..` components lexically.
/// Symlinks are left alone.
pub fn absolute_path(path: &Path) -> Result<PathBuf, ModuleError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| ModuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
