//! Expansion of command line patterns into modules.

use globset::GlobSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{is_package_dir, ModuleError, ModuleInfo, SOURCE_EXTENSION};

/// Work item waiting to be classified.
enum Pending {
    /// A user supplied glob pattern.
    Pattern(String),
    /// A concrete path produced by a pattern or a directory listing.
    Entry(PathBuf),
}

/// Lazily yields modules found under a list of glob patterns.
///
/// Package directories are emitted as one module and not descended into.
/// Plain directories are searched one level at a time, so loose scripts and
/// nested packages inside them are found independently. The first error
/// ends the iteration.
pub struct ModuleDiscovery {
    pending: Vec<Pending>,
    excluded: Option<GlobSet>,
}

impl ModuleDiscovery {
    /// Create a discovery over the given patterns, processed in order.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pending: Vec<Pending> = patterns
            .into_iter()
            .map(|p| Pending::Pattern(p.into()))
            .collect();
        pending.reverse();
        Self {
            pending,
            excluded: None,
        }
    }

    /// Skip every path matched by `excluded`.
    pub fn exclude(mut self, excluded: GlobSet) -> Self {
        self.excluded = Some(excluded);
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded
            .as_ref()
            .map(|set| set.is_match(path))
            .unwrap_or(false)
    }

    fn expand_pattern(&mut self, pattern: &str) -> Result<(), ModuleError> {
        log::debug!("Looking at {:?}", pattern);
        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..Default::default()
        };
        let paths = glob::glob_with(pattern, options).map_err(|source| {
            ModuleError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        let mut entries = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) => entries.push(path),
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(ModuleError::Io {
                        path,
                        source: e.into_error(),
                    });
                }
            }
        }

        if entries.is_empty() {
            return Err(ModuleError::NotFound(PathBuf::from(pattern)));
        }

        self.pending
            .extend(entries.into_iter().rev().map(Pending::Entry));
        Ok(())
    }

    fn expand_dir(&mut self, dir: &Path) -> Result<(), ModuleError> {
        log::debug!("Looking for python sources in dir: {:?}", dir);
        let mut children = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Hidden directories (.git, .venv, ...) are never sources.
                e.depth() == 0
                    || !(e.file_type().is_dir() && e.file_name().to_string_lossy().starts_with('.'))
            });
        for entry in walker {
            let entry = entry.map_err(|e| ModuleError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            children.push(entry.into_path());
        }

        self.pending
            .extend(children.into_iter().rev().map(Pending::Entry));
        Ok(())
    }

    /// Classify one path. Returns `Ok(None)` when the path produced more
    /// work or was skipped.
    fn visit(&mut self, path: PathBuf) -> Result<Option<ModuleInfo>, ModuleError> {
        if self.is_excluded(&path) {
            log::debug!("Skipping excluded path: {:?}", path);
            return Ok(None);
        }

        if path.is_dir() {
            if is_package_dir(&path) {
                log::debug!("Looking at package dir: {:?}", path);
                let info = ModuleInfo::from_dir(&path)?;
                log::debug!("Found package: {:?} in dir {:?}", info.name, info.root_dir);
                return Ok(Some(info));
            }
            self.expand_dir(&path)?;
            Ok(None)
        } else if path.is_file() {
            log::debug!("Looking at file: {:?}", path);
            if path.extension().map(|e| e == SOURCE_EXTENSION).unwrap_or(false) {
                let info = ModuleInfo::from_file(&path)?;
                log::debug!("Found module: {:?} in dir {:?}", info.name, info.root_dir);
                Ok(Some(info))
            } else {
                Ok(None)
            }
        } else {
            Err(ModuleError::NotFound(path))
        }
    }
}

impl Iterator for ModuleDiscovery {
    type Item = Result<ModuleInfo, ModuleError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(item) = self.pending.pop() {
            let result = match item {
                Pending::Pattern(pattern) => self.expand_pattern(&pattern).map(|_| None),
                Pending::Entry(path) => self.visit(path),
            };
            match result {
                Ok(Some(info)) => return Some(Ok(info)),
                Ok(None) => continue,
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Discover modules for each pattern in `patterns`.
pub fn find_modules<I, S>(patterns: I) -> ModuleDiscovery
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ModuleDiscovery::new(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::PACKAGE_INIT;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn pattern(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    fn names(discovery: ModuleDiscovery) -> Vec<String> {
        discovery
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect()
    }

    /// root/
    ///   pkg/__init__.py, pkg/mod.py, pkg/sub/__init__.py
    ///   tools/run.py, tools/README.md, tools/inner/__init__.py
    ///   top.py
    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("pkg").join(PACKAGE_INIT));
        touch(&root.join("pkg").join("mod.py"));
        touch(&root.join("pkg").join("sub").join(PACKAGE_INIT));
        touch(&root.join("tools").join("run.py"));
        touch(&root.join("tools").join("README.md"));
        touch(&root.join("tools").join("inner").join(PACKAGE_INIT));
        touch(&root.join("top.py"));
        temp
    }

    #[test]
    fn test_package_is_emitted_once() {
        let temp = fixture();
        let found = names(find_modules([pattern(&temp.path().join("pkg"))]));
        assert_eq!(found, vec!["pkg"]);
    }

    #[test]
    fn test_plain_dir_is_searched() {
        let temp = fixture();
        let found = names(find_modules([pattern(temp.path())]));
        assert_eq!(found, vec!["pkg", "inner", "run", "top"]);
    }

    #[test]
    fn test_glob_pattern() {
        let temp = fixture();
        let found = names(find_modules([pattern(&temp.path().join("*.py"))]));
        assert_eq!(found, vec!["top"]);
    }

    #[test]
    fn test_file_inside_package() {
        let temp = fixture();
        let found = names(find_modules([pattern(
            &temp.path().join("pkg").join("mod.py"),
        )]));
        assert_eq!(found, vec!["pkg.mod"]);
    }

    #[test]
    fn test_non_source_file_is_skipped() {
        let temp = fixture();
        let found = names(find_modules([pattern(
            &temp.path().join("tools").join("README.md"),
        )]));
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let temp = fixture();
        let missing = temp.path().join("nowhere").join("*.py");
        let mut discovery = find_modules([pattern(&missing)]);
        assert!(matches!(
            discovery.next(),
            Some(Err(ModuleError::NotFound(_)))
        ));
        assert!(discovery.next().is_none());
    }

    #[test]
    fn test_error_stops_discovery() {
        let temp = fixture();
        let results: Vec<_> = find_modules([
            pattern(&temp.path().join("top.py")),
            pattern(&temp.path().join("missing.py")),
            pattern(&temp.path().join("pkg")),
        ])
        .collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_hidden_dirs_are_skipped() {
        let temp = fixture();
        touch(&temp.path().join(".venv").join("lib.py"));
        let found = names(find_modules([pattern(temp.path())]));
        assert!(!found.contains(&"lib".to_string()));
    }

    #[test]
    fn test_excluded_paths() {
        let temp = fixture();
        let mut builder = globset::GlobSetBuilder::new();
        builder.add(globset::Glob::new("**/tools").unwrap());
        let found = names(find_modules([pattern(temp.path())]).exclude(builder.build().unwrap()));
        assert_eq!(found, vec!["pkg", "top"]);
    }
}
