//! Runs the analyzer over discovered modules.

use log::Level;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;
use thiserror::Error;

use super::diagnostics::Diagnostics;
use super::grammar::OutputConvention;
use super::parser::StreamParser;
use crate::config::Config;
use crate::modules::{absolute_path, ModuleError, ModuleInfo};

/// Environment variable holding the analyzer's module search path.
pub const SEARCH_PATH_VAR: &str = "PYTHONPATH";

/// Errors that can occur while running the analyzer.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("analyzer command is empty")]
    EmptyCommand,
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program:?} terminated without an exit status")]
    Terminated { program: String },
    #[error("reading analyzer output: {0}")]
    Io(#[from] io::Error),
    #[error("invalid search path entry: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),
    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Everything one analyzer run needs, passed explicitly instead of being
/// patched into the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its fixed leading arguments.
    pub command: Vec<String>,
    /// Convention arguments, extra arguments, then module names.
    pub args: Vec<String>,
    /// Directories searched for modules, highest priority first.
    pub search_path: Vec<PathBuf>,
}

impl Invocation {
    /// Search path for `root_dir`: the root first, then whatever the
    /// environment already had, without duplicating the root. Entries are
    /// compared after making them absolute, so `.` or `a/../b` spellings of
    /// the root count as present.
    pub fn search_path_for(root_dir: &Path, inherited: Option<OsString>) -> Vec<PathBuf> {
        let existing: Vec<PathBuf> = inherited
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();

        let root = absolute_path(root_dir).unwrap_or_else(|_| root_dir.to_path_buf());
        let present = existing
            .iter()
            .any(|p| absolute_path(p).is_ok_and(|p| p == root));

        let mut search_path = Vec::with_capacity(existing.len() + 1);
        if !present {
            search_path.push(root_dir.to_path_buf());
        }
        search_path.extend(existing);
        search_path
    }

    /// Full argument vector, for logging.
    pub fn argv(&self) -> Vec<&str> {
        self.command
            .iter()
            .chain(self.args.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Result of one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub root_dir: PathBuf,
    /// Exit status the analyzer asked to terminate with.
    pub status: i32,
}

/// Invokes the analyzer and feeds its output to a [`StreamParser`].
///
/// Runs are sequential: one analyzer process at a time, one parser per
/// process.
pub struct Runner {
    command: Vec<String>,
    convention: OutputConvention,
    extra_args: Vec<String>,
}

impl Runner {
    /// Create a runner for the given analyzer command.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            convention: OutputConvention::default(),
            extra_args: Vec::new(),
        }
    }

    /// Create a runner from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.command.iter().cloned())
            .convention(config.convention)
            .extra_args(config.extra_args.iter().cloned())
    }

    /// Set the output convention the analyzer is asked to use.
    pub fn convention(mut self, convention: OutputConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Set arguments passed to the analyzer before the module names.
    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build the invocation for `names`, all importable from `root_dir`.
    pub fn invocation(&self, root_dir: &Path, names: &[String]) -> Invocation {
        let mut args = self.convention.analyzer_args();
        args.extend(self.extra_args.iter().cloned());
        args.extend(names.iter().cloned());
        Invocation {
            command: self.command.clone(),
            args,
            search_path: Invocation::search_path_for(
                root_dir,
                std::env::var_os(SEARCH_PATH_VAR),
            ),
        }
    }

    /// Analyze every module, one analyzer run per root directory.
    pub fn run(
        &self,
        modules: &[ModuleInfo],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<RunOutcome>, RunError> {
        let mut outcomes = Vec::new();
        for (root_dir, names) in group_by_root(modules) {
            outcomes.push(self.run_group(&root_dir, &names, diagnostics)?);
        }
        Ok(outcomes)
    }

    /// Run the analyzer once over `names`, importable from `root_dir`.
    pub fn run_group(
        &self,
        root_dir: &Path,
        names: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<RunOutcome, RunError> {
        let invocation = self.invocation(root_dir, names);
        let (program, leading) = invocation
            .command
            .split_first()
            .ok_or(RunError::EmptyCommand)?;
        log::debug!("Running pylint: {:?}", invocation.argv());

        let search_path = std::env::join_paths(&invocation.search_path)?;
        let mut child = Command::new(program)
            .args(leading)
            .args(&invocation.args)
            .env(SEARCH_PATH_VAR, search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("analyzer stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("analyzer stderr was not captured"))?;

        let mut parser = StreamParser::new(self.convention.grammar(), root_dir, diagnostics);
        let parsed = thread::scope(|s| {
            let (tx, rx) = mpsc::channel();
            let tx_err = tx.clone();
            s.spawn(move || forward_lines(stdout, Level::Debug, tx));
            s.spawn(move || forward_lines(stderr, Level::Error, tx_err));

            // Keep draining after a failure so the readers never block.
            let mut result: Result<(), RunError> = Ok(());
            for (level, line) in rx {
                if result.is_err() {
                    continue;
                }
                result = match line {
                    Ok(line) => parser.feed(&line, level).map_err(RunError::from),
                    Err(e) => Err(RunError::from(e)),
                };
            }
            result.and_then(|()| parser.finish(Level::Debug).map_err(RunError::from))
        });

        let status = child.wait()?;
        parsed?;

        let status = status.code().ok_or_else(|| RunError::Terminated {
            program: program.clone(),
        })?;
        log::debug!("pylint exited with status {}", status);

        Ok(RunOutcome {
            root_dir: root_dir.to_path_buf(),
            status,
        })
    }
}

/// Group module names by root directory, keeping first-seen order and
/// dropping repeated names.
pub fn group_by_root(modules: &[ModuleInfo]) -> Vec<(PathBuf, Vec<String>)> {
    let mut groups: Vec<(PathBuf, Vec<String>)> = Vec::new();
    for module in modules {
        let index = match groups.iter().position(|(root, _)| *root == module.root_dir) {
            Some(index) => index,
            None => {
                groups.push((module.root_dir.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        let names = &mut groups[index].1;
        if !names.contains(&module.name) {
            names.push(module.name.clone());
        }
    }
    groups
}

/// Send each line of `pipe` to `tx`, tagged with `level`.
fn forward_lines<R: Read>(pipe: R, level: Level, tx: Sender<(Level, io::Result<String>)>) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let mut line = String::from_utf8_lossy(&buf).into_owned();
                // A final line without a newline must not run into the
                // other stream's next line inside the parser.
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                if tx.send((level, Ok(line))).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send((level, Err(e)));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, root: &str) -> ModuleInfo {
        ModuleInfo {
            name: name.to_string(),
            path: PathBuf::from(name),
            root_dir: PathBuf::from(root),
        }
    }

    #[test]
    fn test_group_by_root() {
        let modules = vec![
            module("pkg", "/a"),
            module("script", "/b"),
            module("other", "/a"),
            module("pkg", "/a"),
        ];
        let groups = group_by_root(&modules);
        assert_eq!(
            groups,
            vec![
                (PathBuf::from("/a"), vec!["pkg".to_string(), "other".to_string()]),
                (PathBuf::from("/b"), vec!["script".to_string()]),
            ]
        );
    }

    #[test]
    fn test_search_path_prepends_root_once() {
        let root = PathBuf::from("/project");
        let inherited = std::env::join_paths([PathBuf::from("/lib")]).unwrap();
        assert_eq!(
            Invocation::search_path_for(&root, Some(inherited)),
            vec![PathBuf::from("/project"), PathBuf::from("/lib")]
        );

        let inherited = std::env::join_paths([PathBuf::from("/lib"), root.clone()]).unwrap();
        assert_eq!(
            Invocation::search_path_for(&root, Some(inherited)),
            vec![PathBuf::from("/lib"), PathBuf::from("/project")]
        );

        assert_eq!(
            Invocation::search_path_for(&root, None),
            vec![PathBuf::from("/project")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_matches_other_spellings_of_root() {
        let root = PathBuf::from("/work/project");
        for spelling in ["/work/../work/project", "/work/project/.", "/work/project/"] {
            let inherited = OsString::from(format!("/lib:{}", spelling));
            let search_path = Invocation::search_path_for(&root, Some(inherited));
            assert_eq!(search_path.len(), 2, "{}", spelling);
            assert_eq!(search_path[0], PathBuf::from("/lib"));
        }

        let cwd = std::env::current_dir().unwrap();
        let search_path = Invocation::search_path_for(&cwd, Some(OsString::from(".")));
        assert_eq!(search_path, vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_invocation_args() {
        let runner = Runner::new(["python3", "-m", "pylint"])
            .convention(OutputConvention::Parseable)
            .extra_args(["--disable=C"]);
        let invocation = runner.invocation(Path::new("/project"), &["pkg".to_string()]);
        assert_eq!(invocation.command, vec!["python3", "-m", "pylint"]);
        assert_eq!(
            invocation.args,
            vec!["-f", "parseable", "--disable=C", "pkg"]
        );
        assert_eq!(invocation.search_path[0], PathBuf::from("/project"));
        assert_eq!(invocation.argv()[3], "-f");
    }

    #[test]
    fn test_empty_command() {
        let runner = Runner::new(Vec::<String>::new());
        let mut diagnostics = Diagnostics::new();
        let result = runner.run_group(Path::new("."), &["pkg".to_string()], &mut diagnostics);
        assert!(matches!(result, Err(RunError::EmptyCommand)));
    }

    #[test]
    fn test_missing_program() {
        let runner = Runner::new(["prettylint-no-such-analyzer"]);
        let mut diagnostics = Diagnostics::new();
        let result = runner.run_group(Path::new("."), &["pkg".to_string()], &mut diagnostics);
        assert!(matches!(result, Err(RunError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_group_with_fake_analyzer() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("script.py");
        std::fs::write(&source, "import os\nx = 1\n").unwrap();
        let seen_path = temp.path().join("search_path.txt");
        let script = temp.path().join("fake_pylint.sh");
        std::fs::write(
            &script,
            format!(
                "printf '%s' \"$PYTHONPATH\" > '{seen}'\n\
                 echo '************* Module script'\n\
                 echo '{src}:1: [W0611(unused-import), ] Unused import os'\n\
                 echo '{src}:2: [W0612(unused-variable), ] Unused variable x' >&2\n\
                 printf 'no trailing newline' >&2\n\
                 exit 4\n",
                seen = seen_path.display(),
                src = source.display()
            ),
        )
        .unwrap();

        let runner = Runner::new(["sh".to_string(), script.to_string_lossy().to_string()]);
        let mut diagnostics = Diagnostics::new();
        let outcome = runner
            .run_group(temp.path(), &["script".to_string()], &mut diagnostics)
            .unwrap();

        assert_eq!(outcome.status, 4);
        assert_eq!(outcome.root_dir.as_path(), temp.path());

        // The child sees the root first on its module search path.
        let seen = std::fs::read_to_string(&seen_path).unwrap();
        let first = std::env::split_paths(&seen).next().unwrap();
        assert_eq!(first.as_path(), temp.path());

        // Lines from stderr reach the parser as well as stdout lines.
        assert_eq!(diagnostics.len(), 2);
        let mut tags: Vec<String> = diagnostics
            .iter()
            .flat_map(|(_, items)| items.into_iter().map(|d| d.tag.clone()))
            .collect();
        tags.sort();
        assert_eq!(tags, vec!["W0611(unused-import)", "W0612(unused-variable)"]);
    }
}
