//! Invokable entry points of external tools.
//!
//! An entry point is a routine taking an ordered list of string arguments and
//! returning nothing but success or failure, e.g. the `main` of a cluster CLI.
//! Entry points are found by name through an [`EntryPointResolver`]:
//!
//! - names registered in-process resolve to the registered [`Invokable`];
//! - with path search enabled, other names resolve to an executable on `PATH`
//!   (or to the path itself, if the name contains a `/`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, RwLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::error::{BoxError, LaunchError, LaunchResult};

/// Entry point of the tool that submits (and, for generic backends, kills)
/// applications.
pub const SUBMIT_ENTRY_POINT: &str = "spark-submit";

/// Entry point of the orchestrator's application CLI.
pub const YARN_CLI_ENTRY_POINT: &str = "yarn";

/// Something that can be invoked with an argument list.
pub trait Invokable: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Run to completion. Failures of the target itself are returned as-is.
    fn invoke(&self, args: &[String]) -> Result<(), BoxError>;
}

impl fmt::Debug for dyn Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Invokable").field(&self.name()).finish()
    }
}

/// In-process entry point backed by a closure.
pub struct FnEntryPoint<F> {
    name: String,
    f: F,
}

impl<F> FnEntryPoint<F>
where
    F: Fn(&[String]) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Invokable for FnEntryPoint<F>
where
    F: Fn(&[String]) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[String]) -> Result<(), BoxError> {
        (self.f)(args)
    }
}

/// Entry point backed by an executable, run synchronously.
#[derive(Debug, Clone)]
pub struct ProcessEntryPoint {
    name: String,
    program: PathBuf,
}

/// Non-zero exit of a [`ProcessEntryPoint`].
#[derive(Debug)]
pub struct ExitFailure {
    pub code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for ExitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exited with status {code}")?,
            None => write!(f, "terminated by signal")?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExitFailure {}

impl ProcessEntryPoint {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Invokable for ProcessEntryPoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[String]) -> Result<(), BoxError> {
        tracing::debug!(
            entry_point = %self.name,
            program = %self.program.display(),
            ?args,
            "Invoking process"
        );

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Box::new(ExitFailure {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }))
        }
    }
}

/// An entry point that is either already resolved or resolved on use.
#[derive(Debug, Clone)]
pub enum EntryPoint {
    /// Resolved up front; failures surfaced at configuration time.
    Resolved(Arc<dyn Invokable>),
    /// Looked up by name when invoked.
    LateBound(String),
}

impl EntryPoint {
    pub fn name(&self) -> &str {
        match self {
            EntryPoint::Resolved(ep) => ep.name(),
            EntryPoint::LateBound(name) => name,
        }
    }
}

impl From<Arc<dyn Invokable>> for EntryPoint {
    fn from(ep: Arc<dyn Invokable>) -> Self {
        EntryPoint::Resolved(ep)
    }
}

/// Name-based lookup of entry points.
#[derive(Default)]
pub struct EntryPointResolver {
    registered: RwLock<FxHashMap<String, Arc<dyn Invokable>>>,
    search_path: bool,
}

impl fmt::Debug for EntryPointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self
            .registered
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EntryPointResolver")
            .field("registered", &registered.keys().collect::<Vec<_>>())
            .field("search_path", &self.search_path)
            .finish()
    }
}

impl EntryPointResolver {
    /// Resolver that only knows registered entry points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that falls back to executables on `PATH`.
    pub fn with_path_search() -> Self {
        Self {
            registered: RwLock::default(),
            search_path: true,
        }
    }

    /// Register an in-process entry point, replacing any previous one of
    /// the same name.
    pub fn register(&self, entry_point: Arc<dyn Invokable>) {
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry_point.name().to_string(), entry_point);
    }

    /// Look up an entry point by name.
    ///
    /// Fails with `NotFound` if nothing provides `name`, and with
    /// `NoSuchEntryPoint` if `name` points at something that is not an
    /// executable file.
    pub fn resolve(&self, name: &str) -> LaunchResult<Arc<dyn Invokable>> {
        if let Some(ep) = self
            .registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(ep));
        }

        if !self.search_path {
            return Err(LaunchError::NotFound(name.to_string()));
        }

        let program = find_program(name)?;
        Ok(Arc::new(ProcessEntryPoint::new(name, program)))
    }
}

fn find_program(name: &str) -> LaunchResult<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        if !path.exists() {
            return Err(LaunchError::NotFound(name.to_string()));
        }
        return check_executable(path);
    }

    let dirs = std::env::var_os("PATH").unwrap_or_default();
    let mut rejected = None;
    for dir in std::env::split_paths(&dirs) {
        let candidate = dir.join(name);
        if !candidate.exists() {
            continue;
        }
        match check_executable(candidate) {
            Ok(path) => return Ok(path),
            Err(e) => rejected = Some(e),
        }
    }

    Err(rejected.unwrap_or_else(|| LaunchError::NotFound(name.to_string())))
}

fn check_executable(path: PathBuf) -> LaunchResult<PathBuf> {
    let metadata = path
        .metadata()
        .map_err(|_| LaunchError::NotFound(path.display().to_string()))?;
    if metadata.is_file() && is_executable(&metadata) {
        Ok(path)
    } else {
        Err(LaunchError::NoSuchEntryPoint(path.display().to_string()))
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Arc<dyn Invokable> {
        Arc::new(FnEntryPoint::new(name, |_: &[String]| Ok(())))
    }

    #[test]
    fn test_resolve_registered() {
        let resolver = EntryPointResolver::new();
        resolver.register(noop("yarn"));

        let ep = resolver.resolve("yarn").unwrap();
        assert_eq!(ep.name(), "yarn");
        assert!(ep.invoke(&[]).is_ok());
    }

    #[test]
    fn test_resolve_missing_without_path_search() {
        let resolver = EntryPointResolver::new();
        let err = resolver.resolve("sh").unwrap_err();
        assert!(matches!(err, LaunchError::NotFound(ref n) if n == "sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_from_path() {
        let resolver = EntryPointResolver::with_path_search();
        let ep = resolver.resolve("sh").unwrap();
        assert_eq!(ep.name(), "sh");
        ep.invoke(&["-c".into(), "exit 0".into()]).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_explicit_paths() {
        let resolver = EntryPointResolver::with_path_search();

        let err = resolver.resolve("/definitely/not/here").unwrap_err();
        assert!(matches!(err, LaunchError::NotFound(_)));

        // A directory exists but cannot be invoked.
        let err = resolver.resolve("/").unwrap_err();
        assert!(matches!(err, LaunchError::NoSuchEntryPoint(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_exit_failure() {
        let ep = ProcessEntryPoint::new("sh", "/bin/sh");
        let err = ep
            .invoke(&["-c".into(), "echo nope >&2; exit 3".into()])
            .unwrap_err();
        assert_eq!(err.to_string(), "exited with status 3: nope");
    }

    #[test]
    fn test_entry_point_names() {
        let resolved = EntryPoint::from(noop("yarn"));
        assert_eq!(resolved.name(), "yarn");
        let late = EntryPoint::LateBound(SUBMIT_ENTRY_POINT.into());
        assert_eq!(late.name(), "spark-submit");
    }
}
