//! Single-shot invocation of entry points.

use std::sync::Arc;

use crate::config::LaunchConfig;
use crate::entry_point::{EntryPoint, EntryPointResolver, Invokable, SUBMIT_ENTRY_POINT};
use crate::error::{LaunchError, LaunchResult};

/// Runs an entry point once, synchronously, with uniform error reporting.
///
/// When no entry point is supplied the runner falls back to its default
/// (`spark-submit` unless configured otherwise), looked up at invocation
/// time. There are no retries.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    resolver: Arc<EntryPointResolver>,
    default_entry_point: String,
}

impl CommandRunner {
    pub fn new(resolver: Arc<EntryPointResolver>) -> Self {
        Self {
            resolver,
            default_entry_point: SUBMIT_ENTRY_POINT.to_string(),
        }
    }

    /// Runner whose default entry point comes from `config`.
    pub fn from_config(resolver: Arc<EntryPointResolver>, config: &LaunchConfig) -> Self {
        Self::new(resolver).with_default_entry_point(config.submit_entry_point.clone())
    }

    pub fn with_default_entry_point(mut self, name: impl Into<String>) -> Self {
        self.default_entry_point = name.into();
        self
    }

    pub fn resolver(&self) -> &EntryPointResolver {
        &self.resolver
    }

    pub fn default_entry_point(&self) -> &str {
        &self.default_entry_point
    }

    /// Invoke `entry_point` (or the default) with `args`.
    ///
    /// Resolution failures and failures of the target itself both surface as
    /// [`LaunchError::RuntimeFailure`].
    pub fn run(&self, entry_point: Option<EntryPoint>, args: &[String]) -> LaunchResult<()> {
        let entry_point = entry_point
            .unwrap_or_else(|| EntryPoint::LateBound(self.default_entry_point.clone()));
        let invokable = self.materialize(entry_point)?;

        tracing::debug!(entry_point = invokable.name(), ?args, "Running entry point");
        invokable.invoke(args).map_err(|source| {
            tracing::error!(entry_point = invokable.name(), error = %source, "Entry point failed");
            LaunchError::runtime_failure(invokable.name(), source)
        })
    }

    fn materialize(&self, entry_point: EntryPoint) -> LaunchResult<Arc<dyn Invokable>> {
        match entry_point {
            EntryPoint::Resolved(ep) => Ok(ep),
            EntryPoint::LateBound(name) => self
                .resolver
                .resolve(&name)
                .map_err(|e| LaunchError::runtime_failure(name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_point::FnEntryPoint;
    use std::sync::Mutex;

    fn recording(name: &str, calls: Arc<Mutex<Vec<Vec<String>>>>) -> Arc<dyn Invokable> {
        Arc::new(FnEntryPoint::new(name, move |args: &[String]| {
            calls.lock().unwrap().push(args.to_vec());
            Ok(())
        }))
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_resolved_entry_point() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let runner = CommandRunner::new(Arc::new(EntryPointResolver::new()));
        let ep = recording("yarn", calls.clone());

        runner
            .run(Some(EntryPoint::Resolved(ep)), &args(&["application", "-kill", "a"]))
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![args(&["application", "-kill", "a"])]);
    }

    #[test]
    fn test_run_falls_back_to_default() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = EntryPointResolver::new();
        resolver.register(recording(SUBMIT_ENTRY_POINT, calls.clone()));
        let runner = CommandRunner::new(Arc::new(resolver));

        runner.run(None, &args(&["--kill", "a"])).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_from_config() {
        let config = LaunchConfig {
            submit_entry_point: "/opt/spark/bin/spark-submit".into(),
            ..LaunchConfig::default()
        };
        let runner = CommandRunner::from_config(Arc::new(EntryPointResolver::new()), &config);
        assert_eq!(runner.default_entry_point(), "/opt/spark/bin/spark-submit");
    }

    #[test]
    fn test_missing_default_is_runtime_failure() {
        let runner = CommandRunner::new(Arc::new(EntryPointResolver::new()));
        let err = runner.run(None, &args(&["--kill", "a"])).unwrap_err();

        match err {
            LaunchError::RuntimeFailure { entry_point, source } => {
                assert_eq!(entry_point, SUBMIT_ENTRY_POINT);
                assert!(source.to_string().contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_target_failure_is_wrapped_once() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let ep: Arc<dyn Invokable> = Arc::new(FnEntryPoint::new("yarn", move |_: &[String]| {
            *counter.lock().unwrap() += 1;
            Err("application not found".into())
        }));
        let runner = CommandRunner::new(Arc::new(EntryPointResolver::new()));

        let err = runner.run(Some(ep.into()), &args(&["x"])).unwrap_err();
        assert_eq!(err.to_string(), "Failed to run yarn: application not found");
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
