use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use app_launcher::{
    AppHandle, AppId, ClusterManager, CommandRunner, Connection, EntryPointResolver, FnEntryPoint,
    HandleRegistry, Invokable, LaunchError, Listener, Message, State, WriterConnection,
    YARN_CLI_ENTRY_POINT,
};

/// Records every notification with the value visible at callback time.
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl Listener for EventLog {
    fn state_changed(&self, handle: &AppHandle) {
        self.events
            .lock()
            .unwrap()
            .push(format!("state:{}", handle.state()));
    }

    fn info_changed(&self, handle: &AppHandle) {
        let id = handle.app_id().map(|id| id.to_string()).unwrap_or_default();
        self.events.lock().unwrap().push(format!("info:{id}"));
    }
}

struct Tagged {
    tag: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl Listener for Tagged {
    fn state_changed(&self, _handle: &AppHandle) {
        self.order.lock().unwrap().push(self.tag);
    }

    fn info_changed(&self, _handle: &AppHandle) {}
}

struct CountingConnection {
    closes: Arc<AtomicUsize>,
}

impl Connection for CountingConnection {
    fn send(&mut self, _message: &Message) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_full_run_then_forced_kill_is_rejected() {
    let registry = HandleRegistry::new();
    let handle = AppHandle::create(registry.clone(), "secret");
    let log = Arc::new(EventLog::default());
    handle.add_listener(log.clone());

    assert_eq!(handle.state(), State::Unknown);
    handle.set_state(State::Connected);
    handle.set_app_id(AppId::new("app-1"));
    handle.set_state(State::Running);
    handle.set_state(State::Finished);
    handle.set_state(State::Killed);

    assert_eq!(handle.state(), State::Finished);
    assert_eq!(
        *log.events.lock().unwrap(),
        vec![
            "state:CONNECTED",
            "info:app-1",
            "state:RUNNING",
            "state:FINISHED"
        ]
    );
}

#[test]
fn test_listeners_notified_in_registration_order() {
    let handle = AppHandle::create(HandleRegistry::new(), "secret");
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        handle.add_listener(Arc::new(Tagged {
            tag,
            order: order.clone(),
        }));
    }

    handle.set_state(State::Submitted);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_reports_over_json_lines() {
    let handle = AppHandle::create(HandleRegistry::new(), "secret");
    let reports = "{\"type\":\"SET_STATE\",\"state\":\"SUBMITTED\"}\n\
                   {\"type\":\"SET_APP_ID\",\"app_id\":\"application_1_0007\"}\n\
                   {\"type\":\"SET_STATE\",\"state\":\"FAILED\"}\n";

    for line in reports.lines() {
        handle.handle_message(Message::from_json_line(line).unwrap()).unwrap();
    }

    assert_eq!(handle.state(), State::Failed);
    assert_eq!(handle.app_id(), Some(AppId::new("application_1_0007")));
}

#[test]
fn test_stop_writes_stop_message() {
    let handle = AppHandle::create(HandleRegistry::new(), "secret");
    assert!(matches!(handle.stop(), Err(LaunchError::IllegalState(_))));

    let sink = SharedSink::default();
    handle
        .set_connection(Box::new(WriterConnection::new(sink.clone())))
        .unwrap();
    handle.stop().unwrap();

    assert_eq!(sink.contents(), "{\"type\":\"STOP\"}\n");
}

#[test]
fn test_disconnect_twice_closes_once() {
    let registry = HandleRegistry::new();
    let closes = Arc::new(AtomicUsize::new(0));
    let handle = AppHandle::create(registry.clone(), "secret");
    handle
        .set_connection(Box::new(CountingConnection {
            closes: closes.clone(),
        }))
        .unwrap();

    handle.disconnect();
    handle.disconnect();

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_yarn_kill_with_registered_cli() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let resolver = EntryPointResolver::new();
    let cli: Arc<dyn Invokable> = Arc::new(FnEntryPoint::new(
        YARN_CLI_ENTRY_POINT,
        move |args: &[String]| {
            recorded.lock().unwrap().push(args.to_vec());
            Ok(())
        },
    ));
    resolver.register(cli);

    let handle = AppHandle::new(HandleRegistry::new(), "secret")
        .with_runner(CommandRunner::new(Arc::new(resolver)));
    handle.set_cluster_manager(Some(ClusterManager::Yarn));

    // No id yet: nothing may be run.
    assert!(matches!(handle.kill(), Err(LaunchError::IllegalState(_))));
    assert!(calls.lock().unwrap().is_empty());

    handle.set_app_id(AppId::new("job-42"));
    handle.kill().unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![vec![
            "application".to_string(),
            "-kill".to_string(),
            "job-42".to_string()
        ]]
    );
}

#[test]
fn test_kill_failure_surfaces() {
    let resolver = EntryPointResolver::new();
    let submit: Arc<dyn Invokable> = Arc::new(FnEntryPoint::new(
        "spark-submit",
        |_: &[String]| Err("Unable to connect to master".into()),
    ));
    resolver.register(submit);

    let handle = AppHandle::new(HandleRegistry::new(), "secret")
        .with_runner(CommandRunner::new(Arc::new(resolver)));
    handle.set_app_id(AppId::new("driver-20240101"));

    let err = handle.kill().unwrap_err();
    assert!(matches!(
        err,
        LaunchError::RuntimeFailure { ref entry_point, .. } if entry_point == "spark-submit"
    ));
}

#[cfg(unix)]
#[test]
fn test_kill_through_process_entry_point() {
    // `true` accepts and ignores any arguments.
    let runner = CommandRunner::new(Arc::new(EntryPointResolver::with_path_search()))
        .with_default_entry_point("true");
    let handle = AppHandle::new(HandleRegistry::new(), "secret").with_runner(runner);
    handle.set_app_id(AppId::new("app-1"));

    handle.kill().unwrap();
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
