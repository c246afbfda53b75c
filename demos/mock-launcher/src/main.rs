//! Minimal launcher session against a simulated application.
//!
//! One handle is driven through a full run by a fake reporter thread, the
//! way a real transport would feed it. A second handle is killed through an
//! in-process stand-in for `spark-submit --kill`.

use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use app_launcher::{
    AppHandle, AppId, CommandRunner, Connection, EntryPointResolver, FnEntryPoint, HandleRegistry,
    Invokable, LaunchConfig, Listener, Message, State, SUBMIT_ENTRY_POINT, monitor, shutdown,
};
use tracing_subscriber::EnvFilter;

/// Connection that just remembers what the launcher sent.
struct InMemoryConnection {
    sent: Arc<Mutex<Vec<Message>>>,
}

impl Connection for InMemoryConnection {
    fn send(&mut self, message: &Message) -> io::Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct PrintListener;

impl Listener for PrintListener {
    fn state_changed(&self, handle: &AppHandle) {
        println!("  [{}] state -> {}", handle.secret(), handle.state());
    }

    fn info_changed(&self, handle: &AppHandle) {
        if let Some(id) = handle.app_id() {
            println!("  [{}] app id -> {id}", handle.secret());
        }
    }
}

fn simulated_runner(config: &LaunchConfig) -> CommandRunner {
    let resolver = EntryPointResolver::new();
    let submit: Arc<dyn Invokable> = Arc::new(FnEntryPoint::new(
        SUBMIT_ENTRY_POINT,
        |args: &[String]| {
            println!("  {SUBMIT_ENTRY_POINT} {}", args.join(" "));
            Ok(())
        },
    ));
    resolver.register(submit);
    CommandRunner::from_config(Arc::new(resolver), config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = LaunchConfig::from_env()?;
    let registry = HandleRegistry::new();

    // First application: runs to completion.
    let handle = Arc::new(
        AppHandle::new(registry.clone(), "app-one").with_runner(simulated_runner(&config)),
    );
    registry.register(&handle);
    handle.configure(&config);
    handle.add_listener(Arc::new(PrintListener));

    let sent = Arc::new(Mutex::new(Vec::new()));
    handle.set_connection(Box::new(InMemoryConnection { sent: sent.clone() }))?;

    let interrupted = shutdown::install_interrupt_handler(vec![handle.clone()]);

    let reporter = handle.clone();
    thread::spawn(move || {
        let reports = [
            Message::SetState { state: State::Connected },
            Message::SetState { state: State::Submitted },
            Message::SetAppId { app_id: AppId::new("application_1700000000000_0001") },
            Message::SetState { state: State::Running },
            Message::SetState { state: State::Finished },
        ];
        for report in reports {
            thread::sleep(Duration::from_millis(200));
            if let Err(e) = reporter.handle_message(report) {
                eprintln!("bad report: {e}");
            }
        }
    });

    println!("Launched {} (cluster manager: {:?})", handle.secret(), config.cluster_manager);
    let poll_interval = config.poll_interval / 10;
    let app_id = monitor::wait_for_app_id(&handle, poll_interval, Duration::from_secs(10)).await?;
    println!("Waiting for {app_id} to finish...");

    tokio::select! {
        state = monitor::wait_for_final(&handle, poll_interval, Duration::from_secs(30)) => {
            println!("Finished: {app_id} state is {}", state?);
        }
        _ = interrupted.cancelled() => {
            println!("Interrupted: {app_id} state is {}", handle.state());
        }
    }
    handle.disconnect();

    // Second application: killed while running.
    let victim = AppHandle::new(registry.clone(), "app-two").with_runner(simulated_runner(&config));
    victim.add_listener(Arc::new(PrintListener));
    victim.set_app_id(AppId::new("driver-20240101000000-0002"));
    victim.set_state(State::Running);

    println!("Killing {}:", victim.secret());
    victim.kill()?;
    victim.set_state(State::Killed);
    victim.disconnect();

    println!();
    println!("Control messages sent: {:?}", sent.lock().unwrap());
    println!("Live handles: {}", registry.len());
    Ok(())
}
