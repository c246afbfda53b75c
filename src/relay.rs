//! Forwarding of a launched application's output streams.

use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Background forwarder of a child's output. Stopped when its handle is
/// disconnected.
pub trait OutputRelay: Send {
    fn stop(&mut self);
}

/// Relays lines from a reader into `tracing` on a dedicated thread.
///
/// The thread exits at end of stream or at the first line read after
/// [`stop`](OutputRelay::stop). A reader blocked with no further output keeps
/// the thread parked until the stream closes.
#[derive(Debug)]
pub struct LineRelay {
    active: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LineRelay {
    /// Start relaying `reader`, tagging each line with `name`.
    pub fn spawn<R>(name: impl Into<String>, reader: R) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::spawn_with(name, reader, |app, line| {
            tracing::info!(target: "app_launcher::output", app, "{line}");
        })
    }

    /// Start relaying `reader`, handing each line to `sink`.
    pub fn spawn_with<R, F>(name: impl Into<String>, reader: R, sink: F) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
        F: Fn(&str, &str) + Send + 'static,
    {
        let name = name.into();
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        let thread = thread::Builder::new()
            .name(format!("output-relay-{name}"))
            .spawn(move || {
                for line in BufReader::new(reader).lines() {
                    if !flag.load(Ordering::Acquire) {
                        break;
                    }
                    match line {
                        Ok(line) => sink(&name, &line),
                        Err(e) => {
                            tracing::debug!(app = %name, error = %e, "Output relay read failed");
                            break;
                        }
                    }
                }
                flag.store(false, Ordering::Release);
            })?;

        Ok(Self {
            active,
            thread: Some(thread),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Wait for the relay thread to exit.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl OutputRelay for LineRelay {
    fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_relays_all_lines_until_eof() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let relay = LineRelay::spawn_with("app", &b"one\ntwo\n"[..], move |app, line| {
            sink.lock().unwrap().push(format!("{app}: {line}"));
        })
        .unwrap();

        relay.join();
        assert_eq!(*seen.lock().unwrap(), vec!["app: one", "app: two"]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut relay = LineRelay::spawn("app", std::io::empty()).unwrap();
        relay.stop();
        relay.stop();
        assert!(!relay.is_active());
        relay.join();
    }

    #[test]
    fn test_stopped_relay_drops_remaining_lines() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        // A reader that yields one line, then waits for the test to stop the
        // relay before yielding the next.
        struct Gated {
            chunks: Vec<&'static [u8]>,
            gate: std::sync::mpsc::Receiver<()>,
        }
        impl Read for Gated {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.chunks.is_empty() {
                    return Ok(0);
                }
                if self.chunks.len() == 1 {
                    let _ = self.gate.recv();
                }
                let chunk = self.chunks.remove(0);
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
        }

        let mut relay = LineRelay::spawn_with(
            "app",
            Gated {
                chunks: vec![b"first\n", b"second\n"],
                gate: rx,
            },
            move |_, line| sink.lock().unwrap().push(line.to_string()),
        )
        .unwrap();

        while seen.lock().unwrap().is_empty() {
            thread::yield_now();
        }
        relay.stop();
        tx.send(()).unwrap();
        relay.join();

        assert_eq!(*seen.lock().unwrap(), vec!["first"]);
    }
}
