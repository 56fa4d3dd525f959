use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::app::error::AppError;

pub const SCRCPY_OUTPUT_EVENT: &str = "scrcpy-output";
pub const SCRCPY_CLOSED_EVENT: &str = "scrcpy-closed";
pub const SCRCPY_ERROR_EVENT: &str = "scrcpy-error";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
// Upper bound for letting the output readers flush before the exit event.
// Grandchildren (the adb server) may keep the pipes open indefinitely.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MirrorEvent {
    Output {
        generation: u64,
        stream: OutputStream,
        chunk: String,
    },
    Exited {
        generation: u64,
        exit_code: Option<i32>,
        stop_requested: bool,
    },
    SpawnError {
        message: String,
    },
}

impl MirrorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MirrorEvent::Output { .. } => SCRCPY_OUTPUT_EVENT,
            MirrorEvent::Exited { .. } => SCRCPY_CLOSED_EVENT,
            MirrorEvent::SpawnError { .. } => SCRCPY_ERROR_EVENT,
        }
    }
}

pub type MirrorEmitter = Arc<dyn Fn(MirrorEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MirrorState {
    Idle,
    Starting,
    Running,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Started {
    pub generation: u64,
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Stopped {
    pub generation: u64,
    pub pid: u32,
}

struct LiveProcess {
    generation: u64,
    pid: u32,
    child: Arc<Mutex<Child>>,
    stop_requested: Arc<AtomicBool>,
    started_at: Instant,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    emitters: Vec<(u64, MirrorEmitter)>,
}

#[derive(Clone, Default)]
struct EventHub {
    subscribers: Arc<RwLock<Subscribers>>,
}

impl EventHub {
    fn emit(&self, event: MirrorEvent) {
        // Snapshot first so a subscriber may (un)subscribe from its callback.
        let emitters: Vec<MirrorEmitter> = match self.subscribers.read() {
            Ok(guard) => guard
                .emitters
                .iter()
                .map(|(_, emitter)| Arc::clone(emitter))
                .collect(),
            Err(_) => return,
        };
        for emitter in emitters {
            (emitter)(event.clone());
        }
    }
}

type ProcessSlot = Arc<Mutex<Option<LiveProcess>>>;

/// Owns the single scrcpy child process.
///
/// At most one process is live at a time. Output chunks, the exit code and
/// spawn failures are pushed to subscribers; nothing outside the supervisor
/// ever holds the child handle. Every start gets a new generation number so a
/// late exit from a stopped process can never clear its successor.
pub struct ProcessSupervisor {
    slot: ProcessSlot,
    hub: EventHub,
    next_generation: AtomicU64,
    launch_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(launch_grace: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            hub: EventHub::default(),
            next_generation: AtomicU64::new(0),
            launch_grace,
        }
    }

    pub fn subscribe(&self, emitter: MirrorEmitter) -> u64 {
        let mut guard = match self.hub.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.next_id += 1;
        let id = guard.next_id;
        guard.emitters.push((id, emitter));
        id
    }

    pub fn subscribe_channel(&self) -> (u64, mpsc::Receiver<MirrorEvent>) {
        let (tx, rx) = mpsc::channel::<MirrorEvent>();
        let tx = Mutex::new(tx);
        let id = self.subscribe(Arc::new(move |event| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(event);
            }
        }));
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut guard = match self.hub.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = guard.emitters.len();
        guard.emitters.retain(|(existing, _)| *existing != id);
        guard.emitters.len() != before
    }

    /// Spawns scrcpy and returns once the process object exists.
    ///
    /// With a non-zero launch grace the call waits that long and reports
    /// `ERR_EXITED_EARLY` when the process is already gone.
    pub fn start(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        trace_id: &str,
    ) -> Result<Started, AppError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AppError::system("scrcpy handle locked", trace_id))?;
        if slot.is_some() {
            return Err(AppError::already_running(trace_id));
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                drop(slot);
                let message = if err.kind() == std::io::ErrorKind::NotFound {
                    format!("scrcpy not found: {program}")
                } else {
                    format!("Failed to launch scrcpy: {err}")
                };
                warn!(trace_id = %trace_id, program = %program, error = %err, "scrcpy spawn failed");
                self.hub.emit(MirrorEvent::SpawnError {
                    message: message.clone(),
                });
                return Err(AppError::spawn(message, trace_id));
            }
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let pid = child.id();

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let mut readers = 0usize;
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, OutputStream::Stdout, generation, self.hub.clone(), done_tx.clone(), trace_id);
            readers += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, OutputStream::Stderr, generation, self.hub.clone(), done_tx.clone(), trace_id);
            readers += 1;
        }
        drop(done_tx);

        let child = Arc::new(Mutex::new(child));
        let stop_requested = Arc::new(AtomicBool::new(false));
        spawn_watcher(ExitWatch {
            generation,
            child: Arc::clone(&child),
            slot: Arc::clone(&self.slot),
            hub: self.hub.clone(),
            stop_requested: Arc::clone(&stop_requested),
            readers_done: done_rx,
            readers,
            trace_id: trace_id.to_string(),
        });

        let watched_child = Arc::clone(&child);
        let watched_stop = Arc::clone(&stop_requested);
        *slot = Some(LiveProcess {
            generation,
            pid,
            child,
            stop_requested,
            started_at: Instant::now(),
        });
        drop(slot);

        info!(
            trace_id = %trace_id,
            generation,
            pid,
            program = %program,
            args = ?args,
            "scrcpy started"
        );

        if !self.launch_grace.is_zero() {
            thread::sleep(self.launch_grace);
            if !self.holds(generation) {
                if watched_stop.load(Ordering::Relaxed) {
                    info!(trace_id = %trace_id, generation, "scrcpy stopped during startup");
                    return Ok(Started { generation, pid });
                }
                // The watcher has already reaped the child; the status stays cached.
                let exit_code = watched_child
                    .lock()
                    .ok()
                    .and_then(|mut child| child.try_wait().ok().flatten())
                    .and_then(exit_code_of);
                warn!(trace_id = %trace_id, generation, exit_code = ?exit_code, "scrcpy exited during startup");
                let message = match exit_code {
                    Some(code) => format!("scrcpy exited during startup (exit code {code})"),
                    None => "scrcpy exited during startup".to_string(),
                };
                return Err(AppError::exited_early(message, trace_id));
            }
        }

        Ok(Started { generation, pid })
    }

    /// Kills the live process and clears the handle without waiting for the
    /// exit. The watcher still reaps the child and emits its exit event.
    pub fn stop(&self, trace_id: &str) -> Result<Stopped, AppError> {
        let live = {
            let mut slot = self
                .slot
                .lock()
                .map_err(|_| AppError::system("scrcpy handle locked", trace_id))?;
            slot.take()
        }
        .ok_or_else(|| AppError::not_running(trace_id))?;

        kill_live(&live, trace_id);
        info!(trace_id = %trace_id, generation = live.generation, pid = live.pid, "scrcpy stop requested");
        Ok(Stopped {
            generation: live.generation,
            pid: live.pid,
        })
    }

    pub fn status(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn state(&self) -> MirrorState {
        let Ok(slot) = self.slot.lock() else {
            return MirrorState::Idle;
        };
        match slot.as_ref() {
            None => MirrorState::Idle,
            Some(live) if live.started_at.elapsed() < self.launch_grace => MirrorState::Starting,
            Some(_) => MirrorState::Running,
        }
    }

    pub fn shutdown(&self) {
        let live = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(live) = live {
            kill_live(&live, "shutdown");
        }
    }

    fn holds(&self, generation: u64) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.as_ref().map(|live| live.generation) == Some(generation))
            .unwrap_or(false)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn kill_live(live: &LiveProcess, trace_id: &str) {
    live.stop_requested.store(true, Ordering::Relaxed);
    match live.child.lock() {
        Ok(mut child) => {
            if let Err(err) = child.kill() {
                warn!(trace_id = %trace_id, generation = live.generation, error = %err, "failed to kill scrcpy");
            }
        }
        Err(_) => warn!(trace_id = %trace_id, generation = live.generation, "scrcpy child lock poisoned"),
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    stream: OutputStream,
    generation: u64,
    hub: EventHub,
    done: mpsc::Sender<()>,
    trace_id: &str,
) {
    let trace_id = trace_id.to_string();
    thread::spawn(move || {
        let mut temp = [0u8; 4096];
        let mut pending: Vec<u8> = Vec::new();
        loop {
            let count = match reader.read(&mut temp) {
                Ok(0) => break,
                Ok(count) => count,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(trace_id = %trace_id, generation, stream = ?stream, error = %err, "failed to read scrcpy output");
                    break;
                }
            };
            pending.extend_from_slice(&temp[..count]);
            let chunk = take_decoded(&mut pending);
            if !chunk.is_empty() {
                hub.emit(MirrorEvent::Output {
                    generation,
                    stream,
                    chunk,
                });
            }
        }
        if !pending.is_empty() {
            hub.emit(MirrorEvent::Output {
                generation,
                stream,
                chunk: String::from_utf8_lossy(&pending).into_owned(),
            });
        }
        let _ = done.send(());
    });
}

/// Decodes as much of `pending` as possible, keeping a trailing partial
/// UTF-8 sequence for the next read.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(err) if err.error_len().is_none() => {
            let valid = err.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}

struct ExitWatch {
    generation: u64,
    child: Arc<Mutex<Child>>,
    slot: ProcessSlot,
    hub: EventHub,
    stop_requested: Arc<AtomicBool>,
    readers_done: mpsc::Receiver<()>,
    readers: usize,
    trace_id: String,
}

fn spawn_watcher(watch: ExitWatch) {
    thread::spawn(move || {
        let status = loop {
            let polled = match watch.child.lock() {
                Ok(mut child) => child.try_wait(),
                Err(_) => {
                    warn!(trace_id = %watch.trace_id, generation = watch.generation, "scrcpy child lock poisoned");
                    break None;
                }
            };
            match polled {
                Ok(Some(status)) => break Some(status),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    warn!(trace_id = %watch.trace_id, generation = watch.generation, error = %err, "failed to poll scrcpy process");
                    break None;
                }
            }
        };

        let deadline = Instant::now() + READER_DRAIN_TIMEOUT;
        for _ in 0..watch.readers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if watch.readers_done.recv_timeout(remaining).is_err() {
                break;
            }
        }

        let cleared = match watch.slot.lock() {
            Ok(mut slot) => {
                if slot.as_ref().map(|live| live.generation) == Some(watch.generation) {
                    *slot = None;
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        };

        let exit_code = status.and_then(exit_code_of);
        let stop_requested = watch.stop_requested.load(Ordering::Relaxed);
        info!(
            trace_id = %watch.trace_id,
            generation = watch.generation,
            exit_code = ?exit_code,
            stop_requested,
            cleared,
            "scrcpy exited"
        );
        watch.hub.emit(MirrorEvent::Exited {
            generation: watch.generation,
            exit_code,
            stop_requested,
        });
    });
}

/// Signal deaths are folded into the shell convention `128 + signal`.
pub fn exit_code_of(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    None
}
