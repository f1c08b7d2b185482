//! [`PtySession`]: one long-lived interactive shell inside a pseudo-terminal.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, warn};

use super::sentinel::{clean_output, Sentinel};
use super::types::{PtyOptions, SessionError, Shell};

/// Sent once the shell is up, before the ready round-trip.
const INIT_LINE: &str = "stty -echo; export PS1='' PS2=''\n";

enum ReaderEvent {
    Data(Vec<u8>),
    Ended(String),
}

/// State touched by `execute`. Guarded by one mutex so commands on the
/// same session never interleave.
struct SessionIo {
    writer: Box<dyn Write + Send>,
    rx: mpsc::Receiver<ReaderEvent>,
    /// Set once the reader reports end of stream; every later call fails.
    ended: Option<String>,
}

impl SessionIo {
    /// Discard output that arrived between calls.
    fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            if let ReaderEvent::Ended(reason) = event {
                self.ended = Some(reason);
                break;
            }
        }
    }

    fn stream_ended(&self, partial: String) -> Option<SessionError> {
        self.ended.as_ref().map(|reason| SessionError::StreamEnded {
            reason: reason.clone(),
            partial,
        })
    }

    fn wait_for(&mut self, sentinel: &Sentinel, timeout: Duration) -> Result<String, SessionError> {
        let deadline = Instant::now() + timeout;
        let mut buf: Vec<u8> = Vec::new();
        let partial = |buf: &[u8]| clean_output(&String::from_utf8_lossy(buf));

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::Timeout {
                    timeout,
                    partial: partial(&buf),
                });
            }
            match self.rx.recv_timeout(remaining) {
                Ok(ReaderEvent::Data(chunk)) => {
                    buf.extend_from_slice(&chunk);
                    if let Some(output) = sentinel.extract(&buf) {
                        return Ok(output);
                    }
                }
                Ok(ReaderEvent::Ended(reason)) => {
                    self.ended = Some(reason);
                    return Err(self.stream_ended(partial(&buf)).unwrap_or(SessionError::Closed));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.ended = Some("reader stopped".into());
                    return Err(self.stream_ended(partial(&buf)).unwrap_or(SessionError::Closed));
                }
            }
        }
    }
}

/// An interactive shell attached to a pseudo-terminal.
///
/// Output is read on a background thread and queued on a channel; callers
/// of [`PtySession::execute`] block until the command's sentinel shows up,
/// the deadline passes, or the stream ends.
pub struct PtySession {
    id: String,
    command_timeout: Duration,
    io: Mutex<SessionIo>,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    child: Mutex<Option<Box<dyn Child + Send + Sync>>>,
    pid: Option<u32>,
    killer: Mutex<Box<dyn ChildKiller + Send + Sync>>,
    stop: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl PtySession {
    /// Spawn a shell and wait for it to answer one round-trip.
    ///
    /// Fails with [`SessionError::SpawnFailed`] if the process cannot be
    /// started and [`SessionError::InitFailed`] if it does not become ready
    /// within `opts.init_timeout`.
    pub fn spawn(id: impl Into<String>, opts: &PtyOptions) -> Result<Self, SessionError> {
        let id = id.into();
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: opts.rows,
                cols: opts.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&opts.program);
        cmd.args(&opts.args);
        cmd.env("TERM", "dumb");
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;
        drop(pair.slave);
        let killer = child.clone_killer();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        spawn_reader(&id, reader, tx, Arc::clone(&stop))?;

        let pid = child.process_id();
        info!(session = %id, program = %opts.program, pid = ?pid, "shell spawned");

        let session = Self {
            id,
            command_timeout: opts.command_timeout,
            io: Mutex::new(SessionIo {
                writer,
                rx,
                ended: None,
            }),
            master: Mutex::new(Some(pair.master)),
            child: Mutex::new(Some(child)),
            pid,
            killer: Mutex::new(killer),
            stop,
            closed: AtomicBool::new(false),
        };

        if let Err(e) = session.initialize(opts.init_timeout) {
            let _ = session.close();
            return Err(SessionError::InitFailed(e.to_string()));
        }
        Ok(session)
    }

    fn initialize(&self, timeout: Duration) -> Result<(), SessionError> {
        {
            let mut io = self.lock_io();
            io.writer.write_all(INIT_LINE.as_bytes())?;
            io.writer.flush()?;
        }
        self.execute_with_timeout("echo ready", timeout)?;
        debug!(session = %self.id, "shell ready");
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Process id of the shell, when the platform reports one.
    pub fn process_id(&self) -> Option<u32> {
        self.pid
    }

    /// Run `command` and return its output, waiting at most `timeout`.
    ///
    /// A timed-out command is not interrupted: the shell keeps running it
    /// and its remaining output may appear in the next call's result.
    pub fn execute_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let mut io = self.lock_io();
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        io.drain();
        if let Some(err) = io.stream_ended(String::new()) {
            return Err(err);
        }

        let sentinel = Sentinel::new();
        debug!(session = %self.id, command, "executing");
        io.writer.write_all(sentinel.command_line(command).as_bytes())?;
        io.writer.flush()?;

        let result = io.wait_for(&sentinel, timeout);
        if let Err(e) = &result {
            warn!(session = %self.id, command, error = %e, "command did not complete");
        }
        result
    }

    fn lock_io(&self) -> MutexGuard<'_, SessionIo> {
        self.io.lock().unwrap_or_else(|e| {
            warn!(session = %self.id, "session io lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl Shell for PtySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, command: &str) -> Result<String, SessionError> {
        self.execute_with_timeout(command, self.command_timeout)
    }

    /// Stops the reader, releases the terminal and kills the shell. Does not
    /// wait for an in-flight `execute`; that call observes the stream end.
    fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop.store(true, Ordering::SeqCst);

        let kill_result = self
            .killer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .kill();
        if let Err(e) = &kill_result {
            debug!(session = %self.id, error = %e, "kill failed, shell likely already exited");
        }

        self.master.lock().unwrap_or_else(|e| e.into_inner()).take();

        if let Some(child) = self.child.lock().unwrap_or_else(|e| e.into_inner()).take() {
            spawn_reaper(&self.id, child);
        }

        info!(session = %self.id, "session closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        let _ = Shell::close(self);
    }
}

/// Wait for the killed shell on a detached thread so it does not linger
/// as a zombie.
fn spawn_reaper(id: &str, mut child: Box<dyn Child + Send + Sync>) {
    let session = id.to_string();
    let spawned = std::thread::Builder::new()
        .name(format!("pty-reaper-{id}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(session = %session, ?status, "reaped shell"),
            Err(e) => debug!(session = %session, error = %e, "wait on shell failed"),
        });
    if let Err(e) = spawned {
        warn!(session = %id, error = %e, "could not start reaper thread");
    }
}

fn spawn_reader(
    id: &str,
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<ReaderEvent>,
    stop: Arc<AtomicBool>,
) -> Result<(), SessionError> {
    std::thread::Builder::new()
        .name(format!("pty-reader-{id}"))
        .spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(ReaderEvent::Ended("end of file".into()));
                        break;
                    }
                    Ok(n) => {
                        if tx.send(ReaderEvent::Data(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(ReaderEvent::Ended(e.to_string()));
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| SessionError::SpawnFailed(e.to_string()))
}
