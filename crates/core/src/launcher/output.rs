//! Capture of interpreter process output.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Destination that process output lines are mirrored to.
pub trait OutputSink: Send + Sync {
    /// Write one chunk of output, newline included.
    fn write_chunk(&self, chunk: &str) -> io::Result<()>;
}

/// Sink forwarding every chunk to a writer behind a mutex.
impl<W> OutputSink for Mutex<W>
where
    W: io::Write + Send,
{
    fn write_chunk(&self, chunk: &str) -> io::Result<()> {
        let mut writer = self.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(chunk.as_bytes())?;
        writer.flush()
    }
}

/// Log level a captured line is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Info,
    Debug,
}

/// `[INFO]`-prefixed lines are reported at info level, everything else at
/// debug level.
pub fn classify_line(line: &str) -> LineLevel {
    if line.starts_with("[INFO]") {
        LineLevel::Info
    } else {
        LineLevel::Debug
    }
}

type LineObserver = Box<dyn Fn(&str) + Send + Sync>;

/// Accumulates the output of one process.
pub struct ProcessOutputLog {
    catching: AtomicBool,
    buffer: Mutex<String>,
    sink: Mutex<Option<Arc<dyn OutputSink>>>,
    observers: Mutex<Vec<LineObserver>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for ProcessOutputLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessOutputLog {
    pub fn new() -> Self {
        Self {
            catching: AtomicBool::new(true),
            buffer: Mutex::new(String::new()),
            sink: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Handle one line read from the process, without its line terminator.
    pub fn process_line(&self, line: &str) {
        match classify_line(line) {
            LineLevel::Info => info!("{line}"),
            LineLevel::Debug => debug!("Process output: {line}"),
        }

        if self.is_catching() {
            let mut buffer = lock(&self.buffer);
            buffer.push_str(line);
            buffer.push('\n');
        }

        let sink = lock(&self.sink).clone();
        if let Some(sink) = sink {
            if let Err(e) = sink.write_chunk(&format!("{line}\n")) {
                warn!("Error while writing process output to redirected sink: {e}");
            }
        }

        for observer in lock(&self.observers).iter() {
            observer(line);
        }
    }

    /// Everything caught so far.
    pub fn contents(&self) -> String {
        lock(&self.buffer).clone()
    }

    pub fn is_catching(&self) -> bool {
        self.catching.load(Ordering::SeqCst)
    }

    /// Stop appending lines to the buffer. Already caught output is kept.
    pub fn stop_catching(&self) {
        self.catching.store(false, Ordering::SeqCst);
    }

    /// Replace the redirected sink; returns whether one was attached before.
    pub fn set_sink(&self, sink: Option<Arc<dyn OutputSink>>) -> bool {
        std::mem::replace(&mut *lock(&self.sink), sink).is_some()
    }

    /// Register a callback invoked with every line.
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        lock(&self.observers).push(Box::new(observer));
    }
}
