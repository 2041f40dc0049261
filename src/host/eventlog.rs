//! Windows Event Log output.
//!
//! The SCM discards a service's stdout, so lifecycle transitions and worker
//! iterations are also written to the Application event log under the
//! service name. The layer itself is platform independent; only the
//! `EventSource` sink talks to the event log API.

use std::fmt::{self, Write};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Context, Layer};

/// Event ID attached to every entry
pub const EVENT_ID: u32 = 0x1000;

/// Event log entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Error,
    Warning,
    Information,
}

impl From<&Level> for EntryKind {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warning,
            _ => Self::Information,
        }
    }
}

/// Destination for formatted event log entries
pub trait EventSink: Send + Sync + 'static {
    fn write(&self, kind: EntryKind, message: &str);
}

/// `tracing` layer forwarding each event to an [`EventSink`]
pub struct EventLogLayer<W> {
    sink: W,
}

impl<W: EventSink> EventLogLayer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

/// Events the event log records regardless of console verbosity
pub fn event_log_filter() -> Targets {
    Targets::new().with_target("minservice", Level::INFO)
}

impl<S, W> Layer<S> for EventLogLayer<W>
where
    S: Subscriber,
    W: EventSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink
            .write(EntryKind::from(event.metadata().level()), &visitor.finish());
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(windows)]
pub use source::EventSource;

#[cfg(windows)]
mod source {
    use super::{EntryKind, EventSink, EVENT_ID};
    use std::ffi::OsStr;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;
    use windows_sys::Win32::System::EventLog::{
        DeregisterEventSource, RegisterEventSourceW, ReportEventW, EVENTLOG_ERROR_TYPE,
        EVENTLOG_INFORMATION_TYPE, EVENTLOG_WARNING_TYPE,
    };

    /// Registered event source on the local machine
    #[derive(Debug)]
    pub struct EventSource {
        // windows-sys 0.52 handles are plain `isize`
        handle: isize,
    }

    impl EventSource {
        pub fn register(source_name: &str) -> io::Result<Self> {
            let name = wide(source_name);
            // SAFETY: `name` is NUL-terminated and outlives the call.
            let handle = unsafe { RegisterEventSourceW(ptr::null(), name.as_ptr()) };
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { handle })
        }
    }

    impl EventSink for EventSource {
        fn write(&self, kind: EntryKind, message: &str) {
            let kind = match kind {
                EntryKind::Error => EVENTLOG_ERROR_TYPE,
                EntryKind::Warning => EVENTLOG_WARNING_TYPE,
                EntryKind::Information => EVENTLOG_INFORMATION_TYPE,
            };
            let message = wide(message);
            let strings = [message.as_ptr()];

            // Nowhere to report a failure from inside the logging layer.
            // SAFETY: `strings` holds one NUL-terminated string that outlives
            // the call; no raw data is passed.
            unsafe {
                ReportEventW(
                    self.handle,
                    kind,
                    0,
                    EVENT_ID,
                    ptr::null_mut(),
                    1,
                    0,
                    strings.as_ptr(),
                    ptr::null(),
                );
            }
        }
    }

    impl Drop for EventSource {
        fn drop(&mut self) {
            // SAFETY: the handle came from RegisterEventSourceW and is
            // released exactly once.
            unsafe {
                DeregisterEventSource(self.handle);
            }
        }
    }

    fn wide(value: &str) -> Vec<u16> {
        OsStr::new(value).encode_wide().chain(Some(0)).collect()
    }
}
