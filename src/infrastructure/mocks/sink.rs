//! Recording log sink for testing.

use crate::application::ports::LogSink;
use crate::domain::exception::ExceptionInfo;
use crate::domain::printable::to_printable;
use std::sync::{Arc, Mutex};

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedError {
    pub message: String,
    pub type_name: String,
    pub value: String,
}

/// Log sink that remembers every call instead of writing anywhere.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    logged: Arc<Mutex<Vec<LoggedError>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged(&self) -> Vec<LoggedError> {
        self.logged
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    pub fn count(&self) -> usize {
        self.logged().len()
    }
}

impl LogSink for RecordingSink {
    fn log_error(&self, message: &str, info: &ExceptionInfo) {
        self.logged
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .push(LoggedError {
                message: message.to_string(),
                type_name: to_printable(&info.type_name, false),
                value: to_printable(&info.value, false),
            });
    }
}
