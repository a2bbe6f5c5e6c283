//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters and the host implement these ports.

use crate::domain::exception::ExceptionInfo;
use crate::domain::printable::Value;
use std::error::Error;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::SystemTime;

/// Port for obtaining the current wall-clock time.
///
/// Infrastructure provides `SystemClock`; tests use `MockClock`.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> SystemTime;
}

/// Port for concurrent key-value storage.
///
/// Implementations must make each `with_entry_mut` call atomic with respect
/// to every other access to the same key.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Read an entry without creating it.
    ///
    /// Returns `None` if the key is absent.
    fn read<F, R>(&self, key: &K, reader: F) -> Option<R>
    where
        F: FnOnce(&V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for rendering an exception into trace lines.
///
/// Lines are returned outermost frame first. A line without a trailing
/// newline is terminated by the caller (`\n` in plain mode, `<br />\n` in
/// HTML mode). Lines are plain text; the caller escapes them for HTML.
pub trait TraceRenderer: Send + Sync + Debug {
    fn format_frames(&self, info: &ExceptionInfo, as_html: bool) -> Vec<String>;
}

/// Port for the system log.
///
/// Rate limiting happens before this call, never inside it.
pub trait LogSink: Send + Sync + Debug {
    /// Write one error entry. `message` is the request URL, or `None` when
    /// there was no URL.
    fn log_error(&self, message: &str, info: &ExceptionInfo);
}

/// Result of looking up a principal's login.
pub type LoginResult = Result<Value, Box<dyn Error + Send + Sync>>;

/// The acting principal of a request.
///
/// Every accessor is optional; `None` means the attribute does not exist.
pub trait Principal {
    /// Login name. `None` when the principal has no login at all, as is the
    /// case for unauthenticated principals.
    fn login(&self) -> Option<LoginResult> {
        None
    }

    fn id(&self) -> Option<Value> {
        None
    }

    fn title(&self) -> Option<Value> {
        None
    }

    fn description(&self) -> Option<Value> {
        None
    }
}

/// The in-flight request that triggered an error.
///
/// Every accessor is optional; the defaults describe an empty request.
pub trait Request {
    fn principal(&self) -> Option<&dyn Principal> {
        None
    }

    fn url(&self) -> Option<Value> {
        None
    }

    /// All key/value pairs of the request, in any order.
    fn items(&self) -> Vec<(Value, Value)> {
        Vec::new()
    }
}
