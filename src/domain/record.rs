//! Error records kept in the log store.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identity under which a history is grouped.
///
/// Every utility built with [`OwnerId::Root`] shares one history; instance
/// owners are distinct from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OwnerId {
    Root,
    Instance(u64),
}

impl OwnerId {
    /// Allocate a fresh instance identity, unique within this process.
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        OwnerId::Instance(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerId::Root => write!(f, "root"),
            OwnerId::Instance(id) => write!(f, "instance-{}", id),
        }
    }
}

/// One captured error.
///
/// Records are never mutated after construction. Every text field is already
/// printable; `username`, `request_html` and `trace_html` are HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unqualified exception type name
    pub type_name: String,
    /// Printable exception value
    pub value: String,
    /// Wall-clock time of capture
    pub time: SystemTime,
    /// `time` rendered in local time, ctime style
    pub time_display: String,
    /// Lookup key, unique with overwhelming probability
    pub id: String,
    pub trace_text: Option<String>,
    pub trace_html: Option<String>,
    /// Login, id, title and description of the principal, comma separated
    pub username: Option<String>,
    pub url: Option<String>,
    /// All request items, sorted by key, one `key: value<br />` line each
    pub request_html: Option<String>,
}

/// Render a timestamp the way `ctime` does, in local time.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}

/// Generate an entry id: capture time followed by a random suffix.
pub fn generate_id(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    format!("{:.6}{}", secs, Uuid::new_v4().simple())
}
