//! # error-reporting
//!
//! In-process error aggregation for request-serving hosts.
//!
//! The host calls [`ErrorReportingUtility::raising`] once per unhandled error,
//! optionally passing the request that was being served. The utility:
//!
//! 1. Skips type names configured as ignored (`Unauthorized` by default).
//! 2. Renders the error into plain-text and HTML traces.
//! 3. Extracts the URL, the acting principal and all request items,
//!    defensively: values that fail to render become placeholder text.
//! 4. Appends an [`ErrorRecord`] to a bounded, shared [`LogStore`].
//! 5. Forwards a copy to the system log, rate limited per type name by a
//!    leaky bucket (5 at once, then one per minute by default).
//!
//! ## Quick Start
//!
//! ```rust
//! use error_reporting::{ErrorReportingUtility, ExceptionInfo};
//!
//! #[derive(Debug)]
//! struct NotFound(u32);
//!
//! impl std::fmt::Display for NotFound {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "no user with id {}", self.0)
//!     }
//! }
//!
//! impl std::error::Error for NotFound {}
//!
//! let utility = ErrorReportingUtility::new();
//! utility.raising(&ExceptionInfo::from_error(&NotFound(7)), None);
//!
//! let entry = &utility.get_log_entries()[0];
//! assert_eq!(entry.type_name, "NotFound");
//! assert_eq!(entry.value, "no user with id 7");
//! ```
//!
//! ## Shared histories
//!
//! Stores and limiters are plain values shared through `Arc`. Every root
//! utility over the same store sees the same history:
//!
//! ```rust
//! use error_reporting::{ErrorReportingUtility, ExceptionInfo, LogStore, RateLimiter, Traceback};
//! use std::sync::Arc;
//!
//! let store = Arc::new(LogStore::new());
//! let limiter = Arc::new(RateLimiter::default());
//!
//! let worker_a = ErrorReportingUtility::root(Arc::clone(&store), Arc::clone(&limiter));
//! let worker_b = ErrorReportingUtility::root(Arc::clone(&store), Arc::clone(&limiter));
//!
//! worker_a.raising(&ExceptionInfo::new("KeyError", "'id'", Traceback::empty()), None);
//! assert_eq!(worker_b.get_log_entries().len(), 1);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use error_reporting::{ErrorReportingUtility, Properties};
//! use std::time::Duration;
//!
//! let utility = ErrorReportingUtility::builder()
//!     .with_properties(Properties::new(50, true, ["Unauthorized", "NotFound"]).unwrap())
//!     .with_rate_limit(Duration::from_secs(30), 10)
//!     .build()
//!     .unwrap();
//!
//! // Properties can also be changed at runtime.
//! utility.set_properties(10, false, Vec::<&str>::new()).unwrap();
//! assert_eq!(utility.get_properties().keep_entries, 10);
//! ```
//!
//! ## Logging
//!
//! Errors copied to the system log are emitted by [`TracingLogSink`] as
//! `ERROR` events on the `error_reporting::site_error` target. Failures to
//! render host values are reported as `ERROR` events on the
//! `error_reporting::diagnostics` target and never reach the caller.
//!
//! ## Architecture
//!
//! - **Domain**: printable formatting, exception info, records, properties
//!   and the leaky bucket policy
//! - **Application**: log store, rate limiter, formatting and the utility
//!   itself, plus the ports the host implements
//! - **Infrastructure**: sharded storage, clock, trace renderer and the
//!   `tracing` log sink

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::{
    exception::{ExceptionInfo, Frame, Traceback},
    policy::{LeakyBucketPolicy, PolicyDecision, PolicyError, RateLimitPolicy},
    printable::{decode_printed_replace, escape_html, to_printable, Displayed, Render, Value},
    properties::{Properties, PropertiesError},
    record::{ErrorRecord, OwnerId},
};

pub use application::{
    formatter::format_exception,
    limiter::RateLimiter,
    log_store::LogStore,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, LogSink, LoginResult, Principal, Request, Storage, TraceRenderer},
    reporting::{BuildError, ErrorReportingUtility, ErrorReportingUtilityBuilder},
};

pub use infrastructure::{
    clock::SystemClock,
    sink::{TracingLogSink, SITE_ERROR_TARGET},
    storage::ShardedStorage,
    trace::StandardTraceRenderer,
};
