//! The error reporting utility.
//!
//! [`ErrorReportingUtility::raising`] is called by the host once per
//! unhandled error. It turns the error (and the request that triggered it)
//! into an [`ErrorRecord`], appends the record to the shared [`LogStore`] and,
//! when enabled, forwards a rate-limited copy to the system log.

use crate::application::formatter::format_exception;
use crate::application::limiter::RateLimiter;
use crate::application::log_store::LogStore;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, LogSink, Principal, Request, TraceRenderer};
use crate::domain::exception::{ExceptionInfo, Traceback};
use crate::domain::policy::{LeakyBucketPolicy, PolicyDecision, PolicyError};
use crate::domain::printable::{to_printable, Value, DIAGNOSTICS_TARGET};
use crate::domain::properties::{Properties, PropertiesError};
use crate::domain::record::{format_time, generate_id, ErrorRecord, OwnerId};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::sink::TracingLogSink;
use crate::infrastructure::trace::StandardTraceRenderer;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Error returned when building an [`ErrorReportingUtility`] fails.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Rate limit configuration was rejected
    Policy(PolicyError),
    /// Initial properties were rejected
    Properties(PropertiesError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Policy(e) => write!(f, "rate limit configuration error: {}", e),
            BuildError::Properties(e) => write!(f, "properties error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<PolicyError> for BuildError {
    fn from(e: PolicyError) -> Self {
        BuildError::Policy(e)
    }
}

impl From<PropertiesError> for BuildError {
    fn from(e: PropertiesError) -> Self {
        BuildError::Properties(e)
    }
}

/// Builder for constructing an [`ErrorReportingUtility`].
pub struct ErrorReportingUtilityBuilder {
    owner: Option<OwnerId>,
    store: Option<Arc<LogStore>>,
    limiter: Option<Arc<RateLimiter>>,
    rate_limit: Option<(Duration, u32)>,
    properties: Properties,
    clock: Option<Arc<dyn Clock>>,
    renderer: Option<Arc<dyn TraceRenderer>>,
    sink: Option<Arc<dyn LogSink>>,
}

impl ErrorReportingUtilityBuilder {
    /// Set the owner identity histories are kept under.
    ///
    /// Default: a fresh [`OwnerId::unique`] identity.
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Share a log store with other utilities.
    ///
    /// Default: a new, private store.
    pub fn with_store(mut self, store: Arc<LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a rate limiter with other utilities.
    ///
    /// Takes precedence over [`with_rate_limit`](Self::with_rate_limit).
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Configure a private rate limiter: `burst` copies at once, then one per
    /// `period`.
    ///
    /// The values are validated when `build()` is called.
    pub fn with_rate_limit(mut self, period: Duration, burst: u32) -> Self {
        self.rate_limit = Some((period, burst));
        self
    }

    /// Set the initial properties.
    ///
    /// The properties are validated when `build()` is called.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the renderer used for `trace_text` and `trace_html`.
    pub fn with_renderer(mut self, renderer: Arc<dyn TraceRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the system log sink.
    ///
    /// Default: [`TracingLogSink`].
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the utility.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` if the properties or the rate limit are invalid.
    pub fn build(self) -> Result<ErrorReportingUtility, BuildError> {
        self.properties.validate()?;

        let limiter = match (self.limiter, self.rate_limit) {
            (Some(limiter), _) => limiter,
            (None, Some((period, burst))) => {
                Arc::new(RateLimiter::new(LeakyBucketPolicy::new(period, burst)?))
            }
            (None, None) => Arc::new(RateLimiter::default()),
        };

        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(StandardTraceRenderer::new()));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingLogSink::with_renderer(Arc::clone(&renderer))));

        Ok(ErrorReportingUtility {
            owner: self.owner.unwrap_or_else(OwnerId::unique),
            store: self.store.unwrap_or_default(),
            limiter,
            properties: RwLock::new(self.properties),
            renderer,
            sink,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            metrics: Metrics::new(),
        })
    }
}

/// Records errors raised while handling requests.
///
/// Utilities built with the same owner identity and store see the same
/// history. All methods take `&self`; a utility is meant to be shared by
/// every worker thread of the host.
///
/// # Example
///
/// ```
/// use error_reporting::{ErrorReportingUtility, ExceptionInfo, Traceback};
///
/// let utility = ErrorReportingUtility::new();
/// utility.raising(&ExceptionInfo::new("KeyError", "'missing'", Traceback::empty()), None);
///
/// let entries = utility.get_log_entries();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].type_name, "KeyError");
/// ```
pub struct ErrorReportingUtility {
    owner: OwnerId,
    store: Arc<LogStore>,
    limiter: Arc<RateLimiter>,
    properties: RwLock<Properties>,
    renderer: Arc<dyn TraceRenderer>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl ErrorReportingUtility {
    /// Utility with its own identity, store and limiter, and default
    /// properties.
    pub fn new() -> Self {
        Self::from_defaults(OwnerId::unique(), Arc::default(), Arc::default())
    }

    /// The root utility: every root utility built over `store` shares one
    /// history.
    pub fn root(store: Arc<LogStore>, limiter: Arc<RateLimiter>) -> Self {
        Self::from_defaults(OwnerId::Root, store, limiter)
    }

    /// Utility with a fresh instance identity over shared `store` and
    /// `limiter`.
    pub fn instance(store: Arc<LogStore>, limiter: Arc<RateLimiter>) -> Self {
        Self::from_defaults(OwnerId::unique(), store, limiter)
    }

    pub fn builder() -> ErrorReportingUtilityBuilder {
        ErrorReportingUtilityBuilder {
            owner: None,
            store: None,
            limiter: None,
            rate_limit: None,
            properties: Properties::default(),
            clock: None,
            renderer: None,
            sink: None,
        }
    }

    fn from_defaults(owner: OwnerId, store: Arc<LogStore>, limiter: Arc<RateLimiter>) -> Self {
        let renderer: Arc<dyn TraceRenderer> = Arc::new(StandardTraceRenderer::new());
        Self {
            owner,
            store,
            limiter,
            properties: RwLock::new(Properties::default()),
            sink: Arc::new(TracingLogSink::with_renderer(Arc::clone(&renderer))),
            renderer,
            clock: Arc::new(SystemClock::new()),
            metrics: Metrics::new(),
        }
    }

    /// Record an error.
    ///
    /// Ignored type names return immediately: no record, no log copy, and
    /// no rate limiter decision. Everything taken from `info` or `request`
    /// is rendered defensively; a failing or panicking host value shows up
    /// as placeholder text, and this method does not panic because of it.
    pub fn raising(&self, info: &ExceptionInfo, request: Option<&dyn Request>) {
        let now = self.clock.now();
        let properties = self.get_properties();

        let type_name = to_printable(&info.type_name, false);
        if properties.is_ignored(&type_name) {
            self.metrics.record_ignored();
            return;
        }

        let (trace_text, trace_html) = match &info.traceback {
            Traceback::Preformatted(text) => (Some(to_printable(text, false)), None),
            _ => (
                self.format_trace(info, false),
                self.format_trace(info, true),
            ),
        };

        let (url, username, request_html) = match request {
            Some(request) => (
                request_url(request),
                request_username(request),
                Some(request_html(request)),
            ),
            None => (None, None, None),
        };

        let record = ErrorRecord {
            type_name: type_name.clone(),
            value: to_printable(&info.value, false),
            time: now,
            time_display: format_time(now),
            id: generate_id(now),
            trace_text,
            trace_html,
            username,
            url,
            request_html,
        };
        let message = record.url.clone().unwrap_or_else(|| "None".to_string());

        let trimmed = self.store.append(self.owner, record, properties.keep_entries);
        self.metrics.record_appended();
        if trimmed > 0 {
            self.metrics.record_trimmed(trimmed);
        }

        if properties.copy_to_log {
            self.copy_to_log(&type_name, &message, info, now);
        }
    }

    fn copy_to_log(
        &self,
        type_name: &str,
        message: &str,
        info: &ExceptionInfo,
        now: std::time::SystemTime,
    ) {
        match self.limiter.admit(type_name, now) {
            PolicyDecision::Allow => {
                let sink = &self.sink;
                if guarded("log_error", || sink.log_error(message, info)).is_some() {
                    self.metrics.record_log_copy();
                }
            }
            PolicyDecision::Suppress => {
                self.metrics.record_log_suppressed();
                tracing::trace!(
                    target: DIAGNOSTICS_TARGET,
                    type_name,
                    "log copy suppressed by rate limit"
                );
            }
        }
    }

    fn format_trace(&self, info: &ExceptionInfo, as_html: bool) -> Option<String> {
        let renderer = self.renderer.as_ref();
        guarded("format_frames", || format_exception(renderer, info, as_html))
    }

    /// Current properties.
    pub fn get_properties(&self) -> Properties {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the properties.
    ///
    /// Ignored type names are converted to text and empty ones are dropped.
    /// A smaller `keep_entries` takes effect on the next append.
    ///
    /// # Errors
    ///
    /// `PropertiesError::ZeroKeepEntries` if `keep_entries` is zero; the
    /// previous properties stay in place.
    pub fn set_properties<I, V>(
        &self,
        keep_entries: usize,
        copy_to_log: bool,
        ignored_exceptions: I,
    ) -> Result<(), PropertiesError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let properties = Properties::new(keep_entries, copy_to_log, ignored_exceptions)?;
        self.apply_properties(properties)
    }

    /// Replace the properties with an already built value, validating it
    /// first.
    pub fn apply_properties(&self, properties: Properties) -> Result<(), PropertiesError> {
        properties.validate()?;
        *self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner) = properties;
        Ok(())
    }

    /// Restore the default properties.
    pub fn reset_properties(&self) {
        *self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Properties::default();
    }

    /// Copies of this owner's records, most recent first.
    pub fn get_log_entries(&self) -> Vec<ErrorRecord> {
        self.store.entries(self.owner)
    }

    /// Copy of this owner's record with the given id.
    pub fn get_log_entry_by_id(&self, id: &str) -> Option<ErrorRecord> {
        self.store.entry_by_id(self.owner, id)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl Default for ErrorReportingUtility {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorReportingUtility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReportingUtility")
            .field("owner", &self.owner)
            .field("properties", &self.get_properties())
            .field("store", &self.store)
            .field("limiter", &self.limiter)
            .finish()
    }
}

/// Run a host callback, logging and swallowing a panic.
fn guarded<T>(lookup: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(
                target: DIAGNOSTICS_TARGET,
                lookup,
                "panic in ErrorReportingUtility while calling into the host"
            );
            None
        }
    }
}

fn request_url(request: &dyn Request) -> Option<String> {
    match guarded("request.url", || request.url()) {
        Some(url) => url.map(|url| to_printable(&url, false)),
        None => Some("<error getting request URL>".to_string()),
    }
}

fn request_username(request: &dyn Request) -> Option<String> {
    let principal = guarded("request.principal", || request.principal()).flatten()?;
    Some(username(principal))
}

fn username(principal: &dyn Principal) -> String {
    let error_login = || Value::from("<error getting login>");
    let login = match guarded("principal.login", || principal.login()) {
        Some(None) => Value::from("unauthenticated"),
        Some(Some(Ok(login))) => login,
        Some(Some(Err(error))) => {
            tracing::error!(
                target: DIAGNOSTICS_TARGET,
                %error,
                "error in ErrorReportingUtility while getting login of the principal"
            );
            error_login()
        }
        None => error_login(),
    };

    let attribute = |name: &'static str, value: Option<Option<Value>>| {
        value
            .flatten()
            .unwrap_or_else(|| Value::Text(format!("<error getting '{}'>", name)))
    };

    [
        login,
        attribute("principal.id", guarded("principal.id", || principal.id())),
        attribute("principal.title", guarded("principal.title", || principal.title())),
        attribute(
            "principal.description",
            guarded("principal.description", || principal.description()),
        ),
    ]
    .iter()
    .map(|part| to_printable(part, true))
    .collect::<Vec<_>>()
    .join(", ")
}

fn request_html(request: &dyn Request) -> String {
    let Some(items) = guarded("request.items", || request.items()) else {
        return to_printable(&Value::from("<error getting request items>"), true);
    };

    let mut lines: Vec<(String, String)> = items
        .iter()
        .map(|(key, value)| {
            let line = format!(
                "{}: {}<br />\n",
                to_printable(key, true),
                to_printable(value, true)
            );
            (to_printable(key, false), line)
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    lines.into_iter().map(|(_, line)| line).collect()
}
