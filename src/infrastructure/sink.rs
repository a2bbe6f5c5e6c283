//! System log adapter backed by `tracing`.

use crate::application::formatter::format_exception;
use crate::application::ports::{LogSink, TraceRenderer};
use crate::domain::exception::ExceptionInfo;
use crate::domain::printable::to_printable;
use crate::infrastructure::trace::StandardTraceRenderer;
use std::sync::Arc;

/// Target of the events emitted for forwarded errors.
pub const SITE_ERROR_TARGET: &str = "error_reporting::site_error";

/// Emits each forwarded error as one ERROR event on [`SITE_ERROR_TARGET`].
///
/// The message is the request URL; the exception type, value and rendered
/// trace are attached as fields.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    renderer: Arc<dyn TraceRenderer>,
}

impl TracingLogSink {
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(StandardTraceRenderer::new()))
    }

    /// Render traces with a custom renderer.
    pub fn with_renderer(renderer: Arc<dyn TraceRenderer>) -> Self {
        Self { renderer }
    }
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TracingLogSink {
    fn log_error(&self, message: &str, info: &ExceptionInfo) {
        let traceback = format_exception(self.renderer.as_ref(), info, false);
        tracing::error!(
            target: SITE_ERROR_TARGET,
            exception_type = %to_printable(&info.type_name, false),
            exception_value = %to_printable(&info.value, false),
            traceback = %traceback.trim_end(),
            "{}",
            message
        );
    }
}
