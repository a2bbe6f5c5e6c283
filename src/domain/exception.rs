//! Captured exception information.
//!
//! An [`ExceptionInfo`] is the triple a host hands over for every unhandled
//! failure: the type name, the display value, and either a structured
//! traceback or one the host already rendered itself.

use crate::domain::printable::{escape_html, short_type_name, Value, DIAGNOSTICS_TARGET};
use std::any;
use std::fmt::{self, Write as _};
use std::backtrace::Backtrace;
use std::error::Error;
use std::sync::Arc;

/// One stack frame of a structured traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Source file or module path
    pub file: String,
    /// Line number within `file`
    pub line: u32,
    /// Enclosing function
    pub function: String,
    /// Source text of the line, if known
    pub source: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Traceback of an exception.
#[derive(Debug, Clone)]
pub enum Traceback {
    /// Frames listed outermost first
    Frames(Vec<Frame>),
    /// A backtrace captured by the Rust runtime
    Captured(Arc<Backtrace>),
    /// Trace text already rendered by the caller; it is recorded as-is
    Preformatted(Value),
}

impl Traceback {
    /// A traceback without any frames.
    pub fn empty() -> Self {
        Traceback::Frames(Vec::new())
    }

    pub fn is_preformatted(&self) -> bool {
        matches!(self, Traceback::Preformatted(_))
    }
}

/// The `(type, value, traceback)` triple describing one failure.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Declared type name of the exception (unqualified)
    pub type_name: Value,
    /// Display value of the exception
    pub value: Value,
    pub traceback: Traceback,
    /// Chain of underlying causes, outermost first
    pub causes: Vec<Value>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<Value>, value: impl Into<Value>, traceback: Traceback) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
            traceback,
            causes: Vec::new(),
        }
    }

    /// Build the triple from a Rust error.
    ///
    /// The type name is the unqualified name of `E`, the value is its
    /// `Display` output, and every `source()` becomes a cause. A backtrace is
    /// captured according to the usual `RUST_BACKTRACE` rules.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + 'static,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(rendered(cause, "Error"));
            source = cause.source();
        }

        let type_name = short_type_name(any::type_name::<E>());
        Self {
            type_name: Value::from(type_name),
            value: rendered(error, type_name),
            traceback: Traceback::Captured(Arc::new(Backtrace::capture())),
            causes,
        }
    }

    pub fn with_causes(mut self, causes: Vec<Value>) -> Self {
        self.causes = causes;
        self
    }
}

/// Render a `Display` value eagerly; a formatter error yields the
/// unprintable placeholder instead of panicking like `ToString` would.
fn rendered<T: fmt::Display + ?Sized>(value: &T, type_name: &str) -> Value {
    let mut out = String::new();
    match write!(out, "{}", value) {
        Ok(()) => Value::Text(out),
        Err(error) => {
            tracing::error!(
                target: DIAGNOSTICS_TARGET,
                type_name,
                %error,
                "error while getting a string representation of an error"
            );
            Value::Text(format!("<unprintable {} object>", escape_html(type_name)))
        }
    }
}
