//! Default trace renderer.
//!
//! Produces the familiar layout:
//!
//! ```text
//! Traceback (most recent call last):
//!   File "src/handler.rs", line 42, in handle
//!     let user = load(id)?;
//! NotFound: user 7
//! Caused by: no such row
//! ```

use crate::application::ports::TraceRenderer;
use crate::domain::exception::{ExceptionInfo, Traceback};
use crate::domain::printable::to_printable;
use std::backtrace::BacktraceStatus;

/// Renders frames, captured backtraces and the exception line.
///
/// Plain lines end with `\n`. HTML lines are left unterminated so the caller
/// ends them with `<br />`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTraceRenderer;

impl StandardTraceRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TraceRenderer for StandardTraceRenderer {
    fn format_frames(&self, info: &ExceptionInfo, as_html: bool) -> Vec<String> {
        let mut lines = Vec::new();

        match &info.traceback {
            Traceback::Frames(frames) if !frames.is_empty() => {
                lines.push("Traceback (most recent call last):".to_string());
                for frame in frames {
                    lines.push(format!(
                        "  File \"{}\", line {}, in {}",
                        frame.file, frame.line, frame.function
                    ));
                    if let Some(source) = &frame.source {
                        lines.push(format!("    {}", source.trim()));
                    }
                }
            }
            Traceback::Frames(_) => {}
            Traceback::Captured(backtrace) if backtrace.status() == BacktraceStatus::Captured => {
                let rendered = backtrace.to_string();
                let mut frames = rendered.lines().filter(|line| !line.trim().is_empty()).peekable();
                if frames.peek().is_some() {
                    lines.push("Backtrace (most recent call first):".to_string());
                    lines.extend(frames.map(|line| format!("  {}", line.trim_end())));
                }
            }
            Traceback::Captured(_) => {}
            Traceback::Preformatted(text) => {
                lines.extend(to_printable(text, false).lines().map(str::to_string));
            }
        }

        lines.push(format!(
            "{}: {}",
            to_printable(&info.type_name, false),
            to_printable(&info.value, false)
        ));
        for cause in &info.causes {
            lines.push(format!("Caused by: {}", to_printable(cause, false)));
        }

        if !as_html {
            for line in &mut lines {
                line.push('\n');
            }
        }
        lines
    }
}
