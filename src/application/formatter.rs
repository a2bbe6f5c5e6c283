//! Formatting of captured exceptions into trace text.

use crate::application::ports::TraceRenderer;
use crate::domain::exception::ExceptionInfo;
use crate::domain::printable::{to_printable, Value};

/// Render `info` into a multi-line trace.
///
/// The renderer produces the lines; each is made printable with the same
/// `as_html` flag (so HTML output carries no unescaped content) and, if not
/// already terminated by a newline, terminated with `\n` or `<br />\n`.
/// Lines keep the renderer's order.
pub fn format_exception(renderer: &dyn TraceRenderer, info: &ExceptionInfo, as_html: bool) -> String {
    renderer
        .format_frames(info, as_html)
        .into_iter()
        .map(|line| {
            let mut line = to_printable(&Value::Text(line), as_html);
            if !line.ends_with('\n') {
                line.push_str(if as_html { "<br />\n" } else { "\n" });
            }
            line
        })
        .collect()
}
