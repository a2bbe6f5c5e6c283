//! Printable formatting of arbitrary values.
//!
//! Values coming from the host (exception values, request fields, principal
//! attributes) may be text, raw bytes, or objects whose string conversion can
//! fail. This module turns all of them into text that is always renderable and,
//! when asked for HTML, safe against markup injection.

use std::any;
use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Log target for secondary failures hit while formatting untrusted values.
pub const DIAGNOSTICS_TARGET: &str = "error_reporting::diagnostics";

/// Capability of being rendered to text.
///
/// Rendering may fail, either by returning an error or by panicking. Both are
/// contained by [`to_printable`], which falls back to a placeholder naming
/// [`Render::type_name`].
pub trait Render: Send + Sync {
    /// Short name of the concrete type, used in placeholders.
    fn type_name(&self) -> &str;

    /// Render the value to text.
    fn render(&self) -> Result<String, fmt::Error>;
}

/// Adapter rendering any `Display` type through its formatter.
///
/// Unlike `ToString`, a formatter error does not panic; it is reported as a
/// render failure.
pub struct Displayed<T> {
    value: T,
    type_name: &'static str,
}

impl<T> Displayed<T>
where
    T: fmt::Display + Send + Sync,
{
    pub fn new(value: T) -> Self {
        Self {
            value,
            type_name: short_type_name(any::type_name::<T>()),
        }
    }
}

impl<T> Render for Displayed<T>
where
    T: fmt::Display + Send + Sync,
{
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn render(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        write!(out, "{}", self.value)?;
        Ok(out)
    }
}

/// A value crossing the host boundary.
///
/// Text and bytes are distinguished explicitly; everything else goes through
/// the [`Render`] capability.
#[derive(Clone)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Object(Arc<dyn Render>),
}

impl Value {
    /// Wrap any `Display` value so it is rendered lazily and defensively.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Value::Object(Arc::new(Displayed::new(value)))
    }

    /// Wrap a custom [`Render`] implementation.
    pub fn object<R>(value: R) -> Self
    where
        R: Render + 'static,
    {
        Value::Object(Arc::new(value))
    }

    /// Printable form, see [`to_printable`].
    pub fn printable(&self, as_html: bool) -> String {
        to_printable(self, as_html)
    }

    /// Whether the value is empty text or empty bytes.
    ///
    /// Objects are never considered empty since rendering them is deferred.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(text) => text.is_empty(),
            Value::Bytes(bytes) => bytes.is_empty(),
            Value::Object(_) => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Value::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(value: &[u8; N]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

macro_rules! value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Text(value.to_string())
                }
            }
        )*
    };
}

value_from_display!(i32, i64, u32, u64, usize, f64, bool);

/// Convert a value to printable text.
///
/// - Text passes through.
/// - Bytes are decoded as UTF-8; every byte that cannot be decoded becomes a
///   literal `\xHH` escape (see [`decode_printed_replace`]).
/// - Objects are rendered; if rendering fails the failure is logged and
///   `<unprintable TypeName object>` is returned instead.
///
/// With `as_html`, `&`, `<` and `>` are escaped. The placeholder's type name
/// is always escaped, but the placeholder itself is returned as-is, so HTML
/// callers receive its raw angle brackets.
pub fn to_printable(value: &Value, as_html: bool) -> String {
    let text = match value {
        Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => decode_printed_replace(bytes),
        Value::Object(object) => match render_guarded(object.as_ref()) {
            Some(text) => text,
            None => {
                return format!(
                    "<unprintable {} object>",
                    escape_html(object.type_name())
                )
            }
        },
    };

    if as_html {
        escape_html(&text)
    } else {
        text
    }
}

fn render_guarded(object: &dyn Render) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| object.render())) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(error)) => {
            tracing::error!(
                target: DIAGNOSTICS_TARGET,
                type_name = object.type_name(),
                %error,
                "error while getting a string representation of an object"
            );
            None
        }
        Err(_) => {
            tracing::error!(
                target: DIAGNOSTICS_TARGET,
                type_name = object.type_name(),
                "panic while getting a string representation of an object"
            );
            None
        }
    }
}

/// Decode UTF-8, replacing each undecodable byte with `\xHH`.
///
/// Never fails and keeps the offending byte values visible.
pub fn decode_printed_replace(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for byte in chunk.invalid() {
            // Writing to a String is infallible.
            let _ = write!(out, "\\x{:02x}", byte);
        }
    }
    out
}

/// Escape `&`, `<` and `>` for HTML text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Last path segment of a type name, generics excluded.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing(&'static str);

    impl Render for Failing {
        fn type_name(&self) -> &str {
            self.0
        }

        fn render(&self) -> Result<String, fmt::Error> {
            Err(fmt::Error)
        }
    }

    struct Panicking;

    impl Render for Panicking {
        fn type_name(&self) -> &str {
            "Panicking"
        }

        fn render(&self) -> Result<String, fmt::Error> {
            panic!("render exploded")
        }
    }

    struct BrokenDisplay;

    impl fmt::Display for BrokenDisplay {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    struct NonStr;

    impl fmt::Display for NonStr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("non-str")
        }
    }

    #[test]
    fn test_text_passes_through_in_plain_mode() {
        assert_eq!(to_printable(&Value::from("<script>"), false), "<script>");
    }

    #[test]
    fn test_tags_escaped_in_html_mode() {
        assert_eq!(
            to_printable(&Value::from("<script>&"), true),
            "&lt;script&gt;&amp;"
        );
    }

    #[test]
    fn test_bytes_decoded_as_utf8() {
        assert_eq!(to_printable(&Value::from(br"\u0441"), false), "\\u0441");
        assert_eq!(
            to_printable(&Value::from("с".as_bytes()), false),
            "с".to_string()
        );
    }

    #[test]
    fn test_undecodable_bytes_become_hex_escapes() {
        assert_eq!(to_printable(&Value::from(b"\xe1"), false), "\\xe1");
        assert_eq!(
            to_printable(&Value::from(b"a string tb \xe1"), false),
            "a string tb \\xe1"
        );
        assert_eq!(decode_printed_replace(b"\xff\xfeok"), "\\xff\\xfeok");
    }

    #[test]
    fn test_truncated_multibyte_sequence_escapes_each_byte() {
        // First two bytes of a three byte sequence.
        assert_eq!(decode_printed_replace(b"x\xe2\x82"), "x\\xe2\\x82");
    }

    #[test]
    fn test_display_objects_are_rendered() {
        assert_eq!(to_printable(&Value::display(NonStr), false), "non-str");
        assert_eq!(to_printable(&Value::display(42), true), "42");
    }

    #[test]
    fn test_failing_display_yields_placeholder() {
        assert_eq!(
            to_printable(&Value::display(BrokenDisplay), false),
            "<unprintable BrokenDisplay object>"
        );
    }

    #[test]
    fn test_placeholder_type_name_is_escaped() {
        assert_eq!(
            to_printable(&Value::object(Failing("<script>")), false),
            "<unprintable &lt;script&gt; object>"
        );
    }

    #[test]
    fn test_panicking_render_is_contained() {
        assert_eq!(
            to_printable(&Value::object(Panicking), true),
            "<unprintable Panicking object>"
        );
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(short_type_name("core::option::Option<u8>"), "Option");
        assert_eq!(short_type_name("u8"), "u8");
    }

    #[test]
    fn test_is_empty() {
        assert!(Value::from("").is_empty());
        assert!(Value::from(Vec::new()).is_empty());
        assert!(!Value::from("x").is_empty());
        assert!(!Value::display(NonStr).is_empty());
    }
}
