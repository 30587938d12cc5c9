use std::borrow::Cow;

use chrono::{DateTime, Utc};
use scraper::Html;

/// Elements whose text content is markup, not prose.
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "noscript", "option"];

/// Reduces an HTML fragment to its plain text.
///
/// All tags and attributes are dropped; text inside `script`, `style` and
/// similar non-prose elements is discarded rather than inlined. Entities are
/// decoded. Leading and trailing whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use ximalaya_feed::util::html_to_text;
///
/// assert_eq!(html_to_text("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(html_to_text("a &amp; b<script>x()</script>"), "a & b");
/// ```
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.trim().to_string();
    }

    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }

    out.trim().to_string()
}

/// Strips characters XML 1.0 cannot carry.
///
/// Platform text occasionally contains raw control bytes that would make the
/// rendered feed unparseable. Tab, newline and carriage return are kept.
///
/// Returns `Cow::Borrowed` when nothing needs removing (common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_invalid = |c: char| {
        (c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r'))
            || c == '\u{7f}'
            || c == '\u{fffe}'
            || c == '\u{ffff}'
    };

    if !s.chars().any(is_invalid) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_invalid(c)).collect())
}

/// Converts a platform creation timestamp (epoch milliseconds) to a UTC datetime.
///
/// Returns `None` for zero (platform placeholder) or out-of-range values.
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis)
}
