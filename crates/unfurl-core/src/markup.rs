//! Escaping helpers for tooltip markup.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched when escaping a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Percent-encode a string so it can be placed inside a URL path segment.
/// Tooltips are shipped to clients in this form.
pub fn path_escape(input: &str) -> String {
    utf8_percent_encode(input, PATH_SEGMENT).to_string()
}

/// Escape the five HTML metacharacters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_escape_matches_tooltip_encoding() {
        let html = "<div style=\"text-align: left;\">\n<b>pajaSx</b><br>";
        assert_eq!(
            path_escape(html),
            "%3Cdiv%20style=%22text-align:%20left%3B%22%3E%0A%3Cb%3EpajaSx%3C%2Fb%3E%3Cbr%3E"
        );
    }

    #[test]
    fn test_path_escape_non_ascii() {
        assert_eq!(path_escape("é"), "%C3%A9");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }
}
