//! Allow-list sanitizer for user-authored formatted text.
//!
//! Formatted text props carry a small HTML fragment from the inline editor.
//! Only formatting tags survive, with a handful of attributes; everything
//! else is dropped while its text content is kept. `script`-like blocks are
//! dropped together with their content, and links keep only safe schemes.

use std::fmt::Write;

/// Formatting tags kept in formatted text.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "h1", "h2", "h3", "h4", "h5", "h6", "i", "li",
    "ol", "p", "pre", "s", "span", "strong", "sub", "sup", "u", "ul",
];

/// Tags dropped together with everything up to their closing tag.
const DROPPED_BLOCKS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "textarea", "title",
];

/// Attributes kept on every allowed tag.
const GLOBAL_ATTRIBUTES: &[&str] = &["class", "title"];

/// Schemes a link may use. Scheme-less links are relative and always kept.
const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Reduce an HTML fragment to allowed formatting markup.
///
/// Tags left open are closed at the end, stray closing tags are dropped and
/// a `<` that does not start a tag is escaped.
#[must_use]
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open: Vec<&'static str> = Vec::new();
    let mut rest = input;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }
        let Some(tag) = Tag::parse(rest) else {
            out.push_str("&lt;");
            rest = &rest[1..];
            continue;
        };
        rest = &rest[tag.len..];

        if DROPPED_BLOCKS.contains(&tag.name.as_str()) {
            if !tag.closing {
                rest = skip_block(rest, &tag.name);
            }
            continue;
        }
        let Some(&name) = ALLOWED_TAGS.iter().find(|allowed| **allowed == tag.name) else {
            continue;
        };

        if tag.closing {
            if let Some(pos) = open.iter().rposition(|t| *t == name) {
                for inner in open.drain(pos..).rev() {
                    let _ = write!(out, "</{inner}>");
                }
            }
            continue;
        }

        out.push('<');
        out.push_str(name);
        for (attr, value) in &tag.attributes {
            if allowed_attribute(name, attr, value) {
                let _ = write!(out, " {attr}=\"{}\"", escape_quoted(value));
            }
        }
        out.push('>');
        if name != "br" {
            open.push(name);
        }
    }
    out.push_str(rest);

    for name in open.into_iter().rev() {
        let _ = write!(out, "</{name}>");
    }
    out
}

/// A parsed start or end tag.
struct Tag {
    name: String,
    closing: bool,
    attributes: Vec<(String, String)>,
    /// Bytes consumed, including the closing `>`.
    len: usize,
}

impl Tag {
    /// Parse the tag at the start of `s`, which begins with `<`.
    ///
    /// Returns `None` when no tag name follows. A tag without `>` consumes
    /// the rest of the input.
    fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        let mut i = 1;
        let closing = bytes.get(i) == Some(&b'/');
        if closing {
            i += 1;
        }
        let start = i;
        if !bytes.get(start).is_some_and(u8::is_ascii_alphabetic) {
            return None;
        }
        while bytes.get(i).is_some_and(u8::is_ascii_alphanumeric) {
            i += 1;
        }
        let name = s[start..i].to_ascii_lowercase();
        let mut attributes = Vec::new();

        loop {
            while bytes
                .get(i)
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'/')
            {
                i += 1;
            }
            let len = match bytes.get(i) {
                None => s.len(),
                Some(&b'>') => i + 1,
                Some(_) => 0,
            };
            if len > 0 {
                return Some(Self {
                    name,
                    closing,
                    attributes,
                    len,
                });
            }

            let attr_start = i;
            while bytes
                .get(i)
                .is_some_and(|b| !matches!(*b, b'=' | b'>' | b'/') && !b.is_ascii_whitespace())
            {
                i += 1;
            }
            let attr = s[attr_start..i].to_ascii_lowercase();
            while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                i += 1;
            }

            let mut value = String::new();
            if bytes.get(i) == Some(&b'=') {
                i += 1;
                while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let end = s[i + 1..]
                            .find(char::from(quote))
                            .map_or(s.len(), |e| i + 1 + e);
                        value = s[i + 1..end].to_string();
                        i = (end + 1).min(s.len());
                    }
                    _ => {
                        let value_start = i;
                        while bytes
                            .get(i)
                            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                        {
                            i += 1;
                        }
                        value = s[value_start..i].to_string();
                    }
                }
            }
            if !attr.is_empty() {
                attributes.push((attr, value));
            }
        }
    }
}

/// Skip past the closing tag of a dropped block, or to the end of input.
fn skip_block<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let Some(close) = lower.find(&format!("</{name}")) else {
        return "";
    };
    lower[close..]
        .find('>')
        .map_or("", |end| &rest[close + end + 1..])
}

fn allowed_attribute(tag: &str, attr: &str, value: &str) -> bool {
    if GLOBAL_ATTRIBUTES.contains(&attr) {
        return true;
    }
    match (tag, attr) {
        ("a", "href") => is_safe_url(value),
        ("a", "target") => matches!(value, "_blank" | "_self"),
        ("a", "rel") => true,
        ("ol", "start") => value.parse::<u32>().is_ok(),
        _ => false,
    }
}

/// Whether a link target is relative or uses an allowed scheme.
///
/// Whitespace and control characters are ignored the way browsers ignore
/// them, and a character reference before the first path separator rejects
/// the link since it may hide a `:`.
fn is_safe_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let head = compact
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    match head.split_once(':') {
        Some((scheme, _)) => URL_SCHEMES.contains(&scheme),
        None => !head.contains('&'),
    }
}

/// Escape a value for a double-quoted attribute, keeping entity references.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_is_kept() {
        let html = "<p>Hello <strong>world</strong>, <em>again</em><br></p><ul><li>one</li></ul>";
        assert_eq!(sanitize_html(html), html);
        assert_eq!(sanitize_html("plain &amp; simple"), "plain &amp; simple");
    }

    #[test]
    fn test_event_handlers_are_dropped() {
        assert_eq!(
            sanitize_html("<p onclick=\"alert(1)\" class=\"lead\">x</p>"),
            "<p class=\"lead\">x</p>"
        );
        assert_eq!(
            sanitize_html("<SPAN OnMouseOver=alert(1) style='color:red'>x</SPAN>"),
            "<span>x</span>"
        );
        assert_eq!(sanitize_html("<img src=x onerror=alert(1)>"), "");
        assert_eq!(sanitize_html("<svg onload=alert(1)><p>a</p></svg>"), "<p>a</p>");
    }

    #[test]
    fn test_unsafe_links_lose_href() {
        for href in [
            "javascript:alert(1)",
            " JaVaScRiPt:alert(1)",
            "java\tscript:alert(1)",
            "javascript&#58;alert(1)",
            "&#x6a;avascript:alert(1)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "vbscript:msgbox(1)",
        ] {
            let html = format!("<a href=\"{href}\">x</a>");
            assert_eq!(sanitize_html(&html), "<a>x</a>", "{href}");
        }
    }

    #[test]
    fn test_safe_links_are_kept() {
        let html = "<a href=\"https://example.com/?a=1&amp;b=2\" target=\"_blank\">go</a>";
        assert_eq!(sanitize_html(html), html);
        assert_eq!(
            sanitize_html("<a href='/about#team'>t</a><a href=mailto:hi@example.com>m</a>"),
            "<a href=\"/about#team\">t</a><a href=\"mailto:hi@example.com\">m</a>"
        );
        assert_eq!(
            sanitize_html("<a href=\"x\" target=\"top\">x</a>"),
            "<a href=\"x\">x</a>"
        );
    }

    #[test]
    fn test_script_and_style_blocks_are_removed() {
        assert_eq!(
            sanitize_html("<p>a</p><SCRIPT>alert(1)</Script ><p>b</p>"),
            "<p>a</p><p>b</p>"
        );
        assert_eq!(sanitize_html("<p>ok</p><script>never closed"), "<p>ok</p>");
        assert_eq!(sanitize_html("<style>p{}</style>x"), "x");
        assert_eq!(sanitize_html("a<!-- <script>alert(1)</script> -->b"), "ab");
    }

    #[test]
    fn test_unknown_tags_keep_their_text() {
        assert_eq!(sanitize_html("<div><marquee>hi</marquee></div>"), "hi");
        assert_eq!(sanitize_html("1 < 2 and 3 > 2"), "1 &lt; 2 and 3 > 2");
    }

    #[test]
    fn test_tags_are_balanced() {
        assert_eq!(sanitize_html("<p><em>open"), "<p><em>open</em></p>");
        assert_eq!(sanitize_html("a</strong>b"), "ab");
        assert_eq!(sanitize_html("<p><b>x</p>y"), "<p><b>x</b></p>y");
        assert_eq!(sanitize_html("<p class=\"a"), "<p class=\"a\"></p>");
    }

    #[test]
    fn test_attribute_values_cannot_break_out() {
        assert_eq!(
            sanitize_html("<span title='a\" onclick=\"x'>t</span>"),
            "<span title=\"a&quot; onclick=&quot;x\">t</span>"
        );
    }
}
