//! Lenient markup reader for navigation fragments and host page bodies.
//!
//! Understands elements, attributes, text, comments, doctype-style
//! declarations and raw-text elements. It does not implement the HTML5
//! insertion modes: unmatched end tags are ignored and open elements are
//! closed implicitly at end of input.

use thiserror::Error;

use super::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("unclosed comment starting at byte {0}")]
    UnclosedComment(usize),

    #[error("unclosed tag starting at byte {0}")]
    UnclosedTag(usize),

    #[error("empty tag name at byte {0}")]
    EmptyTagName(usize),

    #[error("invalid attribute name at byte {0}")]
    InvalidAttribute(usize),

    #[error("unclosed quoted attribute value starting at byte {0}")]
    UnclosedAttributeValue(usize),

    #[error("missing </{0}> for raw text element")]
    UnclosedRawText(String),
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

pub(super) fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Result<(), ParseError> {
    let bytes = html.as_bytes();
    let mut stack = vec![parent];
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'<' || !starts_markup(bytes, i) {
            let start = i;
            i += 1;
            while i < bytes.len() && !(bytes[i] == b'<' && starts_markup(bytes, i)) {
                i += 1;
            }
            if let Some(text) = html.get(start..i) {
                let top = current(&stack, parent);
                doc.create_text(top, decode_entities(text));
            }
            continue;
        }

        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->").ok_or(ParseError::UnclosedComment(i))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            let end = find_byte(bytes, i, b'>').ok_or(ParseError::UnclosedTag(i))?;
            i = end + 1;
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (name, next) = parse_end_tag(html, i)?;
            i = next;
            if let Some(pos) = stack
                .iter()
                .skip(1)
                .rposition(|node| doc.tag_name(*node) == Some(name.as_str()))
            {
                stack.truncate(pos + 1);
            }
            continue;
        }

        let (tag, next) = parse_start_tag(html, i)?;
        i = next;
        let top = current(&stack, parent);
        let node = doc.create_element(Some(top), &tag.name, tag.attrs);

        if is_raw_text(&tag.name) && !tag.self_closing {
            let close = find_end_tag(bytes, i, tag.name.as_bytes())
                .ok_or_else(|| ParseError::UnclosedRawText(tag.name.clone()))?;
            if let Some(body) = html.get(i..close) {
                if !body.is_empty() {
                    doc.create_text(node, body.to_string());
                }
            }
            let (_, after) = parse_end_tag(html, close)?;
            i = after;
            continue;
        }

        if !tag.self_closing && !is_void(&tag.name) {
            stack.push(node);
        }
    }

    Ok(())
}

fn current(stack: &[NodeId], fallback: NodeId) -> NodeId {
    stack.last().copied().unwrap_or(fallback)
}

/// A `<` only opens markup when followed by a name, `/`, `!` or `?`.
fn starts_markup(bytes: &[u8], at: usize) -> bool {
    matches!(bytes.get(at + 1), Some(&b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

fn parse_start_tag(html: &str, at: usize) -> Result<(StartTag, usize), ParseError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let name_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let name = html
        .get(name_start..i)
        .filter(|n| !n.is_empty())
        .ok_or(ParseError::EmptyTagName(at))?
        .to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        match bytes.get(i) {
            None => return Err(ParseError::UnclosedTag(at)),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            Some(b'/') => {
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let attr_name = html
            .get(attr_start..i)
            .filter(|n| !n.is_empty())
            .ok_or(ParseError::InvalidAttribute(attr_start))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
            attrs.push((attr_name, value));
        }
    }

    Ok((
        StartTag {
            name,
            attrs,
            self_closing,
        },
        i,
    ))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize), ParseError> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let name_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let name = html
        .get(name_start..i)
        .unwrap_or_default()
        .to_ascii_lowercase();

    let end = find_byte(bytes, i, b'>').ok_or(ParseError::UnclosedTag(at))?;
    Ok((name, end + 1))
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String, ParseError> {
    let bytes = html.as_bytes();
    let start = *i;

    if let Some(&quote) = bytes.get(start).filter(|b| matches!(**b, b'"' | b'\'')) {
        let end =
            find_byte(bytes, start + 1, quote).ok_or(ParseError::UnclosedAttributeValue(start))?;
        *i = end + 1;
        return Ok(decode_entities(html.get(start + 1..end).unwrap_or_default()));
    }

    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>'))
    {
        *i += 1;
    }
    Ok(decode_entities(html.get(start..*i).unwrap_or_default()))
}

/// Decodes the character references navigation markup actually uses:
/// the five XML entities, `&nbsp;` and numeric references.
pub(super) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|semi| {
            decode_reference(&tail[1..semi]).map(|ch| (ch, semi))
        }) {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

pub(super) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(super) fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|b| *b == needle).map(|pos| pos + from)
}

fn find_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut at = from;
    while let Some(pos) = find_subslice(bytes, at, b"</") {
        let name = bytes.get(pos + 2..pos + 2 + tag.len())?;
        if name.eq_ignore_ascii_case(tag) {
            return Some(pos);
        }
        at = pos + 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let container = doc.parse_fragment(html).unwrap();
        (doc, container)
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let (doc, container) = parse(
            r#"<header class="site"><nav><a data-href="/about" class=nav-link>About</a></nav></header>"#,
        );
        let header = doc.first_element_child(container).unwrap();
        let link = doc
            .descendants(header)
            .into_iter()
            .find(|n| doc.tag_name(*n) == Some("a"))
            .unwrap();

        assert_eq!(doc.tag_name(header), Some("header"));
        assert_eq!(doc.attr(header, "class"), Some("site"));
        assert_eq!(doc.attr(link, "data-href"), Some("/about"));
        assert_eq!(doc.attr(link, "class"), Some("nav-link"));
        assert_eq!(doc.text_content(link), "About");
    }

    #[test]
    fn test_void_and_self_closing_elements() {
        let (doc, container) = parse("<div><img src=\"a.png\"><br/><span>x</span></div>");
        let div = doc.first_element_child(container).unwrap();
        let tags: Vec<_> = doc
            .children(div)
            .iter()
            .filter_map(|c| doc.tag_name(*c))
            .collect();

        assert_eq!(tags, ["img", "br", "span"]);
    }

    #[test]
    fn test_boolean_attribute_is_empty_string() {
        let (doc, container) = parse("<button disabled>x</button>");
        let button = doc.first_element_child(container).unwrap();
        assert_eq!(doc.attr(button, "disabled"), Some(""));
    }

    #[test]
    fn test_comments_and_leading_whitespace_skipped() {
        let (doc, container) = parse("\n  <!-- shared nav -->\n<header id=\"h\"></header>");
        let header = doc.first_element_child(container).unwrap();
        assert_eq!(doc.attr(header, "id"), Some("h"));
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let (doc, container) = parse("<script>if (a < b) { x(); }</script><p>t</p>");
        let script = doc.first_element_child(container).unwrap();
        assert_eq!(doc.text_content(script), "if (a < b) { x(); }");
        assert_eq!(doc.children(container).len(), 2);
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let (doc, container) = parse("<ul><li>a</span></li><li>b</li></ul>");
        let ul = doc.first_element_child(container).unwrap();
        assert_eq!(doc.children(ul).len(), 2);
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(decode_entities("Q&amp;A &lt;3 &#x41;&#66;"), "Q&A <3 AB");
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_unclosed_markup_is_an_error() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.parse_fragment("<div class=\"x"),
            Err(ParseError::UnclosedAttributeValue(_))
        ));
        assert!(matches!(
            doc.parse_fragment("<!-- never ends"),
            Err(ParseError::UnclosedComment(0))
        ));
        assert!(matches!(
            doc.parse_fragment("<div"),
            Err(ParseError::UnclosedTag(0))
        ));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let (doc, container) = parse("<p>1 < 2</p>");
        let p = doc.first_element_child(container).unwrap();
        assert_eq!(doc.text_content(p), "1 < 2");
    }
}
