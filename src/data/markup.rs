//! Minimal markup parser untuk format serialisasi value dan queue
//!
//! Recursive descent: tag dengan nama yang sama di dalam dirinya sendiri
//! ditangani dengan benar karena setiap elemen dicocokkan dengan closing tag-nya.
//! Mendukung self-closing tag, atribut dengan quote `"` atau `'`,
//! komentar `<!-- -->`, dan deklarasi `<?...?>`.

use std::borrow::Cow;
use std::ops::Range;

use crate::error::{DataError, DataResult};

/// Batas nesting elemen; input dari network tidak boleh menghabiskan stack
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Character data langsung di bawah elemen ini (sudah di-unescape)
    pub text: String,
    pub children: Vec<Element>,
    /// Posisi body mentah di input (antara opening dan closing tag)
    pub body: Range<usize>,
}

impl Element {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Escape character data / nilai atribut
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Entity yang tidak dikenal dibiarkan apa adanya
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let entity = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .into_iter()
        .find(|(e, _)| rest.starts_with(e));
        match entity {
            Some((e, c)) => {
                out.push(c);
                rest = &rest[e.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse semua elemen top-level
pub fn parse_all(input: &str) -> DataResult<Vec<Element>> {
    let mut parser = Parser::new(input, 0);
    let mut out = Vec::new();
    loop {
        parser.skip_misc()?;
        if parser.at_end() {
            return Ok(out);
        }
        if !parser.peek_is(b'<') {
            return Err(parser.error("text outside of any element"));
        }
        out.push(parser.element()?);
    }
}

/// Parse satu elemen mulai dari `offset`; return elemen dan offset setelahnya
pub fn parse_at(input: &str, offset: usize) -> DataResult<(Element, usize)> {
    if !input.is_char_boundary(offset.min(input.len())) {
        return Err(DataError::Parse {
            offset,
            reason: "offset is not on a character boundary".to_string(),
        });
    }
    let mut parser = Parser::new(input, offset);
    parser.skip_misc()?;
    if !parser.peek_is(b'<') {
        return Err(parser.error("expected an element"));
    }
    let element = parser.element()?;
    Ok((element, parser.pos))
}

/// Parse tepat satu elemen pertama (sisa input diabaikan)
pub fn parse_first(input: &str) -> DataResult<Element> {
    parse_at(input, 0).map(|(element, _)| element)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: pos.min(src.len()),
            depth: 0,
        }
    }

    fn error(&self, reason: &str) -> DataError {
        DataError::Parse {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline(always)]
    fn peek_is(&self, b: u8) -> bool {
        self.bytes.get(self.pos) == Some(&b)
    }

    #[inline(always)]
    fn starts_with(&self, pat: &str) -> bool {
        self.src[self.pos..].starts_with(pat)
    }

    fn skip_ws(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn skip_past(&mut self, terminator: &str) -> DataResult<()> {
        match self.src[self.pos..].find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(self.error("unterminated markup construct")),
        }
    }

    /// Whitespace, komentar, dan deklarasi
    fn skip_misc(&mut self) -> DataResult<()> {
        loop {
            self.skip_ws();
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.starts_with("<?") {
                self.skip_past("?>")?;
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, b: u8) -> DataResult<()> {
        if self.peek_is(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", b as char)))
        }
    }

    fn name(&mut self) -> DataResult<&'a str> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'=' | b'<') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn attribute_value(&mut self) -> DataResult<String> {
        let quote = match self.bytes.get(self.pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == quote {
                let raw = &self.src[start..self.pos];
                self.pos += 1;
                return Ok(unescape(raw).into_owned());
            }
            self.pos += 1;
        }
        Err(self.error("unterminated attribute value"))
    }

    fn element(&mut self) -> DataResult<Element> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("elements nested too deeply"));
        }
        self.expect(b'<')?;
        let name = self.name()?.to_string();
        let mut attributes = Vec::new();

        // Opening tag
        loop {
            self.skip_ws();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(Element {
                    name,
                    attributes,
                    text: String::new(),
                    children: Vec::new(),
                    body: self.pos..self.pos,
                });
            }
            if self.peek_is(b'>') {
                self.pos += 1;
                break;
            }
            if self.at_end() {
                return Err(self.error("unterminated opening tag"));
            }
            let key = self.name()?.to_string();
            self.skip_ws();
            self.expect(b'=')?;
            self.skip_ws();
            let value = self.attribute_value()?;
            attributes.push((key, value));
        }

        // Content
        let body_start = self.pos;
        let mut text = String::new();
        let mut children = Vec::new();
        loop {
            if self.at_end() {
                return Err(self.error(&format!("missing closing tag for <{}>", name)));
            }
            if self.starts_with("</") {
                let body_end = self.pos;
                self.pos += 2;
                let closing = self.name()?;
                if closing != name {
                    return Err(self.error(&format!(
                        "closing tag </{}> does not match <{}>",
                        closing, name
                    )));
                }
                self.skip_ws();
                self.expect(b'>')?;
                return Ok(Element {
                    name,
                    attributes,
                    text,
                    children,
                    body: body_start..body_end,
                });
            }
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
                continue;
            }
            if self.peek_is(b'<') {
                self.depth += 1;
                let child = self.element();
                self.depth -= 1;
                children.push(child?);
                continue;
            }
            let start = self.pos;
            while self.bytes.get(self.pos).is_some_and(|&b| b != b'<') {
                self.pos += 1;
            }
            text.push_str(&unescape(&self.src[start..self.pos]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        let raw = "a < b && \"c\" > 'd'";
        let escaped = escape(raw);
        assert!(!escaped.contains('<'));
        assert_eq!(unescape(&escaped), raw);
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
        assert_eq!(unescape("&unknown; &amp;"), "&unknown; &");
    }

    #[test]
    fn test_nested_same_name() {
        let input = r#"<a type="container"><a type="int">5</a></a><b>x</b>"#;
        let (outer, end) = parse_at(input, 0).unwrap();
        assert_eq!(outer.name, "a");
        assert_eq!(outer.children.len(), 1);
        assert_eq!(outer.children[0].name, "a");
        assert_eq!(outer.children[0].text, "5");
        assert_eq!(&input[outer.body.clone()], r#"<a type="int">5</a>"#);
        assert_eq!(&input[end..], "<b>x</b>");
    }

    #[test]
    fn test_attributes_and_self_closing() {
        let all = parse_all("<?xml version=\"1.0\"?>\n<x sep='@' k=\"a&amp;b\"/> <!-- c --> <y></y>")
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attribute("sep"), Some("@"));
        assert_eq!(all[0].attribute("k"), Some("a&b"));
        assert!(all[0].text.is_empty());
        assert_eq!(all[1].name, "y");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_first("<a>1</b>"),
            Err(DataError::Parse { .. })
        ));
        assert!(parse_first("<a>unterminated").is_err());
        assert!(parse_all("stray <a/>").is_err());
        assert!(parse_first("").is_err());
    }

    #[test]
    fn test_offset_inside_character() {
        let input = "<é>1</é>";
        assert!(matches!(
            parse_at(input, 2),
            Err(DataError::Parse { offset: 2, .. })
        ));
        assert!(parse_at(input, input.len()).is_err());
        assert_eq!(parse_at(input, 0).unwrap().0.text, "1");
    }

    #[test]
    fn test_nesting_depth_limit() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        let mut element = parse_first(&nested(MAX_DEPTH)).unwrap();
        let mut levels = 1;
        while let Some(child) = element.children.pop() {
            element = child;
            levels += 1;
        }
        assert_eq!(levels, MAX_DEPTH);

        assert!(matches!(
            parse_first(&nested(MAX_DEPTH + 1)),
            Err(DataError::Parse { .. })
        ));
        assert!(parse_all(&nested(100_000)).is_err());
    }
}
