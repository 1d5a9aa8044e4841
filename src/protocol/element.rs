//! Markup element codec for the engine's command protocol
//!
//! Every datagram carries exactly one element:
//!
//! ```text
//! <IdentifyReq/>
//! <StartRecordingReq SessionName="sceneA" Description="desc"/>
//! <CaptureName><Name VALUE="sceneA"/><Take VALUE="3"/></CaptureName>
//! ```
//!
//! Decoding is defensive: the input is attacker-controlled network data and
//! any malformed byte sequence must come back as [`Error::MalformedMessage`],
//! never a panic.

use crate::error::{Error, Result};

/// Nesting deeper than this is rejected on decode. The protocol uses at most
/// one level of children.
const MAX_DEPTH: usize = 8;

/// A single markup element: tag name, attributes, child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute (builder style)
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a child element (builder style)
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute value by key
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up the first child with the given tag name
    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Encode this element as wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = String::new();
        self.encode_into(&mut out)?;
        Ok(out.into_bytes())
    }

    fn encode_into(&self, out: &mut String) -> Result<()> {
        validate_name(&self.name)?;
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            validate_name(key)?;
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value)?;
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for child in &self.children {
                child.encode_into(out)?;
            }
            out.push_str("</");
            out.push_str(&self.name);
            out.push('>');
        }
        Ok(())
    }

    /// Decode a single element from wire bytes.
    ///
    /// Fails when the bytes are anything but one well-formed element:
    /// truncated datagrams, garbage, trailing content after the root.
    pub fn decode(bytes: &[u8]) -> Result<Element> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::MalformedMessage("invalid UTF-8".to_string()))?;

        let mut parser = Parser { text, pos: 0 };
        parser.skip_whitespace();
        parser.skip_declaration()?;
        parser.skip_whitespace();

        let element = parser.parse_element(0)?;

        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(Error::MalformedMessage(
                "trailing content after root element".to_string(),
            ));
        }
        Ok(element)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid_first || !valid_rest {
        return Err(Error::Encoding(format!("invalid tag or attribute name {:?}", name)));
    }
    Ok(())
}

fn push_escaped(out: &mut String, value: &str) -> Result<()> {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 => {
                return Err(Error::Encoding(format!(
                    "control character {:#04x} in attribute value",
                    c as u32
                )));
            }
            c => out.push(c),
        }
    }
    Ok(())
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        if self.peek() == Some(ch) {
            self.bump();
            Ok(())
        } else {
            Err(Error::MalformedMessage(format!(
                "expected {:?} at byte {}",
                ch, self.pos
            )))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Skip an optional leading `<?...?>` declaration
    fn skip_declaration(&mut self) -> Result<()> {
        if self.rest().starts_with("<?") {
            match self.rest().find("?>") {
                Some(end) => self.pos += end + 2,
                None => {
                    return Err(Error::MalformedMessage(
                        "unterminated declaration".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            self.bump();
        }
        let name = &self.text[start..self.pos];
        if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            return Err(Error::MalformedMessage(format!(
                "invalid name at byte {}",
                start
            )));
        }
        Ok(name.to_string())
    }

    fn parse_element(&mut self, depth: usize) -> Result<Element> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedMessage("element nesting too deep".to_string()));
        }

        self.expect('<')?;
        let name = self.parse_name()?;
        let mut element = Element::new(&name);

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.bump();
                    self.expect('>')?;
                    return Ok(element);
                }
                Some('>') => {
                    self.bump();
                    self.parse_children(&mut element, depth)?;
                    return Ok(element);
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let key = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    let value = self.parse_quoted_value()?;
                    element.attributes.push((key, value));
                }
                Some(c) => {
                    return Err(Error::MalformedMessage(format!(
                        "unexpected {:?} in element {}",
                        c, name
                    )));
                }
                None => {
                    return Err(Error::MalformedMessage(format!(
                        "truncated element {}",
                        name
                    )));
                }
            }
        }
    }

    fn parse_children(&mut self, element: &mut Element, depth: usize) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("</") {
                self.pos += 2;
                let close = self.parse_name()?;
                if close != element.name {
                    return Err(Error::MalformedMessage(format!(
                        "mismatched closing tag {} for {}",
                        close, element.name
                    )));
                }
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(());
            }
            match self.peek() {
                Some('<') => {
                    let child = self.parse_element(depth + 1)?;
                    element.children.push(child);
                }
                Some(_) => {
                    // The protocol carries no text content
                    return Err(Error::MalformedMessage(format!(
                        "unexpected text content in {}",
                        element.name
                    )));
                }
                None => {
                    return Err(Error::MalformedMessage(format!(
                        "unclosed element {}",
                        element.name
                    )));
                }
            }
        }
    }

    fn parse_quoted_value(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                return Err(Error::MalformedMessage(format!(
                    "expected quoted value at byte {}",
                    self.pos
                )));
            }
        };
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('&') => value.push(self.parse_entity()?),
                Some('<') => {
                    return Err(Error::MalformedMessage(
                        "unescaped '<' in attribute value".to_string(),
                    ));
                }
                Some(c) => value.push(c),
                None => {
                    return Err(Error::MalformedMessage(
                        "unterminated attribute value".to_string(),
                    ));
                }
            }
        }
    }

    fn parse_entity(&mut self) -> Result<char> {
        let rest = self.rest();
        let end = rest
            .find(';')
            .ok_or_else(|| Error::MalformedMessage("unterminated entity".to_string()))?;
        let entity = &rest[..end];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                return Err(Error::MalformedMessage(format!(
                    "unknown entity &{};",
                    entity
                )));
            }
        };
        self.pos += end + 1;
        Ok(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_element() {
        let bytes = Element::new("IdentifyReq").encode().unwrap();
        assert_eq!(bytes, b"<IdentifyReq/>");
    }

    #[test]
    fn test_encode_with_attributes() {
        let bytes = Element::new("StartRecordingReq")
            .attr("SessionName", "sceneA")
            .attr("Description", "desc")
            .encode()
            .unwrap();
        assert_eq!(
            bytes,
            b"<StartRecordingReq SessionName=\"sceneA\" Description=\"desc\"/>"
        );
    }

    #[test]
    fn test_encode_with_children() {
        let bytes = Element::new("CaptureName")
            .child(Element::new("Name").attr("VALUE", "sceneA"))
            .child(Element::new("Take").attr("VALUE", "3"))
            .encode()
            .unwrap();
        assert_eq!(
            bytes,
            b"<CaptureName><Name VALUE=\"sceneA\"/><Take VALUE=\"3\"/></CaptureName>"
        );
    }

    #[test]
    fn test_round_trip_flat() {
        let original = Element::new("StartRecordingReq")
            .attr("SessionName", "scene \"B\" & friends")
            .attr("Description", "<take>");
        let decoded = Element::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_round_trip_children() {
        let original = Element::new("CaptureName")
            .child(Element::new("Name").attr("VALUE", "sceneA"))
            .child(Element::new("Take").attr("VALUE", "3"));
        let decoded = Element::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(
            decoded.find_child("Take").and_then(|c| c.get_attr("VALUE")),
            Some("3")
        );
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_declaration() {
        let decoded =
            Element::decode(b"<?xml version=\"1.0\"?>\n  <IdentifyAck>\n  </IdentifyAck>\n").unwrap();
        assert_eq!(decoded.name, "IdentifyAck");
        assert!(decoded.children.is_empty());
    }

    #[test]
    fn test_decode_single_quoted_attributes() {
        let decoded = Element::decode(b"<CaptureNameAck Status='ok'/>").unwrap();
        assert_eq!(decoded.get_attr("Status"), Some("ok"));
    }

    #[test]
    fn test_encode_rejects_control_characters() {
        let result = Element::new("StartRecordingReq")
            .attr("Description", "line1\x07line2")
            .encode();
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[test]
    fn test_encode_rejects_invalid_names() {
        assert!(matches!(
            Element::new("1BadTag").encode(),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            Element::new("Tag").attr("bad key", "v").encode(),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_multiple_roots() {
        let result = Element::decode(b"<IdentifyAck/><IdentifyAck/>");
        assert!(matches!(result, Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn test_decode_rejects_mismatched_close() {
        let result = Element::decode(b"<CaptureName><Name/></Take>");
        assert!(matches!(result, Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        let mut payload = String::new();
        for _ in 0..64 {
            payload.push_str("<a>");
        }
        for _ in 0..64 {
            payload.push_str("</a>");
        }
        let result = Element::decode(payload.as_bytes());
        assert!(matches!(result, Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn test_decode_garbage_never_panics() {
        let corpus: &[&[u8]] = &[
            b"",
            b" ",
            b"garbage",
            b"<",
            b"<>",
            b"</",
            b"<Identify",
            b"<IdentifyAck",
            b"<IdentifyAck/",
            b"<IdentifyAck a=/>",
            b"<IdentifyAck a=\"unterminated/>",
            b"<IdentifyAck a=\"&bogus;\"/>",
            b"<IdentifyAck a=\"&amp\"/>",
            b"<A>text</A>",
            b"<A><B></A></B>",
            b"<?xml",
            b"\xff\xfe\x00\x01",
            b"<A \xc3/>",
        ];
        for bytes in corpus {
            match Element::decode(bytes) {
                Err(Error::MalformedMessage(_)) => {}
                other => panic!("expected MalformedMessage for {:?}, got {:?}", bytes, other),
            }
        }
    }

    #[test]
    fn test_decode_truncations_never_panic() {
        let full = Element::new("CaptureName")
            .child(Element::new("Name").attr("VALUE", "sceneA"))
            .child(Element::new("Take").attr("VALUE", "3"))
            .encode()
            .unwrap();
        for len in 0..full.len() {
            assert!(
                matches!(
                    Element::decode(&full[..len]),
                    Err(Error::MalformedMessage(_))
                ),
                "truncation at {} should be malformed",
                len
            );
        }
    }
}
