//! Python-style structured literals.
//!
//! Actuation controllers speak a tiny literal language on the serial line:
//! commands go out as `{'left': 120, 'right': 120}` or `'F'`, and status
//! replies come back as `{'ok': True}`.  [`Literal`] models that value space
//! (`None`, booleans, integers, floats, strings, lists, tuples and ordered
//! dicts), [`Literal::parse`] decodes one reply line, and the [`Display`]
//! implementation renders the canonical wire form.
//!
//! Dict entries keep their source order so a decoded status reproduces the
//! controller's record exactly.
//!
//! # Example
//!
//! ```rust
//! use fieldbot_types::Literal;
//!
//! let status = Literal::parse("{'ok': True, 'pos': (1, -2)}\n").unwrap();
//! assert_eq!(status.get("ok"), Some(&Literal::Bool(true)));
//! assert_eq!(status.to_string(), "{'ok': True, 'pos': (1, -2)}");
//! ```

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Value model
// ─────────────────────────────────────────────────────────────────────────────

/// A single structured literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    /// Ordered key/value pairs.  Keys are unique; a repeated key in the source
    /// overwrites the earlier value in place.
    Dict(Vec<(Literal, Literal)>),
}

/// Error produced when text is not a valid literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at byte {offset}")]
pub struct LiteralError {
    /// Byte offset into the input where parsing stopped.
    pub offset: usize,
    pub message: String,
}

impl Literal {
    /// Parse exactly one literal from `text`.
    ///
    /// Leading and trailing whitespace (including the line terminator) is
    /// ignored; anything else after the literal is an error.
    ///
    /// # Errors
    ///
    /// Returns [`LiteralError`] when the text is empty, malformed, or has
    /// trailing content.
    pub fn parse(text: &str) -> Result<Self, LiteralError> {
        let mut parser = Parser::new(text);
        parser.skip_ws();
        let value = parser.value()?;
        parser.skip_ws();
        if parser.pos < parser.src.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(value)
    }

    /// Look up `key` in a dict literal.  Returns `None` for non-dicts.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Literal::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn is_hashable(&self) -> bool {
        match self {
            Literal::List(_) | Literal::Dict(_) => false,
            Literal::Tuple(items) => items.iter().all(Literal::is_hashable),
            _ => true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write_float(f, *x),
            Literal::Str(s) => write_str_repr(f, s),
            Literal::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Literal::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x:?}")
    }
}

/// Single quotes unless the text contains a single quote and no double quote.
fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

/// Deepest container nesting a status line may use.
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{' | b'[' | b'(') => {
                if self.depth >= MAX_DEPTH {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let parsed = self.container();
                self.depth -= 1;
                parsed
            }
            Some(b'\'' | b'"') => self.string(),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.name(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn container(&mut self) -> Result<Literal, LiteralError> {
        match self.peek() {
            Some(b'{') => self.dict(),
            Some(b'[') => {
                let (items, _) = self.sequence(b']')?;
                Ok(Literal::List(items))
            }
            Some(b'(') => {
                let (mut items, trailing_comma) = self.sequence(b')')?;
                // `(x)` is just a parenthesised `x`.
                if items.len() == 1 && !trailing_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            _ => Err(self.error("expected '{', '[' or '('")),
        }
    }

    /// Parse `open item, item, ... close`, returning whether the last item was
    /// followed by a comma.
    fn sequence(&mut self, close: u8) -> Result<(Vec<Literal>, bool), LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            trailing_comma = false;
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    trailing_comma = true;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok((items, trailing_comma));
                }
                None => return Err(self.error("unterminated sequence")),
                Some(_) => return Err(self.error("expected ',' or closing bracket")),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.pos += 1;
        let mut entries: Vec<(Literal, Literal)> = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Literal::Dict(entries));
            }
            let key_at = self.pos;
            let key = self.value()?;
            if !key.is_hashable() {
                return Err(LiteralError {
                    offset: key_at,
                    message: "unhashable dict key".into(),
                });
            }
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err(self.error("expected ':' after dict key"));
            }
            self.pos += 1;
            self.skip_ws();
            let value = self.value()?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Literal::Dict(entries));
                }
                None => return Err(self.error("unterminated dict")),
                Some(_) => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn string(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.string_part()?;
        // Adjacent literals concatenate: 'ab' 'cd' == 'abcd'.
        loop {
            let save = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some(b'\'' | b'"')) {
                out.push_str(&self.string_part()?);
            } else {
                self.pos = save;
                return Ok(Literal::Str(out));
            }
        }
    }

    fn string_part(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let quote = self.src[self.pos..].chars().next().unwrap_or('\'');
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.src[self.pos..].chars().next() else {
                return Err(LiteralError {
                    offset: start,
                    message: "unterminated string".into(),
                });
            };
            self.pos += c.len_utf8();
            match c {
                c if c == quote => return Ok(out),
                '\n' => return Err(self.error("newline inside string")),
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some(c) = self.src[self.pos..].chars().next() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += c.len_utf8();
        match c {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            'U' => out.push(self.hex_escape(8)?),
            // Unknown escapes keep the backslash.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated hex escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
        self.pos = end;
        Ok(c)
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'-' | b'+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        let invalid = || LiteralError {
            offset: start,
            message: format!("invalid number `{}`", &self.src[start..self.pos]),
        };
        if is_float {
            text.parse::<f64>().map(Literal::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(Literal::Int).map_err(|_| invalid())
        }
    }

    fn name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            other => Err(LiteralError {
                offset: start,
                message: format!("unknown name `{other}`"),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serde
// ─────────────────────────────────────────────────────────────────────────────

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Literal::None => serializer.serialize_unit(),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            Literal::Int(i) => serializer.serialize_i64(*i),
            Literal::Float(x) => serializer.serialize_f64(*x),
            Literal::Str(s) => serializer.serialize_str(s),
            Literal::List(items) | Literal::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Literal::Dict(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    match k {
                        Literal::Str(s) => map.serialize_entry(s, v)?,
                        other => map.serialize_entry(&other.to_string(), v)?,
                    }
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LiteralVisitor)
    }
}

struct LiteralVisitor;

impl<'de> Visitor<'de> for LiteralVisitor {
    type Value = Literal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a null, boolean, number, string, sequence or map")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Literal, E> {
        Ok(Literal::None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Literal, E> {
        Ok(Literal::None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Literal, D::Error> {
        Literal::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Literal, E> {
        Ok(Literal::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Literal, E> {
        Ok(Literal::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Literal, E> {
        i64::try_from(v)
            .map(Literal::Int)
            .map_err(|_| E::custom(format!("integer {v} out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Literal, E> {
        Ok(Literal::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Literal, E> {
        Ok(Literal::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Literal, E> {
        Ok(Literal::Str(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Literal, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Literal::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Literal, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<Literal, Literal>()? {
            entries.push((k, v));
        }
        Ok(Literal::Dict(entries))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Literal {
        Literal::Str(v.to_string())
    }

    #[test]
    fn parses_status_dict_with_newline() {
        let lit = Literal::parse("{'ok': True}\r\n").unwrap();
        assert_eq!(lit, Literal::Dict(vec![(s("ok"), Literal::Bool(true))]));
    }

    #[test]
    fn dict_preserves_key_order() {
        let lit = Literal::parse("{'z': 1, 'a': 2, 'm': 3}").unwrap();
        let Literal::Dict(entries) = lit else {
            panic!("expected dict");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str().unwrap()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let lit = Literal::parse("{'a': 1, 'b': 2, 'a': 3}").unwrap();
        assert_eq!(
            lit,
            Literal::Dict(vec![(s("a"), Literal::Int(3)), (s("b"), Literal::Int(2))])
        );
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(Literal::parse("None").unwrap(), Literal::None);
        assert_eq!(Literal::parse("False").unwrap(), Literal::Bool(false));
        assert_eq!(Literal::parse("-42").unwrap(), Literal::Int(-42));
        assert_eq!(Literal::parse("1_000").unwrap(), Literal::Int(1000));
        assert_eq!(Literal::parse("2.5e-1").unwrap(), Literal::Float(0.25));
        assert_eq!(Literal::parse(".5").unwrap(), Literal::Float(0.5));
        assert_eq!(Literal::parse("\"it's\"").unwrap(), s("it's"));
    }

    #[test]
    fn parses_nested_containers() {
        let lit = Literal::parse("{'pos': (1, 2), 'log': ['a', \"b\",], 'n': None}").unwrap();
        assert_eq!(
            lit.get("pos"),
            Some(&Literal::Tuple(vec![Literal::Int(1), Literal::Int(2)]))
        );
        assert_eq!(lit.get("log"), Some(&Literal::List(vec![s("a"), s("b")])));
        assert_eq!(lit.get("n"), Some(&Literal::None));
    }

    #[test]
    fn tuple_forms() {
        assert_eq!(Literal::parse("()").unwrap(), Literal::Tuple(vec![]));
        assert_eq!(Literal::parse("(7,)").unwrap(), Literal::Tuple(vec![Literal::Int(7)]));
        assert_eq!(Literal::parse("(7)").unwrap(), Literal::Int(7));
    }

    #[test]
    fn string_escapes_and_concatenation() {
        assert_eq!(Literal::parse(r"'a\nb\x41\\'").unwrap(), s("a\nbA\\"));
        assert_eq!(Literal::parse("'ab' 'cd'").unwrap(), s("abcd"));
        assert_eq!(Literal::parse(r"'\q'").unwrap(), s("\\q"));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "",
            "   \n",
            "{'ok': True",
            "{'ok' True}",
            "'unterminated",
            "true",
            "{'a': 1} extra",
            "{[1]: 2}",
            "1.2.3",
            "99999999999999999999",
            "[1 2]",
        ] {
            assert!(Literal::parse(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        for opener in ["[", "(", "{'k': "] {
            let err = Literal::parse(&opener.repeat(200_000)).unwrap_err();
            assert_eq!(err.message, "nesting too deep");
            assert_eq!(err.offset, opener.len() * MAX_DEPTH);
        }
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let text = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(Literal::parse(&text).is_ok());
        let text = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(Literal::parse(&text).is_err());
    }

    #[test]
    fn error_reports_offset() {
        let err = Literal::parse("{'ok': yes}").unwrap_err();
        assert_eq!(err.offset, 7);
        assert!(err.message.contains("yes"));
    }

    #[test]
    fn display_renders_wire_form() {
        let lit = Literal::Dict(vec![
            (s("left"), Literal::Int(120)),
            (s("right"), Literal::Float(1.0)),
            (s("lights"), Literal::Bool(false)),
            (s("tag"), Literal::Tuple(vec![s("x")])),
            (s("none"), Literal::None),
        ]);
        assert_eq!(
            lit.to_string(),
            "{'left': 120, 'right': 1.0, 'lights': False, 'tag': ('x',), 'none': None}"
        );
    }

    #[test]
    fn display_quotes_like_repr() {
        assert_eq!(s("F").to_string(), "'F'");
        assert_eq!(s("it's").to_string(), "\"it's\"");
        assert_eq!(s("both ' \"").to_string(), r#"'both \' "'"#);
        assert_eq!(s("tab\there").to_string(), r"'tab\there'");
    }

    #[test]
    fn display_output_parses_back() {
        let text = "{'a': [1, 2.5, 'x'], 'b': (True,), 'c': {'d': None}}";
        assert_eq!(Literal::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn deserializes_from_json_in_order() {
        let lit: Literal =
            serde_json::from_str(r#"{"speed": 3, "dir": "fwd", "ramp": [0.5, null]}"#).unwrap();
        assert_eq!(lit.to_string(), "{'speed': 3, 'dir': 'fwd', 'ramp': [0.5, None]}");
    }

    #[test]
    fn deserializes_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            cmd: Literal,
        }
        let w: Wrapper = toml::from_str("cmd = { left = 100, right = -100 }").unwrap();
        assert_eq!(w.cmd.get("left"), Some(&Literal::Int(100)));
        assert_eq!(w.cmd.get("right"), Some(&Literal::Int(-100)));
    }

    #[test]
    fn serializes_to_json() {
        let lit = Literal::parse("{'ok': True, 'pos': (1, 2), 3: 'x'}").unwrap();
        let json = serde_json::to_string(&lit).unwrap();
        assert_eq!(json, r#"{"ok":true,"pos":[1,2],"3":"x"}"#);
    }
}
