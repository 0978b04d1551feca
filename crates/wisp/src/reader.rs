//! Lexical reader (§4.Reader, §6 "Reader").
//!
//! Tokenizes and parses source text into a stream of raw forms, each
//! carrying `{line, col}` metadata (§3 invariant 6). This module has no
//! knowledge of special forms, namespaces beyond resolving `::kw`, or
//! evaluation — it only turns text into data, exactly the external contract
//! the distilled spec describes.

use std::rc::Rc;

use crate::{
    exception::{CodeLoc, Exception, RunError, RunResult},
    meta::Meta,
    value::{Keyword, PList, Symbol, Value},
};

/// A form read from source, paired with its source position.
#[derive(Clone)]
pub struct Form {
    pub value: Value,
    pub meta: Meta,
}

impl Form {
    pub fn loc(&self) -> CodeLoc {
        CodeLoc { line: self.meta.line().unwrap_or(0), col: self.meta.col().unwrap_or(0) }
    }
}

pub struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    /// Namespace against which `::kw` auto-resolves.
    current_ns: Rc<str>,
}

fn is_delim(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'[' | b']' | b'{' | b'}' | b'"' | b';' | b',' | b'\'' | b'`' | b'~' | b'^' | b'@')
        || c.is_ascii_whitespace()
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str, current_ns: impl Into<Rc<str>>) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1, col: 1, current_ns: current_ns.into() }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn err(&self, msg: impl Into<String>) -> RunError {
        Exception::new("ReaderError", msg.into()).with_loc(CodeLoc { line: self.line, col: self.col }).into()
    }

    fn skip_atmosphere(&mut self) -> RunResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() || c == b',' => {
                    self.bump();
                }
                Some(b';') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'#') if self.peek_at(1) == Some(b'_') => {
                    self.bump();
                    self.bump();
                    self.skip_atmosphere()?;
                    self.next_form()?; // discard
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Reads the next top-level form, or `None` at end of input (§6
    /// Reader: "repeatedly yields the next parsed form or an end-of-input
    /// sentinel").
    pub fn next_form(&mut self) -> RunResult<Option<Form>> {
        self.skip_atmosphere()?;
        let Some(c) = self.peek() else { return Ok(None) };
        let line = self.line;
        let col = self.col;
        let value = self.read_value(c)?;
        Ok(Some(Form { value, meta: Meta::with_pos(line, col) }))
    }

    fn read_required(&mut self) -> RunResult<Value> {
        self.skip_atmosphere()?;
        let Some(c) = self.peek() else { return Err(self.err("Unexpected EOF while reading")) };
        self.read_value(c)
    }

    fn read_value(&mut self, c: u8) -> RunResult<Value> {
        match c {
            b'(' => self.read_seq(b')').map(Value::List),
            b'[' => self.read_vector(),
            b'{' => self.read_map(),
            b'#' if self.peek_at(1) == Some(b'{') => {
                self.bump();
                self.read_set()
            }
            b'"' => self.read_string(),
            b'\\' => self.read_char(),
            b':' => self.read_keyword(),
            b'\'' => {
                self.bump();
                Ok(wrap("quote", self.read_required()?))
            }
            b'`' => {
                self.bump();
                Ok(wrap("quasiquote", self.read_required()?))
            }
            b'~' if self.peek_at(1) == Some(b'@') => {
                self.bump();
                self.bump();
                Ok(wrap("unquote-splicing", self.read_required()?))
            }
            b'~' => {
                self.bump();
                Ok(wrap("unquote", self.read_required()?))
            }
            b'^' => {
                self.bump();
                let meta_form = self.read_required()?;
                let target = self.read_required()?;
                Ok(self.attach_reader_meta(meta_form, target))
            }
            b')' | b']' | b'}' => Err(self.err(format!("Unmatched delimiter: {}", c as char))),
            _ => self.read_atom(),
        }
    }

    /// `^{...}`/`^:kw`/`^Tag` reader macro. A map form merges its
    /// keyword-keyed entries directly; a keyword sets itself to `true`
    /// (`^:foo` is shorthand for `^{:foo true}`); anything else (a bare
    /// symbol, most commonly) becomes the `:tag` entry (`^String` is
    /// shorthand for `^{:tag String}`).
    ///
    /// Only observable on a symbol target in this core, since `Symbol` is
    /// the one value kind that carries its own `Meta` sidecar; attaching to
    /// any other form is accepted by the reader but has no further effect.
    fn attach_reader_meta(&self, meta_form: Value, target: Value) -> Value {
        let meta = meta_from_reader_form(meta_form);
        match target {
            Value::Symbol(sym) => Value::Symbol(sym.with_meta(meta)),
            other => other,
        }
    }

    fn read_seq(&mut self, close: u8) -> RunResult<Vec<Value>> {
        self.bump(); // opening delimiter
        let mut items = Vec::new();
        loop {
            self.skip_atmosphere()?;
            match self.peek() {
                None => return Err(self.err(format!("Unexpected EOF, expected '{}'", close as char))),
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(c) => items.push(self.read_value(c)?),
            }
        }
    }

    fn read_vector(&mut self) -> RunResult<Value> {
        Ok(Value::Vector(Rc::new(self.read_seq(b']')?)))
    }

    fn read_set(&mut self) -> RunResult<Value> {
        let items = self.read_seq(b'}')?;
        let mut set = indexmap::IndexSet::new();
        for item in items {
            set.insert(item);
        }
        Ok(Value::Set(Rc::new(set)))
    }

    fn read_map(&mut self) -> RunResult<Value> {
        let items = self.read_seq(b'}')?;
        if items.len() % 2 != 0 {
            return Err(self.err("Map literal must have an even number of forms"));
        }
        let mut map = indexmap::IndexMap::new();
        let mut it = items.into_iter();
        while let (Some(k), Some(v)) = (it.next(), it.next()) {
            map.insert(k, v);
        }
        Ok(Value::Map(Rc::new(map)))
    }

    fn read_string(&mut self) -> RunResult<Value> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("Unexpected EOF while reading string")),
                Some(b'"') => break,
                Some(b'\\') => {
                    let esc = self.bump().ok_or_else(|| self.err("Unexpected EOF in escape"))?;
                    s.push(match esc {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'\\' => '\\',
                        b'"' => '"',
                        b'0' => '\0',
                        other => other as char,
                    });
                }
                Some(c) => {
                    // Re-assemble UTF-8 continuation bytes verbatim.
                    if c < 0x80 {
                        s.push(c as char);
                    } else {
                        s.push(self.read_utf8_rest(c));
                    }
                }
            }
        }
        Ok(Value::Str(Rc::from(s)))
    }

    fn read_utf8_rest(&mut self, first: u8) -> char {
        let extra = if first >= 0xF0 {
            3
        } else if first >= 0xE0 {
            2
        } else {
            1
        };
        let mut buf = vec![first];
        for _ in 0..extra {
            if let Some(b) = self.bump() {
                buf.push(b);
            }
        }
        std::str::from_utf8(&buf).ok().and_then(|s| s.chars().next()).unwrap_or('\u{FFFD}')
    }

    fn read_char(&mut self) -> RunResult<Value> {
        self.bump(); // backslash
        let mut name = String::new();
        // A character literal is always at least one char.
        if let Some(c) = self.bump() {
            name.push(c as char);
        }
        while let Some(c) = self.peek() {
            if is_delim(c) {
                break;
            }
            name.push(c as char);
            self.bump();
        }
        let ch = match name.as_str() {
            "newline" => '\n',
            "space" => ' ',
            "tab" => '\t',
            "return" => '\r',
            "backspace" => '\u{8}',
            "formfeed" => '\u{C}',
            "null" => '\0',
            s if s.chars().count() == 1 => s.chars().next().unwrap(),
            s => return Err(self.err(format!("Unsupported character literal: \\{s}"))),
        };
        Ok(Value::Char(ch))
    }

    fn read_keyword(&mut self) -> RunResult<Value> {
        self.bump(); // ':'
        let auto_resolve = self.peek() == Some(b':');
        if auto_resolve {
            self.bump();
        }
        let text = self.read_symbolic_text();
        let kw = if auto_resolve {
            Keyword::qualified(Rc::clone(&self.current_ns), text)
        } else if let Some((ns, name)) = text.split_once('/') {
            if ns.is_empty() || name.is_empty() { Keyword::unqualified(text) } else { Keyword::qualified(ns, name) }
        } else {
            Keyword::unqualified(text)
        };
        Ok(Value::Keyword(kw))
    }

    fn read_symbolic_text(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if is_delim(c) {
                break;
            }
            s.push(c as char);
            self.bump();
        }
        s
    }

    fn read_atom(&mut self) -> RunResult<Value> {
        let text = self.read_symbolic_text();
        if text.is_empty() {
            return Err(self.err("Unexpected character while reading"));
        }
        Ok(parse_atom(&text))
    }
}

fn wrap(head: &str, arg: Value) -> Value {
    Value::List(PList::from_vec(vec![Value::Symbol(Symbol::unqualified(head)), arg]))
}

fn meta_from_reader_form(meta_form: Value) -> Meta {
    match meta_form {
        Value::Keyword(kw) => Meta::none().with(kw, Value::Bool(true)),
        Value::Map(map) => {
            let mut meta = Meta::none();
            for (k, v) in map.iter() {
                if let Value::Keyword(kw) = k {
                    meta = meta.with(kw.clone(), v.clone());
                }
            }
            meta
        }
        other => Meta::none().with(Keyword::unqualified("tag"), other),
    }
}

fn parse_atom(text: &str) -> Value {
    match text {
        "nil" => return Value::Nil,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    if looks_like_float(text)
        && let Ok(f) = text.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::Symbol(Symbol::parse(text))
}

fn looks_like_float(text: &str) -> bool {
    let bytes = text.as_bytes();
    let has_digit = bytes.iter().any(u8::is_ascii_digit);
    has_digit && bytes.iter().all(|b| matches!(b, b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E'))
}

/// Reads every top-level form in `source` (§4.Reader `read_all`).
pub fn read_all(source: &str, current_ns: impl Into<Rc<str>>) -> RunResult<Vec<Form>> {
    let mut reader = Reader::new(source, current_ns);
    let mut forms = Vec::new();
    while let Some(form) = reader.next_form()? {
        forms.push(form);
    }
    Ok(forms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(src: &str) -> Value {
        Reader::new(src, "user").next_form().unwrap().unwrap().value
    }

    #[test]
    fn reads_scalars() {
        assert_eq!(read_one("42"), Value::Int(42));
        assert_eq!(read_one("-7"), Value::Int(-7));
        assert_eq!(read_one("3.5"), Value::Float(3.5));
        assert_eq!(read_one("nil"), Value::Nil);
        assert_eq!(read_one("true"), Value::Bool(true));
        assert_eq!(read_one("\"hi\""), Value::Str(Rc::from("hi")));
    }

    #[test]
    fn reads_symbols_and_keywords() {
        assert_eq!(read_one("foo/bar"), Value::Symbol(Symbol::qualified("foo", "bar")));
        assert_eq!(read_one(":kw"), Value::Keyword(Keyword::unqualified("kw")));
        assert_eq!(read_one(":ns/kw"), Value::Keyword(Keyword::qualified("ns", "kw")));
        assert_eq!(read_one("::kw"), Value::Keyword(Keyword::qualified("user", "kw")));
    }

    #[test]
    fn reads_collections() {
        let Value::List(l) = read_one("(1 2 3)") else { panic!("expected list") };
        assert_eq!(l.len(), 3);
        let Value::Vector(v) = read_one("[1 2]") else { panic!("expected vector") };
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn quote_reader_macro_expands() {
        let Value::List(l) = read_one("'x") else { panic!("expected list") };
        assert_eq!(l.len(), 2);
        assert_eq!(l.first().unwrap(), &Value::Symbol(Symbol::unqualified("quote")));
    }

    #[test]
    fn comments_and_datum_comments_are_skipped() {
        let forms = read_all("; comment\n1 #_2 3", "user").unwrap();
        let values: Vec<_> = forms.into_iter().map(|f| f.value).collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(3)]);
    }
}
