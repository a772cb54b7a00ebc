//! N-Triples reader

use super::{Term, Triple};
use crate::{Error, Result, SourceInput};

type TermResult<T> = std::result::Result<T, String>;

/// Read every triple; the first malformed line fails the document
pub(super) fn parse(input: &SourceInput<'_>) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();
    for (index, line) in input.content.lines().enumerate() {
        let mut cursor = Cursor { rest: line };
        cursor.skip_ws();
        if cursor.rest.is_empty() || cursor.rest.starts_with('#') {
            continue;
        }
        let triple = cursor
            .triple()
            .map_err(|message| Error::syntax(input.source_id(), index + 1, message))?;
        triples.push(triple);
    }
    Ok(triples)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl Cursor<'_> {
    fn triple(&mut self) -> TermResult<Triple> {
        let subject = match self.term()? {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal { .. } => return Err("literal in subject position".to_string()),
        };
        let Term::Iri(predicate) = self.term()? else {
            return Err("predicate must be an IRI".to_string());
        };
        let object = self.term()?;

        self.skip_ws();
        if !self.eat('.') {
            return Err("expected '.' at end of triple".to_string());
        }
        self.skip_ws();
        if !self.rest.is_empty() && !self.rest.starts_with('#') {
            return Err(format!("unexpected trailing text '{}'", self.rest));
        }
        Ok(Triple {
            subject,
            predicate,
            object,
        })
    }

    fn term(&mut self) -> TermResult<Term> {
        self.skip_ws();
        if self.eat('<') {
            return self.iri().map(Term::Iri);
        }
        if let Some(rest) = self.rest.strip_prefix("_:") {
            let end = rest
                .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
                .unwrap_or(rest.len());
            let label = rest[..end].trim_end_matches('.');
            if label.is_empty() {
                return Err("empty blank node label".to_string());
            }
            self.rest = &rest[label.len()..];
            return Ok(Term::Blank(format!("_:{label}")));
        }
        if self.eat('"') {
            let value = self.literal_body()?;
            let lang = if self.eat('@') {
                let end = self
                    .rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                    .unwrap_or(self.rest.len());
                let (tag, rest) = self.rest.split_at(end);
                self.rest = rest;
                Some(tag.to_string())
            } else {
                if self.rest.starts_with("^^") {
                    self.rest = &self.rest[2..];
                    if !self.eat('<') {
                        return Err("expected datatype IRI after '^^'".to_string());
                    }
                    self.iri()?;
                }
                None
            };
            return Ok(Term::Literal { value, lang });
        }
        match self.rest.chars().next() {
            Some(c) => Err(format!("unexpected character '{c}'")),
            None => Err("unexpected end of line".to_string()),
        }
    }

    /// IRI body after `<`
    fn iri(&mut self) -> TermResult<String> {
        let Some(end) = self.rest.find('>') else {
            return Err("unterminated IRI".to_string());
        };
        let raw = &self.rest[..end];
        self.rest = &self.rest[end + 1..];
        if raw.contains('\\') {
            unescape(raw)
        } else {
            Ok(raw.to_string())
        }
    }

    /// Literal body after the opening quote, consuming the closing quote
    fn literal_body(&mut self) -> TermResult<String> {
        let mut escaped = false;
        for (i, c) in self.rest.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    let raw = &self.rest[..i];
                    self.rest = &self.rest[i + 1..];
                    return unescape(raw);
                }
                _ => escaped = false,
            }
        }
        Err("unterminated literal".to_string())
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }
}

fn unescape(raw: &str) -> TermResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(c @ ('"' | '\'' | '\\')) => out.push(c),
            Some('u') => out.push(code_point(&mut chars, 4)?),
            Some('U') => out.push(code_point(&mut chars, 8)?),
            Some(other) => return Err(format!("invalid escape '\\{other}'")),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}

fn code_point(chars: &mut std::str::Chars<'_>, digits: usize) -> TermResult<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .filter(|_| hex.len() == digits)
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid code point escape '{hex}'"))
}
