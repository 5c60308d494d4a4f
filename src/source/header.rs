//! Parser for the package clause and import declarations of a source file.
//!
//! The parser consumes tokens lazily and stops at the first token that cannot
//! continue the import section, so a file whose body is broken (or written in
//! syntax the lexer does not know) still yields its header.

use super::lexer::Token;
use logos::{Lexer, Logos};

/// Package name and imports declared at the top of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Header {
    pub(super) package: String,
    pub(super) imports: Vec<String>,
}

/// A malformed header, located by one-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct HeaderError {
    pub(super) line: usize,
    pub(super) message: String,
}

struct HeaderParser<'src> {
    lexer: Lexer<'src, Token>,
    source: &'src str,
}

impl<'src> HeaderParser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            lexer: Token::lexer(source),
            source,
        }
    }

    /// Next token that is not a `;` or a comment. Lexer errors surface as
    /// `Some(Err(()))`.
    fn next_significant(&mut self) -> Option<Result<Token, ()>> {
        loop {
            match self.lexer.next() {
                Some(Ok(Token::Semicolon | Token::LineComment | Token::BlockComment)) => {}
                other => return other,
            }
        }
    }

    fn line(&self) -> usize {
        let start = self.lexer.span().start;
        let newlines = self
            .source
            .as_bytes()
            .get(..start)
            .map_or(0, |before| before.iter().filter(|byte| **byte == b'\n').count());
        newlines + 1
    }

    fn error(&self, message: impl Into<String>) -> HeaderError {
        HeaderError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn error_at_eof(&self, message: &str) -> HeaderError {
        let newlines = self.source.bytes().filter(|byte| *byte == b'\n').count();
        HeaderError {
            line: newlines + 1,
            message: message.to_owned(),
        }
    }

    fn parse(mut self) -> Result<Header, HeaderError> {
        let package = self.package_clause()?;
        let mut imports = Vec::new();
        while let Some(Ok(Token::Import)) = self.next_significant() {
            self.import_decl(&mut imports)?;
        }
        Ok(Header { package, imports })
    }

    fn package_clause(&mut self) -> Result<String, HeaderError> {
        match self.next_significant() {
            Some(Ok(Token::Package)) => {}
            Some(_) => return Err(self.error("expected 'package' clause")),
            None => return Err(self.error_at_eof("expected 'package' clause, found end of file")),
        }
        match self.next_significant() {
            Some(Ok(Token::Ident)) if self.lexer.slice() == "_" => {
                Err(self.error("invalid package name _"))
            }
            Some(Ok(Token::Ident)) => Ok(self.lexer.slice().to_owned()),
            Some(_) => Err(self.error("expected package name")),
            None => Err(self.error_at_eof("expected package name, found end of file")),
        }
    }

    fn import_decl(&mut self, imports: &mut Vec<String>) -> Result<(), HeaderError> {
        match self.next_significant() {
            Some(Ok(Token::ParenOpen)) => loop {
                match self.next_significant() {
                    Some(Ok(Token::ParenClose)) => return Ok(()),
                    Some(Ok(token)) => imports.push(self.import_spec(token)?),
                    Some(Err(())) => return Err(self.error("unexpected character in import")),
                    None => return Err(self.error_at_eof("unterminated import group")),
                }
            },
            Some(Ok(token)) => {
                imports.push(self.import_spec(token)?);
                Ok(())
            }
            Some(Err(())) => Err(self.error("unexpected character in import")),
            None => Err(self.error_at_eof("expected import path, found end of file")),
        }
    }

    /// Parse `[name | . | _] "path"` where `first` has already been consumed.
    fn import_spec(&mut self, first: Token) -> Result<String, HeaderError> {
        let literal = match first {
            Token::Ident | Token::Dot => match self.next_significant() {
                Some(Ok(token @ (Token::InterpretedString | Token::RawString))) => token,
                Some(_) => return Err(self.error("expected import path after name")),
                None => return Err(self.error_at_eof("expected import path, found end of file")),
            },
            token @ (Token::InterpretedString | Token::RawString) => token,
            _ => return Err(self.error("expected import path")),
        };
        let text = self.lexer.slice();
        let path = match literal {
            Token::RawString => unquote_raw(text),
            _ => unquote_interpreted(text),
        }
        .map_err(|message| self.error(message))?;
        if path.is_empty() {
            return Err(self.error("empty import path"));
        }
        Ok(clean_import_path(&path))
    }
}

/// Parse the header of `source`.
pub(super) fn parse_header(source: &str) -> Result<Header, HeaderError> {
    HeaderParser::new(source).parse()
}

fn unquote_raw(literal: &str) -> Result<String, String> {
    literal
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .map(|body| body.chars().filter(|ch| *ch != '\r').collect())
        .ok_or_else(|| format!("malformed raw string {literal}"))
}

fn unquote_interpreted(literal: &str) -> Result<String, String> {
    let body = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| format!("malformed string {literal}"))?;
    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0_u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let escape = chars.next().ok_or("unterminated escape sequence")?;
        match escape {
            'a' => bytes.push(0x07),
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0c),
            'n' => bytes.push(b'\n'),
            'r' => bytes.push(b'\r'),
            't' => bytes.push(b'\t'),
            'v' => bytes.push(0x0b),
            '\\' | '\'' | '"' => bytes.push(u8::try_from(escape).map_err(|e| e.to_string())?),
            'x' => bytes.push(byte_from_digits(&mut chars, 2, 16)?),
            '0'..='7' => {
                let first = escape.to_digit(8).ok_or("invalid octal escape")?;
                let rest = digits(&mut chars, 2, 8)?;
                let value = first * 64 + rest;
                bytes.push(u8::try_from(value).map_err(|_| "octal escape out of range")?);
            }
            'u' | 'U' => {
                let width = if escape == 'u' { 4 } else { 8 };
                let value = digits(&mut chars, width, 16)?;
                let decoded = char::from_u32(value).ok_or("invalid Unicode code point")?;
                let mut buf = [0_u8; 4];
                bytes.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
            }
            other => return Err(format!("unknown escape sequence \\{other}")),
        }
    }
    String::from_utf8(bytes).map_err(|_| String::from("import path is not valid UTF-8"))
}

fn digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Result<u32, String> {
    let mut value = 0_u32;
    for _ in 0..count {
        let digit = chars
            .next()
            .and_then(|ch| ch.to_digit(radix))
            .ok_or_else(|| format!("escape needs {count} base-{radix} digits"))?;
        value = value * radix + digit;
    }
    Ok(value)
}

fn byte_from_digits(
    chars: &mut std::str::Chars<'_>,
    count: usize,
    radix: u32,
) -> Result<u8, String> {
    let value = digits(chars, count, radix)?;
    u8::try_from(value).map_err(|_| String::from("escape out of range"))
}

/// Clean an import path with slash-separated lexical rules: repeated slashes
/// collapse, `.` segments vanish, and `..` consumes the preceding segment.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_import_path("a//b/../c/."), "a/c");
/// assert_eq!(clean_import_path(""), ".");
/// ```
fn clean_import_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        String::from(".")
    } else {
        joined
    }
}
