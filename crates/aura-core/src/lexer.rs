use crate::error::DefinitionError;
use crate::types::*;

// --- Cursor ---

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Cursor {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        if self
            .peek()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            while self.peek().is_some_and(is_name_char) {
                self.bump();
            }
        }
        self.slice(start, self.pos)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

fn malformed(source_name: &str, (line, col): (usize, usize), message: String) -> DefinitionError {
    DefinitionError::MalformedMarkup {
        source_name: source_name.to_string(),
        line,
        col,
        message,
    }
}

/// Decode the five predefined XML entities.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Tokenize markup into open tags, close tags, text and comments.
pub fn lex(content: &str, source_name: &str) -> Result<Vec<Token>, DefinitionError> {
    let mut cursor = Cursor::new(content);
    let mut tokens: Vec<Token> = Vec::new();

    while !cursor.at_end() {
        let start_pos = cursor.position();
        let start = cursor.pos;

        if cursor.starts_with("<!--") {
            let text = lex_delimited(&mut cursor, "<!--", "-->")
                .ok_or_else(|| malformed(source_name, start_pos, "unterminated comment".into()))?;
            tokens.push(Token {
                token_type: TokenType::Comment,
                raw: cursor.slice(start, cursor.pos),
                line: start_pos.0,
                col: start_pos.1,
                data: TokenData {
                    text: Some(text),
                    ..Default::default()
                },
            });
        } else if cursor.starts_with("<?") {
            // Processing instructions and XML declarations carry nothing we use
            lex_delimited(&mut cursor, "<?", "?>").ok_or_else(|| {
                malformed(
                    source_name,
                    start_pos,
                    "unterminated processing instruction".into(),
                )
            })?;
        } else if cursor.starts_with("</") {
            cursor.advance_by(2);
            let name = cursor.read_name();
            if name.is_empty() {
                return Err(malformed(
                    source_name,
                    cursor.position(),
                    "expected tag name after '</'".into(),
                ));
            }
            cursor.skip_whitespace();
            if cursor.peek() != Some('>') {
                return Err(malformed(
                    source_name,
                    cursor.position(),
                    format!("expected '>' to close </{name}>"),
                ));
            }
            cursor.bump();
            tokens.push(Token {
                token_type: TokenType::CloseTag,
                raw: cursor.slice(start, cursor.pos),
                line: start_pos.0,
                col: start_pos.1,
                data: TokenData {
                    name: Some(name),
                    ..Default::default()
                },
            });
        } else if cursor.peek() == Some('<') {
            cursor.bump();
            let name = cursor.read_name();
            if name.is_empty() {
                return Err(malformed(
                    source_name,
                    cursor.position(),
                    "expected tag name after '<'".into(),
                ));
            }
            let (attributes, self_closing) = lex_attributes(&mut cursor, &name, source_name)?;
            tokens.push(Token {
                token_type: TokenType::OpenTag,
                raw: cursor.slice(start, cursor.pos),
                line: start_pos.0,
                col: start_pos.1,
                data: TokenData {
                    name: Some(name),
                    attributes,
                    self_closing,
                    text: None,
                },
            });
        } else {
            while cursor.peek().is_some_and(|c| c != '<') {
                cursor.bump();
            }
            let raw = cursor.slice(start, cursor.pos);
            tokens.push(Token {
                token_type: TokenType::Text,
                line: start_pos.0,
                col: start_pos.1,
                data: TokenData {
                    text: Some(decode_entities(&raw)),
                    ..Default::default()
                },
                raw,
            });
        }
    }

    Ok(tokens)
}

/// Consume `open ... close` and return the text in between, or `None` if
/// input ends before `close`.
fn lex_delimited(cursor: &mut Cursor, open: &str, close: &str) -> Option<String> {
    cursor.advance_by(open.chars().count());
    let body_start = cursor.pos;
    while !cursor.starts_with(close) {
        cursor.bump()?;
    }
    let body = cursor.slice(body_start, cursor.pos);
    cursor.advance_by(close.chars().count());
    Some(body)
}

fn lex_attributes(
    cursor: &mut Cursor,
    tag: &str,
    source_name: &str,
) -> Result<(Vec<RawAttribute>, bool), DefinitionError> {
    let mut attributes: Vec<RawAttribute> = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => {
                return Err(malformed(
                    source_name,
                    cursor.position(),
                    format!("unterminated tag <{tag}>"),
                ))
            }
            Some('/') => {
                cursor.bump();
                if cursor.peek() != Some('>') {
                    return Err(malformed(
                        source_name,
                        cursor.position(),
                        format!("expected '>' after '/' in <{tag}>"),
                    ));
                }
                cursor.bump();
                return Ok((attributes, true));
            }
            Some('>') => {
                cursor.bump();
                return Ok((attributes, false));
            }
            Some(c) => {
                let pos = cursor.position();
                let name = cursor.read_name();
                if name.is_empty() {
                    return Err(malformed(
                        source_name,
                        pos,
                        format!("unexpected character '{c}' in <{tag}>"),
                    ));
                }
                cursor.skip_whitespace();
                if cursor.peek() != Some('=') {
                    return Err(malformed(
                        source_name,
                        pos,
                        format!("attribute '{name}' on <{tag}> is missing a value"),
                    ));
                }
                cursor.bump();
                cursor.skip_whitespace();
                let quote = match cursor.peek() {
                    Some(q @ ('"' | '\'')) => q,
                    _ => {
                        return Err(malformed(
                            source_name,
                            cursor.position(),
                            format!("value of attribute '{name}' must be quoted"),
                        ))
                    }
                };
                cursor.bump();
                let value_start = cursor.pos;
                while cursor.peek().is_some_and(|c| c != quote) {
                    cursor.bump();
                }
                if cursor.at_end() {
                    return Err(malformed(
                        source_name,
                        pos,
                        format!("unterminated value for attribute '{name}'"),
                    ));
                }
                let value = cursor.slice(value_start, cursor.pos);
                cursor.bump();

                if attributes
                    .iter()
                    .any(|a| a.name.eq_ignore_ascii_case(&name))
                {
                    return Err(malformed(
                        source_name,
                        pos,
                        format!("duplicate attribute '{name}' on <{tag}>"),
                    ));
                }
                attributes.push(RawAttribute {
                    name,
                    value: decode_entities(&value),
                    line: pos.0,
                    col: pos.1,
                });
            }
        }
    }
}
