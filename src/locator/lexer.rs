//! Tokenizer for locator expressions.
//!
//! `*` and the names `and`, `or`, `div` and `mod` are operators only when
//! they follow a token that can end an operand; elsewhere they are a name
//! test and plain names.

use super::LocatorError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    Pipe,
    ColonColon,
    /// `*` as a name test.
    Star,
    /// `*` as multiplication.
    Multiply,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    /// A name, possibly prefixed (`svg:rect`), or a prefixed wildcard (`svg:*`).
    Name(String),
    /// `$name`
    Variable(String),
}

impl Token {
    /// Tokens after which `*` multiplies and names are operators.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Self::RParen
                | Self::RBracket
                | Self::Dot
                | Self::DotDot
                | Self::Star
                | Self::Literal(_)
                | Self::Number(_)
                | Self::Name(_)
                | Self::Variable(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    /// Byte offset of the token in the source expression.
    pub offset: usize,
}

type Chars<'s> = std::iter::Peekable<std::str::CharIndices<'s>>;

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, LocatorError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let operator_position = tokens.last().is_some_and(|last| last.token.ends_operand());
        let token = match c {
            c if c.is_whitespace() => continue,
            '/' if next == Some('/') => {
                chars.next();
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '@' => Token::At,
            ',' => Token::Comma,
            '|' => Token::Pipe,
            '*' if operator_position => Token::Multiply,
            '*' => Token::Star,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '=' => Token::Eq,
            ':' if next == Some(':') => {
                chars.next();
                Token::ColonColon
            }
            '!' if next == Some('=') => {
                chars.next();
                Token::Ne
            }
            '<' if next == Some('=') => {
                chars.next();
                Token::Le
            }
            '<' => Token::Lt,
            '>' if next == Some('=') => {
                chars.next();
                Token::Ge
            }
            '>' => Token::Gt,
            '.' if next == Some('.') => {
                chars.next();
                Token::DotDot
            }
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let end = scan_while(&mut chars, source.len(), |n| n.is_ascii_digit());
                Token::Number(parse_number(&source[offset..end], offset)?)
            }
            '.' => Token::Dot,
            '"' | '\'' => {
                let start = offset + c.len_utf8();
                let end = chars
                    .by_ref()
                    .find(|&(_, n)| n == c)
                    .map(|(i, _)| i)
                    .ok_or_else(|| LocatorError::new(offset, "unterminated string literal"))?;
                Token::Literal(source[start..end].to_string())
            }
            c if c.is_ascii_digit() => {
                let end = scan_while(&mut chars, source.len(), |n| {
                    n.is_ascii_digit() || n == '.'
                });
                Token::Number(parse_number(&source[offset..end], offset)?)
            }
            '$' => {
                let start = offset + 1;
                if !chars.peek().is_some_and(|&(_, n)| is_name_start(n)) {
                    return Err(LocatorError::new(offset, "expected a variable name"));
                }
                let end = scan_qname(&mut chars, source, false);
                Token::Variable(source[start..end].to_string())
            }
            c if is_name_start(c) => {
                let end = scan_qname(&mut chars, source, true);
                let name = &source[offset..end];
                match name {
                    "and" if operator_position => Token::And,
                    "or" if operator_position => Token::Or,
                    "div" if operator_position => Token::Div,
                    "mod" if operator_position => Token::Mod,
                    _ if operator_position => {
                        return Err(LocatorError::new(
                            offset,
                            format!("expected an operator, found '{name}'"),
                        ))
                    }
                    _ => Token::Name(name.to_string()),
                }
            }
            other => {
                return Err(LocatorError::new(
                    offset,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

/// Consumes characters while `keep` holds; returns the end byte offset.
fn scan_while(chars: &mut Chars<'_>, source_len: usize, keep: impl Fn(char) -> bool) -> usize {
    while let Some(&(i, n)) = chars.peek() {
        if !keep(n) {
            return i;
        }
        chars.next();
    }
    source_len
}

/// Consumes the rest of a name and an optional `:local` (or `:*`) part.
fn scan_qname(chars: &mut Chars<'_>, source: &str, allow_wildcard: bool) -> usize {
    let end = scan_while(chars, source.len(), is_name_char);
    let rest = &source[end..];
    let mut after_colon = rest.chars().skip(1);
    let local = match (rest.chars().next(), after_colon.next()) {
        (Some(':'), Some(n)) if is_name_start(n) => true,
        (Some(':'), Some('*')) if allow_wildcard => false,
        _ => return end,
    };

    chars.next();
    if local {
        scan_while(chars, source.len(), is_name_char)
    } else {
        chars.next();
        end + 2
    }
}

fn parse_number(text: &str, offset: usize) -> Result<f64, LocatorError> {
    text.parse::<f64>()
        .map_err(|_| LocatorError::new(offset, format!("invalid number '{text}'")))
}
