//! Expression Lexer
//!
//! Splits an expression string into tokens. Every token remembers its byte
//! range so the parser can report offsets and recover source text for
//! dotted keys.

use crate::error::ExprError;

/// Punctuation and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semi,
    Dot,
    Question,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Longest spellings first so `===` wins over `==` and `=`.
const PUNCTUATION: &[(&str, Punct)] = &[
    ("===", Punct::EqEqEq),
    ("!==", Punct::NotEqEq),
    ("=>", Punct::Arrow),
    ("==", Punct::EqEq),
    ("!=", Punct::NotEq),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("&&", Punct::AndAnd),
    ("||", Punct::OrOr),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    (",", Punct::Comma),
    (":", Punct::Colon),
    (";", Punct::Semi),
    (".", Punct::Dot),
    ("?", Punct::Question),
    ("=", Punct::Assign),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("!", Punct::Bang),
    ("<", Punct::Lt),
    (">", Punct::Gt),
];

impl Punct {
    pub fn as_str(self) -> &'static str {
        PUNCTUATION
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(s, _)| *s)
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(Punct),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Str(s) => format!("string {s:?}"),
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::Punct(p) => format!("'{}'", p.as_str()),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Tokenize an expression.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() {
            let mut end = start;
            let mut seen_dot = false;
            let mut seen_exp = false;
            while let Some(&(i, c)) = chars.peek() {
                let rest = &source[i..];
                let accept = c.is_ascii_digit()
                    || (c == '.' && !seen_dot && !seen_exp
                        && rest[1..].starts_with(|d: char| d.is_ascii_digit()))
                    || ((c == 'e' || c == 'E') && !seen_exp);
                if !accept {
                    break;
                }
                seen_dot |= c == '.';
                seen_exp |= c == 'e' || c == 'E';
                chars.next();
                end = i + c.len_utf8();
                if seen_exp && (c == 'e' || c == 'E') {
                    if let Some(&(j, sign)) = chars.peek() {
                        if sign == '+' || sign == '-' {
                            chars.next();
                            end = j + 1;
                        }
                    }
                }
            }
            let text = &source[start..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedChar { ch, offset: start })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                start,
                end,
            });
            continue;
        }

        if is_ident_start(ch) {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !is_ident_continue(c) {
                    break;
                }
                chars.next();
                end = i + c.len_utf8();
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..end].to_string()),
                start,
                end,
            });
            continue;
        }

        if ch == '"' || ch == '\'' || ch == '`' {
            chars.next();
            let mut value = String::new();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    c if c == ch => {
                        end = Some(i + 1);
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, other)) => value.push(other),
                        None => break,
                    },
                    other => value.push(other),
                }
            }
            let end = end.ok_or(ExprError::UnterminatedString { offset: start })?;
            tokens.push(Token {
                kind: TokenKind::Str(value),
                start,
                end,
            });
            continue;
        }

        let rest = &source[start..];
        let Some(&(text, punct)) = PUNCTUATION.iter().find(|(text, _)| rest.starts_with(text)) else {
            return Err(ExprError::UnexpectedChar { ch, offset: start });
        };
        for _ in 0..text.len() {
            chars.next();
        }
        tokens.push(Token {
            kind: TokenKind::Punct(punct),
            start,
            end: start + text.len(),
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_operators_longest_first() {
        assert_eq!(
            kinds("a === b => c++"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::EqEqEq),
                TokenKind::Ident("b".into()),
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Ident("c".into()),
                TokenKind::Punct(Punct::PlusPlus),
            ]
        );
    }

    #[test]
    fn lexes_numbers_and_strings() {
        assert_eq!(
            kinds(r#"1.5 2e3 'it\'s' "x""#),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Number(2000.0),
                TokenKind::Str("it's".into()),
                TokenKind::Str("x".into()),
            ]
        );
    }

    #[test]
    fn dotted_number_after_identifier_stays_separate() {
        assert_eq!(
            kinds("debounce.300"),
            vec![
                TokenKind::Ident("debounce".into()),
                TokenKind::Punct(Punct::Dot),
                TokenKind::Number(300.0),
            ]
        );
    }

    #[test]
    fn helper_names_are_identifiers() {
        assert_eq!(kinds("$get"), vec![TokenKind::Ident("$get".into())]);
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(
            tokenize("a # b"),
            Err(ExprError::UnexpectedChar { ch: '#', offset: 2 })
        );
        assert_eq!(
            tokenize("'open"),
            Err(ExprError::UnterminatedString { offset: 0 })
        );
    }
}
