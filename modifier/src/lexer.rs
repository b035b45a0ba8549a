// Lexer for abstraction-layer component definitions.
//
// Uses the `logos` crate for DFA-based lexing. Whitespace, newlines and `#`
// line comments are insignificant: statements are delimited by keywords.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Component-language token types.
///
/// Identifiers carry no value — use the span to retrieve the text from the
/// source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("component")]
    Component,
    #[token("param")]
    Param,
    #[token("analog")]
    Analog,
    #[token("event")]
    Event,
    #[token("send")]
    Send,
    #[token("recv")]
    Recv,
    #[token("reduce")]
    Reduce,
    #[token("subnode")]
    Subnode,
    #[token("state")]
    State,
    #[token("alias")]
    Alias,
    #[token("regime")]
    Regime,
    #[token("on")]
    On,
    #[token("emit")]
    Emit,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,

    // ── Symbols ──
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":=")]
    Assign,
    #[token(":")]
    Colon,
    #[token("'")]
    Prime,
    #[token("->")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Equals,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,

    // ── Literals ──
    //
    // Unsigned: a leading `-` is always the unary/binary minus operator.
    /// Numeric literal (int, float, exponent).
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),

    // ── Identifier ──
    //
    // logos prioritises fixed `#[token]` matches over regex for the same
    // length, so `state` matches State, not Ident.
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Component => write!(f, "component"),
            Token::Param => write!(f, "param"),
            Token::Analog => write!(f, "analog"),
            Token::Event => write!(f, "event"),
            Token::Send => write!(f, "send"),
            Token::Recv => write!(f, "recv"),
            Token::Reduce => write!(f, "reduce"),
            Token::Subnode => write!(f, "subnode"),
            Token::State => write!(f, "state"),
            Token::Alias => write!(f, "alias"),
            Token::Regime => write!(f, "regime"),
            Token::On => write!(f, "on"),
            Token::Emit => write!(f, "emit"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Elif => write!(f, "elif"),
            Token::Else => write!(f, "else"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Assign => write!(f, ":="),
            Token::Colon => write!(f, ":"),
            Token::Prime => write!(f, "'"),
            Token::Arrow => write!(f, "->"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Equals => write!(f, "="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Number(v) => write!(f, "{v}"),
            Token::Ident => write!(f, "<ident>"),
        }
    }
}

// ── Callbacks ──

/// Literals that overflow `f64` are rejected rather than read as infinity.
fn parse_number(lex: &mut logos::Lexer<'_, Token>) -> Option<f64> {
    lex.slice().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Public API ──

/// Lex a component source string into tokens.
///
/// Returns all successfully parsed tokens together with any errors for
/// unrecognised characters. Lexing is non-fatal: errors are collected and
/// the lexer continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(result.errors.is_empty(), "lex errors: {:?}", result.errors);
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("state statex regime"),
            vec![Token::State, Token::Ident, Token::Regime]
        );
    }

    #[test]
    fn assign_and_colon_are_distinct() {
        assert_eq!(
            kinds("a := b : c"),
            vec![
                Token::Ident,
                Token::Assign,
                Token::Ident,
                Token::Colon,
                Token::Ident
            ]
        );
    }

    #[test]
    fn minus_is_never_part_of_a_number() {
        assert_eq!(
            kinds("x-1"),
            vec![Token::Ident, Token::Minus, Token::Number(1.0)]
        );
    }

    #[test]
    fn arrow_and_comparison_operators() {
        assert_eq!(
            kinds("-> >= <= == != > <"),
            vec![
                Token::Arrow,
                Token::GtEq,
                Token::LtEq,
                Token::EqEq,
                Token::NotEq,
                Token::Gt,
                Token::Lt
            ]
        );
    }

    #[test]
    fn derivative_prime() {
        assert_eq!(
            kinds("V' = 1.5e-3"),
            vec![
                Token::Ident,
                Token::Prime,
                Token::Equals,
                Token::Number(1.5e-3)
            ]
        );
    }

    #[test]
    fn comments_and_newlines_are_skipped() {
        assert_eq!(
            kinds("# header\nparam tau # time constant\n\n"),
            vec![Token::Param, Token::Ident]
        );
    }

    #[test]
    fn unexpected_character_reported() {
        let result = lex("param $tau");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("$"));
        assert_eq!(result.tokens.len(), 2);
    }

    #[test]
    fn overflowing_number_is_a_lex_error() {
        let result = lex("1e999 + 2");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].span, Span { start: 0, end: 5 });
        assert_eq!(result.tokens.len(), 2);
        assert_eq!(kinds("1e308"), vec![Token::Number(1e308)]);
    }
}
