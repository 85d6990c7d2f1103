//! Tokens of the instruction operand syntax.

use logos::{Lexer, Logos};

/// Tokens of an operand such as `(LL),Y` or `#NN`.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    /// Anything that is not part of the operand syntax.
    #[error]
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Error,

    /// `#`, immediate operand.
    #[token("#")]
    Immediate,

    /// `*`, zero page operand.
    #[token("*")]
    ZeroPage,

    /// `+`, relative operand.
    #[token("+")]
    Relative,

    #[token("(")]
    IndirectBegin,

    #[token(")")]
    IndirectEnd,

    /// `,` before an index register.
    #[token(",")]
    IndexSeparator,

    /// A hex number, a label or a register name.
    #[regex("[A-Za-z0-9_]+", Lexer::slice)]
    Word(&'a str),
}

/// Splits an operand into tokens. Returns `None` if it contains characters outside the syntax.
pub fn tokenize(operand: &str) -> Option<Vec<Token>> {
    let tokens: Vec<Token> = Token::lexer(operand).collect();

    if tokens.contains(&Token::Error) {
        return None;
    }

    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_tokens() {
        assert_eq!(
            tokenize("(ptr),Y"),
            Some(vec![
                Token::IndirectBegin,
                Token::Word("ptr"),
                Token::IndirectEnd,
                Token::IndexSeparator,
                Token::Word("Y"),
            ])
        );

        assert_eq!(tokenize("#05"), Some(vec![Token::Immediate, Token::Word("05")]));
        assert_eq!(tokenize(""), Some(vec![]));
        assert_eq!(tokenize("$05"), None);
    }
}
