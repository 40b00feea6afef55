//! Splits a raw command line into words and the operators `|`, `<` and `>`.
//!
//! There is no quoting or escaping: an operator character always ends the
//! current word and becomes its own token, wherever it appears.

use std::fmt;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A command name, argument or file name.
    Word(String),
    /// The pipe operator, `|`.
    PipeOp,
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
}

impl Token {
    /// The token as it appeared on the command line.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(w) => w,
            Token::PipeOp => "|",
            Token::RedirectLeft => "<",
            Token::RedirectRight => ">",
        }
    }

    fn operator(ch: char) -> Option<Token> {
        match ch {
            '|' => Some(Token::PipeOp),
            '<' => Some(Token::RedirectLeft),
            '>' => Some(Token::RedirectRight),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Scanner {
    out: Vec<Token>,
    word: String,
}

impl Scanner {
    fn new() -> Self {
        Scanner {
            out: Vec::new(),
            word: String::new(),
        }
    }

    fn feed(&mut self, ch: char) {
        if ch == ' ' {
            self.flush_word();
        } else if let Some(op) = Token::operator(ch) {
            self.flush_word();
            self.out.push(op);
        } else {
            self.word.push(ch);
        }
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            self.out.push(Token::Word(std::mem::take(&mut self.word)));
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_word();
        self.out
    }
}

/// Tokenize `line` left to right.
///
/// Spaces separate words and are dropped; `|`, `<` and `>` separate words
/// and are kept as single-character operator tokens.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    let mut scanner = Scanner::new();
    for ch in line.chars() {
        scanner.feed(ch);
    }
    scanner.finish()
}
