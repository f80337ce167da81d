//! Shell command parser
//!
//! Splits a command line into a program name and its arguments. Words are
//! separated by whitespace; single and double quotes group words, and a
//! backslash escapes the next character inside double quotes.

use std::iter::Peekable;
use std::str::Chars;

/// A single command (program + arguments)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    /// Program name
    pub program: String,
    /// Arguments (not including program name)
    pub args: Vec<String>,
}

/// Parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unterminated quoted string
    UnterminatedQuote(char),
    /// Empty command
    EmptyCommand,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedQuote(c) => write!(f, "unterminated {} quote", c),
            Self::EmptyCommand => write!(f, "empty command"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Tokenizer for shell input
struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn next_word(&mut self) -> Result<Option<String>, ParseError> {
        self.skip_whitespace();
        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => break,
                // Quotes can appear mid-word: foo"bar"baz
                '"' | '\'' => {
                    self.chars.next();
                    word.push_str(&self.read_quoted_content(c)?);
                }
                _ => {
                    word.push(c);
                    self.chars.next();
                }
            }
        }

        Ok(Some(word))
    }

    fn read_quoted_content(&mut self, quote: char) -> Result<String, ParseError> {
        let mut content = String::new();

        loop {
            match self.chars.next() {
                Some(c) if c == quote => break,
                Some('\\') if quote == '"' => {
                    // Escape sequences only in double quotes
                    match self.chars.next() {
                        Some(escaped) => content.push(escaped),
                        None => return Err(ParseError::UnterminatedQuote(quote)),
                    }
                }
                Some(c) => content.push(c),
                None => return Err(ParseError::UnterminatedQuote(quote)),
            }
        }

        Ok(content)
    }
}

/// Parse a command line into a command
pub fn parse(input: &str) -> Result<SimpleCommand, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut words = Vec::new();

    while let Some(word) = lexer.next_word()? {
        words.push(word);
    }

    if words.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    let program = words.remove(0);
    Ok(SimpleCommand {
        program,
        args: words,
    })
}
