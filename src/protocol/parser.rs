//! Line Protocol Tokenizer and Validator
//!
//! This module implements the syntactic half of request processing.
//! A request is a single chunk of text containing whitespace-separated
//! tokens: a command name followed by its arguments.
//!
//! ## How Validation Works
//!
//! The tokenizer returns either:
//! - `Ok(tokens)` - the request splits into one or more valid tokens
//! - `Err(ParseError)` - the request is empty or contains illegal characters
//!
//! Validation here is purely syntactic:
//! 1. The first token must be all uppercase ASCII letters. There is no
//!    case-folding of user input - `get` is rejected, only `GET` is a
//!    candidate command name.
//! 2. Every token (the command name included) is restricted to the
//!    argument alphabet `[A-Za-z0-9*/_.]`.
//!
//! Whether the command name is actually a known command, and whether the
//! argument count is right for it, is the dispatcher's job - see
//! [`crate::commands`].

use thiserror::Error;

/// Punctuation characters allowed in argument tokens, alongside ASCII
/// letters and digits.
pub const ALLOWED_PUNCTUATION: [char; 4] = ['*', '/', '_', '.'];

/// Errors that can occur while tokenizing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request contained no tokens at all.
    #[error("empty command")]
    EmptyCommand,

    /// The first token is not all uppercase ASCII letters.
    #[error("invalid syntax of command")]
    InvalidCommandSyntax,

    /// A token contains a character outside the argument alphabet.
    #[error("invalid syntax of argument")]
    InvalidArgumentSyntax,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Returns `true` if the character is legal in a command name.
#[inline]
fn is_command_char(c: char) -> bool {
    c.is_ascii_uppercase()
}

/// Returns `true` if the character is legal in an argument token.
#[inline]
fn is_argument_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c)
}

/// Splits a raw request into validated tokens.
///
/// Tokens are separated by runs of whitespace; surrounding whitespace is
/// ignored. The returned slices borrow from `raw`.
///
/// # Errors
///
/// - [`ParseError::EmptyCommand`] if the request holds no tokens
/// - [`ParseError::InvalidCommandSyntax`] if the command name is not all
///   uppercase ASCII letters
/// - [`ParseError::InvalidArgumentSyntax`] if any token steps outside
///   the argument alphabet
///
/// # Example
///
/// ```
/// use linekv::protocol::parse;
///
/// let tokens = parse("SET weather_2.0 sunny").unwrap();
/// assert_eq!(tokens, vec!["SET", "weather_2.0", "sunny"]);
/// ```
pub fn parse(raw: &str) -> ParseResult<Vec<&str>> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let Some(command) = tokens.first() else {
        return Err(ParseError::EmptyCommand);
    };

    if !command.chars().all(is_command_char) {
        return Err(ParseError::InvalidCommandSyntax);
    }

    for token in &tokens {
        if !token.chars().all(is_argument_char) {
            return Err(ParseError::InvalidArgumentSyntax);
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        assert_eq!(parse("GET name").unwrap(), vec!["GET", "name"]);
    }

    #[test]
    fn test_parse_trims_and_splits_on_runs_of_whitespace() {
        assert_eq!(
            parse("  SET \t key \t\t value \n").unwrap(),
            vec!["SET", "key", "value"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Err(ParseError::EmptyCommand));
        assert_eq!(parse("   \t \n "), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_lowercase_command_rejected() {
        assert_eq!(parse("get name"), Err(ParseError::InvalidCommandSyntax));
        assert_eq!(parse("Get name"), Err(ParseError::InvalidCommandSyntax));
    }

    #[test]
    fn test_digits_in_command_rejected() {
        assert_eq!(parse("GET2 name"), Err(ParseError::InvalidCommandSyntax));
    }

    #[test]
    fn test_argument_alphabet() {
        // Letters, digits and the four punctuation marks are all legal.
        assert!(parse("SET a_b.c */path Value123").is_ok());
    }

    #[test]
    fn test_illegal_argument_character() {
        assert_eq!(
            parse("SET key va!lue"),
            Err(ParseError::InvalidArgumentSyntax)
        );
        assert_eq!(
            parse("GET key-name"),
            Err(ParseError::InvalidArgumentSyntax)
        );
        assert_eq!(
            parse("DEL \"key\""),
            Err(ParseError::InvalidArgumentSyntax)
        );
    }

    #[test]
    fn test_unknown_command_name_is_syntactically_fine() {
        // The tokenizer does not know the command set; PUT passes here
        // and is rejected later by the dispatcher.
        assert_eq!(parse("PUT key value").unwrap(), vec!["PUT", "key", "value"]);
    }

    #[test]
    fn test_no_argument_count_checking() {
        assert_eq!(parse("SET").unwrap(), vec!["SET"]);
        assert_eq!(
            parse("GET a b c d").unwrap(),
            vec!["GET", "a", "b", "c", "d"]
        );
    }
}
