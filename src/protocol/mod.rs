//! Line Protocol Implementation
//!
//! The wire protocol is deliberately plain: a request is one chunk of
//! text holding whitespace-separated tokens, and the server writes back
//! one textual reply per request with no framing of its own.
//!
//! ## Modules
//!
//! - `parser`: tokenizer and syntactic validation for incoming requests
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{parse, ParseError};
//!
//! let tokens = parse("GET name").unwrap();
//! assert_eq!(tokens, vec!["GET", "name"]);
//!
//! assert_eq!(parse("get name"), Err(ParseError::InvalidCommandSyntax));
//! ```

pub mod parser;

// Re-export commonly used items for convenience
pub use parser::{parse, ParseError, ParseResult, ALLOWED_PUNCTUATION};
