//! dynamem Expression Language
//!
//! This crate provides the lexer, parser, and evaluators for the two
//! expression dialects understood by the store: condition/filter/
//! key-condition expressions (producing a boolean) and update expressions
//! (`SET`/`ADD`/`REMOVE`/`DELETE` action programs mutating an item).
//!
//! Architecture:
//! ```text
//! Expression text
//!     ↓
//! Lexer (tokenize)
//!     ↓
//! Parser (build AST, accumulate errors)
//!     ↓
//! Evaluator (condition → bool, update → item mutation)
//! ```

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod placeholder;
pub mod reserved;

// Re-export key types for convenience
pub use eval::*;
pub use lexer::*;
pub use parser::*;
pub use placeholder::validate_placeholders;
pub use reserved::is_reserved_word;
