pub mod lexer;
pub mod parser;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
