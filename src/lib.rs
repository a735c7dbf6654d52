pub mod analyzer;
pub mod api;
pub mod ast;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod value;

pub use api::{compile, CompileResult, OutputFormat};
pub use error::{render_report, BraceError};
pub use value::Value;
