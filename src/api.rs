use crate::analyzer::Analyzer;
use crate::emitter::Emitter;
use crate::error::{BraceError, SyntaxErrors};
use crate::parser::Parser;
use crate::value::Value;
use log::debug;
use serde::{Serialize, Serializer};

/// Output renderings supported by [`CompileResult::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// The result of a successful BRACE compilation: the fully resolved value
/// tree, ready to hand to any serde serializer.
#[derive(Debug)]
pub struct CompileResult {
    pub value: Value,
}

impl Serialize for CompileResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl CompileResult {
    /// Renders the compiled document as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Renders the compiled document as YAML.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    /// Renders the compiled document in the requested format.
    ///
    /// # Errors
    /// Returns a [`BraceError`] if serialization fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, BraceError> {
        match format {
            OutputFormat::Json => Ok(self.to_json()?),
            OutputFormat::Yaml => Ok(self.to_yaml()?),
        }
    }
}

/// Compiles a BRACE document from source text.
///
/// Runs the whole pipeline: lexing and parsing, semantic analysis, and
/// emission. Syntax errors abort before analysis and semantic errors abort
/// before emission; within each phase every error found is reported.
///
/// # Arguments
///
/// * `source` - The BRACE source code as a string.
/// * `file_name` - The name of the file being compiled (used for error reporting).
///
/// # Errors
///
/// Returns a [`BraceError`] if any phase fails.
pub fn compile(source: &str, file_name: &str) -> Result<CompileResult, BraceError> {
    let mut parser = Parser::new_with_name(source, file_name);
    let mut program = parser.parse_program();
    let errors = parser.into_errors();
    if !errors.is_empty() {
        return Err(SyntaxErrors { errors }.into());
    }
    debug!("parsed {} statement(s)", program.statements.len());

    let mut analyzer = Analyzer::new(source, file_name);
    analyzer.analyze(&mut program)?;
    debug!("semantic analysis passed");

    let value = Emitter::emit(&program)?;
    Ok(CompileResult { value })
}
