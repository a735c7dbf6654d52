use miette::{Diagnostic, GraphicalReportHandler, NamedSource, Report, SourceSpan};
use thiserror::Error;

/// Top-level error for a BRACE compilation.
///
/// Syntax errors abort semantic analysis; semantic errors abort emission.
/// Within each phase, errors accumulate so a single run reports everything
/// it can find.
#[derive(Error, Debug, Diagnostic)]
pub enum BraceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxErrors),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Semantic(#[from] SemanticErrors),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Emission(#[from] EmissionError),

    #[error("failed to render JSON output")]
    #[diagnostic(code(brace::render::json))]
    JsonRender(#[from] serde_json::Error),

    #[error("failed to render YAML output")]
    #[diagnostic(code(brace::render::yaml))]
    YamlRender(#[from] serde_yaml::Error),
}

/// Every syntax error collected while scanning and parsing one document.
#[derive(Error, Debug, Diagnostic)]
#[error("found {} syntax error(s)", errors.len())]
pub struct SyntaxErrors {
    #[related]
    pub errors: Vec<SyntaxError>,
}

/// Every semantic error collected across both analyzer passes.
#[derive(Error, Debug, Diagnostic)]
#[error("found {} semantic error(s)", errors.len())]
pub struct SemanticErrors {
    #[related]
    pub errors: Vec<SemanticError>,
}

/// Lexer/parser-level errors. Each carries the 1-based line and column of
/// the offending token alongside its byte span.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SyntaxError {
    #[error("illegal token: {description}")]
    #[diagnostic(code(brace::syntax::illegal_character))]
    IllegalCharacter {
        description: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid BRACE token")]
        span: SourceSpan,
    },

    #[error("expected next token to be {expected}, got {found} instead")]
    #[diagnostic(code(brace::syntax::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("expected {expected} here")]
        span: SourceSpan,
    },

    #[error("unexpected token: {found}")]
    #[diagnostic(
        code(brace::syntax::unexpected_statement),
        help("a statement starts with '@' (directive), '#' (table), or an identifier (assignment)")
    )]
    UnexpectedStatement {
        found: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("cannot start a statement")]
        span: SourceSpan,
    },

    #[error("BRACE file must start with @brace directive")]
    #[diagnostic(
        code(brace::syntax::missing_version_directive),
        help("begin the document with @brace \"<version>\", e.g. @brace \"1.0.0\"")
    )]
    MissingVersionDirective {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("expected @brace directive here")]
        span: SourceSpan,
    },

    #[error("@brace directive requires exactly one version parameter")]
    #[diagnostic(code(brace::syntax::version_parameter))]
    VersionParameter {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("version string expected after @brace")]
        span: SourceSpan,
    },

    #[error("@brace version must be a string literal")]
    #[diagnostic(code(brace::syntax::version_not_string))]
    VersionNotString {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this is not a string literal")]
        span: SourceSpan,
    },

    #[error("unsupported BRACE version: {version} (supported versions: {supported})")]
    #[diagnostic(code(brace::syntax::unsupported_version))]
    UnsupportedVersion {
        version: String,
        supported: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this version is not supported")]
        span: SourceSpan,
    },

    #[error("unknown directive: {name}")]
    #[diagnostic(code(brace::syntax::unknown_directive))]
    UnknownDirective {
        name: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a recognized directive")]
        span: SourceSpan,
    },

    #[error("@env directive cannot be used as a statement, only as an expression")]
    #[diagnostic(code(brace::syntax::env_as_statement))]
    EnvAsStatement {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("@env is only legal in value position")]
        span: SourceSpan,
    },

    #[error("could not parse {literal:?} as a number")]
    #[diagnostic(code(brace::syntax::malformed_number))]
    MalformedNumber {
        literal: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid number")]
        span: SourceSpan,
    },

    #[error("unterminated interpolation in template string")]
    #[diagnostic(
        code(brace::syntax::unterminated_interpolation),
        help("every '${{' inside a template string needs a matching '}}'")
    )]
    UnterminatedInterpolation {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("'${{' opened here is never closed")]
        span: SourceSpan,
    },

    #[error("no parse rule for {found} in expression position")]
    #[diagnostic(code(brace::syntax::no_parse_rule))]
    NoParseRule {
        found: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("cannot start an expression")]
        span: SourceSpan,
    },
}

/// Analyzer-level errors, accumulated across the whole document.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("unknown directive: {name}")]
    #[diagnostic(code(brace::semantic::unknown_directive))]
    UnknownDirective {
        name: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a recognized directive")]
        span: SourceSpan,
    },

    #[error("undefined reference: {namespace}.{name}")]
    #[diagnostic(
        code(brace::semantic::undefined_reference),
        help("constants must be declared with @const before they are referenced")
    )]
    UndefinedReference {
        namespace: String,
        name: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("no constant with this name")]
        span: SourceSpan,
    },

    #[error("environment variable {var_name} not set and no default provided")]
    #[diagnostic(
        code(brace::semantic::env_var_not_set),
        help("set the variable, or supply a default: @env(\"{var_name}\", <default>)")
    )]
    EnvVarNotSet {
        var_name: String,
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this lookup failed")]
        span: SourceSpan,
    },

    #[error("constant names must be identifiers")]
    #[diagnostic(code(brace::semantic::invalid_const_key))]
    InvalidConstKey {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("expected an identifier key")]
        span: SourceSpan,
    },

    #[error("object keys must evaluate to strings")]
    #[diagnostic(code(brace::semantic::non_string_key))]
    NonStringKey {
        line: usize,
        column: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("this key does not evaluate to a string")]
        span: SourceSpan,
    },
}

/// Defensive errors raised during emission. These indicate a broken
/// analyzer/emitter contract, not a user mistake: analysis is expected to
/// have resolved every slot or failed the pipeline first.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum EmissionError {
    #[error("unresolved reference: {name}")]
    #[diagnostic(code(brace::emission::unresolved_reference))]
    UnresolvedReference { name: String },

    #[error("unresolved environment directive: @env(\"{var_name}\")")]
    #[diagnostic(code(brace::emission::unresolved_env))]
    UnresolvedEnv { var_name: String },

    #[error("object keys must be strings, got {found}")]
    #[diagnostic(code(brace::emission::non_string_key))]
    NonStringKey { found: String },
}

/// Renders any diagnostic (including aggregates and their related errors)
/// into a human-readable report with source-line context. Callers that want
/// exit codes and destinations sit outside the core.
pub fn render_report(error: impl Into<Report>) -> String {
    let report: Report = error.into();
    let handler = GraphicalReportHandler::new();
    let mut buffer = String::new();
    // Rendering into a String cannot fail.
    let _ = handler.render_report(&mut buffer, report.as_ref());
    buffer
}
