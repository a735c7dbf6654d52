use crate::lexer::Token;
use crate::value::Value;
use std::fmt;

/// The root node of every parsed BRACE document: an ordered sequence of
/// top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map_or("", Statement::token_literal)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

/// A top-level statement. Statements produce no value themselves; they shape
/// the emitted document (assignments, tables) or drive compilation
/// (directives).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment(AssignmentStatement),
    Directive(DirectiveStatement),
    Table(TableStatement),
}

impl Statement {
    pub fn token_literal(&self) -> &str {
        match self {
            Statement::Assignment(s) => &s.token.literal,
            Statement::Directive(s) => &s.token.literal,
            Statement::Table(s) => &s.token.literal,
        }
    }

    pub fn token(&self) -> &Token {
        match self {
            Statement::Assignment(s) => &s.token,
            Statement::Directive(s) => &s.token,
            Statement::Table(s) => &s.token,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment(s) => write!(f, "{} = {}", s.name, s.value),
            Statement::Directive(s) => write!(f, "@{}", s.name),
            Statement::Table(s) => write!(f, "#{}", s.path.join(".")),
        }
    }
}

/// `name = value`, with an optional trailing semicolon in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStatement {
    /// The IDENT token naming the key.
    pub token: Token,
    pub name: String,
    pub value: Expression,
}

/// `@const` / `@brace` statements: a directive name, ordered parameters, and
/// an optional object body (`@const` carries one, `@brace` does not).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveStatement {
    /// The `@` token.
    pub token: Token,
    pub name: String,
    pub parameters: Vec<Expression>,
    pub body: Option<ObjectLiteral>,
}

/// `#a.b.c { ... }`: a dotted path and a mandatory object body installed at
/// that path in the output mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatement {
    /// The `#` token.
    pub token: Token,
    pub path: Vec<String>,
    pub body: ObjectLiteral,
}

/// Object literal pairs keep their source order. Keys are expressions, not
/// raw strings: a key's evaluation can itself involve references.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLiteral {
    /// The `{` token.
    pub token: Token,
    pub pairs: Vec<(Expression, Expression)>,
}

/// A number literal holds either an integer or a float, decided by the
/// presence of a decimal point in the source literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// One segment of a template string: verbatim text or an embedded expression
/// extracted from a `${ ... }` window.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expr(Expression),
}

/// An expression node. The `resolved` slots on `Reference` and `Env` start
/// empty and are populated in place by the analyzer; the emitter reads them
/// and must never run on a tree that failed analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier {
        token: Token,
        value: String,
    },
    StringLiteral {
        token: Token,
        value: String,
    },
    NumberLiteral {
        token: Token,
        value: Number,
    },
    BooleanLiteral {
        token: Token,
        value: bool,
    },
    NullLiteral {
        token: Token,
    },
    Array {
        token: Token,
        elements: Vec<Expression>,
    },
    Object(ObjectLiteral),
    /// `:NAME` or `:namespace.NAME`.
    Reference {
        token: Token,
        namespace: Option<String>,
        name: String,
        resolved: Option<Value>,
    },
    /// `@env("VAR")` or `@env("VAR", default)`.
    Env {
        token: Token,
        var_name: String,
        default: Option<Box<Expression>>,
        resolved: Option<Value>,
    },
    TemplateString {
        token: Token,
        parts: Vec<TemplatePart>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier { token, .. }
            | Expression::StringLiteral { token, .. }
            | Expression::NumberLiteral { token, .. }
            | Expression::BooleanLiteral { token, .. }
            | Expression::NullLiteral { token }
            | Expression::Array { token, .. }
            | Expression::Reference { token, .. }
            | Expression::Env { token, .. }
            | Expression::TemplateString { token, .. } => token,
            Expression::Object(obj) => &obj.token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier { value, .. } => f.write_str(value),
            Expression::StringLiteral { value, .. } => write!(f, "\"{value}\""),
            Expression::NumberLiteral { token, .. } => f.write_str(&token.literal),
            Expression::BooleanLiteral { token, .. } => f.write_str(&token.literal),
            Expression::NullLiteral { .. } => f.write_str("null"),
            Expression::Array { .. } => f.write_str("[...]"),
            Expression::Object(_) => f.write_str("{...}"),
            Expression::Reference {
                namespace, name, ..
            } => match namespace {
                Some(ns) => write!(f, ":{ns}.{name}"),
                None => write!(f, ":{name}"),
            },
            Expression::Env {
                var_name, default, ..
            } => match default {
                Some(default) => write!(f, "@env(\"{var_name}\", {default})"),
                None => write!(f, "@env(\"{var_name}\")"),
            },
            Expression::TemplateString { token, .. } => write!(f, "`{}`", token.literal),
        }
    }
}
