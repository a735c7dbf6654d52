use crate::ast::{
    AssignmentStatement, DirectiveStatement, Expression, Number, ObjectLiteral, Program, Statement,
    TableStatement, TemplatePart,
};
use crate::error::SyntaxError;
use crate::lexer::{Lexer, Token, TokenKind};
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

/// BRACE language versions this compiler understands. Checked by the parser
/// as part of validating the mandatory leading `@brace` directive.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.0.1", "1.0.0"];

/// A recursive descent parser for the BRACE language.
///
/// The parser pulls tokens from the lexer one at a time, keeping the usual
/// current/peek pair. Errors accumulate instead of aborting: a broken
/// statement is skipped and parsing resumes at the next top-level statement,
/// so one run reports as many syntax problems as it can find.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source: Arc<NamedSource<String>>,

    cur_token: Token,
    peek_token: Token,

    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "source.brace")
    }

    pub fn new_with_name(source_text: &'a str, name: impl AsRef<str>) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let mut lexer = Lexer::new(source_text);
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();
        Parser {
            lexer,
            source,
            cur_token,
            peek_token,
            errors: Vec::new(),
        }
    }

    /// Parses the entire document. Inspect [`Parser::errors`] afterwards;
    /// a program built alongside syntax errors must not be analyzed.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        let mut seen_first = false;

        while self.cur_token.kind != TokenKind::Eof {
            // Comments don't contribute to the AST.
            if self.cur_token.kind == TokenKind::Comment {
                self.next_token();
                continue;
            }

            let is_first = !seen_first;
            seen_first = true;

            match self.parse_statement() {
                Some(stmt) => {
                    if is_first && !is_brace_directive(&stmt) {
                        let token = stmt.token().clone();
                        self.errors.push(SyntaxError::MissingVersionDirective {
                            line: token.line,
                            column: token.column,
                            src: self.named_source(),
                            span: self.token_span(&token),
                        });
                    }
                    program.statements.push(stmt);
                }
                None => self.synchronize(),
            }
            self.next_token();
        }

        if !seen_first {
            let token = self.cur_token.clone();
            self.errors.push(SyntaxError::MissingVersionDirective {
                line: token.line,
                column: token.column,
                src: self.named_source(),
                span: self.token_span(&token),
            });
        }

        program
    }

    /// The syntax errors collected so far, in source order.
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Consumes the parser and yields its collected errors.
    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }

    // === Statements ===

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.cur_token.kind {
            TokenKind::At => self.parse_directive_statement().map(Statement::Directive),
            TokenKind::Hash => self.parse_table_statement().map(Statement::Table),
            TokenKind::Ident => self.parse_assignment_statement().map(Statement::Assignment),
            TokenKind::Illegal => {
                self.illegal_token_error();
                None
            }
            _ => {
                let token = self.cur_token.clone();
                self.errors.push(SyntaxError::UnexpectedStatement {
                    found: token.kind.to_string(),
                    line: token.line,
                    column: token.column,
                    src: self.named_source(),
                    span: self.token_span(&token),
                });
                None
            }
        }
    }

    fn parse_directive_statement(&mut self) -> Option<DirectiveStatement> {
        let token = self.cur_token.clone(); // the '@' token

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }

        let name = self.cur_token.literal.clone();
        if name == "const" {
            return self.parse_const_directive(token, name);
        }
        if name == "brace" {
            return self.parse_brace_directive(token, name);
        }
        if name == "env" {
            self.errors.push(SyntaxError::EnvAsStatement {
                line: token.line,
                column: token.column,
                src: self.named_source(),
                span: self.token_span(&token),
            });
            return None;
        }

        let name_token = self.cur_token.clone();
        self.errors.push(SyntaxError::UnknownDirective {
            name,
            line: name_token.line,
            column: name_token.column,
            src: self.named_source(),
            span: self.token_span(&name_token),
        });
        None
    }

    /// `@const [ "namespace" ] { ... }`
    fn parse_const_directive(&mut self, token: Token, name: String) -> Option<DirectiveStatement> {
        let mut parameters = Vec::new();

        if self.peek_token.kind == TokenKind::String {
            self.next_token();
            parameters.push(self.parse_expression()?);
        }

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }

        let body = self.parse_object_literal()?;
        Some(DirectiveStatement {
            token,
            name,
            parameters,
            body: Some(body),
        })
    }

    /// `@brace "version"`, the mandatory leading version directive. The
    /// parser owns both shape validation and the supported-version check.
    fn parse_brace_directive(&mut self, token: Token, name: String) -> Option<DirectiveStatement> {
        match self.peek_token.kind {
            TokenKind::String => {
                self.next_token();
            }
            // A non-string value in parameter position is its own error class.
            TokenKind::Number
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::LBrace
            | TokenKind::LBracket
            | TokenKind::Colon
            | TokenKind::TemplateString => {
                let bad = self.peek_token.clone();
                self.errors.push(SyntaxError::VersionNotString {
                    line: bad.line,
                    column: bad.column,
                    src: self.named_source(),
                    span: self.token_span(&bad),
                });
                self.next_token(); // consume the offending token
                return None;
            }
            _ => {
                self.errors.push(SyntaxError::VersionParameter {
                    line: token.line,
                    column: token.column,
                    src: self.named_source(),
                    span: self.token_span(&token),
                });
                return None;
            }
        }

        let version_token = self.cur_token.clone();
        let version = self.parse_expression()?;

        // A value token here cannot start the next statement, so it must be
        // a second parameter. Same error class as a missing one.
        if matches!(
            self.peek_token.kind,
            TokenKind::String
                | TokenKind::Number
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::LBrace
                | TokenKind::LBracket
                | TokenKind::Colon
                | TokenKind::TemplateString
        ) {
            let extra = self.peek_token.clone();
            self.errors.push(SyntaxError::VersionParameter {
                line: extra.line,
                column: extra.column,
                src: self.named_source(),
                span: self.token_span(&extra),
            });
            self.next_token();
            return None;
        }

        if !SUPPORTED_VERSIONS.contains(&version_token.literal.as_str()) {
            self.errors.push(SyntaxError::UnsupportedVersion {
                version: version_token.literal.clone(),
                supported: SUPPORTED_VERSIONS.join(", "),
                line: version_token.line,
                column: version_token.column,
                src: self.named_source(),
                span: self.token_span(&version_token),
            });
            return None;
        }

        Some(DirectiveStatement {
            token,
            name,
            parameters: vec![version],
            body: None,
        })
    }

    /// `#path.to.table { ... }`
    fn parse_table_statement(&mut self) -> Option<TableStatement> {
        let token = self.cur_token.clone(); // the '#' token

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }

        let mut path = vec![self.cur_token.literal.clone()];
        while self.peek_token.kind == TokenKind::Dot {
            self.next_token(); // consume dot
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            path.push(self.cur_token.literal.clone());
        }

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }

        let body = self.parse_object_literal()?;
        Some(TableStatement { token, path, body })
    }

    /// `name = expression [ ; ]`
    fn parse_assignment_statement(&mut self) -> Option<AssignmentStatement> {
        let token = self.cur_token.clone();
        let name = token.literal.clone();

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }

        self.next_token();
        let value = self.parse_expression()?;

        if self.peek_token.kind == TokenKind::Semicolon {
            self.next_token();
        }

        Some(AssignmentStatement { token, name, value })
    }

    // === Expressions ===

    fn parse_expression(&mut self) -> Option<Expression> {
        match self.cur_token.kind {
            TokenKind::Ident => Some(Expression::Identifier {
                token: self.cur_token.clone(),
                value: self.cur_token.literal.clone(),
            }),
            TokenKind::String => Some(Expression::StringLiteral {
                token: self.cur_token.clone(),
                value: self.cur_token.literal.clone(),
            }),
            TokenKind::Number => self.parse_number_literal(),
            TokenKind::True | TokenKind::False => Some(Expression::BooleanLiteral {
                token: self.cur_token.clone(),
                value: self.cur_token.kind == TokenKind::True,
            }),
            TokenKind::Null => Some(Expression::NullLiteral {
                token: self.cur_token.clone(),
            }),
            TokenKind::LBrace => self.parse_object_literal().map(Expression::Object),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::Colon => self.parse_reference(),
            TokenKind::At => self.parse_directive_expression(),
            TokenKind::TemplateString => self.parse_template_string(),
            TokenKind::Illegal => {
                self.illegal_token_error();
                None
            }
            _ => {
                let token = self.cur_token.clone();
                self.errors.push(SyntaxError::NoParseRule {
                    found: token.kind.to_string(),
                    line: token.line,
                    column: token.column,
                    src: self.named_source(),
                    span: self.token_span(&token),
                });
                None
            }
        }
    }

    /// Numbers are integers unless the source literal contains a decimal
    /// point; the value's sign plays no part in the distinction.
    fn parse_number_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let value = if token.literal.contains('.') {
            match token.literal.parse::<f64>() {
                Ok(f) => Number::Float(f),
                Err(_) => {
                    self.malformed_number(&token);
                    return None;
                }
            }
        } else {
            match token.literal.parse::<i64>() {
                Ok(i) => Number::Integer(i),
                Err(_) => {
                    self.malformed_number(&token);
                    return None;
                }
            }
        };
        Some(Expression::NumberLiteral { token, value })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone(); // the '[' token
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::Array { token, elements })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_token.kind == end {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression()?);

        while self.peek_token.kind == TokenKind::Comma {
            self.next_token(); // consume comma
            self.next_token(); // move to next element
            list.push(self.parse_expression()?);
        }

        if !self.expect_peek(end) {
            return None;
        }

        Some(list)
    }

    /// Object literals accept pairs separated by commas or semicolons, by
    /// nothing when the next pair starts with an identifier or string key,
    /// or interleaved with comments. A trailing separator before `}` is
    /// legal.
    fn parse_object_literal(&mut self) -> Option<ObjectLiteral> {
        let token = self.cur_token.clone(); // the '{' token
        let mut pairs = Vec::new();

        if self.peek_token.kind == TokenKind::RBrace {
            self.next_token();
            return Some(ObjectLiteral { token, pairs });
        }

        self.next_token();

        loop {
            while self.cur_token.kind == TokenKind::Comment {
                self.next_token();
            }
            if self.cur_token.kind == TokenKind::RBrace {
                return Some(ObjectLiteral { token, pairs });
            }

            let key = self.parse_expression()?;
            if !self.expect_peek(TokenKind::Assign) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression()?;
            pairs.push((key, value));

            while self.peek_token.kind == TokenKind::Comment {
                self.next_token();
            }

            match self.peek_token.kind {
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.next_token(); // consume separator
                    self.next_token(); // next key, comment, or closing brace
                }
                TokenKind::RBrace => {
                    self.next_token();
                    return Some(ObjectLiteral { token, pairs });
                }
                // No separator, but another pair (or comment) follows.
                TokenKind::Ident | TokenKind::String | TokenKind::Comment => {
                    self.next_token();
                }
                _ => {
                    self.peek_error(TokenKind::RBrace);
                    return None;
                }
            }
        }
    }

    /// `:NAME` or `:namespace.NAME`. Only one dot level is recognized;
    /// anything after a second dot is left to the surrounding grammar.
    fn parse_reference(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone(); // the ':' token

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }

        let (namespace, name) = if self.peek_token.kind == TokenKind::Dot {
            let namespace = self.cur_token.literal.clone();
            self.next_token(); // consume dot
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            (Some(namespace), self.cur_token.literal.clone())
        } else {
            (None, self.cur_token.literal.clone())
        };

        Some(Expression::Reference {
            token,
            namespace,
            name,
            resolved: None,
        })
    }

    /// `@env("VAR")` or `@env("VAR", default)`, the only directive legal in
    /// expression position.
    fn parse_directive_expression(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone(); // the '@' token

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }

        if self.cur_token.literal != "env" {
            let name_token = self.cur_token.clone();
            self.errors.push(SyntaxError::UnknownDirective {
                name: name_token.literal.clone(),
                line: name_token.line,
                column: name_token.column,
                src: self.named_source(),
                span: self.token_span(&name_token),
            });
            return None;
        }

        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::String) {
            return None;
        }
        let var_name = self.cur_token.literal.clone();

        let default = if self.peek_token.kind == TokenKind::Comma {
            self.next_token(); // consume comma
            self.next_token(); // move to default value
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }

        Some(Expression::Env {
            token,
            var_name,
            default,
            resolved: None,
        })
    }

    // === Template strings ===

    /// Post-processes the raw template literal, splitting it into verbatim
    /// text and `${ ... }` interpolation windows.
    fn parse_template_string(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let raw = token.literal.clone();
        let mut parts = Vec::new();
        let mut cursor = 0;

        while let Some(found) = raw[cursor..].find("${") {
            let open = cursor + found;
            if open > cursor {
                parts.push(TemplatePart::Literal(raw[cursor..open].to_string()));
            }

            let Some(close_rel) = raw[open + 2..].find('}') else {
                // Raw literal starts one byte after the opening backtick.
                let span: SourceSpan = (token.position + 1 + open, 2).into();
                self.errors.push(SyntaxError::UnterminatedInterpolation {
                    line: token.line,
                    column: token.column,
                    src: self.named_source(),
                    span,
                });
                return None;
            };

            let inner = raw[open + 2..open + 2 + close_rel].trim();
            parts.push(TemplatePart::Expr(self.parse_interpolation(inner, &token)));
            cursor = open + 2 + close_rel + 1;
        }

        if cursor < raw.len() {
            parts.push(TemplatePart::Literal(raw[cursor..].to_string()));
        }

        Some(Expression::TemplateString { token, parts })
    }

    /// Best-effort classification of interpolation content: a reference, a
    /// quoted string, a number, or a bare identifier as a fallback.
    fn parse_interpolation(&self, content: &str, template: &Token) -> Expression {
        let synth = |kind: TokenKind, literal: &str| {
            Token::new(
                kind,
                literal,
                template.line,
                template.column,
                template.position,
                literal.len(),
            )
        };

        if let Some(refname) = content.strip_prefix(':') {
            let (namespace, name) = match refname.split_once('.') {
                Some((ns, n)) => (Some(ns.to_string()), n.to_string()),
                None => (None, refname.to_string()),
            };
            return Expression::Reference {
                token: synth(TokenKind::Colon, content),
                namespace,
                name,
                resolved: None,
            };
        }

        for quote in ['"', '\''] {
            if content.len() >= 2 && content.starts_with(quote) && content.ends_with(quote) {
                let inner = &content[1..content.len() - 1];
                return Expression::StringLiteral {
                    token: synth(TokenKind::String, inner),
                    value: inner.to_string(),
                };
            }
        }

        if !content.contains('.') {
            if let Ok(i) = content.parse::<i64>() {
                return Expression::NumberLiteral {
                    token: synth(TokenKind::Number, content),
                    value: Number::Integer(i),
                };
            }
        } else if let Ok(f) = content.parse::<f64>() {
            return Expression::NumberLiteral {
                token: synth(TokenKind::Number, content),
                value: Number::Float(f),
            };
        }

        Expression::Identifier {
            token: synth(TokenKind::Ident, content),
            value: content.to_string(),
        }
    }

    // === Token helpers ===

    fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    fn expect_peek(&mut self, expected: TokenKind) -> bool {
        if self.peek_token.kind == expected {
            self.next_token();
            true
        } else {
            self.peek_error(expected);
            false
        }
    }

    fn peek_error(&mut self, expected: TokenKind) {
        let token = self.peek_token.clone();
        self.errors.push(SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            line: token.line,
            column: token.column,
            src: self.named_source(),
            span: self.token_span(&token),
        });
    }

    fn malformed_number(&mut self, token: &Token) {
        self.errors.push(SyntaxError::MalformedNumber {
            literal: token.literal.clone(),
            line: token.line,
            column: token.column,
            src: self.named_source(),
            span: self.token_span(token),
        });
    }

    fn illegal_token_error(&mut self) {
        let token = self.cur_token.clone();
        self.errors.push(SyntaxError::IllegalCharacter {
            description: token.literal.clone(),
            line: token.line,
            column: token.column,
            src: self.named_source(),
            span: self.token_span(&token),
        });
    }

    /// Skips ahead to the next plausible statement boundary after a parse
    /// failure, so later statements still get checked.
    fn synchronize(&mut self) {
        loop {
            match self.cur_token.kind {
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::RBrace => return,
                _ => {}
            }
            match self.peek_token.kind {
                TokenKind::At | TokenKind::Hash | TokenKind::Eof => return,
                _ => self.next_token(),
            }
        }
    }

    fn named_source(&self) -> NamedSource<String> {
        (*self.source).clone()
    }

    fn token_span(&self, token: &Token) -> SourceSpan {
        if token.kind == TokenKind::Eof {
            (token.position.saturating_sub(1), 0).into()
        } else {
            token.span()
        }
    }
}

fn is_brace_directive(stmt: &Statement) -> bool {
    matches!(stmt, Statement::Directive(d) if d.name == "brace")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    fn parse_ok(source: &str) -> Program {
        let mut parser = Parser::new_with_name(source, "test.brace");
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "unexpected syntax errors: {:#?}",
            parser.errors()
        );
        program
    }

    fn parse_err(source: &str) -> Vec<SyntaxError> {
        let mut parser = Parser::new_with_name(source, "test.brace");
        parser.parse_program();
        let errors = parser.into_errors();
        assert!(!errors.is_empty(), "expected syntax errors for {source:?}");
        errors
    }

    const HEADER: &str = "@brace \"1.0.0\"\n";

    fn with_header(body: &str) -> String {
        format!("{HEADER}{body}")
    }

    #[test]
    fn test_version_directive_alone() {
        let program = parse_ok(HEADER);
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Statement::Directive(d) => {
                assert_eq!(d.name, "brace");
                assert_eq!(d.parameters.len(), 1);
                assert!(d.body.is_none());
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_version_directive() {
        let errors = parse_err("name = \"test\"");
        assert!(matches!(
            errors[0],
            SyntaxError::MissingVersionDirective { .. }
        ));
    }

    #[test]
    fn test_empty_file_is_missing_version() {
        let errors = parse_err("");
        assert!(matches!(
            errors[0],
            SyntaxError::MissingVersionDirective { .. }
        ));
    }

    #[test]
    fn test_first_directive_must_be_brace() {
        let errors = parse_err("@const { A = 1 }\n");
        assert!(matches!(
            errors[0],
            SyntaxError::MissingVersionDirective { .. }
        ));
    }

    #[test]
    fn test_comments_before_version_directive_allowed() {
        let program = parse_ok("// header comment\n/* block */\n@brace \"1.0.0\"\n");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_version_must_be_string() {
        let errors = parse_err("@brace 1.0\n");
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::VersionNotString { .. })));
    }

    #[test]
    fn test_version_parameter_required() {
        let errors = parse_err("@brace\nname = \"test\"");
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::VersionParameter { .. })));
    }

    #[test]
    fn test_extra_version_parameter_rejected() {
        let errors = parse_err("@brace \"1.0.0\" \"extra\"\n");
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::VersionParameter { .. })));
    }

    #[test]
    fn test_assignment_after_version_is_not_a_parameter() {
        let program = parse_ok("@brace \"1.0.0\"\nname = \"test\"");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_unsupported_version() {
        let errors = parse_err("@brace \"9.9.9\"\n");
        match &errors[0] {
            SyntaxError::UnsupportedVersion {
                version, supported, ..
            } => {
                assert_eq!(version, "9.9.9");
                assert_eq!(supported, "0.0.1, 1.0.0");
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_assignment() {
        let program = parse_ok(&with_header("name = \"brace\";"));
        match &program.statements[1] {
            Statement::Assignment(a) => {
                assert_eq!(a.name, "name");
                assert!(matches!(
                    &a.value,
                    Expression::StringLiteral { value, .. } if value == "brace"
                ));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_number_literals() {
        let program = parse_ok(&with_header("a = 42\nb = -7\nc = 3.14"));
        let values: Vec<&Expression> = program.statements[1..]
            .iter()
            .map(|s| match s {
                Statement::Assignment(a) => &a.value,
                other => panic!("expected assignment, got {other:?}"),
            })
            .collect();
        assert!(matches!(
            values[0],
            Expression::NumberLiteral {
                value: Number::Integer(42),
                ..
            }
        ));
        assert!(matches!(
            values[1],
            Expression::NumberLiteral {
                value: Number::Integer(-7),
                ..
            }
        ));
        assert!(matches!(
            values[2],
            Expression::NumberLiteral {
                value: Number::Float(f),
                ..
            } if (*f - 3.14).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_integer_overflow_is_malformed() {
        let errors = parse_err(&with_header("x = 99999999999999999999"));
        match &errors[0] {
            SyntaxError::MalformedNumber { literal, .. } => {
                assert_eq!(literal, "99999999999999999999");
            }
            other => panic!("expected MalformedNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_and_null() {
        let program = parse_ok(&with_header("a = true\nb = false\nc = null"));
        assert_eq!(program.statements.len(), 4);
        assert!(matches!(
            &program.statements[3],
            Statement::Assignment(a) if matches!(a.value, Expression::NullLiteral { .. })
        ));
    }

    #[test]
    fn test_array_literal() {
        let program = parse_ok(&with_header("xs = [1, \"two\", true]\nempty = []"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Array { elements, .. } => assert_eq!(elements.len(), 3),
                other => panic!("expected array, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
        match &program.statements[2] {
            Statement::Assignment(a) => match &a.value {
                Expression::Array { elements, .. } => assert!(elements.is_empty()),
                other => panic!("expected array, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_object_literal_separators() {
        // Commas, bare adjacency, trailing comma, and comments all work.
        let source = with_header(
            "obj = {\n  a = 1,\n  b = 2\n  c = 3, // trailing comment\n  /* note */ d = 4,\n}",
        );
        let program = parse_ok(&source);
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Object(obj) => {
                    let keys: Vec<String> = obj
                        .pairs
                        .iter()
                        .map(|(k, _)| match k {
                            Expression::Identifier { value, .. } => value.clone(),
                            other => panic!("expected identifier key, got {other:?}"),
                        })
                        .collect();
                    assert_eq!(keys, ["a", "b", "c", "d"]);
                }
                other => panic!("expected object, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_object_semicolon_separators() {
        let program = parse_ok(&with_header("obj = { a = 1; b = 2; }"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Object(obj) => assert_eq!(obj.pairs.len(), 2),
                other => panic!("expected object, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_object() {
        let program = parse_ok(&with_header("obj = {}"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Object(obj) => assert!(obj.pairs.is_empty()),
                other => panic!("expected object, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_const_directive_with_namespace() {
        let program = parse_ok(&with_header("@const \"db\" {\n  HOST = \"localhost\"\n}"));
        match &program.statements[1] {
            Statement::Directive(d) => {
                assert_eq!(d.name, "const");
                assert_eq!(d.parameters.len(), 1);
                let body = d.body.as_ref().expect("const body");
                assert_eq!(body.pairs.len(), 1);
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn test_const_directive_default_namespace() {
        let program = parse_ok(&with_header("@const { A = 1, B = 2 }"));
        match &program.statements[1] {
            Statement::Directive(d) => {
                assert!(d.parameters.is_empty());
                assert_eq!(d.body.as_ref().unwrap().pairs.len(), 2);
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn test_env_as_statement_is_error() {
        let errors = parse_err(&with_header("@env(\"HOME\")"));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::EnvAsStatement { .. })));
    }

    #[test]
    fn test_unknown_directive() {
        let errors = parse_err(&with_header("@include \"other.brace\""));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::UnknownDirective { name, .. } if name == "include")));
    }

    #[test]
    fn test_env_expression() {
        let program = parse_ok(&with_header("home = @env(\"HOME\")"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Env {
                    var_name, default, ..
                } => {
                    assert_eq!(var_name, "HOME");
                    assert!(default.is_none());
                }
                other => panic!("expected env, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_env_expression_with_default() {
        let program = parse_ok(&with_header("port = @env(\"PORT\", 8080)"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Env { default, .. } => {
                    assert!(matches!(
                        default.as_deref(),
                        Some(Expression::NumberLiteral {
                            value: Number::Integer(8080),
                            ..
                        })
                    ));
                }
                other => panic!("expected env, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_env_requires_parentheses() {
        let errors = parse_err(&with_header("home = @env \"HOME\""));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::UnexpectedToken { expected, .. } if expected == "(")));
    }

    #[test]
    fn test_reference_global() {
        let program = parse_ok(&with_header("v = :VERSION"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Reference {
                    namespace, name, ..
                } => {
                    assert!(namespace.is_none());
                    assert_eq!(name, "VERSION");
                }
                other => panic!("expected reference, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_namespaced() {
        let program = parse_ok(&with_header("h = :db.HOST"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::Reference {
                    namespace, name, ..
                } => {
                    assert_eq!(namespace.as_deref(), Some("db"));
                    assert_eq!(name, "HOST");
                }
                other => panic!("expected reference, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_only_one_dot_level() {
        // `:ns.a.b` parses as ns.a; the trailing `.b` cannot start a statement.
        let errors = parse_err(&with_header("x = :ns.a.b"));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::UnexpectedStatement { found, .. } if found == ".")));
    }

    #[test]
    fn test_table_statement() {
        let program = parse_ok(&with_header("#database {\n  host = \"localhost\"\n}"));
        match &program.statements[1] {
            Statement::Table(t) => {
                assert_eq!(t.path, ["database"]);
                assert_eq!(t.body.pairs.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_table_dotted_path() {
        let program = parse_ok(&with_header("#a.b.c { x = 1 }"));
        match &program.statements[1] {
            Statement::Table(t) => assert_eq!(t.path, ["a", "b", "c"]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_template_string_parts() {
        let program = parse_ok(&with_header("url = `http://${:db.HOST}:${:db.PORT}/`"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::TemplateString { parts, .. } => {
                    assert_eq!(parts.len(), 5);
                    assert!(matches!(
                        &parts[0],
                        TemplatePart::Literal(s) if s == "http://"
                    ));
                    assert!(matches!(
                        &parts[1],
                        TemplatePart::Expr(Expression::Reference { name, .. }) if name == "HOST"
                    ));
                    assert!(matches!(&parts[2], TemplatePart::Literal(s) if s == ":"));
                    assert!(matches!(
                        &parts[3],
                        TemplatePart::Expr(Expression::Reference { name, .. }) if name == "PORT"
                    ));
                    assert!(matches!(&parts[4], TemplatePart::Literal(s) if s == "/"));
                }
                other => panic!("expected template string, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_template_interpolation_kinds() {
        let program = parse_ok(&with_header("t = `${name} ${42} ${3.5} ${\"lit\"}`"));
        match &program.statements[1] {
            Statement::Assignment(a) => match &a.value {
                Expression::TemplateString { parts, .. } => {
                    assert!(matches!(
                        &parts[0],
                        TemplatePart::Expr(Expression::Identifier { value, .. }) if value == "name"
                    ));
                    assert!(matches!(
                        &parts[2],
                        TemplatePart::Expr(Expression::NumberLiteral {
                            value: Number::Integer(42),
                            ..
                        })
                    ));
                    assert!(matches!(
                        &parts[4],
                        TemplatePart::Expr(Expression::NumberLiteral {
                            value: Number::Float(_),
                            ..
                        })
                    ));
                    assert!(matches!(
                        &parts[6],
                        TemplatePart::Expr(Expression::StringLiteral { value, .. }) if value == "lit"
                    ));
                }
                other => panic!("expected template string, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_interpolation() {
        let errors = parse_err(&with_header("t = `broken ${:VERSION`"));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::UnterminatedInterpolation { .. })));
    }

    #[test]
    fn test_error_recovery_continues_after_bad_statement() {
        let mut parser = Parser::new_with_name(
            "@brace \"1.0.0\"\nbad = = 1\n#db { host = \"x\" }",
            "test.brace",
        );
        let program = parser.parse_program();
        assert!(!parser.errors().is_empty());
        // The table after the broken assignment still parsed.
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(s, Statement::Table(_))));
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let errors = parse_err("@brace \"1.0.0\"\na = = 1\n@include \"x\"\n");
        assert!(errors.len() >= 2);
    }

    #[test]
    fn test_illegal_character_reported() {
        let errors = parse_err(&with_header("~"));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::IllegalCharacter { .. })));
    }
}
