use crate::ast::{
    DirectiveStatement, Expression, Number, ObjectLiteral, Program, Statement, TemplatePart,
};
use crate::error::{SemanticError, SemanticErrors};
use crate::lexer::Token;
use crate::value::{Map, Value};
use log::debug;
use miette::NamedSource;
use std::collections::HashMap;
use std::sync::Arc;

/// The semantic analyzer runs two passes over a syntactically valid program.
///
/// The first pass walks directives in file order and evaluates `@const`
/// bodies into a constant table, so a constant may refer to any constant
/// declared before it. The second pass resolves every `:reference` and
/// `@env(...)` in the tree, writing the computed value into the node's
/// resolved slot so emission never touches the environment or the table.
pub struct Analyzer {
    source: Arc<NamedSource<String>>,
    /// namespace -> constant name -> value. Re-declaring a name in the same
    /// namespace silently overwrites it.
    constants: HashMap<String, HashMap<String, Value>>,
    errors: Vec<SemanticError>,
}

/// Namespace used for constants declared by a bare `@const { ... }`.
pub const GLOBAL_NAMESPACE: &str = "global";

impl Analyzer {
    pub fn new(source_text: &str, name: impl AsRef<str>) -> Self {
        Analyzer {
            source: Arc::new(NamedSource::new(name, source_text.to_string())),
            constants: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Analyzes the program in place. On success every `Reference` and `Env`
    /// node carries a resolved value; on failure the tree must be discarded.
    pub fn analyze(&mut self, program: &mut Program) -> Result<(), SemanticErrors> {
        for stmt in &program.statements {
            if let Statement::Directive(directive) = stmt {
                self.process_directive(directive);
            }
        }
        debug!(
            "constant table built: {} namespace(s)",
            self.constants.len()
        );

        for stmt in &mut program.statements {
            match stmt {
                Statement::Assignment(assignment) => {
                    Self::resolve_expression_in(
                        &mut self.constants,
                        &mut self.errors,
                        &self.source,
                        &mut assignment.value,
                    );
                }
                Statement::Table(table) => {
                    Self::resolve_object_in(
                        &mut self.constants,
                        &mut self.errors,
                        &self.source,
                        &mut table.body,
                    );
                }
                // Directive bodies were fully evaluated in the first pass.
                Statement::Directive(_) => {}
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SemanticErrors {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    /// Looks up a constant by namespace and name.
    pub fn constant(&self, namespace: &str, name: &str) -> Option<&Value> {
        self.constants.get(namespace)?.get(name)
    }

    fn process_directive(&mut self, directive: &DirectiveStatement) {
        match directive.name.as_str() {
            // Version validation already happened during parsing.
            "brace" => {}
            "const" => self.process_const(directive),
            other => {
                let token = &directive.token;
                self.errors.push(SemanticError::UnknownDirective {
                    name: other.to_string(),
                    line: token.line,
                    column: token.column,
                    src: (*self.source).clone(),
                    span: token.span(),
                });
            }
        }
    }

    fn process_const(&mut self, directive: &DirectiveStatement) {
        let namespace = directive
            .parameters
            .first()
            .and_then(|p| match p {
                Expression::StringLiteral { value, .. } => Some(value.clone()),
                _ => None,
            })
            .unwrap_or_else(|| GLOBAL_NAMESPACE.to_string());

        let Some(body) = &directive.body else {
            return;
        };

        for (key, value) in &body.pairs {
            let name = match key {
                Expression::Identifier { value, .. } => value.clone(),
                other => {
                    let token = other.token();
                    self.errors.push(SemanticError::InvalidConstKey {
                        line: token.line,
                        column: token.column,
                        src: (*self.source).clone(),
                        span: token.span(),
                    });
                    continue;
                }
            };

            let Some(evaluated) = Self::eval_expression_in(
                &mut self.constants,
                &mut self.errors,
                &self.source,
                value,
            ) else {
                continue;
            };

            debug!("defined constant {namespace}.{name}");
            self.constants
                .entry(namespace.clone())
                .or_default()
                .insert(name, evaluated);
        }
    }

    // Resolution helpers borrow the table, the error sink, and the source
    // individually so they stay disjoint from any program borrow.

    fn resolve_object_in(
        constants: &mut HashMap<String, HashMap<String, Value>>,
        errors: &mut Vec<SemanticError>,
        source: &Arc<NamedSource<String>>,
        object: &mut ObjectLiteral,
    ) {
        for (key, value) in &mut object.pairs {
            Self::resolve_expression_in(constants, errors, source, key);
            Self::resolve_expression_in(constants, errors, source, value);
        }
    }

    fn resolve_expression_in(
        constants: &mut HashMap<String, HashMap<String, Value>>,
        errors: &mut Vec<SemanticError>,
        source: &Arc<NamedSource<String>>,
        expr: &mut Expression,
    ) {
        match expr {
            Expression::Reference {
                token,
                namespace,
                name,
                resolved,
            } => {
                let ns = namespace.as_deref().unwrap_or(GLOBAL_NAMESPACE);
                match constants.get(ns).and_then(|table| table.get(name.as_str())) {
                    Some(value) => *resolved = Some(value.clone()),
                    None => errors.push(SemanticError::UndefinedReference {
                        namespace: ns.to_string(),
                        name: name.clone(),
                        line: token.line,
                        column: token.column,
                        src: (**source).clone(),
                        span: token.span(),
                    }),
                }
            }
            Expression::Env {
                token,
                var_name,
                default,
                resolved,
            } => {
                *resolved = Self::resolve_env_in(
                    constants,
                    errors,
                    source,
                    var_name,
                    default.as_deref(),
                    token,
                );
            }
            Expression::Array { elements, .. } => {
                for element in elements {
                    Self::resolve_expression_in(constants, errors, source, element);
                }
            }
            Expression::Object(object) => {
                Self::resolve_object_in(constants, errors, source, object);
            }
            Expression::TemplateString { parts, .. } => {
                for part in parts {
                    if let TemplatePart::Expr(inner) = part {
                        Self::resolve_expression_in(constants, errors, source, inner);
                    }
                }
            }
            Expression::Identifier { .. }
            | Expression::StringLiteral { .. }
            | Expression::NumberLiteral { .. }
            | Expression::BooleanLiteral { .. }
            | Expression::NullLiteral { .. } => {}
        }
    }

    /// Looks up an environment variable and coerces its text. An empty value
    /// counts as unset. When the lookup fails, the default expression is
    /// evaluated; with no default, resolution is a hard error.
    fn resolve_env_in(
        constants: &mut HashMap<String, HashMap<String, Value>>,
        errors: &mut Vec<SemanticError>,
        source: &Arc<NamedSource<String>>,
        var_name: &str,
        default: Option<&Expression>,
        token: &Token,
    ) -> Option<Value> {
        match std::env::var(var_name) {
            Ok(text) if !text.is_empty() => {
                debug!("resolved env var {var_name}");
                Some(coerce_env_value(&text))
            }
            _ => match default {
                Some(expr) => {
                    debug!("env var {var_name} unset, using default");
                    Self::eval_expression_in(constants, errors, source, expr)
                }
                None => {
                    errors.push(SemanticError::EnvVarNotSet {
                        var_name: var_name.to_string(),
                        line: token.line,
                        column: token.column,
                        src: (**source).clone(),
                        span: token.span(),
                    });
                    None
                }
            },
        }
    }

    /// Evaluates an expression to a value using the constant table built so
    /// far. Used for `@const` bodies and `@env` defaults.
    fn eval_expression_in(
        constants: &mut HashMap<String, HashMap<String, Value>>,
        errors: &mut Vec<SemanticError>,
        source: &Arc<NamedSource<String>>,
        expr: &Expression,
    ) -> Option<Value> {
        match expr {
            Expression::Identifier { value, .. } => Some(Value::String(value.clone())),
            Expression::StringLiteral { value, .. } => Some(Value::String(value.clone())),
            Expression::NumberLiteral { value, .. } => Some(match value {
                Number::Integer(n) => Value::Integer(*n),
                Number::Float(f) => Value::Float(*f),
            }),
            Expression::BooleanLiteral { value, .. } => Some(Value::Boolean(*value)),
            Expression::NullLiteral { .. } => Some(Value::Null),
            Expression::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(Self::eval_expression_in(constants, errors, source, element)?);
                }
                Some(Value::Array(values))
            }
            Expression::Object(object) => {
                let mut map = Map::new();
                for (key, value) in &object.pairs {
                    let key_text = match key {
                        Expression::Identifier { value, .. } => value.clone(),
                        Expression::StringLiteral { value, .. } => value.clone(),
                        other => {
                            match Self::eval_expression_in(constants, errors, source, other)? {
                                Value::String(s) => s,
                                _ => {
                                    let token = other.token();
                                    errors.push(SemanticError::NonStringKey {
                                        line: token.line,
                                        column: token.column,
                                        src: (**source).clone(),
                                        span: token.span(),
                                    });
                                    return None;
                                }
                            }
                        }
                    };
                    let evaluated = Self::eval_expression_in(constants, errors, source, value)?;
                    map.insert(key_text, evaluated);
                }
                Some(Value::Object(map))
            }
            Expression::Reference {
                token,
                namespace,
                name,
                ..
            } => {
                let ns = namespace.as_deref().unwrap_or(GLOBAL_NAMESPACE);
                match constants.get(ns).and_then(|table| table.get(name.as_str())) {
                    Some(value) => Some(value.clone()),
                    None => {
                        errors.push(SemanticError::UndefinedReference {
                            namespace: ns.to_string(),
                            name: name.clone(),
                            line: token.line,
                            column: token.column,
                            src: (**source).clone(),
                            span: token.span(),
                        });
                        None
                    }
                }
            }
            Expression::Env {
                token,
                var_name,
                default,
                ..
            } => Self::resolve_env_in(
                constants,
                errors,
                source,
                var_name,
                default.as_deref(),
                token,
            ),
            Expression::TemplateString { parts, .. } => {
                let mut rendered = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => rendered.push_str(text),
                        TemplatePart::Expr(inner) => {
                            let value =
                                Self::eval_expression_in(constants, errors, source, inner)?;
                            rendered.push_str(&value.to_string());
                        }
                    }
                }
                Some(Value::String(rendered))
            }
        }
    }
}

/// Environment variable text is coerced in a fixed order: boolean, integer,
/// float, and finally plain string.
fn coerce_env_value(text: &str) -> Value {
    match text {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::Float(f);
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let mut parser = Parser::new_with_name(source, "test.brace");
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "unexpected syntax errors: {:#?}",
            parser.errors()
        );
        program
    }

    fn analyze_ok(source: &str) -> Program {
        let mut program = parse(source);
        let mut analyzer = Analyzer::new(source, "test.brace");
        analyzer
            .analyze(&mut program)
            .unwrap_or_else(|e| panic!("unexpected semantic errors: {e:#?}"));
        program
    }

    fn analyze_err(source: &str) -> Vec<SemanticError> {
        let mut program = parse(source);
        let mut analyzer = Analyzer::new(source, "test.brace");
        match analyzer.analyze(&mut program) {
            Ok(()) => panic!("expected semantic errors for {source:?}"),
            Err(errs) => errs.errors,
        }
    }

    fn first_assignment_resolved(program: &Program) -> &Value {
        for stmt in &program.statements {
            if let Statement::Assignment(a) = stmt {
                match &a.value {
                    Expression::Reference { resolved, .. } | Expression::Env { resolved, .. } => {
                        return resolved.as_ref().expect("slot not resolved");
                    }
                    other => panic!("expected reference or env, got {other:?}"),
                }
            }
        }
        panic!("no assignment in program");
    }

    #[test]
    fn test_global_constant_resolves() {
        let program = analyze_ok(
            "@brace \"1.0.0\"\n@const { VERSION = \"1.2.3\" }\nv = :VERSION",
        );
        assert_eq!(
            first_assignment_resolved(&program),
            &Value::String("1.2.3".into())
        );
    }

    #[test]
    fn test_namespaced_constant_resolves() {
        let program = analyze_ok(
            "@brace \"1.0.0\"\n@const \"db\" { PORT = 5432 }\np = :db.PORT",
        );
        assert_eq!(first_assignment_resolved(&program), &Value::Integer(5432));
    }

    #[test]
    fn test_undefined_reference_names_namespace_and_constant() {
        let errors = analyze_err("@brace \"1.0.0\"\nx = :db.HOST");
        match &errors[0] {
            SemanticError::UndefinedReference {
                namespace, name, ..
            } => {
                assert_eq!(namespace, "db");
                assert_eq!(name, "HOST");
            }
            other => panic!("expected UndefinedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_global_reference_uses_global_namespace() {
        let errors = analyze_err("@brace \"1.0.0\"\nx = :MISSING");
        match &errors[0] {
            SemanticError::UndefinedReference { namespace, .. } => {
                assert_eq!(namespace, "global");
            }
            other => panic!("expected UndefinedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_constant_can_use_earlier_constant() {
        let program = analyze_ok(
            "@brace \"1.0.0\"\n@const { BASE = \"api\" }\n@const { PATH = `${:BASE}/v1` }\np = :PATH",
        );
        assert_eq!(
            first_assignment_resolved(&program),
            &Value::String("api/v1".into())
        );
    }

    #[test]
    fn test_constant_cannot_use_later_constant() {
        let errors = analyze_err(
            "@brace \"1.0.0\"\n@const { A = :B }\n@const { B = 1 }\nx = :A",
        );
        assert!(matches!(
            errors[0],
            SemanticError::UndefinedReference { .. }
        ));
    }

    #[test]
    fn test_redeclared_constant_overwrites() {
        let program = analyze_ok(
            "@brace \"1.0.0\"\n@const { X = 1 }\n@const { X = 2 }\nx = :X",
        );
        assert_eq!(first_assignment_resolved(&program), &Value::Integer(2));
    }

    #[test]
    fn test_structured_constant() {
        let source = "@brace \"1.0.0\"\n@const { LIMITS = { cpu = 2, mem = [512, 1024] } }\nl = :LIMITS";
        let program = analyze_ok(source);
        match first_assignment_resolved(&program) {
            Value::Object(map) => {
                assert_eq!(map.get("cpu"), Some(&Value::Integer(2)));
                assert!(matches!(map.get("mem"), Some(Value::Array(a)) if a.len() == 2));
            }
            other => panic!("expected object constant, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_const_key() {
        let errors = analyze_err("@brace \"1.0.0\"\n@const { \"A\" = 1 }\nx = 1");
        assert!(matches!(errors[0], SemanticError::InvalidConstKey { .. }));
    }

    #[test]
    fn test_env_unset_without_default_is_error() {
        let errors = analyze_err(
            "@brace \"1.0.0\"\nx = @env(\"BRACE_TEST_ANALYZER_UNSET_VAR\")",
        );
        match &errors[0] {
            SemanticError::EnvVarNotSet { var_name, .. } => {
                assert_eq!(var_name, "BRACE_TEST_ANALYZER_UNSET_VAR");
            }
            other => panic!("expected EnvVarNotSet, got {other:?}"),
        }
    }

    #[test]
    fn test_env_unset_uses_default() {
        let program = analyze_ok(
            "@brace \"1.0.0\"\nx = @env(\"BRACE_TEST_ANALYZER_UNSET_DEFAULT\", 8080)",
        );
        assert_eq!(first_assignment_resolved(&program), &Value::Integer(8080));
    }

    #[test]
    fn test_env_set_wins_over_default() {
        std::env::set_var("BRACE_TEST_ANALYZER_PRECEDENCE", "from-env");
        let program = analyze_ok(
            "@brace \"1.0.0\"\nx = @env(\"BRACE_TEST_ANALYZER_PRECEDENCE\", \"fallback\")",
        );
        assert_eq!(
            first_assignment_resolved(&program),
            &Value::String("from-env".into())
        );
    }

    #[test]
    fn test_env_empty_counts_as_unset() {
        std::env::set_var("BRACE_TEST_ANALYZER_EMPTY", "");
        let program = analyze_ok(
            "@brace \"1.0.0\"\nx = @env(\"BRACE_TEST_ANALYZER_EMPTY\", \"fallback\")",
        );
        assert_eq!(
            first_assignment_resolved(&program),
            &Value::String("fallback".into())
        );
    }

    #[test]
    fn test_env_coercion() {
        std::env::set_var("BRACE_TEST_ANALYZER_COERCE_INT", "42");
        std::env::set_var("BRACE_TEST_ANALYZER_COERCE_BOOL", "true");
        std::env::set_var("BRACE_TEST_ANALYZER_COERCE_FLOAT", "3.14");
        std::env::set_var("BRACE_TEST_ANALYZER_COERCE_STR", "plain text");

        assert_eq!(coerce_env_value("42"), Value::Integer(42));
        assert_eq!(coerce_env_value("true"), Value::Boolean(true));
        assert_eq!(coerce_env_value("false"), Value::Boolean(false));
        assert_eq!(coerce_env_value("3.14"), Value::Float(3.14));
        assert_eq!(
            coerce_env_value("plain text"),
            Value::String("plain text".into())
        );

        let program = analyze_ok(
            "@brace \"1.0.0\"\nx = @env(\"BRACE_TEST_ANALYZER_COERCE_INT\")",
        );
        assert_eq!(first_assignment_resolved(&program), &Value::Integer(42));
    }

    #[test]
    fn test_template_parts_resolve() {
        let source =
            "@brace \"1.0.0\"\n@const \"db\" { HOST = \"localhost\" }\nurl = `http://${:db.HOST}/`";
        let program = analyze_ok(source);
        match &program.statements[2] {
            Statement::Assignment(a) => match &a.value {
                Expression::TemplateString { parts, .. } => {
                    let TemplatePart::Expr(Expression::Reference { resolved, .. }) = &parts[1]
                    else {
                        panic!("expected reference part");
                    };
                    assert_eq!(resolved, &Some(Value::String("localhost".into())));
                }
                other => panic!("expected template string, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_semantic_errors_accumulate() {
        let errors = analyze_err("@brace \"1.0.0\"\na = :MISSING_A\nb = :MISSING_B");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_references_inside_tables_resolve() {
        let source = "@brace \"1.0.0\"\n@const \"db\" { HOST = \"localhost\" }\n#database { host = :db.HOST }";
        let program = analyze_ok(source);
        match &program.statements[2] {
            Statement::Table(t) => match &t.body.pairs[0].1 {
                Expression::Reference { resolved, .. } => {
                    assert_eq!(resolved, &Some(Value::String("localhost".into())));
                }
                other => panic!("expected reference, got {other:?}"),
            },
            other => panic!("expected table, got {other:?}"),
        }
    }
}
