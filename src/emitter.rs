use crate::ast::{Expression, Number, ObjectLiteral, Program, Statement, TemplatePart};
use crate::error::EmissionError;
use crate::value::{Map, Value};
use log::debug;

/// Walks an analyzed program and builds the output value tree.
///
/// Emission is a pure fold over the AST: references and env lookups read
/// the resolved slots the analyzer filled in, and directives contribute
/// nothing to the output. Running the emitter on a tree that was never
/// analyzed is a contract violation and surfaces as an [`EmissionError`].
pub struct Emitter;

impl Emitter {
    /// Produces the document's root object.
    pub fn emit(program: &Program) -> Result<Value, EmissionError> {
        let mut root = Map::new();

        for stmt in &program.statements {
            match stmt {
                Statement::Assignment(assignment) => {
                    let value = Self::eval(&assignment.value)?;
                    root.insert(assignment.name.clone(), value);
                }
                Statement::Table(table) => {
                    let body = Self::eval_object(&table.body)?;
                    install_table(&mut root, &table.path, body);
                }
                Statement::Directive(_) => {}
            }
        }

        debug!("emitted root object with {} key(s)", root.len());
        Ok(Value::Object(root))
    }

    fn eval(expr: &Expression) -> Result<Value, EmissionError> {
        match expr {
            // A bare identifier in value position is its name as a string.
            Expression::Identifier { value, .. } => Ok(Value::String(value.clone())),
            Expression::StringLiteral { value, .. } => Ok(Value::String(value.clone())),
            Expression::NumberLiteral { value, .. } => Ok(match value {
                Number::Integer(n) => Value::Integer(*n),
                Number::Float(f) => Value::Float(*f),
            }),
            Expression::BooleanLiteral { value, .. } => Ok(Value::Boolean(*value)),
            Expression::NullLiteral { .. } => Ok(Value::Null),
            Expression::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(Self::eval(element)?);
                }
                Ok(Value::Array(values))
            }
            Expression::Object(object) => Self::eval_object(object).map(Value::Object),
            Expression::Reference {
                namespace,
                name,
                resolved,
                ..
            } => resolved.clone().ok_or_else(|| {
                let name = match namespace {
                    Some(ns) => format!("{ns}.{name}"),
                    None => name.clone(),
                };
                EmissionError::UnresolvedReference { name }
            }),
            Expression::Env {
                var_name, resolved, ..
            } => resolved.clone().ok_or_else(|| EmissionError::UnresolvedEnv {
                var_name: var_name.clone(),
            }),
            Expression::TemplateString { parts, .. } => {
                let mut rendered = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => rendered.push_str(text),
                        TemplatePart::Expr(inner) => {
                            rendered.push_str(&Self::eval(inner)?.to_string());
                        }
                    }
                }
                Ok(Value::String(rendered))
            }
        }
    }

    fn eval_object(object: &ObjectLiteral) -> Result<Map, EmissionError> {
        let mut map = Map::new();
        for (key, value) in &object.pairs {
            let key_text = match key {
                Expression::Identifier { value, .. } => value.clone(),
                Expression::StringLiteral { value, .. } => value.clone(),
                other => match Self::eval(other)? {
                    Value::String(s) => s,
                    found => {
                        return Err(EmissionError::NonStringKey {
                            found: kind_name(&found).to_string(),
                        })
                    }
                },
            };
            map.insert(key_text, Self::eval(value)?);
        }
        Ok(map)
    }
}

/// Installs a table body at a dotted path, creating intermediate mappings as
/// needed. An existing mapping along the path is descended into, so sibling
/// tables merge; a non-mapping intermediate is replaced. Re-declaring the
/// leaf overwrites the previous body while keeping the key's position.
fn install_table(root: &mut Map, path: &[String], body: Map) {
    let Some((leaf, intermediates)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in intermediates {
        if !matches!(current.get(segment), Some(Value::Object(_))) {
            current.insert(segment.clone(), Value::Object(Map::new()));
        }
        let Some(Value::Object(next)) = current.get_mut(segment) else {
            unreachable!("segment was just made a mapping");
        };
        current = next;
    }

    current.insert(leaf.clone(), Value::Object(body));
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
