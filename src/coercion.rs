//! Coercion of literal value AST nodes into typed runtime values.

use crate::{
    ast::{InputValue, Type},
    executor::Variables,
    parser::Spanning,
    schema::{meta::MetaType, model::SchemaType},
    validation::RuleError,
};

/// Coerces a literal value node against a target type, substituting
/// variable references from the coerced variable map.
///
/// `Ok(None)` means _missing_: a referenced variable was absent and had no
/// default. Callers fall back to their own defaults and non-null checks.
/// Errors carry the source span of the offending node.
pub fn coerce_input_literal(
    schema: &SchemaType,
    target_type: &Type,
    node: &Spanning<InputValue>,
    variables: &Variables,
) -> Result<Option<InputValue>, RuleError> {
    match &node.item {
        // Variable values were validated and deserialized when the
        // operation's variables were coerced; only the null check remains
        // at the usage site.
        InputValue::Variable(name) => match variables.get(name) {
            Some(value) => {
                if value.is_null() && target_type.is_non_null() {
                    Err(RuleError::new(
                        &format!(
                            r#"Variable "${name}" is null, but used for non-null type "{target_type}""#,
                        ),
                        &[node.span.start],
                    ))
                } else {
                    Ok(Some(value.clone()))
                }
            }
            None => Ok(None),
        },

        InputValue::Null => {
            if target_type.is_non_null() {
                Err(RuleError::new(
                    &format!(r#"Expected "{target_type}", found null"#),
                    &[node.span.start],
                ))
            } else {
                Ok(Some(InputValue::Null))
            }
        }

        _ => match target_type {
            Type::Named(name) | Type::NonNullNamed(name) => {
                coerce_named_literal(schema, name, node, variables)
            }
            Type::List(inner) | Type::NonNullList(inner) => {
                coerce_list_literal(schema, inner, node, variables)
            }
        },
    }
}

fn coerce_list_literal(
    schema: &SchemaType,
    inner_type: &Type,
    node: &Spanning<InputValue>,
    variables: &Variables,
) -> Result<Option<InputValue>, RuleError> {
    match &node.item {
        InputValue::List(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                // A missing variable cannot fall back to a default in list
                // position, so it coerces to null.
                let coerced = coerce_input_literal(schema, inner_type, element, variables)?
                    .unwrap_or(InputValue::Null);
                if coerced.is_null() && inner_type.is_non_null() {
                    return Err(RuleError::new(
                        &format!(r#"Expected "{inner_type}", found null"#),
                        &[element.span.start],
                    ));
                }
                out.push(Spanning::new(element.span, coerced));
            }
            Ok(Some(InputValue::List(out)))
        }
        // A single value is promoted to a list of one.
        _ => Ok(coerce_input_literal(schema, inner_type, node, variables)?
            .map(|v| InputValue::list(vec![v]))),
    }
}

fn coerce_named_literal(
    schema: &SchemaType,
    name: &str,
    node: &Spanning<InputValue>,
    variables: &Variables,
) -> Result<Option<InputValue>, RuleError> {
    let Some(meta) = schema.concrete_type_by_name(name) else {
        return Err(RuleError::new(
            &format!(r#"Unknown type "{name}""#),
            &[node.span.start],
        ));
    };

    match meta {
        MetaType::InputObject(io) => {
            let InputValue::Object(provided) = &node.item else {
                return Err(RuleError::new(
                    &format!(r#"Expected "{name}", found not an object"#),
                    &[node.span.start],
                ));
            };

            for (key, _) in provided {
                if io.input_fields.iter().all(|f| f.name != key.item) {
                    return Err(RuleError::new(
                        &format!(r#"Unknown field "{}" for input object "{name}""#, key.item),
                        &[key.span.start],
                    ));
                }
            }

            let mut out = Vec::new();
            for input_field in &io.input_fields {
                let provided_value = provided.iter().find(|(k, _)| input_field.name == k.item);
                let coerced = match provided_value {
                    Some((_, value_node)) => coerce_input_literal(
                        schema,
                        &input_field.arg_type,
                        value_node,
                        variables,
                    )?,
                    None => None,
                };

                match coerced {
                    Some(value) => out.push((
                        Spanning::unlocated(input_field.name.to_string()),
                        Spanning::unlocated(value),
                    )),
                    // Keys not present fall back to the input field's
                    // default.
                    None => match &input_field.default_value {
                        Some(default) => out.push((
                            Spanning::unlocated(input_field.name.to_string()),
                            Spanning::unlocated(default.clone()),
                        )),
                        None if input_field.arg_type.is_non_null() => {
                            return Err(RuleError::new(
                                &format!(
                                    r#"Missing field "{}" for input object "{name}""#,
                                    input_field.name,
                                ),
                                &[node.span.start],
                            ));
                        }
                        None => {}
                    },
                }
            }
            Ok(Some(InputValue::Object(out)))
        }

        leaf => {
            leaf.validate_input(&node.item)
                .map_err(|e| RuleError::new(e.message(), &[node.span.start]))?;
            leaf.deserialize_input(&node.item)
                .map(Some)
                .map_err(|e| RuleError::new(e.message(), &[node.span.start]))
        }
    }
}
