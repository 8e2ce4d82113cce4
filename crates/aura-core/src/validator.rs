use serde_json::Value;
use std::collections::BTreeMap;

use crate::descriptor::DefDescriptor;
use crate::error::DefinitionError;
use crate::types::*;

// ---------------------------------------------------------------------------
// Script validation
// ---------------------------------------------------------------------------

/// Checks attached script artifacts (controllers, providers) at build time.
pub trait ScriptValidator: Send + Sync {
    /// `Err` carries a human-readable reason.
    fn validate(&self, descriptor: &DefDescriptor, contents: &str) -> Result<(), String>;
}

/// Structural check: delimiters balance outside strings and comments, and
/// no object key is left without a value (`{k:}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedScriptValidator;

impl ScriptValidator for BalancedScriptValidator {
    fn validate(&self, _descriptor: &DefDescriptor, contents: &str) -> Result<(), String> {
        check_script(contents)
    }
}

fn check_script(contents: &str) -> Result<(), String> {
    let chars: Vec<char> = contents.chars().collect();
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut last_significant: Option<char> = None;
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && next == Some('*') {
            let start_line = line;
            i += 2;
            loop {
                match chars.get(i).copied() {
                    None => return Err(format!("unterminated comment from line {start_line}")),
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
                i += 1;
            }
            continue;
        }

        if matches!(c, '"' | '\'' | '`') {
            let start_line = line;
            i += 1;
            loop {
                match chars.get(i).copied() {
                    None => return Err(format!("unterminated string from line {start_line}")),
                    Some('\\') => i += 1,
                    Some('\n') => line += 1,
                    Some(q) if q == c => break,
                    Some(_) => {}
                }
                i += 1;
            }
            i += 1;
            last_significant = Some(c);
            continue;
        }

        if matches!(c, '}' | ',') && last_significant == Some(':') {
            return Err(format!("missing value after ':' on line {line}"));
        }

        match c {
            '(' | '{' | '[' => open.push((c, line)),
            ')' | '}' | ']' => {
                let expected = match c {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                match open.pop() {
                    Some((o, _)) if o == expected => {}
                    _ => return Err(format!("unexpected '{c}' on line {line}")),
                }
            }
            _ => {}
        }

        last_significant = Some(c);
        i += 1;
    }

    match open.pop() {
        Some((o, l)) => Err(format!("unclosed '{o}' from line {l}")),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Instantiation
// ---------------------------------------------------------------------------

/// Instantiation-time checks: abstract components need a provider, and
/// every required attribute needs a value from the caller, an `aura:set`
/// or a default.
pub fn instantiate(
    def: &Definition,
    supplied: &BTreeMap<String, Value>,
) -> Result<ComponentInstance, DefinitionError> {
    if def.is_abstract && def.provider_descriptors.is_empty() {
        return Err(DefinitionError::invalid(
            &def.descriptor,
            "cannot be instantiated directly",
        ));
    }

    let mut attributes: BTreeMap<String, Value> = BTreeMap::new();

    for (name, value) in supplied {
        match def.attribute_def(name) {
            Some(attr) => {
                if attr.type_name.eq_ignore_ascii_case("boolean") && !value.is_boolean() {
                    return Err(DefinitionError::invalid(
                        &def.descriptor,
                        format!("attribute '{name}' expects a Boolean value"),
                    ));
                }
            }
            None if def.registered_events.contains_key(name) => {}
            None => {
                return Err(DefinitionError::invalid(
                    &def.descriptor,
                    format!("unknown attribute '{name}'"),
                ));
            }
        }
        attributes.insert(name.clone(), value.clone());
    }

    for (name, attr) in &def.attribute_defs {
        if attributes.contains_key(name) {
            continue;
        }
        let declared = def
            .attribute_values
            .get(name)
            .or(attr.default_value.as_ref());
        match declared {
            Some(value) => {
                attributes.insert(name.clone(), typed_value(&attr.type_name, value));
            }
            None if attr.required => {
                return Err(DefinitionError::invalid(
                    &def.descriptor,
                    format!("missing required attribute '{name}'"),
                ));
            }
            None => {}
        }
    }

    Ok(ComponentInstance {
        descriptor: def.descriptor.clone(),
        provided_by: def.provider_descriptors.first().cloned(),
        attributes,
    })
}

/// Convert a declared value to JSON according to the attribute type.
/// Expressions are kept verbatim as strings.
pub fn typed_value(type_name: &str, value: &AttributeValue) -> Value {
    let raw = match value {
        AttributeValue::Expression(expr) => return Value::String(format!("{{!{expr}}}")),
        AttributeValue::Literal(raw) => raw,
    };
    let lower = type_name.trim().to_ascii_lowercase();

    if lower.ends_with("[]") || lower == "list" || lower == "set" {
        return Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        );
    }

    let trimmed = raw.trim();
    match lower.as_str() {
        "boolean" => Value::Bool(trimmed.eq_ignore_ascii_case("true")),
        "integer" | "long" => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.clone())),
        "decimal" | "double" => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.clone())),
        _ => Value::String(raw.clone()),
    }
}
