//! Depth-first schema walk.
//!
//! Order at an object node: type, then missing required fields in declaration order,
//! then instance fields sorted by key. Array items go in index order. Fail-fast mode
//! stops at the first error, so its result is always a prefix of the progressive one.

use super::errors::{ErrorKind, ValidationError};
use super::suggest;
use super::ValidationMode;
use crate::manifest::{value_type_name, FieldPath};
use crate::schema::{Additional, SchemaNode};
use serde_json::{Map, Value};

pub(super) struct Walker {
    mode: ValidationMode,
    max_depth: usize,
    errors: Vec<ValidationError>,
}

impl Walker {
    pub(super) fn new(mode: ValidationMode, max_depth: usize) -> Self {
        Self {
            mode,
            max_depth,
            errors: Vec::new(),
        }
    }

    pub(super) fn finish(self) -> Vec<ValidationError> {
        self.errors
    }

    fn done(&self) -> bool {
        self.mode == ValidationMode::FailFast && !self.errors.is_empty()
    }

    fn push(&mut self, error: ValidationError) {
        if !self.done() {
            self.errors.push(error);
        }
    }

    fn too_deep(&mut self, path: &FieldPath) -> bool {
        if path.depth() > self.max_depth {
            self.push(ValidationError::new(
                path.clone(),
                ErrorKind::StructureTooDeep,
                format!("nesting exceeds the maximum depth of {}", self.max_depth),
            ));
            return true;
        }
        false
    }

    pub(super) fn node(&mut self, schema: &SchemaNode, value: &Value, path: &FieldPath) {
        if self.done() || self.too_deep(path) {
            return;
        }
        if schema.is_unconstrained() {
            self.free(value, path);
            return;
        }

        if let Some(expected) = schema.value_type {
            if !expected.matches(value) {
                self.push(
                    ValidationError::new(
                        path.clone(),
                        ErrorKind::TypeMismatch,
                        format!("expected {}, found {}", expected.as_str(), value_type_name(value)),
                    )
                    .with_actual(value),
                );
                return;
            }
        }

        if !schema.enum_values.is_empty() && !schema.enum_values.contains(value) {
            self.enum_violation(schema, value, path);
            return;
        }

        match value {
            Value::String(s) => self.string(schema, s, value, path),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    self.number(schema, n, value, path);
                }
            }
            Value::Object(map) => self.object(schema, map, path),
            Value::Array(items) => self.array(schema, items, value, path),
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn enum_violation(&mut self, schema: &SchemaNode, value: &Value, path: &FieldPath) {
        let allowed: Vec<&str> = schema.enum_values.iter().filter_map(Value::as_str).collect();
        let suggestion = value
            .as_str()
            .and_then(|s| suggest::enum_value(s, &schema.aliases, &allowed));
        let listed = schema
            .enum_values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.push(
            ValidationError::new(
                path.clone(),
                ErrorKind::EnumViolation,
                format!("value {} is not one of: {}", value, listed),
            )
            .with_suggestion(suggestion)
            .with_actual(value),
        );
    }

    fn string(&mut self, schema: &SchemaNode, s: &str, value: &Value, path: &FieldPath) {
        if let Some(min) = schema.min_length {
            if s.chars().count() < min {
                self.push(
                    ValidationError::new(
                        path.clone(),
                        ErrorKind::RangeViolation,
                        format!("value {} is shorter than {} characters", value, min),
                    )
                    .with_actual(value),
                );
                return;
            }
        }
        if let Some(pattern) = &schema.pattern {
            if !pattern.is_match(s) {
                self.push(
                    ValidationError::new(
                        path.clone(),
                        ErrorKind::PatternViolation,
                        format!("value {} does not match pattern '{}'", value, pattern.as_str()),
                    )
                    .with_actual(value),
                );
            }
        }
    }

    fn number(&mut self, schema: &SchemaNode, n: f64, value: &Value, path: &FieldPath) {
        let message = match (schema.minimum, schema.maximum) {
            (Some(min), _) if n < min => format!("value {} is below the minimum of {}", value, min),
            (_, Some(max)) if n > max => format!("value {} is above the maximum of {}", value, max),
            _ => return,
        };
        self.push(
            ValidationError::new(path.clone(), ErrorKind::RangeViolation, message).with_actual(value),
        );
    }

    fn object(&mut self, schema: &SchemaNode, map: &Map<String, Value>, path: &FieldPath) {
        for name in &schema.required {
            if self.done() {
                return;
            }
            if !map.contains_key(name) {
                self.push(ValidationError::new(
                    path.field(name),
                    ErrorKind::MissingRequired,
                    format!("required field '{}' is missing", name),
                ));
            }
        }

        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            if self.done() {
                return;
            }
            let child = &map[key.as_str()];
            let child_path = path.field(key);
            match schema.properties.get(key.as_str()) {
                Some(property) => match &property.variants {
                    Some(variants) => {
                        let case = map
                            .get(&variants.discriminator)
                            .and_then(Value::as_str)
                            .and_then(|d| variants.cases.get(d));
                        // An unknown discriminator is reported on the discriminator itself.
                        if let Some(case) = case {
                            self.node(case, child, &child_path);
                        }
                    }
                    None => self.node(property, child, &child_path),
                },
                None => match &schema.additional {
                    Additional::Forbidden => {
                        let suggestion = suggest::closest(key, schema.property_names());
                        self.push(
                            ValidationError::new(
                                child_path,
                                ErrorKind::UnknownField,
                                format!("unknown field '{}'", key),
                            )
                            .with_suggestion(suggestion),
                        );
                    }
                    Additional::Any => self.free(child, &child_path),
                    Additional::Schema(entry) => self.node(entry, child, &child_path),
                },
            }
        }
    }

    fn array(&mut self, schema: &SchemaNode, items: &[Value], value: &Value, path: &FieldPath) {
        if let Some(min) = schema.min_items {
            if items.len() < min {
                self.push(
                    ValidationError::new(
                        path.clone(),
                        ErrorKind::RangeViolation,
                        format!("expected at least {} item(s), found {}", min, items.len()),
                    )
                    .with_actual(value),
                );
            }
        }
        for (idx, item) in items.iter().enumerate() {
            if self.done() {
                return;
            }
            let item_path = path.index(idx);
            match &schema.items {
                Some(item_schema) => self.node(item_schema, item, &item_path),
                None => self.free(item, &item_path),
            }
        }
    }

    /// Free-form values are not checked, only measured.
    fn free(&mut self, value: &Value, path: &FieldPath) {
        if self.done() || self.too_deep(path) {
            return;
        }
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    self.free(&map[key.as_str()], &path.field(key));
                }
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.free(item, &path.index(idx));
                }
            }
            _ => {}
        }
    }
}
