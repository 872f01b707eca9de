//! Compiled schema nodes.
//!
//! Schema documents use a JSON-Schema subset: `type`, `properties`, `required`,
//! `additionalProperties`, `items`, `enum`, `pattern`, `minimum`, `maximum`,
//! `minLength`, `minItems` and local `$ref`s into `$defs`. Two extensions:
//!
//! - `x-aliases`: maps common wrong spellings of an enum value to the canonical one;
//! - `x-variants`: picks the schema of a node from a sibling discriminator field
//!   (the manifest `spec` depends on `kind`).

use crate::error::RegistryError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Primitive JSON types a schema node can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

impl ValueType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "object" => Some(ValueType::Object),
            "array" => Some(ValueType::Array),
            "string" => Some(ValueType::String),
            "number" => Some(ValueType::Number),
            "integer" => Some(ValueType::Integer),
            "boolean" => Some(ValueType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::Object => value.is_object(),
            ValueType::Array => value.is_array(),
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Boolean => value.is_boolean(),
        }
    }
}

/// Policy for object fields not listed in `properties`.
#[derive(Debug, Clone)]
pub enum Additional {
    Forbidden,
    Any,
    Schema(Box<SchemaNode>),
}

/// Discriminated alternatives selected by a sibling field.
#[derive(Debug, Clone)]
pub struct Variants {
    pub discriminator: String,
    pub cases: BTreeMap<String, SchemaNode>,
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub value_type: Option<ValueType>,
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub additional: Additional,
    pub items: Option<Box<SchemaNode>>,
    pub enum_values: Vec<Value>,
    pub aliases: BTreeMap<String, String>,
    pub pattern: Option<Regex>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub min_items: Option<usize>,
    pub variants: Option<Variants>,
}

impl SchemaNode {
    /// A node that accepts any value.
    pub fn any() -> Self {
        Self {
            value_type: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional: Additional::Any,
            items: None,
            enum_values: Vec::new(),
            aliases: BTreeMap::new(),
            pattern: None,
            minimum: None,
            maximum: None,
            min_length: None,
            min_items: None,
            variants: None,
        }
    }

    /// True when the node places no constraint at all on its value.
    pub fn is_unconstrained(&self) -> bool {
        self.value_type.is_none()
            && self.properties.is_empty()
            && self.required.is_empty()
            && self.items.is_none()
            && self.enum_values.is_empty()
            && self.pattern.is_none()
            && self.minimum.is_none()
            && self.maximum.is_none()
            && self.min_length.is_none()
            && self.min_items.is_none()
            && self.variants.is_none()
            && matches!(self.additional, Additional::Any)
    }

    /// Field names accepted at this object node.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Resolve a dotted field path (no indices) through `properties` and `items`.
    pub fn find(&self, path: &str) -> Option<&SchemaNode> {
        path.split('.').try_fold(self, |node, name| {
            let node = match &node.items {
                Some(items) => items.as_ref(),
                None => node,
            };
            node.properties.get(name)
        })
    }
}

/// Compile a schema document into a node tree.
pub(crate) fn compile(document: &Value, version: &str) -> Result<SchemaNode, RegistryError> {
    let empty = Map::new();
    let defs = document
        .get("$defs")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let mut compiler = Compiler {
        defs,
        version,
        resolving: Vec::new(),
    };
    compiler.node(document, "#")
}

struct Compiler<'a> {
    defs: &'a Map<String, Value>,
    version: &'a str,
    resolving: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn invalid(&self, path: &str, message: impl Into<String>) -> RegistryError {
        RegistryError::InvalidSchema {
            version: self.version.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    fn node(&mut self, raw: &Value, path: &str) -> Result<SchemaNode, RegistryError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| self.invalid(path, "schema node must be an object"))?;

        if let Some(reference) = obj.get("$ref") {
            return self.reference(reference, path);
        }

        let mut node = SchemaNode::any();

        if let Some(t) = obj.get("type") {
            let name = t
                .as_str()
                .ok_or_else(|| self.invalid(path, "'type' must be a string"))?;
            node.value_type = Some(
                ValueType::parse(name)
                    .ok_or_else(|| self.invalid(path, format!("unknown type '{}'", name)))?,
            );
        }

        if let Some(props) = obj.get("properties") {
            let props = props
                .as_object()
                .ok_or_else(|| self.invalid(path, "'properties' must be an object"))?;
            for (name, child) in props {
                let child_path = format!("{}/properties/{}", path, name);
                node.properties.insert(name.clone(), self.node(child, &child_path)?);
            }
        }

        if let Some(required) = obj.get("required") {
            let list = required
                .as_array()
                .ok_or_else(|| self.invalid(path, "'required' must be an array"))?;
            for entry in list {
                let name = entry
                    .as_str()
                    .ok_or_else(|| self.invalid(path, "'required' entries must be strings"))?;
                if !node.properties.contains_key(name) {
                    return Err(self.invalid(
                        path,
                        format!("required field '{}' has no property schema", name),
                    ));
                }
                node.required.push(name.to_string());
            }
        }

        match obj.get("additionalProperties") {
            None | Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => node.additional = Additional::Forbidden,
            Some(schema) => {
                let child_path = format!("{}/additionalProperties", path);
                let compiled = self.node(schema, &child_path)?;
                if !compiled.is_unconstrained() {
                    node.additional = Additional::Schema(Box::new(compiled));
                }
            }
        }

        if let Some(items) = obj.get("items") {
            let child_path = format!("{}/items", path);
            node.items = Some(Box::new(self.node(items, &child_path)?));
        }

        if let Some(values) = obj.get("enum") {
            node.enum_values = values
                .as_array()
                .cloned()
                .ok_or_else(|| self.invalid(path, "'enum' must be an array"))?;
        }

        if let Some(aliases) = obj.get("x-aliases") {
            let aliases = aliases
                .as_object()
                .ok_or_else(|| self.invalid(path, "'x-aliases' must be an object"))?;
            for (alias, target) in aliases {
                let target_str = target
                    .as_str()
                    .ok_or_else(|| self.invalid(path, "'x-aliases' values must be strings"))?;
                if !node.enum_values.iter().any(|v| v.as_str() == Some(target_str)) {
                    return Err(self.invalid(
                        path,
                        format!("alias '{}' points at '{}', which is not an enum value", alias, target_str),
                    ));
                }
                node.aliases.insert(alias.clone(), target_str.to_string());
            }
        }

        if let Some(pattern) = obj.get("pattern") {
            let raw_pattern = pattern
                .as_str()
                .ok_or_else(|| self.invalid(path, "'pattern' must be a string"))?;
            node.pattern = Some(
                Regex::new(raw_pattern)
                    .map_err(|e| self.invalid(path, format!("bad pattern: {}", e)))?,
            );
        }

        node.minimum = self.number(obj, "minimum", path)?;
        node.maximum = self.number(obj, "maximum", path)?;
        node.min_length = self.count(obj, "minLength", path)?;
        node.min_items = self.count(obj, "minItems", path)?;

        if let Some(variants) = obj.get("x-variants") {
            node.variants = Some(self.variants(variants, path)?);
        }

        Ok(node)
    }

    fn reference(&mut self, reference: &Value, path: &str) -> Result<SchemaNode, RegistryError> {
        let target = reference
            .as_str()
            .and_then(|r| r.strip_prefix("#/$defs/"))
            .ok_or_else(|| self.invalid(path, "only local '#/$defs/<name>' references are supported"))?;
        if self.resolving.iter().any(|name| name == target) {
            return Err(self.invalid(path, format!("recursive reference to '{}'", target)));
        }
        let definition = self
            .defs
            .get(target)
            .ok_or_else(|| self.invalid(path, format!("undefined reference '{}'", target)))?;
        self.resolving.push(target.to_string());
        let compiled = self.node(definition, &format!("#/$defs/{}", target));
        self.resolving.pop();
        compiled
    }

    fn variants(&mut self, raw: &Value, path: &str) -> Result<Variants, RegistryError> {
        let discriminator = raw
            .get("discriminator")
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(path, "'x-variants' needs a string 'discriminator'"))?
            .to_string();
        let cases_raw = raw
            .get("variants")
            .and_then(Value::as_object)
            .ok_or_else(|| self.invalid(path, "'x-variants' needs a 'variants' object"))?;
        let mut cases = BTreeMap::new();
        for (value, schema) in cases_raw {
            let child_path = format!("{}/x-variants/{}", path, value);
            cases.insert(value.clone(), self.node(schema, &child_path)?);
        }
        Ok(Variants {
            discriminator,
            cases,
        })
    }

    fn number(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<Option<f64>, RegistryError> {
        match obj.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(path, format!("'{}' must be a number", key))),
        }
    }

    fn count(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Result<Option<usize>, RegistryError> {
        match obj.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| self.invalid(path, format!("'{}' must be a non-negative integer", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_resolves_local_refs() {
        let doc = json!({
            "type": "object",
            "properties": {"llm": {"$ref": "#/$defs/llm"}},
            "$defs": {
                "llm": {
                    "type": "object",
                    "required": ["provider"],
                    "properties": {"provider": {"type": "string", "enum": ["anthropic"]}}
                }
            }
        });
        let root = compile(&doc, "test").unwrap();
        let llm = root.properties.get("llm").unwrap();
        assert_eq!(llm.value_type, Some(ValueType::Object));
        assert_eq!(llm.required, vec!["provider".to_string()]);
        assert!(root.find("llm.provider").is_some());
    }

    #[test]
    fn test_compile_rejects_recursive_refs() {
        let doc = json!({
            "$ref": "#/$defs/a",
            "$defs": {"a": {"type": "object", "properties": {"next": {"$ref": "#/$defs/a"}}}}
        });
        let err = compile(&doc, "test").unwrap_err();
        assert!(err.to_string().contains("recursive reference"));
    }

    #[test]
    fn test_compile_rejects_alias_outside_enum() {
        let doc = json!({"type": "string", "enum": ["a"], "x-aliases": {"b": "c"}});
        assert!(compile(&doc, "test").is_err());
    }

    #[test]
    fn test_compile_rejects_required_without_property() {
        let doc = json!({"type": "object", "required": ["role"], "properties": {}});
        assert!(compile(&doc, "test").is_err());
    }

    #[test]
    fn test_empty_schema_is_unconstrained() {
        let node = compile(&json!({}), "test").unwrap();
        assert!(node.is_unconstrained());
    }

    #[test]
    fn test_integer_type_rejects_fractions() {
        assert!(ValueType::Integer.matches(&json!(3)));
        assert!(!ValueType::Integer.matches(&json!(3.5)));
        assert!(ValueType::Number.matches(&json!(3)));
    }
}
