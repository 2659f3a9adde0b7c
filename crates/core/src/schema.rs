//! Schemas: named structural contracts for structured data.
//!
//! A [`Schema`] is plain data: a name, a description and an ordered list of
//! [`FieldSpec`]s. Schemas are registered once in a [`SchemaRegistry`] and
//! referenced by name everywhere else (tool inputs/outputs, response unions,
//! the reasoning step). Identity is by name, never by structure.
//!
//! Validation is total: it walks the whole value, collects every violation
//! it finds, and either returns a fully validated copy or fails with all of
//! them. The input is never mutated; the only representation changes are
//! coercions a field explicitly declares.

use crate::error::{Constraint, SchemaError, Violation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// The type of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "of")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any non-null JSON value.
    Any,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
    /// A sequence whose every element conforms to the inner type.
    Array(Box<FieldType>),
    /// A nested object conforming to the named, registered schema.
    Object(String),
}

impl FieldType {
    pub fn array(inner: FieldType) -> Self {
        Self::Array(Box::new(inner))
    }

    pub fn object(schema: impl Into<String>) -> Self {
        Self::Object(schema.into())
    }

    /// Human-readable name used in diagnostics.
    pub fn label(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Integer => "integer".into(),
            Self::Number => "number".into(),
            Self::Boolean => "boolean".into(),
            Self::Any => "any".into(),
            Self::Enum(_) => "string".into(),
            Self::Array(inner) => format!("array<{}>", inner.label()),
            Self::Object(name) => format!("object<{name}>"),
        }
    }

    /// Every schema name this type (transitively through arrays) points at.
    fn references(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            Self::Array(inner) => inner.references(),
            _ => None,
        }
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Whether scalar representations may be converted (e.g. `"4"` → `4`).
    #[serde(default)]
    pub coercible: bool,
    /// Minimum element count for an array field. Applies to the field's own
    /// array, not to arrays nested inside it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: String::new(),
            coercible: false,
            min_items: None,
        }
    }

    /// A field that may be omitted.
    ///
    /// An explicit `null` counts as omitted: it is accepted whatever the
    /// declared type and kept as `null` in the validated copy.
    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn coercible(mut self) -> Self {
        self.coercible = true;
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }
}

/// A named structural contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Strict schemas reject fields they do not declare.
    #[serde(default)]
    pub strict: bool,
}

impl Schema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
            strict: false,
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The registry of known schemas.
///
/// Registration order is preserved for listing. Once handed to sessions
/// (behind an `Arc`) the registry is read-only and safe to share.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<Schema>>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema.
    ///
    /// Fails if the name is taken, or if a field references a schema that is
    /// neither registered yet nor the schema itself.
    pub fn register(&mut self, schema: Schema) -> Result<(), SchemaError> {
        if self.index.contains_key(&schema.name) {
            return Err(SchemaError::Duplicate(schema.name));
        }
        for field in &schema.fields {
            if let Some(reference) = field.ty.references() {
                if reference != schema.name && !self.index.contains_key(reference) {
                    return Err(SchemaError::UnresolvedReference {
                        schema: schema.name.clone(),
                        field: field.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }
        tracing::debug!(schema = %schema.name, fields = schema.fields.len(), "Registered schema");
        self.index.insert(schema.name.clone(), self.schemas.len());
        self.schemas.push(Arc::new(schema));
        Ok(())
    }

    /// Register a schema unless an identical one is already present.
    ///
    /// A *different* schema under the same name is still a duplicate.
    pub fn register_or_match(&mut self, schema: Schema) -> Result<(), SchemaError> {
        match self.get(&schema.name) {
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(SchemaError::Duplicate(schema.name)),
            None => self.register(schema),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.index.get(name).map(|&i| self.schemas[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a schema, failing fast if it was never registered.
    pub fn require(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::NotRegistered(name.to_string()))
    }

    /// Schema names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validate `raw` against the named schema.
    ///
    /// Returns a validated copy (with declared coercions applied) or every
    /// violation found.
    pub fn validate(&self, name: &str, raw: &Value) -> Result<Value, SchemaError> {
        let schema = self.require(name)?;
        let mut violations = Vec::new();
        let validated = self.check_object(schema, raw, "", &mut violations);
        if violations.is_empty() {
            Ok(validated)
        } else {
            Err(SchemaError::Validation {
                schema: name.to_string(),
                violations,
            })
        }
    }

    fn check_object(
        &self,
        schema: &Schema,
        raw: &Value,
        path: &str,
        violations: &mut Vec<Violation>,
    ) -> Value {
        let Some(object) = raw.as_object() else {
            violations.push(Violation::new(
                path,
                Constraint::Type {
                    expected: "object".into(),
                    found: json_type(raw).into(),
                },
            ));
            return raw.clone();
        };

        let mut out = Map::new();
        for field in &schema.fields {
            let field_path = join_path(path, &field.name);
            match object.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    violations.push(Violation::new(field_path, Constraint::Required));
                }
                None => {}
                // Optional and explicitly null.
                Some(Value::Null) => {
                    out.insert(field.name.clone(), Value::Null);
                }
                Some(value) => {
                    let checked = self.check_value(
                        &field.ty,
                        field.coercible,
                        field.min_items,
                        value,
                        &field_path,
                        violations,
                    );
                    out.insert(field.name.clone(), checked);
                }
            }
        }

        for (key, value) in object {
            if schema.get_field(key).is_some() {
                continue;
            }
            if schema.strict {
                violations.push(Violation::new(join_path(path, key), Constraint::UnknownField));
            } else {
                out.insert(key.clone(), value.clone());
            }
        }

        Value::Object(out)
    }

    fn check_value(
        &self,
        ty: &FieldType,
        coercible: bool,
        min_items: Option<usize>,
        value: &Value,
        path: &str,
        violations: &mut Vec<Violation>,
    ) -> Value {
        let mismatch = |violations: &mut Vec<Violation>| {
            violations.push(Violation::new(
                path,
                Constraint::Type {
                    expected: ty.label(),
                    found: json_type(value).into(),
                },
            ));
            value.clone()
        };

        match (ty, value) {
            (FieldType::Any, _) => value.clone(),
            (FieldType::String, Value::String(_)) => value.clone(),
            (FieldType::String, Value::Number(n)) if coercible => Value::String(n.to_string()),
            (FieldType::String, Value::Bool(b)) if coercible => Value::String(b.to_string()),

            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => value.clone(),
            (FieldType::Integer, Value::Number(n)) if coercible => {
                match n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15) {
                    Some(f) => Value::from(f as i64),
                    None => coercion_failed(path, "integer", value, violations),
                }
            }
            (FieldType::Integer, Value::String(s)) if coercible => {
                match s.trim().parse::<i64>() {
                    Ok(i) => Value::from(i),
                    Err(_) => coercion_failed(path, "integer", value, violations),
                }
            }

            (FieldType::Number, Value::Number(_)) => value.clone(),
            (FieldType::Number, Value::String(s)) if coercible => {
                match s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => coercion_failed(path, "number", value, violations),
                }
            }

            (FieldType::Boolean, Value::Bool(_)) => value.clone(),
            (FieldType::Boolean, Value::String(s)) if coercible => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => coercion_failed(path, "boolean", value, violations),
                }
            }

            (FieldType::Enum(allowed), Value::String(s)) => {
                if !allowed.iter().any(|a| a == s) {
                    violations.push(Violation::new(
                        path,
                        Constraint::Enum {
                            allowed: allowed.clone(),
                        },
                    ));
                }
                value.clone()
            }

            (FieldType::Array(inner), Value::Array(items)) => {
                if let Some(min) = min_items {
                    if items.len() < min {
                        violations.push(Violation::new(
                            path,
                            Constraint::MinItems {
                                min,
                                found: items.len(),
                            },
                        ));
                    }
                }
                let checked = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let item_path = format!("{path}[{i}]");
                        self.check_value(inner, coercible, None, item, &item_path, violations)
                    })
                    .collect();
                Value::Array(checked)
            }

            (FieldType::Object(reference), Value::Object(_)) => match self.get(reference) {
                Some(nested) => self.check_object(nested, value, path, violations),
                None => {
                    // Only reachable if a schema was constructed around the registry.
                    violations.push(Violation::new(
                        path,
                        Constraint::Type {
                            expected: format!("registered schema {reference}"),
                            found: "object".into(),
                        },
                    ));
                    value.clone()
                }
            },

            _ => mismatch(violations),
        }
    }

    /// Render a registered schema as JSON Schema.
    ///
    /// Nested object references are emitted as `$ref`s into a `$defs` map so
    /// self-referential schemas stay finite.
    pub fn json_schema(&self, name: &str) -> Result<Value, SchemaError> {
        let schema = self.require(name)?;
        let mut root = self.render_object(schema);
        let defs = self.collect_defs(&[name])?;
        if !defs.is_empty() {
            root["$defs"] = Value::Object(defs.into_iter().collect());
        }
        Ok(root)
    }

    /// Render several schemas as one `anyOf` document, in the given order.
    pub fn json_schema_any_of(&self, names: &[&str]) -> Result<Value, SchemaError> {
        let mut members = Vec::with_capacity(names.len());
        for name in names {
            members.push(self.render_object(self.require(name)?));
        }
        let mut root = serde_json::json!({ "anyOf": members });
        let defs = self.collect_defs(names)?;
        if !defs.is_empty() {
            root["$defs"] = Value::Object(defs.into_iter().collect());
        }
        Ok(root)
    }

    fn collect_defs(&self, roots: &[&str]) -> Result<BTreeMap<String, Value>, SchemaError> {
        let mut defs = BTreeMap::new();
        let mut pending: Vec<String> = Vec::new();
        for root in roots {
            for field in &self.require(root)?.fields {
                if let Some(reference) = field.ty.references() {
                    pending.push(reference.to_string());
                }
            }
        }
        while let Some(name) = pending.pop() {
            if defs.contains_key(&name) {
                continue;
            }
            let schema = self.require(&name)?;
            for field in &schema.fields {
                if let Some(reference) = field.ty.references() {
                    pending.push(reference.to_string());
                }
            }
            defs.insert(name, self.render_object(schema));
        }
        Ok(defs)
    }

    fn render_object(&self, schema: &Schema) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &schema.fields {
            let mut property = render_type(&field.ty);
            if !field.description.is_empty() {
                property["description"] = Value::String(field.description.clone());
            }
            if let Some(min) = field.min_items {
                property["minItems"] = Value::from(min);
            }
            properties.insert(field.name.clone(), property);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut object = serde_json::json!({
            "title": schema.name,
            "type": "object",
            "properties": properties,
            "required": required,
        });
        if !schema.description.is_empty() {
            object["description"] = Value::String(schema.description.clone());
        }
        if schema.strict {
            object["additionalProperties"] = Value::Bool(false);
        }
        object
    }
}

fn render_type(ty: &FieldType) -> Value {
    match ty {
        FieldType::String => serde_json::json!({"type": "string"}),
        FieldType::Integer => serde_json::json!({"type": "integer"}),
        FieldType::Number => serde_json::json!({"type": "number"}),
        FieldType::Boolean => serde_json::json!({"type": "boolean"}),
        FieldType::Any => serde_json::json!({}),
        FieldType::Enum(values) => serde_json::json!({"type": "string", "enum": values}),
        FieldType::Array(inner) => serde_json::json!({"type": "array", "items": render_type(inner)}),
        FieldType::Object(name) => serde_json::json!({"$ref": format!("#/$defs/{name}")}),
    }
}

fn coercion_failed(path: &str, target: &str, value: &Value, violations: &mut Vec<Violation>) -> Value {
    violations.push(Violation::new(
        path,
        Constraint::Coercion {
            target: target.into(),
        },
    ));
    value.clone()
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

/// JSON type name of a value, for diagnostics.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("address", "A postal address")
                    .field(FieldSpec::required("city", FieldType::String))
                    .field(FieldSpec::optional("zip", FieldType::String)),
            )
            .unwrap();
        registry
            .register(
                Schema::new("person", "A person")
                    .field(FieldSpec::required("name", FieldType::String))
                    .field(FieldSpec::required("age", FieldType::Integer))
                    .field(FieldSpec::optional("address", FieldType::object("address")))
                    .field(
                        FieldSpec::optional("tags", FieldType::array(FieldType::String))
                            .min_items(1),
                    ),
            )
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry.register(Schema::new("person", "again")).unwrap_err();
        assert_eq!(err, SchemaError::Duplicate("person".into()));
        assert_eq!(registry.names(), vec!["address", "person"]);
    }

    #[test]
    fn register_or_match_accepts_identical_schema() {
        let mut registry = SchemaRegistry::new();
        let schema = Schema::new("reply", "").field(FieldSpec::required("content", FieldType::String));
        registry.register(schema.clone()).unwrap();
        assert!(registry.register_or_match(schema).is_ok());
        let other = Schema::new("reply", "different");
        assert!(matches!(registry.register_or_match(other), Err(SchemaError::Duplicate(_))));
    }

    #[test]
    fn unresolved_reference_fails_at_registration() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register(Schema::new("order", "").field(FieldSpec::required("to", FieldType::object("address"))))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { ref reference, .. } if reference == "address"));
    }

    #[test]
    fn self_reference_is_allowed() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("node", "")
                    .field(FieldSpec::required("value", FieldType::Integer))
                    .field(FieldSpec::optional("children", FieldType::array(FieldType::object("node")))),
            )
            .unwrap();
        let data = json!({"value": 1, "children": [{"value": 2, "children": []}]});
        assert_eq!(registry.validate("node", &data).unwrap(), data);
    }

    #[test]
    fn conforming_data_validates_unchanged() {
        let registry = registry();
        let data = json!({"name": "Ada", "age": 36, "address": {"city": "London"}, "tags": ["math"]});
        assert_eq!(registry.validate("person", &data).unwrap(), data);
    }

    #[test]
    fn unknown_schema_fails_fast() {
        let registry = registry();
        assert_eq!(
            registry.validate("ghost", &json!({})).unwrap_err(),
            SchemaError::NotRegistered("ghost".into())
        );
    }

    #[test]
    fn reports_all_violations_with_paths() {
        let registry = registry();
        let data = json!({"age": "old", "address": {"zip": 1}, "tags": []});
        let err = registry.validate("person", &data).unwrap_err();
        let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"name"));
        assert!(paths.contains(&"age"));
        assert!(paths.contains(&"address.city"));
        assert!(paths.contains(&"address.zip"));
        assert!(paths.contains(&"tags"));
        assert_eq!(err.violations().len(), 5);
    }

    #[test]
    fn list_elements_are_checked() {
        let registry = registry();
        let err = registry
            .validate("person", &json!({"name": "Ada", "age": 1, "tags": ["ok", 3]}))
            .unwrap_err();
        assert_eq!(err.violations()[0].path, "tags[1]");
    }

    #[test]
    fn min_items_applies_only_to_the_declared_array() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("grid", "").field(
                FieldSpec::required("rows", FieldType::array(FieldType::array(FieldType::Integer)))
                    .min_items(1),
            ))
            .unwrap();
        let data = json!({"rows": [[]]});
        assert_eq!(registry.validate("grid", &data).unwrap(), data);

        let err = registry.validate("grid", &json!({"rows": []})).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].path, "rows");
    }

    #[test]
    fn explicit_null_is_accepted_for_optional_fields() {
        let registry = registry();
        let data = json!({"name": "Ada", "age": 36, "address": null, "tags": null});
        assert_eq!(registry.validate("person", &data).unwrap(), data);
    }

    #[test]
    fn null_required_field_is_missing() {
        let registry = registry();
        let err = registry
            .validate("person", &json!({"name": null, "age": 1}))
            .unwrap_err();
        assert_eq!(err.violations()[0].constraint, Constraint::Required);
    }

    #[test]
    fn undeclared_coercion_is_rejected() {
        let registry = registry();
        let err = registry
            .validate("person", &json!({"name": "Ada", "age": "36"}))
            .unwrap_err();
        assert!(matches!(err.violations()[0].constraint, Constraint::Type { .. }));
    }

    #[test]
    fn declared_coercion_converts_without_touching_input() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                Schema::new("calc", "")
                    .field(FieldSpec::required("result", FieldType::Number).coercible())
                    .field(FieldSpec::required("exact", FieldType::Boolean).coercible()),
            )
            .unwrap();
        let raw = json!({"result": "4.5", "exact": "TRUE"});
        let validated = registry.validate("calc", &raw).unwrap();
        assert_eq!(validated, json!({"result": 4.5, "exact": true}));
        assert_eq!(raw["result"], json!("4.5"));

        let err = registry
            .validate("calc", &json!({"result": "four", "exact": true}))
            .unwrap_err();
        assert_eq!(
            err.violations()[0].constraint,
            Constraint::Coercion { target: "number".into() }
        );
    }

    #[test]
    fn strict_schema_rejects_extra_fields() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("reply", "").field(FieldSpec::required("content", FieldType::String)).strict())
            .unwrap();
        let err = registry
            .validate("reply", &json!({"content": "hi", "mood": "happy"}))
            .unwrap_err();
        assert_eq!(err.violations()[0].path, "mood");

        let mut lenient = SchemaRegistry::new();
        lenient
            .register(Schema::new("reply", "").field(FieldSpec::required("content", FieldType::String)))
            .unwrap();
        let data = json!({"content": "hi", "mood": "happy"});
        assert_eq!(lenient.validate("reply", &data).unwrap(), data);
    }

    #[test]
    fn enum_values_are_enforced() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("pick", "").field(FieldSpec::required(
                "color",
                FieldType::Enum(vec!["red".into(), "blue".into()]),
            )))
            .unwrap();
        assert!(registry.validate("pick", &json!({"color": "red"})).is_ok());
        let err = registry.validate("pick", &json!({"color": "green"})).unwrap_err();
        assert!(matches!(err.violations()[0].constraint, Constraint::Enum { .. }));
    }

    #[test]
    fn non_object_root_is_a_type_violation() {
        let registry = registry();
        let err = registry.validate("person", &json!([1, 2])).unwrap_err();
        assert_eq!(err.violations()[0].path, "");
    }

    #[test]
    fn json_schema_uses_defs_for_nested_objects() {
        let registry = registry();
        let schema = registry.json_schema("person").unwrap();
        assert_eq!(schema["title"], "person");
        assert_eq!(schema["required"], json!(["name", "age"]));
        assert_eq!(schema["properties"]["address"]["$ref"], "#/$defs/address");
        assert_eq!(schema["properties"]["tags"]["minItems"], 1);
        assert_eq!(schema["$defs"]["address"]["title"], "address");
    }

    #[test]
    fn json_schema_any_of_preserves_order() {
        let registry = registry();
        let schema = registry.json_schema_any_of(&["person", "address"]).unwrap();
        assert_eq!(schema["anyOf"][0]["title"], "person");
        assert_eq!(schema["anyOf"][1]["title"], "address");
    }
}
