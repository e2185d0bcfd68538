use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::{SchemaError, Violation};
use crate::pointer::{self, Pointer};

const TYPE_NAMES: &[&str] = &["null", "boolean", "object", "array", "number", "integer", "string"];

/// Draft-07 keywords understood by [`Schema`]. A schema using anything
/// else fails to compile.
const KEYWORDS: &[&str] = &[
    // core and annotations
    "$schema", "$id", "$ref", "$comment", "definitions", "$defs", "title", "description",
    "default", "examples", "readOnly", "writeOnly", "contentMediaType", "contentEncoding",
    // any instance
    "type", "enum", "const", "allOf", "anyOf", "oneOf", "not", "if", "then", "else",
    // numbers
    "minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf",
    // strings
    "minLength", "maxLength", "pattern",
    // arrays
    "items", "additionalItems", "minItems", "maxItems", "uniqueItems", "contains",
    // objects
    "properties", "patternProperties", "additionalProperties", "required", "minProperties",
    "maxProperties", "propertyNames", "dependencies",
];

/// Bound on `$ref` hops taken without descending into the instance.
const MAX_REF_DEPTH: usize = 64;

/// Outcome of an advisory validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    /// First violation, rendered for humans. `None` when valid.
    pub diagnostic: Option<String>,
}

/// A compiled JSON Schema (draft-07 validation vocabulary, local `$ref`s).
#[derive(Debug, Clone)]
pub struct Schema {
    root: Value,
    patterns: HashMap<String, Regex>,
}

impl Schema {
    /// Compile `root`, rejecting unsupported keywords, malformed keyword
    /// values, bad regexes and dangling `$ref`s up front.
    pub fn from_json(root: Value) -> Result<Self, SchemaError> {
        let mut patterns = HashMap::new();
        let mut path = Pointer::root();
        compile(&root, &root, &mut path, &mut patterns)?;
        Ok(Schema { root, patterns })
    }

    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Self::from_json(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Check `instance`, stopping at the first violation.
    ///
    /// `format` is not supported; `$ref` must point into the same document.
    /// Numbers compare by value, so `1` and `1.0` are equal for `enum`,
    /// `const` and `uniqueItems`.
    pub fn check(&self, instance: &Value) -> Result<(), Violation> {
        let mut path = Pointer::root();
        self.check_at(&self.root, instance, &mut path, 0)
    }

    pub fn validate(&self, instance: &Value) -> Validation {
        match self.check(instance) {
            Ok(()) => Validation {
                valid: true,
                diagnostic: None,
            },
            Err(violation) => {
                log::debug!("schema violation {}", violation);
                Validation {
                    valid: false,
                    diagnostic: Some(violation.to_string()),
                }
            }
        }
    }

    fn check_at(
        &self,
        schema: &Value,
        instance: &Value,
        path: &mut Pointer,
        ref_depth: usize,
    ) -> Result<(), Violation> {
        let keywords = match schema {
            Value::Bool(true) => return Ok(()),
            Value::Bool(false) => return Err(Violation::new(path.render(), "no value here")),
            Value::Object(map) => map,
            _ => return Ok(()),
        };

        if let Some(Value::String(reference)) = keywords.get("$ref") {
            if ref_depth >= MAX_REF_DEPTH {
                return Err(Violation::new(
                    path.render(),
                    format!("`{}` to resolve without looping", reference),
                ));
            }
            // Dangling refs were rejected when the schema was compiled.
            let Some(target) = resolve(&self.root, reference) else {
                return Ok(());
            };
            return self.check_at(target, instance, path, ref_depth + 1);
        }

        if let Some(types) = keywords.get("type") {
            let names = type_names(types);
            if !names.iter().any(|name| has_type(instance, name)) {
                return Err(Violation::new(
                    path.render(),
                    format!("{}, found {}", names.join(" or "), type_of(instance)),
                ));
            }
        }

        if let Some(Value::Array(options)) = keywords.get("enum") {
            if !options.iter().any(|option| json_equal(option, instance)) {
                let listed: Vec<String> = options.iter().map(Value::to_string).collect();
                return Err(Violation::new(
                    path.render(),
                    format!("one of [{}]", listed.join(", ")),
                ));
            }
        }
        if let Some(constant) = keywords.get("const") {
            if !json_equal(constant, instance) {
                return Err(Violation::new(path.render(), format!("constant {}", constant)));
            }
        }

        match instance {
            Value::String(s) => self.check_string(keywords, s, path)?,
            Value::Number(n) => check_number(keywords, n, path)?,
            Value::Array(items) => self.check_array(keywords, items, path)?,
            Value::Object(map) => {
                self.check_object(keywords, map, path)?;
                self.check_dependencies(keywords, map, instance, path, ref_depth)?;
            }
            _ => {}
        }

        self.check_combinators(keywords, instance, path, ref_depth)
    }

    fn check_string(&self, keywords: &Map<String, Value>, s: &str, path: &Pointer) -> Result<(), Violation> {
        let len = s.chars().count();
        if let Some(min) = keywords.get("minLength").and_then(Value::as_u64) {
            if (len as u64) < min {
                return Err(Violation::new(path.render(), format!("a string of at least {} character(s)", min)));
            }
        }
        if let Some(max) = keywords.get("maxLength").and_then(Value::as_u64) {
            if (len as u64) > max {
                return Err(Violation::new(path.render(), format!("a string of at most {} character(s)", max)));
            }
        }
        if let Some(Value::String(pattern)) = keywords.get("pattern") {
            if let Some(re) = self.patterns.get(pattern) {
                if !re.is_match(s) {
                    return Err(Violation::new(path.render(), format!("a string matching /{}/", pattern)));
                }
            }
        }
        Ok(())
    }

    fn check_array(
        &self,
        keywords: &Map<String, Value>,
        items: &[Value],
        path: &mut Pointer,
    ) -> Result<(), Violation> {
        if let Some(min) = keywords.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                return Err(Violation::new(path.render(), format!("at least {} item(s)", min)));
            }
        }
        if let Some(max) = keywords.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                return Err(Violation::new(path.render(), format!("at most {} item(s)", max)));
            }
        }
        if keywords.get("uniqueItems") == Some(&Value::Bool(true)) {
            for (i, item) in items.iter().enumerate() {
                if let Some(j) = items[..i].iter().position(|earlier| json_equal(earlier, item)) {
                    return Err(Violation::new(
                        path.render(),
                        format!("unique items, but items {} and {} are equal", j, i),
                    ));
                }
            }
        }

        match keywords.get("items") {
            Some(Value::Array(tuple)) => {
                for (i, (item, schema)) in items.iter().zip(tuple).enumerate() {
                    self.check_child(schema, item, path, i.to_string())?;
                }
                if let Some(additional) = keywords.get("additionalItems") {
                    for (i, item) in items.iter().enumerate().skip(tuple.len()) {
                        if additional == &Value::Bool(false) {
                            return Err(Violation::new(
                                path.render(),
                                format!("at most {} item(s) (additional items are not allowed)", tuple.len()),
                            ));
                        }
                        self.check_child(additional, item, path, i.to_string())?;
                    }
                }
            }
            Some(schema) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_child(schema, item, path, i.to_string())?;
                }
            }
            None => {}
        }

        if let Some(contains) = keywords.get("contains") {
            let mut scratch = path.clone();
            let found = items
                .iter()
                .any(|item| self.check_at(contains, item, &mut scratch, 0).is_ok());
            if !found {
                return Err(Violation::new(path.render(), "at least one item matching `contains`"));
            }
        }
        Ok(())
    }

    fn check_object(
        &self,
        keywords: &Map<String, Value>,
        map: &Map<String, Value>,
        path: &mut Pointer,
    ) -> Result<(), Violation> {
        if let Some(Value::Array(required)) = keywords.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !map.contains_key(name) {
                    return Err(Violation::new(path.render(), format!("required property `{}`", name)));
                }
            }
        }
        if let Some(min) = keywords.get("minProperties").and_then(Value::as_u64) {
            if (map.len() as u64) < min {
                return Err(Violation::new(path.render(), format!("at least {} propert(y/ies)", min)));
            }
        }
        if let Some(max) = keywords.get("maxProperties").and_then(Value::as_u64) {
            if (map.len() as u64) > max {
                return Err(Violation::new(path.render(), format!("at most {} propert(y/ies)", max)));
            }
        }

        let properties = keywords.get("properties").and_then(Value::as_object);
        let pattern_properties = keywords.get("patternProperties").and_then(Value::as_object);
        let additional = keywords.get("additionalProperties");
        let property_names = keywords.get("propertyNames");

        for (name, value) in map {
            if let Some(schema) = property_names {
                let key = Value::String(name.clone());
                path.push(name.clone());
                let result = self.check_at(schema, &key, path, 0);
                path.pop();
                result.map_err(|v| Violation::new(v.path, format!("a property name that is {}", v.expected)))?;
            }

            let mut matched = false;
            if let Some(schema) = properties.and_then(|p| p.get(name)) {
                matched = true;
                self.check_child(schema, value, path, name.clone())?;
            }
            if let Some(patterns) = pattern_properties {
                for (pattern, schema) in patterns {
                    if self.patterns.get(pattern).is_some_and(|re| re.is_match(name)) {
                        matched = true;
                        self.check_child(schema, value, path, name.clone())?;
                    }
                }
            }
            if matched {
                continue;
            }
            match additional {
                Some(Value::Bool(false)) => {
                    return Err(Violation::new(
                        path.render(),
                        format!("no property `{}` (additional properties are not allowed)", name),
                    ));
                }
                Some(schema @ Value::Object(_)) => {
                    self.check_child(schema, value, path, name.clone())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_dependencies(
        &self,
        keywords: &Map<String, Value>,
        map: &Map<String, Value>,
        instance: &Value,
        path: &mut Pointer,
        ref_depth: usize,
    ) -> Result<(), Violation> {
        let Some(Value::Object(dependencies)) = keywords.get("dependencies") else {
            return Ok(());
        };
        for (name, dependency) in dependencies {
            if !map.contains_key(name) {
                continue;
            }
            match dependency {
                Value::Array(needed) => {
                    for other in needed.iter().filter_map(Value::as_str) {
                        if !map.contains_key(other) {
                            return Err(Violation::new(
                                path.render(),
                                format!("property `{}` alongside `{}`", other, name),
                            ));
                        }
                    }
                }
                schema => self.check_at(schema, instance, path, ref_depth)?,
            }
        }
        Ok(())
    }

    fn check_combinators(
        &self,
        keywords: &Map<String, Value>,
        instance: &Value,
        path: &mut Pointer,
        ref_depth: usize,
    ) -> Result<(), Violation> {
        if let Some(Value::Array(all)) = keywords.get("allOf") {
            for schema in all {
                self.check_at(schema, instance, path, ref_depth)?;
            }
        }
        if let Some(Value::Array(any)) = keywords.get("anyOf") {
            let mut first_failure = None;
            let mut passed = false;
            for schema in any {
                match self.check_at(schema, instance, path, ref_depth) {
                    Ok(()) => {
                        passed = true;
                        break;
                    }
                    Err(v) => {
                        first_failure.get_or_insert(v);
                    }
                }
            }
            if !passed && !any.is_empty() {
                let detail = first_failure.map(|v| format!(" (first option: {})", v)).unwrap_or_default();
                return Err(Violation::new(
                    path.render(),
                    format!("a value matching at least one anyOf option{}", detail),
                ));
            }
        }
        if let Some(Value::Array(one)) = keywords.get("oneOf") {
            let matches = one
                .iter()
                .filter(|schema| self.check_at(schema, instance, path, ref_depth).is_ok())
                .count();
            if matches != 1 {
                return Err(Violation::new(
                    path.render(),
                    format!("a value matching exactly one oneOf option, matched {}", matches),
                ));
            }
        }
        if let Some(not) = keywords.get("not") {
            if self.check_at(not, instance, path, ref_depth).is_ok() {
                return Err(Violation::new(path.render(), "a value not matching the `not` schema"));
            }
        }
        if let Some(condition) = keywords.get("if") {
            let branch = if self.check_at(condition, instance, path, ref_depth).is_ok() {
                keywords.get("then")
            } else {
                keywords.get("else")
            };
            if let Some(schema) = branch {
                self.check_at(schema, instance, path, ref_depth)?;
            }
        }
        Ok(())
    }

    fn check_child(
        &self,
        schema: &Value,
        instance: &Value,
        path: &mut Pointer,
        segment: String,
    ) -> Result<(), Violation> {
        path.push(segment);
        // Descending into the instance makes progress, so the ref budget resets.
        let result = self.check_at(schema, instance, path, 0);
        path.pop();
        result
    }
}

fn check_number(keywords: &Map<String, Value>, number: &Number, path: &Pointer) -> Result<(), Violation> {
    let n = number.as_f64().unwrap_or(f64::NAN);
    let bound = |name: &str| keywords.get(name).and_then(Value::as_f64);

    if let Some(min) = bound("minimum") {
        if n < min {
            return Err(Violation::new(path.render(), format!("a number >= {}", min)));
        }
    }
    if let Some(max) = bound("maximum") {
        if n > max {
            return Err(Violation::new(path.render(), format!("a number <= {}", max)));
        }
    }
    if let Some(min) = bound("exclusiveMinimum") {
        if n <= min {
            return Err(Violation::new(path.render(), format!("a number > {}", min)));
        }
    }
    if let Some(max) = bound("exclusiveMaximum") {
        if n >= max {
            return Err(Violation::new(path.render(), format!("a number < {}", max)));
        }
    }
    if let Some(divisor) = bound("multipleOf") {
        if !is_multiple(number, n, divisor) {
            return Err(Violation::new(path.render(), format!("a multiple of {}", divisor)));
        }
    }
    Ok(())
}

fn is_multiple(number: &Number, n: f64, divisor: f64) -> bool {
    if let (Some(n), Some(d)) = (number.as_i64(), (divisor.fract() == 0.0).then_some(divisor as i64)) {
        if d != 0 {
            return n % d == 0;
        }
    }
    let quotient = n / divisor;
    quotient.is_finite() && (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
}

/// JSON equality where numbers compare by value.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

fn type_names(types: &Value) -> Vec<&str> {
    match types {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn has_type(instance: &Value, name: &str) -> bool {
    match (name, instance) {
        ("null", Value::Null) => true,
        ("boolean", Value::Bool(_)) => true,
        ("object", Value::Object(_)) => true,
        ("array", Value::Array(_)) => true,
        ("string", Value::String(_)) => true,
        ("number", Value::Number(_)) => true,
        ("integer", Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

fn type_of(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
    }
}

/// Resolve a local `#/...` reference against the schema root.
fn resolve<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    let mut node = root;
    for segment in pointer::segments(pointer) {
        node = match node {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn malformed(path: &Pointer, message: impl Into<String>) -> SchemaError {
    SchemaError::Malformed {
        path: path.render(),
        message: message.into(),
    }
}

/// Walk every subschema once, validating what can go wrong before any
/// instance is seen.
fn compile(
    root: &Value,
    schema: &Value,
    path: &mut Pointer,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    let keywords = match schema {
        Value::Bool(_) => return Ok(()),
        Value::Object(map) => map,
        _ => return Err(malformed(path, "a schema must be an object or a boolean")),
    };

    for (keyword, value) in keywords {
        if !KEYWORDS.contains(&keyword.as_str()) {
            return Err(SchemaError::UnsupportedKeyword {
                path: path.render(),
                keyword: keyword.clone(),
            });
        }
        path.push(keyword.clone());
        let result = compile_keyword(root, keyword, value, path, patterns);
        path.pop();
        result?;
    }
    Ok(())
}

/// Check one keyword's value; `path` already ends with the keyword.
fn compile_keyword(
    root: &Value,
    keyword: &str,
    value: &Value,
    path: &mut Pointer,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    match keyword {
        "$ref" => {
            let reference = value
                .as_str()
                .ok_or_else(|| malformed(path, "$ref must be a string"))?;
            if resolve(root, reference).is_none() {
                return Err(SchemaError::UnresolvedRef {
                    path: path.render(),
                    reference: reference.to_string(),
                });
            }
        }
        "type" => {
            if !matches!(value, Value::String(_) | Value::Array(_)) {
                return Err(malformed(path, "type must be a string or an array of strings"));
            }
            for name in type_names(value) {
                if !TYPE_NAMES.contains(&name) {
                    return Err(SchemaError::UnknownType {
                        path: path.render(),
                        name: name.to_string(),
                    });
                }
            }
        }
        "pattern" => {
            let pattern = value
                .as_str()
                .ok_or_else(|| malformed(path, "pattern must be a string"))?;
            add_pattern(pattern, path, patterns)?;
        }
        "patternProperties" => {
            let map = value
                .as_object()
                .ok_or_else(|| malformed(path, "patternProperties must be an object"))?;
            for pattern in map.keys() {
                add_pattern(pattern, path, patterns)?;
            }
            compile_map(root, map, path, patterns)?;
        }
        "properties" | "definitions" | "$defs" => {
            let map = value
                .as_object()
                .ok_or_else(|| malformed(path, format!("{} must be an object", keyword)))?;
            compile_map(root, map, path, patterns)?;
        }
        "allOf" | "anyOf" | "oneOf" => match value {
            Value::Array(list) if !list.is_empty() => compile_list(root, list, path, patterns)?,
            _ => return Err(malformed(path, format!("{} must be a non-empty array", keyword))),
        },
        "items" => match value {
            Value::Array(list) => compile_list(root, list, path, patterns)?,
            schema => compile(root, schema, path, patterns)?,
        },
        "not" | "if" | "then" | "else" | "contains" | "propertyNames" | "additionalItems"
        | "additionalProperties" => compile(root, value, path, patterns)?,
        "dependencies" => {
            let map = value
                .as_object()
                .ok_or_else(|| malformed(path, "dependencies must be an object"))?;
            for (name, dependency) in map {
                path.push(name.clone());
                let result = match dependency {
                    Value::Array(names) if names.iter().all(Value::is_string) => Ok(()),
                    Value::Array(_) => Err(malformed(path, "property dependencies must be strings")),
                    schema => compile(root, schema, path, patterns),
                };
                path.pop();
                result?;
            }
        }
        "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" => {
            if !value.is_number() {
                return Err(malformed(path, format!("{} must be a number", keyword)));
            }
        }
        "multipleOf" => {
            if !value.as_f64().is_some_and(|d| d > 0.0) {
                return Err(malformed(path, "multipleOf must be a number greater than 0"));
            }
        }
        "minLength" | "maxLength" | "minItems" | "maxItems" | "minProperties" | "maxProperties" => {
            if value.as_u64().is_none() {
                return Err(malformed(path, format!("{} must be a non-negative integer", keyword)));
            }
        }
        "uniqueItems" | "readOnly" | "writeOnly" => {
            if !value.is_boolean() {
                return Err(malformed(path, format!("{} must be a boolean", keyword)));
            }
        }
        "required" => {
            if !value.as_array().is_some_and(|names| names.iter().all(Value::is_string)) {
                return Err(malformed(path, "required must be an array of strings"));
            }
        }
        "enum" => {
            if !value.is_array() {
                return Err(malformed(path, "enum must be an array"));
            }
        }
        // annotations, `const`
        _ => {}
    }
    Ok(())
}

fn compile_map(
    root: &Value,
    map: &Map<String, Value>,
    path: &mut Pointer,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    for (name, sub) in map {
        path.push(name.clone());
        let result = compile(root, sub, path, patterns);
        path.pop();
        result?;
    }
    Ok(())
}

fn compile_list(
    root: &Value,
    list: &[Value],
    path: &mut Pointer,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    for (i, sub) in list.iter().enumerate() {
        path.push(i.to_string());
        let result = compile(root, sub, path, patterns);
        path.pop();
        result?;
    }
    Ok(())
}

fn add_pattern(
    pattern: &str,
    path: &Pointer,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    if patterns.contains_key(pattern) {
        return Ok(());
    }
    let re = Regex::new(pattern).map_err(|source| SchemaError::BadPattern {
        path: path.render(),
        pattern: pattern.to_string(),
        source,
    })?;
    patterns.insert(pattern.to_string(), re);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_json(value).unwrap()
    }

    #[test]
    fn type_mismatch_names_path() {
        let s = schema(json!({
            "type": "object",
            "properties": {"scale": {"type": "array", "items": {"type": "integer"}}}
        }));
        let v = s.check(&json!({"scale": [1, "x"]})).unwrap_err();
        assert_eq!(v.path, "/scale/1");
        assert_eq!(v.expected, "integer, found string");
        assert_eq!(v.to_string(), "at /scale/1: expected integer, found string");
    }

    #[test]
    fn integer_accepts_whole_floats() {
        let s = schema(json!({"type": "integer"}));
        assert!(s.check(&json!(3.0)).is_ok());
        assert!(s.check(&json!(3.5)).is_err());
    }

    #[test]
    fn required_and_additional() {
        let s = schema(json!({
            "required": ["source"],
            "properties": {"source": true},
            "additionalProperties": false
        }));
        assert_eq!(
            s.check(&json!({})).unwrap_err().expected,
            "required property `source`"
        );
        let v = s.check(&json!({"source": 1, "extra": 2})).unwrap_err();
        assert!(v.expected.contains("`extra`"));
        assert_eq!(v.path, "");
        assert_eq!(v.to_string(), "at /: expected no property `extra` (additional properties are not allowed)");
    }

    #[test]
    fn pattern_properties_and_refs() {
        let s = schema(json!({
            "definitions": {"node": {"type": "object", "required": ["value"]}},
            "patternProperties": {"^[a-z-]+$": {"type": "array", "items": {"$ref": "#/definitions/node"}}},
            "additionalProperties": false
        }));
        assert!(s.check(&json!({"grid-size": [{"value": "10"}]})).is_ok());
        let v = s.check(&json!({"grid": [{}]})).unwrap_err();
        assert_eq!(v.path, "/grid/0");
        assert!(s.check(&json!({"Grid": []})).is_err());
    }

    #[test]
    fn string_constraints() {
        let s = schema(json!({"type": "string", "pattern": "^utf-?8$", "minLength": 4, "maxLength": 5}));
        assert!(s.check(&json!("utf-8")).is_ok());
        assert!(s.check(&json!("utf8")).is_ok());
        assert!(s.check(&json!("latin1")).is_err());
        assert!(s.check(&json!("u8")).is_err());
    }

    #[test]
    fn combinators() {
        let s = schema(json!({"oneOf": [{"type": "string"}, {"type": "integer"}], "not": {"const": "x"}}));
        assert!(s.check(&json!("a")).is_ok());
        assert!(s.check(&json!(1)).is_ok());
        assert!(s.check(&json!("x")).is_err());
        assert!(s.check(&json!(null)).is_err());

        let any = schema(json!({"anyOf": [{"minimum": 10}, {"maximum": 0}]}));
        assert!(any.check(&json!(11)).is_ok());
        assert!(any.check(&json!(-1)).is_ok());
        assert!(any.check(&json!(5)).unwrap_err().expected.contains("anyOf"));
    }

    #[test]
    fn enum_lists_options() {
        let s = schema(json!({"enum": ["utf-8", "iso8859-2"]}));
        assert_eq!(
            s.check(&json!("ascii")).unwrap_err().expected,
            "one of [\"utf-8\", \"iso8859-2\"]"
        );
    }

    #[test]
    fn self_referencing_schema_terminates() {
        let s = schema(json!({"definitions": {"a": {"$ref": "#/definitions/a"}}, "$ref": "#/definitions/a"}));
        assert!(s.check(&json!(1)).is_err());
    }

    #[test]
    fn rejects_bad_schemas() {
        assert!(matches!(
            Schema::from_json(json!({"type": "text"})),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(matches!(
            Schema::from_json(json!({"properties": {"a": {"$ref": "#/definitions/missing"}}})),
            Err(SchemaError::UnresolvedRef { .. })
        ));
        assert!(matches!(
            Schema::from_json(json!({"pattern": "("})),
            Err(SchemaError::BadPattern { .. })
        ));
        assert!(matches!(Schema::parse("{"), Err(SchemaError::Json(_))));
    }

    #[test]
    fn validation_is_advisory() {
        let s = schema(json!({"type": "object"}));
        assert_eq!(
            s.validate(&json!([])),
            Validation {
                valid: false,
                diagnostic: Some("at /: expected object, found array".into()),
            }
        );
        assert!(s.validate(&json!({})).valid);
    }

    #[test]
    fn draft07_keywords_reject_invalid_instances() {
        let cases = [
            (json!({"uniqueItems": true}), json!([1, 1]), "unique items, but items 0 and 1 are equal"),
            (json!({"exclusiveMinimum": 5}), json!(5), "a number > 5"),
            (json!({"exclusiveMaximum": 5}), json!(5), "a number < 5"),
            (json!({"minProperties": 1}), json!({}), "at least 1 propert(y/ies)"),
            (json!({"maxProperties": 0}), json!({"a": 1}), "at most 0 propert(y/ies)"),
            (json!({"if": {"const": 1}, "then": {"const": 2}}), json!(1), "constant 2"),
            (json!({"multipleOf": 2}), json!(3), "a multiple of 2"),
            (json!({"contains": {"type": "string"}}), json!([1, 2]), "at least one item matching `contains`"),
        ];
        for (schema_json, instance, expected) in cases {
            let s = schema(schema_json.clone());
            let v = s.check(&instance).unwrap_err();
            assert_eq!(v.expected, expected, "{} against {}", schema_json, instance);
        }
    }

    #[test]
    fn draft07_keywords_accept_valid_instances() {
        assert!(schema(json!({"uniqueItems": true})).check(&json!([1, 2, "1"])).is_ok());
        assert!(schema(json!({"exclusiveMinimum": 5})).check(&json!(5.5)).is_ok());
        assert!(schema(json!({"multipleOf": 0.1})).check(&json!(0.3)).is_ok());
        assert!(schema(json!({"multipleOf": 2})).check(&json!(-4)).is_ok());
        let conditional = schema(json!({"if": {"const": 1}, "then": {"const": 2}, "else": {"type": "string"}}));
        assert!(conditional.check(&json!("x")).is_ok());
        assert!(conditional.check(&json!(3)).is_err());
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(schema(json!({"uniqueItems": true})).check(&json!([1, 1.0])).is_err());
        assert!(schema(json!({"const": 2})).check(&json!(2.0)).is_ok());
    }

    #[test]
    fn tuple_items_and_additional_items() {
        let s = schema(json!({"items": [{"type": "string"}], "additionalItems": false}));
        assert!(s.check(&json!(["a"])).is_ok());
        assert!(s.check(&json!(["a", 1])).unwrap_err().expected.contains("additional items"));
        let typed = schema(json!({"items": [true], "additionalItems": {"type": "integer"}}));
        assert_eq!(typed.check(&json!(["a", 1, "b"])).unwrap_err().path, "/2");
    }

    #[test]
    fn property_names_and_dependencies() {
        let names = schema(json!({"propertyNames": {"pattern": "^[a-z]+$"}}));
        assert!(names.check(&json!({"scale": 1})).is_ok());
        let v = names.check(&json!({"Scale": 1})).unwrap_err();
        assert_eq!(v.path, "/Scale");
        assert!(v.expected.starts_with("a property name that is"));

        let deps = schema(json!({"dependencies": {"from": ["to"], "scale": {"required": ["units"]}}}));
        assert!(deps.check(&json!({"from": 1, "to": 2})).is_ok());
        assert_eq!(
            deps.check(&json!({"from": 1})).unwrap_err().expected,
            "property `to` alongside `from`"
        );
        assert!(deps.check(&json!({"scale": 1})).is_err());
    }

    #[test]
    fn unsupported_or_malformed_keywords_fail_to_compile() {
        assert!(matches!(
            Schema::from_json(json!({"format": "date"})),
            Err(SchemaError::UnsupportedKeyword { keyword, .. }) if keyword == "format"
        ));
        assert!(matches!(
            Schema::from_json(json!({"properties": {"a": {"minimumm": 1}}})),
            Err(SchemaError::UnsupportedKeyword { path, .. }) if path == "/properties/a"
        ));
        assert!(matches!(
            Schema::from_json(json!({"minItems": "2"})),
            Err(SchemaError::Malformed { .. })
        ));
        assert!(matches!(
            Schema::from_json(json!({"multipleOf": 0})),
            Err(SchemaError::Malformed { .. })
        ));
        assert!(matches!(Schema::from_json(json!({"not": 3})), Err(SchemaError::Malformed { .. })));
        assert!(Schema::from_json(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "t",
            "description": "d",
            "$comment": "c",
            "default": {},
            "examples": [{}]
        }))
        .is_ok());
    }
}
