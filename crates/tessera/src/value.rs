//! Runtime values seen by templates.
//!
//! Host data enters templates as [`Value`]s, either through
//! [`Value::from_serialize`] (any `serde::Serialize` type) or through the
//! `From` conversions. Values that need custom lookup behavior implement
//! [`Object`] and are wrapped with [`Value::from_object`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Host-defined value with dynamic lookup.
///
/// Attribute access (`obj.key` and `obj[key]`) calls [`Object::get_item`]
/// first and only falls back to [`Object::get_field`] when that returns `None`.
///
/// # Example
///
/// ```rust
/// use tessera::{Object, Value};
///
/// #[derive(Debug)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl Object for Point {
///     fn get_field(&self, name: &str) -> Option<Value> {
///         match name {
///             "x" => Some(Value::Int(self.x)),
///             "y" => Some(Value::Int(self.y)),
///             _ => None,
///         }
///     }
/// }
///
/// let point = Value::from_object(Point { x: 1, y: 2 });
/// assert_eq!(point.get_attr(&Value::from("y")), Some(Value::Int(2)));
/// ```
pub trait Object: fmt::Debug + Send + Sync {
    /// Key or index lookup.
    fn get_item(&self, _key: &Value) -> Option<Value> {
        None
    }

    /// Named field lookup.
    fn get_field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Elements produced when the object is iterated by `for`.
    ///
    /// `None` means the object is not iterable.
    fn iterate(&self) -> Option<Vec<Value>> {
        None
    }

    /// The string form used for output.
    fn render(&self) -> String {
        format!("{:?}", self)
    }
}

/// A dynamically typed template value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A string that is already escaped and is output verbatim.
    Safe(String),
    List(Vec<Value>),
    /// Keys are kept sorted.
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Object>),
}

impl Value {
    /// Converts any serializable host value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Wraps a host object.
    pub fn from_object<T: Object + 'static>(object: T) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Marks a string as already escaped.
    pub fn safe(text: impl Into<String>) -> Value {
        Value::Safe(text.into())
    }

    /// Name of the value's type, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) | Value::Safe(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Returns `true` for pre-escaped strings.
    pub fn is_safe(&self) -> bool {
        matches!(self, Value::Safe(_))
    }

    /// The text of a string value, escaped or not.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Safe(s) => Some(s),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Truthiness used by `if`, `and` and `or`.
    ///
    /// `none`, `false`, zero and empty strings, lists and maps are false.
    pub fn is_true(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) | Value::Safe(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// The unescaped string form.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Number of elements, characters or entries.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) | Value::Safe(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Object(object) => object.iterate().map(|items| items.len()),
            _ => None,
        }
    }

    /// Key or index lookup.
    ///
    /// Lists and strings take integer indexes (negative counts from the end),
    /// maps take string keys.
    pub fn get_item(&self, key: &Value) -> Option<Value> {
        match (self, key) {
            (Value::List(items), Value::Int(index)) => {
                resolve_index(items.len(), *index).map(|i| items[i].clone())
            }
            (Value::Map(map), Value::String(k) | Value::Safe(k)) => map.get(k).cloned(),
            (Value::Map(map), Value::Int(k)) => map.get(&k.to_string()).cloned(),
            (Value::String(s) | Value::Safe(s), Value::Int(index)) => {
                resolve_index(s.chars().count(), *index)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
            }
            (Value::Object(object), key) => object.get_item(key),
            _ => None,
        }
    }

    /// Attribute lookup: [`Value::get_item`], then an object's named field.
    pub fn get_attr(&self, key: &Value) -> Option<Value> {
        if let Some(found) = self.get_item(key) {
            return Some(found);
        }
        match (self, key) {
            (Value::Object(object), Value::String(name) | Value::Safe(name)) => {
                object.get_field(name)
            }
            _ => None,
        }
    }

    /// The elements a `for` loop visits.
    ///
    /// Lists yield their elements, maps their keys and strings their characters.
    pub fn try_iter(&self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Map(map) => Ok(map.keys().cloned().map(Value::String).collect()),
            Value::String(s) | Value::Safe(s) => {
                Ok(s.chars().map(|c| Value::String(c.to_string())).collect())
            }
            Value::Object(object) => object
                .iterate()
                .ok_or_else(|| Error::invalid("object is not iterable")),
            _ => Err(Error::invalid(format!("{} is not iterable", self.kind()))),
        }
    }

    /// Ordering for `<`, `<=`, `>` and `>=`.
    ///
    /// Numbers, strings, bools and lists are ordered; anything else fails.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        let ordering = match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => self
                .as_f64()
                .zip(other.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b)),
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => {
                Some(a.cmp(b))
            }
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => return compare_lists(a, b),
            _ => None,
        };
        ordering.ok_or_else(|| {
            Error::invalid(format!(
                "cannot compare {} with {}",
                self.kind(),
                other.kind()
            ))
        })
    }
}

fn compare_lists(a: &[Value], b: &[Value]) -> Result<Ordering> {
    for (left, right) in a.iter().zip(b) {
        match left.compare(right)? {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(a.len().cmp(&b.len()))
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// Integral floats keep one decimal so `2.0` does not print as `2`.
fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => f.write_str(&format_float(*n)),
            Value::String(s) | Value::Safe(s) => f.write_str(s),
            // Collections use their JSON representation
            Value::List(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::Object(object) => f.write_str(&object.render()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) | Value::Safe(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Object(object) => serializer.serialize_str(&object.render()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(n as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    // ==================== String form ====================

    mod string_form {
        use super::*;

        #[test]
        fn scalars() {
            assert_eq!(Value::None.to_text(), "");
            assert_eq!(Value::Bool(true).to_text(), "true");
            assert_eq!(Value::Int(-7).to_text(), "-7");
            assert_eq!(Value::Float(2.0).to_text(), "2.0");
            assert_eq!(Value::Float(2.5).to_text(), "2.5");
            assert_eq!(Value::safe("<b>").to_text(), "<b>");
        }

        #[test]
        fn collections_render_as_json() {
            assert_eq!(v(json!([1, "a", null])).to_text(), r#"[1,"a",null]"#);
            assert_eq!(v(json!({"b": 1, "a": true})).to_text(), r#"{"a":true,"b":1}"#);
        }
    }

    // ==================== Truthiness ====================

    mod truthiness {
        use super::*;

        #[test]
        fn falsy_values() {
            for value in [
                Value::None,
                Value::Bool(false),
                Value::Int(0),
                Value::Float(0.0),
                Value::from(""),
                Value::List(vec![]),
                Value::Map(BTreeMap::new()),
            ] {
                assert!(!value.is_true(), "{value:?} should be falsy");
            }
        }

        #[test]
        fn truthy_values() {
            for value in [
                Value::Bool(true),
                Value::Int(-1),
                Value::Float(0.5),
                Value::from(" "),
                v(json!([0])),
                v(json!({"k": null})),
            ] {
                assert!(value.is_true(), "{value:?} should be truthy");
            }
        }
    }

    // ==================== Lookup ====================

    mod lookup {
        use super::*;

        #[derive(Debug)]
        struct Both;

        impl Object for Both {
            fn get_item(&self, key: &Value) -> Option<Value> {
                (key.as_str() == Some("name")).then(|| Value::from("item"))
            }

            fn get_field(&self, name: &str) -> Option<Value> {
                matches!(name, "name" | "other").then(|| Value::from("field"))
            }
        }

        #[test]
        fn list_indexes() {
            let list = v(json!(["a", "b", "c"]));
            assert_eq!(list.get_item(&Value::Int(0)), Some(Value::from("a")));
            assert_eq!(list.get_item(&Value::Int(-1)), Some(Value::from("c")));
            assert_eq!(list.get_item(&Value::Int(3)), None);
            assert_eq!(list.get_item(&Value::Int(-4)), None);
            assert_eq!(list.get_item(&Value::from("0")), None);
        }

        #[test]
        fn map_keys() {
            let map = v(json!({"name": "x", "0": "zero"}));
            assert_eq!(map.get_item(&Value::from("name")), Some(Value::from("x")));
            assert_eq!(map.get_item(&Value::Int(0)), Some(Value::from("zero")));
            assert_eq!(map.get_item(&Value::from("missing")), None);
        }

        #[test]
        fn string_characters() {
            let s = Value::from("héllo");
            assert_eq!(s.get_item(&Value::Int(1)), Some(Value::from("é")));
            assert_eq!(s.get_item(&Value::Int(-1)), Some(Value::from("o")));
        }

        #[test]
        fn scalars_have_no_attributes() {
            assert_eq!(Value::Int(3).get_attr(&Value::from("x")), None);
            assert_eq!(Value::None.get_attr(&Value::Int(0)), None);
        }

        #[test]
        fn item_lookup_wins_over_field() {
            let both = Value::from_object(Both);
            assert_eq!(both.get_attr(&Value::from("name")), Some(Value::from("item")));
            assert_eq!(both.get_attr(&Value::from("other")), Some(Value::from("field")));
            assert_eq!(both.get_attr(&Value::from("nope")), None);
        }
    }

    // ==================== Iteration ====================

    mod iteration {
        use super::*;

        #[test]
        fn iterable_kinds() {
            assert_eq!(v(json!([1, 2])).try_iter().unwrap(), vec![Value::Int(1), Value::Int(2)]);
            assert_eq!(
                v(json!({"b": 1, "a": 2})).try_iter().unwrap(),
                vec![Value::from("a"), Value::from("b")]
            );
            assert_eq!(
                Value::from("ab").try_iter().unwrap(),
                vec![Value::from("a"), Value::from("b")]
            );
        }

        #[test]
        fn scalars_are_not_iterable() {
            let err = Value::Int(3).try_iter().unwrap_err();
            assert_eq!(err.to_string(), "invalid operation: int is not iterable");
            assert!(Value::None.try_iter().is_err());
        }
    }

    // ==================== Comparison ====================

    mod comparison {
        use super::*;

        #[test]
        fn equality_across_numbers() {
            assert_eq!(Value::Int(2), Value::Float(2.0));
            assert_ne!(Value::Int(2), Value::from("2"));
            assert_eq!(Value::from("a"), Value::safe("a"));
            assert_ne!(Value::None, Value::Bool(false));
        }

        #[test]
        fn ordering() {
            assert_eq!(Value::Int(1).compare(&Value::Float(1.5)).unwrap(), Ordering::Less);
            assert_eq!(
                Value::from("b").compare(&Value::from("a")).unwrap(),
                Ordering::Greater
            );
            assert_eq!(
                v(json!([1, 2])).compare(&v(json!([1, 2, 0]))).unwrap(),
                Ordering::Less
            );
        }

        #[test]
        fn mixed_types_cannot_be_ordered() {
            let err = Value::Int(1).compare(&Value::from("1")).unwrap_err();
            assert_eq!(err.to_string(), "invalid operation: cannot compare int with string");
            assert!(Value::None.compare(&Value::None).is_err());
        }
    }

    // ==================== Conversion ====================

    mod conversion {
        use super::*;
        use serde::Serialize;

        #[derive(Serialize)]
        struct User {
            name: String,
            age: u32,
            tags: Vec<String>,
        }

        #[test]
        fn from_serialize_struct() {
            let user = User {
                name: "ana".into(),
                age: 31,
                tags: vec!["admin".into()],
            };
            let value = Value::from_serialize(&user).unwrap();
            assert_eq!(value.get_item(&Value::from("age")), Some(Value::Int(31)));
            assert_eq!(value.get_item(&Value::from("tags")), Some(v(json!(["admin"]))));
        }

        #[test]
        fn large_unsigned_becomes_float() {
            assert!(matches!(v(json!(u64::MAX)), Value::Float(_)));
        }

        #[test]
        fn deserialize_from_yaml() {
            let value: Value = serde_yaml::from_str("a: [1, 2.5]\nb: text").unwrap();
            assert_eq!(value, v(json!({"a": [1, 2.5], "b": "text"})));
        }

        #[test]
        fn option_and_vec_conversions() {
            assert_eq!(Value::from(None::<i64>), Value::None);
            assert_eq!(Value::from(vec![1, 2]), v(json!([1, 2])));
        }
    }
}
