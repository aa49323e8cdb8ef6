//! The process-wide filter registry.
//!
//! Filters are plain functions taking the piped value and the positional
//! parameters written after `:`. The built-ins are installed the first time the
//! registry is touched; hosts add their own with [`register_filter`].
//!
//! ```rust
//! use tessera::{register_filter, render, Value};
//!
//! register_filter("shout", |value: Value, _args: &[Value]| {
//!     Ok(Value::from(format!("{}!", value.to_text().to_uppercase())))
//! });
//!
//! let out = render("{{ greeting | shout }}", &serde_json::json!({"greeting": "hi"})).unwrap();
//! assert_eq!(out, "HI!");
//! ```
//!
//! # Built-in Filters
//!
//! | Filter | Parameters | Result |
//! |--------|------------|--------|
//! | `attr` | name | named field or key of the value |
//! | `capitalize` | | first character upper case, the rest lower case |
//! | `strip` | chars? | value with surrounding whitespace (or `chars`) removed |
//! | `upper`, `lower` | | case-converted string |
//! | `escape`, `htmlescape` | | HTML-escaped, marked safe |
//! | `noescape`, `safe` | | marked safe, never escaped on output |
//! | `split` | delimiter? | list of parts, whitespace separated by default |
//! | `join` | separator? | elements joined into one string |
//! | `reverse` | | reversed list or string |
//! | `length` | | number of elements or characters |
//! | `add` | other | sum of numbers, concatenation of strings or lists |

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{Error, Result};
use crate::escape::escape_html;
use crate::value::Value;

/// A registered filter.
pub type Filter = Arc<dyn Fn(Value, &[Value]) -> Result<Value> + Send + Sync>;

static REGISTRY: Lazy<RwLock<HashMap<String, Filter>>> =
    Lazy::new(|| RwLock::new(builtin_filters()));

/// Registers `filter` under `name`, replacing any previous filter of that name.
pub fn register_filter<F>(name: impl Into<String>, filter: F)
where
    F: Fn(Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
{
    let name = name.into();
    debug!(filter = %name, "registering filter");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name, Arc::new(filter));
}

/// Removes a filter. Returns `true` if it was registered.
pub fn unregister_filter(name: &str) -> bool {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
        .is_some()
}

/// Names of all registered filters, sorted.
pub fn filter_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

/// Invokes the filter `name` with `value` first and `args` after it.
pub fn apply_filter(name: &str, value: Value, args: &[Value]) -> Result<Value> {
    // the lock is released before the call so filters may use the registry
    let filter = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownFilter(name.to_string()))?;
    filter(value, args)
}

fn builtin_filters() -> HashMap<String, Filter> {
    let mut filters: HashMap<String, Filter> = HashMap::new();
    let mut add = |names: &[&str], filter: Filter| {
        for name in names {
            filters.insert(name.to_string(), filter.clone());
        }
    };

    add(&["attr"], Arc::new(attr));
    add(&["capitalize"], Arc::new(capitalize));
    add(&["strip"], Arc::new(strip));
    add(&["upper"], Arc::new(|v: Value, args: &[Value]| -> Result<Value> {
        arity("upper", args, 0, 0)?;
        Ok(Value::String(v.to_text().to_uppercase()))
    }));
    add(&["lower"], Arc::new(|v: Value, args: &[Value]| -> Result<Value> {
        arity("lower", args, 0, 0)?;
        Ok(Value::String(v.to_text().to_lowercase()))
    }));
    add(&["escape", "htmlescape"], Arc::new(escape));
    add(&["noescape", "safe"], Arc::new(|v: Value, args: &[Value]| -> Result<Value> {
        arity("noescape", args, 0, 0)?;
        Ok(Value::Safe(v.to_text()))
    }));
    add(&["split"], Arc::new(split));
    add(&["join"], Arc::new(join));
    add(&["reverse"], Arc::new(reverse));
    add(&["length"], Arc::new(length));
    add(&["add"], Arc::new(add_values));

    filters
}

/// Checks the number of parameters after the piped value.
fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{} to {}", min, max)
    };
    Err(Error::invalid(format!(
        "filter `{}` takes {} parameter(s), got {}",
        name,
        expected,
        args.len()
    )))
}

fn string_arg<'a>(name: &str, arg: &'a Value) -> Result<&'a str> {
    arg.as_str().ok_or_else(|| {
        Error::invalid(format!(
            "filter `{}` expects a string parameter, got {}",
            name,
            arg.kind()
        ))
    })
}

fn attr(value: Value, args: &[Value]) -> Result<Value> {
    arity("attr", args, 1, 1)?;
    let key = &args[0];
    value.get_attr(key).ok_or_else(|| Error::UndefinedAttribute {
        key: key.to_text(),
        target: value.kind().to_string(),
    })
}

fn capitalize(value: Value, args: &[Value]) -> Result<Value> {
    arity("capitalize", args, 0, 0)?;
    let text = value.to_text();
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect::<String>(),
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

fn strip(value: Value, args: &[Value]) -> Result<Value> {
    arity("strip", args, 0, 1)?;
    let text = value.to_text();
    let stripped = match args.first() {
        Some(chars) => {
            let chars: Vec<char> = string_arg("strip", chars)?.chars().collect();
            text.trim_matches(chars.as_slice()).to_string()
        }
        None => text.trim().to_string(),
    };
    Ok(Value::String(stripped))
}

fn escape(value: Value, args: &[Value]) -> Result<Value> {
    arity("escape", args, 0, 0)?;
    match value {
        Value::Safe(_) => Ok(value),
        other => Ok(Value::Safe(escape_html(&other.to_text()))),
    }
}

fn split(value: Value, args: &[Value]) -> Result<Value> {
    arity("split", args, 0, 1)?;
    let text = value.to_text();
    let parts: Vec<Value> = match args.first() {
        Some(delimiter) => {
            let delimiter = string_arg("split", delimiter)?;
            if delimiter.is_empty() {
                return Err(Error::invalid("filter `split` got an empty delimiter"));
            }
            text.split(delimiter).map(Value::from).collect()
        }
        None => text.split_whitespace().map(Value::from).collect(),
    };
    Ok(Value::List(parts))
}

fn join(value: Value, args: &[Value]) -> Result<Value> {
    arity("join", args, 0, 1)?;
    let separator = match args.first() {
        Some(separator) => string_arg("join", separator)?,
        None => "",
    };
    let joined = value
        .try_iter()?
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::String(joined))
}

fn reverse(value: Value, args: &[Value]) -> Result<Value> {
    arity("reverse", args, 0, 0)?;
    match value {
        Value::String(s) | Value::Safe(s) => Ok(Value::String(s.chars().rev().collect())),
        Value::List(mut items) => {
            items.reverse();
            Ok(Value::List(items))
        }
        other => Err(Error::invalid(format!("cannot reverse {}", other.kind()))),
    }
}

fn length(value: Value, args: &[Value]) -> Result<Value> {
    arity("length", args, 0, 0)?;
    value
        .len()
        .map(Value::from)
        .ok_or_else(|| Error::invalid(format!("{} has no length", value.kind())))
}

fn add_values(value: Value, args: &[Value]) -> Result<Value> {
    arity("add", args, 1, 1)?;
    let other = &args[0];
    match (&value, other) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::invalid("integer overflow in `add`")),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(as_float(&value) + as_float(other)))
        }
        (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        _ => Err(Error::invalid(format!(
            "cannot add {} and {}",
            value.kind(),
            other.kind()
        ))),
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn call(name: &str, value: impl Into<Value>, args: &[Value]) -> Result<Value> {
        apply_filter(name, value.into(), args)
    }

    // ==================== Text filters ====================

    mod text {
        use super::*;

        #[test]
        fn capitalize_lowers_the_rest() {
            assert_eq!(call("capitalize", "hELLO wOrld", &[]).unwrap(), Value::from("Hello world"));
            assert_eq!(call("capitalize", "", &[]).unwrap(), Value::from(""));
        }

        #[test]
        fn strip_whitespace_and_chars() {
            assert_eq!(call("strip", " \tfoo \n", &[]).unwrap(), Value::from("foo"));
            assert_eq!(
                call("strip", "--foo-+", &[Value::from("-+")]).unwrap(),
                Value::from("foo")
            );
        }

        #[test]
        fn case_conversion() {
            assert_eq!(call("upper", "abc", &[]).unwrap(), Value::from("ABC"));
            assert_eq!(call("lower", "ÀB", &[]).unwrap(), Value::from("àb"));
        }

        #[test]
        fn escape_marks_safe_once() {
            let escaped = call("htmlescape", "<a & b>", &[]).unwrap();
            assert_eq!(escaped, Value::safe("&lt;a &amp; b&gt;"));
            assert!(escaped.is_safe());
            assert_eq!(call("escape", escaped.clone(), &[]).unwrap(), escaped);
        }

        #[test]
        fn noescape_and_safe_are_aliases() {
            assert!(call("noescape", "<b>", &[]).unwrap().is_safe());
            assert!(call("safe", 3, &[]).unwrap().is_safe());
        }
    }

    // ==================== Collection filters ====================

    mod collections {
        use super::*;

        #[test]
        fn split_default_and_delimited() {
            assert_eq!(
                call("split", " a  b c ", &[]).unwrap(),
                Value::from(json!(["a", "b", "c"]))
            );
            assert_eq!(
                call("split", "a,b,,c", &[Value::from(",")]).unwrap(),
                Value::from(json!(["a", "b", "", "c"]))
            );
            assert!(call("split", "abc", &[Value::from("")]).is_err());
        }

        #[test]
        fn join_elements() {
            let list = Value::from(json!([1, "b", 2.5]));
            assert_eq!(call("join", list.clone(), &[]).unwrap(), Value::from("1b2.5"));
            assert_eq!(call("join", list, &[Value::from(", ")]).unwrap(), Value::from("1, b, 2.5"));
        }

        #[test]
        fn reverse_lists_and_strings() {
            assert_eq!(call("reverse", "abc", &[]).unwrap(), Value::from("cba"));
            assert_eq!(
                call("reverse", Value::from(json!([1, 2])), &[]).unwrap(),
                Value::from(json!([2, 1]))
            );
            assert!(call("reverse", 3, &[]).is_err());
        }

        #[test]
        fn length_of_values() {
            assert_eq!(call("length", "héllo", &[]).unwrap(), Value::Int(5));
            assert_eq!(call("length", Value::from(json!({"a": 1})), &[]).unwrap(), Value::Int(1));
            assert!(call("length", 3, &[]).is_err());
        }

        #[test]
        fn attr_reads_keys() {
            let map = Value::from(json!({"name": "x"}));
            assert_eq!(call("attr", map.clone(), &[Value::from("name")]).unwrap(), Value::from("x"));
            assert!(matches!(
                call("attr", map, &[Value::from("nope")]),
                Err(Error::UndefinedAttribute { .. })
            ));
        }
    }

    // ==================== add ====================

    mod add {
        use super::*;

        #[test]
        fn numbers() {
            assert_eq!(call("add", 1, &[Value::Int(2)]).unwrap(), Value::Int(3));
            assert_eq!(call("add", 1, &[Value::Float(0.5)]).unwrap(), Value::Float(1.5));
            assert!(call("add", i64::MAX, &[Value::Int(1)]).is_err());
        }

        #[test]
        fn concatenation() {
            assert_eq!(call("add", "a", &[Value::from("b")]).unwrap(), Value::from("ab"));
            assert_eq!(
                call("add", Value::from(json!([1])), &[Value::from(json!([2]))]).unwrap(),
                Value::from(json!([1, 2]))
            );
        }

        #[test]
        fn mismatched_operands() {
            let err = call("add", "a", &[Value::Int(1)]).unwrap_err();
            assert_eq!(err.to_string(), "invalid operation: cannot add string and int");
        }

        #[test]
        fn requires_one_parameter() {
            let err = call("add", 1, &[]).unwrap_err();
            assert_eq!(
                err.to_string(),
                "invalid operation: filter `add` takes 1 parameter(s), got 0"
            );
        }
    }

    // ==================== Registry ====================

    mod registry {
        use super::*;

        #[test]
        fn unknown_filter() {
            assert!(matches!(
                call("no_such_filter", 1, &[]),
                Err(Error::UnknownFilter(name)) if name == "no_such_filter"
            ));
        }

        #[test]
        #[serial]
        fn builtins_are_listed() {
            let names = filter_names();
            for name in ["add", "capitalize", "htmlescape", "noescape", "split", "strip"] {
                assert!(names.iter().any(|n| n == name), "missing {name}");
            }
        }

        #[test]
        #[serial]
        fn registration_overwrites_and_unregisters() {
            register_filter("twice_unit", |v: Value, _: &[Value]| {
                Ok(Value::from(format!("{0}{0}", v)))
            });
            assert_eq!(call("twice_unit", "ab", &[]).unwrap(), Value::from("abab"));

            register_filter("twice_unit", |_: Value, _: &[Value]| Ok(Value::from("replaced")));
            assert_eq!(call("twice_unit", "ab", &[]).unwrap(), Value::from("replaced"));

            assert!(unregister_filter("twice_unit"));
            assert!(!unregister_filter("twice_unit"));
            assert!(call("twice_unit", "ab", &[]).is_err());
        }
    }
}
