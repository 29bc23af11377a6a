//! Dynamic value model for captured arguments, results and errors.
//!
//! Everything the interceptor logs is first captured into a [`Value`]. Capture
//! goes through `serde::Serialize`, which doubles as the structural
//! introspection capability: structs become [`Record`]s with named fields,
//! sequences become lists and maps become maps. Types that cannot be
//! serialized, or that the caller does not want introspected, are captured as
//! [`Value::Opaque`] type tags.
//!
//! A captured value is an owned deep copy. Mutating the original after capture
//! is never visible through the captured value.

mod ser;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

pub use ser::CaptureError;

/// A captured value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or floating point number.
    Number(serde_json::Number),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
    /// Named record with ordered fields.
    Object(Record),
    /// Value that is never introspected.
    Opaque {
        /// Full type name.
        type_name: Cow<'static, str>,
        /// Identity of the captured instance.
        identity: u64,
    },
}

/// A structured value with a type name and ordered named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type name, fully qualified when known.
    pub type_name: Cow<'static, str>,
    /// Fields in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use = "This method returns a new Record and does not modify self"]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Returns the value of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Content-derived identity hash used in type tags.
    pub fn identity(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.type_name.hash(&mut hasher);
        for (name, value) in &self.fields {
            name.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
        hasher.finish() & 0xffff_ffff
    }
}

impl Value {
    /// Captures any serializable value.
    ///
    /// Serialization failures never propagate; the value degrades to an
    /// opaque type tag instead. The top-level record keeps its fully
    /// qualified Rust type name so foreign types can be recognized by prefix.
    /// Nested records only carry the short name serde reports, so prefix
    /// matching applies to the outermost value alone.
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Value {
        match value.serialize(ser::ValueSerializer) {
            Ok(Value::Object(mut record)) => {
                let full_name = std::any::type_name::<T>();
                if short_type_name(full_name) == record.type_name {
                    record.type_name = Cow::Borrowed(full_name);
                }
                Value::Object(record)
            }
            Ok(captured) => captured,
            Err(error) => {
                tracing::debug!(
                    type_name = %std::any::type_name::<T>(),
                    error = %error,
                    "Value capture failed, using type tag"
                );
                Value::opaque(value)
            }
        }
    }

    /// Captures a value as an opaque type tag without introspecting it.
    pub fn opaque<T: ?Sized>(value: &T) -> Value {
        Value::Opaque {
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            identity: (value as *const T).cast::<()>() as usize as u64,
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice of a `Value::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean of a `Value::Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a number as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the element list of a `Value::List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Reads a named member of a map or record.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(name),
            Value::Object(record) => record.get(name),
            _ => None,
        }
    }

    /// Short label describing the kind of value, used in error messages.
    pub fn type_label(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed("null"),
            Value::Bool(_) => Cow::Borrowed("boolean"),
            Value::Number(_) => Cow::Borrowed("number"),
            Value::String(_) => Cow::Borrowed("string"),
            Value::List(_) => Cow::Borrowed("list"),
            Value::Map(_) => Cow::Borrowed("map"),
            Value::Object(record) => Cow::Borrowed(short_type_name(&record.type_name)),
            Value::Opaque { type_name, .. } => Cow::Borrowed(short_type_name(type_name)),
        }
    }

    /// Renders the `TypeName@identity` tag for this value.
    pub fn type_tag(&self) -> String {
        match self {
            Value::Object(record) => {
                format!("{}@{:x}", short_type_name(&record.type_name), record.identity())
            }
            Value::Opaque {
                type_name,
                identity,
            } => format!("{}@{:x}", short_type_name(type_name), identity),
            other => other.type_label().into_owned(),
        }
    }

    /// Renders this value as compact JSON.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.type_tag())
    }

    /// Creates a number value from a float; non-finite floats become strings.
    pub fn from_f64(value: f64) -> Value {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()))
    }
}

/// Returns the last path segment of a type name, without generic arguments.
///
/// `alloc::sync::Arc<my::Service>` becomes `Arc`.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// Rendering
// =============================================================================

/// Stringifies a value for template output.
///
/// Null renders as the empty string, strings render raw, numbers and booleans
/// canonically, and composite values as compact JSON. Opaque values render as
/// their type tag.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Opaque { .. } => f.write_str(&self.type_tag()),
            composite => f.write_str(&composite.to_json_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Object(record) => {
                let mut out = serializer.serialize_map(Some(record.fields.len()))?;
                for (name, value) in &record.fields {
                    out.serialize_entry(name, value)?;
                }
                out.end()
            }
            Value::Opaque { .. } => serializer.serialize_str(&self.type_tag()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_f64(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Account {
        username: String,
        age: u32,
        tags: Vec<String>,
    }

    #[test]
    fn test_capture_struct_keeps_field_order() {
        let account = Account {
            username: "bob".into(),
            age: 31,
            tags: vec!["a".into()],
        };
        let Value::Object(record) = Value::capture(&account) else {
            panic!("expected a record");
        };
        assert!(record.type_name.ends_with("::Account"));
        let names: Vec<_> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["username", "age", "tags"]);
        assert_eq!(record.get("age"), Some(&Value::from(31u32)));
    }

    #[derive(Serialize)]
    struct Holder {
        account: Account,
    }

    #[test]
    fn test_nested_records_keep_short_type_name() {
        let holder = Holder {
            account: Account {
                username: "bob".into(),
                age: 31,
                tags: Vec::new(),
            },
        };
        let Value::Object(record) = Value::capture(&holder) else {
            panic!("expected a record");
        };
        assert!(record.type_name.ends_with("::Holder"));
        let Some(Value::Object(inner)) = record.get("account") else {
            panic!("expected a nested record");
        };
        assert_eq!(inner.type_name, "Account");
    }

    #[test]
    fn test_capture_is_a_deep_copy() {
        let mut items = vec![1, 2, 3];
        let captured = Value::capture(&items);
        items.push(4);
        assert_eq!(captured.as_list().map(<[Value]>::len), Some(3));
    }

    #[test]
    fn test_display_rules() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from("Alice").to_string(), "Alice");
        assert_eq!(Value::from(7).to_string(), "7");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(
            Value::List(vec![Value::from(1), Value::from("x")]).to_string(),
            r#"[1,"x"]"#
        );
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::sync::Arc<my::Service>"), "Arc");
        assert_eq!(short_type_name("my::module::Service"), "Service");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_opaque_tag_format() {
        let handle = std::sync::Mutex::new(5);
        let tag = Value::opaque(&handle).type_tag();
        assert!(tag.starts_with("Mutex@"), "{tag}");
    }
}
