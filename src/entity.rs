//! Character entity: snapshot type and partial-update change sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node label for characters in the graph store.
pub const CHARACTER_LABEL: &str = "Characters";

/// Natural key property used to look characters up.
pub const KEY_PROPERTY: &str = "name";

/// A scalar property value as stored on a node. Null is represented by the
/// property being absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Property name → value for a single node.
pub type PropertyMap = BTreeMap<String, Value>;

/// Node properties as they arrive from a store record.
///
/// Nodes may carry properties of any type. Integers and strings decode to
/// [`Value`]; a float with no fractional part decodes as an integer. Every
/// other value (fractional floats, booleans, lists, maps, temporals) is
/// skipped and reads as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct StoredProperties(BTreeMap<String, StoredValue>);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Int(i64),
    Float(f64),
    Str(String),
    Other(serde::de::IgnoredAny),
}

// Largest f64 magnitude below which every integral value is exact.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl StoredValue {
    fn into_value(self) -> Option<Value> {
        match self {
            StoredValue::Int(v) => Some(Value::Int(v)),
            StoredValue::Float(v) if v.fract() == 0.0 && v.abs() <= MAX_EXACT_FLOAT => {
                Some(Value::Int(v as i64))
            }
            StoredValue::Str(s) => Some(Value::Str(s)),
            StoredValue::Float(_) | StoredValue::Other(_) => None,
        }
    }
}

impl From<StoredProperties> for PropertyMap {
    fn from(stored: StoredProperties) -> Self {
        stored
            .0
            .into_iter()
            .filter_map(|(key, value)| value.into_value().map(|v| (key, v)))
            .collect()
    }
}

/// Scalar snapshot of a character node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub height: Option<i64>,
    pub mass: Option<i64>,
    pub skin_colors: Option<String>,
    pub hair_colors: Option<String>,
    pub eye_colors: Option<String>,
    pub birth_year: Option<String>,
    pub gender: Option<String>,
}

impl Character {
    /// Build a snapshot from raw node properties.
    ///
    /// Returns `None` when `name` is missing or not a string. Properties of
    /// the wrong type read as absent.
    pub fn from_properties(props: &PropertyMap) -> Option<Self> {
        let int = |key: &str| props.get(key).and_then(Value::as_int);
        let string = |key: &str| props.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            id: string("id").unwrap_or_default(),
            name: string(KEY_PROPERTY)?,
            height: int("height"),
            mass: int("mass"),
            skin_colors: string("skin_colors"),
            hair_colors: string("hair_colors"),
            eye_colors: string("eye_colors"),
            birth_year: string("birth_year"),
            gender: string("gender"),
        })
    }

    /// Inverse of [`Character::from_properties`]; absent fields are omitted.
    pub fn to_properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("id".to_string(), Value::from(self.id.as_str()));
        props.insert(KEY_PROPERTY.to_string(), Value::from(self.name.as_str()));

        let ints = [("height", self.height), ("mass", self.mass)];
        for (key, value) in ints {
            if let Some(v) = value {
                props.insert(key.to_string(), Value::Int(v));
            }
        }

        let strings = [
            ("skin_colors", &self.skin_colors),
            ("hair_colors", &self.hair_colors),
            ("eye_colors", &self.eye_colors),
            ("birth_year", &self.birth_year),
            ("gender", &self.gender),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                props.insert(key.to_string(), Value::Str(v.clone()));
            }
        }

        props
    }
}

/// A single-field change: keep the stored value, clear it, or overwrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Change<T> {
    fn default() -> Self {
        Change::Keep
    }
}

impl<T> Change<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Change::Keep)
    }
}

impl<T> From<async_graphql::MaybeUndefined<T>> for Change<T> {
    fn from(value: async_graphql::MaybeUndefined<T>) -> Self {
        match value {
            async_graphql::MaybeUndefined::Undefined => Change::Keep,
            async_graphql::MaybeUndefined::Null => Change::Clear,
            async_graphql::MaybeUndefined::Value(v) => Change::Set(v),
        }
    }
}

/// Assignment of one property in an update. `None` removes the property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub property: &'static str,
    pub value: Option<Value>,
}

/// The mutable scalar fields of a character, each independently present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub mass: Change<i64>,
    pub gender: Change<String>,
    pub birth_year: Change<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.mass.is_keep() && self.gender.is_keep() && self.birth_year.is_keep()
    }

    /// Property assignments for every present field, in declaration order.
    pub fn assignments(&self) -> Vec<Assignment> {
        let mut out = Vec::new();
        push_change(&mut out, "mass", &self.mass, |v| Value::Int(*v));
        push_change(&mut out, "gender", &self.gender, |v| Value::Str(v.clone()));
        push_change(&mut out, "birth_year", &self.birth_year, |v| Value::Str(v.clone()));
        out
    }
}

fn push_change<T>(
    out: &mut Vec<Assignment>,
    property: &'static str,
    change: &Change<T>,
    to_value: impl Fn(&T) -> Value,
) {
    match change {
        Change::Keep => {}
        Change::Clear => out.push(Assignment { property, value: None }),
        Change::Set(v) => out.push(Assignment {
            property,
            value: Some(to_value(v)),
        }),
    }
}

// Used in log events: field names and requested values only.
impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments = self.assignments();
        if assignments.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, a) in assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &a.value {
                None => write!(f, "{}: null", a.property)?,
                Some(Value::Int(v)) => write!(f, "{}: {}", a.property, v)?,
                Some(Value::Str(s)) => write!(f, "{}: {:?}", a.property, s)?,
            }
        }
        write!(f, "}}")
    }
}
