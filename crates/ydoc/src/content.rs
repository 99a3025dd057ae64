//! Item payloads.
//!
//! | Rust type  | Role                                                 |
//! |------------|------------------------------------------------------|
//! | `Value`    | Scalar payload (null, bool, int, float, string)      |
//! | `Content`  | What an item stores: a scalar or a nested container  |
//! | `Input`    | What callers hand to `insert`/`set`                  |
//! | `Out`      | What views hand back: a scalar or a container handle |

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::types::{ContainerKind, ContainerRef};

// ── Value ─────────────────────────────────────────────────────────────────

/// A scalar stored in a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ── Content ───────────────────────────────────────────────────────────────

/// The payload of one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Value(Value),
    /// The item creates a nested container addressed by the item's id.
    Container(ContainerKind),
}

// ── Input ─────────────────────────────────────────────────────────────────

/// A value handed to `insert`/`push`/`set`.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(Value),
    Container(ContainerKind),
}

impl From<Input> for Content {
    fn from(input: Input) -> Self {
        match input {
            Input::Value(v) => Content::Value(v),
            Input::Container(kind) => Content::Container(kind),
        }
    }
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        Input::Value(v)
    }
}

impl From<ContainerKind> for Input {
    fn from(kind: ContainerKind) -> Self {
        Input::Container(kind)
    }
}

macro_rules! input_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for Input {
            fn from(v: $t) -> Self {
                Input::Value(Value::from(v))
            }
        })*
    };
}

input_from_scalar!(&str, String, bool, i64, i32, u32, f64, ());

// ── Out ───────────────────────────────────────────────────────────────────

/// A materialized element of a sequence or map.
#[derive(Debug, Clone, PartialEq)]
pub enum Out {
    Value(Value),
    Container(ContainerRef),
}

impl Out {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Out::Value(v) => Some(v),
            Out::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerRef> {
        match self {
            Out::Value(_) => None,
            Out::Container(c) => Some(c),
        }
    }
}

impl From<Value> for Out {
    fn from(v: Value) -> Self {
        Out::Value(v)
    }
}

macro_rules! out_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for Out {
            fn from(v: $t) -> Self {
                Out::Value(Value::from(v))
            }
        })*
    };
}

out_from_scalar!(&str, String, bool, i64, i32, u32, f64, ());
