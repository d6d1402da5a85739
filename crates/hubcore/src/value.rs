use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed parameter value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    String(String),
    Vector(Vec<f64>),
    IntVector(Vec<i64>),
}

/// Discriminant of [`ParamValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Int,
    Float,
    String,
    Vector,
    IntVector,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Int => "Int",
            ParamType::Float => "Float",
            ParamType::String => "String",
            ParamType::Vector => "Vector",
            ParamType::IntVector => "IntVector",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(ParamType::Int),
            "Float" => Some(ParamType::Float),
            "String" => Some(ParamType::String),
            "Vector" => Some(ParamType::Vector),
            "IntVector" => Some(ParamType::IntVector),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::String(_) => ParamType::String,
            ParamValue::Vector(_) => ParamType::Vector,
            ParamValue::IntVector(_) => ParamType::IntVector,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Vector(v)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        ParamValue::IntVector(v)
    }
}
