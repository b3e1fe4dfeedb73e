//! ローカル変数

use serde::{Deserialize, Serialize};
use std::fmt;

/// 変数の値
///
/// デバッガが10進数として出力した値（`0n` プレフィックス付き）は整数として、
/// それ以外（16進アドレスや文字列を含む値）は出力されたままの文字列として保持します。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariableValue::Integer(i) => write!(f, "{}", i),
            VariableValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Text(value)
    }
}

/// スタックフレーム内の1つの変数
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    value: VariableValue,
}

impl Variable {
    /// 型名、変数名、値から変数を作成する
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} = {}", self.type_name, self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_equality() {
        let v = Variable::new("MyType", "MyName", "MyValue");
        assert_eq!(v, Variable::new("MyType", "MyName", "MyValue"));

        assert_ne!(v, Variable::new("OtherType", "MyName", "MyValue"));
        assert_ne!(v, Variable::new("MyType", "OtherName", "MyValue"));
        assert_ne!(v, Variable::new("MyType", "MyName", "OtherValue"));
    }

    #[test]
    fn test_integer_and_text_values_differ() {
        assert_ne!(Variable::new("int", "i", 1), Variable::new("int", "i", "1"));
    }

    #[test]
    fn test_variable_properties() {
        let v = Variable::new("char **", "argv", "0x032053f0");
        assert_eq!(v.type_name(), "char **");
        assert_eq!(v.name(), "argv");
        assert_eq!(v.value(), &VariableValue::Text("0x032053f0".to_string()));
        assert_eq!(v.to_string(), "char ** argv = 0x032053f0");
    }

    #[test]
    fn test_value_serializes_untagged() {
        let v = Variable::new("int", "argc", 1);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"int","name":"argc","value":1}"#);
        let back: Variable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
