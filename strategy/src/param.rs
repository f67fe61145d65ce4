//! Declarative parameter specifications for configurable strategies.

use serde::{Deserialize, Serialize};

/// A strategy parameter's value.
///
/// Closed over the primitive types strategies actually tune; there is no
/// open-ended `Enum` variant the way the Python original has, since Rust
/// enums are nominal types a `ParamValue` can't represent generically —
/// a strategy with an enum-valued parameter declares its own `choices`
/// list as strings instead.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// Specification for a single tunable strategy parameter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParamSpec {
    pub default: ParamValue,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    pub step: Option<ParamValue>,
    pub choices: Option<Vec<ParamValue>>,
}

impl ParamSpec {
    pub fn new(default: ParamValue) -> Self {
        Self {
            default,
            min: None,
            max: None,
            step: None,
            choices: None,
        }
    }

    pub fn with_bounds(mut self, min: ParamValue, max: ParamValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_choices(mut self, choices: Vec<ParamValue>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// The effective set of allowed values, if any were declared.
    pub fn resolved_choices(&self) -> Option<&[ParamValue]> {
        self.choices.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_choices_is_none_without_explicit_choices() {
        let spec = ParamSpec::new(ParamValue::Int(20));
        assert!(spec.resolved_choices().is_none());
    }

    #[test]
    fn resolved_choices_returns_explicit_list() {
        let spec = ParamSpec::new(ParamValue::Int(20))
            .with_choices(vec![ParamValue::Int(10), ParamValue::Int(20)]);
        assert_eq!(spec.resolved_choices().unwrap().len(), 2);
    }
}
