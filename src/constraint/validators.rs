//! # Built-in Validators
//!
//! Common validators shipped with the crate. Each returns a ready-to-use
//! [`ValidatorFn`]; callers compose them with their own closures.

use regex::Regex;
use serde_json::Value;

use super::{validator, ValidatorFn};
use crate::validate::ValidationError;

/// Character count for strings, element count for arrays
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Value must be a string or array with at least `min` items
pub fn min_length(min: usize) -> ValidatorFn {
    validator(move |value, _deps| async move {
        match length_of(&value) {
            Some(len) if len >= min => Ok(()),
            Some(_) => Err(ValidationError::invalid(format!(
                "must have length of at least {min}"
            ))
            .into()),
            None => Err(ValidationError::invalid("must be a string or a list").into()),
        }
    })
}

/// Value must be a string or array with at most `max` items
pub fn max_length(max: usize) -> ValidatorFn {
    validator(move |value, _deps| async move {
        match length_of(&value) {
            Some(len) if len <= max => Ok(()),
            Some(_) => Err(ValidationError::invalid(format!(
                "must have length of at most {max}"
            ))
            .into()),
            None => Err(ValidationError::invalid("must be a string or a list").into()),
        }
    })
}

/// String value must match the compiled pattern
pub fn pattern(re: Regex, message: impl Into<String>) -> ValidatorFn {
    let message = message.into();
    validator(move |value, _deps| {
        let re = re.clone();
        let message = message.clone();
        async move {
            match value.as_str() {
                Some(s) if re.is_match(s) => Ok(()),
                Some(_) => Err(ValidationError::invalid(message).into()),
                None => Err(ValidationError::invalid("must be a string").into()),
            }
        }
    })
}

/// Value must be one of the allowed values
pub fn one_of(allowed: Vec<Value>) -> ValidatorFn {
    validator(move |value, _deps| {
        let allowed = allowed.clone();
        async move {
            if allowed.contains(&value) {
                Ok(())
            } else {
                Err(ValidationError::invalid("is not an allowed value").into())
            }
        }
    })
}

/// Value must equal the resolved value of the named dependency.
/// The dependency must also be declared in the constraint's
/// `dependencies` list.
pub fn equals_field(dep: impl Into<String>, message: impl Into<String>) -> ValidatorFn {
    let dep = dep.into();
    let message = message.into();
    validator(move |value, deps| {
        let dep = dep.clone();
        let message = message.clone();
        async move {
            let other = deps.get(&dep).cloned().unwrap_or(Value::Null);
            if value == other {
                Ok(())
            } else {
                Err(ValidationError::invalid(message).into())
            }
        }
    })
}
