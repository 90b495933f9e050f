//! Error taxonomy for the form engine.
//!
//! Two distinct failure classes, never mixed:
//!
//! - [`FieldError`]: a validation failure. Recoverable, user-facing, and
//!   represented as *data* in the error store; it is never returned as an
//!   `Err` and never panics.
//! - [`FormError`]: a usage failure (a programming error such as
//!   addressing an unregistered field). Fails fast as a typed `Result`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which rule produced a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
	/// Non-empty check.
	Require,
	/// Caller-supplied predicate.
	Validation,
	/// Pattern-match rule.
	Regexp,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::Require => "require",
			ErrorKind::Validation => "validation",
			ErrorKind::Regexp => "regexp",
		}
	}
}

/// The current validation failure of one field.
///
/// A field holds at most one `FieldError` at a time; which one wins when
/// several rules disagree is decided by rule execution order (see the
/// crate-level documentation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// The rule that produced this error.
	#[serde(rename = "type")]
	pub kind: ErrorKind,
	/// Message shown to the user.
	pub message: String,
}

impl FieldError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}
}

/// A usage failure: the caller addressed a field the registry does not know.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
	#[error("field `{name}` is not registered")]
	FieldNotRegistered { name: String },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_kind_serializes_to_lowercase_tag() {
		let error = FieldError::new(ErrorKind::Regexp, "invalid email");
		let json = serde_json::to_value(&error).unwrap();
		assert_eq!(json["type"], "regexp");
		assert_eq!(json["message"], "invalid email");
	}

	#[test]
	fn error_kind_round_trips_through_serde() {
		for kind in [ErrorKind::Require, ErrorKind::Validation, ErrorKind::Regexp] {
			let json = serde_json::to_string(&kind).unwrap();
			let back: ErrorKind = serde_json::from_str(&json).unwrap();
			assert_eq!(back, kind);
		}
	}

	#[test]
	fn form_error_names_the_field() {
		let error = FormError::FieldNotRegistered {
			name: "email".to_string(),
		};
		assert_eq!(error.to_string(), "field `email` is not registered");
	}
}
