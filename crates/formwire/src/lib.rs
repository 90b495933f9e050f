//! Reactive form-state engine.
//!
//! `formwire` keeps a form's values, validation errors, and submission state
//! in fine-grained reactive cells (from [`formwire_reactive`]) and wires them
//! to input elements through the [`FormControl`] seam. The programming model:
//!
//! 1. Create a [`FormEngine`] with optional per-field defaults.
//! 2. [`register`](FormEngine::register) each field with its validation
//!    rules and [`attach`](FieldBinding::attach) the binding to a control.
//! 3. Hand [`handle_submit`](FormEngine::handle_submit)'s closure to the
//!    form's submit event.
//!
//! Validation is gated on the first submission attempt: until then the user
//! can type freely without being nagged; afterwards every change re-validates
//! synchronously. [`watch`](FormEngine::watch),
//! [`set_value`](FormEngine::set_value), [`reset`](FormEngine::reset) and
//! [`form_state`](FormEngine::form_state) round out the surface.
//!
//! # Example
//!
//! ```
//! use formwire::{FormEngine, FormEvent, FormOptions, MemoryControl, RegisterOptions};
//! use regex::Regex;
//!
//! let engine = FormEngine::new(FormOptions::default());
//!
//! let email = MemoryControl::new();
//! engine
//! 	.register(
//! 		"email",
//! 		RegisterOptions::new()
//! 			.require("email is required")
//! 			.regexp(Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap(), "not an email"),
//! 	)
//! 	.attach(&email);
//!
//! let mut on_submit = engine.handle_submit(|values| {
//! 	println!("submitting {}", values["email"]);
//! });
//!
//! // Empty field: the attempt flips the gate and is blocked.
//! on_submit(&mut FormEvent::new());
//! assert!(engine.form_state().has_errors());
//!
//! // Typing now re-validates on every keystroke.
//! email.input("ada@example.com");
//! assert!(!engine.form_state().has_errors());
//! ```

pub mod control;
pub mod errors;
pub mod field;
pub mod form;

pub use control::{EventType, FormControl, FormEvent, MemoryControl};
pub use errors::{ErrorKind, FieldError, FormError};
pub use field::ValueAccessor;
pub use form::{FieldBinding, FormEngine, FormOptions, FormState, RegisterOptions, ValueSetter};
