//! The form engine: field registration, two-way sync, and derived errors.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  register/attach   ┌──────────────┐
//! │  UI code   │ ─────────────────▶ │ FormEngine   │
//! │            │                    │  registry    │── Signal<String> per field
//! │  element   │ ◀── value→element ─│  rule fx     │── Signal<map<name,FieldError>>
//! │ (control)  │ ── element→value ─▶│  submit gate │── Signal<bool> (attempted)
//! └────────────┘   keyup/keydown    └──────────────┘
//! ```
//!
//! Every field owns one reactive value cell. Attaching a control installs a
//! layout effect that mirrors the cell into the element, listeners that
//! mirror the element back into the cell, and one independent layout effect
//! per configured validation rule. Rule effects read the submission flag and
//! the value cell (read = subscribe), stay inert until the first submission
//! attempt, and afterwards keep the error store current on every change.
//!
//! ## Error ownership
//!
//! Each rule only ever sets an error of its own kind, and only clears the
//! stored error when its kind matches. Rules for one field share their
//! dependencies, so within a single change they run in installation order
//! (require, regexp, validation) and the last one to run decides what
//! remains visible. Two disagreeing rules can therefore flap; that is the
//! documented ordering policy.
//!
//! ## Example
//!
//! ```
//! use formwire::{FormEngine, FormEvent, FormOptions, MemoryControl, RegisterOptions};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let engine = FormEngine::new(FormOptions::default());
//!
//! let input = MemoryControl::new();
//! engine
//! 	.register("name", RegisterOptions::new().require("name is required"))
//! 	.attach(&input);
//!
//! input.input("Ada");
//!
//! let submitted = Rc::new(RefCell::new(None));
//! let sink = submitted.clone();
//! let mut on_submit = engine.handle_submit(move |values| {
//! 	*sink.borrow_mut() = Some(values);
//! });
//!
//! let mut event = FormEvent::new();
//! on_submit(&mut event);
//!
//! assert!(event.default_prevented());
//! let values = submitted.borrow_mut().take().unwrap();
//! assert_eq!(values["name"], "Ada");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use formwire_reactive::{Effect, EffectTiming, Signal};
use regex::Regex;

use crate::control::{EventType, FormControl, FormEvent};
use crate::errors::{ErrorKind, FieldError, FormError};
use crate::field::{Field, ValueAccessor};

type ValidationFn = dyn Fn(&str) -> Option<String>;

/// Form-wide configuration, captured once at engine creation.
#[derive(Clone, Default)]
pub struct FormOptions {
	default_values: HashMap<String, String>,
}

impl FormOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the default value a field captures at first registration.
	///
	/// Fields without a configured default start empty.
	pub fn default_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_values.insert(name.into(), value.into());
		self
	}
}

/// Per-field validation configuration, passed to
/// [`register`](FormEngine::register).
///
/// All three rule kinds are independent; a field may carry any subset.
#[derive(Clone, Default)]
pub struct RegisterOptions {
	require: Option<String>,
	regexp: Option<(Regex, String)>,
	validation: Option<Rc<ValidationFn>>,
}

impl RegisterOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fails with `message` while the field is empty.
	pub fn require(mut self, message: impl Into<String>) -> Self {
		self.require = Some(message.into());
		self
	}

	/// Fails with `message` while the value does not match `pattern`.
	pub fn regexp(mut self, pattern: Regex, message: impl Into<String>) -> Self {
		self.regexp = Some((pattern, message.into()));
		self
	}

	/// Caller-supplied rule: return `Some(message)` to fail, `None` to pass.
	pub fn validation<F>(mut self, rule: F) -> Self
	where
		F: Fn(&str) -> Option<String> + 'static,
	{
		self.validation = Some(Rc::new(rule));
		self
	}
}

struct EngineInner {
	/// Field registry, keyed by name. Private to this engine instance;
	/// independent forms never share state.
	fields: RefCell<HashMap<String, Field>>,
	/// name -> current error. Clearing an error removes its key, so map
	/// emptiness means "no active errors".
	errors: Signal<HashMap<String, FieldError>>,
	/// Monotonic Pristine→Attempted flag; rules are inert while false.
	submitted: Signal<bool>,
	defaults: HashMap<String, String>,
}

/// One form instance: field registry, validation state, and submission gate.
///
/// Cloning an engine clones a handle; all clones operate on the same form.
/// The engine is single-threaded by construction (its cells are `Rc`-based)
/// and performs no locking. Consistency comes from the reactive substrate's
/// synchronous layout-effect execution.
#[derive(Clone)]
pub struct FormEngine {
	inner: Rc<EngineInner>,
}

impl FormEngine {
	pub fn new(options: FormOptions) -> Self {
		Self {
			inner: Rc::new(EngineInner {
				fields: RefCell::new(HashMap::new()),
				errors: Signal::new(HashMap::new()),
				submitted: Signal::new(false),
				defaults: options.default_values,
			}),
		}
	}

	/// Prepares a binding descriptor for one named input.
	///
	/// Nothing happens until the descriptor is
	/// [`attach`](FieldBinding::attach)ed to a control; the field itself is
	/// created on first attachment.
	pub fn register(&self, name: impl Into<String>, options: RegisterOptions) -> FieldBinding {
		FieldBinding {
			engine: self.clone(),
			name: name.into(),
			options,
		}
	}

	/// Read-only accessor for a field's current value.
	///
	/// Creates a watch-only field (no element wiring) if the name is not
	/// yet registered; an existing field's cell is returned as-is, without
	/// a reset.
	pub fn watch(&self, name: impl Into<String>) -> ValueAccessor {
		let name = name.into();
		let mut fields = self.inner.fields.borrow_mut();
		let field = fields.entry(name.clone()).or_insert_with(|| {
			let default = self.inner.defaults.get(&name).cloned().unwrap_or_default();
			tracing::debug!(field = %name, "creating watch-only field");
			Field::watch_only(name, default)
		});
		ValueAccessor::new(field.value.clone())
	}

	/// Builds the submit handler for this form.
	///
	/// The handler prevents the event's default action, marks the form as
	/// attempted (the flag never goes back to false), and
	/// invokes `callback` with a name→value snapshot of every field in the
	/// registry iff no field currently holds an error. Watch-only fields
	/// are included in the snapshot.
	pub fn handle_submit<F>(&self, mut callback: F) -> impl FnMut(&mut FormEvent)
	where
		F: FnMut(HashMap<String, String>) + 'static,
	{
		let engine = self.clone();
		move |event: &mut FormEvent| {
			event.prevent_default();

			// First transition runs every rule effect synchronously, so the
			// snapshot below already reflects post-submit validation.
			if !engine.inner.submitted.get_untracked() {
				engine.inner.submitted.set(true);
			}

			let errors = engine.inner.errors.get_untracked();
			if errors.is_empty() {
				callback(engine.values());
			} else {
				tracing::debug!(active_errors = errors.len(), "submission blocked");
			}
		}
	}

	/// Restores every field to its default value.
	///
	/// Prevents the triggering event's default action when one is supplied.
	pub fn reset(&self, event: Option<&mut FormEvent>) {
		if let Some(event) = event {
			event.prevent_default();
		}

		// Collect first: the writes below run layout effects, which must
		// not observe the registry borrowed.
		let cells: Vec<(Signal<String>, String)> = self
			.inner
			.fields
			.borrow()
			.values()
			.map(|field| (field.value.clone(), field.default_value.clone()))
			.collect();
		for (cell, default) in cells {
			cell.set(default);
		}
	}

	/// Restores one field to its default value.
	pub fn reset_field(&self, name: &str) -> Result<(), FormError> {
		let (cell, default) = {
			let fields = self.inner.fields.borrow();
			let field = fields.get(name).ok_or_else(|| FormError::FieldNotRegistered {
				name: name.to_string(),
			})?;
			(field.value.clone(), field.default_value.clone())
		};
		cell.set(default);
		Ok(())
	}

	/// Coerces `value` to a string and writes it into the named field.
	pub fn set_value(&self, name: &str, value: impl ToString) -> Result<(), FormError> {
		let coerced = value.to_string();
		let cell = {
			let fields = self.inner.fields.borrow();
			let field = fields.get(name).ok_or_else(|| FormError::FieldNotRegistered {
				name: name.to_string(),
			})?;
			field.value.clone()
		};
		cell.set(coerced);
		Ok(())
	}

	/// Curried form of [`set_value`](FormEngine::set_value).
	///
	/// The name is dereferenced when the setter is applied, not when it is
	/// created, so a setter taken out early still fails fast if the field
	/// has been unregistered by the time it is used.
	pub fn setter(&self, name: impl Into<String>) -> ValueSetter {
		ValueSetter {
			engine: self.clone(),
			name: name.into(),
		}
	}

	/// Removes a field from the registry and disposes its reactive effects.
	///
	/// Unknown names are a silent no-op. A subsequent registration under
	/// the same name starts from fresh state.
	pub fn unregister(&self, name: &str) {
		let removed = self.inner.fields.borrow_mut().remove(name);
		if let Some(field) = removed {
			// Dropping the field drops its binding effects, detaching the
			// value cell from the reactive graph. The field's error (if
			// any) goes with it: nothing could ever clear it again.
			drop(field);
			self.inner.errors.update(|store| {
				store.remove(name);
			});
			tracing::debug!(field = %name, "unregistered field");
		}
	}

	/// Reactive view of the form's derived state.
	pub fn form_state(&self) -> FormState {
		FormState {
			errors: self.inner.errors.clone(),
			submitted: self.inner.submitted.clone(),
		}
	}

	/// Snapshot of every registry field's current value.
	pub fn values(&self) -> HashMap<String, String> {
		self.inner
			.fields
			.borrow()
			.iter()
			.map(|(name, field)| (name.clone(), field.value.get_untracked()))
			.collect()
	}

	/// Installs one rule as an independent layout effect.
	///
	/// `check` returns `Some(message)` on failure. The store mutation is a
	/// single read-modify-write: set unconditionally on failure, clear only
	/// an error of our own kind on pass.
	fn rule_effect<F>(&self, name: &str, value: &Signal<String>, kind: ErrorKind, check: F) -> Effect
	where
		F: Fn(&str) -> Option<String> + 'static,
	{
		let errors = self.inner.errors.clone();
		let submitted = self.inner.submitted.clone();
		let value = value.clone();
		let name = name.to_string();
		Effect::new_with_timing(
			move || {
				// Both reads subscribe this rule to its dependencies.
				let attempted = submitted.get();
				let current = value.get();
				if !attempted {
					return;
				}
				errors.update(|store| match check(&current) {
					Some(message) => {
						tracing::trace!(field = %name, kind = kind.as_str(), "rule failed");
						store.insert(name.clone(), FieldError::new(kind, message));
					}
					None => {
						if store.get(&name).is_some_and(|error| error.kind == kind) {
							store.remove(&name);
						}
					}
				});
			},
			EffectTiming::Layout,
		)
	}
}

impl Default for FormEngine {
	fn default() -> Self {
		Self::new(FormOptions::default())
	}
}

/// Binding descriptor returned by [`FormEngine::register`], consumed by an
/// input element on attachment.
pub struct FieldBinding {
	engine: FormEngine,
	name: String,
	options: RegisterOptions,
}

impl FieldBinding {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Performs the element-attachment work for this field.
	///
	/// Looks up or creates the field (capturing its default from the form
	/// options, else `""`), resets it, and installs the two sync bindings
	/// plus one validation effect per configured rule.
	///
	/// Attaching the same name again (a remount) reuses the existing value
	/// cell, disposes the previous attachment's effects, and resets the
	/// value. A remounted field shows its default, not its last edit.
	pub fn attach<C>(&self, control: &C)
	where
		C: FormControl + Clone + 'static,
	{
		let inner = &self.engine.inner;

		let (cell, default) = {
			let mut fields = inner.fields.borrow_mut();
			let field = fields.entry(self.name.clone()).or_insert_with(|| {
				let default = inner.defaults.get(&self.name).cloned().unwrap_or_default();
				tracing::debug!(field = %self.name, "creating field on first attachment");
				Field::registered(self.name.clone(), default)
			});
			if field.watched {
				// A watcher got here first; the field is element-backed from
				// now on.
				tracing::debug!(field = %self.name, "promoting watch-only field");
				field.watched = false;
			}
			field.dispose_bindings();
			(field.value.clone(), field.default_value.clone())
		};

		cell.set(default);

		let mut bindings = Vec::new();

		// Cell → element. Runs once now (writing the default into the
		// element) and again on every cell change.
		{
			let element = control.clone();
			let value = cell.clone();
			bindings.push(Effect::new_with_timing(
				move || element.set_value(&value.get()),
				EffectTiming::Layout,
			));
		}

		// Element → cell, on key-up and key-down, guarded so an unchanged
		// element value never causes a redundant write.
		for event in [EventType::KeyUp, EventType::KeyDown] {
			let element = control.clone();
			let value = cell.clone();
			control.add_event_listener(
				event,
				Rc::new(move || {
					let typed = element.value();
					if value.get_untracked() != typed {
						value.set(typed);
					}
				}),
			);
		}

		// Installation order is the ordering policy: the last-installed
		// rule's effect runs last and its verdict stays visible.
		if let Some(message) = self.options.require.clone() {
			bindings.push(self.engine.rule_effect(&self.name, &cell, ErrorKind::Require, move |value| {
				if value.is_empty() {
					Some(message.clone())
				} else {
					None
				}
			}));
		}
		if let Some((pattern, message)) = self.options.regexp.clone() {
			bindings.push(self.engine.rule_effect(&self.name, &cell, ErrorKind::Regexp, move |value| {
				if pattern.is_match(value) {
					None
				} else {
					Some(message.clone())
				}
			}));
		}
		if let Some(rule) = self.options.validation.clone() {
			bindings.push(self.engine.rule_effect(
				&self.name,
				&cell,
				ErrorKind::Validation,
				move |value| rule(value),
			));
		}

		if let Some(field) = inner.fields.borrow_mut().get_mut(&self.name) {
			field.bindings = bindings;
		}
	}
}

/// Curried setter returned by [`FormEngine::setter`].
#[derive(Clone)]
pub struct ValueSetter {
	engine: FormEngine,
	name: String,
}

impl ValueSetter {
	/// Coerces `value` to a string and writes it into the field this setter
	/// was created for.
	pub fn set(&self, value: impl ToString) -> Result<(), FormError> {
		self.engine.set_value(&self.name, value)
	}
}

/// Read-only view of a form's derived state.
#[derive(Clone)]
pub struct FormState {
	errors: Signal<HashMap<String, FieldError>>,
	submitted: Signal<bool>,
}

impl FormState {
	/// Snapshot of all current errors. Subscribes the running effect.
	pub fn errors(&self) -> HashMap<String, FieldError> {
		self.errors.get()
	}

	/// The named field's current error, if any.
	pub fn error(&self, name: &str) -> Option<FieldError> {
		self.errors.get().get(name).cloned()
	}

	/// Whether at least one field currently holds an error.
	pub fn has_errors(&self) -> bool {
		!self.errors.get().is_empty()
	}

	/// Whether a submission has ever been attempted.
	pub fn was_first_submit(&self) -> bool {
		self.submitted.get()
	}
}
