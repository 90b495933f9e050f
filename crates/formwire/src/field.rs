//! Field records and read-only value accessors.

use formwire_reactive::{Effect, Signal};

/// One named input's entry in the registry.
///
/// The value cell is created once per name and survives re-registration:
/// remounting a field reuses (and resets) the existing cell rather than
/// allocating a new one, which keeps watchers and other subscribers valid
/// across re-renders.
pub(crate) struct Field {
	pub(crate) name: String,
	pub(crate) default_value: String,
	pub(crate) value: Signal<String>,
	/// True when the field was created by `watch` and has no element wiring.
	pub(crate) watched: bool,
	/// Sync and validation effects owned by the current attachment.
	/// Dropping them detaches the field from the reactive graph.
	pub(crate) bindings: Vec<Effect>,
}

impl Field {
	pub(crate) fn registered(name: String, default_value: String) -> Self {
		Self {
			name,
			value: Signal::new(default_value.clone()),
			default_value,
			watched: false,
			bindings: Vec::new(),
		}
	}

	pub(crate) fn watch_only(name: String, default_value: String) -> Self {
		Self {
			name,
			value: Signal::new(default_value.clone()),
			default_value,
			watched: true,
			bindings: Vec::new(),
		}
	}

	/// Disposes the effects of the previous attachment, if any.
	pub(crate) fn dispose_bindings(&mut self) {
		if !self.bindings.is_empty() {
			tracing::trace!(field = %self.name, count = self.bindings.len(), "disposing field bindings");
		}
		self.bindings.clear();
	}
}

/// Read-only view over a field's value cell, returned by
/// [`FormEngine::watch`](crate::FormEngine::watch).
///
/// Reading through [`get`](ValueAccessor::get) inside an effect subscribes
/// that effect to the field, exactly as reading the underlying signal would;
/// the accessor simply withholds the write half.
#[derive(Clone)]
pub struct ValueAccessor {
	value: Signal<String>,
}

impl ValueAccessor {
	pub(crate) fn new(value: Signal<String>) -> Self {
		Self { value }
	}

	/// Current value; subscribes the running effect, if any.
	pub fn get(&self) -> String {
		self.value.get()
	}

	/// Current value without establishing a dependency.
	pub fn get_untracked(&self) -> String {
		self.value.get_untracked()
	}
}
