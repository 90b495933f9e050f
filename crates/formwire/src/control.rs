//! The element seam: how the engine talks to an input control.
//!
//! The engine never touches a concrete DOM API. Everything it needs from an
//! input element is captured by [`FormControl`]: read the displayed value,
//! write the displayed value, and attach listeners for the key events that
//! drive element→cell synchronization. A WASM host implements this over
//! `web_sys::HtmlInputElement`; [`MemoryControl`] implements it in-process
//! for headless use and for the test suite.

use std::cell::RefCell;
use std::rc::Rc;

/// The input events the engine listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
	KeyUp,
	KeyDown,
}

impl EventType {
	/// The DOM event name.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventType::KeyUp => "keyup",
			EventType::KeyDown => "keydown",
		}
	}
}

/// An input element, as seen by the engine.
///
/// Implementations are expected to be cheaply cloneable handles onto shared
/// element state (the engine clones them into its sync effect and its event
/// listeners).
pub trait FormControl {
	/// The value currently displayed by the element.
	fn value(&self) -> String;

	/// Writes a value into the element.
	fn set_value(&self, value: &str);

	/// Attaches a listener for `event`. Listeners live as long as the
	/// element; tearing them down is the host's concern.
	fn add_event_listener(&self, event: EventType, handler: Rc<dyn Fn()>);
}

/// A host event, reduced to the one capability the engine uses.
///
/// Submit and reset handlers call [`prevent_default`](FormEvent::prevent_default)
/// on it so the host does not also perform its native action.
#[derive(Debug, Default)]
pub struct FormEvent {
	default_prevented: bool,
}

impl FormEvent {
	pub fn new() -> Self {
		Self::default()
	}

	/// Suppresses the host's default action for this event.
	pub fn prevent_default(&mut self) {
		self.default_prevented = true;
	}

	pub fn default_prevented(&self) -> bool {
		self.default_prevented
	}
}

type ListenerTable = RefCell<Vec<(EventType, Rc<dyn Fn()>)>>;

/// An in-process [`FormControl`]: a shared string cell plus a listener
/// table.
///
/// [`input`](MemoryControl::input) simulates the user typing into the
/// element: it replaces the displayed value and fires the key listeners,
/// which is exactly the path a DOM keystroke takes.
///
/// # Examples
///
/// ```
/// use formwire::control::{EventType, FormControl, MemoryControl};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let control = MemoryControl::new();
/// let fired = Rc::new(Cell::new(false));
///
/// let observed = fired.clone();
/// control.add_event_listener(EventType::KeyUp, Rc::new(move || observed.set(true)));
///
/// control.input("hello");
/// assert_eq!(control.value(), "hello");
/// assert!(fired.get());
/// ```
#[derive(Clone, Default)]
pub struct MemoryControl {
	value: Rc<RefCell<String>>,
	listeners: Rc<ListenerTable>,
}

impl MemoryControl {
	pub fn new() -> Self {
		Self::default()
	}

	/// Simulates a keystroke: replaces the displayed value, then fires the
	/// key-up and key-down listeners.
	pub fn input(&self, text: &str) {
		*self.value.borrow_mut() = text.to_string();
		self.fire(EventType::KeyUp);
		self.fire(EventType::KeyDown);
	}

	/// Fires every listener attached for `event`.
	pub fn fire(&self, event: EventType) {
		// Handlers may read or write this control; snapshot them so the
		// listener table is not borrowed while they run.
		let handlers: Vec<Rc<dyn Fn()>> = self
			.listeners
			.borrow()
			.iter()
			.filter(|(kind, _)| *kind == event)
			.map(|(_, handler)| handler.clone())
			.collect();
		for handler in handlers {
			handler();
		}
	}
}

impl FormControl for MemoryControl {
	fn value(&self) -> String {
		self.value.borrow().clone()
	}

	fn set_value(&self, value: &str) {
		*self.value.borrow_mut() = value.to_string();
	}

	fn add_event_listener(&self, event: EventType, handler: Rc<dyn Fn()>) {
		self.listeners.borrow_mut().push((event, handler));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn event_type_maps_to_dom_names() {
		assert_eq!(EventType::KeyUp.as_str(), "keyup");
		assert_eq!(EventType::KeyDown.as_str(), "keydown");
	}

	#[test]
	fn form_event_records_prevent_default() {
		let mut event = FormEvent::new();
		assert!(!event.default_prevented());

		event.prevent_default();
		assert!(event.default_prevented());
	}

	#[test]
	fn input_fires_both_key_listeners() {
		let control = MemoryControl::new();
		let keyups = Rc::new(Cell::new(0));
		let keydowns = Rc::new(Cell::new(0));

		let up_counter = keyups.clone();
		control.add_event_listener(EventType::KeyUp, Rc::new(move || up_counter.set(up_counter.get() + 1)));
		let down_counter = keydowns.clone();
		control.add_event_listener(
			EventType::KeyDown,
			Rc::new(move || down_counter.set(down_counter.get() + 1)),
		);

		control.input("x");

		assert_eq!(keyups.get(), 1);
		assert_eq!(keydowns.get(), 1);
	}

	#[test]
	fn set_value_does_not_fire_listeners() {
		let control = MemoryControl::new();
		let fired = Rc::new(Cell::new(false));

		let observed = fired.clone();
		control.add_event_listener(EventType::KeyUp, Rc::new(move || observed.set(true)));

		control.set_value("programmatic");

		assert_eq!(control.value(), "programmatic");
		assert!(!fired.get());
	}
}
