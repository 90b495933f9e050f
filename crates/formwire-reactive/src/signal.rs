//! Signal - the reactive value cell
//!
//! `Signal<T>` holds a value and automatically tracks who reads it.
//!
//! - **Dependency tracking**: a `get()` inside an [`Effect`] records the
//!   effect as a subscriber of this signal.
//! - **Change notification**: `set()` and `update()` notify subscribers;
//!   layout effects re-run before the write returns.
//! - **Cheap to share**: cloning a signal clones an `Rc`, all clones refer
//!   to the same cell.
//!
//! [`Effect`]: crate::Effect
//!
//! ## Example
//!
//! ```
//! use formwire_reactive::Signal;
//!
//! let name = Signal::new(String::from("ada"));
//! assert_eq!(name.get(), "ada");
//!
//! name.set(String::from("grace"));
//! assert_eq!(name.get(), "grace");
//!
//! name.update(|value| value.push_str("!"));
//! assert_eq!(name.get(), "grace!");
//! ```

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use crate::runtime::{NodeId, try_with_runtime, with_runtime};

/// A reactive value cell.
///
/// The fundamental building block of the reactive system: a piece of state
/// that changes over time and notifies dependent computations when it does.
///
/// `T` must be `'static`; the cell is shared via `Rc<RefCell<T>>` and is not
/// `Send`, keeping all reactivity on one thread.
#[derive(Clone)]
pub struct Signal<T: 'static> {
	id: NodeId,
	value: Rc<RefCell<T>>,
}

impl<T: 'static> Signal<T> {
	/// Creates a new signal holding `value`.
	pub fn new(value: T) -> Self {
		Self {
			id: NodeId::new(),
			value: Rc::new(RefCell::new(value)),
		}
	}

	/// Returns the current value, subscribing the running effect (if any).
	///
	/// Reading inside an effect is what establishes the dependency; this is
	/// the "read = subscribe" half of the reactive contract.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		with_runtime(|rt| rt.track_dependency(self.id));
		self.get_untracked()
	}

	/// Returns the current value without establishing a dependency.
	///
	/// Use this to peek at a signal from inside an effect that must not
	/// re-run when the peeked value changes.
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Replaces the value and notifies subscribers.
	///
	/// Layout subscribers run synchronously before `set` returns.
	pub fn set(&self, value: T) {
		*self.value.borrow_mut() = value;
		with_runtime(|rt| rt.notify_signal_change(self.id));
	}

	/// Mutates the value in place under a single notification.
	///
	/// This is the atomic read-modify-write primitive: `f` observes the
	/// previous value and produces the next one with no notification in
	/// between, so concurrent-looking updates within one tick cannot be
	/// lost. The closure does not track dependencies.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut *self.value.borrow_mut());
		with_runtime(|rt| rt.notify_signal_change(self.id));
	}

	/// The runtime id of this signal.
	pub fn id(&self) -> NodeId {
		self.id
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		// Last clone cleans the node out of the runtime graph.
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| rt.remove_node(self.id));
		}
	}
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &self.get_untracked())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::runtime::{EffectTiming, NodeType, Observer};
	use serial_test::serial;

	#[test]
	#[serial]
	fn holds_initial_value() {
		let signal = Signal::new(String::from("default"));
		assert_eq!(signal.get_untracked(), "default");
	}

	#[test]
	#[serial]
	fn set_replaces_value() {
		let signal = Signal::new(String::new());
		signal.set(String::from("typed"));
		assert_eq!(signal.get_untracked(), "typed");
	}

	#[test]
	#[serial]
	fn update_mutates_in_place() {
		let signal = Signal::new(vec![1]);
		signal.update(|v| v.push(2));
		assert_eq!(signal.get_untracked(), vec![1, 2]);
	}

	#[test]
	#[serial]
	fn clones_share_the_cell() {
		let a = Signal::new(10);
		let b = a.clone();

		a.set(42);
		assert_eq!(b.get_untracked(), 42);
	}

	#[test]
	#[serial]
	fn get_tracks_dependency_under_observer() {
		let signal = Signal::new(0);

		// Outside an observer, get() works and tracks nothing.
		assert_eq!(signal.get(), 0);

		with_runtime(|rt| {
			let observer_id = NodeId::new();
			rt.push_observer(Observer {
				id: observer_id,
				node_type: NodeType::Effect,
				timing: EffectTiming::default(),
			});

			let _ = signal.get();

			rt.pop_observer();

			let graph = rt.dependency_graph.borrow();
			let node = graph.get(&signal.id()).unwrap();
			assert!(node.subscribers.contains(&observer_id));
		});
	}

	#[test]
	#[serial]
	fn drop_of_last_clone_removes_node() {
		let id = {
			let signal = Signal::new(1);
			let id = signal.id();
			with_runtime(|rt| {
				rt.dependency_graph.borrow_mut().entry(id).or_default();
			});
			assert!(with_runtime(|rt| rt.has_node(id)));
			id
		};

		assert!(!with_runtime(|rt| rt.has_node(id)));
	}
}
