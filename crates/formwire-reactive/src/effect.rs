//! Effect - reactive side effects
//!
//! An `Effect` is a closure that re-runs whenever one of the signals it read
//! during its previous run changes. Dependencies are discovered at run time:
//! whatever the closure `get()`s is what it subscribes to, and the set is
//! rebuilt from scratch on every execution.
//!
//! ## Timing
//!
//! Effects come in two flavors (see [`EffectTiming`]):
//!
//! - **Layout** effects run synchronously inside the write that invalidated
//!   them. Form value bindings use this so that a write is fully observed
//!   before control returns to the writer.
//! - **Passive** effects are queued and run on the next
//!   [`Runtime::flush_updates`] (or via the installed scheduler).
//!
//! ## Example
//!
//! ```
//! use formwire_reactive::{Effect, EffectTiming, Signal};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let value = Signal::new(String::new());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let seen_by_effect = seen.clone();
//! let watched = value.clone();
//! let _effect = Effect::new_with_timing(
//! 	move || seen_by_effect.borrow_mut().push(watched.get()),
//! 	EffectTiming::Layout,
//! );
//!
//! value.set(String::from("a"));
//! assert_eq!(*seen.borrow(), vec![String::new(), String::from("a")]);
//! ```

use core::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::runtime::{EffectTiming, NodeId, NodeType, Observer, Runtime, try_with_runtime, with_runtime};

type EffectFn = Box<dyn FnMut() + 'static>;

thread_local! {
	// Closures live outside the Effect handle so the runtime can re-run
	// them by id. Each closure sits behind its own Rc<RefCell> so that
	// executing one effect does not hold the whole table borrowed while
	// nested notifications execute another.
	static EFFECT_FUNCTIONS: RefCell<BTreeMap<NodeId, Rc<RefCell<EffectFn>>>> =
		RefCell::new(BTreeMap::new());

	static EFFECT_TIMING: RefCell<BTreeMap<NodeId, EffectTiming>> =
		const { RefCell::new(BTreeMap::new()) };
}

/// Looks up the timing of an effect by id.
pub(crate) fn effect_timing(effect_id: NodeId) -> Option<EffectTiming> {
	EFFECT_TIMING.with(|storage| storage.borrow().get(&effect_id).copied())
}

/// A reactive side effect.
///
/// Runs immediately on creation and re-runs when a dependency changes.
/// Dropping (or [`dispose`](Effect::dispose)-ing) the handle detaches the
/// effect from the dependency graph and guarantees the closure never runs
/// again.
pub struct Effect {
	id: NodeId,
	disposed: Rc<RefCell<bool>>,
}

impl Effect {
	/// Creates a passive effect and runs it once.
	pub fn new<F>(f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		Self::new_with_timing(f, EffectTiming::Passive)
	}

	/// Creates an effect with explicit timing and runs it once.
	pub fn new_with_timing<F>(mut f: F, timing: EffectTiming) -> Self
	where
		F: FnMut() + 'static,
	{
		let id = NodeId::new();
		let disposed = Rc::new(RefCell::new(false));

		let disposed_guard = disposed.clone();
		EFFECT_FUNCTIONS.with(|storage| {
			storage.borrow_mut().insert(
				id,
				Rc::new(RefCell::new(Box::new(move || {
					if !*disposed_guard.borrow() {
						f();
					}
				}) as EffectFn)),
			);
		});

		EFFECT_TIMING.with(|storage| {
			storage.borrow_mut().insert(id, timing);
		});

		Self::execute_effect(id);

		Self { id, disposed }
	}

	/// Re-runs the effect with the given id.
	///
	/// Dependencies from the previous run are cleared first, then rebuilt
	/// by whatever the closure reads this time.
	pub(crate) fn execute_effect(effect_id: NodeId) {
		let func = EFFECT_FUNCTIONS.with(|storage| storage.borrow().get(&effect_id).cloned());
		let Some(func) = func else {
			return;
		};

		let timing = effect_timing(effect_id).unwrap_or_default();

		with_runtime(|rt| {
			rt.clear_dependencies(effect_id);
			rt.push_observer(Observer {
				id: effect_id,
				node_type: NodeType::Effect,
				timing,
			});
		});

		// A layout effect that writes one of its own dependencies would
		// arrive here re-entrantly; skipping the inner run breaks the cycle
		// instead of looping or panicking on the RefCell.
		match func.try_borrow_mut() {
			Ok(mut f) => f(),
			Err(_) => {
				tracing::warn!(?effect_id, "skipped re-entrant execution of effect");
			}
		}

		with_runtime(|rt| {
			rt.pop_observer();
		});
	}

	/// The runtime id of this effect.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Permanently stops this effect.
	pub fn dispose(&self) {
		*self.disposed.borrow_mut() = true;

		let _ = try_with_runtime(|rt| rt.remove_node(self.id));

		let _ = EFFECT_FUNCTIONS.try_with(|storage| {
			storage.borrow_mut().remove(&self.id);
		});
		let _ = EFFECT_TIMING.try_with(|storage| {
			storage.borrow_mut().remove(&self.id);
		});
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl Runtime {
	/// Executes all queued passive effects.
	///
	/// On native targets with no scheduler installed this is how a test (or
	/// a host loop) drains the update queue.
	pub fn flush_updates(&self) {
		*self.update_scheduled.borrow_mut() = false;

		let pending = core::mem::take(&mut *self.pending_updates.borrow_mut());
		for node_id in pending {
			Effect::execute_effect(node_id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Signal;
	use serial_test::serial;

	#[test]
	#[serial]
	fn runs_immediately() {
		let runs = Rc::new(RefCell::new(0));
		let counter = runs.clone();

		let _effect = Effect::new(move || {
			*counter.borrow_mut() += 1;
		});

		assert_eq!(*runs.borrow(), 1);
	}

	#[test]
	#[serial]
	fn passive_effect_reruns_after_flush() {
		let signal = Signal::new(0);
		let values = Rc::new(RefCell::new(Vec::new()));

		let sink = values.clone();
		let source = signal.clone();
		let _effect = Effect::new(move || {
			sink.borrow_mut().push(source.get());
		});

		assert_eq!(*values.borrow(), vec![0]);

		signal.set(10);
		with_runtime(|rt| rt.flush_updates());
		assert_eq!(*values.borrow(), vec![0, 10]);

		signal.set(20);
		with_runtime(|rt| rt.flush_updates());
		assert_eq!(*values.borrow(), vec![0, 10, 20]);
	}

	#[test]
	#[serial]
	fn layout_effect_runs_inside_the_write() {
		let signal = Signal::new(0);
		let values = Rc::new(RefCell::new(Vec::new()));

		let sink = values.clone();
		let source = signal.clone();
		let _effect = Effect::new_with_timing(
			move || {
				sink.borrow_mut().push(source.get());
			},
			EffectTiming::Layout,
		);

		signal.set(7);

		// No flush needed: the write already ran the effect.
		assert_eq!(*values.borrow(), vec![0, 7]);
	}

	#[test]
	#[serial]
	fn tracks_multiple_dependencies() {
		let a = Signal::new(1);
		let b = Signal::new(2);
		let sum = Rc::new(RefCell::new(0));

		let sink = sum.clone();
		let first = a.clone();
		let second = b.clone();
		let _effect = Effect::new_with_timing(
			move || {
				*sink.borrow_mut() = first.get() + second.get();
			},
			EffectTiming::Layout,
		);

		assert_eq!(*sum.borrow(), 3);

		a.set(10);
		assert_eq!(*sum.borrow(), 12);

		b.set(20);
		assert_eq!(*sum.borrow(), 30);
	}

	#[test]
	#[serial]
	fn dispose_stops_reexecution() {
		let signal = Signal::new(0);
		let runs = Rc::new(RefCell::new(0));

		let counter = runs.clone();
		let source = signal.clone();
		let effect = Effect::new_with_timing(
			move || {
				let _ = source.get();
				*counter.borrow_mut() += 1;
			},
			EffectTiming::Layout,
		);

		assert_eq!(*runs.borrow(), 1);

		effect.dispose();

		signal.set(10);
		assert_eq!(*runs.borrow(), 1);
	}

	#[test]
	#[serial]
	fn drop_detaches_from_graph() {
		let signal = Signal::new(0);
		let runs = Rc::new(RefCell::new(0));

		{
			let counter = runs.clone();
			let source = signal.clone();
			let _effect = Effect::new_with_timing(
				move || {
					let _ = source.get();
					*counter.borrow_mut() += 1;
				},
				EffectTiming::Layout,
			);
			assert_eq!(*runs.borrow(), 1);
		}

		signal.set(10);
		assert_eq!(*runs.borrow(), 1);
	}

	#[test]
	#[serial]
	fn dependencies_are_rebuilt_each_run() {
		let gate = Signal::new(true);
		let a = Signal::new(String::from("a"));
		let b = Signal::new(String::from("b"));
		let seen = Rc::new(RefCell::new(Vec::new()));

		let sink = seen.clone();
		let gate_reader = gate.clone();
		let first = a.clone();
		let second = b.clone();
		let _effect = Effect::new_with_timing(
			move || {
				let value = if gate_reader.get() {
					first.get()
				} else {
					second.get()
				};
				sink.borrow_mut().push(value);
			},
			EffectTiming::Layout,
		);

		// While the gate is open only `a` is a dependency.
		b.set(String::from("b2"));
		assert_eq!(seen.borrow().len(), 1);

		gate.set(false);
		assert_eq!(seen.borrow().len(), 2);

		// Now only `b` is a dependency.
		a.set(String::from("a2"));
		assert_eq!(seen.borrow().len(), 2);

		b.set(String::from("b3"));
		assert_eq!(seen.borrow().len(), 3);
	}
}
