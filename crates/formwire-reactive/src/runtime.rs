//! Reactive Runtime
//!
//! The runtime owns the dependency graph that connects [`Signal`]s to the
//! [`Effect`]s that read them, and decides when a changed signal re-runs its
//! subscribers.
//!
//! ## Architecture
//!
//! The model is pull-based reactivity in the style of Solid.js and Leptos:
//!
//! 1. **Observer stack**: tracks the effect that is currently executing.
//! 2. **Dependency tracking**: a `Signal::get()` inside a running effect
//!    records an edge from the signal to that effect ("read = subscribe").
//! 3. **Change notification**: a `Signal::set()` runs [`Layout`] subscribers
//!    synchronously, before the write returns to its caller, and queues
//!    [`Passive`] subscribers for a later flush.
//!
//! Layout timing is what gives form bindings their single-writer-per-tick
//! consistency: by the time the code that wrote a value regains control,
//! every synchronous subscriber has already observed the new value.
//!
//! [`Signal`]: crate::Signal
//! [`Effect`]: crate::Effect
//! [`Layout`]: EffectTiming::Layout
//! [`Passive`]: EffectTiming::Passive

use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeMap;

/// Unique identifier for reactive nodes (signals and effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Allocates a new process-unique id.
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// Kind of reactive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// A value cell, the source of reactivity.
	Signal,
	/// A side effect that re-runs when its dependencies change.
	Effect,
}

/// When an effect executes relative to the write that invalidated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectTiming {
	/// Runs synchronously inside the notifying write.
	Layout,
	/// Queued; runs on the next [`Runtime::flush_updates`] (or via an
	/// installed scheduler).
	#[default]
	Passive,
}

/// A currently executing effect, as seen by the observer stack.
#[derive(Debug, Clone, Copy)]
pub struct Observer {
	/// Unique identifier of the executing node.
	pub id: NodeId,
	/// Kind of the executing node.
	pub node_type: NodeType,
	/// Execution timing of the node.
	pub timing: EffectTiming,
}

/// One node's edges in the dependency graph.
#[derive(Debug, Default)]
pub(crate) struct DependencyNode {
	/// Nodes that must re-run when this node changes.
	pub(crate) subscribers: Vec<NodeId>,
	/// Nodes this node read during its last run.
	pub(crate) dependencies: Vec<NodeId>,
}

type SchedulerFn = Box<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Global scheduler for flushing passive updates.
static SCHEDULER: std::sync::OnceLock<SchedulerFn> = std::sync::OnceLock::new();

/// Installs the scheduler used to flush passive effects.
///
/// Host environments with a microtask equivalent call this once at startup
/// (a WASM host would pass something backed by `spawn_local`). Without a
/// scheduler, passive updates accumulate until [`Runtime::flush_updates`] is
/// called manually, which is the mode the native test suite uses.
pub fn set_scheduler<F>(scheduler: F)
where
	F: Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static,
{
	let _ = SCHEDULER.set(Box::new(scheduler));
}

/// Thread-local reactive runtime.
///
/// Reads establish dependencies, writes notify subscribers. All state lives
/// in thread-local storage; the reactive system is single-threaded by
/// construction and performs no locking.
pub struct Runtime {
	/// Stack of currently executing effects.
	observer_stack: RefCell<Vec<Observer>>,
	/// NodeId -> edges.
	pub(crate) dependency_graph: RefCell<BTreeMap<NodeId, DependencyNode>>,
	/// Passive effects waiting for a flush.
	pub(crate) pending_updates: RefCell<Vec<NodeId>>,
	/// Whether a flush has already been handed to the scheduler.
	pub(crate) update_scheduled: RefCell<bool>,
}

impl Runtime {
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(BTreeMap::new()),
			pending_updates: RefCell::new(Vec::new()),
			update_scheduled: RefCell::new(false),
		}
	}

	/// The effect currently executing, if any.
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack
			.borrow()
			.last()
			.map(|observer| observer.id)
	}

	pub fn push_observer(&self, observer: Observer) {
		self.observer_stack.borrow_mut().push(observer);
	}

	pub fn pop_observer(&self) -> Option<Observer> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Records an edge between the current observer and `signal_id`.
	///
	/// Called by `Signal::get()`. A no-op outside of effect execution.
	pub fn track_dependency(&self, signal_id: NodeId) {
		if let Some(observer_id) = self.current_observer() {
			let mut graph = self.dependency_graph.borrow_mut();

			let signal_node = graph.entry(signal_id).or_default();
			if !signal_node.subscribers.contains(&observer_id) {
				signal_node.subscribers.push(observer_id);
			}

			let observer_node = graph.entry(observer_id).or_default();
			if !observer_node.dependencies.contains(&signal_id) {
				observer_node.dependencies.push(signal_id);
			}
		}
	}

	/// Notifies subscribers that `signal_id` changed.
	///
	/// Layout subscribers execute synchronously, in subscription order,
	/// before this call returns. Passive subscribers are queued.
	pub fn notify_signal_change(&self, signal_id: NodeId) {
		let mut layout_effects = Vec::new();
		let mut passive_effects = Vec::new();

		// The graph borrow must not outlive this block: executing a layout
		// effect re-enters the runtime and mutates the graph.
		{
			let graph = self.dependency_graph.borrow();
			if let Some(node) = graph.get(&signal_id) {
				for &subscriber_id in &node.subscribers {
					match crate::effect::effect_timing(subscriber_id) {
						Some(EffectTiming::Layout) => layout_effects.push(subscriber_id),
						Some(EffectTiming::Passive) | None => {
							passive_effects.push(subscriber_id)
						}
					}
				}
			}
		}

		for effect_id in layout_effects {
			crate::effect::Effect::execute_effect(effect_id);
		}

		for effect_id in passive_effects {
			self.schedule_update(effect_id);
		}
	}

	/// Queues a node for the next flush.
	pub fn schedule_update(&self, node_id: NodeId) {
		{
			let mut pending = self.pending_updates.borrow_mut();
			if !pending.contains(&node_id) {
				pending.push(node_id);
			}
		}

		if !*self.update_scheduled.borrow() {
			*self.update_scheduled.borrow_mut() = true;

			if let Some(scheduler) = SCHEDULER.get() {
				scheduler(Box::new(|| {
					let _ = try_with_runtime(|rt| rt.flush_updates());
				}));
			}
			// Without a scheduler, flush_updates() must be called manually.
		}
	}

	/// Removes all outgoing dependency edges of `node_id`.
	///
	/// Called before each effect run so the dependency set always reflects
	/// the most recent execution.
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		if let Some(node) = graph.get(&node_id) {
			let dependencies = node.dependencies.clone();
			for &dep_id in &dependencies {
				if let Some(dep_node) = graph.get_mut(&dep_id) {
					dep_node.subscribers.retain(|&id| id != node_id);
				}
			}
		}

		if let Some(node) = graph.get_mut(&node_id) {
			node.dependencies.clear();
		}
	}

	/// Removes a node from the graph entirely.
	///
	/// Called when a signal or effect is dropped or disposed.
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);
		self.dependency_graph.borrow_mut().remove(&node_id);
		self.pending_updates
			.borrow_mut()
			.retain(|&id| id != node_id);
	}

	/// Whether the graph contains `node_id`.
	pub fn has_node(&self, node_id: NodeId) -> bool {
		self.dependency_graph.borrow().contains_key(&node_id)
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

thread_local! {
	// One runtime per thread. Reactive values must not cross threads; the
	// types built on this runtime are Rc-based and enforce that statically.
	static RUNTIME: Runtime = Runtime::new();
}

/// Runs `f` with the thread-local runtime.
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Fallible runtime access, safe to call from `Drop` implementations after
/// thread-local storage has been torn down.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}
