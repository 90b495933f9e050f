//! # formwire-reactive
//!
//! Fine-grained reactive primitives: [`Signal`] value cells with
//! dependency-tracking-on-read, [`Effect`] computations that re-run when
//! their dependencies change, and the thread-local [`Runtime`] that wires
//! the two together.
//!
//! This crate is the reactive substrate `formwire` builds on. It knows
//! nothing about forms; it provides exactly the contract a reactive UI
//! layer needs:
//!
//! - value cells: [`Signal::new`] (get = subscribe, set = notify)
//! - derived computations: [`Effect::new_with_timing`]
//! - scheduling: [`EffectTiming`] plus [`Runtime::flush_updates`] and
//!   [`runtime::set_scheduler`]
//!
//! ## Example
//!
//! ```
//! use formwire_reactive::{Effect, EffectTiming, Signal};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let value = Signal::new(0);
//! let doubled = Rc::new(RefCell::new(0));
//!
//! let sink = doubled.clone();
//! let source = value.clone();
//! let _effect = Effect::new_with_timing(
//! 	move || *sink.borrow_mut() = source.get() * 2,
//! 	EffectTiming::Layout,
//! );
//!
//! value.set(21);
//! assert_eq!(*doubled.borrow(), 42);
//! ```

pub mod effect;
pub mod runtime;
pub mod signal;

pub use effect::Effect;
pub use runtime::{EffectTiming, NodeId, Runtime, with_runtime};
pub use signal::Signal;
