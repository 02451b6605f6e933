//! [`Handle`]s represent one listener's relationship to one observable.
//!
//! A handle is a cheap, clonable token. Dropping it does **not** cancel the
//! subscription, since the owning observable keeps its own clone. Use
//! [`Handle::cancel`] or wrap the handle in a [`CancelOnDrop`] for RAII.

use std::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	rc::{Rc, Weak},
};

/// Identifies a [`Handle`] within its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u64);

/// Implemented by owners of [`Handle`]s, so that a canceled handle can remove itself.
pub trait Detach {
	/// Forgets the handle with the given `id`.
	///
	/// Must be a no-op for ids that aren't (or are no longer) known.
	fn detach(&self, id: HandleId);
}

/// Type-erased cancellation, so that one owner can hold handles of differing listener types.
pub trait Cancel {
	/// Cancels the subscription. Idempotent.
	fn cancel(&self);

	/// Whether [`Cancel::cancel`] has taken effect.
	fn is_canceled(&self) -> bool;
}

struct HandleState<L: ?Sized> {
	id: HandleId,
	owner: Option<Weak<dyn Detach>>,
	callback: Option<Rc<L>>,
	active: bool,
	keep_alive: bool,
}

/// A cancelable token representing one listener's relationship to one observable.
///
/// `L` is the listener type, usually `dyn Fn(&T)` or a [`Listener`](`crate::Listener`).
///
/// The back-reference to the owner is weak: an outstanding handle never keeps
/// its observable alive.
pub struct Handle<L: ?Sized> {
	state: Rc<RefCell<HandleState<L>>>,
}

impl<L: ?Sized> Clone for Handle<L> {
	fn clone(&self) -> Self {
		Self {
			state: Rc::clone(&self.state),
		}
	}
}

impl<L: ?Sized> Debug for Handle<L> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("Handle")
			.field("id", &state.id.0)
			.field("active", &state.active)
			.field("one_shot", &!state.keep_alive)
			.field("canceled", &state.callback.is_none())
			.finish_non_exhaustive()
	}
}

impl<L: ?Sized> Handle<L> {
	pub(crate) fn new(
		id: HandleId,
		owner: Weak<dyn Detach>,
		callback: Rc<L>,
		keep_alive: bool,
	) -> Self {
		Self {
			state: Rc::new(RefCell::new(HandleState {
				id,
				owner: Some(owner),
				callback: Some(callback),
				active: true,
				keep_alive,
			})),
		}
	}

	/// A handle that was never attached, e.g. because its channel was already closed.
	pub(crate) fn canceled(id: HandleId) -> Self {
		Self {
			state: Rc::new(RefCell::new(HandleState {
				id,
				owner: None,
				callback: None,
				active: false,
				keep_alive: false,
			})),
		}
	}

	/// This handle's id within its owner.
	#[must_use]
	pub fn id(&self) -> HandleId {
		self.state.borrow().id
	}

	/// Skips this handle during delivery until [`Handle::resume`] is called.
	///
	/// The handle stays registered with its owner.
	pub fn pause(&self) {
		let mut state = self.state.borrow_mut();
		if state.callback.is_some() {
			state.active = false;
		}
	}

	/// Undoes [`Handle::pause`].
	pub fn resume(&self) {
		let mut state = self.state.borrow_mut();
		if state.callback.is_some() {
			state.active = true;
		}
	}

	/// Turns this into a one-shot handle: The owner cancels it right after its next delivery.
	///
	/// When called from within the callback, "next" refers to the delivery after the current one.
	pub fn once_more(&self) {
		self.state.borrow_mut().keep_alive = false;
	}

	/// Detaches this handle from its owner and releases the callback.
	///
	/// Idempotent, and safe to call from within the callback itself.
	pub fn cancel(&self) {
		let (owner, id, callback) = {
			let mut state = self.state.borrow_mut();
			let Some(callback) = state.callback.take() else {
				return;
			};
			state.active = false;
			(state.owner.take(), state.id, callback)
		};
		if let Some(owner) = owner.and_then(|owner| owner.upgrade()) {
			owner.detach(id);
		}
		// The callback may own arbitrary state, so it's released outside the borrow.
		drop(callback);
	}

	/// Neither paused nor canceled.
	#[must_use]
	pub fn is_active(&self) -> bool {
		let state = self.state.borrow();
		state.active && state.callback.is_some()
	}

	/// Paused but not canceled.
	#[must_use]
	pub fn is_paused(&self) -> bool {
		let state = self.state.borrow();
		!state.active && state.callback.is_some()
	}

	/// Whether [`Handle::cancel`] has taken effect, either directly or through the owner.
	#[must_use]
	pub fn is_canceled(&self) -> bool {
		self.state.borrow().callback.is_none()
	}

	/// Whether the owner will cancel this handle after its next delivery.
	#[must_use]
	pub fn is_one_shot(&self) -> bool {
		!self.state.borrow().keep_alive
	}

	/// Whether `self` and `other` are clones of the same handle.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.state, &other.state)
	}

	/// The callback, iff this handle is active.
	pub(crate) fn callback(&self) -> Option<Rc<L>> {
		let state = self.state.borrow();
		if state.active {
			state.callback.clone()
		} else {
			None
		}
	}

	/// Invokes `call` with the callback iff this handle is active, then cancels a one-shot handle.
	///
	/// Returns whether `call` ran.
	pub(crate) fn deliver_once(&self, call: impl FnOnce(&L)) -> bool {
		let Some(callback) = self.callback() else {
			return false;
		};
		let one_shot = self.is_one_shot();
		call(&callback);
		if one_shot {
			self.cancel();
		}
		true
	}
}

impl<L: ?Sized> Cancel for Handle<L> {
	fn cancel(&self) {
		Handle::cancel(self);
	}

	fn is_canceled(&self) -> bool {
		Handle::is_canceled(self)
	}
}

/// Cancels the wrapped subscription when dropped.
#[must_use = "The subscription is canceled when this guard is dropped."]
pub struct CancelOnDrop<C: Cancel>(C);

impl<C: Cancel> CancelOnDrop<C> {
	/// Wraps `subscription`.
	pub fn new(subscription: C) -> Self {
		Self(subscription)
	}

	/// Borrows the wrapped subscription.
	pub fn get(&self) -> &C {
		&self.0
	}
}

impl<C: Cancel + Debug> Debug for CancelOnDrop<C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("CancelOnDrop").field(&self.0).finish()
	}
}

impl<C: Cancel> Drop for CancelOnDrop<C> {
	fn drop(&mut self) {
		self.0.cancel();
	}
}
