use std::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	rc::{Rc, Weak},
};

use tracing::trace;

use crate::{
	handle::{Detach, HandleId},
	Handle, Observable, Observer,
};

/// An observable with at most one active subscription.
///
/// Each [`subscribe`](`SingleCast::subscribe`) replaces (and cancels) the previous handle,
/// so a remounted consumer never leaves a stale binding behind.
///
/// Cloning a [`SingleCast`] creates a new handle to the **same** observable.
pub struct SingleCast<T: 'static> {
	inner: Rc<SingleCastInner<T>>,
}

struct SingleCastInner<T: 'static> {
	value: RefCell<Option<T>>,
	slot: RefCell<Option<Observer<T>>>,
	next_id: Cell<u64>,
}

impl<T: 'static> Detach for SingleCastInner<T> {
	fn detach(&self, id: HandleId) {
		let removed = {
			let mut slot = self.slot.borrow_mut();
			if slot.as_ref().is_some_and(|handle| handle.id() == id) {
				slot.take()
			} else {
				None
			}
		};
		drop(removed);
	}
}

impl<T: 'static> Clone for SingleCast<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static + Debug> Debug for SingleCast<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SingleCast")
			.field("value", &self.inner.value.try_borrow().ok())
			.field("subscribed", &self.inner.slot.borrow().is_some())
			.finish()
	}
}

impl<T: 'static + Clone> Default for SingleCast<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static + Clone> SingleCast<T> {
	/// Creates a new [`SingleCast`] without a value.
	#[must_use]
	pub fn new() -> Self {
		Self::from_option(None)
	}

	/// Creates a new [`SingleCast`] holding `value`.
	#[must_use]
	pub fn with_value(value: T) -> Self {
		Self::from_option(Some(value))
	}

	fn from_option(value: Option<T>) -> Self {
		Self {
			inner: Rc::new(SingleCastInner {
				value: RefCell::new(value),
				slot: RefCell::new(None),
				next_id: Cell::new(0),
			}),
		}
	}

	fn attach(&self, callback: Rc<dyn Fn(&T)>, keep_alive: bool) -> Observer<T> {
		let id = HandleId(self.inner.next_id.get());
		self.inner.next_id.set(id.0 + 1);
		let owner: Weak<dyn Detach> = Rc::downgrade(&self.inner) as Weak<dyn Detach>;
		let handle = Handle::new(id, owner, callback, keep_alive);

		let previous = self.inner.slot.borrow_mut().replace(handle.clone());
		if let Some(previous) = previous {
			trace!(replaced = previous.id().0, "single-cast subscription replaced");
			previous.cancel();
		}

		if let Some(value) = self.value() {
			handle.deliver_once(|callback| callback(&value));
		}
		handle
	}

	/// Replaces any existing subscription with `callback`, replaying a present value to it.
	pub fn subscribe(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		self.attach(Rc::new(callback), true)
	}

	/// Like [`SingleCast::subscribe`], but one-shot.
	pub fn once(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		self.attach(Rc::new(callback), false)
	}

	/// Stores `value`, then [`notify`](`SingleCast::notify`)s.
	pub fn set_value(&self, value: T) {
		let previous = self.inner.value.replace(Some(value));
		drop(previous);
		self.notify();
	}

	/// Forgets the current value without notifying.
	pub fn clear_value(&self) {
		let previous = self.inner.value.take();
		drop(previous);
	}

	/// Delivers the current value to the subscription, unless it is paused or there is no value.
	pub fn notify(&self) {
		let Some(handle) = self.inner.slot.borrow().clone() else {
			return;
		};
		let Some(value) = self.value() else {
			return;
		};
		handle.deliver_once(|callback| callback(&value));
	}

	/// Cancels `handle`, or the current subscription if [`None`].
	pub fn cancel(&self, handle: Option<&Observer<T>>) {
		match handle {
			Some(handle) => handle.cancel(),
			None => {
				let current = self.inner.slot.borrow_mut().take();
				if let Some(current) = current {
					current.cancel();
				}
			}
		}
	}

	/// A clone of the current value.
	#[must_use]
	pub fn value(&self) -> Option<T> {
		self.inner.value.borrow().clone()
	}

	/// Whether a (possibly paused) subscription is attached.
	#[must_use]
	pub fn has_subscriber(&self) -> bool {
		self.inner.slot.borrow().is_some()
	}

	/// Cancels the subscription.
	pub fn dispose(&self) {
		self.cancel(None);
	}
}

impl<T: 'static + Clone> Observable<T> for SingleCast<T> {
	fn subscribe(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		SingleCast::subscribe(self, callback)
	}

	fn once(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		SingleCast::once(self, callback)
	}

	fn set_value(&self, value: T) {
		SingleCast::set_value(self, value);
	}

	fn notify(&self) {
		SingleCast::notify(self);
	}

	fn cancel(&self, handle: Option<&Observer<T>>) {
		SingleCast::cancel(self, handle);
	}

	fn value(&self) -> Option<T> {
		SingleCast::value(self)
	}
}
