use std::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	rc::{Rc, Weak},
};

use tracing::trace;

use crate::{
	handle::{Detach, HandleId},
	registry::Registry,
	Observable, Observer,
};

/// An observable with any number of concurrently active subscriptions.
///
/// [`notify`](`Broadcast::notify`) works on a snapshot of the handles taken at the start
/// of the pass, so callbacks may subscribe or cancel re-entrantly. A handle attached
/// during a pass is not delivered the value that triggered it.
///
/// Cloning a [`Broadcast`] creates a new handle to the **same** observable.
pub struct Broadcast<T: 'static> {
	inner: Rc<BroadcastInner<T>>,
}

struct BroadcastInner<T: 'static> {
	value: RefCell<Option<T>>,
	registry: Registry<dyn Fn(&T)>,
}

impl<T: 'static> Detach for BroadcastInner<T> {
	fn detach(&self, id: HandleId) {
		self.registry.detach(id);
	}
}

impl<T: 'static> Clone for Broadcast<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static + Debug> Debug for Broadcast<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Broadcast")
			.field("value", &self.inner.value.try_borrow().ok())
			.field("subscriber_count", &self.inner.registry.len())
			.finish()
	}
}

impl<T: 'static + Clone> Default for Broadcast<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static + Clone> Broadcast<T> {
	/// Creates a new [`Broadcast`] without a value.
	#[must_use]
	pub fn new() -> Self {
		Self::from_option(None)
	}

	/// Creates a new [`Broadcast`] holding `value`.
	#[must_use]
	pub fn with_value(value: T) -> Self {
		Self::from_option(Some(value))
	}

	fn from_option(value: Option<T>) -> Self {
		Self {
			inner: Rc::new(BroadcastInner {
				value: RefCell::new(value),
				registry: Registry::new(),
			}),
		}
	}

	fn attach(&self, callback: Rc<dyn Fn(&T)>, keep_alive: bool) -> Observer<T> {
		let owner: Weak<dyn Detach> = Rc::downgrade(&self.inner) as Weak<dyn Detach>;
		let handle = self.inner.registry.attach(owner, callback, keep_alive);
		if let Some(value) = self.value() {
			handle.deliver_once(|callback| callback(&value));
		}
		handle
	}

	/// Appends `callback` to the subscriptions and replays a present value to it.
	pub fn subscribe(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		self.attach(Rc::new(callback), true)
	}

	/// Like [`Broadcast::subscribe`], but one-shot.
	pub fn once(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		self.attach(Rc::new(callback), false)
	}

	/// Stores `value`, then [`notify`](`Broadcast::notify`)s.
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

	/// Delivers the current value to every active subscription, in subscription order.
	///
	/// One-shot subscriptions that received the value are canceled together after the pass.
	pub fn notify(&self) {
		let Some(value) = self.value() else {
			return;
		};
		let delivered = self.inner.registry.deliver(|callback| {
			callback(&value);
			true
		});
		trace!(delivered, "broadcast notified");
	}

	/// Cancels `handle`, or every subscription if [`None`].
	pub fn cancel(&self, handle: Option<&Observer<T>>) {
		match handle {
			Some(handle) => handle.cancel(),
			None => self.inner.registry.clear(),
		}
	}

	/// A clone of the current value.
	#[must_use]
	pub fn value(&self) -> Option<T> {
		self.inner.value.borrow().clone()
	}

	/// The number of attached (possibly paused) subscriptions.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.registry.len()
	}

	/// Whether there are no subscriptions.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Cancels every subscription.
	pub fn dispose(&self) {
		self.cancel(None);
	}
}

impl<T: 'static + Clone> Observable<T> for Broadcast<T> {
	fn subscribe(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		Broadcast::subscribe(self, callback)
	}

	fn once(&self, callback: impl 'static + Fn(&T)) -> Observer<T> {
		Broadcast::once(self, callback)
	}

	fn set_value(&self, value: T) {
		Broadcast::set_value(self, value);
	}

	fn notify(&self) {
		Broadcast::notify(self);
	}

	fn cancel(&self, handle: Option<&Observer<T>>) {
		Broadcast::cancel(self, handle);
	}

	fn value(&self) -> Option<T> {
		Broadcast::value(self)
	}
}
