use std::{
	borrow::Cow,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	mem,
	rc::{Rc, Weak},
};

use scopeguard::guard;
use stamen::{Cancel, Changes, Channel, Fault, Listener, Source, Subscription};
use tracing::{debug, trace};

use crate::{
	traits::{Dispose, Store, WeakStore},
	wiring::feed,
	StoreError, StoreOptions,
};

/// A single observable value that may be absent.
///
/// Every subscriber receives the current value as soon as it subscribes, and
/// again on each change. Subscriptions made through the store (including those
/// wiring it to upstream sources) are owned by it and canceled on
/// [`dispose`](`ValueStore::dispose`).
///
/// Cloning a [`ValueStore`] creates another handle to the same store.
/// Dropping the last handle disposes it. Subscriber callbacks are owned by the
/// store, so a callback that captures a strong clone of its own store keeps it
/// alive until [`dispose`](`ValueStore::dispose`). Capture a
/// [`downgrade`](`ValueStore::downgrade`)d reference there instead.
pub struct ValueStore<T: 'static> {
	inner: Rc<StoreInner<T>>,
}

/// A non-owning reference to a [`ValueStore`].
pub struct WeakValueStore<T: 'static> {
	inner: Weak<StoreInner<T>>,
}

struct StoreInner<T: 'static> {
	value: RefCell<Option<T>>,
	channel: Channel<T>,
	owned: RefCell<Vec<Box<dyn Cancel>>>,
	version: Cell<u64>,
	disposed: Cell<bool>,
	/// Values for which this store publishes "absent" instead.
	absent_when: Option<fn(&T) -> bool>,
	label: Cow<'static, str>,
}

impl<T: 'static> StoreInner<T> {
	fn dispose(&self) -> bool {
		if self.disposed.replace(true) {
			return false;
		}
		self.channel.close();
		let owned = mem::take(&mut *self.owned.borrow_mut());
		for subscription in &owned {
			subscription.cancel();
		}
		debug!(label = %self.label, released = owned.len(), "store disposed");
		true
	}
}

impl<T: 'static> Drop for StoreInner<T> {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl<T: 'static> Clone for ValueStore<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static> Clone for WeakValueStore<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Weak::clone(&self.inner),
		}
	}
}

impl<T: 'static + Debug> Debug for ValueStore<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValueStore")
			.field("label", &self.inner.label)
			.field("value", &self.inner.value)
			.field("version", &self.inner.version.get())
			.field("disposed", &self.inner.disposed.get())
			.finish_non_exhaustive()
	}
}

impl<T: 'static> WeakValueStore<T> {
	/// Retrieves the store, if it is still alive.
	#[must_use]
	pub fn upgrade(&self) -> Option<ValueStore<T>> {
		self.inner.upgrade().map(|inner| ValueStore { inner })
	}
}

impl<T: 'static> Debug for WeakValueStore<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakValueStore").finish_non_exhaustive()
	}
}

impl<T: 'static + Clone> Default for ValueStore<T> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<T: 'static + Clone> ValueStore<T> {
	/// Creates a store holding `value`.
	pub fn new(value: T) -> Self {
		Self::with_options(Some(value), StoreOptions::default())
	}

	/// Creates a store without a value.
	#[must_use]
	pub fn empty() -> Self {
		Self::with_options(None, StoreOptions::default())
	}

	/// Creates a store holding `value` (if any) and configured by `options`.
	pub fn with_options(value: Option<T>, options: StoreOptions) -> Self {
		Self::with_policy(value, options, None)
	}

	pub(crate) fn with_policy(
		value: Option<T>,
		options: StoreOptions,
		absent_when: Option<fn(&T) -> bool>,
	) -> Self {
		Self {
			inner: Rc::new(StoreInner {
				value: RefCell::new(value),
				channel: Channel::new(),
				owned: RefCell::default(),
				version: Cell::new(0),
				disposed: Cell::new(false),
				absent_when,
				label: options.label,
			}),
		}
	}

	/// The label this store was configured with.
	#[must_use]
	pub fn label(&self) -> &str {
		&self.inner.label
	}

	/// A clone of the current value.
	#[must_use]
	pub fn get(&self) -> Option<T> {
		self.inner.value.borrow().clone()
	}

	/// Inspects the current value without cloning it.
	///
	/// # Panics
	///
	/// If `f` writes to this store.
	pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
		f(self.inner.value.borrow().as_ref())
	}

	/// Whether a value is present.
	#[must_use]
	pub fn is_present(&self) -> bool {
		self.inner.value.borrow().is_some()
	}

	/// Counts accepted writes. Starts at 0.
	#[must_use]
	pub fn version(&self) -> u64 {
		self.inner.version.get()
	}

	/// How many subscriptions are currently attached.
	#[must_use]
	pub fn subscriber_count(&self) -> usize {
		self.inner.channel.len()
	}

	/// Whether the store was disposed.
	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.get()
	}

	/// The value as subscribers see it.
	pub(crate) fn published(&self) -> Option<T> {
		let value = self.inner.value.borrow();
		match (value.as_ref(), self.inner.absent_when) {
			(Some(value), Some(absent_when)) if absent_when(value) => None,
			(value, _) => value.cloned(),
		}
	}

	/// Delivers the current value to all subscribers, whether or not it changed.
	pub fn notify(&self) {
		if self.is_disposed() {
			debug!(label = %self.label(), "notify on disposed store ignored");
			return;
		}
		trace!(label = %self.label(), version = self.version(), "notifying");
		self.inner.channel.publish(self.published());
	}

	/// Stores `value` and notifies unconditionally.
	///
	/// Does nothing once disposed.
	pub fn replace_value(&self, value: T) {
		self.write(Some(value)).ok();
	}

	/// Removes the value and notifies unconditionally.
	pub fn take_value(&self) -> Option<T> {
		if self.is_disposed() {
			debug!(label = %self.label(), "take on disposed store ignored");
			return None;
		}
		let taken = self.inner.value.take();
		self.bump();
		self.notify();
		taken
	}

	/// Mutates the value in place and notifies once afterwards.
	///
	/// Does nothing if the value is absent or the store was disposed.
	/// While `f` runs, the store reads as empty.
	pub fn update(&self, f: impl FnOnce(&mut T)) {
		if self.modify(f).is_some() {
			self.notify();
		}
	}

	/// Runs `f` on the value taken out of the store, then puts it back. Doesn't notify.
	pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		if self.is_disposed() {
			debug!(label = %self.label(), "mutation of disposed store ignored");
			return None;
		}
		let taken = self.inner.value.borrow_mut().take()?;
		let mut taken = guard(taken, |value| {
			*self.inner.value.borrow_mut() = Some(value);
		});
		let result = f(&mut *taken);
		drop(taken);
		self.bump();
		Some(result)
	}

	fn bump(&self) {
		self.inner.version.set(self.inner.version.get() + 1);
	}

	fn write(&self, value: Option<T>) -> Result<(), StoreError> {
		if self.is_disposed() {
			debug!(label = %self.label(), "write to disposed store ignored");
			return Err(self.disposed_error());
		}
		drop(self.inner.value.replace(value));
		self.bump();
		self.notify();
		Ok(())
	}

	fn disposed_error(&self) -> StoreError {
		StoreError::Disposed {
			label: self.inner.label.clone(),
		}
	}

	/// Subscribes to data events, starting with the current value.
	pub fn subscribe(&self, on_data: impl 'static + Fn(Option<&T>)) -> Subscription<T> {
		self.subscribe_with(Listener::new(on_data))
	}

	/// Subscribes `listener`, starting with the current value.
	///
	/// The subscription is owned by the store. On a disposed store, `listener`
	/// only sees "done" and the returned handle is already canceled.
	pub fn subscribe_with(&self, listener: Listener<T>) -> Subscription<T> {
		let current = self.published();
		let subscription = self.inner.channel.listen_replaying(listener, current.as_ref());
		self.own(Box::new(subscription.clone()));
		subscription
	}

	/// Hands `subscription` to this store, which cancels it on disposal.
	///
	/// If the store is already disposed, `subscription` is canceled right away.
	pub fn own(&self, subscription: Box<dyn Cancel>) {
		if subscription.is_canceled() {
			return;
		}
		if self.is_disposed() {
			subscription.cancel();
			return;
		}
		let mut owned = self.inner.owned.borrow_mut();
		owned.retain(|owned| !owned.is_canceled());
		owned.push(subscription);
	}

	/// Publishes `fault` to subscribers' error callbacks.
	pub fn add_error(&self, fault: Fault) {
		if !self.inner.channel.publish_error(fault) {
			debug!(label = %self.label(), "error on disposed store ignored");
		}
	}

	/// Later changes as a [`Stream`](`futures_lite::Stream`), without replay.
	///
	/// The stream ends when the store is disposed.
	pub fn changes(&self) -> Changes<T> {
		self.inner.channel.changes()
	}

	/// Pushes this store's value into `target` now and on every change.
	///
	/// `target` owns the returned subscription.
	pub fn stream_to<S: Store<T>>(&self, target: &S) -> Subscription<T> {
		target.set(self.published());
		feed(self, target, |value: Option<&T>| value.cloned())
	}

	/// Like [`stream_to`](`ValueStore::stream_to`), converting each present value.
	pub fn stream_to_with<U, S: Store<U>>(
		&self,
		target: &S,
		convert: impl 'static + Fn(&T) -> U,
	) -> Subscription<T> {
		target.set(self.published().as_ref().map(&convert));
		feed(self, target, move |value: Option<&T>| value.map(&convert))
	}

	/// Copies `other`'s current value into this store, once.
	pub fn copy_value_from(&self, other: &impl Store<T>)
	where
		T: PartialEq,
	{
		self.set(other.get());
	}

	/// Copies this store's current value into `other`, once.
	pub fn copy_value_to(&self, other: &impl Store<T>) {
		other.set(self.get());
	}

	/// Closes the store.
	///
	/// Subscribers receive "done" and are detached. Owned subscriptions are
	/// canceled. Later writes are ignored. Idempotent.
	pub fn dispose(&self) {
		self.inner.dispose();
	}

	/// Creates a non-owning reference to this store.
	#[must_use]
	pub fn downgrade(&self) -> WeakValueStore<T> {
		WeakValueStore {
			inner: Rc::downgrade(&self.inner),
		}
	}
}

impl<T: 'static + Clone + PartialEq> ValueStore<T> {
	/// Stores `value` if it differs from the current one, then notifies.
	pub fn set(&self, value: Option<T>) {
		self.try_set(value).ok();
	}

	/// Stores `value` if it differs from the current one, then notifies.
	pub fn set_value(&self, value: T) {
		self.set(Some(value));
	}

	/// Like [`set_value`](`ValueStore::set_value`), but reports whether the value changed.
	///
	/// # Errors
	///
	/// [`StoreError::Disposed`] if the store was disposed.
	pub fn try_set_value(&self, value: T) -> Result<bool, StoreError> {
		self.try_set(Some(value))
	}

	fn try_set(&self, value: Option<T>) -> Result<bool, StoreError> {
		if self.is_disposed() {
			debug!(label = %self.label(), "write to disposed store ignored");
			return Err(self.disposed_error());
		}
		if *self.inner.value.borrow() == value {
			trace!(label = %self.label(), "unchanged value skipped");
			return Ok(false);
		}
		self.write(value).map(|()| true)
	}

	/// Removes the value, notifying if one was present.
	pub fn clear_value(&self) {
		self.set(None);
	}

	/// Feeds `source`'s data events into this store.
	///
	/// The subscription is owned by this store and doesn't keep it alive.
	pub fn subscribe_to(&self, source: &impl Source<T>) -> Subscription<T> {
		feed(source, self, |value: Option<&T>| value.cloned())
	}

	/// Feeds `source`'s data events into this store, converting present values.
	pub fn subscribe_to_with<U: 'static>(
		&self,
		source: &impl Source<U>,
		convert: impl 'static + Fn(&U) -> T,
	) -> Subscription<U> {
		feed(source, self, move |value: Option<&U>| value.map(&convert))
	}
}

impl<T: 'static> Source<T> for ValueStore<T> {
	/// Listens for later changes without replay. The store doesn't own this subscription.
	fn listen(&self, listener: Listener<T>) -> Subscription<T> {
		self.inner.channel.listen(listener)
	}
}

impl<T: 'static> Dispose for ValueStore<T> {
	fn dispose(&self) {
		self.inner.dispose();
	}
}

impl<T: 'static + Clone + PartialEq> Store<T> for ValueStore<T> {
	type Weak = WeakValueStore<T>;

	fn downgrade(&self) -> Self::Weak {
		self.downgrade()
	}

	fn get(&self) -> Option<T> {
		self.get()
	}

	fn set(&self, value: Option<T>) {
		self.set(value);
	}

	fn notify(&self) {
		self.notify();
	}

	fn subscribe_with(&self, listener: Listener<T>) -> Subscription<T> {
		self.subscribe_with(listener)
	}

	fn own(&self, subscription: Box<dyn Cancel>) {
		self.own(subscription);
	}

	fn dispose(&self) {
		self.dispose();
	}

	fn is_disposed(&self) -> bool {
		self.is_disposed()
	}
}

impl<T: 'static + Clone + PartialEq> WeakStore for WeakValueStore<T> {
	type Strong = ValueStore<T>;

	fn upgrade(&self) -> Option<Self::Strong> {
		self.upgrade()
	}
}
