use std::rc::Rc;

use stamen::{Cancel, Listener, Subscription};

/// Something that tears itself down on request.
///
/// [`CollectionStore::clear`](`crate::CollectionStore::clear`) calls this on
/// each removed item when asked to.
pub trait Dispose {
	/// Releases whatever this value holds on to. Must be idempotent.
	fn dispose(&self);
}

impl<T: ?Sized + Dispose> Dispose for Rc<T> {
	fn dispose(&self) {
		(**self).dispose();
	}
}

impl<T: ?Sized + Dispose> Dispose for Box<T> {
	fn dispose(&self) {
		(**self).dispose();
	}
}

/// The capability every store shares, so that stores can be wired to each other
/// without knowing their concrete kind.
pub trait Store<T>: 'static {
	/// A non-owning reference to this store.
	type Weak: 'static + WeakStore<Strong = Self>;

	/// Creates a non-owning reference that doesn't keep the store alive.
	fn downgrade(&self) -> Self::Weak;

	/// A clone of the current value.
	fn get(&self) -> Option<T>;

	/// Stores `value`, notifying subscribers if that changed anything.
	fn set(&self, value: Option<T>);

	/// Delivers the current value to all subscribers.
	fn notify(&self);

	/// Subscribes with replay of the current value.
	fn subscribe_with(&self, listener: Listener<T>) -> Subscription<T>;

	/// Subscribes with replay of the current value.
	fn subscribe(&self, on_data: impl 'static + Fn(Option<&T>)) -> Subscription<T>
	where
		Self: Sized,
	{
		self.subscribe_with(Listener::new(on_data))
	}

	/// Hands `subscription` to this store, which cancels it on disposal.
	fn own(&self, subscription: Box<dyn Cancel>);

	/// Closes the store. Idempotent.
	fn dispose(&self);

	/// Whether [`dispose`](`Store::dispose`) was called (or the store was dropped).
	fn is_disposed(&self) -> bool;
}

/// The non-owning counterpart of a [`Store`].
pub trait WeakStore {
	/// The store type this refers to.
	type Strong;

	/// Retrieves the store, if it is still alive.
	fn upgrade(&self) -> Option<Self::Strong>;
}
