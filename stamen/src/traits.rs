use crate::{channel::Listener, Handle};

/// A [`Handle`] to a plain value callback, as handed out by [`Observable`]s.
pub type Observer<T> = Handle<dyn Fn(&T)>;

/// A [`Handle`] to a [`Listener`], as handed out by [`Source`]s.
pub type Subscription<T> = Handle<Listener<T>>;

/// The capability shared by [`SingleCast`](`crate::SingleCast`) and [`Broadcast`](`crate::Broadcast`).
///
/// Both hold an optional current value. Attaching a handle while a value is present
/// delivers that value to the new handle, exactly once, before the call returns.
pub trait Observable<T> {
	/// Attaches `callback` and replays the current value to it, if any.
	fn subscribe(&self, callback: impl 'static + Fn(&T)) -> Observer<T>
	where
		Self: Sized;

	/// Like [`Observable::subscribe`], but the handle is canceled after its first delivery.
	///
	/// If a value is present, the returned handle is already canceled.
	fn once(&self, callback: impl 'static + Fn(&T)) -> Observer<T>
	where
		Self: Sized;

	/// Stores `value`, then [`notify`](`Observable::notify`)s.
	fn set_value(&self, value: T);

	/// Delivers the current value to the active handles, if a value is present.
	fn notify(&self);

	/// Cancels `handle`, or all handles if [`None`].
	fn cancel(&self, handle: Option<&Observer<T>>);

	/// A clone of the current value.
	fn value(&self) -> Option<T>;

	/// Cancels all handles.
	fn dispose(&self) {
		self.cancel(None);
	}
}

/// Anything [`Listener`]s can be attached to.
///
/// Unlike [`Observable::subscribe`], [`Source::listen`] never replays a value.
pub trait Source<T> {
	/// Attaches `listener` for subsequent events.
	fn listen(&self, listener: Listener<T>) -> Subscription<T>;
}
