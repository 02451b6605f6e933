use std::{
	cell::{Cell, RefCell},
	collections::VecDeque,
	error::Error,
	fmt::{self, Debug, Formatter},
	rc::{Rc, Weak},
};

use tracing::{debug, trace};

use crate::{
	handle::{Detach, HandleId},
	registry::Registry,
	Handle, Source, Subscription,
};

/// An error travelling through a [`Channel`].
pub type Fault = Rc<dyn Error>;

/// The callbacks of one [`Channel`] subscription.
///
/// Data events carry [`None`] when the publisher has no value to show.
pub struct Listener<T> {
	on_data: Box<dyn Fn(Option<&T>)>,
	on_error: Option<Box<dyn Fn(&Fault)>>,
	on_done: Option<Box<dyn Fn()>>,
	cancel_on_error: bool,
}

impl<T> Debug for Listener<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener")
			.field("on_error", &self.on_error.is_some())
			.field("on_done", &self.on_done.is_some())
			.field("cancel_on_error", &self.cancel_on_error)
			.finish_non_exhaustive()
	}
}

impl<T> Listener<T> {
	/// A listener that only handles data.
	pub fn new(on_data: impl 'static + Fn(Option<&T>)) -> Self {
		Self {
			on_data: Box::new(on_data),
			on_error: None,
			on_done: None,
			cancel_on_error: false,
		}
	}

	/// Handles errors with `on_error`. Unhandled errors are dropped.
	#[must_use]
	pub fn on_error(mut self, on_error: impl 'static + Fn(&Fault)) -> Self {
		self.on_error = Some(Box::new(on_error));
		self
	}

	/// Runs `on_done` once the channel closes.
	#[must_use]
	pub fn on_done(mut self, on_done: impl 'static + Fn()) -> Self {
		self.on_done = Some(Box::new(on_done));
		self
	}

	/// Iff `true`, the subscription is canceled right after it receives an error.
	#[must_use]
	pub fn cancel_on_error(mut self, cancel_on_error: bool) -> Self {
		self.cancel_on_error = cancel_on_error;
		self
	}

	/// Invokes the data callback.
	pub fn data(&self, value: Option<&T>) {
		(self.on_data)(value);
	}

	fn error(&self, fault: &Fault) {
		if let Some(on_error) = &self.on_error {
			on_error(fault);
		}
	}

	fn done(&self) {
		if let Some(on_done) = &self.on_done {
			on_done();
		}
	}
}

enum Event<T> {
	Data(Option<T>),
	Error(Fault),
	Done,
}

/// A broadcast notification pipe without a value slot of its own.
///
/// Delivery is synchronous and runs to completion: An event published from within a
/// listener is queued and delivered once the current pass ends, before the outermost
/// `publish` returns. Every listener therefore sees events in publish order.
/// A listener only receives events published after it was attached, even if earlier
/// ones are still queued.
///
/// Closing the channel delivers "done" to every listener and then cancels them all.
///
/// Cloning a [`Channel`] creates a new handle to the **same** channel.
pub struct Channel<T: 'static> {
	inner: Rc<ChannelInner<T>>,
}

struct ChannelInner<T: 'static> {
	registry: Registry<Listener<T>>,
	/// Each event reaches only the listeners attached before it was queued.
	queue: RefCell<VecDeque<(HandleId, Event<T>)>>,
	draining: Cell<bool>,
	closed: Cell<bool>,
}

impl<T: 'static> Detach for ChannelInner<T> {
	fn detach(&self, id: HandleId) {
		self.registry.detach(id);
	}
}

impl<T: 'static> Drop for ChannelInner<T> {
	fn drop(&mut self) {
		// Outstanding handles report as canceled once the channel is gone.
		self.registry.clear();
	}
}

impl<T: 'static> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: 'static> Debug for Channel<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Channel")
			.field("listeners", &self.inner.registry.len())
			.field("closed", &self.inner.closed.get())
			.finish_non_exhaustive()
	}
}

impl<T: 'static> Default for Channel<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Channel<T> {
	/// Creates a new open [`Channel`].
	#[must_use]
	pub fn new() -> Self {
		Self {
			inner: Rc::new(ChannelInner {
				registry: Registry::new(),
				queue: RefCell::new(VecDeque::new()),
				draining: Cell::new(false),
				closed: Cell::new(false),
			}),
		}
	}

	/// Whether [`Channel::close`] was called.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.inner.closed.get()
	}

	/// The number of attached (possibly paused) listeners.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.registry.len()
	}

	/// Whether no listeners are attached.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Attaches `listener` for subsequent events.
	///
	/// On a closed channel, `listener` is told "done" immediately and the returned handle is already canceled.
	pub fn listen(&self, listener: Listener<T>) -> Subscription<T> {
		if self.is_closed() {
			listener.done();
			return Handle::canceled(self.inner.registry.next_id());
		}
		let owner: Weak<dyn Detach> = Rc::downgrade(&self.inner) as Weak<dyn Detach>;
		self.inner.registry.attach(owner, Rc::new(listener), true)
	}

	/// Attaches `listener` and immediately hands it `current`, outside the normal publish path.
	///
	/// Only the new listener sees `current`.
	/// Events queued before this call skip the new listener, so `current` isn't delivered twice.
	pub fn listen_replaying(&self, listener: Listener<T>, current: Option<&T>) -> Subscription<T> {
		let subscription = self.listen(listener);
		subscription.deliver_once(|listener| listener.data(current));
		subscription
	}

	/// Publishes `value` to all active listeners.
	///
	/// Returns `false` without effect iff the channel is closed.
	pub fn publish(&self, value: Option<T>) -> bool {
		self.enqueue(Event::Data(value))
	}

	/// Publishes `fault` to all active listeners.
	///
	/// Returns `false` without effect iff the channel is closed.
	pub fn publish_error(&self, fault: Fault) -> bool {
		self.enqueue(Event::Error(fault))
	}

	/// Closes the channel: Every listener is told "done" and then canceled.
	///
	/// Returns `false` iff the channel was already closed.
	pub fn close(&self) -> bool {
		if self.inner.closed.replace(true) {
			return false;
		}
		self.push(Event::Done);
		self.drain();
		true
	}

	fn enqueue(&self, event: Event<T>) -> bool {
		if self.inner.closed.get() {
			trace!("event dropped on closed channel");
			return false;
		}
		self.push(event);
		self.drain();
		true
	}

	fn push(&self, event: Event<T>) {
		let watermark = self.inner.registry.watermark();
		self.inner.queue.borrow_mut().push_back((watermark, event));
	}

	fn next_event(&self) -> Option<(HandleId, Event<T>)> {
		self.inner.queue.borrow_mut().pop_front()
	}

	fn drain(&self) {
		if self.inner.draining.replace(true) {
			// The outer pass picks the event up.
			return;
		}
		let _draining = scopeguard::guard(&self.inner.draining, |draining| draining.set(false));
		while let Some((watermark, event)) = self.next_event() {
			self.dispatch(watermark, event);
		}
	}

	fn dispatch(&self, watermark: HandleId, event: Event<T>) {
		match event {
			Event::Data(value) => {
				let delivered = self.inner.registry.deliver_before(watermark, |listener| {
					listener.data(value.as_ref());
					true
				});
				trace!(delivered, present = value.is_some(), "channel data delivered");
			}
			Event::Error(fault) => {
				let delivered = self.inner.registry.deliver_before(watermark, |listener| {
					listener.error(&fault);
					!listener.cancel_on_error
				});
				debug!(delivered, %fault, "channel error delivered");
			}
			Event::Done => {
				self.inner.registry.deliver_before(watermark, |listener| {
					listener.done();
					true
				});
				self.inner.registry.clear();
				debug!("channel closed");
			}
		}
	}
}

impl<T: 'static> Source<T> for Channel<T> {
	fn listen(&self, listener: Listener<T>) -> Subscription<T> {
		Channel::listen(self, listener)
	}
}
