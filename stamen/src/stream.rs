use std::{
	fmt::{self, Debug, Formatter},
	pin::Pin,
	task::{Context, Poll},
};

use futures_channel::mpsc::{self, UnboundedReceiver};
use futures_lite::Stream;
use pin_project::pin_project;

use crate::{CancelOnDrop, Channel, Listener, Subscription};

/// A [`Stream`] of the values published on a [`Channel`].
///
/// Values are buffered without bound until polled. The stream ends once the
/// channel closes. Dropping the stream cancels its subscription.
#[pin_project]
#[must_use = "Streams do nothing unless polled."]
pub struct Changes<T: 'static> {
	#[pin]
	receiver: UnboundedReceiver<Option<T>>,
	subscription: CancelOnDrop<Subscription<T>>,
}

impl<T: 'static> Debug for Changes<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Changes")
			.field("subscription", self.subscription.get())
			.finish_non_exhaustive()
	}
}

impl<T: 'static> Changes<T> {
	/// The underlying subscription, e.g. to [`pause`](`crate::Handle::pause`) it.
	pub fn subscription(&self) -> &Subscription<T> {
		self.subscription.get()
	}
}

impl<T: 'static> Stream for Changes<T> {
	type Item = Option<T>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.project().receiver.poll_next(cx)
	}
}

impl<T: 'static + Clone> Channel<T> {
	/// Turns subsequent data events into a [`Stream`].
	///
	/// Errors are not forwarded.
	pub fn changes(&self) -> Changes<T> {
		let (sender, receiver) = mpsc::unbounded();
		let closer = sender.clone();
		let subscription = self.listen(
			Listener::new(move |value: Option<&T>| {
				// The receiver may already be gone, in which case there's nobody to tell.
				let _ = sender.unbounded_send(value.cloned());
			})
			.on_done(move || closer.close_channel()),
		);
		Changes {
			receiver,
			subscription: CancelOnDrop::new(subscription),
		}
	}
}
