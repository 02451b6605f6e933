//! Connecting stores to sources and to each other.
//!
//! Wiring never creates a strong reference from upstream to downstream: a
//! source's listener only holds a [`WeakStore`] to its target, and the
//! subscription itself is [owned](`Store::own`) by the target. Disposing (or
//! dropping) the target therefore detaches it from everything it listens to.

use stamen::{Listener, Source, Subscription};
use tracing::trace;

use crate::{Store, WeakStore};

/// Feeds each data event from `source` through `convert` into `target`.
///
/// Nothing is pushed until `source` next publishes.
pub fn feed<U, T, S>(
	source: &impl Source<U>,
	target: &S,
	convert: impl 'static + Fn(Option<&U>) -> Option<T>,
) -> Subscription<U>
where
	U: 'static,
	S: Store<T>,
{
	let weak = target.downgrade();
	let subscription = source.listen(Listener::new(move |value: Option<&U>| {
		if let Some(target) = weak.upgrade() {
			target.set(convert(value));
		} else {
			trace!("fed store is gone");
		}
	}));
	target.own(Box::new(subscription.clone()));
	subscription
}

/// Copies `from`'s current value into `to`, once.
pub fn copy_value<T>(from: &impl Store<T>, to: &impl Store<T>) {
	to.set(from.get());
}

/// Shadows each named variable with a clone of itself,
/// which is handy right before a `move` closure.
///
/// ```
/// use blossom::{shadow_clone, ValueStore};
///
/// let a = ValueStore::new(1);
/// let callback = {
/// 	shadow_clone!(a);
/// 	move |value: Option<&i32>| a.set(value.copied())
/// };
/// # drop(callback);
/// a.set_value(2);
/// ```
#[macro_export]
macro_rules! shadow_clone {
	($($ident:ident),*$(,)?) => {
		$(let $ident = ::core::clone::Clone::clone(&$ident);)*
	};
}
