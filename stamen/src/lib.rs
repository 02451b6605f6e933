#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![forbid(unsafe_code)]
//! Observable primitives with fine-grained subscription control.
//!
//! - [`Handle`]: one listener's relationship to one observable. Pause, resume, one-shot, cancel.
//! - [`SingleCast`]: a current value and at most one subscription.
//! - [`Broadcast`]: a current value and any number of subscriptions.
//! - [`Channel`]: a valueless broadcast pipe with data, error and "done" events,
//!   which can also be consumed as a [`Stream`](`futures_lite::Stream`) of [`Changes`].
//!
//! Everything here is single-threaded (`!Send`) and delivers synchronously.

mod broadcast;
mod channel;
mod handle;
mod registry;
mod single_cast;
mod stream;
mod traits;

pub use broadcast::Broadcast;
pub use channel::{Channel, Fault, Listener};
pub use handle::{Cancel, CancelOnDrop, Detach, Handle, HandleId};
pub use single_cast::SingleCast;
pub use stream::Changes;
pub use traits::{Observable, Observer, Source, Subscription};
