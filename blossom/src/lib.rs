#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![forbid(unsafe_code)]
//! Observable stores for application state, built on [`stamen`].
//!
//! - [`ValueStore`]: one value that may be absent. Subscribers get the current value right away.
//! - [`CollectionStore`]: an ordered list with one notification per operation.
//! - [`wiring`]: feeding stores from [`Source`]s and from each other, without strong
//!   references from upstream to downstream.
//!
//! ```
//! use blossom::ValueStore;
//!
//! let x = ValueStore::new(5);
//! let y = ValueStore::empty();
//! x.stream_to_with(&y, |x| x * 2);
//! assert_eq!(y.get(), Some(10));
//!
//! x.set_value(7);
//! assert_eq!(y.get(), Some(14));
//! ```
//!
//! All stores are single-threaded and deliver synchronously, in subscription order.

mod collection_store;
mod error;
mod options;
mod traits;
mod value_store;
pub mod wiring;

pub use collection_store::{CollectionBuilder, CollectionStore, WeakCollectionStore};
pub use error::StoreError;
pub use options::StoreOptions;
pub use traits::{Dispose, Store, WeakStore};
pub use value_store::{ValueStore, WeakValueStore};

pub use stamen::{Cancel, CancelOnDrop, Changes, Fault, Listener, Source, Subscription};

/// The traits needed to work with stores generically.
pub mod prelude {
	pub use crate::{Dispose, Store, WeakStore};
	pub use stamen::Source;
}
