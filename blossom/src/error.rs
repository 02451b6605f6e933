use std::borrow::Cow;

use thiserror::Error;

/// Errors reported by the fallible store operations.
///
/// The infallible counterparts treat these conditions as silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// The store was disposed, so it no longer accepts values.
	#[error("store `{label}` has been disposed")]
	Disposed {
		/// The store's [`label`](`crate::StoreOptions::label`).
		label: Cow<'static, str>,
	},

	/// An index past the end of a collection.
	#[error("index {index} is out of bounds for a collection of length {len}")]
	OutOfBounds {
		/// The offending index.
		index: usize,
		/// The collection's length at the time.
		len: usize,
	},
}
