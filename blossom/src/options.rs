use std::borrow::Cow;

/// Configuration shared by all stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
	pub(crate) label: Cow<'static, str>,
}

impl Default for StoreOptions {
	fn default() -> Self {
		Self {
			label: Cow::Borrowed("store"),
		}
	}
}

impl StoreOptions {
	/// The defaults.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Names the store in logs and errors.
	#[must_use]
	pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
		self.label = label.into();
		self
	}

	/// The configured label.
	#[must_use]
	pub fn get_label(&self) -> &str {
		&self.label
	}
}
