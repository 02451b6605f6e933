use std::{
	borrow::Cow,
	cmp::Ordering,
	fmt::{self, Debug, Formatter},
	ops::{Bound, RangeBounds},
};

use rand::{seq::SliceRandom, Rng};
use stamen::{Cancel, Changes, Fault, Listener, Source, Subscription};
use tap::Pipe;
use tracing::{debug, trace};

use crate::{
	traits::{Dispose, Store, WeakStore},
	value_store::{ValueStore, WeakValueStore},
	wiring::feed,
	StoreError, StoreOptions,
};

/// An observable, ordered list.
///
/// Each mutating operation sends exactly one notification carrying the whole
/// list, however many items it touched. Subscribers see the list in its state
/// after the operation.
///
/// A *nullable* collection (see [`CollectionBuilder::nullable`]) publishes
/// "absent" while it is empty. Otherwise it publishes an empty list.
pub struct CollectionStore<T: 'static> {
	store: ValueStore<Vec<T>>,
	disposer: Option<fn(&T)>,
}

/// A non-owning reference to a [`CollectionStore`].
pub struct WeakCollectionStore<T: 'static> {
	store: WeakValueStore<Vec<T>>,
	disposer: Option<fn(&T)>,
}

/// Configures a [`CollectionStore`].
#[must_use = "Call `.build()` to create the collection."]
pub struct CollectionBuilder<T> {
	items: Vec<T>,
	options: StoreOptions,
	nullable: bool,
	disposer: Option<fn(&T)>,
}

impl<T: Debug> Debug for CollectionBuilder<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionBuilder")
			.field("items", &self.items)
			.field("options", &self.options)
			.field("nullable", &self.nullable)
			.field("disposing", &self.disposer.is_some())
			.finish()
	}
}

impl<T: 'static + Clone> CollectionBuilder<T> {
	/// Starts the collection out with `items`.
	pub fn items(mut self, items: impl IntoIterator<Item = T>) -> Self {
		self.items = items.into_iter().collect();
		self
	}

	/// Names the collection in logs and errors.
	pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
		self.options = self.options.label(label);
		self
	}

	/// Whether the collection publishes "absent" rather than an empty list.
	pub fn nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}

	/// Makes [`clear(true)`](`CollectionStore::clear`) dispose each removed item.
	pub fn disposing(mut self) -> Self
	where
		T: Dispose,
	{
		let dispose: fn(&T) = T::dispose;
		self.disposer = Some(dispose);
		self
	}

	/// Creates the collection.
	pub fn build(self) -> CollectionStore<T> {
		let absent_when: Option<fn(&Vec<T>) -> bool> = if self.nullable {
			Some(Vec::is_empty)
		} else {
			None
		};
		CollectionStore {
			store: ValueStore::with_policy(Some(self.items), self.options, absent_when),
			disposer: self.disposer,
		}
	}
}

impl<T: 'static> Clone for CollectionStore<T> {
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			disposer: self.disposer,
		}
	}
}

impl<T: 'static> Clone for WeakCollectionStore<T> {
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			disposer: self.disposer,
		}
	}
}

impl<T: 'static + Debug> Debug for CollectionStore<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionStore")
			.field("store", &self.store)
			.field("disposing", &self.disposer.is_some())
			.finish()
	}
}

impl<T: 'static> Debug for WeakCollectionStore<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakCollectionStore").finish_non_exhaustive()
	}
}

impl<T: 'static + Clone> Default for CollectionStore<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static + Clone> CollectionStore<T> {
	/// An empty, non-nullable collection.
	#[must_use]
	pub fn new() -> Self {
		Self::builder().build()
	}

	/// A non-nullable collection holding `items`.
	pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
		Self::builder().items(items).build()
	}

	/// Starts configuring a collection.
	pub fn builder() -> CollectionBuilder<T> {
		CollectionBuilder {
			items: Vec::new(),
			options: StoreOptions::new().label("collection"),
			nullable: false,
			disposer: None,
		}
	}

	/// The underlying store of the whole list.
	#[must_use]
	pub fn as_value_store(&self) -> &ValueStore<Vec<T>> {
		&self.store
	}

	/// The label this collection was configured with.
	#[must_use]
	pub fn label(&self) -> &str {
		self.store.label()
	}

	/// Inspects the items without cloning them.
	///
	/// # Panics
	///
	/// If `f` writes to this collection.
	pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
		self.store.with(|items| f(items.map_or(&[][..], Vec::as_slice)))
	}

	/// A clone of all items.
	#[must_use]
	pub fn items(&self) -> Vec<T> {
		self.store.get().unwrap_or_default()
	}

	/// The number of items.
	#[must_use]
	pub fn len(&self) -> usize {
		self.with_items(<[T]>::len)
	}

	/// Whether there are no items.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A clone of the item at `index`.
	#[must_use]
	pub fn get(&self, index: usize) -> Option<T> {
		self.with_items(|items| items.get(index).cloned())
	}

	/// Clones of all items matching `predicate`, in order.
	pub fn matching(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
		self.with_items(|items| items.iter().filter(|item| predicate(item)).cloned().collect())
	}

	/// A clone of the first item matching `predicate`.
	pub fn first_where(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
		self.with_items(|items| items.iter().find(|item| predicate(item)).cloned())
	}

	/// The index of the first item matching `predicate`.
	pub fn index_where(&self, predicate: impl Fn(&T) -> bool) -> Option<usize> {
		self.with_items(|items| items.iter().position(predicate))
	}

	/// The index of the first item equal to `item`.
	pub fn index_of(&self, item: &T) -> Option<usize>
	where
		T: PartialEq,
	{
		self.index_where(|existing| existing == item)
	}

	/// Whether any item equals `item`.
	pub fn contains(&self, item: &T) -> bool
	where
		T: PartialEq,
	{
		self.index_of(item).is_some()
	}

	/// Clones of the items in `range`, or [`None`] if it isn't within bounds.
	pub fn sublist(&self, range: impl RangeBounds<usize>) -> Option<Vec<T>> {
		let bounds: (Bound<usize>, Bound<usize>) =
			(range.start_bound().cloned(), range.end_bound().cloned());
		self.with_items(|items| items.get(bounds).map(<[T]>::to_vec))
	}

	/// Runs `f` on the list, then notifies once.
	fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> Option<R> {
		let result = self.store.modify(f)?;
		self.store.notify();
		Some(result)
	}

	/// Appends `item`.
	pub fn add(&self, item: T) {
		self.mutate(|items| items.push(item));
	}

	/// Appends all of `items`, notifying once.
	pub fn add_all(&self, items: impl IntoIterator<Item = T>) {
		self.mutate(|existing| existing.extend(items));
	}

	/// Inserts `item` at `index`, shifting later items back.
	///
	/// # Errors
	///
	/// [`StoreError::OutOfBounds`] if `index` is greater than the length, in
	/// which case nothing changes and nobody is notified.
	/// [`StoreError::Disposed`] if the collection was disposed.
	pub fn insert(&self, index: usize, item: T) -> Result<(), StoreError> {
		let len = self.len();
		if index > len {
			return Err(StoreError::OutOfBounds { index, len });
		}
		self.mutate(|items| items.insert(index, item))
			.ok_or_else(|| self.disposed_error())
	}

	/// Removes the first item equal to `item`. Notifies even if there was none.
	pub fn remove(&self, item: &T) -> bool
	where
		T: PartialEq,
	{
		self.mutate(|items| {
			items
				.iter()
				.position(|existing| existing == item)
				.map(|index| items.remove(index))
				.is_some()
		})
		.unwrap_or(false)
	}

	/// Removes and returns the item at `index`.
	///
	/// Out-of-bounds indices change nothing and don't notify.
	pub fn remove_at(&self, index: usize) -> Option<T> {
		if index >= self.len() {
			trace!(label = %self.label(), index, "remove_at out of bounds");
			return None;
		}
		self.mutate(|items| items.remove(index))
	}

	/// Removes every item matching `predicate` and returns how many there were.
	pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
		self.mutate(|items| {
			let before = items.len();
			items.retain(|item| !predicate(item));
			before - items.len()
		})
		.unwrap_or(0)
	}

	/// Sorts the items.
	pub fn sort(&self)
	where
		T: Ord,
	{
		self.mutate(|items| items.sort());
	}

	/// Sorts the items with `compare`.
	pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
		self.mutate(|items| items.sort_by(compare));
	}

	/// Sorts the items by the key `f` extracts.
	pub fn sort_by_key<K: Ord>(&self, f: impl FnMut(&T) -> K) {
		self.mutate(|items| items.sort_by_key(f));
	}

	/// Shuffles the items using the thread-local RNG.
	pub fn shuffle(&self) {
		self.shuffle_with(&mut rand::rng());
	}

	/// Shuffles the items using `rng`.
	pub fn shuffle_with<R: Rng + ?Sized>(&self, rng: &mut R) {
		self.mutate(|items| items.shuffle(rng));
	}

	/// Replaces the first item matching `predicate` with `item`.
	///
	/// Notifies only if something was replaced and `notify` is set.
	pub fn replace(&self, item: T, predicate: impl Fn(&T) -> bool, notify: bool) -> bool {
		let replaced = self
			.store
			.modify(|items| replace_first(items, item, predicate))
			.unwrap_or(false);
		if replaced && notify {
			self.store.notify();
		}
		replaced
	}

	/// For each of `items`, replaces the first existing item that `matches` it.
	///
	/// Notifies exactly once, at the end. Returns how many items were replaced.
	pub fn replace_all(
		&self,
		items: impl IntoIterator<Item = T>,
		matches: impl Fn(&T, &T) -> bool,
	) -> usize {
		self.mutate(|existing| {
			let mut replaced = 0;
			for item in items {
				if let Some(index) = existing.iter().position(|current| matches(current, &item)) {
					existing[index] = item;
					replaced += 1;
				}
			}
			replaced
		})
		.unwrap_or(0)
	}

	/// Replaces all items with `items`, keeping the list's allocation.
	///
	/// Always notifies.
	pub fn set_items(&self, items: impl IntoIterator<Item = T>) {
		self.mutate(|existing| {
			existing.clear();
			existing.extend(items);
		});
	}

	/// Removes all items, then notifies once.
	///
	/// With `dispose_items`, each removed item is disposed first if this
	/// collection was built [`disposing`](`CollectionBuilder::disposing`).
	/// For other collections of [`Dispose`] items, see [`clear_disposing`](`CollectionStore::clear_disposing`).
	pub fn clear(&self, dispose_items: bool) {
		let disposer = if dispose_items {
			if self.disposer.is_none() {
				debug!(label = %self.label(), "no disposer configured, items dropped as-is");
			}
			self.disposer
		} else {
			None
		};
		self.clear_with(disposer);
	}

	/// Disposes and removes all items, then notifies once.
	///
	/// Unlike [`clear(true)`](`CollectionStore::clear`), this works however
	/// the collection was built.
	pub fn clear_disposing(&self)
	where
		T: Dispose,
	{
		let dispose: fn(&T) = T::dispose;
		self.clear_with(Some(dispose));
	}

	fn clear_with(&self, disposer: Option<fn(&T)>) {
		let Some(removed) = self.store.modify(|items| items.drain(..).collect::<Vec<_>>()) else {
			return;
		};
		if let Some(dispose) = disposer {
			removed.iter().for_each(dispose);
		}
		drop(removed);
		self.store.notify();
	}

	fn disposed_error(&self) -> StoreError {
		StoreError::Disposed {
			label: self.label().to_owned().into(),
		}
	}

	/// Delivers the current list to all subscribers.
	pub fn notify(&self) {
		self.store.notify();
	}

	/// Counts accepted writes. Starts at 0.
	#[must_use]
	pub fn version(&self) -> u64 {
		self.store.version()
	}

	/// How many subscriptions are currently attached.
	#[must_use]
	pub fn subscriber_count(&self) -> usize {
		self.store.subscriber_count()
	}

	/// Subscribes to data events, starting with the current list.
	pub fn subscribe(&self, on_data: impl 'static + Fn(Option<&Vec<T>>)) -> Subscription<Vec<T>> {
		self.store.subscribe(on_data)
	}

	/// Subscribes `listener`, starting with the current list.
	pub fn subscribe_with(&self, listener: Listener<Vec<T>>) -> Subscription<Vec<T>> {
		self.store.subscribe_with(listener)
	}

	/// Feeds `source`'s lists into this collection.
	///
	/// An absent list clears the collection without disposing its items.
	pub fn subscribe_to(&self, source: &impl Source<Vec<T>>) -> Subscription<Vec<T>> {
		feed(source, self, |items: Option<&Vec<T>>| items.cloned())
	}

	/// Publishes `fault` to subscribers' error callbacks.
	pub fn add_error(&self, fault: Fault) {
		self.store.add_error(fault);
	}

	/// Later lists as a [`Stream`](`futures_lite::Stream`), without replay.
	pub fn changes(&self) -> Changes<Vec<T>> {
		self.store.changes()
	}

	/// Pushes this collection into `target` now and on every change.
	pub fn stream_to<S: Store<Vec<T>>>(&self, target: &S) -> Subscription<Vec<T>> {
		self.store.stream_to(target)
	}

	/// Pushes the items matching `filter` into `target` now and on every change.
	pub fn filter_to<S: Store<Vec<T>>>(
		&self,
		target: &S,
		filter: impl 'static + Fn(&T) -> bool,
	) -> Subscription<Vec<T>> {
		self.filter_to_with(target, filter, |items| items)
	}

	/// Pushes the items matching `filter`, passed through `convert`, into
	/// `target` now and on every change.
	///
	/// An absent list stays absent.
	pub fn filter_to_with<U, S: Store<U>>(
		&self,
		target: &S,
		filter: impl 'static + Fn(&T) -> bool,
		convert: impl 'static + Fn(Vec<T>) -> U,
	) -> Subscription<Vec<T>> {
		let select = move |items: Option<&Vec<T>>| {
			items.map(|items| {
				items
					.iter()
					.filter(|item| filter(item))
					.cloned()
					.collect::<Vec<_>>()
					.pipe(&convert)
			})
		};
		target.set(select(self.store.published().as_ref()));
		feed(self, target, select)
	}

	/// Closes the collection. Items are not disposed. Idempotent.
	pub fn dispose(&self) {
		self.store.dispose();
	}

	/// Whether the collection was disposed.
	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.store.is_disposed()
	}

	/// Creates a non-owning reference to this collection.
	#[must_use]
	pub fn downgrade(&self) -> WeakCollectionStore<T> {
		WeakCollectionStore {
			store: self.store.downgrade(),
			disposer: self.disposer,
		}
	}
}

fn replace_first<T>(items: &mut [T], item: T, predicate: impl Fn(&T) -> bool) -> bool {
	match items.iter().position(predicate) {
		Some(index) => {
			items[index] = item;
			true
		}
		None => false,
	}
}

impl<T: 'static> Source<Vec<T>> for CollectionStore<T> {
	fn listen(&self, listener: Listener<Vec<T>>) -> Subscription<Vec<T>> {
		self.store.listen(listener)
	}
}

impl<T: 'static> Dispose for CollectionStore<T> {
	fn dispose(&self) {
		Dispose::dispose(&self.store);
	}
}

impl<T: 'static + Clone> Store<Vec<T>> for CollectionStore<T> {
	type Weak = WeakCollectionStore<T>;

	fn downgrade(&self) -> Self::Weak {
		self.downgrade()
	}

	fn get(&self) -> Option<Vec<T>> {
		Some(self.items())
	}

	/// Replaces the items, or clears the collection (without disposal) for [`None`].
	fn set(&self, value: Option<Vec<T>>) {
		match value {
			Some(items) => self.set_items(items),
			None => self.clear(false),
		}
	}

	fn notify(&self) {
		self.notify();
	}

	fn subscribe_with(&self, listener: Listener<Vec<T>>) -> Subscription<Vec<T>> {
		self.subscribe_with(listener)
	}

	fn own(&self, subscription: Box<dyn Cancel>) {
		self.store.own(subscription);
	}

	fn dispose(&self) {
		self.dispose();
	}

	fn is_disposed(&self) -> bool {
		self.is_disposed()
	}
}

impl<T: 'static + Clone> WeakStore for WeakCollectionStore<T> {
	type Strong = CollectionStore<T>;

	fn upgrade(&self) -> Option<Self::Strong> {
		self.store.upgrade().map(|store| CollectionStore {
			store,
			disposer: self.disposer,
		})
	}
}
