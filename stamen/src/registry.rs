use std::{
	cell::{Cell, RefCell},
	mem,
	rc::{Rc, Weak},
};

use crate::handle::{Detach, Handle, HandleId};

/// An ordered set of [`Handle`]s with snapshot-based delivery.
///
/// The handle list is never borrowed while a callback runs, so callbacks may
/// freely attach or cancel handles on the same registry.
pub(crate) struct Registry<L: ?Sized> {
	handles: RefCell<Vec<Handle<L>>>,
	next_id: Cell<u64>,
}

impl<L: ?Sized> Registry<L> {
	pub(crate) fn new() -> Self {
		Self {
			handles: RefCell::new(Vec::new()),
			next_id: Cell::new(0),
		}
	}

	pub(crate) fn next_id(&self) -> HandleId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		HandleId(id)
	}

	/// The id the next attached handle will get. Every handle attached so far sorts below it.
	pub(crate) fn watermark(&self) -> HandleId {
		HandleId(self.next_id.get())
	}

	pub(crate) fn attach(&self, owner: Weak<dyn Detach>, callback: Rc<L>, keep_alive: bool) -> Handle<L> {
		let handle = Handle::new(self.next_id(), owner, callback, keep_alive);
		self.handles.borrow_mut().push(handle.clone());
		handle
	}

	pub(crate) fn detach(&self, id: HandleId) {
		let removed = {
			let mut handles = self.handles.borrow_mut();
			handles
				.iter()
				.position(|handle| handle.id() == id)
				.map(|index| handles.remove(index))
		};
		drop(removed);
	}

	pub(crate) fn len(&self) -> usize {
		self.handles.borrow().len()
	}

	/// Cancels and forgets every handle.
	pub(crate) fn clear(&self) {
		let handles = mem::take(&mut *self.handles.borrow_mut());
		for handle in handles {
			handle.cancel();
		}
	}

	/// Runs `call` for each handle attached when the pass starts and still active on its turn, in attach order.
	///
	/// `call` returns whether to retain the handle. One-shot handles and those
	/// `call` rejected are canceled together once the pass ends, even if a callback panics.
	///
	/// Returns the number of handles `call` ran for.
	pub(crate) fn deliver(&self, call: impl FnMut(&L) -> bool) -> usize {
		self.deliver_before(self.watermark(), call)
	}

	/// Like [`Registry::deliver`], but skips handles attached at or after `watermark`.
	pub(crate) fn deliver_before(
		&self,
		watermark: HandleId,
		mut call: impl FnMut(&L) -> bool,
	) -> usize {
		let snapshot: Vec<_> = self
			.handles
			.borrow()
			.iter()
			.take_while(|handle| handle.id() < watermark)
			.cloned()
			.collect();
		let mut spent = scopeguard::guard(Vec::new(), |spent: Vec<Handle<L>>| {
			for handle in spent {
				handle.cancel();
			}
		});

		let mut delivered = 0;
		for handle in &snapshot {
			// Handles canceled or paused earlier in this pass are skipped here.
			let Some(callback) = handle.callback() else {
				continue;
			};
			let one_shot = handle.is_one_shot();
			delivered += 1;
			if !call(&callback) || one_shot {
				spent.push(handle.clone());
			}
		}
		delivered
	}
}
