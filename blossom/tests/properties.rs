use blossom::{CollectionStore, ValueStore};
use proptest::prelude::*;

use _validator::Validator;

proptest! {
	#[test]
	fn only_changes_are_published(writes in prop::collection::vec(0u8..4, 0..32)) {
		let v = Validator::new();
		let store = ValueStore::new(0u8);
		let _sub = store.subscribe({
			let v = v.clone();
			move |value: Option<&u8>| v.push(value.copied())
		});

		let mut expected = vec![Some(0)];
		let mut current = 0;
		for &write in &writes {
			store.set_value(write);
			if write != current {
				expected.push(Some(write));
				current = write;
			}
		}

		v.expect(expected);
		prop_assert_eq!(store.get(), Some(current));
	}

	#[test]
	fn batches_notify_once(batches in prop::collection::vec(prop::collection::vec(any::<i16>(), 0..8), 0..8)) {
		let v = Validator::new();
		let numbers = CollectionStore::new();
		let _sub = numbers.subscribe({
			let v = v.clone();
			move |items: Option<&Vec<i16>>| v.push(items.map_or(0, Vec::len))
		});

		let mut expected = vec![0];
		let mut len = 0;
		for batch in &batches {
			len += batch.len();
			numbers.add_all(batch.iter().copied());
			expected.push(len);
		}
		numbers.clear(false);
		expected.push(0);

		v.expect(expected);
		prop_assert_eq!(numbers.version(), batches.len() as u64 + 1);
	}
}
