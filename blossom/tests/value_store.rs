use std::{io, rc::Rc};

use blossom::{shadow_clone, wiring, Fault, Listener, StoreError, StoreOptions, ValueStore};
use futures_lite::{future::block_on, StreamExt};

use _validator::Validator;

fn record(v: &Validator<Option<i32>>) -> impl 'static + Fn(Option<&i32>) {
	let v = v.clone();
	move |value: Option<&i32>| v.push(value.copied())
}

#[test]
fn replays_then_follows_changes() {
	let v = Validator::new();
	let store = ValueStore::new(1);

	let _sub = store.subscribe(record(&v));
	v.expect([Some(1)]);

	store.set_value(2);
	v.expect([Some(2)]);
}

#[test]
fn empty_store_replays_absence() {
	let v = Validator::new();
	let store = ValueStore::empty();

	let _sub = store.subscribe(record(&v));
	v.expect([None]);
	assert!(!store.is_present());
}

#[test]
fn equal_values_are_not_republished() {
	let v = Validator::new();
	let store = ValueStore::new(1);
	let _sub = store.subscribe(record(&v));
	v.expect([Some(1)]);

	store.set_value(1);
	v.expect([]);
	assert_eq!(store.try_set_value(1), Ok(false));
	assert_eq!(store.try_set_value(3), Ok(true));
	v.expect([Some(3)]);

	store.clear_value();
	store.clear_value();
	v.expect([None]);
}

#[test]
fn replace_and_notify_always_deliver() {
	let v = Validator::new();
	let store = ValueStore::new(1);
	let _sub = store.subscribe(record(&v));
	v.expect([Some(1)]);

	store.replace_value(1);
	store.notify();
	v.expect([Some(1), Some(1)]);
}

#[test]
fn version_counts_accepted_writes() {
	let store = ValueStore::new(vec![1]);
	assert_eq!(store.version(), 0);

	store.set_value(vec![1]);
	assert_eq!(store.version(), 0);

	store.set_value(vec![2]);
	store.replace_value(vec![2]);
	store.update(|items| items.push(3));
	assert_eq!(store.version(), 3);
	assert_eq!(store.get(), Some(vec![2, 3]));
}

#[test]
fn update_notifies_once_and_skips_absent_values() {
	let v = Validator::new();
	let store = ValueStore::new(vec![1]);
	let _sub = store.subscribe({
		let v = v.clone();
		move |items: Option<&Vec<i32>>| v.push(items.cloned())
	});
	v.expect([Some(vec![1])]);

	store.update(|items| items.extend([2, 3]));
	v.expect([Some(vec![1, 2, 3])]);

	store.clear_value();
	v.expect([None]);
	store.update(|items| items.push(4));
	v.expect([]);
}

#[test]
fn take_value_empties_the_store() {
	let v = Validator::new();
	let store = ValueStore::new(4);
	let _sub = store.subscribe(record(&v));
	v.expect([Some(4)]);

	assert_eq!(store.take_value(), Some(4));
	v.expect([None]);
	assert_eq!(store.get(), None);
}

#[test]
fn dispose_closes_and_is_idempotent() {
	let v = Validator::new();
	let store = ValueStore::with_options(Some(1), StoreOptions::new().label("counter"));
	let sub = store.subscribe_with(
		Listener::new({
			let v = v.clone();
			move |value: Option<&i32>| v.push(format!("{value:?}"))
		})
		.on_done({
			let v = v.clone();
			move || v.push("done".to_owned())
		}),
	);
	v.expect(["Some(1)".to_owned()]);

	store.dispose();
	v.expect(["done".to_owned()]);
	assert!(sub.is_canceled());
	assert!(store.is_disposed());

	store.dispose();
	store.set_value(2);
	store.notify();
	v.expect([]);
	assert_eq!(store.get(), Some(1));
	assert_eq!(
		store.try_set_value(2),
		Err(StoreError::Disposed {
			label: "counter".into()
		})
	);
	assert_eq!(
		store.try_set_value(2).unwrap_err().to_string(),
		"store `counter` has been disposed"
	);
}

#[test]
fn subscribing_to_a_disposed_store_only_sees_done() {
	let v = Validator::new();
	let store = ValueStore::new(1);
	store.dispose();

	let sub = store.subscribe_with(
		Listener::new({
			let v = v.clone();
			move |value: Option<&i32>| v.push(format!("{value:?}"))
		})
		.on_done({
			let v = v.clone();
			move || v.push("done".to_owned())
		}),
	);
	v.expect(["done".to_owned()]);
	assert!(sub.is_canceled());
}

#[test]
fn errors_reach_error_callbacks() {
	let v = Validator::new();
	let store = ValueStore::new(1);
	let _sub = store.subscribe_with(
		Listener::new(|_: Option<&i32>| ())
			.on_error({
				let v = v.clone();
				move |fault: &Fault| v.push(fault.to_string())
			}),
	);

	store.add_error(Rc::new(io::Error::new(io::ErrorKind::Other, "boom")));
	v.expect(["boom".to_owned()]);
}

#[test]
fn stream_to_with_converts_now_and_later() {
	let x = ValueStore::new(5);
	let y = ValueStore::empty();

	x.stream_to_with(&y, |x| x * 2);
	assert_eq!(y.get(), Some(10));

	x.set_value(7);
	assert_eq!(y.get(), Some(14));
}

#[test]
fn subscribe_to_waits_for_the_next_change() {
	let x = ValueStore::new(1);
	let y = ValueStore::new(0);

	y.subscribe_to(&x);
	assert_eq!(y.get(), Some(0));

	x.set_value(2);
	assert_eq!(y.get(), Some(2));

	let labels = ValueStore::empty();
	labels.subscribe_to_with(&x, |x: &i32| format!("#{x}"));
	x.set_value(3);
	assert_eq!(labels.get().as_deref(), Some("#3"));
}

#[test]
fn dropping_the_target_detaches_it_from_upstream() {
	let x = ValueStore::new(1);
	let y = ValueStore::empty();
	y.subscribe_to(&x);
	assert_eq!(x.subscriber_count(), 1);

	drop(y);
	assert_eq!(x.subscriber_count(), 0);
	x.set_value(2);
}

#[test]
fn disposing_the_target_detaches_it_from_upstream() {
	let x = ValueStore::new(1);
	let y = ValueStore::empty();
	let sub = x.stream_to(&y);
	assert_eq!(y.get(), Some(1));

	y.dispose();
	assert!(sub.is_canceled());
	assert_eq!(x.subscriber_count(), 0);
}

#[test]
fn disposing_the_source_leaves_the_target_usable() {
	let x = ValueStore::new(1);
	let y = ValueStore::empty();
	x.stream_to(&y);

	x.dispose();
	assert!(!y.is_disposed());
	y.set_value(9);
	assert_eq!(y.get(), Some(9));
}

#[test]
fn copying_values() {
	let a = ValueStore::new(1);
	let b = ValueStore::new(2);

	a.copy_value_from(&b);
	assert_eq!(a.get(), Some(2));

	b.set_value(3);
	b.copy_value_to(&a);
	assert_eq!(a.get(), Some(3));

	let c = ValueStore::empty();
	wiring::copy_value(&c, &a);
	assert_eq!(a.get(), None);
}

#[test]
fn weak_references_do_not_keep_stores_alive() {
	let store = ValueStore::new(1);
	let weak = store.downgrade();
	assert_eq!(weak.upgrade().and_then(|store| store.get()), Some(1));

	drop(store);
	assert!(weak.upgrade().is_none());
}

#[test]
fn shadow_clone_feeds_callbacks() {
	let v = Validator::new();
	let source = ValueStore::new(1);
	let mirror = ValueStore::empty();

	let _sub = source.subscribe({
		shadow_clone!(mirror, v);
		move |value: Option<&i32>| {
			mirror.set(value.copied());
			v.push(mirror.get());
		}
	});
	v.expect([Some(1)]);

	source.set_value(2);
	v.expect([Some(2)]);
}

#[test]
fn changes_stream_ends_on_dispose() {
	let store = ValueStore::new(1);
	let changes = store.changes();

	store.set_value(2);
	store.clear_value();
	store.set_value(3);
	store.dispose();

	let collected: Vec<Option<i32>> = block_on(changes.collect());
	assert_eq!(collected, [Some(2), None, Some(3)]);
}

#[test]
fn subscribing_mid_pass_replays_once() {
	let v = Validator::new();
	let store = ValueStore::new(1);

	let _a = store.subscribe({
		let weak = store.downgrade();
		let v = v.clone();
		move |value: Option<&i32>| {
			let Some(store) = weak.upgrade() else {
				return;
			};
			if value == Some(&2) {
				store.set_value(3);
				let _b = store.subscribe(record(&v));
			}
		}
	});

	store.set_value(2);
	v.expect([Some(3)]);

	store.set_value(4);
	v.expect([Some(4)]);
}

#[test]
fn self_referencing_listeners_use_weak_references() {
	let store = ValueStore::new(1);
	let weak = store.downgrade();
	let _sub = store.subscribe({
		let weak = weak.clone();
		move |_: Option<&i32>| {
			let _ = weak.upgrade().map(|store| store.version());
		}
	});

	drop(store);
	assert!(weak.upgrade().is_none());
}
