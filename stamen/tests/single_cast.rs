use stamen::{Observable, SingleCast};

mod _validator;
use _validator::Validator;

#[test]
fn replays_present_value() {
	let v = Validator::new();
	let single = SingleCast::with_value(1);

	let _handle = single.subscribe({
		let v = v.clone();
		move |value| v.push(*value)
	});
	v.expect([1]);

	single.set_value(2);
	v.expect([2]);
}

#[test]
fn no_replay_without_value() {
	let v = Validator::new();
	let single = SingleCast::new();

	let _handle = single.subscribe({
		let v = v.clone();
		move |value: &i32| v.push(*value)
	});
	v.expect([]);

	single.notify();
	v.expect([]);

	single.set_value(3);
	v.expect([3]);
}

#[test]
fn subscribe_replaces_previous() {
	let v = Validator::new();
	let single = SingleCast::new();

	let first = single.subscribe({
		let v = v.clone();
		move |value: &i32| v.push(("first", *value))
	});
	let second = single.subscribe({
		let v = v.clone();
		move |value: &i32| v.push(("second", *value))
	});
	assert!(first.is_canceled());
	assert!(second.is_active());

	single.set_value(1);
	v.expect([("second", 1)]);
}

#[test]
fn once_with_value_is_canceled_before_returning() {
	let v = Validator::new();
	let single = SingleCast::with_value("a");

	let handle = single.once({
		let v = v.clone();
		move |value| v.push(*value)
	});
	v.expect(["a"]);
	assert!(handle.is_canceled());
	assert!(!single.has_subscriber());

	single.set_value("b");
	v.expect([]);
}

#[test]
fn once_without_value_fires_once() {
	let v = Validator::new();
	let single = SingleCast::new();

	let handle = single.once({
		let v = v.clone();
		move |value: &u8| v.push(*value)
	});
	assert!(handle.is_active());

	single.set_value(1);
	single.set_value(2);
	v.expect([1]);
	assert!(handle.is_canceled());
}

#[test]
fn paused_is_skipped() {
	let v = Validator::new();
	let single = SingleCast::new();

	let handle = single.subscribe({
		let v = v.clone();
		move |value: &u8| v.push(*value)
	});
	handle.pause();
	single.set_value(1);
	v.expect([]);
	assert!(single.has_subscriber());

	handle.resume();
	single.notify();
	v.expect([1]);
}

#[test]
fn cancel_without_handle_clears_slot() {
	let v = Validator::new();
	let single = SingleCast::new();

	let handle = single.subscribe({
		let v = v.clone();
		move |value: &u8| v.push(*value)
	});
	single.cancel(None);
	assert!(handle.is_canceled());
	assert!(!single.has_subscriber());

	single.set_value(1);
	v.expect([]);
}

#[test]
fn cancel_from_within_callback() {
	let v = Validator::new();
	let single = SingleCast::new();

	let handle = single.subscribe({
		let v = v.clone();
		let single = single.clone();
		move |value: &u8| {
			v.push(*value);
			single.cancel(None);
		}
	});
	single.set_value(1);
	single.set_value(2);
	v.expect([1]);
	assert!(handle.is_canceled());
}

#[test]
fn through_the_trait() {
	fn drive(observable: &impl Observable<u8>) {
		observable.set_value(5);
		observable.notify();
		observable.dispose();
		observable.set_value(6);
	}

	let v = Validator::new();
	let single = SingleCast::new();
	let _handle = single.subscribe({
		let v = v.clone();
		move |value: &u8| v.push(*value)
	});
	drive(&single);
	v.expect([5, 5]);
	assert_eq!(Observable::value(&single), Some(6));
}
