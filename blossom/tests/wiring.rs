use std::rc::Rc;

use blossom::{
	prelude::*, wiring::feed, CollectionStore, Listener, Subscription, ValueStore,
};
use stamen::Channel;

use _validator::Validator;

fn bump(store: &impl Store<i32>) {
	store.set(store.get().map(|n| n + 1));
}

#[test]
fn stores_are_interchangeable_through_the_trait() {
	let value = ValueStore::new(1);
	bump(&value);
	assert_eq!(value.get(), Some(2));

	let v = Validator::new();
	let _sub = Store::subscribe(&value, {
		let v = v.clone();
		move |n: Option<&i32>| v.push(n.copied())
	});
	v.expect([Some(2)]);
	Store::notify(&value);
	v.expect([Some(2)]);
}

#[test]
fn channels_feed_stores() {
	let channel = Channel::new();
	let target = ValueStore::new(String::new());

	let sub: Subscription<u32> = feed(&channel, &target, |n: Option<&u32>| n.map(u32::to_string));
	channel.publish(Some(12));
	assert_eq!(target.get().as_deref(), Some("12"));

	channel.publish(None);
	assert_eq!(target.get(), None);

	target.dispose();
	assert!(sub.is_canceled());
	assert!(channel.is_empty());
}

#[test]
fn feeding_a_collection_store() {
	let channel = Channel::new();
	let names = CollectionStore::new();
	feed(&channel, &names, |name: Option<&&'static str>| name.map(|name| vec![name.to_string()]));

	channel.publish(Some("a"));
	assert_eq!(names.items(), ["a".to_owned()]);

	channel.publish(None);
	assert!(names.is_empty());
}

#[test]
fn weak_stores_upgrade_while_alive() {
	let names = CollectionStore::from_items(["a"]);
	let weak = Store::downgrade(&names);
	assert_eq!(weak.upgrade().map(|names| names.len()), Some(1));

	drop(names);
	assert!(weak.upgrade().is_none());
}

#[test]
fn dispose_through_smart_pointers() {
	let store = Rc::new(ValueStore::new(1));
	let boxed: Box<dyn Dispose> = Box::new(Rc::clone(&store));
	boxed.dispose();
	assert!(store.is_disposed());
}

#[test]
fn disposed_targets_cancel_late_subscriptions() {
	let target = ValueStore::new(0);
	target.dispose();

	let channel = Channel::new();
	let sub = feed(&channel, &target, |n: Option<&i32>| n.copied());
	assert!(sub.is_canceled());
	assert!(channel.is_empty());

	let late = channel.listen(Listener::new(|_: Option<&i32>| ()));
	assert!(!late.is_canceled());
}
