mod common;

use arbor::{define_component, Callback, Driver, Error, Node, Options, QueuePolicy, UpdateQueue, Value};
use common::{init_tracing, RecordingAdapter};
use std::{cell::RefCell, rc::Rc, thread};

fn counter_label(count: i64) -> Node {
    Node::primitive("label").prop("text", Value::Int(count)).build().unwrap()
}

fn driver(policy: QueuePolicy, callback: Callback) -> (Driver<RecordingAdapter>, arbor::UpdateSender) {
    let options = Options {
        queue_policy: policy,
        ..Options::default()
    };
    Driver::with_queue(RecordingAdapter::new(), callback, options, dummy_waker::dummy_waker())
}

fn shown(driver: &Driver<RecordingAdapter>) -> Option<Value> {
    let state = driver.state()?;
    driver.adapter().literal(*state.root_handle().ok()?, "text").cloned()
}

#[test]
fn unbounded_queue_applies_every_tree_in_order() {
    init_tracing();
    let (mut driver, tx) = driver(QueuePolicy::Unbounded, Rc::new(|_: &Value| {}));
    assert_eq!(driver.pump().unwrap(), 0);
    assert!(driver.state().is_none());

    for i in 0..3 {
        tx.send(counter_label(i)).unwrap();
    }
    assert_eq!(driver.pump().unwrap(), 3);
    assert_eq!(shown(&driver), Some(Value::Int(2)));
    // one create for the first render, one setter call per tree
    assert_eq!(driver.adapter().creates(), 1);
    assert_eq!(driver.adapter().count(common::Call::is_set), 3);
}

#[test]
fn latest_queue_applies_newest_tree() {
    init_tracing();
    let (mut driver, tx) = driver(QueuePolicy::Latest, Rc::new(|_: &Value| {}));
    for i in 0..5 {
        tx.send(counter_label(i)).unwrap();
    }
    assert_eq!(driver.pump().unwrap(), 1);
    assert_eq!(shown(&driver), Some(Value::Int(4)));
}

#[test]
fn trees_sent_from_worker_threads() {
    init_tracing();
    let (mut driver, tx) = driver(QueuePolicy::Unbounded, Rc::new(|_: &Value| {}));
    let worker = {
        let tx = tx.clone();
        thread::spawn(move || {
            for i in 0..10 {
                tx.send(counter_label(i)).unwrap();
            }
        })
    };
    worker.join().unwrap();
    assert_eq!(driver.pump().unwrap(), 10);
    assert_eq!(shown(&driver), Some(Value::Int(9)));
}

#[test]
fn failed_tree_stops_the_pump_but_keeps_later_trees() {
    init_tracing();
    let broken = define_component("Broken", |_: &()| anyhow::bail!("cannot render"));
    let (mut driver, tx) = driver(QueuePolicy::Unbounded, Rc::new(|_: &Value| {}));
    tx.send(counter_label(0)).unwrap();
    tx.send(broken.create(())).unwrap();
    tx.send(counter_label(2)).unwrap();

    assert!(matches!(driver.pump(), Err(Error::ComponentRender { .. })));
    assert_eq!(shown(&driver), Some(Value::Int(0)));
    assert_eq!(driver.pump().unwrap(), 1);
    assert_eq!(shown(&driver), Some(Value::Int(2)));
}

#[test]
fn events_feed_the_queue() {
    init_tracing();
    let sender = Rc::new(RefCell::new(None::<arbor::UpdateSender>));
    let callback: Callback = {
        let sender = sender.clone();
        Rc::new(move |payload: &Value| {
            let count = payload.get("count").and_then(Value::as_int).unwrap_or(0);
            if let Some(tx) = sender.borrow().as_ref() {
                tx.send(counter_button(count + 1)).unwrap();
            }
        })
    };
    fn counter_button(count: i64) -> Node {
        Node::primitive("button")
            .prop("text", Value::Int(count))
            .on("action", Value::map([("count", Value::Int(count))]))
            .build()
            .unwrap()
    }

    let (mut driver, tx) = driver(QueuePolicy::Latest, callback);
    *sender.borrow_mut() = Some(tx.clone());
    tx.send(counter_button(0)).unwrap();
    driver.pump().unwrap();

    let handle = *driver.state().unwrap().root_handle().unwrap();
    driver.adapter().fire(handle, "action");
    driver.pump().unwrap();
    driver.adapter().fire(handle, "action");
    driver.pump().unwrap();
    assert_eq!(shown(&driver), Some(Value::Int(2)));
    assert_eq!(driver.adapter().creates(), 1);
}

#[test]
fn queue_policy_is_read_from_options() {
    init_tracing();
    let options = Options::from_json(r#"{"queue_policy": "unbounded"}"#).unwrap();
    let (mut driver, tx) = Driver::with_queue(
        RecordingAdapter::new(),
        Rc::new(|_: &Value| {}),
        options,
        dummy_waker::dummy_waker(),
    );
    for i in 0..3 {
        tx.send(counter_label(i)).unwrap();
    }
    assert_eq!(driver.pump().unwrap(), 3);

    let default = Options::from_json("{}").unwrap();
    let (mut driver, tx) = Driver::with_queue(
        RecordingAdapter::new(),
        Rc::new(|_: &Value| {}),
        default,
        dummy_waker::dummy_waker(),
    );
    for i in 0..3 {
        tx.send(counter_label(i)).unwrap();
    }
    assert_eq!(driver.pump().unwrap(), 1);
    assert_eq!(shown(&driver), Some(Value::Int(2)));
}

#[test]
fn driver_over_an_existing_queue() {
    init_tracing();
    let (tx, rx) = UpdateQueue::new(QueuePolicy::Unbounded, dummy_waker::dummy_waker());
    let mut driver = Driver::new(RecordingAdapter::new(), rx, Rc::new(|_: &Value| {}), Options::default());
    tx.send(counter_label(0)).unwrap();
    tx.send(counter_label(1)).unwrap();
    assert_eq!(driver.pump().unwrap(), 2);
}

#[test]
fn sending_after_the_driver_is_gone() {
    init_tracing();
    let (driver, tx) = driver(QueuePolicy::Latest, Rc::new(|_: &Value| {}));
    tx.send(counter_label(0)).unwrap();
    drop(driver);
    assert!(matches!(tx.send(counter_label(1)), Err(Error::QueueClosed)));
}
