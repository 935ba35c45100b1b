//! Integration Tests for the Binding Engine
//!
//! These tests drive a host through realistic view-model changes and check
//! exactly which subscribers hear about them, and how often.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use propbind_core::{
    BindOptions, BindingError, BindingHost, CallbackFailure, DynamicObject, FailureReason,
    ObjectRef, PropertyAccess, PropertyNotifier, RegistrationHandle, Value,
};

/// Counts invocations and remembers every delivered value.
#[derive(Clone, Default)]
struct Recorder {
    values: Rc<RefCell<Vec<Value>>>,
}

impl Recorder {
    fn callback(&self) -> impl Fn(Value) + 'static {
        let values = self.values.clone();
        move |v| values.borrow_mut().push(v)
    }

    fn count(&self) -> usize {
        self.values.borrow().len()
    }

    fn last(&self) -> Option<Value> {
        self.values.borrow().last().cloned()
    }

    fn values(&self) -> Vec<Value> {
        self.values.borrow().clone()
    }
}

fn teacher(name: &str) -> Rc<DynamicObject> {
    DynamicObject::builder("Teacher").field("Name", name).build()
}

fn class(name: &str, teacher_name: Option<&str>) -> Rc<DynamicObject> {
    DynamicObject::builder("Class")
        .field("Name", name)
        .field("Teacher", teacher_name.map(teacher))
        .build()
}

fn student(class_value: Option<Rc<DynamicObject>>) -> Rc<DynamicObject> {
    DynamicObject::builder("Student")
        .field("Name", "Ana")
        .field("Bookwork", 0)
        .field("Class", class_value)
        .build()
}

/// A shallow binding fires once on bind and once per change.
#[test]
fn shallow_binding_tracks_leaf_changes() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host.bind("Bookwork", rec.callback()).unwrap();
    assert_eq!(rec.count(), 1);

    root.set("Bookwork", 5).unwrap();
    assert_eq!(rec.count(), 2);
    assert_eq!(rec.last(), Some(Value::Int(5)));

    // Same value: no notification, no delivery.
    root.set("Bookwork", 5).unwrap();
    assert_eq!(rec.count(), 2);
}

/// Replacing an intermediate object rebinds the tail of the path.
#[test]
fn replacing_intermediate_rebinds_deep_path() {
    let first_class = class("Spanish", Some("Ms. Frizzle"));
    let root = student(Some(first_class.clone()));
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host.bind("Class.Teacher.Name", rec.callback()).unwrap();
    assert_eq!(rec.last(), Some(Value::from("Ms. Frizzle")));

    let second_class = class("French", Some("Mr. Keating"));
    root.set("Class", second_class.clone()).unwrap();
    assert_eq!(rec.count(), 2);
    assert_eq!(rec.last(), Some(Value::from("Mr. Keating")));

    // The detached objects no longer reach the subscriber.
    first_class.set("Teacher", teacher("Nobody")).unwrap();
    assert_eq!(first_class.listener_count(), 0);
    assert_eq!(rec.count(), 2);

    // The new ones do.
    second_class.set("Teacher", teacher("Mrs. Puff")).unwrap();
    assert_eq!(rec.count(), 3);
    assert_eq!(rec.last(), Some(Value::from("Mrs. Puff")));
}

/// An absent intermediate delivers absent, and recovers when filled in.
#[test]
fn absent_intermediate_delivers_none() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host.bind("Class.Name", rec.callback()).unwrap();

    root.set("Class", class("Spanish", None)).unwrap();
    root.set("Class", Value::None).unwrap();

    assert_eq!(
        rec.values(),
        vec![Value::None, Value::from("Spanish"), Value::None]
    );
}

/// Binding before any data context exists delivers exactly once when it arrives.
#[test]
fn bind_before_data_context() {
    let host = BindingHost::new();

    let shallow = Recorder::default();
    let deep = Recorder::default();
    let absent = Recorder::default();
    let _a = host.bind("Name", shallow.callback()).unwrap();
    let _b = host.bind("Class.Teacher.Name", deep.callback()).unwrap();
    let _c = host.bind("Class.Name", absent.callback()).unwrap();
    assert_eq!(shallow.count() + deep.count() + absent.count(), 0);

    host.set_data_context(student(None));
    assert_eq!(shallow.values(), vec![Value::from("Ana")]);
    assert_eq!(deep.values(), vec![Value::None]);
    assert_eq!(absent.values(), vec![Value::None]);
}

/// Replacing the root data context cascades through every node.
#[test]
fn root_replacement_cascades() {
    let host = BindingHost::new();
    host.set_data_context(student(Some(class("Spanish", Some("Ms. Frizzle")))));

    let name = Recorder::default();
    let deep = Recorder::default();
    let _a = host.bind("Class.Name", name.callback()).unwrap();
    let _b = host.bind("Class.Teacher.Name", deep.callback()).unwrap();

    host.set_data_context(student(Some(class("Art", Some("Bob Ross")))));
    assert_eq!(name.last(), Some(Value::from("Art")));
    assert_eq!(deep.last(), Some(Value::from("Bob Ross")));

    host.set_data_context(Value::None);
    assert_eq!(name.last(), Some(Value::None));
    assert_eq!(deep.last(), Some(Value::None));
    assert_eq!(name.count(), 3);
    assert_eq!(deep.count(), 3);
}

/// Writes through the engine skip plain subscribers on the written property.
#[test]
fn write_path_suppresses_echo() {
    let root = student(Some(class("Spanish", None)));
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let plain = Recorder::default();
    let forced = Recorder::default();
    let _a = host.bind("Class.Name", plain.callback()).unwrap();
    let _b = host
        .bind_with("Class.Name", BindOptions::new().always_trigger(), forced.callback())
        .unwrap();

    host.write_path("Class.Name", "French").unwrap();
    assert_eq!(plain.count(), 1);
    assert_eq!(forced.count(), 2);
    assert_eq!(forced.last(), Some(Value::from("French")));

    // The mark is consumed: the next external change reaches everyone.
    let Value::Object(class_obj) = root.get("Class").unwrap() else {
        panic!("class should be present");
    };
    class_obj.set_property("Name", Value::from("German")).unwrap();
    assert_eq!(plain.count(), 2);
    assert_eq!(forced.count(), 3);
}

/// Rejects every write but otherwise forwards to a dynamic object.
struct ReadOnly(Rc<DynamicObject>);

impl PropertyAccess for ReadOnly {
    fn type_name(&self) -> &str {
        "ReadOnly"
    }

    fn get_property(&self, name: &str) -> propbind_core::Result<Value> {
        self.0.get(name)
    }

    fn set_property(&self, name: &str, _value: Value) -> propbind_core::Result<()> {
        Err(BindingError::InvalidWriteTarget {
            path: name.to_string(),
            reason: "read-only",
        })
    }

    fn notifier(&self) -> Option<&dyn PropertyNotifier> {
        Some(&*self.0)
    }
}

/// A failed write does not leave the property muted.
#[test]
fn failed_write_clears_suppression() {
    let inner = student(None);
    let host = BindingHost::new();
    let root: ObjectRef = Rc::new(ReadOnly(inner.clone()));
    host.set_data_context(root);

    let rec = Recorder::default();
    let _h = host.bind("Name", rec.callback()).unwrap();

    assert!(host.write_path("Name", "Bea").is_err());

    inner.set("Name", "Bea").unwrap();
    assert_eq!(rec.count(), 2);
    assert_eq!(rec.last(), Some(Value::from("Bea")));
    assert!(host.write_path("Nickname", "x").is_err());
}

/// A write that does not change the value produces no notification and no mark.
#[test]
fn unchanged_write_leaves_no_mark() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host.bind("Name", rec.callback()).unwrap();

    host.write_path("Name", "Ana").unwrap();
    root.set("Name", "Bea").unwrap();
    assert_eq!(rec.count(), 2);
}

/// Write targets must resolve to an object.
#[test]
fn write_path_errors() {
    let host = BindingHost::new();
    host.set_data_context(student(None));

    assert!(matches!(
        host.write_path("Class.Name", "x"),
        Err(BindingError::InvalidWriteTarget { .. })
    ));
    assert!(matches!(
        host.write_path("Name.Length", 3),
        Err(BindingError::InvalidWriteTarget { .. })
    ));
    assert!(matches!(
        host.write_path("Class..Name", 3),
        Err(BindingError::InvalidPath { .. })
    ));
}

/// unregister_all silences every subscriber and releases every object.
#[test]
fn unregister_all_silences_everything() {
    let class_obj = class("Spanish", Some("Ms. Frizzle"));
    let root = student(Some(class_obj.clone()));
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    host.bind("Class.Teacher.Name", rec.callback()).unwrap().detach();
    host.bind("Bookwork", rec.callback()).unwrap().detach();
    let before = rec.count();

    host.unregister_all();
    root.set("Bookwork", 9).unwrap();
    root.set("Class", Value::None).unwrap();
    class_obj.set("Name", "Art").unwrap();

    assert_eq!(rec.count(), before);
    assert_eq!(root.listener_count(), 0);
    assert_eq!(class_obj.listener_count(), 0);

    // The host is usable again afterwards.
    host.set_data_context(root.clone());
    let _h = host.bind("Bookwork", rec.callback()).unwrap();
    assert_eq!(rec.last(), Some(Value::Int(9)));
}

/// Cancelling one registration leaves its siblings on the same property alone.
#[test]
fn cancel_leaves_siblings() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let a = Recorder::default();
    let b = Recorder::default();
    let ha = host.bind("Bookwork", a.callback()).unwrap();
    let _hb = host.bind("Bookwork", b.callback()).unwrap();

    assert!(ha.cancel());
    assert!(!ha.cancel());
    root.set("Bookwork", 1).unwrap();

    assert_eq!(a.count(), 1);
    assert_eq!(b.count(), 2);
}

/// A panicking or failing subscriber is reported and does not stop its siblings.
#[test]
fn failures_are_contained() {
    let failures: Rc<RefCell<Vec<CallbackFailure>>> = Rc::default();
    let sink = failures.clone();
    let host = BindingHost::builder()
        .failure_sink(move |f: &CallbackFailure| sink.borrow_mut().push(f.clone()))
        .build();

    let root = student(None);
    host.set_data_context(root.clone());

    let _bad = host.bind("Bookwork", |_| panic!("subscriber exploded")).unwrap();
    let _typo = host.bind("Bookwrok", |_| {}).unwrap();
    let rec = Recorder::default();
    let _good = host.bind("Bookwork", rec.callback()).unwrap();

    root.set("Bookwork", 3).unwrap();

    assert_eq!(rec.count(), 2);
    assert_eq!(root.get("Bookwork").unwrap(), Value::Int(3));

    let failures = failures.borrow();
    assert!(failures.iter().any(|f| f.path == "Bookwork"
        && matches!(&f.reason, FailureReason::Panicked(msg) if msg.contains("exploded"))));
    assert!(failures.iter().any(|f| f.path == "Bookwrok"
        && matches!(&f.reason, FailureReason::Resolution(BindingError::PropertyNotFound { .. }))));
}

/// Callbacks may bind, cancel and write while a cascade is running.
#[test]
fn reentrant_callbacks() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let nested = Recorder::default();
    let handles = Rc::new(RefCell::new(Vec::new()));
    let weak = host.downgrade();
    let (n, hs) = (nested.clone(), handles.clone());
    let _outer = host
        .bind_with("Bookwork", BindOptions::new().skip_immediate_invoke(), move |_| {
            if let Some(host) = weak.upgrade() {
                let h = host.bind("Name", n.callback()).unwrap();
                hs.borrow_mut().push(h);
                host.write_path("Name", "Cy").unwrap();
            }
        })
        .unwrap();

    root.set("Bookwork", 1).unwrap();
    // Immediate delivery of the nested bind, then its own write is suppressed.
    assert_eq!(nested.values(), vec![Value::from("Ana")]);
    assert_eq!(root.get("Name").unwrap(), Value::from("Cy"));
    assert_eq!(handles.borrow().len(), 1);
}

/// A subscriber that cancels a later sibling mid-cascade prevents its delivery.
#[test]
fn cancel_mid_cascade_skips_sibling() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let victim_calls = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<RegistrationHandle>>> = Rc::default();

    let s = slot.clone();
    let _killer = host
        .bind("Bookwork", move |_| {
            if let Some(h) = s.borrow_mut().take() {
                h.cancel();
            }
        })
        .unwrap();
    let v = victim_calls.clone();
    let victim = host.bind("Bookwork", move |_| v.set(v.get() + 1)).unwrap();
    assert_eq!(victim_calls.get(), 1);
    *slot.borrow_mut() = Some(victim);

    root.set("Bookwork", 2).unwrap();
    assert_eq!(victim_calls.get(), 1);
}

/// Typed bindings convert each value, treating absent as the default.
#[test]
fn typed_binding() {
    let root = student(Some(class("Spanish", None)));
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let names: Rc<RefCell<Vec<String>>> = Rc::default();
    let n = names.clone();
    let _h = host
        .bind_as::<String, _>("Class.Name", BindOptions::default(), move |s| n.borrow_mut().push(s))
        .unwrap();

    root.set("Class", Value::None).unwrap();
    assert_eq!(*names.borrow(), vec!["Spanish".to_string(), String::new()]);
    assert_eq!(host.read_as::<i64>("Bookwork").unwrap(), 0);
}

/// Subscriptions never keep the host alive.
#[test]
fn dropping_host_detaches_objects() {
    let class_obj = class("Spanish", Some("Ms. Frizzle"));
    let root = student(Some(class_obj.clone()));
    let rec = Recorder::default();
    {
        let host = BindingHost::new();
        host.set_data_context(root.clone());
        host.bind("Class.Teacher.Name", rec.callback()).unwrap().detach();
        assert_eq!(root.listener_count(), 1);
        assert_eq!(class_obj.listener_count(), 1);
    }

    assert_eq!(root.listener_count(), 0);
    assert_eq!(class_obj.listener_count(), 0);
    root.set("Class", Value::None).unwrap();
    assert_eq!(rec.count(), 1);
}

/// View-models can be loaded from JSON.
#[test]
fn json_view_model() {
    let root = Value::parse_json(
        "Student",
        r#"{"Name": "Ana", "Class": {"Name": "Spanish", "Teacher": null}}"#,
    )
    .unwrap();
    let host = BindingHost::new();
    host.set_data_context(root);

    assert_eq!(host.read_path("Class.Name").unwrap(), Value::from("Spanish"));
    assert_eq!(host.read_path("Class.Teacher.Name").unwrap(), Value::None);

    let rec = Recorder::default();
    let _h = host.bind("Class.Name", rec.callback()).unwrap();
    host.write_path("Class.Name", "French").unwrap();
    assert_eq!(rec.count(), 1);
    assert_eq!(host.read_path("Class.Name").unwrap(), Value::from("French"));
}

/// A teacher moved back onto the new class is picked up; released objects stay silent.
#[test]
fn teacher_swap_scenario() {
    let t1 = teacher("T1");
    let t2 = teacher("T2");
    let c1 = DynamicObject::builder("Class").field("Teacher", t1.clone()).build();
    let c2 = DynamicObject::builder("Class").field("Teacher", t2.clone()).build();
    let root = DynamicObject::builder("Root")
        .field("Name", "Bookwork")
        .field("Percent", 0.3)
        .field("Class", c1.clone())
        .build();

    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host.bind("Class.Teacher.Name", rec.callback()).unwrap();
    root.set("Class", c2.clone()).unwrap();
    c2.set("Teacher", t1.clone()).unwrap();
    assert_eq!(
        rec.values(),
        vec![Value::from("T1"), Value::from("T2"), Value::from("T1")]
    );

    c1.set("Teacher", Value::None).unwrap();
    t2.set("Name", "T2b").unwrap();
    assert_eq!(rec.count(), 3);
    assert_eq!(t2.listener_count(), 0);

    t1.set("Name", "T1b").unwrap();
    assert_eq!(rec.last(), Some(Value::from("T1b")));
    assert_eq!(host.read_as::<f64>("Percent").unwrap(), 0.3);
}

/// Skipping the immediate call also skips the absent-intermediate delivery.
#[test]
fn skip_immediate_invoke_with_absent_intermediate() {
    let root = student(None);
    let host = BindingHost::new();
    host.set_data_context(root.clone());

    let rec = Recorder::default();
    let _h = host
        .bind_with("Class.Teacher.Name", BindOptions::new().skip_immediate_invoke(), rec.callback())
        .unwrap();
    assert!(rec.values().is_empty());

    root.set("Class", class("Spanish", Some("Ms. Frizzle"))).unwrap();
    assert_eq!(rec.values(), vec![Value::from("Ms. Frizzle")]);
}

/// A panicking subscriber deep in the tree does not stop nested deliveries.
#[test]
fn nested_failure_does_not_stop_cascade() {
    let failures = Rc::new(Cell::new(0));
    let sink = failures.clone();
    let host = BindingHost::builder()
        .failure_sink(move |_: &CallbackFailure| sink.set(sink.get() + 1))
        .build();
    host.set_data_context(student(Some(class("Spanish", Some("Ms. Frizzle")))));

    let name = Recorder::default();
    let deep = Recorder::default();
    let _a = host.bind("Class.Name", name.callback()).unwrap();
    let _bad = host.bind("Class.Teacher.Name", |_| panic!("teacher view crashed")).unwrap();
    let _b = host.bind("Class.Teacher.Name", deep.callback()).unwrap();
    assert_eq!(failures.get(), 1);

    host.set_data_context(student(Some(class("Art", Some("Bob Ross")))));

    assert_eq!(failures.get(), 2);
    assert_eq!(name.values(), vec![Value::from("Spanish"), Value::from("Art")]);
    assert_eq!(
        deep.values(),
        vec![Value::from("Ms. Frizzle"), Value::from("Bob Ross")]
    );
}
