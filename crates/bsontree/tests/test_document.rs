//! End-to-end tests of the cursor, the object store and the codec together.

use std::cell::Cell;
use std::rc::Rc;

use bsontree::{Document, Error, decode, encode};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn round_trip(doc: &Document) -> Document {
    let bytes = encode(doc).expect("encode failed");
    decode(&bytes).expect("decode failed")
}

#[test]
fn test_scenario_nested_child_round_trip() {
    init_tracing();
    let mut doc = Document::new();
    doc.add_child("config");
    assert!(doc.set_to("config"));
    doc.set_value("volume", 0.8);
    doc.set_to_parent();

    let mut back = round_trip(&doc);
    assert!(back.set_to("config"));
    assert_eq!(back.get_double_value("volume"), 0.8);
}

#[test]
fn test_scenario_array_of_objects_round_trip() {
    let mut doc = Document::new();
    doc.add_array("items");
    assert!(doc.set_to("items"));
    assert_eq!(doc.push_object(), Some(0));
    assert_eq!(doc.push_object(), Some(1));
    assert!(doc.set_to_index(0));
    doc.set_value("id", 1);
    doc.set_to_parent();
    assert!(doc.set_to_index(1));
    doc.set_value("id", 2);
    doc.set_to_parent();
    assert_eq!(doc.get_size(), 2);

    let mut back = round_trip(&doc);
    assert!(back.set_to("items"));
    assert_eq!(back.get_size(), 2);
    for (index, id) in [(0, 1), (1, 2)] {
        assert!(back.set_to_index(index));
        assert_eq!(back.get_int_value("id"), id);
        back.set_to_parent();
    }
}

#[test]
fn test_scenario_shared_reference_round_trip() {
    let mut doc = Document::new();
    assert!(!doc.set_reference_object("owner", "guid-1", Some("Widget")));
    assert!(doc.set_reference_object("other", "guid-1", Some("Widget")));
    assert!(doc.set_to("owner"));
    doc.set_value("name", "knob");
    doc.set_to_parent();

    let mut back = round_trip(&doc);
    assert_eq!(back.object_count(), 1);
    assert_eq!(back.object_type("guid-1"), Some("Widget"));
    assert_eq!(back.get_identifier("owner"), "guid-1");
    assert_eq!(back.get_identifier("other"), "guid-1");

    assert!(back.set_to("owner"));
    let through_owner = back.current();
    assert_eq!(back.get_value("name"), "knob");
    back.set_to_parent();
    assert!(back.set_to("other"));
    assert_eq!(back.get_value("name"), "knob");
    assert_eq!(back.resolve(back.current()), back.resolve(through_owner));
}

#[test]
fn test_scalars_round_trip_exactly() {
    let mut doc = Document::new();
    doc.set_value("t", true);
    doc.set_value("f", false);
    doc.set_value("i32_min", i32::MIN);
    doc.set_value("i32_max", i32::MAX);
    doc.set_value("i64_min", i64::MIN);
    doc.set_value("i64_max", i64::MAX);
    doc.set_value("tiny", f64::MIN_POSITIVE);
    doc.set_value("neg_zero", -0.0f64);
    doc.set_value("single", 0.1f32);
    doc.set_value("empty", "");
    doc.set_value("text", "grüße, 世界");
    doc.set_value("no_bytes", Vec::<u8>::new());
    doc.set_value("bytes", (0..=255u8).collect::<Vec<_>>());
    doc.set_null("nothing");

    let back = round_trip(&doc);
    assert!(back.get_bool_value("t"));
    assert!(!back.get_bool_value("f"));
    assert!(back.field("f").unwrap().is_bool());
    assert_eq!(back.get_int_value("i32_min"), i32::MIN);
    assert_eq!(back.get_int_value("i32_max"), i32::MAX);
    assert_eq!(back.get_int64_value("i64_min"), i64::MIN);
    assert_eq!(back.get_int64_value("i64_max"), i64::MAX);
    assert_eq!(back.get_double_value("tiny").to_bits(), f64::MIN_POSITIVE.to_bits());
    assert_eq!(back.get_double_value("neg_zero").to_bits(), (-0.0f64).to_bits());
    assert_eq!(back.get_float_value("single"), 0.1f32);
    assert_eq!(back.get_value("empty"), "");
    assert!(back.field("empty").unwrap().is_string());
    assert_eq!(back.get_value("text"), "grüße, 世界");
    assert!(back.field("no_bytes").unwrap().is_buffer());
    assert!(back.get_buffer("no_bytes").is_empty());
    assert_eq!(back.get_buffer("bytes").len(), 256);
    assert_eq!(back.get_buffer("bytes")[255], 255);
    assert!(back.field("nothing").unwrap().is_null());
}

#[test]
fn test_set_to_then_parent_returns_to_start() {
    let mut doc = Document::new();
    doc.add_child("a");
    doc.set_to("a");
    doc.add_array("list");
    doc.set_to("list");
    doc.push_object();
    doc.push_array();
    doc.set_to_root();
    doc.set_reference_object("shared", "g", None);
    doc.set_to("shared");
    doc.add_child("inside");
    doc.set_to_root();

    let mut back = round_trip(&doc);
    for d in [&mut doc, &mut back] {
        d.set_to_root();
        let start = d.current();
        for name in ["a", "shared"] {
            assert!(d.set_to(name));
            d.set_to_parent();
            assert_eq!(d.current(), start);
        }

        assert!(d.set_to("a"));
        let a = d.current();
        assert!(d.set_to("list"));
        let list = d.current();
        for index in 0..2 {
            assert!(d.set_to_index(index));
            d.set_to_parent();
            assert_eq!(d.current(), list);
        }
        d.set_to_parent();
        assert_eq!(d.current(), a);

        d.set_to_root();
        assert!(d.set_to("shared"));
        let shared = d.current();
        assert!(d.set_to("inside"));
        d.set_to_parent();
        assert_eq!(d.current(), shared);
    }
}

#[test]
fn test_mutation_visible_through_every_reference() {
    let mut doc = Document::new();
    doc.set_reference_object("left", "g", None);
    doc.add_array("more");
    doc.set_to("more");
    doc.push_reference_object("g", None);
    doc.set_to_root();
    doc.set_reference_object("right", "g", None);

    doc.set_to("left");
    doc.set_value("x", 1);
    doc.set_to_root();
    doc.set_to("right");
    assert_eq!(doc.get_int_value("x"), 1);
    doc.set_to_root();

    let mut back = round_trip(&doc);
    assert_eq!(back.object_count(), 1);
    back.set_to("right");
    back.set_value("x", 2);
    back.set_to_root();
    back.set_to("left");
    assert_eq!(back.get_int_value("x"), 2);
    back.set_to_root();
    back.set_to("more");
    back.set_to_index(0);
    assert_eq!(back.get_int_value("x"), 2);
}

#[test]
fn test_factory_called_once_per_identifier() {
    #[derive(Debug)]
    struct Widget {
        name: String,
    }

    let mut doc = Document::new();
    doc.set_reference_object("a", "w1", Some("Widget"));
    doc.set_to("a");
    doc.set_value("name", "first");
    doc.set_to_root();
    doc.set_reference_object("b", "w1", Some("Widget"));
    let mut back = round_trip(&doc);

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    back.register_constructor("Widget", move |doc: &mut Document| {
        counter.set(counter.get() + 1);
        Widget {
            name: doc.get_value("name").to_owned(),
        }
    });

    let one = back.get_constructed_object::<Widget>("w1").unwrap();
    let two = back.get_constructed_object::<Widget>("w1").unwrap();
    assert_eq!(one.name, "first");
    assert!(Rc::ptr_eq(&one, &two));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_factory_absent_without_registration() {
    let calls = Rc::new(Cell::new(0));
    let mut doc = Document::new();
    doc.set_reference_object("a", "w1", Some("Widget"));
    let counter = Rc::clone(&calls);
    doc.register_constructor("Gadget", move |_: &mut Document| {
        counter.set(counter.get() + 1);
    });

    assert!(doc.get_constructed_object::<()>("w1").is_none());
    assert!(doc.get_constructed_object::<()>("w1").is_none());
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_index_past_end_fails() {
    let mut doc = Document::new();
    doc.add_array("xs");
    doc.set_to("xs");
    doc.push_object();
    doc.push_value(3);
    let here = doc.current();

    for index in [2, 3, usize::MAX] {
        assert!(!doc.set_to_index(index));
        assert!(!doc.exists_at(index));
        assert_eq!(doc.current(), here);
    }
    // a scalar element is not navigable
    assert!(!doc.set_to_index(1));
    assert!(doc.exists_at(1));
    assert_eq!(
        doc.try_element(2).unwrap_err(),
        Error::IndexOutOfBounds {
            index: 2,
            length: 2
        }
    );
}

#[test]
fn test_lenient_and_strict_reads_disagree_on_mismatch() {
    let mut doc = Document::new();
    doc.set_value("s", "text");
    assert!(doc.get_double_value("s").is_nan());
    assert_eq!(doc.get_int_value("s"), i32::MIN);
    assert_eq!(doc.get_int64_value("missing"), i64::MIN);
    assert!(!doc.get_bool_value("s"));
    assert_eq!(
        doc.try_field("s").unwrap().try_f64().unwrap_err(),
        Error::UnexpectedType {
            expected: "number",
            found: "string"
        }
    );
}

#[test]
fn test_malformed_input_yields_no_document() {
    let mut doc = Document::new();
    doc.set_value("a", 1);
    let mut bytes = encode(&doc).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = 0x01;
    assert!(decode(&bytes).is_err());
}
