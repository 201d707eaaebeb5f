use std::io;

use futures::stream;
use json_stream_stringify::*;

fn references(value: impl Into<Value>) -> String {
    let options = Options {
        cycle: CycleMode::Reference,
        ..Options::default()
    };
    to_string_with(value, options).unwrap()
}

fn self_referencing() -> Object {
    let o = Object::new();
    o.insert("a", o.clone());
    o
}

#[test]
fn self_reference() {
    assert_eq!(references(self_referencing()), r#"{"a":{"$ref":"$"}}"#);
}

#[test]
fn distinct_empty_arrays() {
    let o = Object::from_iter([("a", Array::new()), ("b", Array::new())]);
    assert_eq!(references(o), r#"{"a":[],"b":[]}"#);
}

#[test]
fn shared_array() {
    let shared = Array::new();
    let o = Object::from_iter([("a", shared.clone()), ("b", shared)]);
    assert_eq!(references(o), r#"{"a":[],"b":{"$ref":"$[\"a\"]"}}"#);
}

#[test]
fn references_through_arrays_holes_and_sources() {
    let root = Object::new();
    let inner = Object::from_iter([("a", root.clone())]);
    let b = Array::new();
    b.push(root.clone());
    b.push(inner.clone());
    b.set(3, Value::items(stream::iter(vec![Ok::<_, io::Error>(inner)])));
    root.insert("a", root.clone());
    root.insert("b", b);

    assert_eq!(
        references(root),
        r#"{"a":{"$ref":"$"},"b":[{"$ref":"$"},{"a":{"$ref":"$"}},null,[{"$ref":"$[\"b\"][1]"}]]}"#
    );
}

#[test]
fn references_into_async_values() {
    let deep = Object::from_iter([("a", "deep")]);
    let o = Object::new();
    o.insert("a", AsyncValue::resolved(Object::from_iter([("b", deep.clone())])));
    o.insert("b", deep);

    assert_eq!(
        references(o),
        r#"{"a":{"b":{"a":"deep"}},"b":{"$ref":"$[\"a\"][\"b\"]"}}"#
    );
}

#[test]
fn repeated_source_is_referenced() {
    let source = Value::items(stream::iter(vec![Ok::<_, io::Error>(1)]));
    let o = Object::from_iter([("x", source.clone()), ("y", source)]);
    assert_eq!(references(o), r#"{"x":[1],"y":{"$ref":"$[\"x\"]"}}"#);
}

#[test]
fn reference_paths_escape_keys() {
    let shared = Object::new();
    let o = Object::from_iter([("we\"ird", shared.clone()), ("other", shared)]);
    assert_eq!(references(o), r#"{"we\"ird":{},"other":{"$ref":"$[\"we\\\"ird\"]"}}"#);
}

#[test]
fn indented_references() {
    let shared = Array::from_iter([1]);
    let o = Object::from_iter([("a", shared.clone()), ("b", shared)]);
    let options = Options {
        cycle: CycleMode::Reference,
        indent: Indent::Spaces(2),
        ..Options::default()
    };
    assert_eq!(
        to_string_with(o, options).unwrap(),
        "{\n  \"a\": [\n    1\n  ],\n  \"b\": {\"$ref\":\"$[\\\"a\\\"]\"}\n}"
    );
}

#[test]
fn circular_object_is_an_error() {
    let err = to_string(self_referencing()).unwrap_err();
    match &err {
        Error::CircularStructure { kind, path, .. } => {
            assert_eq!(*kind, ValueKind::Object);
            assert_eq!(path.to_string(), r#"$["a"]"#);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().starts_with("converting circular structure to JSON"));
}

#[test]
fn circular_through_async_values() {
    let o = Object::new();
    o.insert("a", AsyncValue::resolved(o.clone()));
    let err = to_string(AsyncValue::resolved(o)).unwrap_err();
    assert!(matches!(err, Error::CircularStructure { .. }));
}

#[test]
fn circular_through_sources() {
    let o = Object::new();
    o.insert("a", Value::items(stream::iter(vec![Ok::<_, io::Error>(o.clone())])));
    let root = Value::items(stream::iter(vec![Ok::<_, io::Error>(o)]));
    let err = to_string(root).unwrap_err();
    assert!(matches!(err, Error::CircularStructure { .. }));
    assert_eq!(err.path().to_string(), r#"$[0]["a"][0]"#);

    let keys = err.path().keys();
    assert_eq!(keys.len(), 3);
    assert_eq!(keys[0].as_index(), Some(0));
    assert_eq!(keys[1].as_name(), Some("a"));
    assert_eq!(keys[1].as_index(), None);
}

#[test]
fn shared_but_acyclic_is_written_twice() {
    let a = Object::from_iter([("foo", "bar")]);
    let arr = Array::from_iter([a.clone(), a]);
    assert_eq!(to_string(arr).unwrap(), r#"[{"foo":"bar"},{"foo":"bar"}]"#);
}

#[test]
fn circular_array() {
    let arr = Array::new();
    arr.push(1);
    arr.push(arr.clone());
    let err = to_string(arr).unwrap_err();
    assert_eq!(err.kind(), ValueKind::Array);
    assert_eq!(err.path().to_string(), "$[1]");

    let mut expected = Path::new();
    expected.push(Key::from(1));
    assert_eq!(err.path(), &expected);
}

#[test]
fn clones_share_identity() {
    let arr = Array::from_iter([1]);
    assert!(arr.ptr_eq(&arr.clone()));
    assert!(!arr.ptr_eq(&Array::from_iter([1])));

    let o = Object::from_iter([("a", 1)]);
    assert!(o.ptr_eq(&o.clone()));
    assert!(!o.ptr_eq(&Object::from_iter([("a", 1)])));

    let source = Value::items(stream::iter(Vec::<Result<Value, io::Error>>::new()));
    match source {
        Value::Source(source) => {
            assert!(source.ptr_eq(&source.clone()));
            let other = Source::channel(SourceMode::Items, 1).1;
            assert!(!source.ptr_eq(&other));
        }
        other => panic!("unexpected value {:?}", other),
    }
}
