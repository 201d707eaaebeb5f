use json_stream_stringify::*;
use std::str::from_utf8;

fn emit_thing_test(val: impl Into<Value>, expect: &str) {
    let mut buf = vec![];
    let mut e = Emitter::new(&mut buf);

    e.emit(val).unwrap();

    assert_eq!(from_utf8(&buf).unwrap(), expect);
}

#[test]
fn example() {
    let mut buf = vec![];
    {
        let mut e = Emitter::new(&mut buf);

        let arr = Array::new();
        arr.push("a");
        arr.push(Object::from_iter([("k", "v")]));
        arr.push(3);
        e.emit(arr).unwrap();
    }

    assert_eq!(from_utf8(&buf).unwrap(), r#"["a",{"k":"v"},3]"#);
}

#[test]
fn commas_in_object() {
    emit_thing_test(Object::from_iter([("a", 1), ("b", 2)]), r#"{"a":1,"b":2}"#);
}

#[test]
fn commas_near_arrays_in_object() {
    let o = Object::new();
    o.insert("a", Array::new());
    o.insert("b", vec![3, 4]);
    emit_thing_test(o, r#"{"a":[],"b":[3,4]}"#);
}

#[test]
fn basic_sequences() {
    emit_thing_test(vec![1u32, 2, 3], r#"[1,2,3]"#);
    emit_thing_test(Array::from_iter([1.5, 2.0, 3.25]), r#"[1.5,2,3.25]"#);
    emit_thing_test(vec![Some(1), None, Some(3)], r#"[1,null,3]"#);
    emit_thing_test(Vec::<i32>::new(), r#"[]"#);
}

#[test]
fn emitting_string() {
    emit_thing_test(String::from("abcd"), r#""abcd""#);
}

#[test]
fn emitter_newline_between_items() {
    let mut buf = vec![];
    {
        let mut e = Emitter::new(&mut buf);

        e.emit(3).unwrap();
        e.emit("abc").unwrap();
        e.emit(vec![1]).unwrap();
        e.emit(Object::from_iter([("x", 5)])).unwrap();
    }

    assert_eq!(
        from_utf8(&buf).unwrap(),
        r#"3
"abc"
[1]
{"x":5}"#
    );
}

#[test]
fn empty_document_writes_nothing() {
    let mut buf = vec![];
    {
        let mut e = Emitter::new(&mut buf);

        e.emit(1).unwrap();
        e.emit(Value::Undefined).unwrap();
        e.emit(2).unwrap();
    }

    assert_eq!(from_utf8(&buf).unwrap(), "1\n2");
}

#[test]
fn emit_stream_uses_its_options() {
    let mut e = Emitter::new(vec![]);
    let stream = JsonStream::builder(vec![1, 2]).indent(1).build();
    e.emit_stream(stream).unwrap();

    assert_eq!(from_utf8(e.get_ref()).unwrap(), "[\n 1,\n 2\n]");
}

#[test]
fn error_keeps_written_prefix() {
    let arr = Array::new();
    arr.push("x".repeat(20));
    arr.push(arr.clone());

    let mut e = Emitter::new(vec![]);
    let stream = JsonStream::builder(arr).chunk_size(8).build();
    let err = e.emit_stream(stream).unwrap_err();

    assert!(matches!(err, EmitError::Json(Error::CircularStructure { .. })));
    let written = e.into_inner();
    assert!(from_utf8(&written).unwrap().starts_with(r#"["xxxxxxx"#));
}

#[test]
fn io_errors_surface() {
    struct Broken;

    impl std::io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut e = Emitter::new(Broken);
    assert!(matches!(e.emit("abc"), Err(EmitError::Io(_))));
}

#[test]
fn emit_async_writes_everything() {
    let mut out = futures::io::Cursor::new(vec![]);
    let stream = JsonStream::builder(vec!["a", "b"]).chunk_size(1).build();

    futures::executor::block_on(emit_async(stream, &mut out)).unwrap();

    assert_eq!(from_utf8(out.get_ref()).unwrap(), r#"["a","b"]"#);
}
