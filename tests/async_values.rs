use std::fmt;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use json_stream_stringify::*;

#[derive(Debug)]
struct Boom;

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

fn later(value: impl Into<Value>, millis: u64) -> AsyncValue {
    let value = value.into();
    AsyncValue::from_future(async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        value
    })
}

async fn collect(value: impl Into<Value>) -> Result<String, Error> {
    JsonStream::new(value).try_collect().await
}

#[tokio::test]
async fn resolved_root() {
    assert_eq!(collect(AsyncValue::resolved(1)).await.unwrap(), "1");
    assert_eq!(collect(later("late", 5)).await.unwrap(), r#""late""#);
}

#[tokio::test]
async fn nested_async_unwraps() {
    let inner = later(1, 5);
    let outer = AsyncValue::from_future(async move { Value::from(inner) });
    assert_eq!(collect(outer).await.unwrap(), "1");
}

#[tokio::test]
async fn async_members_keep_order() {
    let o = Object::new();
    o.insert("slow", later("s", 20));
    o.insert("fast", later("f", 1));
    o.insert("now", 3);
    assert_eq!(collect(o).await.unwrap(), r#"{"slow":"s","fast":"f","now":3}"#);
}

#[tokio::test]
async fn async_undefined_member_is_omitted() {
    let o = Object::new();
    o.insert("a", 1);
    o.insert("b", later(Value::Undefined, 2));
    assert_eq!(collect(o).await.unwrap(), r#"{"a":1}"#);

    let o = Object::new();
    o.insert("a", later(Value::Undefined, 2));
    o.insert("b", 2);
    assert_eq!(collect(o).await.unwrap(), r#"{"b":2}"#);
}

#[tokio::test]
async fn async_undefined_element_is_null() {
    let arr = Array::from_iter([Value::from(later(Value::Undefined, 1)), Value::from(2)]);
    assert_eq!(collect(arr).await.unwrap(), "[null,2]");
}

#[tokio::test]
async fn async_undefined_root_is_empty() {
    let chunks: Vec<_> = JsonStream::new(later(Value::Undefined, 1)).collect().await;
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn async_composites() {
    let o = Object::from_iter([("list", later(vec![1, 2], 3))]);
    let out = JsonStream::builder(o).indent(2).build().try_collect::<String>().await.unwrap();
    assert_eq!(out, "{\n  \"list\": [\n    1,\n    2\n  ]\n}");
}

#[tokio::test]
async fn shared_async_value_settles_once() {
    let shared = later("x", 2);
    let arr = Array::from_iter([shared.clone(), shared]);
    assert_eq!(collect(arr).await.unwrap(), r#"["x","x"]"#);
}

#[tokio::test]
async fn rejection_is_fatal() {
    let o = Object::new();
    o.insert("ok", 1);
    o.insert("bad", AsyncValue::rejected(Boom));

    let mut stream = JsonStream::new(o);
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Rejected { .. }));
    assert_eq!(err.path().to_string(), r#"$["bad"]"#);
    assert_eq!(err.kind(), ValueKind::Async);
    assert!(err.to_string().contains("boom"));
    assert!(stream.next().await.is_none());
    assert!(futures::stream::FusedStream::is_terminated(&stream));
}

#[tokio::test]
async fn failing_future() {
    let value = AsyncValue::new(async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Err::<Value, _>(Boom)
    });
    let err = collect(vec![Value::from(value)]).await.unwrap_err();
    assert_eq!(err.path().to_string(), "$[0]");
}

#[tokio::test]
async fn rejection_with_message() {
    let value = AsyncValue::rejected(Rejection::message("no such row"));
    let o = Object::from_iter([("row", value)]);

    match collect(o).await.unwrap_err() {
        Error::Rejected { path, reason } => {
            assert_eq!(path.to_string(), r#"$["row"]"#);
            assert_eq!(reason.to_string(), "no such row");
            assert_eq!(reason.reason().to_string(), "no such row");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn resolved_from_plain_future() {
    let value = AsyncValue::from_future(async { Value::Null });
    assert_eq!(collect(value).await.unwrap(), "null");
}

#[tokio::test]
async fn hook_may_return_async_value() {
    let hooked = Value::custom(|_: &Key| Value::from(later(5, 1)));
    assert_eq!(collect(vec![hooked]).await.unwrap(), "[5]");
}

#[tokio::test]
async fn output_flushes_before_waiting() {
    let arr = Array::new();
    arr.push("first");
    arr.push(later("second", 20));

    let mut stream = JsonStream::new(arr);
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, r#"["first","#);
    let rest: String = stream.try_collect().await.unwrap();
    assert_eq!(rest, r#""second"]"#);
}
