use futures::executor::{block_on, block_on_stream};
use futures::io::AsyncReadExt;
use futures::StreamExt;
use json_stream_stringify::*;

fn numbers(n: i32) -> Array {
    (0..n).collect()
}

#[test]
fn chunks_reach_the_chunk_size() {
    let expected = to_string(numbers(1000)).unwrap();
    let chunks: Vec<String> = block_on_stream(JsonStream::builder(numbers(1000)).chunk_size(16).build())
        .map(Result::unwrap)
        .collect();

    assert!(chunks.len() > 1);
    let (last, full) = chunks.split_last().unwrap();
    assert!(!last.is_empty());
    assert!(full.iter().all(|chunk| chunk.len() >= 16));
    assert_eq!(chunks.concat(), expected);
}

#[test]
fn default_chunk_size() {
    let chunks: Vec<String> = block_on_stream(JsonStream::new(numbers(1000))).map(Result::unwrap).collect();
    assert!(chunks[0].len() >= DEFAULT_CHUNK_SIZE);
    assert!(chunks[0].len() < DEFAULT_CHUNK_SIZE + 8);
}

#[test]
fn small_document_is_one_chunk() {
    let chunks: Vec<String> = block_on_stream(JsonStream::new(vec![1, 2, 3])).map(Result::unwrap).collect();
    assert_eq!(chunks, ["[1,2,3]"]);
}

#[test]
fn long_strings_are_not_split() {
    let long = "x".repeat(100);
    let chunks: Vec<String> = block_on_stream(JsonStream::builder(long.as_str()).chunk_size(8).build())
        .map(Result::unwrap)
        .collect();
    assert_eq!(chunks, [format!("\"{}\"", long)]);
}

#[test]
fn next_chunk_overrides_chunk_size() {
    let mut stream = JsonStream::builder(numbers(100)).chunk_size(1).build();

    let first = block_on(stream.next_chunk(50)).unwrap().unwrap();
    assert_eq!(first.len(), 50);
    assert!(first.ends_with(",18,19"));
    assert_eq!(block_on(stream.next()).unwrap().unwrap(), ",20");
}

#[test]
fn stream_is_fused() {
    let mut stream = JsonStream::new(1);
    assert_eq!(block_on(stream.next()).unwrap().unwrap(), "1");
    assert!(block_on(stream.next()).is_none());
    assert!(block_on(stream.next()).is_none());
}

#[test]
fn error_discards_unflushed_output() {
    let arr = Array::new();
    arr.push(1);
    arr.push(arr.clone());

    let mut stream = JsonStream::new(arr);
    assert!(block_on(stream.next()).unwrap().is_err());
    assert!(block_on(stream.next()).is_none());
}

#[test]
fn cancel_ends_the_stream() {
    let mut stream = JsonStream::builder(numbers(100)).chunk_size(4).build();
    assert!(block_on(stream.next()).is_some());
    stream.cancel();
    assert!(block_on(stream.next()).is_none());
    stream.cancel();
}

#[test]
fn async_read() {
    let o = Object::from_iter([("a", Value::from(numbers(3))), ("b", Value::from("c"))]);
    let mut reader = Box::pin(JsonStream::builder(o).chunk_size(2).build().into_async_read());
    let mut text = String::new();
    block_on(reader.read_to_string(&mut text)).unwrap();
    assert_eq!(text, r#"{"a":[0,1,2],"b":"c"}"#);
}

#[test]
fn async_read_error() {
    let arr = Array::new();
    arr.push(arr.clone());
    let mut reader = Box::pin(JsonStream::new(arr).into_async_read());
    let mut text = String::new();
    let err = block_on(reader.read_to_string(&mut text)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Other);
    assert!(err.to_string().contains("circular"));
    // only the message survives
    let inner = err.get_ref().unwrap();
    assert!(inner.downcast_ref::<Error>().is_none());
    assert!(std::error::Error::source(inner).is_none());
}

#[test]
fn output_reparses() {
    let o = Object::new();
    o.insert("numbers", numbers(50));
    o.insert("text", "line\nbreak \u{2028} and \"quotes\"");
    o.insert("nested", Object::from_iter([("deep", vec![vec![Value::Null]])]));
    let text: String = block_on_stream(JsonStream::builder(o).chunk_size(7).indent("\t").build())
        .map(Result::unwrap)
        .collect();

    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reparsed["numbers"][49], 49);
    assert_eq!(reparsed["text"], "line\nbreak \u{2028} and \"quotes\"");
    assert!(reparsed["nested"]["deep"][0][0].is_null());
}
