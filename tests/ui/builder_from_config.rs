use json_stream_stringify::*;

fn main() {
    let options: Options = serde_json::from_str(r#"{"indent": "  ", "cycle": "reference", "chunk_size": 64}"#).unwrap();

    let shared = Array::from_iter(["x"]);
    let root = Object::from_iter([("first", shared.clone()), ("second", shared)]);
    let stream = JsonStream::builder(root)
        .options(options)
        .on_diagnostic(|d| eprintln!("{}", d))
        .build();

    let text: String = futures::executor::block_on_stream(stream).map(Result::unwrap).collect();
    assert!(text.contains("$ref"));
}
