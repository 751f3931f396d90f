use huji::http::error::{HttpError, Rejected};
use huji::http::parser::parse_http_request;
use huji::http::request::{HttpVersion, Request};
use huji::http::response::Response;
use huji::http::status::StatusCode;
use huji::http::writer::{ResponseWriter, serialize_response};

fn request(text: &str) -> Request {
    parse_http_request(text).unwrap()
}

fn keep_alive() -> Request {
    request("GET / HTTP/1.1\r\nHost: a\r\nConnection: keep-alive\r\n\r\n")
}

async fn flushed(writer: &mut ResponseWriter) -> (String, bool) {
    let mut out = Vec::new();
    let closed = writer.flush(&mut out).await.unwrap();
    (String::from_utf8(out).unwrap(), closed)
}

#[test]
fn test_status_code_table() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::UnsupportedMediaType.as_u16(), 415);
    assert_eq!(StatusCode::from_u16(403), Some(StatusCode::Forbidden));
    assert_eq!(StatusCode::from_u16(201), None);
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_disconnect_forcing_statuses() {
    for code in [404, 415, 403, 500, 414] {
        assert!(StatusCode::from_u16(code).unwrap().forces_close());
    }
    assert!(!StatusCode::Ok.forces_close());
    assert!(!StatusCode::BadRequest.forces_close());
}

#[test]
fn test_status_messages() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);

    assert_eq!(res.status(404).status_message(), "404 Not Found");
    assert_eq!(res.status(299).status_message(), "299");
    assert_eq!(res.status_text("200").status_message(), "200 OK");

    res.status_text("299 Custom Thing");
    assert_eq!(res.status_code(), 299);
    assert_eq!(res.status_message(), "299 Custom Thing");
}

#[test]
fn test_headers_are_case_insensitive() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);

    res.set("X-Custom", "one");
    res.set("x-custom", "two");

    assert_eq!(res.get("X-CUSTOM"), Some("two"));
    assert_eq!(res.parts().headers, vec![("x-custom".to_string(), "two".to_string())]);
}

#[test]
fn test_serialize_wire_format() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);

    res.status(200)
        .set("Content-Type", "text/plain")
        .cookie("id", "7", [("Path", "/"), ("Max-Age", "60")]);
    res.send("hi");

    let wire = String::from_utf8(serialize_response(res.parts())).unwrap();
    assert_eq!(
        wire,
        "HTTP/1.1 200 OK\r\n\
         content-type: text/plain\r\n\
         content-length: 2\r\n\
         Set-Cookie: id=7; Path=/; Max-Age=60\r\n\
         \r\n\
         hi"
    );
}

#[tokio::test]
async fn test_send_keeps_connection_open_on_keep_alive() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).send("ok");

    assert!(writer.has_sent());
    assert!(writer.is_writable());
    let (wire, closed) = flushed(&mut writer).await;
    assert!(wire.ends_with("\r\n\r\nok"));
    assert!(!closed);
}

#[tokio::test]
async fn test_send_closes_by_default() {
    let req = request("GET / HTTP/1.1\r\nHost: a\r\n\r\n");
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).send("bye");

    let (_, closed) = flushed(&mut writer).await;
    assert!(closed);
}

#[tokio::test]
async fn test_forced_close_status_overrides_keep_alive() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).status(500).end();

    let (wire, closed) = flushed(&mut writer).await;
    assert!(wire.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(wire.contains("content-length: 0\r\n"));
    assert!(closed);
}

#[tokio::test]
async fn test_writes_after_close_are_ignored() {
    let req = request("GET / HTTP/1.0\r\n\r\n");
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    res.send("first");
    res.send("second");

    let (wire, _) = flushed(&mut writer).await;
    assert!(wire.ends_with("first"));
    assert!(!wire.contains("second"));
}

#[tokio::test]
async fn test_json_sets_content_type() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    res.json(&serde_json::json!({"ok": true}));

    assert_eq!(res.get("content-type"), Some("application/json"));
    assert_eq!(res.body(), Some(&br#"{"ok":true}"#[..]));
}

#[tokio::test]
async fn test_json_failure_is_internal_error() {
    use std::collections::HashMap;

    // Maps with non-string keys cannot be serialized to JSON
    let mut bad = HashMap::new();
    bad.insert(vec![1u8], 1);

    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    res.json(&bad);

    assert_eq!(res.status_code(), 500);
    assert_eq!(res.body(), None);
    assert_eq!(res.get("content-type"), None);
}

#[tokio::test]
async fn test_error_frame_is_rejected() {
    let mut writer = ResponseWriter::new();
    let frame = Err(HttpError::BadRequest);

    let result = Response::open(&mut writer, &frame);
    assert!(matches!(result, Err(Rejected)));

    let (wire, closed) = flushed(&mut writer).await;
    assert_eq!(
        wire,
        "HTTP/1.0 400 Bad Request\r\ncontent-length: 0\r\n\r\n"
    );
    assert!(closed);
}

#[tokio::test]
async fn test_send_file_unknown_extension() {
    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    res.send_file("archive.unknownext");

    assert_eq!(res.status_code(), 415);
    assert!(res.is_error());
    assert_eq!(res.get("content-type"), None);
    assert_eq!(res.version(), HttpVersion::Http11);

    let (wire, closed) = flushed(&mut writer).await;
    assert!(wire.starts_with("HTTP/1.1 415 Unsupported Media Type\r\n"));
    assert!(closed);
}

#[tokio::test]
async fn test_send_file_streams_contents() {
    let path = std::env::temp_dir().join(format!("huji-send-file-{}.txt", std::process::id()));
    std::fs::write(&path, "file body").unwrap();

    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).send_file(&path);

    let (wire, closed) = flushed(&mut writer).await;
    std::fs::remove_file(&path).unwrap();

    assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(wire.contains("content-type: text/plain\r\n"));
    assert!(wire.contains("content-length: 9\r\n"));
    assert!(wire.ends_with("\r\n\r\nfile body"));
    assert!(!closed);
}

#[tokio::test]
async fn test_send_file_length_is_read_when_written() {
    let path = std::env::temp_dir().join(format!("huji-late-length-{}.txt", std::process::id()));
    std::fs::write(&path, "a").unwrap();

    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).send_file(&path);
    std::fs::write(&path, "grown to fourteen").unwrap();

    let (wire, _) = flushed(&mut writer).await;
    std::fs::remove_file(&path).unwrap();

    assert!(wire.contains("content-length: 17\r\n"));
    assert!(wire.ends_with("\r\n\r\ngrown to fourteen"));
}

#[tokio::test]
async fn test_send_file_keeps_preset_length() {
    let path = std::env::temp_dir().join(format!("huji-preset-length-{}.txt", std::process::id()));
    std::fs::write(&path, "abc").unwrap();

    let req = keep_alive();
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req)
        .set("Content-Length", 3)
        .send_file(&path);

    let (wire, _) = flushed(&mut writer).await;
    std::fs::remove_file(&path).unwrap();

    assert_eq!(wire.matches("content-length").count(), 1);
    assert!(wire.contains("content-length: 3\r\n"));
}

#[tokio::test]
async fn test_send_file_missing_file_is_swallowed() {
    let req = request("GET / HTTP/1.0\r\n\r\n");
    let mut writer = ResponseWriter::new();
    Response::new(&mut writer, &req).send_file("/definitely/not/here.html");

    let (wire, closed) = flushed(&mut writer).await;
    assert!(wire.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(closed);
}
