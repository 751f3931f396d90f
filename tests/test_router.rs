use std::sync::{Arc, Mutex};

use huji::http::parser::parse_http_request;
use huji::http::request::{Method, Request};
use huji::http::response::Response;
use huji::http::writer::ResponseWriter;
use huji::router::{MethodFilter, RoutePattern, Router};

fn request(line: &str) -> Request {
    parse_http_request(&format!("{line}\r\nHost: a\r\nConnection: keep-alive\r\n\r\n")).unwrap()
}

/// Dispatches one request and returns the final status and body.
fn dispatch(router: &Router, line: &str) -> (u16, Option<Vec<u8>>, Request) {
    let mut req = request(line);
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    router.dispatch(&mut req, &mut res);
    (res.status_code(), res.body().map(<[u8]>::to_vec), req)
}

#[test]
fn test_pattern_extracts_params() {
    let pattern = RoutePattern::compile("/users/:id/posts/:post");

    assert_eq!(pattern.param_names(), ["id", "post"]);
    let params = pattern.captures("/users/42/posts/7").unwrap();
    assert_eq!(params.get("id").unwrap(), "42");
    assert_eq!(params.get("post").unwrap(), "7");
    assert!(pattern.captures("/users/42").is_none());
}

#[test]
fn test_pattern_is_prefix_anchored() {
    let pattern = RoutePattern::compile("/:id");

    assert_eq!(pattern.captures("/42").unwrap().get("id").unwrap(), "42");
    assert_eq!(pattern.captures("/42/extra").unwrap().get("id").unwrap(), "42");
    assert!(pattern.captures("x/42").is_none());
}

#[test]
fn test_pattern_literals_are_not_regex() {
    let pattern = RoutePattern::compile("/file.txt");

    assert!(pattern.captures("/file.txt").is_some());
    assert!(pattern.captures("/fileXtxt").is_none());
}

#[test]
fn test_route_params_reach_handler() {
    let mut router = Router::new();
    router.get("/:id", |req, res, _next| {
        res.send(req.params["id"].clone());
        Ok(())
    });

    let (status, body, req) = dispatch(&router, "GET /42/extra HTTP/1.1");
    assert_eq!(status, 200);
    assert_eq!(body.unwrap(), b"42");
    assert_eq!(req.params.get("id").unwrap(), "42");
}

#[test]
fn test_no_match_is_not_found() {
    let mut router = Router::new();
    router.post("/", |_req, res, _next| {
        res.send("post");
        Ok(())
    });

    let (status, body, _) = dispatch(&router, "GET / HTTP/1.1");
    assert_eq!(status, 404);
    assert_eq!(body, None);
}

#[test]
fn test_method_filter() {
    assert!(MethodFilter::All.admits(Method::TRACE));
    assert!(MethodFilter::Only(Method::GET).admits(Method::GET));
    assert!(!MethodFilter::from(Method::GET).admits(Method::HEAD));
}

#[test]
fn test_chain_runs_in_registration_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();

    let log = Arc::clone(&seen);
    router.use_all("/", move |req, res, next| {
        log.lock().unwrap().push("logger");
        next.run(req, res);
        Ok(())
    });
    let log = Arc::clone(&seen);
    router.delete("/items", move |_req, _res, _next| {
        log.lock().unwrap().push("delete");
        Ok(())
    });
    let log = Arc::clone(&seen);
    router.get("/items/:id", move |req, res, _next| {
        log.lock().unwrap().push("get");
        res.send(format!("item {}", req.params["id"]));
        Ok(())
    });

    let (status, body, _) = dispatch(&router, "GET /items/9 HTTP/1.1");

    assert_eq!(status, 200);
    assert_eq!(body.unwrap(), b"item 9");
    assert_eq!(*seen.lock().unwrap(), vec!["logger", "get"]);
}

#[test]
fn test_params_reset_per_match() {
    let mut router = Router::new();
    router.use_all("/:section", |req, res, next| {
        assert!(req.params.contains_key("section"));
        next.run(req, res);
        Ok(())
    });
    router.get("/", |req, res, _next| {
        assert!(req.params.is_empty());
        res.send("root");
        Ok(())
    });

    let (status, _, _) = dispatch(&router, "GET /docs HTTP/1.1");
    assert_eq!(status, 200);
}

#[test]
fn test_next_past_last_route_is_not_found() {
    let mut router = Router::new();
    router.use_all("/", |req, res, next| {
        next.run(req, res);
        Ok(())
    });

    let (status, _, _) = dispatch(&router, "GET / HTTP/1.1");
    assert_eq!(status, 404);
}

#[test]
fn test_handler_error_is_internal_server_error() {
    let mut router = Router::new();
    router.get("/boom", |_req, _res, _next| anyhow::bail!("handler exploded"));

    let mut req = request("GET /boom HTTP/1.1");
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    router.dispatch(&mut req, &mut res);

    assert_eq!(res.status_code(), 500);
    assert_eq!(res.status_message(), "500 Internal Server Error");
    // 500 is in the disconnect-forcing set
    assert!(!writer.is_writable());
}

#[test]
fn test_handler_panic_is_internal_server_error() {
    let mut router = Router::new();
    router.get("/:id", |req, res, _next| {
        res.send(req.params["missing"].clone());
        Ok(())
    });

    let mut req = request("GET /42 HTTP/1.1");
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    router.dispatch(&mut req, &mut res);

    assert_eq!(res.status_code(), 500);
    assert_eq!(res.body(), None);
    assert!(!writer.is_writable());
}

#[test]
fn test_panic_in_later_handler_is_contained_there() {
    let mut router = Router::new();
    router.use_all("/", |req, res, next| {
        next.run(req, res);
        res.set("x-after", "yes");
        Ok(())
    });
    router.get("/", |_req, _res, _next| panic!("inner handler blew up"));

    let mut req = request("GET / HTTP/1.1");
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    router.dispatch(&mut req, &mut res);

    assert_eq!(res.status_code(), 500);
    assert_eq!(res.get("x-after"), Some("yes"));
}

#[test]
fn test_error_in_later_handler_is_contained_there() {
    let mut router = Router::new();
    router.use_all("/", |req, res, next| {
        next.run(req, res);
        res.set("x-after", "yes");
        Ok(())
    });
    router.get("/", |_req, _res, _next| anyhow::bail!("inner"));

    let mut req = request("GET / HTTP/1.1");
    let mut writer = ResponseWriter::new();
    let mut res = Response::new(&mut writer, &req);
    router.dispatch(&mut req, &mut res);

    assert_eq!(res.status_code(), 500);
    assert_eq!(res.get("x-after"), Some("yes"));
}

#[test]
fn test_router_len() {
    let mut router = Router::new();
    assert!(router.is_empty());

    router
        .get("/", |_req, _res, _next| Ok(()))
        .put("/", |_req, _res, _next| Ok(()))
        .head("/", |_req, _res, _next| Ok(()));
    assert_eq!(router.len(), 3);
}
