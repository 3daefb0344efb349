use staticd::http::request::{Method, Request, RequestBuilder};
use std::collections::HashMap;

#[test]
fn test_request_header_retrieval_is_case_insensitive() {
    let mut headers = HashMap::new();
    headers.insert("host".to_string(), "example.com".to_string());
    headers.insert("content-type".to_string(), "application/json".to_string());

    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        path: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
    };

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_method_equality() {
    assert_eq!(Method::GET, Method::GET);
    assert_ne!(Method::GET, Method::POST);
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::from("GET"), Method::GET);
    assert_eq!(Method::from("POST"), Method::POST);
    assert_eq!(Method::from("INVALID"), Method::Extension("INVALID".to_string()));
    assert_eq!(Method::from("get"), Method::Extension("get".to_string())); // Case-sensitive
}

#[test]
fn test_request_method_display_round_trips_token() {
    assert_eq!(Method::DELETE.to_string(), "DELETE");
    assert_eq!(Method::from("BREW").to_string(), "BREW");
}

#[test]
fn test_only_get_is_retrieval() {
    assert!(Method::GET.is_retrieval());
    assert!(!Method::HEAD.is_retrieval());
    assert!(!Method::POST.is_retrieval());
    assert!(!Method::from("FETCH").is_retrieval());
}

#[test]
fn test_request_builder_defaults() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/index.html")
        .header("User-Agent", "Test")
        .build()
        .unwrap();

    assert_eq!(req.path, "/index.html");
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.headers.get("user-agent").unwrap(), "Test");
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}
