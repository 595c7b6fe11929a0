use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, BINARY_BODY};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_path_and_query() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo/resources?filter=new")
                .header(http::header::USER_AGENT, "Suck/1.0.1")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/echo/resources");
    assert_eq!(echo.query.as_deref(), Some("filter=new"));
    assert_eq!(echo.header("user-agent"), Some("Suck/1.0.1"));
    assert!(echo.body.is_empty());
}

#[tokio::test]
async fn echo_returns_posted_body() {
    let resp = app()
        .oneshot(form_request("POST", "/echo", "login=matt&name=Matt+Mower"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "login=matt&name=Matt+Mower");
    assert_eq!(
        echo.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn echo_accepts_put_and_delete() {
    for method in ["PUT", "DELETE"] {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/echo/resource/1")
                    .body(String::new())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
        assert_eq!(echo.path, "/echo/resource/1");
        assert!(echo.query.is_none());
    }
}

#[tokio::test]
async fn echo_joins_repeated_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header("x-tag", "a")
                .header("x-tag", "b")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.header("x-tag"), Some("a, b"));
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/status/500")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], b"Internal Server Error");
}

#[tokio::test]
async fn status_works_for_every_method() {
    let resp = app()
        .oneshot(form_request("POST", "/status/201", "a=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn status_rejects_non_numeric_code() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/status/teapot")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- bytes / redirect ---

#[tokio::test]
async fn bytes_serves_non_utf8_body() {
    let resp = app()
        .oneshot(Request::builder().uri("/bytes").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], &BINARY_BODY[..]);
    assert!(std::str::from_utf8(&body).is_err());
}

#[tokio::test]
async fn redirect_points_at_echo() {
    let resp = app()
        .oneshot(Request::builder().uri("/redirect").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "/echo");
}
