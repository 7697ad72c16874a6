use factlens_http::{Auth, HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn get_bytes_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<transcript/>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let body = client
        .get_bytes("api/timedtext", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(&body[..], b"<transcript/>");
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_bytes(
            "missing",
            RequestOpts {
                retries: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(matches!(err, HttpError::Api { .. }));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
    let text = client.get_text("flaky", RequestOpts::default()).await.unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn absolute_urls_and_query_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "dQw4w9WgXcQ"))
        .and(query_param("key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .mount(&server)
        .await;

    // Base deliberately points elsewhere; the absolute URL must win.
    let client = HttpClient::new("http://127.0.0.1:9/").unwrap();
    let url = format!("{}/youtube/v3/videos", server.uri());
    let got: serde_json::Value = client
        .get_json(
            &url,
            RequestOpts {
                allow_absolute: true,
                retries: Some(0),
                query: Some(vec![("id", Cow::Borrowed("dQw4w9WgXcQ"))]),
                auth: Some(Auth::Query {
                    name: "key",
                    value: Cow::Borrowed(" k-123 "),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(got["items"], serde_json::json!([]));
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_json::<serde_json::Value>("x", RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Decode(..)));
}
