use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;

/// GETs `url` and returns the body, mapping transport failures and non-2xx
/// statuses to [`SourceError::Unavailable`].
pub fn fetch_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    extra_headers: &[(&str, &str)],
) -> Result<String, SourceError> {
    let mut req = client.get(url);
    if !query.is_empty() {
        req = req.query(query);
    }
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }

    let resp = req
        .send()
        .map_err(|err| SourceError::unavailable(url, None, &transport_reason(&err)))?;
    let status = resp.status();
    let final_url = resp.url().to_string();
    let body = resp
        .text()
        .map_err(|err| SourceError::unavailable(url, Some(status.as_u16()), &err.to_string()))?;
    debug!(url, final_url = %final_url, status = status.as_u16(), bytes = body.len(), "fetched");

    if !status.is_success() {
        return Err(SourceError::unavailable(url, Some(status.as_u16()), &body));
    }
    Ok(body)
}

/// Same as [`fetch_text`] but decodes the body as JSON.
pub fn fetch_json(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    extra_headers: &[(&str, &str)],
) -> Result<Value, SourceError> {
    let body = fetch_text(client, url, query, extra_headers)?;
    parse_json_body(url, &body)
}

pub fn parse_json_body(url: &str, body: &str) -> Result<Value, SourceError> {
    serde_json::from_str::<Value>(body.trim())
        .map_err(|err| SourceError::malformed(url, format!("not json ({err})"), body))
}

fn transport_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::EXCERPT_CHARS;
    use crate::http_client::http_client;

    #[test]
    fn html_body_is_malformed_json() {
        let err = parse_json_body("https://example.test/x", "<html>nope</html>").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("<html>nope</html>"));
    }

    #[test]
    fn json_body_parses() {
        let value = parse_json_body("https://example.test/x", " [1, 2] \n").unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    // The blocking client owns its own runtime, so it is built and dropped
    // off the async test thread.
    async fn fetch_blocking(
        url: String,
        timeout: Duration,
        query: Vec<(&'static str, String)>,
        headers: Vec<(&'static str, &'static str)>,
    ) -> Result<String, SourceError> {
        tokio::task::spawn_blocking(move || {
            let client = http_client(timeout).unwrap();
            fetch_text(&client, &url, &query, &headers)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn success_sends_query_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/portal/players"))
            .and(query_param("year", "2024"))
            .and(header("Authorization", "Bearer key"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let body = fetch_blocking(
            format!("{}/portal/players", server.uri()),
            Duration::from_secs(5),
            vec![("year", "2024".to_string())],
            vec![("Authorization", "Bearer key")],
        )
        .await
        .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_status_is_unavailable_with_excerpt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teams"))
            .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(EXCERPT_CHARS + 250)))
            .mount(&server)
            .await;

        let url = format!("{}/teams", server.uri());
        let err = fetch_blocking(url.clone(), Duration::from_secs(5), Vec::new(), Vec::new())
            .await
            .unwrap_err();
        match err {
            SourceError::Unavailable {
                url: got,
                status,
                excerpt,
            } => {
                assert_eq!(got, url);
                assert_eq!(status, Some(503));
                assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stalled_server_times_out_without_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = fetch_blocking(
            format!("{}/teams", server.uri()),
            Duration::from_secs(1),
            Vec::new(),
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_unavailable());
        assert!(matches!(err, SourceError::Unavailable { status: None, .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn redirected_failure_reports_requested_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/teams/fbs"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", format!("{}/moved", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let requested = format!("{}/teams/fbs", server.uri());
        let err = fetch_blocking(requested.clone(), Duration::from_secs(5), Vec::new(), Vec::new())
            .await
            .unwrap_err();
        match err {
            SourceError::Unavailable { url, status, .. } => {
                assert_eq!(url, requested);
                assert_eq!(status, Some(500));
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }
}
