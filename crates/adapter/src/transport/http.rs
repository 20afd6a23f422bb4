//! reqwest-backed transport.

use super::{InboundResponse, Method, OutboundRequest, Transport};
use crate::{Error, Result};
use std::time::Duration;

/// HTTP transport over a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client (custom TLS, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse> {
        let mut req = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| Error::Other(e.to_string()))?;
            req = req.body(bytes);
        }

        let response = req
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify(e, &request.url, request.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify(e, &request.url, request.timeout))?;

        Ok(InboundResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

fn classify(err: reqwest::Error, url: &str, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout)
    } else if err.is_connect() || err.is_request() {
        Error::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_decode() || err.is_body() {
        Error::Decode(err.to_string())
    } else {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendAdapter, BackendProfile, ErrorKind, MessageSender, ProviderKind};
    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn start_mock_backend() -> String {
        let app = Router::new()
            .route(
                "/runsync",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "id": "job-1",
                        "status": "COMPLETED",
                        "output": {
                            "answer": format!("echo: {}", body["input"]["question"].as_str().unwrap_or("")),
                            "sources": [{"source": "catalog", "similarity": 0.8}],
                            "confidence": "high",
                            "documents_searched": body["input"]["n_results"]
                        }
                    }))
                }),
            )
            .route(
                "/fail",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(json!({"answer": "late"}))
                }),
            )
            .route("/health", get(|| async { Json(json!({"status": "healthy"})) }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn post_request(url: String, timeout: Duration) -> OutboundRequest {
        OutboundRequest {
            method: Method::Post,
            url,
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            body: Some(json!({"input": {"question": "hi", "n_results": 10}})),
            timeout,
        }
    }

    #[tokio::test]
    async fn posts_json_and_reads_body() {
        let base = start_mock_backend().await;
        let transport = HttpTransport::new();
        let response = transport
            .execute(post_request(format!("{base}/runsync"), Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.json().unwrap()["output"]["answer"], "echo: hi");
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let base = start_mock_backend().await;
        let response = HttpTransport::new()
            .execute(post_request(format!("{base}/fail"), Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.status_text, "Internal Server Error");
        assert!(matches!(
            response.error_for_status(),
            Err(Error::Http { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpTransport::new()
            .execute(post_request(format!("http://{addr}/runsync"), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn adapter_end_to_end_over_http() {
        let base = start_mock_backend().await;
        let profile = BackendProfile::builder(ProviderKind::ServerlessGpu, &base)
            .api_key("rp-key")
            .build()
            .unwrap();
        let adapter = BackendAdapter::new(Arc::new(profile), HttpTransport::new());

        let result = adapter.send("  What programs exist?  ").await.unwrap();
        assert!(result.ok);
        assert_eq!(result.answer, "echo: What programs exist?");
        assert_eq!(result.confidence, "high");
        assert_eq!(result.documents_searched, 10);
        assert_eq!(result.sources.len(), 1);
    }

    #[tokio::test]
    async fn adapter_classifies_http_500() {
        let base = start_mock_backend().await;
        let profile = BackendProfile::builder(ProviderKind::Direct, &base)
            .chat_endpoint("/fail")
            .build()
            .unwrap();
        let adapter = BackendAdapter::new(Arc::new(profile), HttpTransport::new());

        let result = adapter.send("hello").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Http));
        assert!(result.answer.contains("500"));
    }

    #[tokio::test]
    async fn adapter_times_out_slow_backend() {
        let base = start_mock_backend().await;
        let profile = BackendProfile::builder(ProviderKind::Tunnel, &base)
            .chat_endpoint("/slow")
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let adapter = BackendAdapter::new(Arc::new(profile), HttpTransport::new());

        let result = adapter.send("hello").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
        assert_eq!(result.confidence, "low");
    }

    #[tokio::test]
    async fn health_probe_over_http() {
        let base = start_mock_backend().await;
        let profile = BackendProfile::builder(ProviderKind::Direct, &base)
            .preset_endpoints()
            .build()
            .unwrap();
        let adapter = BackendAdapter::new(Arc::new(profile), HttpTransport::new());

        let report = adapter.health().await;
        assert!(report.ok);
        assert_eq!(report.status, "healthy");
    }
}
