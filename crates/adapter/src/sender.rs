//! The message-sending capability and its backend adapter.

use crate::envelope::{ChatPayload, ChatRequestEnvelope};
use crate::provider::Provider;
use crate::transport::{HttpTransport, Method, OutboundRequest, Transport, execute_bounded};
use crate::{BackendProfile, Error, NormalizedResult, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Service-level target for a complete answer.
pub const RESPONSE_TIME_TARGET: Duration = Duration::from_secs(8);

/// Sends a user message to a chat backend.
pub trait MessageSender: Send + Sync {
    /// Send one message.
    ///
    /// Returns `None` without contacting the backend when the message is
    /// empty after trimming. Otherwise returns exactly one result; failures
    /// are reported inside it rather than as errors.
    fn send(&self, message: &str) -> impl Future<Output = Option<NormalizedResult>> + Send;
}

/// [`MessageSender`] for one backend profile.
///
/// The provider strategy is picked from the profile when the adapter is
/// built and never changes afterwards.
pub struct BackendAdapter<T = HttpTransport> {
    pub(crate) profile: Arc<BackendProfile>,
    pub(crate) transport: T,
    provider: Box<dyn Provider>,
}

impl BackendAdapter<HttpTransport> {
    /// Adapter over a fresh HTTP transport.
    pub fn from_profile(profile: BackendProfile) -> Self {
        Self::new(Arc::new(profile), HttpTransport::new())
    }
}

impl<T: Transport> BackendAdapter<T> {
    pub fn new(profile: Arc<BackendProfile>, transport: T) -> Self {
        let provider = profile.provider().strategy();
        Self::with_provider(profile, transport, provider)
    }

    /// Use a custom response strategy instead of the profile's provider.
    pub fn with_provider(
        profile: Arc<BackendProfile>,
        transport: T,
        provider: Box<dyn Provider>,
    ) -> Self {
        if profile.max_retries() > 0 {
            debug!(
                max_retries = profile.max_retries(),
                "retry budget configured; messages are still sent once"
            );
        }
        Self {
            profile,
            transport,
            provider,
        }
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    async fn exchange(&self, question: &str) -> Result<ChatPayload> {
        let body = serde_json::to_value(ChatRequestEnvelope::new(question))
            .map_err(|e| Error::Other(e.to_string()))?;
        let request = OutboundRequest {
            method: Method::Post,
            url: self.profile.chat_url(),
            headers: self.profile.request_headers(),
            body: Some(body),
            timeout: self.profile.timeout(),
        };
        debug!(url = %request.url, "sending chat request");

        let response = execute_bounded(&self.transport, request)
            .await?
            .error_for_status()?;
        let envelope = response.json()?;
        self.provider.unwrap_response(envelope)
    }
}

impl<T: Transport> MessageSender for BackendAdapter<T> {
    async fn send(&self, message: &str) -> Option<NormalizedResult> {
        let question = message.trim();
        if question.is_empty() {
            return None;
        }

        let span = info_span!(
            "chat",
            request_id = %Uuid::new_v4(),
            provider = %self.provider.kind()
        );

        async {
            let t0 = Instant::now();
            let outcome = self.exchange(question).await;
            let elapsed_ms = t0.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(payload) => NormalizedResult::success(payload, elapsed_ms),
                Err(e) => {
                    warn!(error = %e, kind = %e.kind(), elapsed_ms, "chat request failed");
                    NormalizedResult::failure(&e, elapsed_ms)
                }
            };

            match within_target(&result) {
                Some(true) => info!(elapsed_ms, "response within 8s target"),
                Some(false) => warn!(elapsed_ms, "response exceeded 8s target"),
                None => {}
            }

            Some(result)
        }
        .instrument(span)
        .await
    }
}

/// Whether a successful result came back inside the target. Failures are
/// reported by their own warning and get no verdict.
fn within_target(result: &NormalizedResult) -> Option<bool> {
    result
        .ok
        .then(|| Duration::from_millis(result.elapsed_ms) < RESPONSE_TIME_TARGET)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::InboundResponse;
    use crate::{ErrorKind, ProviderKind};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Transport that replays one canned response and records requests.
    pub(crate) struct FakeTransport {
        status: u16,
        body: String,
        delay: Duration,
        fail: Option<fn() -> Error>,
        pub(crate) requests: Mutex<Vec<OutboundRequest>>,
    }

    impl FakeTransport {
        pub(crate) fn json(status: u16, body: Value) -> Self {
            Self::raw(status, body.to_string())
        }

        pub(crate) fn raw(status: u16, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                delay: Duration::ZERO,
                fail: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(fail: fn() -> Error) -> Self {
            Self {
                fail: Some(fail),
                ..Self::raw(200, "")
            }
        }

        pub(crate) fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn last_request(&self) -> OutboundRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTransport {
        async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse> {
            self.requests.lock().unwrap().push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(fail) = self.fail {
                return Err(fail());
            }
            let status_text = match self.status {
                200 => "OK",
                500 => "Internal Server Error",
                _ => "",
            };
            Ok(InboundResponse {
                status: self.status,
                status_text: status_text.to_string(),
                body: self.body.clone(),
            })
        }
    }

    fn profile(kind: ProviderKind) -> Arc<BackendProfile> {
        Arc::new(
            BackendProfile::builder(kind, "https://backend.test/v2/abc")
                .build()
                .unwrap(),
        )
    }

    fn gpu_adapter(transport: FakeTransport) -> BackendAdapter<FakeTransport> {
        BackendAdapter::new(profile(ProviderKind::ServerlessGpu), transport)
    }

    #[tokio::test]
    async fn sends_trimmed_question_once() {
        let adapter = gpu_adapter(FakeTransport::json(200, json!({"output": {"answer": "hi"}})));

        let result = adapter.send("  Tell me about co-op  \n").await.unwrap();
        assert!(result.ok);
        assert_eq!(adapter.transport.request_count(), 1);

        let request = adapter.transport.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://backend.test/v2/abc/runsync");
        let body = request.body.unwrap();
        assert_eq!(body["input"]["question"], "Tell me about co-op");
        assert_eq!(body["input"]["n_results"], 10);
    }

    #[tokio::test]
    async fn empty_message_is_a_no_op() {
        let adapter = gpu_adapter(FakeTransport::json(200, json!({"answer": "unused"})));
        assert!(adapter.send("").await.is_none());
        assert!(adapter.send("   \t\n").await.is_none());
        assert_eq!(adapter.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn nested_and_flat_answers_match() {
        let nested = gpu_adapter(FakeTransport::json(200, json!({"output": {"answer": "X"}})));
        let flat = gpu_adapter(FakeTransport::json(200, json!({"answer": "X"})));
        assert_eq!(nested.send("q").await.unwrap().answer, "X");
        assert_eq!(flat.send("q").await.unwrap().answer, "X");
    }

    #[tokio::test]
    async fn missing_answer_uses_default() {
        let adapter = gpu_adapter(FakeTransport::json(200, json!({"output": {"sources": []}})));
        let result = adapter.send("q").await.unwrap();
        assert!(result.ok);
        assert_eq!(result.answer, "I couldn't generate an answer.");
        assert_eq!(result.confidence, "medium");
        assert!(result.timing.contains_key("total"));
    }

    #[tokio::test]
    async fn http_500_is_classified() {
        let adapter = gpu_adapter(FakeTransport::raw(500, "boom"));
        let result = adapter.send("q").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Http));
        assert_eq!(result.confidence, "low");
        assert!(result.answer.contains("500"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let profile = Arc::new(
            BackendProfile::builder(ProviderKind::Direct, "http://10.0.0.5:8000")
                .timeout(Duration::from_millis(50))
                .build()
                .unwrap(),
        );
        let transport =
            FakeTransport::json(200, json!({"answer": "late"})).delayed(Duration::from_millis(500));
        let adapter = BackendAdapter::new(profile, transport);

        let result = adapter.send("q").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
        assert!(result.elapsed_ms >= 50);
        assert!(result.elapsed_ms < 500);
    }

    #[tokio::test]
    async fn network_failure_is_classified() {
        let adapter = gpu_adapter(FakeTransport::failing(|| Error::Network {
            url: "https://backend.test".into(),
            message: "connection refused".into(),
        }));
        let result = adapter.send("q").await.unwrap();
        assert_eq!(result.error_kind, Some(ErrorKind::Network));
        assert!(result.answer.contains("https://backend.test"));
        assert!(result.timing.contains_key("total"));
    }

    #[tokio::test]
    async fn malformed_body_is_unknown() {
        let adapter = gpu_adapter(FakeTransport::raw(200, "<html>tunnel warning</html>"));
        let result = adapter.send("q").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Unknown));
    }

    #[tokio::test]
    async fn float_document_count_keeps_answer() {
        let adapter = gpu_adapter(FakeTransport::json(
            200,
            json!({"answer": "Boston", "documents_searched": 10.0, "sources": "about.html"}),
        ));
        let result = adapter.send("q").await.unwrap();
        assert!(result.ok);
        assert_eq!(result.answer, "Boston");
        assert_eq!(result.documents_searched, 10);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn array_body_is_unknown() {
        let adapter = gpu_adapter(FakeTransport::json(200, json!(["hello"])));
        let result = adapter.send("q").await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(ErrorKind::Unknown));
        assert_ne!(result.answer, "hello");
    }

    #[test]
    fn failures_get_no_latency_verdict() {
        let fast = NormalizedResult::failure(&Error::Other("boom".into()), 10);
        assert_eq!(within_target(&fast), None);

        let mut ok = NormalizedResult::success(Default::default(), 10);
        assert_eq!(within_target(&ok), Some(true));
        ok.elapsed_ms = 9_000;
        assert_eq!(within_target(&ok), Some(false));
    }

    #[tokio::test]
    async fn queued_gpu_job_is_timeout() {
        let adapter = gpu_adapter(FakeTransport::json(200, json!({"id": "j", "status": "IN_QUEUE"})));
        let result = adapter.send("q").await.unwrap();
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn bearer_header_follows_api_key() {
        let keyed = Arc::new(
            BackendProfile::builder(ProviderKind::ServerlessGpu, "https://backend.test")
                .api_key("rp_123")
                .header("X-Client", "chatrelay")
                .build()
                .unwrap(),
        );
        let adapter = BackendAdapter::new(keyed, FakeTransport::json(200, json!({})));
        adapter.send("q").await.unwrap();
        let headers = adapter.transport.last_request().headers;
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer rp_123"));
        assert_eq!(headers.get("X-Client").map(String::as_str), Some("chatrelay"));
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );

        let anonymous = gpu_adapter(FakeTransport::json(200, json!({})));
        anonymous.send("q").await.unwrap();
        assert!(!anonymous.transport.last_request().headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn repeated_sends_differ_only_in_elapsed() {
        let adapter = gpu_adapter(FakeTransport::json(
            200,
            json!({
                "output": {
                    "answer": "Boston, MA",
                    "sources": [{"source": "about.html", "similarity": 0.91}],
                    "confidence": "high",
                    "timing": {"search": 0.3, "generation": 1.2, "total": 1.5},
                    "documents_searched": 10
                }
            }),
        ));

        let mut first = adapter.send("Where is it?").await.unwrap();
        let mut second = adapter.send("Where is it?").await.unwrap();
        first.elapsed_ms = 0;
        second.elapsed_ms = 0;
        assert_eq!(first, second);
        assert_eq!(adapter.transport.request_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_sends_are_independent() {
        let adapter = gpu_adapter(
            FakeTransport::json(200, json!({"answer": "ok"})).delayed(Duration::from_millis(20)),
        );
        let (a, b) = tokio::join!(adapter.send("first"), adapter.send("second"));
        assert!(a.unwrap().ok);
        assert!(b.unwrap().ok);
        assert_eq!(adapter.transport.request_count(), 2);
    }

    #[tokio::test]
    async fn retries_are_not_attempted() {
        let profile = Arc::new(
            BackendProfile::builder(ProviderKind::Direct, "http://h")
                .max_retries(3)
                .build()
                .unwrap(),
        );
        let adapter = BackendAdapter::new(profile, FakeTransport::raw(500, ""));
        let result = adapter.send("q").await.unwrap();
        assert!(!result.ok);
        assert_eq!(adapter.transport.request_count(), 1);
    }
}
