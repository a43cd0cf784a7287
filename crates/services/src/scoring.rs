use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use exam_core::model::{ExamResult, SubmissionPayload};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::credentials::CredentialProvider;
use crate::error::ScoringError;

/// Contract for the remote service that grades a submitted attempt.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// Send the answers for grading.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError` for transport, auth, status or decoding failures.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExamResult, ScoringError>;
}

//
// ─── HTTP ──────────────────────────────────────────────────────────────────────
//

/// `POST {quiz_base_url}/submit` with a bearer token from the credential provider.
#[derive(Clone)]
pub struct HttpScoringClient {
    client: Client,
    submit_url: String,
    request_timeout: Duration,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpScoringClient {
    /// # Errors
    ///
    /// Returns `ScoringError::Http` if the HTTP client cannot be built.
    pub fn new(
        quiz_base_url: &Url,
        credentials: Arc<dyn CredentialProvider>,
        request_timeout: Duration,
    ) -> Result<Self, ScoringError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            submit_url: format!("{}/submit", quiz_base_url.as_str().trim_end_matches('/')),
            request_timeout,
            credentials,
        })
    }

    #[must_use]
    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExamResult, ScoringError> {
        let mut request = self.client.post(&self.submit_url).json(payload);
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout(self.request_timeout)
            } else {
                ScoringError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate();
            return Err(ScoringError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ScoringError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ScoringError::Decode(e.to_string()))
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Canned reply for `InMemoryScoringClient`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    Grade(ExamResult),
    Status(StatusCode),
    Unauthorized,
    Unavailable(String),
}

/// Scripted scoring client for testing and demos.
///
/// Replies are consumed in order; once the script runs out every call gets the
/// fallback. Every payload received is recorded.
#[derive(Debug)]
pub struct InMemoryScoringClient {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    latency: Duration,
    calls: Mutex<Vec<SubmissionPayload>>,
}

impl InMemoryScoringClient {
    #[must_use]
    pub fn grading(result: ExamResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResponse::Grade(result),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies that take precedence over the fallback.
    #[must_use]
    pub fn with_script(self, replies: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        lock(&self.script).extend(replies);
        self
    }

    /// Delay every reply, keeping the request "in flight" for that long.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SubmissionPayload> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl ScoringClient for InMemoryScoringClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExamResult, ScoringError> {
        lock(&self.calls).push(payload.clone());
        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            ScriptedResponse::Grade(result) => Ok(result),
            ScriptedResponse::Status(status) => Err(ScoringError::HttpStatus(status)),
            ScriptedResponse::Unauthorized => Err(ScoringError::Unauthorized),
            ScriptedResponse::Unavailable(reason) => Err(ScoringError::Unavailable(reason)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use exam_core::model::QuizId;

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            quiz_id: QuizId::new(1),
            answers: Vec::new(),
        }
    }

    fn graded(obtained: f64) -> ExamResult {
        ExamResult {
            obtained_marks: obtained,
            total_marks: 10.0,
            passed: obtained >= 5.0,
        }
    }

    #[test]
    fn submit_url_joins_base_path() {
        let creds: Arc<dyn CredentialProvider> = Arc::new(StaticCredentials::anonymous());
        let base = Url::parse("https://lms.example.com/quiz-api/").unwrap();
        let client = HttpScoringClient::new(&base, creds, Duration::from_secs(1)).unwrap();
        assert_eq!(client.submit_url(), "https://lms.example.com/quiz-api/submit");
    }

    #[tokio::test]
    async fn script_is_consumed_before_fallback() {
        let client = InMemoryScoringClient::grading(graded(8.0)).with_script([
            ScriptedResponse::Unavailable("down".into()),
            ScriptedResponse::Status(StatusCode::BAD_GATEWAY),
        ]);

        assert!(matches!(
            client.submit(&payload()).await,
            Err(ScoringError::Unavailable(_))
        ));
        assert!(matches!(
            client.submit(&payload()).await,
            Err(ScoringError::HttpStatus(status)) if status == StatusCode::BAD_GATEWAY
        ));
        assert_eq!(client.submit(&payload()).await.unwrap(), graded(8.0));
        assert_eq!(client.call_count(), 3);
    }
}
