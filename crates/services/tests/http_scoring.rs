//! Tests for the HTTP scoring client against a local fake scoring service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use exam_core::model::{
    AnswerEntry, ExamResult, ExamStatus, QuestionId, QuizId, QuizKind, SubmissionPayload,
    SubmitTrigger,
};
use serde_json::{Value, json};
use services::{
    CredentialProvider, ExamController, ExamDeps, ExamError, ExamRequest, HttpScoringClient,
    RecordingNotifier, ScoringClient, ScoringError, StaticCredentials, SubmitOutcome,
};
use url::Url;

#[derive(Clone, Copy)]
enum Reply {
    Grade,
    Unauthorized,
    ServerError,
    Garbage,
}

#[derive(Clone)]
struct FakeScoring {
    reply: Arc<Mutex<Reply>>,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl FakeScoring {
    fn new(reply: Reply) -> Self {
        Self {
            reply: Arc::new(Mutex::new(reply)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    fn seen(&self) -> Vec<(Option<String>, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn submit_handler(
    State(state): State<FakeScoring>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((auth, body.clone()));

    let reply = *state.reply.lock().unwrap();
    match reply {
        Reply::Grade => {
            let answered = body["answers"].as_array().map_or(0, Vec::len);
            Json(json!({
                "obtainedMarks": answered,
                "totalMarks": 3,
                "passed": answered >= 2
            }))
            .into_response()
        }
        Reply::Unauthorized => (StatusCode::UNAUTHORIZED, "token expired").into_response(),
        Reply::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Reply::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}

/// Spawns the fake service and returns its base url.
async fn spawn_fake(state: FakeScoring) -> Url {
    let router = Router::new()
        .route("/api/submit", post(submit_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    Url::parse(&format!("http://{addr}/api")).unwrap()
}

fn client(base: &Url, creds: &Arc<StaticCredentials>) -> HttpScoringClient {
    let creds: Arc<dyn CredentialProvider> = creds.clone();
    HttpScoringClient::new(base, creds, Duration::from_secs(5)).unwrap()
}

fn payload() -> SubmissionPayload {
    SubmissionPayload {
        quiz_id: QuizId::new(77),
        answers: vec![
            AnswerEntry {
                question_id: QuestionId::new(1),
                selected_option_indexes: vec![2],
            },
            AnswerEntry {
                question_id: QuestionId::new(3),
                selected_option_indexes: vec![0],
            },
        ],
    }
}

#[tokio::test]
async fn posts_payload_with_bearer_token() {
    let fake = FakeScoring::new(Reply::Grade);
    let base = spawn_fake(fake.clone()).await;
    let creds = Arc::new(StaticCredentials::new(Some("tok-123".into())));

    let result = client(&base, &creds).submit(&payload()).await.unwrap();
    assert_eq!(
        result,
        ExamResult {
            obtained_marks: 2.0,
            total_marks: 3.0,
            passed: true,
        }
    );

    let seen = fake.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.as_deref(), Some("Bearer tok-123"));
    assert_eq!(
        seen[0].1,
        json!({
            "quizId": 77,
            "answers": [
                { "questionId": 1, "selectedOptionIndexes": [2] },
                { "questionId": 3, "selectedOptionIndexes": [0] }
            ]
        })
    );
}

#[tokio::test]
async fn anonymous_requests_carry_no_auth_header() {
    let fake = FakeScoring::new(Reply::Grade);
    let base = spawn_fake(fake.clone()).await;
    let creds = Arc::new(StaticCredentials::anonymous());

    client(&base, &creds).submit(&payload()).await.unwrap();
    assert_eq!(fake.seen()[0].0, None);
}

#[tokio::test]
async fn unauthorized_invalidates_credentials() {
    let fake = FakeScoring::new(Reply::Unauthorized);
    let base = spawn_fake(fake.clone()).await;
    let creds = Arc::new(StaticCredentials::new(Some("stale".into())));

    let err = client(&base, &creds).submit(&payload()).await.unwrap_err();
    assert!(matches!(err, ScoringError::Unauthorized));
    assert!(!creds.is_signed_in());
}

#[tokio::test]
async fn server_errors_surface_status() {
    let fake = FakeScoring::new(Reply::ServerError);
    let base = spawn_fake(fake).await;
    let creds = Arc::new(StaticCredentials::anonymous());

    let err = client(&base, &creds).submit(&payload()).await.unwrap_err();
    assert!(matches!(
        err,
        ScoringError::HttpStatus(status) if status.as_u16() == 500
    ));
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let fake = FakeScoring::new(Reply::Garbage);
    let base = spawn_fake(fake).await;
    let creds = Arc::new(StaticCredentials::anonymous());

    let err = client(&base, &creds).submit(&payload()).await.unwrap_err();
    assert!(matches!(err, ScoringError::Decode(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let creds = Arc::new(StaticCredentials::anonymous());
    let base = Url::parse("http://127.0.0.1:9/api").unwrap();

    let err = client(&base, &creds).submit(&payload()).await.unwrap_err();
    assert!(matches!(err, ScoringError::Http(_) | ScoringError::Timeout(_)));
}

#[tokio::test]
async fn exam_retries_after_server_error_over_http() {
    let fake = FakeScoring::new(Reply::ServerError);
    let base = spawn_fake(fake.clone()).await;
    let creds = Arc::new(StaticCredentials::new(Some("tok".into())));
    let notifier = RecordingNotifier::confirming();

    let deps = ExamDeps::new(Arc::new(client(&base, &creds)), Arc::new(notifier.clone()));
    let exam = ExamController::start(
        ExamRequest {
            quiz_id: QuizId::new(5),
            kind: QuizKind::Grand,
            questions: Some(
                r#"[
                    { "id": 1, "text": "Q1", "options": ["a", "b", "c", "d"] },
                    { "id": 2, "text": "Q2", "options": ["a", "b", "c", "d"] },
                    { "id": 3, "text": "Q3", "options": ["a", "b", "c", "d"] }
                ]"#
                .to_string(),
            ),
        },
        deps,
    )
    .unwrap();

    exam.select_option(0, 1);
    exam.select_option(1, 3);

    let err = exam.submit(SubmitTrigger::Manual).await.unwrap_err();
    assert!(matches!(err, ExamError::Scoring(ScoringError::HttpStatus(_))));
    assert_eq!(exam.status(), ExamStatus::InProgress);

    fake.set_reply(Reply::Grade);
    let outcome = exam.submit(SubmitTrigger::Manual).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Submitted(r) if r.passed));
    assert_eq!(exam.view().result.unwrap().percentage, "66.67%");
    assert_eq!(fake.seen().len(), 2);
}
