use crate::assistant::Assistant;
use crate::flows::GenerationError;
use crate::models::chat::{ Conversation, ConversationSummary };
use crate::models::language::Language;
use crate::schema::{
    Contract,
    GenerateCodeSnippet,
    GenerateQuiz,
    GetTopicInformation,
    GetTopicsForLanguage,
    StepwiseGuidance,
};
use crate::views::{
    CodeGeneratorView,
    LearningPath,
    QuizProgress,
    QuizView,
    SessionStore,
    StepwiseGuideView,
    ViewError,
};

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ Path, State },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use serde::{ Deserialize, Serialize };
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

/// Single-user panels served over HTTP.
#[derive(Debug, Default)]
pub struct Workspace {
    pub code: CodeGeneratorView,
    pub guide: StepwiseGuideView,
    pub learning: LearningPath,
    pub quiz: QuizView,
}

#[derive(Clone)]
pub struct AppState {
    assistant: Arc<Assistant>,
    store: SessionStore,
    workspace: Arc<Mutex<Workspace>>,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>, store: SessionStore) -> Self {
        Self {
            assistant,
            store,
            workspace: Arc::new(Mutex::new(Workspace::default())),
        }
    }
}

pub struct ApiError(ViewError);

impl From<ViewError> for ApiError {
    fn from(e: ViewError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ViewError::Validation(e) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": e.fields }))).into_response()
            }
            e @ ViewError::UnknownOption(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": e.to_string() }))).into_response()
            }
            e @ (ViewError::Busy | ViewError::WrongState { .. }) => {
                (StatusCode::CONFLICT, Json(json!({ "message": e.to_string() }))).into_response()
            }
            e @ ViewError::ConversationNotFound(_) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": e.to_string() }))).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct CodeBody {
    pub description: String,
}

#[derive(Deserialize)]
pub struct GuideBody {
    pub query: String,
}

#[derive(Deserialize)]
pub struct LanguageBody {
    pub language: Language,
}

#[derive(Deserialize)]
pub struct TopicBody {
    pub topic: String,
}

#[derive(Deserialize, Default)]
pub struct QuizStartBody {
    pub language: Option<Language>,
}

#[derive(Deserialize)]
pub struct OptionBody {
    pub option: String,
}

#[derive(Serialize)]
struct LanguageInfo {
    id: &'static str,
    name: &'static str,
    learnable: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevealResponse {
    correct: bool,
    correct_answer: Option<String>,
    quiz: QuizView,
}

#[derive(Serialize)]
struct NextResponse {
    progress: QuizProgress,
    quiz: QuizView,
}

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/languages", get(languages_handler))
        .route("/api/chats", get(list_chats_handler))
        .route("/api/chats/{id}", get(get_chat_handler))
        .route("/api/code", post(code_handler))
        .route("/api/guide", post(guide_handler))
        .route("/api/learn", get(learn_handler))
        .route("/api/learn/language", post(learn_language_handler))
        .route("/api/learn/topic", post(learn_topic_handler))
        .route("/api/learn/back", post(learn_back_handler))
        .route("/api/learn/dismiss", post(learn_dismiss_handler))
        .route("/api/learn/exit", post(learn_exit_handler))
        .route("/api/quiz", get(quiz_handler))
        .route("/api/quiz/start", post(quiz_start_handler))
        .route("/api/quiz/select", post(quiz_select_handler))
        .route("/api/quiz/reveal", post(quiz_reveal_handler))
        .route("/api/quiz/next", post(quiz_next_handler))
        .route("/api/quiz/exit", post(quiz_exit_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    http_port: u16,
    assistant: Arc<Assistant>,
    store: SessionStore,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(AppState::new(assistant, store));

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            },
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            }
        }
    });
    info!("HTTP server started");

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn languages_handler() -> Json<Vec<LanguageInfo>> {
    Json(
        Language::ALL.iter()
            .map(|l| LanguageInfo {
                id: l.id(),
                name: l.display_name(),
                learnable: l.is_learnable(),
            })
            .collect()
    )
}

async fn list_chats_handler(State(state): State<AppState>) -> Json<Vec<ConversationSummary>> {
    Json(state.store.lock().await.summaries())
}

async fn get_chat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Conversation> {
    let store = state.store.lock().await;
    let conversation = store.get(&id).ok_or(ViewError::ConversationNotFound(id.clone()))?;
    Ok(Json(conversation.clone()))
}

/// A panel left in its loading state while the model call runs. If the handler future
/// is dropped before `settle`, the abandon hook runs so the panel becomes usable again.
struct PendingCall<F>
    where F: FnOnce(&mut Workspace) + Send + 'static
{
    workspace: Arc<Mutex<Workspace>>,
    abandon: Option<F>,
}

impl<F> PendingCall<F>
    where F: FnOnce(&mut Workspace) + Send + 'static
{
    fn new(workspace: &Arc<Mutex<Workspace>>, abandon: F) -> Self {
        Self {
            workspace: Arc::clone(workspace),
            abandon: Some(abandon),
        }
    }

    async fn settle<T>(mut self, apply: impl FnOnce(&mut Workspace) -> T) -> T {
        let workspace = Arc::clone(&self.workspace);
        let mut guard = workspace.lock().await;
        self.abandon = None;
        apply(&mut guard)
    }
}

impl<F> Drop for PendingCall<F>
    where F: FnOnce(&mut Workspace) + Send + 'static
{
    fn drop(&mut self) {
        let Some(abandon) = self.abandon.take() else {
            return;
        };
        warn!("Request dropped before its generation call settled");
        match self.workspace.try_lock() {
            Ok(mut guard) => abandon(&mut guard),
            Err(_) => {
                let workspace = Arc::clone(&self.workspace);
                tokio::spawn(async move {
                    abandon(&mut *workspace.lock().await);
                });
            }
        }
    }
}

fn cancelled(task: &'static str) -> GenerationError {
    GenerationError::Cancelled { task }
}

// The workspace lock is never held across a model call.

async fn code_handler(
    State(state): State<AppState>,
    Json(body): Json<CodeBody>,
) -> ApiResult<CodeGeneratorView> {
    let request = state.workspace.lock().await.code.begin(&body.description)?;
    let call = PendingCall::new(&state.workspace, |w: &mut Workspace| {
        w.code.finish(Err(cancelled(GenerateCodeSnippet::NAME)))
    });
    let outcome = state.assistant.generator().generate_code_snippet(&request).await;
    let code = call.settle(|w| {
        w.code.finish(outcome);
        w.code.clone()
    }).await;
    Ok(Json(code))
}

async fn guide_handler(
    State(state): State<AppState>,
    Json(body): Json<GuideBody>,
) -> ApiResult<StepwiseGuideView> {
    let request = state.workspace.lock().await.guide.begin(&body.query)?;
    let call = PendingCall::new(&state.workspace, |w: &mut Workspace| {
        w.guide.finish(Err(cancelled(StepwiseGuidance::NAME)))
    });
    let outcome = state.assistant.generator().stepwise_guidance_with_examples(&request).await;
    let guide = call.settle(|w| {
        w.guide.finish(outcome);
        w.guide.clone()
    }).await;
    Ok(Json(guide))
}

async fn learn_handler(State(state): State<AppState>) -> Json<LearningPath> {
    Json(state.workspace.lock().await.learning.clone())
}

async fn learn_language_handler(
    State(state): State<AppState>,
    Json(body): Json<LanguageBody>,
) -> ApiResult<LearningPath> {
    let request = state.workspace.lock().await.learning.begin_language(body.language)?;
    let call = PendingCall::new(&state.workspace, |w: &mut Workspace| {
        w.learning.finish_language(Err(cancelled(GetTopicsForLanguage::NAME)))
    });
    let outcome = state.assistant.generator().get_topics_for_language(&request).await;
    let learning = call.settle(|w| {
        w.learning.finish_language(outcome);
        w.learning.clone()
    }).await;
    Ok(Json(learning))
}

async fn learn_topic_handler(
    State(state): State<AppState>,
    Json(body): Json<TopicBody>,
) -> ApiResult<LearningPath> {
    let request = state.workspace.lock().await.learning.begin_topic(&body.topic)?;
    let call = PendingCall::new(&state.workspace, |w: &mut Workspace| {
        w.learning.finish_topic(Err(cancelled(GetTopicInformation::NAME)))
    });
    let outcome = state.assistant.generator().get_topic_information(&request).await;
    let learning = call.settle(|w| {
        w.learning.finish_topic(outcome);
        w.learning.clone()
    }).await;
    Ok(Json(learning))
}

async fn learn_back_handler(State(state): State<AppState>) -> ApiResult<LearningPath> {
    let mut workspace = state.workspace.lock().await;
    workspace.learning.back()?;
    Ok(Json(workspace.learning.clone()))
}

async fn learn_dismiss_handler(State(state): State<AppState>) -> ApiResult<LearningPath> {
    let mut workspace = state.workspace.lock().await;
    workspace.learning.dismiss_error()?;
    Ok(Json(workspace.learning.clone()))
}

async fn learn_exit_handler(State(state): State<AppState>) -> ApiResult<LearningPath> {
    let mut workspace = state.workspace.lock().await;
    workspace.learning.exit()?;
    Ok(Json(workspace.learning.clone()))
}

async fn quiz_handler(State(state): State<AppState>) -> Json<QuizView> {
    Json(state.workspace.lock().await.quiz.clone())
}

async fn quiz_start_handler(
    State(state): State<AppState>,
    Json(body): Json<QuizStartBody>,
) -> ApiResult<QuizView> {
    let request = {
        let mut workspace = state.workspace.lock().await;
        if let Some(language) = body.language {
            workspace.quiz.select_language(language)?;
        }
        workspace.quiz.begin_start()?
    };
    let call = PendingCall::new(&state.workspace, |w: &mut Workspace| {
        w.quiz.finish_start(Err(cancelled(GenerateQuiz::NAME)))
    });
    let outcome = state.assistant.generator().generate_quiz(&request).await;
    let quiz = call.settle(|w| {
        w.quiz.finish_start(outcome);
        w.quiz.clone()
    }).await;
    Ok(Json(quiz))
}

async fn quiz_select_handler(
    State(state): State<AppState>,
    Json(body): Json<OptionBody>,
) -> ApiResult<QuizView> {
    let mut workspace = state.workspace.lock().await;
    workspace.quiz.select_option(&body.option)?;
    Ok(Json(workspace.quiz.clone()))
}

async fn quiz_reveal_handler(State(state): State<AppState>) -> ApiResult<RevealResponse> {
    let mut workspace = state.workspace.lock().await;
    let correct = workspace.quiz.reveal()?;
    let correct_answer = workspace.quiz.current_question().map(|q| q.correct_answer.clone());
    Ok(Json(RevealResponse {
        correct,
        correct_answer,
        quiz: workspace.quiz.clone(),
    }))
}

async fn quiz_next_handler(State(state): State<AppState>) -> ApiResult<NextResponse> {
    let mut workspace = state.workspace.lock().await;
    let progress = workspace.quiz.next()?;
    Ok(Json(NextResponse {
        progress,
        quiz: workspace.quiz.clone(),
    }))
}

async fn quiz_exit_handler(State(state): State<AppState>) -> ApiResult<QuizView> {
    let mut workspace = state.workspace.lock().await;
    workspace.quiz.exit()?;
    Ok(Json(workspace.quiz.clone()))
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.assistant.reload_prompts_if_changed() {
        Ok(true) => (StatusCode::OK, Json(ReloadResponse {
            success: true,
            message: "Prompts reloaded".into(),
        })),
        Ok(false) => (StatusCode::OK, Json(ReloadResponse {
            success: true,
            message: "Prompts unchanged".into(),
        })),
        Err(e) => {
            error!("Prompt reload failed: {}", e);
            (StatusCode::BAD_REQUEST, Json(ReloadResponse {
                success: false,
                message: format!("Reload error: {}", e),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::PromptConfig;
    use crate::flows::testing::{ ok, ScriptedClient };
    use crate::views::ConversationStore;
    use crate::models::chat::ChatMessage;
    use crate::llm::chat::{ ChatClient, CompletionResponse };
    use crate::views::learning::TOPICS_FAILURE_MESSAGE;
    use crate::views::quiz::QUIZ_FAILURE_MESSAGE;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Never answers, so a request only ends when its future is dropped.
    struct StalledClient;

    #[async_trait]
    impl ChatClient for StalledClient {
        async fn complete(
            &self,
            _prompt: &str
        ) -> Result<CompletionResponse, Box<dyn std::error::Error + Send + Sync>> {
            std::future::pending().await
        }

        fn get_model(&self) -> String {
            "stalled".to_string()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    fn app_for(client: Arc<dyn ChatClient>) -> (Router, SessionStore) {
        let prompts = Arc::new(PromptConfig::builtin().unwrap());
        let assistant = Arc::new(Assistant::from_parts(client, prompts, None));
        let store = ConversationStore::shared();
        (router(AppState::new(assistant, store.clone())), store)
    }

    fn app_with(replies: Vec<Result<String, String>>) -> (Router, Arc<ScriptedClient>, SessionStore) {
        let client = ScriptedClient::replying(replies);
        let (app, store) = app_for(client.clone());
        (app, client, store)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_and_languages() {
        let (app, _, _) = app_with(vec![]);

        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = call(&app, "GET", "/api/languages", None).await;
        let languages = body.as_array().unwrap();
        assert_eq!(languages.len(), 15);
        assert_eq!(languages.iter().filter(|l| l["learnable"] == true).count(), 12);
    }

    #[tokio::test]
    async fn code_generation_validates_then_generates() {
        let (app, client, _) = app_with(vec![ok(json!({ "code": "def add(a, b):\n    return a + b" }))]);

        let (status, body) = call(&app, "POST", "/api/code", Some(json!({ "description": "add" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["description"][0], "Please provide a description of at least 10 characters.");
        assert_eq!(client.calls(), 0);

        let (status, body) = call(
            &app,
            "POST",
            "/api/code",
            Some(json!({ "description": "A Python function that adds numbers" }))
        ).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["panel"]["status"], "ready");
        assert_eq!(body["panel"]["data"], "def add(a, b):\n    return a + b");
    }

    #[tokio::test]
    async fn guide_failure_is_reported_in_the_snapshot() {
        let (app, _, _) = app_with(vec![Err("offline".into())]);

        let (status, body) = call(
            &app,
            "POST",
            "/api/guide",
            Some(json!({ "query": "Configure logging in a Rust service" }))
        ).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["panel"]["status"], "failed");
        assert_eq!(body["panel"]["data"], "Failed to generate guidance. Please try again.");
    }

    #[tokio::test]
    async fn learning_path_over_http() {
        let (app, _, _) = app_with(vec![
            ok(json!({ "topics": ["Closures", "Promises"] })),
            ok(json!({
                "title": "Closures",
                "introduction": "Functions that capture scope.",
                "sections": [
                    { "title": "Basics", "explanation": "Capture." },
                    { "title": "Patterns", "explanation": "Module pattern." }
                ]
            })),
        ]);

        let (status, body) = call(&app, "POST", "/api/learn/language", Some(json!({ "language": "javascript" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "select_topic");

        let (status, body) = call(&app, "POST", "/api/learn/topic", Some(json!({ "topic": "Closures" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "view_content");
        assert_eq!(body["content"]["title"], "Closures");

        let (_, body) = call(&app, "POST", "/api/learn/exit", None).await;
        assert_eq!(body["step"], "select_language");
    }

    #[tokio::test]
    async fn quiz_rules_map_to_status_codes() {
        let (app, _, _) = app_with(vec![ok(json!({
            "questions": [{
                "question": "Which keyword defines a function?",
                "options": ["func", "def", "fn", "lambda"],
                "correctAnswer": "def",
                "explanation": "def introduces a function."
            }]
        }))]);

        let (status, _) = call(&app, "POST", "/api/quiz/select", Some(json!({ "option": "def" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, "POST", "/api/quiz/start", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["language"][0], "Please select a language.");

        let (status, body) = call(&app, "POST", "/api/quiz/start", Some(json!({ "language": "Python" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "in_progress");

        let (status, _) = call(&app, "POST", "/api/quiz/select", Some(json!({ "option": "var" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        call(&app, "POST", "/api/quiz/select", Some(json!({ "option": "def" }))).await;
        let (_, body) = call(&app, "POST", "/api/quiz/reveal", None).await;
        assert_eq!(body["correct"], true);
        assert_eq!(body["correctAnswer"], "def");

        let (_, body) = call(&app, "POST", "/api/quiz/next", None).await;
        assert_eq!(body["progress"], "finished");
        assert_eq!(body["quiz"]["phase"], "setup");
    }

    #[tokio::test]
    async fn dropped_request_leaves_panels_usable() {
        let (app, _) = app_for(Arc::new(StalledClient));

        let pending = call(&app, "POST", "/api/quiz/start", Some(json!({ "language": "Python" })));
        assert!(tokio::time::timeout(Duration::from_millis(100), pending).await.is_err());

        let (_, body) = call(&app, "GET", "/api/quiz", None).await;
        assert_eq!(body["loading"], false);
        assert_eq!(body["error"], QUIZ_FAILURE_MESSAGE);
        let (status, _) = call(&app, "POST", "/api/quiz/exit", None).await;
        assert_eq!(status, StatusCode::OK);

        let pending = call(&app, "POST", "/api/learn/language", Some(json!({ "language": "javascript" })));
        assert!(tokio::time::timeout(Duration::from_millis(100), pending).await.is_err());

        let (_, body) = call(&app, "GET", "/api/learn", None).await;
        assert_eq!(body["error"], TOPICS_FAILURE_MESSAGE);
        let (status, body) = call(&app, "POST", "/api/learn/back", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "select_language");
    }

    #[tokio::test]
    async fn chats_are_read_from_the_shared_store() {
        let (app, _, store) = app_with(vec![]);
        let id = store.lock().await.record_exchange(None, ChatMessage::user("hello there"), ChatMessage::failure());

        let (_, body) = call(&app, "GET", "/api/chats", None).await;
        assert_eq!(body[0]["title"], "hello there...");
        assert_eq!(body[0]["messageCount"], 2);

        let (status, body) = call(&app, "GET", &format!("/api/chats/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"][1]["content"]["type"], "error");

        let (status, _) = call(&app, "GET", "/api/chats/chat-unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reload_with_embedded_prompts_is_a_no_op() {
        let (app, _, _) = app_with(vec![]);
        let (status, body) = call(&app, "GET", "/api/reload-prompts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Prompts unchanged");
    }
}
