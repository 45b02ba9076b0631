//! Axum route handlers for the Session API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::coaching::format::{AssistantOutput, OutputFormat, Perspective};
use crate::coaching::session::{Role, Session, StartRequest, TranscriptEntry};
use crate::coaching::settings::{GenerationSettings, ALLOWED_MODELS};
use crate::coaching::store::SessionHandle;
use crate::errors::AppError;
use crate::extraction::UploadedDocument;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub output_format: OutputFormat,
    pub perspective: Perspective,
    pub output: AssistantOutput,
    pub transcript_len: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub settings: Option<GenerationSettings>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub output_format: OutputFormat,
    pub output: AssistantOutput,
    pub transcript_len: usize,
}

#[derive(Debug, Serialize)]
pub struct TranscriptView {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Assistant turns only: the content interpreted against the locked format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<AssistantOutput>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub output_format: OutputFormat,
    pub perspective: Perspective,
    pub settings: GenerationSettings,
    pub created_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptView>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub allowed_models: &'static [&'static str],
    pub defaults: GenerationSettings,
    pub output_formats: [OutputFormat; 3],
    pub perspectives: [Perspective; 2],
}

impl SessionView {
    fn from_session(session: &Session) -> Self {
        let transcript = session
            .transcript()
            .iter()
            .map(|entry| TranscriptView {
                role: entry.role,
                content: entry.content.clone(),
                created_at: entry.created_at,
                rendered: (entry.role == Role::Assistant).then(|| session.render(entry)),
            })
            .collect();

        SessionView {
            session_id: session.id(),
            output_format: session.output_format(),
            perspective: session.perspective(),
            settings: session.settings().clone(),
            created_at: session.created_at(),
            transcript,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/settings
///
/// Selectable models, default generation settings, formats and perspectives.
pub async fn handle_get_settings() -> Json<SettingsResponse> {
    Json(SettingsResponse {
        allowed_models: ALLOWED_MODELS,
        defaults: GenerationSettings::default(),
        output_formats: OutputFormat::ALL,
        perspectives: [Perspective::Interviewer, Perspective::Candidate],
    })
}

/// POST /api/v1/sessions
///
/// Multipart start action. Fields: `cv` and `jd` files, `perspective`,
/// optional `output_format` (default Text) and optional generation settings
/// (`model`, `temperature`, `top_p`, `frequency_penalty`, `presence_penalty`,
/// `max_tokens`). Locks format and perspective and returns the first reply.
pub async fn handle_start_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StartSessionResponse>), AppError> {
    let request = read_start_form(multipart).await?;
    let session = Session::start(request, state.llm.as_ref()).await?;

    let response = StartSessionResponse {
        session_id: session.id(),
        output_format: session.output_format(),
        perspective: session.perspective(),
        output: session.render(&session.transcript()[0]),
        transcript_len: session.transcript().len(),
    };
    state.sessions.insert(session).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionView>, AppError> {
    let Path(session_id) = path?;
    let handle = find_session(&state, session_id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView::from_session(&session)))
}

/// POST /api/v1/sessions/:id/messages
///
/// One chat turn in the session's locked format.
pub async fn handle_chat_turn(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Path(session_id) = path?;
    let Json(request) = body?;
    let handle = find_session(&state, session_id).await?;
    let mut session = handle.lock().await;

    let entry: TranscriptEntry = session
        .chat_turn(&request.message, request.settings, state.llm.as_ref())
        .await?
        .clone();

    Ok(Json(ChatResponse {
        session_id,
        output_format: session.output_format(),
        output: session.render(&entry),
        transcript_len: session.transcript().len(),
    }))
}

/// DELETE /api/v1/sessions/:id
///
/// Reset: the session and its transcript are dropped.
pub async fn handle_end_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(session_id) = path?;
    if state.sessions.remove(session_id).await {
        info!(session_id = %session_id, "Session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {session_id} not found")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn find_session(state: &AppState, session_id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}

async fn read_start_form(mut multipart: Multipart) -> Result<StartRequest, AppError> {
    let mut cv = None;
    let mut jd = None;
    let mut perspective = None;
    let mut output_format = OutputFormat::default();
    let mut settings = GenerationSettings::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "cv" | "jd" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation(format!("'{name}' must be a file upload")))?;
                let document = UploadedDocument::new(file_name, field.bytes().await?);
                if name == "cv" {
                    cv = Some(document);
                } else {
                    jd = Some(document);
                }
            }
            "perspective" => {
                let raw = field.text().await?;
                perspective = Some(Perspective::parse(&raw).ok_or_else(|| {
                    AppError::Validation(format!(
                        "perspective must be 'interviewer' or 'candidate', got '{raw}'"
                    ))
                })?);
            }
            "output_format" => {
                let raw = field.text().await?;
                output_format = OutputFormat::parse(&raw).ok_or_else(|| {
                    AppError::Validation(format!(
                        "output_format must be Text, JSON_A or JSON_B, got '{raw}'"
                    ))
                })?;
            }
            _ => {
                let raw = field.text().await?;
                settings.set_field(&name, &raw)?;
            }
        }
    }

    let (Some(cv), Some(jd)) = (cv, jd) else {
        return Err(AppError::Validation(
            "Please upload both CV and Job Description.".to_string(),
        ));
    };
    let perspective = perspective
        .ok_or_else(|| AppError::Validation("perspective is required".to_string()))?;

    Ok(StartRequest {
        cv,
        jd,
        perspective,
        output_format,
        settings,
    })
}
