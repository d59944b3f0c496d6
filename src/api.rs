// API routes and handlers
use actix_web::http::StatusCode;
use actix_web::{error::BlockingError, post, web, App, HttpResponse, HttpServer, ResponseError};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::ServerArgs;
use crate::state::{AppState, ModelProvider};

#[derive(Debug, Deserialize)]
pub struct QaRequest {
    pub question: String,
    pub context: String,
    #[serde(default)]
    pub model_type: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    #[serde(
        rename = "Model_Type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model_type: Option<String>,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

/// The invocation event; only the body matters here.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyEvent {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    pub fn ok(answer: &QaAnswer) -> Result<Self, HandlerError> {
        let body = serde_json::to_string(answer).map_err(HandlerError::Encode)?;
        let headers = BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]);
        Ok(Self {
            status_code: 200,
            headers,
            body,
        })
    }

    /// Unwraps the envelope into a plain HTTP response.
    pub fn into_http(self) -> HttpResponse {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = HttpResponse::build(status);
        for (name, value) in &self.headers {
            builder.insert_header((name.as_str(), value.as_str()));
        }
        builder.body(self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("event has no body")]
    MissingBody,
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("failed to load model: {0:#}")]
    ModelLoad(anyhow::Error),
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
    #[error("failed to encode response: {0}")]
    Encode(serde_json::Error),
    #[error("inference worker unavailable")]
    Worker(#[from] BlockingError),
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    // Same answer the platform gives for an unhandled failure, details go to the log.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::InternalServerError()
            .json(serde_json::json!({ "message": "Internal Server Error" }))
    }
}

/// Decode, infer, format: the whole request flow of both handler variants.
pub async fn handle_event(
    state: &AppState,
    event: ProxyEvent,
) -> Result<ProxyResponse, HandlerError> {
    if state.take_cold_start() {
        info!("cold start: first invocation of {}", state.service_name);
    }
    info!("event: {:?}", event);

    let body = event.body.ok_or(HandlerError::MissingBody)?;
    let request: QaRequest = serde_json::from_str(&body)?;

    let provider = state.provider.clone();
    let answer = web::block(move || answer_request(provider.as_ref(), request)).await??;

    info!("Question: {}, Answer: {}", answer.question, answer.answer);
    ProxyResponse::ok(&answer)
}

fn answer_request(
    provider: &dyn ModelProvider,
    request: QaRequest,
) -> Result<QaAnswer, HandlerError> {
    let loaded = provider
        .acquire(request.model_type.as_deref())
        .map_err(HandlerError::ModelLoad)?;

    let started = Instant::now();
    let answer = loaded
        .model
        .answer(&request.question, &request.context)
        .map_err(HandlerError::Inference)?;
    info!("inference took {} ms", started.elapsed().as_millis());

    Ok(QaAnswer {
        model_type: loaded.model_type.map(|model_type| model_type.as_str().to_string()),
        question: request.question,
        answer,
    })
}

fn log_failure(err: HandlerError) -> HandlerError {
    error!("{err}");
    err
}

/// API gateway route: the request JSON is the HTTP body.
#[post("/")]
pub async fn answer_question(
    state: web::Data<AppState>,
    body: String,
) -> Result<HttpResponse, HandlerError> {
    let event = ProxyEvent { body: Some(body) };
    let response = handle_event(&state, event).await.map_err(log_failure)?;
    Ok(response.into_http())
}

/// Container invocation route: takes the full event, returns the envelope.
#[post("/2015-03-31/functions/function/invocations")]
pub async fn invoke(
    state: web::Data<AppState>,
    payload: web::Bytes,
) -> Result<HttpResponse, HandlerError> {
    let event: ProxyEvent = serde_json::from_slice(&payload).map_err(log_failure_json)?;
    let response = handle_event(&state, event).await.map_err(log_failure)?;
    Ok(HttpResponse::Ok().json(response))
}

fn log_failure_json(err: serde_json::Error) -> HandlerError {
    log_failure(HandlerError::MalformedBody(err))
}

/// Largest request the function platform will hand to a synchronous
/// invocation. Bodies up to this size must reach the handler.
pub const MAX_PAYLOAD_BYTES: usize = 6 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
        .service(answer_question)
        .service(invoke);
}

pub async fn serve(state: web::Data<AppState>, server: &ServerArgs) -> std::io::Result<()> {
    info!("listening on {}:{}", server.host, server.port);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind((server.host.as_str(), server.port))?
        .run()
        .await
}
