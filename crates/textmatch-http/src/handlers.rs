use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use textmatch_core::error::Error;
use textmatch_core::types::{IngestMode, IngestReport, IngestRequest, MatchesByTerm, Unit};

use crate::error::ApiError;
use crate::AppState;

const NO_RESULTS: &str = "No results found";

/// Body of `POST /insert`, accepted as JSON or as a urlencoded form.
#[derive(Debug, Deserialize)]
pub struct InsertPayload {
    pub text: Option<String>,
    #[serde(default)]
    pub mode: IngestMode,
    pub paragraph_number: Option<u64>,
    pub id: Option<String>,
}

impl InsertPayload {
    fn into_request(self) -> Result<IngestRequest, ApiError> {
        let text = self.text.ok_or_else(|| Error::validation("text field is required"))?;
        Ok(IngestRequest { text, mode: self.mode, paragraph_number: self.paragraph_number, id: self.id })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub word: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub matches: Vec<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct ParagraphParams {
    pub paragraph: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParagraphResponse {
    #[serde(rename = "matchesByTerm")]
    pub matches_by_term: MatchesByTerm,
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

pub async fn insert(State(service): State<AppState>, request: Request) -> Result<Json<IngestReport>, ApiError> {
    let payload = if is_form(request.headers()) {
        let Form(payload) = Form::<InsertPayload>::from_request(request, &())
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        payload
    } else {
        let Json(payload) = Json::<InsertPayload>::from_request(request, &())
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        payload
    };
    let report = service.ingest(payload.into_request()?).await?;
    Ok(Json(report))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    let Query(params) = query.map_err(|rejection| Error::validation(rejection.body_text()))?;
    Ok(params)
}

pub async fn search(
    State(service): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = query_params(query)?;
    // `query` wins over `word` unless it is blank.
    let term = [params.query, params.word]
        .into_iter()
        .flatten()
        .find(|term| !term.trim().is_empty())
        .unwrap_or_default();
    let matches = service.query_with_limit(&term, params.limit).await?;
    let message = matches.is_empty().then_some(NO_RESULTS);
    Ok(Json(SearchResponse { matches, message }))
}

pub async fn paragraph(
    State(service): State<AppState>,
    query: Result<Query<ParagraphParams>, QueryRejection>,
) -> Result<Json<ParagraphResponse>, ApiError> {
    let params = query_params(query)?;
    let paragraph = params.paragraph.unwrap_or_default();
    let matches_by_term = service.query_paragraph(&paragraph).await?;
    Ok(Json(ParagraphResponse { matches_by_term }))
}

pub async fn health(State(service): State<AppState>) -> (StatusCode, Json<Value>) {
    if service.health().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
    }
}
