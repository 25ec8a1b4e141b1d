use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::dto::quiz_dto::{DetailsQuery, DetailsResponse, HistoryResponse, QuizDetails};
use crate::error::Error;
use crate::middleware::auth::AuthUser;
use crate::services::chart_service::{ChartQuestion, ChartSpec};
use crate::utils::time::parse_client_timestamp;
use crate::AppState;

#[axum::debug_handler]
pub async fn quiz_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let history = state.history.list_attempts(user.id).await?;
    Ok(Json(HistoryResponse {
        success: true,
        history,
    })
    .into_response())
}

/// Replays one attempt from the durable log and renders its chart on
/// demand. Chart failure leaves `plotPath` null; the breakdown is always
/// served from what was recorded.
#[axum::debug_handler]
pub async fn quiz_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DetailsQuery>,
) -> crate::error::Result<Response> {
    let subject = query.subject.trim();
    if subject.is_empty() {
        return Err(Error::BadRequest("subject is required".to_string()));
    }
    if query.level < 1 {
        return Err(Error::BadRequest("level must be a positive number".to_string()));
    }
    let approx = parse_client_timestamp(&query.timestamp)
        .ok_or_else(|| Error::BadRequest("timestamp is not a valid ISO-8601 value".to_string()))?;

    let detail = state
        .history
        .attempt_detail(user.id, subject, query.level, approx)
        .await?
        .ok_or_else(|| Error::NotFound("No attempt found for that subject, level and time".to_string()))?;

    let spec = ChartSpec {
        subject: detail.summary.subject.clone(),
        level: detail.summary.level,
        score: detail.summary.total_score,
        total: detail.summary.total_questions,
        percentage: detail.summary.percentage,
        passed: detail.summary.passed,
        questions: detail
            .questions
            .iter()
            .map(|q| ChartQuestion {
                question_number: q.question_number,
                is_correct: q.is_correct,
            })
            .collect(),
        file_stem: format!(
            "{}_level{}_{}_{}",
            detail.summary.subject,
            detail.summary.level,
            user.id,
            approx.timestamp_millis()
        ),
    };
    let plot_path = state.charts.render(&spec).await.into_path();

    Ok(Json(DetailsResponse {
        success: true,
        details: QuizDetails {
            questions: detail.questions,
            summary: detail.summary,
            plot_path,
        },
    })
    .into_response())
}
