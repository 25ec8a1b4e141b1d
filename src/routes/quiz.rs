use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::quiz_dto::{
    QuizQuery, QuizResponse, SubmitQuizRequest, SubmitQuizResponse, SubmitResults,
};
use crate::error::Error;
use crate::middleware::auth::AuthUser;
use crate::models::question::Question;
use crate::services::chart_service::{ChartQuestion, ChartSpec};
use crate::services::grading_service::GradingService;
use crate::utils::time::{now_millis, to_millis_iso};
use crate::AppState;

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<QuizQuery>,
) -> crate::error::Result<Response> {
    let subject = query.subject.trim();
    if subject.is_empty() {
        return Err(Error::BadRequest("Subject and level are required".to_string()));
    }
    if query.level < 1 {
        return Err(Error::BadRequest("level must be a positive number".to_string()));
    }

    let questions = state.content.question_set(subject, query.level).await?;
    Ok(Json(QuizResponse {
        success: true,
        subject: subject.to_string(),
        level: query.level,
        questions,
    })
    .into_response())
}

/// Grade, maybe-unlock, record, maybe-chart. Store failures after grading
/// degrade to warnings: the graded result always reaches the caller, and
/// a failed unlock never rolls back a recorded attempt (or vice versa).
/// The grade/unlock/record sequence runs on a detached task: the request
/// future is dropped when the client disconnects, and accepted work must
/// still commit.
#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubmitQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    if req.declared_total() > req.questions.len() {
        return Err(Error::BadRequest(
            "totalQuestions exceeds the submitted question set".to_string(),
        ));
    }
    let subject = req.subject.trim().to_string();
    let answers = req.typed_answers()?;
    let questions = req.questions;
    let level = req.level;
    let user_id = user.id;

    let task_state = state.clone();
    let task_subject = subject.clone();
    let handle = tokio::spawn(async move {
        let snapshot: Vec<Option<&Question>> = questions.iter().map(|q| q.as_ref()).collect();
        let outcome = GradingService::grade_snapshot(&snapshot, &answers);
        tracing::info!(
            user_id = %user_id,
            subject = %task_subject,
            level,
            score = outcome.score,
            total = outcome.total,
            passed = outcome.passed,
            "quiz graded"
        );

        let unlock = task_state
            .unlock
            .apply(user_id, &task_subject, level, &outcome)
            .await;
        let recorded = task_state
            .recorder
            .record(user_id, &task_subject, level, &snapshot, &answers, &outcome)
            .await;

        let chart_questions: Vec<ChartQuestion> = (1..=outcome.total)
            .map(|number| {
                let idx = (number - 1) as usize;
                let is_correct = snapshot
                    .get(idx)
                    .and_then(|slot| *slot)
                    .map(|q| answers.get(&idx) == Some(&q.correct))
                    .unwrap_or(false);
                ChartQuestion {
                    question_number: number,
                    is_correct,
                }
            })
            .collect();

        (outcome, unlock, recorded, chart_questions)
    });
    let (outcome, unlock, recorded, chart_questions) = handle
        .await
        .map_err(|e| Error::Internal(format!("Submission task failed: {}", e)))?;

    let mut warnings = Vec::new();
    if let Some(warning) = unlock.warning {
        warnings.push(warning);
    }

    let attempt_at = match recorded {
        Ok(at) => at,
        Err(e) => {
            tracing::error!(user_id = %user.id, subject, error = ?e, "attempt recording failed");
            warnings.push("Attempt could not be recorded to history".to_string());
            now_millis()
        }
    };

    let spec = ChartSpec {
        subject: subject.clone(),
        level,
        score: outcome.score,
        total: outcome.total,
        percentage: outcome.percentage(),
        passed: outcome.passed,
        questions: chart_questions,
        file_stem: format!(
            "{}_level{}_{}_{}",
            subject,
            level,
            user.id,
            attempt_at.timestamp_millis()
        ),
    };
    let plot_path = state.charts.render(&spec).await.into_path();

    Ok(Json(SubmitQuizResponse {
        success: true,
        passed: outcome.passed,
        results: SubmitResults {
            score: outcome.score,
            total: outcome.total,
            percentage: outcome.percentage(),
        },
        plot_path,
        highest_unlocked: unlock.highest_unlocked,
        timestamp: to_millis_iso(attempt_at),
        warnings,
    })
    .into_response())
}
