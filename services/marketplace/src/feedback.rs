use chrono::NaiveDate;
use sqlx::PgPool;

use tutorfind_common::{AppError, TutorId, UserId};
use tutorfind_database::{Feedback, Subject, User};

use crate::models::{CreateFeedbackRequest, FeedbackResponse};
use crate::notifications::{events, NotificationService};
use crate::state::AppState;

/// Private tutor-to-learner feedback. Visible only to the tutor who wrote it
/// and the learner it is about; never part of the public rating.
pub struct FeedbackService {
    db_pool: PgPool,
    notifications: NotificationService,
}

impl FeedbackService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            notifications: NotificationService::new(state),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self {
            notifications: NotificationService::with_pool(db_pool.clone()),
            db_pool,
        }
    }

    pub async fn create_feedback(
        &self,
        tutor_id: TutorId,
        request: CreateFeedbackRequest,
    ) -> Result<FeedbackResponse, AppError> {
        let text = request.feedback_text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Feedback text is required".to_string()));
        }

        let learner_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(request.learner_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !learner_exists {
            return Err(AppError::NotFound("Learner not found".to_string()));
        }

        let session_date = request
            .session_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| AppError::Validation(format!("Malformed session date: {}", d)))
            })
            .transpose()?;

        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback
                (tutor_id, learner_id, booking_id, subject_id, feedback_text,
                 strengths, areas_for_improvement, session_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tutor_id)
        .bind(request.learner_id)
        .bind(request.booking_id)
        .bind(request.subject_id)
        .bind(text)
        .bind(&request.strengths)
        .bind(&request.areas_for_improvement)
        .bind(session_date)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.notifications.dispatch(
            feedback.learner_id,
            events::FEEDBACK_ADDED,
            serde_json::json!({ "feedbackId": feedback.id }),
        );

        self.build_response(feedback).await
    }

    /// Feedback the learner has received.
    pub async fn feedback_for_learner(
        &self,
        learner_id: UserId,
    ) -> Result<Vec<FeedbackResponse>, AppError> {
        let rows = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE learner_id = $1 ORDER BY created_at DESC",
        )
        .bind(learner_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(rows).await
    }

    /// Feedback the tutor has given.
    pub async fn feedback_by_tutor(
        &self,
        tutor_id: TutorId,
    ) -> Result<Vec<FeedbackResponse>, AppError> {
        let rows = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE tutor_id = $1 ORDER BY created_at DESC",
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(rows).await
    }

    async fn build_responses(
        &self,
        rows: Vec<Feedback>,
    ) -> Result<Vec<FeedbackResponse>, AppError> {
        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            responses.push(self.build_response(row).await?);
        }
        Ok(responses)
    }

    async fn build_response(&self, feedback: Feedback) -> Result<FeedbackResponse, AppError> {
        let learner = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(feedback.learner_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        let tutor_name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.first_name || ' ' || u.last_name
            FROM tutor_profiles tp JOIN users u ON u.id = tp.user_id
            WHERE tp.id = $1
            "#,
        )
        .bind(feedback.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let subject_name = match feedback.subject_id {
            Some(subject_id) => {
                sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
                    .bind(subject_id)
                    .fetch_optional(&self.db_pool)
                    .await
                    .map_err(AppError::Database)?
                    .map(|s| s.name)
            }
            None => None,
        };

        Ok(FeedbackResponse {
            id: feedback.id,
            tutor_id: feedback.tutor_id,
            tutor_name,
            learner_id: feedback.learner_id,
            learner_name: learner.map(|u| u.full_name()),
            subject_name,
            feedback_text: feedback.feedback_text,
            strengths: feedback.strengths,
            areas_for_improvement: feedback.areas_for_improvement,
            session_date: feedback.session_date,
            created_at: feedback.created_at,
        })
    }
}
