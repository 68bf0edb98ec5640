use serde::Serialize;
use sqlx::PgPool;

use tutorfind_common::{
    AppError, FlagContentType, FlagStatus, Page, ReviewStatus, TutorId, UserId,
};
use tutorfind_database::{Flag, Review, TutorProfile};

use crate::models::CreateFlagRequest;
use crate::reviews::recompute_tutor_rating;
use crate::state::AppState;

/// Moderation workflows: the flag ledger, review status transitions (which
/// drive rating recomputation), and tutor verification.
pub struct ModerationService {
    db_pool: PgPool,
}

impl ModerationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    // ---- Flags -------------------------------------------------------------

    pub async fn create_flag(
        &self,
        user_id: UserId,
        request: CreateFlagRequest,
    ) -> Result<Flag, AppError> {
        let content_type = request
            .content_type
            .parse::<FlagContentType>()
            .map_err(|_| {
                AppError::Validation(format!("Unknown content type: {}", request.content_type))
            })?;

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Flag reason is required".to_string()));
        }

        sqlx::query_as::<_, Flag>(
            r#"
            INSERT INTO flags (user_id, content_type, content_id, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(content_type)
        .bind(request.content_id)
        .bind(reason)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_flags(
        &self,
        status: Option<String>,
        content_type: Option<String>,
        page: i64,
        page_size: i64,
    ) -> Result<Page<Flag>, AppError> {
        let status = status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<FlagStatus>()
                    .map_err(|_| AppError::Validation(format!("Unknown flag status: {}", s)))
            })
            .transpose()?;
        let content_type = content_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<FlagContentType>()
                    .map_err(|_| AppError::Validation(format!("Unknown content type: {}", s)))
            })
            .transpose()?;

        let page = page.max(0);
        let page_size = page_size.max(1);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM flags
            WHERE ($1::flag_status IS NULL OR status = $1)
              AND ($2::flag_content_type IS NULL OR content_type = $2)
            "#,
        )
        .bind(status)
        .bind(content_type)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let items = sqlx::query_as::<_, Flag>(
            r#"
            SELECT * FROM flags
            WHERE ($1::flag_status IS NULL OR status = $1)
              AND ($2::flag_content_type IS NULL OR content_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(status)
        .bind(content_type)
        .bind(page_size)
        .bind(page * page_size)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    /// Overwrites the flag status unconditionally: the flag ledger carries no
    /// transition restrictions of its own.
    pub async fn update_flag_status(
        &self,
        flag_id: i64,
        status: &str,
    ) -> Result<Flag, AppError> {
        let status = status
            .parse::<FlagStatus>()
            .map_err(|_| AppError::Validation(format!("Unknown flag status: {}", status)))?;

        sqlx::query_as::<_, Flag>("UPDATE flags SET status = $2 WHERE id = $1 RETURNING *")
            .bind(flag_id)
            .bind(status)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Flag not found".to_string()))
    }

    // ---- Review moderation -------------------------------------------------

    pub async fn pending_reviews(&self) -> Result<Vec<Review>, AppError> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE status = 'PENDING' ORDER BY created_at",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// PENDING -> APPROVED. The rating recompute runs inside the same
    /// transaction: if it fails, the approval is rolled back with it.
    pub async fn approve_review(&self, review_id: i64) -> Result<Review, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
            .bind(review_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        match review.status {
            ReviewStatus::Pending => {}
            ReviewStatus::Approved => {
                return Err(AppError::Conflict("Review is already approved".to_string()))
            }
            ReviewStatus::Rejected => {
                return Err(AppError::Conflict(
                    "A rejected review cannot be approved".to_string(),
                ))
            }
        }

        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET status = 'APPROVED', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(review_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let (avg, count) = recompute_tutor_rating(&mut *tx, review.tutor_id).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Review {} approved; tutor {} rating now {} over {} reviews",
            review.id,
            review.tutor_id,
            avg,
            count
        );
        Ok(review)
    }

    /// PENDING -> REJECTED (no rating impact: it was never counted) or
    /// APPROVED -> REJECTED (recompute inside the same transaction).
    pub async fn reject_review(
        &self,
        review_id: i64,
        reason: Option<String>,
    ) -> Result<Review, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
            .bind(review_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        if review.status == ReviewStatus::Rejected {
            return Err(AppError::Conflict("Review is already rejected".to_string()));
        }
        let previous = review.status;

        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET status = 'REJECTED', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(review_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if ReviewStatus::recompute_needed(previous, ReviewStatus::Rejected) {
            recompute_tutor_rating(&mut *tx, review.tutor_id).await?;
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Review {} rejected (was {:?}){}",
            review.id,
            previous,
            reason
                .map(|r| format!(": {}", r))
                .unwrap_or_default()
        );
        Ok(review)
    }

    // ---- Tutor verification ------------------------------------------------

    pub async fn unverified_tutors(&self) -> Result<Vec<TutorProfile>, AppError> {
        sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE is_verified = FALSE ORDER BY created_at",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn set_tutor_verified(
        &self,
        tutor_id: TutorId,
        verified: bool,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tutor_profiles SET is_verified = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(tutor_id)
        .bind(verified)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tutor profile not found".to_string()));
        }

        tracing::info!("Tutor {} verified={}", tutor_id, verified);
        Ok(())
    }

    // ---- Platform statistics -----------------------------------------------

    pub async fn platform_stats(&self) -> Result<PlatformStats, AppError> {
        Ok(PlatformStats {
            total_users: self.count("SELECT COUNT(*) FROM users").await?,
            total_tutors: self
                .count("SELECT COUNT(*) FROM users WHERE role = 'TUTOR'")
                .await?,
            total_learners: self
                .count("SELECT COUNT(*) FROM users WHERE role = 'LEARNER'")
                .await?,
            verified_tutors: self
                .count("SELECT COUNT(*) FROM tutor_profiles WHERE is_verified = TRUE")
                .await?,
            unverified_tutors: self
                .count("SELECT COUNT(*) FROM tutor_profiles WHERE is_verified = FALSE")
                .await?,
            total_reviews: self.count("SELECT COUNT(*) FROM reviews").await?,
            pending_reviews: self
                .count("SELECT COUNT(*) FROM reviews WHERE status = 'PENDING'")
                .await?,
            approved_reviews: self
                .count("SELECT COUNT(*) FROM reviews WHERE status = 'APPROVED'")
                .await?,
            rejected_reviews: self
                .count("SELECT COUNT(*) FROM reviews WHERE status = 'REJECTED'")
                .await?,
            total_bookings: self.count("SELECT COUNT(*) FROM booking_requests").await?,
            pending_bookings: self
                .count("SELECT COUNT(*) FROM booking_requests WHERE status = 'PENDING'")
                .await?,
            accepted_bookings: self
                .count("SELECT COUNT(*) FROM booking_requests WHERE status = 'ACCEPTED'")
                .await?,
            total_classes: self.count("SELECT COUNT(*) FROM classes").await?,
            open_classes: self
                .count("SELECT COUNT(*) FROM classes WHERE status = 'OPEN'")
                .await?,
            full_classes: self
                .count("SELECT COUNT(*) FROM classes WHERE status = 'FULL'")
                .await?,
            total_enrollments: self.count("SELECT COUNT(*) FROM enrollments").await?,
            active_enrollments: self
                .count("SELECT COUNT(*) FROM enrollments WHERE status = 'ACTIVE'")
                .await?,
            total_flags: self.count("SELECT COUNT(*) FROM flags").await?,
            pending_flags: self
                .count("SELECT COUNT(*) FROM flags WHERE status = 'PENDING'")
                .await?,
        })
    }

    async fn count(&self, query: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_tutors: i64,
    pub total_learners: i64,
    pub verified_tutors: i64,
    pub unverified_tutors: i64,
    pub total_reviews: i64,
    pub pending_reviews: i64,
    pub approved_reviews: i64,
    pub rejected_reviews: i64,
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub accepted_bookings: i64,
    pub total_classes: i64,
    pub open_classes: i64,
    pub full_classes: i64,
    pub total_enrollments: i64,
    pub active_enrollments: i64,
    pub total_flags: i64,
    pub pending_flags: i64,
}
