use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use tutorfind_common::{AppError, TutorId, UserId};
use tutorfind_database::{Review, User};

use crate::availability::conflict_on_unique;
use crate::models::{CreateReviewRequest, ReviewResponse};
use crate::state::AppState;

/// Mean and count over a set of approved ratings. An empty set aggregates to
/// (0, 0), never null.
pub fn aggregate(ratings: &[i32]) -> (Decimal, i32) {
    if ratings.is_empty() {
        return (Decimal::ZERO, 0);
    }
    let sum: i64 = ratings.iter().map(|r| *r as i64).sum();
    let avg = (Decimal::from(sum) / Decimal::from(ratings.len() as i64)).round_dp(2);
    (avg, ratings.len() as i32)
}

/// Rematerializes a tutor's (rating_avg, rating_count) from the reviews that
/// are currently APPROVED. Runs on the caller's connection so a moderation
/// transition and its recompute commit or roll back together; the profile row
/// lock serializes recomputes per tutor without blocking other tutors.
pub async fn recompute_tutor_rating(
    conn: &mut PgConnection,
    tutor_id: TutorId,
) -> Result<(Decimal, i32), AppError> {
    sqlx::query_scalar::<_, TutorId>("SELECT id FROM tutor_profiles WHERE id = $1 FOR UPDATE")
        .bind(tutor_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))?;

    let ratings = sqlx::query_scalar::<_, i32>(
        "SELECT rating FROM reviews WHERE tutor_id = $1 AND status = 'APPROVED'",
    )
    .bind(tutor_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    let (rating_avg, rating_count) = aggregate(&ratings);

    sqlx::query(
        r#"
        UPDATE tutor_profiles
        SET rating_avg = $2, rating_count = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(tutor_id)
    .bind(rating_avg)
    .bind(rating_count)
    .execute(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    Ok((rating_avg, rating_count))
}

pub struct ReviewService {
    db_pool: PgPool,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// New reviews start PENDING and do not touch the tutor aggregate until a
    /// moderator approves them. One review per (tutor, learner).
    pub async fn create_review(
        &self,
        learner_id: UserId,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        if !(1..=5).contains(&request.rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let tutor_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tutor_profiles WHERE id = $1)",
        )
        .bind(request.tutor_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !tutor_exists {
            return Err(AppError::NotFound("Tutor profile not found".to_string()));
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (tutor_id, learner_id, booking_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.tutor_id)
        .bind(learner_id)
        .bind(request.booking_id)
        .bind(request.rating)
        .bind(&request.comment)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already reviewed this tutor"))?;

        tracing::info!(
            "Review {} submitted by learner {} for tutor {}",
            review.id,
            learner_id,
            review.tutor_id
        );
        Ok(review)
    }

    /// Public listing: approved reviews only.
    pub async fn reviews_for_tutor(
        &self,
        tutor_id: TutorId,
    ) -> Result<Vec<ReviewResponse>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE tutor_id = $1 AND status = 'APPROVED'
            ORDER BY created_at DESC
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(reviews).await
    }

    /// A learner sees their own reviews in every status.
    pub async fn my_reviews(&self, learner_id: UserId) -> Result<Vec<ReviewResponse>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE learner_id = $1 ORDER BY created_at DESC",
        )
        .bind(learner_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(reviews).await
    }

    async fn build_responses(&self, reviews: Vec<Review>) -> Result<Vec<ReviewResponse>, AppError> {
        let learner_ids: Vec<i64> = reviews.iter().map(|r| r.learner_id.0).collect();
        let learners = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(&learner_ids)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)?;
        let learners: HashMap<UserId, User> = learners.into_iter().map(|u| (u.id, u)).collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let learner_name = learners.get(&review.learner_id).map(|u| u.full_name());
                ReviewResponse {
                    id: review.id,
                    tutor_id: review.tutor_id,
                    learner_id: review.learner_id,
                    learner_name,
                    rating: review.rating,
                    comment: review.comment,
                    status: review.status,
                    created_at: review.created_at,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_aggregates_to_zero_not_null() {
        assert_eq!(aggregate(&[]), (Decimal::ZERO, 0));
    }

    #[test]
    fn single_rating_is_its_own_mean() {
        assert_eq!(aggregate(&[5]), (Decimal::from(5), 1));
    }

    #[test]
    fn mean_is_exact_over_the_approved_set() {
        let (avg, count) = aggregate(&[4, 5]);
        assert_eq!(avg, "4.50".parse().unwrap());
        assert_eq!(count, 2);

        let (avg, count) = aggregate(&[1, 2, 2]);
        assert_eq!(avg, "1.67".parse().unwrap());
        assert_eq!(count, 3);
    }

    #[test]
    fn mean_stays_within_rating_bounds() {
        let (avg, _) = aggregate(&[1, 1, 1]);
        assert_eq!(avg, Decimal::from(1));
        let (avg, _) = aggregate(&[5, 5, 5, 5]);
        assert_eq!(avg, Decimal::from(5));
    }
}
