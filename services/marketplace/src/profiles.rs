use sqlx::PgPool;

use tutorfind_common::{AppError, TutorId, UserId, UserRole};
use tutorfind_database::{TutorProfile, User};

use crate::models::UpdateProfileRequest;
use crate::state::AppState;

/// Tutor profile ownership and the UserId <-> TutorId mapping. A profile id
/// and the owning user id are distinct and never interchangeable; every
/// crossing between the two goes through this service.
pub struct TutorService {
    db_pool: PgPool,
}

impl TutorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_tutor(&self, tutor_id: TutorId) -> Result<TutorProfile, AppError> {
        sqlx::query_as::<_, TutorProfile>("SELECT * FROM tutor_profiles WHERE id = $1")
            .bind(tutor_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))
    }

    pub async fn tutor_by_user(&self, user_id: UserId) -> Result<TutorProfile, AppError> {
        sqlx::query_as::<_, TutorProfile>("SELECT * FROM tutor_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))
    }

    /// Entry point for the registration flow: a profile is created once when
    /// an account with the TUTOR role signs up.
    pub async fn create_profile(&self, user_id: UserId) -> Result<TutorProfile, AppError> {
        let user = self.get_user(user_id).await?;

        if user.role != UserRole::Tutor {
            return Err(AppError::Authorization(
                "Only tutor accounts can have a tutor profile".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tutor_profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if existing {
            return Err(AppError::Conflict("Tutor profile already exists".to_string()));
        }

        let profile = sqlx::query_as::<_, TutorProfile>(
            "INSERT INTO tutor_profiles (user_id) VALUES ($1) RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Created tutor profile {} for user {}", profile.id, user_id);
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        request: UpdateProfileRequest,
    ) -> Result<TutorProfile, AppError> {
        let profile = self.tutor_by_user(user_id).await?;

        sqlx::query_as::<_, TutorProfile>(
            r#"
            UPDATE tutor_profiles SET
                headline = COALESCE($2, headline),
                bio = COALESCE($3, bio),
                qualifications = COALESCE($4, qualifications),
                experience_years = COALESCE($5, experience_years),
                monthly_rate = COALESCE($6, monthly_rate),
                city_id = COALESCE($7, city_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(profile.id)
        .bind(&request.headline)
        .bind(&request.bio)
        .bind(&request.qualifications)
        .bind(request.experience_years)
        .bind(request.monthly_rate)
        .bind(request.city_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Profiles are deactivated, never hard-deleted.
    pub async fn set_active(&self, tutor_id: TutorId, active: bool) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tutor_profiles SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(tutor_id)
        .bind(active)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tutor profile not found".to_string()));
        }

        tracing::info!("Tutor {} set active={}", tutor_id, active);
        Ok(())
    }
}
