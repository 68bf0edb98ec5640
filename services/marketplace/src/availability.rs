use chrono::NaiveTime;
use sqlx::PgPool;

use tutorfind_common::{AppError, DayOfWeek, TutorId};
use tutorfind_database::AvailabilitySlot;

use crate::models::AddAvailabilityRequest;
use crate::state::AppState;

/// Parses an "HH:MM" (or "HH:MM:SS") wall-clock time.
pub fn parse_time(value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Malformed time: {}", value)))
}

pub fn parse_day(value: &str) -> Result<DayOfWeek, AppError> {
    value
        .parse::<DayOfWeek>()
        .map_err(|_| AppError::Validation(format!("Invalid day of week: {}", value)))
}

/// Whether a slot satisfies an availability request. The day must match when
/// given, and the slot must fully contain the requested window when given;
/// partial overlap is not a match.
pub fn slot_covers(
    slot: &AvailabilitySlot,
    day: Option<DayOfWeek>,
    window: Option<(NaiveTime, NaiveTime)>,
) -> bool {
    if !slot.is_active {
        return false;
    }
    if let Some(day) = day {
        if slot.day_of_week != day {
            return false;
        }
    }
    if let Some((start, end)) = window {
        if slot.start_time > start || slot.end_time < end {
            return false;
        }
    }
    true
}

/// Per-tutor recurring weekly availability, plus the tutor's subject and
/// district memberships that discovery filters against.
pub struct AvailabilityService {
    db_pool: PgPool,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn assert_tutor_exists(&self, tutor_id: TutorId) -> Result<(), AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tutor_profiles WHERE id = $1)",
        )
        .bind(tutor_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !exists {
            return Err(AppError::NotFound("Tutor profile not found".to_string()));
        }
        Ok(())
    }

    /// Adds a weekly slot. Overlap with the tutor's existing slots is allowed
    /// and intentionally not checked.
    pub async fn add_slot(
        &self,
        tutor_id: TutorId,
        request: AddAvailabilityRequest,
    ) -> Result<AvailabilitySlot, AppError> {
        self.assert_tutor_exists(tutor_id).await?;

        let day = parse_day(&request.day_of_week)?;
        let start_time = parse_time(&request.start_time)?;
        let end_time = parse_time(&request.end_time)?;

        if start_time >= end_time {
            return Err(AppError::Validation(
                "Slot start time must be before end time".to_string(),
            ));
        }

        let slot = sqlx::query_as::<_, AvailabilitySlot>(
            r#"
            INSERT INTO availability_slots (tutor_id, day_of_week, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tutor_id)
        .bind(day)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(slot)
    }

    pub async fn remove_slot(&self, tutor_id: TutorId, slot_id: i64) -> Result<(), AppError> {
        let slot = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT * FROM availability_slots WHERE id = $1",
        )
        .bind(slot_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Availability slot not found".to_string()))?;

        if slot.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "This slot does not belong to you".to_string(),
            ));
        }

        sqlx::query("DELETE FROM availability_slots WHERE id = $1")
            .bind(slot_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn list_slots(&self, tutor_id: TutorId) -> Result<Vec<AvailabilitySlot>, AppError> {
        self.assert_tutor_exists(tutor_id).await?;

        sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT * FROM availability_slots WHERE tutor_id = $1 ORDER BY day_of_week, start_time",
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn add_subject(
        &self,
        tutor_id: TutorId,
        subject_id: i64,
        proficiency: Option<String>,
    ) -> Result<i64, AppError> {
        self.assert_tutor_exists(tutor_id).await?;

        let subject_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)",
        )
        .bind(subject_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !subject_exists {
            return Err(AppError::NotFound("Subject not found".to_string()));
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO tutor_subjects (tutor_id, subject_id, proficiency)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(tutor_id)
        .bind(subject_id)
        .bind(&proficiency)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Subject already added to your profile"))?;

        Ok(id)
    }

    pub async fn remove_subject(&self, tutor_id: TutorId, subject_id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM tutor_subjects WHERE tutor_id = $1 AND subject_id = $2",
        )
        .bind(tutor_id)
        .bind(subject_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Subject not found in your profile".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn add_district(&self, tutor_id: TutorId, district_id: i64) -> Result<i64, AppError> {
        self.assert_tutor_exists(tutor_id).await?;

        let district_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM districts WHERE id = $1)",
        )
        .bind(district_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !district_exists {
            return Err(AppError::NotFound("District not found".to_string()));
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO tutor_districts (tutor_id, district_id)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(tutor_id)
        .bind(district_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| conflict_on_unique(e, "District already added to your profile"))?;

        Ok(id)
    }

    pub async fn remove_district(
        &self,
        tutor_id: TutorId,
        district_id: i64,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM tutor_districts WHERE tutor_id = $1 AND district_id = $2",
        )
        .bind(tutor_id)
        .bind(district_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "District not found in your profile".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maps a unique-constraint violation to a domain Conflict.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tutorfind_common::TutorId;

    fn slot(day: DayOfWeek, start: &str, end: &str) -> AvailabilitySlot {
        AvailabilitySlot {
            id: 1,
            tutor_id: TutorId(1),
            day_of_week: day,
            start_time: parse_time(start).unwrap(),
            end_time: parse_time(end).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn window(start: &str, end: &str) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_time(start).unwrap(), parse_time(end).unwrap()))
    }

    #[test]
    fn containment_requires_full_window_coverage() {
        let s = slot(DayOfWeek::Monday, "09:00", "12:00");
        assert!(slot_covers(&s, Some(DayOfWeek::Monday), window("10:00", "11:00")));
        assert!(slot_covers(&s, Some(DayOfWeek::Monday), window("09:00", "12:00")));
        // Partial overlap is not enough
        assert!(!slot_covers(&s, Some(DayOfWeek::Monday), window("08:00", "11:00")));
        assert!(!slot_covers(&s, Some(DayOfWeek::Monday), window("10:00", "13:00")));
    }

    #[test]
    fn day_mismatch_never_matches() {
        let s = slot(DayOfWeek::Monday, "09:00", "12:00");
        assert!(!slot_covers(&s, Some(DayOfWeek::Tuesday), None));
        assert!(slot_covers(&s, Some(DayOfWeek::Monday), None));
    }

    #[test]
    fn absent_criteria_match_any_active_slot() {
        let s = slot(DayOfWeek::Friday, "14:00", "16:00");
        assert!(slot_covers(&s, None, None));
        assert!(slot_covers(&s, None, window("14:30", "15:30")));
    }

    #[test]
    fn inactive_slots_never_match() {
        let mut s = slot(DayOfWeek::Monday, "09:00", "12:00");
        s.is_active = false;
        assert!(!slot_covers(&s, None, None));
    }

    #[test]
    fn time_parsing() {
        assert!(parse_time("10:00").is_ok());
        assert!(parse_time("10:00:30").is_ok());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }
}
