use sqlx::PgPool;

use tutorfind_common::{
    AppError, ClassStatus, ClassType, EnrollmentStatus, TutorId, UserId, UserRole,
};
use tutorfind_database::{AvailabilitySlot, ClassOffering, Enrollment, User};

use crate::models::{ClassResponse, CreateClassRequest, EnrollmentResponse, SlotInfo};
use crate::state::AppState;

/// What `enroll` should do given the learner's existing row for the class.
/// A dropped seat is reactivated rather than duplicated, so a learner who
/// dropped can re-enroll as long as there is capacity.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EnrollAction {
    Insert,
    Reactivate,
}

pub(crate) fn enroll_action(
    existing: Option<EnrollmentStatus>,
) -> Result<EnrollAction, AppError> {
    match existing {
        None => Ok(EnrollAction::Insert),
        Some(EnrollmentStatus::Dropped) => Ok(EnrollAction::Reactivate),
        Some(EnrollmentStatus::Active) => Err(AppError::Conflict(
            "You are already enrolled in this class".to_string(),
        )),
    }
}

/// Class offerings and seat allocation. Capacity bookkeeping
/// (current_students, OPEN <-> FULL) is updated atomically with the
/// enrollment row inside a transaction that locks the class row, so two
/// concurrent enrollments can never overshoot max_students.
pub struct ClassService {
    db_pool: PgPool,
}

impl ClassService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_class(
        &self,
        tutor_id: TutorId,
        request: CreateClassRequest,
    ) -> Result<ClassResponse, AppError> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::Validation("Class name is required".to_string()))?
            .to_string();

        let slot_id = request.availability_slot_id.ok_or_else(|| {
            AppError::Validation("Availability slot is required for scheduling".to_string())
        })?;
        self.assert_slot_owned(slot_id, tutor_id).await?;

        let class = sqlx::query_as::<_, ClassOffering>(
            r#"
            INSERT INTO classes
                (tutor_id, subject_id, name, description, class_type, max_students,
                 price_per_session, total_sessions, duration_minutes,
                 availability_slot_id, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(tutor_id)
        .bind(request.subject_id)
        .bind(&name)
        .bind(&request.description)
        .bind(request.class_type.unwrap_or(ClassType::Individual))
        .bind(request.max_students.unwrap_or(1))
        .bind(request.price_per_session)
        .bind(request.total_sessions)
        .bind(request.duration_minutes)
        .bind(slot_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Class {} created by tutor {}", class.id, tutor_id);
        self.build_class_response(class).await
    }

    pub async fn update_class(
        &self,
        class_id: i64,
        tutor_id: TutorId,
        request: CreateClassRequest,
    ) -> Result<ClassResponse, AppError> {
        let class = self.get_class_entity(class_id).await?;

        if class.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "You can only update your own classes".to_string(),
            ));
        }

        if let Some(slot_id) = request.availability_slot_id {
            self.assert_slot_owned(slot_id, tutor_id).await?;
        }

        let class = sqlx::query_as::<_, ClassOffering>(
            r#"
            UPDATE classes SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                class_type = COALESCE($4, class_type),
                max_students = COALESCE($5, max_students),
                price_per_session = COALESCE($6, price_per_session),
                total_sessions = COALESCE($7, total_sessions),
                duration_minutes = COALESCE($8, duration_minutes),
                availability_slot_id = COALESCE($9, availability_slot_id),
                start_date = COALESCE($10, start_date),
                end_date = COALESCE($11, end_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(class_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.class_type)
        .bind(request.max_students)
        .bind(request.price_per_session)
        .bind(request.total_sessions)
        .bind(request.duration_minutes)
        .bind(request.availability_slot_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_class_response(class).await
    }

    pub async fn delete_class(&self, class_id: i64, tutor_id: TutorId) -> Result<(), AppError> {
        let class = self.get_class_entity(class_id).await?;

        if class.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "You can only delete your own classes".to_string(),
            ));
        }

        let active = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE class_id = $1 AND status = 'ACTIVE'",
        )
        .bind(class_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if active > 0 {
            return Err(AppError::Conflict(
                "Cannot delete a class with active enrollments".to_string(),
            ));
        }

        sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(class_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    /// Tutors close out their own classes. OPEN and FULL are derived from
    /// enrollment counts and cannot be set by hand.
    pub async fn close_class(
        &self,
        class_id: i64,
        tutor_id: TutorId,
        status: ClassStatus,
    ) -> Result<ClassResponse, AppError> {
        if !status.is_terminal() {
            return Err(AppError::Validation(
                "Class status can only be set to COMPLETED or CANCELLED".to_string(),
            ));
        }

        let class = self.get_class_entity(class_id).await?;
        if class.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "You can only update your own classes".to_string(),
            ));
        }

        let class = sqlx::query_as::<_, ClassOffering>(
            "UPDATE classes SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(class_id)
        .bind(status)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_class_response(class).await
    }

    pub async fn list_open_classes(&self) -> Result<Vec<ClassResponse>, AppError> {
        let classes = sqlx::query_as::<_, ClassOffering>(
            "SELECT * FROM classes WHERE status = 'OPEN' ORDER BY created_at DESC",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_class_responses(classes).await
    }

    pub async fn get_class(&self, class_id: i64) -> Result<ClassResponse, AppError> {
        let class = self.get_class_entity(class_id).await?;
        self.build_class_response(class).await
    }

    pub async fn tutor_classes(&self, tutor_id: TutorId) -> Result<Vec<ClassResponse>, AppError> {
        let classes = sqlx::query_as::<_, ClassOffering>(
            "SELECT * FROM classes WHERE tutor_id = $1 ORDER BY created_at DESC",
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_class_responses(classes).await
    }

    /// Takes a seat in an open class. The class row lock serializes the
    /// capacity check against concurrent enrollments and drops.
    pub async fn enroll(
        &self,
        class_id: i64,
        learner_id: UserId,
    ) -> Result<EnrollmentResponse, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let class = sqlx::query_as::<_, ClassOffering>(
            "SELECT * FROM classes WHERE id = $1 FOR UPDATE",
        )
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

        let learner = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(learner_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Learner not found".to_string()))?;

        if learner.role != UserRole::Learner {
            return Err(AppError::Authorization(
                "Only learners can enroll in classes".to_string(),
            ));
        }

        if class.status != ClassStatus::Open {
            return Err(AppError::Conflict(
                "Class is not open for enrollment".to_string(),
            ));
        }

        let existing = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE class_id = $1 AND learner_id = $2 FOR UPDATE",
        )
        .bind(class_id)
        .bind(learner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let action = enroll_action(existing.as_ref().map(|e| e.status))?;

        // The count is authoritative even if the status field is stale.
        if class.current_students >= class.max_students {
            return Err(AppError::Conflict("Class is full".to_string()));
        }

        let enrollment = match action {
            EnrollAction::Insert => sqlx::query_as::<_, Enrollment>(
                r#"
                INSERT INTO enrollments (class_id, learner_id)
                VALUES ($1, $2)
                RETURNING *
                "#,
            )
            .bind(class_id)
            .bind(learner_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?,
            EnrollAction::Reactivate => sqlx::query_as::<_, Enrollment>(
                r#"
                UPDATE enrollments SET status = 'ACTIVE', updated_at = NOW()
                WHERE class_id = $1 AND learner_id = $2
                RETURNING *
                "#,
            )
            .bind(class_id)
            .bind(learner_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?,
        };

        let new_count = class.current_students + 1;
        let new_status = if new_count >= class.max_students {
            ClassStatus::Full
        } else {
            ClassStatus::Open
        };

        sqlx::query(
            "UPDATE classes SET current_students = $2, status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(class_id)
        .bind(new_count)
        .bind(new_status)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Learner {} enrolled in class {} ({}/{})",
            learner_id,
            class_id,
            new_count,
            class.max_students
        );

        self.build_enrollment_response(enrollment).await
    }

    /// Gives the seat back. Locks the class row before the enrollment row so
    /// enroll and drop always take their locks in the same order.
    pub async fn drop_enrollment(
        &self,
        enrollment_id: i64,
        learner_id: UserId,
    ) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE id = $1",
        )
        .bind(enrollment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        if enrollment.learner_id != learner_id {
            return Err(AppError::Authorization(
                "You can only drop your own enrollments".to_string(),
            ));
        }

        let class = sqlx::query_as::<_, ClassOffering>(
            "SELECT * FROM classes WHERE id = $1 FOR UPDATE",
        )
        .bind(enrollment.class_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

        // Re-read under the class lock; the status may have changed since.
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE id = $1 FOR UPDATE",
        )
        .bind(enrollment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if enrollment.status == EnrollmentStatus::Dropped {
            return Err(AppError::Conflict(
                "You have already dropped from this class".to_string(),
            ));
        }

        sqlx::query("UPDATE enrollments SET status = 'DROPPED', updated_at = NOW() WHERE id = $1")
            .bind(enrollment_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let new_count = (class.current_students - 1).max(0);
        let new_status = if class.status == ClassStatus::Full {
            ClassStatus::Open
        } else {
            class.status
        };

        sqlx::query(
            "UPDATE classes SET current_students = $2, status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(class.id)
        .bind(new_count)
        .bind(new_status)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Learner {} dropped enrollment {} from class {}",
            learner_id,
            enrollment_id,
            class.id
        );
        Ok(())
    }

    pub async fn class_roster(
        &self,
        class_id: i64,
        tutor_id: TutorId,
    ) -> Result<Vec<EnrollmentResponse>, AppError> {
        let class = self.get_class_entity(class_id).await?;

        if class.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "You can only view the roster of your own classes".to_string(),
            ));
        }

        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE class_id = $1 ORDER BY enrolled_at",
        )
        .bind(class_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_enrollment_responses(enrollments).await
    }

    pub async fn learner_enrollments(
        &self,
        learner_id: UserId,
        active_only: bool,
    ) -> Result<Vec<EnrollmentResponse>, AppError> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT * FROM enrollments
            WHERE learner_id = $1 AND (NOT $2 OR status = 'ACTIVE')
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(learner_id)
        .bind(active_only)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_enrollment_responses(enrollments).await
    }

    async fn get_class_entity(&self, class_id: i64) -> Result<ClassOffering, AppError> {
        sqlx::query_as::<_, ClassOffering>("SELECT * FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Class not found".to_string()))
    }

    async fn assert_slot_owned(&self, slot_id: i64, tutor_id: TutorId) -> Result<(), AppError> {
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
                "Slot does not belong to this tutor".to_string(),
            ));
        }
        Ok(())
    }

    async fn build_class_responses(
        &self,
        classes: Vec<ClassOffering>,
    ) -> Result<Vec<ClassResponse>, AppError> {
        let mut responses = Vec::with_capacity(classes.len());
        for class in classes {
            responses.push(self.build_class_response(class).await?);
        }
        Ok(responses)
    }

    async fn build_class_response(&self, class: ClassOffering) -> Result<ClassResponse, AppError> {
        let tutor_name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.first_name || ' ' || u.last_name
            FROM tutor_profiles tp JOIN users u ON u.id = tp.user_id
            WHERE tp.id = $1
            "#,
        )
        .bind(class.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let subject_name = match class.subject_id {
            Some(subject_id) => sqlx::query_scalar::<_, String>(
                "SELECT name FROM subjects WHERE id = $1",
            )
            .bind(subject_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?,
            None => None,
        };

        let slot = match class.availability_slot_id {
            Some(slot_id) => sqlx::query_as::<_, AvailabilitySlot>(
                "SELECT * FROM availability_slots WHERE id = $1",
            )
            .bind(slot_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?,
            None => None,
        };

        let available_seats = class.available_seats();
        let schedule_day = slot.as_ref().map(|s| s.day_of_week);
        let schedule_time = slot
            .as_ref()
            .map(|s| format!("{}-{}", s.start_time.format("%H:%M"), s.end_time.format("%H:%M")));

        Ok(ClassResponse {
            id: class.id,
            tutor_id: class.tutor_id,
            tutor_name,
            subject_id: class.subject_id,
            subject_name,
            name: class.name,
            description: class.description,
            class_type: class.class_type,
            max_students: class.max_students,
            current_students: class.current_students,
            available_seats,
            price_per_session: class.price_per_session,
            total_sessions: class.total_sessions,
            duration_minutes: class.duration_minutes,
            status: class.status,
            start_date: class.start_date,
            end_date: class.end_date,
            schedule_day,
            schedule_time,
            availability_slot: slot.map(SlotInfo::from),
            created_at: class.created_at,
        })
    }

    async fn build_enrollment_responses(
        &self,
        enrollments: Vec<Enrollment>,
    ) -> Result<Vec<EnrollmentResponse>, AppError> {
        let mut responses = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            responses.push(self.build_enrollment_response(enrollment).await?);
        }
        Ok(responses)
    }

    async fn build_enrollment_response(
        &self,
        enrollment: Enrollment,
    ) -> Result<EnrollmentResponse, AppError> {
        let learner_name = sqlx::query_scalar::<_, String>(
            "SELECT first_name || ' ' || last_name FROM users WHERE id = $1",
        )
        .bind(enrollment.learner_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let class = sqlx::query_as::<_, ClassOffering>("SELECT * FROM classes WHERE id = $1")
            .bind(enrollment.class_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        let (class_name, tutor_name, subject_name, schedule_day, schedule_time, duration_minutes) =
            match &class {
                Some(class) => {
                    let tutor_name = sqlx::query_scalar::<_, String>(
                        r#"
                        SELECT u.first_name || ' ' || u.last_name
                        FROM tutor_profiles tp JOIN users u ON u.id = tp.user_id
                        WHERE tp.id = $1
                        "#,
                    )
                    .bind(class.tutor_id)
                    .fetch_optional(&self.db_pool)
                    .await
                    .map_err(AppError::Database)?;

                    let subject_name = match class.subject_id {
                        Some(subject_id) => sqlx::query_scalar::<_, String>(
                            "SELECT name FROM subjects WHERE id = $1",
                        )
                        .bind(subject_id)
                        .fetch_optional(&self.db_pool)
                        .await
                        .map_err(AppError::Database)?,
                        None => None,
                    };

                    let slot = match class.availability_slot_id {
                        Some(slot_id) => sqlx::query_as::<_, AvailabilitySlot>(
                            "SELECT * FROM availability_slots WHERE id = $1",
                        )
                        .bind(slot_id)
                        .fetch_optional(&self.db_pool)
                        .await
                        .map_err(AppError::Database)?,
                        None => None,
                    };

                    (
                        Some(class.name.clone()),
                        tutor_name,
                        subject_name,
                        slot.as_ref().map(|s| s.day_of_week),
                        slot.as_ref().map(|s| {
                            format!(
                                "{}-{}",
                                s.start_time.format("%H:%M"),
                                s.end_time.format("%H:%M")
                            )
                        }),
                        class.duration_minutes,
                    )
                }
                None => (None, None, None, None, None, None),
            };

        Ok(EnrollmentResponse {
            id: enrollment.id,
            class_id: enrollment.class_id,
            learner_id: enrollment.learner_id,
            learner_name,
            class_name,
            tutor_name,
            subject_name,
            schedule_day,
            schedule_time,
            duration_minutes,
            status: enrollment.status,
            enrolled_at: enrollment.enrolled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_learner_gets_a_new_row() {
        assert_eq!(enroll_action(None).unwrap(), EnrollAction::Insert);
    }

    #[test]
    fn dropped_learner_reenrolls_by_reactivation() {
        assert_eq!(
            enroll_action(Some(EnrollmentStatus::Dropped)).unwrap(),
            EnrollAction::Reactivate
        );
    }

    #[test]
    fn active_learner_cannot_enroll_twice() {
        assert!(matches!(
            enroll_action(Some(EnrollmentStatus::Active)),
            Err(AppError::Conflict(_))
        ));
    }
}
