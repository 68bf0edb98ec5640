use chrono::Utc;
use sqlx::PgPool;

use tutorfind_common::{AppError, BookingStatus, TutorId, UserId};
use tutorfind_database::{BookingRequest, Subject, TutorProfile, User};

use crate::models::{BookingResponse, BookingStatusUpdate, CreateBookingRequest};
use crate::notifications::{events, NotificationService};
use crate::state::AppState;

/// Splits a free-form slot description like "Monday 10:00-11:00" into its day
/// and time parts. Anything that does not fit the shape is kept as text only.
pub fn parse_slot_text(slot: &str) -> (Option<String>, Option<String>) {
    let slot = slot.trim();
    if slot.is_empty() {
        return (None, None);
    }
    match slot.split_once(' ') {
        Some((day, time)) => (Some(day.to_string()), Some(time.trim().to_string())),
        None => (Some(slot.to_string()), None),
    }
}

/// Booking request lifecycle: PENDING on creation, responded to exactly once
/// by the owning tutor. Both outcomes are terminal.
pub struct BookingService {
    db_pool: PgPool,
    notifications: NotificationService,
}

impl BookingService {
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

    pub async fn create_booking(
        &self,
        learner_id: UserId,
        request: CreateBookingRequest,
    ) -> Result<BookingResponse, AppError> {
        let tutor = sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE id = $1",
        )
        .bind(request.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))?;

        let (slot_day, slot_time) = request
            .slot
            .as_deref()
            .map(parse_slot_text)
            .unwrap_or((None, None));

        let booking = sqlx::query_as::<_, BookingRequest>(
            r#"
            INSERT INTO booking_requests
                (learner_id, tutor_id, subject_id, mode, slot_text, slot_day, slot_time,
                 learner_note, proposed_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(learner_id)
        .bind(request.tutor_id)
        .bind(request.subject_id)
        .bind(&request.mode)
        .bind(&request.slot)
        .bind(&slot_day)
        .bind(&slot_time)
        .bind(&request.note)
        .bind(request.proposed_price)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(
            "Booking {} created by learner {} for tutor {}",
            booking.id,
            learner_id,
            booking.tutor_id
        );

        // Notify the tutor's user account, not the profile id.
        self.notifications.dispatch(
            tutor.user_id,
            events::BOOKING_CREATED,
            serde_json::json!({ "bookingId": booking.id }),
        );

        self.build_response(booking).await
    }

    /// A single accept-or-decline response by the owning tutor. The row lock
    /// makes the read-then-write atomic against a concurrent response.
    pub async fn respond(
        &self,
        booking_id: i64,
        tutor_id: TutorId,
        update: BookingStatusUpdate,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let booking = sqlx::query_as::<_, BookingRequest>(
            "SELECT * FROM booking_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.tutor_id != tutor_id {
            return Err(AppError::Authorization(
                "You can only respond to your own booking requests".to_string(),
            ));
        }

        if !booking.status.can_respond() {
            return Err(AppError::Conflict(
                "Booking has already been responded to".to_string(),
            ));
        }

        let status = if update.accept {
            BookingStatus::Accepted
        } else {
            BookingStatus::Declined
        };

        let booking = sqlx::query_as::<_, BookingRequest>(
            r#"
            UPDATE booking_requests
            SET status = $2, tutor_response = $3, responded_at = $4, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .bind(&update.response)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Booking {} {:?} by tutor {}", booking.id, status, tutor_id);

        let event = if update.accept {
            events::BOOKING_ACCEPTED
        } else {
            events::BOOKING_DECLINED
        };
        self.notifications.dispatch(
            booking.learner_id,
            event,
            serde_json::json!({ "bookingId": booking.id }),
        );

        self.build_response(booking).await
    }

    pub async fn sent_bookings(
        &self,
        learner_id: UserId,
        status: Option<String>,
    ) -> Result<Vec<BookingResponse>, AppError> {
        let status = parse_status_filter(status)?;

        let bookings = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT * FROM booking_requests
            WHERE learner_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(learner_id)
        .bind(status)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(bookings).await
    }

    pub async fn received_bookings(
        &self,
        tutor_id: TutorId,
        status: Option<String>,
    ) -> Result<Vec<BookingResponse>, AppError> {
        let status = parse_status_filter(status)?;

        let bookings = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT * FROM booking_requests
            WHERE tutor_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tutor_id)
        .bind(status)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.build_responses(bookings).await
    }

    /// Visible to the two participants only.
    pub async fn get_booking(
        &self,
        booking_id: i64,
        caller: UserId,
    ) -> Result<BookingResponse, AppError> {
        let booking = sqlx::query_as::<_, BookingRequest>(
            "SELECT * FROM booking_requests WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let tutor_user_id = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM tutor_profiles WHERE id = $1",
        )
        .bind(booking.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if booking.learner_id != caller && tutor_user_id != Some(caller) {
            return Err(AppError::Authorization(
                "You are not a participant of this booking".to_string(),
            ));
        }

        self.build_response(booking).await
    }

    async fn build_responses(
        &self,
        bookings: Vec<BookingRequest>,
    ) -> Result<Vec<BookingResponse>, AppError> {
        let mut responses = Vec::with_capacity(bookings.len());
        for booking in bookings {
            responses.push(self.build_response(booking).await?);
        }
        Ok(responses)
    }

    async fn build_response(&self, booking: BookingRequest) -> Result<BookingResponse, AppError> {
        let learner = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(booking.learner_id)
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
        .bind(booking.tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let subject = match booking.subject_id {
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

        Ok(BookingResponse {
            id: booking.id,
            learner_id: booking.learner_id,
            tutor_id: booking.tutor_id,
            learner_name: learner.as_ref().map(|u| u.full_name()),
            learner_phone: learner.as_ref().and_then(|u| u.phone_number.clone()),
            tutor_name,
            subject_id: booking.subject_id,
            subject,
            mode: booking.mode,
            slot: booking.slot_text,
            learner_note: booking.learner_note,
            tutor_response: booking.tutor_response,
            proposed_price: booking.proposed_price,
            status: booking.status,
            created_at: booking.created_at,
            responded_at: booking.responded_at,
        })
    }
}

fn parse_status_filter(status: Option<String>) -> Result<Option<BookingStatus>, AppError> {
    status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<BookingStatus>()
                .map_err(|_| AppError::Validation(format!("Unknown booking status: {}", s)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_text_splits_into_day_and_time() {
        assert_eq!(
            parse_slot_text("Monday 10:00-11:00"),
            (Some("Monday".to_string()), Some("10:00-11:00".to_string()))
        );
        assert_eq!(parse_slot_text("Monday"), (Some("Monday".to_string()), None));
        assert_eq!(parse_slot_text("   "), (None, None));
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(
            parse_status_filter(Some("pending".to_string())).unwrap(),
            Some(BookingStatus::Pending)
        );
        assert_eq!(parse_status_filter(Some("".to_string())).unwrap(), None);
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert!(parse_status_filter(Some("MAYBE".to_string())).is_err());
    }
}
