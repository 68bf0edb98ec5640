use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tutorfind_common::*;

/// User account row. Accounts are owned by the external user directory; the
/// marketplace only reads them for role checks and display names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A tutor's business profile, keyed by its own id and owned by `user_id`.
/// `rating_avg`/`rating_count` are a materialized view over APPROVED reviews.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorProfile {
    pub id: TutorId,
    pub user_id: UserId,
    pub city_id: Option<i64>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    pub monthly_rate: Decimal,
    pub rating_avg: Decimal,
    pub rating_count: i32,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorSubject {
    pub id: i64,
    pub tutor_id: TutorId,
    pub subject_id: i64,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorDistrict {
    pub id: i64,
    pub tutor_id: TutorId,
    pub district_id: i64,
}

/// Recurring weekly availability window. Overlapping slots for the same tutor
/// are permitted and never deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailabilitySlot {
    pub id: i64,
    pub tutor_id: TutorId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingRequest {
    pub id: i64,
    pub learner_id: UserId,
    pub tutor_id: TutorId,
    pub subject_id: Option<i64>,
    pub mode: Option<String>,
    pub slot_text: Option<String>,
    pub slot_day: Option<String>,
    pub slot_time: Option<String>,
    pub learner_note: Option<String>,
    pub tutor_response: Option<String>,
    pub proposed_price: Option<Decimal>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassOffering {
    pub id: i64,
    pub tutor_id: TutorId,
    pub subject_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub class_type: ClassType,
    pub max_students: i32,
    pub current_students: i32,
    pub price_per_session: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub availability_slot_id: Option<i64>,
    pub status: ClassStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassOffering {
    pub fn available_seats(&self) -> i32 {
        (self.max_students - self.current_students).max(0)
    }
}

/// A learner's seat in a class. (class_id, learner_id) is unique; a dropped
/// seat is reactivated on re-enrollment rather than duplicated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub class_id: i64,
    pub learner_id: UserId,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public review of a tutor. One per (tutor, learner); starts PENDING and
/// only counts toward the tutor's rating once APPROVED.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub tutor_id: TutorId,
    pub learner_id: UserId,
    pub booking_id: Option<i64>,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Private tutor-to-learner feedback. Not rating-bearing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub tutor_id: TutorId,
    pub learner_id: UserId,
    pub booking_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub feedback_text: String,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Moderation flag. An independent trail; not tied 1:1 to the flagged
/// entity's own status field.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Flag {
    pub id: i64,
    pub user_id: UserId,
    pub content_type: FlagContentType,
    pub content_id: i64,
    pub reason: String,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget notification record for a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub notification_type: String,
    pub payload: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct District {
    pub id: i64,
    pub city_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
}
