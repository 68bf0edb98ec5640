use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use tutorfind_common::{
    BookingStatus, ClassStatus, ClassType, DayOfWeek, EnrollmentStatus, ReviewStatus, TutorId,
    UserId,
};
use tutorfind_database::AvailabilitySlot;

// ---- Discovery -------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub city: Option<String>,
    pub district: Option<String>,
    pub subject: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    pub availability_day: Option<String>,
    pub availability_start: Option<String>,
    pub availability_end: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorSearchResult {
    pub id: TutorId,
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub monthly_rate: Decimal,
    pub rating: Decimal,
    pub review_count: i32,
    pub experience_years: Option<i32>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub id: i64,
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

impl From<AvailabilitySlot> for SlotInfo {
    fn from(slot: AvailabilitySlot) -> Self {
        Self {
            id: slot.id,
            day_of_week: slot.day_of_week,
            start_time: slot.start_time.format("%H:%M").to_string(),
            end_time: slot.end_time.format("%H:%M").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfileResponse {
    pub id: TutorId,
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<i32>,
    pub monthly_rate: Decimal,
    pub rating: Decimal,
    pub review_count: i32,
    pub is_verified: bool,
    pub is_active: bool,
    pub city: Option<String>,
    pub districts: Vec<String>,
    pub subjects: Vec<SubjectInfo>,
    pub availability: Vec<SlotInfo>,
    pub reviews: Vec<ReviewResponse>,
}

// ---- Profiles --------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 200))]
    pub headline: Option<String>,
    #[validate(length(max = 4000))]
    pub bio: Option<String>,
    #[validate(length(max = 2000))]
    pub qualifications: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    pub monthly_rate: Option<Decimal>,
    pub city_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTutorProfileRequest {
    pub user_id: UserId,
}

// ---- Availability ----------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddAvailabilityRequest {
    #[validate(length(min = 1, max = 16))]
    pub day_of_week: String,
    #[validate(length(min = 1, max = 8))]
    pub start_time: String,
    #[validate(length(min = 1, max = 8))]
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSubjectRequest {
    pub subject_id: i64,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDistrictRequest {
    pub district_id: i64,
}

// ---- Bookings --------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub tutor_id: TutorId,
    pub subject_id: Option<i64>,
    #[validate(length(max = 40))]
    pub mode: Option<String>,
    #[validate(length(max = 120))]
    pub slot: Option<String>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    pub proposed_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusUpdate {
    pub accept: bool,
    #[validate(length(max = 2000))]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: i64,
    pub learner_id: UserId,
    pub tutor_id: TutorId,
    pub learner_name: Option<String>,
    pub learner_phone: Option<String>,
    pub tutor_name: Option<String>,
    pub subject_id: Option<i64>,
    pub subject: Option<String>,
    pub mode: Option<String>,
    pub slot: Option<String>,
    pub learner_note: Option<String>,
    pub tutor_response: Option<String>,
    pub proposed_price: Option<Decimal>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

// ---- Classes and enrollment ------------------------------------------------

/// Shared by create and update; update treats every field as optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub subject_id: Option<i64>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub class_type: Option<ClassType>,
    #[validate(range(min = 1, max = 500))]
    pub max_students: Option<i32>,
    pub price_per_session: Option<Decimal>,
    #[validate(range(min = 1))]
    pub total_sessions: Option<i32>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: Option<i32>,
    pub availability_slot_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatusUpdate {
    pub status: ClassStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResponse {
    pub id: i64,
    pub tutor_id: TutorId,
    pub tutor_name: Option<String>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub class_type: ClassType,
    pub max_students: i32,
    pub current_students: i32,
    pub available_seats: i32,
    pub price_per_session: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub status: ClassStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub schedule_day: Option<DayOfWeek>,
    pub schedule_time: Option<String>,
    pub availability_slot: Option<SlotInfo>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: i64,
    pub class_id: i64,
    pub learner_id: UserId,
    pub learner_name: Option<String>,
    pub class_name: Option<String>,
    pub tutor_name: Option<String>,
    pub subject_name: Option<String>,
    pub schedule_day: Option<DayOfWeek>,
    pub schedule_time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

// ---- Reviews and feedback --------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub tutor_id: TutorId,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    pub booking_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: i64,
    pub tutor_id: TutorId,
    pub learner_id: UserId,
    pub learner_name: Option<String>,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectReviewRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub learner_id: UserId,
    pub booking_id: Option<i64>,
    pub subject_id: Option<i64>,
    #[validate(length(min = 1, max = 4000))]
    pub feedback_text: String,
    #[validate(length(max = 2000))]
    pub strengths: Option<String>,
    #[validate(length(max = 2000))]
    pub areas_for_improvement: Option<String>,
    pub session_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub id: i64,
    pub tutor_id: TutorId,
    pub tutor_name: Option<String>,
    pub learner_id: UserId,
    pub learner_name: Option<String>,
    pub subject_name: Option<String>,
    pub feedback_text: String,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// ---- Moderation ------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlagRequest {
    pub content_type: String,
    pub content_id: i64,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagStatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagListQuery {
    pub status: Option<String>,
    pub content_type: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

// ---- Shared query types ----------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictListQuery {
    pub city_id: Option<i64>,
}
