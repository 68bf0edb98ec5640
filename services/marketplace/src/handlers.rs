use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use tutorfind_common::{ApiResponse, AppError, Page, TutorId, UserRole};
use tutorfind_database::{
    AvailabilitySlot, City, District, Flag, Notification, Review, Subject, TutorProfile,
};

use crate::availability::AvailabilityService;
use crate::bookings::BookingService;
use crate::catalog::CatalogService;
use crate::classes::ClassService;
use crate::feedback::FeedbackService;
use crate::middleware::{require_role, AuthContext};
use crate::models::*;
use crate::moderation::{ModerationService, PlatformStats};
use crate::notifications::NotificationService;
use crate::profiles::TutorService;
use crate::reviews::ReviewService;
use crate::search::SearchService;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type HandlerResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> HandlerResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn error_response(err: AppError) -> ApiError {
    if matches!(err, AppError::Database(_) | AppError::Internal(_)) {
        tracing::error!("Request failed: {:?}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error".to_string())),
        );
    }
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(err.to_string())))
}

fn validated<T: Validate>(request: &T) -> Result<(), ApiError> {
    request.validate().map_err(|errors| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Validation error: {}", errors))),
        )
    })
}

/// Tutor-scoped operations act on the caller's own profile id, never on a
/// profile id supplied by the client.
async fn resolve_tutor(state: &AppState, ctx: &AuthContext) -> Result<TutorId, AppError> {
    require_role(ctx, UserRole::Tutor)?;
    let profile = TutorService::new(state).tutor_by_user(ctx.user_id).await?;
    Ok(profile.id)
}

// ---- Health ----------------------------------------------------------------

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(
        "Marketplace service is healthy".to_string(),
    ))
}

// ---- Discovery (public) ----------------------------------------------------

pub async fn search_tutors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> HandlerResult<Page<TutorSearchResult>> {
    match SearchService::new(&state).search(query).await {
        Ok(page) => ok(page),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn get_tutor_profile(
    State(state): State<AppState>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<TutorProfileResponse> {
    match SearchService::new(&state)
        .get_tutor_profile(TutorId(tutor_id))
        .await
    {
        Ok(profile) => ok(profile),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_tutor_reviews(
    State(state): State<AppState>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<Vec<ReviewResponse>> {
    match ReviewService::new(&state)
        .reviews_for_tutor(TutorId(tutor_id))
        .await
    {
        Ok(reviews) => ok(reviews),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_tutor_slots(
    State(state): State<AppState>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<Vec<AvailabilitySlot>> {
    match AvailabilityService::new(&state)
        .list_slots(TutorId(tutor_id))
        .await
    {
        Ok(slots) => ok(slots),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Catalog (public) ------------------------------------------------------

pub async fn list_cities(State(state): State<AppState>) -> HandlerResult<Vec<City>> {
    match CatalogService::new(&state).list_cities().await {
        Ok(cities) => ok(cities),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_districts(
    State(state): State<AppState>,
    Query(query): Query<DistrictListQuery>,
) -> HandlerResult<Vec<District>> {
    match CatalogService::new(&state).list_districts(query.city_id).await {
        Ok(districts) => ok(districts),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_subjects(State(state): State<AppState>) -> HandlerResult<Vec<Subject>> {
    match CatalogService::new(&state).list_subjects().await {
        Ok(subjects) => ok(subjects),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Tutor profile ---------------------------------------------------------

pub async fn create_tutor_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateTutorProfileRequest>,
) -> HandlerResult<TutorProfile> {
    // Registration hook: the account itself or an admin may create the profile.
    if ctx.user_id != request.user_id && ctx.role != UserRole::Admin {
        return Err(error_response(AppError::Authorization(
            "You can only create your own tutor profile".to_string(),
        )));
    }

    match TutorService::new(&state).create_profile(request.user_id).await {
        Ok(profile) => ok(profile),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_tutor_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<TutorProfile> {
    if let Err(err) = require_role(&ctx, UserRole::Tutor) {
        return Err(error_response(err));
    }
    match TutorService::new(&state).tutor_by_user(ctx.user_id).await {
        Ok(profile) => ok(profile),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> HandlerResult<TutorProfile> {
    validated(&request)?;
    if let Err(err) = require_role(&ctx, UserRole::Tutor) {
        return Err(error_response(err));
    }
    match TutorService::new(&state)
        .update_profile(ctx.user_id, request)
        .await
    {
        Ok(profile) => ok(profile),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Availability ----------------------------------------------------------

pub async fn add_availability_slot(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AddAvailabilityRequest>,
) -> HandlerResult<AvailabilitySlot> {
    validated(&request)?;
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state).add_slot(tutor_id, request).await {
        Ok(slot) => ok(slot),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn remove_availability_slot(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slot_id): Path<i64>,
) -> HandlerResult<String> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state)
        .remove_slot(tutor_id, slot_id)
        .await
    {
        Ok(()) => ok("Availability slot removed".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn add_tutor_subject(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AddSubjectRequest>,
) -> HandlerResult<i64> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state)
        .add_subject(tutor_id, request.subject_id, request.proficiency)
        .await
    {
        Ok(id) => ok(id),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn remove_tutor_subject(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(subject_id): Path<i64>,
) -> HandlerResult<String> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state)
        .remove_subject(tutor_id, subject_id)
        .await
    {
        Ok(()) => ok("Subject removed".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn add_tutor_district(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AddDistrictRequest>,
) -> HandlerResult<i64> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state)
        .add_district(tutor_id, request.district_id)
        .await
    {
        Ok(id) => ok(id),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn remove_tutor_district(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(district_id): Path<i64>,
) -> HandlerResult<String> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match AvailabilityService::new(&state)
        .remove_district(tutor_id, district_id)
        .await
    {
        Ok(()) => ok("District removed".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Bookings --------------------------------------------------------------

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateBookingRequest>,
) -> HandlerResult<BookingResponse> {
    validated(&request)?;
    if let Err(err) = require_role(&ctx, UserRole::Learner) {
        return Err(error_response(err));
    }
    match BookingService::new(&state)
        .create_booking(ctx.user_id, request)
        .await
    {
        Ok(booking) => ok(booking),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn respond_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(booking_id): Path<i64>,
    Json(update): Json<BookingStatusUpdate>,
) -> HandlerResult<BookingResponse> {
    validated(&update)?;
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match BookingService::new(&state)
        .respond(booking_id, tutor_id, update)
        .await
    {
        Ok(booking) => ok(booking),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn sent_bookings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<StatusQuery>,
) -> HandlerResult<Vec<BookingResponse>> {
    match BookingService::new(&state)
        .sent_bookings(ctx.user_id, query.status)
        .await
    {
        Ok(bookings) => ok(bookings),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn received_bookings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<StatusQuery>,
) -> HandlerResult<Vec<BookingResponse>> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match BookingService::new(&state)
        .received_bookings(tutor_id, query.status)
        .await
    {
        Ok(bookings) => ok(bookings),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(booking_id): Path<i64>,
) -> HandlerResult<BookingResponse> {
    match BookingService::new(&state)
        .get_booking(booking_id, ctx.user_id)
        .await
    {
        Ok(booking) => ok(booking),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Classes ---------------------------------------------------------------

pub async fn create_class(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateClassRequest>,
) -> HandlerResult<ClassResponse> {
    validated(&request)?;
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state).create_class(tutor_id, request).await {
        Ok(class) => ok(class),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn update_class(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(class_id): Path<i64>,
    Json(request): Json<CreateClassRequest>,
) -> HandlerResult<ClassResponse> {
    validated(&request)?;
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state)
        .update_class(class_id, tutor_id, request)
        .await
    {
        Ok(class) => ok(class),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn delete_class(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(class_id): Path<i64>,
) -> HandlerResult<String> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state).delete_class(class_id, tutor_id).await {
        Ok(()) => ok("Class deleted".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn close_class(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(class_id): Path<i64>,
    Json(update): Json<ClassStatusUpdate>,
) -> HandlerResult<ClassResponse> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state)
        .close_class(class_id, tutor_id, update.status)
        .await
    {
        Ok(class) => ok(class),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_open_classes(State(state): State<AppState>) -> HandlerResult<Vec<ClassResponse>> {
    match ClassService::new(&state).list_open_classes().await {
        Ok(classes) => ok(classes),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> HandlerResult<ClassResponse> {
    match ClassService::new(&state).get_class(class_id).await {
        Ok(class) => ok(class),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_classes(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<ClassResponse>> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state).tutor_classes(tutor_id).await {
        Ok(classes) => ok(classes),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn class_roster(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(class_id): Path<i64>,
) -> HandlerResult<Vec<EnrollmentResponse>> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match ClassService::new(&state).class_roster(class_id, tutor_id).await {
        Ok(roster) => ok(roster),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn enroll_in_class(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(class_id): Path<i64>,
) -> HandlerResult<EnrollmentResponse> {
    match ClassService::new(&state).enroll(class_id, ctx.user_id).await {
        Ok(enrollment) => ok(enrollment),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn drop_enrollment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(enrollment_id): Path<i64>,
) -> HandlerResult<String> {
    match ClassService::new(&state)
        .drop_enrollment(enrollment_id, ctx.user_id)
        .await
    {
        Ok(()) => ok("Enrollment dropped".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_enrollments(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<EnrollmentListQuery>,
) -> HandlerResult<Vec<EnrollmentResponse>> {
    match ClassService::new(&state)
        .learner_enrollments(ctx.user_id, query.active_only.unwrap_or(false))
        .await
    {
        Ok(enrollments) => ok(enrollments),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Reviews and feedback --------------------------------------------------

pub async fn create_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateReviewRequest>,
) -> HandlerResult<Review> {
    validated(&request)?;
    if let Err(err) = require_role(&ctx, UserRole::Learner) {
        return Err(error_response(err));
    }
    match ReviewService::new(&state)
        .create_review(ctx.user_id, request)
        .await
    {
        Ok(review) => ok(review),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_reviews(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<ReviewResponse>> {
    match ReviewService::new(&state).my_reviews(ctx.user_id).await {
        Ok(reviews) => ok(reviews),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateFeedbackRequest>,
) -> HandlerResult<FeedbackResponse> {
    validated(&request)?;
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match FeedbackService::new(&state)
        .create_feedback(tutor_id, request)
        .await
    {
        Ok(feedback) => ok(feedback),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_received_feedback(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<FeedbackResponse>> {
    match FeedbackService::new(&state)
        .feedback_for_learner(ctx.user_id)
        .await
    {
        Ok(feedback) => ok(feedback),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn my_given_feedback(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<FeedbackResponse>> {
    let tutor_id = match resolve_tutor(&state, &ctx).await {
        Ok(id) => id,
        Err(err) => return Err(error_response(err)),
    };
    match FeedbackService::new(&state).feedback_by_tutor(tutor_id).await {
        Ok(feedback) => ok(feedback),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Flags and moderation --------------------------------------------------

pub async fn create_flag(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateFlagRequest>,
) -> HandlerResult<Flag> {
    validated(&request)?;
    match ModerationService::new(&state)
        .create_flag(ctx.user_id, request)
        .await
    {
        Ok(flag) => ok(flag),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn list_flags(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<FlagListQuery>,
) -> HandlerResult<Page<Flag>> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state)
        .list_flags(
            query.status,
            query.content_type,
            query.page.unwrap_or(0),
            query.size.unwrap_or(20),
        )
        .await
    {
        Ok(flags) => ok(flags),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn update_flag_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(flag_id): Path<i64>,
    Json(update): Json<FlagStatusUpdate>,
) -> HandlerResult<Flag> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state)
        .update_flag_status(flag_id, &update.status)
        .await
    {
        Ok(flag) => ok(flag),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn pending_reviews(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<Review>> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state).pending_reviews().await {
        Ok(reviews) => ok(reviews),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn approve_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(review_id): Path<i64>,
) -> HandlerResult<Review> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state).approve_review(review_id).await {
        Ok(review) => ok(review),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn reject_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(review_id): Path<i64>,
    Json(request): Json<RejectReviewRequest>,
) -> HandlerResult<Review> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state)
        .reject_review(review_id, request.reason)
        .await
    {
        Ok(review) => ok(review),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn unverified_tutors(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<TutorProfile>> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state).unverified_tutors().await {
        Ok(tutors) => ok(tutors),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn verify_tutor(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<String> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state)
        .set_tutor_verified(TutorId(tutor_id), true)
        .await
    {
        Ok(()) => ok("Tutor verified".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn unverify_tutor(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<String> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state)
        .set_tutor_verified(TutorId(tutor_id), false)
        .await
    {
        Ok(()) => ok("Tutor verification revoked".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn deactivate_tutor(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<String> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match TutorService::new(&state)
        .set_active(TutorId(tutor_id), false)
        .await
    {
        Ok(()) => ok("Tutor deactivated".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn activate_tutor(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(tutor_id): Path<i64>,
) -> HandlerResult<String> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match TutorService::new(&state)
        .set_active(TutorId(tutor_id), true)
        .await
    {
        Ok(()) => ok("Tutor activated".to_string()),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn platform_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<PlatformStats> {
    if let Err(err) = require_role(&ctx, UserRole::Admin) {
        return Err(error_response(err));
    }
    match ModerationService::new(&state).platform_stats().await {
        Ok(stats) => ok(stats),
        Err(err) => Err(error_response(err)),
    }
}

// ---- Notifications ---------------------------------------------------------

pub async fn my_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> HandlerResult<Page<Notification>> {
    match NotificationService::new(&state)
        .list_for_user(ctx.user_id, query.page.unwrap_or(0), query.size.unwrap_or(20))
        .await
    {
        Ok(notifications) => ok(notifications),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn unread_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<Vec<Notification>> {
    match NotificationService::new(&state).list_unread(ctx.user_id).await {
        Ok(notifications) => ok(notifications),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(notification_id): Path<i64>,
) -> HandlerResult<Notification> {
    match NotificationService::new(&state)
        .mark_as_read(notification_id, ctx.user_id)
        .await
    {
        Ok(notification) => ok(notification),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> HandlerResult<u64> {
    match NotificationService::new(&state).mark_all_read(ctx.user_id).await {
        Ok(count) => ok(count),
        Err(err) => Err(error_response(err)),
    }
}
