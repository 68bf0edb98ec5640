use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::identity_middleware;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Tutor discovery
        .route("/tutors", get(handlers::search_tutors))
        .route("/tutors/:tutor_id", get(handlers::get_tutor_profile))
        .route("/tutors/:tutor_id/reviews", get(handlers::list_tutor_reviews))
        .route("/tutors/:tutor_id/availability", get(handlers::list_tutor_slots))
        // Classes (public browse)
        .route("/classes", get(handlers::list_open_classes))
        .route("/classes/:class_id", get(handlers::get_class))
        // Catalog
        .route("/catalog/cities", get(handlers::list_cities))
        .route("/catalog/districts", get(handlers::list_districts))
        .route("/catalog/subjects", get(handlers::list_subjects));

    let protected = Router::new()
        // Tutor profile management
        .route("/profile", post(handlers::create_tutor_profile))
        .route("/profile/me", get(handlers::my_tutor_profile))
        .route("/profile/me", put(handlers::update_my_profile))
        // Availability and memberships
        .route("/availability", post(handlers::add_availability_slot))
        .route("/availability/:slot_id", delete(handlers::remove_availability_slot))
        .route("/profile/subjects", post(handlers::add_tutor_subject))
        .route("/profile/subjects/:subject_id", delete(handlers::remove_tutor_subject))
        .route("/profile/districts", post(handlers::add_tutor_district))
        .route("/profile/districts/:district_id", delete(handlers::remove_tutor_district))
        // Bookings
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/sent", get(handlers::sent_bookings))
        .route("/bookings/received", get(handlers::received_bookings))
        .route("/bookings/:booking_id", get(handlers::get_booking))
        .route("/bookings/:booking_id/respond", post(handlers::respond_booking))
        // Classes and enrollment
        .route("/classes", post(handlers::create_class))
        .route("/classes/mine", get(handlers::my_classes))
        .route("/classes/:class_id", put(handlers::update_class))
        .route("/classes/:class_id", delete(handlers::delete_class))
        .route("/classes/:class_id/status", put(handlers::close_class))
        .route("/classes/:class_id/roster", get(handlers::class_roster))
        .route("/classes/:class_id/enroll", post(handlers::enroll_in_class))
        .route("/enrollments", get(handlers::my_enrollments))
        .route("/enrollments/:enrollment_id", delete(handlers::drop_enrollment))
        // Reviews and feedback
        .route("/reviews", post(handlers::create_review))
        .route("/reviews/mine", get(handlers::my_reviews))
        .route("/feedback", post(handlers::create_feedback))
        .route("/feedback/received", get(handlers::my_received_feedback))
        .route("/feedback/given", get(handlers::my_given_feedback))
        // Flags
        .route("/flags", post(handlers::create_flag))
        .route("/flags", get(handlers::list_flags))
        .route("/flags/:flag_id/status", put(handlers::update_flag_status))
        // Admin moderation
        .route("/admin/reviews/pending", get(handlers::pending_reviews))
        .route("/admin/reviews/:review_id/approve", post(handlers::approve_review))
        .route("/admin/reviews/:review_id/reject", post(handlers::reject_review))
        .route("/admin/tutors/unverified", get(handlers::unverified_tutors))
        .route("/admin/tutors/:tutor_id/verify", post(handlers::verify_tutor))
        .route("/admin/tutors/:tutor_id/unverify", post(handlers::unverify_tutor))
        .route("/admin/tutors/:tutor_id/deactivate", post(handlers::deactivate_tutor))
        .route("/admin/tutors/:tutor_id/activate", post(handlers::activate_tutor))
        .route("/admin/stats", get(handlers::platform_stats))
        // Notifications
        .route("/notifications", get(handlers::my_notifications))
        .route("/notifications/unread", get(handlers::unread_notifications))
        .route("/notifications/:notification_id/read", post(handlers::mark_notification_read))
        .route("/notifications/read-all", post(handlers::mark_all_notifications_read))
        .route_layer(from_fn_with_state(state, identity_middleware));

    public.merge(protected)
}
