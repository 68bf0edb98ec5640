use rust_decimal::Decimal;
use sqlx::PgPool;

use tutorfind_common::{
    AppError, BookingStatus, ClassStatus, EnrollmentStatus, ReviewStatus, TutorId, UserId,
};
use tutorfind_database::MigrationRunner;

use tutorfind_marketplace::availability::AvailabilityService;
use tutorfind_marketplace::bookings::BookingService;
use tutorfind_marketplace::catalog::CatalogService;
use tutorfind_marketplace::classes::ClassService;
use tutorfind_marketplace::models::{
    AddAvailabilityRequest, BookingStatusUpdate, CreateBookingRequest, CreateClassRequest,
    CreateFlagRequest, CreateReviewRequest, SearchQuery, UpdateProfileRequest,
};
use tutorfind_marketplace::moderation::ModerationService;
use tutorfind_marketplace::profiles::TutorService;
use tutorfind_marketplace::reviews::ReviewService;
use tutorfind_marketplace::search::SearchService;

async fn setup_pool() -> Option<PgPool> {
    // Skip test if no database is available
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            println!("Skipping integration test - DATABASE_URL not set");
            return None;
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    let runner = MigrationRunner::new(pool.clone());
    runner
        .run_all_migrations()
        .await
        .expect("Failed to run migrations");

    // Start from a clean slate; the catalog is reseeded below.
    sqlx::query("TRUNCATE users, cities, districts, subjects RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to truncate tables");

    runner
        .seed_catalog_data()
        .await
        .expect("Failed to seed catalog");

    Some(pool)
}

async fn create_user(pool: &PgPool, role: &str, username: &str) -> UserId {
    sqlx::query_scalar::<_, UserId>(
        r#"
        INSERT INTO users (username, email, role, first_name, last_name, phone_number)
        VALUES ($1, $2, $3::user_role, $4, $5, '+994501234567')
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(role)
    .bind(username)
    .bind("Test")
    .fetch_one(pool)
    .await
    .expect("Failed to insert user")
}

async fn tutor_rating(pool: &PgPool, tutor_id: TutorId) -> (Decimal, i32) {
    sqlx::query_as::<_, (Decimal, i32)>(
        "SELECT rating_avg, rating_count FROM tutor_profiles WHERE id = $1",
    )
    .bind(tutor_id)
    .fetch_one(pool)
    .await
    .expect("Failed to read tutor rating")
}

async fn class_state(pool: &PgPool, class_id: i64) -> (i32, ClassStatus, i64) {
    let (current, status) = sqlx::query_as::<_, (i32, ClassStatus)>(
        "SELECT current_students, status FROM classes WHERE id = $1",
    )
    .bind(class_id)
    .fetch_one(pool)
    .await
    .expect("Failed to read class");

    let active = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE class_id = $1 AND status = 'ACTIVE'",
    )
    .bind(class_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count enrollments");

    (current, status, active)
}

#[tokio::test]
async fn marketplace_end_to_end_flows() {
    let pool = match setup_pool().await {
        Some(pool) => pool,
        None => return,
    };

    let catalog = CatalogService::with_pool(pool.clone());
    let tutors = TutorService::with_pool(pool.clone());
    let availability = AvailabilityService::with_pool(pool.clone());
    let search = SearchService::with_pool(pool.clone());
    let bookings = BookingService::with_pool(pool.clone());
    let classes = ClassService::with_pool(pool.clone());
    let reviews = ReviewService::with_pool(pool.clone());
    let moderation = ModerationService::with_pool(pool.clone());

    // ---- Tutor setup: rate 150, Baku, Math, MON 10:00-12:00 ----------------

    let tutor_user = create_user(&pool, "TUTOR", "tutor_anna").await;
    let profile = tutors.create_profile(tutor_user).await.expect("profile");
    let tutor_id = profile.id;
    assert_eq!(profile.user_id, tutor_user);

    let baku = catalog
        .city_by_name("Baku")
        .await
        .expect("city query")
        .expect("Baku seeded");
    let math = catalog
        .subject_by_name("Math")
        .await
        .expect("subject query")
        .expect("Math seeded");

    tutors
        .update_profile(
            tutor_user,
            UpdateProfileRequest {
                headline: Some("Experienced math tutor".to_string()),
                bio: None,
                qualifications: None,
                experience_years: Some(5),
                monthly_rate: Some(Decimal::from(150)),
                city_id: Some(baku.id),
            },
        )
        .await
        .expect("update profile");

    availability
        .add_subject(tutor_id, math.id, None)
        .await
        .expect("add subject");
    let slot = availability
        .add_slot(
            tutor_id,
            AddAvailabilityRequest {
                day_of_week: "MON".to_string(),
                start_time: "10:00".to_string(),
                end_time: "12:00".to_string(),
            },
        )
        .await
        .expect("add slot");

    // Overlapping slots are allowed by design.
    availability
        .add_slot(
            tutor_id,
            AddAvailabilityRequest {
                day_of_week: "MON".to_string(),
                start_time: "11:00".to_string(),
                end_time: "13:00".to_string(),
            },
        )
        .await
        .expect("overlapping slot");

    // ---- Discovery ---------------------------------------------------------

    let mut query = SearchQuery::default();
    query.city = Some("Baku".to_string());
    query.subject = Some("Math".to_string());
    query.availability_day = Some("MON".to_string());
    query.availability_start = Some("10:00".to_string());
    query.availability_end = Some("11:00".to_string());

    let page = search.search(query.clone()).await.expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, tutor_id);
    assert_eq!(page.items[0].city.as_deref(), Some("Baku"));

    // 10:00-13:00 is covered by no single slot (10-12 and 11-13 each fall short)
    query.availability_end = Some("13:00".to_string());
    let page = search.search(query).await.expect("search");
    assert_eq!(page.total, 0);

    let mut price_query = SearchQuery::default();
    price_query.min_price = Some(Decimal::from(100));
    price_query.max_price = Some(Decimal::from(200));
    let page = search.search(price_query).await.expect("price search");
    assert_eq!(page.total, 1);

    let mut price_query = SearchQuery::default();
    price_query.min_price = Some(Decimal::from(200));
    let page = search.search(price_query).await.expect("price search");
    assert_eq!(page.total, 0);

    // ---- Booking lifecycle -------------------------------------------------

    let learner = create_user(&pool, "LEARNER", "learner_elvin").await;

    let booking = bookings
        .create_booking(
            learner,
            CreateBookingRequest {
                tutor_id,
                subject_id: Some(math.id),
                mode: Some("online".to_string()),
                slot: Some("Monday 10:00-11:00".to_string()),
                note: Some("Looking for exam prep".to_string()),
                proposed_price: None,
            },
        )
        .await
        .expect("create booking");
    assert_eq!(booking.status, BookingStatus::Pending);

    let responded = bookings
        .respond(
            booking.id,
            tutor_id,
            BookingStatusUpdate {
                accept: true,
                response: Some("See you Monday".to_string()),
            },
        )
        .await
        .expect("respond");
    assert_eq!(responded.status, BookingStatus::Accepted);
    assert!(responded.responded_at.is_some());

    // A booking is responded to exactly once
    let err = bookings
        .respond(
            booking.id,
            tutor_id,
            BookingStatusUpdate {
                accept: false,
                response: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Only the owning tutor may respond
    let other_tutor_user = create_user(&pool, "TUTOR", "tutor_rashad").await;
    let other_tutor = tutors.create_profile(other_tutor_user).await.expect("profile");
    let pending = bookings
        .create_booking(
            learner,
            CreateBookingRequest {
                tutor_id,
                subject_id: None,
                mode: None,
                slot: None,
                note: None,
                proposed_price: None,
            },
        )
        .await
        .expect("second booking");
    let err = bookings
        .respond(
            pending.id,
            other_tutor.id,
            BookingStatusUpdate {
                accept: true,
                response: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // ---- Enrollment lifecycle ----------------------------------------------

    let mut class_request = CreateClassRequest::default();
    class_request.name = Some("Algebra basics".to_string());
    class_request.max_students = Some(1);
    class_request.availability_slot_id = Some(slot.id);
    class_request.subject_id = Some(math.id);
    let class = classes
        .create_class(tutor_id, class_request)
        .await
        .expect("create class");
    assert_eq!(class.status, ClassStatus::Open);

    let enrollment = classes.enroll(class.id, learner).await.expect("enroll");
    assert_eq!(enrollment.status, EnrollmentStatus::Active);

    let (current, status, active) = class_state(&pool, class.id).await;
    assert_eq!((current, active), (1, 1));
    assert_eq!(status, ClassStatus::Full);

    // Full class rejects another learner
    let learner2 = create_user(&pool, "LEARNER", "learner_nigar").await;
    let err = classes.enroll(class.id, learner2).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Drop reopens the class and keeps the counts consistent
    classes
        .drop_enrollment(enrollment.id, learner)
        .await
        .expect("drop");
    let (current, status, active) = class_state(&pool, class.id).await;
    assert_eq!((current, active), (0, 0));
    assert_eq!(status, ClassStatus::Open);

    // Dropping twice fails
    let err = classes
        .drop_enrollment(enrollment.id, learner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A dropped learner can re-enroll; the seat row is reactivated
    let again = classes.enroll(class.id, learner).await.expect("re-enroll");
    assert_eq!(again.id, enrollment.id);
    assert_eq!(again.status, EnrollmentStatus::Active);
    let (current, _, active) = class_state(&pool, class.id).await;
    assert_eq!((current, active), (1, 1));
    classes
        .drop_enrollment(again.id, learner)
        .await
        .expect("drop again");

    // Concurrent enrollments never overshoot capacity
    let (first, second) = tokio::join!(
        classes.enroll(class.id, learner),
        ClassService::with_pool(pool.clone()).enroll(class.id, learner2),
    );
    assert_eq!(
        first.is_ok() as i32 + second.is_ok() as i32,
        1,
        "exactly one of two concurrent enrollments wins a single seat"
    );
    let (current, _, active) = class_state(&pool, class.id).await;
    assert_eq!((current, active), (1, 1));

    // ---- Review moderation and rating aggregation --------------------------

    let review = reviews
        .create_review(
            learner,
            CreateReviewRequest {
                tutor_id,
                rating: 5,
                comment: Some("Great tutor".to_string()),
                booking_id: Some(booking.id),
            },
        )
        .await
        .expect("create review");
    assert_eq!(review.status, ReviewStatus::Pending);

    // A pending review does not touch the aggregate
    assert_eq!(tutor_rating(&pool, tutor_id).await, (Decimal::ZERO, 0));

    // One review per learner per tutor
    let err = reviews
        .create_review(
            learner,
            CreateReviewRequest {
                tutor_id,
                rating: 4,
                comment: None,
                booking_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    moderation.approve_review(review.id).await.expect("approve");
    assert_eq!(tutor_rating(&pool, tutor_id).await, (Decimal::from(5), 1));

    // A second approved review moves the mean
    let review2 = reviews
        .create_review(
            learner2,
            CreateReviewRequest {
                tutor_id,
                rating: 4,
                comment: None,
                booking_id: None,
            },
        )
        .await
        .expect("second review");
    moderation.approve_review(review2.id).await.expect("approve");
    let (avg, count) = tutor_rating(&pool, tutor_id).await;
    assert_eq!(avg, "4.50".parse().unwrap());
    assert_eq!(count, 2);

    // Rejecting an approved review removes it from the aggregate
    moderation
        .reject_review(review2.id, Some("spam".to_string()))
        .await
        .expect("reject");
    assert_eq!(tutor_rating(&pool, tutor_id).await, (Decimal::from(5), 1));

    moderation.reject_review(review.id, None).await.expect("reject");
    assert_eq!(tutor_rating(&pool, tutor_id).await, (Decimal::ZERO, 0));

    // REJECTED -> APPROVED is not a reachable transition
    let err = moderation.approve_review(review.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Rejecting a pending review never touches the aggregate
    let learner3 = create_user(&pool, "LEARNER", "learner_kamran").await;
    let review3 = reviews
        .create_review(
            learner3,
            CreateReviewRequest {
                tutor_id,
                rating: 1,
                comment: None,
                booking_id: None,
            },
        )
        .await
        .expect("third review");
    moderation.reject_review(review3.id, None).await.expect("reject");
    assert_eq!(tutor_rating(&pool, tutor_id).await, (Decimal::ZERO, 0));

    // ---- Flag ledger -------------------------------------------------------

    let flag = moderation
        .create_flag(
            learner,
            CreateFlagRequest {
                content_type: "REVIEW".to_string(),
                content_id: review.id,
                reason: "Inappropriate language".to_string(),
            },
        )
        .await
        .expect("create flag");

    let page = moderation
        .list_flags(Some("PENDING".to_string()), Some("REVIEW".to_string()), 0, 10)
        .await
        .expect("list flags");
    assert!(page.items.iter().any(|f| f.id == flag.id));

    // Any status to any status is allowed on flags
    moderation
        .update_flag_status(flag.id, "HIDDEN")
        .await
        .expect("hide");
    moderation
        .update_flag_status(flag.id, "PENDING")
        .await
        .expect("back to pending");

    let err = moderation
        .update_flag_status(flag.id, "BOGUS")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
