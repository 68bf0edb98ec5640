use std::collections::HashMap;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sqlx::PgPool;

use tutorfind_common::{AppError, DayOfWeek, Page, SortBy, TutorId, UserId};
use tutorfind_database::{AvailabilitySlot, Review, TutorProfile, TutorSubject, User};

use crate::availability::{parse_day, parse_time, slot_covers};
use crate::catalog::CatalogService;
use crate::models::{
    ReviewResponse, SearchQuery, SlotInfo, SubjectInfo, TutorProfileResponse, TutorSearchResult,
};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

/// Parsed and validated discovery filter. All criteria are optional; an
/// absent criterion never excludes a candidate.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub city: Option<String>,
    pub district: Option<String>,
    pub subject: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    pub day: Option<DayOfWeek>,
    pub window: Option<(NaiveTime, NaiveTime)>,
    pub page: i64,
    pub page_size: i64,
    pub sort_by: SortBy,
}

impl SearchFilter {
    pub fn from_query(query: &SearchQuery) -> Result<Self, AppError> {
        let page = query.page.unwrap_or(0);
        if page < 0 {
            return Err(AppError::Validation("page must be >= 0".to_string()));
        }

        let page_size = query.size.unwrap_or(10);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::Validation(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let day = query
            .availability_day
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(parse_day)
            .transpose()?;

        let window = match (
            query.availability_start.as_deref(),
            query.availability_end.as_deref(),
        ) {
            (None, None) => None,
            (Some(start), Some(end)) => {
                let start = parse_time(start)?;
                let end = parse_time(end)?;
                if start >= end {
                    return Err(AppError::Validation(
                        "availabilityStart must be before availabilityEnd".to_string(),
                    ));
                }
                Some((start, end))
            }
            _ => {
                return Err(AppError::Validation(
                    "availabilityStart and availabilityEnd must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            city: normalized(&query.city),
            district: normalized(&query.district),
            subject: normalized(&query.subject),
            min_price: query.min_price,
            max_price: query.max_price,
            min_rating: query.min_rating,
            day,
            window,
            page,
            page_size,
            sort_by: SortBy::parse_or_default(query.sort_by.as_deref()),
        })
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Catalog names resolved to ids. A named filter that resolves to nothing
/// short-circuits the whole search to an empty page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedNames {
    pub city_id: Option<i64>,
    pub district_id: Option<i64>,
    pub subject_id: Option<i64>,
}

/// An active tutor joined with the membership rows discovery filters on.
#[derive(Debug, Clone)]
pub struct TutorCandidate {
    pub profile: TutorProfile,
    pub subject_ids: Vec<i64>,
    pub district_ids: Vec<i64>,
    pub slots: Vec<AvailabilitySlot>,
}

/// AND across present criteria; membership criteria match ANY of the tutor's
/// own rows; availability needs one slot containing the requested window.
pub fn matches_filter(
    candidate: &TutorCandidate,
    resolved: &ResolvedNames,
    filter: &SearchFilter,
) -> bool {
    let profile = &candidate.profile;

    if !profile.is_active {
        return false;
    }
    if let Some(city_id) = resolved.city_id {
        if profile.city_id != Some(city_id) {
            return false;
        }
    }
    if let Some(district_id) = resolved.district_id {
        if !candidate.district_ids.contains(&district_id) {
            return false;
        }
    }
    if let Some(subject_id) = resolved.subject_id {
        if !candidate.subject_ids.contains(&subject_id) {
            return false;
        }
    }
    if let Some(min) = filter.min_price {
        if profile.monthly_rate < min {
            return false;
        }
    }
    if let Some(max) = filter.max_price {
        if profile.monthly_rate > max {
            return false;
        }
    }
    if let Some(min) = filter.min_rating {
        if profile.rating_avg < min {
            return false;
        }
    }
    if filter.day.is_some() || filter.window.is_some() {
        if !candidate
            .slots
            .iter()
            .any(|slot| slot_covers(slot, filter.day, filter.window))
        {
            return false;
        }
    }
    true
}

/// Deterministic ordering: the requested sort key, ties broken by tutor id
/// ascending so pagination is stable across requests.
pub fn rank(candidates: &mut [TutorCandidate], sort_by: SortBy) {
    candidates.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Rating => b.profile.rating_avg.cmp(&a.profile.rating_avg),
            SortBy::PriceAsc => a.profile.monthly_rate.cmp(&b.profile.monthly_rate),
            SortBy::PriceDesc => b.profile.monthly_rate.cmp(&a.profile.monthly_rate),
        };
        ordering.then_with(|| a.profile.id.cmp(&b.profile.id))
    });
}

/// Offset pagination over the fully filtered and sorted set.
pub fn paginate<T>(items: Vec<T>, page: i64, page_size: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let offset = page.saturating_mul(page_size);
    if offset >= total {
        return (Vec::new(), total);
    }
    let items = items
        .into_iter()
        .skip(offset as usize)
        .take(page_size as usize)
        .collect();
    (items, total)
}

pub struct SearchService {
    db_pool: PgPool,
}

impl SearchService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn search(&self, query: SearchQuery) -> Result<Page<TutorSearchResult>, AppError> {
        let filter = SearchFilter::from_query(&query)?;
        let catalog = CatalogService::with_pool(self.db_pool.clone());

        let mut resolved = ResolvedNames::default();
        if let Some(city) = &filter.city {
            match catalog.city_by_name(city).await? {
                Some(city) => resolved.city_id = Some(city.id),
                None => return Ok(Page::empty(filter.page, filter.page_size)),
            }
        }
        if let Some(district) = &filter.district {
            match catalog.district_by_name(district).await? {
                Some(district) => resolved.district_id = Some(district.id),
                None => return Ok(Page::empty(filter.page, filter.page_size)),
            }
        }
        if let Some(subject) = &filter.subject {
            match catalog.subject_by_name(subject).await? {
                Some(subject) => resolved.subject_id = Some(subject.id),
                None => return Ok(Page::empty(filter.page, filter.page_size)),
            }
        }

        let mut candidates = self.load_candidates().await?;
        candidates.retain(|candidate| matches_filter(candidate, &resolved, &filter));
        rank(&mut candidates, filter.sort_by);

        let (page_items, total) = paginate(candidates, filter.page, filter.page_size);
        let items = self.hydrate(page_items).await?;

        Ok(Page {
            items,
            page: filter.page,
            page_size: filter.page_size,
            total,
        })
    }

    async fn load_candidates(&self) -> Result<Vec<TutorCandidate>, AppError> {
        let profiles = sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE is_active = TRUE ORDER BY id",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let tutor_ids: Vec<i64> = profiles.iter().map(|p| p.id.0).collect();

        let subjects = sqlx::query_as::<_, TutorSubject>(
            "SELECT * FROM tutor_subjects WHERE tutor_id = ANY($1)",
        )
        .bind(&tutor_ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let districts = sqlx::query_as::<_, tutorfind_database::TutorDistrict>(
            "SELECT * FROM tutor_districts WHERE tutor_id = ANY($1)",
        )
        .bind(&tutor_ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let slots = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT * FROM availability_slots WHERE tutor_id = ANY($1) AND is_active = TRUE",
        )
        .bind(&tutor_ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let mut subjects_by_tutor: HashMap<TutorId, Vec<i64>> = HashMap::new();
        for row in subjects {
            subjects_by_tutor
                .entry(row.tutor_id)
                .or_default()
                .push(row.subject_id);
        }
        let mut districts_by_tutor: HashMap<TutorId, Vec<i64>> = HashMap::new();
        for row in districts {
            districts_by_tutor
                .entry(row.tutor_id)
                .or_default()
                .push(row.district_id);
        }
        let mut slots_by_tutor: HashMap<TutorId, Vec<AvailabilitySlot>> = HashMap::new();
        for slot in slots {
            slots_by_tutor.entry(slot.tutor_id).or_default().push(slot);
        }

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let id = profile.id;
                TutorCandidate {
                    profile,
                    subject_ids: subjects_by_tutor.remove(&id).unwrap_or_default(),
                    district_ids: districts_by_tutor.remove(&id).unwrap_or_default(),
                    slots: slots_by_tutor.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn hydrate(
        &self,
        candidates: Vec<TutorCandidate>,
    ) -> Result<Vec<TutorSearchResult>, AppError> {
        let user_ids: Vec<i64> = candidates.iter().map(|c| c.profile.user_id.0).collect();
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(&user_ids)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)?;
        let users: HashMap<UserId, User> = users.into_iter().map(|u| (u.id, u)).collect();

        let catalog = CatalogService::with_pool(self.db_pool.clone());
        let cities: HashMap<i64, String> = catalog
            .list_cities()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let profile = candidate.profile;
                let user = users.get(&profile.user_id);
                TutorSearchResult {
                    id: profile.id,
                    user_id: profile.user_id,
                    first_name: user.map(|u| u.first_name.clone()),
                    last_name: user.map(|u| u.last_name.clone()),
                    headline: profile.headline,
                    bio: profile.bio,
                    city: profile.city_id.and_then(|id| cities.get(&id).cloned()),
                    monthly_rate: profile.monthly_rate,
                    rating: profile.rating_avg,
                    review_count: profile.rating_count,
                    experience_years: profile.experience_years,
                    is_verified: profile.is_verified,
                }
            })
            .collect())
    }

    /// Full public profile for the tutor detail page.
    pub async fn get_tutor_profile(
        &self,
        tutor_id: TutorId,
    ) -> Result<TutorProfileResponse, AppError> {
        let profile = sqlx::query_as::<_, TutorProfile>(
            "SELECT * FROM tutor_profiles WHERE id = $1",
        )
        .bind(tutor_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Tutor profile not found".to_string()))?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(profile.user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        let catalog = CatalogService::with_pool(self.db_pool.clone());
        let city = match profile.city_id {
            Some(city_id) => catalog.get_city(city_id).await.ok().map(|c| c.name),
            None => None,
        };

        let districts = sqlx::query_scalar::<_, String>(
            r#"
            SELECT d.name FROM tutor_districts td
            JOIN districts d ON d.id = td.district_id
            WHERE td.tutor_id = $1
            ORDER BY d.name
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let subjects = sqlx::query_as::<_, SubjectInfo>(
            r#"
            SELECT s.id, s.name, s.category FROM tutor_subjects ts
            JOIN subjects s ON s.id = ts.subject_id
            WHERE ts.tutor_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let slots = sqlx::query_as::<_, AvailabilitySlot>(
            r#"
            SELECT * FROM availability_slots
            WHERE tutor_id = $1 AND is_active = TRUE
            ORDER BY day_of_week, start_time
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let reviews = self.approved_reviews(tutor_id).await?;

        Ok(TutorProfileResponse {
            id: profile.id,
            user_id: profile.user_id,
            first_name: user.as_ref().map(|u| u.first_name.clone()),
            last_name: user.as_ref().map(|u| u.last_name.clone()),
            phone_number: user.as_ref().and_then(|u| u.phone_number.clone()),
            headline: profile.headline,
            bio: profile.bio,
            qualifications: profile.qualifications,
            experience_years: profile.experience_years,
            monthly_rate: profile.monthly_rate,
            rating: profile.rating_avg,
            review_count: profile.rating_count,
            is_verified: profile.is_verified,
            is_active: profile.is_active,
            city,
            districts,
            subjects,
            availability: slots.into_iter().map(SlotInfo::from).collect(),
            reviews,
        })
    }

    async fn approved_reviews(&self, tutor_id: TutorId) -> Result<Vec<ReviewResponse>, AppError> {
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
    use crate::availability::parse_time;
    use chrono::Utc;

    fn profile(id: i64, rate: i64, rating: &str) -> TutorProfile {
        TutorProfile {
            id: TutorId(id),
            user_id: UserId(id + 100),
            city_id: None,
            headline: None,
            bio: None,
            qualifications: None,
            experience_years: None,
            monthly_rate: Decimal::from(rate),
            rating_avg: rating.parse().unwrap(),
            rating_count: 0,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn candidate(id: i64, rate: i64, rating: &str) -> TutorCandidate {
        TutorCandidate {
            profile: profile(id, rate, rating),
            subject_ids: Vec::new(),
            district_ids: Vec::new(),
            slots: Vec::new(),
        }
    }

    fn slot(tutor_id: i64, day: DayOfWeek, start: &str, end: &str) -> AvailabilitySlot {
        AvailabilitySlot {
            id: tutor_id,
            tutor_id: TutorId(tutor_id),
            day_of_week: day,
            start_time: parse_time(start).unwrap(),
            end_time: parse_time(end).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn empty_filter() -> SearchFilter {
        SearchFilter::from_query(&SearchQuery::default()).unwrap()
    }

    #[test]
    fn absent_filters_match_every_active_tutor() {
        let filter = empty_filter();
        let resolved = ResolvedNames::default();
        assert!(matches_filter(&candidate(1, 150, "4.5"), &resolved, &filter));

        let mut inactive = candidate(2, 150, "4.5");
        inactive.profile.is_active = false;
        assert!(!matches_filter(&inactive, &resolved, &filter));
    }

    #[test]
    fn price_bounds_compose_as_and() {
        let mut filter = empty_filter();
        filter.min_price = Some(Decimal::from(100));
        filter.max_price = Some(Decimal::from(200));
        let resolved = ResolvedNames::default();

        assert!(matches_filter(&candidate(1, 100, "0"), &resolved, &filter));
        assert!(matches_filter(&candidate(2, 200, "0"), &resolved, &filter));
        assert!(!matches_filter(&candidate(3, 99, "0"), &resolved, &filter));
        assert!(!matches_filter(&candidate(4, 201, "0"), &resolved, &filter));
    }

    #[test]
    fn min_rating_is_inclusive() {
        let mut filter = empty_filter();
        filter.min_rating = Some("4.0".parse().unwrap());
        let resolved = ResolvedNames::default();

        assert!(matches_filter(&candidate(1, 100, "4.0"), &resolved, &filter));
        assert!(!matches_filter(&candidate(2, 100, "3.99"), &resolved, &filter));
    }

    #[test]
    fn subject_filter_matches_any_membership_row() {
        let filter = empty_filter();
        let resolved = ResolvedNames {
            subject_id: Some(7),
            ..Default::default()
        };

        let mut with = candidate(1, 100, "0");
        with.subject_ids = vec![3, 7];
        let mut without = candidate(2, 100, "0");
        without.subject_ids = vec![3, 4];

        assert!(matches_filter(&with, &resolved, &filter));
        assert!(!matches_filter(&without, &resolved, &filter));
    }

    #[test]
    fn availability_requires_containment_not_overlap() {
        let mut filter = empty_filter();
        filter.day = Some(DayOfWeek::Monday);
        filter.window = Some((
            parse_time("10:00").unwrap(),
            parse_time("11:00").unwrap(),
        ));
        let resolved = ResolvedNames::default();

        let mut tutor = candidate(1, 100, "0");
        tutor.slots = vec![slot(1, DayOfWeek::Monday, "09:00", "12:00")];
        assert!(matches_filter(&tutor, &resolved, &filter));

        // Window extends past the slot: partial overlap rejected
        filter.window = Some((
            parse_time("10:00").unwrap(),
            parse_time("13:00").unwrap(),
        ));
        assert!(!matches_filter(&tutor, &resolved, &filter));

        // Wrong day
        filter.window = Some((
            parse_time("10:00").unwrap(),
            parse_time("11:00").unwrap(),
        ));
        filter.day = Some(DayOfWeek::Tuesday);
        assert!(!matches_filter(&tutor, &resolved, &filter));
    }

    #[test]
    fn one_matching_slot_is_enough() {
        let mut filter = empty_filter();
        filter.day = Some(DayOfWeek::Monday);
        filter.window = Some((
            parse_time("10:00").unwrap(),
            parse_time("11:00").unwrap(),
        ));
        let resolved = ResolvedNames::default();

        let mut tutor = candidate(1, 100, "0");
        tutor.slots = vec![
            slot(1, DayOfWeek::Monday, "14:00", "16:00"),
            slot(1, DayOfWeek::Monday, "09:00", "12:00"),
        ];
        assert!(matches_filter(&tutor, &resolved, &filter));
    }

    #[test]
    fn rating_sort_descends_with_id_tie_break() {
        let mut candidates = vec![
            candidate(3, 100, "4.5"),
            candidate(1, 200, "4.5"),
            candidate(2, 300, "5.0"),
        ];
        rank(&mut candidates, SortBy::Rating);
        let ids: Vec<i64> = candidates.iter().map(|c| c.profile.id.0).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn price_sorts_are_deterministic() {
        let mut candidates = vec![
            candidate(2, 200, "0"),
            candidate(3, 100, "0"),
            candidate(1, 200, "0"),
        ];
        rank(&mut candidates, SortBy::PriceAsc);
        let ids: Vec<i64> = candidates.iter().map(|c| c.profile.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        rank(&mut candidates, SortBy::PriceDesc);
        let ids: Vec<i64> = candidates.iter().map(|c| c.profile.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn pagination_slices_after_sorting_and_reports_total() {
        let items: Vec<i64> = (0..25).collect();
        let (page, total) = paginate(items.clone(), 2, 10);
        assert_eq!(total, 25);
        assert_eq!(page, (20..25).collect::<Vec<i64>>());

        let (page, total) = paginate(items, 5, 10);
        assert_eq!(total, 25);
        assert!(page.is_empty());
    }

    #[test]
    fn filter_parsing_rejects_malformed_input() {
        let mut query = SearchQuery::default();
        query.availability_day = Some("FUNDAY".to_string());
        assert!(matches!(
            SearchFilter::from_query(&query),
            Err(AppError::Validation(_))
        ));

        let mut query = SearchQuery::default();
        query.availability_start = Some("10:00".to_string());
        assert!(matches!(
            SearchFilter::from_query(&query),
            Err(AppError::Validation(_))
        ));

        let mut query = SearchQuery::default();
        query.availability_start = Some("11:00".to_string());
        query.availability_end = Some("10:00".to_string());
        assert!(matches!(
            SearchFilter::from_query(&query),
            Err(AppError::Validation(_))
        ));

        let mut query = SearchQuery::default();
        query.page = Some(-1);
        assert!(matches!(
            SearchFilter::from_query(&query),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_sort_by_falls_back_to_rating() {
        let mut query = SearchQuery::default();
        query.sort_by = Some("experience".to_string());
        let filter = SearchFilter::from_query(&query).unwrap();
        assert_eq!(filter.sort_by, SortBy::Rating);
    }
}
