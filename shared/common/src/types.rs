use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a user account.
///
/// Distinct from [`TutorId`]: a tutor's profile has its own id and carries the
/// owning user id alongside it. The two are never interchangeable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a tutor profile (not the tutor's user account).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TutorId(pub i64);

impl fmt::Display for TutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum UserRole {
    Learner,
    Tutor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
}

impl BookingStatus {
    /// A booking is responded to exactly once; both outcomes are terminal.
    pub fn can_respond(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Declined => "DECLINED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "ACCEPTED" => Ok(BookingStatus::Accepted),
            "DECLINED" => Ok(BookingStatus::Declined),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "class_status", rename_all = "UPPERCASE")]
pub enum ClassStatus {
    Open,
    Full,
    Completed,
    Cancelled,
}

impl ClassStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClassStatus::Completed | ClassStatus::Cancelled)
    }
}

impl FromStr for ClassStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Ok(ClassStatus::Open),
            "FULL" => Ok(ClassStatus::Full),
            "COMPLETED" => Ok(ClassStatus::Completed),
            "CANCELLED" => Ok(ClassStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "class_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassType {
    Individual,
    SmallGroup,
    LargeGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "enrollment_status", rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Active,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "review_status", rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// The tutor aggregate only changes when the APPROVED set changes
    /// membership: a review entering it or leaving it. PENDING -> REJECTED
    /// never touches the aggregate because the review was never counted.
    pub fn recompute_needed(previous: ReviewStatus, next: ReviewStatus) -> bool {
        previous == ReviewStatus::Approved || next == ReviewStatus::Approved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "flag_status", rename_all = "UPPERCASE")]
pub enum FlagStatus {
    Pending,
    Approved,
    Rejected,
    Hidden,
}

impl FromStr for FlagStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(FlagStatus::Pending),
            "APPROVED" => Ok(FlagStatus::Approved),
            "REJECTED" => Ok(FlagStatus::Rejected),
            "HIDDEN" => Ok(FlagStatus::Hidden),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "flag_content_type", rename_all = "UPPERCASE")]
pub enum FlagContentType {
    Review,
    Feedback,
    Booking,
    Class,
    Other,
}

impl FromStr for FlagContentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REVIEW" => Ok(FlagContentType::Review),
            "FEEDBACK" => Ok(FlagContentType::Feedback),
            "BOOKING" => Ok(FlagContentType::Booking),
            "CLASS" => Ok(FlagContentType::Class),
            "OTHER" => Ok(FlagContentType::Other),
            _ => Err(()),
        }
    }
}

/// Day of a recurring weekly availability slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "day_of_week", rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = ();

    // Accepts full names and three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MON" | "MONDAY" => Ok(DayOfWeek::Monday),
            "TUE" | "TUESDAY" => Ok(DayOfWeek::Tuesday),
            "WED" | "WEDNESDAY" => Ok(DayOfWeek::Wednesday),
            "THU" | "THURSDAY" => Ok(DayOfWeek::Thursday),
            "FRI" | "FRIDAY" => Ok(DayOfWeek::Friday),
            "SAT" | "SATURDAY" => Ok(DayOfWeek::Saturday),
            "SUN" | "SUNDAY" => Ok(DayOfWeek::Sunday),
            _ => Err(()),
        }
    }
}

/// Sort order for tutor discovery. Unknown values fall back to rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Rating,
    PriceAsc,
    PriceDesc,
}

impl SortBy {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("price_asc") => SortBy::PriceAsc,
            Some("price_desc") => SortBy::PriceDesc,
            _ => SortBy::Rating,
        }
    }
}

/// One page of a larger result set, with the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty(page: i64, page_size: i64) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            total: 0,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.page_size - 1) / self.page_size
        }
    }
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_can_be_responded_only_while_pending() {
        assert!(BookingStatus::Pending.can_respond());
        assert!(!BookingStatus::Accepted.can_respond());
        assert!(!BookingStatus::Declined.can_respond());
    }

    #[test]
    fn recompute_triggers_only_when_approved_set_changes() {
        use ReviewStatus::*;
        assert!(ReviewStatus::recompute_needed(Pending, Approved));
        assert!(ReviewStatus::recompute_needed(Approved, Rejected));
        assert!(!ReviewStatus::recompute_needed(Pending, Rejected));
    }

    #[test]
    fn day_parsing_accepts_abbreviations_and_any_case() {
        assert_eq!("MON".parse::<DayOfWeek>(), Ok(DayOfWeek::Monday));
        assert_eq!("monday".parse::<DayOfWeek>(), Ok(DayOfWeek::Monday));
        assert_eq!("Sun".parse::<DayOfWeek>(), Ok(DayOfWeek::Sunday));
        assert!("FUNDAY".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn unknown_sort_falls_back_to_rating() {
        assert_eq!(SortBy::parse_or_default(Some("price_asc")), SortBy::PriceAsc);
        assert_eq!(SortBy::parse_or_default(Some("experience")), SortBy::Rating);
        assert_eq!(SortBy::parse_or_default(None), SortBy::Rating);
    }

    #[test]
    fn page_math() {
        let page: Page<i32> = Page {
            items: vec![1, 2, 3],
            page: 0,
            page_size: 10,
            total: 23,
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(Page::<i32>::empty(0, 10).total_pages(), 0);
    }
}
