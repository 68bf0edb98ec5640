use sqlx::PgPool;

use tutorfind_common::AppError;
use tutorfind_database::{City, District, Subject};

use crate::state::AppState;

/// Read-only lookups over the location/subject catalog. Catalog management
/// itself (creating cities, districts, subjects) is out of scope; rows arrive
/// through seeding or an external admin tool.
pub struct CatalogService {
    db_pool: PgPool,
}

impl CatalogService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_cities(&self) -> Result<Vec<City>, AppError> {
        sqlx::query_as::<_, City>("SELECT * FROM cities ORDER BY name")
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list_districts(&self, city_id: Option<i64>) -> Result<Vec<District>, AppError> {
        sqlx::query_as::<_, District>(
            "SELECT * FROM districts WHERE ($1::BIGINT IS NULL OR city_id = $1) ORDER BY name",
        )
        .bind(city_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, AppError> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY name")
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn get_city(&self, id: i64) -> Result<City, AppError> {
        sqlx::query_as::<_, City>("SELECT * FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("City not found".to_string()))
    }

    pub async fn get_district(&self, id: i64) -> Result<District, AppError> {
        sqlx::query_as::<_, District>("SELECT * FROM districts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("District not found".to_string()))
    }

    pub async fn get_subject(&self, id: i64) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))
    }

    pub async fn city_by_name(&self, name: &str) -> Result<Option<City>, AppError> {
        sqlx::query_as::<_, City>("SELECT * FROM cities WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn district_by_name(&self, name: &str) -> Result<Option<District>, AppError> {
        sqlx::query_as::<_, District>("SELECT * FROM districts WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn subject_by_name(&self, name: &str) -> Result<Option<Subject>, AppError> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }
}
