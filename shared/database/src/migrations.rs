use sqlx::PgPool;
use std::fmt;
use tutorfind_common::AppError;

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");

        let migrator = sqlx::migrate!("./migrations");
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");
        let applied = migrator
            .get_applied_migrations(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration status check failed: {}", e)))?;

        let total = migrator.migrations.len();
        let applied_count = applied.len();
        let pending = total - applied_count;

        Ok(MigrationStatus {
            total,
            applied: applied_count,
            pending,
            is_up_to_date: pending == 0,
        })
    }

    /// Seeds the read-only catalog (cities, districts, subjects). Idempotent:
    /// existing names are left untouched.
    pub async fn seed_catalog_data(&self) -> Result<(), AppError> {
        let cities = ["Baku", "Ganja", "Sumqayit"];
        for city in cities {
            sqlx::query("INSERT INTO cities (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(city)
                .execute(&self.pool)
                .await
                .map_err(AppError::Database)?;
        }

        let districts = [
            ("Baku", "Yasamal"),
            ("Baku", "Nasimi"),
            ("Baku", "Sabail"),
            ("Baku", "Narimanov"),
            ("Ganja", "Kapaz"),
            ("Ganja", "Nizami"),
        ];
        for (city, district) in districts {
            sqlx::query(
                r#"
                INSERT INTO districts (city_id, name)
                SELECT c.id, $2 FROM cities c WHERE c.name = $1
                ON CONFLICT (city_id, name) DO NOTHING
                "#,
            )
            .bind(city)
            .bind(district)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        }

        let subjects = [
            ("Math", "Science"),
            ("Physics", "Science"),
            ("Chemistry", "Science"),
            ("Biology", "Science"),
            ("English", "Language"),
            ("Azerbaijani", "Language"),
            ("History", "Humanities"),
            ("Programming", "Technology"),
        ];
        for (subject, category) in subjects {
            sqlx::query(
                "INSERT INTO subjects (name, category) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
            )
            .bind(subject)
            .bind(category)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        }

        tracing::info!("Catalog data seeded");
        Ok(())
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} migrations applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}
