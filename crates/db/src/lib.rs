use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use utils::assets::db_path;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::{DbErr as DatabaseError, TransactionTrait};

pub type DbPool = DatabaseConnection;

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Open (or create) the on-disk database and bring the schema up to date.
    pub async fn new() -> Result<DBService, DbErr> {
        let db_file =
            db_path().map_err(|e| DbErr::Custom(format!("failed to prepare data dir: {e}")))?;
        let database_url = format!("sqlite://{}?mode=rwc", db_file.to_string_lossy());
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url);
        options.sqlx_logging(false);
        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!("database ready at {database_url}");
        Ok(DBService { pool })
    }

    /// In-memory database, used by tests.
    pub async fn new_in_memory() -> Result<DBService, DbErr> {
        Self::connect("sqlite::memory:").await
    }
}
