use std::sync::Arc;

use leadquote_core::config::{AppConfig, ConfigError};
use leadquote_core::enum_schema::{EnumSchema, SchemaError};
use leadquote_core::pipeline::SubmissionPipeline;
use leadquote_db::{connect_with_settings, migrations, DbPool, SqlSubmissionRepository};
use thiserror::Error;
use tracing::{info, warn};

use crate::hubspot::HubSpotContactDirectory;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub pipeline: SubmissionPipeline,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("enum schema could not be loaded: {0}")]
    Schema(#[source] SchemaError),
    #[error("crm http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let schema = EnumSchema::load(config.schema.enum_schema_path.as_deref())
        .map_err(BootstrapError::Schema)?;
    let missing = schema.missing_properties();
    if !missing.is_empty() {
        warn!(
            event_name = "system.bootstrap.schema_incomplete",
            correlation_id = "bootstrap",
            missing = ?missing,
            "enum schema lacks contact properties; values for them will be rejected"
        );
    }
    info!(
        event_name = "system.bootstrap.schema_loaded",
        correlation_id = "bootstrap",
        schema_version = %config.schema.version,
        properties = schema.property_count(),
        source = config
            .schema
            .enum_schema_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bundled".to_string()),
        "enum schema loaded"
    );

    let contacts = HubSpotContactDirectory::new(&config.crm).map_err(BootstrapError::HttpClient)?;
    let pipeline = SubmissionPipeline::new(
        Arc::new(SqlSubmissionRepository::new(db_pool.clone())),
        Arc::new(contacts),
        Arc::new(schema),
        config.schema.version.clone(),
    );

    Ok(Application { config, db_pool, pipeline })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use leadquote_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                hubspot_access_token: Some("pat-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_hubspot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                hubspot_access_token: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("crm.hubspot_access_token"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_builds_pipeline() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("bootstrap.db").display());
        let app = bootstrap(valid_overrides(&url))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'form_submissions'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("sqlite_master query");
        assert_eq!(table_count, 1);
        assert_eq!(app.pipeline.schema_version(), app.config.schema.version);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_unreadable_enum_schema() {
        let mut schema_file = tempfile::NamedTempFile::new().expect("temp file");
        schema_file.write_all(b"{ not json").expect("write schema");

        let mut options = valid_overrides("sqlite::memory:");
        options.overrides.enum_schema_path = Some(schema_file.path().to_path_buf());

        let result = bootstrap(options).await;
        assert!(matches!(result, Err(BootstrapError::Schema(_))));
    }
}
