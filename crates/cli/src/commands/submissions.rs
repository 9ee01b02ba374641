use leadquote_core::config::{AppConfig, LoadOptions};
use leadquote_core::domain::submission::SyncStatus;
use leadquote_db::{connect_with_settings, SqlSubmissionRepository, SubmissionRepository};
use serde_json::json;

use crate::commands::{current_thread_runtime, CommandResult};

/// Lists stored submissions in `status`, newest first. Used to find `sync_failed` leads.
pub fn run(status: SyncStatus, limit: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submissions",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("submissions") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let repository = SqlSubmissionRepository::new(pool.clone());
        let records = repository
            .list_by_status(status, limit)
            .await
            .map_err(|error| ("query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(records)
    });

    let records = match result {
        Ok(records) => records,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("submissions", error_class, message, exit_code);
        }
    };

    let rows: Vec<_> = records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "request_id": record.request_id,
                "status": record.status,
                "contact_id": record.contact_id,
                "quote": record.derived.quote,
                "error": record.error_detail,
                "created_at": record.created_at.to_rfc3339(),
                "updated_at": record.updated_at.to_rfc3339(),
            })
        })
        .collect();

    CommandResult::success_with_data(
        "submissions",
        format!("{} submission(s) with status {}", rows.len(), status.as_str()),
        Some(json!(rows)),
    )
}
