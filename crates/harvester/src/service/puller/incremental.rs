use chrono::Utc;
use harvester_io::{UpstreamClient, WarehouseClient};

use crate::error::HarvesterError;
use crate::service::entities::Source;
use crate::service::implementations::postgres::{log_and_continue, PostgresMetadataStore};
use crate::service::puller::config::EffectiveConfig;
use crate::service::puller::search_loop::{process_index, Checkpoint};

/// Incremental tailing for every index a source's pattern currently
/// matches (§4.4.1). A failure on one index is recorded against that
/// index's state and does not stop the others.
pub async fn process_incremental(
    store: &PostgresMetadataStore,
    warehouse: &WarehouseClient,
    upstream: &UpstreamClient,
    source: &Source,
    config: &EffectiveConfig,
) -> Result<(), HarvesterError> {
    let indices = upstream.list_indices(&source.index_pattern).await?;
    if indices.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let overlap = chrono::Duration::minutes(config.overlap_minutes);

    for index_name in indices {
        let state = store
            .fetch_ingestion_state(source.source_id, &index_name)
            .await?;
        let last_ts = state.as_ref().and_then(|s| s.last_ts);
        let start_ts = Some(last_ts.unwrap_or(now) - overlap);
        let end_ts = Some(now);
        let use_search_after = last_ts.is_some() && overlap.num_seconds() <= 0;
        let search_after = if use_search_after {
            state
                .as_ref()
                .and_then(|s| s.last_sort_json.as_ref())
                .and_then(|v| v.as_array().cloned())
        } else {
            None
        };

        let outcome = process_index(
            store,
            warehouse,
            upstream,
            source,
            &index_name,
            start_ts,
            end_ts,
            search_after,
            Checkpoint::Incremental,
            config.batch_size,
            config.rate_limit_seconds,
        )
        .await;

        match outcome {
            Ok(_) => {
                log_and_continue(
                    "set_ingestion_status(idle)",
                    store
                        .set_ingestion_status(source.source_id, &index_name, "idle", None)
                        .await,
                );
            }
            Err(e) => {
                tracing::error!(index = %index_name, error = %e, "incremental ingest failed");
                log_and_continue(
                    "set_ingestion_status(error)",
                    store
                        .set_ingestion_status(
                            source.source_id,
                            &index_name,
                            "error",
                            Some(&e.to_string()),
                        )
                        .await,
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_window_matches_spec_scenario_2() {
        let last_ts = chrono::DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let overlap = chrono::Duration::minutes(10);
        let start_ts = last_ts - overlap;
        assert_eq!(start_ts.to_rfc3339(), "2025-01-01T11:50:00+00:00");
    }
}
