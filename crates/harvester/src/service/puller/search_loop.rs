use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::time::sleep;

use harvester_io::{SearchRequest, UpstreamClient, WarehouseClient};

use crate::error::HarvesterError;
use crate::service::entities::Source;
use crate::service::implementations::postgres::PostgresMetadataStore;
use crate::service::puller::hit_mapping::{build_rows, extract_event_ts};
use crate::service::puller::query::build_query;
use crate::utils::require_identifier;

/// Which metadata row a batch's checkpoint is persisted into — incremental
/// tailing writes `ingestion_state` (§4.4.1), backfill writes the job's
/// resume pointer (§4.4.2).
#[derive(Debug, Clone, Copy)]
pub enum Checkpoint {
    Incremental,
    Backfill { job_id: i64 },
}

/// Drives one index through pages of the upstream search until it is
/// exhausted or (for a backfill) externally cancelled (§4.4.3). Opens a
/// PIT up front, falling back to direct per-request index search if that
/// fails; the PIT is always closed best-effort on the way out. Returns the
/// number of rows written.
#[allow(clippy::too_many_arguments)]
pub async fn process_index(
    store: &PostgresMetadataStore,
    warehouse: &WarehouseClient,
    upstream: &UpstreamClient,
    source: &Source,
    index_name: &str,
    start_ts: Option<DateTime<Utc>>,
    end_ts: Option<DateTime<Utc>>,
    mut search_after: Option<Vec<Value>>,
    checkpoint: Checkpoint,
    batch_size: u32,
    throttle_seconds: f64,
) -> Result<u64, HarvesterError> {
    let time_field = source.time_field.clone();
    require_identifier(&source.project_id)?;
    let bronze_db = format!("{}_bronze", source.project_id);

    let pit_id = match upstream.open_pit(index_name).await {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(index = %index_name, error = %e, "PIT not available, falling back to regular search");
            None
        }
    };

    let mut total = 0u64;
    let outcome: Result<(), HarvesterError> = async {
        loop {
            if let Checkpoint::Backfill { job_id } = checkpoint {
                let active = store
                    .fetch_backfill_job_by_id(job_id)
                    .await?
                    .is_some_and(|job| job.status.is_active());
                if !active {
                    tracing::info!(job_id, index = %index_name, "backfill cancelled while processing index");
                    return Ok(());
                }
            }

            let query = build_query(
                &time_field,
                start_ts,
                end_ts,
                source.query_filter_json.as_ref(),
            );
            let mut first_sort = serde_json::Map::new();
            first_sort.insert(time_field.clone(), json!("asc"));
            let sort = json!([first_sort, { "_id": "asc" }]);

            let request = SearchRequest {
                size: batch_size,
                sort,
                track_total_hits: false,
                query,
                pit: pit_id.as_deref().and_then(SearchRequest::with_pit),
                search_after: search_after.as_deref(),
            };
            let hits = upstream
                .search(&request, if pit_id.is_some() { None } else { Some(index_name) })
                .await?;
            if hits.is_empty() {
                return Ok(());
            }

            let rows = build_rows(&hits, &time_field, source.source_id);
            if !rows.is_empty() {
                warehouse
                    .insert_rows(&bronze_db, "os_events_raw", &rows)
                    .await?;
            }
            total += rows.len() as u64;

            let last_hit = hits.last().expect("hits checked non-empty above");
            let last_ts = extract_event_ts(last_hit, &time_field);
            let last_sort = last_hit.sort.clone();
            let last_id = last_hit.id.clone();
            if !last_sort.is_empty() {
                search_after = Some(last_sort.clone());
            }
            match checkpoint {
                Checkpoint::Backfill { job_id } => {
                    let sort_value = Value::Array(last_sort.clone());
                    store
                        .update_backfill_checkpoint(
                            job_id,
                            Some(index_name),
                            last_ts,
                            if last_sort.is_empty() { None } else { Some(&sort_value) },
                            Some(&last_id),
                        )
                        .await?;
                }
                Checkpoint::Incremental => {
                    if let (Some(ts), false) = (last_ts, last_sort.is_empty()) {
                        let sort_value = Value::Array(last_sort.clone());
                        store
                            .upsert_ingestion_state(
                                source.source_id,
                                index_name,
                                ts,
                                &sort_value,
                                Some(&last_id),
                                "running",
                            )
                            .await?;
                    }
                }
            }

            if throttle_seconds > 0.0 {
                sleep(Duration::from_secs_f64(throttle_seconds)).await;
            }
        }
    }
    .await;

    if let Some(id) = pit_id {
        upstream.close_pit(&id).await;
    }
    outcome?;
    Ok(total)
}
