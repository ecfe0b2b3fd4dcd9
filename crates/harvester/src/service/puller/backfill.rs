use harvester_io::{UpstreamClient, WarehouseClient};

use crate::error::HarvesterError;
use crate::service::entities::{BackfillJob, Source};
use crate::service::implementations::postgres::PostgresMetadataStore;
use crate::service::puller::config::EffectiveConfig;
use crate::service::puller::search_loop::{process_index, Checkpoint};

async fn is_active(
    store: &PostgresMetadataStore,
    job_id: i64,
) -> Result<bool, HarvesterError> {
    Ok(store
        .fetch_backfill_job_by_id(job_id)
        .await?
        .is_some_and(|job| job.status.is_active()))
}

/// Processes the single claimed `pending`/`running` job for a source
/// (§4.4.2). Re-checks the job's status before every batch and between
/// indices so external cancellation stops the backfill within one batch
/// boundary (§5 Cancellation). Propagates errors without mutating the job
/// further — the caller records the failure against `backfill_jobs`
/// (§4.4.5).
pub async fn process_backfill(
    store: &PostgresMetadataStore,
    warehouse: &WarehouseClient,
    upstream: &UpstreamClient,
    source: &Source,
    job: &BackfillJob,
    config: &EffectiveConfig,
) -> Result<(), HarvesterError> {
    if !store.claim_backfill_job(job.job_id).await? {
        tracing::info!(job_id = job.job_id, "backfill job claimed by another worker or already terminal");
        return Ok(());
    }

    let indices: Vec<String> = upstream
        .list_indices(&source.index_pattern)
        .await?
        .into_iter()
        .collect();
    if indices.is_empty() {
        store
            .set_backfill_status(job.job_id, "completed", None)
            .await?;
        store
            .update_backfill_checkpoint(job.job_id, None, None, None, None)
            .await?;
        return Ok(());
    }

    let mut resume_index = job
        .last_index_name
        .clone()
        .filter(|name| indices.contains(name));
    let throttle = job
        .throttle_seconds
        .filter(|t| *t > 0.0)
        .unwrap_or(config.rate_limit_seconds);

    for (idx, index_name) in indices.iter().enumerate() {
        if !is_active(store, job.job_id).await? {
            tracing::info!(job_id = job.job_id, "backfill job stopped before index");
            return Ok(());
        }
        if let Some(resume) = &resume_index {
            if index_name < resume {
                continue;
            }
        }

        let is_resume_index = resume_index.as_deref() == Some(index_name.as_str());
        let (start_ts, search_after) = if is_resume_index {
            (
                job.last_ts,
                job.last_sort_json.as_ref().and_then(|v| v.as_array().cloned()),
            )
        } else {
            (Some(job.start_ts), None)
        };

        process_index(
            store,
            warehouse,
            upstream,
            source,
            index_name,
            start_ts,
            Some(job.end_ts),
            search_after,
            Checkpoint::Backfill { job_id: job.job_id },
            config.batch_size,
            throttle,
        )
        .await?;

        if !is_active(store, job.job_id).await? {
            tracing::info!(job_id = job.job_id, index = %index_name, "backfill job stopped during index");
            return Ok(());
        }

        let next_index = indices.get(idx + 1).map(String::as_str);
        store
            .update_backfill_checkpoint(job.job_id, next_index, None, None, None)
            .await?;
        resume_index = next_index.map(String::from);
    }

    if is_active(store, job.job_id).await? {
        store
            .set_backfill_status(job.job_id, "completed", None)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::entities::BackfillStatus;

    #[test]
    fn backfill_resume_skip_logic_matches_spec_scenario_4() {
        let indices = ["logs-01", "logs-02", "logs-03"];
        let resume_index = Some("logs-02");
        let skipped: Vec<&str> = indices
            .iter()
            .filter(|i| resume_index.is_some_and(|r| **i < r))
            .copied()
            .collect();
        assert_eq!(skipped, vec!["logs-01"]);
    }

    #[test]
    fn active_statuses_are_pending_and_running() {
        assert!(BackfillStatus::Pending.is_active());
        assert!(BackfillStatus::Running.is_active());
        assert!(!BackfillStatus::Completed.is_active());
        assert!(!BackfillStatus::Cancelled.is_active());
    }
}
