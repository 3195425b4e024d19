//! 수집 루프 -- 조회, 장치 게이트, 저장, 파싱, 체크포인트
//!
//! 수집기 하나의 패스는 다음 순서로 진행됩니다.
//!
//! ```text
//! Idle → Fetching → (레코드마다: Gating → Storing → Parsing) → Checkpointing → Idle
//! ```
//!
//! - 조회 실패 시 체크포인트는 그대로이며 수집기 실패로 기록됩니다.
//! - 레코드 단위 에러는 로그와 카운터에만 남고 배치를 중단하지 않습니다.
//! - 체크포인트는 배치 전체를 처리한 뒤에만 전진하며, 뒤로 가지 않습니다.
//!
//! 여러 수집기는 `max_concurrent_collectors`로 제한된 `JoinSet` 태스크에서
//! 동시에 처리됩니다. 한 수집기 안의 레코드는 항상 조회 순서대로 처리합니다.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use logmirror_core::config::CollectorConfig;
use logmirror_core::metrics::{
    INGEST_FETCH_FAILURES_TOTAL, INGEST_PASS_DURATION_SECONDS, INGEST_QUOTA_SKIPPED_TOTAL,
    INGEST_RECORD_FAILURES_TOTAL, INGEST_RECORDS_FETCHED_TOTAL, INGEST_RECORDS_STORED_TOTAL,
};
use logmirror_core::store::MirrorStore;
use logmirror_core::types::{CollectorCheckpoint, CollectorId, DeviceId, RawLogRecord};
use logmirror_parse_engine::ParseEngine;

use crate::client::CollectorClient;
use crate::error::IngestError;
use crate::summary::{CollectorReport, RecordOutcome, RunSummary};

/// 동시 수집기 수 상한
const MAX_CONCURRENT_COLLECTORS: usize = 64;

/// 수집 루프
///
/// 클라이언트, 저장소, 파싱 엔진은 모두 생성 시 주입되며 `Arc`로 공유됩니다.
/// 복제 비용이 낮아 수집기 태스크마다 복제해 넘깁니다.
pub struct Ingestor<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    engine: Arc<ParseEngine>,
    max_concurrent_collectors: usize,
}

impl<C, S> Clone for Ingestor<C, S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            max_concurrent_collectors: self.max_concurrent_collectors,
        }
    }
}

impl<C, S> Ingestor<C, S>
where
    C: CollectorClient,
    S: MirrorStore,
{
    /// 빌더를 생성합니다.
    pub fn builder() -> IngestorBuilder<C, S> {
        IngestorBuilder::new()
    }

    /// 공유 저장소
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 공유 파싱 엔진
    pub fn engine(&self) -> &Arc<ParseEngine> {
        &self.engine
    }

    /// 활성 수집기 전체에 대해 한 번의 패스를 실행합니다.
    ///
    /// 비활성 수집기는 건너뜁니다. 수집기 실패는 요약에 기록될 뿐 전파되지 않습니다.
    pub async fn run_pass(&self, collectors: &[CollectorConfig]) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::start();

        let active: Vec<CollectorConfig> =
            collectors.iter().filter(|c| c.enabled).cloned().collect();
        info!(
            run_id = %summary.run_id,
            collectors = active.len(),
            max_concurrent = self.max_concurrent_collectors,
            "ingest pass started"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_collectors));
        let mut tasks = JoinSet::new();
        for collector in &active {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let collector = collector.clone();
            tasks.spawn(async move {
                // 세마포어는 닫지 않으므로 acquire는 실패하지 않음
                let _permit = semaphore.acquire_owned().await.ok();
                let result = this.drain_collector(&collector).await;
                (collector.id, result)
            });
        }

        let mut finished: Vec<CollectorId> = Vec::with_capacity(active.len());
        let mut join_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((collector_id, Ok(report))) => {
                    finished.push(collector_id);
                    summary.push_report(report);
                }
                Ok((collector_id, Err(e))) => {
                    finished.push(collector_id);
                    let name = collector_name(&active, collector_id);
                    summary.push_failure(collector_id, name, e.to_string());
                }
                Err(e) => {
                    error!(run_id = %summary.run_id, error = %e, "collector task failed");
                    join_errors.push(e.to_string());
                }
            }
        }

        // 패닉 등으로 결과를 돌려주지 못한 수집기
        if !join_errors.is_empty() {
            let reason = join_errors.join("; ");
            for collector in active.iter().filter(|c| !finished.contains(&c.id)) {
                summary.push_failure(collector.id, &collector.name, reason.clone());
            }
        }

        summary.finish();
        histogram!(INGEST_PASS_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(
            run_id = %summary.run_id,
            fetched = summary.fetched(),
            devices = summary.devices_touched(),
            stored = summary.stored(),
            parsed = summary.parsed(),
            unmatched = summary.unmatched(),
            rejected = summary.rejected(),
            quota_skipped = summary.quota_skipped(),
            record_failures = summary.record_failures(),
            collector_failures = summary.failures.len(),
            elapsed_ms = summary.elapsed_ms(),
            "ingest pass finished"
        );
        summary
    }

    /// 수집기 하나를 조회하고 배치를 처리한 뒤 체크포인트를 전진시킵니다.
    pub async fn drain_collector(
        &self,
        collector: &CollectorConfig,
    ) -> Result<CollectorReport, IngestError> {
        let checkpoint = self
            .store
            .load_checkpoint(collector.id)
            .await
            .map_err(|source| IngestError::Checkpoint {
                collector: collector.id,
                source,
            })?
            .unwrap_or(collector.initial_last_id);

        let batch = match self.client.fetch(collector, checkpoint).await {
            Ok(batch) => batch,
            Err(e) => {
                counter!(INGEST_FETCH_FAILURES_TOTAL).increment(1);
                warn!(
                    collector = collector.id,
                    name = %collector.name,
                    last_id = checkpoint,
                    error = %e,
                    "fetch failed, checkpoint unchanged"
                );
                return Err(e);
            }
        };

        let mut report = CollectorReport::new(collector.id, &collector.name, checkpoint);
        report.fetched = (batch.records.len() + batch.undecodable.len()) as u64;
        counter!(INGEST_RECORDS_FETCHED_TOTAL).increment(report.fetched);

        for remote in batch.records {
            let outcome = self.process_record(remote.into_raw(collector.id)).await;
            report.record(&outcome);
        }

        for bad in batch.undecodable {
            counter!(INGEST_RECORD_FAILURES_TOTAL).increment(1);
            warn!(
                collector = collector.id,
                record_id = ?bad.id,
                error = %bad.reason,
                "undecodable record skipped"
            );
            report.record(&RecordOutcome::Failed {
                device: None,
                reason: format!("undecodable record: {}", bad.reason),
            });
        }

        let next = next_checkpoint(collector.id, checkpoint, batch.next_last_id);
        if next != checkpoint {
            let saved = self
                .store
                .save_checkpoint(CollectorCheckpoint {
                    collector_id: collector.id,
                    last_fetched_id: next,
                })
                .await;
            match saved {
                Ok(()) => report.checkpoint_after = next,
                Err(e) => {
                    error!(
                        collector = collector.id,
                        next_last_id = next,
                        error = %e,
                        "failed to save checkpoint"
                    );
                    report.checkpoint_error = Some(
                        IngestError::Checkpoint {
                            collector: collector.id,
                            source: e,
                        }
                        .to_string(),
                    );
                }
            }
        }

        info!(
            collector = collector.id,
            name = %collector.name,
            fetched = report.fetched,
            devices = report.devices_touched,
            stored = report.stored,
            quota_skipped = report.quota_skipped,
            record_failures = report.record_failures,
            checkpoint = report.checkpoint_after,
            "collector drained"
        );
        Ok(report)
    }

    /// 레코드 하나를 게이트, 저장, 파싱 순으로 처리합니다.
    ///
    /// 에러를 전파하지 않고 항상 [`RecordOutcome`]을 돌려줍니다.
    pub async fn process_record(&self, record: RawLogRecord) -> RecordOutcome {
        let collector_id = record.collector_id;
        let record_id = record.original_log_id;

        let device = match self
            .store
            .register_device(collector_id, &record.hostname, record.port)
            .await
        {
            Ok(device) => device,
            Err(e) => return record_failure(collector_id, record_id, None, &e),
        };

        if let Some(device) = device {
            match self.store.check_log_quota(collector_id, record.port).await {
                Ok(true) => {}
                Ok(false) => {
                    counter!(INGEST_QUOTA_SKIPPED_TOTAL).increment(1);
                    debug!(
                        collector = collector_id,
                        record_id,
                        hostname = %record.hostname,
                        port = record.port,
                        "device quota exceeded, record skipped"
                    );
                    return RecordOutcome::QuotaSkipped { device };
                }
                Err(e) => return record_failure(collector_id, record_id, Some(device), &e),
            }
        }

        let log_record_id = match self.store.upsert_raw(&record).await {
            Ok(id) => id,
            Err(e) => return record_failure(collector_id, record_id, device, &e),
        };
        counter!(INGEST_RECORDS_STORED_TOTAL).increment(1);

        let store = self.store.as_ref();
        let parse = self
            .engine
            .parse(&record.message, log_record_id, collector_id, store, store)
            .await;
        debug!(
            collector = collector_id,
            record_id,
            log_record_id = %log_record_id,
            outcome = parse.label(),
            "record processed"
        );

        RecordOutcome::Stored {
            log_record_id,
            device,
            parse,
        }
    }
}

fn record_failure(
    collector_id: CollectorId,
    record_id: i64,
    device: Option<DeviceId>,
    err: &dyn std::error::Error,
) -> RecordOutcome {
    counter!(INGEST_RECORD_FAILURES_TOTAL).increment(1);
    warn!(
        collector = collector_id,
        record_id,
        error = %err,
        "failed to process record"
    );
    RecordOutcome::Failed {
        device,
        reason: err.to_string(),
    }
}

/// 다음 체크포인트를 계산합니다.
///
/// 서버가 `next_last_id`를 주지 않거나 현재보다 작은 값을 주면 현재 값을 유지합니다.
fn next_checkpoint(collector_id: CollectorId, current: i64, next: Option<i64>) -> i64 {
    match next {
        Some(next) if next >= current => next,
        Some(next) => {
            warn!(
                collector = collector_id,
                current,
                next_last_id = next,
                "server returned a lower cursor, keeping checkpoint"
            );
            current
        }
        None => current,
    }
}

fn collector_name(collectors: &[CollectorConfig], id: CollectorId) -> &str {
    collectors
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
        .unwrap_or("")
}

/// [`Ingestor`] 빌더
pub struct IngestorBuilder<C, S> {
    client: Option<Arc<C>>,
    store: Option<Arc<S>>,
    engine: Option<Arc<ParseEngine>>,
    max_concurrent_collectors: usize,
}

impl<C, S> Default for IngestorBuilder<C, S> {
    fn default() -> Self {
        Self {
            client: None,
            store: None,
            engine: None,
            max_concurrent_collectors: 1,
        }
    }
}

impl<C, S> IngestorBuilder<C, S>
where
    C: CollectorClient,
    S: MirrorStore,
{
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 원격 수집기 클라이언트를 설정합니다.
    pub fn client(mut self, client: C) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// 저장소를 설정합니다. 호출자가 결과를 조회할 수 있도록 `Arc`를 받습니다.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// 파싱 엔진을 설정합니다.
    pub fn engine(mut self, engine: Arc<ParseEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// 동시에 처리할 수집기 수 (1 = 순차)
    pub fn max_concurrent_collectors(mut self, max: usize) -> Self {
        self.max_concurrent_collectors = max;
        self
    }

    /// 수집 루프를 빌드합니다.
    pub fn build(self) -> Result<Ingestor<C, S>, IngestError> {
        if self.max_concurrent_collectors == 0
            || self.max_concurrent_collectors > MAX_CONCURRENT_COLLECTORS
        {
            return Err(IngestError::Config(format!(
                "max_concurrent_collectors must be 1..={MAX_CONCURRENT_COLLECTORS}, got {}",
                self.max_concurrent_collectors
            )));
        }
        let client = self
            .client
            .ok_or_else(|| IngestError::Config("collector client is required".to_owned()))?;
        let store = self
            .store
            .ok_or_else(|| IngestError::Config("store is required".to_owned()))?;
        let engine = self
            .engine
            .ok_or_else(|| IngestError::Config("parse engine is required".to_owned()))?;

        Ok(Ingestor {
            client,
            store,
            engine,
            max_concurrent_collectors: self.max_concurrent_collectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_advances_to_next_last_id() {
        assert_eq!(next_checkpoint(1, 100, Some(150)), 150);
        assert_eq!(next_checkpoint(1, 100, Some(100)), 100);
    }

    #[test]
    fn checkpoint_kept_without_next_last_id() {
        assert_eq!(next_checkpoint(1, 100, None), 100);
    }

    #[test]
    fn checkpoint_never_moves_backwards() {
        assert_eq!(next_checkpoint(1, 100, Some(20)), 100);
    }

    #[test]
    fn collector_name_lookup() {
        let collectors = vec![CollectorConfig {
            id: 3,
            name: "nas".to_owned(),
            url: "http://localhost".to_owned(),
            secret_key: "k".to_owned(),
            enabled: true,
            initial_last_id: 0,
        }];
        assert_eq!(collector_name(&collectors, 3), "nas");
        assert_eq!(collector_name(&collectors, 9), "");
    }
}
