//! 설정 기반 저장소 선택
//!
//! 저장소 trait이 `impl Future`를 반환하므로 trait 객체 대신 열거형으로 분기합니다.

use logmirror_core::config::{QuotaConfig, StorageConfig};
use logmirror_core::error::StorageError;
use logmirror_core::store::{
    CheckpointStore, DeviceGate, ParsedLogStore, RawLogStore, SystemActionSink,
};
use logmirror_core::types::{
    CollectorCheckpoint, CollectorId, DeviceId, LogRecordId, ParsedLogRecord, RawLogRecord,
};

use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;

/// 설정으로 선택된 저장소
pub enum StoreBackend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl StoreBackend {
    /// `[storage]`, `[quota]` 설정으로 저장소를 엽니다.
    pub fn open(storage: &StorageConfig, quota: &QuotaConfig) -> Result<Self, StorageError> {
        match storage.backend.as_str() {
            "memory" => Ok(Self::Memory(
                MemoryStore::new().with_quota(quota.max_logs_per_device),
            )),
            "sqlite" => Ok(Self::Sqlite(SqliteStore::open(
                &storage.sqlite_path,
                quota.max_logs_per_device,
            )?)),
            other => Err(StorageError::Connection(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }

    /// 백엔드 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }
}

impl RawLogStore for StoreBackend {
    async fn upsert_raw(&self, record: &RawLogRecord) -> Result<LogRecordId, StorageError> {
        match self {
            Self::Memory(s) => s.upsert_raw(record).await,
            Self::Sqlite(s) => s.upsert_raw(record).await,
        }
    }
}

impl ParsedLogStore for StoreBackend {
    async fn upsert_parsed(&self, record: &ParsedLogRecord) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.upsert_parsed(record).await,
            Self::Sqlite(s) => s.upsert_parsed(record).await,
        }
    }
}

impl SystemActionSink for StoreBackend {
    async fn save_system_action(
        &self,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        description: &str,
    ) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => {
                s.save_system_action(log_record_id, collector_id, description)
                    .await
            }
            Self::Sqlite(s) => {
                s.save_system_action(log_record_id, collector_id, description)
                    .await
            }
        }
    }
}

impl DeviceGate for StoreBackend {
    async fn register_device(
        &self,
        collector_id: CollectorId,
        hostname: &str,
        port: u16,
    ) -> Result<Option<DeviceId>, StorageError> {
        match self {
            Self::Memory(s) => s.register_device(collector_id, hostname, port).await,
            Self::Sqlite(s) => s.register_device(collector_id, hostname, port).await,
        }
    }

    async fn check_log_quota(
        &self,
        collector_id: CollectorId,
        port: u16,
    ) -> Result<bool, StorageError> {
        match self {
            Self::Memory(s) => s.check_log_quota(collector_id, port).await,
            Self::Sqlite(s) => s.check_log_quota(collector_id, port).await,
        }
    }
}

impl CheckpointStore for StoreBackend {
    async fn load_checkpoint(&self, collector_id: CollectorId) -> Result<Option<i64>, StorageError> {
        match self {
            Self::Memory(s) => s.load_checkpoint(collector_id).await,
            Self::Sqlite(s) => s.load_checkpoint(collector_id).await,
        }
    }

    async fn save_checkpoint(&self, checkpoint: CollectorCheckpoint) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.save_checkpoint(checkpoint).await,
            Self::Sqlite(s) => s.save_checkpoint(checkpoint).await,
        }
    }
}
