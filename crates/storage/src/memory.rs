//! 메모리 저장소 -- 모든 저장소 계약의 프로세스 내 구현
//!
//! 테스트, CLI 드라이런, `storage.backend = "memory"` 설정에서 사용합니다.
//! 모든 상태는 하나의 뮤텍스로 보호되므로 키 단위 업서트가 원자적입니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use logmirror_core::error::StorageError;
use logmirror_core::store::{
    CheckpointStore, DeviceGate, ParsedLogStore, RawLogStore, SystemActionSink,
};
use logmirror_core::types::{
    CollectorCheckpoint, CollectorId, DeviceId, LogRecordId, ParsedLogRecord, RawLogRecord,
};

/// 시스템 액션 저장소에 기록된 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemActionEntry {
    pub log_record_id: LogRecordId,
    pub collector_id: CollectorId,
    pub description: String,
}

#[derive(Debug)]
struct DeviceEntry {
    id: DeviceId,
    hostname: String,
    log_count: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    raw_keys: HashMap<(CollectorId, i64), LogRecordId>,
    raw_rows: BTreeMap<LogRecordId, RawLogRecord>,
    parsed: BTreeMap<LogRecordId, ParsedLogRecord>,
    actions: BTreeMap<LogRecordId, SystemActionEntry>,
    devices: HashMap<(CollectorId, u16), DeviceEntry>,
    checkpoints: HashMap<CollectorId, i64>,
    next_raw_id: i64,
    next_device_id: i64,
}

/// 메모리 저장소
///
/// 장치 쿼터는 `(collector_id, port)` 단위이며 `max_logs_per_device`가 0이면 무제한입니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    max_logs_per_device: u64,
}

impl MemoryStore {
    /// 쿼터 없는 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 장치당 로그 한도를 설정합니다 (0 = 무제한).
    pub fn with_quota(mut self, max_logs_per_device: u64) -> Self {
        self.max_logs_per_device = max_logs_per_device;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Connection("memory store mutex poisoned".to_owned()))
    }

    /// 저장된 원시 로그 (행 ID 순)
    pub fn raw_records(&self) -> Vec<(LogRecordId, RawLogRecord)> {
        self.lock()
            .map(|s| s.raw_rows.iter().map(|(id, r)| (*id, r.clone())).collect())
            .unwrap_or_default()
    }

    /// 자연 키로 원시 로그를 조회합니다.
    pub fn raw_record(&self, collector_id: CollectorId, original_log_id: i64) -> Option<RawLogRecord> {
        let state = self.lock().ok()?;
        let id = state.raw_keys.get(&(collector_id, original_log_id))?;
        state.raw_rows.get(id).cloned()
    }

    /// 저장된 파싱 로그 (행 ID 순)
    pub fn parsed_records(&self) -> Vec<ParsedLogRecord> {
        self.lock()
            .map(|s| s.parsed.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 저장된 시스템 액션
    pub fn system_actions(&self) -> Vec<SystemActionEntry> {
        self.lock()
            .map(|s| s.actions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 등록된 장치 수
    pub fn device_count(&self) -> usize {
        self.lock().map(|s| s.devices.len()).unwrap_or_default()
    }

    /// 수집기의 현재 체크포인트
    pub fn checkpoint(&self, collector_id: CollectorId) -> Option<i64> {
        self.lock()
            .ok()
            .and_then(|s| s.checkpoints.get(&collector_id).copied())
    }
}

impl RawLogStore for MemoryStore {
    async fn upsert_raw(&self, record: &RawLogRecord) -> Result<LogRecordId, StorageError> {
        let mut state = self.lock()?;
        let key = record.natural_key();
        let id = match state.raw_keys.get(&key) {
            Some(id) => *id,
            None => {
                state.next_raw_id += 1;
                let id = LogRecordId(state.next_raw_id);
                state.raw_keys.insert(key, id);
                id
            }
        };
        state.raw_rows.insert(id, record.clone());
        Ok(id)
    }
}

impl ParsedLogStore for MemoryStore {
    async fn upsert_parsed(&self, record: &ParsedLogRecord) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.raw_rows.contains_key(&record.log_record_id) {
            return Err(StorageError::Query(format!(
                "unknown log record {}",
                record.log_record_id
            )));
        }
        state.parsed.insert(record.log_record_id, record.clone());
        Ok(())
    }
}

impl SystemActionSink for MemoryStore {
    async fn save_system_action(
        &self,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        description: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.actions.insert(
            log_record_id,
            SystemActionEntry {
                log_record_id,
                collector_id,
                description: description.to_owned(),
            },
        );
        Ok(())
    }
}

impl DeviceGate for MemoryStore {
    async fn register_device(
        &self,
        collector_id: CollectorId,
        hostname: &str,
        port: u16,
    ) -> Result<Option<DeviceId>, StorageError> {
        if port == 0 {
            return Ok(None);
        }
        let mut state = self.lock()?;
        if let Some(device) = state.devices.get_mut(&(collector_id, port)) {
            device.hostname = hostname.to_owned();
            return Ok(Some(device.id));
        }
        state.next_device_id += 1;
        let id = DeviceId(state.next_device_id);
        state.devices.insert(
            (collector_id, port),
            DeviceEntry {
                id,
                hostname: hostname.to_owned(),
                log_count: 0,
            },
        );
        Ok(Some(id))
    }

    async fn check_log_quota(
        &self,
        collector_id: CollectorId,
        port: u16,
    ) -> Result<bool, StorageError> {
        let limit = self.max_logs_per_device;
        let mut state = self.lock()?;
        let Some(device) = state.devices.get_mut(&(collector_id, port)) else {
            return Ok(true);
        };
        if limit > 0 && device.log_count >= limit {
            tracing::debug!(
                collector = collector_id,
                port,
                hostname = %device.hostname,
                log_count = device.log_count,
                "device quota exhausted"
            );
            return Ok(false);
        }
        device.log_count += 1;
        Ok(true)
    }
}

impl CheckpointStore for MemoryStore {
    async fn load_checkpoint(&self, collector_id: CollectorId) -> Result<Option<i64>, StorageError> {
        Ok(self.lock()?.checkpoints.get(&collector_id).copied())
    }

    async fn save_checkpoint(&self, checkpoint: CollectorCheckpoint) -> Result<(), StorageError> {
        self.lock()?
            .checkpoints
            .insert(checkpoint.collector_id, checkpoint.last_fetched_id);
        Ok(())
    }
}
