//! SQLite 저장소 -- `rusqlite` 기반 영속 구현
//!
//! 연결 하나를 `Mutex`로 보호하고, 모든 쿼리는 `spawn_blocking`에서 실행합니다.
//! 업서트는 `INSERT ... ON CONFLICT ... DO UPDATE`로 키 단위 원자성을 보장합니다.
//!
//! # 테이블
//! - `log_mirror`: 원시 로그, UNIQUE(collector_id, original_log_id)
//! - `parsed_logs`: 파싱 결과, UNIQUE(log_mirror_id)
//! - `system_actions`: 시스템 액션, UNIQUE(log_mirror_id)
//! - `devices`: 장치와 로그 카운트, UNIQUE(collector_id, port)
//! - `collector_checkpoints`: 수집기별 커서

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};

use logmirror_core::error::StorageError;
use logmirror_core::store::{
    CheckpointStore, DeviceGate, ParsedLogStore, RawLogStore, SystemActionSink,
};
use logmirror_core::types::{
    CollectorCheckpoint, CollectorId, DeviceId, LogRecordId, ParsedLogRecord, RawLogRecord,
};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS log_mirror (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    collector_id    INTEGER NOT NULL,
    original_log_id INTEGER NOT NULL,
    received_at     TEXT,
    hostname        TEXT NOT NULL,
    facility        TEXT NOT NULL,
    message         TEXT NOT NULL,
    port            INTEGER NOT NULL,
    mirrored_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (collector_id, original_log_id)
);

CREATE TABLE IF NOT EXISTS parsed_logs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    log_mirror_id    INTEGER NOT NULL UNIQUE REFERENCES log_mirror(id),
    pattern_id       INTEGER NOT NULL,
    event_type       TEXT,
    file_path        TEXT,
    file_folder_type TEXT,
    file_size        TEXT,
    username         TEXT,
    user_ip          TEXT,
    source_path      TEXT,
    destination_path TEXT,
    additional_data  TEXT NOT NULL DEFAULT '{}',
    parsed_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS system_actions (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    log_mirror_id      INTEGER NOT NULL UNIQUE REFERENCES log_mirror(id),
    collector_id       INTEGER NOT NULL,
    action_description TEXT NOT NULL,
    created_at         TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS devices (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    collector_id INTEGER NOT NULL,
    hostname     TEXT NOT NULL,
    port         INTEGER NOT NULL,
    log_count    INTEGER NOT NULL DEFAULT 0,
    first_seen   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_seen    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (collector_id, port)
);

CREATE TABLE IF NOT EXISTS collector_checkpoints (
    collector_id    INTEGER PRIMARY KEY,
    last_fetched_id INTEGER NOT NULL,
    updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQLite 저장소
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    max_logs_per_device: u64,
}

impl SqliteStore {
    /// 파일 데이터베이스를 열고 스키마를 준비합니다.
    ///
    /// 상위 디렉토리가 없으면 생성합니다.
    pub fn open(path: impl AsRef<Path>, max_logs_per_device: u64) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Connection(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Self::with_connection(conn, max_logs_per_device)
    }

    /// 메모리 데이터베이스를 엽니다.
    pub fn open_in_memory(max_logs_per_device: u64) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory db: {e}")))?;
        Self::with_connection(conn, max_logs_per_device)
    }

    fn with_connection(conn: Connection, max_logs_per_device: u64) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StorageError::Query(format!("schema setup failed: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_logs_per_device,
        })
    }

    /// 블로킹 스레드에서 연결을 사용합니다.
    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StorageError::Connection("sqlite connection mutex poisoned".to_owned()))?;
            f(&conn).map_err(|e| StorageError::Query(format!("{op}: {e}")))
        })
        .await
        .map_err(|e| StorageError::Connection(format!("spawn_blocking failed: {e}")))?
    }
}

impl RawLogStore for SqliteStore {
    async fn upsert_raw(&self, record: &RawLogRecord) -> Result<LogRecordId, StorageError> {
        let record = record.clone();
        self.call("upsert log_mirror", move |conn| {
            conn.query_row(
                "INSERT INTO log_mirror
                     (collector_id, original_log_id, received_at, hostname, facility, message, port)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (collector_id, original_log_id) DO UPDATE SET
                     received_at = excluded.received_at,
                     hostname    = excluded.hostname,
                     facility    = excluded.facility,
                     message     = excluded.message,
                     port        = excluded.port,
                     mirrored_at = CURRENT_TIMESTAMP
                 RETURNING id",
                params![
                    record.collector_id,
                    record.original_log_id,
                    record.received_at,
                    record.hostname,
                    record.facility,
                    record.message,
                    record.port,
                ],
                |row| row.get(0).map(LogRecordId),
            )
        })
        .await
    }
}

impl ParsedLogStore for SqliteStore {
    async fn upsert_parsed(&self, record: &ParsedLogRecord) -> Result<(), StorageError> {
        let additional_data = record.additional_data_json()?;
        let record = record.clone();
        self.call("upsert parsed_logs", move |conn| {
            conn.execute(
                "INSERT INTO parsed_logs
                     (log_mirror_id, pattern_id, event_type, file_path, file_folder_type,
                      file_size, username, user_ip, source_path, destination_path, additional_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT (log_mirror_id) DO UPDATE SET
                     pattern_id       = excluded.pattern_id,
                     event_type       = excluded.event_type,
                     file_path        = excluded.file_path,
                     file_folder_type = excluded.file_folder_type,
                     file_size        = excluded.file_size,
                     username         = excluded.username,
                     user_ip          = excluded.user_ip,
                     source_path      = excluded.source_path,
                     destination_path = excluded.destination_path,
                     additional_data  = excluded.additional_data,
                     parsed_at        = CURRENT_TIMESTAMP",
                params![
                    record.log_record_id.0,
                    record.pattern_id,
                    record.event_type,
                    record.file_path,
                    record.file_folder_type,
                    record.file_size,
                    record.username,
                    record.user_ip,
                    record.source_path,
                    record.destination_path,
                    additional_data,
                ],
            )
            .map(|_| ())
        })
        .await
    }
}

impl SystemActionSink for SqliteStore {
    async fn save_system_action(
        &self,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        description: &str,
    ) -> Result<(), StorageError> {
        let description = description.to_owned();
        self.call("upsert system_actions", move |conn| {
            conn.execute(
                "INSERT INTO system_actions (log_mirror_id, collector_id, action_description)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (log_mirror_id) DO UPDATE SET
                     collector_id       = excluded.collector_id,
                     action_description = excluded.action_description",
                params![log_record_id.0, collector_id, description],
            )
            .map(|_| ())
        })
        .await
    }
}

impl DeviceGate for SqliteStore {
    async fn register_device(
        &self,
        collector_id: CollectorId,
        hostname: &str,
        port: u16,
    ) -> Result<Option<DeviceId>, StorageError> {
        if port == 0 {
            return Ok(None);
        }
        let hostname = hostname.to_owned();
        self.call("register device", move |conn| {
            conn.query_row(
                "INSERT INTO devices (collector_id, hostname, port)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (collector_id, port) DO UPDATE SET
                     hostname  = excluded.hostname,
                     last_seen = CURRENT_TIMESTAMP
                 RETURNING id",
                params![collector_id, hostname, port],
                |row| row.get(0).map(|id| Some(DeviceId(id))),
            )
        })
        .await
    }

    async fn check_log_quota(
        &self,
        collector_id: CollectorId,
        port: u16,
    ) -> Result<bool, StorageError> {
        let limit = i64::try_from(self.max_logs_per_device).unwrap_or(i64::MAX);
        self.call("check device quota", move |conn| {
            let updated = conn.execute(
                "UPDATE devices SET log_count = log_count + 1
                 WHERE collector_id = ?1 AND port = ?2 AND (?3 = 0 OR log_count < ?3)",
                params![collector_id, port, limit],
            )?;
            if updated > 0 {
                return Ok(true);
            }
            // 갱신된 행이 없으면 장치가 없거나(허용) 한도에 도달(거부)
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM devices WHERE collector_id = ?1 AND port = ?2",
                    params![collector_id, port],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_none())
        })
        .await
    }
}

impl CheckpointStore for SqliteStore {
    async fn load_checkpoint(&self, collector_id: CollectorId) -> Result<Option<i64>, StorageError> {
        self.call("load checkpoint", move |conn| {
            conn.query_row(
                "SELECT last_fetched_id FROM collector_checkpoints WHERE collector_id = ?1",
                params![collector_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn save_checkpoint(&self, checkpoint: CollectorCheckpoint) -> Result<(), StorageError> {
        self.call("save checkpoint", move |conn| {
            conn.execute(
                "INSERT INTO collector_checkpoints (collector_id, last_fetched_id)
                 VALUES (?1, ?2)
                 ON CONFLICT (collector_id) DO UPDATE SET
                     last_fetched_id = excluded.last_fetched_id,
                     updated_at      = CURRENT_TIMESTAMP",
                params![checkpoint.collector_id, checkpoint.last_fetched_id],
            )
            .map(|_| ())
        })
        .await
    }
}
