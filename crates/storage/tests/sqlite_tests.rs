//! SQLite 저장소 통합 테스트 -- 파일 데이터베이스의 실제 행을 확인합니다.

use logmirror_core::store::{
    CheckpointStore, DeviceGate, ParsedLogStore, RawLogStore, SystemActionSink,
};
use logmirror_core::types::{CollectorCheckpoint, ExtractedFields, ParsedLogRecord, RawLogRecord};
use logmirror_storage::SqliteStore;
use rusqlite::{Connection, params};

fn raw(original_log_id: i64, message: &str) -> RawLogRecord {
    RawLogRecord {
        collector_id: 1,
        original_log_id,
        received_at: Some("2026-01-05 10:00:00".to_owned()),
        hostname: "nas01".to_owned(),
        facility: "user".to_owned(),
        message: message.to_owned(),
        port: 514,
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[tokio::test]
async fn same_natural_key_keeps_one_row_with_latest_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    let store = SqliteStore::open(&path, 0).unwrap();

    store.upsert_raw(&raw(100, "first payload")).await.unwrap();
    store.upsert_raw(&raw(100, "second payload")).await.unwrap();

    let conn = Connection::open(&path).unwrap();
    assert_eq!(count(&conn, "log_mirror"), 1);
    let message: String = conn
        .query_row(
            "SELECT message FROM log_mirror WHERE collector_id = ?1 AND original_log_id = ?2",
            params![1, 100],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(message, "second payload");
}

#[tokio::test]
async fn parsed_row_holds_columns_and_additional_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    let store = SqliteStore::open(&path, 0).unwrap();

    let id = store.upsert_raw(&raw(1, "login")).await.unwrap();
    let mut fields = ExtractedFields::new();
    fields.insert("event_type", "user_login");
    fields.insert("username", "alice");
    fields.insert("user_ip", "10.0.0.5");
    fields.insert("service", "NAS01");
    store
        .upsert_parsed(&ParsedLogRecord::from_fields(id, 4, &fields))
        .await
        .unwrap();
    // 재파싱은 같은 행으로 수렴
    store
        .upsert_parsed(&ParsedLogRecord::from_fields(id, 4, &fields))
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    assert_eq!(count(&conn, "parsed_logs"), 1);
    let (username, additional): (String, String) = conn
        .query_row(
            "SELECT username, additional_data FROM parsed_logs WHERE log_mirror_id = ?1",
            params![id.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(username, "alice");
    let extra: serde_json::Value = serde_json::from_str(&additional).unwrap();
    assert_eq!(extra["service"], "NAS01");
    assert!(extra.get("username").is_none());
}

#[tokio::test]
async fn system_action_is_stored_once_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    let store = SqliteStore::open(&path, 0).unwrap();

    let id = store.upsert_raw(&raw(5, "SYSTEM: disk2 was unmounted")).await.unwrap();
    store
        .save_system_action(id, 1, "disk2 was unmounted")
        .await
        .unwrap();
    store
        .save_system_action(id, 1, "disk2 was unmounted")
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    assert_eq!(count(&conn, "system_actions"), 1);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    {
        let store = SqliteStore::open(&path, 2).unwrap();
        store.upsert_raw(&raw(1, "a")).await.unwrap();
        store
            .save_checkpoint(CollectorCheckpoint {
                collector_id: 1,
                last_fetched_id: 77,
            })
            .await
            .unwrap();
        store.register_device(1, "nas01", 514).await.unwrap();
        assert!(store.check_log_quota(1, 514).await.unwrap());
        assert!(store.check_log_quota(1, 514).await.unwrap());
    }

    let store = SqliteStore::open(&path, 2).unwrap();
    assert_eq!(store.load_checkpoint(1).await.unwrap(), Some(77));
    // 로그 카운트도 유지되어 한도 초과
    assert!(!store.check_log_quota(1, 514).await.unwrap());
    let again = store.upsert_raw(&raw(1, "a")).await.unwrap();
    let other = store.upsert_raw(&raw(2, "b")).await.unwrap();
    assert_ne!(again, other);
}
