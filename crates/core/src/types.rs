//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 수집(ingest), 파싱(parse-engine), 저장소(storage) 크레이트가 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// 수집기 ID
pub type CollectorId = i64;

/// 메시지 패턴 ID
pub type PatternId = i64;

/// 원시 로그 저장소의 행 참조
///
/// `RawLogStore::upsert_raw`가 반환하며, 파싱 결과와 시스템 액션이
/// 이 값으로 원시 로그를 가리킵니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogRecordId(pub i64);

impl fmt::Display for LogRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 장치 ID (device gate가 발급)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub i64);

/// 원격 수집기에서 가져온 원시 로그 레코드
///
/// 자연 키는 `(collector_id, original_log_id)`입니다.
/// 같은 키를 두 번 저장하면 갱신이며, 중복 행이 생기지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogRecord {
    /// 수집기 ID
    pub collector_id: CollectorId,
    /// 수집기 측 원본 로그 ID
    pub original_log_id: i64,
    /// 수집기가 로그를 받은 시각 (원격 형식 그대로)
    pub received_at: Option<String>,
    /// 송신 호스트명
    pub hostname: String,
    /// syslog facility
    pub facility: String,
    /// 원본 메시지
    pub message: String,
    /// 송신 포트
    pub port: u16,
}

impl RawLogRecord {
    /// 자연 키를 반환합니다.
    pub fn natural_key(&self) -> (CollectorId, i64) {
        (self.collector_id, self.original_log_id)
    }
}

impl fmt::Display for RawLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}#{}] {}:{} {}",
            self.collector_id, self.original_log_id, self.hostname, self.port, self.message,
        )
    }
}

/// 기본 컬럼으로 저장되는 필드 목록
///
/// 이 목록에 없는 필드는 `additional_data`에 담깁니다.
/// `destination_path`는 전용 컬럼에도 기록되지만 기본 필드가 아니므로
/// `additional_data`에도 남습니다.
pub const PRIMARY_FIELDS: [&str; 6] = [
    "event_type",
    "file_path",
    "file_folder_type",
    "file_size",
    "username",
    "user_ip",
];

/// 필드명이 기본 컬럼인지 확인합니다.
pub fn is_primary_field(name: &str) -> bool {
    PRIMARY_FIELDS.contains(&name)
}

/// 메시지 하나에서 추출된 필드 (순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    fields: Vec<(String, String)>,
}

impl ExtractedFields {
    /// 빈 필드 맵을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 설정합니다. 이미 있는 필드는 위치를 유지한 채 값만 바꿉니다.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 필드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 삽입 순서대로 필드를 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// 일반 파싱 로그 저장소에 기록되는 레코드
///
/// 업서트 키는 `log_record_id`입니다. 같은 원시 로그를 다시 파싱하면
/// 같은 행으로 수렴합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLogRecord {
    /// 원시 로그 참조
    pub log_record_id: LogRecordId,
    /// 매칭된 패턴 ID
    pub pattern_id: PatternId,
    pub event_type: Option<String>,
    pub file_path: Option<String>,
    pub file_folder_type: Option<String>,
    pub file_size: Option<String>,
    pub username: Option<String>,
    pub user_ip: Option<String>,
    /// `file_path`와 동일한 값
    pub source_path: Option<String>,
    pub destination_path: Option<String>,
    /// 기본 컬럼 외 필드 (추출 순서 유지)
    pub additional_data: Vec<(String, String)>,
}

impl ParsedLogRecord {
    /// 추출 필드를 기본 컬럼과 additional_data로 나눠 레코드를 만듭니다.
    pub fn from_fields(
        log_record_id: LogRecordId,
        pattern_id: PatternId,
        fields: &ExtractedFields,
    ) -> Self {
        let column = |name: &str| fields.get(name).map(str::to_owned);

        let additional_data = fields
            .iter()
            .filter(|(k, _)| !is_primary_field(k))
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        Self {
            log_record_id,
            pattern_id,
            event_type: column("event_type"),
            file_path: column("file_path"),
            file_folder_type: column("file_folder_type"),
            file_size: column("file_size"),
            username: column("username"),
            user_ip: column("user_ip"),
            source_path: column("file_path"),
            destination_path: column("destination_path"),
            additional_data,
        }
    }

    /// additional_data를 JSON 객체 문자열로 직렬화합니다.
    pub fn additional_data_json(&self) -> Result<String, StorageError> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .additional_data
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        Ok(serde_json::to_string(&map)?)
    }
}

/// 수집기 체크포인트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorCheckpoint {
    /// 수집기 ID
    pub collector_id: CollectorId,
    /// 마지막으로 처리한 원격 레코드 ID
    pub last_fetched_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_fields() -> ExtractedFields {
        let mut fields = ExtractedFields::new();
        fields.insert("event_type", "user_login");
        fields.insert("username", "alice");
        fields.insert("user_ip", "10.0.0.5");
        fields.insert("service", "NAS01");
        fields.insert("auth_method", "password");
        fields
    }

    #[test]
    fn insert_replaces_existing_value_in_place() {
        let mut fields = ExtractedFields::new();
        fields.insert("a", "1");
        fields.insert("b", "2");
        fields.insert("a", "3");
        let collected: Vec<_> = fields.iter().collect();
        assert_eq!(collected, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn parsed_record_splits_primary_and_additional() {
        let record = ParsedLogRecord::from_fields(LogRecordId(7), 4, &login_fields());
        assert_eq!(record.event_type.as_deref(), Some("user_login"));
        assert_eq!(record.username.as_deref(), Some("alice"));
        assert_eq!(record.user_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(
            record.additional_data,
            vec![
                ("service".to_owned(), "NAS01".to_owned()),
                ("auth_method".to_owned(), "password".to_owned()),
            ]
        );
        assert!(record.file_path.is_none());
    }

    #[test]
    fn source_path_mirrors_file_path() {
        let mut fields = ExtractedFields::new();
        fields.insert("file_path", "/volume1/docs/a.txt");
        let record = ParsedLogRecord::from_fields(LogRecordId(1), 1, &fields);
        assert_eq!(record.source_path.as_deref(), Some("/volume1/docs/a.txt"));
    }

    #[test]
    fn destination_path_fills_column_and_additional_data() {
        let mut fields = ExtractedFields::new();
        fields.insert("file_path", "/a");
        fields.insert("destination_path", "/b");
        let record = ParsedLogRecord::from_fields(LogRecordId(1), 1, &fields);
        assert_eq!(record.destination_path.as_deref(), Some("/b"));
        let value: serde_json::Value =
            serde_json::from_str(&record.additional_data_json().unwrap()).unwrap();
        assert_eq!(value["destination_path"], "/b");
        assert!(value.get("file_path").is_none());
    }

    #[test]
    fn additional_data_json_is_object() {
        let record = ParsedLogRecord::from_fields(LogRecordId(7), 4, &login_fields());
        let json = record.additional_data_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["service"], "NAS01");
        assert_eq!(value["auth_method"], "password");
        assert!(value.get("username").is_none());
    }

    #[test]
    fn empty_additional_data_serializes_to_empty_object() {
        let record = ParsedLogRecord::from_fields(LogRecordId(1), 1, &ExtractedFields::new());
        assert_eq!(record.additional_data_json().unwrap(), "{}");
    }

    #[test]
    fn raw_record_natural_key() {
        let record = RawLogRecord {
            collector_id: 2,
            original_log_id: 99,
            received_at: None,
            hostname: "nas".to_owned(),
            facility: "user".to_owned(),
            message: "hello".to_owned(),
            port: 514,
        };
        assert_eq!(record.natural_key(), (2, 99));
        assert!(record.to_string().contains("2#99"));
    }
}
