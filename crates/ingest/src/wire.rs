//! 원격 수집기 API 요청/응답 형식
//!
//! ```text
//! POST {url}
//! {"secret_key": "...", "last_id": 120}
//!
//! 200 OK
//! {"success": true,
//!  "data": {"records": [{"id": 121, "received_at": "...", "hostname": "nas01",
//!                        "facility": "user", "message": "...", "port": 514}],
//!           "next_last_id": 121}}
//! ```
//!
//! 수집기 서버는 숫자를 문자열로 보내기도 하므로 `id`, `port`, `next_last_id`는
//! 숫자와 숫자 문자열을 모두 받습니다.
//!
//! 레코드는 하나씩 디코딩합니다. 잘못된 레코드 하나가 배치 전체를 막지 않고
//! [`UndecodableRecord`]로 남습니다.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use logmirror_core::types::{CollectorId, RawLogRecord};

/// 조회 요청 본문
#[derive(Debug, Serialize)]
pub struct FetchRequest<'a> {
    pub secret_key: &'a str,
    pub last_id: i64,
}

/// 조회 응답 본문
#[derive(Debug, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub success: bool,
    /// 실패 시 서버가 보내는 메시지
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<FetchData>,
}

/// 응답의 `data` 객체
#[derive(Debug, Default, Deserialize)]
pub struct FetchData {
    /// 디코딩 전 레코드 ([`decode_record`]로 하나씩 변환)
    #[serde(default, deserialize_with = "nullable_vec")]
    pub records: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub next_last_id: Option<i64>,
}

/// 원격 수집기의 로그 레코드
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub received_at: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub hostname: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub facility: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub message: String,
    /// 포트가 없거나 `null`이면 0 (장치 미식별)
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: u16,
}

impl RemoteRecord {
    /// 수집기 ID를 붙여 원시 로그 레코드로 변환합니다.
    pub fn into_raw(self, collector_id: CollectorId) -> RawLogRecord {
        RawLogRecord {
            collector_id,
            original_log_id: self.id,
            received_at: self.received_at,
            hostname: self.hostname,
            facility: self.facility,
            message: self.message,
            port: self.port,
        }
    }
}

/// 디코딩하지 못한 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableRecord {
    /// 읽을 수 있었다면 원격 레코드 ID
    pub id: Option<i64>,
    pub reason: String,
}

/// 레코드 하나를 디코딩합니다.
pub fn decode_record(value: Value) -> Result<RemoteRecord, UndecodableRecord> {
    let id = match value.get("id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    };
    serde_json::from_value(value).map_err(|e| UndecodableRecord {
        id,
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

impl NumberOrText {
    fn into_i64<E: serde::de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            Self::Number(n) => Ok(Some(n)),
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                text.parse::<i64>()
                    .map(Some)
                    .map_err(|_| E::custom(format!("expected integer, got '{text}'")))
            }
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    NumberOrText::deserialize(deserializer)?
        .into_i64()?
        .ok_or_else(|| serde::de::Error::custom("expected integer, got empty string"))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_i64(),
        None => Ok(None),
    }
}

fn lenient_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let Some(port) = lenient_opt_i64(deserializer)? else {
        return Ok(0);
    };
    u16::try_from(port)
        .map_err(|_| serde::de::Error::custom(format!("port {port} out of range")))
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_keys() {
        let body = serde_json::to_value(FetchRequest {
            secret_key: "s3cret",
            last_id: 42,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"secret_key": "s3cret", "last_id": 42}));
    }

    #[test]
    fn accepts_numeric_strings() {
        let json = r#"{
            "success": true,
            "data": {
                "records": [
                    {"id": "17", "received_at": "2026-01-05 10:00:00", "hostname": "nas01",
                     "facility": "user", "message": "hello", "port": "514"}
                ],
                "next_last_id": "17"
            }
        }"#;
        let resp: FetchResponse = serde_json::from_str(json).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.next_last_id, Some(17));
        let record = decode_record(data.records[0].clone()).unwrap();
        assert_eq!(record.id, 17);
        assert_eq!(record.port, 514);
    }

    #[test]
    fn missing_or_null_fields_use_defaults() {
        let json = r#"{"success": true, "data": {"records": [
            {"id": 3, "hostname": null, "message": "m", "port": null}
        ]}}"#;
        let resp: FetchResponse = serde_json::from_str(json).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.next_last_id, None);
        let record = decode_record(data.records[0].clone()).unwrap();
        assert_eq!(record.hostname, "");
        assert_eq!(record.facility, "");
        assert_eq!(record.port, 0);
        assert_eq!(record.received_at, None);
    }

    #[test]
    fn null_records_is_empty_batch() {
        let resp: FetchResponse =
            serde_json::from_str(r#"{"success": true, "data": {"records": null}}"#).unwrap();
        assert!(resp.data.unwrap().records.is_empty());
    }

    #[test]
    fn non_numeric_id_is_undecodable_record() {
        let json = r#"{"success": true, "data": {"records": [{"id": "abc", "message": "m"}]}}"#;
        let resp: FetchResponse = serde_json::from_str(json).unwrap();
        let bad = decode_record(resp.data.unwrap().records[0].clone()).unwrap_err();
        assert_eq!(bad.id, None);
        assert!(bad.reason.contains("abc"));
    }

    #[test]
    fn out_of_range_port_keeps_record_id() {
        let bad = decode_record(serde_json::json!({"id": "8", "port": 70000})).unwrap_err();
        assert_eq!(bad.id, Some(8));
        assert!(bad.reason.contains("70000"));
    }

    #[test]
    fn into_raw_attaches_collector() {
        let record = RemoteRecord {
            id: 9,
            received_at: None,
            hostname: "nas01".to_owned(),
            facility: "user".to_owned(),
            message: "m".to_owned(),
            port: 514,
        };
        let raw = record.into_raw(4);
        assert_eq!(raw.natural_key(), (4, 9));
        assert_eq!(raw.port, 514);
    }
}
