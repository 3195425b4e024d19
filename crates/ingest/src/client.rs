//! 원격 수집기 클라이언트
//!
//! [`CollectorClient`]는 수집 루프가 의존하는 조회 계약이며,
//! [`HttpCollectorClient`]가 `reqwest` 기반 구현입니다.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use logmirror_core::config::CollectorConfig;

use crate::error::IngestError;
use crate::wire::{FetchRequest, FetchResponse, RemoteRecord, UndecodableRecord, decode_record};

/// 한 번의 조회 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchBatch {
    /// 조회 순서대로의 레코드
    pub records: Vec<RemoteRecord>,
    /// 서버가 알려준 다음 커서 (없으면 체크포인트 유지)
    pub next_last_id: Option<i64>,
    /// 디코딩하지 못한 레코드 (레코드 단위 실패로 집계)
    pub undecodable: Vec<UndecodableRecord>,
}

/// 원격 수집기 조회 계약
pub trait CollectorClient: Send + Sync + 'static {
    /// `last_id` 이후의 레코드를 가져옵니다.
    fn fetch(
        &self,
        collector: &CollectorConfig,
        last_id: i64,
    ) -> impl Future<Output = Result<FetchBatch, IngestError>> + Send;
}

/// HTTP 수집기 클라이언트
///
/// `{secret_key, last_id}`를 JSON으로 POST하고, 2xx 상태와 `success: true`를
/// 요구합니다. 그 외는 모두 [`IngestError::Fetch`]입니다.
#[derive(Debug, Clone)]
pub struct HttpCollectorClient {
    http: reqwest::Client,
}

impl HttpCollectorClient {
    /// 요청 타임아웃을 지정해 클라이언트를 생성합니다.
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("logmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

impl CollectorClient for HttpCollectorClient {
    async fn fetch(
        &self,
        collector: &CollectorConfig,
        last_id: i64,
    ) -> Result<FetchBatch, IngestError> {
        let request = FetchRequest {
            secret_key: &collector.secret_key,
            last_id,
        };

        let response = self
            .http
            .post(&collector.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IngestError::fetch(collector.id, format!("request failed: {e}")))?;

        // 200 외의 상태는 2xx라도 실패로 봅니다.
        let status = response.status();
        if status != StatusCode::OK {
            return Err(IngestError::fetch(collector.id, format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IngestError::fetch(collector.id, format!("failed to read body: {e}")))?;
        if body.is_empty() {
            return Err(IngestError::fetch(collector.id, "empty response body"));
        }

        let parsed: FetchResponse = serde_json::from_slice(&body)
            .map_err(|e| IngestError::fetch(collector.id, format!("malformed response: {e}")))?;

        if !parsed.success {
            let reason = parsed
                .message
                .unwrap_or_else(|| "server reported failure".to_owned());
            return Err(IngestError::fetch(collector.id, reason));
        }

        let data = parsed.data.unwrap_or_default();
        let mut records = Vec::with_capacity(data.records.len());
        let mut undecodable = Vec::new();
        for value in data.records {
            match decode_record(value) {
                Ok(record) => records.push(record),
                Err(bad) => undecodable.push(bad),
            }
        }
        debug!(
            collector = collector.id,
            last_id,
            records = records.len(),
            undecodable = undecodable.len(),
            next_last_id = ?data.next_last_id,
            "fetched batch"
        );

        Ok(FetchBatch {
            records,
            next_last_id: data.next_last_id,
            undecodable,
        })
    }
}
