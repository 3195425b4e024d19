//! 수집 루프 에러 타입
//!
//! [`IngestError`]는 수집기 단위로 발생하는 에러입니다. 한 수집기의 실패는
//! 다른 수집기에 영향을 주지 않으며, 실행 요약의 수집기 실패 목록에 기록됩니다.
//! `From<IngestError> for MirrorError` 변환으로 상위 레이어에서 `?`를 쓸 수 있습니다.

use logmirror_core::error::{CollectorError, MirrorError, StorageError};
use logmirror_core::types::CollectorId;

/// 수집 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 원격 수집기 조회 실패 (전송 오류, 비정상 상태 코드, 잘못된 응답 본문)
    #[error("fetch failed for collector {collector}: {reason}")]
    Fetch {
        /// 수집기 ID
        collector: CollectorId,
        /// 실패 사유
        reason: String,
    },

    /// 체크포인트 읽기/쓰기 실패
    #[error("checkpoint failed for collector {collector}: {source}")]
    Checkpoint {
        /// 수집기 ID
        collector: CollectorId,
        /// 저장소 에러
        source: StorageError,
    },

    /// 수집기 HTTP 클라이언트 생성 실패
    #[error("client build error: {0}")]
    ClientBuild(String),

    /// 수집 루프 구성 에러
    #[error("config error: {0}")]
    Config(String),
}

impl IngestError {
    pub(crate) fn fetch(collector: CollectorId, reason: impl Into<String>) -> Self {
        Self::Fetch {
            collector,
            reason: reason.into(),
        }
    }
}

impl From<IngestError> for MirrorError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Fetch { .. } | IngestError::ClientBuild(_) => {
                MirrorError::Collector(CollectorError::Fetch(err.to_string()))
            }
            IngestError::Checkpoint { .. } => {
                MirrorError::Collector(CollectorError::Checkpoint(err.to_string()))
            }
            IngestError::Config(reason) => {
                MirrorError::Config(logmirror_core::error::ConfigError::InvalidValue {
                    field: "ingest".to_owned(),
                    reason,
                })
            }
        }
    }
}
