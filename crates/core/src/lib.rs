//! # logmirror-core
//!
//! logmirror의 공통 기반 크레이트입니다.
//!
//! - [`types`]: 원시 로그, 추출 필드, 파싱 레코드, 체크포인트 등 도메인 타입
//! - [`store`]: 수집 루프와 파싱 엔진이 의존하는 저장소 trait
//! - [`error`]: 도메인별 에러 타입
//! - [`config`]: `logmirror.toml` 설정
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CatalogError, CollectorError, ConfigError, MirrorError, StorageError};

// 설정
pub use config::{CollectorConfig, MirrorConfig};

// 저장소 trait
pub use store::{
    CheckpointStore, DeviceGate, MirrorStore, ParsedLogStore, RawLogStore, SystemActionSink,
};

// 도메인 타입
pub use types::{
    CollectorCheckpoint, CollectorId, DeviceId, ExtractedFields, LogRecordId, ParsedLogRecord,
    PatternId, RawLogRecord,
};
