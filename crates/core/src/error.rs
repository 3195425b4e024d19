//! 에러 타입 -- 도메인별 에러 정의

/// logmirror 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 패턴 카탈로그 에러
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// 수집기 처리 에러
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 패턴 카탈로그 에러
///
/// 카탈로그 로딩 실패는 실행 전체에 치명적입니다. 규칙 없이 파싱하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// 카탈로그 로딩 실패
    #[error("load failed: {0}")]
    LoadFailed(String),
}

/// 수집기 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 원격 수집기 조회 실패
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// 체크포인트 저장 실패
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 직렬화 실패 (additional_data 등)
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
