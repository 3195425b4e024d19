//! 설정 관리 -- logmirror.toml 파싱 및 런타임 설정
//!
//! [`MirrorConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGMIRROR_INGEST_FETCH_TIMEOUT_SECS=10` 형식)
//! 3. 설정 파일 (`logmirror.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logmirror_core::error::MirrorError> {
//! use logmirror_core::config::MirrorConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = MirrorConfig::load("logmirror.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = MirrorConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, MirrorError};
use crate::types::CollectorId;

const MAX_FETCH_TIMEOUT_SECS: u64 = 300;
const MAX_CONCURRENT_COLLECTORS: usize = 64;

/// logmirror 통합 설정
///
/// `logmirror.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 패턴 카탈로그 설정
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// 수집 루프 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 장치 쿼터 설정
    #[serde(default)]
    pub quota: QuotaConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 원격 수집기 목록
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
}

impl MirrorConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MirrorError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MirrorError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MirrorError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                MirrorError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, MirrorError> {
        toml::from_str(toml_str).map_err(|e| {
            MirrorError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGMIRROR_{SECTION}_{FIELD}`
    /// 수집기 목록은 환경변수로 덮어쓸 수 없습니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGMIRROR_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGMIRROR_GENERAL_LOG_FORMAT");

        // Catalog
        override_string(
            &mut self.catalog.pattern_dir,
            "LOGMIRROR_CATALOG_PATTERN_DIR",
        );

        // Ingest
        override_u64(
            &mut self.ingest.fetch_timeout_secs,
            "LOGMIRROR_INGEST_FETCH_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.ingest.max_concurrent_collectors,
            "LOGMIRROR_INGEST_MAX_CONCURRENT_COLLECTORS",
        );
        override_u64(
            &mut self.ingest.poll_interval_secs,
            "LOGMIRROR_INGEST_POLL_INTERVAL_SECS",
        );

        // Storage
        override_string(&mut self.storage.backend, "LOGMIRROR_STORAGE_BACKEND");
        override_string(
            &mut self.storage.sqlite_path,
            "LOGMIRROR_STORAGE_SQLITE_PATH",
        );

        // Quota
        override_u64(
            &mut self.quota.max_logs_per_device,
            "LOGMIRROR_QUOTA_MAX_LOGS_PER_DEVICE",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGMIRROR_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "LOGMIRROR_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "LOGMIRROR_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MirrorError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.catalog.pattern_dir.is_empty() {
            return Err(invalid("catalog.pattern_dir", "must not be empty"));
        }

        if self.ingest.fetch_timeout_secs == 0
            || self.ingest.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS
        {
            return Err(invalid(
                "ingest.fetch_timeout_secs",
                format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
            ));
        }

        if self.ingest.max_concurrent_collectors == 0
            || self.ingest.max_concurrent_collectors > MAX_CONCURRENT_COLLECTORS
        {
            return Err(invalid(
                "ingest.max_concurrent_collectors",
                format!("must be 1-{MAX_CONCURRENT_COLLECTORS}"),
            ));
        }

        if self.ingest.poll_interval_secs == 0 {
            return Err(invalid(
                "ingest.poll_interval_secs",
                "must be greater than 0",
            ));
        }

        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(invalid(
                "storage.backend",
                format!("must be one of: {}", valid_backends.join(", ")),
            ));
        }

        if self.storage.backend == "sqlite" && self.storage.sqlite_path.is_empty() {
            return Err(invalid(
                "storage.sqlite_path",
                "must not be empty when backend is sqlite",
            ));
        }

        let mut seen_ids = HashSet::new();
        for (idx, collector) in self.collectors.iter().enumerate() {
            if !seen_ids.insert(collector.id) {
                return Err(invalid(
                    format!("collectors[{idx}].id"),
                    format!("duplicate collector id {}", collector.id),
                ));
            }
            if collector.url.is_empty() {
                return Err(invalid(format!("collectors[{idx}].url"), "must not be empty"));
            }
            if !(collector.url.starts_with("http://") || collector.url.starts_with("https://")) {
                return Err(invalid(
                    format!("collectors[{idx}].url"),
                    "must start with http:// or https://",
                ));
            }
            if collector.secret_key.is_empty() {
                return Err(invalid(
                    format!("collectors[{idx}].secret_key"),
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }

    /// 활성화된 수집기만 설정 순서대로 반환합니다.
    pub fn active_collectors(&self) -> Vec<CollectorConfig> {
        self.collectors
            .iter()
            .filter(|c| c.enabled)
            .cloned()
            .collect()
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> MirrorError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 패턴 카탈로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 패턴 YAML 파일 디렉토리
    pub pattern_dir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pattern_dir: "/etc/logmirror/patterns".to_owned(),
        }
    }
}

/// 수집 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 원격 수집기 요청 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 동시에 처리할 수 있는 수집기 수 (1이면 순차 처리)
    pub max_concurrent_collectors: usize,
    /// 데몬의 수집 주기 (초)
    pub poll_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            max_concurrent_collectors: 1,
            poll_interval_secs: 60,
        }
    }
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 저장소 백엔드 (sqlite, memory)
    pub backend: String,
    /// SQLite 데이터베이스 파일 경로
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_owned(),
            sqlite_path: "/var/lib/logmirror/logmirror.db".to_owned(),
        }
    }
}

/// 장치 쿼터 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// 장치당 최대 로그 수 (0 = 무제한)
    pub max_logs_per_device: u64,
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
        }
    }
}

/// 원격 수집기 설정
#[derive(Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 수집기 ID (저장소의 collector_id)
    pub id: CollectorId,
    /// 표시 이름
    pub name: String,
    /// 수집 API URL
    pub url: String,
    /// 수집 API 비밀 키
    pub secret_key: String,
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 체크포인트가 없을 때 사용할 시작 커서
    #[serde(default)]
    pub initial_last_id: i64,
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("secret_key", &"<redacted>")
            .field("enabled", &self.enabled)
            .field("initial_last_id", &self.initial_last_id)
            .finish()
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn collector(id: CollectorId) -> CollectorConfig {
        CollectorConfig {
            id,
            name: format!("collector-{id}"),
            url: "http://localhost/api/api.php".to_owned(),
            secret_key: "sk_test".to_owned(),
            enabled: true,
            initial_last_id: 0,
        }
    }

    #[test]
    fn default_config_has_sane_values() {
        let config = MirrorConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.ingest.fetch_timeout_secs, 30);
        assert_eq!(config.ingest.max_concurrent_collectors, 1);
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.quota.max_logs_per_device, 0);
        assert!(!config.metrics.enabled);
        assert!(config.collectors.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        MirrorConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = MirrorConfig::parse("").unwrap();
        assert_eq!(config.catalog.pattern_dir, "/etc/logmirror/patterns");
    }

    #[test]
    fn parse_collectors_section() {
        let toml = r#"
[ingest]
fetch_timeout_secs = 10

[[collectors]]
id = 1
name = "Local API Collector"
url = "http://localhost/api/api.php"
secret_key = "sk_5a1b3c4d"

[[collectors]]
id = 2
name = "Branch office"
url = "https://branch.example.com/api.php"
secret_key = "sk_other"
enabled = false
initial_last_id = 500
"#;
        let config = MirrorConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.ingest.fetch_timeout_secs, 10);
        assert_eq!(config.collectors.len(), 2);
        assert!(config.collectors[0].enabled);
        assert_eq!(config.collectors[1].initial_last_id, 500);

        let active = config.active_collectors();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = MirrorConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = MirrorConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = MirrorConfig::default();
        config.ingest.fetch_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch_timeout_secs"));
    }

    #[test]
    fn validate_rejects_unknown_backend() {
        let mut config = MirrorConfig::default();
        config.storage.backend = "mysql".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.backend"));
    }

    #[test]
    fn validate_rejects_duplicate_collector_ids() {
        let mut config = MirrorConfig::default();
        config.collectors = vec![collector(1), collector(1)];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate collector id"));
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut config = MirrorConfig::default();
        let mut c = collector(1);
        c.url = "ftp://example.com".to_owned();
        config.collectors = vec![c];
        assert!(config.validate().is_err());
    }

    #[test]
    fn collector_debug_redacts_secret() {
        let debug = format!("{:?}", collector(3));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sk_test"));
    }

    #[test]
    #[serial]
    fn env_override_u64() {
        let mut val = 30u64;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGMIRROR_U64", "12") };
        override_u64(&mut val, "TEST_LOGMIRROR_U64");
        assert_eq!(val, 12);
        unsafe { std::env::remove_var("TEST_LOGMIRROR_U64") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGMIRROR_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_LOGMIRROR_BOOL_BAD");
        assert!(!val);
        unsafe { std::env::remove_var("TEST_LOGMIRROR_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_sets_storage_backend() {
        let mut config = MirrorConfig::default();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("LOGMIRROR_STORAGE_BACKEND", "memory") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("LOGMIRROR_STORAGE_BACKEND") };
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_LOGMIRROR_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = MirrorConfig::from_file("/nonexistent/path/logmirror.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
