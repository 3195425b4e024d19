//! 패턴 파일 로더 -- YAML 패턴 파일을 디스크에서 로드합니다.
//!
//! 패턴 디렉토리 내의 `.yml`/`.yaml` 파일을 파일 이름 순으로 파싱합니다.
//! 파일 하나라도 읽거나 파싱할 수 없으면 전체 로딩이 실패합니다.

use std::path::{Path, PathBuf};

use crate::error::ParseEngineError;

use super::RuleCatalog;
use super::types::MessagePattern;

const MAX_PATTERN_FILE_SIZE: u64 = 1024 * 1024; // 1MB
const MAX_PATTERNS_COUNT: usize = 10_000;

/// 패턴 파일 로더
pub struct CatalogLoader;

impl CatalogLoader {
    /// 디렉토리에서 모든 YAML 패턴 파일을 로드하여 카탈로그를 만듭니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 어떤 파일이든 읽기/파싱/검증에 실패한 경우
    /// - 패턴 수가 `MAX_PATTERNS_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<RuleCatalog, ParseEngineError> {
        let dir = dir.as_ref();
        let paths = Self::pattern_files(dir).await?;

        if paths.len() > MAX_PATTERNS_COUNT {
            return Err(ParseEngineError::CatalogLoad {
                path: dir.display().to_string(),
                reason: format!("too many patterns: max {MAX_PATTERNS_COUNT}"),
            });
        }

        let mut patterns = Vec::with_capacity(paths.len());
        for path in &paths {
            patterns.push(Self::load_file(path).await?);
        }

        let total = patterns.len();
        let catalog = RuleCatalog::from_patterns(patterns)?;

        metrics::gauge!(logmirror_core::metrics::CATALOG_PATTERNS_LOADED).set(catalog.len() as f64);
        tracing::info!(
            dir = %dir.display(),
            files = total,
            active = catalog.len(),
            system_action = ?catalog.system_action_pattern().map(|p| p.id),
            "loaded message patterns"
        );

        Ok(catalog)
    }

    /// 단일 YAML 파일에서 패턴을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<MessagePattern, ParseEngineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_error(path, format!("failed to read file metadata: {e}")))?;

        if metadata.len() > MAX_PATTERN_FILE_SIZE {
            return Err(load_error(
                path,
                format!(
                    "file too large: {} bytes (max: {MAX_PATTERN_FILE_SIZE})",
                    metadata.len()
                ),
            ));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(path, format!("failed to read file: {e}")))?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 패턴을 생성합니다.
    ///
    /// 구조 검증까지 수행하므로 반환된 패턴은 정규식이 컴파일 가능합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<MessagePattern, ParseEngineError> {
        let pattern: MessagePattern =
            serde_yaml::from_str(yaml_str).map_err(|e| ParseEngineError::CatalogLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        pattern.validate()?;

        Ok(pattern)
    }

    /// 디렉토리의 YAML 파일 경로를 이름 순으로 반환합니다.
    pub async fn pattern_files(dir: &Path) -> Result<Vec<PathBuf>, ParseEngineError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| load_error(dir, format!("failed to read directory: {e}")))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| load_error(dir, format!("failed to read directory entry: {e}")))?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if is_yaml && path.is_file() {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

fn load_error(path: &Path, reason: String) -> ParseEngineError {
    ParseEngineError::CatalogLoad {
        path: path.display().to_string(),
        reason,
    }
}
