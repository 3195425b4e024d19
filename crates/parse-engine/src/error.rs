//! 파싱 엔진 에러 타입
//!
//! [`ParseEngineError`]는 카탈로그 로딩과 정규식 컴파일 중 발생하는 에러입니다.
//! 실행 전체에 치명적이며, `From<ParseEngineError> for MirrorError` 변환으로
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! [`ExtractionFailure`]는 레코드 단위 실패로, 다른 레코드 처리에 영향을 주지 않습니다.

use logmirror_core::error::{CatalogError, MirrorError};
use logmirror_core::types::PatternId;

/// 파싱 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseEngineError {
    /// 패턴 파일 또는 디렉토리 로딩 실패
    #[error("catalog load error: {path}: {reason}")]
    CatalogLoad {
        /// 패턴 파일 또는 디렉토리 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 패턴 유효성 검증 실패
    #[error("pattern validation error: pattern '{pattern}': {reason}")]
    PatternValidation {
        /// 문제가 된 패턴 (이름 또는 ID)
        pattern: String,
        /// 검증 실패 사유
        reason: String,
    },
}

impl From<ParseEngineError> for MirrorError {
    fn from(err: ParseEngineError) -> Self {
        MirrorError::Catalog(CatalogError::LoadFailed(err.to_string()))
    }
}

/// 필드 추출 실패 (레코드 단위)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionFailure {
    /// 필수 필드 값을 얻지 못함
    #[error("missing required field '{0}'")]
    MissingRequiredField(String),

    /// 추출기에 컴파일되지 않은 패턴
    #[error("pattern {0} is not compiled in this extractor")]
    UnknownPattern(PatternId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_load_error_display() {
        let err = ParseEngineError::CatalogLoad {
            path: "/etc/logmirror/patterns/10-login.yml".to_owned(),
            reason: "invalid YAML".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10-login.yml"));
        assert!(msg.contains("invalid YAML"));
    }

    #[test]
    fn converts_to_mirror_error() {
        let err = ParseEngineError::PatternValidation {
            pattern: "User Login".to_owned(),
            reason: "name must not be empty".to_owned(),
        };
        let mirror: MirrorError = err.into();
        assert!(matches!(mirror, MirrorError::Catalog(_)));
        assert!(mirror.to_string().contains("User Login"));
    }

    #[test]
    fn missing_required_field_display() {
        let err = ExtractionFailure::MissingRequiredField("username".to_owned());
        assert_eq!(err.to_string(), "missing required field 'username'");
    }
}
