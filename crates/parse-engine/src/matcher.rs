//! 패턴 매칭 -- 메시지를 분류할 최우선 패턴 탐색
//!
//! [`PatternMatcher`]는 카탈로그의 패턴 정규식을 생성 시 한 번 컴파일하고,
//! 우선순위 순으로 검색하여 처음 매칭되는 패턴을 반환합니다.

use std::sync::Arc;

use regex::Regex;

use logmirror_core::types::PatternId;

use crate::catalog::{MessagePattern, RuleCatalog};
use crate::error::ParseEngineError;

/// 패턴 매처
pub struct PatternMatcher {
    catalog: Arc<RuleCatalog>,
    /// 컴파일된 패턴 정규식 (카탈로그와 같은 우선순위 순): pattern_id -> Regex
    compiled: Vec<(PatternId, Regex)>,
}

impl PatternMatcher {
    /// 카탈로그의 모든 패턴 정규식을 컴파일합니다.
    pub fn new(catalog: Arc<RuleCatalog>) -> Result<Self, ParseEngineError> {
        let compiled = catalog
            .patterns()
            .iter()
            .map(|pattern| {
                Regex::new(&pattern.regex)
                    .map(|regex| (pattern.id, regex))
                    .map_err(|e| ParseEngineError::PatternValidation {
                        pattern: pattern.label(),
                        reason: format!("invalid pattern regex: {e}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { catalog, compiled })
    }

    /// 메시지에 매칭되는 최우선 패턴을 찾습니다.
    ///
    /// 정규식은 메시지 전체가 아니라 부분 검색으로 평가됩니다.
    /// 매칭되는 패턴이 없으면 `None`입니다 (에러 아님).
    pub fn find_match(&self, message: &str) -> Option<&MessagePattern> {
        let matched = self
            .catalog
            .patterns()
            .iter()
            .zip(&self.compiled)
            .find(|(pattern, (id, regex))| pattern.id == *id && regex.is_match(message))
            .map(|(pattern, _)| pattern);

        if matched.is_none() {
            tracing::debug!(message, "no pattern matched");
        }
        matched
    }

    /// 매처가 사용하는 카탈로그
    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }
}
