//! 패턴 카탈로그 -- 우선순위 순으로 정렬된 불변 메시지 패턴 목록
//!
//! 시작 시 한 번 로드되어 `Arc`로 공유됩니다.
//!
//! # 아키텍처
//! - [`RuleCatalog`]: 활성 패턴 목록과 조회 API
//! - [`loader`]: YAML 디렉토리 로딩 (전부 성공 또는 전부 실패)
//! - [`types`]: 패턴/필드 규칙 데이터 구조

pub mod loader;
pub mod types;

pub use loader::CatalogLoader;
pub use types::{FieldRule, MessagePattern, PatternRole, PatternStatus};

use std::collections::HashSet;

use logmirror_core::types::PatternId;

use crate::error::ParseEngineError;

/// 패턴 카탈로그
///
/// 활성 패턴만 담으며, 우선순위 내림차순으로 정렬되어 있습니다.
/// 우선순위가 같으면 입력 순서를 유지합니다.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    patterns: Vec<MessagePattern>,
    system_action: Option<usize>,
}

impl RuleCatalog {
    /// 패턴 목록으로 카탈로그를 만듭니다.
    ///
    /// 모든 패턴(비활성 포함)을 검증한 뒤 활성 패턴만 남깁니다.
    ///
    /// # Errors
    /// - 패턴 검증 실패
    /// - 패턴 ID 중복
    /// - 활성 시스템 액션 패턴이 둘 이상
    pub fn from_patterns(patterns: Vec<MessagePattern>) -> Result<Self, ParseEngineError> {
        let mut seen_ids = HashSet::new();
        for pattern in &patterns {
            pattern.validate()?;
            if !seen_ids.insert(pattern.id) {
                return Err(ParseEngineError::PatternValidation {
                    pattern: pattern.label(),
                    reason: format!("duplicate pattern id {}", pattern.id),
                });
            }
        }

        let mut active: Vec<MessagePattern> =
            patterns.into_iter().filter(MessagePattern::is_active).collect();
        // sort_by는 안정 정렬이므로 동순위는 입력 순서를 유지합니다.
        active.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut system_action = None;
        for (idx, pattern) in active.iter().enumerate() {
            if !pattern.is_system_action() {
                continue;
            }
            if let Some(prev) = system_action {
                let prev: &MessagePattern = &active[prev];
                return Err(ParseEngineError::PatternValidation {
                    pattern: pattern.label(),
                    reason: format!(
                        "only one system_action pattern allowed, '{}' already has that role",
                        prev.label()
                    ),
                });
            }
            system_action = Some(idx);
        }

        Ok(Self {
            patterns: active,
            system_action,
        })
    }

    /// 우선순위 순 활성 패턴
    pub fn patterns(&self) -> &[MessagePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// ID로 패턴을 조회합니다.
    pub fn get(&self, id: PatternId) -> Option<&MessagePattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// 시스템 액션 역할의 패턴
    pub fn system_action_pattern(&self) -> Option<&MessagePattern> {
        self.system_action.map(|idx| &self.patterns[idx])
    }
}
