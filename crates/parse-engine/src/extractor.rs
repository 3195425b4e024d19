//! 필드 추출 -- 매칭된 패턴의 규칙으로 메시지에서 구조화 필드를 뽑습니다.
//!
//! 규칙은 정의 순서대로, 서로 독립적으로 원본 메시지에 적용됩니다.
//! 필수 필드 하나라도 값을 얻지 못하면 추출 전체가 실패하며 부분 결과는 없습니다.

use std::collections::HashMap;

use regex::Regex;

use logmirror_core::types::{ExtractedFields, PatternId};

use crate::catalog::{FieldRule, MessagePattern, RuleCatalog};
use crate::error::{ExtractionFailure, ParseEngineError};

/// 필드 추출기
pub struct FieldExtractor {
    /// 컴파일된 규칙 정규식 캐시: (pattern_id, rule_index) -> Regex
    regex_cache: HashMap<(PatternId, usize), Regex>,
    /// 컴파일된 패턴 ID
    compiled_patterns: Vec<PatternId>,
}

impl FieldExtractor {
    /// 빈 추출기를 생성합니다.
    pub fn new() -> Self {
        Self {
            regex_cache: HashMap::new(),
            compiled_patterns: Vec::new(),
        }
    }

    /// 카탈로그의 모든 패턴 규칙을 컴파일한 추출기를 생성합니다.
    pub fn for_catalog(catalog: &RuleCatalog) -> Result<Self, ParseEngineError> {
        let mut extractor = Self::new();
        for pattern in catalog.patterns() {
            extractor.compile_pattern(pattern)?;
        }
        Ok(extractor)
    }

    /// 패턴의 규칙 정규식을 컴파일하여 캐싱합니다.
    pub fn compile_pattern(&mut self, pattern: &MessagePattern) -> Result<(), ParseEngineError> {
        for (idx, rule) in pattern.fields.iter().enumerate() {
            if let Some(source) = rule.extraction_regex() {
                let regex = Regex::new(source).map_err(|e| ParseEngineError::PatternValidation {
                    pattern: pattern.label(),
                    reason: format!(
                        "invalid extraction regex in fields[{idx}] for '{}': {e}",
                        rule.name
                    ),
                })?;
                self.regex_cache.insert((pattern.id, idx), regex);
            }
        }
        if !self.compiled_patterns.contains(&pattern.id) {
            self.compiled_patterns.push(pattern.id);
        }
        Ok(())
    }

    /// 패턴 규칙을 메시지에 적용하여 필드를 추출합니다.
    ///
    /// 규칙별 처리:
    /// 1. 정규식이 있으면 메시지에 적용해 지정된 캡처 그룹을 값으로 씁니다.
    /// 2. 값이 없고 기본값이 있으면 기본값을 씁니다.
    /// 3. 그래도 값이 없거나 빈 문자열인데 필수라면 실패합니다.
    /// 4. 선택 필드에 값이 없으면 생략합니다.
    pub fn extract(
        &self,
        pattern: &MessagePattern,
        message: &str,
    ) -> Result<ExtractedFields, ExtractionFailure> {
        if !self.compiled_patterns.contains(&pattern.id) {
            return Err(ExtractionFailure::UnknownPattern(pattern.id));
        }

        let mut fields = ExtractedFields::new();
        for (idx, rule) in pattern.fields.iter().enumerate() {
            let captured = self
                .regex_cache
                .get(&(pattern.id, idx))
                .and_then(|regex| capture(regex, rule, message));

            let value = captured.or_else(|| rule.default_value().map(str::to_owned));

            match value {
                Some(v) if !(rule.required && v.is_empty()) => fields.insert(rule.name.clone(), v),
                _ if rule.required => {
                    tracing::debug!(
                        pattern = %pattern.label(),
                        field = %rule.name,
                        "required field missing"
                    );
                    return Err(ExtractionFailure::MissingRequiredField(rule.name.clone()));
                }
                _ => {}
            }
        }

        Ok(fields)
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 매칭되지 않았거나 그룹이 참여하지 않았으면 `None`
fn capture(regex: &Regex, rule: &FieldRule, message: &str) -> Option<String> {
    regex
        .captures(message)
        .and_then(|caps| caps.get(rule.group))
        .map(|m| m.as_str().to_owned())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::catalog::{PatternRole, PatternStatus};
    use proptest::prelude::*;

    fn pattern(fields: Vec<FieldRule>) -> MessagePattern {
        MessagePattern {
            id: 1,
            name: "prop".to_owned(),
            description: String::new(),
            regex: ".*".to_owned(),
            priority: 0,
            status: PatternStatus::Active,
            role: PatternRole::Generic,
            fields,
        }
    }

    fn extractor_for(p: &MessagePattern) -> FieldExtractor {
        let mut extractor = FieldExtractor::new();
        extractor.compile_pattern(p).unwrap();
        extractor
    }

    proptest! {
        #[test]
        fn default_only_rule_always_yields_default(
            message in ".{0,200}",
            default in "[a-z_]{1,20}",
        ) {
            let p = pattern(vec![FieldRule {
                name: "event_type".to_owned(),
                regex: None,
                group: 1,
                default: Some(default.clone()),
                required: true,
            }]);
            let fields = extractor_for(&p).extract(&p, &message).unwrap();
            prop_assert_eq!(fields.get("event_type"), Some(default.as_str()));
        }

        #[test]
        fn required_miss_never_yields_partial_map(message in "[a-z ]{0,100}") {
            let p = pattern(vec![
                FieldRule {
                    name: "word".to_owned(),
                    regex: Some(r"([a-z]+)".to_owned()),
                    group: 1,
                    default: None,
                    required: false,
                },
                FieldRule {
                    name: "digits".to_owned(),
                    regex: Some(r"(\d+)".to_owned()),
                    group: 1,
                    default: None,
                    required: true,
                },
            ]);
            let result = extractor_for(&p).extract(&p, &message);
            prop_assert_eq!(
                result,
                Err(ExtractionFailure::MissingRequiredField("digits".to_owned()))
            );
        }

        #[test]
        fn extracted_fields_follow_rule_order(a in "[a-z]{1,10}", b in "[0-9]{1,10}") {
            let p = pattern(vec![
                FieldRule {
                    name: "num".to_owned(),
                    regex: Some(r"n=(\d+)".to_owned()),
                    group: 1,
                    default: None,
                    required: true,
                },
                FieldRule {
                    name: "word".to_owned(),
                    regex: Some(r"w=([a-z]+)".to_owned()),
                    group: 1,
                    default: None,
                    required: true,
                },
            ]);
            let message = format!("w={a} n={b}");
            let fields = extractor_for(&p).extract(&p, &message).unwrap();
            let names: Vec<_> = fields.iter().map(|(k, _)| k.to_owned()).collect();
            prop_assert_eq!(names, vec!["num".to_owned(), "word".to_owned()]);
            prop_assert_eq!(fields.get("word"), Some(a.as_str()));
            prop_assert_eq!(fields.get("num"), Some(b.as_str()));
        }

        #[test]
        fn arbitrary_message_does_not_panic(message in ".{0,500}") {
            let p = pattern(vec![FieldRule {
                name: "x".to_owned(),
                regex: Some(r"(\S+)\s+(\S+)?".to_owned()),
                group: 2,
                default: None,
                required: false,
            }]);
            let _ = extractor_for(&p).extract(&p, &message);
        }
    }
}
