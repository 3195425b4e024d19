//! 메시지 패턴 데이터 타입
//!
//! YAML 패턴 파일에서 역직렬화되는 구조체들을 정의합니다.

use logmirror_core::types::PatternId;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseEngineError;

const MAX_PATTERN_NAME_LEN: usize = 256;

/// 메시지 패턴 -- 하나의 YAML 패턴 파일에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// id: 4
/// name: User Login
/// description: Synology user sign-in events
/// regex: 'User\s+\[(.+?)\]\s+from\s+\[(.+?)\]'
/// priority: 12
/// status: active
/// role: generic
/// fields:
///   - name: event_type
///     default: user_login
///     required: true
///   - name: username
///     regex: 'User\s+\[(.+?)\]'
///     required: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePattern {
    /// 패턴 고유 ID (파싱 결과의 pattern_id)
    pub id: PatternId,
    /// 패턴 이름
    pub name: String,
    /// 패턴 설명
    #[serde(default)]
    pub description: String,
    /// 메시지 분류용 정규식 (검색 의미론, 필요하면 `^`/`$`로 고정)
    pub regex: String,
    /// 우선순위 (높을수록 먼저 시도)
    #[serde(default)]
    pub priority: i32,
    /// 패턴 상태
    #[serde(default)]
    pub status: PatternStatus,
    /// 패턴 역할
    #[serde(default)]
    pub role: PatternRole,
    /// 필드 추출 규칙 (정의 순서대로 적용)
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl MessagePattern {
    /// 패턴 활성 여부
    pub fn is_active(&self) -> bool {
        self.status == PatternStatus::Active
    }

    /// 시스템 액션 패턴 여부
    pub fn is_system_action(&self) -> bool {
        self.role == PatternRole::SystemAction
    }

    /// 로그/에러에 표시할 패턴 식별자
    pub fn label(&self) -> String {
        format!("{}#{}", self.name, self.id)
    }

    /// 패턴의 구조적 유효성을 검증합니다.
    ///
    /// 이름, 정규식 컴파일 가능 여부, 필드 규칙을 확인합니다.
    pub fn validate(&self) -> Result<(), ParseEngineError> {
        if self.name.trim().is_empty() {
            return Err(ParseEngineError::PatternValidation {
                pattern: format!("#{}", self.id),
                reason: "pattern name must not be empty".to_owned(),
            });
        }

        if self.name.len() > MAX_PATTERN_NAME_LEN {
            return Err(self.invalid(format!(
                "pattern name must not exceed {MAX_PATTERN_NAME_LEN} characters"
            )));
        }

        if self.regex.is_empty() {
            return Err(self.invalid("pattern regex must not be empty"));
        }

        Regex::new(&self.regex).map_err(|e| self.invalid(format!("invalid pattern regex: {e}")))?;

        for (idx, rule) in self.fields.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(self.invalid(format!("fields[{idx}]: field name must not be empty")));
            }
            if let Some(regex) = rule.extraction_regex() {
                Regex::new(regex).map_err(|e| {
                    self.invalid(format!(
                        "fields[{idx}] '{}': invalid extraction regex: {e}",
                        rule.name
                    ))
                })?;
            } else if rule.default_value().is_none() && rule.required {
                return Err(self.invalid(format!(
                    "fields[{idx}] '{}': required field needs a regex or a default",
                    rule.name
                )));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> ParseEngineError {
        ParseEngineError::PatternValidation {
            pattern: self.label(),
            reason: reason.into(),
        }
    }
}

/// 패턴 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStatus {
    /// 활성 (기본값)
    #[default]
    Active,
    /// 비활성 (검증은 하지만 매칭하지 않음)
    Inactive,
}

/// 패턴 역할
///
/// 시스템 액션 패턴은 카탈로그에 최대 하나이며, 매칭 결과가
/// 시스템 액션 저장소에 먼저 기록됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternRole {
    /// 일반 패턴 (기본값)
    #[default]
    Generic,
    /// 시스템 액션 패턴
    SystemAction,
}

/// 필드 추출 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// 추출할 필드 이름
    pub name: String,
    /// 원본 메시지에 적용할 정규식 (없으면 기본값만 사용)
    #[serde(default)]
    pub regex: Option<String>,
    /// 캡처 그룹 번호
    #[serde(default = "default_group")]
    pub group: usize,
    /// 값을 얻지 못했을 때 사용할 기본값
    #[serde(default)]
    pub default: Option<String>,
    /// 필수 필드 여부
    #[serde(default)]
    pub required: bool,
}

fn default_group() -> usize {
    1
}

impl FieldRule {
    /// 비어 있지 않은 추출 정규식
    pub fn extraction_regex(&self) -> Option<&str> {
        self.regex.as_deref().filter(|r| !r.is_empty())
    }

    /// 비어 있지 않은 기본값
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref().filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> MessagePattern {
        MessagePattern {
            id: 1,
            name: "Test Pattern".to_owned(),
            description: String::new(),
            regex: r"^Test (\w+)$".to_owned(),
            priority: 0,
            status: PatternStatus::Active,
            role: PatternRole::Generic,
            fields: vec![FieldRule {
                name: "word".to_owned(),
                regex: Some(r"^Test (\w+)$".to_owned()),
                group: 1,
                default: None,
                required: true,
            }],
        }
    }

    #[test]
    fn valid_pattern_passes() {
        pattern().validate().unwrap();
    }

    #[test]
    fn empty_name_fails() {
        let mut p = pattern();
        p.name = "  ".to_owned();
        assert!(p.validate().is_err());
    }

    #[test]
    fn invalid_pattern_regex_fails() {
        let mut p = pattern();
        p.regex = "(unclosed".to_owned();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("invalid pattern regex"));
    }

    #[test]
    fn invalid_field_regex_fails() {
        let mut p = pattern();
        p.fields[0].regex = Some("[bad".to_owned());
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("fields[0]"));
    }

    #[test]
    fn required_field_without_source_fails() {
        let mut p = pattern();
        p.fields[0].regex = None;
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_strings_are_treated_as_absent() {
        let rule = FieldRule {
            name: "x".to_owned(),
            regex: Some(String::new()),
            group: 1,
            default: Some(String::new()),
            required: false,
        };
        assert!(rule.extraction_regex().is_none());
        assert!(rule.default_value().is_none());
    }

    #[test]
    fn yaml_defaults_applied() {
        let yaml = r#"
id: 9
name: Minimal
regex: 'hello'
fields:
  - name: event_type
    default: greeting
"#;
        let p: MessagePattern = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.priority, 0);
        assert_eq!(p.status, PatternStatus::Active);
        assert_eq!(p.role, PatternRole::Generic);
        assert_eq!(p.fields[0].group, 1);
        assert!(!p.fields[0].required);
    }

    #[test]
    fn yaml_role_system_action() {
        let yaml = "id: 3\nname: SYSTEM Message\nregex: '^SYSTEM:'\nrole: system_action\nstatus: inactive\n";
        let p: MessagePattern = serde_yaml::from_str(yaml).unwrap();
        assert!(p.is_system_action());
        assert!(!p.is_active());
    }
}
