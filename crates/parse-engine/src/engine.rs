//! 파싱 엔진 -- 매칭 + 추출 + 저장소 라우팅
//!
//! [`ParseEngine`]은 [`PatternMatcher`]와 [`FieldExtractor`]를 조합하고,
//! 결과를 일반 파싱 로그 저장소 또는 시스템 액션 저장소로 보냅니다.
//!
//! # 라우팅 규칙
//! - 매칭 없음: [`ParseOutcome::Unmatched`]
//! - 필수 필드 누락: [`RejectReason::MissingRequiredField`]
//! - 시스템 액션 패턴: `action_description`을 시스템 액션 저장소에 먼저 기록하고,
//!   성공했을 때만 같은 필드를 일반 저장소에 미러링합니다.
//! - 그 외: 일반 저장소에 업서트

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use logmirror_core::metrics::{LABEL_OUTCOME, PARSE_OUTCOMES_TOTAL};
use logmirror_core::store::{ParsedLogStore, SystemActionSink};
use logmirror_core::types::{CollectorId, ExtractedFields, LogRecordId, ParsedLogRecord, PatternId};

use crate::catalog::{MessagePattern, PatternRole, RuleCatalog};
use crate::error::{ExtractionFailure, ParseEngineError};
use crate::extractor::FieldExtractor;
use crate::matcher::PatternMatcher;

/// 시스템 액션 설명 필드 이름
pub const ACTION_DESCRIPTION_FIELD: &str = "action_description";

/// 파싱 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 일반 저장소에 기록됨
    Parsed { pattern_id: PatternId },
    /// 시스템 액션 저장소와 일반 저장소에 기록됨
    SystemAction { pattern_id: PatternId },
    /// 매칭되는 패턴 없음
    Unmatched,
    /// 매칭되었지만 기록하지 못함
    Rejected(RejectReason),
}

impl ParseOutcome {
    /// 메트릭 레이블 값
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parsed { .. } => "parsed",
            Self::SystemAction { .. } => "system_action",
            Self::Unmatched => "unmatched",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// 거부 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 필수 필드 누락
    MissingRequiredField(String),
    /// 시스템 액션 패턴인데 `action_description`이 없음
    MissingActionDescription,
    /// 필수 필드 외의 추출 실패
    Extraction(String),
    /// 저장소 기록 실패
    SinkFailed(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequiredField(field) => write!(f, "missing required field '{field}'"),
            Self::MissingActionDescription => write!(f, "missing {ACTION_DESCRIPTION_FIELD}"),
            Self::Extraction(reason) => write!(f, "extraction failed: {reason}"),
            Self::SinkFailed(reason) => write!(f, "sink failed: {reason}"),
        }
    }
}

/// 저장소 없이 수행한 매칭 + 추출 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub pattern_id: PatternId,
    pub pattern_name: String,
    pub system_action: bool,
    pub fields: ExtractedFields,
}

/// 파싱 엔진
pub struct ParseEngine {
    matcher: PatternMatcher,
    extractor: FieldExtractor,
}

impl ParseEngine {
    /// 카탈로그로 엔진을 생성합니다. 모든 정규식을 이 시점에 컴파일합니다.
    pub fn new(catalog: Arc<RuleCatalog>) -> Result<Self, ParseEngineError> {
        let extractor = FieldExtractor::for_catalog(&catalog)?;
        let matcher = PatternMatcher::new(catalog)?;
        Ok(Self { matcher, extractor })
    }

    /// 엔진이 사용하는 카탈로그
    pub fn catalog(&self) -> &RuleCatalog {
        self.matcher.catalog()
    }

    /// 저장소에 쓰지 않고 매칭과 추출만 수행합니다.
    ///
    /// 매칭되는 패턴이 없으면 `Ok(None)`입니다.
    pub fn analyze(&self, message: &str) -> Result<Option<Analysis>, ExtractionFailure> {
        let Some(pattern) = self.matcher.find_match(message) else {
            return Ok(None);
        };
        let fields = self.extractor.extract(pattern, message)?;
        Ok(Some(Analysis {
            pattern_id: pattern.id,
            pattern_name: pattern.name.clone(),
            system_action: pattern.is_system_action(),
            fields,
        }))
    }

    /// 메시지를 파싱하여 결과를 저장소로 보냅니다.
    ///
    /// 결과는 항상 [`ParseOutcome`]으로 돌려주며 에러를 전파하지 않습니다.
    pub async fn parse<P, S>(
        &self,
        message: &str,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        parsed_store: &P,
        action_sink: &S,
    ) -> ParseOutcome
    where
        P: ParsedLogStore,
        S: SystemActionSink,
    {
        let outcome = self
            .route(message, log_record_id, collector_id, parsed_store, action_sink)
            .await;
        counter!(PARSE_OUTCOMES_TOTAL, LABEL_OUTCOME => outcome.label()).increment(1);
        outcome
    }

    async fn route<P, S>(
        &self,
        message: &str,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        parsed_store: &P,
        action_sink: &S,
    ) -> ParseOutcome
    where
        P: ParsedLogStore,
        S: SystemActionSink,
    {
        let Some(pattern) = self.matcher.find_match(message) else {
            return ParseOutcome::Unmatched;
        };

        let fields = match self.extractor.extract(pattern, message) {
            Ok(fields) => fields,
            Err(ExtractionFailure::MissingRequiredField(field)) => {
                tracing::debug!(
                    record_id = %log_record_id,
                    pattern = %pattern.label(),
                    field = %field,
                    "record rejected: missing required field"
                );
                return ParseOutcome::Rejected(RejectReason::MissingRequiredField(field));
            }
            Err(e) => {
                tracing::warn!(record_id = %log_record_id, error = %e, "extraction failed");
                return ParseOutcome::Rejected(RejectReason::Extraction(e.to_string()));
            }
        };

        match pattern.role {
            PatternRole::SystemAction => {
                self.route_system_action(
                    pattern,
                    &fields,
                    log_record_id,
                    collector_id,
                    parsed_store,
                    action_sink,
                )
                .await
            }
            PatternRole::Generic => {
                match store_parsed(parsed_store, log_record_id, pattern.id, &fields).await {
                    Ok(()) => ParseOutcome::Parsed {
                        pattern_id: pattern.id,
                    },
                    Err(reason) => ParseOutcome::Rejected(reason),
                }
            }
        }
    }

    async fn route_system_action<P, S>(
        &self,
        pattern: &MessagePattern,
        fields: &ExtractedFields,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        parsed_store: &P,
        action_sink: &S,
    ) -> ParseOutcome
    where
        P: ParsedLogStore,
        S: SystemActionSink,
    {
        let Some(description) = fields.get(ACTION_DESCRIPTION_FIELD) else {
            tracing::debug!(
                record_id = %log_record_id,
                pattern = %pattern.label(),
                "system action without description"
            );
            return ParseOutcome::Rejected(RejectReason::MissingActionDescription);
        };

        if let Err(e) = action_sink
            .save_system_action(log_record_id, collector_id, description)
            .await
        {
            tracing::warn!(
                record_id = %log_record_id,
                collector = collector_id,
                error = %e,
                "failed to save system action"
            );
            return ParseOutcome::Rejected(RejectReason::SinkFailed(e.to_string()));
        }

        // 미러 대상은 역할로 찾은 시스템 액션 패턴 자신의 ID
        let mirror_id = self
            .catalog()
            .system_action_pattern()
            .map_or(pattern.id, |p| p.id);

        match store_parsed(parsed_store, log_record_id, mirror_id, fields).await {
            Ok(()) => ParseOutcome::SystemAction {
                pattern_id: mirror_id,
            },
            Err(reason) => ParseOutcome::Rejected(reason),
        }
    }
}

async fn store_parsed<P: ParsedLogStore>(
    store: &P,
    log_record_id: LogRecordId,
    pattern_id: PatternId,
    fields: &ExtractedFields,
) -> Result<(), RejectReason> {
    let record = ParsedLogRecord::from_fields(log_record_id, pattern_id, fields);
    store.upsert_parsed(&record).await.map_err(|e| {
        tracing::warn!(
            record_id = %log_record_id,
            pattern_id,
            error = %e,
            "failed to store parsed log"
        );
        RejectReason::SinkFailed(e.to_string())
    })
}
