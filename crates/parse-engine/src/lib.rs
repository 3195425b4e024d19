//! # logmirror-parse-engine
//!
//! 데이터 기반 메시지 분류 및 필드 추출 엔진입니다.
//!
//! 패턴과 필드 규칙은 코드가 아니라 YAML 데이터로 정의되며, 시작 시
//! [`CatalogLoader`]로 한 번 로드되어 [`ParseEngine`]에 공유됩니다.
//!
//! ```text
//! message ──▶ PatternMatcher ──▶ FieldExtractor ──▶ ParsedLogStore
//!                                        │
//!                                        └─(system_action)─▶ SystemActionSink ──▶ ParsedLogStore
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod matcher;

pub use catalog::{
    CatalogLoader, FieldRule, MessagePattern, PatternRole, PatternStatus, RuleCatalog,
};
pub use engine::{ACTION_DESCRIPTION_FIELD, Analysis, ParseEngine, ParseOutcome, RejectReason};
pub use error::{ExtractionFailure, ParseEngineError};
pub use extractor::FieldExtractor;
pub use matcher::PatternMatcher;
