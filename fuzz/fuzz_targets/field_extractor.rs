#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logmirror_parse_engine::{
    FieldRule, MessagePattern, ParseEngine, PatternRole, PatternStatus, RuleCatalog,
};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 분류 정규식
    regex: String,
    /// 필드 규칙 (최대 8개로 제한)
    fields: Vec<FuzzField>,
    system_action: bool,
    /// 분석할 메시지
    message: String,
}

#[derive(Arbitrary, Debug)]
struct FuzzField {
    name: String,
    regex: Option<String>,
    group: u8,
    default: Option<String>,
    required: bool,
}

fuzz_target!(|input: FuzzInput| {
    let fields: Vec<FieldRule> = input
        .fields
        .into_iter()
        .take(8)
        .map(|f| FieldRule {
            name: f.name,
            regex: f.regex,
            group: usize::from(f.group % 4),
            default: f.default,
            required: f.required,
        })
        .collect();

    let pattern = MessagePattern {
        id: 1,
        name: "fuzz pattern".to_owned(),
        description: String::new(),
        regex: input.regex,
        priority: 0,
        status: PatternStatus::Active,
        role: if input.system_action {
            PatternRole::SystemAction
        } else {
            PatternRole::Generic
        },
        fields,
    };

    // 검증이나 컴파일 실패는 정상 경로
    let Ok(catalog) = RuleCatalog::from_patterns(vec![pattern]) else {
        return;
    };
    let Ok(engine) = ParseEngine::new(Arc::new(catalog)) else {
        return;
    };

    // 매칭/추출은 크래시 없이 Ok/Err 반환해야 함
    let _ = engine.analyze(&input.message);
});
