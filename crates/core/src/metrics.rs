//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logmirror_`
//! - 모듈명: `ingest_`, `parse_`, `catalog_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logmirror_core::metrics::INGEST_RECORDS_STORED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파싱 결과 레이블 키 (parsed, system_action, unmatched, rejected)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── Ingest 메트릭 ────────────────────────────────────────────────

/// Ingest: 원격 수집기에서 가져온 레코드 수 (counter)
pub const INGEST_RECORDS_FETCHED_TOTAL: &str = "logmirror_ingest_records_fetched_total";

/// Ingest: 원시 로그 저장소에 업서트된 레코드 수 (counter)
pub const INGEST_RECORDS_STORED_TOTAL: &str = "logmirror_ingest_records_stored_total";

/// Ingest: 장치 쿼터 초과로 건너뛴 레코드 수 (counter)
pub const INGEST_QUOTA_SKIPPED_TOTAL: &str = "logmirror_ingest_quota_skipped_total";

/// Ingest: 처리 중 에러가 난 레코드 수 (counter)
pub const INGEST_RECORD_FAILURES_TOTAL: &str = "logmirror_ingest_record_failures_total";

/// Ingest: 수집기 조회 실패 수 (counter)
pub const INGEST_FETCH_FAILURES_TOTAL: &str = "logmirror_ingest_fetch_failures_total";

/// Ingest: 수집 패스 하나의 소요 시간 (histogram, 초)
pub const INGEST_PASS_DURATION_SECONDS: &str = "logmirror_ingest_pass_duration_seconds";

// ─── Parse Engine 메트릭 ───────────────────────────────────────────

/// Parse: 결과별 파싱 수 (counter, label: outcome)
pub const PARSE_OUTCOMES_TOTAL: &str = "logmirror_parse_outcomes_total";

/// Catalog: 로드된 활성 패턴 수 (gauge)
pub const CATALOG_PATTERNS_LOADED: &str = "logmirror_catalog_patterns_loaded";

// ─── Daemon 메트릭 ────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logmirror_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, label: version)
pub const DAEMON_BUILD_INFO: &str = "logmirror_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
/// recorder가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Ingest
    describe_counter!(
        INGEST_RECORDS_FETCHED_TOTAL,
        "Total number of records fetched from remote collectors"
    );
    describe_counter!(
        INGEST_RECORDS_STORED_TOTAL,
        "Total number of raw records upserted into the mirror store"
    );
    describe_counter!(
        INGEST_QUOTA_SKIPPED_TOTAL,
        "Records skipped because the sending device exceeded its quota"
    );
    describe_counter!(
        INGEST_RECORD_FAILURES_TOTAL,
        "Records that failed during store or parse"
    );
    describe_counter!(
        INGEST_FETCH_FAILURES_TOTAL,
        "Collector fetches that failed (transport, status or payload)"
    );
    describe_histogram!(
        INGEST_PASS_DURATION_SECONDS,
        "Duration of a full ingestion pass in seconds"
    );

    // Parse Engine
    describe_counter!(
        PARSE_OUTCOMES_TOTAL,
        "Parse results by outcome (parsed, system_action, unmatched, rejected)"
    );
    describe_gauge!(
        CATALOG_PATTERNS_LOADED,
        "Number of active message patterns in the catalog"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "logmirror daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "logmirror build information (always 1, labels carry version)"
    );
}
