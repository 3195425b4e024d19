//! 레코드 결과, 수집기 리포트, 실행 요약
//!
//! 레코드 처리 결과는 [`RecordOutcome`]으로 표현되고, 수집기 단위로
//! [`CollectorReport`]에 접혀(fold) 들어간 뒤 [`RunSummary`]로 합쳐집니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use logmirror_core::types::{CollectorId, DeviceId, LogRecordId};
use logmirror_parse_engine::ParseOutcome;

/// 레코드 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// 원시 로그 저장 후 파싱까지 진행됨
    Stored {
        log_record_id: LogRecordId,
        device: Option<DeviceId>,
        parse: ParseOutcome,
    },
    /// 장치 쿼터 초과로 건너뜀 (에러 아님)
    QuotaSkipped { device: DeviceId },
    /// 장치 게이트 또는 저장소 에러
    Failed {
        device: Option<DeviceId>,
        reason: String,
    },
}

impl RecordOutcome {
    /// 장치가 식별되었는지 여부
    pub fn touched_device(&self) -> bool {
        match self {
            Self::Stored { device, .. } | Self::Failed { device, .. } => device.is_some(),
            Self::QuotaSkipped { .. } => true,
        }
    }
}

/// 수집기 하나의 패스 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectorReport {
    pub collector_id: CollectorId,
    pub collector_name: String,
    /// 조회에 사용한 커서
    pub checkpoint_before: i64,
    /// 패스 후 커서
    pub checkpoint_after: i64,
    pub fetched: u64,
    pub devices_touched: u64,
    pub stored: u64,
    pub parsed: u64,
    pub system_actions: u64,
    pub unmatched: u64,
    pub rejected: u64,
    pub quota_skipped: u64,
    pub record_failures: u64,
    /// 체크포인트 저장 실패 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_error: Option<String>,
}

impl CollectorReport {
    pub fn new(collector_id: CollectorId, collector_name: &str, checkpoint: i64) -> Self {
        Self {
            collector_id,
            collector_name: collector_name.to_owned(),
            checkpoint_before: checkpoint,
            checkpoint_after: checkpoint,
            ..Self::default()
        }
    }

    /// 레코드 결과를 카운터에 반영합니다.
    pub fn record(&mut self, outcome: &RecordOutcome) {
        if outcome.touched_device() {
            self.devices_touched += 1;
        }
        match outcome {
            RecordOutcome::Stored { parse, .. } => {
                self.stored += 1;
                match parse {
                    ParseOutcome::Parsed { .. } => self.parsed += 1,
                    ParseOutcome::SystemAction { .. } => {
                        self.parsed += 1;
                        self.system_actions += 1;
                    }
                    ParseOutcome::Unmatched => self.unmatched += 1,
                    ParseOutcome::Rejected(_) => self.rejected += 1,
                }
            }
            RecordOutcome::QuotaSkipped { .. } => self.quota_skipped += 1,
            RecordOutcome::Failed { .. } => self.record_failures += 1,
        }
    }
}

impl<'a> Extend<&'a RecordOutcome> for CollectorReport {
    fn extend<I: IntoIterator<Item = &'a RecordOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.record(outcome);
        }
    }
}

/// 처리하지 못한 수집기
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorFailure {
    pub collector_id: CollectorId,
    pub collector_name: String,
    pub reason: String,
}

/// 한 번의 수집 실행 요약
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 조회에 성공한 수집기 리포트 (수집기 ID 순)
    pub collectors: Vec<CollectorReport>,
    /// 조회 또는 체크포인트에 실패한 수집기
    pub failures: Vec<CollectorFailure>,
}

impl RunSummary {
    /// 새 실행을 시작합니다.
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            collectors: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// 실행 종료 시각을 기록하고 리포트를 정렬합니다.
    pub fn finish(&mut self) {
        self.collectors.sort_by_key(|r| r.collector_id);
        self.failures.sort_by_key(|f| f.collector_id);
        self.finished_at = Some(Utc::now());
    }

    /// 수집기 리포트를 추가합니다. 체크포인트 실패는 수집기 실패로도 기록합니다.
    pub fn push_report(&mut self, report: CollectorReport) {
        if let Some(reason) = &report.checkpoint_error {
            self.failures.push(CollectorFailure {
                collector_id: report.collector_id,
                collector_name: report.collector_name.clone(),
                reason: reason.clone(),
            });
        }
        self.collectors.push(report);
    }

    pub fn push_failure(&mut self, collector_id: CollectorId, collector_name: &str, reason: String) {
        self.failures.push(CollectorFailure {
            collector_id,
            collector_name: collector_name.to_owned(),
            reason,
        });
    }

    fn sum(&self, field: impl Fn(&CollectorReport) -> u64) -> u64 {
        self.collectors.iter().map(field).sum()
    }

    pub fn fetched(&self) -> u64 {
        self.sum(|r| r.fetched)
    }

    pub fn devices_touched(&self) -> u64 {
        self.sum(|r| r.devices_touched)
    }

    pub fn stored(&self) -> u64 {
        self.sum(|r| r.stored)
    }

    /// 파싱 성공 수 (시스템 액션 포함)
    pub fn parsed(&self) -> u64 {
        self.sum(|r| r.parsed)
    }

    pub fn system_actions(&self) -> u64 {
        self.sum(|r| r.system_actions)
    }

    pub fn unmatched(&self) -> u64 {
        self.sum(|r| r.unmatched)
    }

    pub fn rejected(&self) -> u64 {
        self.sum(|r| r.rejected)
    }

    pub fn quota_skipped(&self) -> u64 {
        self.sum(|r| r.quota_skipped)
    }

    pub fn record_failures(&self) -> u64 {
        self.sum(|r| r.record_failures)
    }

    /// 실행 시간 (밀리초). 종료 전이면 0입니다.
    pub fn elapsed_ms(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use logmirror_parse_engine::RejectReason;

    use super::*;

    fn stored(parse: ParseOutcome, device: Option<DeviceId>) -> RecordOutcome {
        RecordOutcome::Stored {
            log_record_id: LogRecordId(1),
            device,
            parse,
        }
    }

    #[test]
    fn report_folds_outcomes() {
        let outcomes = [
            stored(ParseOutcome::Parsed { pattern_id: 4 }, Some(DeviceId(1))),
            stored(ParseOutcome::SystemAction { pattern_id: 3 }, Some(DeviceId(1))),
            stored(ParseOutcome::Unmatched, None),
            stored(
                ParseOutcome::Rejected(RejectReason::MissingRequiredField("username".into())),
                None,
            ),
            RecordOutcome::QuotaSkipped { device: DeviceId(2) },
            RecordOutcome::Failed {
                device: None,
                reason: "query failed".into(),
            },
        ];
        let mut report = CollectorReport::new(1, "nas", 10);
        report.extend(outcomes.iter());

        assert_eq!(report.devices_touched, 3);
        assert_eq!(report.stored, 4);
        assert_eq!(report.parsed, 2);
        assert_eq!(report.system_actions, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.quota_skipped, 1);
        assert_eq!(report.record_failures, 1);
    }

    #[test]
    fn summary_aggregates_reports_and_checkpoint_failures() {
        let mut summary = RunSummary::start();
        let mut a = CollectorReport::new(2, "b", 0);
        a.stored = 3;
        let mut b = CollectorReport::new(1, "a", 0);
        b.stored = 2;
        b.checkpoint_error = Some("disk full".into());
        summary.push_report(a);
        summary.push_report(b);
        summary.push_failure(5, "c", "HTTP 500".into());
        summary.finish();

        assert_eq!(summary.stored(), 5);
        assert_eq!(summary.collectors[0].collector_id, 1);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].collector_id, 1);
        assert!(summary.finished_at.is_some());
        assert!(summary.elapsed_ms() >= 0);
    }

    #[test]
    fn summary_serializes_to_json() {
        let mut summary = RunSummary::start();
        summary.push_report(CollectorReport::new(1, "a", 0));
        summary.finish();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["run_id"].is_string());
        assert_eq!(json["collectors"][0]["collector_name"], "a");
        assert!(json["collectors"][0].get("checkpoint_error").is_none());
    }
}
