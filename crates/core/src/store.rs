//! 저장소 trait -- 수집 루프와 파싱 엔진이 의존하는 외부 협력자 계약
//!
//! 코어는 저장소 엔진 내부를 정의하지 않고, 아래 계약만 요구합니다.
//!
//! - 원시 로그 업서트는 `(collector_id, original_log_id)` 단위로 원자적이어야 합니다.
//! - 파싱 로그 업서트는 `log_record_id` 단위로 원자적이어야 합니다.
//! - 체크포인트는 수집기당 정수 커서 하나입니다.
//!
//! 모든 trait은 `Send + Sync + 'static`이므로 `Arc`로 감싸 여러 수집기
//! 태스크에서 공유할 수 있습니다.

use std::future::Future;

use crate::error::StorageError;
use crate::types::{
    CollectorCheckpoint, CollectorId, DeviceId, LogRecordId, ParsedLogRecord, RawLogRecord,
};

/// 원시 로그 저장소
pub trait RawLogStore: Send + Sync + 'static {
    /// 원시 로그를 자연 키로 업서트하고 행 참조를 반환합니다.
    ///
    /// 같은 키로 다시 호출하면 기존 행의 내용을 갱신하고 같은 참조를 반환합니다.
    fn upsert_raw(
        &self,
        record: &RawLogRecord,
    ) -> impl Future<Output = Result<LogRecordId, StorageError>> + Send;
}

/// 일반 파싱 로그 저장소
pub trait ParsedLogStore: Send + Sync + 'static {
    /// 파싱 결과를 `log_record_id` 기준으로 업서트합니다.
    fn upsert_parsed(
        &self,
        record: &ParsedLogRecord,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// 시스템 액션 전용 저장소
pub trait SystemActionSink: Send + Sync + 'static {
    /// 시스템 액션 설명을 기록합니다.
    ///
    /// `Err`는 기록 실패이며, 이 경우 파싱 엔진은 일반 저장소로 미러링하지 않습니다.
    fn save_system_action(
        &self,
        log_record_id: LogRecordId,
        collector_id: CollectorId,
        description: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// 장치 등록 및 쿼터 게이트
pub trait DeviceGate: Send + Sync + 'static {
    /// 송신 장치를 등록(또는 갱신)합니다.
    ///
    /// 장치를 식별할 수 없으면 `None`을 반환하며, 이 경우 쿼터 검사를 하지 않습니다.
    fn register_device(
        &self,
        collector_id: CollectorId,
        hostname: &str,
        port: u16,
    ) -> impl Future<Output = Result<Option<DeviceId>, StorageError>> + Send;

    /// 장치가 로그를 더 보낼 수 있는지 확인합니다.
    ///
    /// `false`는 에러가 아니라 의도된 백프레셔 신호입니다.
    fn check_log_quota(
        &self,
        collector_id: CollectorId,
        port: u16,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

/// 수집기 체크포인트 저장소
pub trait CheckpointStore: Send + Sync + 'static {
    /// 저장된 체크포인트를 읽습니다. 한 번도 저장되지 않았으면 `None`입니다.
    fn load_checkpoint(
        &self,
        collector_id: CollectorId,
    ) -> impl Future<Output = Result<Option<i64>, StorageError>> + Send;

    /// 체크포인트를 기록합니다.
    fn save_checkpoint(
        &self,
        checkpoint: CollectorCheckpoint,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// 수집 루프가 필요로 하는 모든 저장소 계약의 묶음
///
/// 개별 trait을 모두 구현한 타입에는 자동으로 구현됩니다.
pub trait MirrorStore:
    RawLogStore + ParsedLogStore + SystemActionSink + DeviceGate + CheckpointStore
{
}

impl<T> MirrorStore for T where
    T: RawLogStore + ParsedLogStore + SystemActionSink + DeviceGate + CheckpointStore
{
}
