//! # logmirror-ingest
//!
//! 원격 syslog 수집기에서 로그를 가져와 장치 쿼터를 확인하고, 원시 로그를
//! 저장한 뒤 파싱 엔진에 넘기는 수집 루프입니다.
//!
//! ```text
//! CollectorClient ──▶ DeviceGate ──▶ RawLogStore ──▶ ParseEngine
//!        │                                                 │
//!        └──────────── CheckpointStore ◀── (배치 완료) ◀───┘
//! ```
//!
//! # 사용 예시
//!
//! ```ignore
//! let ingestor = Ingestor::builder()
//!     .client(HttpCollectorClient::new(Duration::from_secs(30))?)
//!     .store(Arc::new(store))
//!     .engine(Arc::new(engine))
//!     .max_concurrent_collectors(4)
//!     .build()?;
//!
//! let summary = ingestor.run_pass(&config.collectors).await;
//! ```

pub mod client;
pub mod error;
pub mod ingestor;
pub mod summary;
pub mod wire;

pub use client::{CollectorClient, FetchBatch, HttpCollectorClient};
pub use error::IngestError;
pub use ingestor::{Ingestor, IngestorBuilder};
pub use summary::{CollectorFailure, CollectorReport, RecordOutcome, RunSummary};
pub use wire::{RemoteRecord, UndecodableRecord};
