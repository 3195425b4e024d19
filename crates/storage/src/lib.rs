//! # logmirror-storage
//!
//! `logmirror-core`의 저장소 trait 구현체입니다.
//!
//! - [`MemoryStore`]: 프로세스 내 저장소 (테스트, 드라이런)
//! - [`SqliteStore`]: `rusqlite` 기반 영속 저장소
//! - [`StoreBackend`]: 설정으로 둘 중 하나를 선택

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::StoreBackend;
pub use memory::{MemoryStore, SystemActionEntry};
pub use sqlite::SqliteStore;
