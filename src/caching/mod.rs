//! 캐싱 계층 모듈
//!
//! 블랙리스트 저장소가 사용하는 키-값 저장소 추상화와 구현체를 제공합니다.
//!
//! # 주요 기능
//!
//! - [`KeyValueStore`] - TTL 기반 키-값 저장소 trait (서킷 가드가 감싸는 연결 계층)
//! - [`redis::RedisClient`] - Redis 구현 (네이티브 TTL, 멀티플렉싱 연결 공유)
//! - [`memory::InMemoryStore`] - 용량 제한이 있는 시간 인덱스 맵 (로컬 폴백 캐시, 테스트용 대체 구현)
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use crate::caching::{KeyValueStore, redis::RedisClient};
//!
//! let cache = RedisClient::connect("redis://localhost:6379").await?;
//! cache.set_with_expiry("blacklist:abc", "{}", 900).await?;
//! let value = cache.get_string("blacklist:abc").await?;
//! ```
//!
//! # 환경 설정
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379  # 기본값
//! ```

pub mod redis;
pub mod memory;

use async_trait::async_trait;
use crate::errors::StoreError;

pub use memory::InMemoryStore;
pub use self::redis::RedisClient;

/// TTL 기반 키-값 저장소
///
/// 모든 호출은 네트워크 왕복이 될 수 있는 중단 지점입니다.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 만료 시간과 함께 문자열 값을 저장합니다. 기존 값은 덮어씁니다.
    async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError>;

    /// 키가 없을 때만 값을 저장합니다 (원자적).
    ///
    /// 이 호출이 값을 만들었으면 `true`, 만료되지 않은 값이 이미 있으면 `false`입니다.
    async fn set_if_absent(&self, key: &str, value: &str, seconds: u64) -> Result<bool, StoreError>;

    /// 만료되지 않은 값을 조회합니다.
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 만료된 항목을 물리적으로 제거하고 제거된 개수를 반환합니다.
    ///
    /// 네이티브 TTL을 가진 저장소에서는 아무 작업도 하지 않고 0을 반환합니다.
    async fn purge_expired(&self) -> Result<usize, StoreError>;

    /// 저장소 연결 상태를 확인합니다.
    async fn ping(&self) -> Result<(), StoreError>;
}
