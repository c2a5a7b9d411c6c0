//! # 인메모리 키-값 저장소
//!
//! 만료 시각으로 인덱싱된 용량 제한 맵입니다. 두 가지 용도로 사용됩니다.
//!
//! - **로컬 폴백 블랙리스트**: Redis 장애 중에도 이 인스턴스에서 폐기한 토큰은 거부
//! - **테스트용 대체 구현**: Redis 없이 블랙리스트 동작 검증
//!
//! 만료 판단은 주입된 [`Clock`]을 기준으로 하므로 실제 타이머 없이 테스트할 수 있습니다.
//! 만료된 항목은 조회 시 보이지 않으며, [`InMemoryStore::evict_expired`]로 물리적으로 제거됩니다.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use crate::caching::KeyValueStore;
use crate::core::clock::Clock;
use crate::errors::StoreError;

struct Entry {
    value: String,
    expires_at_ms: i64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// (만료 시각, 키) 순으로 정렬된 인덱스
    expiry_index: BTreeSet<(i64, String)>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.expiry_index.remove(&(entry.expires_at_ms, key.to_string()));
        Some(entry)
    }

    fn evict_expired(&mut self, now_ms: i64) -> usize {
        let expired: Vec<(i64, String)> = self
            .expiry_index
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= now_ms)
            .cloned()
            .collect();

        for (_, key) in &expired {
            self.entries.remove(key);
        }
        for item in &expired {
            self.expiry_index.remove(item);
        }
        expired.len()
    }

    /// 가장 먼저 만료될 항목을 제거합니다.
    fn evict_soonest(&mut self) -> Option<String> {
        let (_, key) = self.expiry_index.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// 용량 제한 인메모리 저장소
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            clock,
        }
    }

    /// 만료된 항목을 제거하고 제거된 개수를 반환합니다.
    pub fn evict_expired(&self) -> usize {
        let now_ms = self.clock.timestamp_millis();
        self.inner.lock().evict_expired(now_ms)
    }

    /// 만료 여부와 무관한 저장 항목 수
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: &str, value: &str, seconds: u64) {
        let now_ms = self.clock.timestamp_millis();
        let mut inner = self.inner.lock();
        self.place(&mut inner, now_ms, key, value, seconds);
    }

    /// 만료되지 않은 값이 없을 때만 저장합니다. 확인과 저장은 같은 잠금 안에서 이루어집니다.
    fn insert_if_absent(&self, key: &str, value: &str, seconds: u64) -> bool {
        let now_ms = self.clock.timestamp_millis();
        let mut inner = self.inner.lock();

        let live = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at_ms > now_ms);
        if live {
            return false;
        }

        self.place(&mut inner, now_ms, key, value, seconds);
        true
    }

    fn place(&self, inner: &mut Inner, now_ms: i64, key: &str, value: &str, seconds: u64) {
        let ttl_ms = i64::try_from(seconds.max(1)).unwrap_or(i64::MAX / 2_000).saturating_mul(1000);
        let expires_at_ms = now_ms.saturating_add(ttl_ms);

        inner.remove(key);

        if inner.entries.len() >= self.capacity {
            inner.evict_expired(now_ms);
        }
        if inner.entries.len() >= self.capacity {
            if let Some(evicted) = inner.evict_soonest() {
                log::warn!("인메모리 저장소 용량 초과 ({}개) - 가장 먼저 만료될 항목 제거: {}", self.capacity, evicted);
            }
        }

        inner.expiry_index.insert((expires_at_ms, key.to_string()));
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let now_ms = self.clock.timestamp_millis();
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| entry.expires_at_ms > now_ms)
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
        self.insert(key, value, seconds);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, seconds: u64) -> Result<bool, StoreError> {
        Ok(self.insert_if_absent(key, value, seconds))
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lookup(key))
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(self.evict_expired())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
