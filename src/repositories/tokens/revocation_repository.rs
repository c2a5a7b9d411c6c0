use std::sync::Arc;
use crate::caching::KeyValueStore;
use crate::core::clock::Clock;
use crate::domain::models::token::token::{RevocationEntry, RevocationReason};
use crate::errors::StoreError;

/// 블랙리스트 키 접두사
pub const BLACKLIST_PREFIX: &str = "blacklist:";

/// 토큰 폐기 목록(블랙리스트) 저장소
///
/// 키-값 저장소에 `blacklist:{jti}` 형식으로 기록하며,
/// 각 항목은 원래 토큰의 `exp` 시각에 자동으로 만료됩니다.
///
/// - 폐기 기록은 멱등적입니다 (같은 `jti`를 다시 기록해도 결과는 동일)
/// - 이미 만료된 토큰은 기록하지 않습니다 (만료 자체로 거부되므로)
/// - 영구 저장소(Redis)와 로컬 폴백 저장소(인메모리) 모두 이 타입으로 감쌉니다
pub struct RevocationStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl RevocationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    fn key(jti: &str) -> String {
        format!("{}{}", BLACKLIST_PREFIX, jti)
    }

    /// 토큰 ID를 블랙리스트에 추가합니다.
    ///
    /// # Arguments
    ///
    /// * `jti` - 토큰 고유 식별자
    /// * `subject` - 토큰 소유자 (감사용)
    /// * `reason` - 폐기 이유
    /// * `expires_at` - 원래 토큰의 만료 시각 (Unix timestamp)
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 기록됨
    /// * `Ok(false)` - 이미 만료된 토큰이라 기록하지 않음
    pub async fn revoke(
        &self,
        jti: &str,
        subject: &str,
        reason: RevocationReason,
        expires_at: i64,
    ) -> Result<bool, StoreError> {
        let Some((value, ttl_seconds)) = self.encode_entry(jti, subject, reason, expires_at)? else {
            return Ok(false);
        };

        self.kv
            .set_with_expiry(&Self::key(jti), &value, ttl_seconds)
            .await?;

        log::debug!(
            "블랙리스트 추가 - jti: {}, 이유: {}, TTL: {}초",
            jti,
            reason.as_str(),
            ttl_seconds
        );
        Ok(true)
    }

    /// 항목이 없을 때만 토큰 ID를 블랙리스트에 추가합니다.
    ///
    /// 같은 `jti`에 대한 동시 호출 중 정확히 하나만 `Ok(true)`를 받습니다.
    /// 토큰 회전에서 한 리프레시 토큰으로 두 번 회전하는 것을 막는 데 사용합니다.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 이 호출이 기록함
    /// * `Ok(false)` - 이미 폐기된 토큰이거나, 이미 만료된 토큰
    pub async fn revoke_once(
        &self,
        jti: &str,
        subject: &str,
        reason: RevocationReason,
        expires_at: i64,
    ) -> Result<bool, StoreError> {
        let Some((value, ttl_seconds)) = self.encode_entry(jti, subject, reason, expires_at)? else {
            return Ok(false);
        };

        let created = self
            .kv
            .set_if_absent(&Self::key(jti), &value, ttl_seconds)
            .await?;

        if created {
            log::debug!("블랙리스트 선점 - jti: {}, 이유: {}", jti, reason.as_str());
        } else {
            log::warn!("이미 폐기된 토큰 - jti: {}", jti);
        }
        Ok(created)
    }

    /// 저장할 값과 TTL(초)을 만듭니다. 이미 만료된 토큰이면 `None`입니다.
    fn encode_entry(
        &self,
        jti: &str,
        subject: &str,
        reason: RevocationReason,
        expires_at: i64,
    ) -> Result<Option<(String, u64)>, StoreError> {
        let now = self.clock.timestamp();
        let ttl_seconds = expires_at - now;

        if ttl_seconds <= 0 {
            log::debug!("이미 만료된 토큰 - 블랙리스트 기록 생략 (jti: {})", jti);
            return Ok(None);
        }

        let entry = RevocationEntry {
            subject: subject.to_string(),
            reason,
            revoked_at: now,
            expires_at,
        };
        Ok(Some((serde_json::to_string(&entry)?, ttl_seconds as u64)))
    }

    /// 토큰 ID가 블랙리스트에 있는지 확인합니다.
    ///
    /// 저장소 TTL과 별개로 항목의 `expiresAt`이 지났으면 폐기되지 않은 것으로 봅니다.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        Ok(self.entry(jti).await?.is_some())
    }

    /// 블랙리스트 항목을 조회합니다.
    pub async fn entry(&self, jti: &str) -> Result<Option<RevocationEntry>, StoreError> {
        let Some(raw) = self.kv.get_string(&Self::key(jti)).await? else {
            return Ok(None);
        };

        let entry: RevocationEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                // 값을 해석할 수 없어도 키가 존재하면 폐기된 것으로 본다
                log::warn!("블랙리스트 항목 파싱 실패 - jti: {}, 에러: {}", jti, e);
                return Ok(Some(RevocationEntry {
                    subject: String::new(),
                    reason: RevocationReason::AdminRevoke,
                    revoked_at: 0,
                    expires_at: i64::MAX,
                }));
            }
        };

        if entry.expires_at <= self.clock.timestamp() {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// 만료된 항목을 제거하고 제거된 개수를 반환합니다.
    ///
    /// Redis는 TTL로 스스로 만료시키므로 0을 반환합니다.
    pub async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        self.kv.purge_expired().await
    }

    /// 저장소 연결 상태 확인
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.kv.ping().await
    }
}
