//! 토큰 생명주기 서비스
//!
//! 코덱, 서명 키 저장소, 블랙리스트, 서킷 브레이커를 조합하여
//! 발급/검증/폐기/회전을 제공합니다.
//!
//! ## 검증 순서
//!
//! 서명과 클레임 검증이 끝난 토큰에 대해서만 블랙리스트를 조회합니다.
//! 위조 토큰으로 저장소 부하를 유발할 수 없습니다.
//!
//! ## 저장소 장애 시 동작
//!
//! - **조회**: 로컬 캐시를 먼저 확인하고, 영구 저장소 조회가 실패하면 [`FallbackPolicy`]를 따릅니다.
//! - **기록**: 폴백 없이 실패합니다 (`AuthError::RevocationUnavailable`). 로컬 캐시에는 항상 기록하므로
//!   이 인스턴스는 장애 중에도 자신이 폐기한 토큰을 거부합니다.
//!
//! [`FallbackPolicy`]: crate::resilience::FallbackPolicy

use std::sync::Arc;
use serde_json::{Map, Value};
use crate::caching::{InMemoryStore, KeyValueStore};
use crate::config::{JwtConfig, RevocationSettings};
use crate::core::clock::Clock;
use crate::domain::models::token::token::{RevocationReason, TokenClaims, TokenPair, TokenType};
use crate::errors::{AuthError, TokenError};
use crate::repositories::tokens::RevocationStore;
use crate::resilience::{CircuitGuard, CircuitState, CircuitStats};
use crate::services::auth::secret_store::{
    verify_secrets, SecretName, SecretStore, SigningSecret, StaticSecretStore,
};
use crate::services::auth::token_codec::TokenCodec;
use crate::services::security::{SecurityEvent, SecurityEventLog};
use crate::utils::fingerprint::token_fingerprint;

/// 액세스/리프레시 토큰 생명주기 관리 서비스
pub struct TokenLifecycleService {
    codec: TokenCodec,
    secrets: Arc<dyn SecretStore>,
    /// 영구 블랙리스트 (Redis)
    primary: RevocationStore,
    /// 인스턴스 로컬 블랙리스트 (인메모리)
    local: RevocationStore,
    circuit: Arc<CircuitGuard>,
    events: Arc<dyn SecurityEventLog>,
    clock: Arc<dyn Clock>,
}

impl TokenLifecycleService {
    pub fn new(
        codec: TokenCodec,
        secrets: Arc<dyn SecretStore>,
        primary: RevocationStore,
        local: RevocationStore,
        circuit: Arc<CircuitGuard>,
        events: Arc<dyn SecurityEventLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            secrets,
            primary,
            local,
            circuit,
            events,
            clock,
        }
    }

    /// 설정값으로 구성 요소를 조립합니다.
    ///
    /// 서명 키는 [`JwtConfig`]에서, 로컬 폴백 캐시는 `revocation.cache_capacity` 크기의
    /// [`InMemoryStore`]로 생성합니다.
    pub fn from_config(
        config: &JwtConfig,
        revocation: &RevocationSettings,
        primary: Arc<dyn KeyValueStore>,
        circuit: Arc<CircuitGuard>,
        events: Arc<dyn SecurityEventLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let local_cache = Arc::new(InMemoryStore::new(revocation.cache_capacity, clock.clone()));

        Self::new(
            TokenCodec::new(config, clock.clone()),
            Arc::new(StaticSecretStore::from_config(config)),
            RevocationStore::new(primary, clock.clone()),
            RevocationStore::new(local_cache, clock.clone()),
            circuit,
            events,
            clock,
        )
    }

    /// 서명 키 설정을 확인합니다. 시작 단계에서 한 번 호출합니다.
    pub async fn ensure_ready(&self) -> Result<(), AuthError> {
        verify_secrets(self.secrets.as_ref()).await?;
        Ok(())
    }

    /// 인증된 주체에게 액세스/리프레시 토큰 쌍을 발급합니다.
    ///
    /// # Arguments
    ///
    /// * `subject` - 사용자 ID
    /// * `claims` - 두 토큰에 함께 담을 애플리케이션 클레임 (`roles` 등)
    ///
    /// # Errors
    ///
    /// * `TokenError::SecretUnavailable` - 서명 키 없음
    /// * `TokenError::MissingClaim("sub")` - 빈 주체
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mut claims = serde_json::Map::new();
    /// claims.insert("roles".into(), serde_json::json!(["seller"]));
    /// let pair = service.issue_token_pair("user-1", &claims).await?;
    /// ```
    pub async fn issue_token_pair(&self, subject: &str, claims: &Map<String, Value>) -> Result<TokenPair, AuthError> {
        let (pair, access_jti, refresh_jti) = self.sign_pair(subject, claims).await?;

        self.events.record(SecurityEvent::TokenIssued {
            subject: subject.to_string(),
            access_jti,
            refresh_jti,
        });
        Ok(pair)
    }

    /// 액세스 토큰을 검증합니다.
    ///
    /// # Errors
    ///
    /// * `TokenError::*` - 서명/클레임 검증 실패
    /// * `TokenError::Revoked` - 블랙리스트에 있음 (또는 fail-closed 폴백)
    pub async fn validate_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate(token, TokenType::Access).await
    }

    /// 리프레시 토큰을 검증합니다.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate(token, TokenType::Refresh).await
    }

    /// 토큰을 폐기합니다 (로그아웃, 관리자 무효화).
    ///
    /// 시간 검증 없이 서명/발급자/대상만 확인한 뒤 블랙리스트에 기록합니다.
    /// 이미 만료된 토큰은 기록하지 않고 성공으로 처리합니다.
    ///
    /// # Errors
    ///
    /// * `TokenError::*` - 서명/구조 검증 실패
    /// * `AuthError::RevocationUnavailable` - 영구 저장소에 기록하지 못함
    pub async fn revoke_token(&self, token: &str, reason: RevocationReason) -> Result<(), AuthError> {
        let token_type = self.codec.peek_token_type(token)?;
        let secret = self.signing_secret(token_type).await?;

        let claims = match self.codec.decode_ignoring_time(token, &secret) {
            Ok(claims) => claims,
            Err(e) => {
                self.record_failure(token, token_type, &e, None);
                return Err(e.into());
            }
        };

        self.revoke_claims(&claims, reason).await
    }

    /// 리프레시 토큰을 회전합니다.
    ///
    /// 이전 리프레시 토큰을 먼저 폐기하고, 폐기가 기록된 경우에만 새 쌍을 발급합니다.
    /// 새 쌍은 이전 토큰의 애플리케이션 클레임을 그대로 이어받습니다.
    ///
    /// 폐기는 "없을 때만 기록"으로 선점하므로 같은 리프레시 토큰으로 동시에 회전하면
    /// 인스턴스와 무관하게 정확히 하나만 성공하고 나머지는 `Revoked`를 받습니다.
    ///
    /// # Errors
    ///
    /// * `TokenError::*` - 이전 리프레시 토큰 검증 실패 (이미 회전된 토큰은 `Revoked`)
    /// * `AuthError::RevocationUnavailable` - 이전 토큰을 폐기하지 못해 회전 중단
    pub async fn rotate_token_pair(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let old = self.validate_refresh_token(old_refresh_token).await?;

        self.claim_for_rotation(old_refresh_token, &old).await?;

        let (pair, _access_jti, refresh_jti) = self.sign_pair(&old.sub, &old.extra).await?;

        self.events.record(SecurityEvent::RotationCompleted {
            subject: old.sub.clone(),
            old_jti: old.jti.clone(),
            new_refresh_jti: refresh_jti,
        });
        Ok(pair)
    }

    /// 만료된 블랙리스트 항목을 정리하고 제거된 개수를 반환합니다.
    ///
    /// 영구 저장소 정리가 실패해도 로컬 캐시 정리 결과는 반환합니다.
    pub async fn cleanup_expired(&self) -> usize {
        let local = self.local.cleanup_expired().await.unwrap_or_else(|e| {
            log::warn!("로컬 블랙리스트 정리 실패: {}", e);
            0
        });

        let primary = match self.circuit.call(|| self.primary.cleanup_expired()).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("블랙리스트 정리 실패: {}", e);
                0
            }
        };

        let total = local + primary;
        if total > 0 {
            log::info!("만료된 블랙리스트 항목 {}건 정리", total);
        }
        total
    }

    /// 현재 서킷 상태 (헬스 체크용)
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit.state()
    }

    pub fn circuit_stats(&self) -> CircuitStats {
        self.circuit.stats()
    }

    /// 영구 블랙리스트 저장소에 서킷을 거쳐 연결을 확인합니다.
    ///
    /// 서킷이 열려 있으면 저장소를 호출하지 않고 `false`를 반환합니다.
    pub async fn revocation_store_reachable(&self) -> bool {
        match self.circuit.call(|| self.primary.ping()).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("블랙리스트 저장소 연결 확인 실패: {}", e);
                false
            }
        }
    }

    async fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, AuthError> {
        let secret = self.signing_secret(expected).await?;

        let claims = match self.codec.verify(token, expected, &secret) {
            Ok(claims) => claims,
            Err(TokenError::SignatureInvalid) => {
                let e = self.classify_signature_failure(token, expected).await;
                self.record_failure(token, expected, &e, None);
                return Err(e.into());
            }
            Err(e) => {
                self.record_failure(token, expected, &e, None);
                return Err(e.into());
            }
        };

        if self.is_revoked(&claims.jti).await {
            self.record_failure(token, expected, &TokenError::Revoked, Some(&claims.sub));
            return Err(TokenError::Revoked.into());
        }

        Ok(claims)
    }

    /// 서명 불일치가 다른 종류의 정상 토큰 때문인지 확인합니다.
    ///
    /// 다른 종류의 키로 서명이 확인될 때만 `WrongType`이고, 그 외에는 `SignatureInvalid`입니다.
    async fn classify_signature_failure(&self, token: &str, expected: TokenType) -> TokenError {
        let actual = match self.codec.peek_token_type(token) {
            Ok(actual) if actual != expected => actual,
            _ => return TokenError::SignatureInvalid,
        };

        let Ok(secret) = self.signing_secret(actual).await else {
            return TokenError::SignatureInvalid;
        };

        match self.codec.decode_ignoring_time(token, &secret) {
            Ok(_) => TokenError::WrongType { expected, actual },
            Err(_) => TokenError::SignatureInvalid,
        }
    }

    /// 로컬 캐시 → 영구 저장소(서킷 보호) 순으로 폐기 여부를 확인합니다.
    async fn is_revoked(&self, jti: &str) -> bool {
        match self.local.is_revoked(jti).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => log::warn!("로컬 블랙리스트 조회 실패: {}", e),
        }

        match self.circuit.call(|| self.primary.is_revoked(jti)).await {
            Ok(revoked) => revoked,
            Err(e) => {
                let policy = self.circuit.fallback();
                let revoked = policy.treat_as_revoked();
                log::warn!(
                    "블랙리스트 조회 불가 ({}) - 폴백 정책 {} 적용 (폐기로 간주: {})",
                    e,
                    policy.as_str(),
                    revoked
                );
                revoked
            }
        }
    }

    async fn revoke_claims(&self, claims: &TokenClaims, reason: RevocationReason) -> Result<(), AuthError> {
        if claims.exp <= self.clock.timestamp() {
            log::debug!("이미 만료된 토큰 폐기 요청 - 기록 생략 (jti: {})", claims.jti);
            return Ok(());
        }

        if let Err(e) = self.local.revoke(&claims.jti, &claims.sub, reason, claims.exp).await {
            log::warn!("로컬 블랙리스트 기록 실패: {}", e);
        }

        let persisted = self
            .circuit
            .call(|| self.primary.revoke(&claims.jti, &claims.sub, reason, claims.exp))
            .await;

        self.events.record(SecurityEvent::TokenRevoked {
            subject: claims.sub.clone(),
            jti: claims.jti.clone(),
            reason,
            persisted: persisted.is_ok(),
        });

        match persisted {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("블랙리스트 기록 실패 - jti: {}, 이유: {}, 에러: {}", claims.jti, reason.as_str(), e);
                Err(AuthError::RevocationUnavailable(e.to_string()))
            }
        }
    }

    /// 회전할 리프레시 토큰의 블랙리스트 항목을 선점합니다.
    ///
    /// 로컬 캐시가 같은 인스턴스 안의 경쟁을, 영구 저장소가 인스턴스 간 경쟁을 가립니다.
    async fn claim_for_rotation(&self, token: &str, claims: &TokenClaims) -> Result<(), AuthError> {
        let reason = RevocationReason::Rotation;

        if claims.exp <= self.clock.timestamp() {
            return Err(TokenError::Expired.into());
        }

        match self.local.revoke_once(&claims.jti, &claims.sub, reason, claims.exp).await {
            Ok(true) => {}
            Ok(false) => return Err(self.lost_rotation(token, claims)),
            Err(e) => log::warn!("로컬 블랙리스트 기록 실패: {}", e),
        }

        let claimed = self
            .circuit
            .call(|| self.primary.revoke_once(&claims.jti, &claims.sub, reason, claims.exp))
            .await;

        match claimed {
            Ok(true) => {
                self.events.record(SecurityEvent::TokenRevoked {
                    subject: claims.sub.clone(),
                    jti: claims.jti.clone(),
                    reason,
                    persisted: true,
                });
                Ok(())
            }
            Ok(false) => Err(self.lost_rotation(token, claims)),
            Err(e) => {
                self.events.record(SecurityEvent::TokenRevoked {
                    subject: claims.sub.clone(),
                    jti: claims.jti.clone(),
                    reason,
                    persisted: false,
                });
                log::error!("블랙리스트 기록 실패 - jti: {}, 이유: {}, 에러: {}", claims.jti, reason.as_str(), e);
                Err(AuthError::RevocationUnavailable(e.to_string()))
            }
        }
    }

    /// 다른 요청이 먼저 회전한 경우
    fn lost_rotation(&self, token: &str, claims: &TokenClaims) -> AuthError {
        let e = TokenError::Revoked;
        self.record_failure(token, TokenType::Refresh, &e, Some(&claims.sub));
        e.into()
    }

    async fn sign_pair(
        &self,
        subject: &str,
        claims: &Map<String, Value>,
    ) -> Result<(TokenPair, String, String), AuthError> {
        let access_secret = self.signing_secret(TokenType::Access).await?;
        let refresh_secret = self.signing_secret(TokenType::Refresh).await?;

        let access = self.codec.issue(subject, claims, TokenType::Access, &access_secret)?;
        let refresh = self.codec.issue(subject, claims, TokenType::Refresh, &refresh_secret)?;

        let pair = TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.ttl(TokenType::Access).num_seconds(),
            refresh_expires_in: self.codec.ttl(TokenType::Refresh).num_seconds(),
        };
        Ok((pair, access.claims.jti, refresh.claims.jti))
    }

    async fn signing_secret(&self, token_type: TokenType) -> Result<SigningSecret, AuthError> {
        self.secrets
            .secret(SecretName::for_token_type(token_type))
            .await
            .map_err(|e| {
                log::error!("서명 키 조회 실패: {}", e);
                AuthError::from(e)
            })
    }

    fn record_failure(&self, token: &str, token_type: TokenType, error: &TokenError, subject: Option<&str>) {
        self.events.record(SecurityEvent::ValidationFailed {
            reason: error.code(),
            token_type,
            fingerprint: token_fingerprint(token),
            subject: subject.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use crate::caching::{InMemoryStore, KeyValueStore};
    use crate::config::{CircuitBreakerSettings, JwtConfig};
    use crate::core::clock::ManualClock;
    use crate::errors::StoreError;
    use crate::resilience::FallbackPolicy;
    use crate::services::auth::secret_store::StaticSecretStore;
    use crate::services::security::MemorySecurityEventLog;

    const NOW: i64 = 1_700_000_000;

    /// 장애를 켜고 끌 수 있는 저장소
    struct FlakyStore {
        inner: InMemoryStore,
        down: AtomicBool,
        reads: AtomicUsize,
    }

    impl FlakyStore {
        fn new(clock: Arc<ManualClock>) -> Self {
            Self {
                inner: InMemoryStore::new(100, clock),
                down: AtomicBool::new(false),
                reads: AtomicUsize::new(0),
            }
        }

        fn set_down(&self, down: bool) {
            self.down.store(down, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::Connection("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
            self.check()?;
            self.inner.set_with_expiry(key, value, seconds).await
        }

        async fn set_if_absent(&self, key: &str, value: &str, seconds: u64) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.set_if_absent(key, value, seconds).await
        }

        async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.get_string(key).await
        }

        async fn purge_expired(&self) -> Result<usize, StoreError> {
            self.check()?;
            self.inner.purge_expired().await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.check()
        }
    }

    /// 매 호출마다 실행 순서를 양보해 동시 요청이 서로 끼어들게 하는 저장소
    struct YieldingStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl KeyValueStore for YieldingStore {
        async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.inner.set_with_expiry(key, value, seconds).await
        }

        async fn set_if_absent(&self, key: &str, value: &str, seconds: u64) -> Result<bool, StoreError> {
            tokio::task::yield_now().await;
            self.inner.set_if_absent(key, value, seconds).await
        }

        async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
            tokio::task::yield_now().await;
            self.inner.get_string(key).await
        }

        async fn purge_expired(&self) -> Result<usize, StoreError> {
            self.inner.purge_expired().await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<FlakyStore>,
        events: Arc<MemorySecurityEventLog>,
        service: TokenLifecycleService,
    }

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-for-tests-0123456789".to_string(),
            refresh_secret: "refresh-secret-for-tests-0123456789".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            issuer: "marketplace-api".to_string(),
            audience: "marketplace-client".to_string(),
            clock_skew_seconds: 30,
        }
    }

    fn fixture(fallback: FallbackPolicy) -> Fixture {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let store = Arc::new(FlakyStore::new(clock.clone()));
        let events = Arc::new(MemorySecurityEventLog::new());
        let config = jwt_config();

        let circuit = Arc::new(CircuitGuard::new(
            CircuitBreakerSettings {
                timeout: StdDuration::from_secs(1),
                error_threshold: 0.5,
                reset_timeout: StdDuration::from_secs(30),
                rolling_window: StdDuration::from_secs(10),
                volume_threshold: 5,
                fallback,
            },
            clock.clone(),
        ));

        let service = TokenLifecycleService::new(
            TokenCodec::new(&config, clock.clone()),
            Arc::new(StaticSecretStore::from_config(&config)),
            RevocationStore::new(store.clone(), clock.clone()),
            RevocationStore::new(Arc::new(InMemoryStore::new(100, clock.clone())), clock.clone()),
            circuit,
            events.clone(),
            clock.clone(),
        );

        Fixture {
            clock,
            store,
            events,
            service,
        }
    }

    fn roles(names: &[&str]) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("roles".to_string(), json!(names));
        claims
    }

    fn token_error(result: Result<TokenClaims, AuthError>) -> TokenError {
        match result {
            Err(AuthError::Token(e)) => e,
            other => panic!("expected token error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_issue_pair_and_validate() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &roles(&["seller"])).await.unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 3600);

        let access = f.service.validate_access_token(&pair.access_token).await.unwrap();
        let refresh = f.service.validate_refresh_token(&pair.refresh_token).await.unwrap();
        assert_eq!(access.sub, "u1");
        assert_eq!(access.roles(), vec!["seller".to_string()]);
        assert_ne!(access.jti, refresh.jti);
        assert_eq!(f.events.count("token_issued"), 1);
    }

    #[tokio::test]
    async fn test_tokens_rejected_for_wrong_operation() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();

        let err = token_error(f.service.validate_access_token(&pair.refresh_token).await);
        assert_eq!(
            err,
            TokenError::WrongType {
                expected: TokenType::Access,
                actual: TokenType::Refresh,
            }
        );
        let err = token_error(f.service.validate_refresh_token(&pair.access_token).await);
        assert_eq!(
            err,
            TokenError::WrongType {
                expected: TokenType::Refresh,
                actual: TokenType::Access,
            }
        );
        assert_eq!(f.events.count("validation_failed"), 2);
    }

    #[tokio::test]
    async fn test_forged_token_of_other_type_stays_signature_invalid() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        // 리프레시 토큰 본문 + 액세스 토큰 서명: 어느 키로도 서명이 맞지 않음
        let parts: Vec<&str> = pair.refresh_token.split('.').collect();
        let access_signature = pair.access_token.rsplit('.').next().unwrap();
        let forged = format!("{}.{}.{}", parts[0], parts[1], access_signature);

        let err = token_error(f.service.validate_access_token(&forged).await);
        assert_eq!(err, TokenError::SignatureInvalid);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();

        f.service.revoke_token(&pair.access_token, RevocationReason::Logout).await.unwrap();
        f.service.revoke_token(&pair.access_token, RevocationReason::Logout).await.unwrap();

        let err = token_error(f.service.validate_access_token(&pair.access_token).await);
        assert_eq!(err, TokenError::Revoked);
        assert_eq!(f.store.inner.len(), 1);
    }

    #[tokio::test]
    async fn test_revoking_expired_token_is_noop() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.clock.advance(Duration::minutes(16));

        f.service.revoke_token(&pair.access_token, RevocationReason::Logout).await.unwrap();
        assert!(f.store.inner.is_empty());
        assert_eq!(f.events.count("token_revoked"), 0);
    }

    #[tokio::test]
    async fn test_revoke_rejects_forged_token() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        // 액세스 토큰 본문 + 다른 토큰의 서명
        let parts: Vec<&str> = pair.access_token.split('.').collect();
        let other_signature = pair.refresh_token.rsplit('.').next().unwrap();
        let forged = format!("{}.{}.{}", parts[0], parts[1], other_signature);

        let result = f.service.revoke_token(&forged, RevocationReason::Logout).await;
        assert!(matches!(result, Err(AuthError::Token(TokenError::SignatureInvalid))));
        assert!(f.store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_rotation_invalidates_predecessor() {
        let f = fixture(FallbackPolicy::FailClosed);
        let first = f.service.issue_token_pair("u1", &roles(&["admin"])).await.unwrap();

        let second = f.service.rotate_token_pair(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = token_error(f.service.validate_refresh_token(&first.refresh_token).await);
        assert_eq!(err, TokenError::Revoked);

        let reused = f.service.rotate_token_pair(&first.refresh_token).await;
        assert!(matches!(reused, Err(AuthError::Token(TokenError::Revoked))));

        let claims = f.service.validate_refresh_token(&second.refresh_token).await.unwrap();
        assert_eq!(claims.roles(), vec!["admin".to_string()]);
        assert_eq!(f.events.count("rotation_completed"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_rotation_of_same_token_has_one_winner() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let events = Arc::new(MemorySecurityEventLog::new());
        let config = jwt_config();
        let primary = Arc::new(YieldingStore {
            inner: InMemoryStore::new(100, clock.clone()),
        });
        let service = TokenLifecycleService::new(
            TokenCodec::new(&config, clock.clone()),
            Arc::new(StaticSecretStore::from_config(&config)),
            RevocationStore::new(primary, clock.clone()),
            RevocationStore::new(Arc::new(InMemoryStore::new(100, clock.clone())), clock.clone()),
            Arc::new(CircuitGuard::new(CircuitBreakerSettings::default(), clock.clone())),
            events.clone(),
            clock.clone(),
        );
        let pair = service.issue_token_pair("u1", &Map::new()).await.unwrap();

        let (a, b) = tokio::join!(
            service.rotate_token_pair(&pair.refresh_token),
            service.rotate_token_pair(&pair.refresh_token),
        );

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(AuthError::Token(TokenError::Revoked))));
        assert_eq!(events.count("rotation_completed"), 1);
    }

    #[tokio::test]
    async fn test_rotation_fails_when_revocation_cannot_be_persisted() {
        let f = fixture(FallbackPolicy::FailOpen);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.store.set_down(true);

        let result = f.service.rotate_token_pair(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::RevocationUnavailable(_))));
        assert_eq!(f.events.count("rotation_completed"), 0);
        assert_eq!(f.events.count("token_issued"), 1);
    }

    #[tokio::test]
    async fn test_fail_closed_rejects_when_store_unavailable() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.store.set_down(true);

        let err = token_error(f.service.validate_access_token(&pair.access_token).await);
        assert_eq!(err, TokenError::Revoked);
    }

    #[tokio::test]
    async fn test_fail_open_accepts_when_store_unavailable() {
        let f = fixture(FallbackPolicy::FailOpen);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.store.set_down(true);

        assert!(f.service.validate_access_token(&pair.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_cache_honors_own_revocations_during_outage() {
        let f = fixture(FallbackPolicy::FailOpen);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.store.set_down(true);

        let result = f.service.revoke_token(&pair.access_token, RevocationReason::Logout).await;
        assert!(matches!(result, Err(AuthError::RevocationUnavailable(_))));

        let err = token_error(f.service.validate_access_token(&pair.access_token).await);
        assert_eq!(err, TokenError::Revoked);
    }

    #[tokio::test]
    async fn test_circuit_opens_and_short_circuits_lookups() {
        let f = fixture(FallbackPolicy::FailOpen);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.store.set_down(true);

        for _ in 0..5 {
            f.service.validate_access_token(&pair.access_token).await.unwrap();
        }
        assert_eq!(f.service.circuit_state(), CircuitState::Open);

        let reads = f.store.reads.load(Ordering::SeqCst);
        f.service.validate_access_token(&pair.access_token).await.unwrap();
        assert_eq!(f.store.reads.load(Ordering::SeqCst), reads);

        // 쿨다운 후 프로브 성공
        f.store.set_down(false);
        f.clock.advance(Duration::seconds(30));
        f.service.validate_access_token(&pair.access_token).await.unwrap();
        assert_eq!(f.service.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_signature_checked_before_revocation_lookup() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        let tampered = format!("{}x", pair.access_token);

        assert!(f.service.validate_access_token(&tampered).await.is_err());
        assert_eq!(f.store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_recorded_with_fingerprint_only() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.clock.advance(Duration::minutes(15));

        let _ = f.service.validate_access_token(&pair.access_token).await;

        let events = f.events.events();
        let failure = events
            .iter()
            .find(|e| e.kind() == "validation_failed")
            .unwrap();
        match failure {
            SecurityEvent::ValidationFailed { reason, fingerprint, .. } => {
                assert_eq!(*reason, "expired");
                assert_eq!(fingerprint, &token_fingerprint(&pair.access_token));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!failure.to_string().contains(&pair.access_token));
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let config = jwt_config();
        let service = TokenLifecycleService::new(
            TokenCodec::new(&config, clock.clone()),
            Arc::new(StaticSecretStore::new(Some(SigningSecret::new("only-access")), None)),
            RevocationStore::new(Arc::new(InMemoryStore::new(10, clock.clone())), clock.clone()),
            RevocationStore::new(Arc::new(InMemoryStore::new(10, clock.clone())), clock.clone()),
            Arc::new(CircuitGuard::new(CircuitBreakerSettings::default(), clock.clone())),
            Arc::new(MemorySecurityEventLog::new()),
            clock,
        );

        assert!(service.ensure_ready().await.is_err());
        let result = service.issue_token_pair("u1", &Map::new()).await;
        match result {
            Err(AuthError::Token(e)) => assert!(e.is_configuration()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps_both_stores() {
        let f = fixture(FallbackPolicy::FailClosed);
        let pair = f.service.issue_token_pair("u1", &Map::new()).await.unwrap();
        f.service.revoke_token(&pair.access_token, RevocationReason::Logout).await.unwrap();

        assert_eq!(f.service.cleanup_expired().await, 0);

        f.clock.advance(Duration::minutes(15));
        // 영구 저장소 1건 + 로컬 캐시 1건
        assert_eq!(f.service.cleanup_expired().await, 2);
    }
}
