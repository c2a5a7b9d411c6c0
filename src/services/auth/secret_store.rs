//! 서명 키 저장소
//!
//! JWT 서명 키를 이름으로 조회합니다. 키를 찾을 수 없으면 기본값으로 대체하지 않고
//! `TokenError::SecretUnavailable`로 실패합니다 (fail closed).
//!
//! 조회는 비동기입니다. 외부 비밀 관리 서비스를 사용하는 구현체는 네트워크 왕복이 발생할 수 있습니다.

use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use crate::config::JwtConfig;
use crate::domain::models::token::token::TokenType;
use crate::errors::TokenError;

/// 서명 키 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    /// 액세스 토큰 서명 키 (`JWT_SECRET`)
    AccessTokenKey,
    /// 리프레시 토큰 서명 키 (`JWT_REFRESH_SECRET`)
    RefreshTokenKey,
}

impl SecretName {
    pub fn for_token_type(token_type: TokenType) -> Self {
        match token_type {
            TokenType::Access => SecretName::AccessTokenKey,
            TokenType::Refresh => SecretName::RefreshTokenKey,
        }
    }

    /// 설정 키 이름
    pub fn config_key(&self) -> &'static str {
        match self {
            SecretName::AccessTokenKey => "JWT_SECRET",
            SecretName::RefreshTokenKey => "JWT_REFRESH_SECRET",
        }
    }
}

/// 서명 키 바이트
///
/// `Debug` 출력에서 내용을 숨깁니다.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// 이름으로 서명 키를 조회하는 저장소
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// # Errors
    ///
    /// * `TokenError::SecretUnavailable` - 키가 없거나 비어 있음
    async fn secret(&self, name: SecretName) -> Result<SigningSecret, TokenError>;
}

/// 시작 시 로드된 설정값을 보관하는 기본 구현
///
/// 컴포지션 루트(`main`)가 [`JwtConfig`]로부터 생성합니다.
pub struct StaticSecretStore {
    access: Option<SigningSecret>,
    refresh: Option<SigningSecret>,
}

impl StaticSecretStore {
    pub fn new(access: Option<SigningSecret>, refresh: Option<SigningSecret>) -> Self {
        Self {
            access: access.filter(|s| !s.is_empty()),
            refresh: refresh.filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            Some(SigningSecret::new(&config.access_secret)),
            Some(SigningSecret::new(&config.refresh_secret)),
        )
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn secret(&self, name: SecretName) -> Result<SigningSecret, TokenError> {
        let secret = match name {
            SecretName::AccessTokenKey => self.access.as_ref(),
            SecretName::RefreshTokenKey => self.refresh.as_ref(),
        };

        secret
            .cloned()
            .ok_or_else(|| TokenError::SecretUnavailable(name.config_key().to_string()))
    }
}

/// 두 서명 키가 모두 조회 가능하고 서로 다른지 확인합니다.
///
/// 시작 단계에서 호출하여 설정 문제를 요청 처리 전에 드러냅니다.
pub async fn verify_secrets(store: &dyn SecretStore) -> Result<(), TokenError> {
    let access = store.secret(SecretName::AccessTokenKey).await?;
    let refresh = store.secret(SecretName::RefreshTokenKey).await?;

    if access == refresh {
        return Err(TokenError::SecretUnavailable(
            "JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
        ));
    }
    Ok(())
}
