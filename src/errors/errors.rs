//! 애플리케이션 전역에서 사용하는 에러 시스템
//!
//! 에러는 세 계층으로 분류됩니다.
//!
//! - **설정 에러** ([`ConfigError`]) - 비밀키 누락/오설정. 시작 단계에서 치명적
//! - **토큰 검증 에러** ([`TokenError`]) - 요청 단위로 복구 가능, 호출자에게 보고 및 로깅
//! - **인프라 에러** ([`StoreError`]) - 블랙리스트 저장소 장애. 서킷 가드의 폴백 정책으로 처리
//!
//! 서비스 계층은 이들을 [`AuthError`]로 묶어 반환하고, HTTP 계층은 [`AppError`]로
//! 변환하여 상태 코드에 매핑합니다. 인증 실패는 종류와 무관하게 항상 동일한
//! 일반 메시지로 응답합니다 (만료/폐기/위조를 구분하는 오라클 방지).
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use crate::errors::{AppError, AuthError};
//!
//! async fn me(service: &TokenLifecycleService, token: &str) -> Result<TokenClaims, AppError> {
//!     let claims = service.validate_access_token(token).await?;
//!     Ok(claims)
//! }
//! ```

use thiserror::Error;
use crate::domain::models::token::token::TokenType;

/// 토큰 단위 검증 에러
///
/// 각 종류는 서로 구분되는 에러로 보고되어, 호출자가
/// "만료됨(리프레시 후 재시도)"과 "폐기/위조(재로그인 강제)"를 구분할 수 있습니다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// 서명 불일치
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// `exp`가 지났음
    #[error("token has expired")]
    Expired,

    /// `nbf` 이전에 사용됨
    #[error("token is not valid yet")]
    NotYetValid,

    /// `iat`가 허용 오차를 넘어 미래임
    #[error("token was issued in the future")]
    IssuedInFuture,

    /// 작업에 필요한 토큰 종류와 다름
    #[error("wrong token type: expected {expected}, got {actual}")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },

    /// 필수 클레임 누락
    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),

    /// 허용 목록(HS256) 이외의 알고리즘
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// 서명 키를 확인할 수 없음
    #[error("signing secret unavailable: {0}")]
    SecretUnavailable(String),

    /// JWT 구조 자체가 잘못됨 (세그먼트, base64, JSON)
    #[error("malformed token: {0}")]
    Malformed(String),

    /// `iss` 불일치
    #[error("token issuer is invalid")]
    InvalidIssuer,

    /// `aud` 불일치
    #[error("token audience is invalid")]
    InvalidAudience,

    /// 블랙리스트에 등록된 토큰
    #[error("token has been revoked")]
    Revoked,
}

impl TokenError {
    /// 로그/모니터링용 짧은 식별자
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired => "expired",
            TokenError::NotYetValid => "not_yet_valid",
            TokenError::IssuedInFuture => "issued_in_future",
            TokenError::WrongType { .. } => "wrong_type",
            TokenError::MissingClaim(_) => "missing_claim",
            TokenError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            TokenError::SecretUnavailable(_) => "secret_unavailable",
            TokenError::Malformed(_) => "malformed",
            TokenError::InvalidIssuer => "invalid_issuer",
            TokenError::InvalidAudience => "invalid_audience",
            TokenError::Revoked => "revoked",
        }
    }

    /// 요청 단위가 아닌 설정 문제인지 여부
    pub fn is_configuration(&self) -> bool {
        matches!(self, TokenError::SecretUnavailable(_))
    }
}

/// 키-값 저장소 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 연결 또는 명령 실패
    #[error("store connection error: {0}")]
    Connection(String),

    /// 저장된 값의 직렬화/역직렬화 실패
    #[error("store serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Connection(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// 설정 에러 (시작 단계에서 치명적)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("JWT_SECRET and JWT_REFRESH_SECRET must differ")]
    SecretsNotDistinct,
}

/// 토큰 생명주기 서비스 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 토큰 검증/발급 에러
    #[error(transparent)]
    Token(#[from] TokenError),

    /// 폐기 기록을 영구 저장소에 쓸 수 없음 (로그아웃/회전 실패)
    #[error("revocation store unavailable: {0}")]
    RevocationUnavailable(String),
}

impl AuthError {
    /// 토큰 에러 종류 (있는 경우)
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            AuthError::Token(e) => Some(e),
            AuthError::RevocationUnavailable(_) => None,
        }
    }
}

/// HTTP 계층 에러 타입
///
/// 자동으로 HTTP 응답으로 변환되어 클라이언트에게 전달됩니다.
#[derive(Error, Debug)]
pub enum AppError {
    /// 입력값 검증 에러 (400 Bad Request)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 인증 실패 에러 (401 Unauthorized)
    ///
    /// 내부 사유는 로그에만 남고, 응답 본문은 항상 일반 메시지입니다.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// 권한 부족 에러 (403 Forbidden)
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// 블랙리스트 저장소 사용 불가 (503 Service Unavailable)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 설정 에러 (500 Internal Server Error)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// 인증 실패 시 클라이언트에게 노출되는 유일한 메시지
pub const AUTHENTICATION_FAILED: &str = "authentication failed";

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Token(TokenError::SecretUnavailable(name)) => {
                AppError::ConfigurationError(format!("secret unavailable: {}", name))
            }
            AuthError::Token(kind) => AppError::AuthenticationError(kind.code().to_string()),
            AuthError::RevocationUnavailable(reason) => AppError::ServiceUnavailable(reason),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::ConfigurationError(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// HTTP 에러 응답을 생성합니다.
    ///
    /// 인증 실패와 서버 내부 에러는 상세 사유를 숨깁니다.
    fn error_response(&self) -> actix_web::HttpResponse {
        let message = match self {
            AppError::AuthenticationError(_) => AUTHENTICATION_FAILED.to_string(),
            AppError::ConfigurationError(_) => "internal server error".to_string(),
            AppError::ServiceUnavailable(_) => "service temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        actix_web::HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": message
            }))
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    #[test]
    fn test_validation_error_response() {
        let error = AppError::ValidationError("refresh_token is required".to_string());
        assert_eq!(error.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_token_errors_map_to_unauthorized() {
        for kind in [
            TokenError::Expired,
            TokenError::Revoked,
            TokenError::SignatureInvalid,
            TokenError::UnsupportedAlgorithm("none".to_string()),
        ] {
            let error: AppError = AuthError::Token(kind).into();
            assert_eq!(error.error_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_secret_unavailable_maps_to_internal_error() {
        let error: AppError =
            AuthError::Token(TokenError::SecretUnavailable("JWT_SECRET".to_string())).into();
        assert_eq!(error.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_revocation_unavailable_maps_to_service_unavailable() {
        let error: AppError = AuthError::RevocationUnavailable("circuit open".to_string()).into();
        assert_eq!(error.error_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_authorization_error_response() {
        let error = AppError::AuthorizationError("Insufficient permissions".to_string());
        assert_eq!(error.error_response().status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_authentication_error_body_is_generic() {
        let expired: AppError = AuthError::Token(TokenError::Expired).into();
        let revoked: AppError = AuthError::Token(TokenError::Revoked).into();

        let expired_body = actix_web::body::to_bytes(expired.error_response().into_body())
            .await
            .unwrap();
        let revoked_body = actix_web::body::to_bytes(revoked.error_response().into_body())
            .await
            .unwrap();

        assert_eq!(expired_body, revoked_body);
        assert!(String::from_utf8_lossy(&expired_body).contains(AUTHENTICATION_FAILED));
    }

    #[test]
    fn test_token_error_codes_are_distinct() {
        assert_ne!(TokenError::Expired.code(), TokenError::Revoked.code());
        assert_eq!(TokenError::MissingClaim("jti").code(), "missing_claim");
        assert!(TokenError::SecretUnavailable("x".into()).is_configuration());
        assert!(!TokenError::Expired.is_configuration());
    }
}
