//! JWT 서명/검증 코덱
//!
//! HMAC-SHA256(HS256) 서명만 허용합니다. `alg: none`이나 비대칭 알고리즘 헤더는
//! 서명 검증 전에 원본 헤더에서 직접 확인하여 거부합니다 (다운그레이드 공격 방지).
//!
//! 만료/사용 가능/발급 시각 검증은 `jsonwebtoken`의 시스템 시계 대신
//! 주입된 [`Clock`]을 기준으로 수행합니다.

use std::collections::HashSet;
use std::sync::Arc;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::{Map, Value};
use crate::config::JwtConfig;
use crate::core::clock::Clock;
use crate::domain::models::token::token::{TokenClaims, TokenType};
use crate::errors::TokenError;
use crate::services::auth::secret_store::SigningSecret;

/// 허용되는 유일한 서명 알고리즘
pub const ALLOWED_ALGORITHM: &str = "HS256";

/// `jti` 무작위 바이트 수 (256비트)
const TOKEN_ID_BYTES: usize = 32;

/// 애플리케이션 클레임이 덮어쓸 수 없는 예약 클레임
const RESERVED_CLAIMS: [&str; 8] = ["sub", "type", "iat", "nbf", "exp", "jti", "iss", "aud"];

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

/// 검증 전 단계의 클레임 (모든 표준 클레임이 선택 사항)
#[derive(Deserialize)]
struct RawClaims {
    sub: Option<String>,
    #[serde(rename = "type")]
    token_type: Option<String>,
    iat: Option<i64>,
    nbf: Option<i64>,
    exp: Option<i64>,
    jti: Option<String>,
    iss: Option<String>,
    aud: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// 발급된 토큰과 그 클레임
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// 검증 강도
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyMode {
    /// 모든 검증 (요청 인증)
    Strict(TokenType),
    /// 알고리즘/서명/발급자/대상만 검증, 시간 검증 생략 (폐기용)
    IgnoreTime,
}

/// 256비트 무작위 토큰 식별자를 생성합니다.
pub fn generate_token_id() -> String {
    let mut bytes = [0u8; TOKEN_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct TokenCodec {
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock_skew_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            clock_skew_seconds: config.clock_skew_seconds,
            clock,
        }
    }

    /// 토큰 종류별 수명
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// 토큰을 발급합니다.
    ///
    /// `extra`의 애플리케이션 클레임은 그대로 포함되며, 예약 클레임과 같은 이름의 키는 무시됩니다.
    ///
    /// # Errors
    ///
    /// * `TokenError::MissingClaim("sub")` - 빈 주체
    /// * `TokenError::SecretUnavailable` - 빈 서명 키
    pub fn issue(
        &self,
        subject: &str,
        extra: &Map<String, Value>,
        token_type: TokenType,
        secret: &SigningSecret,
    ) -> Result<IssuedToken, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::MissingClaim("sub"));
        }
        if secret.is_empty() {
            return Err(TokenError::SecretUnavailable(token_type.to_string()));
        }

        let now = self.clock.timestamp();
        let mut application_claims = extra.clone();
        for reserved in RESERVED_CLAIMS {
            if application_claims.remove(reserved).is_some() {
                log::debug!("예약 클레임 '{}'은(는) 애플리케이션 클레임으로 덮어쓸 수 없습니다", reserved);
            }
        }

        let claims = TokenClaims {
            sub: subject.to_string(),
            token_type,
            iat: now,
            nbf: Some(now),
            exp: now + self.ttl(token_type).num_seconds(),
            jti: generate_token_id(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            extra: application_claims,
        };

        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let token = encode(&header, &claims, &encoding_key)
            .map_err(|e| TokenError::Malformed(format!("토큰 서명 실패: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// 토큰의 서명과 모든 클레임을 검증합니다.
    ///
    /// 검증 순서: 알고리즘 → 서명 → 발급자 → 대상 → 필수 클레임 → 종류 → 만료/사용 가능/발급 시각
    pub fn verify(
        &self,
        token: &str,
        expected_type: TokenType,
        secret: &SigningSecret,
    ) -> Result<TokenClaims, TokenError> {
        self.verify_with(token, secret, VerifyMode::Strict(expected_type))
    }

    /// 시간 관련 클레임을 제외하고 검증합니다.
    ///
    /// 만료 직전/직후의 토큰도 로그아웃 시 폐기할 수 있어야 하므로 `revoke_token`에서 사용합니다.
    /// 위조된 토큰이 블랙리스트를 오염시키지 않도록 서명은 여전히 검증합니다.
    pub fn decode_ignoring_time(&self, token: &str, secret: &SigningSecret) -> Result<TokenClaims, TokenError> {
        self.verify_with(token, secret, VerifyMode::IgnoreTime)
    }

    /// 서명 검증 없이 페이로드의 `type` 클레임만 읽습니다.
    ///
    /// 어떤 서명 키로 검증할지 결정하는 용도로만 사용해야 합니다.
    pub fn peek_token_type(&self, token: &str) -> Result<TokenType, TokenError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| TokenError::Malformed("토큰 세그먼트가 부족합니다".to_string()))?;
        let raw: RawClaims = decode_segment(payload)?;
        let type_name = raw.token_type.ok_or(TokenError::MissingClaim("type"))?;
        parse_token_type(&type_name)
    }

    fn verify_with(&self, token: &str, secret: &SigningSecret, mode: VerifyMode) -> Result<TokenClaims, TokenError> {
        check_algorithm(token)?;

        if secret.is_empty() {
            return Err(TokenError::SecretUnavailable("empty signing secret".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let raw = decode::<RawClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)?;

        let iss = raw.iss.ok_or(TokenError::MissingClaim("iss"))?;
        if iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }

        let aud = raw.aud.ok_or(TokenError::MissingClaim("aud"))?;
        if !audience_matches(&aud, &self.audience) {
            return Err(TokenError::InvalidAudience);
        }

        let sub = raw.sub.filter(|s| !s.is_empty()).ok_or(TokenError::MissingClaim("sub"))?;
        let jti = raw.jti.filter(|s| !s.is_empty()).ok_or(TokenError::MissingClaim("jti"))?;
        let type_name = raw.token_type.ok_or(TokenError::MissingClaim("type"))?;
        let token_type = parse_token_type(&type_name)?;
        let exp = raw.exp.ok_or(TokenError::MissingClaim("exp"))?;
        let iat = raw.iat.ok_or(TokenError::MissingClaim("iat"))?;

        if exp <= iat {
            return Err(TokenError::Malformed("exp must be after iat".to_string()));
        }

        if let VerifyMode::Strict(expected) = mode {
            if token_type != expected {
                return Err(TokenError::WrongType {
                    expected,
                    actual: token_type,
                });
            }

            let now = self.clock.timestamp();
            if exp <= now {
                return Err(TokenError::Expired);
            }
            if let Some(nbf) = raw.nbf {
                if nbf > now + self.clock_skew_seconds {
                    return Err(TokenError::NotYetValid);
                }
            }
            if iat > now + self.clock_skew_seconds {
                return Err(TokenError::IssuedInFuture);
            }
        }

        Ok(TokenClaims {
            sub,
            token_type,
            iat,
            nbf: raw.nbf,
            exp,
            jti,
            iss,
            aud: self.audience.clone(),
            extra: raw.extra,
        })
    }
}

/// 원본 헤더의 `alg`가 정확히 HS256인지 확인합니다.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "JWT는 3개의 세그먼트가 필요합니다 (현재 {}개)",
            segments.len()
        )));
    }

    let header: RawHeader = decode_segment(segments[0])?;
    match header.alg {
        Some(alg) if alg == ALLOWED_ALGORITHM => Ok(()),
        Some(alg) => Err(TokenError::UnsupportedAlgorithm(alg)),
        None => Err(TokenError::UnsupportedAlgorithm("<missing>".to_string())),
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(format!("base64 디코딩 실패: {}", e)))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("JSON 파싱 실패: {}", e)))
}

fn parse_token_type(value: &str) -> Result<TokenType, TokenError> {
    match value {
        "access" => Ok(TokenType::Access),
        "refresh" => Ok(TokenType::Refresh),
        other => Err(TokenError::Malformed(format!("알 수 없는 토큰 종류: {}", other))),
    }
}

fn audience_matches(aud: &Value, expected: &str) -> bool {
    match aud {
        Value::String(s) => s == expected,
        Value::Array(values) => values.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    }
}

/// `jsonwebtoken` 에러를 토큰 에러 종류로 변환합니다.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed(err.to_string()),
        _ => TokenError::Malformed(format!("토큰 검증 실패: {}", err)),
    }
}
