//! JWT 인증 토큰 구조체 및 페어링 된 세트
//!
//! RFC 7519 JWT 표준 클레임과 2개의 용도별 토큰(액세스/리프레시)을 페어링 한 정보,
//! 그리고 블랙리스트 항목의 저장 형식을 정의합니다.
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 토큰 용도
///
/// 액세스 토큰은 리프레시 토큰이 필요한 곳에서 절대 허용되지 않으며, 그 반대도 마찬가지입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// 요청 단위 인가용 단기 토큰
    Access,
    /// 새 액세스 토큰 발급 전용 장기 토큰
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT 토큰의 클레임(Payload) 구조체
///
/// ## 클레임 구성
///
/// - `sub`: 토큰의 주체 (사용자 ID)
/// - `type`: 토큰 용도 (`access` | `refresh`)
/// - `iat` / `nbf` / `exp`: 발급/사용 가능/만료 시간 (Unix timestamp)
/// - `jti`: 256비트 무작위 고유 식별자 (블랙리스트 키)
/// - `iss` / `aud`: 설정값으로 고정된 발급자/대상
/// - 그 외 애플리케이션 클레임 (`roles` 등)은 `extra`에 그대로 보존
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 토큰의 주체 (사용자 ID)
    pub sub: String,
    /// 토큰 용도
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// 사용 가능 시작 시간 (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// 발급자
    pub iss: String,
    /// 대상
    pub aud: String,
    /// 애플리케이션 클레임
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// 애플리케이션 클레임 중 역할 목록을 읽습니다.
    pub fn roles(&self) -> Vec<String> {
        self.extra
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// JWT 토큰 쌍 구조체
///
/// 클라이언트에게 전달되는 토큰 집합을 나타냅니다.
/// OAuth 2.0 표준의 토큰 응답 형식을 따릅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// 액세스 토큰 (API 접근용 단기 토큰)
    pub access_token: String,
    /// 리프레시 토큰 (토큰 갱신용 장기 토큰)
    pub refresh_token: String,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
    /// 액세스 토큰 만료 시간 (초)
    pub expires_in: i64,
    /// 리프레시 토큰 만료 시간 (초)
    pub refresh_expires_in: i64,
}

/// 블랙리스트 추가 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// 정상 로그아웃
    Logout,
    /// 리프레시 토큰 회전
    Rotation,
    /// 관리자에 의한 강제 무효화
    AdminRevoke,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::Rotation => "rotation",
            RevocationReason::AdminRevoke => "admin_revoke",
        }
    }
}

/// 블랙리스트 항목
///
/// `blacklist:{jti}` 키에 JSON으로 저장되며, 원래 토큰이 만료되는 시각에
/// 함께 만료됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationEntry {
    /// 토큰 소유자 (감사용)
    pub subject: String,
    /// 폐기 이유
    pub reason: RevocationReason,
    /// 폐기 시각 (Unix timestamp)
    pub revoked_at: i64,
    /// 원래 토큰의 만료 시각 (Unix timestamp)
    pub expires_at: i64,
}
