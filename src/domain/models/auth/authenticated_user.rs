use std::future::{ready, Ready};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};
use crate::domain::models::token::token::TokenClaims;

/// 검증된 액세스 토큰에서 추출된 사용자 정보
///
/// 인증 미들웨어가 Request Extensions에 저장하고, 핸들러는 추출자로 받습니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    /// 사용자 고유 ID (`sub`)
    pub user_id: String,

    /// 사용자 역할 목록 (`roles` 클레임)
    pub roles: Vec<String>,

    /// 액세스 토큰 ID (`jti`)
    pub token_id: String,

    /// 액세스 토큰 만료 시각 (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            roles: claims.roles(),
            token_id: claims.jti.clone(),
            expires_at: claims.exp,
        }
    }
}

/// ActixWeb FromRequest trait 구현
impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<actix_web::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                crate::errors::AUTHENTICATION_FAILED,
            ))),
        }
    }
}

/// 선택적 인증 사용자 추출자
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl FromRequest for OptionalUser {
    type Error = Error;
    type Future = Ready<actix_web::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        ready(Ok(OptionalUser(user)))
    }
}
