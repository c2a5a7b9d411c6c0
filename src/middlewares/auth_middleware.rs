//! 액세스 토큰 인증 미들웨어
//!
//! `Authorization: Bearer <token>` 헤더의 액세스 토큰을 [`TokenLifecycleService`]로 검증하고
//! (서명, 클레임, 블랙리스트) 결과를 Request Extensions에 저장합니다.
//!
//! 서비스는 `App::app_data(web::Data<TokenLifecycleService>)`로 등록되어 있어야 합니다.
//!
//! [`TokenLifecycleService`]: crate::services::auth::TokenLifecycleService

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, Result,
};
use crate::domain::models::auth::{AuthMode, RoleRequirement};
use crate::middlewares::auth_inner::AuthMiddlewareService;

/// Authorization 헤더에서 Bearer 토큰을 추출합니다.
///
/// 스킴은 대소문자를 구분하지 않으며, 빈 토큰은 없는 것으로 봅니다.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// 액세스 토큰 인증 미들웨어
pub struct AuthMiddleware {
    mode: AuthMode,
    required_role: Option<RoleRequirement>,
}

impl AuthMiddleware {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            required_role: None,
        }
    }

    /// 필수 인증
    pub fn required() -> Self {
        Self::new(AuthMode::Required)
    }

    /// 선택적 인증
    pub fn optional() -> Self {
        Self::new(AuthMode::Optional)
    }

    /// 나열된 역할 중 하나를 요구하는 필수 인증
    pub fn required_with_roles(roles: &[&str]) -> Self {
        Self::required().with_requirement(RoleRequirement::any_of(roles))
    }

    pub fn with_requirement(mut self, requirement: RoleRequirement) -> Self {
        self.required_role = Some(requirement);
        self
    }
}

/// ActixWeb Transform trait 구현
impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            mode: self.mode,
            required_role: self.required_role.clone(),
        }))
    }
}
