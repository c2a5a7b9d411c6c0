//! AuthMiddleware 인증 로직의 핵심적인 기능
use std::rc::Rc;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse};
use actix_web::{web, Error, HttpMessage, ResponseError};
use futures_util::future::LocalBoxFuture;
use crate::domain::models::auth::{AuthMode, AuthenticatedUser, RoleRequirement};
use crate::errors::AppError;
use crate::middlewares::auth_middleware::extract_bearer_token;
use crate::services::auth::TokenLifecycleService;

/// 실제 인증 로직을 수행하는 서비스
pub struct AuthMiddlewareService<S> {
    pub service: Rc<S>,
    pub mode: AuthMode,
    pub required_role: Option<RoleRequirement>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let mode = self.mode;
        let required_role = self.required_role.clone();

        Box::pin(async move {
            let auth_result = authenticate(&req).await;

            match (mode, auth_result) {
                (AuthMode::Required, Err(err)) => {
                    log::warn!("인증 실패: {}", err);
                    return Ok(reject(req, err));
                }
                (AuthMode::Required, Ok(user)) => {
                    if let Some(ref required) = required_role {
                        if !required.is_satisfied(&user.roles) {
                            log::warn!(
                                "권한 부족: 사용자 ID {} ({:?}), 필요 권한: {:?}",
                                user.user_id,
                                user.roles,
                                required
                            );
                            let err = AppError::AuthorizationError("insufficient permissions".to_string());
                            return Ok(reject(req, err));
                        }
                    }

                    log::debug!("인증 성공: 사용자 ID {}", user.user_id);
                    req.extensions_mut().insert(user);
                }
                (AuthMode::Optional, Ok(user)) => {
                    let allowed = required_role
                        .as_ref()
                        .map_or(true, |required| required.is_satisfied(&user.roles));
                    if allowed {
                        log::debug!("선택적 인증 성공: 사용자 ID {}", user.user_id);
                        req.extensions_mut().insert(user);
                    } else {
                        log::debug!("선택적 인증: 권한 부족하지만 진행 허용");
                    }
                }
                (AuthMode::Optional, Err(_)) => {
                    log::debug!("선택적 인증: 유효한 토큰 없음, 요청 진행");
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// 요청의 액세스 토큰을 검증하고 사용자 정보를 만듭니다.
async fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let service = req
        .app_data::<web::Data<TokenLifecycleService>>()
        .cloned()
        .ok_or_else(|| AppError::ConfigurationError("TokenLifecycleService가 등록되지 않았습니다".to_string()))?;

    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;

    let claims = service.validate_access_token(token).await?;
    Ok(AuthenticatedUser::from_claims(&claims))
}

fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    let response = err.error_response();
    let (req, _) = req.into_parts();
    ServiceResponse::new(req, response).map_into_right_body()
}
