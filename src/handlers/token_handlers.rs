//! 토큰 생명주기 HTTP 핸들러
//!
//! - `POST /api/v1/auth/refresh` - 리프레시 토큰 회전
//! - `POST /api/v1/auth/logout` - 액세스 토큰(및 선택적으로 리프레시 토큰) 폐기
//! - `GET /api/v1/auth/me` - 현재 액세스 토큰의 사용자 정보
//!
//! 인증 실패 응답은 사유와 무관하게 동일합니다. 구체적인 사유는 보안 이벤트 로그에만 남습니다.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use validator::Validate;
use crate::domain::dto::tokens::{ApiResponse, CurrentUserResponse, LogoutRequest, RefreshRequest};
use crate::domain::models::auth::AuthenticatedUser;
use crate::domain::models::token::token::RevocationReason;
use crate::errors::{AppError, AppResult};
use crate::middlewares::extract_bearer_token;
use crate::services::auth::TokenLifecycleService;

/// 토큰 회전 핸들러
///
/// 이전 리프레시 토큰을 폐기하고 새 토큰 쌍을 발급합니다.
/// 같은 리프레시 토큰을 두 번 사용하면 두 번째 요청은 401입니다.
///
/// # Endpoint
/// `POST /api/v1/auth/refresh`
///
/// # 요청 본문
/// ```json
/// { "refresh_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9..." }
/// ```
///
/// # 응답
/// - 200: `{ "success": true, "data": { "access_token", "refresh_token", "token_type", "expires_in", "refresh_expires_in" } }`
/// - 400: 본문 검증 실패
/// - 401: `{ "error": "authentication failed" }`
/// - 503: 이전 토큰을 폐기할 수 없음 (블랙리스트 저장소 장애)
#[post("/refresh")]
pub async fn refresh_token_handler(
    service: web::Data<TokenLifecycleService>,
    payload: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let pair = service.rotate_token_pair(&payload.refresh_token).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(pair)))
}

/// 로그아웃 핸들러
///
/// Authorization 헤더의 액세스 토큰을 폐기하고, 본문에 리프레시 토큰이 있으면 함께 폐기합니다.
/// 인증 미들웨어가 액세스 토큰을 먼저 검증합니다.
///
/// 한쪽 폐기가 실패해도 다른 쪽 폐기는 시도한 뒤 첫 번째 에러를 반환합니다.
///
/// # Endpoint
/// `POST /api/v1/auth/logout`
#[post("/logout")]
pub async fn logout_handler(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<TokenLifecycleService>,
    payload: Option<web::Json<LogoutRequest>>,
) -> AppResult<HttpResponse> {
    let access_token = extract_bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;

    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let access_result = service.revoke_token(access_token, RevocationReason::Logout).await;
    let refresh_result = match payload.refresh_token.as_deref() {
        Some(refresh_token) => service.revoke_token(refresh_token, RevocationReason::Logout).await,
        None => Ok(()),
    };
    access_result?;
    refresh_result?;

    log::info!("로그아웃 완료 - user_id: {}", user.user_id);
    Ok(HttpResponse::Ok().json(ApiResponse::message("logged out")))
}

/// 현재 사용자 정보 핸들러
///
/// # Endpoint
/// `GET /api/v1/auth/me`
#[get("/me")]
pub async fn current_user_handler(user: AuthenticatedUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(CurrentUserResponse::from(user))))
}
