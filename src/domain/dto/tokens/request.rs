use serde::Deserialize;
use validator::Validate;

/// 토큰 회전 요청 DTO
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refresh_token은 필수입니다"))]
    pub refresh_token: String,
}

/// 로그아웃 요청 DTO
///
/// 액세스 토큰은 Authorization 헤더에서 추출합니다.
/// 본문에 리프레시 토큰이 있으면 함께 폐기합니다.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "refresh_token이 비어 있습니다"))]
    pub refresh_token: Option<String>,
}
