//! 요청 인증 모델
//!
//! - [`authenticated_user`] - 검증된 토큰의 주체 정보와 actix 추출자
//! - [`access_policy`] - 인증 모드와 역할 요구사항

pub mod access_policy;
pub mod authenticated_user;

pub use access_policy::*;
pub use authenticated_user::*;
