//! 인증 토큰 서비스 모듈
//!
//! JWT 액세스/리프레시 토큰의 발급, 검증, 폐기, 회전을 담당합니다.
//!
//! # Security
//!
//! - HMAC-SHA256 토큰 서명 (다른 알고리즘 거부)
//! - 액세스/리프레시 토큰 별도 서명 키
//! - 로그아웃/회전 시 블랙리스트 기록
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::auth::TokenLifecycleService;
//!
//! let pair = service.issue_token_pair("user-1", &claims).await?;
//! let claims = service.validate_access_token(&pair.access_token).await?;
//! let next = service.rotate_token_pair(&pair.refresh_token).await?;
//! ```

pub mod secret_store;
pub mod token_codec;
pub mod token_lifecycle_service;

pub use secret_store::*;
pub use token_codec::*;
pub use token_lifecycle_service::*;
