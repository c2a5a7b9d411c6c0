//! 미들웨어 모듈
//!
//! # 제공 미들웨어
//!
//! ### 인증 미들웨어 (AuthMiddleware)
//! - Bearer 액세스 토큰 추출 및 검증 (서명, 클레임, 블랙리스트)
//! - 사용자 정보를 request extension에 저장
//! - 선택적/강제 인증 모드, 역할 요구사항 지원
//! - 실패 사유와 무관하게 동일한 401 응답
//!
//! # 사용 방법
//!
//! ```rust,ignore
//! use actix_web::{web, App};
//! use crate::middlewares::AuthMiddleware;
//!
//! App::new()
//!     .app_data(token_service.clone())
//!     .service(
//!         web::scope("/api/v1/admin")
//!             .wrap(AuthMiddleware::required_with_roles(&["admin"]))
//!             .service(admin_handler)
//!     );
//! ```

pub mod auth_middleware;
mod auth_inner;

pub use auth_middleware::{extract_bearer_token, AuthMiddleware};
