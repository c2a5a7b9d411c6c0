//! # HTTP Request Handlers Module
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 정의하는 모듈입니다.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//!   Handlers (이 모듈) - HTTP 엔드포인트 처리         ← Web Layer
//! ├─────────────────────────────────────────────┤
//!   Services - 토큰 발급/검증/폐기/회전              ← Service Layer
//! ├─────────────────────────────────────────────┤
//!   Repositories - 블랙리스트                      ← Repository Layer
//! └─────────────────────────────────────────────┘
//! ```
//!
//! 핸들러는 `web::Data<TokenLifecycleService>`를 주입받고, 에러는 [`crate::errors::AppError`]로
//! 반환하여 상태 코드 매핑을 한 곳에 둡니다.

pub mod token_handlers;
