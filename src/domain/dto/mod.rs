//! # Data Transfer Objects (DTO) Module
//!
//! API 경계의 요청/응답 형식을 정의합니다.
//!
//! | 역할 | 위치 |
//! |------|------|
//! | HTTP 요청 본문 매핑 | `tokens::request` |
//! | HTTP 응답 본문 매핑 | `tokens::response` |
//! | 입력값 유효성 검증 | `validator` crate |
//!
//! 토큰 원문은 요청 DTO로만 들어오고, 응답에는 새로 발급된 토큰 쌍 외에
//! 토큰 원문을 되돌려주지 않습니다.

pub mod tokens;

pub use tokens::*;
