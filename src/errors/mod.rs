//! 에러 타입 모듈
//!
//! 토큰 검증, 저장소, 설정, HTTP 응답 에러를 정의합니다.

pub mod errors;

pub use errors::*;
