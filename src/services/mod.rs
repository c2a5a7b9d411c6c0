//! 비즈니스 로직을 담당하는 서비스 계층 모듈
//!
//! 서비스는 싱글톤이 아니라 `main`에서 한 번 생성되어 `Arc`/`web::Data`로 공유됩니다.
//!
//! - [`auth`] - 토큰 발급/검증/폐기/회전
//! - [`security`] - 보안 이벤트 기록, 반복 실패 탐지

pub mod auth;
pub mod security;
