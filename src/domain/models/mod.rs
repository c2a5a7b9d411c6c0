//! # Domain Models Module
//!
//! 토큰 생명주기 도메인의 값 객체를 정의합니다.
//!
//! ```text
//! models/
//! ├── token/   ← 클레임, 토큰 쌍, 블랙리스트 항목
//! └── auth/    ← 인증된 사용자, 접근 정책
//! ```
//!
//! 모델은 영속성 계층을 알지 못합니다. 저장 형식(`RevocationEntry`의 JSON)만
//! serde 속성으로 고정합니다.

pub mod auth;
pub mod token;
