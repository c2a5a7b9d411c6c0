//! # Domain Layer Module
//!
//! 토큰 생명주기 도메인의 값 객체와 API 계약을 담당합니다.
//!
//! ```text
//! Domain Layer (이 모듈)
//! ├── Models  - 클레임, 토큰 쌍, 블랙리스트 항목, 인증된 사용자
//! └── DTOs    - 데이터 전송 객체 (Request/Response)
//!      │
//!      ▼
//! Application Layer (Services)
//!      │
//!      ▼
//! Infrastructure Layer (Repositories, Caching)
//! ```
//!
//! 도메인 계층은 서비스/저장소 계층에 의존하지 않습니다.

pub mod dto;
pub mod models;

pub use dto::*;
pub use models::*;
