//! 공통 유틸리티 함수 모듈
//!
//! # Modules
//!
//! - [`fingerprint`] - 로그용 토큰 지문 (원본 토큰은 기록하지 않음)

pub mod fingerprint;
