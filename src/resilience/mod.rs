//! 장애 격리 모듈
//!
//! 블랙리스트 저장소 장애가 전체 인증 실패로 번지거나, 반대로 폐기 검사가
//! 조용히 비활성화되는 것을 막는 서킷 브레이커를 제공합니다.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitError, CircuitGuard, CircuitState, CircuitStats, FallbackPolicy};
