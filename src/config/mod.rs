//! # Configuration Module
//!
//! 백엔드 서비스의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 기반의 설정값들을 시작 시점에 한 번 로드하고 검증하여
//! 타입이 있는 구조체로 각 컴포넌트에 전달합니다.
//!
//! ## 모듈 구성
//!
//! - [`data_config`] - 실행 환경, 서버, Redis, Rate Limiting 설정
//! - [`auth_config`] - JWT, 서킷 브레이커, 블랙리스트, 무차별 대입 탐지 설정
//!
//! ## 설계 원칙
//!
//! ### 1. 환경 분리 (Environment Separation)
//!
//! `PROFILE`에 따라 `.env.dev` / `.env.prod` 파일을 로드하며,
//! `ENVIRONMENT`로 검증 강도를 결정합니다.
//!
//! ### 2. 보안 우선 (Security First)
//!
//! - 서명 키는 환경 변수로만 제공되며 기본값이 없습니다
//! - 키가 없으면 시작 단계에서 실패합니다 (fail closed)
//! - 운영 환경에서는 짧은 키도 거부합니다
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! # 필수
//! export JWT_SECRET="..."
//! export JWT_REFRESH_SECRET="..."
//!
//! # 선택
//! export JWT_EXPIRE="15m"
//! export JWT_REFRESH_EXPIRE="7d"
//! export REDIS_URL="redis://localhost:6379"
//! export REVOCATION_FALLBACK="fail-closed"
//! ```

pub mod data_config;
pub mod auth_config;

pub use data_config::*;
pub use auth_config::*;
