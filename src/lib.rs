//! 토큰 생명주기 백엔드
//!
//! JWT 액세스/리프레시 토큰의 발급, 검증, 폐기, 회전을 담당하는 서비스입니다.
//! 폐기된 토큰은 Redis 블랙리스트에 남은 수명만큼 기록되며, 저장소 장애는
//! 서킷 브레이커와 설정 가능한 폴백 정책으로 격리됩니다.
//!
//! # Features
//!
//! - **HS256 전용 코덱**: 알고리즘 허용 목록, 주입 가능한 시계 기준의 클레임 검증
//! - **분리된 서명 키**: 액세스/리프레시 토큰은 서로 다른 키로 서명
//! - **블랙리스트**: `jti` 단위 폐기, 멱등 기록, TTL = 남은 수명
//! - **토큰 회전**: 사용된 리프레시 토큰은 즉시 폐기
//! - **서킷 브레이커**: fail-closed / fail-open 폴백, 인스턴스 로컬 캐시
//! - **보안 이벤트 로그**: 토큰 원문 대신 지문만 기록, 반복 실패 탐지
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Routes   │ ← REST API 엔드포인트 + 인증 미들웨어
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Handlers     │ ← 요청/응답 처리
//! └─────────────────┘
//!          │
//!          ▼
//! ┌──────────────────────────┐
//! │  TokenLifecycleService   │ ← 코덱 + 서명 키 + 블랙리스트 + 서킷
//! └──────────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ RevocationStore │ ← 블랙리스트 (jti → 폐기 기록)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Redis / Memory  │ ← KeyValueStore
//! └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use token_lifecycle_backend::services::auth::TokenLifecycleService;
//!
//! let service = TokenLifecycleService::from_config(&jwt, &revocation, redis, circuit, events, clock);
//! service.ensure_ready().await?;
//!
//! let pair = service.issue_token_pair("user-1", &claims).await?;
//! let claims = service.validate_access_token(&pair.access_token).await?;
//! let rotated = service.rotate_token_pair(&pair.refresh_token).await?;
//! ```

pub mod core;
pub mod config;
pub mod caching;
pub mod domain;
pub mod repositories;
pub mod resilience;
pub mod services;
pub mod utils;
pub mod routes;
pub mod handlers;
pub mod errors;
pub mod middlewares;
