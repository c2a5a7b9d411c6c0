//! 토큰 폐기 목록(블랙리스트) 리포지토리 모듈
//!
//! 로그아웃/회전으로 무효화된 토큰의 `jti`를 원래 만료 시각까지 보관합니다.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::repositories::tokens::RevocationStore;
//!
//! let store = RevocationStore::new(redis_client, clock);
//! store.revoke(&claims.jti, &claims.sub, RevocationReason::Logout, claims.exp).await?;
//! assert!(store.is_revoked(&claims.jti).await?);
//! ```

pub mod revocation_repository;

pub use revocation_repository::*;
