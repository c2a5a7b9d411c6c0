//! # Core Module
//!
//! 애플리케이션 전반에서 공유되는 기반 구성 요소를 제공합니다.
//!
//! - [`clock`] - 주입 가능한 시간 소스 (`SystemClock`, `ManualClock`)
//!
//! 전역 싱글톤 컨테이너 대신 모든 컴포넌트는 `main`에서 명시적으로 생성되어
//! `Arc` 핸들로 전달됩니다.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
