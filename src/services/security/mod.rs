//! 보안 이벤트 및 반복 실패 탐지 모듈
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::security::{LogSecurityEventLog, ThresholdBruteForceDetector};
//!
//! let detector = Arc::new(ThresholdBruteForceDetector::new(settings, clock.clone()));
//! let events: Arc<dyn SecurityEventLog> = Arc::new(LogSecurityEventLog::with_detector(detector));
//! ```

pub mod brute_force;
pub mod security_event_log;

pub use brute_force::*;
pub use security_event_log::*;
