//! # 시간 소스 추상화
//!
//! 토큰 만료 검증, 블랙리스트 TTL 계산, 서킷 브레이커 쿨다운 등
//! 시간에 의존하는 모든 로직은 `Clock` trait을 통해 현재 시각을 얻습니다.
//!
//! 운영 환경에서는 [`SystemClock`]을, 테스트에서는 [`ManualClock`]을 주입하여
//! 실제 타이머 없이도 만료 경계와 상태 전이를 결정적으로 검증할 수 있습니다.
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Duration;
//! use crate::core::clock::{Clock, ManualClock};
//!
//! let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
//! clock.advance(Duration::minutes(15));
//! assert_eq!(clock.timestamp(), 1_700_000_900);
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// 현재 시각을 제공하는 시간 소스
pub trait Clock: Send + Sync {
    /// 현재 UTC 시각
    fn now(&self) -> DateTime<Utc>;

    /// 현재 Unix timestamp (초)
    fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// 현재 Unix timestamp (밀리초)
    fn timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// 시스템 시계를 그대로 사용하는 기본 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작 가능한 시계
///
/// 테스트에서 만료 경계(`exp = now ± 1`)나 서킷 쿨다운 경과를
/// `sleep` 없이 재현하기 위해 사용합니다.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 지정된 시각에서 시작하는 시계를 생성합니다.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Unix timestamp(초)에서 시작하는 시계를 생성합니다.
    pub fn at_timestamp(seconds: i64) -> Self {
        let start = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(start)
    }

    /// 시계를 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }

    /// 시계를 특정 시각으로 설정합니다.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
