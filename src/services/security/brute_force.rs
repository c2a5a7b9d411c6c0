//! 반복 실패 탐지
//!
//! 키(주체 또는 토큰 지문)별로 고정 윈도우 안의 검증 실패 횟수를 셉니다.
//! 임계치에 도달하면 윈도우당 한 번만 보고합니다.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use crate::config::BruteForceSettings;
use crate::core::clock::Clock;

/// 추적 키가 이 수를 넘으면 만료된 윈도우를 정리합니다.
const PRUNE_THRESHOLD: usize = 10_000;

pub trait BruteForceDetector: Send + Sync {
    /// 실패 한 건을 기록합니다.
    ///
    /// 이번 기록으로 임계치에 처음 도달했으면 현재 윈도우의 실패 횟수를 반환합니다.
    fn register_failure(&self, key: &str) -> Option<u32>;
}

struct FailureWindow {
    started_at: i64,
    failures: u32,
    reported: bool,
}

pub struct ThresholdBruteForceDetector {
    settings: BruteForceSettings,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, FailureWindow>>,
}

impl ThresholdBruteForceDetector {
    pub fn new(settings: BruteForceSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// 현재 추적 중인 키 수
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

impl BruteForceDetector for ThresholdBruteForceDetector {
    fn register_failure(&self, key: &str) -> Option<u32> {
        let now = self.clock.timestamp();
        let window_secs = self.settings.window_secs.max(1);
        let mut windows = self.windows.lock();

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, w| now - w.started_at < window_secs);
        }

        let window = windows.entry(key.to_string()).or_insert(FailureWindow {
            started_at: now,
            failures: 0,
            reported: false,
        });

        if now - window.started_at >= window_secs {
            *window = FailureWindow {
                started_at: now,
                failures: 0,
                reported: false,
            };
        }

        window.failures += 1;
        if window.failures >= self.settings.max_failures && !window.reported {
            window.reported = true;
            return Some(window.failures);
        }
        None
    }
}
