//! 블랙리스트 저장소 연결을 감싸는 서킷 브레이커
//!
//! 상태 전이:
//! - Closed → Open: 롤링 윈도우 내 호출 수가 최소치 이상이고 에러율이 임계값 이상일 때
//! - Open → HalfOpen: 쿨다운(`reset_timeout`) 경과 후 첫 호출 시
//! - HalfOpen → Closed: 프로브 호출 성공
//! - HalfOpen → Open: 프로브 호출 실패 (쿨다운 재시작)
//!
//! 모든 호출은 `timeout`으로 제한되며, 시간 초과는 실패로 집계됩니다.
//! 서킷이 열려 있는 동안의 판단은 호출자가 [`FallbackPolicy`]로 결정합니다.
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use crate::config::CircuitBreakerSettings;
use crate::core::clock::Clock;
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// 정상 동작, 호출 통과
    Closed,
    /// 저장소 장애, 호출 즉시 단락
    Open,
    /// 복구 확인 중, 프로브 한 건만 허용
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

/// 저장소를 사용할 수 없을 때 폐기 여부 판단 정책
///
/// - `FailClosed`: 폐기된 것으로 간주 (거부). 장애 중 서비스 거부가 발생합니다.
/// - `FailOpen`: 폐기되지 않은 것으로 간주 (허용). 장애 중 폐기 보장이 약해집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    FailClosed,
    FailOpen,
}

impl FallbackPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fail-closed" | "fail_closed" | "closed" | "deny" => Some(FallbackPolicy::FailClosed),
            "fail-open" | "fail_open" | "open" | "allow" => Some(FallbackPolicy::FailOpen),
            _ => None,
        }
    }

    /// 저장소를 확인할 수 없을 때 토큰을 폐기된 것으로 볼지 여부
    pub fn treat_as_revoked(&self) -> bool {
        matches!(self, FallbackPolicy::FailClosed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackPolicy::FailClosed => "fail-closed",
            FallbackPolicy::FailOpen => "fail-open",
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error("circuit breaker is open - failing fast")]
    Open,
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("call failed: {0}")]
    Failed(StoreError),
}

/// 모니터링용 상태 스냅샷
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub calls_in_window: usize,
    pub failures_in_window: usize,
    pub error_rate: f64,
}

type StateListener = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

struct GuardState {
    current: CircuitState,
    opened_at_ms: Option<i64>,
    probe_in_flight: bool,
    /// 롤링 윈도우: (기록 시각 ms, 성공 여부)
    window: VecDeque<(i64, bool)>,
}

/// 호출 허가 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Probe,
}

pub struct CircuitGuard {
    settings: CircuitBreakerSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<GuardState>,
    listener: Option<StateListener>,
}

/// 프로브 호출이 완료되지 않고 취소되면 서킷을 다시 엽니다.
struct ProbeReset<'a> {
    guard: &'a CircuitGuard,
    armed: bool,
}

impl Drop for ProbeReset<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Circuit breaker: 프로브 호출이 취소됨 - HalfOpen → Open");
            self.guard.record_failure(Permit::Probe);
        }
    }
}

impl CircuitGuard {
    pub fn new(settings: CircuitBreakerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            state: Mutex::new(GuardState {
                current: CircuitState::Closed,
                opened_at_ms: None,
                probe_in_flight: false,
                window: VecDeque::new(),
            }),
            listener: None,
        }
    }

    /// 상태 전이 알림을 받을 리스너를 등록합니다.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.settings.fallback
    }

    /// 서킷 브레이커 보호 하에 저장소 호출을 실행합니다.
    ///
    /// # Errors
    ///
    /// * `CircuitError::Open` - 서킷이 열려 있거나 다른 프로브가 진행 중
    /// * `CircuitError::Timeout` - `timeout` 초과 (실패로 집계)
    /// * `CircuitError::Failed` - 저장소 에러 (실패로 집계)
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, CircuitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let permit = self.acquire()?;
        let mut reset = ProbeReset {
            guard: self,
            armed: permit == Permit::Probe,
        };

        let outcome = tokio::time::timeout(self.settings.timeout, f()).await;
        reset.armed = false;

        match outcome {
            Ok(Ok(value)) => {
                self.record_success(permit);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure(permit);
                Err(CircuitError::Failed(e))
            }
            Err(_) => {
                self.record_failure(permit);
                Err(CircuitError::Timeout(self.settings.timeout))
            }
        }
    }

    fn acquire(&self) -> Result<Permit, CircuitError> {
        let now_ms = self.clock.timestamp_millis();
        let mut transition = None;

        let permit = {
            let mut state = self.state.lock();
            match state.current {
                CircuitState::Closed => Ok(Permit::Normal),
                CircuitState::Open => {
                    let cooldown_ms = self.settings.reset_timeout.as_millis() as i64;
                    let elapsed = state.opened_at_ms.map(|at| now_ms - at).unwrap_or(i64::MAX);
                    if elapsed >= cooldown_ms {
                        state.current = CircuitState::HalfOpen;
                        state.probe_in_flight = true;
                        transition = Some((CircuitState::Open, CircuitState::HalfOpen));
                        Ok(Permit::Probe)
                    } else {
                        Err(CircuitError::Open)
                    }
                }
                CircuitState::HalfOpen => {
                    if state.probe_in_flight {
                        Err(CircuitError::Open)
                    } else {
                        state.probe_in_flight = true;
                        Ok(Permit::Probe)
                    }
                }
            }
        };

        if let Some((from, to)) = transition {
            log::info!("Circuit breaker: {} → {}", from, to);
            self.notify(from, to);
        }
        permit
    }

    fn record_success(&self, permit: Permit) {
        let now_ms = self.clock.timestamp_millis();
        let mut transition = None;

        {
            let mut state = self.state.lock();
            match permit {
                Permit::Probe => {
                    state.probe_in_flight = false;
                    state.window.clear();
                    state.opened_at_ms = None;
                    if state.current != CircuitState::Closed {
                        transition = Some((state.current, CircuitState::Closed));
                        state.current = CircuitState::Closed;
                    }
                }
                Permit::Normal => {
                    if state.current == CircuitState::Closed {
                        state.window.push_back((now_ms, true));
                        self.prune(&mut state, now_ms);
                    }
                }
            }
        }

        if let Some((from, to)) = transition {
            log::info!("Circuit breaker: {} → {}", from, to);
            self.notify(from, to);
        }
    }

    fn record_failure(&self, permit: Permit) {
        let now_ms = self.clock.timestamp_millis();
        let mut transition = None;

        {
            let mut state = self.state.lock();
            match permit {
                Permit::Probe => {
                    state.probe_in_flight = false;
                    state.opened_at_ms = Some(now_ms);
                    if state.current != CircuitState::Open {
                        transition = Some((state.current, CircuitState::Open));
                        state.current = CircuitState::Open;
                    }
                    log::warn!("Circuit breaker: 프로브 실패, 쿨다운 재시작");
                }
                Permit::Normal => {
                    if state.current == CircuitState::Closed {
                        state.window.push_back((now_ms, false));
                        self.prune(&mut state, now_ms);

                        let (calls, failures) = Self::counts(&state);
                        let error_rate = Self::rate(calls, failures);
                        if calls >= self.settings.volume_threshold
                            && error_rate >= self.settings.error_threshold
                        {
                            log::warn!(
                                "Circuit breaker: Closed → Open (calls: {}, failures: {}, error_rate: {:.2}%)",
                                calls,
                                failures,
                                error_rate * 100.0
                            );
                            state.current = CircuitState::Open;
                            state.opened_at_ms = Some(now_ms);
                            transition = Some((CircuitState::Closed, CircuitState::Open));
                        }
                    }
                }
            }
        }

        if let Some((from, to)) = transition {
            self.notify(from, to);
        }
    }

    fn prune(&self, state: &mut GuardState, now_ms: i64) {
        let window_ms = self.settings.rolling_window.as_millis() as i64;
        while let Some((at, _)) = state.window.front() {
            if now_ms - *at > window_ms {
                state.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn counts(state: &GuardState) -> (usize, usize) {
        let failures = state.window.iter().filter(|(_, ok)| !ok).count();
        (state.window.len(), failures)
    }

    fn rate(calls: usize, failures: usize) -> f64 {
        if calls == 0 {
            0.0
        } else {
            failures as f64 / calls as f64
        }
    }

    fn notify(&self, from: CircuitState, to: CircuitState) {
        if let Some(listener) = &self.listener {
            listener(from, to);
        }
    }

    /// 현재 서킷 상태 (모니터링용)
    pub fn state(&self) -> CircuitState {
        self.state.lock().current
    }

    /// 롤링 윈도우 통계 (모니터링용)
    pub fn stats(&self) -> CircuitStats {
        let now_ms = self.clock.timestamp_millis();
        let mut state = self.state.lock();
        self.prune(&mut state, now_ms);
        let (calls, failures) = Self::counts(&state);

        CircuitStats {
            state: state.current,
            calls_in_window: calls,
            failures_in_window: failures,
            error_rate: Self::rate(calls, failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::Duration as ChronoDuration;
    use crate::core::clock::ManualClock;

    fn settings() -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            timeout: Duration::from_millis(100),
            error_threshold: 0.5,
            reset_timeout: Duration::from_secs(30),
            rolling_window: Duration::from_secs(10),
            volume_threshold: 4,
            fallback: FallbackPolicy::FailClosed,
        }
    }

    fn guard(settings: CircuitBreakerSettings) -> (Arc<ManualClock>, CircuitGuard) {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        (clock.clone(), CircuitGuard::new(settings, clock))
    }

    async fn fail(cb: &CircuitGuard) -> Result<(), CircuitError> {
        cb.call(|| async { Err::<(), _>(StoreError::Connection("down".into())) }).await
    }

    async fn succeed(cb: &CircuitGuard) -> Result<(), CircuitError> {
        cb.call(|| async { Ok::<_, StoreError>(()) }).await
    }

    #[tokio::test]
    async fn test_opens_when_error_rate_exceeds_threshold() {
        let (_clock, cb) = guard(settings());

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);

        // 4건 중 2건 실패 = 50%
        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Open);

        let result = succeed(&cb).await;
        assert_eq!(result, Err(CircuitError::Open));
    }

    #[tokio::test]
    async fn test_volume_threshold_prevents_early_trip() {
        let (_clock, cb) = guard(settings());

        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_old_outcomes_leave_rolling_window() {
        let (clock, cb) = guard(settings());

        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        clock.advance(ChronoDuration::seconds(11));

        // 이전 실패는 윈도우 밖이므로 새 실패 1건으로는 열리지 않음
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().calls_in_window, 1);
    }

    #[tokio::test]
    async fn test_half_open_probe_success_closes() {
        let (clock, cb) = guard(settings());
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(ChronoDuration::seconds(29));
        assert_eq!(succeed(&cb).await, Err(CircuitError::Open));

        clock.advance(ChronoDuration::seconds(1));
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().calls_in_window, 0);
    }

    #[tokio::test]
    async fn test_half_open_probe_failure_reopens_and_restarts_cooldown() {
        let (clock, cb) = guard(settings());
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }

        clock.advance(ChronoDuration::seconds(30));
        assert!(matches!(fail(&cb).await, Err(CircuitError::Failed(_))));
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(ChronoDuration::seconds(10));
        assert_eq!(succeed(&cb).await, Err(CircuitError::Open));

        clock.advance(ChronoDuration::seconds(20));
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let (_clock, cb) = guard(CircuitBreakerSettings {
            volume_threshold: 1,
            ..settings()
        });

        let result = cb
            .call(|| async {
                std::future::pending::<()>().await;
                Ok::<_, StoreError>(())
            })
            .await;

        assert_eq!(result, Err(CircuitError::Timeout(Duration::from_millis(100))));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_listener_receives_transitions() {
        let transitions = Arc::new(AtomicUsize::new(0));
        let counter = transitions.clone();

        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let cb = CircuitGuard::new(settings(), clock.clone())
            .with_listener(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        clock.advance(ChronoDuration::seconds(30));
        succeed(&cb).await.unwrap();

        // Closed → Open, Open → HalfOpen, HalfOpen → Closed
        assert_eq!(transitions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fallback_policy_parse() {
        assert_eq!(FallbackPolicy::parse("fail-closed"), Some(FallbackPolicy::FailClosed));
        assert_eq!(FallbackPolicy::parse("FAIL_OPEN"), Some(FallbackPolicy::FailOpen));
        assert_eq!(FallbackPolicy::parse("maybe"), None);
        assert!(FallbackPolicy::FailClosed.treat_as_revoked());
        assert!(!FallbackPolicy::FailOpen.treat_as_revoked());
    }
}
