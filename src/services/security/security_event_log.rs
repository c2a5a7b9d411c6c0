//! 보안 이벤트 기록
//!
//! 인증 관련 이벤트를 구조화된 한 줄 로그로 남깁니다. 외부 모니터링 도구가
//! `security` 타깃을 수집합니다. 기록은 호출자를 막거나 실패시키지 않습니다.
//!
//! 이벤트 속성에는 원본 토큰이나 서명 키를 넣지 않습니다. 토큰은 지문으로만 식별합니다.

use std::fmt;
use std::sync::Arc;
use parking_lot::Mutex;
use crate::domain::models::token::token::{RevocationReason, TokenType};
use crate::resilience::CircuitState;
use crate::services::security::brute_force::BruteForceDetector;

/// 로그 타깃
pub const SECURITY_LOG_TARGET: &str = "security";

#[derive(Debug, Clone, PartialEq)]
pub enum SecurityEvent {
    TokenIssued {
        subject: String,
        access_jti: String,
        refresh_jti: String,
    },
    TokenRevoked {
        subject: String,
        jti: String,
        reason: RevocationReason,
        /// 영구 저장소 기록 여부 (로컬 캐시에만 남았으면 false)
        persisted: bool,
    },
    ValidationFailed {
        /// [`crate::errors::TokenError::code`]
        reason: &'static str,
        token_type: TokenType,
        fingerprint: String,
        subject: Option<String>,
    },
    RepeatedFailureDetected {
        key: String,
        failures: u32,
    },
    RotationCompleted {
        subject: String,
        old_jti: String,
        new_refresh_jti: String,
    },
    CircuitStateChanged {
        from: CircuitState,
        to: CircuitState,
    },
}

impl SecurityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityEvent::TokenIssued { .. } => "token_issued",
            SecurityEvent::TokenRevoked { .. } => "token_revoked",
            SecurityEvent::ValidationFailed { .. } => "validation_failed",
            SecurityEvent::RepeatedFailureDetected { .. } => "repeated_failure_detected",
            SecurityEvent::RotationCompleted { .. } => "rotation_completed",
            SecurityEvent::CircuitStateChanged { .. } => "circuit_state_changed",
        }
    }

    fn level(&self) -> log::Level {
        match self {
            SecurityEvent::ValidationFailed { .. } | SecurityEvent::RepeatedFailureDetected { .. } => {
                log::Level::Warn
            }
            SecurityEvent::CircuitStateChanged { to, .. } if *to == CircuitState::Open => log::Level::Warn,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event={}", self.kind())?;
        match self {
            SecurityEvent::TokenIssued {
                subject,
                access_jti,
                refresh_jti,
            } => write!(f, " subject={} access_jti={} refresh_jti={}", subject, access_jti, refresh_jti),
            SecurityEvent::TokenRevoked {
                subject,
                jti,
                reason,
                persisted,
            } => write!(
                f,
                " subject={} jti={} reason={} persisted={}",
                subject,
                jti,
                reason.as_str(),
                persisted
            ),
            SecurityEvent::ValidationFailed {
                reason,
                token_type,
                fingerprint,
                subject,
            } => {
                write!(f, " reason={} token_type={} fingerprint={}", reason, token_type, fingerprint)?;
                if let Some(subject) = subject {
                    write!(f, " subject={}", subject)?;
                }
                Ok(())
            }
            SecurityEvent::RepeatedFailureDetected { key, failures } => {
                write!(f, " key={} failures={}", key, failures)
            }
            SecurityEvent::RotationCompleted {
                subject,
                old_jti,
                new_refresh_jti,
            } => write!(f, " subject={} old_jti={} new_refresh_jti={}", subject, old_jti, new_refresh_jti),
            SecurityEvent::CircuitStateChanged { from, to } => write!(f, " from={} to={}", from, to),
        }
    }
}

pub trait SecurityEventLog: Send + Sync {
    fn record(&self, event: SecurityEvent);
}

/// 검증 실패 이벤트의 반복 탐지 키
///
/// 주체를 알면 주체, 모르면 토큰 지문을 사용합니다.
pub fn failure_key(event: &SecurityEvent) -> Option<String> {
    match event {
        SecurityEvent::ValidationFailed {
            subject: Some(subject),
            ..
        } => Some(format!("sub:{}", subject)),
        SecurityEvent::ValidationFailed { fingerprint, .. } => Some(format!("fp:{}", fingerprint)),
        _ => None,
    }
}

/// `log` 크레이트로 기록하는 기본 구현
pub struct LogSecurityEventLog {
    detector: Option<Arc<dyn BruteForceDetector>>,
}

impl LogSecurityEventLog {
    pub fn new() -> Self {
        Self { detector: None }
    }

    pub fn with_detector(detector: Arc<dyn BruteForceDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }
}

impl Default for LogSecurityEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityEventLog for LogSecurityEventLog {
    fn record(&self, event: SecurityEvent) {
        log::log!(target: SECURITY_LOG_TARGET, event.level(), "{}", event);

        if let (Some(detector), Some(key)) = (&self.detector, failure_key(&event)) {
            if let Some(failures) = detector.register_failure(&key) {
                let repeated = SecurityEvent::RepeatedFailureDetected { key, failures };
                log::log!(target: SECURITY_LOG_TARGET, repeated.level(), "{}", repeated);
            }
        }
    }
}

/// 이벤트를 메모리에 보관하는 구현
///
/// 프로세스 내부 모니터링이나 테스트에서 기록된 이벤트를 확인할 때 사용합니다.
#[derive(Default)]
pub struct MemorySecurityEventLog {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemorySecurityEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SecurityEvent::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

impl SecurityEventLog for MemorySecurityEventLog {
    fn record(&self, event: SecurityEvent) {
        self.events.lock().push(event);
    }
}
