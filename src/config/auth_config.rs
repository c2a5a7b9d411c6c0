//! # 인증 관련 설정
//!
//! JWT 서명 키, 토큰 수명, 발급자/대상, 서킷 브레이커 및 블랙리스트 관련 설정을
//! 환경 변수에서 읽어 타입이 있는 구조체로 제공합니다.
//!
//! 모든 설정은 애플리케이션 시작 시 한 번 로드되어 검증되며,
//! 필수 값이 없거나 잘못된 경우 [`ConfigError`]로 시작을 중단합니다.
//!
//! ## 환경 변수
//!
//! ```bash
//! JWT_SECRET=...                  # 필수, 액세스 토큰 서명 키
//! JWT_REFRESH_SECRET=...          # 필수, 리프레시 토큰 서명 키 (JWT_SECRET과 달라야 함)
//! JWT_EXPIRE=15m                  # 액세스 토큰 수명
//! JWT_REFRESH_EXPIRE=7d           # 리프레시 토큰 수명
//! JWT_ISSUER=marketplace-api
//! JWT_AUDIENCE=marketplace-client
//! JWT_CLOCK_SKEW_SECONDS=30
//!
//! CIRCUIT_TIMEOUT_MS=2000
//! CIRCUIT_ERROR_THRESHOLD=50      # 퍼센트
//! CIRCUIT_RESET_TIMEOUT_MS=30000
//! CIRCUIT_ROLLING_WINDOW_MS=10000
//! CIRCUIT_VOLUME_THRESHOLD=5
//! REVOCATION_FALLBACK=fail-closed # 또는 fail-open
//! ```
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use crate::config::{JwtConfig, Environment};
//!
//! let jwt = JwtConfig::from_env(&Environment::current())?;
//! println!("access ttl: {}s", jwt.access_ttl.num_seconds());
//! ```

use std::env;
use std::time::Duration as StdDuration;
use chrono::Duration;
use crate::config::data_config::Environment;
use crate::errors::ConfigError;
use crate::resilience::FallbackPolicy;

/// 운영 환경에서 요구하는 최소 서명 키 길이 (바이트)
pub const MIN_SECRET_LENGTH: usize = 32;

/// 환경 변수 조회 함수
///
/// 테스트에서는 `HashMap` 기반 조회 함수를 주입합니다.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// 프로세스 환경 변수를 조회합니다. 빈 문자열은 미설정으로 취급합니다.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `15m`, `7d`, `3600`, `30s`, `12h` 형식의 기간 문자열을 파싱합니다.
///
/// 단위가 없으면 초로 해석합니다. 0 이하의 기간이나 표현 범위를 넘는 기간은 허용하지 않습니다.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }

    let (number, unit) = match trimmed.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, "s"),
    };

    let amount: i64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{}'", value))?;
    if amount <= 0 {
        return Err(format!("duration must be positive: '{}'", value));
    }

    let duration = match unit.trim() {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => return Err(format!("unknown duration unit '{}'", other)),
    };

    duration.ok_or_else(|| format!("duration out of range: '{}'", value))
}

fn parse_number<T: std::str::FromStr>(
    lookup: Lookup<'_>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a valid number", raw),
        }),
        None => Ok(default),
    }
}

/// JWT 발급/검증 설정
#[derive(Clone)]
pub struct JwtConfig {
    /// 액세스 토큰 서명 키
    pub access_secret: String,
    /// 리프레시 토큰 서명 키
    pub refresh_secret: String,
    /// 액세스 토큰 수명
    pub access_ttl: Duration,
    /// 리프레시 토큰 수명
    pub refresh_ttl: Duration,
    /// `iss` 클레임
    pub issuer: String,
    /// `aud` 클레임
    pub audience: String,
    /// `iat` 미래 허용 오차 (초)
    pub clock_skew_seconds: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .finish()
    }
}

impl JwtConfig {
    pub const DEFAULT_ACCESS_TTL: &'static str = "15m";
    pub const DEFAULT_REFRESH_TTL: &'static str = "7d";
    pub const DEFAULT_ISSUER: &'static str = "marketplace-api";
    pub const DEFAULT_AUDIENCE: &'static str = "marketplace-client";
    pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 30;

    /// 프로세스 환경 변수에서 설정을 로드합니다.
    pub fn from_env(environment: &Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup, environment)
    }

    /// 주어진 조회 함수로 설정을 로드하고 검증합니다.
    ///
    /// # Errors
    ///
    /// * `ConfigError::Missing` - `JWT_SECRET` 또는 `JWT_REFRESH_SECRET` 누락
    /// * `ConfigError::SecretsNotDistinct` - 두 키가 동일
    /// * `ConfigError::Invalid` - 기간 형식 오류, 운영 환경의 짧은 키
    pub fn from_lookup(lookup: Lookup<'_>, environment: &Environment) -> Result<Self, ConfigError> {
        let access_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let refresh_secret =
            lookup("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;

        if access_secret == refresh_secret {
            return Err(ConfigError::SecretsNotDistinct);
        }

        for (key, secret) in [("JWT_SECRET", &access_secret), ("JWT_REFRESH_SECRET", &refresh_secret)] {
            if secret.len() < MIN_SECRET_LENGTH {
                if *environment == Environment::Production {
                    return Err(ConfigError::Invalid {
                        key,
                        reason: format!("must be at least {} bytes in production", MIN_SECRET_LENGTH),
                    });
                }
                log::warn!("{}의 길이가 {}바이트 미만입니다 (운영 환경에서는 거부됨)", key, MIN_SECRET_LENGTH);
            }
        }

        let duration = |key: &'static str, default: &str| -> Result<Duration, ConfigError> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            parse_duration(&raw).map_err(|reason| ConfigError::Invalid { key, reason })
        };

        let access_ttl = duration("JWT_EXPIRE", Self::DEFAULT_ACCESS_TTL)?;
        let refresh_ttl = duration("JWT_REFRESH_EXPIRE", Self::DEFAULT_REFRESH_TTL)?;

        if refresh_ttl <= access_ttl {
            log::warn!(
                "리프레시 토큰 수명({}초)이 액세스 토큰 수명({}초)보다 짧거나 같습니다",
                refresh_ttl.num_seconds(),
                access_ttl.num_seconds()
            );
        }

        let clock_skew_seconds =
            parse_number(lookup, "JWT_CLOCK_SKEW_SECONDS", Self::DEFAULT_CLOCK_SKEW_SECONDS)?;
        if clock_skew_seconds < 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_CLOCK_SKEW_SECONDS",
                reason: "must not be negative".to_string(),
            });
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| Self::DEFAULT_ISSUER.to_string()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| Self::DEFAULT_AUDIENCE.to_string()),
            clock_skew_seconds,
        })
    }
}

/// 블랙리스트 저장소 서킷 브레이커 설정
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerSettings {
    /// 호출당 제한 시간
    pub timeout: StdDuration,
    /// 서킷을 여는 에러율 (0.0 - 1.0)
    pub error_threshold: f64,
    /// Open 상태 유지 시간 (쿨다운)
    pub reset_timeout: StdDuration,
    /// 에러율 계산용 롤링 윈도우
    pub rolling_window: StdDuration,
    /// 에러율 평가를 시작하기 위한 윈도우 내 최소 호출 수
    pub volume_threshold: usize,
    /// 서킷이 열렸을 때의 폐기 여부 판단 정책
    pub fallback: FallbackPolicy,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            timeout: StdDuration::from_millis(2000),
            error_threshold: 0.5,
            reset_timeout: StdDuration::from_millis(30_000),
            rolling_window: StdDuration::from_millis(10_000),
            volume_threshold: 5,
            fallback: FallbackPolicy::FailClosed,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let threshold_percent: u32 = parse_number(lookup, "CIRCUIT_ERROR_THRESHOLD", 50)?;
        if threshold_percent == 0 || threshold_percent > 100 {
            return Err(ConfigError::Invalid {
                key: "CIRCUIT_ERROR_THRESHOLD",
                reason: "must be between 1 and 100".to_string(),
            });
        }

        let fallback = match lookup("REVOCATION_FALLBACK") {
            Some(raw) => FallbackPolicy::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "REVOCATION_FALLBACK",
                reason: format!("'{}' is neither fail-closed nor fail-open", raw),
            })?,
            None => defaults.fallback,
        };

        Ok(Self {
            timeout: StdDuration::from_millis(parse_number(lookup, "CIRCUIT_TIMEOUT_MS", 2000)?),
            error_threshold: f64::from(threshold_percent) / 100.0,
            reset_timeout: StdDuration::from_millis(parse_number(
                lookup,
                "CIRCUIT_RESET_TIMEOUT_MS",
                30_000,
            )?),
            rolling_window: StdDuration::from_millis(parse_number(
                lookup,
                "CIRCUIT_ROLLING_WINDOW_MS",
                10_000,
            )?),
            volume_threshold: parse_number(lookup, "CIRCUIT_VOLUME_THRESHOLD", defaults.volume_threshold)?,
            fallback,
        })
    }
}

/// 블랙리스트 로컬 캐시 및 정리 주기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationSettings {
    /// 로컬 폴백 캐시 최대 항목 수
    pub cache_capacity: usize,
    /// 만료 항목 정리 주기 (초)
    pub cleanup_interval_secs: u64,
}

impl RevocationSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            cache_capacity: parse_number(lookup, "REVOCATION_CACHE_CAPACITY", 10_000)?,
            cleanup_interval_secs: parse_number(lookup, "REVOCATION_CLEANUP_INTERVAL_SECS", 300)?,
        })
    }
}

/// 반복 실패(무차별 대입) 탐지 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BruteForceSettings {
    /// 윈도우 내 허용 실패 횟수
    pub max_failures: u32,
    /// 탐지 윈도우 (초)
    pub window_secs: i64,
}

impl BruteForceSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_failures: parse_number(lookup, "BRUTE_FORCE_MAX_FAILURES", 5)?,
            window_secs: parse_number(lookup, "BRUTE_FORCE_WINDOW_SECS", 60)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const ACCESS: &str = "access-secret-access-secret-access-secret";
    const REFRESH: &str = "refresh-secret-refresh-secret-refresh-secret";

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_duration("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_duration("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_duration("3600").unwrap(), Duration::seconds(3600));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_out_of_range() {
        assert!(parse_duration("9999999999999999d").is_err());
        assert!(parse_duration("9999999999999999h").is_err());
        assert!(parse_duration("9223372036854775807s").is_err());

        let lookup = lookup_from(&[
            ("JWT_SECRET", ACCESS),
            ("JWT_REFRESH_SECRET", REFRESH),
            ("JWT_REFRESH_EXPIRE", "9999999999999999d"),
        ]);
        let err = JwtConfig::from_lookup(&lookup, &Environment::Production).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_REFRESH_EXPIRE", .. }));
    }

    #[test]
    fn test_jwt_config_defaults() {
        let lookup = lookup_from(&[("JWT_SECRET", ACCESS), ("JWT_REFRESH_SECRET", REFRESH)]);
        let config = JwtConfig::from_lookup(&lookup, &Environment::Production).unwrap();

        assert_eq!(config.access_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_ttl, Duration::days(7));
        assert_eq!(config.issuer, JwtConfig::DEFAULT_ISSUER);
        assert_eq!(config.audience, JwtConfig::DEFAULT_AUDIENCE);
        assert_eq!(config.clock_skew_seconds, 30);
    }

    #[test]
    fn test_jwt_config_requires_both_secrets() {
        let lookup = lookup_from(&[("JWT_SECRET", ACCESS)]);
        assert_eq!(
            JwtConfig::from_lookup(&lookup, &Environment::Development).unwrap_err(),
            ConfigError::Missing("JWT_REFRESH_SECRET")
        );

        let lookup = lookup_from(&[("JWT_REFRESH_SECRET", REFRESH)]);
        assert_eq!(
            JwtConfig::from_lookup(&lookup, &Environment::Development).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_jwt_config_rejects_identical_secrets() {
        let lookup = lookup_from(&[("JWT_SECRET", ACCESS), ("JWT_REFRESH_SECRET", ACCESS)]);
        assert_eq!(
            JwtConfig::from_lookup(&lookup, &Environment::Development).unwrap_err(),
            ConfigError::SecretsNotDistinct
        );
    }

    #[test]
    fn test_short_secret_only_fatal_in_production() {
        let lookup = lookup_from(&[("JWT_SECRET", "short"), ("JWT_REFRESH_SECRET", "short-2")]);
        assert!(JwtConfig::from_lookup(&lookup, &Environment::Development).is_ok());
        assert!(matches!(
            JwtConfig::from_lookup(&lookup, &Environment::Production),
            Err(ConfigError::Invalid { key: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn test_jwt_config_invalid_duration() {
        let lookup = lookup_from(&[
            ("JWT_SECRET", ACCESS),
            ("JWT_REFRESH_SECRET", REFRESH),
            ("JWT_EXPIRE", "soon"),
        ]);
        assert!(matches!(
            JwtConfig::from_lookup(&lookup, &Environment::Development),
            Err(ConfigError::Invalid { key: "JWT_EXPIRE", .. })
        ));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let lookup = lookup_from(&[("JWT_SECRET", ACCESS), ("JWT_REFRESH_SECRET", REFRESH)]);
        let config = JwtConfig::from_lookup(&lookup, &Environment::Development).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains(ACCESS));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_circuit_settings_from_lookup() {
        let lookup = lookup_from(&[
            ("CIRCUIT_TIMEOUT_MS", "500"),
            ("CIRCUIT_ERROR_THRESHOLD", "20"),
            ("REVOCATION_FALLBACK", "fail-open"),
        ]);
        let settings = CircuitBreakerSettings::from_lookup(&lookup).unwrap();

        assert_eq!(settings.timeout, StdDuration::from_millis(500));
        assert!((settings.error_threshold - 0.2).abs() < f64::EPSILON);
        assert_eq!(settings.fallback, FallbackPolicy::FailOpen);
        assert_eq!(settings.rolling_window, StdDuration::from_millis(10_000));
    }

    #[test]
    fn test_circuit_settings_reject_bad_values() {
        let lookup = lookup_from(&[("CIRCUIT_ERROR_THRESHOLD", "150")]);
        assert!(CircuitBreakerSettings::from_lookup(&lookup).is_err());

        let lookup = lookup_from(&[("REVOCATION_FALLBACK", "sometimes")]);
        assert!(CircuitBreakerSettings::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_revocation_and_brute_force_defaults() {
        let lookup = lookup_from(&[]);
        let revocation = RevocationSettings::from_lookup(&lookup).unwrap();
        assert_eq!(revocation.cache_capacity, 10_000);
        assert_eq!(revocation.cleanup_interval_secs, 300);

        let brute_force = BruteForceSettings::from_lookup(&lookup).unwrap();
        assert_eq!(brute_force.max_failures, 5);
        assert_eq!(brute_force.window_secs, 60);
    }
}
