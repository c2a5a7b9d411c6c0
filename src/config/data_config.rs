//! # 실행 환경 및 인프라 설정
//!
//! 실행 환경(프로필), HTTP 서버 바인딩, Redis 연결, Rate Limiting 설정을 제공합니다.

use std::env;
use crate::config::auth_config::{env_lookup, Lookup};

/// 실행 환경
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// `ENVIRONMENT` (없으면 `PROFILE`) 환경 변수로 현재 환경을 결정합니다.
    ///
    /// 값이 없거나 알 수 없는 값이면 가장 엄격한 `Production`으로 취급합니다.
    pub fn current() -> Self {
        let raw = env::var("ENVIRONMENT")
            .or_else(|_| env::var("PROFILE"))
            .unwrap_or_else(|_| "production".to_string());
        Self::from_str(&raw)
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" | "testing" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Production,
        }
    }
}

pub struct ServerConfig;

impl ServerConfig {
    pub fn port() -> u16 {
        env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080)
    }

    pub fn host() -> String {
        env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
    }

    pub fn bind_address() -> String {
        format!("{}:{}", Self::host(), Self::port())
    }
}

pub struct RedisConfig;

impl RedisConfig {
    pub const DEFAULT_URL: &'static str = "redis://localhost:6379";

    /// 블랙리스트 저장소 연결 URI
    pub fn url() -> String {
        Self::url_from(&env_lookup)
    }

    pub fn url_from(lookup: Lookup<'_>) -> String {
        lookup("REDIS_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string())
    }
}

/// Rate Limiting 설정 구조체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitConfig {
    /// 환경 변수에서 Rate Limiting 설정을 로드합니다.
    ///
    /// * `RATE_LIMIT_PER_SECOND` - 초당 허용 요청 수 (기본값: 100)
    /// * `RATE_LIMIT_BURST_SIZE` - 버스트 허용량 (기본값: 200)
    ///
    /// 파싱에 실패하면 에러를 기록하고 기본값을 사용합니다.
    pub fn load() -> Self {
        Self::load_from(&env_lookup)
    }

    pub fn load_from(lookup: Lookup<'_>) -> Self {
        let per_second = lookup("RATE_LIMIT_PER_SECOND")
            .map(|raw| {
                raw.parse::<u64>().unwrap_or_else(|e| {
                    log::error!("RATE_LIMIT_PER_SECOND 파싱 실패: {}. 기본값 100 사용", e);
                    100
                })
            })
            .unwrap_or(100);

        let burst_size = lookup("RATE_LIMIT_BURST_SIZE")
            .map(|raw| {
                raw.parse::<u32>().unwrap_or_else(|e| {
                    log::error!("RATE_LIMIT_BURST_SIZE 파싱 실패: {}. 기본값 200 사용", e);
                    200
                })
            })
            .unwrap_or(200);

        Self {
            per_second,
            burst_size,
        }
    }
}
