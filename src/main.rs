//! 토큰 생명주기 백엔드 메인 애플리케이션
//!
//! 설정을 로드하고 모든 구성 요소를 명시적으로 조립한 뒤 Actix-web HTTP 서버를 구동합니다.
//! 서명 키가 없거나 잘못 설정되어 있으면 서버를 띄우지 않고 종료합니다.

use std::io;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use token_lifecycle_backend::caching::{KeyValueStore, RedisClient};
use token_lifecycle_backend::config::{
    BruteForceSettings, CircuitBreakerSettings, Environment, JwtConfig, RateLimitConfig, RedisConfig,
    RevocationSettings, ServerConfig,
};
use token_lifecycle_backend::core::clock::{Clock, SystemClock};
use token_lifecycle_backend::resilience::CircuitGuard;
use token_lifecycle_backend::routes::configure_all_routes;
use token_lifecycle_backend::services::auth::TokenLifecycleService;
use token_lifecycle_backend::services::security::{
    LogSecurityEventLog, SecurityEvent, SecurityEventLog, ThresholdBruteForceDetector,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 환경 설정 및 로깅 초기화
    load_env_file();
    init_logging();

    info!("🚀 토큰 생명주기 서비스 시작중...");

    let (service, cleanup_interval_secs) = build_token_service().await.map_err(|e| {
        error!("❌ 서비스 초기화 실패: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;

    info!("✅ 모든 구성 요소가 성공적으로 초기화되었습니다!");

    spawn_cleanup_task(service.clone(), cleanup_interval_secs);

    start_http_server(service).await
}

/// 설정을 로드하고 토큰 생명주기 서비스를 조립합니다
///
/// 서비스와 블랙리스트 정리 주기(초)를 반환합니다.
///
/// # Errors
///
/// * 서명 키 누락/중복/짧은 키 (설정 에러)
/// * Redis 연결 실패
async fn build_token_service() -> Result<(web::Data<TokenLifecycleService>, u64), String> {
    let environment = Environment::current();
    info!("실행 환경: {:?}", environment);

    let jwt = JwtConfig::from_env(&environment).map_err(|e| e.to_string())?;
    let circuit_settings = CircuitBreakerSettings::from_env().map_err(|e| e.to_string())?;
    let revocation = RevocationSettings::from_env().map_err(|e| e.to_string())?;
    let brute_force = BruteForceSettings::from_env().map_err(|e| e.to_string())?;

    info!("JWT 설정 로드됨: {:?}", jwt);
    info!(
        "블랙리스트 폴백 정책: {}, 호출 제한 시간: {:?}",
        circuit_settings.fallback.as_str(),
        circuit_settings.timeout
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!("📡 Redis 연결 중...");
    let redis_url = RedisConfig::url();
    let redis: Arc<dyn KeyValueStore> = Arc::new(
        RedisClient::connect(&redis_url)
            .await
            .map_err(|e| format!("Redis 연결 실패: {}", e))?,
    );
    info!("✅ Redis 연결 성공");

    let detector = Arc::new(ThresholdBruteForceDetector::new(brute_force, clock.clone()));
    let events: Arc<dyn SecurityEventLog> = Arc::new(LogSecurityEventLog::with_detector(detector));

    let circuit_events = events.clone();
    let circuit = Arc::new(
        CircuitGuard::new(circuit_settings, clock.clone()).with_listener(move |from, to| {
            circuit_events.record(SecurityEvent::CircuitStateChanged { from, to });
        }),
    );

    let service = TokenLifecycleService::from_config(&jwt, &revocation, redis, circuit, events, clock);
    service.ensure_ready().await.map_err(|e| e.to_string())?;

    Ok((web::Data::new(service), revocation.cleanup_interval_secs))
}

/// 만료된 블랙리스트 항목을 주기적으로 정리하는 백그라운드 작업을 시작합니다
///
/// 주기는 `REVOCATION_CLEANUP_INTERVAL_SECS` (기본값: 300초)입니다.
fn spawn_cleanup_task(service: web::Data<TokenLifecycleService>, interval_secs: u64) {
    let interval_secs = interval_secs.max(1);

    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(interval_secs));
        // 첫 tick은 즉시 완료됨
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = service.cleanup_expired().await;
            if removed > 0 {
                info!("🧹 만료된 블랙리스트 항목 {}개 정리", removed);
            }
        }
    });
}

/// HTTP 서버를 구성하고 실행합니다
///
/// Rate Limiting, CORS, 로깅, 경로 정규화 미들웨어를 포함합니다.
///
/// # Errors
///
/// * `std::io::Error` - 포트 바인딩 실패 또는 서버 실행 오류
async fn start_http_server(service: web::Data<TokenLifecycleService>) -> io::Result<()> {
    let bind_address = ServerConfig::bind_address();

    info!("🌐 서버가 http://{} 에서 실행중입니다", bind_address);
    info!("📍 Health check: http://{}/health", bind_address);

    let rate_limit_config = RateLimitConfig::load();
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_second(rate_limit_config.per_second)
        .burst_size(rate_limit_config.burst_size)
        .use_headers()
        .finish()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "잘못된 Rate Limiting 설정"))?;

    info!(
        "🛡️ Rate Limiting 활성화: 초당 {}요청, 버스트 {}개",
        rate_limit_config.per_second,
        rate_limit_config.burst_size
    );

    HttpServer::new(move || {
        App::new()
            // Rate Limiting 미들웨어 (가장 먼저 적용)
            .wrap(Governor::new(&governor_conf))
            .wrap(configure_cors())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(service.clone())
            .configure(configure_all_routes)
    })
        .bind(bind_address)?
        .run()
        .await
}

/// 환경별 설정 파일을 로드합니다
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    match profile.as_str() {
        "prod" => {
            if let Err(e) = dotenv::from_filename(".env.prod") {
                eprintln!(".env.prod 파일 로드 실패: {}", e);
            }
        }
        "dev" => {
            if let Err(e) = dotenv::from_filename(".env.dev") {
                eprintln!(".env.dev 파일 로드 실패: {}", e);
            }
        }
        _ => {
            dotenv().ok();
        }
    }
}

/// 로깅 시스템을 초기화합니다
///
/// * `RUST_LOG` - 로깅 레벨 설정 (기본값: "info,actix_web=debug")
///
/// ```bash
/// # 보안 이벤트만 별도로 확인
/// RUST_LOG=info,security=info cargo run
/// ```
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info,actix_web=debug"));
}

/// CORS 설정을 구성합니다
fn configure_cors() -> Cors {
    Cors::default()
        .allowed_origin("http://localhost:3000")
        .allowed_origin("http://127.0.0.1:3000")
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600)
}
