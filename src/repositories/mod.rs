//! 데이터 액세스 계층을 담당하는 리포지토리 모듈
//!
//! 저장소 구현([`crate::caching::KeyValueStore`])을 주입받아 도메인 단위의 읽기/쓰기를 제공합니다.
//! 싱글톤 대신 컴포지션 루트에서 생성한 인스턴스를 `Arc`로 공유합니다.

pub mod tokens;
