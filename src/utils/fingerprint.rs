//! # 토큰 지문
//!
//! 로그와 보안 이벤트에는 원본 토큰 대신 SHA-256 해시 앞부분만 남깁니다.

use sha2::{Digest, Sha256};

/// 지문 길이 (16진수 문자 수)
const FINGERPRINT_LEN: usize = 16;

/// 토큰의 SHA-256 해시 앞 16자리를 반환합니다.
///
/// # 예제
/// ```rust,ignore
/// use crate::utils::fingerprint::token_fingerprint;
///
/// let fp = token_fingerprint("eyJhbGciOi...");
/// assert_eq!(fp.len(), 16);
/// ```
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_LEN);
    for byte in digest.iter().take(FINGERPRINT_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}
