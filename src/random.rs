//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于生成各类凭证标识符与客户端密钥。
//! 所有凭证都是不透明的随机标识符，有效性完全由存储查询决定。

use rand::{Rng, TryRngCore, distr::Alphanumeric, rngs::OsRng};
use uuid::Uuid;

use crate::error::{CryptoError, Error, Result};

/// 授权码、访问令牌与刷新令牌标识符的长度（字符数）
pub const OPAQUE_TOKEN_LENGTH: usize = 40;

/// 会话刷新令牌的长度（字符数）
pub const SESSION_TOKEN_LENGTH: usize = 64;

/// 生成的客户端密钥长度（字符数）
pub const CLIENT_SECRET_LENGTH: usize = 40;

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Arguments
///
/// * `length` - 要生成的字节数
///
/// # Example
///
/// ```rust
/// use oauthrs::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(32).unwrap();
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成指定长度的十六进制随机字符串
///
/// # Arguments
///
/// * `byte_length` - 要生成的字节数（最终字符串长度为字节数的两倍）
pub fn generate_random_hex(byte_length: usize) -> Result<String> {
    let bytes = generate_random_bytes(byte_length)?;
    Ok(hex_encode(&bytes))
}

/// 生成指定长度的 Base64 URL 安全随机字符串
///
/// 使用 URL 安全的 Base64 编码（不含填充），可直接用于 URL 参数。
///
/// # Arguments
///
/// * `byte_length` - 要生成的字节数
pub fn generate_random_base64_url(byte_length: usize) -> Result<String> {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    let bytes = generate_random_bytes(byte_length)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// 生成指定长度的字母数字随机字符串
///
/// 只包含 a-z, A-Z, 0-9 字符
///
/// # Example
///
/// ```rust
/// use oauthrs::random::generate_random_alphanumeric;
///
/// let token = generate_random_alphanumeric(24).unwrap();
/// assert_eq!(token.len(), 24);
/// assert!(token.chars().all(|c| c.is_alphanumeric()));
/// ```
pub fn generate_random_alphanumeric(length: usize) -> Result<String> {
    let token: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Ok(token)
}

/// 生成不透明凭证标识符
///
/// 用作授权码、访问令牌与刷新令牌的 id，40 个字母数字字符。
///
/// # Example
///
/// ```rust
/// use oauthrs::random::generate_opaque_token;
///
/// let id = generate_opaque_token().unwrap();
/// assert_eq!(id.len(), 40);
/// ```
pub fn generate_opaque_token() -> Result<String> {
    generate_random_alphanumeric(OPAQUE_TOKEN_LENGTH)
}

/// 生成会话刷新令牌
///
/// 第一方登录流程使用的持有者会话令牌，64 个字母数字字符。
pub fn generate_session_token() -> Result<String> {
    generate_random_alphanumeric(SESSION_TOKEN_LENGTH)
}

/// 生成 UUID v4 标识符
///
/// 用作客户端与用户的 ID，全局唯一且不可预测。
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// 生成客户端密钥
///
/// 40 个字母数字字符，提供足够的熵。明文仅在创建时返回一次，
/// 存储中只保留其哈希。
pub fn generate_client_secret() -> Result<String> {
    generate_random_alphanumeric(CLIENT_SECRET_LENGTH)
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 将字节数组编码为十六进制字符串
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击
///
/// # Example
///
/// ```rust
/// use oauthrs::random::constant_time_compare;
///
/// let a = b"secret_token";
/// let b = b"secret_token";
/// assert!(constant_time_compare(a, b));
///
/// let c = b"other_token!";
/// assert!(!constant_time_compare(a, c));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_bytes() {
        let bytes = generate_random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);

        // 确保生成的是随机的（两次生成不应相同）
        let bytes2 = generate_random_bytes(32).unwrap();
        assert_ne!(bytes, bytes2);
    }

    #[test]
    fn test_generate_random_hex() {
        let hex = generate_random_hex(16).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_random_base64_url() {
        let token = generate_random_base64_url(32).unwrap();

        // URL 安全的 base64 不应包含 + 或 /
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_generate_opaque_token() {
        let token = generate_opaque_token().unwrap();
        assert_eq!(token.len(), OPAQUE_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_generate_session_token() {
        let token = generate_session_token().unwrap();
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
    }

    #[test]
    fn test_generate_uuid_unique() {
        let ids: HashSet<_> = (0..100).map(|_| generate_uuid()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_generate_client_secret() {
        let secret = generate_client_secret().unwrap();
        assert_eq!(secret.len(), CLIENT_SECRET_LENGTH);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"hello", b"hell"));
    }

    #[test]
    fn test_constant_time_compare_str() {
        assert!(constant_time_compare_str("secret", "secret"));
        assert!(!constant_time_compare_str("secret", "Secret"));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }
}
