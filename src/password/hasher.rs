//! 密码哈希实现
//!
//! 提供密码哈希和验证的核心功能。

#[cfg(feature = "argon2")]
use argon2::Argon2;

#[cfg(feature = "argon2")]
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};

use crate::error::{Error, PasswordHashError, Result};

/// 支持的哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Argon2id - 推荐的默认算法
    #[cfg(feature = "argon2")]
    Argon2id,

    /// bcrypt - 经典算法，广泛支持
    #[cfg(feature = "bcrypt")]
    Bcrypt,
}

// 编译时检查：至少需要启用一个密码哈希算法
#[cfg(not(any(feature = "argon2", feature = "bcrypt")))]
compile_error!(
    "At least one password hashing algorithm (argon2 or bcrypt) must be enabled. Enable one of the password hashing features."
);

#[allow(clippy::derivable_impls)]
impl Default for Algorithm {
    fn default() -> Self {
        #[cfg(feature = "argon2")]
        {
            Algorithm::Argon2id
        }
        #[cfg(all(not(feature = "argon2"), feature = "bcrypt"))]
        {
            Algorithm::Bcrypt
        }
    }
}

/// 密码哈希器配置
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    /// 使用的哈希算法
    algorithm: Algorithm,

    /// bcrypt 的 cost 参数 (4-31, 默认 12)
    #[cfg(feature = "bcrypt")]
    bcrypt_cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            #[cfg(feature = "bcrypt")]
            bcrypt_cost: 12,
        }
    }
}

impl PasswordHasher {
    /// 创建新的密码哈希器
    ///
    /// # Arguments
    ///
    /// * `algorithm` - 要使用的哈希算法
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            #[cfg(feature = "bcrypt")]
            bcrypt_cost: 12,
        }
    }

    /// 设置 bcrypt 的 cost 参数
    ///
    /// # Panics
    ///
    /// 如果 cost 不在 4-31 范围内会 panic
    #[cfg(feature = "bcrypt")]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        assert!(
            (4..=31).contains(&cost),
            "bcrypt cost must be between 4 and 31"
        );
        self.bcrypt_cost = cost;
        self
    }

    /// 哈希密码
    ///
    /// # Example
    ///
    /// ```rust
    /// use oauthrs::password::PasswordHasher;
    ///
    /// let hasher = PasswordHasher::default();
    /// let hash = hasher.hash("my_password").unwrap();
    /// # #[cfg(feature = "argon2")]
    /// assert!(hash.starts_with("$argon2"));
    /// ```
    pub fn hash(&self, password: &str) -> Result<String> {
        match self.algorithm {
            #[cfg(feature = "argon2")]
            Algorithm::Argon2id => self.hash_argon2(password),
            #[cfg(feature = "bcrypt")]
            Algorithm::Bcrypt => self.hash_bcrypt(password),
        }
    }

    /// 验证密码
    ///
    /// 根据存储的哈希格式自动选择验证算法。
    ///
    /// # Returns
    ///
    /// 如果密码正确返回 `Ok(true)`，密码错误返回 `Ok(false)`
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        // 自动检测哈希格式
        #[cfg(feature = "argon2")]
        if hash.starts_with("$argon2") {
            return self.verify_argon2(password, hash);
        }
        #[cfg(feature = "bcrypt")]
        if hash.starts_with("$2") {
            return self.verify_bcrypt(password, hash);
        }
        Err(Error::PasswordHash(PasswordHashError::InvalidFormat(
            "unknown hash format".to_string(),
        )))
    }

    // ========================================================================
    // Argon2 实现
    // ========================================================================

    #[cfg(feature = "argon2")]
    fn hash_argon2(&self, password: &str) -> Result<String> {
        let salt_bytes = crate::random::generate_random_bytes(16)?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| {
            Error::PasswordHash(PasswordHashError::HashFailed(format!(
                "Failed to encode salt: {}",
                e
            )))
        })?;
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| {
                Error::PasswordHash(PasswordHashError::HashFailed(format!(
                    "Argon2 hash failed: {}",
                    e
                )))
            })
    }

    #[cfg(feature = "argon2")]
    fn verify_argon2(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            Error::PasswordHash(PasswordHashError::InvalidFormat(format!(
                "invalid Argon2 hash: {}",
                e
            )))
        })?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    // ========================================================================
    // bcrypt 实现
    // ========================================================================

    #[cfg(feature = "bcrypt")]
    fn hash_bcrypt(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.bcrypt_cost).map_err(|e| {
            Error::PasswordHash(PasswordHashError::HashFailed(format!(
                "bcrypt hash failed: {}",
                e
            )))
        })
    }

    #[cfg(feature = "bcrypt")]
    fn verify_bcrypt(&self, password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash).map_err(|e| {
            Error::PasswordHash(PasswordHashError::InvalidFormat(format!(
                "bcrypt verify failed: {}",
                e
            )))
        })
    }
}

// ============================================================================
// 便捷函数
// ============================================================================

/// 使用默认算法哈希密码
///
/// # Example
///
/// ```rust
/// use oauthrs::password::hash_password;
///
/// let hash = hash_password("my_secure_password").unwrap();
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    PasswordHasher::default().hash(password)
}

/// 使用默认哈希器验证密码
///
/// # Example
///
/// ```rust
/// use oauthrs::password::{hash_password, verify_password};
///
/// let hash = hash_password("my_password").unwrap();
/// assert!(verify_password("my_password", &hash).unwrap());
/// assert!(!verify_password("wrong_password", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    PasswordHasher::default().verify(password, hash)
}
