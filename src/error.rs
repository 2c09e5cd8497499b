//! 统一错误类型模块
//!
//! 提供 oauthrs 库中所有操作的错误类型定义。

use std::fmt;

/// oauthrs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// oauthrs 库的错误类型
#[derive(Debug)]
pub enum Error {
    /// 密码哈希错误
    PasswordHash(PasswordHashError),

    /// 凭证相关错误
    Token(TokenError),

    /// 认证错误（客户端或资源所有者）
    Auth(AuthError),

    /// 验证错误
    Validation(ValidationError),

    /// 配置错误
    Config(ConfigError),

    /// 存储错误
    Storage(StorageError),

    /// 加密错误
    Crypto(CryptoError),

    /// 内部错误
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(ValidationError::Custom(msg.into()))
    }
}

/// 密码哈希相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    /// 哈希生成失败
    HashFailed(String),
    /// 密码验证失败
    VerifyFailed,
    /// 无效的哈希格式
    InvalidFormat(String),
    /// 算法不支持
    UnsupportedAlgorithm(String),
}

/// 凭证（授权码 / 访问令牌 / 刷新令牌 / 会话令牌）相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// 凭证已过期
    Expired,
    /// 凭证已被撤销
    Revoked,
    /// 凭证不存在
    NotFound,
    /// 凭证无效（不区分具体原因，用于对外统一口径）
    Invalid,
}

/// 认证相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 客户端不存在
    UnknownClient,
    /// 客户端已被撤销
    ClientRevoked,
    /// 客户端密钥错误或缺失
    InvalidClientSecret,
    /// 客户端未被授权使用该授权类型
    GrantNotAllowed,
    /// 资源所有者凭证错误（不区分用户不存在与密码错误）
    InvalidCredentials,
}

/// 验证相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 字段为空
    EmptyField(String),
    /// 字段超长
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    /// 密码太短
    PasswordTooShort { min_length: usize, actual: usize },
    /// 无效的邮箱格式
    InvalidEmail(String),
    /// 无效的重定向 URI
    InvalidRedirectUri(String),
    /// 客户端密钥长度不足
    SecretTooShort { min: usize, actual: usize },
    /// 自定义验证错误
    Custom(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 缺少必需的配置
    MissingRequired(String),
    /// 无效的配置值
    InvalidValue { key: String, message: String },
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 记录未找到
    NotFound(String),
    /// 记录已存在
    AlreadyExists(String),
    /// 操作失败
    OperationFailed(String),
    /// 存储暂时不可用（超时等瞬态故障，只读操作可安全重试）
    Unavailable(String),
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PasswordHash(e) => write!(f, "Password hash error: {}", e),
            Error::Token(e) => write!(f, "Token error: {}", e),
            Error::Auth(e) => write!(f, "Auth error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Storage(e) => write!(f, "Storage error: {}", e),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl fmt::Display for PasswordHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHashError::HashFailed(msg) => write!(f, "hash generation failed: {}", msg),
            PasswordHashError::VerifyFailed => write!(f, "password verification failed"),
            PasswordHashError::InvalidFormat(msg) => write!(f, "invalid hash format: {}", msg),
            PasswordHashError::UnsupportedAlgorithm(alg) => {
                write!(f, "unsupported algorithm: {}", alg)
            }
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Revoked => write!(f, "token has been revoked"),
            TokenError::NotFound => write!(f, "token not found"),
            TokenError::Invalid => write!(f, "token is invalid"),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UnknownClient => write!(f, "client not found"),
            AuthError::ClientRevoked => write!(f, "client has been revoked"),
            AuthError::InvalidClientSecret => write!(f, "invalid client secret"),
            AuthError::GrantNotAllowed => {
                write!(f, "client is not authorized for this grant type")
            }
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "field '{}' cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(
                    f,
                    "field '{}' too long: maximum {} characters, got {}",
                    field, max, actual
                )
            }
            ValidationError::PasswordTooShort { min_length, actual } => {
                write!(
                    f,
                    "password too short: minimum {} characters, got {}",
                    min_length, actual
                )
            }
            ValidationError::InvalidEmail(email) => write!(f, "invalid email format: {}", email),
            ValidationError::InvalidRedirectUri(uri) => {
                write!(f, "invalid redirect URI: {}", uri)
            }
            ValidationError::SecretTooShort { min, actual } => {
                write!(
                    f,
                    "client secret too short: minimum {} characters, got {}",
                    min, actual
                )
            }
            ValidationError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(key) => {
                write!(f, "missing required configuration: {}", key)
            }
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid configuration value for '{}': {}", key, message)
            }
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(item) => write!(f, "not found: {}", item),
            StorageError::AlreadyExists(item) => write!(f, "already exists: {}", item),
            StorageError::OperationFailed(msg) => write!(f, "storage operation failed: {}", msg),
            StorageError::Unavailable(msg) => {
                write!(f, "storage temporarily unavailable: {}", msg)
            }
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::error::Error for PasswordHashError {}
impl std::error::Error for TokenError {}
impl std::error::Error for AuthError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
impl std::error::Error for CryptoError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<PasswordHashError> for Error {
    fn from(err: PasswordHashError) -> Self {
        Error::PasswordHash(err)
    }
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        Error::Token(err)
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        Error::Auth(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Token(TokenError::Expired);
        assert_eq!(err.to_string(), "Token error: token has expired");
    }

    #[test]
    fn test_error_from_auth() {
        let auth_err = AuthError::UnknownClient;
        let err: Error = auth_err.into();
        assert!(matches!(err, Error::Auth(AuthError::UnknownClient)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::SecretTooShort {
            min: 40,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "client secret too short: minimum 40 characters, got 12"
        );
    }

    #[test]
    fn test_storage_unavailable_display() {
        let err = StorageError::Unavailable("operation timed out".to_string());
        assert_eq!(
            err.to_string(),
            "storage temporarily unavailable: operation timed out"
        );
    }
}
