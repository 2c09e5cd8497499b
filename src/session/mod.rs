//! 第一方会话认证流程模块
//!
//! 提供 register / login / refresh / logout / logout-all 五个操作，
//! 构建在与 OAuth 流程相同的令牌生命周期管理器之上。
//!
//! ## 会话令牌对
//!
//! 每次注册或登录签发一对凭证：
//!
//! - 15 分钟有效期的全量访问令牌（走 [`TokenLifecycle`]）
//! - 30 天有效期的会话刷新令牌（64 字符，直接由用户持有）
//!
//! 会话刷新时撤销旧的访问令牌、签发新的访问令牌，并把会话令牌的
//! 过期时间向后滑动 30 天——令牌字符串本身保持不变。
//!
//! ## 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use oauthrs::oauth::client::Client;
//! use oauthrs::session::{AuthFlow, InMemorySessionTokenStore};
//! use oauthrs::token::lifecycle::{LifecycleConfig, TokenLifecycle};
//! use oauthrs::user::InMemoryUserStore;
//!
//! let (personal_client, _) = Client::builder()
//!     .name("First-Party App")
//!     .redirect_uri("https://app.example.com/cb")
//!     .personal_access_client(true)
//!     .build()
//!     .unwrap();
//!
//! let flow = AuthFlow::new(
//!     Arc::new(InMemoryUserStore::new()),
//!     Arc::new(InMemorySessionTokenStore::new()),
//!     TokenLifecycle::new(LifecycleConfig::default()),
//!     &personal_client,
//! )
//! .unwrap();
//!
//! // 注册并登录
//! let registered = flow.register("Alice", "alice@example.com", "hunter2-strong").unwrap();
//! let logged_in = flow.login("alice@example.com", "hunter2-strong").unwrap();
//! assert_eq!(logged_in.expires_in, 15 * 60);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{AuthError, ConfigError, Error, Result, StorageError, TokenError, ValidationError};
use crate::oauth::client::Client;
use crate::oauth::token::TokenType;
use crate::password::PasswordHasher;
use crate::random::generate_session_token;
use crate::token::access::TokenStore;
use crate::token::lifecycle::{LifecycleConfig, TokenLifecycle};
use crate::user::{InMemoryUserStore, User, UserStore, UserView};

/// 会话刷新令牌
///
/// 直接由用户持有的持有者会话凭证，没有客户端与授权范围概念。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// Token 值（64 字符）
    pub token: String,

    /// 关联的用户 ID
    pub user_id: String,

    /// 当前链接的访问令牌 ID
    pub access_token_id: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 过期时间（刷新时向后滑动）
    pub expires_at: DateTime<Utc>,

    /// 是否已被撤销
    #[serde(default)]
    pub revoked: bool,
}

impl SessionToken {
    /// 创建新的会话令牌
    pub fn new(
        user_id: impl Into<String>,
        access_token_id: impl Into<String>,
        expires_in: Duration,
    ) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            token: generate_session_token()?,
            user_id: user_id.into(),
            access_token_id: access_token_id.into(),
            created_at: now,
            expires_at: now + expires_in,
            revoked: false,
        })
    }

    /// 检查令牌是否已过期
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// 检查令牌是否有效（未撤销且未过期）
    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    /// 将过期时间滑动到从现在起的指定时长之后
    pub fn extend(&mut self, duration: Duration) {
        self.expires_at = Utc::now() + duration;
    }
}

/// 会话令牌存储 trait
pub trait SessionTokenStore: Send + Sync {
    /// 保存会话令牌
    fn save(&self, token: &SessionToken) -> Result<()>;

    /// 通过令牌值获取会话令牌
    fn find_by_token(&self, token: &str) -> Result<Option<SessionToken>>;

    /// 更新会话令牌
    fn update(&self, token: &SessionToken) -> Result<()>;

    /// 撤销链接到指定访问令牌的会话令牌
    ///
    /// 返回是否有令牌被本次撤销。
    fn revoke_by_access_token(&self, access_token_id: &str) -> Result<bool>;

    /// 撤销指定用户的所有会话令牌，返回本次新撤销的数量
    fn revoke_all_for_user(&self, user_id: &str) -> Result<usize>;

    /// 获取用户的所有会话令牌
    fn find_by_user(&self, user_id: &str) -> Result<Vec<SessionToken>>;

    /// 删除在指定时间之前过期的会话令牌，返回删除数量
    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// 获取会话令牌总数
    fn count(&self) -> Result<usize>;
}

/// 内存会话令牌存储
#[derive(Debug, Default)]
pub struct InMemorySessionTokenStore {
    tokens: RwLock<HashMap<String, SessionToken>>,
}

impl InMemorySessionTokenStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, SessionToken>>> {
        self.tokens
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, SessionToken>>> {
        self.tokens
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))
    }
}

impl SessionTokenStore for InMemorySessionTokenStore {
    fn save(&self, token: &SessionToken) -> Result<()> {
        let mut tokens = self.write()?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    fn find_by_token(&self, token: &str) -> Result<Option<SessionToken>> {
        let tokens = self.read()?;
        Ok(tokens.get(token).cloned())
    }

    fn update(&self, token: &SessionToken) -> Result<()> {
        let mut tokens = self.write()?;
        if tokens.contains_key(&token.token) {
            tokens.insert(token.token.clone(), token.clone());
            Ok(())
        } else {
            Err(Error::Storage(StorageError::NotFound(
                "session token".to_string(),
            )))
        }
    }

    fn revoke_by_access_token(&self, access_token_id: &str) -> Result<bool> {
        let mut tokens = self.write()?;
        let mut revoked_any = false;
        for token in tokens.values_mut() {
            if token.access_token_id == access_token_id && !token.revoked {
                token.revoked = true;
                revoked_any = true;
            }
        }
        Ok(revoked_any)
    }

    fn revoke_all_for_user(&self, user_id: &str) -> Result<usize> {
        let mut tokens = self.write()?;
        let mut count = 0;
        for token in tokens.values_mut() {
            if token.user_id == user_id && !token.revoked {
                token.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }

    fn find_by_user(&self, user_id: &str) -> Result<Vec<SessionToken>> {
        let tokens = self.read()?;
        Ok(tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut tokens = self.write()?;
        let to_remove: Vec<String> = tokens
            .iter()
            .filter(|(_, t)| t.expires_at < cutoff)
            .map(|(key, _)| key.clone())
            .collect();

        let count = to_remove.len();
        for key in to_remove {
            tokens.remove(&key);
        }
        Ok(count)
    }

    fn count(&self) -> Result<usize> {
        let tokens = self.read()?;
        Ok(tokens.len())
    }
}

/// 会话流程配置
#[derive(Debug, Clone)]
pub struct AuthFlowConfig {
    /// 会话刷新令牌有效期（默认 30 天，刷新时向后滑动）
    pub session_ttl: Duration,

    /// 密码最小长度（默认 8）
    pub min_password_length: usize,
}

impl Default for AuthFlowConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::days(30),
            min_password_length: 8,
        }
    }
}

impl AuthFlowConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置会话令牌有效期
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// 设置密码最小长度
    pub fn with_min_password_length(mut self, min: usize) -> Self {
        self.min_password_length = min;
        self
    }
}

/// register / login / refresh 的成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// 用户信息（register / login 返回，refresh 不返回）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,

    /// 访问令牌
    pub access_token: String,

    /// 会话刷新令牌
    pub refresh_token: String,

    /// Token 类型（总是 "Bearer"）
    pub token_type: TokenType,

    /// 访问令牌有效期（秒）
    pub expires_in: u64,
}

/// logout-all 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutAllResult {
    /// 本次撤销的访问令牌数量
    pub access_tokens_revoked: usize,
    /// 本次撤销的会话令牌数量
    pub session_tokens_revoked: usize,
}

/// 第一方会话认证流程
///
/// 访问令牌以一个指定的个人访问客户端名义签发；
/// 会话流程没有授权范围概念，令牌持有全量访问。
pub struct AuthFlow {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionTokenStore>,
    lifecycle: TokenLifecycle,
    client_id: String,
    hasher: PasswordHasher,
    config: AuthFlowConfig,
}

impl AuthFlow {
    /// 创建会话流程
    ///
    /// `personal_client` 必须是个人访问客户端
    /// （`personal_access_client = true`）。
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionTokenStore>,
        lifecycle: TokenLifecycle,
        personal_client: &Client,
    ) -> Result<Self> {
        if !personal_client.personal_access_client {
            return Err(Error::Config(ConfigError::InvalidValue {
                key: "personal_client".to_string(),
                message: "client must be a personal access client".to_string(),
            }));
        }

        Ok(Self {
            users,
            sessions,
            lifecycle,
            client_id: personal_client.id.clone(),
            hasher: PasswordHasher::default(),
            config: AuthFlowConfig::default(),
        })
    }

    /// 使用全内存存储创建会话流程
    ///
    /// 自动注册一个个人访问客户端。用于开发和测试。
    pub fn bootstrap() -> Result<Self> {
        let (personal_client, _) = Client::builder()
            .name("Personal Access Client")
            .redirect_uri("http://localhost")
            .personal_access_client(true)
            .build()?;

        Self::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionTokenStore::new()),
            TokenLifecycle::new(LifecycleConfig::default()),
            &personal_client,
        )
    }

    /// 替换流程配置
    pub fn with_config(mut self, config: AuthFlowConfig) -> Self {
        self.config = config;
        self
    }

    /// 会话令牌存储
    pub fn sessions(&self) -> Arc<dyn SessionTokenStore> {
        Arc::clone(&self.sessions)
    }

    /// 注册新用户并签发会话令牌对
    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        if name.is_empty() {
            return Err(Error::Validation(ValidationError::EmptyField(
                "name".to_string(),
            )));
        }
        validate_email(email)?;
        if password.len() < self.config.min_password_length {
            return Err(Error::Validation(ValidationError::PasswordTooShort {
                min_length: self.config.min_password_length,
                actual: password.len(),
            }));
        }

        if self.users.find_by_email(email)?.is_some() {
            return Err(Error::Storage(StorageError::AlreadyExists(format!(
                "user with email {}",
                email
            ))));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new(name, email, password_hash);
        self.users.save(&user)?;

        self.issue_session_pair(&user)
    }

    /// 校验用户凭证并签发会话令牌对
    ///
    /// 未知邮箱与密码错误对调用方不可区分。
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let user = self
            .users
            .find_by_email(email)?
            .ok_or(Error::Auth(AuthError::InvalidCredentials))?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(Error::Auth(AuthError::InvalidCredentials));
        }

        self.issue_session_pair(&user)
    }

    /// 刷新会话
    ///
    /// 撤销旧的访问令牌，签发新的 15 分钟访问令牌，并把会话令牌的
    /// 过期时间向后滑动——令牌字符串保持不变。
    /// 会话令牌不存在、已撤销、已过期对调用方不可区分。
    pub fn refresh(&self, session_token: &str) -> Result<AuthResponse> {
        let mut session = self
            .sessions
            .find_by_token(session_token)?
            .ok_or(Error::Token(TokenError::Invalid))?;
        if !session.is_valid() {
            return Err(Error::Token(TokenError::Invalid));
        }

        // 旧访问令牌出局，新访问令牌接班
        self.lifecycle.revoke(&session.access_token_id)?;
        let access = self
            .lifecycle
            .issue_session_access(&self.client_id, &session.user_id)?;

        session.access_token_id = access.id.clone();
        session.extend(self.config.session_ttl);
        self.sessions.update(&session)?;

        let expires_in = access.lifetime_seconds().max(0) as u64;
        Ok(AuthResponse {
            user: None,
            access_token: access.id,
            refresh_token: session.token,
            token_type: TokenType::Bearer,
            expires_in,
        })
    }

    /// 登出当前会话
    ///
    /// 撤销调用方的持有者访问令牌及其链接的会话令牌。
    /// 重复登出不报错。
    pub fn logout(&self, bearer_token: &str) -> Result<()> {
        let access = self
            .lifecycle
            .store()
            .find_access(bearer_token)?
            .ok_or(Error::Token(TokenError::NotFound))?;

        self.lifecycle.revoke(&access.id)?;
        self.sessions.revoke_by_access_token(&access.id)?;
        Ok(())
    }

    /// 登出所有设备
    ///
    /// 撤销持有者所属用户的全部访问令牌与会话令牌。幂等：再次调用
    /// 成功返回，计数为零。
    pub fn logout_all(&self, bearer_token: &str) -> Result<LogoutAllResult> {
        let access = self
            .lifecycle
            .store()
            .find_access(bearer_token)?
            .ok_or(Error::Token(TokenError::NotFound))?;
        let user_id = access
            .user_id
            .as_deref()
            .ok_or(Error::Token(TokenError::Invalid))?;

        let access_tokens_revoked = self.lifecycle.revoke_all_for_user(user_id)?;
        let session_tokens_revoked = self.sessions.revoke_all_for_user(user_id)?;

        Ok(LogoutAllResult {
            access_tokens_revoked,
            session_tokens_revoked,
        })
    }

    /// 签发一对会话凭证
    fn issue_session_pair(&self, user: &User) -> Result<AuthResponse> {
        let access = self
            .lifecycle
            .issue_session_access(&self.client_id, &user.id)?;
        let session = SessionToken::new(&user.id, &access.id, self.config.session_ttl)?;
        self.sessions.save(&session)?;

        let expires_in = access.lifetime_seconds().max(0) as u64;
        Ok(AuthResponse {
            user: Some(UserView::from(user)),
            access_token: access.id,
            refresh_token: session.token,
            token_type: TokenType::Bearer,
            expires_in,
        })
    }
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 校验邮箱格式
fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::Validation(ValidationError::InvalidEmail(
            email.to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> AuthFlow {
        let (personal_client, _) = Client::builder()
            .name("First-Party App")
            .redirect_uri("https://app.example.com/cb")
            .personal_access_client(true)
            .build()
            .unwrap();

        AuthFlow::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionTokenStore::new()),
            TokenLifecycle::new(LifecycleConfig::default()),
            &personal_client,
        )
        .unwrap()
    }

    #[test]
    fn test_flow_requires_personal_access_client() {
        let (ordinary_client, _) = Client::builder()
            .name("Third Party")
            .redirect_uri("https://example.com/cb")
            .build()
            .unwrap();

        let result = AuthFlow::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionTokenStore::new()),
            TokenLifecycle::new(LifecycleConfig::default()),
            &ordinary_client,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bootstrap_flow() {
        let flow = AuthFlow::bootstrap().unwrap();
        let response = flow
            .register("Alice", "alice@example.com", "strong-password")
            .unwrap();
        assert!(flow.login("alice@example.com", "strong-password").is_ok());
        assert!(flow.refresh(&response.refresh_token).is_ok());
    }

    #[test]
    fn test_register_issues_session_pair() {
        let flow = flow();
        let response = flow
            .register("Alice", "alice@example.com", "strong-password")
            .unwrap();

        assert!(response.user.is_some());
        assert_eq!(response.refresh_token.len(), 64);
        assert_eq!(response.expires_in, 15 * 60);
    }

    #[test]
    fn test_register_validation() {
        let flow = flow();

        assert!(flow.register("", "a@example.com", "strong-password").is_err());
        assert!(flow.register("Alice", "not-an-email", "strong-password").is_err());
        assert!(flow.register("Alice", "a@example.com", "short").is_err());
    }

    #[test]
    fn test_register_duplicate_email() {
        let flow = flow();
        flow.register("Alice", "alice@example.com", "strong-password")
            .unwrap();

        let result = flow.register("Clone", "alice@example.com", "other-password");
        assert!(result.is_err());
    }

    #[test]
    fn test_login_unknown_and_wrong_password_are_uniform() {
        let flow = flow();
        flow.register("Alice", "alice@example.com", "strong-password")
            .unwrap();

        let unknown = flow.login("nobody@example.com", "strong-password");
        let wrong = flow.login("alice@example.com", "wrong-password");

        for result in [unknown, wrong] {
            assert!(matches!(
                result,
                Err(Error::Auth(AuthError::InvalidCredentials))
            ));
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice@nodot").is_err());
    }

    #[test]
    fn test_session_token_extend() {
        let mut token = SessionToken::new("user_1", "access_1", Duration::days(1)).unwrap();
        let original = token.expires_at;

        token.extend(Duration::days(30));
        assert!(token.expires_at > original);
    }

    #[test]
    fn test_store_revoke_by_access_token() {
        let store = InMemorySessionTokenStore::new();
        let token = SessionToken::new("user_1", "access_1", Duration::days(30)).unwrap();
        store.save(&token).unwrap();

        assert!(store.revoke_by_access_token("access_1").unwrap());
        // 已撤销的令牌不再计入
        assert!(!store.revoke_by_access_token("access_1").unwrap());
        assert!(!store.revoke_by_access_token("missing").unwrap());
    }

    #[test]
    fn test_store_purge_expired() {
        let store = InMemorySessionTokenStore::new();
        let expired = SessionToken::new("user_1", "access_1", Duration::days(-10)).unwrap();
        let live = SessionToken::new("user_1", "access_2", Duration::days(30)).unwrap();
        store.save(&expired).unwrap();
        store.save(&live).unwrap();

        let purged = store
            .purge_expired_before(Utc::now() - Duration::days(7))
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.count().unwrap(), 1);
    }
}
