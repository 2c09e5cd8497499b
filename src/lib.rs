//! # oauthrs
//!
//! 一个嵌入式的 OAuth2 授权服务器库。
//!
//! ## 功能特性
//!
//! - **四种授权类型**: authorization_code / password / client_credentials / refresh_token
//! - **不透明凭证**: 所有令牌都是随机标识符，有效性完全由存储查询决定
//! - **凭证生命周期状态机**: `Active -> Revoked`（终态）与 `Active -> Expired`
//!   （时间驱动，校验时惰性求值），并发兑换与轮换下保证单一赢家
//! - **第一方会话流程**: register / login / refresh / logout / logout-all，
//!   与 OAuth 流程共享同一个令牌生命周期管理器
//! - **可插拔存储**: 所有存储都是 trait，内置内存实现用于开发和测试
//! - **密码哈希**: 使用 Argon2 或 bcrypt 进行安全的密码哈希
//!
//! ## Features
//!
//! 本库使用 Cargo features 来允许用户选择密码哈希算法：
//!
//! - `argon2` - 启用 Argon2id 密码哈希支持（默认启用）
//! - `bcrypt` - 启用 bcrypt 密码哈希支持
//! - `full` - 启用所有功能
//!
//! ## OAuth 流程示例
//!
//! ```rust
//! use oauthrs::oauth::grant::TokenRequest;
//! use oauthrs::oauth::server::AuthorizationServer;
//!
//! let server = AuthorizationServer::in_memory();
//!
//! // 注册一个允许密码授权的客户端
//! let (client, _secret) = server
//!     .registry()
//!     .register(
//!         oauthrs::oauth::Client::builder()
//!             .name("CLI Tool")
//!             .redirect_uri("https://example.com/cb")
//!             .client_type(oauthrs::oauth::ClientType::Public)
//!             .password_client(true),
//!     )
//!     .unwrap();
//!
//! // 准备用户后即可走密码授权
//! use oauthrs::password::hash_password;
//! use oauthrs::user::{User, UserStore};
//! let user = User::new("Alice", "alice@example.com", hash_password("hunter2-strong").unwrap());
//! server.users().save(&user).unwrap();
//!
//! let tokens = server
//!     .token(&TokenRequest::password(&client.id, "alice@example.com", "hunter2-strong"))
//!     .unwrap();
//! assert!(server.token_info(Some(tokens.access_token.as_str())).is_ok());
//! ```
//!
//! ## 会话流程示例
//!
//! ```rust
//! use std::sync::Arc;
//! use oauthrs::oauth::Client;
//! use oauthrs::session::{AuthFlow, InMemorySessionTokenStore};
//! use oauthrs::token::{LifecycleConfig, TokenLifecycle};
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
//! let session = flow.register("Alice", "alice@example.com", "hunter2-strong").unwrap();
//! let refreshed = flow.refresh(&session.refresh_token).unwrap();
//! assert_ne!(refreshed.access_token, session.access_token);
//! ```

pub mod error;
pub mod oauth;
pub mod password;
pub mod random;
pub mod session;
pub mod token;
pub mod user;

pub use error::{Error, Result};

// ============================================================================
// 密码相关导出
// ============================================================================

pub use password::{Algorithm, PasswordHasher, hash_password, verify_password};

// ============================================================================
// 随机数生成函数导出
// ============================================================================

pub use random::{
    constant_time_compare, constant_time_compare_str, generate_client_secret,
    generate_opaque_token, generate_random_alphanumeric, generate_random_base64_url,
    generate_random_bytes, generate_random_hex, generate_session_token, generate_uuid,
};

// ============================================================================
// OAuth 相关导出
// ============================================================================

pub use oauth::{
    AuthorizationServer, Client, ClientRegistry, ClientType, GrantKind, OAuthErrorCode,
    OAuthErrorResponse, ScopeCatalog, TokenInfo, TokenRequest, TokenResponse,
};

// ============================================================================
// 令牌生命周期导出
// ============================================================================

pub use token::{
    AccessToken, LifecycleConfig, RefreshToken, SweepReport, TokenLifecycle, TokenPair,
    TokenSweeper,
};

// ============================================================================
// 会话流程导出
// ============================================================================

pub use session::{
    AuthFlow, AuthFlowConfig, AuthResponse, InMemorySessionTokenStore, LogoutAllResult,
    SessionToken, SessionTokenStore,
};

// ============================================================================
// 用户导出
// ============================================================================

pub use user::{InMemoryUserStore, User, UserStore, UserView};
