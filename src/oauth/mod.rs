//! OAuth 2.0 模块
//!
//! 提供 OAuth 2.0 授权服务器的核心实现，包括：
//!
//! - **客户端管理** (`client`): OAuth 客户端的创建、认证和存储
//! - **授权码** (`code`): 一次性授权码的签发与原子消费
//! - **授权处理** (`grant`): 四种授权类型的封闭枚举与处理器分发
//! - **范围目录** (`scope`): 静态范围目录与范围字符串解析
//! - **线上类型** (`token`): Token 响应、内省与统一错误对象
//! - **服务器门面** (`server`): 与 HTTP 端点一一对应的组合入口
//!
//! ## 完整流程示例
//!
//! ```rust
//! use oauthrs::oauth::client::ClientType;
//! use oauthrs::oauth::grant::TokenRequest;
//! use oauthrs::oauth::server::{AuthorizationServer, AuthorizeRequest, ClientRequest};
//! use oauthrs::password::hash_password;
//! use oauthrs::user::{User, UserStore};
//!
//! let server = AuthorizationServer::in_memory();
//!
//! // 准备资源所有者
//! let user = User::new("Alice", "alice@example.com", hash_password("hunter2-strong").unwrap());
//! server.users().save(&user).unwrap();
//!
//! // 注册机密客户端
//! let client = server
//!     .register_client(&ClientRequest {
//!         name: "My App".to_string(),
//!         redirect_uri: "https://example.com/cb".to_string(),
//!         secret: None,
//!         client_type: ClientType::Confidential,
//!         personal_access_client: false,
//!         password_client: false,
//!         owner_user_id: None,
//!     })
//!     .unwrap();
//! let secret = client.secret.unwrap();
//!
//! // 授权码流程：授权 -> 兑换
//! let authorized = server
//!     .authorize(&AuthorizeRequest::new(&client.id, "alice@example.com", "hunter2-strong"))
//!     .unwrap();
//! let tokens = server
//!     .token(
//!         &TokenRequest::authorization_code(&client.id, &authorized.authorization_code)
//!             .with_secret(&secret),
//!     )
//!     .unwrap();
//! assert!(tokens.refresh_token.is_some());
//! ```

pub mod client;
pub mod code;
pub mod grant;
pub mod scope;
pub mod server;
pub mod token;

// ============================================================================
// Client 模块导出
// ============================================================================

pub use client::{
    Client, ClientBuilder, ClientRegistry, ClientStore, ClientSummary, ClientType,
    InMemoryClientStore,
};

// ============================================================================
// 授权码模块导出
// ============================================================================

pub use code::{AuthCodeStore, AuthorizationCode, InMemoryAuthCodeStore};

// ============================================================================
// 授权处理模块导出
// ============================================================================

pub use grant::{GrantContext, GrantHandler, GrantKind, TokenRequest, handler_for};

// ============================================================================
// 范围模块导出
// ============================================================================

pub use scope::{DEFAULT_SCOPE, ScopeCatalog, join_scopes, parse_scopes};

// ============================================================================
// 线上类型导出
// ============================================================================

pub use token::{OAuthErrorCode, OAuthErrorResponse, TokenInfo, TokenResponse, TokenType};

// ============================================================================
// 服务器门面导出
// ============================================================================

pub use server::{
    AuthorizationServer, AuthorizeRequest, AuthorizeResponse, ClientRequest, ClientResponse,
    RevokeRequest, RevokeResponse, ServerConfig,
};
