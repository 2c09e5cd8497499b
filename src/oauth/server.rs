//! 授权服务器门面模块
//!
//! 将客户端注册表、用户存储、授权码存储与令牌生命周期管理器
//! 组合为一个授权服务器，暴露与 HTTP 端点一一对应的方法。
//! 路由与请求解析由嵌入方负责；本模块接收已解析的请求结构，
//! 返回可直接序列化的响应或统一形状的错误对象。
//!
//! ## 端点对应
//!
//! | 方法 | 端点 |
//! |---|---|
//! | [`AuthorizationServer::authorize`] | `POST /oauth/authorize` |
//! | [`AuthorizationServer::token`] | `POST /oauth/token` |
//! | [`AuthorizationServer::revoke`] | `POST /oauth/revoke` |
//! | [`AuthorizationServer::token_info`] | `GET /oauth/token-info` |
//! | [`AuthorizationServer::register_client`] | `POST /oauth/clients` |
//! | [`AuthorizationServer::scopes`] | `GET /oauth/scopes` |

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::password::verify_password;
use crate::user::{InMemoryUserStore, UserStore};

use super::client::{Client, ClientRegistry, ClientType};
use super::code::{AuthCodeStore, AuthorizationCode, InMemoryAuthCodeStore};
use super::grant::{GrantContext, TokenRequest};
use super::scope::{ScopeCatalog, parse_scopes};
use super::token::{OAuthErrorResponse, TokenInfo, TokenResponse};
use crate::token::lifecycle::{LifecycleConfig, TokenLifecycle};

/// 授权服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 授权码有效期（默认 10 分钟）
    pub code_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
        }
    }
}

impl ServerConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置授权码有效期
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }
}

/// `POST /oauth/authorize` 的请求体
///
/// 本设计没有独立的同意页：资源所有者的凭证在授权请求中同步校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// 响应类型（必须为 "code"）
    pub response_type: String,

    /// 客户端 ID
    pub client_id: String,

    /// 重定向 URI（缺省使用客户端注册的默认值）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// 请求的授权范围（空格分隔，缺省为 "read"）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// 资源所有者邮箱
    pub email: String,

    /// 资源所有者密码
    pub password: String,
}

impl AuthorizeRequest {
    /// 构建授权请求
    pub fn new(
        client_id: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            response_type: "code".to_string(),
            client_id: client_id.into(),
            redirect_uri: None,
            scope: None,
            email: email.into(),
            password: password.into(),
        }
    }

    /// 附加授权范围
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// 附加重定向 URI
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }
}

/// `POST /oauth/authorize` 的成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    /// 授权码
    pub authorization_code: String,

    /// 授权码有效期（秒）
    pub expires_in: u64,

    /// 兑换时应使用的重定向 URI
    pub redirect_uri: String,
}

/// `POST /oauth/revoke` 的请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeRequest {
    /// 要撤销的访问令牌
    pub token: String,

    /// 客户端 ID
    pub client_id: String,

    /// 客户端密钥（机密客户端必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// `POST /oauth/revoke` 的成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    /// 恒为 true
    pub success: bool,
}

/// `POST /oauth/clients` 的请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRequest {
    /// 客户端名称
    pub name: String,

    /// 默认重定向 URI
    pub redirect_uri: String,

    /// 客户端密钥（至少 40 字符；机密客户端缺省时自动生成）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// 客户端类型（缺省为机密客户端）
    #[serde(default)]
    pub client_type: ClientType,

    /// 是否为个人访问客户端
    #[serde(default)]
    pub personal_access_client: bool,

    /// 是否允许密码授权
    #[serde(default)]
    pub password_client: bool,

    /// 所属用户 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
}

/// `POST /oauth/clients` 的成功响应
///
/// `secret` 是明文密钥，仅在此响应中出现一次。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    /// 客户端 ID
    pub id: String,
    /// 客户端名称
    pub name: String,
    /// 明文密钥（仅机密客户端，仅此一次）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// 默认重定向 URI
    pub redirect_uri: String,
    /// 是否为个人访问客户端
    pub personal_access_client: bool,
    /// 是否允许密码授权
    pub password_client: bool,
}

/// 授权服务器
///
/// 所有端点方法都是无状态的，可以被任意多个请求并发调用；
/// 唯一的共享可变资源是注入的各个存储。
pub struct AuthorizationServer {
    registry: ClientRegistry,
    users: Arc<dyn UserStore>,
    codes: Arc<dyn AuthCodeStore>,
    lifecycle: TokenLifecycle,
    config: ServerConfig,
}

impl AuthorizationServer {
    /// 组合各组件创建授权服务器
    pub fn new(
        registry: ClientRegistry,
        users: Arc<dyn UserStore>,
        codes: Arc<dyn AuthCodeStore>,
        lifecycle: TokenLifecycle,
    ) -> Self {
        Self {
            registry,
            users,
            codes,
            lifecycle,
            config: ServerConfig::default(),
        }
    }

    /// 使用全内存存储创建授权服务器
    ///
    /// 用于开发和测试。
    pub fn in_memory() -> Self {
        Self::new(
            ClientRegistry::new(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryAuthCodeStore::new()),
            TokenLifecycle::new(LifecycleConfig::default()),
        )
    }

    /// 替换服务器配置
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// 客户端注册表
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// 用户存储
    pub fn users(&self) -> Arc<dyn UserStore> {
        Arc::clone(&self.users)
    }

    /// 授权码存储
    pub fn codes(&self) -> Arc<dyn AuthCodeStore> {
        Arc::clone(&self.codes)
    }

    /// 令牌生命周期管理器
    pub fn lifecycle(&self) -> &TokenLifecycle {
        &self.lifecycle
    }

    /// 授权端点：签发授权码
    ///
    /// 同步校验资源所有者的凭证后，签发一个绑定请求范围与重定向
    /// URI 的短时授权码。
    pub fn authorize(
        &self,
        request: &AuthorizeRequest,
    ) -> std::result::Result<AuthorizeResponse, OAuthErrorResponse> {
        if request.response_type != "code" {
            return Err(OAuthErrorResponse::invalid_request(
                "Response type must be \"code\"",
            ));
        }

        let client = self.registry.resolve(&request.client_id)?;

        let user = self
            .users
            .find_by_email(&request.email)
            .map_err(OAuthErrorResponse::from)?
            .ok_or_else(OAuthErrorResponse::invalid_credentials)?;
        let password_ok = verify_password(&request.password, &user.password_hash)
            .map_err(OAuthErrorResponse::from)?;
        if !password_ok {
            return Err(OAuthErrorResponse::invalid_credentials());
        }

        let scopes = parse_scopes(request.scope.as_deref());
        let redirect_uri = request
            .redirect_uri
            .clone()
            .unwrap_or_else(|| client.redirect_uri.clone());

        let code = AuthorizationCode::new(
            &client.id,
            &user.id,
            scopes,
            &redirect_uri,
            self.config.code_ttl,
        )
        .map_err(OAuthErrorResponse::from)?;
        self.codes.save(&code).map_err(OAuthErrorResponse::from)?;

        Ok(AuthorizeResponse {
            authorization_code: code.id,
            expires_in: self.config.code_ttl.num_seconds().max(0) as u64,
            redirect_uri,
        })
    }

    /// 令牌端点：处理四种授权类型
    pub fn token(
        &self,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let ctx = GrantContext {
            registry: &self.registry,
            users: self.users.as_ref(),
            codes: self.codes.as_ref(),
            lifecycle: &self.lifecycle,
        };
        ctx.dispatch(request)
    }

    /// 撤销端点：撤销访问令牌并级联撤销其刷新令牌
    pub fn revoke(
        &self,
        request: &RevokeRequest,
    ) -> std::result::Result<RevokeResponse, OAuthErrorResponse> {
        self.registry
            .authenticate(&request.client_id, request.client_secret.as_deref())?;

        let revoked = self
            .lifecycle
            .revoke(&request.token)
            .map_err(OAuthErrorResponse::from)?;
        if !revoked {
            return Err(OAuthErrorResponse::invalid_token("Token not found"));
        }

        Ok(RevokeResponse { success: true })
    }

    /// 内省端点：查询持有者令牌的状态
    ///
    /// 校验无副作用；缺失、无效与过期的令牌一律返回 `invalid_token`。
    pub fn token_info(
        &self,
        bearer_token: Option<&str>,
    ) -> std::result::Result<TokenInfo, OAuthErrorResponse> {
        let token_id =
            bearer_token.ok_or_else(|| OAuthErrorResponse::invalid_token("No token provided"))?;

        let token = self
            .lifecycle
            .validate(token_id)
            .map_err(|_| OAuthErrorResponse::invalid_token("Token is invalid or expired"))?;

        Ok(TokenInfo::from_access_token(&token))
    }

    /// 客户端注册端点
    pub fn register_client(
        &self,
        request: &ClientRequest,
    ) -> std::result::Result<ClientResponse, OAuthErrorResponse> {
        let mut builder = Client::builder()
            .name(&request.name)
            .redirect_uri(&request.redirect_uri)
            .client_type(request.client_type)
            .personal_access_client(request.personal_access_client)
            .password_client(request.password_client);
        if let Some(secret) = &request.secret {
            builder = builder.secret(secret);
        }
        if let Some(owner) = &request.owner_user_id {
            builder = builder.owner_user_id(owner);
        }

        let (client, plain_secret) = self.registry.register(builder)?;

        Ok(ClientResponse {
            id: client.id,
            name: client.name,
            secret: plain_secret,
            redirect_uri: client.redirect_uri,
            personal_access_client: client.personal_access_client,
            password_client: client.password_client,
        })
    }

    /// 范围目录端点
    pub fn scopes(&self) -> ScopeCatalog {
        ScopeCatalog::available()
    }
}
