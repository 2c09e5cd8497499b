//! 授权类型与授权处理器模块
//!
//! 四种授权类型构成一个封闭枚举，每种类型映射到一个实现了
//! [`GrantHandler`] 的处理器，经由查表分发，不存在开放式的
//! 字符串条件链。
//!
//! | 授权类型 | 认证要求 | 产出 |
//! |---|---|---|
//! | `authorization_code` | 机密客户端需密钥 | 消费授权码，签发令牌对 |
//! | `password` | 客户端需 `password_client`，校验用户邮箱+密码 | 签发令牌对 |
//! | `client_credentials` | 机密客户端需密钥 | 签发无用户令牌对 |
//! | `refresh_token` | 机密客户端需密钥 | 轮换令牌对 |

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Error, Result};
use crate::oauth::client::ClientRegistry;
use crate::oauth::code::AuthCodeStore;
use crate::oauth::scope::parse_scopes;
use crate::oauth::token::{OAuthErrorResponse, TokenResponse};
use crate::password::verify_password;
use crate::token::lifecycle::TokenLifecycle;
use crate::user::UserStore;

/// OAuth 授权类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// 授权码模式
    AuthorizationCode,
    /// 资源所有者密码凭证模式
    Password,
    /// 客户端凭证模式
    ClientCredentials,
    /// 刷新令牌模式
    RefreshToken,
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantKind::AuthorizationCode => write!(f, "authorization_code"),
            GrantKind::Password => write!(f, "password"),
            GrantKind::ClientCredentials => write!(f, "client_credentials"),
            GrantKind::RefreshToken => write!(f, "refresh_token"),
        }
    }
}

impl std::str::FromStr for GrantKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "authorization_code" => Ok(GrantKind::AuthorizationCode),
            "password" => Ok(GrantKind::Password),
            "client_credentials" => Ok(GrantKind::ClientCredentials),
            "refresh_token" => Ok(GrantKind::RefreshToken),
            _ => Err(Error::validation(format!("Unknown grant type: {}", s))),
        }
    }
}

/// `POST /oauth/token` 的请求体
///
/// 通用字段加授权类型专属字段；缺失的专属字段由对应处理器报
/// `invalid_request`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    /// 授权类型
    pub grant_type: String,

    /// 客户端 ID
    pub client_id: String,

    /// 客户端密钥（机密客户端必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// 请求的授权范围（空格分隔）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// 授权码（authorization_code 专属）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// 重定向 URI（authorization_code 专属）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// 用户名（password 专属，即用户邮箱）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// 用户密码（password 专属）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 刷新令牌（refresh_token 专属）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    fn empty(grant_type: GrantKind, client_id: impl Into<String>) -> Self {
        Self {
            grant_type: grant_type.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            scope: None,
            code: None,
            redirect_uri: None,
            username: None,
            password: None,
            refresh_token: None,
        }
    }

    /// 构建授权码模式请求
    pub fn authorization_code(client_id: impl Into<String>, code: impl Into<String>) -> Self {
        let mut request = Self::empty(GrantKind::AuthorizationCode, client_id);
        request.code = Some(code.into());
        request
    }

    /// 构建密码模式请求
    pub fn password(
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut request = Self::empty(GrantKind::Password, client_id);
        request.username = Some(username.into());
        request.password = Some(password.into());
        request
    }

    /// 构建客户端凭证模式请求
    pub fn client_credentials(client_id: impl Into<String>) -> Self {
        Self::empty(GrantKind::ClientCredentials, client_id)
    }

    /// 构建刷新令牌模式请求
    pub fn refresh(client_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let mut request = Self::empty(GrantKind::RefreshToken, client_id);
        request.refresh_token = Some(refresh_token.into());
        request
    }

    /// 附加客户端密钥
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
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

/// 授权处理器的依赖集合
///
/// 请求上下文按调用链显式传递，不存在任何请求级全局状态。
pub struct GrantContext<'a> {
    /// 客户端注册表
    pub registry: &'a ClientRegistry,
    /// 用户存储
    pub users: &'a dyn UserStore,
    /// 授权码存储
    pub codes: &'a dyn AuthCodeStore,
    /// 令牌生命周期管理器
    pub lifecycle: &'a TokenLifecycle,
}

/// 授权处理器 trait
///
/// 每种授权类型一个实现：认证提交的凭证，然后委托
/// [`TokenLifecycle`] 签发或轮换令牌。
pub trait GrantHandler: Send + Sync {
    /// 处理器对应的授权类型
    fn kind(&self) -> GrantKind;

    /// 处理令牌请求
    fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse>;
}

/// 根据授权类型查找处理器
pub fn handler_for(kind: GrantKind) -> &'static dyn GrantHandler {
    match kind {
        GrantKind::AuthorizationCode => &AuthorizationCodeGrant,
        GrantKind::Password => &PasswordGrant,
        GrantKind::ClientCredentials => &ClientCredentialsGrant,
        GrantKind::RefreshToken => &RefreshTokenGrant,
    }
}

/// 授权码模式处理器
pub struct AuthorizationCodeGrant;

impl GrantHandler for AuthorizationCodeGrant {
    fn kind(&self) -> GrantKind {
        GrantKind::AuthorizationCode
    }

    fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let code_id = request.code.as_deref().ok_or_else(|| {
            OAuthErrorResponse::invalid_request(
                "Authorization code is required for authorization_code grant",
            )
        })?;

        // 先认证客户端：密钥错误时授权码保持未消费，持有正确密钥
        // 的重试在过期前仍然可以成功
        let client = ctx
            .registry
            .authenticate(&request.client_id, request.client_secret.as_deref())?;

        let code = ctx
            .codes
            .try_consume(code_id, &client.id)
            .map_err(OAuthErrorResponse::from)?
            .ok_or_else(|| OAuthErrorResponse::invalid_grant("Invalid authorization code"))?;

        let pair = ctx
            .lifecycle
            .issue_pair(&client.id, Some(code.user_id.as_str()), code.scopes.clone())?;

        Ok(TokenResponse::from_pair(&pair))
    }
}

/// 密码模式处理器
pub struct PasswordGrant;

impl GrantHandler for PasswordGrant {
    fn kind(&self) -> GrantKind {
        GrantKind::Password
    }

    fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let client = ctx.registry.resolve(&request.client_id)?;
        if !ctx
            .registry
            .is_authorized_for_grant(&client, GrantKind::Password)
        {
            return Err(Error::Auth(AuthError::GrantNotAllowed).into());
        }

        let username = request.username.as_deref().ok_or_else(|| {
            OAuthErrorResponse::invalid_request("Username is required for password grant")
        })?;
        let password = request.password.as_deref().ok_or_else(|| {
            OAuthErrorResponse::invalid_request("Password is required for password grant")
        })?;

        // 未知用户与密码错误不可区分
        let user = ctx
            .users
            .find_by_email(username)
            .map_err(OAuthErrorResponse::from)?
            .ok_or_else(|| OAuthErrorResponse::from(Error::Auth(AuthError::InvalidCredentials)))?;
        let password_ok = verify_password(password, &user.password_hash)
            .map_err(OAuthErrorResponse::from)?;
        if !password_ok {
            return Err(Error::Auth(AuthError::InvalidCredentials).into());
        }

        let scopes = parse_scopes(request.scope.as_deref());
        let pair = ctx
            .lifecycle
            .issue_pair(&client.id, Some(user.id.as_str()), scopes)?;

        Ok(TokenResponse::from_pair(&pair))
    }
}

/// 客户端凭证模式处理器
pub struct ClientCredentialsGrant;

impl GrantHandler for ClientCredentialsGrant {
    fn kind(&self) -> GrantKind {
        GrantKind::ClientCredentials
    }

    fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let client = ctx
            .registry
            .authenticate(&request.client_id, request.client_secret.as_deref())?;

        let scopes = parse_scopes(request.scope.as_deref());

        // 令牌对不绑定用户；存储侧照常创建刷新令牌，线上响应省略
        let pair = ctx.lifecycle.issue_pair(&client.id, None, scopes)?;

        Ok(TokenResponse::from_pair_without_refresh(&pair))
    }
}

/// 刷新令牌模式处理器
pub struct RefreshTokenGrant;

impl GrantHandler for RefreshTokenGrant {
    fn kind(&self) -> GrantKind {
        GrantKind::RefreshToken
    }

    fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let refresh_token = request.refresh_token.as_deref().ok_or_else(|| {
            OAuthErrorResponse::invalid_request("Refresh token is required for refresh_token grant")
        })?;

        let client = ctx
            .registry
            .authenticate(&request.client_id, request.client_secret.as_deref())?;

        let pair = ctx.lifecycle.rotate_for_client(refresh_token, &client.id)?;

        Ok(TokenResponse::from_pair(&pair))
    }
}

impl<'a> GrantContext<'a> {
    /// 分发令牌请求到对应的授权处理器
    pub fn dispatch(
        &self,
        request: &TokenRequest,
    ) -> std::result::Result<TokenResponse, OAuthErrorResponse> {
        let kind: GrantKind = request
            .grant_type
            .parse()
            .map_err(|_| OAuthErrorResponse::unsupported_grant_type())?;

        handler_for(kind).handle(self, request)
    }
}
