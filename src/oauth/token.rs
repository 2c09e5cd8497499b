//! OAuth 线上类型定义
//!
//! 提供 OAuth 2.0 规范中定义的 token 响应、内省与错误响应结构。
//! 令牌本身是不透明标识符，响应中不会出现任何可解码的结构。

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Error, StorageError, TokenError};

use super::scope::join_scopes;
use crate::token::access::AccessToken;
use crate::token::lifecycle::TokenPair;

/// OAuth Token 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Bearer Token
    #[default]
    Bearer,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Bearer => write!(f, "Bearer"),
        }
    }
}

/// OAuth 2.0 Token 响应
///
/// 符合 RFC 6749 Section 5.1 的 token 响应结构。
/// 响应永远不会回显客户端密钥。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// 访问令牌
    pub access_token: String,

    /// Token 类型（总是 "Bearer"）
    pub token_type: TokenType,

    /// 过期时间（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// 刷新令牌（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// 授权范围（空格分隔）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// 创建新的 Token 响应
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: TokenType::Bearer,
            expires_in: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// 设置过期时间
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// 设置刷新令牌
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// 设置授权范围
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// 从令牌对构建响应（附带刷新令牌）
    pub fn from_pair(pair: &TokenPair) -> Self {
        Self::new(&pair.access_token.id)
            .with_expires_in(pair.access_token.lifetime_seconds().max(0) as u64)
            .with_refresh_token(&pair.refresh_token.id)
            .with_scope(join_scopes(&pair.access_token.scopes))
    }

    /// 从令牌对构建响应，但不回显刷新令牌
    ///
    /// 客户端凭证授权使用：存储侧的刷新令牌照常存在，线上响应省略。
    pub fn from_pair_without_refresh(pair: &TokenPair) -> Self {
        Self::new(&pair.access_token.id)
            .with_expires_in(pair.access_token.lifetime_seconds().max(0) as u64)
            .with_scope(join_scopes(&pair.access_token.scopes))
    }
}

/// Token 内省响应
///
/// `GET /oauth/token-info` 的成功响应体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token 是否活跃
    pub active: bool,

    /// 签发该令牌的客户端 ID
    pub client_id: String,

    /// 关联的用户 ID（客户端凭证令牌为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// 授权范围（空格分隔）
    pub scope: String,

    /// 过期时间（Unix 时间戳）
    pub exp: i64,
}

impl TokenInfo {
    /// 从有效的访问令牌构建内省响应
    pub fn from_access_token(token: &AccessToken) -> Self {
        Self {
            active: token.is_valid(),
            client_id: token.client_id.clone(),
            user_id: token.user_id.clone(),
            scope: join_scopes(&token.scopes),
            exp: token.expires_at.timestamp(),
        }
    }
}

/// OAuth 错误代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
    /// 请求缺少必需参数或包含无效参数值
    InvalidRequest,
    /// 客户端认证失败（未知、已撤销、密钥错误或未授权该授权类型）
    InvalidClient,
    /// 授权许可无效（授权码 / 刷新令牌 / 用户密码错误，统一口径）
    InvalidGrant,
    /// 资源所有者凭证错误（授权端点）
    InvalidCredentials,
    /// 授权服务器不支持此授权类型
    UnsupportedGrantType,
    /// 持有者令牌无效（内省与撤销端点）
    InvalidToken,
    /// 授权服务器遇到意外情况
    ServerError,
    /// 存储暂时不可用，稍后可重试
    TemporarilyUnavailable,
}

/// OAuth 错误响应
///
/// 符合 RFC 6749 Section 5.2 的错误响应，所有端点共用同一形状。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    /// 错误代码
    pub error: OAuthErrorCode,

    /// 错误描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthErrorResponse {
    /// 创建新的错误响应
    pub fn new(error: OAuthErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// 设置错误描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// 创建无效请求错误
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRequest).with_description(description)
    }

    /// 创建无效客户端错误
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidClient).with_description(description)
    }

    /// 创建无效授权错误
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidGrant).with_description(description)
    }

    /// 创建资源所有者凭证错误
    pub fn invalid_credentials() -> Self {
        Self::new(OAuthErrorCode::InvalidCredentials)
            .with_description("Invalid email or password")
    }

    /// 创建无效令牌错误
    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidToken).with_description(description)
    }

    /// 创建不支持的授权类型错误
    pub fn unsupported_grant_type() -> Self {
        Self::new(OAuthErrorCode::UnsupportedGrantType)
            .with_description("Grant type not supported")
    }

    /// 创建服务器内部错误
    pub fn server_error() -> Self {
        Self::new(OAuthErrorCode::ServerError).with_description("Internal server error")
    }

    /// 对应的 HTTP 状态码
    ///
    /// 认证类与请求类错误为 400/401，存储类瞬态故障为 5xx。
    pub fn status(&self) -> u16 {
        match self.error {
            OAuthErrorCode::InvalidCredentials => 401,
            OAuthErrorCode::ServerError => 500,
            OAuthErrorCode::TemporarilyUnavailable => 503,
            _ => 400,
        }
    }
}

impl std::fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)?;
        if let Some(desc) = &self.error_description {
            write!(f, ": {}", desc)?;
        }
        Ok(())
    }
}

impl std::error::Error for OAuthErrorResponse {}

impl From<Error> for OAuthErrorResponse {
    /// 将内部错误映射到线上错误对象
    ///
    /// 认证失败不向外泄露具体原因：客户端侧问题统一 `invalid_client`，
    /// 许可侧问题统一 `invalid_grant`。
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(AuthError::UnknownClient)
            | Error::Auth(AuthError::ClientRevoked)
            | Error::Auth(AuthError::InvalidClientSecret) => {
                Self::invalid_client("Client authentication failed")
            }
            Error::Auth(AuthError::GrantNotAllowed) => {
                Self::invalid_client("Client is not authorized for this grant type")
            }
            Error::Auth(AuthError::InvalidCredentials) => Self::invalid_grant("Invalid credentials"),
            Error::Token(TokenError::Expired)
            | Error::Token(TokenError::Revoked)
            | Error::Token(TokenError::NotFound)
            | Error::Token(TokenError::Invalid) => Self::invalid_grant("Invalid grant provided"),
            Error::Validation(v) => Self::invalid_request(v.to_string()),
            Error::Storage(StorageError::Unavailable(_)) => {
                Self::new(OAuthErrorCode::TemporarilyUnavailable)
                    .with_description("Storage temporarily unavailable")
            }
            _ => Self::server_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_response_builder() {
        let response = TokenResponse::new("access_token_123")
            .with_expires_in(3600)
            .with_refresh_token("refresh_token_456")
            .with_scope("read write");

        assert_eq!(response.access_token, "access_token_123");
        assert_eq!(response.token_type, TokenType::Bearer);
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(
            response.refresh_token,
            Some("refresh_token_456".to_string())
        );
        assert_eq!(response.scope, Some("read write".to_string()));
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("test_token")
            .with_expires_in(3600)
            .with_scope("read");

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("access_token"));
        assert!(json.contains("\"token_type\":\"bearer\""));
        // 省略的刷新令牌不出现在 JSON 中
        assert!(!json.contains("refresh_token"));

        let deserialized: TokenResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.access_token, "test_token");
    }

    #[test]
    fn test_token_info_from_access_token() {
        let token = AccessToken::new(
            "client_123",
            Some("user_456".to_string()),
            vec!["read".to_string(), "write".to_string()],
            Duration::hours(1),
        )
        .unwrap();

        let info = TokenInfo::from_access_token(&token);

        assert!(info.active);
        assert_eq!(info.client_id, "client_123");
        assert_eq!(info.user_id, Some("user_456".to_string()));
        assert_eq!(info.scope, "read write");
        assert_eq!(info.exp, token.expires_at.timestamp());
    }

    #[test]
    fn test_error_response_shape() {
        let error = OAuthErrorResponse::invalid_request("Missing required parameter: client_id");

        assert_eq!(error.error, OAuthErrorCode::InvalidRequest);
        assert_eq!(error.status(), 400);

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"error\":\"invalid_request\""));
        assert!(json.contains("error_description"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(OAuthErrorResponse::invalid_credentials().status(), 401);
        assert_eq!(OAuthErrorResponse::server_error().status(), 500);
        assert_eq!(OAuthErrorResponse::invalid_grant("x").status(), 400);
        assert_eq!(
            OAuthErrorResponse::new(OAuthErrorCode::TemporarilyUnavailable).status(),
            503
        );
    }

    #[test]
    fn test_internal_error_mapping_is_uniform() {
        // 客户端侧失败不泄露具体原因
        for err in [
            Error::Auth(AuthError::UnknownClient),
            Error::Auth(AuthError::ClientRevoked),
            Error::Auth(AuthError::InvalidClientSecret),
        ] {
            let mapped: OAuthErrorResponse = err.into();
            assert_eq!(mapped.error, OAuthErrorCode::InvalidClient);
        }

        // 许可侧失败同样统一口径
        for err in [
            Error::Token(TokenError::Expired),
            Error::Token(TokenError::Revoked),
            Error::Token(TokenError::NotFound),
            Error::Token(TokenError::Invalid),
        ] {
            let mapped: OAuthErrorResponse = err.into();
            assert_eq!(mapped.error, OAuthErrorCode::InvalidGrant);
        }
    }
}
