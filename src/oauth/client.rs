//! OAuth 2.0 客户端凭证管理模块
//!
//! 提供 OAuth 客户端的创建、认证和管理功能。
//!
//! ## 客户端分类
//!
//! - **机密 / 公开**：由是否持有密钥决定（`secret_hash` 存在即机密）
//! - **第一方 / 第三方**：由 `personal_access_client || password_client` 决定
//!
//! ## 示例
//!
//! ```rust
//! use oauthrs::oauth::client::{Client, ClientType};
//!
//! // 创建机密客户端
//! let (client, secret) = Client::builder()
//!     .name("My Application")
//!     .redirect_uri("https://example.com/callback")
//!     .client_type(ClientType::Confidential)
//!     .build()
//!     .unwrap();
//!
//! // 保存明文密钥（仅此一次机会）
//! let client_secret = secret.unwrap();
//!
//! // 验证客户端密钥
//! assert!(client.verify_secret(&client_secret));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AuthError, Error, Result, StorageError, ValidationError};
use crate::random::{constant_time_compare_str, generate_client_secret, generate_uuid};

use super::grant::GrantKind;

/// 客户端名称的最大长度
pub const MAX_CLIENT_NAME_LENGTH: usize = 255;

/// 客户端密钥的最小长度
pub const MIN_CLIENT_SECRET_LENGTH: usize = 40;

/// OAuth 客户端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// 机密客户端（可以安全存储密钥的服务端应用）
    #[default]
    Confidential,
    /// 公开客户端（无法安全存储密钥的客户端应用，如 SPA、移动 App）
    Public,
}

/// OAuth 客户端记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// 客户端 ID（UUID 风格，不可预测）
    pub id: String,

    /// 客户端名称
    pub name: String,

    /// 客户端密钥哈希（仅机密客户端）
    /// 存储哈希而非明文以增强安全性
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,

    /// 默认重定向 URI
    pub redirect_uri: String,

    /// 是否为个人访问客户端（第一方会话流程使用）
    pub personal_access_client: bool,

    /// 是否允许密码授权
    pub password_client: bool,

    /// 所属用户 ID（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,

    /// 客户端是否已被撤销
    #[serde(default)]
    pub revoked: bool,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// 创建构建器
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// 客户端是否为机密客户端
    pub fn confidential(&self) -> bool {
        self.secret_hash.is_some()
    }

    /// 客户端是否为公开客户端
    pub fn public(&self) -> bool {
        !self.confidential()
    }

    /// 客户端是否为第一方客户端
    pub fn first_party(&self) -> bool {
        self.personal_access_client || self.password_client
    }

    /// 客户端是否为第三方客户端
    pub fn third_party(&self) -> bool {
        !self.first_party()
    }

    /// 客户端类型
    pub fn client_type(&self) -> ClientType {
        if self.confidential() {
            ClientType::Confidential
        } else {
            ClientType::Public
        }
    }

    /// 验证客户端密钥
    ///
    /// 公开客户端没有密钥，任何输入都验证失败。
    pub fn verify_secret(&self, secret: &str) -> bool {
        match &self.secret_hash {
            Some(hash) => constant_time_compare_str(&hash_client_secret(secret), hash),
            None => false,
        }
    }

    /// 撤销客户端
    ///
    /// 被撤销的客户端无法再认证任何新的授权请求；
    /// 已签发的令牌不受影响，按各自的过期与撤销状态继续生效。
    pub fn revoke(&mut self) {
        self.revoked = true;
        self.updated_at = Utc::now();
    }
}

/// OAuth 客户端构建器
#[derive(Debug, Default)]
pub struct ClientBuilder {
    name: Option<String>,
    redirect_uri: Option<String>,
    client_type: ClientType,
    secret: Option<String>,
    personal_access_client: bool,
    password_client: bool,
    owner_user_id: Option<String>,
}

impl ClientBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置客户端名称
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置默认重定向 URI
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// 设置客户端类型
    pub fn client_type(mut self, client_type: ClientType) -> Self {
        self.client_type = client_type;
        self
    }

    /// 提供客户端密钥（至少 40 字符）
    ///
    /// 提供密钥隐含客户端为机密类型；省略时机密客户端会自动生成高熵密钥。
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self.client_type = ClientType::Confidential;
        self
    }

    /// 标记为个人访问客户端
    pub fn personal_access_client(mut self, enabled: bool) -> Self {
        self.personal_access_client = enabled;
        self
    }

    /// 标记为密码授权客户端
    pub fn password_client(mut self, enabled: bool) -> Self {
        self.password_client = enabled;
        self
    }

    /// 设置所属用户
    pub fn owner_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.owner_user_id = Some(user_id.into());
        self
    }

    /// 构建客户端（返回客户端和明文密钥）
    ///
    /// 对于机密客户端，明文密钥仅在此处返回一次；
    /// 对于公开客户端，密钥为 `None`。
    pub fn build(self) -> Result<(Client, Option<String>)> {
        let name = self
            .name
            .ok_or_else(|| Error::Validation(ValidationError::EmptyField("name".to_string())))?;

        if name.is_empty() {
            return Err(Error::Validation(ValidationError::EmptyField(
                "name".to_string(),
            )));
        }
        if name.len() > MAX_CLIENT_NAME_LENGTH {
            return Err(Error::Validation(ValidationError::TooLong {
                field: "name".to_string(),
                max: MAX_CLIENT_NAME_LENGTH,
                actual: name.len(),
            }));
        }

        let redirect_uri = self.redirect_uri.ok_or_else(|| {
            Error::Validation(ValidationError::EmptyField("redirect_uri".to_string()))
        })?;
        validate_redirect_uri(&redirect_uri)?;

        // 机密客户端：使用提供的密钥，否则生成一个
        let (secret_hash, plain_secret) = if self.client_type == ClientType::Confidential {
            let secret = match self.secret {
                Some(secret) => {
                    if secret.len() < MIN_CLIENT_SECRET_LENGTH {
                        return Err(Error::Validation(ValidationError::SecretTooShort {
                            min: MIN_CLIENT_SECRET_LENGTH,
                            actual: secret.len(),
                        }));
                    }
                    secret
                }
                None => generate_client_secret()?,
            };
            (Some(hash_client_secret(&secret)), Some(secret))
        } else {
            (None, None)
        };

        let now = Utc::now();
        let client = Client {
            id: generate_uuid(),
            name,
            secret_hash,
            redirect_uri,
            personal_access_client: self.personal_access_client,
            password_client: self.password_client,
            owner_user_id: self.owner_user_id,
            revoked: false,
            created_at: now,
            updated_at: now,
        };

        Ok((client, plain_secret))
    }
}

/// OAuth 客户端存储 trait
pub trait ClientStore: Send + Sync {
    /// 保存客户端
    fn save(&self, client: &Client) -> Result<()>;

    /// 根据 client_id 查找客户端
    fn find_by_id(&self, client_id: &str) -> Result<Option<Client>>;

    /// 删除客户端
    fn delete(&self, client_id: &str) -> Result<()>;

    /// 列出所有客户端
    fn list(&self) -> Result<Vec<Client>>;
}

/// 内存客户端存储实现
#[derive(Debug, Default)]
pub struct InMemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStore for InMemoryClientStore {
    fn save(&self, client: &Client) -> Result<()> {
        let mut clients = self
            .clients
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    fn find_by_id(&self, client_id: &str) -> Result<Option<Client>> {
        let clients = self
            .clients
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(clients.get(client_id).cloned())
    }

    fn delete(&self, client_id: &str) -> Result<()> {
        let mut clients = self
            .clients
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        clients
            .remove(client_id)
            .ok_or_else(|| Error::Storage(StorageError::NotFound(client_id.to_string())))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Client>> {
        let clients = self
            .clients
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(clients.values().cloned().collect())
    }
}

/// 客户端列表条目
///
/// 公开客户端的 `secret_hash` 恒为 `None`；机密客户端的哈希
/// 只在管理视图（[`ClientRegistry::list_summaries_with_secrets`]）中出现。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    /// 客户端 ID
    pub id: String,
    /// 客户端名称
    pub name: String,
    /// 客户端类型
    pub client_type: ClientType,
    /// 默认重定向 URI
    pub redirect_uri: String,
    /// 是否允许密码授权
    pub password_client: bool,
    /// 是否已被撤销
    pub revoked: bool,
    /// 密钥哈希（仅管理视图的机密客户端）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,
}

impl ClientSummary {
    fn from_client(client: &Client, reveal_secret: bool) -> Self {
        Self {
            id: client.id.clone(),
            name: client.name.clone(),
            client_type: client.client_type(),
            redirect_uri: client.redirect_uri.clone(),
            password_client: client.password_client,
            revoked: client.revoked,
            secret_hash: if reveal_secret {
                client.secret_hash.clone()
            } else {
                None
            },
        }
    }
}

/// 客户端注册表
///
/// 客户端 CRUD 与认证的统一入口。
pub struct ClientRegistry {
    store: std::sync::Arc<dyn ClientStore>,
}

impl ClientRegistry {
    /// 使用默认内存存储创建注册表
    pub fn new() -> Self {
        Self {
            store: std::sync::Arc::new(InMemoryClientStore::new()),
        }
    }

    /// 使用自定义存储创建注册表
    pub fn with_store(store: std::sync::Arc<dyn ClientStore>) -> Self {
        Self { store }
    }

    /// 注册新客户端
    ///
    /// 构建并持久化客户端，返回客户端和明文密钥（仅此一次机会获取）。
    pub fn register(&self, builder: ClientBuilder) -> Result<(Client, Option<String>)> {
        let (client, plain_secret) = builder.build()?;
        self.store.save(&client)?;
        Ok((client, plain_secret))
    }

    /// 根据 client_id 查找客户端
    pub fn find(&self, client_id: &str) -> Result<Option<Client>> {
        self.store.find_by_id(client_id)
    }

    /// 解析客户端（必须存在且未被撤销）
    ///
    /// 不验证密钥；密码授权等不要求密钥的场景使用。
    pub fn resolve(&self, client_id: &str) -> Result<Client> {
        let client = self
            .store
            .find_by_id(client_id)?
            .ok_or(Error::Auth(AuthError::UnknownClient))?;

        if client.revoked {
            return Err(Error::Auth(AuthError::ClientRevoked));
        }

        Ok(client)
    }

    /// 认证客户端
    ///
    /// 机密客户端必须提供正确的密钥；公开客户端无需密钥。
    /// 未知客户端、已撤销客户端与密钥错误一律返回认证错误，
    /// 不向调用方泄露具体原因。
    pub fn authenticate(&self, client_id: &str, secret: Option<&str>) -> Result<Client> {
        let client = self.resolve(client_id)?;

        if client.confidential() {
            let presented = secret.ok_or(Error::Auth(AuthError::InvalidClientSecret))?;
            if !client.verify_secret(presented) {
                return Err(Error::Auth(AuthError::InvalidClientSecret));
            }
        }

        Ok(client)
    }

    /// 检查客户端是否被授权使用指定的授权类型
    ///
    /// 密码授权要求 `password_client`；其余授权类型只要求客户端未被撤销。
    pub fn is_authorized_for_grant(&self, client: &Client, kind: GrantKind) -> bool {
        if client.revoked {
            return false;
        }
        match kind {
            GrantKind::Password => client.password_client,
            _ => true,
        }
    }

    /// 撤销客户端
    ///
    /// 只翻转客户端的撤销标记，不级联撤销其已签发的令牌：
    /// 存量令牌按各自的过期与撤销状态继续生效。
    pub fn revoke(&self, client_id: &str) -> Result<()> {
        let mut client = self
            .store
            .find_by_id(client_id)?
            .ok_or_else(|| Error::Storage(StorageError::NotFound(client_id.to_string())))?;
        client.revoke();
        self.store.save(&client)
    }

    /// 列出所有客户端（密钥一律掩码）
    pub fn list_summaries(&self) -> Result<Vec<ClientSummary>> {
        let clients = self.store.list()?;
        Ok(clients
            .iter()
            .map(|c| ClientSummary::from_client(c, false))
            .collect())
    }

    /// 列出所有客户端（管理视图）
    ///
    /// 机密客户端附带密钥哈希；公开客户端密钥字段保持为空。
    pub fn list_summaries_with_secrets(&self) -> Result<Vec<ClientSummary>> {
        let clients = self.store.list()?;
        Ok(clients
            .iter()
            .map(|c| ClientSummary::from_client(c, true))
            .collect())
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 哈希客户端密钥
///
/// 使用 SHA-256，返回十六进制编码
fn hash_client_secret(secret: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    crate::random::hex_encode(&hasher.finalize())
}

/// 验证重定向 URI 格式
fn validate_redirect_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(Error::Validation(ValidationError::InvalidRedirectUri(
            "redirect URI cannot be empty".to_string(),
        )));
    }

    // 允许 localhost 用于开发
    if uri.starts_with("http://localhost") || uri.starts_with("http://127.0.0.1") {
        return Ok(());
    }

    // 允许 http(s) 与自定义 scheme（用于移动应用）
    if !uri.contains("://") {
        return Err(Error::Validation(ValidationError::InvalidRedirectUri(
            uri.to_string(),
        )));
    }

    Ok(())
}
