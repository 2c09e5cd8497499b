//! 访问令牌与刷新令牌存储模块
//!
//! 提供访问令牌、刷新令牌记录结构与成对存储接口。
//!
//! ## 原子性约束
//!
//! - 令牌对（访问令牌 + 刷新令牌）要么同时持久化，要么都不持久化
//! - 撤销访问令牌会在同一个原子步骤中级联撤销其关联的刷新令牌
//! - 刷新令牌的消费是 compare-and-set：并发轮换同一个刷新令牌时
//!   恰好一个调用方成功，其余观察到"已撤销"

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result, StorageError};
use crate::random::generate_opaque_token;

/// OAuth 访问令牌
///
/// 不透明的持有者令牌，有效性完全由存储查询决定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Token 值（不透明标识符）
    pub id: String,

    /// 签发该令牌的客户端 ID
    pub client_id: String,

    /// 关联的用户 ID（客户端凭证授权时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// 授权范围列表
    pub scopes: Vec<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 过期时间
    pub expires_at: DateTime<Utc>,

    /// 是否已被撤销
    #[serde(default)]
    pub revoked: bool,
}

impl AccessToken {
    /// 创建新的访问令牌
    pub fn new(
        client_id: impl Into<String>,
        user_id: Option<String>,
        scopes: Vec<String>,
        expires_in: Duration,
    ) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: generate_opaque_token()?,
            client_id: client_id.into(),
            user_id,
            scopes,
            created_at: now,
            expires_at: now + expires_in,
            revoked: false,
        })
    }

    /// 检查令牌是否已过期
    ///
    /// 过期是时间的纯函数，在校验时惰性求值，不依赖后台清扫。
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// 检查令牌是否有效（未撤销且未过期）
    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    /// 检查是否具有指定的 scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// 获取剩余有效时间（秒）
    pub fn remaining_lifetime(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }

    /// 签发时授予的有效时长（秒）
    pub fn lifetime_seconds(&self) -> i64 {
        (self.expires_at - self.created_at).num_seconds()
    }
}

/// OAuth 刷新令牌
///
/// 每个访问令牌同一时间至多有一个存活的刷新令牌。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Token 值（不透明标识符）
    pub id: String,

    /// 关联的访问令牌 ID（用于级联撤销与轮换）
    pub access_token_id: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 过期时间
    pub expires_at: DateTime<Utc>,

    /// 是否已被撤销
    #[serde(default)]
    pub revoked: bool,
}

impl RefreshToken {
    /// 创建新的刷新令牌
    pub fn new(access_token_id: impl Into<String>, expires_in: Duration) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: generate_opaque_token()?,
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
}

/// 令牌对存储 trait
///
/// 访问令牌与刷新令牌放在同一个存储后面，以便令牌对的创建、
/// 级联撤销与刷新令牌消费都能作为单个原子操作实现。
pub trait TokenStore: Send + Sync {
    /// 原子地保存一个令牌对（两条记录要么都持久化，要么都不持久化）
    fn save_pair(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()>;

    /// 保存单个访问令牌（会话流程使用，不附带 OAuth 刷新令牌）
    fn save_access(&self, access: &AccessToken) -> Result<()>;

    /// 通过 id 获取访问令牌
    fn find_access(&self, token_id: &str) -> Result<Option<AccessToken>>;

    /// 通过 id 获取刷新令牌
    fn find_refresh(&self, token_id: &str) -> Result<Option<RefreshToken>>;

    /// 获取访问令牌关联的刷新令牌
    fn refresh_for_access(&self, access_token_id: &str) -> Result<Option<RefreshToken>>;

    /// 撤销访问令牌并级联撤销其关联的刷新令牌
    ///
    /// 返回 `true` 当且仅当访问令牌记录存在（无论此前是否已撤销）。
    /// 幂等：重复调用不报错。
    fn revoke_access(&self, token_id: &str) -> Result<bool>;

    /// 原子地消费刷新令牌
    ///
    /// 只有当刷新令牌存在、未撤销且未过期时才消费成功，并在同一个
    /// 原子步骤中将其标记为已撤销。并发轮换同一个刷新令牌时恰好
    /// 一个调用方获得记录，其余一律得到 `None`。
    fn try_consume_refresh(&self, token_id: &str) -> Result<Option<RefreshToken>>;

    /// 撤销指定用户的所有访问令牌（级联撤销关联的刷新令牌）
    ///
    /// 返回本次新撤销的访问令牌数量。
    fn revoke_all_for_user(&self, user_id: &str) -> Result<usize>;

    /// 删除在指定时间之前过期的令牌，返回 (访问令牌数, 刷新令牌数)
    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<(usize, usize)>;

    /// 获取访问令牌总数
    fn count_access(&self) -> Result<usize>;
}

/// 内存令牌存储
///
/// 两张表共用一把锁，令牌对的写入与级联撤销天然原子。
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<TokenMaps>,
}

#[derive(Debug, Default)]
struct TokenMaps {
    access: HashMap<String, AccessToken>,
    refresh: HashMap<String, RefreshToken>,
    refresh_by_access: HashMap<String, String>, // access_token_id -> refresh_token_id
}

impl InMemoryTokenStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, TokenMaps>> {
        self.inner
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, TokenMaps>> {
        self.inner
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))
    }
}

impl TokenStore for InMemoryTokenStore {
    fn save_pair(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()> {
        let mut maps = self.write()?;
        maps.access.insert(access.id.clone(), access.clone());
        maps.refresh.insert(refresh.id.clone(), refresh.clone());
        maps.refresh_by_access
            .insert(access.id.clone(), refresh.id.clone());
        Ok(())
    }

    fn save_access(&self, access: &AccessToken) -> Result<()> {
        let mut maps = self.write()?;
        maps.access.insert(access.id.clone(), access.clone());
        Ok(())
    }

    fn find_access(&self, token_id: &str) -> Result<Option<AccessToken>> {
        let maps = self.read()?;
        Ok(maps.access.get(token_id).cloned())
    }

    fn find_refresh(&self, token_id: &str) -> Result<Option<RefreshToken>> {
        let maps = self.read()?;
        Ok(maps.refresh.get(token_id).cloned())
    }

    fn refresh_for_access(&self, access_token_id: &str) -> Result<Option<RefreshToken>> {
        let maps = self.read()?;
        Ok(maps
            .refresh_by_access
            .get(access_token_id)
            .and_then(|id| maps.refresh.get(id))
            .cloned())
    }

    fn revoke_access(&self, token_id: &str) -> Result<bool> {
        let mut maps = self.write()?;

        let Some(access) = maps.access.get_mut(token_id) else {
            return Ok(false);
        };
        access.revoked = true;

        // 同一临界区内级联撤销关联的刷新令牌
        if let Some(refresh_id) = maps.refresh_by_access.get(token_id).cloned()
            && let Some(refresh) = maps.refresh.get_mut(&refresh_id)
        {
            refresh.revoked = true;
        }

        Ok(true)
    }

    fn try_consume_refresh(&self, token_id: &str) -> Result<Option<RefreshToken>> {
        // 写锁内检查并翻转撤销标记，保证单一赢家
        let mut maps = self.write()?;

        match maps.refresh.get_mut(token_id) {
            Some(refresh) if refresh.is_valid() => {
                refresh.revoked = true;
                Ok(Some(refresh.clone()))
            }
            _ => Ok(None),
        }
    }

    fn revoke_all_for_user(&self, user_id: &str) -> Result<usize> {
        let mut maps = self.write()?;

        let targets: Vec<String> = maps
            .access
            .values()
            .filter(|t| t.user_id.as_deref() == Some(user_id) && !t.revoked)
            .map(|t| t.id.clone())
            .collect();

        let count = targets.len();
        for access_id in targets {
            if let Some(access) = maps.access.get_mut(&access_id) {
                access.revoked = true;
            }
            if let Some(refresh_id) = maps.refresh_by_access.get(&access_id).cloned()
                && let Some(refresh) = maps.refresh.get_mut(&refresh_id)
            {
                refresh.revoked = true;
            }
        }

        Ok(count)
    }

    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<(usize, usize)> {
        let mut maps = self.write()?;

        let access_ids: Vec<String> = maps
            .access
            .values()
            .filter(|t| t.expires_at < cutoff)
            .map(|t| t.id.clone())
            .collect();
        let refresh_ids: Vec<String> = maps
            .refresh
            .values()
            .filter(|t| t.expires_at < cutoff)
            .map(|t| t.id.clone())
            .collect();

        for id in &access_ids {
            maps.access.remove(id);
            maps.refresh_by_access.remove(id);
        }
        for id in &refresh_ids {
            maps.refresh.remove(id);
        }

        Ok((access_ids.len(), refresh_ids.len()))
    }

    fn count_access(&self) -> Result<usize> {
        let maps = self.read()?;
        Ok(maps.access.len())
    }
}
