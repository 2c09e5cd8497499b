//! 授权码模块
//!
//! 提供授权码的生成、存储与一次性消费。
//!
//! 授权码是严格一次性的凭证：兑换操作必须在同一个原子步骤中
//! 将其标记为已撤销，保证并发兑换同一个码时只有一个请求成功。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result, StorageError};
use crate::random::generate_opaque_token;

/// 授权码记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// 授权码值（不透明标识符）
    pub id: String,

    /// 签发该码的客户端 ID
    pub client_id: String,

    /// 授权的资源所有者 ID
    pub user_id: String,

    /// 授权范围列表
    pub scopes: Vec<String>,

    /// 绑定的重定向 URI
    pub redirect_uri: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 过期时间
    pub expires_at: DateTime<Utc>,

    /// 是否已被撤销（兑换即撤销）
    #[serde(default)]
    pub revoked: bool,
}

impl AuthorizationCode {
    /// 创建新的授权码
    pub fn new(
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        scopes: Vec<String>,
        redirect_uri: impl Into<String>,
        expires_in: Duration,
    ) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: generate_opaque_token()?,
            client_id: client_id.into(),
            user_id: user_id.into(),
            scopes,
            redirect_uri: redirect_uri.into(),
            created_at: now,
            expires_at: now + expires_in,
            revoked: false,
        })
    }

    /// 检查授权码是否已过期
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// 检查授权码是否有效（未撤销且未过期）
    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }
}

/// 授权码存储 trait
pub trait AuthCodeStore: Send + Sync {
    /// 保存授权码
    fn save(&self, code: &AuthorizationCode) -> Result<()>;

    /// 通过 id 获取授权码
    fn find_by_id(&self, code_id: &str) -> Result<Option<AuthorizationCode>>;

    /// 原子地消费授权码
    ///
    /// 只有当码存在、属于 `client_id`、未撤销且未过期时才消费成功，
    /// 并在同一个原子步骤中将其标记为已撤销。并发消费同一个码时
    /// 恰好一个调用方获得记录，其余一律得到 `None`。
    fn try_consume(&self, code_id: &str, client_id: &str) -> Result<Option<AuthorizationCode>>;

    /// 删除在指定时间之前过期的授权码，返回删除数量
    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// 获取授权码总数
    fn count(&self) -> Result<usize>;
}

/// 内存授权码存储
#[derive(Debug, Default)]
pub struct InMemoryAuthCodeStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl InMemoryAuthCodeStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthCodeStore for InMemoryAuthCodeStore {
    fn save(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = self
            .codes
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        codes.insert(code.id.clone(), code.clone());
        Ok(())
    }

    fn find_by_id(&self, code_id: &str) -> Result<Option<AuthorizationCode>> {
        let codes = self
            .codes
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(codes.get(code_id).cloned())
    }

    fn try_consume(&self, code_id: &str, client_id: &str) -> Result<Option<AuthorizationCode>> {
        // 写锁内检查并翻转撤销标记，保证单一赢家
        let mut codes = self
            .codes
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;

        match codes.get_mut(code_id) {
            Some(code) if code.client_id == client_id && code.is_valid() => {
                code.revoked = true;
                Ok(Some(code.clone()))
            }
            _ => Ok(None),
        }
    }

    fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut codes = self
            .codes
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;

        let to_remove: Vec<String> = codes
            .iter()
            .filter(|(_, c)| c.expires_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        let count = to_remove.len();
        for id in to_remove {
            codes.remove(&id);
        }

        Ok(count)
    }

    fn count(&self) -> Result<usize> {
        let codes = self
            .codes
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(codes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code() -> AuthorizationCode {
        AuthorizationCode::new(
            "client_1",
            "user_1",
            vec!["read".to_string()],
            "https://example.com/cb",
            Duration::minutes(10),
        )
        .unwrap()
    }

    #[test]
    fn test_code_creation() {
        let code = sample_code();

        assert_eq!(code.id.len(), 40);
        assert!(!code.revoked);
        assert!(code.is_valid());
    }

    #[test]
    fn test_code_expiration() {
        let code = AuthorizationCode::new(
            "client_1",
            "user_1",
            vec![],
            "https://example.com/cb",
            Duration::seconds(-10),
        )
        .unwrap();

        assert!(code.is_expired());
        assert!(!code.is_valid());
    }

    #[test]
    fn test_consume_succeeds_once() {
        let store = InMemoryAuthCodeStore::new();
        let code = sample_code();
        store.save(&code).unwrap();

        // 第一次消费成功
        let consumed = store.try_consume(&code.id, "client_1").unwrap();
        assert!(consumed.is_some());
        assert_eq!(consumed.unwrap().user_id, "user_1");

        // 第二次消费失败（已撤销）
        let again = store.try_consume(&code.id, "client_1").unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_consume_checks_client_binding() {
        let store = InMemoryAuthCodeStore::new();
        let code = sample_code();
        store.save(&code).unwrap();

        // 其他客户端无法消费，且码不被烧毁
        assert!(store.try_consume(&code.id, "other_client").unwrap().is_none());
        assert!(store.find_by_id(&code.id).unwrap().unwrap().is_valid());

        // 原客户端仍可消费
        assert!(store.try_consume(&code.id, "client_1").unwrap().is_some());
    }

    #[test]
    fn test_consume_rejects_expired() {
        let store = InMemoryAuthCodeStore::new();
        let code = AuthorizationCode::new(
            "client_1",
            "user_1",
            vec![],
            "https://example.com/cb",
            Duration::seconds(-10),
        )
        .unwrap();
        store.save(&code).unwrap();

        assert!(store.try_consume(&code.id, "client_1").unwrap().is_none());
    }

    #[test]
    fn test_consume_unknown_code() {
        let store = InMemoryAuthCodeStore::new();
        assert!(store.try_consume("missing", "client_1").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryAuthCodeStore::new());
        let code = sample_code();
        store.save(&code).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let code_id = code.id.clone();
            handles.push(std::thread::spawn(move || {
                store.try_consume(&code_id, "client_1").unwrap().is_some()
            }));
        }

        // 并发兑换同一个码，恰好一个赢家
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryAuthCodeStore::new();

        let expired = AuthorizationCode::new(
            "client_1",
            "user_1",
            vec![],
            "https://example.com/cb",
            Duration::days(-10),
        )
        .unwrap();
        let live = sample_code();

        store.save(&expired).unwrap();
        store.save(&live).unwrap();

        let purged = store
            .purge_expired_before(Utc::now() - Duration::days(7))
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.find_by_id(&live.id).unwrap().is_some());
    }
}
