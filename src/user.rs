//! 用户模块
//!
//! 提供资源所有者（用户）的记录结构与存储接口。
//! 用户密码只以哈希形式保存，明文永远不落库。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result, StorageError};
use crate::random::generate_uuid;

/// 用户记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户 ID
    pub id: String,

    /// 用户名称
    pub name: String,

    /// 邮箱（登录标识，存储内唯一）
    pub email: String,

    /// 密码哈希
    pub password_hash: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 创建新用户
    ///
    /// `password_hash` 必须是已经哈希过的密码，参见 [`crate::password`]。
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_uuid(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// 对外暴露的用户视图（不含密码哈希）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    /// 用户 ID
    pub id: String,
    /// 用户名称
    pub name: String,
    /// 邮箱
    pub email: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// 用户存储 trait
pub trait UserStore: Send + Sync {
    /// 保存用户
    fn save(&self, user: &User) -> Result<()>;

    /// 通过用户 ID 获取用户
    fn find_by_id(&self, user_id: &str) -> Result<Option<User>>;

    /// 通过邮箱获取用户
    fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// 获取用户总数
    fn count(&self) -> Result<usize>;
}

/// 内存用户存储
///
/// 用于开发和测试，生产环境建议通过 [`UserStore`] 接入持久化存储
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    email_index: RwLock<HashMap<String, String>>, // email -> user_id
}

impl InMemoryUserStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        let mut index = self
            .email_index
            .write()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;

        // 邮箱唯一：同一邮箱只能属于一个用户
        if let Some(existing_id) = index.get(&user.email)
            && existing_id != &user.id
        {
            return Err(Error::Storage(StorageError::AlreadyExists(format!(
                "user with email {}",
                user.email
            ))));
        }

        users.insert(user.id.clone(), user.clone());
        index.insert(user.email.clone(), user.id.clone());

        Ok(())
    }

    fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(users.get(user_id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let index = self
            .email_index
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;

        if let Some(user_id) = index.get(email) {
            let users = self.users.read().map_err(|_| {
                Error::Storage(StorageError::OperationFailed("lock poisoned".into()))
            })?;
            Ok(users.get(user_id).cloned())
        } else {
            Ok(None)
        }
    }

    fn count(&self) -> Result<usize> {
        let users = self
            .users
            .read()
            .map_err(|_| Error::Storage(StorageError::OperationFailed("lock poisoned".into())))?;
        Ok(users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("Alice", "alice@example.com", "$argon2id$fake");

        assert!(!user.id.is_empty());
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_store_save_and_find() {
        let store = InMemoryUserStore::new();
        let user = User::new("Alice", "alice@example.com", "$argon2id$fake");

        store.save(&user).unwrap();

        let by_id = store.find_by_id(&user.id).unwrap();
        assert!(by_id.is_some());

        let by_email = store.find_by_email("alice@example.com").unwrap();
        assert_eq!(by_email.unwrap().id, user.id);

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_store_email_uniqueness() {
        let store = InMemoryUserStore::new();
        let user1 = User::new("Alice", "alice@example.com", "$argon2id$fake");
        let user2 = User::new("Impostor", "alice@example.com", "$argon2id$other");

        store.save(&user1).unwrap();
        let result = store.save(&user2);
        assert!(result.is_err());
    }

    #[test]
    fn test_store_update_same_user() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("Alice", "alice@example.com", "$argon2id$fake");
        store.save(&user).unwrap();

        // 同一用户重新保存不算邮箱冲突
        user.name = "Alice Cooper".to_string();
        store.save(&user).unwrap();

        let found = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(found.name, "Alice Cooper");
    }

    #[test]
    fn test_user_view_hides_password_hash() {
        let user = User::new("Alice", "alice@example.com", "$argon2id$fake");
        let view = UserView::from(&user);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("alice@example.com"));
    }
}
