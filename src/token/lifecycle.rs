//! 令牌生命周期管理模块
//!
//! 所有授权处理器与第一方会话流程都经由本模块签发、校验、
//! 轮换与撤销令牌。
//!
//! ## 状态机
//!
//! 每种凭证的状态机为 `Active -> Revoked`（终态）与
//! `Active -> Expired`（终态，由时间驱动，在校验时惰性求值）。
//! 凭证一旦离开 `Active` 便不会再回来。
//!
//! ## 示例
//!
//! ```rust
//! use oauthrs::token::lifecycle::{LifecycleConfig, TokenLifecycle};
//!
//! let lifecycle = TokenLifecycle::new(LifecycleConfig::default());
//!
//! // 签发令牌对
//! let pair = lifecycle
//!     .issue_pair("client_1", Some("user_1"), vec!["read".to_string()])
//!     .unwrap();
//!
//! // 校验访问令牌
//! let validated = lifecycle.validate(&pair.access_token.id).unwrap();
//! assert_eq!(validated.client_id, "client_1");
//!
//! // 轮换：旧令牌对失效，新令牌对继承 client/user/scopes
//! let rotated = lifecycle.rotate(&pair.refresh_token.id).unwrap();
//! assert!(lifecycle.validate(&pair.access_token.id).is_err());
//! assert!(lifecycle.validate(&rotated.access_token.id).is_ok());
//! ```

use chrono::Duration;
use std::sync::Arc;

use crate::error::{Error, Result, TokenError};

use super::access::{AccessToken, InMemoryTokenStore, RefreshToken, TokenStore};

/// 会话流程使用的全量授权范围
pub const FULL_ACCESS_SCOPE: &str = "*";

/// 一次签发得到的令牌对
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// 访问令牌
    pub access_token: AccessToken,
    /// 刷新令牌
    pub refresh_token: RefreshToken,
}

/// 令牌生命周期配置
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// OAuth 流程访问令牌有效期（默认 1 小时）
    pub access_ttl: Duration,

    /// 会话流程访问令牌有效期（默认 15 分钟）
    pub session_access_ttl: Duration,

    /// 刷新令牌有效期（默认 30 天）
    pub refresh_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::hours(1),
            session_access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
        }
    }
}

impl LifecycleConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 OAuth 访问令牌有效期
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// 设置会话访问令牌有效期
    pub fn with_session_access_ttl(mut self, ttl: Duration) -> Self {
        self.session_access_ttl = ttl;
        self
    }

    /// 设置刷新令牌有效期
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

/// 令牌生命周期管理器
///
/// 授权处理器与会话流程共享的中心权威。
#[derive(Clone)]
pub struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    config: LifecycleConfig,
}

impl TokenLifecycle {
    /// 使用默认内存存储创建管理器
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            store: Arc::new(InMemoryTokenStore::new()),
            config,
        }
    }

    /// 使用自定义存储创建管理器
    pub fn with_store(config: LifecycleConfig, store: Arc<dyn TokenStore>) -> Self {
        Self { store, config }
    }

    /// 底层令牌存储
    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    /// 当前配置
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// 签发一个访问令牌 + 刷新令牌对
    ///
    /// 两条记录通过单次存储操作持久化：要么都写入，要么都不写入。
    /// 部分失败的重试不会产生两个存活的令牌对。
    pub fn issue_pair(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        scopes: Vec<String>,
    ) -> Result<TokenPair> {
        let access = AccessToken::new(
            client_id,
            user_id.map(|s| s.to_string()),
            scopes,
            self.config.access_ttl,
        )?;
        let refresh = RefreshToken::new(&access.id, self.config.refresh_ttl)?;

        self.store.save_pair(&access, &refresh)?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
        })
    }

    /// 为会话流程签发一个短有效期的全量访问令牌
    ///
    /// 不附带 OAuth 刷新令牌；会话刷新令牌由会话流程自行管理。
    pub fn issue_session_access(&self, client_id: &str, user_id: &str) -> Result<AccessToken> {
        let access = AccessToken::new(
            client_id,
            Some(user_id.to_string()),
            vec![FULL_ACCESS_SCOPE.to_string()],
            self.config.session_access_ttl,
        )?;
        self.store.save_access(&access)?;
        Ok(access)
    }

    /// 校验访问令牌
    ///
    /// 有效当且仅当记录存在、未撤销且未过期。无副作用。
    pub fn validate(&self, token_id: &str) -> Result<AccessToken> {
        let token = self
            .store
            .find_access(token_id)?
            .ok_or(Error::Token(TokenError::NotFound))?;

        if token.revoked {
            return Err(Error::Token(TokenError::Revoked));
        }
        if token.is_expired() {
            return Err(Error::Token(TokenError::Expired));
        }

        Ok(token)
    }

    /// 撤销访问令牌并级联撤销其关联的刷新令牌
    ///
    /// 返回 `false` 当且仅当 id 没有对应的记录。幂等，不会报错。
    pub fn revoke(&self, token_id: &str) -> Result<bool> {
        self.store.revoke_access(token_id)
    }

    /// 轮换刷新令牌
    ///
    /// 消费旧的刷新令牌，撤销旧的访问令牌 + 刷新令牌对，签发一个
    /// 继承相同 client/user/scopes 的新令牌对。
    ///
    /// 刷新令牌不存在、已撤销、已过期三种失败对调用方不可区分，
    /// 一律返回 [`TokenError::Invalid`]，避免成为探测预言机。
    /// 并发轮换同一个刷新令牌时恰好一个调用成功。
    pub fn rotate(&self, refresh_token_id: &str) -> Result<TokenPair> {
        let consumed = self
            .store
            .try_consume_refresh(refresh_token_id)?
            .ok_or(Error::Token(TokenError::Invalid))?;

        let old_access = self
            .store
            .find_access(&consumed.access_token_id)?
            .ok_or(Error::Token(TokenError::Invalid))?;

        // 旧令牌对在新令牌对诞生前就已出局
        self.store.revoke_access(&old_access.id)?;

        self.issue_pair(
            &old_access.client_id,
            old_access.user_id.as_deref(),
            old_access.scopes.clone(),
        )
    }

    /// 轮换刷新令牌，并要求令牌归属于指定客户端
    ///
    /// 归属其他客户端的刷新令牌与无效令牌对调用方不可区分，
    /// 且不会被本次调用消费。
    pub fn rotate_for_client(&self, refresh_token_id: &str, client_id: &str) -> Result<TokenPair> {
        let refresh = self
            .store
            .find_refresh(refresh_token_id)?
            .ok_or(Error::Token(TokenError::Invalid))?;
        let access = self
            .store
            .find_access(&refresh.access_token_id)?
            .ok_or(Error::Token(TokenError::Invalid))?;

        if access.client_id != client_id {
            return Err(Error::Token(TokenError::Invalid));
        }

        self.rotate(refresh_token_id)
    }

    /// 撤销指定用户的所有访问令牌（级联撤销关联的刷新令牌）
    ///
    /// 返回本次新撤销的访问令牌数量。
    pub fn revoke_all_for_user(&self, user_id: &str) -> Result<usize> {
        self.store.revoke_all_for_user(user_id)
    }
}
