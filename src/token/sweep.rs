//! 过期凭证清扫模块
//!
//! 按保留窗口物理删除早已过期的凭证记录。清扫纯粹是存储回收：
//! 凭证的有效性在校验时由 `expires_at` 惰性判定，从不依赖清扫
//! 是否运行过；不存在于存储中的记录等价于"无效"，而不是"有效"。

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::oauth::code::AuthCodeStore;
use crate::session::SessionTokenStore;

use super::access::TokenStore;

/// 一次清扫的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 删除的授权码数量
    pub auth_codes: usize,
    /// 删除的访问令牌数量
    pub access_tokens: usize,
    /// 删除的刷新令牌数量
    pub refresh_tokens: usize,
    /// 删除的会话令牌数量
    pub session_tokens: usize,
}

impl SweepReport {
    /// 删除的记录总数
    pub fn total(&self) -> usize {
        self.auth_codes + self.access_tokens + self.refresh_tokens + self.session_tokens
    }
}

/// 过期凭证清扫器
///
/// 删除 `expires_at` 早于 `now - retention` 的记录。
/// 保留窗口内的过期记录留在存储中（例如供审计查询），
/// 它们照常校验为无效。
pub struct TokenSweeper {
    codes: Arc<dyn AuthCodeStore>,
    tokens: Arc<dyn TokenStore>,
    sessions: Arc<dyn SessionTokenStore>,
    retention: Duration,
}

impl TokenSweeper {
    /// 创建清扫器，默认保留过期记录 7 天
    pub fn new(
        codes: Arc<dyn AuthCodeStore>,
        tokens: Arc<dyn TokenStore>,
        sessions: Arc<dyn SessionTokenStore>,
    ) -> Self {
        Self {
            codes,
            tokens,
            sessions,
            retention: Duration::days(7),
        }
    }

    /// 设置保留窗口
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// 执行一次清扫
    pub fn sweep(&self) -> Result<SweepReport> {
        let cutoff = Utc::now() - self.retention;

        let auth_codes = self.codes.purge_expired_before(cutoff)?;
        let (access_tokens, refresh_tokens) = self.tokens.purge_expired_before(cutoff)?;
        let session_tokens = self.sessions.purge_expired_before(cutoff)?;

        Ok(SweepReport {
            auth_codes,
            access_tokens,
            refresh_tokens,
            session_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::code::{AuthorizationCode, InMemoryAuthCodeStore};
    use crate::session::{InMemorySessionTokenStore, SessionToken};
    use crate::token::access::{AccessToken, InMemoryTokenStore, RefreshToken};

    #[test]
    fn test_sweep_removes_only_old_records() {
        let codes = Arc::new(InMemoryAuthCodeStore::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let sessions = Arc::new(InMemorySessionTokenStore::new());

        // 过期超过保留窗口的记录
        let old_code = AuthorizationCode::new(
            "client_1",
            "user_1",
            vec![],
            "https://example.com/cb",
            Duration::days(-10),
        )
        .unwrap();
        codes.save(&old_code).unwrap();

        let old_access =
            AccessToken::new("client_1", None, vec![], Duration::days(-10)).unwrap();
        let old_refresh = RefreshToken::new(&old_access.id, Duration::days(-10)).unwrap();
        tokens.save_pair(&old_access, &old_refresh).unwrap();

        let old_session =
            SessionToken::new("user_1", "access_x", Duration::days(-10)).unwrap();
        sessions.save(&old_session).unwrap();

        // 刚过期但仍在保留窗口内的记录
        let recent_access =
            AccessToken::new("client_1", None, vec![], Duration::hours(-1)).unwrap();
        tokens.save_access(&recent_access).unwrap();

        let sweeper = TokenSweeper::new(codes.clone(), tokens.clone(), sessions.clone());
        let report = sweeper.sweep().unwrap();

        assert_eq!(report.auth_codes, 1);
        assert_eq!(report.access_tokens, 1);
        assert_eq!(report.refresh_tokens, 1);
        assert_eq!(report.session_tokens, 1);
        assert_eq!(report.total(), 4);

        // 保留窗口内的记录还在，但校验为无效
        let kept = tokens.find_access(&recent_access.id).unwrap().unwrap();
        assert!(!kept.is_valid());
    }

    #[test]
    fn test_sweep_with_custom_retention() {
        let codes = Arc::new(InMemoryAuthCodeStore::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let sessions = Arc::new(InMemorySessionTokenStore::new());

        let recent_access =
            AccessToken::new("client_1", None, vec![], Duration::hours(-2)).unwrap();
        tokens.save_access(&recent_access).unwrap();

        // 零保留窗口：所有过期记录立即回收
        let sweeper = TokenSweeper::new(codes, tokens.clone(), sessions)
            .with_retention(Duration::zero());
        let report = sweeper.sweep().unwrap();

        assert_eq!(report.access_tokens, 1);
        assert!(tokens.find_access(&recent_access.id).unwrap().is_none());
    }

    #[test]
    fn test_sweep_empty_stores() {
        let sweeper = TokenSweeper::new(
            Arc::new(InMemoryAuthCodeStore::new()),
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(InMemorySessionTokenStore::new()),
        );

        assert_eq!(sweeper.sweep().unwrap(), SweepReport::default());
    }
}
