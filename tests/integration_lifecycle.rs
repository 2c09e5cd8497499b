//! 集成测试：凭证生命周期与并发约束
//!
//! 覆盖生命周期状态机的可测性质：过期是时间的纯函数、撤销幂等、
//! 轮换使旧令牌对失效、并发兑换单一赢家，以及保留窗口清扫。

use std::sync::Arc;

use chrono::Duration;
use oauthrs::error::{Error, TokenError};
use oauthrs::oauth::code::{AuthCodeStore, AuthorizationCode, InMemoryAuthCodeStore};
use oauthrs::session::{InMemorySessionTokenStore, SessionToken, SessionTokenStore};
use oauthrs::token::access::InMemoryTokenStore;
use oauthrs::token::lifecycle::{LifecycleConfig, TokenLifecycle};
use oauthrs::token::sweep::TokenSweeper;

/// 测试过期是时间的纯函数：不需要显式撤销
#[test]
fn test_expiry_is_derived_from_time() {
    let lifecycle =
        TokenLifecycle::new(LifecycleConfig::default().with_access_ttl(Duration::milliseconds(30)));
    let pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    // 签发后立即有效
    assert!(lifecycle.validate(&pair.access_token.id).is_ok());

    // 过期后无需任何写操作即失效
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert!(matches!(
        lifecycle.validate(&pair.access_token.id),
        Err(Error::Token(TokenError::Expired))
    ));
}

/// 测试撤销幂等：两次调用 {true, true}，未知 id 返回 false，从不报错
#[test]
fn test_revoke_idempotence() {
    let lifecycle = TokenLifecycle::new(LifecycleConfig::default());
    let pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    assert!(lifecycle.revoke(&pair.access_token.id).unwrap());
    assert!(lifecycle.revoke(&pair.access_token.id).unwrap());
    assert!(!lifecycle.revoke("never-issued").unwrap());

    assert!(lifecycle.validate(&pair.access_token.id).is_err());
}

/// 测试轮换使旧访问令牌失效
#[test]
fn test_rotation_invalidates_prior_access_token() {
    let lifecycle = TokenLifecycle::new(LifecycleConfig::default());
    let pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec!["read".to_string()])
        .unwrap();

    let rotated = lifecycle.rotate(&pair.refresh_token.id).unwrap();

    assert!(lifecycle.validate(&pair.access_token.id).is_err());
    assert!(lifecycle.validate(&rotated.access_token.id).is_ok());
}

/// 测试并发轮换同一个刷新令牌：恰好一个赢家，其余 invalid
#[test]
fn test_concurrent_rotation_single_winner() {
    let lifecycle = Arc::new(TokenLifecycle::new(LifecycleConfig::default()));
    let pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let lifecycle = Arc::clone(&lifecycle);
        let refresh_id = pair.refresh_token.id.clone();
        handles.push(std::thread::spawn(move || {
            lifecycle.rotate(&refresh_id).is_ok()
        }));
    }

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

/// 测试并发消费同一个授权码：恰好一个赢家
#[test]
fn test_concurrent_code_consumption_single_winner() {
    let store = Arc::new(InMemoryAuthCodeStore::new());
    let code = AuthorizationCode::new(
        "client_1",
        "user_1",
        vec!["read".to_string()],
        "https://example.com/cb",
        Duration::minutes(10),
    )
    .unwrap();
    store.save(&code).unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let code_id = code.id.clone();
        handles.push(std::thread::spawn(move || {
            store.try_consume(&code_id, "client_1").unwrap().is_some()
        }));
    }

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

/// 测试轮换失败的统一口径：不存在 / 已撤销 / 已过期不可区分
#[test]
fn test_rotation_failure_oracle_resistance() {
    let lifecycle = TokenLifecycle::new(LifecycleConfig::default());

    // 已撤销（通过级联）
    let revoked_pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();
    lifecycle.revoke(&revoked_pair.access_token.id).unwrap();

    // 已过期
    let expired_lifecycle = TokenLifecycle::new(
        LifecycleConfig::default().with_refresh_ttl(Duration::seconds(-1)),
    );
    let expired_pair = expired_lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    let outcomes = [
        lifecycle.rotate("never-issued"),
        lifecycle.rotate(&revoked_pair.refresh_token.id),
        expired_lifecycle.rotate(&expired_pair.refresh_token.id),
    ];
    for outcome in outcomes {
        assert!(matches!(outcome, Err(Error::Token(TokenError::Invalid))));
    }
}

/// 测试签发的令牌对原子落库：访问令牌与刷新令牌互相可达
#[test]
fn test_issue_pair_links_both_records() {
    let store = Arc::new(InMemoryTokenStore::new());
    let lifecycle = TokenLifecycle::with_store(LifecycleConfig::default(), store.clone());

    let pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    use oauthrs::token::access::TokenStore;
    let linked = store
        .refresh_for_access(&pair.access_token.id)
        .unwrap()
        .unwrap();
    assert_eq!(linked.id, pair.refresh_token.id);
    assert_eq!(
        store.find_refresh(&pair.refresh_token.id).unwrap().unwrap().access_token_id,
        pair.access_token.id
    );
}

/// 测试保留窗口清扫：只回收早已过期的记录，有效性从不依赖清扫
#[test]
fn test_sweep_respects_retention_window() {
    let codes = Arc::new(InMemoryAuthCodeStore::new());
    let tokens = Arc::new(InMemoryTokenStore::new());
    let sessions = Arc::new(InMemorySessionTokenStore::new());

    let lifecycle = TokenLifecycle::with_store(LifecycleConfig::default(), tokens.clone());
    let live_pair = lifecycle
        .issue_pair("client_1", Some("user_1"), vec![])
        .unwrap();

    // 过期超过 7 天的会话令牌
    let stale_session = SessionToken::new("user_1", "gone", Duration::days(-10)).unwrap();
    sessions.save(&stale_session).unwrap();
    // 刚过期的授权码（保留窗口内）
    let recent_code = AuthorizationCode::new(
        "client_1",
        "user_1",
        vec![],
        "https://example.com/cb",
        Duration::minutes(-5),
    )
    .unwrap();
    codes.save(&recent_code).unwrap();

    let report = TokenSweeper::new(codes.clone(), tokens.clone(), sessions.clone())
        .sweep()
        .unwrap();

    assert_eq!(report.session_tokens, 1);
    assert_eq!(report.auth_codes, 0);
    assert_eq!(report.access_tokens, 0);

    // 保留窗口内的过期授权码还在，但依旧无法消费
    assert!(codes.find_by_id(&recent_code.id).unwrap().is_some());
    assert!(
        codes
            .try_consume(&recent_code.id, "client_1")
            .unwrap()
            .is_none()
    );
    // 清扫不影响有效令牌
    assert!(lifecycle.validate(&live_pair.access_token.id).is_ok());
}

/// 测试用户级撤销：所有访问令牌与刷新令牌一起出局
#[test]
fn test_revoke_all_for_user_cascades() {
    let lifecycle = TokenLifecycle::new(LifecycleConfig::default());

    let pairs: Vec<_> = (0..3)
        .map(|_| {
            lifecycle
                .issue_pair("client_1", Some("user_1"), vec![])
                .unwrap()
        })
        .collect();

    assert_eq!(lifecycle.revoke_all_for_user("user_1").unwrap(), 3);

    for pair in &pairs {
        assert!(lifecycle.validate(&pair.access_token.id).is_err());
        assert!(lifecycle.rotate(&pair.refresh_token.id).is_err());
    }
}
