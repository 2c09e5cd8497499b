//! 令牌模块
//!
//! 提供凭证记录、成对存储、生命周期管理与过期清扫。
//!
//! ## 子模块
//!
//! - **access**: 访问令牌 / 刷新令牌记录与成对存储
//! - **lifecycle**: 令牌生命周期管理器（签发、校验、轮换、撤销）
//! - **sweep**: 按保留窗口回收早已过期的记录
//!
//! ## 生命周期示例
//!
//! ```rust
//! use oauthrs::token::lifecycle::{LifecycleConfig, TokenLifecycle};
//!
//! let lifecycle = TokenLifecycle::new(LifecycleConfig::default());
//!
//! let pair = lifecycle
//!     .issue_pair("client_1", Some("user_1"), vec!["read".to_string()])
//!     .unwrap();
//! assert!(lifecycle.validate(&pair.access_token.id).is_ok());
//!
//! // 撤销级联到刷新令牌
//! assert!(lifecycle.revoke(&pair.access_token.id).unwrap());
//! assert!(lifecycle.validate(&pair.access_token.id).is_err());
//! ```

pub mod access;
pub mod lifecycle;
pub mod sweep;

pub use access::{AccessToken, InMemoryTokenStore, RefreshToken, TokenStore};
pub use lifecycle::{FULL_ACCESS_SCOPE, LifecycleConfig, TokenLifecycle, TokenPair};
pub use sweep::{SweepReport, TokenSweeper};
