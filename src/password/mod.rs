//! 密码哈希模块
//!
//! 提供安全的密码哈希和验证功能，支持多种哈希算法。
//! 注册与登录流程中用户密码只以哈希形式存储。
//!
//! ## 支持的算法
//!
//! - **Argon2** (推荐): 内存硬哈希算法，抵抗 GPU/ASIC 攻击（需启用 `argon2` feature）
//! - **bcrypt**: 经典的密码哈希算法，广泛使用（需启用 `bcrypt` feature）
//!
//! ## 示例
//!
//! ```rust
//! use oauthrs::password::{hash_password, verify_password};
//!
//! // 哈希密码
//! let hash = hash_password("my_secure_password").unwrap();
//!
//! // 验证密码
//! let is_valid = verify_password("my_secure_password", &hash).unwrap();
//! assert!(is_valid);
//! ```

mod hasher;

pub use hasher::{Algorithm, PasswordHasher, hash_password, verify_password};
