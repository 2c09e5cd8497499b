//! 授权范围模块
//!
//! 提供静态范围目录与范围字符串的解析、拼接。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认授权范围（请求未携带 `scope` 时使用）
pub const DEFAULT_SCOPE: &str = "read";

/// 静态范围目录
///
/// `GET /oauth/scopes` 的响应体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeCatalog {
    /// 范围名到描述的映射
    pub scopes: BTreeMap<String, String>,
}

impl ScopeCatalog {
    /// 本服务支持的范围目录
    pub fn available() -> Self {
        let mut scopes = BTreeMap::new();
        scopes.insert("read".to_string(), "Read access to resources".to_string());
        scopes.insert("write".to_string(), "Write access to resources".to_string());
        scopes.insert(
            "delete".to_string(),
            "Delete access to resources".to_string(),
        );
        scopes.insert("admin".to_string(), "Administrative access".to_string());
        Self { scopes }
    }

    /// 检查范围名是否在目录中
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }
}

/// 解析空格分隔的范围字符串
///
/// 空字符串或 `None` 解析为默认范围 `["read"]`。
///
/// # Example
///
/// ```rust
/// use oauthrs::oauth::scope::parse_scopes;
///
/// assert_eq!(parse_scopes(Some("read write")), vec!["read", "write"]);
/// assert_eq!(parse_scopes(None), vec!["read"]);
/// assert_eq!(parse_scopes(Some("")), vec!["read"]);
/// ```
pub fn parse_scopes(scope: Option<&str>) -> Vec<String> {
    match scope {
        Some(s) if !s.trim().is_empty() => {
            s.split_whitespace().map(|s| s.to_string()).collect()
        }
        _ => vec![DEFAULT_SCOPE.to_string()],
    }
}

/// 将范围列表拼接为空格分隔的字符串
pub fn join_scopes(scopes: &[String]) -> String {
    scopes.join(" ")
}
