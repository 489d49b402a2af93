// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashSet;
use regex::Regex;
use url::Url;

/// 将可能为相对路径的标识符解析为绝对URL
///
/// * 已带 scheme 的输入原样返回
/// * 以 `#` 开头的输入视为同一文档内的锚点：保留基础URL的路径，替换已有片段
/// * 其他输入按标准的 base + relative 规则解析
///
/// 结果无法解析为 scheme + host 形式时返回 `None`
pub fn resolve_url(base: &str, input: &str) -> Option<String> {
    let input = input.trim();

    if let Ok(absolute) = Url::parse(input) {
        return absolute.has_host().then(|| input.to_string());
    }

    let mut base = Url::parse(base.trim()).ok()?;

    let resolved = if let Some(fragment) = input.strip_prefix('#') {
        // 文档站点常用 hash 路由实现页内导航
        if fragment.is_empty() {
            base.set_fragment(None);
        } else {
            base.set_fragment(Some(fragment));
        }
        base
    } else {
        base.join(input).ok()?
    };

    resolved.has_host().then(|| resolved.to_string())
}

/// 规范化标识符
///
/// 小写 scheme/host，合并重复的路径分隔符，按键排序查询参数，片段保持不变。
/// 无法解析的输入只做首尾空白裁剪
pub fn normalize_url(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };

    if url.cannot_be_a_base() {
        return url.to_string();
    }

    let path = collapse_slashes(url.path());
    url.set_path(&path);

    if url.query().is_some() {
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            // 稳定排序，同名参数保持原有顺序
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    url.to_string()
}

/// 两个标识符的规范化主机名是否相同
pub fn same_scope(a: &str, b: &str) -> bool {
    match (host_of(a), host_of(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn host_of(identifier: &str) -> Option<String> {
    Url::parse(identifier.trim())
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(c);
    }
    collapsed
}

/// URL解析器
///
/// 每次爬取运行持有一个实例，内部维护本次运行的已访问集合。
/// `should_visit` 与 `mark_visited` 是两个独立步骤，并发调用方需要显式提交访问记录
#[derive(Debug, Default)]
pub struct UrlResolver {
    /// 已访问的规范化标识符
    visited: DashSet<String>,
    /// 拒绝访问的模式
    deny_patterns: Vec<Regex>,
    /// 允许访问的主机（为空表示不限制范围）
    allowed_hosts: Vec<String>,
}

impl UrlResolver {
    /// 创建不限制范围的解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制访问范围
    ///
    /// 条目可以是完整URL或裸主机名
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_hosts = hosts
            .into_iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim();
                if entry.is_empty() {
                    return None;
                }
                Some(host_of(entry).unwrap_or_else(|| entry.to_ascii_lowercase()))
            })
            .collect();
        self
    }

    /// 设置拒绝模式（正则表达式）
    pub fn with_deny_patterns<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deny_patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// 是否限制了访问范围
    pub fn is_scope_restricted(&self) -> bool {
        !self.allowed_hosts.is_empty()
    }

    /// 解析标识符，参见 [`resolve_url`]
    pub fn resolve(&self, base: &str, input: &str) -> Option<String> {
        resolve_url(base, input)
    }

    /// 规范化标识符，参见 [`normalize_url`]
    pub fn normalize(&self, identifier: &str) -> String {
        normalize_url(identifier)
    }

    /// 判断标识符是否应该访问
    ///
    /// 返回 true 时不会自动记录访问
    pub fn should_visit(&self, identifier: &str) -> bool {
        let normalized = normalize_url(identifier);

        if self.visited.contains(&normalized) {
            return false;
        }

        if self.deny_patterns.iter().any(|p| p.is_match(&normalized)) {
            return false;
        }

        if self.is_scope_restricted() {
            match host_of(&normalized) {
                Some(host) => self.allowed_hosts.iter().any(|allowed| *allowed == host),
                None => false,
            }
        } else {
            true
        }
    }

    /// 记录访问，首次记录时返回 true
    pub fn mark_visited(&self, identifier: &str) -> bool {
        self.visited.insert(normalize_url(identifier))
    }

    /// 是否已访问
    pub fn is_visited(&self, identifier: &str) -> bool {
        self.visited.contains(&normalize_url(identifier))
    }

    /// 已访问数量
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
