// 远程文件名冲突处理
//
// 与目标目录已有文件同名时，在文件名后追加 `_N` 后缀：
// - 目录中已有 `名称_数字.扩展名` 形式的文件时，取最大数字 + 1
// - 后缀解析失败时按 0 处理
// - 没有冲突时原样返回本地路径

use crate::config::FreshNamePolicy;
use crate::remote::UploadError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// 同名文件的匹配规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// 包含基础名和 `_`（批量上传）
    Underscore,
    /// 包含基础名、`_` 和 `.`（单文件上传）
    UnderscoreAndDot,
}

/// 拆分本地路径为（基础名，扩展名）
///
/// 扩展名包含前导 `.`，没有扩展名时为空字符串
pub fn split_local_name(local_path: &str) -> (String, String) {
    let path = Path::new(local_path);
    let base_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = match path.extension() {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_string_lossy()),
        _ => String::new(),
    };
    (base_name, extension)
}

/// 解析条目中最后一个 `_` 之后的数字后缀
///
/// 后缀中有 `.` 时截断到最后一个 `.`，没有时去掉最后一个字符
fn parse_suffix(entry: &str) -> i32 {
    let tail = match entry.rfind('_') {
        Some(idx) => &entry[idx + 1..],
        None => entry,
    }
    .trim();

    let number = match tail.rfind('.') {
        Some(idx) => &tail[..idx],
        None => match tail.char_indices().last() {
            Some((idx, _)) => &tail[..idx],
            None => tail,
        },
    };

    number.trim().parse::<i32>().unwrap_or(0)
}

/// 文件名冲突解析器
#[derive(Debug, Clone, Copy)]
pub struct NameResolver {
    rule: MatchRule,
}

impl NameResolver {
    pub fn new(rule: MatchRule) -> Self {
        Self { rule }
    }

    /// 单文件上传使用的解析器
    pub fn single_file() -> Self {
        Self::new(MatchRule::UnderscoreAndDot)
    }

    /// 批量上传使用的解析器
    pub fn batch() -> Self {
        Self::new(MatchRule::Underscore)
    }

    pub fn rule(&self) -> MatchRule {
        self.rule
    }

    fn is_similar(&self, entry: &str, base_name: &str) -> bool {
        let matched = entry.contains(base_name) && entry.contains('_');
        match self.rule {
            MatchRule::Underscore => matched,
            MatchRule::UnderscoreAndDot => matched && entry.contains('.'),
        }
    }

    /// 计算上传使用的远程文件名
    ///
    /// 只读取 `listing`，不会修改
    pub fn resolve(&self, local_path: &str, listing: &[String]) -> String {
        let (base_name, extension) = split_local_name(local_path);

        let similar: Vec<&String> = listing
            .iter()
            .filter(|entry| self.is_similar(entry, &base_name))
            .collect();

        if !similar.is_empty() {
            info!("FTP 上发现带 _ 的相似文件名: {}", base_name);
            let max = similar
                .iter()
                .map(|entry| parse_suffix(entry))
                .fold(0i64, |max, n| max.max(n as i64));

            let result = format!("{}_{}{}", base_name, max + 1, extension);
            info!("文件名更新为: {}", result);
            return result;
        }

        if listing.iter().any(|entry| entry == local_path) {
            let result = format!("{}_0{}", base_name, extension);
            info!("发现同名文件，文件名更新为: {}", result);
            return result;
        }

        debug!("无文件名冲突: {}", local_path);
        local_path.to_string()
    }
}

/// 远程文件名分配器
///
/// 在 `NameResolver` 的基础上：
/// - 按 `FreshNamePolicy` 处理无冲突时的文件名
/// - 每次分配后把结果追加到内存中的列表，保证同一批次内文件名不重复
pub struct RemoteNamer {
    resolver: NameResolver,
    policy: FreshNamePolicy,
    listing: Vec<String>,
    assigned: HashSet<String>,
}

impl RemoteNamer {
    pub fn new(resolver: NameResolver, policy: FreshNamePolicy, listing: Vec<String>) -> Self {
        Self {
            resolver,
            policy,
            listing,
            assigned: HashSet::new(),
        }
    }

    /// 为本地文件分配远程文件名
    pub fn assign(&mut self, local_path: &Path) -> Result<String, UploadError> {
        let file_name = local_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| UploadError::InvalidPath(local_path.to_path_buf()))?;

        let local = local_path.to_string_lossy().to_string();
        let resolved = self.resolver.resolve(&local, &self.listing);
        let fresh = resolved == local;

        let mut name = match self.policy {
            FreshNamePolicy::FileName if fresh => file_name,
            _ => resolved,
        };

        if self.is_taken(&name) {
            let (base_name, extension) = split_local_name(&local);
            let next = self.next_free(&base_name, &extension);
            info!("文件名 {} 已被占用，改用: {}", name, next);
            name = next;
        }

        self.listing.push(name.clone());
        self.assigned.insert(name.clone());
        Ok(name)
    }

    /// 当前列表（初始列表 + 已分配的文件名）
    pub fn listing(&self) -> &[String] {
        &self.listing
    }

    fn is_taken(&self, name: &str) -> bool {
        if self.assigned.contains(name) {
            return true;
        }
        // 只使用文件名时，同时避开目录中完全同名的文件
        self.policy == FreshNamePolicy::FileName && self.listing.iter().any(|e| e == name)
    }

    fn next_free(&self, base_name: &str, extension: &str) -> String {
        (1u64..)
            .map(|n| format!("{}_{}{}", base_name, n, extension))
            .find(|candidate| {
                !self.assigned.contains(candidate) && !self.listing.iter().any(|e| e == candidate)
            })
            .unwrap_or_else(|| format!("{}_0{}", base_name, extension))
    }
}
