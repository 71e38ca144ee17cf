//! Path and naming helpers / 路径与命名工具函数

use rand::Rng;

use std::path::Path;

use crate::error::{DiskError, Result};

/// Path separator used inside object keys / 对象键中的路径分隔符
pub const SEPARATOR: char = '/';

/// Length of names generated by `put_file` / 随机文件名长度
pub const RANDOM_NAME_LEN: usize = 40;

/// Normalize a logical path into a listing prefix / 规范化为列举前缀
/// 1. Strip a leading `./`, then leading `/`, then a leading bare `.` / 去掉前导 `./`、`/` 与 `.`
/// 2. Repeat until nothing changes, so the result never starts with `.` or `/` / 重复直到不再变化
/// 3. Non-empty results always end with `/` / 非空结果以 `/` 结尾
pub fn valid_path(path: &str) -> String {
    let mut real = path;
    loop {
        let next = real.strip_prefix("./").unwrap_or(real);
        let next = next.trim_start_matches(SEPARATOR);
        let next = next.strip_prefix('.').unwrap_or(next);
        if next.len() == real.len() {
            break;
        }
        real = next;
    }

    let mut real = real.to_string();
    if !real.is_empty() && !real.ends_with(SEPARATOR) {
        real.push(SEPARATOR);
    }
    real
}

/// Strip a listing prefix off a listed key / 去掉键的前缀
pub fn strip_key<'a>(key: &'a str, prefix: &str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Ancestor directory markers of a key, outermost first / 键的所有上级目录标记
/// `"a/b/c.txt"` -> `["a/", "a/b/"]`, `"a/b/"` -> `["a/"]`
pub fn parent_markers(key: &str) -> Vec<String> {
    key.match_indices(SEPARATOR)
        .map(|(idx, _)| &key[..=idx])
        .filter(|marker| *marker != "/" && marker.len() < key.len())
        .map(str::to_string)
        .collect()
}

/// Last path element with separators trimmed / 取最后一段路径
pub fn base_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(SEPARATOR);
    trimmed.rsplit(SEPARATOR).next().unwrap_or(trimmed)
}

/// Extension of the last path element, without the dot / 获取扩展名（不含点）
pub fn name_extension(name: &str) -> Option<&str> {
    let base = base_name(name);
    base.rfind('.').map(|pos| &base[pos + 1..])
}

/// Join a target directory and a file name into a key / 拼接目录与文件名
pub fn join_key(dir: &str, name: &str) -> String {
    let dir = dir.strip_prefix("./").unwrap_or(dir).trim_end_matches(SEPARATOR);
    let dir = if dir == "." { "" } else { dir };
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", dir, SEPARATOR, name)
    }
}

/// Random alphanumeric name / 随机字母数字名
pub fn random_name(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn looks_like_text(content: &[u8]) -> bool {
    !content.contains(&0) && std::str::from_utf8(content).is_ok()
}

/// Sniff the content type from the bytes themselves / 根据内容嗅探MIME类型
pub fn detect_mime(content: &[u8]) -> String {
    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }
    if looks_like_text(content) {
        "text/plain; charset=utf-8".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// Sniff a file extension from the bytes / 根据内容推断扩展名
pub fn detect_extension(content: &[u8]) -> Option<String> {
    if let Some(kind) = infer::get(content) {
        return Some(kind.extension().to_string());
    }
    if !content.is_empty() && looks_like_text(content) {
        return Some("txt".to_string());
    }
    None
}

/// Derive the key an upload is stored under / 计算上传文件的完整键
///
/// A name that already carries an extension is kept as-is; otherwise the
/// extension is sniffed from `content`, falling back to the source path's
/// own extension.
pub fn full_path_of_file(
    file_path: &str,
    source_path: &Path,
    content: &[u8],
    name: &str,
) -> Result<String> {
    let base = base_name(name);
    if name_extension(name).is_some() {
        return Ok(join_key(file_path, base));
    }

    let extension = detect_extension(content)
        .or_else(|| {
            source_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
        })
        .ok_or_else(|| {
            DiskError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown file extension of {}", source_path.display()),
            ))
        })?;

    Ok(join_key(file_path, &format!("{}.{}", base, extension)))
}
