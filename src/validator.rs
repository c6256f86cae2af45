// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 请求行与头部的基础校验规则。

use lazy_static::lazy_static;
use regex::Regex;

use crate::param::HttpRequestMethod;

lazy_static! {
    static ref VERSION_PATTERN: Regex = Regex::new(r"^HTTP/[0-9]\.[0-9]$").unwrap();
    static ref CONTENT_LENGTH_PATTERN: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

pub fn is_valid_method(method: &str) -> bool {
    HttpRequestMethod::parse(method).is_some()
}

pub fn is_valid_version(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// 路径必须以 `/` 开头，且任何位置都不能出现 `..`。
///
/// 这是一个保守的检查：`/file..name` 这类合法的字面量也会被拒绝。
pub fn is_valid_path(path: &str) -> bool {
    path.starts_with('/') && !path.contains("..")
}

pub fn is_valid_header(line: &str) -> bool {
    line.contains(':')
}

pub fn is_valid_content_length(value: &str) -> bool {
    CONTENT_LENGTH_PATTERN.is_match(value) && value.parse::<usize>().is_ok()
}
