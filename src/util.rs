// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// 百分号解码。
///
/// `%` 后面不是两位十六进制数字，或解码结果不是合法 UTF-8 时返回 `None`。
pub fn decode_component(s: &str) -> Option<String> {
    if has_malformed_escape(s) {
        return None;
    }
    urlencoding::decode(s).ok().map(|decoded| decoded.into_owned())
}

/// `application/x-www-form-urlencoded` 的解码：先把 `+` 还原为空格，再做百分号解码
pub fn decode_form_component(s: &str) -> Option<String> {
    decode_component(&s.replace('+', " "))
}

fn has_malformed_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}

/// 把 `a=1&b=2` 形式的字符串拆成键值对。
///
/// 每一对在第一个 `=` 处切分，缺少 `=` 的参数视为值为空字符串，键为空的参数被忽略。
/// 任意一个键或值解码失败时整体返回 `None`。
pub fn parse_pairs(input: &str, decode: fn(&str) -> Option<String>) -> Option<HashMap<String, String>> {
    let mut result = HashMap::new();
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        result.insert(decode(key)?, decode(value)?);
    }
    Some(result)
}

/// 按连字符分段把头部名称转换为首字母大写形式，例如 `content-type` -> `Content-Type`
pub fn format_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// HTTP 日期格式（IMF-fixdate），例如 `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
