// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 请求头解析。
//!
//! 头部名称统一转为小写存储，因此 `Content-Type` 与 `content-type` 指向同一个键。
//! 同名头部多次出现时，后出现的值覆盖先前的值。分帧时读取 `Content-Length`
//! 也取最后一次出现的值，两处使用同一个长度。

use std::collections::HashMap;

use crate::{
    exception::ParseResult,
    logger::{Events, PARSER_TARGET},
    validator,
};

/// 头部映射，键为小写头部名称
pub type Headers = HashMap<String, String>;

/// 大小写不敏感地读取头部
pub fn get_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers.get(&name.to_ascii_lowercase()).map(String::as_str)
}

pub fn has_header(headers: &Headers, name: &str) -> bool {
    headers.contains_key(&name.to_ascii_lowercase())
}

#[derive(Debug, Clone)]
pub struct HeaderParser {
    events: Events,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new(Events::global(PARSER_TARGET))
    }
}

impl HeaderParser {
    pub fn new(events: Events) -> Self {
        Self { events }
    }

    /// 解析请求报文按 CRLF 拆分后的各行。
    ///
    /// 第 0 行是请求行，从第 1 行开始扫描，遇到第一个空行结束。
    /// 不含冒号的行会被跳过并记录警告，但不会导致整个解析失败。
    pub fn parse(&self, lines: &[&str]) -> ParseResult<Headers> {
        let mut headers = Headers::new();

        for line in lines.iter().skip(1) {
            if line.trim().is_empty() {
                break;
            }

            if !validator::is_valid_header(line) {
                self.events.warn(format_args!("头部缺少冒号，已忽略：{}", line));
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_ascii_lowercase();
                if key.is_empty() {
                    continue;
                }
                headers.insert(key, value.trim().to_string());
            }
        }

        self.events.debug(format_args!("头部解析完成，共 {} 个", headers.len()));
        Ok(headers)
    }
}
