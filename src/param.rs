// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块集中定义了服务器在分帧、解析与响应构建过程中共用的协议常量：
//! - 报文分隔符（CRLF、头部结束符）。
//! - HTTP 状态码与原因短语映射表。
//! - 受支持的 HTTP 方法枚举。
//! - 常用头部名称与内容类型。

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "CustomHTTPServer/1.0";

/// 响应状态行使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 头部块结束符
pub const HEADER_END: &str = "\r\n\r\n";

/// 常用头部名称（统一小写存储）
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const TRANSFER_ENCODING: &str = "transfer-encoding";
    pub const HOST: &str = "host";
    pub const USER_AGENT: &str = "user-agent";
    pub const DATE: &str = "date";
    pub const SERVER: &str = "server";
}

/// 常用的内容类型
pub mod content_types {
    pub const JSON: &str = "application/json";
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const TEXT: &str = "text/plain";
    pub const HTML: &str = "text/html";
    pub const MULTIPART: &str = "multipart/form-data";
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 不在表中的状态码在状态行中渲染为 `Unknown`。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");

        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(411, "Length Required");
        map.insert(413, "Payload Too Large");
        map.insert(415, "Unsupported Media Type");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

/// 查询状态码对应的原因短语
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    STATUS_CODES.get(&code).copied()
}

/// 标准 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpRequestMethod {
    /// 服务器识别的全部方法，也用于分帧时判断缓冲区是否为 HTTP 报文
    pub const ALL: [HttpRequestMethod; 7] = [
        HttpRequestMethod::Get,
        HttpRequestMethod::Post,
        HttpRequestMethod::Put,
        HttpRequestMethod::Delete,
        HttpRequestMethod::Patch,
        HttpRequestMethod::Options,
        HttpRequestMethod::Head,
    ];

    /// 大小写不敏感地解析方法名，未知方法返回 `None`
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(token))
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
