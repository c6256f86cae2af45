// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 把帧缓冲器交出的一条完整报文解析为强类型的 [`Request`]。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 请求头（Headers）的提取。
//! 3. 路径与查询字符串的拆分及查询参数解码。
//! 4. 根据 `Content-Type` 解码请求体。
//!
//! 任意阶段失败都以 [`ParseError`] 的形式通过 `?` 逐级传递，不会产生部分结果。

use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    body::{Body, BodyParser},
    exception::{Exception, ParseError, ParseResult},
    header::{get_header, HeaderParser, Headers},
    logger::{self, Events, PARSER_TARGET},
    param::{HttpRequestMethod, CRLF},
    request_line::RequestLineParser,
    util,
};

/// 表示一个完整解析后的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法，已规范化为大写
    method: HttpRequestMethod,
    /// 不含查询字符串的路径，未经过百分号解码
    path: String,
    /// 协议版本，例如 `HTTP/1.1`
    version: String,
    /// 小写键的头部映射
    headers: Headers,
    /// 已解码的查询参数
    query: HashMap<String, String>,
    /// 请求体，没有请求体时为 `None`
    body: Option<Body>,
    /// 原始报文
    raw: String,
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// 大小写不敏感地读取头部
    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 组合请求行、头部和请求体三个解析器的完整报文解析器
#[derive(Debug, Clone)]
pub struct MessageParser {
    events: Events,
    request_line: RequestLineParser,
    headers: HeaderParser,
    body: BodyParser,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new(Events::global(PARSER_TARGET))
    }
}

impl MessageParser {
    /// 子解析器共享同一个事件句柄
    pub fn new(events: Events) -> Self {
        Self {
            request_line: RequestLineParser::new(events.clone()),
            headers: HeaderParser::new(events.clone()),
            body: BodyParser::new(events.clone()),
            events,
        }
    }

    /// 解析一条完整的报文。
    ///
    /// 解析过程中若出现意料之外的 panic，会被捕获并转换为 `InternalParserFault`（500）。
    pub fn parse(&self, raw: &str) -> ParseResult<Request> {
        self.events.debug(format_args!(
            "开始解析报文（{} 字节）：{}",
            raw.len(),
            logger::preview(raw, 100)
        ));

        match panic::catch_unwind(AssertUnwindSafe(|| self.parse_message(raw))) {
            Ok(result) => result,
            Err(cause) => {
                let details = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.events.error(format_args!("解析报文时出现内部错误：{}", details));
                Err(ParseError::new(Exception::InternalParserFault, "Failed to parse request")
                    .with_details(details))
            }
        }
    }

    fn parse_message(&self, raw: &str) -> ParseResult<Request> {
        let lines: Vec<&str> = raw.split(CRLF).collect();
        let first_line = lines.first().copied().unwrap_or("");

        let request_line = self.request_line.parse(first_line)?;
        let headers = self.headers.parse(&lines)?;
        let body = self.body.parse(raw, &headers)?;

        let (path, query) = self.split_target(&request_line.path)?;

        if !BodyParser::validate_content_length(body.size(), &headers) {
            self.events.debug(format_args!(
                "Content-Length 与实际请求体大小（{}）不一致",
                body.size()
            ));
        }

        let request = Request {
            method: request_line.method,
            path,
            version: request_line.version,
            headers,
            query,
            body: if body.size() > 0 { Some(body) } else { None },
            raw: raw.to_string(),
        };

        self.events.info(format_args!(
            "请求解析完成：{} {}（{} 个头部，{} 个查询参数）",
            request.method,
            request.path,
            request.headers.len(),
            request.query.len()
        ));

        Ok(request)
    }

    /// 在第一个 `?` 处拆分路径与查询字符串
    fn split_target(&self, target: &str) -> ParseResult<(String, HashMap<String, String>)> {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => return Ok((target.to_string(), HashMap::new())),
        };

        match util::parse_pairs(query_string, util::decode_component) {
            Some(query) => Ok((path.to_string(), query)),
            None => {
                self.events.warn(format_args!("查询字符串解码失败：{}", query_string));
                Err(
                    ParseError::new(Exception::InternalParserFault, "Failed to decode query string")
                        .with_details(query_string.to_string()),
                )
            }
        }
    }
}
