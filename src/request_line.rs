// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 请求行（Request-Line）解析：`<method> <path> <version>`。

use crate::{
    exception::{Exception, ParseError, ParseResult},
    logger::{Events, PARSER_TARGET},
    param::HttpRequestMethod,
    validator,
};

/// 解析后的请求行。路径可能仍带有查询字符串。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: HttpRequestMethod,
    pub path: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct RequestLineParser {
    events: Events,
}

impl Default for RequestLineParser {
    fn default() -> Self {
        Self::new(Events::global(PARSER_TARGET))
    }
}

impl RequestLineParser {
    pub fn new(events: Events) -> Self {
        Self { events }
    }

    /// 解析一行请求行。
    ///
    /// 校验顺序依次为：是否为空、是否恰好三段、方法、路径、版本，遇到第一个错误即返回。
    pub fn parse(&self, line: &str) -> ParseResult<RequestLine> {
        let line = line.trim();
        if line.is_empty() {
            return Err(self.reject(Exception::EmptyRequestLine, "Empty request line".to_string()));
        }

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, path, version] = parts.as_slice() else {
            return Err(self.reject(
                Exception::MalformedRequestLine,
                format!("Malformed request line: {}", line),
            ));
        };

        let method = match HttpRequestMethod::parse(method) {
            Some(m) => m,
            None => {
                return Err(self.reject(
                    Exception::UnsupportedMethod,
                    format!("Invalid HTTP method: {}", method),
                ))
            }
        };

        if !validator::is_valid_path(path) {
            return Err(self.reject(Exception::InvalidPath, format!("Invalid path: {}", path)));
        }

        if !validator::is_valid_version(version) {
            return Err(self.reject(
                Exception::InvalidVersion,
                format!("Invalid HTTP version: {}", version),
            ));
        }

        self.events.debug(format_args!(
            "请求行解析完成：{} {} {}",
            method, path, version
        ));

        Ok(RequestLine {
            method,
            path: path.to_string(),
            version: version.to_string(),
        })
    }

    fn reject(&self, kind: Exception, message: String) -> ParseError {
        self.events.warn(format_args!(
            "请求行无效（{}）：{}",
            kind.status_code(),
            message
        ));
        ParseError::new(kind, message)
    }
}
