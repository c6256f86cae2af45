// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义请求处理生命周期中可能出现的各类错误。
//!
//! - [`Exception`]：封闭的错误种类枚举，每个变体对应一个固定的 HTTP 状态码。
//! - [`ParseError`]：解析阶段返回的错误，携带种类、描述信息与可选细节。
//! - [`ParseResult`]：所有解析阶段统一使用的返回类型，失败通过 `?` 逐级传递。
//! - [`HandlerError`]：路由处理函数用来报告失败的错误类型。

use std::fmt;

/// 错误种类。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求行为空或只包含空白字符
    EmptyRequestLine,
    /// 请求行结构不正确（不是恰好三个以空格分隔的部分）
    MalformedRequestLine,
    /// 使用了服务器不支持的 HTTP 方法
    UnsupportedMethod,
    /// 路径格式非法或包含越权尝试（`..`）
    InvalidPath,
    /// 协议版本不符合 `HTTP/<digit>.<digit>`
    InvalidVersion,
    /// 没有任何路由与请求匹配
    RouteNotFound,
    /// 路由处理函数返回了错误或发生 panic
    HandlerFailure,
    /// 解析过程中出现了意料之外的内部错误
    InternalParserFault,
}

use Exception::*;

impl Exception {
    /// 错误种类对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            EmptyRequestLine | MalformedRequestLine | InvalidPath | InvalidVersion => 400,
            UnsupportedMethod => 405,
            RouteNotFound => 404,
            HandlerFailure | InternalParserFault => 500,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyRequestLine => write!(f, "Empty request line"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            InvalidPath => write!(f, "Invalid path"),
            InvalidVersion => write!(f, "Invalid HTTP version"),
            RouteNotFound => write!(f, "Route not found"),
            HandlerFailure => write!(f, "Handler failure"),
            InternalParserFault => write!(f, "Internal parser error"),
        }
    }
}

impl std::error::Error for Exception {}

/// 解析阶段的错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: Exception,
    message: String,
    details: Option<String>,
}

impl ParseError {
    pub fn new(kind: Exception, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> Exception {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.status_code(), self.message)?;
        if let Some(details) = &self.details {
            write!(f, " [{}]", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// 所有解析阶段统一使用的结果类型
pub type ParseResult<T> = Result<T, ParseError>;

/// 路由处理函数报告的失败。
///
/// 服务器不会把它的内容暴露给客户端，只记录日志并返回通用的 500 响应。
#[derive(Debug)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EmptyRequestLine.status_code(), 400);
        assert_eq!(MalformedRequestLine.status_code(), 400);
        assert_eq!(UnsupportedMethod.status_code(), 405);
        assert_eq!(InvalidPath.status_code(), 400);
        assert_eq!(InvalidVersion.status_code(), 400);
        assert_eq!(RouteNotFound.status_code(), 404);
        assert_eq!(HandlerFailure.status_code(), 500);
        assert_eq!(InternalParserFault.status_code(), 500);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(InvalidPath, "Invalid path: test").with_details("missing /");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.details(), Some("missing /"));
        assert_eq!(err.to_string(), "Invalid path (400): Invalid path: test [missing /]");
    }

    #[test]
    fn test_handler_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: HandlerError = json_err.into();
        assert!(!err.message().is_empty());
    }
}
