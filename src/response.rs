// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! [`ResponseBuilder`] 以链式调用的方式组装状态码、头部和响应体，
//! 最后由 [`ResponseBuilder::build`] 序列化为可直接写入套接字的报文文本。

use chrono::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{
    param::{content_types, headers, reason_phrase, CRLF, HTTP_VERSION, SERVER_NAME},
    util::{format_header_name, http_date},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuilder {
    status_code: u16,
    /// 小写头部名称与值，保持插入顺序
    headers: Vec<(String, String)>,
    body: String,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self
    }

    /// 设置头部，名称转为小写；同名头部在原位置被覆盖
    pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.header(name.as_ref(), value);
        }
        self
    }

    /// 以两个空格缩进序列化为 JSON 响应体
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> &mut Self {
        match serde_json::to_string_pretty(data) {
            Ok(body) => {
                self.body = body;
                self.header(headers::CONTENT_TYPE, content_types::JSON)
            }
            Err(_) => self.error(500, Some("Failed to serialize response body")),
        }
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.body = text.into();
        self.header(headers::CONTENT_TYPE, content_types::TEXT)
    }

    pub fn html(&mut self, html: impl Into<String>) -> &mut Self {
        self.body = html.into();
        self.header(headers::CONTENT_TYPE, content_types::HTML)
    }

    /// 设置错误状态码并写入 `{error, message, statusCode}` 形式的 JSON 响应体。
    ///
    /// `message` 缺失或为空时使用状态码的原因短语；两者都没有时省略该字段。
    pub fn error(&mut self, code: u16, message: Option<&str>) -> &mut Self {
        let reason = reason_phrase(code);
        let mut payload = Map::new();
        payload.insert("error".to_string(), json!(reason.unwrap_or("Unknown Error")));
        if let Some(message) = message.filter(|m| !m.is_empty()).or(reason) {
            payload.insert("message".to_string(), json!(message));
        }
        payload.insert("statusCode".to_string(), json!(code));
        let payload = Value::Object(payload);
        self.status_code = code;
        self.body = serde_json::to_string_pretty(&payload).unwrap_or_default();
        self.header(headers::CONTENT_TYPE, content_types::JSON)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// 读取已显式设置的头部（不含 `build` 时注入的默认值）
    pub fn get_header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n == name)
    }

    /// 序列化为完整的响应报文。
    ///
    /// `Content-Length`、`Date` 与 `Server` 仅在未显式设置时才会注入。
    pub fn build(&self) -> String {
        let mut lines = self.headers.clone();
        if !self.has_header(headers::CONTENT_LENGTH) {
            lines.push((headers::CONTENT_LENGTH.to_string(), self.body.len().to_string()));
        }
        if !self.has_header(headers::DATE) {
            lines.push((headers::DATE.to_string(), http_date(&Utc::now())));
        }
        if !self.has_header(headers::SERVER) {
            lines.push((headers::SERVER.to_string(), SERVER_NAME.to_string()));
        }

        let mut response = format!(
            "{} {} {}{}",
            HTTP_VERSION,
            self.status_code,
            reason_phrase(self.status_code).unwrap_or("Unknown"),
            CRLF
        );
        for (name, value) in &lines {
            response.push_str(&format_header_name(name));
            response.push_str(": ");
            response.push_str(value);
            response.push_str(CRLF);
        }
        response.push_str(CRLF);
        response.push_str(&self.body);
        response
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.build().into_bytes()
    }

    /// 200，附带可选的 JSON 响应体
    pub fn ok(data: impl Into<Option<Value>>) -> Self {
        Self::with_data(200, data.into())
    }

    /// 201，附带可选的 JSON 响应体
    pub fn created(data: impl Into<Option<Value>>) -> Self {
        Self::with_data(201, data.into())
    }

    pub fn no_content() -> Self {
        let mut builder = Self::new();
        builder.status(204);
        builder
    }

    pub fn bad_request(message: Option<&str>) -> Self {
        Self::with_error(400, message)
    }

    pub fn not_found(message: Option<&str>) -> Self {
        Self::with_error(404, message)
    }

    pub fn method_not_allowed(message: Option<&str>) -> Self {
        Self::with_error(405, message)
    }

    pub fn internal_error(message: Option<&str>) -> Self {
        Self::with_error(500, message)
    }

    fn with_data(code: u16, data: Option<Value>) -> Self {
        let mut builder = Self::new();
        builder.status(code);
        if let Some(data) = data {
            builder.json(&data);
        }
        builder
    }

    fn with_error(code: u16, message: Option<&str>) -> Self {
        let mut builder = Self::new();
        builder.error(code, message);
        builder
    }
}
