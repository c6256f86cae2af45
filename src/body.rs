// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求体解析模块
//!
//! 根据 `Content-Type` 对头部结束符之后的原始文本进行解码。
//! 解码结果是一个封闭的枚举 [`Payload`]，每种内容类型携带各自形态的值；
//! 解码失败（如非法 JSON）时值为 `None`，但这不算协议错误，整体解析依然成功。

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    exception::ParseResult,
    header::{get_header, Headers},
    logger::{Events, PARSER_TARGET},
    param::{content_types, headers, HEADER_END},
    util, validator,
};

/// 请求体的内容类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyContentType {
    Json,
    FormUrlEncoded,
    Text,
    Html,
    Multipart,
    Unknown,
}

impl BodyContentType {
    /// 取 `Content-Type` 第一个分号之前的部分，转小写后按已知 MIME 类型做子串匹配
    pub fn from_header(value: Option<&str>) -> Self {
        let mime = match value {
            Some(v) => v.split(';').next().unwrap_or("").trim().to_lowercase(),
            None => return BodyContentType::Unknown,
        };

        if mime.contains(content_types::JSON) {
            BodyContentType::Json
        } else if mime.contains(content_types::FORM_URLENCODED) {
            BodyContentType::FormUrlEncoded
        } else if mime.contains(content_types::TEXT) {
            BodyContentType::Text
        } else if mime.contains(content_types::HTML) {
            BodyContentType::Html
        } else if mime.contains(content_types::MULTIPART) {
            BodyContentType::Multipart
        } else {
            BodyContentType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyContentType::Json => content_types::JSON,
            BodyContentType::FormUrlEncoded => content_types::FORM_URLENCODED,
            BodyContentType::Text => content_types::TEXT,
            BodyContentType::Html => content_types::HTML,
            BodyContentType::Multipart => content_types::MULTIPART,
            BodyContentType::Unknown => "unknown",
        }
    }
}

/// 解码后的请求体
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON 文档，非法 JSON 时为 `None`
    Json(Option<Value>),
    /// 表单键值对，解码失败时为 `None`
    Form(Option<HashMap<String, String>>),
    Text(String),
    Html(String),
    /// 暂不支持 multipart，始终没有值
    Multipart,
    /// 未知或缺失的内容类型，保留原始文本；空请求体时为 `None`
    Unknown(Option<String>),
}

impl Payload {
    pub fn content_type(&self) -> BodyContentType {
        match self {
            Payload::Json(_) => BodyContentType::Json,
            Payload::Form(_) => BodyContentType::FormUrlEncoded,
            Payload::Text(_) => BodyContentType::Text,
            Payload::Html(_) => BodyContentType::Html,
            Payload::Multipart => BodyContentType::Multipart,
            Payload::Unknown(_) => BodyContentType::Unknown,
        }
    }

    /// 解码值是否为空
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Payload::Json(None) | Payload::Form(None) | Payload::Multipart | Payload::Unknown(None)
        )
    }
}

/// 请求体。`size` 始终等于 `raw` 的字节长度，与解码是否成功无关。
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    raw: String,
    payload: Payload,
    size: usize,
}

impl Body {
    pub fn empty() -> Self {
        Self {
            raw: String::new(),
            payload: Payload::Unknown(None),
            size: 0,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn content_type(&self) -> BodyContentType {
        self.payload.content_type()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(value) => value.as_ref(),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&HashMap<String, String>> {
        match &self.payload {
            Payload::Form(fields) => fields.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodyParser {
    events: Events,
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new(Events::global(PARSER_TARGET))
    }
}

impl BodyParser {
    pub fn new(events: Events) -> Self {
        Self { events }
    }

    /// 从完整报文中提取并解码请求体
    pub fn parse(&self, raw_message: &str, headers: &Headers) -> ParseResult<Body> {
        let start = match raw_message.find(HEADER_END) {
            Some(index) => index + HEADER_END.len(),
            None => return Ok(Body::empty()),
        };

        let raw = &raw_message[start..];
        if raw.trim().is_empty() {
            return Ok(Body::empty());
        }

        let content_type =
            BodyContentType::from_header(get_header(headers, headers::CONTENT_TYPE));
        let payload = self.decode(raw, content_type);

        self.events.debug(format_args!(
            "请求体解析完成：类型 {}，{} 字节，解码{}",
            content_type.as_str(),
            raw.len(),
            if payload.is_null() { "为空" } else { "成功" }
        ));

        Ok(Body {
            raw: raw.to_string(),
            payload,
            size: raw.len(),
        })
    }

    fn decode(&self, raw: &str, content_type: BodyContentType) -> Payload {
        match content_type {
            BodyContentType::Json => match serde_json::from_str(raw) {
                Ok(value) => Payload::Json(Some(value)),
                Err(e) => {
                    self.events.warn(format_args!("请求体不是合法的 JSON：{}", e));
                    Payload::Json(None)
                }
            },
            BodyContentType::FormUrlEncoded => {
                let fields = util::parse_pairs(raw, util::decode_form_component);
                if fields.is_none() {
                    self.events.warn(format_args!("表单请求体解码失败"));
                }
                Payload::Form(fields)
            }
            BodyContentType::Text => Payload::Text(raw.to_string()),
            BodyContentType::Html => Payload::Html(raw.to_string()),
            BodyContentType::Multipart => {
                self.events.warn(format_args!("暂不支持 multipart/form-data 请求体"));
                Payload::Multipart
            }
            BodyContentType::Unknown => Payload::Unknown(Some(raw.to_string())),
        }
    }

    /// 没有 `Content-Length` 时视为通过；存在但不是非负整数时不通过；否则必须与实际大小相等
    pub fn validate_content_length(body_size: usize, headers: &Headers) -> bool {
        match get_header(headers, headers::CONTENT_LENGTH) {
            None => true,
            Some(value) if !validator::is_valid_content_length(value) => false,
            Some(value) => value.parse::<usize>().map_or(false, |n| n == body_size),
        }
    }

    /// 头部是否声明了请求体。仅做声明判断，不支持 chunked 解码。
    pub fn has_body(headers: &Headers) -> bool {
        let declared_length = get_header(headers, headers::CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(false, |n| n > 0);

        declared_length
            || get_header(headers, headers::TRANSFER_ENCODING)
                .map_or(false, |v| v.to_lowercase().contains("chunked"))
    }
}
