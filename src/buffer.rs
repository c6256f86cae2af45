// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 报文分帧模块
//!
//! TCP 是字节流协议，一次读取得到的数据可能只是半个请求，也可能包含多个请求。
//! [`FrameBuffer`] 为每个连接维护一个累积缓冲区，每次喂入新数据后尝试切出一个完整的报文。
//!
//! 支持两种分帧方式，共用同一个缓冲区：
//! 1. 纯文本：以 `\n` 为分隔符，一行即一帧。
//! 2. HTTP：缓冲区以「方法名 + 空格」开头时启用。先等待 `\r\n\r\n` 头部结束符，
//!    若声明了 `Content-Length` 则继续等待对应字节数的请求体。
//!
//! 当前所处的阶段由 [`FrameState`] 显式记录，每切出一帧后回到 [`FrameState::Idle`]，
//! 对剩余数据重新判定分帧方式。

use bytes::{Buf, BytesMut};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    logger::{preview, Events, BUFFER_TARGET},
    param::{HttpRequestMethod, HEADER_END},
};

lazy_static! {
    static ref CONTENT_LENGTH_LINE: Regex =
        Regex::new(r"(?im)^content-length:[ \t]*([0-9]+)").unwrap();
}

/// 分帧状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// 尚未确定分帧方式：缓冲区为空，或内容仍可能是某个方法名的前缀
    Idle,
    /// 按行分帧，等待 `\n`
    PlainText,
    /// HTTP 报文，等待头部结束符
    HttpHeaders,
    /// HTTP 报文头部已完整，等待 `content_length` 字节的请求体
    HttpBody {
        header_len: usize,
        content_length: usize,
    },
}

/// 单个连接独占的分帧缓冲区
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: FrameState,
    /// 当前阶段已经搜索过分隔符的字节数，避免每次从头扫描
    scanned: usize,
    events: Events,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(Events::global(BUFFER_TARGET))
    }
}

impl FrameBuffer {
    pub fn new(events: Events) -> Self {
        Self {
            buffer: BytesMut::new(),
            state: FrameState::Idle,
            scanned: 0,
            events,
        }
    }

    /// 追加新到达的字节，若已凑齐一帧则返回解码后的报文。
    ///
    /// 每次调用最多切出一帧；多余的字节原样保留到下一次调用。
    pub fn feed(&mut self, chunk: &[u8]) -> Option<String> {
        self.buffer.extend_from_slice(chunk);
        self.events.debug(format_args!(
            "收到数据块：{} 字节，累计 {} 字节，预览：{}",
            chunk.len(),
            self.buffer.len(),
            preview(&String::from_utf8_lossy(chunk), 50)
        ));

        if self.state == FrameState::Idle {
            self.state = classify(&self.buffer);
            self.scanned = 0;
        }

        match self.state {
            FrameState::Idle => None,
            FrameState::PlainText => self.take_line(),
            FrameState::HttpHeaders => self.take_headers(),
            FrameState::HttpBody { .. } => self.take_body(),
        }
    }

    /// 清空缓冲区，丢弃所有未完成的数据
    pub fn reset(&mut self) {
        let had_data = !self.buffer.is_empty();
        self.buffer.clear();
        self.state = FrameState::Idle;
        self.scanned = 0;
        if had_data {
            self.events.debug(format_args!("缓冲区已重置"));
        }
    }

    /// 当前累积的字节数
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// HTTP 请求体还差多少字节才能成帧
    pub fn pending_body_bytes(&self) -> Option<usize> {
        match self.state {
            FrameState::HttpBody {
                header_len,
                content_length,
            } => Some(
                header_len
                    .saturating_add(content_length)
                    .saturating_sub(self.buffer.len()),
            ),
            _ => None,
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let found = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
        match found {
            Some(offset) => {
                let frame = self.buffer.split_to(self.scanned + offset);
                self.buffer.advance(1);
                Some(self.finish(frame, "纯文本"))
            }
            None => {
                self.scanned = self.buffer.len();
                self.events.debug(format_args!(
                    "等待更多数据（纯文本），已缓冲 {} 字节",
                    self.buffer.len()
                ));
                None
            }
        }
    }

    fn take_headers(&mut self) -> Option<String> {
        let terminator = HEADER_END.as_bytes();
        // 分隔符可能横跨两次读取
        let start = self.scanned.saturating_sub(terminator.len() - 1);
        let found = self.buffer[start..]
            .windows(terminator.len())
            .position(|w| w == terminator);

        let header_len = match found {
            Some(offset) => start + offset + terminator.len(),
            None => {
                self.scanned = self.buffer.len();
                self.events.debug(format_args!(
                    "等待头部结束，已缓冲 {} 字节",
                    self.buffer.len()
                ));
                return None;
            }
        };

        match declared_content_length(&self.buffer[..header_len]) {
            Some(content_length) => {
                self.state = FrameState::HttpBody {
                    header_len,
                    content_length,
                };
                self.take_body()
            }
            None => {
                let frame = self.buffer.split_to(header_len);
                self.skip_delimiter();
                Some(self.finish(frame, "HTTP（无请求体）"))
            }
        }
    }

    fn take_body(&mut self) -> Option<String> {
        let FrameState::HttpBody {
            header_len,
            content_length,
        } = self.state
        else {
            return None;
        };

        let expected = header_len.saturating_add(content_length);
        if self.buffer.len() < expected {
            self.events.debug(format_args!(
                "等待请求体，已缓冲 {} / {} 字节",
                self.buffer.len(),
                expected
            ));
            return None;
        }

        let frame = self.buffer.split_to(expected);
        self.skip_delimiter();
        Some(self.finish(frame, "HTTP（含请求体）"))
    }

    /// 帧之后紧跟的一个 `\n` 视为分隔符一并消费，与纯文本分帧保持兼容
    fn skip_delimiter(&mut self) {
        if self.buffer.first() == Some(&b'\n') {
            self.buffer.advance(1);
        }
    }

    fn finish(&mut self, frame: BytesMut, kind: &str) -> String {
        self.state = FrameState::Idle;
        self.scanned = 0;
        let message = String::from_utf8_lossy(&frame).into_owned();
        self.events.info(format_args!(
            "{}报文已完整：{} 字节，剩余缓冲 {} 字节",
            kind,
            frame.len(),
            self.buffer.len()
        ));
        message
    }
}

/// 根据缓冲区前缀判定分帧方式
fn classify(buffer: &[u8]) -> FrameState {
    if buffer.is_empty() {
        return FrameState::Idle;
    }

    let mut undecided = false;
    for method in HttpRequestMethod::ALL {
        let token = method.as_str().as_bytes();
        if buffer.len() > token.len() {
            if buffer[..token.len()].eq_ignore_ascii_case(token) && buffer[token.len()] == b' ' {
                return FrameState::HttpHeaders;
            }
        } else if token[..buffer.len()].eq_ignore_ascii_case(buffer) {
            undecided = true;
        }
    }

    if undecided {
        FrameState::Idle
    } else {
        FrameState::PlainText
    }
}

/// 在头部块中查找 `Content-Length`。
///
/// 出现多次时取最后一个，与 [`HeaderParser`](crate::header::HeaderParser) 一致。
/// 数字超出 `usize` 范围时按 `usize::MAX` 处理，报文会一直等待请求体。
fn declared_content_length(header_block: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(header_block);
    CONTENT_LENGTH_LINE
        .captures_iter(&text)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().parse().unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(buffer: &mut FrameBuffer, s: &str) -> Option<String> {
        buffer.feed(s.as_bytes())
    }

    #[test]
    fn test_plain_text_single_chunk() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "Hello World\n").as_deref(), Some("Hello World"));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_plain_text_accumulates() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "Hello "), None);
        assert_eq!(feed_str(&mut buffer, "World"), None);
        assert_eq!(feed_str(&mut buffer, "!\n").as_deref(), Some("Hello World!"));
    }

    #[test]
    fn test_plain_text_multiple_messages() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "First\nSecond\n").as_deref(), Some("First"));
        assert_eq!(feed_str(&mut buffer, "").as_deref(), Some("Second"));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_plain_text_empty_line() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "\n").as_deref(), Some(""));
    }

    #[test]
    fn test_plain_text_one_byte_at_a_time() {
        let mut buffer = FrameBuffer::default();
        for c in "Hello World\n".chars() {
            let result = buffer.feed(c.to_string().as_bytes());
            if c == '\n' {
                assert_eq!(result.as_deref(), Some("Hello World"));
            } else {
                assert_eq!(result, None);
            }
        }
    }

    #[test]
    fn test_large_plain_text() {
        let mut buffer = FrameBuffer::default();
        let large = "x".repeat(10000);
        let message = buffer.feed(format!("{}\n", large).as_bytes()).unwrap();
        assert_eq!(message.len(), 10000);
    }

    #[test]
    fn test_http_without_body_swallows_newline() {
        let mut buffer = FrameBuffer::default();
        let message = feed_str(&mut buffer, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n\n");
        assert_eq!(message.as_deref(), Some("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_http_without_trailing_newline() {
        let mut buffer = FrameBuffer::default();
        let message = feed_str(&mut buffer, "POST /api HTTP/1.1\r\n\r\n");
        assert_eq!(message.as_deref(), Some("POST /api HTTP/1.1\r\n\r\n"));
    }

    #[test]
    fn test_http_headers_split_across_chunks() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "GET / HTTP/1.1\r\nHost: "), None);
        assert_eq!(buffer.state(), FrameState::HttpHeaders);
        assert_eq!(feed_str(&mut buffer, "localhost\r\n\r"), None);
        let message = feed_str(&mut buffer, "\n\n");
        assert_eq!(message.as_deref(), Some("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"));
    }

    #[test]
    fn test_incomplete_headers() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "GET / HTTP/1.1\r\nHost: localhost\r\n"), None);
    }

    #[test]
    fn test_http_with_body() {
        let mut buffer = FrameBuffer::default();
        let body = r#"{"name":"John"}"#;
        let request = format!(
            "POST /api/users HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}\n",
            body.len(),
            body
        );
        let message = buffer.feed(request.as_bytes()).unwrap();
        assert!(message.ends_with(body));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_waits_for_content_length() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(
            feed_str(&mut buffer, "POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\n"),
            None
        );
        assert_eq!(feed_str(&mut buffer, "12345"), None);
        assert_eq!(buffer.pending_body_bytes(), Some(5));
        assert_eq!(feed_str(&mut buffer, ""), None);

        let message = feed_str(&mut buffer, "67890\n").unwrap();
        assert!(message.ends_with("\r\n\r\n1234567890"));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_content_length_case_insensitive() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "POST / HTTP/1.1\r\ncontent-LENGTH:3\r\n\r\nab"), None);
        assert!(feed_str(&mut buffer, "c").unwrap().ends_with("abc"));
    }

    #[test]
    fn test_zero_content_length() {
        let mut buffer = FrameBuffer::default();
        let message = feed_str(&mut buffer, "POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n\n");
        assert_eq!(message.as_deref(), Some("POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n"));
    }

    #[test]
    fn test_binary_body() {
        let mut buffer = FrameBuffer::default();
        feed_str(&mut buffer, "POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\n");
        assert_eq!(buffer.feed(&[0x00, 0x01, 0x02, 0x03]), None);
        assert!(buffer.feed(&[0x04, b'\n']).is_some());
    }

    #[test]
    fn test_extra_bytes_are_retained() {
        let mut buffer = FrameBuffer::default();
        let message = feed_str(
            &mut buffer,
            "POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nHello Extra Data\n",
        );
        assert_eq!(
            message.as_deref(),
            Some("POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nHello")
        );
        assert_eq!(buffer.size(), " Extra Data\n".len());
        assert_eq!(feed_str(&mut buffer, "").as_deref(), Some(" Extra Data"));
    }

    #[test]
    fn test_lowercase_method_is_http() {
        let mut buffer = FrameBuffer::default();
        let message = feed_str(&mut buffer, "get / HTTP/1.1\r\n\r\n\n").unwrap();
        assert_eq!(message, "get / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_method_prefix_without_space_is_plain_text() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "GETTING STARTED\n").as_deref(), Some("GETTING STARTED"));
    }

    #[test]
    fn test_undecided_prefix() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "GE"), None);
        assert_eq!(buffer.state(), FrameState::Idle);
        assert_eq!(feed_str(&mut buffer, "T"), None);
        assert_eq!(buffer.state(), FrameState::Idle);
        assert_eq!(feed_str(&mut buffer, " / HTTP/1.1\r\n\r\n").as_deref(), Some("GET / HTTP/1.1\r\n\r\n"));
    }

    #[test]
    fn test_reset() {
        let mut buffer = FrameBuffer::default();
        feed_str(&mut buffer, "Some data");
        buffer.reset();
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.state(), FrameState::Idle);

        feed_str(&mut buffer, "POST / HTTP/1.1\r\nContent-Length: 50\r\n\r\npartial");
        buffer.reset();
        assert_eq!(feed_str(&mut buffer, "Second message\n").as_deref(), Some("Second message"));
    }

    #[test]
    fn test_http_then_plain_text_after_reset() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(feed_str(&mut buffer, "GET / HTTP/1.1\r\n\r\n\n").as_deref(), Some("GET / HTTP/1.1\r\n\r\n"));
        buffer.reset();
        assert_eq!(feed_str(&mut buffer, "Plain text\n").as_deref(), Some("Plain text"));
    }

    #[test]
    fn test_size_tracks_accumulated_bytes() {
        let mut buffer = FrameBuffer::default();
        assert_eq!(buffer.size(), 0);
        feed_str(&mut buffer, "Hello");
        assert_eq!(buffer.size(), 5);
        feed_str(&mut buffer, " World");
        assert_eq!(buffer.size(), 11);
        feed_str(&mut buffer, "\n");
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_content_length_near_usize_max() {
        let mut buffer = FrameBuffer::default();
        let raw = "POST / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nabc";
        assert_eq!(feed_str(&mut buffer, raw), None);
        // 头部长度与 Content-Length 之和饱和为 usize::MAX
        assert_eq!(buffer.pending_body_bytes(), Some(usize::MAX - raw.len()));
    }

    #[test]
    fn test_oversized_content_length_waits_for_body() {
        let mut buffer = FrameBuffer::default();
        let raw = "POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\nbody";
        assert_eq!(feed_str(&mut buffer, raw), None);
        assert!(matches!(buffer.state(), FrameState::HttpBody { content_length: usize::MAX, .. }));
        assert_eq!(buffer.size(), raw.len());
    }

    #[test]
    fn test_duplicate_content_length_last_wins() {
        let mut buffer = FrameBuffer::default();
        let head = "POST / HTTP/1.1\r\nContent-Length: 2\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(feed_str(&mut buffer, &format!("{}he", head)), None);
        assert_eq!(buffer.pending_body_bytes(), Some(3));
        assert_eq!(
            feed_str(&mut buffer, "llo").as_deref(),
            Some(format!("{}hello", head).as_str())
        );
    }
}
