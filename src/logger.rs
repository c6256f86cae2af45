// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 事件输出模块
//!
//! 各组件不直接调用全局日志宏，而是在构造时接收一个 [`Events`] 句柄。
//! 句柄由「目标标签」与「日志汇」两部分组成：
//! - 标签区分事件来源（`buffer`、`parser`、`router`、`server`），对应 log4rs 配置中的 logger 名称。
//! - 日志汇是任意 `log::Log` 实现。默认转发给进程内已安装的 logger（由 log4rs 初始化），
//!   测试中可以注入自定义实现来捕获事件。

use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

pub const BUFFER_TARGET: &str = "buffer";
pub const PARSER_TARGET: &str = "parser";
pub const ROUTER_TARGET: &str = "router";
pub const SERVER_TARGET: &str = "server";

/// 转发到 `log::logger()` 的日志汇
struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

/// 注入到组件中的结构化事件句柄
#[derive(Clone)]
pub struct Events {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl Events {
    /// 使用进程级 logger 作为日志汇
    pub fn global(target: &'static str) -> Self {
        Self {
            sink: Arc::new(GlobalSink),
            target,
        }
    }

    /// 注入自定义日志汇
    pub fn with_sink(sink: Arc<dyn Log>, target: &'static str) -> Self {
        Self { sink, target }
    }

    /// 共享同一个日志汇，但使用新的目标标签
    pub fn child(&self, target: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            target,
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn enabled(&self, level: Level) -> bool {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        self.sink.enabled(&metadata)
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(self.target)
                .module_path(Some(module_path!()))
                .build(),
        );
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events").field("target", &self.target).finish()
    }
}

/// 截取报文前若干个字符用于日志预览，并把换行替换为可见符号
pub fn preview(text: &str, limit: usize) -> String {
    text.chars()
        .take(limit)
        .map(|c| match c {
            '\r' => '↵',
            '\n' => '⏎',
            other => other,
        })
        .collect()
}
