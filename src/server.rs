// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # TCP 服务器模块
//!
//! 负责接受连接并驱动「分帧 → 解析 → 路由 → 处理 → 响应」流程。
//! 每个连接由一个独立的 tokio 任务处理，任务独占自己的 [`FrameBuffer`]，
//! 连接之间没有共享的可变状态（统计计数器除外，使用原子类型）。
//! 每个连接只处理一个请求，写出响应后即关闭。

use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{watch, Semaphore},
};

use crate::{
    buffer::FrameBuffer,
    config::Config,
    exception::Exception,
    logger::{Events, BUFFER_TARGET, PARSER_TARGET},
    request::MessageParser,
    response::ResponseBuilder,
    router::Router,
};

/// 每次从套接字读取的最大字节数
const READ_CHUNK_SIZE: usize = 8192;

/// 运行期统计，可在控制台中查询
#[derive(Debug, Default)]
pub struct ServerStats {
    active: AtomicUsize,
    total: AtomicU64,
}

impl ServerStats {
    /// 当前活跃连接数
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// 启动以来接受的连接总数
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

/// 连接结束时自动把活跃数减一
struct ActiveGuard(Arc<ServerStats>);

impl ActiveGuard {
    fn enter(stats: &Arc<ServerStats>) -> Self {
        stats.active.fetch_add(1, Ordering::SeqCst);
        stats.total.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Server {
    listener: TcpListener,
    config: Config,
    router: Arc<Router>,
    events: Events,
    stats: Arc<ServerStats>,
    limiter: Arc<Semaphore>,
}

impl Server {
    /// 绑定监听地址。端口为 0 时由操作系统分配。
    pub async fn bind(config: Config, router: Router, events: Events) -> io::Result<Self> {
        let listener = TcpListener::bind((config.host(), config.port())).await?;
        let limiter = Arc::new(Semaphore::new(config.max_connections()));
        Ok(Self {
            listener,
            config,
            router: Arc::new(router),
            events,
            stats: Arc::new(ServerStats::default()),
            limiter,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 持续接受连接，直到 `shutdown` 完成。
    ///
    /// 停机时不再接受新连接，已建立的连接立即关闭，未完成的报文被丢弃。
    pub async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        self.events.info(format_args!("服务器开始监听：{}", addr));

        let routes = self.router.list_routes();
        self.events.info(format_args!("已注册路由：{} 条", routes.len()));
        for (method, pattern) in &routes {
            self.events.debug(format_args!("    {} {}", method, pattern));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&self.limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        self.events.error(format_args!("接受连接失败：{}", e));
                        continue;
                    }
                },
            };

            let guard = ActiveGuard::enter(&self.stats);
            self.events.info(format_args!(
                "新的连接：{}（活跃 {}，累计 {}）",
                peer,
                self.stats.active(),
                self.stats.total()
            ));

            let connection = Connection {
                peer,
                timeout: self.config.timeout(),
                router: Arc::clone(&self.router),
                parser: MessageParser::new(self.events.child(PARSER_TARGET)),
                framer: FrameBuffer::new(self.events.child(BUFFER_TARGET)),
                events: self.events.clone(),
            };
            let stop = stop_rx.clone();

            tokio::spawn(async move {
                connection.serve(stream, stop).await;
                drop(guard);
                drop(permit);
            });
        }

        self.events.warn(format_args!(
            "停机：不再接受新连接，关闭 {} 个活跃连接，累计处理 {} 个连接",
            self.stats.active(),
            self.stats.total()
        ));
        // 所有接收端都已关闭时发送失败，无需处理
        let _ = stop_tx.send(true);
        Ok(())
    }
}

/// 单个连接的处理状态
struct Connection {
    peer: SocketAddr,
    timeout: Duration,
    router: Arc<Router>,
    parser: MessageParser,
    framer: FrameBuffer,
    events: Events,
}

impl Connection {
    async fn serve(mut self, mut stream: TcpStream, mut stop: watch::Receiver<bool>) {
        let started = Instant::now();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = tokio::select! {
                _ = stop.changed() => {
                    self.events.debug(format_args!("[{}] 服务器停机，关闭连接", self.peer));
                    return;
                }
                read = tokio::time::timeout(self.timeout, stream.read(&mut chunk)) => read,
            };

            let n = match read {
                Err(_) => {
                    self.events.warn(format_args!(
                        "[{}] 连接空闲超时（{} ms），丢弃 {} 字节未完成数据",
                        self.peer,
                        self.timeout.as_millis(),
                        self.framer.size()
                    ));
                    return;
                }
                Ok(Err(e)) => {
                    self.events.error(format_args!("[{}] 读取失败：{}", self.peer, e));
                    return;
                }
                Ok(Ok(0)) => {
                    self.events.debug(format_args!("[{}] 对端关闭连接", self.peer));
                    return;
                }
                Ok(Ok(n)) => n,
            };

            if let Some(message) = self.framer.feed(&chunk[..n]) {
                let response = self.respond(&message).await;
                self.framer.reset();

                let status = response.status_code();
                if let Err(e) = write_response(&mut stream, response).await {
                    self.events.error(format_args!("[{}] 写出响应失败：{}", self.peer, e));
                    return;
                }
                self.events.info(format_args!(
                    "[{}] 响应已发送：{}，耗时 {:?}",
                    self.peer,
                    status,
                    started.elapsed()
                ));
                return;
            }
        }
    }

    /// 为一帧报文生成恰好一个响应
    async fn respond(&self, message: &str) -> ResponseBuilder {
        let request = match self.parser.parse(message) {
            Ok(request) => request,
            Err(e) => return self.error_response(e.status_code(), e.message()),
        };

        self.events.info(format_args!(
            "[{}] 处理请求：{} {}",
            self.peer,
            request.method(),
            request.path()
        ));

        let route = match self.router.match_request(&request) {
            Some(route) => route,
            None => {
                let message = format!("Route not found: {} {}", request.method(), request.path());
                return self.error_response(Exception::RouteNotFound.status_code(), &message);
            }
        };

        // 在独立任务中运行处理函数，panic 会以 JoinError 的形式返回
        match tokio::spawn(route.dispatch(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.events.error(format_args!("[{}] 处理函数返回错误：{}", self.peer, e));
                self.error_response(Exception::HandlerFailure.status_code(), "Internal Server Error")
            }
            Err(e) => {
                self.events.error(format_args!("[{}] 处理函数执行失败：{}", self.peer, e));
                self.error_response(Exception::HandlerFailure.status_code(), "Internal Server Error")
            }
        }
    }

    fn error_response(&self, status: u16, message: &str) -> ResponseBuilder {
        self.events.warn(format_args!("[{}] 返回错误 {}：{}", self.peer, status, message));
        let mut response = ResponseBuilder::new();
        response.error(status, Some(message));
        response
    }
}

async fn write_response(stream: &mut TcpStream, response: ResponseBuilder) -> io::Result<()> {
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}
