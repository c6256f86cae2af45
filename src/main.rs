// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 演示服务器
//!
//! 加载配置、初始化日志并注册一组演示路由，然后启动服务器。
//! 运行期间可以在终端输入指令：
//! - `stop`：停止服务器
//! - `status`：查看当前连接统计
//! - `help`：显示帮助信息

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use serde_json::{json, Map, Value};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
    sync::Notify,
};

use rawhttp::{
    logger::{Events, ROUTER_TARGET, SERVER_TARGET},
    param::SERVER_NAME,
    Config, HandlerError, ResponseBuilder, RouteContext, Router, Server, ServerStats,
};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/development.toml";

fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法从 {} 初始化日志系统：{}", LOG_CONFIG, e);
    }

    // 2. 环境配置加载，失败时使用默认配置
    let config = match Config::from_toml(SERVER_CONFIG) {
        Ok(config) => {
            info!("配置文件已载入：{}", SERVER_CONFIG);
            config
        }
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::default()
        }
    };

    // 3. 根据配置分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建 tokio 运行时：{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        error!("服务器异常退出：{}", e);
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let router = demo_router()?;
    let server = Server::bind(config, router, Events::global(SERVER_TARGET)).await?;
    info!("{} 已启动：http://{}", SERVER_NAME, server.local_addr()?);

    let stop = Arc::new(Notify::new());
    tokio::spawn(console(server.stats(), Arc::clone(&stop)));

    server
        .run(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("无法监听 Ctrl-C 信号：{}", e);
                    }
                    info!("收到 Ctrl-C，正在停机...");
                }
                _ = stop.notified() => info!("收到停机指令，正在停机..."),
            }
        })
        .await?;

    info!("服务器已停止");
    Ok(())
}

/// 后台管理控制台
async fn console(stats: Arc<ServerStats>, stop: Arc<Notify>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("读取控制台输入失败：{}", e);
                break;
            }
        };
        match line.trim() {
            "stop" => {
                println!("停机指令已激活，服务器即将关闭...");
                stop.notify_one();
                break;
            }
            "status" => {
                println!("== Server 状态 ===");
                println!("当前活跃连接数: {}", stats.active());
                println!("累计连接数: {}", stats.total());
                println!("==================");
            }
            "help" => {
                println!("== Server Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("=================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}

fn demo_router() -> Result<Router, regex::Error> {
    let mut router = Router::new(Events::global(ROUTER_TARGET));
    router
        .get("/", index)?
        .get("/api/health", health)?
        .get("/api/users", list_users)?
        .get("/api/users/:id", get_user)?
        .post("/api/users", create_user)?;
    Ok(router)
}

async fn index(ctx: RouteContext) -> Result<ResponseBuilder, HandlerError> {
    let mut res = ctx.res;
    res.json(&json!({
        "message": "Welcome to Custom HTTP Server!",
        "version": "1.0.0",
        "endpoints": [
            "GET /",
            "GET /api/users",
            "GET /api/users/:id",
            "POST /api/users",
            "GET /api/health",
        ],
    }));
    Ok(res)
}

async fn health(ctx: RouteContext) -> Result<ResponseBuilder, HandlerError> {
    let mut res = ctx.res;
    res.json(&json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }));
    Ok(res)
}

async fn list_users(ctx: RouteContext) -> Result<ResponseBuilder, HandlerError> {
    let mut res = ctx.res;
    res.json(&json!({
        "users": [
            {"id": 1, "name": "Alice"},
            {"id": 2, "name": "Bob"},
        ],
    }));
    Ok(res)
}

async fn get_user(ctx: RouteContext) -> Result<ResponseBuilder, HandlerError> {
    let id = ctx.params.get("id").cloned().unwrap_or_default();
    let mut res = ctx.res;
    res.json(&json!({
        "user": {
            "id": id.parse::<i64>().ok(),
            "name": format!("User {}", id),
        },
    }));
    Ok(res)
}

async fn create_user(ctx: RouteContext) -> Result<ResponseBuilder, HandlerError> {
    let mut user = Map::new();
    user.insert("id".to_string(), json!(3));
    if let Some(Value::Object(fields)) = ctx.req.body().and_then(|b| b.json()) {
        user.extend(fields.clone());
    }

    let mut res = ctx.res;
    res.status(201).json(&json!({
        "message": "User created",
        "user": user,
    }));
    Ok(res)
}
