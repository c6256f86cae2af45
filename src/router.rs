// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模块
//!
//! 路由模板形如 `/users/:id` 或 `/posts/:postId/comments/:commentId`。
//! 注册时模板被编译为锚定的正则表达式：字面部分全部转义，每个 `:name`
//! 占位符替换为匹配一个或多个非 `/` 字符的捕获组。
//! 匹配时按注册顺序遍历，方法相同且路径匹配的第一条路由胜出。

use std::{collections::HashMap, fmt, future::Future, pin::Pin, sync::Arc};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    exception::HandlerError,
    logger::{Events, ROUTER_TARGET},
    param::HttpRequestMethod,
    request::Request,
    response::ResponseBuilder,
};

lazy_static! {
    static ref PARAM_PLACEHOLDER: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// 处理函数返回的 future
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<ResponseBuilder, HandlerError>> + Send>>;

/// 传给处理函数的上下文，处理函数取得其所有权
#[derive(Debug)]
pub struct RouteContext {
    pub req: Request,
    /// 预先创建的响应构建器，处理函数修改后将其返回
    pub res: ResponseBuilder,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

/// 路由处理函数。
///
/// 任何 `async fn(RouteContext) -> Result<ResponseBuilder, HandlerError>`
/// 形式的函数或闭包都自动实现该 trait。
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RouteContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RouteContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseBuilder, HandlerError>> + Send + 'static,
{
    fn call(&self, ctx: RouteContext) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// 一条已编译的路由
pub struct Route {
    method: HttpRequestMethod,
    template: String,
    pattern: Regex,
    param_names: Vec<String>,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// 编译后的正则表达式源码
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("pattern", &self.pattern.as_str())
            .field("param_names", &self.param_names)
            .finish()
    }
}

/// 一次成功匹配的结果
pub struct RouteMatch {
    handler: Arc<dyn Handler>,
    params: HashMap<String, String>,
}

impl RouteMatch {
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// 以全新的响应构建器调用处理函数
    pub fn dispatch(self, request: Request) -> HandlerFuture {
        let query = request.query().clone();
        self.handler.call(RouteContext {
            req: request,
            res: ResponseBuilder::new(),
            params: self.params,
            query,
        })
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("params", &self.params).finish()
    }
}

pub struct Router {
    routes: Vec<Route>,
    events: Events,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Events::global(ROUTER_TARGET))
    }
}

impl Router {
    pub fn new(events: Events) -> Self {
        Self {
            routes: Vec::new(),
            events,
        }
    }

    /// 注册一条路由。模板无法编译为正则表达式时返回错误。
    pub fn register<H: Handler>(
        &mut self,
        method: HttpRequestMethod,
        template: &str,
        handler: H,
    ) -> Result<&mut Self, regex::Error> {
        let (pattern, param_names) = compile_template(template)?;

        self.events.debug(format_args!(
            "注册路由：{} {} -> {}",
            method,
            template,
            pattern.as_str()
        ));

        self.routes.push(Route {
            method,
            template: template.to_string(),
            pattern,
            param_names,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, regex::Error> {
        self.register(HttpRequestMethod::Get, template, handler)
    }

    pub fn post<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, regex::Error> {
        self.register(HttpRequestMethod::Post, template, handler)
    }

    pub fn put<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, regex::Error> {
        self.register(HttpRequestMethod::Put, template, handler)
    }

    pub fn delete<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, regex::Error> {
        self.register(HttpRequestMethod::Delete, template, handler)
    }

    pub fn patch<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, regex::Error> {
        self.register(HttpRequestMethod::Patch, template, handler)
    }

    /// 为请求查找路由，路径不含查询字符串
    pub fn match_request(&self, request: &Request) -> Option<RouteMatch> {
        self.find(request.method(), request.path())
    }

    pub fn find(&self, method: HttpRequestMethod, path: &str) -> Option<RouteMatch> {
        for route in self.routes.iter().filter(|r| r.method == method) {
            let captures = match route.pattern.captures(path) {
                Some(c) => c,
                None => continue,
            };

            let params: HashMap<String, String> = route
                .param_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = captures.get(i + 1).map_or("", |m| m.as_str());
                    (name.clone(), value.to_string())
                })
                .collect();

            self.events.debug(format_args!(
                "路由命中：{} {} -> {}，参数 {:?}",
                method, path, route.template, params
            ));

            return Some(RouteMatch {
                handler: Arc::clone(&route.handler),
                params,
            });
        }

        self.events.debug(format_args!("没有匹配的路由：{} {}", method, path));
        None
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// 按注册顺序列出 `(方法, 正则源码)`
    pub fn list_routes(&self) -> Vec<(HttpRequestMethod, String)> {
        self.routes
            .iter()
            .map(|r| (r.method, r.pattern.as_str().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

/// 把路由模板编译为锚定正则，并按声明顺序返回参数名
fn compile_template(template: &str) -> Result<(Regex, Vec<String>), regex::Error> {
    let mut source = String::with_capacity(template.len() + 16);
    let mut param_names = Vec::new();
    let mut last = 0;

    source.push('^');
    for captures in PARAM_PLACEHOLDER.captures_iter(template) {
        let (whole, name) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(name)) => (whole, name),
            _ => continue,
        };
        source.push_str(&regex::escape(&template[last..whole.start()]));
        source.push_str("([^/]+)");
        param_names.push(name.as_str().to_string());
        last = whole.end();
    }
    source.push_str(&regex::escape(&template[last..]));
    source.push('$');

    Ok((Regex::new(&source)?, param_names))
}
