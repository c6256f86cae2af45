pub mod body;
pub mod buffer;
pub mod config;
pub mod exception;
pub mod header;
pub mod logger;
pub mod param;
pub mod request;
pub mod request_line;
pub mod response;
pub mod router;
pub mod server;
pub mod util;
pub mod validator;

pub use body::{Body, BodyContentType, BodyParser, Payload};
pub use buffer::{FrameBuffer, FrameState};
pub use config::{Config, ConfigError};
pub use exception::{Exception, HandlerError, ParseError, ParseResult};
pub use header::{get_header, has_header, HeaderParser, Headers};
pub use logger::Events;
pub use param::HttpRequestMethod;
pub use request::{MessageParser, Request};
pub use request_line::{RequestLine, RequestLineParser};
pub use response::ResponseBuilder;
pub use router::{Handler, HandlerFuture, Route, RouteContext, RouteMatch, Router};
pub use server::{Server, ServerStats};
