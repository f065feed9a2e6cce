//! 协议路由器
//!
//! 显式持有 "端点地址 -> 处理函数" 映射和命令通道发送端，
//! 不依赖任何全局监听注册，可以脱离网络套接字单独测试。
//!
//! 转发是阻塞的：发送会一直等到对应链路线程接收，
//! 路由器本身不做任何缓冲，慢速链路的背压会一直传到网络入口。

use crate::channels::CommandSenders;
use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use marionette_protocol::{ArgumentTypeError, Command, CommandKind, OscArg, OscMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 端点参数解析函数
pub type ParseFn = fn(&[OscArg]) -> Result<Command, ArgumentTypeError>;

/// 一个可寻址的命令端点
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub kind: CommandKind,
    parse: ParseFn,
}

impl Endpoint {
    pub fn new(kind: CommandKind, parse: ParseFn) -> Self {
        Self { kind, parse }
    }

    pub fn address(&self) -> &'static str {
        self.kind.address()
    }

    /// 解析参数列表（只使用第一个参数）
    pub fn parse(&self, args: &[OscArg]) -> Result<Command, ArgumentTypeError> {
        (self.parse)(args)
    }
}

/// 分发结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatch {
    /// 命令已经被链路接收
    Forwarded(Command),
    /// 地址不属于任何端点
    Unrouted,
}

/// 协议路由器
pub struct Router {
    routes: HashMap<&'static str, Endpoint>,
    /// 关闭后为 `None`，链路线程随即观察到通道断开
    senders: Option<CommandSenders>,
    metrics: Arc<BridgeMetrics>,
}

impl Router {
    /// 创建路由器并注册三个端点
    pub fn new(senders: CommandSenders, metrics: Arc<BridgeMetrics>) -> Self {
        let endpoints = [
            Endpoint::new(CommandKind::Position, |args| {
                Command::from_args(CommandKind::Position, args)
            }),
            Endpoint::new(CommandKind::Height, |args| {
                Command::from_args(CommandKind::Height, args)
            }),
            Endpoint::new(CommandKind::SequenceTrigger, |args| {
                Command::from_args(CommandKind::SequenceTrigger, args)
            }),
        ];

        let routes = endpoints.into_iter().map(|ep| (ep.address(), ep)).collect();
        Self {
            routes,
            senders: Some(senders),
            metrics,
        }
    }

    /// 已注册的端点（按地址排序）
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints: Vec<_> = self.routes.values().copied().collect();
        endpoints.sort_by_key(|ep| ep.address());
        endpoints
    }

    /// 分发一条消息
    ///
    /// 地址不匹配时返回 `Dispatch::Unrouted`；参数错误时返回
    /// `DriverError::Argument` 且不转发任何命令。
    pub fn dispatch(&self, address: &str, args: &[OscArg]) -> Result<Dispatch, DriverError> {
        let Some(endpoint) = self.routes.get(address) else {
            BridgeMetrics::incr(&self.metrics.messages_unrouted);
            return Ok(Dispatch::Unrouted);
        };

        let command = endpoint.parse(args).inspect_err(|_| {
            BridgeMetrics::incr(&self.metrics.arguments_rejected);
        })?;

        let senders = self
            .senders
            .as_ref()
            .ok_or(DriverError::ChannelClosed(command.kind()))?;
        senders.send(command)?;
        BridgeMetrics::incr(&self.metrics.commands_forwarded);
        Ok(Dispatch::Forwarded(command))
    }

    /// 关闭所有命令通道
    ///
    /// 之后的分发都返回 `DriverError::ChannelClosed`。
    pub fn close(&mut self) {
        self.senders = None;
    }

    pub fn is_closed(&self) -> bool {
        self.senders.is_none()
    }

    /// 处理一条解码后的消息
    ///
    /// 错误在这里终止：每条被拒绝的消息只输出一条诊断日志。
    pub fn handle(&self, message: &OscMessage) {
        match self.dispatch(&message.address, &message.args) {
            Ok(Dispatch::Forwarded(command)) => {
                debug!("{} -> {:?}", message.address, command);
            },
            Ok(Dispatch::Unrouted) => {
                debug!("Ignoring message for unknown address {}", message.address);
            },
            Err(e) => {
                warn!("Dropped message for {}: {}", message.address, e);
            },
        }
    }
}
