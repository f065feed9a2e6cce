//! 驱动层错误类型定义

use marionette_io::LinkError;
use marionette_protocol::{ArgumentTypeError, CommandKind};
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 外设链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 参数类型错误（路由器丢弃消息）
    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentTypeError),

    /// 命令通道已关闭（链路线程退出）
    #[error("Command channel closed: {0}")]
    ChannelClosed(CommandKind),

    /// 链路线程错误
    #[error("Link thread error: {0}")]
    IoThread(String),
}
