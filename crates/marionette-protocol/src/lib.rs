//! # Marionette Protocol
//!
//! 网络控制协议与外设线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `args`: OSC 参数表示与强制转换（`ArgumentTypeError`）
//! - `frame`: 串口外设命令帧编码/解码
//! - `osc`: OSC 1.0 数据包解码/编码
//!
//! ## 字节序
//!
//! - 串口命令帧：小端（Little-Endian）IEEE-754 单精度
//! - OSC 数据包：大端（Big-Endian），4 字节对齐

pub mod args;
pub mod frame;
pub mod osc;

// 重新导出常用类型
pub use args::{ArgKind, ArgumentTypeError, OscArg, coerce_f32, coerce_i32};
pub use frame::{FRAME_LEN, FrameError, FrameId, SerialFrame};
pub use osc::{OscError, OscMessage, decode_packet, encode_bundle};

/// 命令种类
///
/// 每种命令对应一条独立的通道（见 `marionette-driver` 的通道结构）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandKind {
    Position,
    Height,
    SequenceTrigger,
}

impl CommandKind {
    /// OSC 端点地址
    pub const fn address(self) -> &'static str {
        match self {
            CommandKind::Position => "/position",
            CommandKind::Height => "/height",
            CommandKind::SequenceTrigger => "/sequence",
        }
    }

    /// 该命令期望的参数种类
    pub const fn expected_arg(self) -> ArgKind {
        match self {
            CommandKind::Position | CommandKind::Height => ArgKind::Float,
            CommandKind::SequenceTrigger => ArgKind::Int,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Position => write!(f, "position"),
            CommandKind::Height => write!(f, "height"),
            CommandKind::SequenceTrigger => write!(f, "sequence"),
        }
    }
}

/// 经过校验的外设命令
///
/// 只携带一个负载，构造后不可变，仅在通道上短暂存在。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// 位置命令（串口外设，帧标识 `'p'`）
    Position(f32),
    /// 高度命令（串口外设，帧标识 `'h'`）
    Height(f32),
    /// 动作序列触发（GPIO 外设）
    SequenceTrigger(i32),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Position(_) => CommandKind::Position,
            Command::Height(_) => CommandKind::Height,
            Command::SequenceTrigger(_) => CommandKind::SequenceTrigger,
        }
    }

    /// 从 OSC 参数列表构造命令
    ///
    /// 只读取第一个参数；缺失或类型不符时返回 `ArgumentTypeError`。
    pub fn from_args(kind: CommandKind, args: &[OscArg]) -> Result<Self, ArgumentTypeError> {
        let first = args.first();
        match kind {
            CommandKind::Position => coerce_f32(first).map(Command::Position),
            CommandKind::Height => coerce_f32(first).map(Command::Height),
            CommandKind::SequenceTrigger => coerce_i32(first).map(Command::SequenceTrigger),
        }
    }

    /// 转换为串口命令帧
    ///
    /// 序列触发命令不经过串口，返回 `None`。
    pub fn to_serial_frame(&self) -> Option<SerialFrame> {
        match *self {
            Command::Position(v) => Some(SerialFrame::new(FrameId::Position, v)),
            Command::Height(v) => Some(SerialFrame::new(FrameId::Height, v)),
            Command::SequenceTrigger(_) => None,
        }
    }
}
