//! 驱动层模块
//!
//! 本模块提供命令分发管线，包括：
//! - 命令通道（每种命令一条无缓冲通道）
//! - 串口外设链路（位置/高度 → 5 字节命令帧）
//! - 触发外设链路（序列触发 → GPIO 电平）
//! - 协议路由器（OSC 端点 → 校验后的命令）
//!
//! # 并发模型
//!
//! ```text
//!  UDP 线程 ──Router──┬─ position ─┐
//!                     ├─ height ───┴─> serial_link 线程 ──> 串口
//!                     └─ sequence ───> trigger_link 线程 ─> GPIO
//! ```
//!
//! 每个硬件资源只由它所属的链路线程访问，通道是唯一的同步原语。

mod bridge;
mod builder;
pub mod channels;
mod error;
pub mod metrics;
pub mod router;
pub mod serial_link;
pub mod state;
pub mod trigger_link;

pub use bridge::Bridge;
pub use builder::BridgeBuilder;
pub use channels::{CommandSenders, SerialInbox, TriggerInbox, command_channels};
pub use error::DriverError;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use router::{Dispatch, Endpoint, Router};
pub use serial_link::{SerialLink, SerialLinkConfig, serial_loop};
pub use state::LinkState;
pub use trigger_link::{TriggerLink, TriggerLinkConfig, TriggerMode, trigger_loop};

// 协议层常用类型
pub use marionette_protocol::{Command, CommandKind};
