//! 命令通道
//!
//! 每种命令一条类型化的无缓冲（rendezvous）通道：发送方阻塞直到接收方就绪。
//! 同一通道内保持发送顺序，不同通道之间没有顺序保证。

use crate::error::DriverError;
use crossbeam_channel::{Receiver, Sender, bounded};
use marionette_protocol::Command;

/// 路由器持有的发送端
///
/// 不实现 `Clone`：每条通道只有一个生产者。
/// 整体 drop 之后，两个链路线程都会观察到通道断开并退出。
#[derive(Debug)]
pub struct CommandSenders {
    position: Sender<f32>,
    height: Sender<f32>,
    sequence: Sender<i32>,
}

impl CommandSenders {
    /// 把命令发送到对应通道（阻塞直到链路线程接收）
    pub fn send(&self, command: Command) -> Result<(), DriverError> {
        let kind = command.kind();
        let result = match command {
            Command::Position(v) => self.position.send(v).map_err(|_| ()),
            Command::Height(v) => self.height.send(v).map_err(|_| ()),
            Command::SequenceTrigger(v) => self.sequence.send(v).map_err(|_| ()),
        };
        result.map_err(|_| DriverError::ChannelClosed(kind))
    }
}

/// 串口链路的接收端（位置 + 高度）
#[derive(Debug)]
pub struct SerialInbox {
    pub position: Receiver<f32>,
    pub height: Receiver<f32>,
}

/// 触发链路的接收端（序列）
#[derive(Debug)]
pub struct TriggerInbox {
    pub sequence: Receiver<i32>,
}

/// 创建整套命令通道
pub fn command_channels() -> (CommandSenders, SerialInbox, TriggerInbox) {
    let (position_tx, position_rx) = bounded(0);
    let (height_tx, height_rx) = bounded(0);
    let (sequence_tx, sequence_rx) = bounded(0);

    (
        CommandSenders {
            position: position_tx,
            height: height_tx,
            sequence: sequence_tx,
        },
        SerialInbox {
            position: position_rx,
            height: height_rx,
        },
        TriggerInbox {
            sequence: sequence_rx,
        },
    )
}
