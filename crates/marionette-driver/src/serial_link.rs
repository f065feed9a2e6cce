//! 串口外设链路
//!
//! 独占一个串口设备，把位置/高度命令编码成 5 字节命令帧发送。
//! 单线程循环：每次唤醒完整处理一条命令（编码 + 发送）后再等待，
//! 不同命令的帧字节不会在线路上交错。

use crate::channels::SerialInbox;
use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use crate::state::LinkState;
use crossbeam_channel::select;
use marionette_io::{DEFAULT_DEVICE_DIR, DEFAULT_DEVICE_PATTERNS, LinkError, SerialTransport};
use marionette_protocol::{FrameId, SerialFrame};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 串口链路配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLinkConfig {
    /// 扫描的设备目录
    pub device_dir: PathBuf,
    /// 设备名子串（按顺序匹配任一即可）
    pub patterns: Vec<String>,
    /// 波特率
    pub baud_rate: u32,
    /// 打开后的稳定等待时间（部分控制板在连接时复位）
    pub settle_delay: Duration,
}

impl Default for SerialLinkConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            patterns: DEFAULT_DEVICE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            baud_rate: 9600,
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// 发送一帧：先写标识字节，再写 4 字节负载
///
/// 任一次写入失败（或写入不完整）立即返回错误，不重试。
pub fn write_frame<T: SerialTransport + ?Sized>(
    transport: &mut T,
    frame: &SerialFrame,
) -> Result<(), LinkError> {
    let id = [frame.id.as_byte()];
    let payload = frame.payload();
    for chunk in [&id[..], &payload[..]] {
        let written = transport.write(chunk)?;
        if written != chunk.len() {
            return Err(LinkError::ShortWrite {
                written,
                expected: chunk.len(),
            });
        }
    }
    Ok(())
}

/// 串口链路
pub struct SerialLink<T> {
    state: LinkState<T>,
    metrics: Arc<BridgeMetrics>,
}

impl<T: SerialTransport> SerialLink<T> {
    pub fn new(state: LinkState<T>, metrics: Arc<BridgeMetrics>) -> Self {
        Self { state, metrics }
    }

    pub fn state(&self) -> &LinkState<T> {
        &self.state
    }

    /// 处理一帧
    ///
    /// 未连接时静默丢弃并返回 `Ok`；发送失败返回错误，但链路本身继续可用。
    pub fn handle_frame(&mut self, frame: SerialFrame) -> Result<(), DriverError> {
        let Some(transport) = self.state.handle_mut() else {
            trace!("Serial link unattached, dropping {:?} frame", frame.id);
            BridgeMetrics::incr(&self.metrics.frames_dropped);
            return Ok(());
        };

        match write_frame(transport, &frame) {
            Ok(()) => {
                BridgeMetrics::incr(&self.metrics.frames_sent);
                debug!("Sent {:?} frame: {}", frame.id, frame.argument);
                Ok(())
            },
            Err(e) => {
                BridgeMetrics::incr(&self.metrics.transmit_errors);
                Err(e.into())
            },
        }
    }
}

/// 串口链路线程主循环
///
/// 同时等待位置和高度两条通道；任一通道断开（路由器已退出）时结束循环。
///
/// # 参数
/// - `link`: 串口链路（线程内独占）
/// - `inbox`: 位置/高度接收端
/// - `settle_delay`: 已连接时，开始接收命令前的等待时间
pub fn serial_loop<T: SerialTransport>(
    mut link: SerialLink<T>,
    inbox: SerialInbox,
    settle_delay: Duration,
) {
    if link.state.is_attached() && !settle_delay.is_zero() {
        debug!("Waiting {:?} for serial device to settle", settle_delay);
        std::thread::sleep(settle_delay);
    }
    info!("Serial link ready ({})", link.state.label());

    loop {
        let received = select! {
            recv(inbox.position) -> msg => msg.map(|v| SerialFrame::new(FrameId::Position, v)),
            recv(inbox.height) -> msg => msg.map(|v| SerialFrame::new(FrameId::Height, v)),
        };

        let frame = match received {
            Ok(frame) => frame,
            Err(_) => {
                trace!("Serial link: command channel disconnected, exiting");
                break;
            },
        };

        if let Err(e) = link.handle_frame(frame) {
            // 单条命令失败不影响后续命令
            warn!("Failed to send {:?} command to serial device: {}", frame.id, e);
        }
    }

    if let Some(transport) = link.state.handle_mut()
        && let Err(e) = transport.flush()
    {
        debug!("Serial flush on exit failed: {}", e);
    }
    trace!("Serial link: loop exited");
}
