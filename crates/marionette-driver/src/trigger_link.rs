//! 触发外设链路
//!
//! 独占一个 GPIO 输出引脚，把序列触发命令转换为引脚电平。
//! 引脚只在本链路线程内写入，不存在并发写入。

use crate::channels::TriggerInbox;
use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use crate::state::LinkState;
use marionette_io::{DEFAULT_GPIO_ROOT, OutputPin, PinLevel};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 默认触发引脚
pub const DEFAULT_TRIGGER_PIN: u32 = 17;

/// 默认复位脉冲宽度
pub const DEFAULT_PULSE_WIDTH: Duration = Duration::from_millis(5);

/// 触发行为
///
/// 两种行为互斥，启动时选定一种，不会组合使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// 电平模式：值为 `1` 时拉高，其他值（包括复位值 `0`）拉低
    #[default]
    Level,
    /// 复位脉冲模式：每次触发输出固定宽度的高电平脉冲，忽略命令值
    ResetPulse { width: Duration },
}

impl TriggerMode {
    /// 使用默认宽度（5ms）的复位脉冲
    pub const fn reset_pulse() -> Self {
        TriggerMode::ResetPulse {
            width: DEFAULT_PULSE_WIDTH,
        }
    }
}

/// 触发链路配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerLinkConfig {
    /// sysfs GPIO 根目录
    pub gpio_root: PathBuf,
    /// 引脚编号
    pub pin: u32,
    pub mode: TriggerMode,
}

impl Default for TriggerLinkConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from(DEFAULT_GPIO_ROOT),
            pin: DEFAULT_TRIGGER_PIN,
            mode: TriggerMode::default(),
        }
    }
}

/// 电平模式下序列值对应的引脚电平
pub fn level_for(value: i32) -> PinLevel {
    if value == 1 {
        PinLevel::High
    } else {
        PinLevel::Low
    }
}

/// 触发链路
pub struct TriggerLink<P> {
    state: LinkState<P>,
    mode: TriggerMode,
    metrics: Arc<BridgeMetrics>,
}

impl<P: OutputPin> TriggerLink<P> {
    pub fn new(state: LinkState<P>, mode: TriggerMode, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            state,
            mode,
            metrics,
        }
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn state(&self) -> &LinkState<P> {
        &self.state
    }

    /// 处理一个序列值
    ///
    /// 未连接时静默丢弃；引脚写入失败返回错误，链路继续可用。
    pub fn handle(&mut self, value: i32) -> Result<(), DriverError> {
        let Some(pin) = self.state.handle_mut() else {
            trace!("Trigger link unattached, dropping sequence value {}", value);
            BridgeMetrics::incr(&self.metrics.triggers_dropped);
            return Ok(());
        };

        let result = match self.mode {
            TriggerMode::Level => pin.set_level(level_for(value)),
            TriggerMode::ResetPulse { width } => {
                pin.set_high().and_then(|_| {
                    spin_sleep::sleep(width);
                    pin.set_low()
                })
            },
        };

        match result {
            Ok(()) => {
                BridgeMetrics::incr(&self.metrics.triggers_applied);
                debug!("Applied sequence value {} ({:?})", value, self.mode);
                Ok(())
            },
            Err(e) => {
                BridgeMetrics::incr(&self.metrics.pin_errors);
                Err(e.into())
            },
        }
    }

    /// 释放引脚（尽力而为）
    fn release(&mut self) {
        if let Some(pin) = self.state.handle_mut() {
            let number = pin.number();
            match pin.release() {
                Ok(()) => debug!("Released GPIO pin {}", number),
                Err(e) => debug!("Failed to release GPIO pin {}: {}", number, e),
            }
        }
    }
}

/// 触发链路线程主循环
///
/// 阻塞接收序列通道，一次处理一个值；通道断开后释放引脚并退出。
pub fn trigger_loop<P: OutputPin>(mut link: TriggerLink<P>, inbox: TriggerInbox) {
    info!(
        "Trigger link ready ({}, {:?})",
        link.state.label(),
        link.mode
    );

    while let Ok(value) = inbox.sequence.recv() {
        if let Err(e) = link.handle(value) {
            warn!("Failed to apply sequence value {}: {}", value, e);
        }
    }

    trace!("Trigger link: sequence channel disconnected, exiting");
    link.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::command_channels;
    use marionette_io::mock::MockPin;
    use marionette_protocol::Command;
    use std::thread;

    fn attached(pin: &MockPin, mode: TriggerMode) -> (TriggerLink<MockPin>, Arc<BridgeMetrics>) {
        let mut pin = pin.clone();
        pin.set_direction_output().unwrap();
        let metrics = Arc::new(BridgeMetrics::new());
        (
            TriggerLink::new(LinkState::Attached(pin), mode, metrics.clone()),
            metrics,
        )
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(1), PinLevel::High);
        assert_eq!(level_for(0), PinLevel::Low);
        assert_eq!(level_for(7), PinLevel::Low);
        assert_eq!(level_for(-1), PinLevel::Low);
    }

    #[test]
    fn test_trigger_config_default() {
        let config = TriggerLinkConfig::default();
        assert_eq!(config.pin, 17);
        assert_eq!(config.mode, TriggerMode::Level);
        assert_eq!(config.gpio_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(
            TriggerMode::reset_pulse(),
            TriggerMode::ResetPulse {
                width: Duration::from_millis(5)
            }
        );
    }

    #[test]
    fn test_level_mode_drives_pin() {
        let pin = MockPin::new(17);
        let (mut link, metrics) = attached(&pin, TriggerMode::Level);

        link.handle(1).unwrap();
        assert_eq!(pin.level(), Some(PinLevel::High));
        link.handle(0).unwrap();
        assert_eq!(pin.level(), Some(PinLevel::Low));
        link.handle(7).unwrap();
        assert_eq!(pin.level(), Some(PinLevel::Low));
        assert_eq!(metrics.snapshot().triggers_applied, 3);
    }

    #[test]
    fn test_level_mode_is_idempotent() {
        let pin = MockPin::new(17);
        let (mut link, _metrics) = attached(&pin, TriggerMode::Level);

        link.handle(1).unwrap();
        link.handle(1).unwrap();
        assert_eq!(*pin.history().lock(), vec![PinLevel::High, PinLevel::High]);
    }

    #[test]
    fn test_reset_pulse_ignores_value() {
        let pin = MockPin::new(17);
        let (mut link, _metrics) = attached(
            &pin,
            TriggerMode::ResetPulse {
                width: Duration::from_millis(1),
            },
        );

        link.handle(0).unwrap();
        link.handle(1).unwrap();
        assert_eq!(
            *pin.history().lock(),
            vec![PinLevel::High, PinLevel::Low, PinLevel::High, PinLevel::Low]
        );
    }

    #[test]
    fn test_pin_error_is_not_fatal() {
        // 未设置为输出方向的引脚写入失败
        let pin = MockPin::new(17);
        let metrics = Arc::new(BridgeMetrics::new());
        let mut link = TriggerLink::new(
            LinkState::Attached(pin.clone()),
            TriggerMode::Level,
            metrics.clone(),
        );

        assert!(link.handle(1).is_err());
        assert!(link.handle(0).is_err());
        assert_eq!(metrics.snapshot().pin_errors, 2);
    }

    #[test]
    fn test_unattached_link_drops() {
        let metrics = Arc::new(BridgeMetrics::new());
        let mut link: TriggerLink<MockPin> =
            TriggerLink::new(LinkState::Unattached, TriggerMode::Level, metrics.clone());
        link.handle(1).unwrap();
        assert_eq!(metrics.snapshot().triggers_dropped, 1);
    }

    #[test]
    fn test_trigger_loop_releases_pin_on_disconnect() {
        let (senders, _serial, inbox) = command_channels();
        let pin = MockPin::new(17);
        let (link, _metrics) = attached(&pin, TriggerMode::Level);

        let handle = thread::spawn(move || trigger_loop(link, inbox));
        senders.send(Command::SequenceTrigger(1)).unwrap();
        drop(senders);
        handle.join().unwrap();

        assert_eq!(pin.level(), Some(PinLevel::High));
        assert!(pin.is_released());
    }
}
