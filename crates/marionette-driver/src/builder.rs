//! Builder 模式实现
//!
//! 提供链式构造 `Bridge` 实例的便捷方式。
//! 硬件获取失败不会让构造失败：对应链路进入未连接状态并继续排空通道。

use crate::bridge::Bridge;
use crate::channels::command_channels;
use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use crate::router::Router;
use crate::serial_link::{SerialLink, SerialLinkConfig, serial_loop};
use crate::state::LinkState;
use crate::trigger_link::{TriggerLink, TriggerLinkConfig, TriggerMode, trigger_loop};
use marionette_io::{LinkError, OutputPin, SerialTransport, SysfsGpio, find_serial_device};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Bridge Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use marionette_driver::{BridgeBuilder, TriggerMode};
/// use std::time::Duration;
///
/// let bridge = BridgeBuilder::new()
///     .baud_rate(9600)
///     .settle_delay(Duration::from_secs(1))
///     .gpio_pin(17)
///     .trigger_mode(TriggerMode::Level)
///     .build()
///     .unwrap();
///
/// let metrics = bridge.shutdown();
/// println!("{:?}", metrics);
/// ```
pub struct BridgeBuilder {
    serial: SerialLinkConfig,
    trigger: TriggerLinkConfig,
    /// 显式注入的串口（跳过设备发现）
    serial_transport: Option<Box<dyn SerialTransport>>,
    /// 显式注入的输出引脚（跳过 sysfs）
    output_pin: Option<Box<dyn OutputPin>>,
    metrics: Option<Arc<BridgeMetrics>>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self {
            serial: SerialLinkConfig::default(),
            trigger: TriggerLinkConfig::default(),
            serial_transport: None,
            output_pin: None,
            metrics: None,
        }
    }

    /// 整体替换串口链路配置
    pub fn serial_config(mut self, config: SerialLinkConfig) -> Self {
        self.serial = config;
        self
    }

    /// 整体替换触发链路配置
    pub fn trigger_config(mut self, config: TriggerLinkConfig) -> Self {
        self.trigger = config;
        self
    }

    /// 设备发现目录（默认 `/dev`）
    pub fn device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.serial.device_dir = dir.into();
        self
    }

    /// 设备名子串列表
    pub fn device_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.serial.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// 串口打开后的稳定等待时间
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.serial.settle_delay = delay;
        self
    }

    /// sysfs GPIO 根目录（默认 `/sys/class/gpio`）
    pub fn gpio_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.trigger.gpio_root = root.into();
        self
    }

    pub fn gpio_pin(mut self, pin: u32) -> Self {
        self.trigger.pin = pin;
        self
    }

    pub fn trigger_mode(mut self, mode: TriggerMode) -> Self {
        self.trigger.mode = mode;
        self
    }

    /// 使用指定的串口后端，不再扫描设备目录
    pub fn with_serial_transport(mut self, transport: Box<dyn SerialTransport>) -> Self {
        self.serial_transport = Some(transport);
        self
    }

    /// 使用指定的输出引脚，不再访问 sysfs
    pub fn with_output_pin(mut self, pin: Box<dyn OutputPin>) -> Self {
        self.output_pin = Some(pin);
        self
    }

    /// 共享外部创建的指标
    pub fn with_metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 构建 Bridge：获取硬件、创建通道、启动两个链路线程
    ///
    /// 只有线程创建失败会返回错误。
    pub fn build(self) -> Result<Bridge, DriverError> {
        let metrics = self.metrics.unwrap_or_default();

        let serial_state = match self.serial_transport {
            Some(transport) => LinkState::Attached(transport),
            None => attach_serial(&self.serial),
        };
        let pin_state = match self.output_pin {
            Some(pin) => configure_pin(pin),
            None => attach_gpio(&self.trigger),
        };

        let (senders, serial_inbox, trigger_inbox) = command_channels();

        let serial_link = SerialLink::new(serial_state, metrics.clone());
        let settle_delay = self.serial.settle_delay;
        let serial_thread = thread::Builder::new()
            .name("serial_link".into())
            .spawn(move || serial_loop(serial_link, serial_inbox, settle_delay))
            .map_err(|e| DriverError::IoThread(format!("Failed to spawn serial link: {}", e)))?;

        let trigger_link = TriggerLink::new(pin_state, self.trigger.mode, metrics.clone());
        // 触发线程创建失败时，serial_thread 随 senders 的 drop 自行退出
        let trigger_thread = thread::Builder::new()
            .name("trigger_link".into())
            .spawn(move || trigger_loop(trigger_link, trigger_inbox))
            .map_err(|e| DriverError::IoThread(format!("Failed to spawn trigger link: {}", e)))?;

        let router = Router::new(senders, metrics.clone());
        info!("Command bridge started");
        Ok(Bridge::new(router, serial_thread, trigger_thread, metrics))
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 发现并打开串口设备；失败时返回未连接状态
fn attach_serial(config: &SerialLinkConfig) -> LinkState<Box<dyn SerialTransport>> {
    let path = match find_serial_device(&config.device_dir, &config.patterns) {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; serial link running unattached", e);
            return LinkState::Unattached;
        },
    };

    match open_serial(&path, config.baud_rate) {
        Ok(transport) => LinkState::Attached(transport),
        Err(e) => {
            error!("{}; serial link running unattached", e);
            LinkState::Unattached
        },
    }
}

#[cfg(feature = "serial")]
fn open_serial(
    path: &std::path::Path,
    baud_rate: u32,
) -> Result<Box<dyn SerialTransport>, LinkError> {
    let transport = marionette_io::SerialPortTransport::open(path, baud_rate)?;
    Ok(Box::new(transport))
}

#[cfg(not(feature = "serial"))]
fn open_serial(
    path: &std::path::Path,
    _baud_rate: u32,
) -> Result<Box<dyn SerialTransport>, LinkError> {
    Err(LinkError::DeviceOpen {
        target: path.display().to_string(),
        reason: "built without the `serial` feature".to_string(),
    })
}

/// 打开 sysfs GPIO 并把引脚配置为输出；失败时返回未连接状态
fn attach_gpio(config: &TriggerLinkConfig) -> LinkState<Box<dyn OutputPin>> {
    let pin = SysfsGpio::open(config.gpio_root.clone())
        .and_then(|gpio| gpio.output_pin(config.pin));

    match pin {
        Ok(pin) => {
            info!("GPIO pin {} configured as output", config.pin);
            LinkState::Attached(Box::new(pin))
        },
        Err(e) => {
            error!("{}; trigger link running unattached", e);
            LinkState::Unattached
        },
    }
}

/// 把注入的引脚设置为输出方向
fn configure_pin(mut pin: Box<dyn OutputPin>) -> LinkState<Box<dyn OutputPin>> {
    match pin.set_direction_output() {
        Ok(()) => LinkState::Attached(pin),
        Err(e) => {
            error!("{}; trigger link running unattached", e);
            LinkState::Unattached
        },
    }
}
