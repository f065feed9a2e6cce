//! 配置文件
//!
//! 可选的 TOML 配置文件，所有字段都可以省略，省略时使用驱动层默认值。
//!
//! ```toml
//! listen = "0.0.0.0:8000"
//!
//! [serial]
//! device_dir = "/dev"
//! patterns = ["tty.usbserial", "tty.usbmodem", "ttyUSB", "ttyACM"]
//! baud_rate = 9600
//! settle_ms = 1000
//!
//! [trigger]
//! gpio_root = "/sys/class/gpio"
//! pin = 17
//! mode = "level"   # 或 "pulse"
//! pulse_ms = 5
//! ```

use anyhow::{Context, Result};
use marionette_driver::{SerialLinkConfig, TriggerLinkConfig, TriggerMode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认监听地址
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";

/// 触发行为名称（配置文件与命令行共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TriggerModeName {
    /// 值为 1 拉高，其他值拉低
    #[default]
    Level,
    /// 每次触发输出固定宽度的复位脉冲
    Pulse,
}

/// 桥接进程配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// UDP 监听地址
    pub listen: Option<String>,
    pub serial: SerialSection,
    pub trigger: TriggerSection,
}

/// `[serial]` 表
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub device_dir: Option<PathBuf>,
    pub patterns: Option<Vec<String>>,
    pub baud_rate: Option<u32>,
    pub settle_ms: Option<u64>,
}

/// `[trigger]` 表
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerSection {
    pub gpio_root: Option<PathBuf>,
    pub pin: Option<u32>,
    pub mode: Option<TriggerModeName>,
    pub pulse_ms: Option<u64>,
}

impl BridgeConfig {
    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn listen_addr(&self) -> &str {
        self.listen.as_deref().unwrap_or(DEFAULT_LISTEN)
    }

    /// 合并出串口链路配置
    pub fn serial_config(&self) -> SerialLinkConfig {
        let mut config = SerialLinkConfig::default();
        let section = &self.serial;
        if let Some(dir) = &section.device_dir {
            config.device_dir = dir.clone();
        }
        if let Some(patterns) = &section.patterns {
            config.patterns = patterns.clone();
        }
        if let Some(baud_rate) = section.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(ms) = section.settle_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        config
    }

    /// 合并出触发链路配置
    pub fn trigger_config(&self) -> TriggerLinkConfig {
        let mut config = TriggerLinkConfig::default();
        let section = &self.trigger;
        if let Some(root) = &section.gpio_root {
            config.gpio_root = root.clone();
        }
        if let Some(pin) = section.pin {
            config.pin = pin;
        }
        config.mode = match section.mode.unwrap_or_default() {
            TriggerModeName::Level => TriggerMode::Level,
            TriggerModeName::Pulse => match section.pulse_ms {
                Some(ms) => TriggerMode::ResetPulse {
                    width: Duration::from_millis(ms),
                },
                None => TriggerMode::reset_pulse(),
            },
        };
        config
    }
}
