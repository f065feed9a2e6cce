//! Marionette 桥接进程主入口
//!
//! 监听 UDP 上的 OSC 消息（`/position`、`/height`、`/sequence`），
//! 转发到串口电机控制器和 GPIO 触发器。

mod config;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use config::{BridgeConfig, TriggerModeName};
use marionette_driver::{BridgeBuilder, TriggerMode};
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// OSC 命令桥
///
/// 命令行参数优先于配置文件中的值
#[derive(Parser, Debug)]
#[command(name = "marionette-bridge")]
#[command(about = "Bridge OSC commands to a serial motor controller and a GPIO trigger", long_about = None)]
struct Args {
    /// TOML 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP 监听地址
    ///
    /// 默认: 0.0.0.0:8000
    #[arg(long)]
    listen: Option<String>,

    /// 串口设备扫描目录
    ///
    /// 默认: /dev
    #[arg(long)]
    device_dir: Option<PathBuf>,

    /// 串口波特率
    ///
    /// 默认: 9600
    #[arg(long)]
    baud: Option<u32>,

    /// 串口打开后的稳定等待时间（毫秒）
    ///
    /// 默认: 1000
    #[arg(long)]
    settle_ms: Option<u64>,

    /// 触发器 GPIO 引脚编号
    ///
    /// 默认: 17
    #[arg(long)]
    gpio_pin: Option<u32>,

    /// sysfs GPIO 根目录
    ///
    /// 默认: /sys/class/gpio
    #[arg(long)]
    gpio_root: Option<PathBuf>,

    /// 触发行为
    #[arg(long, value_enum)]
    trigger_mode: Option<TriggerModeName>,

    /// 复位脉冲宽度（毫秒，仅 pulse 模式）
    ///
    /// 默认: 5
    #[arg(long)]
    pulse_ms: Option<u64>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(listen) = &self.listen {
            config.listen = Some(listen.clone());
        }
        if let Some(dir) = &self.device_dir {
            config.serial.device_dir = Some(dir.clone());
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = Some(baud);
        }
        if let Some(ms) = self.settle_ms {
            config.serial.settle_ms = Some(ms);
        }
        if let Some(pin) = self.gpio_pin {
            config.trigger.pin = Some(pin);
        }
        if let Some(root) = &self.gpio_root {
            config.trigger.gpio_root = Some(root.clone());
        }
        if let Some(mode) = self.trigger_mode {
            config.trigger.mode = Some(mode);
        }
        if let Some(ms) = self.pulse_ms {
            config.trigger.pulse_ms = Some(ms);
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in ["marionette_bridge", "marionette_driver", "marionette_io"] {
        filter = filter.add_directive(format!("{}={}", target, level).parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    args.apply(&mut config);

    let serial = config.serial_config();
    let trigger = config.trigger_config();
    info!(
        "Serial: scanning {} at {} baud; trigger: GPIO {} ({})",
        serial.device_dir.display(),
        serial.baud_rate,
        trigger.pin,
        match trigger.mode {
            TriggerMode::Level => "level".to_string(),
            TriggerMode::ResetPulse { width } => format!("pulse {:?}", width),
        }
    );

    // 设置信号处理（Ctrl+C 优雅退出）
    let is_running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&is_running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::Release);
    })
    .context("Failed to set signal handler")?;

    let bridge = BridgeBuilder::new()
        .serial_config(serial)
        .trigger_config(trigger)
        .build()?;

    let listen = config.listen_addr();
    let socket =
        UdpSocket::bind(listen).with_context(|| format!("Failed to bind UDP socket {}", listen))?;
    server::serve(&socket, bridge.router(), &is_running)?;

    info!("Received interrupt signal. Shutting down...");
    let metrics = bridge.shutdown();
    info!(
        forwarded = metrics.commands_forwarded,
        rejected = metrics.arguments_rejected,
        unrouted = metrics.messages_unrouted,
        frames_sent = metrics.frames_sent,
        triggers_applied = metrics.triggers_applied,
        undelivered = metrics.undelivered(),
        "Bridge stopped"
    );
    Ok(())
}
