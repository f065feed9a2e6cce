//! sysfs GPIO 后端
//!
//! 通过 `/sys/class/gpio` 控制输出引脚：
//!
//! ```text
//! echo 17  > /sys/class/gpio/export
//! echo out > /sys/class/gpio/gpio17/direction
//! echo 1   > /sys/class/gpio/gpio17/value
//! echo 17  > /sys/class/gpio/unexport
//! ```

use crate::{LinkError, OutputPin};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 默认 sysfs GPIO 根目录
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// export 之后等待 udev 建立引脚目录的时间上限
const EXPORT_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// sysfs GPIO 接口
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    /// 打开 GPIO 接口
    ///
    /// 只检查 `export` 控制文件是否存在，不修改任何状态。
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LinkError> {
        let root = root.into();
        let export = root.join("export");
        if !export.exists() {
            return Err(LinkError::DeviceOpen {
                target: root.display().to_string(),
                reason: "GPIO export interface not available".to_string(),
            });
        }
        debug!("Opened GPIO interface at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 获取输出引脚（必要时先 export，再把方向设为输出）
    pub fn output_pin(&self, number: u32) -> Result<SysfsPin, LinkError> {
        let mut pin = SysfsPin {
            number,
            root: self.root.clone(),
            dir: self.root.join(format!("gpio{number}")),
            exported_by_us: false,
        };
        pin.export()?;
        pin.into_output()
    }
}

/// sysfs 输出引脚
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    root: PathBuf,
    dir: PathBuf,
    exported_by_us: bool,
}

impl SysfsPin {
    fn gpio_err(&self, action: &str, e: std::io::Error) -> LinkError {
        LinkError::Gpio {
            pin: self.number,
            message: format!("{action}: {e}"),
        }
    }

    fn export(&mut self) -> Result<(), LinkError> {
        if self.dir.exists() {
            trace!("GPIO {} already exported", self.number);
            return Ok(());
        }

        fs::write(self.root.join("export"), self.number.to_string())
            .map_err(|e| self.gpio_err("export", e))?;
        self.exported_by_us = true;

        // udev 需要一点时间创建 gpioN 目录并调整权限
        let start = Instant::now();
        while !self.dir.join("direction").exists() {
            if start.elapsed() > EXPORT_SETTLE_TIMEOUT {
                return Err(LinkError::Gpio {
                    pin: self.number,
                    message: "direction file did not appear after export".to_string(),
                });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    /// 设置输出方向；失败时撤销本次 export，不让引脚残留在导出状态
    fn into_output(mut self) -> Result<Self, LinkError> {
        if let Err(e) = self.set_direction_output() {
            if let Err(unexport) = self.release() {
                debug!("Failed to unexport GPIO {}: {}", self.number, unexport);
            }
            return Err(e);
        }
        Ok(self)
    }

    fn write_value(&self, value: &str) -> Result<(), LinkError> {
        fs::write(self.dir.join("value"), value).map_err(|e| self.gpio_err("write value", e))
    }
}

impl OutputPin for SysfsPin {
    fn number(&self) -> u32 {
        self.number
    }

    fn set_direction_output(&mut self) -> Result<(), LinkError> {
        fs::write(self.dir.join("direction"), "out").map_err(|e| self.gpio_err("set direction", e))
    }

    fn set_high(&mut self) -> Result<(), LinkError> {
        self.write_value("1")
    }

    fn set_low(&mut self) -> Result<(), LinkError> {
        self.write_value("0")
    }

    fn release(&mut self) -> Result<(), LinkError> {
        if !self.exported_by_us {
            return Ok(());
        }
        fs::write(self.root.join("unexport"), self.number.to_string())
            .map_err(|e| self.gpio_err("unexport", e))?;
        self.exported_by_us = false;
        debug!("Released GPIO {}", self.number);
        Ok(())
    }
}
