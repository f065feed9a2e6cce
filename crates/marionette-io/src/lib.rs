//! # Marionette IO
//!
//! 外设硬件抽象层：串口（电机控制微控制器）与 GPIO（触发器）。
//!
//! - `serial`: 串口设备发现与 `serialport` 后端
//! - `gpio`: sysfs GPIO 后端
//! - `mock`: 无硬件的记录型后端（feature `mock`）

use std::path::PathBuf;
use thiserror::Error;

pub mod gpio;
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gpio::{DEFAULT_GPIO_ROOT, SysfsGpio, SysfsPin};
pub use serial::{
    DEFAULT_DEVICE_DIR, DEFAULT_DEVICE_PATTERNS, find_serial_device, match_device_name,
};

#[cfg(feature = "serial")]
pub use serial::SerialPortTransport;

/// 外设链路错误
#[derive(Error, Debug)]
pub enum LinkError {
    /// 启动时没有发现匹配的串口设备
    #[error("No serial device found in {}", .dir.display())]
    DeviceNotFound { dir: PathBuf },

    /// 串口/GPIO 打开失败
    #[error("Failed to open {target}: {reason}")]
    DeviceOpen { target: String, reason: String },

    /// 写入已打开的串口失败
    #[error("Transmit error: {0}")]
    Transmit(#[source] std::io::Error),

    /// 写入字节数不足
    #[error("Short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// GPIO 引脚操作失败
    #[error("GPIO pin {pin}: {message}")]
    Gpio { pin: u32, message: String },
}

/// 引脚电平
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

/// 串口传输（只写）
///
/// 语义与 `write(bytes) -> (count, error)` 一致：返回实际写入的字节数。
pub trait SerialTransport: Send {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError>;

    fn flush(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        (**self).flush()
    }
}

/// GPIO 输出引脚
///
/// 方向一旦设置为输出就不再读回。
pub trait OutputPin: Send {
    /// 引脚编号
    fn number(&self) -> u32;
    fn set_direction_output(&mut self) -> Result<(), LinkError>;
    fn set_high(&mut self) -> Result<(), LinkError>;
    fn set_low(&mut self) -> Result<(), LinkError>;

    fn set_level(&mut self, level: PinLevel) -> Result<(), LinkError> {
        match level {
            PinLevel::High => self.set_high(),
            PinLevel::Low => self.set_low(),
        }
    }

    /// 释放引脚（尽力而为）
    fn release(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

impl<P: OutputPin + ?Sized> OutputPin for Box<P> {
    fn number(&self) -> u32 {
        (**self).number()
    }

    fn set_direction_output(&mut self) -> Result<(), LinkError> {
        (**self).set_direction_output()
    }

    fn set_high(&mut self) -> Result<(), LinkError> {
        (**self).set_high()
    }

    fn set_low(&mut self) -> Result<(), LinkError> {
        (**self).set_low()
    }

    fn set_level(&mut self, level: PinLevel) -> Result<(), LinkError> {
        (**self).set_level(level)
    }

    fn release(&mut self) -> Result<(), LinkError> {
        (**self).release()
    }
}
