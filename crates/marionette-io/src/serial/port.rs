//! `serialport` 串口后端

use crate::{LinkError, SerialTransport};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// 串口写超时
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// 基于 `serialport` 的串口传输
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
}

impl SerialPortTransport {
    /// 打开串口（8N1，无流控）
    ///
    /// # 参数
    /// * `path` - 设备路径（如 "/dev/ttyUSB0"）
    /// * `baud_rate` - 波特率（如 9600）
    pub fn open(path: &Path, baud_rate: u32) -> Result<Self, LinkError> {
        let name = path.to_string_lossy();
        let port = serialport::new(name.as_ref(), baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| LinkError::DeviceOpen {
                target: name.to_string(),
                reason: e.to_string(),
            })?;

        info!("Opened serial port: {} at {} baud", name, baud_rate);
        Ok(Self { port })
    }
}

impl SerialTransport for SerialPortTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        io::Write::write(&mut self.port, data).map_err(LinkError::Transmit)
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        io::Write::flush(&mut self.port).map_err(LinkError::Transmit)
    }
}
