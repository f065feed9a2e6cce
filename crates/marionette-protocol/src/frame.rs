//! 串口外设命令帧
//!
//! 帧格式（5 字节，按位固定）：
//!
//! ```text
//! +--------+--------------------------------+
//! | id (1) | f32 little-endian IEEE-754 (4) |
//! +--------+--------------------------------+
//! ```
//!
//! - `'p'` (0x70)：位置
//! - `'h'` (0x68)：高度

use thiserror::Error;

/// 帧总长度
pub const FRAME_LEN: usize = 5;

/// 帧标识字节
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameId {
    Position = b'p',
    Height = b'h',
}

impl FrameId {
    /// 从标识字节解析
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'p' => Some(FrameId::Position),
            b'h' => Some(FrameId::Height),
            _ => None,
        }
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// 帧解码错误（串口外设侧/测试工具使用）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: expected {FRAME_LEN}, got {0}")]
    InvalidLength(usize),
    #[error("Unknown frame id: {0:#04x}")]
    UnknownId(u8),
}

/// 串口命令帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialFrame {
    pub id: FrameId,
    pub argument: f32,
}

impl SerialFrame {
    pub fn new(id: FrameId, argument: f32) -> Self {
        Self { id, argument }
    }

    /// 负载部分（4 字节小端单精度）
    pub fn payload(&self) -> [u8; 4] {
        self.argument.to_le_bytes()
    }

    /// 编码为完整的 5 字节帧
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = self.id.as_byte();
        buf[1..].copy_from_slice(&self.payload());
        buf
    }

    /// 从 5 字节解码
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != FRAME_LEN {
            return Err(FrameError::InvalidLength(buf.len()));
        }
        let id = FrameId::from_u8(buf[0]).ok_or(FrameError::UnknownId(buf[0]))?;
        let argument = f32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        Ok(Self { id, argument })
    }
}
