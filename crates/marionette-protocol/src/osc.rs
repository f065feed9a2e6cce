//! OSC 1.0 数据包编解码
//!
//! UDP 数据报中承载的 Open Sound Control 消息/消息束。
//!
//! - 所有字段 4 字节对齐，大端字节序
//! - 字符串以 NUL 结尾并补齐到 4 字节边界
//! - 消息束（`#bundle`）按顺序展开为消息列表，时间标签被忽略（立即分发）

use crate::args::OscArg;
use thiserror::Error;

/// 消息束标识
const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// 消息束嵌套深度上限
const MAX_BUNDLE_DEPTH: usize = 8;

// ============================================================================
// Protocol Error
// ============================================================================

/// OSC 解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OscError {
    #[error("Packet too short: need {needed} bytes at offset {offset}")]
    TooShort { offset: usize, needed: usize },
    #[error("Packet length {0} is not a multiple of 4")]
    Misaligned(usize),
    #[error("Unterminated OSC string at offset {0}")]
    UnterminatedString(usize),
    #[error("OSC string is not valid UTF-8")]
    InvalidUtf8,
    #[error("Invalid OSC address: {0:?}")]
    InvalidAddress(String),
    #[error("Missing type tag string after {0:?}")]
    MissingTypeTags(String),
    #[error("Unsupported OSC type tag: {0:?}")]
    UnknownTypeTag(char),
    #[error("Invalid OSC char argument: {0:#x}")]
    InvalidChar(u32),
    #[error("Negative OSC blob length {length} at offset {offset}")]
    NegativeLength { offset: usize, length: i32 },
    #[error("Invalid OSC bundle: {0}")]
    InvalidBundle(&'static str),
}

// ============================================================================
// Message
// ============================================================================

/// 解码后的 OSC 消息
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// 端点地址（如 `/position`）
    pub address: String,
    /// 参数列表
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// 编码为 OSC 数据包
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        write_string(&mut out, &self.address);

        let mut tags = String::with_capacity(self.args.len() + 1);
        tags.push(',');
        tags.extend(self.args.iter().map(OscArg::type_tag));
        write_string(&mut out, &tags);

        for arg in &self.args {
            match arg {
                OscArg::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
                OscArg::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
                OscArg::Float32(v) => out.extend_from_slice(&v.to_be_bytes()),
                OscArg::Float64(v) => out.extend_from_slice(&v.to_be_bytes()),
                OscArg::String(s) => write_string(&mut out, s),
                OscArg::Blob(b) => {
                    out.extend_from_slice(&(b.len() as u32).to_be_bytes());
                    out.extend_from_slice(b);
                    pad_to_4(&mut out);
                },
                OscArg::TimeTag(t) => out.extend_from_slice(&t.to_be_bytes()),
                OscArg::Char(c) => out.extend_from_slice(&(*c as u32).to_be_bytes()),
                OscArg::Rgba(v) => out.extend_from_slice(&v.to_be_bytes()),
                OscArg::Midi(m) => out.extend_from_slice(m),
                OscArg::Bool(_) | OscArg::Nil | OscArg::Impulse => {},
            }
        }
        out
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// 解码一个 UDP 数据报中的 OSC 数据包
///
/// 单条消息返回长度为 1 的列表；消息束按出现顺序展开。
pub fn decode_packet(buf: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let mut messages = Vec::new();
    decode_into(buf, 0, &mut messages)?;
    Ok(messages)
}

fn decode_into(buf: &[u8], depth: usize, out: &mut Vec<OscMessage>) -> Result<(), OscError> {
    if buf.len() % 4 != 0 {
        return Err(OscError::Misaligned(buf.len()));
    }
    if buf.starts_with(BUNDLE_TAG) {
        decode_bundle(buf, depth, out)
    } else {
        out.push(decode_message(buf)?);
        Ok(())
    }
}

fn decode_bundle(buf: &[u8], depth: usize, out: &mut Vec<OscMessage>) -> Result<(), OscError> {
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(OscError::InvalidBundle("nested too deeply"));
    }
    // "#bundle\0" + 8 字节时间标签
    let mut reader = Reader::new(buf);
    reader.take(BUNDLE_TAG.len())?;
    let _time_tag = reader.read_u64()?;

    while !reader.is_empty() {
        let size = reader.read_i32()?;
        if size < 0 {
            return Err(OscError::InvalidBundle("negative element size"));
        }
        let element = reader.take(size as usize)?;
        decode_into(element, depth + 1, out)?;
    }
    Ok(())
}

fn decode_message(buf: &[u8]) -> Result<OscMessage, OscError> {
    let mut reader = Reader::new(buf);
    let address = reader.read_string()?;
    if !address.starts_with('/') {
        return Err(OscError::InvalidAddress(address));
    }

    // 类型标签字符串缺失时视为无参数（部分旧客户端不发送类型标签）
    if reader.is_empty() {
        return Ok(OscMessage::new(address, Vec::new()));
    }
    let tags = reader.read_string()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(OscError::MissingTypeTags(address));
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => OscArg::Int32(reader.read_i32()?),
            'h' => OscArg::Int64(reader.read_u64()? as i64),
            'f' => OscArg::Float32(f32::from_bits(reader.read_u32()?)),
            'd' => OscArg::Float64(f64::from_bits(reader.read_u64()?)),
            's' | 'S' => OscArg::String(reader.read_string()?),
            'b' => OscArg::Blob(reader.read_blob()?),
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            'N' => OscArg::Nil,
            'I' => OscArg::Impulse,
            't' => OscArg::TimeTag(reader.read_u64()?),
            'c' => {
                let raw = reader.read_u32()?;
                OscArg::Char(char::from_u32(raw).ok_or(OscError::InvalidChar(raw))?)
            },
            'r' => OscArg::Rgba(reader.read_u32()?),
            'm' => {
                let b = reader.take(4)?;
                OscArg::Midi([b[0], b[1], b[2], b[3]])
            },
            other => return Err(OscError::UnknownTypeTag(other)),
        };
        args.push(arg);
    }

    Ok(OscMessage::new(address, args))
}

/// 大端顺序读取器
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], OscError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        let Some(end) = end else {
            return Err(OscError::TooShort {
                offset: self.pos,
                needed: n,
            });
        };
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, OscError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, OscError> {
        self.read_u32().map(|v| v as i32)
    }

    fn read_u64(&mut self) -> Result<u64, OscError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_string(&mut self) -> Result<String, OscError> {
        let start = self.pos;
        let rest = &self.buf[start.min(self.buf.len())..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(OscError::UnterminatedString(start))?;
        let s = std::str::from_utf8(&rest[..nul]).map_err(|_| OscError::InvalidUtf8)?;
        // NUL 结尾后补齐到 4 字节
        let padded = (nul + 4) & !3;
        self.take(padded)?;
        Ok(s.to_owned())
    }

    fn read_blob(&mut self) -> Result<Vec<u8>, OscError> {
        let offset = self.pos;
        let len = self.read_i32()?;
        if len < 0 {
            return Err(OscError::NegativeLength {
                offset,
                length: len,
            });
        }
        let len = len as usize;
        let data = self.take(len)?.to_vec();
        let pad = (4 - len % 4) % 4;
        self.take(pad)?;
        Ok(data)
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    pad_to_4(out);
}

fn pad_to_4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// 将若干已编码的数据包组装成消息束（时间标签 1 = 立即执行）
pub fn encode_bundle(elements: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + elements.iter().map(|e| e.len() + 4).sum::<usize>());
    out.extend_from_slice(BUNDLE_TAG);
    out.extend_from_slice(&1u64.to_be_bytes());
    for element in elements {
        out.extend_from_slice(&(element.len() as u32).to_be_bytes());
        out.extend_from_slice(element);
    }
    out
}
