//! Mock 外设后端
//!
//! 记录所有写入，用于在没有硬件的情况下测试链路行为。
//! 记录缓冲区通过 `Arc<Mutex<..>>` 共享，后端本身可以移交给链路线程。

use crate::{LinkError, OutputPin, PinLevel, SerialTransport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 记录型串口
///
/// 每次 `write` 调用记录为一个独立的块，便于断言写入顺序和分段。
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    /// 剩余需要注入失败的写入次数
    fail_next: Arc<AtomicUsize>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// 共享的写入记录
    pub fn writes(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.writes)
    }

    /// 所有写入拼接后的字节流
    pub fn bytes(&self) -> Vec<u8> {
        self.writes.lock().concat()
    }

    /// 让接下来的 `n` 次写入失败
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

impl SerialTransport for MockSerial {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LinkError::Transmit(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected write failure",
            )));
        }
        self.writes.lock().push(data.to_vec());
        Ok(data.len())
    }
}

/// 记录型输出引脚
#[derive(Debug, Clone)]
pub struct MockPin {
    number: u32,
    is_output: Arc<Mutex<bool>>,
    history: Arc<Mutex<Vec<PinLevel>>>,
    released: Arc<Mutex<bool>>,
}

impl MockPin {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            is_output: Arc::new(Mutex::new(false)),
            history: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(Mutex::new(false)),
        }
    }

    /// 共享的电平写入历史
    pub fn history(&self) -> Arc<Mutex<Vec<PinLevel>>> {
        Arc::clone(&self.history)
    }

    /// 当前电平（从未写入时为 `None`）
    pub fn level(&self) -> Option<PinLevel> {
        self.history.lock().last().copied()
    }

    pub fn is_output(&self) -> bool {
        *self.is_output.lock()
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }

    fn record(&self, level: PinLevel) -> Result<(), LinkError> {
        if !*self.is_output.lock() {
            return Err(LinkError::Gpio {
                pin: self.number,
                message: "pin is not configured as output".to_string(),
            });
        }
        self.history.lock().push(level);
        Ok(())
    }
}

impl OutputPin for MockPin {
    fn number(&self) -> u32 {
        self.number
    }

    fn set_direction_output(&mut self) -> Result<(), LinkError> {
        *self.is_output.lock() = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), LinkError> {
        self.record(PinLevel::High)
    }

    fn set_low(&mut self) -> Result<(), LinkError> {
        self.record(PinLevel::Low)
    }

    fn release(&mut self) -> Result<(), LinkError> {
        *self.released.lock() = true;
        Ok(())
    }
}
