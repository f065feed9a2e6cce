//! 分发管线指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 分发管线实时指标
///
/// # 使用示例
///
/// ```rust
/// use marionette_driver::BridgeMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = BridgeMetrics::new();
/// metrics.commands_forwarded.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().commands_forwarded, 1);
/// ```
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 路由器转发到通道的命令数
    pub commands_forwarded: AtomicU64,
    /// 参数类型错误被丢弃的消息数
    pub arguments_rejected: AtomicU64,
    /// 地址不匹配任何端点的消息数
    pub messages_unrouted: AtomicU64,

    /// 成功写入串口的帧数
    pub frames_sent: AtomicU64,
    /// 串口未连接而丢弃的帧数
    pub frames_dropped: AtomicU64,
    /// 串口写入失败次数
    pub transmit_errors: AtomicU64,

    /// 成功作用到引脚的触发数
    pub triggers_applied: AtomicU64,
    /// GPIO 未连接而丢弃的触发数
    pub triggers_dropped: AtomicU64,
    /// 引脚写入失败次数
    pub pin_errors: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_forwarded: self.commands_forwarded.load(Ordering::Relaxed),
            arguments_rejected: self.arguments_rejected.load(Ordering::Relaxed),
            messages_unrouted: self.messages_unrouted.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            transmit_errors: self.transmit_errors.load(Ordering::Relaxed),
            triggers_applied: self.triggers_applied.load(Ordering::Relaxed),
            triggers_dropped: self.triggers_dropped.load(Ordering::Relaxed),
            pin_errors: self.pin_errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub commands_forwarded: u64,
    pub arguments_rejected: u64,
    pub messages_unrouted: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub transmit_errors: u64,
    pub triggers_applied: u64,
    pub triggers_dropped: u64,
    pub pin_errors: u64,
}

impl MetricsSnapshot {
    /// 被链路丢弃或失败的命令总数
    pub fn undelivered(&self) -> u64 {
        self.frames_dropped + self.transmit_errors + self.triggers_dropped + self.pin_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = BridgeMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.undelivered(), 0);
    }

    #[test]
    fn test_metrics_concurrent_increment() {
        let metrics = Arc::new(BridgeMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        BridgeMetrics::incr(&metrics.frames_sent);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().frames_sent, 400);
    }

    #[test]
    fn test_undelivered() {
        let snapshot = MetricsSnapshot {
            frames_dropped: 2,
            transmit_errors: 1,
            triggers_dropped: 3,
            pin_errors: 4,
            ..Default::default()
        };
        assert_eq!(snapshot.undelivered(), 10);
    }
}
