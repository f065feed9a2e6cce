//! Bridge 模块
//!
//! 对外的 `Bridge` 结构体：持有路由器和两个链路线程的句柄。

use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::router::Router;
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};

/// 链路线程退出的最长等待时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 由看门狗线程执行 join，超时后它继续运行，进程退出时回收
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 命令分发桥（对外 API）
///
/// 由 [`BridgeBuilder`](crate::BridgeBuilder) 构造。
/// Drop 时先关闭所有命令通道，再等待链路线程退出。
pub struct Bridge {
    /// 路由器（持有全部发送端）
    ///
    /// 必须在 join 链路线程之前关闭，否则链路永远收不到 `Disconnected`。
    router: Router,
    serial_thread: Option<JoinHandle<()>>,
    trigger_thread: Option<JoinHandle<()>>,
    metrics: Arc<BridgeMetrics>,
}

impl Bridge {
    pub(crate) fn new(
        router: Router,
        serial_thread: JoinHandle<()>,
        trigger_thread: JoinHandle<()>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            router,
            serial_thread: Some(serial_thread),
            trigger_thread: Some(trigger_thread),
            metrics,
        }
    }

    /// 协议路由器
    ///
    /// 网络层对每条解码后的消息调用 [`Router::handle`]。
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// 共享指标
    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// 当前指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 关闭：释放发送端，等待两个链路线程排空并退出
    pub fn shutdown(mut self) -> MetricsSnapshot {
        self.stop();
        self.metrics.snapshot()
    }

    fn stop(&mut self) {
        if self.router.is_closed() {
            return;
        }
        self.router.close();
        info!("Shutting down command bridge");

        for (name, handle) in [
            ("Serial link", self.serial_thread.take()),
            ("Trigger link", self.trigger_thread.take()),
        ] {
            if let Some(handle) = handle
                && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
            {
                error!(
                    "{} thread panicked or failed to shut down within {:?}",
                    name, JOIN_TIMEOUT
                );
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.stop();
    }
}
