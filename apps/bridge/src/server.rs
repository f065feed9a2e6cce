//! UDP 监听循环
//!
//! 每个数据报解码为一条或多条 OSC 消息，依次同步交给路由器。
//! 路由器的发送是阻塞的，因此慢速链路会直接拖慢这里的接收。

use marionette_driver::Router;
use marionette_protocol::decode_packet;
use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 读超时：检查 `is_running` 的最长间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// UDP 数据报最大长度
const MAX_DATAGRAM: usize = 65_536;

/// 监听循环，直到 `is_running` 被清除
///
/// 解码失败的数据报被丢弃并记录警告，不会中断监听。
pub fn serve(socket: &UdpSocket, router: &Router, is_running: &AtomicBool) -> io::Result<()> {
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    if let Ok(addr) = socket.local_addr() {
        info!("Listening for OSC on udp://{}", addr);
    }

    let mut buf = vec![0u8; MAX_DATAGRAM];
    while is_running.load(Ordering::Acquire) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue;
            },
            Err(e) => {
                warn!("UDP receive error: {}", e);
                continue;
            },
        };

        trace!("Received {} bytes from {}", len, peer);
        match decode_packet(&buf[..len]) {
            Ok(messages) => {
                for message in &messages {
                    router.handle(message);
                }
            },
            Err(e) => warn!("Dropped malformed OSC packet from {}: {}", peer, e),
        }
    }

    debug!("UDP listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_driver::BridgeBuilder;
    use marionette_io::mock::MockSerial;
    use marionette_protocol::{OscArg, OscMessage, encode_bundle};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_serve_loopback() {
        let dir = tempfile::tempdir().unwrap();
        let serial = MockSerial::new();
        let bridge = BridgeBuilder::new()
            .device_dir(dir.path())
            .gpio_root(dir.path().join("gpio"))
            .settle_delay(Duration::ZERO)
            .with_serial_transport(Box::new(serial.clone()))
            .build()
            .unwrap();

        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let is_running = AtomicBool::new(true);

        thread::scope(|s| {
            let listener = s.spawn(|| serve(&socket, bridge.router(), &is_running));

            let client = UdpSocket::bind("127.0.0.1:0").unwrap();
            client.send_to(b"garbage", addr).unwrap();
            let bundle = encode_bundle(&[
                OscMessage::new("/position", vec![OscArg::Float32(12.5)]).encode(),
                OscMessage::new("/height", vec![OscArg::Int32(1)]).encode(),
            ]);
            client.send_to(&bundle, addr).unwrap();

            let deadline = Instant::now() + Duration::from_secs(5);
            while bridge.snapshot().arguments_rejected < 1 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }

            is_running.store(false, Ordering::Release);
            listener.join().unwrap().unwrap();
        });

        let metrics = bridge.shutdown();
        assert_eq!(metrics.commands_forwarded, 1);
        assert_eq!(metrics.arguments_rejected, 1);
        assert_eq!(serial.bytes(), vec![0x70, 0x00, 0x00, 0x48, 0x41]);
    }
}
