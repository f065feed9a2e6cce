//! Bridge 端到端集成测试
//!
//! 使用 MockSerial / MockPin 替代硬件，验证 路由器 -> 通道 -> 链路线程 -> 外设 的完整流程。

use marionette_driver::*;
use marionette_io::PinLevel;
use marionette_io::mock::{MockPin, MockSerial};
use marionette_protocol::{OscArg, OscMessage};
use std::time::{Duration, Instant};

/// 不存在任何设备的目录，保证两个链路都进入未连接状态
fn unattached_builder(dir: &tempfile::TempDir) -> BridgeBuilder {
    BridgeBuilder::new()
        .device_dir(dir.path())
        .gpio_root(dir.path().join("gpio"))
        .settle_delay(Duration::ZERO)
}

fn mock_bridge(serial: &MockSerial, pin: &MockPin, mode: TriggerMode) -> Bridge {
    let dir = tempfile::tempdir().unwrap();
    unattached_builder(&dir)
        .with_serial_transport(Box::new(serial.clone()))
        .with_output_pin(Box::new(pin.clone()))
        .trigger_mode(mode)
        .build()
        .unwrap()
}

#[test]
fn test_position_frame_on_wire() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);

    let dispatch = bridge
        .router()
        .dispatch("/position", &[OscArg::Float32(12.5)])
        .unwrap();
    assert_eq!(dispatch, Dispatch::Forwarded(Command::Position(12.5)));

    let metrics = bridge.shutdown();
    assert_eq!(serial.bytes(), vec![0x70, 0x00, 0x00, 0x48, 0x41]);
    // 标识字节和负载是两次独立的写入
    assert_eq!(serial.writes().lock().len(), 2);
    assert_eq!(metrics.frames_sent, 1);
}

#[test]
fn test_height_accepts_double_precision() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);

    bridge
        .router()
        .handle(&OscMessage::new("/height", vec![OscArg::Float64(0.1)]));
    bridge.shutdown();

    let mut expected = vec![b'h'];
    expected.extend_from_slice(&(0.1f64 as f32).to_le_bytes());
    assert_eq!(serial.bytes(), expected);
}

#[test]
fn test_frames_never_interleave() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);

    std::thread::scope(|s| {
        let router = bridge.router();
        s.spawn(|| {
            for i in 0..50 {
                router.dispatch("/position", &[OscArg::Float32(i as f32)]).unwrap();
            }
        });
        s.spawn(|| {
            for i in 0..50 {
                router.dispatch("/height", &[OscArg::Float32(-(i as f32))]).unwrap();
            }
        });
    });
    bridge.shutdown();

    let bytes = serial.bytes();
    assert_eq!(bytes.len(), 100 * 5);
    let mut positions = Vec::new();
    for frame in bytes.chunks(5) {
        let value = f32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
        match frame[0] {
            b'p' => positions.push(value),
            b'h' => assert!(value <= 0.0),
            other => panic!("unexpected frame id {:#x}", other),
        }
    }
    // 同一通道保持发送顺序
    let expected: Vec<f32> = (0..50).map(|i| i as f32).collect();
    assert_eq!(positions, expected);
}

#[test]
fn test_degraded_mode_liveness() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = unattached_builder(&dir).build().unwrap();

    let start = Instant::now();
    for i in 0..100 {
        let dispatch = bridge
            .router()
            .dispatch("/position", &[OscArg::Float32(i as f32)])
            .unwrap();
        assert!(matches!(dispatch, Dispatch::Forwarded(_)));
    }
    bridge
        .router()
        .dispatch("/sequence", &[OscArg::Int32(1)])
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));

    let metrics = bridge.shutdown();
    assert_eq!(metrics.frames_dropped, 100);
    assert_eq!(metrics.triggers_dropped, 1);
    assert_eq!(metrics.frames_sent, 0);
}

#[test]
fn test_sequence_levels() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);
    let router = bridge.router();

    router.dispatch("/sequence", &[OscArg::Int32(1)]).unwrap();
    router.dispatch("/sequence", &[OscArg::Int64(0)]).unwrap();
    router.dispatch("/sequence", &[OscArg::Int32(7)]).unwrap();
    router.dispatch("/sequence", &[OscArg::Int32(1)]).unwrap();
    router.dispatch("/sequence", &[OscArg::Int32(1)]).unwrap();
    bridge.shutdown();

    assert!(pin.is_output());
    assert_eq!(
        *pin.history().lock(),
        vec![
            PinLevel::High,
            PinLevel::Low,
            PinLevel::Low,
            PinLevel::High,
            PinLevel::High
        ]
    );
    assert!(pin.is_released());
}

#[test]
fn test_reset_pulse_mode() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(
        &serial,
        &pin,
        TriggerMode::ResetPulse {
            width: Duration::from_millis(1),
        },
    );

    bridge
        .router()
        .dispatch("/sequence", &[OscArg::Int32(0)])
        .unwrap();
    let metrics = bridge.shutdown();

    assert_eq!(*pin.history().lock(), vec![PinLevel::High, PinLevel::Low]);
    assert_eq!(metrics.triggers_applied, 1);
}

#[test]
fn test_malformed_arguments_are_dropped() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);
    let router = bridge.router();

    router.handle(&OscMessage::new("/position", vec![OscArg::Int32(3)]));
    router.handle(&OscMessage::new("/height", vec![]));
    router.handle(&OscMessage::new(
        "/sequence",
        vec![OscArg::String("1".to_string())],
    ));
    router.handle(&OscMessage::new("/volume", vec![OscArg::Float32(1.0)]));

    let metrics = bridge.shutdown();
    assert_eq!(metrics.arguments_rejected, 3);
    assert_eq!(metrics.messages_unrouted, 1);
    assert_eq!(metrics.commands_forwarded, 0);
    assert!(serial.bytes().is_empty());
    assert!(pin.history().lock().is_empty());
}

#[test]
fn test_transmit_failure_keeps_link_alive() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    let bridge = mock_bridge(&serial, &pin, TriggerMode::Level);

    serial.fail_next_writes(1);
    bridge
        .router()
        .dispatch("/position", &[OscArg::Float32(1.0)])
        .unwrap();
    bridge
        .router()
        .dispatch("/position", &[OscArg::Float32(2.0)])
        .unwrap();
    let metrics = bridge.shutdown();

    let mut expected = vec![b'p'];
    expected.extend_from_slice(&2.0f32.to_le_bytes());
    assert_eq!(serial.bytes(), expected);
    assert_eq!(metrics.transmit_errors, 1);
    assert_eq!(metrics.frames_sent, 1);
}

#[test]
fn test_drop_releases_pin() {
    let serial = MockSerial::new();
    let pin = MockPin::new(17);
    {
        let _bridge = mock_bridge(&serial, &pin, TriggerMode::Level);
    }
    assert!(pin.is_released());
}
