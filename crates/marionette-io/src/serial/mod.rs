//! 串口设备发现
//!
//! 启动时对设备目录做一次性快照扫描（不监听热插拔），
//! 返回第一个名称包含已知串口适配器子串的设备路径。

use crate::LinkError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(feature = "serial")]
mod port;

#[cfg(feature = "serial")]
pub use port::SerialPortTransport;

/// 默认设备目录
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// 已知串口适配器名称子串
///
/// - `tty.usbserial` / `tty.usbmodem`：macOS 下的 FTDI / CDC 设备
/// - `ttyUSB`：Linux USB-serial 转换芯片
/// - `ttyACM`：Linux CDC-ACM（Arduino Uno/Leonardo 等）
pub const DEFAULT_DEVICE_PATTERNS: &[&str] = &["tty.usbserial", "tty.usbmodem", "ttyUSB", "ttyACM"];

/// 按给定顺序返回第一个包含任一子串的名称
pub fn match_device_name<I, S, P>(names: I, patterns: &[P]) -> Option<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    P: AsRef<str>,
{
    names.into_iter().find(|name| {
        let name = name.as_ref();
        patterns.iter().any(|pattern| name.contains(pattern.as_ref()))
    })
}

/// 扫描设备目录，返回第一个匹配设备的完整路径
///
/// 目录项按文件名排序后再匹配，保证结果与目录遍历顺序无关。
/// 目录不可读时等同于没有设备。
pub fn find_serial_device<P: AsRef<str>>(dir: &Path, patterns: &[P]) -> Result<PathBuf, LinkError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Unable to list {}: {}", dir.display(), e);
            return Err(LinkError::DeviceNotFound {
                dir: dir.to_path_buf(),
            });
        },
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    match match_device_name(names, patterns) {
        Some(name) => {
            let path = dir.join(name);
            info!("Found serial device: {}", path.display());
            Ok(path)
        },
        None => Err(LinkError::DeviceNotFound {
            dir: dir.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_match_uses_scan_order() {
        let names = ["ttyS0", "ttyUSB0", "ttyACM3"];
        assert_eq!(
            match_device_name(names, DEFAULT_DEVICE_PATTERNS),
            Some("ttyUSB0")
        );
    }

    #[test]
    fn test_match_macos_names() {
        let names = ["cu.Bluetooth", "tty.usbmodem14101"];
        assert_eq!(
            match_device_name(names, DEFAULT_DEVICE_PATTERNS),
            Some("tty.usbmodem14101")
        );
    }

    #[test]
    fn test_match_none() {
        let names = ["null", "ttyS0", "random"];
        assert_eq!(match_device_name(names, DEFAULT_DEVICE_PATTERNS), None);
    }

    #[test]
    fn test_find_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["null", "ttyS0", "ttyACM0"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let path = find_serial_device(dir.path(), DEFAULT_DEVICE_PATTERNS).unwrap();
        assert_eq!(path, dir.path().join("ttyACM0"));
    }

    #[test]
    fn test_find_is_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ttyUSB1", "ttyUSB0"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let path = find_serial_device(dir.path(), DEFAULT_DEVICE_PATTERNS).unwrap();
        assert_eq!(path, dir.path().join("ttyUSB0"));
    }

    #[test]
    fn test_find_not_found() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("ttyS0")).unwrap();

        let err = find_serial_device(dir.path(), DEFAULT_DEVICE_PATTERNS).unwrap_err();
        assert!(matches!(err, LinkError::DeviceNotFound { .. }));
    }

    #[test]
    fn test_find_missing_directory() {
        let err = find_serial_device(Path::new("/nonexistent/marionette"), &["ttyUSB"]).unwrap_err();
        assert!(matches!(err, LinkError::DeviceNotFound { .. }));
    }
}
