//! OSC 参数表示与强制转换
//!
//! 端点只接受 32/64 位数值表示，并统一收窄为 32 位规范类型：
//! - 浮点端点（position/height）：`Float32` / `Float64` → `f32`
//! - 整数端点（sequence）：`Int32` / `Int64` → `i32`
//!
//! 其他任何表示（或缺失参数）都返回 [`ArgumentTypeError`]。

use thiserror::Error;

/// OSC 参数（按类型标签区分的封闭和类型）
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// `i`
    Int32(i32),
    /// `h`
    Int64(i64),
    /// `f`
    Float32(f32),
    /// `d`
    Float64(f64),
    /// `s` / `S`
    String(String),
    /// `b`
    Blob(Vec<u8>),
    /// `T` / `F`
    Bool(bool),
    /// `N`
    Nil,
    /// `I`
    Impulse,
    /// `t`（NTP 格式时间戳）
    TimeTag(u64),
    /// `c`（ASCII 字符，按 32 位传输）
    Char(char),
    /// `r`
    Rgba(u32),
    /// `m`（port id, status, data1, data2）
    Midi([u8; 4]),
}

impl OscArg {
    /// OSC 类型标签
    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int32(_) => 'i',
            OscArg::Int64(_) => 'h',
            OscArg::Float32(_) => 'f',
            OscArg::Float64(_) => 'd',
            OscArg::String(_) => 's',
            OscArg::Blob(_) => 'b',
            OscArg::Bool(true) => 'T',
            OscArg::Bool(false) => 'F',
            OscArg::Nil => 'N',
            OscArg::Impulse => 'I',
            OscArg::TimeTag(_) => 't',
            OscArg::Char(_) => 'c',
            OscArg::Rgba(_) => 'r',
            OscArg::Midi(_) => 'm',
        }
    }

    /// 用于诊断信息的表示名称
    pub fn repr_name(&self) -> &'static str {
        match self {
            OscArg::Int32(_) => "int32",
            OscArg::Int64(_) => "int64",
            OscArg::Float32(_) => "float32",
            OscArg::Float64(_) => "float64",
            OscArg::String(_) => "string",
            OscArg::Blob(_) => "blob",
            OscArg::Bool(_) => "bool",
            OscArg::Nil => "nil",
            OscArg::Impulse => "impulse",
            OscArg::TimeTag(_) => "timetag",
            OscArg::Char(_) => "char",
            OscArg::Rgba(_) => "rgba",
            OscArg::Midi(_) => "midi",
        }
    }
}

/// 端点期望的参数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Float,
    Int,
}

impl std::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgKind::Float => write!(f, "float"),
            ArgKind::Int => write!(f, "integer"),
        }
    }
}

/// 参数类型错误
///
/// 路由器在此错误上丢弃消息并输出诊断，不会中断监听。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentTypeError {
    #[error("OSC message does not contain {expected} argument")]
    Missing { expected: ArgKind },
    #[error("OSC message does not contain {expected} argument (found {found})")]
    Mismatch {
        expected: ArgKind,
        found: &'static str,
    },
}

/// 浮点参数强制转换（`Float32` 原样，`Float64` 按标准规则收窄）
pub fn coerce_f32(arg: Option<&OscArg>) -> Result<f32, ArgumentTypeError> {
    match arg {
        Some(OscArg::Float32(v)) => Ok(*v),
        Some(OscArg::Float64(v)) => Ok(*v as f32),
        Some(other) => Err(ArgumentTypeError::Mismatch {
            expected: ArgKind::Float,
            found: other.repr_name(),
        }),
        None => Err(ArgumentTypeError::Missing {
            expected: ArgKind::Float,
        }),
    }
}

/// 整数参数强制转换（`Int32` 原样，`Int64` 截断为低 32 位）
pub fn coerce_i32(arg: Option<&OscArg>) -> Result<i32, ArgumentTypeError> {
    match arg {
        Some(OscArg::Int32(v)) => Ok(*v),
        Some(OscArg::Int64(v)) => Ok(*v as i32),
        Some(other) => Err(ArgumentTypeError::Mismatch {
            expected: ArgKind::Int,
            found: other.repr_name(),
        }),
        None => Err(ArgumentTypeError::Missing {
            expected: ArgKind::Int,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coerce_f32_accepts_both_widths() {
        assert_eq!(coerce_f32(Some(&OscArg::Float32(0.25))), Ok(0.25));
        assert_eq!(coerce_f32(Some(&OscArg::Float64(-3.5))), Ok(-3.5));
    }

    #[test]
    fn test_coerce_f32_rejects_integers() {
        // 浮点端点不接受整数表示（与整数端点对称）
        let err = coerce_f32(Some(&OscArg::Int32(1))).unwrap_err();
        assert_eq!(
            err,
            ArgumentTypeError::Mismatch {
                expected: ArgKind::Float,
                found: "int32"
            }
        );
    }

    #[test]
    fn test_coerce_i32_rejects_floats_and_strings() {
        assert!(coerce_i32(Some(&OscArg::Float32(1.0))).is_err());
        assert!(coerce_i32(Some(&OscArg::String("1".into()))).is_err());
        assert!(coerce_i32(Some(&OscArg::Nil)).is_err());
    }

    #[test]
    fn test_coerce_missing() {
        assert_eq!(
            coerce_i32(None),
            Err(ArgumentTypeError::Missing {
                expected: ArgKind::Int
            })
        );
    }

    #[test]
    fn test_coerce_i32_wraps_int64() {
        assert_eq!(coerce_i32(Some(&OscArg::Int64(7))), Ok(7));
        assert_eq!(coerce_i32(Some(&OscArg::Int64(1 << 32 | 5))), Ok(5));
    }

    #[test]
    fn test_error_display() {
        let err = ArgumentTypeError::Mismatch {
            expected: ArgKind::Int,
            found: "blob",
        };
        assert_eq!(
            err.to_string(),
            "OSC message does not contain integer argument (found blob)"
        );
    }

    proptest! {
        #[test]
        fn prop_float64_narrows_like_as_cast(v in any::<f64>()) {
            let out = coerce_f32(Some(&OscArg::Float64(v))).unwrap();
            let expected = v as f32;
            prop_assert!(out.to_bits() == expected.to_bits() || (out.is_nan() && expected.is_nan()));
        }

        #[test]
        fn prop_int32_is_identity(v in any::<i32>()) {
            prop_assert_eq!(coerce_i32(Some(&OscArg::Int32(v))), Ok(v));
            prop_assert_eq!(coerce_i32(Some(&OscArg::Int64(v as i64))), Ok(v));
        }
    }
}
