// crates/bf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `BfError` 枚举和 `BfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层只定义核心错误，交换协议错误在 bf_exchange 中定义
//! 2. **可恢复**: 协议类错误只中止单个流域单元的当前步，不终止整个模拟
//! 3. **易用性**: 提供便捷的构造方法
//!
//! # 示例
//!
//! ```
//! use bf_foundation::error::{BfError, BfResult};
//!
//! fn read_config() -> BfResult<()> {
//!     Err(BfError::config("蓄水上限必须为正"))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type BfResult<T> = Result<T, BfError>;

/// BasinFlow 错误类型
///
/// 核心错误类型，用于整个项目。流量交换协议相关的错误在 `bf_exchange` 中扩展。
#[derive(Error, Debug)]
pub enum BfError {
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 缺少配置项
    #[error("缺少必需的配置项: {key}")]
    MissingConfig {
        /// 配置键名
        key: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    /// 锁获取失败
    #[error("锁获取失败: {resource}")]
    LockError {
        /// 失败的资源名
        resource: String,
    },

    /// 通道发送失败
    #[error("通道发送失败")]
    ChannelSendError,

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },

    /// 内部错误
    ///
    /// 表示不变量被破坏，属于实现缺陷而非使用错误。
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl BfError {
    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从IO错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 缺少配置
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 锁错误
    pub fn lock_error(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl BfError {
    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> BfResult<()> {
        if value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查值是否为有限数
    #[inline]
    pub fn check_finite(field: &'static str, value: f64) -> BfResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::invalid_input(format!("{field} 不是有限数: {value}")))
        }
    }

    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> BfResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for BfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for BfError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockError {
            resource: "mutex".into(),
        }
    }
}

impl<T> From<std::sync::mpsc::SendError<T>> for BfError {
    fn from(_: std::sync::mpsc::SendError<T>) -> Self {
        Self::ChannelSendError
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时返回错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}

/// 从 Option 中取值，缺失时返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BfError::config("测试配置错误");
        assert!(err.to_string().contains("配置错误"));
    }

    #[test]
    fn test_out_of_range() {
        let err = BfError::out_of_range("storage", 12.0, 0.0, 8.0);
        let text = err.to_string();
        assert!(text.contains("storage"));
        assert!(text.contains("12"));
    }

    #[test]
    fn test_check_range() {
        assert!(BfError::check_range("pct", 50.0, 0.0, 100.0).is_ok());
        assert!(BfError::check_range("pct", -1.0, 0.0, 100.0).is_err());
        assert!(BfError::check_range("pct", 101.0, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_check_finite() {
        assert!(BfError::check_finite("flow", 1.0).is_ok());
        assert!(BfError::check_finite("flow", f64::NAN).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let bf_err: BfError = io_err.into();
        assert!(matches!(bf_err, BfError::Io { .. }));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> BfResult<()> {
            ensure!(value > 0, BfError::invalid_input("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }

    #[test]
    fn test_require_macro() {
        fn get_value(opt: Option<i32>) -> BfResult<i32> {
            let v = require!(opt, BfError::not_found("value"));
            Ok(v)
        }

        assert_eq!(get_value(Some(42)).unwrap(), 42);
        assert!(get_value(None).is_err());
    }
}
