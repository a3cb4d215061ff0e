//! # Error 模块
//!
//! 补间引擎的错误类型。
//!
//! 生命周期操作（启动、停止、销毁、逐帧推进）不会返回错误：
//! 重复调用是空操作，目标失效时补间静默取消。
//! 这里只覆盖解析与配置两类失败。

use thiserror::Error;

/// 缓动解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TweenError {
    /// 未知的缓动名称
    #[error("未知的缓动函数: {name}")]
    UnknownEase { name: String },

    /// 参数化缓动的参数无效
    #[error("缓动参数无效 '{input}': {message}")]
    InvalidEaseParameter { input: String, message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析或序列化失败
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 配置值不合法
    #[error("配置验证失败: {0}")]
    Validation(String),
}
