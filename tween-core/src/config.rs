//! # Config 模块
//!
//! 补间系统配置。
//!
//! ## 配置优先级
//!
//! 1. 代码中显式构造的配置（最高）
//! 2. 配置文件 (tween.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::easing::Ease;
use crate::error::ConfigError;
use crate::target::Space;
use crate::tween::TweenOptions;

/// 补间系统配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweenConfig {
    /// 时间缩放，作用于每一帧的间隔
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,

    /// 单帧间隔上限（秒），用于吸收卡顿造成的跳帧
    #[serde(default)]
    pub max_frame_delta: Option<f32>,

    /// 未指定缓动时使用的默认值
    #[serde(default)]
    pub default_ease: Ease,

    /// 未指定坐标空间时使用的默认值
    #[serde(default)]
    pub default_space: Space,
}

fn default_time_scale() -> f32 {
    1.0
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            max_frame_delta: None,
            default_ease: Ease::default(),
            default_space: Space::default(),
        }
    }
}

impl TweenConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在、读取或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => {
                debug!(path = %path.display(), "配置文件加载成功");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "配置文件加载失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 加载并验证配置文件，失败时返回错误
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::Validation(format!(
                "time_scale 必须是非负有限数值: {}",
                self.time_scale
            )));
        }

        if let Some(max) = self
            .max_frame_delta
            .filter(|max| !max.is_finite() || *max <= 0.0)
        {
            return Err(ConfigError::Validation(format!(
                "max_frame_delta 必须是正数: {max}"
            )));
        }

        if let Ease::Power { exponent } = self.default_ease {
            if !exponent.is_finite() || exponent <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "默认缓动的幂次必须大于 0: {exponent}"
                )));
            }
        }

        Ok(())
    }

    /// 默认补间选项
    pub fn default_options(&self) -> TweenOptions {
        TweenOptions {
            ease: self.default_ease,
            space: self.default_space,
            delay: 0.0,
        }
    }

    /// 计算实际推进的帧间隔
    ///
    /// 负值视为 0，先乘时间缩放，再按上限截断。
    pub fn frame_delta(&self, raw: f32) -> f32 {
        let scaled = raw.max(0.0) * self.time_scale;
        match self.max_frame_delta {
            Some(max) => scaled.min(max),
            None => scaled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = TweenConfig::from_json("{}").unwrap();
        assert_eq!(config, TweenConfig::default());
        assert_eq!(config.time_scale, 1.0);
        assert_eq!(config.default_ease, Ease::Linear);
    }

    #[test]
    fn test_frame_delta() {
        let config = TweenConfig {
            time_scale: 2.0,
            max_frame_delta: Some(0.1),
            ..TweenConfig::default()
        };
        assert_eq!(config.frame_delta(0.02), 0.04);
        assert_eq!(config.frame_delta(1.0), 0.1);
        assert_eq!(config.frame_delta(-1.0), 0.0);
    }

    #[test]
    fn test_validation() {
        let config = TweenConfig {
            time_scale: -1.0,
            ..TweenConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = TweenConfig {
            max_frame_delta: Some(0.0),
            ..TweenConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TweenConfig {
            default_ease: Ease::Power { exponent: -2.0 },
            ..TweenConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(matches!(
            TweenConfig::from_json("{\"time_scale\": \"fast\"}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tween.json");
        let config = TweenConfig {
            time_scale: 0.5,
            max_frame_delta: Some(0.25),
            default_ease: Ease::OutCubic,
            default_space: Space::World,
        };

        config.save(&path).unwrap();
        assert_eq!(TweenConfig::try_load(&path).unwrap(), config);
        assert_eq!(TweenConfig::load(&path), config);
    }

    #[test]
    fn test_load_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert_eq!(TweenConfig::load(&missing), TweenConfig::default());
        assert!(matches!(
            TweenConfig::try_load(&missing),
            Err(ConfigError::Io(_))
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert_eq!(TweenConfig::load(&broken), TweenConfig::default());
    }
}
