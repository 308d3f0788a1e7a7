use anyhow::{anyhow, Result};
use config::{Config, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::GlobalConfig;

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// 加载全局配置
    pub fn load_global(&self) -> Result<GlobalConfig> {
        let config_path = self.config_dir.join("global.toml");

        if !config_path.exists() {
            // 如果配置文件不存在，返回默认配置
            return Ok(GlobalConfig::default());
        }

        let config = Config::builder()
            .add_source(File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        let global = self.load_global()?;

        // 验证升级延迟序列
        let offsets = &global.escalation.offsets_minutes;
        if offsets.is_empty() {
            return Err(anyhow!("escalation.offsets_minutes must not be empty"));
        }
        if offsets[0] < 0 {
            return Err(anyhow!(
                "escalation.offsets_minutes must start at a non-negative offset, got {}",
                offsets[0]
            ));
        }
        for pair in offsets.windows(2) {
            if pair[1] <= pair[0] {
                return Err(anyhow!(
                    "escalation.offsets_minutes must be strictly ascending ({} followed by {})",
                    pair[0],
                    pair[1]
                ));
            }
        }

        // 验证周期配置
        if global.dispatch.tick_seconds == 0 {
            return Err(anyhow!("dispatch.tick_seconds must be greater than 0"));
        }
        if global.dispatch.delivery_timeout_seconds == 0 {
            return Err(anyhow!(
                "dispatch.delivery_timeout_seconds must be greater than 0"
            ));
        }
        if global.retention.sweep_interval_seconds == 0 {
            return Err(anyhow!(
                "retention.sweep_interval_seconds must be greater than 0"
            ));
        }
        if global.retention.resolved_max_age_days <= 0 || global.retention.entry_max_age_days <= 0 {
            return Err(anyhow!("retention ages must be greater than 0"));
        }

        Ok(())
    }
}
