//! CLI 配置文件（TOML）
//!
//! 配置由外部提供，协议引擎本身不持久化任何状态。命令行参数
//! 覆盖文件值，文件缺失时使用默认值。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 移动参数与端口设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 串口路径（如 `/dev/ttyUSB0`、`COM2`）
    pub port: String,
    /// 电机速度（rpm）
    pub speed_rpm: u16,
    /// 加速时间（ms）
    pub acc_time_ms: u32,
    /// 到位轮询的最大次数
    pub timeout_polls: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            speed_rpm: 500,
            acc_time_ms: 5000,
            timeout_polls: 50,
        }
    }
}

/// 默认配置文件路径：`<config_dir>/mrje/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mrje")
        .join("config.toml")
}

/// 读取配置；文件不存在时返回默认值
pub fn load(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = load(Path::new("/nonexistent/mrje-config.toml")).unwrap();
        assert_eq!(settings.speed_rpm, 500);
        assert_eq!(settings.timeout_polls, 50);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"COM2\"\nspeed_rpm = 1500\n").unwrap();

        let settings = load(&path).unwrap();
        assert_eq!(settings.port, "COM2");
        assert_eq!(settings.speed_rpm, 1500);
        // 未给出的字段取默认
        assert_eq!(settings.acc_time_ms, 5000);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let settings = Settings::default();
        let text = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.port, settings.port);
        assert_eq!(parsed.acc_time_ms, settings.acc_time_ms);
    }
}
