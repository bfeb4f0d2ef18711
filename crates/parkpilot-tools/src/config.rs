//! # 车辆配置
//!
//! 控制阈值、调度周期和云端连接参数，全部可以从 TOML 文件覆盖。
//! 缺省字段取默认值，因此空文件也是合法配置。
//!
//! ```toml
//! [control]
//! cruise_speed = 40
//!
//! [schedule]
//! cycle_period_ms = 5
//!
//! [cloud]
//! enabled = true
//! host = "example-ats.iot.us-east-2.amazonaws.com"
//! thing_name = "parkpilot"
//! ca_file = "/etc/parkpilot/ca.pem"
//! ```

use parkpilot_control::ControlConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// 车辆配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub control: ControlSettings,
    pub schedule: ScheduleSettings,
    pub cloud: CloudSettings,
}

/// 控制参数（距离单位厘米）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub cruise_speed: i16,
    pub cruise_min: i16,
    pub cruise_max: i16,
    pub cruise_step: i16,
    pub near_cm: i32,
    pub medium_cm: i32,
    pub far_cm: i32,
    /// 加速度模长平方阈值
    pub collision_threshold: i32,
    pub gap_open_cm: i32,
    pub guidance_timeout_ticks: u32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        let c = ControlConfig::default();
        Self {
            cruise_speed: c.cruise_speed,
            cruise_min: c.cruise_min,
            cruise_max: c.cruise_max,
            cruise_step: c.cruise_step,
            near_cm: c.near_cm,
            medium_cm: c.medium_cm,
            far_cm: c.far_cm,
            collision_threshold: c.collision_threshold,
            gap_open_cm: c.gap_open_cm,
            guidance_timeout_ticks: c.guidance_timeout_ticks,
        }
    }
}

/// 主循环调度（单位：控制周期）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// 控制周期（毫秒）
    pub cycle_period_ms: u64,
    pub motor_every: u32,
    pub collision_every: u32,
    pub display_every: u32,
    pub report_every: u32,
    pub stats_every: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            cycle_period_ms: 5,
            motor_every: 2,
            collision_every: 5,
            display_every: 8,
            report_every: 16,
            stats_every: 32,
        }
    }
}

impl ScheduleSettings {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }
}

/// 云端连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub thing_name: String,
    /// 影子文档中引导 URL 的字段名
    pub guidance_key: String,
    /// 影子文档中表示引导已就绪的标记
    pub guidance_marker: String,
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub receive_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: 8443,
            thing_name: "parkpilot".to_string(),
            guidance_key: "park_guidance_url".to_string(),
            guidance_marker: "park_guidance".to_string(),
            ca_file: None,
            cert_file: None,
            key_file: None,
            receive_timeout_ms: 2000,
            fetch_timeout_ms: 2000,
        }
    }
}

impl CloudSettings {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl VehicleConfig {
    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: VehicleConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存为 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验
    ///
    /// - 调度间隔不能为 0
    /// - 巡航速度范围有序，且初始巡航速度在范围内
    /// - 距离阈值递增
    /// - 启用云端时必须配置主机名和根证书
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.schedule;
        let intervals = [
            ("cycle_period_ms", s.cycle_period_ms),
            ("motor_every", s.motor_every as u64),
            ("collision_every", s.collision_every as u64),
            ("display_every", s.display_every as u64),
            ("report_every", s.report_every as u64),
            ("stats_every", s.stats_every as u64),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("schedule.{} must be > 0", name)));
        }

        let c = &self.control;
        if c.cruise_min > c.cruise_max {
            return Err(ConfigError::Invalid(format!(
                "control.cruise_min ({}) > control.cruise_max ({})",
                c.cruise_min, c.cruise_max
            )));
        }
        if !(c.cruise_min..=c.cruise_max).contains(&c.cruise_speed) {
            return Err(ConfigError::Invalid(format!(
                "control.cruise_speed ({}) outside [{}, {}]",
                c.cruise_speed, c.cruise_min, c.cruise_max
            )));
        }
        if c.cruise_max > 100 || c.cruise_step <= 0 {
            return Err(ConfigError::Invalid(
                "control.cruise_max must be <= 100 and cruise_step > 0".to_string(),
            ));
        }
        if !(0 < c.near_cm && c.near_cm <= c.medium_cm && c.medium_cm <= c.far_cm) {
            return Err(ConfigError::Invalid(format!(
                "distance thresholds must satisfy 0 < near ({}) <= medium ({}) <= far ({})",
                c.near_cm, c.medium_cm, c.far_cm
            )));
        }

        if self.cloud.enabled {
            if self.cloud.host.is_empty() {
                return Err(ConfigError::Invalid("cloud.host is required".to_string()));
            }
            if self.cloud.ca_file.is_none() {
                return Err(ConfigError::Invalid("cloud.ca_file is required".to_string()));
            }
        }

        Ok(())
    }

    /// 转换为控制层参数
    pub fn control_config(&self) -> ControlConfig {
        let c = &self.control;
        ControlConfig {
            cruise_speed: c.cruise_speed,
            cruise_min: c.cruise_min,
            cruise_max: c.cruise_max,
            cruise_step: c.cruise_step,
            near_cm: c.near_cm,
            medium_cm: c.medium_cm,
            far_cm: c.far_cm,
            gap_open_cm: c.gap_open_cm,
            guidance_timeout_ticks: c.guidance_timeout_ticks,
            collision_threshold: c.collision_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = VehicleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.control_config(), ControlConfig::default());
        assert_eq!(config.schedule.cycle_period(), Duration::from_millis(5));
        assert!(!config.cloud.enabled);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control]\ncruise_speed = 60\n\n[schedule]\nreport_every = 32").unwrap();

        let config = VehicleConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.control.cruise_speed, 60);
        assert_eq!(config.control.near_cm, 25);
        assert_eq!(config.schedule.report_every, 32);
        assert_eq!(config.schedule.motor_every, 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = VehicleConfig::default();
        config.cloud.enabled = true;
        config.cloud.host = "iot.example.com".to_string();
        config.cloud.ca_file = Some(PathBuf::from("/etc/parkpilot/ca.pem"));
        config.save_to_file(&path).unwrap();

        assert_eq!(VehicleConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = VehicleConfig::default();
        config.schedule.motor_every = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("motor_every"));

        let mut config = VehicleConfig::default();
        config.control.cruise_min = 90;
        config.control.cruise_max = 20;
        assert!(config.validate().is_err());

        let mut config = VehicleConfig::default();
        config.control.near_cm = 60;
        assert!(config.validate().is_err());

        let mut config = VehicleConfig::default();
        config.cloud.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cloud.host"));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control]\ncruise_speed = \"fast\"").unwrap();
        assert!(matches!(
            VehicleConfig::load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
