//! 配置管理命令
//!
//! 配置文件为 TOML，默认位于 `<config_dir>/parkpilot/config.toml`。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use parkpilot_sdk::VehicleConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("parkpilot");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置（文件不存在时使用默认值）
pub fn load_or_default(path: &Path) -> Result<VehicleConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(VehicleConfig::default());
    }
    VehicleConfig::load_from_file(path)
        .with_context(|| format!("加载配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印当前生效的配置
    Show,

    /// 写入默认配置
    Init {
        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(path),
            ConfigCommand::Init { force } => Self::init_(path, force),
            ConfigCommand::Check => Self::check_(path),
        }
    }

    fn show_(path: &Path) -> Result<()> {
        let config = load_or_default(path)?;
        println!("# {}", path.display());
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }
        VehicleConfig::default()
            .save_to_file(path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        let config = load_or_default(path)?;
        config.validate().context("配置无效")?;

        println!("配置文件: {}", path.display());
        println!(
            "  巡航速度: {} [{}, {}] 步长 {}",
            config.control.cruise_speed,
            config.control.cruise_min,
            config.control.cruise_max,
            config.control.cruise_step
        );
        println!(
            "  距离阈值: near {}cm / medium {}cm / far {}cm",
            config.control.near_cm, config.control.medium_cm, config.control.far_cm
        );
        println!("  控制周期: {}ms", config.schedule.cycle_period_ms);
        if config.cloud.enabled {
            println!(
                "  云端: {}:{} ({})",
                config.cloud.host, config.cloud.port, config.cloud.thing_name
            );
        } else {
            println!("  云端: 未启用");
        }
        println!("✅ 配置有效");
        Ok(())
    }
}
