//! # ParkPilot CLI
//!
//! 小车控制核心的命令行工具。
//!
//! ```bash
//! # 生成默认配置
//! parkpilot-cli config init
//!
//! # 从串口读取传感器行，电机命令写回串口
//! parkpilot-cli run --sensor /dev/ttyS1 --motor /dev/ttyS2
//!
//! # 离线自检
//! parkpilot-cli self-test
//!
//! # 查看按键码
//! parkpilot-cli decode 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, DecodeCommand, RunCommand, SelfTestCommand};

/// ParkPilot CLI - 泊车小车命令行工具
#[derive(Parser, Debug)]
#[command(name = "parkpilot-cli")]
#[command(about = "Command-line interface for the ParkPilot vehicle control core", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认：<config_dir>/parkpilot/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行控制主循环
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 离线自检脚本
    SelfTest {
        #[command(flatten)]
        args: SelfTestCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 红外按键码编码/解码
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },
}

fn main() -> Result<()> {
    parkpilot_sdk::init_logger();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => commands::config::default_config_file()?,
    };

    match cli.command {
        Commands::Run { args } => args.execute(&config_path),
        Commands::SelfTest { args } => args.execute(&config_path),
        Commands::Config(cmd) => cmd.execute(&config_path),
        Commands::Decode { args } => args.execute(),
    }
}
