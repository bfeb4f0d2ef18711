//! 红外按键码工具
//!
//! 把键位编号或 16 位按键码编码为下降沿间隔序列，再送入解码器验证。
//! 也可以直接解码一串抓取到的间隔（微秒）。

use anyhow::{Context, Result, bail};
use clap::Args;
use parkpilot_sdk::protocol::{Button, PulseDecoder, RemoteCommand, encode_pulse_train};

/// 解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// 键位编号（如 2）或按键码（如 0x8889）
    #[arg(conflicts_with = "gaps")]
    pub key: Option<String>,

    /// 直接解码的间隔序列（逗号分隔，单位微秒）
    #[arg(long, value_delimiter = ',')]
    pub gaps: Vec<u32>,

    /// 打印完整间隔序列
    #[arg(short, long)]
    pub verbose: bool,
}

/// 解析键位编号或十六进制按键码
fn parse_key(key: &str) -> Result<u16> {
    if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).with_context(|| format!("无效的按键码: {}", key));
    }
    let number: u8 = key.parse().with_context(|| format!("无效的键位编号: {}", key))?;
    Button::from_key_number(number)
        .map(Button::code)
        .ok_or_else(|| anyhow::anyhow!("键位 {} 没有对应的按键", number))
}

fn decode(gaps: &[u32]) -> Option<RemoteCommand> {
    let mut decoder = PulseDecoder::new();
    gaps.iter().find_map(|&gap| decoder.on_edge(gap))
}

fn describe(command: RemoteCommand) -> String {
    match command.button() {
        Some(button) => format!(
            "0x{:04X} -> {:?}（键位 {}）",
            command.key_code(),
            button,
            button.key_number()
        ),
        None => format!("0x{:04X} -> 未知按键", command.key_code()),
    }
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let gaps = match &self.key {
            Some(key) => encode_pulse_train(parse_key(key)?),
            None if !self.gaps.is_empty() => self.gaps.clone(),
            None => {
                for button in Button::ALL {
                    println!("{:>2}  0x{:04X}  {:?}", button.key_number(), button.code(), button);
                }
                return Ok(());
            },
        };

        if self.verbose {
            println!("间隔序列（{} 个）: {:?}", gaps.len(), gaps);
        }

        match decode(&gaps) {
            Some(command) => println!("{}", describe(command)),
            None => bail!("{} 个间隔未组成完整帧", gaps.len()),
        }
        Ok(())
    }
}
