//! 运行控制主循环
//!
//! 传感器行从文件（或 stdin）读取，电机命令写到文件（或 stdout）。
//! 按键可以从按键文件注入，每行一个键位编号。

use super::config::load_or_default;
use anyhow::{Context, Result};
use clap::Args;
use parkpilot_sdk::driver::{
    IrReceiver, SensorUart, SnapshotReader, TextDisplay, VehicleBuilder, tls_shadow_client,
};
use parkpilot_sdk::protocol::{Button, encode_pulse_train};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 传感器输入（默认 stdin）
    #[arg(short, long)]
    pub sensor: Option<PathBuf>,

    /// 电机输出（默认 stdout）
    #[arg(short, long)]
    pub motor: Option<PathBuf>,

    /// 状态屏文本输出（每次刷新一行）
    #[arg(long)]
    pub screen: Option<PathBuf>,

    /// 按键文件（每行一个键位编号）
    #[arg(short, long)]
    pub keys: Option<PathBuf>,

    /// 按键之间的间隔（毫秒）
    #[arg(long, default_value_t = 500)]
    pub key_interval_ms: u64,

    /// 运行时长（秒），不指定则直到 Ctrl-C
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// 忽略配置中的云端设置
    #[arg(long)]
    pub offline: bool,

    /// 周期性打印状态快照（毫秒）
    #[arg(long)]
    pub monitor_ms: Option<u64>,
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read + Send>> {
    Ok(match path {
        Some(p) => Box::new(File::open(p).with_context(|| format!("打开传感器输入失败: {}", p.display()))?),
        None => Box::new(io::stdin()),
    })
}

fn spawn_sensor_reader(mut input: Box<dyn Read + Send>, mut uart: SensorUart) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 256];
        loop {
            match input.read(&mut buf) {
                Ok(0) => {
                    info!("Sensor input reached EOF");
                    break;
                },
                Ok(n) => uart.feed(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => {
                    warn!(error = %e, "Sensor input read failed");
                    break;
                },
            }
        }
    })
}

fn spawn_key_reader(
    path: &Path,
    mut ir: IrReceiver,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    let file = File::open(path).with_context(|| format!("打开按键文件失败: {}", path.display()))?;
    Ok(thread::spawn(move || {
        for line in BufReader::new(file).lines() {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse().ok().and_then(Button::from_key_number) {
                Some(button) => {
                    info!(?button, "Injecting key");
                    ir.feed(&encode_pulse_train(button.code()));
                },
                None => warn!(key = line, "Unknown key number"),
            }
            thread::sleep(interval);
        }
    }))
}

fn spawn_monitor(reader: SnapshotReader, interval: Duration, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            let s = reader.load();
            eprintln!(
                "[{:>7}] {:<6} {:<12} cmd=({:+4},{:+3}) F{:03} R{:03} L{:03} B{:03}{}",
                s.cycle,
                s.mode.label(),
                s.park_state.label(),
                s.command.speed,
                s.command.steer,
                s.frame.front,
                s.frame.right,
                s.frame.left,
                s.frame.rear,
                if s.collision { " COLLISION" } else { "" }
            );
            thread::sleep(interval);
        }
    })
}

impl RunCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_or_default(config_path)?;
        let use_cloud = config.cloud.enabled && !self.offline;

        let mut builder = VehicleBuilder::new(config.clone());
        if let Some(path) = &self.motor {
            let file = File::create(path).with_context(|| format!("打开电机输出失败: {}", path.display()))?;
            builder = builder.motor(file);
        }
        if let Some(path) = &self.screen {
            let file = File::create(path).with_context(|| format!("打开状态屏输出失败: {}", path.display()))?;
            builder = builder.display(TextDisplay::new(file));
        }
        if use_cloud {
            let client = tls_shadow_client(&config.cloud).context("初始化云端连接失败")?;
            builder = builder.cloud(client);
        }
        let (mut vehicle, producers) = builder.build().context("创建车辆失败")?;

        let running = Arc::new(AtomicBool::new(true));
        {
            let running = Arc::clone(&running);
            ctrlc::set_handler(move || {
                running.store(false, Ordering::SeqCst);
            })
            .context("设置 Ctrl-C 处理失败")?;
        }

        if let Some(secs) = self.duration {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                thread::sleep(Duration::from_secs(secs));
                running.store(false, Ordering::SeqCst);
            });
        }

        spawn_sensor_reader(open_input(self.sensor.as_deref())?, producers.uart);
        if let Some(path) = &self.keys {
            spawn_key_reader(
                path,
                producers.ir,
                Duration::from_millis(self.key_interval_ms),
                Arc::clone(&running),
            )?;
        }
        if let Some(ms) = self.monitor_ms {
            spawn_monitor(
                vehicle.snapshot_reader(),
                Duration::from_millis(ms),
                Arc::clone(&running),
            );
        }

        vehicle.run(&running)?;

        let m = vehicle.metrics().snapshot();
        info!(
            cycles = m.cycles,
            lines = m.uart_lines,
            parse_rate = m.parse_success_rate(),
            reports_ok = m.reports_ok,
            reports_failed = m.reports_failed,
            "Run finished"
        );
        Ok(())
    }
}
