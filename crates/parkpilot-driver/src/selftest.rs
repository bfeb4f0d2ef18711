//! 离线自检脚本
//!
//! 按固定周期注入传感器帧、按键和碰撞，走一遍全部模式：
//!
//! | 周期 | 动作 |
//! |------|------|
//! | 每 20 | 轮流注入 5 帧传感器数据 |
//! | 10 | Manual |
//! | 30 | Forward |
//! | 70 | Stop |
//! | 100 | Power（回到空闲） |
//! | 130 | Forward（进入避障） |
//! | 210 | Park |
//! | 280 | 强制碰撞 |
//! | 320 | 恢复读取加速度计 |
//! | 380 | Power |
//!
//! 不需要网络：未接云端时泊车等待阶段按超时继续。

use crate::builder::Producers;
use crate::error::DriverError;
use crate::metrics::MetricsSnapshot;
use crate::state::VehicleSnapshot;
use crate::vehicle::Vehicle;
use parkpilot_control::Mode;
use parkpilot_protocol::{Button, encode_pulse_train};
use std::time::{Duration, Instant};
use tracing::info;

/// 自检默认运行周期数
pub const SELF_TEST_CYCLES: u64 = 400;

/// 传感器帧注入间隔
pub const FRAME_INTERVAL: u64 = 20;

/// 心跳日志间隔
const HEARTBEAT_INTERVAL: u64 = 100;

/// 轮流注入的传感器帧（第 4 帧右侧 85cm，用于触发泊车）
pub const SELF_TEST_FRAMES: [&str; 5] = [
    "$S,090,040,045,080\n",
    "$S,045,028,055,070\n",
    "$S,020,015,030,060\n",
    "$S,075,085,050,055\n",
    "$S,060,030,080,040\n",
];

/// 脚本动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptAction {
    SensorLine(&'static str),
    Press(Button),
    /// `true` 强制碰撞，`false` 恢复读取加速度计
    ForceCollision(bool),
}

/// 自检时间表
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfTestScript;

impl SelfTestScript {
    /// 某个周期开始前要执行的动作（按执行顺序）
    pub fn actions(&self, cycle: u64) -> Vec<ScriptAction> {
        let mut actions = Vec::new();

        if cycle % FRAME_INTERVAL == 0 {
            let index = (cycle / FRAME_INTERVAL) as usize % SELF_TEST_FRAMES.len();
            actions.push(ScriptAction::SensorLine(SELF_TEST_FRAMES[index]));
        }

        match cycle {
            10 => actions.push(ScriptAction::Press(Button::Manual)),
            30 | 130 => actions.push(ScriptAction::Press(Button::Forward)),
            70 => actions.push(ScriptAction::Press(Button::Stop)),
            100 | 380 => actions.push(ScriptAction::Press(Button::Power)),
            210 => actions.push(ScriptAction::Press(Button::Park)),
            280 => actions.push(ScriptAction::ForceCollision(true)),
            320 => actions.push(ScriptAction::ForceCollision(false)),
            _ => {},
        }

        actions
    }

    /// 通过中断侧句柄注入一个动作
    pub fn apply(&self, action: ScriptAction, vehicle: &mut Vehicle, producers: &mut Producers) {
        match action {
            ScriptAction::SensorLine(line) => producers.uart.feed(line.as_bytes()),
            ScriptAction::Press(button) => producers.ir.feed(&encode_pulse_train(button.code())),
            ScriptAction::ForceCollision(true) => vehicle.set_collision_override(Some(true)),
            ScriptAction::ForceCollision(false) => vehicle.set_collision_override(None),
        }
    }
}

/// 自检结果
#[derive(Debug, Clone)]
pub struct SelfTestReport {
    pub cycles: u64,
    /// 模式切换记录：（周期, 新模式）
    pub transitions: Vec<(u64, Mode)>,
    pub final_snapshot: VehicleSnapshot,
    pub metrics: MetricsSnapshot,
}

impl SelfTestReport {
    pub fn final_mode(&self) -> Mode {
        self.final_snapshot.mode
    }

    /// 是否经历过某个模式
    pub fn visited(&self, mode: Mode) -> bool {
        self.transitions.iter().any(|(_, m)| *m == mode)
    }
}

/// 运行自检脚本
///
/// `period` 为 `None` 时不等待，直接连续执行（测试用）。
pub fn run_self_test(
    vehicle: &mut Vehicle,
    producers: &mut Producers,
    cycles: u64,
    period: Option<Duration>,
) -> Result<SelfTestReport, DriverError> {
    let script = SelfTestScript;
    let mut transitions = Vec::new();
    let mut mode = vehicle.controller().mode();
    let mut last = vehicle.snapshot_reader().load();

    info!(cycles, "Self-test started");

    for _ in 0..cycles {
        let start = Instant::now();
        let cycle = vehicle.cycle();

        for action in script.actions(cycle) {
            script.apply(action, vehicle, producers);
        }

        last = vehicle.tick()?;
        if last.mode != mode {
            transitions.push((cycle, last.mode));
            mode = last.mode;
        }

        if cycle % HEARTBEAT_INTERVAL == 0 {
            info!(
                cycle,
                mode = last.mode.label(),
                park = last.park_state.label(),
                speed = last.command.speed,
                steer = last.command.steer,
                "Self-test heartbeat"
            );
        }

        if let Some(remaining) = period.and_then(|p| p.checked_sub(start.elapsed())) {
            spin_sleep::sleep(remaining);
        }
    }

    let report = SelfTestReport {
        cycles,
        transitions,
        final_snapshot: last,
        metrics: vehicle.metrics().snapshot(),
    };
    info!(
        final_mode = report.final_mode().label(),
        transitions = report.transitions.len(),
        "Self-test finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::VehicleBuilder;
    use crate::link::MotorLog;
    use parkpilot_tools::VehicleConfig;

    #[test]
    fn test_script_actions() {
        let script = SelfTestScript;
        assert_eq!(
            script.actions(0),
            vec![ScriptAction::SensorLine(SELF_TEST_FRAMES[0])]
        );
        assert!(script.actions(1).is_empty());
        assert_eq!(
            script.actions(100),
            vec![
                ScriptAction::SensorLine(SELF_TEST_FRAMES[0]),
                ScriptAction::Press(Button::Power),
            ]
        );
        assert_eq!(
            script.actions(260),
            vec![ScriptAction::SensorLine(SELF_TEST_FRAMES[3])]
        );
        assert_eq!(
            script.actions(280),
            vec![
                ScriptAction::SensorLine(SELF_TEST_FRAMES[4]),
                ScriptAction::ForceCollision(true),
            ]
        );
    }

    #[test]
    fn test_full_self_test_run() {
        let log = MotorLog::new();
        let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
            .motor(log.clone())
            .build()
            .unwrap();

        let report = run_self_test(&mut vehicle, &mut producers, SELF_TEST_CYCLES, None).unwrap();

        assert_eq!(report.cycles, SELF_TEST_CYCLES);
        // 右侧 85cm 在周期 260 触发泊车；等待 21 周期后执行 11 + 15 + 11 周期
        assert_eq!(
            report.transitions,
            vec![
                (10, Mode::Manual),
                (100, Mode::Idle),
                (130, Mode::Avoid),
                (210, Mode::Park),
                (320, Mode::Idle),
            ]
        );
        assert_eq!(report.final_mode(), Mode::Idle);
        assert!(report.visited(Mode::Park));
        assert!(report.metrics.collisions > 0);
        assert_eq!(report.metrics.cycles, SELF_TEST_CYCLES);
        assert_eq!(report.metrics.parse_fail, 0);
        assert_eq!(report.metrics.ir_commands, 7);

        let lines = log.lines();
        assert!(lines.contains(&"$M,040,+00\n".to_string()));
        assert!(lines.contains(&"$M,-20,-45\n".to_string()));
    }
}
