//! 模式控制器

use crate::parking::{GuidanceSource, ParkState, ParkingStateMachine};
use crate::policy::{adjust_cruise, avoid_command, manual_command};
use crate::{ControlConfig, Mode, MotionCommand};
use parkpilot_protocol::{Button, SensorFrame};
use tracing::{debug, info};

/// 模式控制器
///
/// 持有运行模式、巡航速度与当前电机目标。按键事件通过 [`on_button`](Self::on_button) 输入，
/// 每个控制周期调用一次 [`step`](Self::step) 得到新的目标。
///
/// 手动模式的目标在周期之间保持不变（只有按键会改变它），空闲模式每周期强制清零。
#[derive(Debug, Clone)]
pub struct Controller {
    config: ControlConfig,
    mode: Mode,
    cruise_speed: i16,
    target: MotionCommand,
    parking: ParkingStateMachine,
}

impl Controller {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            cruise_speed: config.cruise_speed,
            config,
            mode: Mode::Idle,
            target: MotionCommand::STOP,
            parking: ParkingStateMachine::new(),
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cruise_speed(&self) -> i16 {
        self.cruise_speed
    }

    pub fn target(&self) -> MotionCommand {
        self.target
    }

    pub fn park_state(&self) -> ParkState {
        self.parking.state()
    }

    pub fn parking(&self) -> &ParkingStateMachine {
        &self.parking
    }

    /// 切换模式
    ///
    /// 进入泊车模式总是从 SearchGap 重新开始；回到空闲时清零目标。
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Park {
            self.parking.reset();
        }
        if mode == Mode::Idle {
            self.target = MotionCommand::STOP;
        }
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, "Mode transition");
            self.mode = mode;
        }
    }

    /// 处理一次遥控按键
    ///
    /// 1. Power：无条件回到空闲并清零目标
    /// 2. Manual / Park / 空闲时的 Forward：切换模式
    /// 3. 切换后若处于手动模式，再执行手动按键映射（含巡航速度调整）
    pub fn on_button(&mut self, button: Button) {
        debug!(?button, mode = ?self.mode, "Remote button");

        match button {
            Button::Power => {
                self.set_mode(Mode::Idle);
                return;
            },
            Button::Manual => self.set_mode(Mode::Manual),
            Button::Forward if self.mode == Mode::Idle => self.set_mode(Mode::Avoid),
            Button::Park => self.set_mode(Mode::Park),
            _ => {},
        }

        if self.mode != Mode::Manual {
            return;
        }

        match button {
            Button::SpeedUp | Button::SpeedDown => {
                let cruise = adjust_cruise(button, self.cruise_speed, &self.config);
                if cruise != self.cruise_speed {
                    debug!(from = self.cruise_speed, to = cruise, "Cruise speed changed");
                    self.cruise_speed = cruise;
                }
            },
            _ => self.target = manual_command(button, self.target, self.cruise_speed),
        }
    }

    /// 一个控制周期
    ///
    /// 泊车完成时本周期输出停车，并切回空闲模式。
    pub fn step<G: GuidanceSource + ?Sized>(
        &mut self,
        frame: &SensorFrame,
        guidance: &mut G,
    ) -> MotionCommand {
        match self.mode {
            Mode::Idle => self.target = MotionCommand::STOP,
            Mode::Manual => {},
            Mode::Avoid => self.target = avoid_command(frame, self.cruise_speed, &self.config),
            Mode::Park => {
                let step = self.parking.tick(frame, self.target, guidance, &self.config);
                self.target = step.command;
                if step.finished {
                    info!("Parking maneuver complete");
                    self.set_mode(Mode::Idle);
                }
            },
        }
        self.target
    }

    /// 碰撞覆盖：清零当前目标（模式不变）
    pub fn halt(&mut self) -> MotionCommand {
        self.target = MotionCommand::STOP;
        self.target
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControlConfig::default())
    }
}
