//! 自动泊车状态机
//!
//! 六个阶段按控制周期推进，每个阶段用一个计数器计时（进入新阶段时清零）：
//!
//! ```text
//! SearchGap ──右侧空位──▶ RequestCloud ──立即──▶ WaitGuidance ──引导就绪/超时──▶ Exec1
//!                                                                               │
//!                     Done ◀──计数>10── Exec3 ◀──计数>14── Exec2 ◀──计数>10─────┘
//! ```
//!
//! 云端交互通过 [`GuidanceSource`] 注入，状态机本身不做任何 IO。

use crate::{ControlConfig, MotionCommand};
use parkpilot_protocol::SensorFrame;
use tracing::{debug, info};

/// 搜索车位时的前进速度
pub const SEARCH_SPEED: i16 = 20;

/// 各执行阶段的固定动作与持续周期数（计数器超过该值后切换）
pub const EXEC1: (MotionCommand, u32) = (MotionCommand { speed: 20, steer: 35 }, 10);
pub const EXEC2: (MotionCommand, u32) = (MotionCommand { speed: -20, steer: -45 }, 14);
pub const EXEC3: (MotionCommand, u32) = (MotionCommand { speed: -15, steer: 0 }, 10);

/// 泊车阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParkState {
    /// 低速前进，等待右侧出现空位
    #[default]
    SearchGap,
    /// 发送泊车请求（只停留一个周期）
    RequestCloud,
    /// 停车等待云端引导
    WaitGuidance,
    /// 前拉
    Exec1,
    /// 倒车切入
    Exec2,
    /// 回正
    Exec3,
    /// 完成，回到空闲模式
    Done,
}

impl ParkState {
    pub fn label(self) -> &'static str {
        match self {
            ParkState::SearchGap => "SEARCH",
            ParkState::RequestCloud => "REQUEST",
            ParkState::WaitGuidance => "WAIT",
            ParkState::Exec1 => "EXEC1",
            ParkState::Exec2 => "EXEC2",
            ParkState::Exec3 => "EXEC3",
            ParkState::Done => "DONE",
        }
    }
}

/// 云端泊车引导
///
/// 所有调用都是尽力而为：失败由实现方记录日志，状态机只关心 `poll_guidance` 的布尔结果，
/// 等待阶段的超时保证了云端不可用时仍能继续。
pub trait GuidanceSource {
    /// 新一轮泊车开始：清空引导缓存
    fn begin_attempt(&mut self);

    /// 通知云端请求泊车
    fn request_parking(&mut self);

    /// 查询引导是否就绪
    fn poll_guidance(&mut self) -> bool;
}

impl<T: GuidanceSource + ?Sized> GuidanceSource for &mut T {
    fn begin_attempt(&mut self) {
        (**self).begin_attempt()
    }

    fn request_parking(&mut self) {
        (**self).request_parking()
    }

    fn poll_guidance(&mut self) -> bool {
        (**self).poll_guidance()
    }
}

/// 未配置云端时视为没有引导
impl<T: GuidanceSource> GuidanceSource for Option<T> {
    fn begin_attempt(&mut self) {
        if let Some(inner) = self {
            inner.begin_attempt();
        }
    }

    fn request_parking(&mut self) {
        if let Some(inner) = self {
            inner.request_parking();
        }
    }

    fn poll_guidance(&mut self) -> bool {
        self.as_mut().is_some_and(|inner| inner.poll_guidance())
    }
}

/// 离线模式：从不提供引导，等待阶段总是走超时路径
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGuidance;

impl GuidanceSource for NoGuidance {
    fn begin_attempt(&mut self) {}

    fn request_parking(&mut self) {}

    fn poll_guidance(&mut self) -> bool {
        false
    }
}

/// 单个周期的输出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkStep {
    pub command: MotionCommand,
    /// 泊车完成，调用方应切回空闲模式
    pub finished: bool,
}

/// 泊车状态机
#[derive(Debug, Clone, Default)]
pub struct ParkingStateMachine {
    state: ParkState,
    counter: u32,
}

impl ParkingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParkState {
        self.state
    }

    /// 当前阶段已经历的周期数
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// 回到 SearchGap（进入泊车模式时调用）
    pub fn reset(&mut self) {
        self.state = ParkState::SearchGap;
        self.counter = 0;
    }

    fn enter(&mut self, next: ParkState) {
        info!(from = ?self.state, to = ?next, "Park state transition");
        self.state = next;
        self.counter = 0;
    }

    /// 推进一个周期
    ///
    /// `previous` 为上一周期的目标，RequestCloud / WaitGuidance 只把速度置零，保留转向。
    pub fn tick<G: GuidanceSource + ?Sized>(
        &mut self,
        frame: &SensorFrame,
        previous: MotionCommand,
        guidance: &mut G,
        config: &ControlConfig,
    ) -> ParkStep {
        self.counter = self.counter.saturating_add(1);

        let command = match self.state {
            ParkState::SearchGap => {
                if frame.right > config.gap_open_cm {
                    debug!(right = frame.right, "Parking gap found");
                    // 计数器在 RequestCloud 中清零
                    info!(from = ?self.state, to = ?ParkState::RequestCloud, "Park state transition");
                    self.state = ParkState::RequestCloud;
                }
                MotionCommand::new(SEARCH_SPEED, 0)
            },
            ParkState::RequestCloud => {
                guidance.begin_attempt();
                guidance.request_parking();
                self.enter(ParkState::WaitGuidance);
                previous.with_speed(0)
            },
            ParkState::WaitGuidance => {
                // 先查询再判断超时：超时的那个周期也会发出一次查询
                let ready = guidance.poll_guidance();
                let timed_out = self.counter > config.guidance_timeout_ticks;
                if ready || timed_out {
                    debug!(ready, timed_out, ticks = self.counter, "Guidance wait finished");
                    self.enter(ParkState::Exec1);
                }
                previous.with_speed(0)
            },
            ParkState::Exec1 => self.exec(EXEC1, ParkState::Exec2),
            ParkState::Exec2 => self.exec(EXEC2, ParkState::Exec3),
            ParkState::Exec3 => self.exec(EXEC3, ParkState::Done),
            ParkState::Done => {
                return ParkStep {
                    command: MotionCommand::STOP,
                    finished: true,
                };
            },
        };

        ParkStep {
            command,
            finished: false,
        }
    }

    fn exec(&mut self, (command, ticks): (MotionCommand, u32), next: ParkState) -> MotionCommand {
        if self.counter > ticks {
            self.enter(next);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ScriptedGuidance {
        ready_after: Option<u32>,
        polls: u32,
        requests: u32,
        attempts: u32,
    }

    impl GuidanceSource for ScriptedGuidance {
        fn begin_attempt(&mut self) {
            self.attempts += 1;
        }

        fn request_parking(&mut self) {
            self.requests += 1;
        }

        fn poll_guidance(&mut self) -> bool {
            self.polls += 1;
            self.ready_after.is_some_and(|n| self.polls >= n)
        }
    }

    fn clear_right() -> SensorFrame {
        SensorFrame::new(100, 80, 30, 100)
    }

    fn blocked_right() -> SensorFrame {
        SensorFrame::new(100, 20, 30, 100)
    }

    #[test]
    fn test_search_gap_until_right_opens() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();

        for _ in 0..5 {
            let step = sm.tick(&blocked_right(), MotionCommand::STOP, &mut NoGuidance, &config);
            assert_eq!(step.command, MotionCommand::new(20, 0));
            assert_eq!(sm.state(), ParkState::SearchGap);
        }

        // 恰好等于阈值不算空位
        let edge = SensorFrame::new(100, 70, 30, 100);
        sm.tick(&edge, MotionCommand::STOP, &mut NoGuidance, &config);
        assert_eq!(sm.state(), ParkState::SearchGap);

        sm.tick(&clear_right(), MotionCommand::STOP, &mut NoGuidance, &config);
        assert_eq!(sm.state(), ParkState::RequestCloud);
    }

    #[test]
    fn test_request_cloud_starts_new_attempt() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        let mut guidance = ScriptedGuidance::default();

        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        let step = sm.tick(&clear_right(), MotionCommand::new(20, 0), &mut guidance, &config);

        assert_eq!(step.command.speed, 0);
        assert_eq!(sm.state(), ParkState::WaitGuidance);
        assert_eq!(sm.counter(), 0);
        assert_eq!(guidance.attempts, 1);
        assert_eq!(guidance.requests, 1);
        assert_eq!(guidance.polls, 0);
    }

    #[test]
    fn test_wait_guidance_times_out() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        let mut guidance = ScriptedGuidance::default();
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);

        for _ in 0..20 {
            let step = sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
            assert_eq!(step.command.speed, 0);
            assert_eq!(sm.state(), ParkState::WaitGuidance);
        }

        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        assert_eq!(sm.state(), ParkState::Exec1);
        assert_eq!(guidance.polls, 21);
    }

    #[test]
    fn test_guidance_ready_skips_wait() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        let mut guidance = ScriptedGuidance {
            ready_after: Some(3),
            ..Default::default()
        };
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);

        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        assert_eq!(sm.state(), ParkState::WaitGuidance);
        sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        assert_eq!(sm.state(), ParkState::Exec1);
    }

    #[test]
    fn test_full_maneuver_sequence() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        let mut guidance = ScriptedGuidance {
            ready_after: Some(1),
            ..Default::default()
        };
        // SearchGap -> RequestCloud -> WaitGuidance -> Exec1
        for _ in 0..3 {
            sm.tick(&clear_right(), MotionCommand::STOP, &mut guidance, &config);
        }
        assert_eq!(sm.state(), ParkState::Exec1);

        let mut trace = Vec::new();
        let mut previous = MotionCommand::STOP;
        loop {
            let step = sm.tick(&clear_right(), previous, &mut guidance, &config);
            previous = step.command;
            if step.finished {
                break;
            }
            trace.push(step.command);
            assert!(trace.len() < 100, "maneuver never finished");
        }

        // 每个执行阶段持续 N+1 个周期
        let count = |cmd: MotionCommand| trace.iter().filter(|c| **c == cmd).count();
        assert_eq!(count(EXEC1.0), 11);
        assert_eq!(count(EXEC2.0), 15);
        assert_eq!(count(EXEC3.0), 11);
        assert_eq!(sm.state(), ParkState::Done);
        assert_eq!(previous, MotionCommand::STOP);
    }

    #[test]
    fn test_optional_source() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        let mut none: Option<ScriptedGuidance> = None;
        sm.tick(&clear_right(), MotionCommand::STOP, &mut none, &config);
        sm.tick(&clear_right(), MotionCommand::STOP, &mut none, &config);
        assert_eq!(sm.state(), ParkState::WaitGuidance);
        assert!(!none.poll_guidance());

        let mut some = Some(ScriptedGuidance {
            ready_after: Some(1),
            ..Default::default()
        });
        assert!(some.poll_guidance());
    }

    #[test]
    fn test_reset() {
        let config = ControlConfig::default();
        let mut sm = ParkingStateMachine::new();
        sm.tick(&clear_right(), MotionCommand::STOP, &mut NoGuidance, &config);
        sm.reset();
        assert_eq!(sm.state(), ParkState::SearchGap);
        assert_eq!(sm.counter(), 0);
    }
}
