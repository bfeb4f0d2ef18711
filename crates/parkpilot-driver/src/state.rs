//! 车辆状态快照
//!
//! 主循环每个周期结束时通过 `ArcSwap` 发布一份不可变快照，
//! 显示、上报和外部观察者都只读快照，不与主循环竞争。

use arc_swap::ArcSwap;
use parkpilot_client::ShadowReport;
use parkpilot_control::{Mode, MotionCommand, ParkState};
use parkpilot_protocol::SensorFrame;
use std::sync::Arc;

/// 一个控制周期结束时的车辆状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleSnapshot {
    /// 周期序号（从 0 开始）
    pub cycle: u64,
    pub mode: Mode,
    pub park_state: ParkState,
    pub cruise_speed: i16,
    /// 本周期实际发出的电机目标（已包含碰撞覆盖）
    pub command: MotionCommand,
    pub frame: SensorFrame,
    /// 最近一次碰撞检测的结果
    pub collision: bool,
}

impl VehicleSnapshot {
    /// 转换为云端上报内容
    pub fn report(&self) -> ShadowReport {
        ShadowReport {
            mode: self.mode.as_u8(),
            speed: self.cruise_speed,
            front: self.frame.front,
            right: self.frame.right,
            left: self.frame.left,
            rear: self.frame.rear,
            collision: self.collision,
        }
    }
}

/// 快照读取句柄（可克隆，可跨线程）
#[derive(Clone)]
pub struct SnapshotReader {
    inner: Arc<ArcSwap<VehicleSnapshot>>,
}

impl SnapshotReader {
    pub(crate) fn new(inner: Arc<ArcSwap<VehicleSnapshot>>) -> Self {
        Self { inner }
    }

    /// 最新快照（无锁读取）
    pub fn load(&self) -> VehicleSnapshot {
        **self.inner.load()
    }
}
