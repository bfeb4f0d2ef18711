//! 运行模式与运动命令

/// 速度上限（百分比）
pub const MAX_SPEED: i16 = 100;

/// 转向角上限（度）
pub const MAX_STEER: i16 = 45;

/// 运行模式
///
/// 判别值即上报到云端影子文档的 `mode` 字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Mode {
    /// 空闲（安全状态）：目标速度与转向恒为 0
    #[default]
    Idle = 0,
    /// 手动：遥控按键直接映射为速度/转向
    Manual = 1,
    /// 避障：根据前方与两侧距离自动行驶
    Avoid = 2,
    /// 自动泊车
    Park = 3,
}

impl Mode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 显示屏标签
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Manual => "MANUAL",
            Mode::Avoid => "AVOID",
            Mode::Park => "PARK",
        }
    }
}

/// 电机目标（每周期重新计算，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionCommand {
    /// 带符号速度百分比，正为前进
    pub speed: i16,
    /// 转向角（度），负为左
    pub steer: i16,
}

impl MotionCommand {
    pub const STOP: MotionCommand = MotionCommand { speed: 0, steer: 0 };

    /// 构造并限幅到 ±100 / ±45
    pub fn new(speed: i16, steer: i16) -> Self {
        Self {
            speed: speed.clamp(-MAX_SPEED, MAX_SPEED),
            steer: steer.clamp(-MAX_STEER, MAX_STEER),
        }
    }

    pub fn with_speed(self, speed: i16) -> Self {
        Self::new(speed, self.steer)
    }

    pub fn with_steer(self, steer: i16) -> Self {
        Self::new(self.speed, steer)
    }

    pub fn is_stopped(&self) -> bool {
        *self == Self::STOP
    }
}
