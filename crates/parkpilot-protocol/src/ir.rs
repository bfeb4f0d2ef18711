//! 红外遥控解码
//!
//! 输入为相邻两个下降沿之间的间隔（微秒），由边沿中断计算后逐个送入 [`PulseDecoder`]。
//!
//! # 帧格式
//!
//! ```text
//! [引导间隔 > 3000µs] [32 个帧头/地址位（丢弃）] [16 个按键码位]
//! ```
//!
//! - 间隔 > 1200µs 记为 1，否则为 0
//! - 按键码按 MSB 在前的顺序左移累加
//! - 第 48 个边沿到达后置位 ready，之后的边沿全部忽略，直到调用方 `clear()`

use num_enum::TryFromPrimitive;
use tracing::trace;

/// 帧同步间隔阈值（微秒）：超过此值视为新帧开始
pub const RESYNC_GAP_US: u32 = 3000;

/// 逻辑 1 判定阈值（微秒）
pub const ONE_BIT_GAP_US: u32 = 1200;

/// 丢弃的帧头位数
pub const HEADER_BITS: u8 = 32;

/// 每帧总位数
pub const FRAME_BITS: u8 = 48;

/// 解码完成的遥控命令（48 位累加值）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCommand {
    code: u64,
}

impl RemoteCommand {
    pub fn new(code: u64) -> Self {
        Self { code }
    }

    /// 原始累加值
    pub fn code(&self) -> u64 {
        self.code
    }

    /// 低 16 位按键码
    pub fn key_code(&self) -> u16 {
        (self.code & 0xFFFF) as u16
    }

    /// 查表得到按键，未知码返回 `None`
    pub fn button(&self) -> Option<Button> {
        code_to_button(self.code)
    }
}

/// 遥控器按键
///
/// 判别值即遥控器发送的 16 位按键码。
/// 注释中的数字为遥控器面板上的键位编号（见 [`Button::key_number`]）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Button {
    /// 1：进入手动模式
    Manual = 0x0809,
    /// 2：手动模式下前进；空闲时进入避障模式
    Forward = 0x8889,
    /// 3：进入泊车模式
    Park = 0x4849,
    /// 4：左转
    Left = 0xC8C9,
    /// 5：停车
    Stop = 0x2829,
    /// 6：右转
    Right = 0xA8A9,
    /// 8：倒车
    Reverse = 0xE8E9,
    /// 10（静音键）：强制回到空闲
    Power = 0x4C4D,
    /// 12：巡航速度 +5
    SpeedUp = 0x2C2D,
    /// 13：巡航速度 -5
    SpeedDown = 0xACAD,
}

impl Button {
    /// 全部按键（按键位编号排序）
    pub const ALL: [Button; 10] = [
        Button::Manual,
        Button::Forward,
        Button::Park,
        Button::Left,
        Button::Stop,
        Button::Right,
        Button::Reverse,
        Button::Power,
        Button::SpeedUp,
        Button::SpeedDown,
    ];

    /// 遥控器面板键位编号
    pub fn key_number(self) -> u8 {
        match self {
            Button::Manual => 1,
            Button::Forward => 2,
            Button::Park => 3,
            Button::Left => 4,
            Button::Stop => 5,
            Button::Right => 6,
            Button::Reverse => 8,
            Button::Power => 10,
            Button::SpeedUp => 12,
            Button::SpeedDown => 13,
        }
    }

    /// 从键位编号查找按键
    pub fn from_key_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.key_number() == number)
    }

    /// 16 位按键码
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// 按键码查表
///
/// 只比较累加值的低 16 位；表外的码返回 `None`（红外噪声属于正常现象，不报错）。
pub fn code_to_button(code: u64) -> Option<Button> {
    Button::try_from((code & 0xFFFF) as u16).ok()
}

/// 下降沿间隔解码器
///
/// 运行在边沿中断上下文中，只写自身字段；主循环消费命令后调用 `clear()`。
#[derive(Debug, Default, Clone)]
pub struct PulseDecoder {
    code: u64,
    bit_count: u8,
    ready: bool,
}

impl PulseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一个下降沿
    ///
    /// 第 48 位到达时返回解码结果；ready 期间的边沿被忽略并返回 `None`。
    pub fn on_edge(&mut self, gap_us: u32) -> Option<RemoteCommand> {
        if self.ready {
            return None;
        }

        if gap_us > RESYNC_GAP_US {
            trace!(gap_us, "IR resync");
            self.code = 0;
            self.bit_count = 0;
            return None;
        }

        if (HEADER_BITS..FRAME_BITS).contains(&self.bit_count) {
            self.code <<= 1;
            if gap_us > ONE_BIT_GAP_US {
                self.code |= 1;
            }
        }

        self.bit_count = self.bit_count.saturating_add(1);
        if self.bit_count == FRAME_BITS {
            self.ready = true;
            trace!(code = format_args!("0x{:04X}", self.code), "IR frame complete");
            return Some(RemoteCommand::new(self.code));
        }

        None
    }

    /// 定时器溢出：丢弃未完成帧的位计数
    ///
    /// 对应硬件计时器周期中断，防止停滞的半帧与下一帧拼接。
    pub fn on_timer_wrap(&mut self) {
        self.bit_count = 0;
    }

    /// 消费完成后清除 ready 与累加值
    ///
    /// 位计数保持不变：只有新的引导间隔才能开始下一帧。
    pub fn clear(&mut self) {
        self.ready = false;
        self.code = 0;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 已完成但尚未消费的命令
    pub fn command(&self) -> Option<RemoteCommand> {
        self.ready.then(|| RemoteCommand::new(self.code))
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }
}

/// 引导间隔（9ms 载波 + 4.5ms 空闲）
const LEADER_GAP_US: u32 = 13_500;
/// 逻辑 0 的边沿间隔
const ZERO_GAP_US: u32 = 1_125;
/// 逻辑 1 的边沿间隔
const ONE_GAP_US: u32 = 2_250;

/// 生成一帧按键码对应的下降沿间隔序列
///
/// 序列送入 [`PulseDecoder`] 后恰好解码为 `code`，用于自检脚本和命令行注入按键。
pub fn encode_pulse_train(code: u16) -> Vec<u32> {
    let mut gaps = Vec::with_capacity(1 + FRAME_BITS as usize);
    gaps.push(LEADER_GAP_US);
    gaps.extend(std::iter::repeat_n(ZERO_GAP_US, HEADER_BITS as usize));
    for bit in (0..16).rev() {
        let gap = if (code >> bit) & 1 == 1 {
            ONE_GAP_US
        } else {
            ZERO_GAP_US
        };
        gaps.push(gap);
    }
    gaps
}
