//! 128×128 状态屏布局
//!
//! 布局是纯函数：快照 → 绘制命令列表，具体屏幕驱动实现 [`DisplaySink`]。
//!
//! ```text
//! ┌──────────────────────────┐
//! │ MODE            S:040    │  标题栏（蓝）
//! │          ┌─┐             │
//! │          │F│             │
//! │   ┌─┐   ┌───┐   ┌─┐      │  四向距离条（红/黄/绿）
//! │   │L│   │car│   │R│      │
//! │   └─┘   └───┘   └─┘      │
//! │          │B│             │
//! │ F090 R040 L045 B080      │  数值栏（青）
//! └──────────────────────────┘
//! ```

use crate::error::DriverError;
use crate::state::VehicleSnapshot;
use parkpilot_control::ControlConfig;
use smallvec::SmallVec;
use std::io::Write;

pub const SCREEN_WIDTH: i32 = 128;
pub const SCREEN_HEIGHT: i32 = 128;

/// 最小填充高度（距离为 0 或负数时仍显示一条细线）
const MIN_FILL: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
    Red,
    Yellow,
    Green,
    Blue,
    Cyan,
}

impl Color {
    /// RGB565
    pub fn rgb565(self) -> u16 {
        match self {
            Color::Black => 0x0000,
            Color::White => 0xFFFF,
            Color::Red => 0xF800,
            Color::Yellow => 0xFFE0,
            Color::Green => 0x07E0,
            Color::Blue => 0x001F,
            Color::Cyan => 0x07FF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    FillScreen(Color),
    FillRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },
    /// 1 像素边框
    DrawRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        color: Color,
    },
}

/// 一帧的绘制命令（常规布局不会溢出到堆上）
pub type DrawList = SmallVec<[DrawCommand; 24]>;

/// 屏幕驱动
pub trait DisplaySink {
    fn render(&mut self, list: &DrawList) -> Result<(), DriverError>;
}

/// 无屏幕
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn render(&mut self, _list: &DrawList) -> Result<(), DriverError> {
        Ok(())
    }
}

/// 文本屏：只输出每帧的文本命令，一行一帧
///
/// 用于串口终端或日志文件上观察状态屏。
#[derive(Debug)]
pub struct TextDisplay<W: Write> {
    writer: W,
}

impl<W: Write> TextDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DisplaySink for TextDisplay<W> {
    fn render(&mut self, list: &DrawList) -> Result<(), DriverError> {
        let line = list
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| DriverError::Display(e.to_string()))
    }
}

/// 距离条颜色
pub fn bar_color(distance_cm: i32, config: &ControlConfig) -> Color {
    if distance_cm < config.near_cm {
        Color::Red
    } else if distance_cm < config.medium_cm {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// 距离条填充高度：按 far 阈值线性缩放，最少 2 像素
///
/// 距离先限制在 `0..=far`，任意解析出的读数都不会溢出。
pub fn bar_fill(height: i32, distance_cm: i32, config: &ControlConfig) -> i32 {
    let far = config.far_cm.max(1);
    let fill = height * distance_cm.clamp(0, far) / far;
    fill.max(MIN_FILL)
}

fn push_bar(list: &mut DrawList, (x, y, w, h): (i32, i32, i32, i32), distance: i32, config: &ControlConfig) {
    let fill = bar_fill(h, distance, config);
    list.push(DrawCommand::DrawRect {
        x,
        y,
        w,
        h,
        color: Color::White,
    });
    list.push(DrawCommand::FillRect {
        x: x + 1,
        y: y + 1,
        w: w - 2,
        h: h - 2,
        color: Color::Black,
    });
    list.push(DrawCommand::FillRect {
        x: x + 1,
        y: y + h - fill,
        w: w - 2,
        h: fill - 1,
        color: bar_color(distance, config),
    });
}

fn push_header(list: &mut DrawList, snapshot: &VehicleSnapshot) {
    list.push(DrawCommand::FillRect {
        x: 0,
        y: 0,
        w: SCREEN_WIDTH,
        h: 16,
        color: Color::Blue,
    });
    list.push(DrawCommand::Text {
        x: 2,
        y: 4,
        text: snapshot.mode.label().to_string(),
        color: Color::White,
    });
    list.push(DrawCommand::Text {
        x: 70,
        y: 4,
        text: format!(" S:{:03}", snapshot.cruise_speed),
        color: Color::White,
    });
}

/// 数值栏文本
pub fn readout(snapshot: &VehicleSnapshot) -> String {
    let f = &snapshot.frame;
    format!("F{:03} R{:03} L{:03} B{:03}", f.front, f.right, f.left, f.rear)
}

/// 生成一帧布局
///
/// 碰撞时整屏红色，只保留标题栏。
pub fn layout(snapshot: &VehicleSnapshot, config: &ControlConfig) -> DrawList {
    let mut list = DrawList::new();

    if snapshot.collision {
        list.push(DrawCommand::FillScreen(Color::Red));
        push_header(&mut list, snapshot);
        list.push(DrawCommand::Text {
            x: 30,
            y: 60,
            text: "COLLISION".to_string(),
            color: Color::White,
        });
        return list;
    }

    push_header(&mut list, snapshot);

    list.push(DrawCommand::FillRect {
        x: 0,
        y: 16,
        w: SCREEN_WIDTH,
        h: 96,
        color: Color::Black,
    });
    // 车身
    list.push(DrawCommand::DrawRect {
        x: 56,
        y: 56,
        w: 16,
        h: 16,
        color: Color::White,
    });

    let f = &snapshot.frame;
    push_bar(&mut list, (58, 20, 12, 28), f.front, config);
    push_bar(&mut list, (98, 58, 12, 28), f.right, config);
    push_bar(&mut list, (18, 58, 12, 28), f.left, config);
    push_bar(&mut list, (58, 90, 12, 18), f.rear, config);

    list.push(DrawCommand::FillRect {
        x: 0,
        y: 112,
        w: SCREEN_WIDTH,
        h: SCREEN_HEIGHT - 112,
        color: Color::Cyan,
    });
    list.push(DrawCommand::Text {
        x: 0,
        y: 116,
        text: readout(snapshot),
        color: Color::Black,
    });

    list
}
