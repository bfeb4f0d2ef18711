//! 超声波传感器行协议
//!
//! 外部单片机通过串口发送 ASCII 行：
//!
//! ```text
//! $S,<front>,<right>,<left>,<rear>\n
//! ```
//!
//! - `$` 为帧起始标记：任何时候收到 `$` 都会丢弃已缓冲的半行
//! - `\n` 或 `\r` 为帧结束
//! - 距离单位为厘米，十进制整数
//!
//! [`LineAssembler`] 负责字节流到行的组帧，[`parse_sensor_frame`] 负责行到距离的解析，
//! [`SensorState`] 保存最近一次成功解析的结果（解析失败时保持旧值）。

use crate::ProtocolError;
use tracing::{debug, trace, warn};

/// 行缓冲区容量（含结束符）
pub const LINE_CAPACITY: usize = 80;

/// 帧起始标记
pub const FRAME_START: u8 = b'$';

/// 帧头
pub const FRAME_HEADER: &str = "$S,";

/// 上电时的默认距离（厘米），在收到第一帧之前视为“前方开阔”
pub const INITIAL_DISTANCE_CM: i32 = 120;

/// 四向距离（厘米）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFrame {
    pub front: i32,
    pub right: i32,
    pub left: i32,
    pub rear: i32,
}

impl SensorFrame {
    pub fn new(front: i32, right: i32, left: i32, rear: i32) -> Self {
        Self {
            front,
            right,
            left,
            rear,
        }
    }
}

impl Default for SensorFrame {
    fn default() -> Self {
        Self::new(
            INITIAL_DISTANCE_CM,
            INITIAL_DISTANCE_CM,
            INITIAL_DISTANCE_CM,
            INITIAL_DISTANCE_CM,
        )
    }
}

/// 组帧统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// 收到的总字节数
    pub bytes: u64,
    /// 组出的完整行数
    pub lines: u64,
    /// 溢出丢弃的半行数
    pub overflows: u64,
}

/// 字节流组帧器
///
/// 固定容量：在收到结束符之前缓冲区写满，则整行丢弃并计一次溢出。
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: Vec<u8>,
    capacity: usize,
    stats: LineStats,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::with_capacity(LINE_CAPACITY)
    }

    /// 指定容量（含结束符，最小为 2）
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            stats: LineStats::default(),
        }
    }

    /// 处理一个字节，组出完整行时返回行内容（不含结束符）
    ///
    /// 空行（连续的 `\r\n`）不产生输出。
    pub fn on_byte(&mut self, byte: u8) -> Option<String> {
        self.stats.bytes += 1;

        if byte == FRAME_START {
            if !self.buf.is_empty() {
                trace!(len = self.buf.len(), "frame start marker discards partial line");
            }
            self.buf.clear();
        }

        if self.buf.len() >= self.capacity - 1 {
            self.stats.overflows += 1;
            warn!(capacity = self.capacity, "sensor line overflow, frame dropped");
            self.buf.clear();
            return None;
        }

        if byte == b'\n' || byte == b'\r' {
            if self.buf.is_empty() {
                return None;
            }
            self.stats.lines += 1;
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return Some(line);
        }

        self.buf.push(byte);
        None
    }

    /// 当前缓冲的半行
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

const FIELD_NAMES: [&str; 4] = ["front", "right", "left", "rear"];

/// 解析一行传感器数据
///
/// 只接受 `$S,<int>,<int>,<int>,<int>`（允许末尾的 CR/LF），其他形式一律报错。
pub fn parse_sensor_frame(line: &str) -> Result<SensorFrame, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line
        .strip_prefix(FRAME_HEADER)
        .ok_or_else(|| ProtocolError::InvalidHeader(line.chars().take(8).collect()))?;

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() != FIELD_NAMES.len() {
        return Err(ProtocolError::InvalidFieldCount {
            expected: FIELD_NAMES.len(),
            actual: fields.len(),
        });
    }

    let mut values = [0i32; 4];
    for (i, field) in fields.iter().enumerate() {
        values[i] = field
            .trim()
            .parse::<i32>()
            .map_err(|_| ProtocolError::InvalidValue {
                field: FIELD_NAMES[i],
                value: field.to_string(),
            })?;
    }

    Ok(SensorFrame::new(values[0], values[1], values[2], values[3]))
}

/// 最近一次有效的传感器读数
///
/// 解析失败时保留旧值，不清零：控制逻辑始终基于最后已知的距离工作。
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    frame: SensorFrame,
    parse_ok: u64,
    parse_fail: u64,
}

impl SensorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析并应用一行；四个距离作为整体更新
    pub fn apply_line(&mut self, line: &str) -> Result<SensorFrame, ProtocolError> {
        match parse_sensor_frame(line) {
            Ok(frame) => {
                self.frame = frame;
                self.parse_ok += 1;
                debug!(?frame, "sensor frame");
                Ok(frame)
            },
            Err(e) => {
                self.parse_fail += 1;
                warn!(line, error = %e, "sensor frame parse failed");
                Err(e)
            },
        }
    }

    pub fn frame(&self) -> SensorFrame {
        self.frame
    }

    pub fn parse_ok(&self) -> u64 {
        self.parse_ok
    }

    pub fn parse_fail(&self) -> u64 {
        self.parse_fail
    }
}
