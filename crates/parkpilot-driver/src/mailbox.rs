//! 中断侧生产者与主循环之间的单槽邮箱
//!
//! 两条异步输入各有一个生产者句柄（`Send`，可以移动到中断线程/串口读取线程）：
//!
//! - [`IrReceiver`]：红外边沿 → 按键码。邮箱为容量 1 的通道，
//!   上一个按键码未被主循环取走时，新的边沿直接丢弃（背压丢弃）。
//! - [`SensorUart`]：串口字节 → 传感器行。邮箱为覆盖槽，
//!   主循环来不及消费时新行替换旧行（只关心最新距离）。

use crate::metrics::DriverMetrics;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use parkpilot_protocol::{LineAssembler, PulseDecoder, RemoteCommand};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// 红外接收生产者
pub struct IrReceiver {
    decoder: PulseDecoder,
    tx: Sender<RemoteCommand>,
    metrics: Arc<DriverMetrics>,
}

/// 红外按键码邮箱（主循环侧）
pub struct CommandMailbox {
    rx: Receiver<RemoteCommand>,
}

/// 创建红外邮箱
pub fn ir_mailbox(metrics: Arc<DriverMetrics>) -> (IrReceiver, CommandMailbox) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (
        IrReceiver {
            decoder: PulseDecoder::new(),
            tx,
            metrics,
        },
        CommandMailbox { rx },
    )
}

impl IrReceiver {
    /// 下降沿中断
    pub fn on_edge(&mut self, gap_us: u32) {
        DriverMetrics::incr(&self.metrics.ir_edges);

        if !self.tx.is_empty() {
            DriverMetrics::incr(&self.metrics.ir_dropped_edges);
            return;
        }

        let Some(command) = self.decoder.on_edge(gap_us) else {
            return;
        };
        // 命令已移交邮箱，解码器立即可以接收下一帧
        self.decoder.clear();

        match self.tx.try_send(command) {
            Ok(()) => {
                DriverMetrics::incr(&self.metrics.ir_commands);
                debug!(code = format_args!("0x{:04X}", command.key_code()), "IR command decoded");
            },
            Err(TrySendError::Full(_)) => {
                DriverMetrics::incr(&self.metrics.ir_dropped_edges);
            },
            Err(TrySendError::Disconnected(_)) => {
                trace!("IR mailbox closed, command dropped");
            },
        }
    }

    /// 一次送入整段边沿间隔（用于注入按键）
    pub fn feed(&mut self, gaps: &[u32]) {
        for &gap in gaps {
            self.on_edge(gap);
        }
    }

    /// 定时器周期中断
    pub fn on_timer_wrap(&mut self) {
        self.decoder.on_timer_wrap();
    }

    pub fn decoder(&self) -> &PulseDecoder {
        &self.decoder
    }
}

impl CommandMailbox {
    /// 取走待处理的按键码
    pub fn take(&self) -> Option<RemoteCommand> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}

type LineSlot = Mutex<Option<String>>;

fn lock_slot(slot: &LineSlot) -> MutexGuard<'_, Option<String>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 串口接收生产者
pub struct SensorUart {
    assembler: LineAssembler,
    slot: Arc<LineSlot>,
    metrics: Arc<DriverMetrics>,
}

/// 传感器行邮箱（主循环侧）
#[derive(Clone)]
pub struct LineMailbox {
    slot: Arc<LineSlot>,
}

/// 创建传感器行邮箱
pub fn line_mailbox(metrics: Arc<DriverMetrics>) -> (SensorUart, LineMailbox) {
    let slot = Arc::new(Mutex::new(None));
    (
        SensorUart {
            assembler: LineAssembler::new(),
            slot: Arc::clone(&slot),
            metrics,
        },
        LineMailbox { slot },
    )
}

impl SensorUart {
    /// 串口接收中断（每字节一次）
    pub fn on_byte(&mut self, byte: u8) {
        DriverMetrics::incr(&self.metrics.uart_bytes);
        let overflows = self.assembler.stats().overflows;

        let line = self.assembler.on_byte(byte);
        if self.assembler.stats().overflows != overflows {
            DriverMetrics::incr(&self.metrics.uart_overflows);
        }

        if let Some(line) = line {
            DriverMetrics::incr(&self.metrics.uart_lines);
            if lock_slot(&self.slot).replace(line).is_some() {
                DriverMetrics::incr(&self.metrics.uart_overwrites);
                trace!("unconsumed sensor line overwritten");
            }
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.on_byte(b);
        }
    }

    pub fn assembler(&self) -> &LineAssembler {
        &self.assembler
    }
}

impl LineMailbox {
    /// 取走最新的完整行
    pub fn take(&self) -> Option<String> {
        lock_slot(&self.slot).take()
    }
}
