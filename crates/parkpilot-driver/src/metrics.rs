//! 驱动层指标
//!
//! 原子计数器，中断侧生产者和主循环都可以无锁更新，任意线程可读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 驱动层实时指标
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// 串口收到的字节数
    pub uart_bytes: AtomicU64,
    /// 组出的完整行数
    pub uart_lines: AtomicU64,
    /// 缓冲区溢出丢弃的半行数
    pub uart_overflows: AtomicU64,
    /// 未被主循环取走、被新行覆盖的行数
    pub uart_overwrites: AtomicU64,
    /// 传感器帧解析成功数
    pub parse_ok: AtomicU64,
    /// 传感器帧解析失败数
    pub parse_fail: AtomicU64,

    /// 红外下降沿数
    pub ir_edges: AtomicU64,
    /// 解码出的按键码数
    pub ir_commands: AtomicU64,
    /// 上一个按键码未被取走时被忽略的下降沿数
    pub ir_dropped_edges: AtomicU64,
    /// 不在码表中的按键码数
    pub ir_unknown: AtomicU64,

    /// 控制周期数
    pub cycles: AtomicU64,
    /// 发送的电机行数
    pub motor_lines: AtomicU64,
    /// 判定为碰撞的检测次数
    pub collisions: AtomicU64,
    /// 加速度计读取失败次数
    pub accel_errors: AtomicU64,
    /// 状态上报成功次数
    pub reports_ok: AtomicU64,
    /// 状态上报失败次数（含重试后仍失败）
    pub reports_failed: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uart_bytes: self.uart_bytes.load(Ordering::Relaxed),
            uart_lines: self.uart_lines.load(Ordering::Relaxed),
            uart_overflows: self.uart_overflows.load(Ordering::Relaxed),
            uart_overwrites: self.uart_overwrites.load(Ordering::Relaxed),
            parse_ok: self.parse_ok.load(Ordering::Relaxed),
            parse_fail: self.parse_fail.load(Ordering::Relaxed),
            ir_edges: self.ir_edges.load(Ordering::Relaxed),
            ir_commands: self.ir_commands.load(Ordering::Relaxed),
            ir_dropped_edges: self.ir_dropped_edges.load(Ordering::Relaxed),
            ir_unknown: self.ir_unknown.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            motor_lines: self.motor_lines.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            accel_errors: self.accel_errors.load(Ordering::Relaxed),
            reports_ok: self.reports_ok.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.uart_bytes,
            &self.uart_lines,
            &self.uart_overflows,
            &self.uart_overwrites,
            &self.parse_ok,
            &self.parse_fail,
            &self.ir_edges,
            &self.ir_commands,
            &self.ir_dropped_edges,
            &self.ir_unknown,
            &self.cycles,
            &self.motor_lines,
            &self.collisions,
            &self.accel_errors,
            &self.reports_ok,
            &self.reports_failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uart_bytes: u64,
    pub uart_lines: u64,
    pub uart_overflows: u64,
    pub uart_overwrites: u64,
    pub parse_ok: u64,
    pub parse_fail: u64,
    pub ir_edges: u64,
    pub ir_commands: u64,
    pub ir_dropped_edges: u64,
    pub ir_unknown: u64,
    pub cycles: u64,
    pub motor_lines: u64,
    pub collisions: u64,
    pub accel_errors: u64,
    pub reports_ok: u64,
    pub reports_failed: u64,
}

impl MetricsSnapshot {
    /// 传感器帧解析成功率（百分比），没有帧时为 0
    pub fn parse_success_rate(&self) -> f64 {
        let total = self.parse_ok + self.parse_fail;
        if total == 0 {
            return 0.0;
        }
        (self.parse_ok as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = DriverMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.parse_success_rate(), 0.0);
    }

    #[test]
    fn test_metrics_concurrent_update() {
        let metrics = Arc::new(DriverMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        DriverMetrics::incr(&metrics.uart_bytes);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().uart_bytes, 4000);
    }

    #[test]
    fn test_metrics_reset_and_rate() {
        let metrics = DriverMetrics::new();
        metrics.parse_ok.fetch_add(3, Ordering::Relaxed);
        metrics.parse_fail.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().parse_success_rate(), 75.0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
