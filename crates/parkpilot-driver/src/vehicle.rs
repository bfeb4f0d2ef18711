//! 控制主循环
//!
//! 单线程协作式调度：每个周期依次
//!
//! 1. 取走红外按键码并交给控制器
//! 2. 取走最新传感器行并解析
//! 3. 按调度周期执行：统计日志、碰撞检测
//! 4. 控制器计算电机目标（碰撞检测周期内发生碰撞时强制停车）
//! 5. 发送电机行、发布快照、刷新屏幕、上报云端
//!
//! 云端调用是阻塞的（受接收超时约束），会拖慢当个周期。

use crate::display::{DisplaySink, layout};
use crate::error::DriverError;
use crate::link::{AccelSource, CloudLink, MotorLink};
use crate::mailbox::{CommandMailbox, LineMailbox};
use crate::metrics::DriverMetrics;
use crate::state::{SnapshotReader, VehicleSnapshot};
use arc_swap::ArcSwap;
use parkpilot_control::{CollisionDetector, Controller, MotionCommand, NoGuidance};
use parkpilot_protocol::{SensorState, encode_motor_line};
use parkpilot_tools::ScheduleSettings;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// 车辆控制循环
pub struct Vehicle {
    pub(crate) controller: Controller,
    pub(crate) detector: CollisionDetector,
    pub(crate) schedule: ScheduleSettings,
    pub(crate) sensors: SensorState,
    pub(crate) commands: CommandMailbox,
    pub(crate) lines: LineMailbox,
    pub(crate) motor: Box<dyn MotorLink + Send>,
    pub(crate) accel: Box<dyn AccelSource + Send>,
    pub(crate) display: Box<dyn DisplaySink + Send>,
    pub(crate) cloud: Option<Box<dyn CloudLink + Send>>,
    pub(crate) metrics: Arc<DriverMetrics>,
    pub(crate) snapshot: Arc<ArcSwap<VehicleSnapshot>>,
    pub(crate) cycle: u64,
    pub(crate) collision: bool,
    pub(crate) collision_override: Option<bool>,
    pub(crate) last_sent: Option<MotionCommand>,
}

fn due(cycle: u64, every: u32) -> bool {
    every != 0 && cycle % every as u64 == 0
}

impl Vehicle {
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn metrics(&self) -> &Arc<DriverMetrics> {
        &self.metrics
    }

    /// 快照读取句柄
    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader::new(Arc::clone(&self.snapshot))
    }

    /// 下一个周期的序号
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    /// 强制碰撞检测结果（`None` 恢复读取加速度计）
    pub fn set_collision_override(&mut self, forced: Option<bool>) {
        self.collision_override = forced;
    }

    /// 执行一个控制周期
    ///
    /// 只有电机链路写入失败会返回错误；显示和云端错误记录日志后继续。
    pub fn tick(&mut self) -> Result<VehicleSnapshot, DriverError> {
        let cycle = self.cycle;

        if let Some(command) = self.commands.take() {
            match command.button() {
                Some(button) => self.controller.on_button(button),
                None => {
                    DriverMetrics::incr(&self.metrics.ir_unknown);
                    debug!(code = format_args!("0x{:04X}", command.key_code()), "Unknown IR code");
                },
            }
        }

        if let Some(line) = self.lines.take() {
            match self.sensors.apply_line(&line) {
                Ok(_) => DriverMetrics::incr(&self.metrics.parse_ok),
                Err(_) => DriverMetrics::incr(&self.metrics.parse_fail),
            }
        }

        if due(cycle, self.schedule.stats_every) {
            self.log_stats();
        }

        let collision_check = due(cycle, self.schedule.collision_every);
        if collision_check {
            self.collision = self.check_collision();
        }

        let frame = self.sensors.frame();
        let mut command = match self.cloud.as_deref_mut() {
            Some(cloud) => self.controller.step(&frame, cloud),
            None => self.controller.step(&frame, &mut NoGuidance),
        };
        if collision_check && self.collision {
            command = self.controller.halt();
        }

        if due(cycle, self.schedule.motor_every) || self.last_sent != Some(command) {
            self.send_motor(command)?;
        }

        let snapshot = VehicleSnapshot {
            cycle,
            mode: self.controller.mode(),
            park_state: self.controller.park_state(),
            cruise_speed: self.controller.cruise_speed(),
            command,
            frame,
            collision: self.collision,
        };
        self.snapshot.store(Arc::new(snapshot));

        if due(cycle, self.schedule.display_every) {
            let list = layout(&snapshot, self.controller.config());
            if let Err(e) = self.display.render(&list) {
                warn!(error = %e, "Display render failed");
            }
        }

        if due(cycle, self.schedule.report_every) {
            self.report(&snapshot);
        }

        DriverMetrics::incr(&self.metrics.cycles);
        self.cycle += 1;
        Ok(snapshot)
    }

    /// 按配置的周期循环执行，直到 `running` 变为 false
    ///
    /// 退出前发送一次停车命令。
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), DriverError> {
        let period = self.schedule.cycle_period();
        info!(?period, cloud = self.has_cloud(), "Control loop started");

        while running.load(Ordering::Relaxed) {
            let start = Instant::now();
            self.tick()?;
            // 使用 spin_sleep 获得亚毫秒精度
            if let Some(remaining) = period.checked_sub(start.elapsed()) {
                spin_sleep::sleep(remaining);
            }
        }

        info!(cycles = self.cycle, "Control loop stopped");
        self.send_motor(MotionCommand::STOP)
    }

    fn check_collision(&mut self) -> bool {
        let collision = match self.collision_override {
            Some(forced) => forced,
            None => match self.accel.read() {
                Ok(sample) => self.detector.is_collision(&sample),
                Err(e) => {
                    DriverMetrics::incr(&self.metrics.accel_errors);
                    warn!(error = %e, "Accelerometer read failed");
                    false
                },
            },
        };

        if collision {
            DriverMetrics::incr(&self.metrics.collisions);
            if !self.collision {
                warn!(cycle = self.cycle, "Collision detected, stopping");
            }
        }
        collision
    }

    fn send_motor(&mut self, command: MotionCommand) -> Result<(), DriverError> {
        if self.last_sent != Some(command) {
            info!(speed = command.speed, steer = command.steer, "Motor command changed");
        }
        let line = encode_motor_line(command.speed, command.steer);
        trace!(line = line.trim_end(), "Motor line");
        self.motor.send_line(&line)?;
        DriverMetrics::incr(&self.metrics.motor_lines);
        self.last_sent = Some(command);
        Ok(())
    }

    fn report(&mut self, snapshot: &VehicleSnapshot) {
        let Some(cloud) = self.cloud.as_deref_mut() else {
            return;
        };
        match cloud.report_state(&snapshot.report()) {
            Ok(()) => DriverMetrics::incr(&self.metrics.reports_ok),
            Err(e) => {
                DriverMetrics::incr(&self.metrics.reports_failed);
                warn!(code = e.code(), error = %e, "State report failed");
            },
        }
    }

    fn log_stats(&self) {
        let m = self.metrics.snapshot();
        info!(
            rx_bytes = m.uart_bytes,
            rx_lines = m.uart_lines,
            ok = m.parse_ok,
            bad = m.parse_fail,
            ovf = m.uart_overflows,
            ir_dropped = m.ir_dropped_edges,
            "UART stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{Producers, VehicleBuilder};
    use crate::display::TextDisplay;
    use crate::link::{MotorLog, RegisterAccel};
    use crate::{DriverError, Vehicle};
    use parkpilot_control::{Mode, MotionCommand};
    use parkpilot_protocol::{AccelSample, Button, encode_pulse_train};
    use parkpilot_tools::VehicleConfig;

    fn vehicle() -> (Vehicle, Producers, MotorLog) {
        let log = MotorLog::new();
        let (vehicle, producers) = VehicleBuilder::new(VehicleConfig::default())
            .motor(log.clone())
            .build()
            .unwrap();
        (vehicle, producers, log)
    }

    fn press(producers: &mut Producers, button: Button) {
        producers.ir.feed(&encode_pulse_train(button.code()));
    }

    #[test]
    fn test_idle_sends_stop_on_schedule() {
        let (mut vehicle, _producers, log) = vehicle();
        for _ in 0..6 {
            let snapshot = vehicle.tick().unwrap();
            assert_eq!(snapshot.mode, Mode::Idle);
            assert_eq!(snapshot.command, MotionCommand::STOP);
        }
        // 周期 0、2、4
        assert_eq!(log.lines(), vec!["$M,000,+00\n"; 3]);
    }

    #[test]
    fn test_button_and_sensor_flow() {
        let (mut vehicle, mut producers, log) = vehicle();
        producers.uart.feed(b"$S,040,030,030,100\n");
        press(&mut producers, Button::Forward);

        let snapshot = vehicle.tick().unwrap();
        assert_eq!(snapshot.mode, Mode::Avoid);
        assert_eq!(snapshot.frame.front, 40);
        // 40 * 40 / 80
        assert_eq!(snapshot.command, MotionCommand::new(20, 0));
        assert_eq!(log.lines().last().map(String::as_str), Some("$M,020,+00\n"));

        let metrics = vehicle.metrics().snapshot();
        assert_eq!(metrics.parse_ok, 1);
        assert_eq!(metrics.ir_commands, 1);
    }

    #[test]
    fn test_command_change_sent_immediately() {
        let (mut vehicle, mut producers, log) = vehicle();
        vehicle.tick().unwrap();
        press(&mut producers, Button::Manual);
        vehicle.tick().unwrap();
        press(&mut producers, Button::Forward);
        // 周期 2 按调度发送；周期 3 不在调度上
        vehicle.tick().unwrap();
        press(&mut producers, Button::Right);
        vehicle.tick().unwrap();

        assert_eq!(
            log.lines(),
            vec!["$M,000,+00\n", "$M,040,+00\n", "$M,040,+45\n"]
        );
    }

    #[test]
    fn test_collision_override_halts_manual() {
        let (mut vehicle, mut producers, _log) = vehicle();
        press(&mut producers, Button::Manual);
        vehicle.tick().unwrap();
        press(&mut producers, Button::Forward);
        vehicle.tick().unwrap();
        assert_eq!(vehicle.controller().target(), MotionCommand::new(40, 0));

        vehicle.set_collision_override(Some(true));
        // 周期 5 是碰撞检测周期
        let snapshots: Vec<_> = (0..4).map(|_| vehicle.tick().unwrap()).collect();
        let last = snapshots.last().unwrap();
        assert_eq!(last.cycle, 5);
        assert!(last.collision);
        assert_eq!(last.command, MotionCommand::STOP);
        assert_eq!(last.mode, Mode::Manual);
        assert_eq!(vehicle.metrics().snapshot().collisions, 1);
    }

    #[test]
    fn test_accelerometer_collision() {
        let log = MotorLog::new();
        let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
            .motor(log)
            .accel(|| Ok::<_, DriverError>(AccelSample::new(600, 0, 0)))
            .build()
            .unwrap();
        press(&mut producers, Button::Forward);
        let snapshot = vehicle.tick().unwrap();
        assert_eq!(snapshot.mode, Mode::Avoid);
        assert!(snapshot.collision);
        assert_eq!(snapshot.command, MotionCommand::STOP);

        // 非检测周期按避障策略恢复
        let snapshot = vehicle.tick().unwrap();
        assert!(snapshot.collision);
        assert_eq!(snapshot.command, MotionCommand::new(40, 0));
    }

    #[test]
    fn test_bad_sensor_line_keeps_last_frame() {
        let (mut vehicle, mut producers, _log) = vehicle();
        producers.uart.feed(b"$S,10,20,30,40\n");
        vehicle.tick().unwrap();
        producers.uart.feed(b"$S,oops\n");
        let snapshot = vehicle.tick().unwrap();
        assert_eq!(snapshot.frame.front, 10);
        assert_eq!(vehicle.metrics().snapshot().parse_fail, 1);
    }

    #[test]
    fn test_extreme_sensor_readings_render() {
        let screen = MotorLog::new();
        let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
            .motor(MotorLog::new())
            .display(TextDisplay::new(screen.clone()))
            .build()
            .unwrap();

        producers.uart.feed(b"$S,-99999999,0,0,0\n");
        for _ in 0..9 {
            vehicle.tick().unwrap();
        }
        let out = screen.lines().concat();
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with("F-99999999 R000 L000 B000\n"), "{}", out);
    }

    #[test]
    fn test_accel_bus_errors_counted() {
        let (mut vehicle, _producers) = VehicleBuilder::new(VehicleConfig::default())
            .motor(MotorLog::new())
            .accel(RegisterAccel::new(|| {
                Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "i2c nack"))
            }))
            .build()
            .unwrap();

        for _ in 0..10 {
            let snapshot = vehicle.tick().unwrap();
            assert!(!snapshot.collision);
        }
        assert_eq!(vehicle.metrics().snapshot().accel_errors, 2);
    }

    #[test]
    fn test_unknown_ir_code_ignored() {
        let (mut vehicle, mut producers, _log) = vehicle();
        producers.ir.feed(&encode_pulse_train(0x1234));
        let snapshot = vehicle.tick().unwrap();
        assert_eq!(snapshot.mode, Mode::Idle);
        assert_eq!(vehicle.metrics().snapshot().ir_unknown, 1);
    }

    #[test]
    fn test_snapshot_reader_follows_ticks() {
        let (mut vehicle, _producers, _log) = vehicle();
        let reader = vehicle.snapshot_reader();
        vehicle.tick().unwrap();
        vehicle.tick().unwrap();
        assert_eq!(reader.load().cycle, 1);
    }
}
