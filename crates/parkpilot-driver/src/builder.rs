//! Builder 模式实现
//!
//! 提供链式构造 [`Vehicle`] 的便捷方式。

use crate::display::{DisplaySink, NullDisplay};
use crate::error::DriverError;
use crate::link::{AccelSource, CloudLink, MotorLink, RestingAccel};
use crate::mailbox::{IrReceiver, SensorUart, ir_mailbox, line_mailbox};
use crate::metrics::DriverMetrics;
use crate::state::VehicleSnapshot;
use crate::vehicle::Vehicle;
use arc_swap::ArcSwap;
use parkpilot_client::ShadowConfig;
use parkpilot_control::{CollisionDetector, Controller};
use parkpilot_protocol::SensorState;
use parkpilot_tools::{CloudSettings, VehicleConfig};
use std::io;
use std::sync::Arc;
use tracing::info;

/// 中断侧生产者句柄
///
/// 由 `build()` 一并返回，通常移动到各自的读取线程中。
pub struct Producers {
    pub ir: IrReceiver,
    pub uart: SensorUart,
}

/// Vehicle Builder（链式构造）
///
/// 未指定的外设使用默认实现：电机行写到 stdout，加速度计恒为静止，不接屏幕，不连云端。
///
/// # Example
///
/// ```no_run
/// use parkpilot_driver::{MotorLog, VehicleBuilder};
/// use parkpilot_tools::VehicleConfig;
///
/// let log = MotorLog::new();
/// let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
///     .motor(log.clone())
///     .build()
///     .unwrap();
///
/// producers.uart.feed(b"$S,090,040,045,080\n");
/// vehicle.tick().unwrap();
/// ```
pub struct VehicleBuilder {
    config: VehicleConfig,
    motor: Option<Box<dyn MotorLink + Send>>,
    accel: Option<Box<dyn AccelSource + Send>>,
    display: Option<Box<dyn DisplaySink + Send>>,
    cloud: Option<Box<dyn CloudLink + Send>>,
    metrics: Option<Arc<DriverMetrics>>,
}

impl VehicleBuilder {
    pub fn new(config: VehicleConfig) -> Self {
        Self {
            config,
            motor: None,
            accel: None,
            display: None,
            cloud: None,
            metrics: None,
        }
    }

    /// 电机控制板链路
    pub fn motor<M: MotorLink + Send + 'static>(mut self, motor: M) -> Self {
        self.motor = Some(Box::new(motor));
        self
    }

    pub fn accel<A: AccelSource + Send + 'static>(mut self, accel: A) -> Self {
        self.accel = Some(Box::new(accel));
        self
    }

    pub fn display<D: DisplaySink + Send + 'static>(mut self, display: D) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    /// 云端链路（不设置则离线运行，泊车等待阶段总是走超时路径）
    pub fn cloud<L: CloudLink + Send + 'static>(mut self, cloud: L) -> Self {
        self.cloud = Some(Box::new(cloud));
        self
    }

    /// 共享外部指标实例
    pub fn metrics(mut self, metrics: Arc<DriverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 校验配置并构造
    pub fn build(self) -> Result<(Vehicle, Producers), DriverError> {
        self.config.validate()?;

        let metrics = self.metrics.unwrap_or_default();
        let (ir, commands) = ir_mailbox(Arc::clone(&metrics));
        let (uart, lines) = line_mailbox(Arc::clone(&metrics));

        let control = self.config.control_config();
        info!(
            cruise = control.cruise_speed,
            period_ms = self.config.schedule.cycle_period_ms,
            cloud = self.cloud.is_some(),
            "Vehicle configured"
        );

        let vehicle = Vehicle {
            detector: CollisionDetector::new(control.collision_threshold),
            controller: Controller::new(control),
            schedule: self.config.schedule,
            sensors: SensorState::new(),
            commands,
            lines,
            motor: self.motor.unwrap_or_else(|| Box::new(io::stdout())),
            accel: self.accel.unwrap_or_else(|| Box::new(RestingAccel)),
            display: self.display.unwrap_or_else(|| Box::new(NullDisplay)),
            cloud: self.cloud,
            metrics,
            snapshot: Arc::new(ArcSwap::from_pointee(VehicleSnapshot::default())),
            cycle: 0,
            collision: false,
            collision_override: None,
            last_sent: None,
        };

        Ok((vehicle, Producers { ir, uart }))
    }
}

/// 由配置文件的 `[cloud]` 节生成影子客户端配置
pub fn shadow_config(settings: &CloudSettings) -> ShadowConfig {
    let mut config = ShadowConfig::new(settings.host.clone(), settings.port, settings.thing_name.clone());
    config.guidance_key = settings.guidance_key.clone();
    config.guidance_marker = settings.guidance_marker.clone();
    config.receive_timeout = settings.receive_timeout();
    config.fetch_timeout = settings.fetch_timeout();
    config
}

/// 按配置建立 rustls 影子客户端
///
/// 只加载证书，不立即连接：第一次上报时懒连接。
#[cfg(feature = "tls")]
pub fn tls_shadow_client(
    settings: &CloudSettings,
) -> Result<parkpilot_client::ShadowClient<parkpilot_transport::TlsConnector>, DriverError> {
    use parkpilot_transport::{TlsConnector, TlsIdentity, TransportError};

    let ca_file = settings
        .ca_file
        .clone()
        .ok_or_else(|| TransportError::Certificate("cloud.ca_file is not set".to_string()))?;
    let identity = TlsIdentity {
        ca_file,
        cert_file: settings.cert_file.clone(),
        key_file: settings.key_file.clone(),
    };
    let connector = TlsConnector::new(&identity)?;
    Ok(parkpilot_client::ShadowClient::new(connector, shadow_config(settings)))
}
