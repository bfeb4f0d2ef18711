//! # ParkPilot Control
//!
//! 纯控制逻辑（无 IO）：
//!
//! - [`Mode`] / [`MotionCommand`]：运行模式与电机目标
//! - [`policy`]：按键映射、避障策略
//! - [`parking`]：自动泊车状态机及云端引导接口 [`GuidanceSource`]
//! - [`collision`]：碰撞检测
//! - [`Controller`]：聚合以上部分，每个控制周期调用一次 `step()`
//!
//! 所有时间均以控制周期（tick）计。

pub mod collision;
mod config;
mod controller;
mod mode;
pub mod parking;
pub mod policy;

pub use collision::CollisionDetector;
pub use config::ControlConfig;
pub use controller::Controller;
pub use mode::{Mode, MotionCommand};
pub use parking::{GuidanceSource, NoGuidance, ParkState, ParkStep, ParkingStateMachine};
