//! 运动策略
//!
//! 手动模式的按键映射与避障模式的距离策略，均为纯函数。

use crate::{ControlConfig, MotionCommand, mode::MAX_STEER};
use parkpilot_protocol::{Button, SensorFrame};

/// 避障时的固定速度
pub const AVOID_SPEED: i16 = 25;

/// 前方与两侧都被堵住时，倒车的转向幅度
pub const ESCAPE_STEER: i16 = 40;

/// 手动模式按键映射
///
/// 前进为巡航速度，倒车为巡航速度的一半（取负），左右转只改转向，停车全部清零。
/// 其他按键不改变当前目标。
pub fn manual_command(button: Button, current: MotionCommand, cruise_speed: i16) -> MotionCommand {
    match button {
        Button::Forward => MotionCommand::new(cruise_speed, 0),
        Button::Reverse => MotionCommand::new(-(cruise_speed / 2), 0),
        Button::Left => current.with_steer(-MAX_STEER),
        Button::Right => current.with_steer(MAX_STEER),
        Button::Stop => MotionCommand::STOP,
        _ => current,
    }
}

/// 加/减速按键调整巡航速度
///
/// 调整后超出 `[cruise_min, cruise_max]` 的操作被忽略。
pub fn adjust_cruise(button: Button, cruise_speed: i16, config: &ControlConfig) -> i16 {
    let next = match button {
        Button::SpeedUp => cruise_speed.saturating_add(config.cruise_step),
        Button::SpeedDown => cruise_speed.saturating_sub(config.cruise_step),
        _ => return cruise_speed,
    };

    if (config.cruise_min..=config.cruise_max).contains(&next) {
        next
    } else {
        cruise_speed
    }
}

/// 避障策略
///
/// - 前方 < near：
///   - 两侧也 < near：以固定速度倒车，转向更空的一侧（幅度 40）
///   - 否则：以固定速度前进，满舵转离更近的一侧
/// - 前方 >= near：回正；前方 > far 时全速巡航，否则按距离线性降速
pub fn avoid_command(frame: &SensorFrame, cruise_speed: i16, config: &ControlConfig) -> MotionCommand {
    let near = config.near_cm;

    if frame.front < near {
        if frame.left < near && frame.right < near {
            let steer = if frame.left > frame.right {
                -ESCAPE_STEER
            } else {
                ESCAPE_STEER
            };
            return MotionCommand::new(-AVOID_SPEED, steer);
        }

        let steer = if frame.left > frame.right {
            -MAX_STEER
        } else {
            MAX_STEER
        };
        return MotionCommand::new(AVOID_SPEED, steer);
    }

    if frame.front > config.far_cm {
        return MotionCommand::new(cruise_speed, 0);
    }

    let scaled = (cruise_speed as i32 * frame.front)
        .checked_div(config.far_cm)
        .unwrap_or(cruise_speed as i32);
    MotionCommand::new(scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16, 0)
}
