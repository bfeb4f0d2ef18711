//! 控制参数

/// 控制参数
///
/// 距离单位为厘米，速度为百分比。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    /// 上电时的巡航速度
    pub cruise_speed: i16,
    /// 巡航速度下限（含）
    pub cruise_min: i16,
    /// 巡航速度上限（含）
    pub cruise_max: i16,
    /// 加/减速按键的步长
    pub cruise_step: i16,
    /// 近距离阈值：避障触发、显示条红色
    pub near_cm: i32,
    /// 中距离阈值：显示条黄色
    pub medium_cm: i32,
    /// 远距离阈值：避障全速、显示条满格
    pub far_cm: i32,
    /// 泊车搜索：右侧空位判定阈值
    pub gap_open_cm: i32,
    /// 等待云端引导的最大周期数
    pub guidance_timeout_ticks: u32,
    /// 碰撞判定：加速度模长平方阈值
    pub collision_threshold: i32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cruise_speed: 40,
            cruise_min: 15,
            cruise_max: 95,
            cruise_step: 5,
            near_cm: 25,
            medium_cm: 50,
            far_cm: 80,
            gap_open_cm: 70,
            guidance_timeout_ticks: 20,
            collision_threshold: 280_000,
        }
    }
}
