//! 碰撞检测

use parkpilot_protocol::AccelSample;

/// 加速度模长阈值碰撞检测
///
/// 单次采样模长平方超过阈值即判定为碰撞，不做滤波。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionDetector {
    threshold: i32,
}

impl CollisionDetector {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn is_collision(&self, sample: &AccelSample) -> bool {
        sample.magnitude_squared() > i64::from(self.threshold)
    }
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(crate::ControlConfig::default().collision_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let detector = CollisionDetector::new(100);
        assert!(!detector.is_collision(&AccelSample::new(6, 8, 0)));
        assert!(detector.is_collision(&AccelSample::new(6, 8, 1)));
    }

    #[test]
    fn test_resting_vehicle_is_not_a_collision() {
        // 静止时约 1g（BMA222 ±2g 量程下约 64 LSB）
        let detector = CollisionDetector::default();
        assert!(!detector.is_collision(&AccelSample::new(0, 0, 64)));
        assert!(detector.is_collision(&AccelSample::new(400, 300, 200)));
    }

    #[test]
    fn test_saturated_axes() {
        let detector = CollisionDetector::new(i32::MAX);
        assert!(detector.is_collision(&AccelSample::new(i16::MIN, i16::MIN, i16::MIN)));
        assert!(detector.is_collision(&AccelSample::new(i16::MAX, i16::MAX, i16::MAX)));
        assert!(!detector.is_collision(&AccelSample::new(i16::MAX, 0, 0)));
    }
}
