//! 加速度计寄存器解码
//!
//! BMA222 从 0x02 起连续 6 个寄存器：每轴低字节在前，数据左对齐在 16 位中（有效 10 位）。

/// 三轴加速度原始值（LSB）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AccelSample {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// 从 6 字节寄存器块解码
    pub fn from_bma222_registers(data: [u8; 6]) -> Self {
        let axis = |lo: u8, hi: u8| i16::from_le_bytes([lo, hi]) >> 6;
        Self {
            x: axis(data[0], data[1]),
            y: axis(data[2], data[3]),
            z: axis(data[4], data[5]),
        }
    }

    /// 模长平方（避免开方），i64 容纳任意 i16 三轴
    pub fn magnitude_squared(&self) -> i64 {
        let (x, y, z) = (i64::from(self.x), i64::from(self.y), i64::from(self.z));
        x * x + y * y + z * z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_registers() {
        // x = +1 (0x0040), y = -1 (0xFFC0), z = +256 (0x4000)
        let sample = AccelSample::from_bma222_registers([0x40, 0x00, 0xC0, 0xFF, 0x00, 0x40]);
        assert_eq!(sample, AccelSample::new(1, -1, 256));
    }

    #[test]
    fn test_magnitude_squared() {
        let sample = AccelSample::new(3, -4, 12);
        assert_eq!(sample.magnitude_squared(), 169);

        // 满量程不溢出
        let sample = AccelSample::new(-512, -512, -512);
        assert_eq!(sample.magnitude_squared(), 786_432);

        // 超出 10 位范围的外部样本
        let sample = AccelSample::new(i16::MIN, i16::MIN, i16::MIN);
        assert_eq!(sample.magnitude_squared(), 3_221_225_472);
    }
}
