//! 电机控制行协议
//!
//! 发往电机控制板的 ASCII 行：`$M,<speed:03>,<steer:+03>\n`
//!
//! 速度为带符号百分比（三位补零，负数带 `-`），转向角总是带符号（`+00`、`-45`）。

/// 编码一条电机控制行（含结尾 `\n`）
pub fn encode_motor_line(speed: i16, steer: i16) -> String {
    format!("$M,{:03},{:+03}\n", speed, steer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_motor_line() {
        assert_eq!(encode_motor_line(20, 35), "$M,020,+35\n");
        assert_eq!(encode_motor_line(0, 0), "$M,000,+00\n");
        assert_eq!(encode_motor_line(-20, -45), "$M,-20,-45\n");
        assert_eq!(encode_motor_line(-5, 5), "$M,-05,+05\n");
        assert_eq!(encode_motor_line(100, -40), "$M,100,-40\n");
    }
}
