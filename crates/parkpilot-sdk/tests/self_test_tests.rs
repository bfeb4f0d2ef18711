//! 离线自检与配置文件的集成测试

use parkpilot_sdk::driver::{MotorLog, SELF_TEST_CYCLES, VehicleBuilder, run_self_test};
use parkpilot_sdk::prelude::*;

#[test]
fn test_self_test_walks_every_mode() {
    parkpilot_sdk::init_logger();

    let log = MotorLog::new();
    let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
        .motor(log.clone())
        .build()
        .expect("Failed to build vehicle");

    let report = run_self_test(&mut vehicle, &mut producers, SELF_TEST_CYCLES, None)
        .expect("Self-test failed");

    for mode in [Mode::Manual, Mode::Avoid, Mode::Park, Mode::Idle] {
        assert!(report.visited(mode), "mode {mode:?} never entered");
    }
    assert_eq!(report.final_mode(), Mode::Idle);
    assert!(report.metrics.collisions >= 8);
    assert_eq!(report.metrics.parse_ok, SELF_TEST_CYCLES / 20);
    assert!(log.lines().iter().all(|l| l.starts_with("$M,") && l.ends_with('\n')));
}

#[test]
fn test_config_file_drives_vehicle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = VehicleConfig::default();
    config.control.cruise_speed = 60;
    config.schedule.motor_every = 4;
    config.save_to_file(&path).unwrap();

    let loaded = VehicleConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);

    let log = MotorLog::new();
    let (mut vehicle, mut producers) = VehicleBuilder::new(loaded)
        .motor(log.clone())
        .build()
        .unwrap();
    assert_eq!(vehicle.controller().cruise_speed(), 60);

    for _ in 0..8 {
        vehicle.tick().unwrap();
    }
    // 空闲状态只在周期 0、4 发送
    assert_eq!(log.lines().len(), 2);

    producers.ir.feed(&parkpilot_sdk::protocol::encode_pulse_train(Button::Manual.code()));
    vehicle.tick().unwrap();
    producers.ir.feed(&parkpilot_sdk::protocol::encode_pulse_train(Button::Forward.code()));
    let snapshot = vehicle.tick().unwrap();
    assert_eq!(snapshot.command, MotionCommand::new(60, 0));
}
