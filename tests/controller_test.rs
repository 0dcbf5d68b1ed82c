mod common;

use cognifly_servo::config::{FrameGeometry, PidConfig, TagPolicyConfig};
use cognifly_servo::controller::PidChannel;
use cognifly_servo::target::TargetPolicy;
use cognifly_servo::TagPolicy;
use common::{tag, tag_with_yaw};

#[test]
fn output_never_leaves_the_bound() {
    let configs = [
        PidConfig::symmetric(0.05, 0.0, 0.0001, 3.0, 0.5),
        PidConfig::symmetric(2.0, 1.0, 2.0, 0.0, 0.2),
        PidConfig {
            kp: 10.0,
            ki: 5.0,
            kd: 1.0,
            setpoint: 0.0,
            min: -0.1,
            max: 0.7,
        },
    ];
    let measurements = [0.0, 1e9, -1e9, 3.0, -42.0, 1e-9, 250.0, -1e9, 1e9];

    for config in configs.iter() {
        let mut channel = PidChannel::new(config);
        for &measurement in measurements.iter().cycle().take(200) {
            let output = channel.update(measurement);
            assert!(
                output >= config.min && output <= config.max,
                "{} outside [{}, {}]",
                output,
                config.min,
                config.max
            );
        }
    }
}

#[test]
fn asymmetric_bound_is_enforced_on_both_sides() {
    let config = PidConfig {
        kp: 1.0,
        ki: 0.0,
        kd: 0.0,
        setpoint: 0.0,
        min: -0.1,
        max: 0.7,
    };
    let mut channel = PidChannel::new(&config);

    assert_eq!(channel.update(100.0), -0.1);
    assert_eq!(channel.update(-100.0), 0.7);
    assert_eq!(channel.output_limits(), (-0.1, 0.7));
}

#[test]
fn proportional_response_follows_the_error_sign() {
    let mut channel = PidChannel::new(&PidConfig::symmetric(0.05, 0.0, 0.0, 3.0, 0.5));

    assert!((channel.update(5.0) - (-0.1)).abs() < 1e-12);
    assert!((channel.update(1.0) - 0.1).abs() < 1e-12);
    assert_eq!(channel.setpoint(), 3.0);
}

#[test]
fn terms_are_summed_before_the_bound_applies() {
    let mut channel = PidChannel::new(&PidConfig::symmetric(1.0, 0.0, 1.0, 0.0, 1.0));

    // Proportional term alone is past the bound
    assert_eq!(channel.update(2.0), -1.0);

    // p = -1.4 and d = +0.6: the sum is inside the bound and passes through
    let output = channel.update(1.4);
    assert!((output - (-0.8)).abs() < 1e-12, "{}", output);
}

#[test]
fn integral_accumulates_until_reset() {
    let mut channel = PidChannel::new(&PidConfig::symmetric(0.0, 0.1, 0.0, 1.0, 10.0));

    let first = channel.update(0.0);
    let second = channel.update(0.0);
    assert!((first - 0.1).abs() < 1e-12);
    assert!((second - 0.2).abs() < 1e-12);

    channel.reset();
    assert!((channel.update(0.0) - 0.1).abs() < 1e-12);
}

#[test]
fn setpoint_can_move() {
    let mut channel = PidChannel::new(&PidConfig::symmetric(1.0, 0.0, 0.0, 0.0, 10.0));
    channel.set_setpoint(2.0);

    assert_eq!(channel.setpoint(), 2.0);
    assert!((channel.update(1.5) - 0.5).abs() < 1e-12);
}

#[test]
fn yaw_command_is_latched_inside_the_band() {
    let mut policy = TagPolicy::new(TagPolicyConfig::default(), FrameGeometry::default(), 1.0);

    // Nothing computed yet
    let command = policy.compose(&tag(0, 320.0, 240.0, 3.0));
    assert_eq!(command.yaw_rate, 0.0);

    // Above the 0.07 rad edge: recomputed
    let command = policy.compose(&tag_with_yaw(0, 320.0, 240.0, 3.0, 0.5));
    let latched = command.yaw_rate;
    assert!(latched != 0.0);
    assert!(latched.abs() <= 0.2);

    // Inside [-1.0, 0.07]: the last value is sent again, not zero
    for &yaw in [0.05, 0.0, -0.3, -0.99, 0.069].iter() {
        let command = policy.compose(&tag_with_yaw(0, 320.0, 240.0, 3.0, yaw));
        assert_eq!(command.yaw_rate, latched, "yaw {}", yaw);
        assert_eq!(policy.yaw_rate(), latched);
    }

    // Below the -1.0 edge: recomputed again
    let command = policy.compose(&tag_with_yaw(0, 320.0, 240.0, 3.0, -1.3));
    assert!(command.yaw_rate != latched);
}

#[test]
fn channels_of_a_policy_do_not_share_state() {
    let mut policy = TagPolicy::new(TagPolicyConfig::default(), FrameGeometry::default(), 1.0);

    // Centered and at the goal distance: every channel at its setpoint
    let command = policy.compose(&tag(0, 320.0, 240.0, 3.0));
    assert_eq!(command.v_x, 0.0);
    assert_eq!(command.v_y, 0.0);
    assert_eq!(command.v_z, 0.0);

    // Only the vertical offset changes: only the vertical channel reacts
    let command = policy.compose(&tag(0, 320.0, 300.0, 3.0));
    assert_eq!(command.v_x, 0.0);
    assert_eq!(command.v_y, 0.0);
    assert!((command.v_z - (-0.3)).abs() < 1e-12);
}
