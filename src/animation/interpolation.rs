// Keyframe sampling for glTF channels

use crate::model::{Channel, ChannelValues, Interpolation};
use nalgebra_glm as glm;

/// Locate the keyframes surrounding `time`.
/// Returns (before, after, t) with `t` in [0, 1]; before == after at the edges.
fn find_keys(times: &[f32], time: f32) -> (usize, usize, f32) {
    let last = times.len() - 1;
    if time <= times[0] {
        return (0, 0, 0.0);
    }
    if time >= times[last] {
        return (last, last, 0.0);
    }

    // First key strictly after `time`
    let after = times.partition_point(|&k| k <= time);
    let before = after - 1;
    let span = times[after] - times[before];
    let t = if span > 0.0 {
        (time - times[before]) / span
    } else {
        0.0
    };
    (before, after, t)
}

/// Hermite basis with tangents already scaled by the key span.
fn hermite<T>(p0: T, m0: T, p1: T, m1: T, t: f32) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    let t2 = t * t;
    let t3 = t2 * t;
    let h1 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h2 = t3 - 2.0 * t2 + t;
    let h3 = -2.0 * t3 + 3.0 * t2;
    let h4 = t3 - t2;
    p0 * h1 + m0 * h2 + p1 * h3 + m1 * h4
}

fn sample_vec3(times: &[f32], values: &[glm::Vec3], mode: Interpolation, time: f32) -> glm::Vec3 {
    let (before, after, t) = find_keys(times, time);
    match mode {
        Interpolation::Step => values[before],
        Interpolation::Linear => glm::lerp(&values[before], &values[after], t),
        Interpolation::CubicSpline => {
            // Layout per key: in-tangent, value, out-tangent
            let value = |k: usize| values[k * 3 + 1];
            if before == after {
                return value(before);
            }
            let span = times[after] - times[before];
            let out_tan = values[before * 3 + 2] * span;
            let in_tan = values[after * 3] * span;
            hermite(value(before), out_tan, value(after), in_tan, t)
        }
    }
}

fn sample_quat(times: &[f32], values: &[glm::Quat], mode: Interpolation, time: f32) -> glm::Quat {
    let (before, after, t) = find_keys(times, time);
    match mode {
        Interpolation::Step => values[before],
        Interpolation::Linear => {
            if before == after {
                values[before]
            } else {
                glm::quat_slerp(&values[before], &values[after], t)
            }
        }
        Interpolation::CubicSpline => {
            let value = |k: usize| values[k * 3 + 1];
            if before == after {
                return glm::quat_normalize(&value(before));
            }
            let span = times[after] - times[before];
            let p0 = value(before).coords;
            let p1 = value(after).coords;
            let m0 = values[before * 3 + 2].coords * span;
            let m1 = values[after * 3].coords * span;
            let coords = hermite(p0, m0, p1, m1, t);
            glm::quat_normalize(&glm::Quat::from_vector(coords))
        }
    }
}

pub enum Sample {
    Translation(glm::Vec3),
    Rotation(glm::Quat),
    Scale(glm::Vec3),
}

/// Value of a channel at `time`, clamped to the first and last key.
pub fn sample_channel(channel: &Channel, time: f32) -> Option<Sample> {
    if channel.times.is_empty() {
        return None;
    }
    let keys = channel.times.len();
    let expected = match channel.interpolation {
        Interpolation::CubicSpline => keys * 3,
        _ => keys,
    };
    let mode = channel.interpolation;
    match &channel.values {
        ChannelValues::Translation(v) if v.len() >= expected => Some(Sample::Translation(
            sample_vec3(&channel.times, v, mode, time),
        )),
        ChannelValues::Rotation(v) if v.len() >= expected => Some(Sample::Rotation(
            sample_quat(&channel.times, v, mode, time),
        )),
        ChannelValues::Scale(v) if v.len() >= expected => {
            Some(Sample::Scale(sample_vec3(&channel.times, v, mode, time)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation_channel(mode: Interpolation) -> Channel {
        Channel {
            node: 0,
            interpolation: mode,
            times: vec![0.0, 1.0, 2.0],
            values: ChannelValues::Translation(vec![
                glm::vec3(0.0, 0.0, 0.0),
                glm::vec3(2.0, 0.0, 0.0),
                glm::vec3(2.0, 4.0, 0.0),
            ]),
        }
    }

    fn translation_at(channel: &Channel, time: f32) -> glm::Vec3 {
        match sample_channel(channel, time) {
            Some(Sample::Translation(v)) => v,
            _ => panic!("expected translation sample"),
        }
    }

    #[test]
    fn linear_interpolates_between_keys() {
        let ch = translation_channel(Interpolation::Linear);
        assert_eq!(translation_at(&ch, 0.5), glm::vec3(1.0, 0.0, 0.0));
        assert_eq!(translation_at(&ch, 1.5), glm::vec3(2.0, 2.0, 0.0));
    }

    #[test]
    fn clamps_outside_key_range() {
        let ch = translation_channel(Interpolation::Linear);
        assert_eq!(translation_at(&ch, -1.0), glm::vec3(0.0, 0.0, 0.0));
        assert_eq!(translation_at(&ch, 9.0), glm::vec3(2.0, 4.0, 0.0));
    }

    #[test]
    fn step_holds_previous_key() {
        let ch = translation_channel(Interpolation::Step);
        assert_eq!(translation_at(&ch, 0.99), glm::vec3(0.0, 0.0, 0.0));
        assert_eq!(translation_at(&ch, 1.0), glm::vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn cubic_with_zero_tangents_hits_key_values() {
        let zero = glm::vec3(0.0, 0.0, 0.0);
        let ch = Channel {
            node: 0,
            interpolation: Interpolation::CubicSpline,
            times: vec![0.0, 1.0],
            values: ChannelValues::Translation(vec![
                zero,
                glm::vec3(1.0, 0.0, 0.0),
                zero,
                zero,
                glm::vec3(3.0, 0.0, 0.0),
                zero,
            ]),
        };
        assert_eq!(translation_at(&ch, 0.0), glm::vec3(1.0, 0.0, 0.0));
        assert_eq!(translation_at(&ch, 1.0), glm::vec3(3.0, 0.0, 0.0));
        let mid = translation_at(&ch, 0.5);
        assert!((mid.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_slerps() {
        let half = std::f32::consts::FRAC_PI_2;
        let q0 = glm::quat_identity();
        let q1 = glm::quat_angle_axis(half, &glm::vec3(0.0, 1.0, 0.0));
        let ch = Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 1.0],
            values: ChannelValues::Rotation(vec![q0, q1]),
        };
        let Some(Sample::Rotation(q)) = sample_channel(&ch, 0.5) else {
            panic!("expected rotation sample");
        };
        let expected = glm::quat_angle_axis(half / 2.0, &glm::vec3(0.0, 1.0, 0.0));
        assert!(glm::quat_dot(&q, &expected).abs() > 0.9999);
    }

    #[test]
    fn empty_channel_yields_nothing() {
        let ch = Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![],
            values: ChannelValues::Scale(vec![]),
        };
        assert!(sample_channel(&ch, 0.0).is_none());
    }
}
