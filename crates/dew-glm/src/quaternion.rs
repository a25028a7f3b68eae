//! Quaternion kernels, stored `[x, y, z, w]`.
//!
//! The kernels are always compiled since other areas (cross products,
//! constructors, matrix inverse) use them. The quaternion-only operations
//! are registered behind the `quaternion` feature.

use num_traits::Float;
use rhizome_dew_dispatch::Quat;

use crate::geometric::{cross, dot};
use crate::lit;

pub fn identity<T: Float>() -> Quat<T> {
    Quat([T::zero(), T::zero(), T::zero(), T::one()])
}

/// Hamilton product `p * q`.
pub fn mul<T: Float>(p: Quat<T>, q: Quat<T>) -> Quat<T> {
    let [px, py, pz, pw] = p.0;
    let [qx, qy, qz, qw] = q.0;
    Quat([
        pw * qx + px * qw + py * qz - pz * qy,
        pw * qy + py * qw + pz * qx - px * qz,
        pw * qz + pz * qw + px * qy - py * qx,
        pw * qw - px * qx - py * qy - pz * qz,
    ])
}

/// Rotates `v` by `q`.
pub fn rotate_vec<T: Float>(q: Quat<T>, v: [T; 3]) -> [T; 3] {
    let u = q.xyz();
    let uv = cross(u, v);
    let uuv = cross(u, uv);
    let two = lit::<T>(2.0);
    std::array::from_fn(|i| v[i] + (uv[i] * q.w() + uuv[i]) * two)
}

pub fn conjugate<T: Float>(q: Quat<T>) -> Quat<T> {
    Quat([-q.x(), -q.y(), -q.z(), q.w()])
}

pub fn length<T: Float>(q: Quat<T>) -> T {
    dot(q.0, q.0).sqrt()
}

/// Unit quaternion; a zero quaternion normalizes to identity.
pub fn normalize<T: Float>(q: Quat<T>) -> Quat<T> {
    let len = length(q);
    if len <= T::zero() {
        return identity();
    }
    Quat(q.0.map(|c| c / len))
}

/// `None` for the zero quaternion.
pub fn inverse<T: Float>(q: Quat<T>) -> Option<Quat<T>> {
    let d = dot(q.0, q.0);
    if d == T::zero() {
        return None;
    }
    Some(Quat(conjugate(q).0.map(|c| c / d)))
}

/// Rotation angle in radians.
pub fn angle<T: Float>(q: Quat<T>) -> T {
    let two = lit::<T>(2.0);
    if q.w().abs() > lit::<T>(0.5).cos() {
        let a = dot(q.xyz(), q.xyz()).sqrt().asin() * two;
        if q.w() < T::zero() {
            return lit::<T>(std::f64::consts::PI) * two - a;
        }
        return a;
    }
    q.w().acos() * two
}

/// Rotation axis; `(0, 0, 1)` when the rotation is the identity.
pub fn axis<T: Float>(q: Quat<T>) -> [T; 3] {
    let t = T::one() - q.w() * q.w();
    if t <= T::zero() {
        return [T::zero(), T::zero(), T::one()];
    }
    let s = T::one() / t.sqrt();
    q.xyz().map(|c| c * s)
}

pub fn angle_axis<T: Float>(angle: T, axis: [T; 3]) -> Quat<T> {
    let half = angle * lit::<T>(0.5);
    let s = half.sin();
    Quat([axis[0] * s, axis[1] * s, axis[2] * s, half.cos()])
}

fn spherical<T: Float>(x: Quat<T>, y: Quat<T>, a: T, cos_theta: T) -> Quat<T> {
    if cos_theta > T::one() - T::epsilon() {
        return Quat(std::array::from_fn(|i| x.0[i] * (T::one() - a) + y.0[i] * a));
    }
    let angle = cos_theta.acos();
    let (sx, sy, s) = (((T::one() - a) * angle).sin(), (a * angle).sin(), angle.sin());
    Quat(std::array::from_fn(|i| (sx * x.0[i] + sy * y.0[i]) / s))
}

/// Spherical interpolation without taking the short path.
pub fn mix<T: Float>(x: Quat<T>, y: Quat<T>, a: T) -> Quat<T> {
    spherical(x, y, a, dot(x.0, y.0))
}

/// Spherical interpolation along the shortest arc.
pub fn slerp<T: Float>(x: Quat<T>, y: Quat<T>, a: T) -> Quat<T> {
    let cos_theta = dot(x.0, y.0);
    if cos_theta < T::zero() {
        spherical(x, Quat(y.0.map(|c| -c)), a, -cos_theta)
    } else {
        spherical(x, y, a, cos_theta)
    }
}

/// `(pitch, yaw, roll)` in radians.
pub fn euler_angles<T: Float>(q: Quat<T>) -> [T; 3] {
    let [x, y, z, w] = q.0;
    let two = lit::<T>(2.0);

    let py = two * (y * z + w * x);
    let px = w * w - x * x - y * y + z * z;
    let pitch = if px.abs() < T::epsilon() && py.abs() < T::epsilon() {
        two * x.atan2(w)
    } else {
        py.atan2(px)
    };
    let yaw = (-two * (x * z - w * y)).max(-T::one()).min(T::one()).asin();
    let roll = (two * (x * y + w * z)).atan2(w * w + x * x - y * y - z * z);
    [pitch, yaw, roll]
}

/// Quaternion from `(pitch, yaw, roll)` in radians.
pub fn from_euler<T: Float>(angles: [T; 3]) -> Quat<T> {
    let half = lit::<T>(0.5);
    let c = angles.map(|a| (a * half).cos());
    let s = angles.map(|a| (a * half).sin());
    Quat([
        s[0] * c[1] * c[2] - c[0] * s[1] * s[2],
        c[0] * s[1] * c[2] + s[0] * c[1] * s[2],
        c[0] * c[1] * s[2] - s[0] * s[1] * c[2],
        c[0] * c[1] * c[2] + s[0] * s[1] * s[2],
    ])
}

/// Shortest rotation taking direction `u` to direction `v`.
pub fn from_vectors<T: Float>(u: [T; 3], v: [T; 3]) -> Quat<T> {
    let norm = (dot(u, u) * dot(v, v)).sqrt();
    let mut real = norm + dot(u, v);
    let t = if real < lit::<T>(1e-6) * norm {
        // Opposite directions: rotate 180 degrees about any orthogonal axis.
        real = T::zero();
        if u[0].abs() > u[2].abs() {
            [-u[1], u[0], T::zero()]
        } else {
            [T::zero(), -u[2], u[1]]
        }
    } else {
        cross(u, v)
    };
    normalize(Quat([t[0], t[1], t[2], real]))
}

pub fn to_mat3<T: Float>(q: Quat<T>) -> [[T; 3]; 3] {
    let [x, y, z, w] = q.0;
    let (one, two) = (T::one(), lit::<T>(2.0));
    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);
    [
        [one - two * (yy + zz), two * (xy + wz), two * (xz - wy)],
        [two * (xy - wz), one - two * (xx + zz), two * (yz + wx)],
        [two * (xz + wy), two * (yz - wx), one - two * (xx + yy)],
    ]
}

pub fn to_mat4<T: Float>(q: Quat<T>) -> [[T; 4]; 4] {
    let m = to_mat3(q);
    let (zero, one) = (T::zero(), T::one());
    [
        [m[0][0], m[0][1], m[0][2], zero],
        [m[1][0], m[1][1], m[1][2], zero],
        [m[2][0], m[2][1], m[2][2], zero],
        [zero, zero, zero, one],
    ]
}

/// Rotation part of a 3x3 matrix, picking the numerically largest component
/// first.
pub fn from_mat3<T: Float>(m: [[T; 3]; 3]) -> Quat<T> {
    let four_x = m[0][0] - m[1][1] - m[2][2];
    let four_y = m[1][1] - m[0][0] - m[2][2];
    let four_z = m[2][2] - m[0][0] - m[1][1];
    let four_w = m[0][0] + m[1][1] + m[2][2];

    let mut biggest = 0;
    let mut biggest_value = four_w;
    for (i, v) in [four_x, four_y, four_z].into_iter().enumerate() {
        if v > biggest_value {
            biggest = i + 1;
            biggest_value = v;
        }
    }
    let big = (biggest_value + T::one()).sqrt() * lit::<T>(0.5);
    let mult = lit::<T>(0.25) / big;

    match biggest {
        0 => Quat([
            (m[1][2] - m[2][1]) * mult,
            (m[2][0] - m[0][2]) * mult,
            (m[0][1] - m[1][0]) * mult,
            big,
        ]),
        1 => Quat([
            big,
            (m[0][1] + m[1][0]) * mult,
            (m[2][0] + m[0][2]) * mult,
            (m[1][2] - m[2][1]) * mult,
        ]),
        2 => Quat([
            (m[0][1] + m[1][0]) * mult,
            big,
            (m[1][2] + m[2][1]) * mult,
            (m[2][0] - m[0][2]) * mult,
        ]),
        _ => Quat([
            (m[2][0] + m[0][2]) * mult,
            (m[1][2] + m[2][1]) * mult,
            big,
            (m[0][1] - m[1][0]) * mult,
        ]),
    }
}

pub fn from_mat4<T: Float>(m: [[T; 4]; 4]) -> Quat<T> {
    from_mat3(std::array::from_fn(|c| [m[c][0], m[c][1], m[c][2]]))
}

#[cfg(feature = "quaternion")]
pub fn operations() -> Vec<rhizome_dew_dispatch::Operation> {
    use rhizome_dew_dispatch::{Candidate, Number, Operation};

    vec![
        Operation::new("conjugate").overload(Candidate::new(conjugate::<Number>)),
        Operation::new("angle").overload(Candidate::new(angle::<Number>)),
        Operation::new("axis").overload(Candidate::new(axis::<Number>)),
        Operation::new("angleAxis").overload(Candidate::new(angle_axis::<Number>)),
        Operation::new("slerp").overload(Candidate::new(slerp::<Number>)),
        Operation::new("eulerAngles").overload(Candidate::new(euler_angles::<Number>)),
        Operation::new("mat3_cast").overload(Candidate::new(to_mat3::<Number>)),
        Operation::new("mat4_cast").overload(Candidate::new(to_mat4::<Number>)),
        Operation::new("quat_cast")
            .overload(Candidate::new(from_mat3::<Number>))
            .overload(Candidate::new(from_mat4::<Number>)),
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_quat_close(a: Quat, b: Quat) {
        for i in 0..4 {
            assert!((a.0[i] - b.0[i]).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    fn assert_vec_close(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_identity_is_neutral() {
        let q = Quat([0.1, 0.2, 0.3, 0.9]);
        assert_eq!(mul(identity(), q), q);
        assert_eq!(mul(q, identity()), q);
    }

    #[test]
    fn test_rotate_vec_quarter_turn() {
        let q = angle_axis(FRAC_PI_2, [0.0, 0.0, 1.0]);
        assert_vec_close(rotate_vec(q, [1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
        assert!((angle(q) - FRAC_PI_2).abs() < 1e-9);
        assert_vec_close(axis(q), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_inverse() {
        let q = Quat([1.0, 2.0, 3.0, 4.0]);
        let inv = inverse(q).unwrap();
        assert_quat_close(mul(q, inv), identity());
        assert_eq!(inverse(Quat([0.0; 4])), None);
    }

    #[test]
    fn test_matrix_round_trip() {
        let q = normalize(Quat([0.3, -0.5, 0.1, 0.8]));
        assert_quat_close(from_mat3(to_mat3(q)), q);
        assert_quat_close(from_mat4(to_mat4(q)), q);
        // Half turn exercises a non-w branch.
        let half_turn = angle_axis(PI, [1.0, 0.0, 0.0]);
        assert_quat_close(from_mat3(to_mat3(half_turn)), half_turn);
    }

    #[test]
    fn test_euler_round_trip() {
        let angles = [0.3, -0.4, 1.1];
        assert_vec_close(euler_angles(from_euler(angles)), angles);
    }

    #[test]
    fn test_slerp_halfway() {
        let a = identity();
        let b = angle_axis(FRAC_PI_2, [0.0, 1.0, 0.0]);
        let mid = slerp(a, b, 0.5);
        assert!((angle(mid) - FRAC_PI_2 / 2.0).abs() < 1e-9);
        // Opposite hemisphere takes the short path.
        let far = Quat(b.0.map(|c| -c));
        assert_quat_close(slerp(a, far, 0.5), mid);
    }

    #[test]
    fn test_from_vectors() {
        let q = from_vectors([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_vec_close(rotate_vec(q, [1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
        let flip = from_vectors([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]);
        assert_vec_close(rotate_vec(flip, [1.0, 0.0, 0.0]), [-1.0, 0.0, 0.0]);
    }

    #[cfg(feature = "quaternion")]
    #[test]
    fn test_dispatch() {
        use crate::test_support::{assert_close, call};
        use rhizome_dew_dispatch::Value;

        let q = Value::Quat(angle_axis(FRAC_PI_2, [0.0, 0.0, 1.0]));
        let out = call("angle", [q.clone()]).unwrap();
        assert_close(&out[0], &Value::Float(FRAC_PI_2), "angle");

        let out = call("mat3_cast", [q.clone()]).unwrap();
        let back = call("quat_cast", out).unwrap();
        assert_close(&back[0], &q, "quat_cast");

        let out =
            call("angleAxis", [Value::Float(FRAC_PI_2), Value::from([0.0, 0.0, 1.0])]).unwrap();
        assert_close(&out[0], &q, "angleAxis");
    }
}
