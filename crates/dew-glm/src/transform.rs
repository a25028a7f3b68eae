//! 4x4 transform and projection builders, right-handed with a -1..1 depth
//! range.
//!
//! Projections return `None` when one of their ranges is empty, so a
//! degenerate frustum produces no outputs instead of a matrix of infinities.

use num_traits::Float;
use rhizome_dew_dispatch::{Candidate, Number, Operation, Quat};

use crate::geometric::{cross, dot, normalize};
use crate::lit;
use crate::matrix::identity;
use crate::quaternion;

type Mat4<T> = [[T; 4]; 4];

// ============================================================================
// Kernels
// ============================================================================

pub fn translate<T: Float>(m: Mat4<T>, v: [T; 3]) -> Mat4<T> {
    let mut out = m;
    out[3] = std::array::from_fn(|r| m[0][r] * v[0] + m[1][r] * v[1] + m[2][r] * v[2] + m[3][r]);
    out
}

pub fn scale<T: Float>(m: Mat4<T>, v: [T; 3]) -> Mat4<T> {
    let mut out = m;
    for (col, s) in out.iter_mut().zip(v) {
        *col = col.map(|x| x * s);
    }
    out
}

/// Rotation of `angle` radians about `axis`, applied after `m`.
pub fn rotate<T: Float>(m: Mat4<T>, angle: T, axis: [T; 3]) -> Mat4<T> {
    let (s, c) = angle.sin_cos();
    let axis = normalize(axis);
    let temp = axis.map(|a| (T::one() - c) * a);

    let r = [
        [
            c + temp[0] * axis[0],
            temp[0] * axis[1] + s * axis[2],
            temp[0] * axis[2] - s * axis[1],
        ],
        [
            temp[1] * axis[0] - s * axis[2],
            c + temp[1] * axis[1],
            temp[1] * axis[2] + s * axis[0],
        ],
        [
            temp[2] * axis[0] + s * axis[1],
            temp[2] * axis[1] - s * axis[0],
            c + temp[2] * axis[2],
        ],
    ];

    let mut out = m;
    for (i, col) in out.iter_mut().take(3).enumerate() {
        *col = std::array::from_fn(|row| {
            m[0][row] * r[i][0] + m[1][row] * r[i][1] + m[2][row] * r[i][2]
        });
    }
    out
}

/// `q` followed by a rotation of `angle` radians about `axis`.
pub fn rotate_quat<T: Float>(q: Quat<T>, angle: T, axis: [T; 3]) -> Quat<T> {
    quaternion::mul(q, quaternion::angle_axis(angle, normalize(axis)))
}

fn nonempty<T: Float>(a: T, b: T) -> Option<T> {
    let d = b - a;
    (d != T::zero() && d.is_finite()).then_some(d)
}

pub fn perspective<T: Float>(fovy: T, aspect: T, near: T, far: T) -> Option<Mat4<T>> {
    let two = lit::<T>(2.0);
    let tan_half = (fovy / two).tan();
    if aspect == T::zero() || tan_half == T::zero() || !tan_half.is_finite() {
        return None;
    }
    let depth = nonempty(near, far)?;
    let mut m = [[T::zero(); 4]; 4];
    m[0][0] = T::one() / (aspect * tan_half);
    m[1][1] = T::one() / tan_half;
    m[2][2] = -(far + near) / depth;
    m[2][3] = -T::one();
    m[3][2] = -(two * far * near) / depth;
    Some(m)
}

/// 2D orthographic projection; depth is passed through negated.
pub fn ortho2d<T: Float>(left: T, right: T, bottom: T, top: T) -> Option<Mat4<T>> {
    let two = lit::<T>(2.0);
    let width = nonempty(left, right)?;
    let height = nonempty(bottom, top)?;
    let mut m = identity::<T, 4, 4>();
    m[0][0] = two / width;
    m[1][1] = two / height;
    m[2][2] = -T::one();
    m[3][0] = -(right + left) / width;
    m[3][1] = -(top + bottom) / height;
    Some(m)
}

pub fn ortho<T: Float>(left: T, right: T, bottom: T, top: T, near: T, far: T) -> Option<Mat4<T>> {
    let depth = nonempty(near, far)?;
    let mut m = ortho2d(left, right, bottom, top)?;
    m[2][2] = -lit::<T>(2.0) / depth;
    m[3][2] = -(far + near) / depth;
    Some(m)
}

pub fn frustum<T: Float>(left: T, right: T, bottom: T, top: T, near: T, far: T) -> Option<Mat4<T>> {
    let two = lit::<T>(2.0);
    let width = nonempty(left, right)?;
    let height = nonempty(bottom, top)?;
    let depth = nonempty(near, far)?;
    let mut m = [[T::zero(); 4]; 4];
    m[0][0] = two * near / width;
    m[1][1] = two * near / height;
    m[2][0] = (right + left) / width;
    m[2][1] = (top + bottom) / height;
    m[2][2] = -(far + near) / depth;
    m[2][3] = -T::one();
    m[3][2] = -(two * far * near) / depth;
    Some(m)
}

pub fn look_at<T: Float>(eye: [T; 3], center: [T; 3], up: [T; 3]) -> Mat4<T> {
    let f = normalize(std::array::from_fn::<T, 3, _>(|i| center[i] - eye[i]));
    let s = normalize(cross(f, up));
    let u = cross(s, f);

    let mut m = identity::<T, 4, 4>();
    for i in 0..3 {
        m[i][0] = s[i];
        m[i][1] = u[i];
        m[i][2] = -f[i];
    }
    m[3][0] = -dot(s, eye);
    m[3][1] = -dot(u, eye);
    m[3][2] = dot(f, eye);
    m
}

// ============================================================================
// Manifest
// ============================================================================

pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new("translate")
            .overload(Candidate::new(translate::<Number>))
            .overload(Candidate::new(|v: [Number; 3]| translate(identity::<Number, 4, 4>(), v))),
        Operation::new("rotate")
            .overload(Candidate::new(rotate::<Number>))
            .overload(Candidate::new(rotate_quat::<Number>))
            .overload(Candidate::new(|angle: Number, axis: [Number; 3]| {
                rotate(identity::<Number, 4, 4>(), angle, axis)
            })),
        Operation::new("scale")
            .overload(Candidate::new(scale::<Number>))
            .overload(Candidate::new(|v: [Number; 3]| scale(identity::<Number, 4, 4>(), v))),
        Operation::new("perspective").overload(Candidate::new(perspective::<Number>)),
        Operation::new("ortho")
            .overload(Candidate::new(ortho2d::<Number>))
            .overload(Candidate::new(ortho::<Number>)),
        Operation::new("frustum").overload(Candidate::new(frustum::<Number>)),
        Operation::new("lookAt").overload(Candidate::new(look_at::<Number>)),
    ]
}

// ============================================================================
// Tests
// ============================================================================
