//! Geometric functions over vectors and quaternions.

use num_traits::Float;
use rhizome_dew_dispatch::{Candidate, Number, Operation, Quat};

use crate::{lit, quaternion};

// ============================================================================
// Kernels
// ============================================================================

pub fn dot<T: Float, const N: usize>(a: [T; N], b: [T; N]) -> T {
    a.iter().zip(b.iter()).fold(T::zero(), |acc, (x, y)| acc + *x * *y)
}

pub fn length<T: Float, const N: usize>(v: [T; N]) -> T {
    dot(v, v).sqrt()
}

pub fn distance<T: Float, const N: usize>(a: [T; N], b: [T; N]) -> T {
    length(std::array::from_fn::<T, N, _>(|i| a[i] - b[i]))
}

/// Unit vector. A zero vector gives NaN components.
pub fn normalize<T: Float, const N: usize>(v: [T; N]) -> [T; N] {
    let inv = T::one() / length(v);
    v.map(|x| x * inv)
}

pub fn cross<T: Float>(a: [T; 3], b: [T; 3]) -> [T; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// z component of the 3D cross product of two vectors in the xy plane.
pub fn cross2<T: Float>(a: [T; 2], b: [T; 2]) -> T {
    a[0] * b[1] - a[1] * b[0]
}

/// `n` if it faces against `i` (judged by `nref`), otherwise `-n`.
pub fn faceforward<T: Float, const N: usize>(n: [T; N], i: [T; N], nref: [T; N]) -> [T; N] {
    if dot(nref, i) < T::zero() {
        n
    } else {
        n.map(|x| -x)
    }
}

pub fn reflect<T: Float, const N: usize>(i: [T; N], n: [T; N]) -> [T; N] {
    let d = lit::<T>(2.0) * dot(n, i);
    std::array::from_fn(|k| i[k] - d * n[k])
}

/// Refraction direction; zero on total internal reflection.
pub fn refract<T: Float, const N: usize>(i: [T; N], n: [T; N], eta: T) -> [T; N] {
    let d = dot(n, i);
    let k = T::one() - eta * eta * (T::one() - d * d);
    if k < T::zero() {
        return [T::zero(); N];
    }
    let s = eta * d + k.sqrt();
    std::array::from_fn(|c| eta * i[c] - s * n[c])
}

// ============================================================================
// Manifest
// ============================================================================

pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new("length")
            .overloads(per_dim!(N => Candidate::new(length::<Number, N>)))
            .overload(Candidate::new(quaternion::length::<Number>)),
        Operation::new("distance").overloads(per_dim!(N => Candidate::new(distance::<Number, N>))),
        Operation::new("dot")
            .overloads(per_dim!(N => Candidate::new(dot::<Number, N>)))
            .overload(Candidate::new(|a: Quat, b: Quat| dot(a.0, b.0))),
        Operation::new("normalize")
            .overloads(per_dim!(N => Candidate::new(normalize::<Number, N>)))
            .overload(Candidate::new(quaternion::normalize::<Number>)),
        Operation::new("cross")
            .expects("vector or quaternion expected")
            .overload(Candidate::new(cross::<Number>))
            .overload(Candidate::new(cross2::<Number>))
            .overload(Candidate::new(quaternion::mul::<Number>))
            .overload(Candidate::new(quaternion::rotate_vec::<Number>))
            .overload(Candidate::new(|v: [Number; 3], q: Quat| {
                quaternion::inverse(q).map(|inv| quaternion::rotate_vec(inv, v))
            })),
        Operation::new("faceforward")
            .overloads(per_dim!(N => Candidate::new(faceforward::<Number, N>))),
        Operation::new("reflect").overloads(per_dim!(N => Candidate::new(reflect::<Number, N>))),
        Operation::new("refract").overloads(per_dim!(N => Candidate::new(refract::<Number, N>))),
    ]
}

// ============================================================================
// Tests
// ============================================================================
