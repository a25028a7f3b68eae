//! Ray intersection tests. A miss is `None`, which dispatches as no outputs.

use num_traits::Float;
use rhizome_dew_dispatch::{Candidate, Number, Operation};

use crate::geometric::{cross, dot};

fn sub<T: Float, const N: usize>(a: [T; N], b: [T; N]) -> [T; N] {
    std::array::from_fn(|i| a[i] - b[i])
}

/// Distance along `dir` to the plane, when the hit is in front of `origin`.
pub fn ray_plane<T: Float, const N: usize>(
    origin: [T; N],
    dir: [T; N],
    plane_origin: [T; N],
    plane_normal: [T; N],
) -> Option<T> {
    let d = dot(dir, plane_normal);
    if d.abs() <= T::epsilon() {
        return None;
    }
    let distance = dot(sub(plane_origin, origin), plane_normal) / d;
    (distance > T::zero()).then_some(distance)
}

/// Distance along the unit vector `dir` to the sphere surface. Takes the
/// squared radius.
pub fn ray_sphere<T: Float, const N: usize>(
    start: [T; N],
    dir: [T; N],
    center: [T; N],
    radius_squared: T,
) -> Option<T> {
    let eps = T::epsilon();
    let diff = sub(center, start);
    let t0 = dot(diff, dir);
    let d_squared = dot(diff, diff) - t0 * t0;
    if d_squared > radius_squared {
        return None;
    }
    let t1 = (radius_squared - d_squared).sqrt();
    let distance = if t0 > t1 + eps { t0 - t1 } else { t0 + t1 };
    (distance > eps).then_some(distance)
}

/// Möller-Trumbore. Returns the barycentric position of the hit (weights of
/// `v1` and `v2`) and the distance along `dir`. Hits behind `origin` miss.
pub fn ray_triangle<T: Float>(
    origin: [T; 3],
    dir: [T; 3],
    v0: [T; 3],
    v1: [T; 3],
    v2: [T; 3],
) -> Option<([T; 2], T)> {
    let eps = T::epsilon();
    let e1 = sub(v1, v0);
    let e2 = sub(v2, v0);
    let p = cross(dir, e2);
    let det = dot(e1, p);
    if det.abs() <= eps {
        return None;
    }

    let t = sub(origin, v0);
    let q = cross(t, e1);
    let u = dot(t, p);
    let v = dot(dir, q);
    let outside = if det > T::zero() {
        u < T::zero() || u > det || v < T::zero() || u + v > det
    } else {
        u > T::zero() || u < det || v > T::zero() || u + v < det
    };
    if outside {
        return None;
    }

    let inv = T::one() / det;
    let distance = dot(e2, q) * inv;
    (distance >= T::zero()).then_some(([u * inv, v * inv], distance))
}

pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new("intersectRayPlane")
            .overloads(per_dim!(N => Candidate::new(ray_plane::<Number, N>))),
        Operation::new("intersectRaySphere")
            .overloads(per_dim!(N => Candidate::new(ray_sphere::<Number, N>))),
        Operation::new("intersectRayTriangle").overload(Candidate::new(ray_triangle::<Number>)),
    ]
}
