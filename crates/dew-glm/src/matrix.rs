//! Matrix functions. Matrices are `[[T; R]; C]`: `C` columns of `R` rows.

use num_traits::Float;
use rhizome_dew_dispatch::{Candidate, Number, Operation, Quat};

use crate::geometric::{cross, dot, length};
use crate::{lit, quaternion};

// ============================================================================
// Kernels
// ============================================================================

pub fn transpose<T: Copy, const C: usize, const R: usize>(m: [[T; R]; C]) -> [[T; C]; R] {
    std::array::from_fn(|r| std::array::from_fn(|c| m[c][r]))
}

pub fn comp_mult<T: Float, const C: usize, const R: usize>(
    a: [[T; R]; C],
    b: [[T; R]; C],
) -> [[T; R]; C] {
    std::array::from_fn(|c| std::array::from_fn(|r| a[c][r] * b[c][r]))
}

/// `c * r^T`: `len(r)` columns of `len(c)` rows.
pub fn outer_product<T: Float, const C: usize, const R: usize>(
    c: [T; C],
    r: [T; R],
) -> [[T; C]; R] {
    std::array::from_fn(|i| std::array::from_fn(|j| c[j] * r[i]))
}

pub fn identity<T: Float, const C: usize, const R: usize>() -> [[T; R]; C] {
    std::array::from_fn(|c| std::array::from_fn(|r| if c == r { T::one() } else { T::zero() }))
}

pub fn mul_vec<T: Float, const C: usize, const R: usize>(m: [[T; R]; C], v: [T; C]) -> [T; R] {
    std::array::from_fn(|r| (0..C).fold(T::zero(), |acc, c| acc + m[c][r] * v[c]))
}

/// `m` with column `col` and row `row` removed. `M` must be `N - 1`.
fn minor<T: Float, const N: usize, const M: usize>(
    m: &[[T; N]; N],
    col: usize,
    row: usize,
) -> [[T; M]; M] {
    let mut out = [[T::zero(); M]; M];
    for (oc, c) in (0..N).filter(|&c| c != col).enumerate() {
        for (or, r) in (0..N).filter(|&r| r != row).enumerate() {
            out[oc][or] = m[c][r];
        }
    }
    out
}

fn checkerboard<T: Float>(c: usize, r: usize) -> T {
    if (c + r) % 2 == 0 {
        T::one()
    } else {
        -T::one()
    }
}

/// Square matrices: determinant and inverse.
pub trait Square<T>: Sized {
    fn determinant(&self) -> T;

    /// `None` when the matrix is singular.
    fn inverse(&self) -> Option<Self>;
}

fn invertible<T: Float>(det: T) -> Option<T> {
    (det != T::zero() && det.is_finite()).then_some(det)
}

impl<T: Float> Square<T> for [[T; 2]; 2] {
    fn determinant(&self) -> T {
        self[0][0] * self[1][1] - self[1][0] * self[0][1]
    }

    fn inverse(&self) -> Option<Self> {
        let det = invertible(self.determinant())?;
        Some([
            [self[1][1] / det, -self[0][1] / det],
            [-self[1][0] / det, self[0][0] / det],
        ])
    }
}

impl<T: Float> Square<T> for [[T; 3]; 3] {
    fn determinant(&self) -> T {
        (0..3).fold(T::zero(), |acc, c| {
            acc + checkerboard::<T>(c, 0) * self[c][0] * minor::<T, 3, 2>(self, c, 0).determinant()
        })
    }

    fn inverse(&self) -> Option<Self> {
        let det = invertible(self.determinant())?;
        Some(std::array::from_fn(|c| {
            std::array::from_fn(|r| {
                checkerboard::<T>(c, r) * minor::<T, 3, 2>(self, r, c).determinant() / det
            })
        }))
    }
}

impl<T: Float> Square<T> for [[T; 4]; 4] {
    fn determinant(&self) -> T {
        (0..4).fold(T::zero(), |acc, c| {
            acc + checkerboard::<T>(c, 0) * self[c][0] * minor::<T, 4, 3>(self, c, 0).determinant()
        })
    }

    fn inverse(&self) -> Option<Self> {
        let det = invertible(self.determinant())?;
        Some(std::array::from_fn(|c| {
            std::array::from_fn(|r| {
                checkerboard::<T>(c, r) * minor::<T, 4, 3>(self, r, c).determinant() / det
            })
        }))
    }
}

/// Result of [`decompose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed<T> {
    pub scale: [T; 3],
    pub orientation: Quat<T>,
    pub translation: [T; 3],
    pub skew: [T; 3],
    pub perspective: [T; 4],
}

fn combine<T: Float>(a: [T; 3], b: [T; 3], sa: T, sb: T) -> [T; 3] {
    std::array::from_fn(|i| a[i] * sa + b[i] * sb)
}

fn rescale<T: Float>(v: [T; 3], to: T) -> [T; 3] {
    let len = length(v);
    v.map(|x| x * to / len)
}

/// Splits an affine (optionally projective) transform into its parts.
/// `None` when the matrix is degenerate.
pub fn decompose<T: Float>(m: [[T; 4]; 4]) -> Option<Decomposed<T>> {
    let (zero, one) = (T::zero(), T::one());
    if m[3][3] == zero {
        return None;
    }
    let w = m[3][3];
    let mut local = m.map(|col| col.map(|x| x / w));

    let mut perspective_matrix = local;
    for col in perspective_matrix.iter_mut().take(3) {
        col[3] = zero;
    }
    perspective_matrix[3][3] = one;
    if perspective_matrix.determinant() == zero {
        return None;
    }

    let perspective = if local[0][3] != zero || local[1][3] != zero || local[2][3] != zero {
        let rhs = [local[0][3], local[1][3], local[2][3], local[3][3]];
        let inverse = perspective_matrix.inverse()?;
        for col in local.iter_mut().take(3) {
            col[3] = zero;
        }
        local[3][3] = one;
        mul_vec(transpose(inverse), rhs)
    } else {
        [zero, zero, zero, one]
    };

    let translation = [local[3][0], local[3][1], local[3][2]];

    let mut row: [[T; 3]; 3] = std::array::from_fn(|i| [local[i][0], local[i][1], local[i][2]]);
    let mut scale = [zero; 3];
    let mut skew = [zero; 3];

    scale[0] = length(row[0]);
    row[0] = rescale(row[0], one);

    skew[2] = dot(row[0], row[1]);
    row[1] = combine(row[1], row[0], one, -skew[2]);
    scale[1] = length(row[1]);
    row[1] = rescale(row[1], one);
    skew[2] = skew[2] / scale[1];

    skew[1] = dot(row[0], row[2]);
    row[2] = combine(row[2], row[0], one, -skew[1]);
    skew[0] = dot(row[1], row[2]);
    row[2] = combine(row[2], row[1], one, -skew[0]);
    scale[2] = length(row[2]);
    row[2] = rescale(row[2], one);
    skew[1] = skew[1] / scale[2];
    skew[0] = skew[0] / scale[2];

    // A left-handed basis means one axis is mirrored.
    if dot(row[0], cross(row[1], row[2])) < zero {
        scale = scale.map(|s| -s);
        row = row.map(|r| r.map(|x| -x));
    }

    let half = lit::<T>(0.5);
    let trace = row[0][0] + row[1][1] + row[2][2];
    let orientation = if trace > zero {
        let root = (trace + one).sqrt();
        let s = half / root;
        Quat([
            s * (row[1][2] - row[2][1]),
            s * (row[2][0] - row[0][2]),
            s * (row[0][1] - row[1][0]),
            half * root,
        ])
    } else {
        let mut i = 0;
        if row[1][1] > row[0][0] {
            i = 1;
        }
        if row[2][2] > row[i][i] {
            i = 2;
        }
        let j = (i + 1) % 3;
        let k = (j + 1) % 3;
        let root = (row[i][i] - row[j][j] - row[k][k] + one).sqrt();
        let s = half / root;
        let mut q = [zero; 4];
        q[i] = half * root;
        q[j] = s * (row[i][j] + row[j][i]);
        q[k] = s * (row[i][k] + row[k][i]);
        q[3] = s * (row[j][k] - row[k][j]);
        Quat(q)
    };

    Some(Decomposed {
        scale,
        orientation,
        translation,
        skew,
        perspective,
    })
}

// ============================================================================
// Manifest
// ============================================================================

macro_rules! each_shape {
    ($c:ident, $r:ident => $body:expr) => {
        [
            { const $c: usize = 2; const $r: usize = 2; $body },
            { const $c: usize = 2; const $r: usize = 3; $body },
            { const $c: usize = 2; const $r: usize = 4; $body },
            { const $c: usize = 3; const $r: usize = 2; $body },
            { const $c: usize = 3; const $r: usize = 3; $body },
            { const $c: usize = 3; const $r: usize = 4; $body },
            { const $c: usize = 4; const $r: usize = 2; $body },
            { const $c: usize = 4; const $r: usize = 3; $body },
            { const $c: usize = 4; const $r: usize = 4; $body },
        ]
    };
}

pub(crate) use each_shape;

pub fn operations() -> Vec<Operation> {
    vec![
        Operation::new("transpose")
            .overloads(each_shape!(C, R => Candidate::new(transpose::<Number, C, R>))),
        Operation::new("matrixCompMult")
            .overloads(each_shape!(C, R => Candidate::new(comp_mult::<Number, C, R>))),
        Operation::new("outerProduct")
            .overloads(each_shape!(C, R => Candidate::new(outer_product::<Number, C, R>))),
        Operation::new("determinant")
            .overload(Candidate::new(|m: [[Number; 2]; 2]| m.determinant()))
            .overload(Candidate::new(|m: [[Number; 3]; 3]| m.determinant()))
            .overload(Candidate::new(|m: [[Number; 4]; 4]| m.determinant())),
        Operation::new("inverse")
            .expects("quaternion or symmetric matrix expected")
            .overload(Candidate::new(|m: [[Number; 2]; 2]| m.inverse()))
            .overload(Candidate::new(|m: [[Number; 3]; 3]| m.inverse()))
            .overload(Candidate::new(|m: [[Number; 4]; 4]| m.inverse()))
            .overload(Candidate::new(quaternion::inverse::<Number>)),
        Operation::new("decompose").overload(Candidate::new(|m: [[Number; 4]; 4]| {
            decompose(m).map(|d| (d.scale, d.orientation, d.translation, d.skew, d.perspective))
        })),
    ]
}

// ============================================================================
// Tests
// ============================================================================
