//! Angle and trigonometric functions.

use num_traits::Float;
use rhizome_dew_dispatch::{Candidate, Number, Operation};

use crate::{componentwise, map2};

pub fn radians<T: Float>(degrees: T) -> T {
    degrees.to_radians()
}

pub fn degrees<T: Float>(radians: T) -> T {
    radians.to_degrees()
}

pub fn operations() -> Vec<Operation> {
    vec![
        componentwise("radians", radians),
        componentwise("degrees", degrees),
        componentwise("sin", Number::sin),
        componentwise("cos", Number::cos),
        componentwise("tan", Number::tan),
        componentwise("asin", Number::asin),
        componentwise("acos", Number::acos),
        componentwise("sinh", Number::sinh),
        componentwise("cosh", Number::cosh),
        componentwise("tanh", Number::tanh),
        componentwise("asinh", Number::asinh),
        componentwise("acosh", Number::acosh),
        componentwise("atanh", Number::atanh),
        // Two arguments is atan2(y, x).
        Operation::new("atan")
            .overload(Candidate::new(Number::atan2))
            .overloads(per_dim!(N => Candidate::new(
                |y: [Number; N], x: [Number; N]| map2(y, x, Number::atan2)
            )))
            .overload(Candidate::new(Number::atan))
            .overloads(per_dim!(N => Candidate::new(|v: [Number; N]| v.map(Number::atan)))),
    ]
}
