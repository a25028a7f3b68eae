//! Exponential functions.

use num_traits::Float;
use rhizome_dew_dispatch::{Number, Operation};

use crate::{componentwise, componentwise2};

pub fn inversesqrt<T: Float>(x: T) -> T {
    T::one() / x.sqrt()
}

pub fn operations() -> Vec<Operation> {
    vec![
        componentwise2("pow", Number::powf),
        componentwise("exp", Number::exp),
        componentwise("log", Number::ln),
        componentwise("exp2", Number::exp2),
        componentwise("log2", Number::log2),
        componentwise("sqrt", Number::sqrt),
        componentwise("inversesqrt", inversesqrt),
    ]
}
