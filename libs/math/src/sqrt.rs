//! Integer square root on 256-bit values.

use ethereum_types::U256;

/// Floor of the square root, via the Babylonian method.
///
/// Converges in well under 256 iterations for any input; the loop exits as
/// soon as the estimate stops shrinking.
pub fn integer_sqrt(value: U256) -> U256 {
    if value.is_zero() {
        return U256::zero();
    }
    let mut result = value;
    let mut estimate = value / 2 + 1;
    while estimate < result {
        result = estimate;
        estimate = (value / estimate + estimate) / 2;
    }
    result
}
