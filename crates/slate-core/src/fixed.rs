use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Used for agent speed (cells per second) so movement math is identical on
/// every platform.
pub type Fixed64 = I32F32;

/// Convert an f64 to Fixed64. Use only for initialization and config input.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a value to be non-negative.
#[inline]
pub fn non_negative(v: Fixed64) -> Fixed64 {
    v.max(Fixed64::ZERO)
}
