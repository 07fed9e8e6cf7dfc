pub const DEFAULT_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Finds a root of `f` in `[a, b]` by bisection.
///
/// The bracket must contain a sign change; `f(a) * f(b) >= 0` returns `None`
/// (no root, or an even number of roots). `None` also covers running out of
/// iterations, so callers cannot tell the two apart.
pub fn bisect<F>(f: F, a: f64, b: f64, tolerance: f64, max_iterations: u32) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let mut a = a;
    let mut b = b;

    if f(a) * f(b) >= 0.0 {
        return None;
    }

    for _ in 0..max_iterations {
        let c = (a + b) / 2.0;
        // Two independent stopping criteria: small residual or small bracket.
        if f(c).abs() < tolerance || (b - a) / 2.0 < tolerance {
            return Some(c);
        }
        if f(c) * f(a) < 0.0 {
            b = c;
        } else {
            a = c;
        }
    }

    None
}
