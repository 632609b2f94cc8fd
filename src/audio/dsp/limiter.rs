const THRESHOLD: f32 = 0.85;
const CEILING: f32 = 0.98;

/// Soft-knee limiter: linear up to the threshold, then saturates
/// exponentially towards the ceiling.
pub fn limiter(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude <= THRESHOLD {
        return x;
    }
    let knee = CEILING - THRESHOLD;
    let y = CEILING - knee * (-(magnitude - THRESHOLD) / knee).exp();
    y.copysign(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_below_threshold() {
        assert_eq!(limiter(0.5), 0.5);
        assert_eq!(limiter(-0.85), -0.85);
    }

    #[test]
    fn never_exceeds_ceiling() {
        for x in [0.9_f32, 1.5, 4.0, 100.0] {
            assert!(limiter(x) <= CEILING);
            assert!(limiter(-x) >= -CEILING);
            assert!(limiter(x) > THRESHOLD);
        }
    }
}
