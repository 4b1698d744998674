/// GSAP's default ease, `power1.out`. `progress` is clamped to 0..=1.
pub fn power1_out(progress: f32) -> f32 {
    let t = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        assert_eq!(power1_out(0.0), 0.0);
        assert_eq!(power1_out(1.0), 1.0);
        assert_eq!(power1_out(-3.0), 0.0);
        assert_eq!(power1_out(7.0), 1.0);
    }

    #[test]
    fn power1_out_decelerates() {
        assert_eq!(power1_out(0.5), 0.75);
        assert!(power1_out(0.25) > 0.25);
        assert!(power1_out(0.9) - power1_out(0.8) < power1_out(0.2) - power1_out(0.1));
    }
}
