/// Default maximum narration length, in seconds, for a short-form clip.
pub const DEFAULT_CEILING: f64 = 58.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Skip,
}

/// Decides whether a narration is short enough to be rendered.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionFilter {
    ceiling: f64,
}

impl AdmissionFilter {
    pub fn new(ceiling: f64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn admit(&self, duration: f64) -> Admission {
        if duration >= self.ceiling {
            Admission::Skip
        } else {
            Admission::Accept
        }
    }
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_is_exclusive() {
        let filter = AdmissionFilter::default();

        assert_eq!(filter.admit(58.0), Admission::Skip);
        // largest f64 below the ceiling
        let just_below = f64::from_bits(58.0_f64.to_bits() - 1);
        assert_eq!(filter.admit(just_below), Admission::Accept);
        assert_eq!(filter.admit(57.5), Admission::Accept);
        assert_eq!(filter.admit(120.0), Admission::Skip);
    }

    #[test]
    fn test_custom_ceiling() {
        let filter = AdmissionFilter::new(10.0);
        assert_eq!(filter.admit(9.99), Admission::Accept);
        assert_eq!(filter.admit(10.0), Admission::Skip);
    }
}
