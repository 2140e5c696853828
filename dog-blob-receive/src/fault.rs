use rand::Rng;

/// Fails a configurable percentage of receives, for exercising caller error paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultInjector {
    percent: u8,
}

impl FaultInjector {
    /// `percent` above 100 is treated as 100
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
        }
    }

    /// Injector that never fails
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_enabled(&self) -> bool {
        self.percent > 0
    }

    /// Roll once. True means the caller should fail this operation.
    pub fn should_fail(&self) -> bool {
        self.should_fail_with(&mut rand::thread_rng())
    }

    pub fn should_fail_with<R: Rng>(&self, rng: &mut R) -> bool {
        self.percent > 0 && self.percent > rng.gen_range(0..100u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn zero_percent_never_fails() {
        let faults = FaultInjector::disabled();
        assert!(!faults.is_enabled());
        assert!((0..1_000).all(|_| !faults.should_fail()));
    }

    #[test]
    fn hundred_percent_always_fails() {
        let faults = FaultInjector::new(100);
        assert!((0..1_000).all(|_| faults.should_fail()));
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(FaultInjector::new(250).percent(), 100);
    }

    #[test]
    fn fails_only_below_percent() {
        let faults = FaultInjector::new(30);
        // StepRng::new(0, 0) always yields zero, which maps to a roll of 0.
        assert!(faults.should_fail_with(&mut StepRng::new(0, 0)));
        assert!(!faults.should_fail_with(&mut StepRng::new(u64::MAX, 0)));
    }
}
