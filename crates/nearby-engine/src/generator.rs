//! Response Generator: simulated provider answers
//!
//! A single uniform draw `r` in [0, 1) decides the outcome:
//!
//! ```text
//! r > confirm_threshold                      → Confirmed(message)
//! reject_threshold < r <= confirm_threshold  → Rejected
//! r <= reject_threshold                      → NoResponse
//! ```
//!
//! With the default thresholds (0.3 / 0.1) that is roughly 70% / 20% / 10%.

use nearby_core::{EngineConfig, ProviderKind, ProviderResponse};
use rand::seq::SliceRandom;
use rand::Rng;

pub const PRODUCT_MESSAGES: [&str; 4] = [
    "We have this item in stock and ready for pickup!",
    "This product is available. Would you like us to hold it for you?",
    "Item available for same-day pickup or delivery.",
    "We have 5 units available. Come visit us!",
];

pub const SERVICE_MESSAGES: [&str; 4] = [
    "We're available today! When would you like us to come by?",
    "We can help with this! Call us to schedule a time.",
    "Our team is ready to assist you. Please call to confirm.",
    "We have an opening this afternoon if you need immediate service.",
];

/// Confirmation messages for a request type
pub fn messages_for(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Product => &PRODUCT_MESSAGES,
        ProviderKind::Service => &SERVICE_MESSAGES,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed(String),
    Rejected,
    NoResponse,
}

impl Outcome {
    /// The overlay to write, `None` for a provider that stays silent
    pub fn into_response(self) -> Option<ProviderResponse> {
        match self {
            Outcome::Confirmed(message) => Some(ProviderResponse::Confirmed { message }),
            Outcome::Rejected => Some(ProviderResponse::Rejected),
            Outcome::NoResponse => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseGenerator {
    confirm_threshold: f64,
    reject_threshold: f64,
}

impl ResponseGenerator {
    pub fn new(confirm_threshold: f64, reject_threshold: f64) -> Self {
        Self {
            confirm_threshold,
            reject_threshold,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.confirm_threshold, config.reject_threshold)
    }

    /// Draw an outcome for one provider of a request of type `kind`.
    ///
    /// All randomness comes from `rng`; the generator itself holds no state.
    pub fn generate<R: Rng + ?Sized>(&self, kind: ProviderKind, rng: &mut R) -> Outcome {
        let r: f64 = rng.gen();
        if r > self.confirm_threshold {
            let message = messages_for(kind)
                .choose(rng)
                .copied()
                .unwrap_or_default();
            Outcome::Confirmed(message.to_string())
        } else if r > self.reject_threshold {
            Outcome::Rejected
        } else {
            Outcome::NoResponse
        }
    }
}

impl Default for ResponseGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLES: usize = 10_000;

    fn rates(kind: ProviderKind, seed: u64) -> (f64, f64, f64) {
        let generator = ResponseGenerator::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut confirmed, mut rejected, mut silent) = (0usize, 0usize, 0usize);

        for _ in 0..SAMPLES {
            match generator.generate(kind, &mut rng) {
                Outcome::Confirmed(message) => {
                    assert!(messages_for(kind).contains(&message.as_str()));
                    confirmed += 1;
                }
                Outcome::Rejected => rejected += 1,
                Outcome::NoResponse => silent += 1,
            }
        }

        let n = SAMPLES as f64;
        (confirmed as f64 / n, rejected as f64 / n, silent as f64 / n)
    }

    #[test]
    fn test_product_distribution() {
        let (confirmed, rejected, silent) = rates(ProviderKind::Product, 7);
        assert!((0.65..=0.75).contains(&confirmed), "confirmed rate {}", confirmed);
        assert!((0.15..=0.25).contains(&rejected), "rejected rate {}", rejected);
        assert!((0.05..=0.15).contains(&silent), "no-response rate {}", silent);
    }

    #[test]
    fn test_service_distribution() {
        let (confirmed, rejected, silent) = rates(ProviderKind::Service, 11);
        assert!((0.65..=0.75).contains(&confirmed), "confirmed rate {}", confirmed);
        assert!((0.15..=0.25).contains(&rejected), "rejected rate {}", rejected);
        assert!((0.05..=0.15).contains(&silent), "no-response rate {}", silent);
    }

    #[test]
    fn test_pools_are_distinct() {
        for message in PRODUCT_MESSAGES {
            assert!(!SERVICE_MESSAGES.contains(&message));
        }
    }

    #[test]
    fn test_same_seed_same_outcomes() {
        let generator = ResponseGenerator::default();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        for _ in 0..100 {
            assert_eq!(
                generator.generate(ProviderKind::Service, &mut a),
                generator.generate(ProviderKind::Service, &mut b)
            );
        }
    }

    #[test]
    fn test_thresholds_are_tunable() {
        let mut rng = StdRng::seed_from_u64(1);

        let silent = ResponseGenerator::new(1.0, 1.0);
        assert!((0..100).all(|_| silent.generate(ProviderKind::Product, &mut rng) == Outcome::NoResponse));

        let rejecting = ResponseGenerator::new(1.0, 0.0);
        assert!((0..100).all(|_| rejecting.generate(ProviderKind::Product, &mut rng) == Outcome::Rejected));
    }

    #[test]
    fn test_into_response() {
        assert_eq!(Outcome::NoResponse.into_response(), None);
        assert_eq!(Outcome::Rejected.into_response(), Some(ProviderResponse::Rejected));
        assert_eq!(
            Outcome::Confirmed("ok".to_string()).into_response(),
            Some(ProviderResponse::Confirmed {
                message: "ok".to_string()
            })
        );
    }
}
