use layers::arcs::{ArcRecord, RecordValidator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::{GenerateRequest, WorkerMessage};

pub const PALETTE: [&str; 3] = ["#06b6d4", "#3b82f6", "#6366f1"];
pub const ARC_ALT_MIN: f64 = 0.1;
pub const ARC_ALT_MAX: f64 = 0.5;

/// Random sample arcs. Runs on the worker side of the protocol.
#[derive(Debug)]
pub struct ArcSampler {
    rng: StdRng,
}

impl ArcSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    pub fn sample(&mut self, count: usize, min_arc_distance: f64) -> Vec<ArcRecord> {
        let validator = RecordValidator::new(min_arc_distance);
        (0..count)
            .map(|i| {
                let record = ArcRecord {
                    order: (i + 1) as u32,
                    start_lat: self.rng.random_range(-90.0..=90.0),
                    start_lng: self.rng.random_range(-180.0..=180.0),
                    end_lat: self.rng.random_range(-90.0..=90.0),
                    end_lng: self.rng.random_range(-180.0..=180.0),
                    arc_alt: self.rng.random_range(ARC_ALT_MIN..=ARC_ALT_MAX),
                    color: PALETTE[self.rng.random_range(0..PALETTE.len())].to_string(),
                };
                validator.validate(&record, i).0
            })
            .collect()
    }

    /// Answers one request.
    pub fn handle(&mut self, request: &GenerateRequest) -> WorkerMessage {
        let records = self.sample(request.count, request.min_arc_distance);
        match serde_json::to_value(records) {
            Ok(value) => WorkerMessage::Records(value),
            Err(err) => WorkerMessage::Error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ARC_ALT_MAX, ARC_ALT_MIN, ArcSampler, PALETTE};
    use crate::protocol::{GenerateRequest, WorkerMessage};

    #[test]
    fn samples_valid_records() {
        let mut sampler = ArcSampler::new(Some(42));
        let records = sampler.sample(40, 0.75);
        assert_eq!(records.len(), 40);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.order, i as u32 + 1);
            assert!(r.satisfies_invariants());
            assert!((ARC_ALT_MIN..=ARC_ALT_MAX).contains(&r.arc_alt));
            assert!(PALETTE.contains(&r.color.as_str()));
        }
    }

    #[test]
    fn seeded_samplers_agree() {
        let a = ArcSampler::new(Some(7)).sample(5, 0.75);
        let b = ArcSampler::new(Some(7)).sample(5, 0.75);
        assert_eq!(a, b);
    }

    #[test]
    fn handle_replies_with_array() {
        let mut sampler = ArcSampler::new(Some(1));
        let reply = sampler.handle(&GenerateRequest {
            count: 3,
            min_arc_distance: 0.75,
        });
        let WorkerMessage::Records(value) = reply else {
            panic!("expected records");
        };
        assert_eq!(value.as_array().map(|a| a.len()), Some(3));
    }
}
