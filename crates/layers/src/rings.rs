use gpu::renderer::{RenderCommand, RenderFrame, RingBatch};
use rand::Rng;
use rand::seq::index::sample;

use crate::arcs::ArcRecord;
use crate::config::GlobeConfig;
use crate::layer::{Layer, LayerId};
use crate::symbology::ColorSource;

pub const DEFAULT_RING_COLOR: &str = "rgba(255,255,255,0.5)";
pub const RING_PROPAGATION_SPEED: f64 = 3.0;

/// Which records currently emit rings. Owned by one controller; two widgets
/// never share a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingState {
    selected: Vec<usize>,
}

impl RingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks four fifths of `count` distinct records, in ascending order.
    pub fn reselect(&mut self, count: usize, rng: &mut impl Rng) {
        let amount = count * 4 / 5;
        let mut selected = sample(rng, count, amount).into_vec();
        selected.sort_unstable();
        self.selected = selected;
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub order: u32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct RingLayer {
    id: LayerId,
    rings: Vec<Ring>,
    color: ColorSource,
    max_radius: f64,
    repeat_period_ms: f64,
}

impl RingLayer {
    pub fn new(id: u64) -> Self {
        let defaults = GlobeConfig::default();
        Self {
            id: LayerId(id),
            rings: Vec::new(),
            color: ColorSource::from_record(),
            max_radius: defaults.max_rings,
            repeat_period_ms: defaults.ring_repeat_period_ms(),
        }
    }

    /// Rebuilds rings from the records chosen by `state`.
    pub fn configure(&mut self, records: &[ArcRecord], state: &RingState, config: &GlobeConfig) {
        self.max_radius = config.max_rings;
        self.repeat_period_ms = config.ring_repeat_period_ms();
        self.rings = state
            .selected()
            .iter()
            .filter_map(|i| records.get(*i))
            .map(|record| Ring {
                order: record.order,
                color: self.color.resolve(record, DEFAULT_RING_COLOR),
            })
            .collect();
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn repeat_period_ms(&self) -> f64 {
        self.repeat_period_ms
    }
}

impl Layer for RingLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.rings.len()
    }

    fn clear(&mut self) {
        self.rings.clear();
    }

    fn encode(&self, frame: &mut RenderFrame) {
        if self.rings.is_empty() {
            return;
        }
        frame.push(RenderCommand::Rings(RingBatch {
            count: self.rings.len(),
            max_radius: self.max_radius,
            propagation_speed: RING_PROPAGATION_SPEED,
            repeat_period_ms: self.repeat_period_ms,
        }));
    }
}
