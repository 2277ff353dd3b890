//! Tick producers.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tick_proto::{InstrumentType, Side, TickRecord};

use crate::error::{EmitError, EmitResult};

/// Produces the next tick to emit.
///
/// Any `FnMut() -> TickRecord` closure is a source, so callers can plug in
/// their own sequence without a wrapper type.
pub trait TickSource {
    fn next_tick(&mut self) -> TickRecord;
}

impl<F> TickSource for F
where
    F: FnMut() -> TickRecord,
{
    #[inline]
    fn next_tick(&mut self) -> TickRecord {
        self()
    }
}

/// Which instrument ids the random source stamps on its ticks.
#[derive(Clone, Debug, PartialEq)]
pub enum InstrumentIds {
    /// Every tick carries the same id.
    Fixed(u32),
    /// Each tick picks uniformly from the set.
    OneOf(Vec<u32>),
}

impl Default for InstrumentIds {
    fn default() -> Self {
        InstrumentIds::Fixed(12345)
    }
}

impl InstrumentIds {
    /// One id collapses to `Fixed`, several to `OneOf`.
    pub fn from_list(ids: Vec<u32>) -> Self {
        match ids.as_slice() {
            [id] => InstrumentIds::Fixed(*id),
            _ => InstrumentIds::OneOf(ids),
        }
    }

    fn into_vec(self) -> Vec<u32> {
        match self {
            InstrumentIds::Fixed(id) => vec![id],
            InstrumentIds::OneOf(ids) => ids,
        }
    }
}

/// Parameters of the default randomized source.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomSourceConfig {
    pub instrument_ids: InstrumentIds,
    /// Inclusive price bounds.
    pub price_min: f32,
    pub price_max: f32,
    /// Discrete quantity choices.
    pub quantities: Vec<f32>,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for RandomSourceConfig {
    fn default() -> Self {
        Self {
            instrument_ids: InstrumentIds::default(),
            price_min: 95.0,
            price_max: 105.0,
            quantities: vec![0.1, 1.0, 5.0],
            seed: None,
        }
    }
}

impl RandomSourceConfig {
    pub fn validate(&self) -> EmitResult<()> {
        if let InstrumentIds::OneOf(ids) = &self.instrument_ids {
            if ids.is_empty() {
                return Err(EmitError::invalid("instrument id set is empty"));
            }
        }
        if !self.price_min.is_finite() || !self.price_max.is_finite() {
            return Err(EmitError::invalid(format!(
                "price range [{}, {}] is not finite",
                self.price_min, self.price_max
            )));
        }
        if self.price_min > self.price_max {
            return Err(EmitError::invalid(format!(
                "price range [{}, {}] is inverted",
                self.price_min, self.price_max
            )));
        }
        // The sampler scales the span by 1 / (1 - EPSILON); that must stay finite
        if !((self.price_max - self.price_min) / (1.0 - f32::EPSILON)).is_finite() {
            return Err(EmitError::invalid(format!(
                "price range [{}, {}] is too wide",
                self.price_min, self.price_max
            )));
        }
        if self.quantities.is_empty() {
            return Err(EmitError::invalid("quantity set is empty"));
        }
        if let Some(q) = self.quantities.iter().find(|q| !q.is_finite()) {
            return Err(EmitError::invalid(format!("quantity {q} is not finite")));
        }
        Ok(())
    }
}

/// Randomized ticks: uniform instrument type, side and price, with
/// instrument id and quantity drawn from configured sets.
pub struct RandomTickSource {
    rng: StdRng,
    ids: Vec<u32>,
    price: Uniform<f32>,
    quantities: Vec<f32>,
}

impl RandomTickSource {
    pub fn new(config: RandomSourceConfig) -> EmitResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            ids: config.instrument_ids.into_vec(),
            price: Uniform::new_inclusive(config.price_min, config.price_max),
            quantities: config.quantities,
        })
    }
}

impl TickSource for RandomTickSource {
    fn next_tick(&mut self) -> TickRecord {
        // Non-empty sets are guaranteed by validate()
        let id = self.ids[self.rng.gen_range(0..self.ids.len())];
        let kind = InstrumentType::ALL[self.rng.gen_range(0..InstrumentType::ALL.len())];
        let side = Side::ALL[self.rng.gen_range(0..Side::ALL.len())];
        let price = self.price.sample(&mut self.rng);
        let qty = self.quantities[self.rng.gen_range(0..self.quantities.len())];

        TickRecord::new(id, kind, side, price, qty)
    }
}
