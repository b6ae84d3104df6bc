//! Random source used for drawing groups and shuffling the category grid.
//! Injected so tests can script exact draws.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform source in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Adapts any `rand` generator.
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// `StdRng` seeded from the platform (`getrandom`, `js` backend in the browser).
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }
}

/// `floor(r * len)`, clamped so a misbehaving source can never index past the end.
/// `len` must be non-zero.
pub fn pick_index<R: RandomSource + ?Sized>(rng: &mut R, len: usize) -> usize {
    debug_assert!(len > 0);
    let r = rng.next_unit();
    let idx = (r * len as f64).floor() as usize;
    idx.min(len.saturating_sub(1))
}

/// In-place Fisher-Yates shuffle.
pub fn shuffle<R: RandomSource + ?Sized, T>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = pick_index(rng, i + 1);
        items.swap(i, j);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::RandomSource;

    /// Replays `values` in order, then repeats the last one.
    pub struct Sequence {
        values: Vec<f64>,
        pos: usize,
    }

    impl Sequence {
        pub fn new(values: &[f64]) -> Self {
            Self {
                values: values.to_vec(),
                pos: 0,
            }
        }

        pub fn zero() -> Self {
            Self::new(&[0.0])
        }
    }

    impl RandomSource for Sequence {
        fn next_unit(&mut self) -> f64 {
            let v = self
                .values
                .get(self.pos)
                .or(self.values.last())
                .copied()
                .unwrap_or(0.0);
            self.pos += 1;
            v
        }
    }
}
