use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Reproducible random source for replica fuzzing.
///
/// Uses the xoshiro256** PRNG so a failing run can be replayed from the
/// printed seed.
///
/// # Examples
///
/// ```
/// use ydoc_util::Fuzzer;
///
/// let mut a = Fuzzer::new(Some(7));
/// let mut b = Fuzzer::new(Some(7));
/// assert_eq!(a.int(0, 1000), b.int(0, 1000));
///
/// let choices = ["insert", "delete", "set"];
/// assert!(choices.contains(a.pick(&choices)));
/// ```
pub struct Fuzzer {
    /// The seed used to initialize the PRNG.
    pub seed: u64,
    rng: Xoshiro256StarStar,
}

impl Fuzzer {
    /// Create a fuzzer from `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| OsRng.next_u64());
        Self {
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    /// Random integer in `[min, max]` (inclusive).
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    /// Random index in `[0, len)`; `0` when `len` is zero.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    /// Random float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// `true` with the given probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Pick a random element from a non-empty slice.
    pub fn pick<'a, T>(&mut self, elements: &'a [T]) -> &'a T {
        &elements[self.index(elements.len())]
    }

    /// Pick from `(value, weight)` pairs proportionally to weight.
    ///
    /// Falls back to the first entry when every weight is zero.
    pub fn weighted<'a, T>(&mut self, choices: &'a [(T, u32)]) -> &'a T {
        let total: u64 = choices.iter().map(|(_, w)| *w as u64).sum();
        if total == 0 {
            return &choices[0].0;
        }
        let mut roll = self.rng.gen_range(0..total);
        for (value, weight) in choices {
            let weight = *weight as u64;
            if roll < weight {
                return value;
            }
            roll -= weight;
        }
        &choices[choices.len() - 1].0
    }

    /// Random string of `len` characters drawn from `alphabet`.
    pub fn string(&mut self, len: usize, alphabet: &str) -> String {
        let chars: Vec<char> = alphabet.chars().collect();
        (0..len).map(|_| *self.pick(&chars)).collect()
    }

    /// Shuffle `items` in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }
}
