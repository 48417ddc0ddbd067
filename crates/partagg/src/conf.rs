use crate::sketch::minhash::MAX_BUCKETS;

/// Default number of hashes retained by a [`CountSketch`](crate::sketch::CountSketch)
pub const DEFAULT_COUNT_NOMINAL_ENTRIES: u32 = 4096;
/// Default number of MinHash buckets when `minhash` is called without `k`
pub const DEFAULT_MINHASH_BUCKETS: u32 = 128;
/// Default MinHash universe (0 keeps the full 64-bit hash space)
pub const DEFAULT_MINHASH_UNIVERSE: u64 = 0;
/// Default ModHash modulus exponent when `modhash` is called without `k`
pub const DEFAULT_MODHASH_EXPONENT: u8 = 8;

/// What to do when a row carries an auxiliary parameter that differs from the one
/// the accumulator was initialized with
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParameterPolicy {
    /// Keep the first-seen configuration and ignore the row's parameter
    #[default]
    Ignore,
    /// Fail the row with a [`ParameterError`](crate::error::ParameterError)
    Reject,
}

/// Handler configuration
///
/// # Example
///
/// ```
/// use partagg::{HandlerConf, ParameterPolicy};
///
/// let conf = HandlerConf::default()
///     .with_minhash_buckets(256)
///     .with_parameter_policy(ParameterPolicy::Reject);
/// assert_eq!(conf.minhash_buckets(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConf {
    count_nominal_entries: u32,
    minhash_buckets: u32,
    minhash_universe: u64,
    modhash_exponent: u8,
    parameter_policy: ParameterPolicy,
}

impl Default for HandlerConf {
    fn default() -> Self {
        Self {
            count_nominal_entries: DEFAULT_COUNT_NOMINAL_ENTRIES,
            minhash_buckets: DEFAULT_MINHASH_BUCKETS,
            minhash_universe: DEFAULT_MINHASH_UNIVERSE,
            modhash_exponent: DEFAULT_MODHASH_EXPONENT,
            parameter_policy: ParameterPolicy::default(),
        }
    }
}

impl HandlerConf {
    /// Configures the number of hashes kept by distinct-count sketches
    pub fn with_count_nominal_entries(mut self, entries: u32) -> Self {
        self.count_nominal_entries = entries.max(2);
        self
    }
    /// Configures the MinHash bucket count used when rows carry no `k`, clamped to `1..=65536`
    pub fn with_minhash_buckets(mut self, buckets: u32) -> Self {
        self.minhash_buckets = buckets.clamp(1, MAX_BUCKETS);
        self
    }
    /// Configures the MinHash universe used when rows carry no `n`
    pub fn with_minhash_universe(mut self, universe: u64) -> Self {
        self.minhash_universe = universe;
        self
    }
    /// Configures the ModHash exponent used when rows carry no `k`
    pub fn with_modhash_exponent(mut self, exponent: u8) -> Self {
        self.modhash_exponent = exponent.min(63);
        self
    }
    /// Configures how differing auxiliary parameters are handled
    pub fn with_parameter_policy(mut self, policy: ParameterPolicy) -> Self {
        self.parameter_policy = policy;
        self
    }

    /// Returns the distinct-count sketch size
    pub fn count_nominal_entries(&self) -> u32 {
        self.count_nominal_entries
    }
    /// Returns the default MinHash bucket count
    pub fn minhash_buckets(&self) -> u32 {
        self.minhash_buckets
    }
    /// Returns the default MinHash universe
    pub fn minhash_universe(&self) -> u64 {
        self.minhash_universe
    }
    /// Returns the default ModHash exponent
    pub fn modhash_exponent(&self) -> u8 {
        self.modhash_exponent
    }
    /// Returns the auxiliary parameter policy
    pub fn parameter_policy(&self) -> ParameterPolicy {
        self.parameter_policy
    }
}
