//! Tunable engine parameters.

/// How the event queue shards into sub-queues to cut heap sift-up cost.
///
/// `None` is a single `BinaryHeap` and must remain correct — bucketing is
/// purely an optimisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueueBucketing {
    /// A single priority queue (default, always correct).
    None,
    /// Shard by per-queue element count: once the head queue reaches `k`
    /// elements, new inserts spill to the next queue (created lazily).
    OnSize {
        /// Spill threshold per sub-queue.
        k: usize,
    },
    /// Shard by geometrically growing timestamp ranges. The *i*-th queue
    /// owns `[threshold * (1 - g^i) / (1 - g), threshold * g^i)`.
    OnTimestamp {
        /// Base width of the first bucket.
        threshold: f64,
        /// Geometric growth factor between consecutive buckets.
        growth: f64,
        /// Maximum number of buckets before the tail bucket is unbounded.
        limit: usize,
    },
}

impl Default for QueueBucketing {
    fn default() -> Self {
        Self::None
    }
}

/// Tunables for the clustering engine, with the documented defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParams {
    /// Leaf capacity before a cell is split. Default 10.
    pub max_glyphs_per_cell: usize,
    /// Smallest allowed cell side. Default 1e-4.
    pub min_cell_size: f64,
    /// Depth of the first-merge recorder buffer (`k`). Default 4.
    pub max_merges_to_record: usize,
    /// If true, emit every pair's merge rather than only the first. Default false.
    pub robust: bool,
    /// If true, maintain `tracked_by` and run tracker-repair. Default true.
    pub track: bool,
    /// Event queue sharding strategy. Default `None`.
    pub queue_bucketing: QueueBucketing,
    /// Candidate-set size above which the first-merge recorder may fan its
    /// `record` calls out across threads. Default 1000.
    pub parallel_recorder_threshold: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_glyphs_per_cell: 10,
            min_cell_size: 1e-4,
            max_merges_to_record: 4,
            robust: false,
            track: true,
            queue_bucketing: QueueBucketing::None,
            parallel_recorder_threshold: 1000,
        }
    }
}

/// Numerical slack used when testing "does this growing square overlap
/// this region by time t".
pub const EPS: f64 = 1e-9;
