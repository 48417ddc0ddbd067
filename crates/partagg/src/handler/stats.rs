use core::fmt;
use partagg_stats::Sketch;

/// Latency stats of one evaluator instance
#[derive(Clone, Default)]
pub struct Stats {
    /// A sketch for recording latencies of consuming a row
    pub consume: Sketch,
    /// A sketch for recording latencies of merging a partial frame
    pub merge: Sketch,
    /// A sketch for recording latencies of emitting a partial frame
    pub emit: Sketch,
    /// A sketch for recording latencies of producing the final result
    pub finalize: Sketch,
}

impl Stats {
    /// Prints a percentile table of every recorded operation to stdout
    pub fn print(&self, handler: &str) {
        println!("{handler} stats");
        partagg_stats::percentile_table(&[
            ("consume_input", &self.consume),
            ("merge_frame", &self.merge),
            ("emit_frame", &self.emit),
            ("finalize", &self.finalize),
        ])
        .printstd();
    }
}

impl fmt::Debug for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Evaluator Stats")
            .field("consume", &self.consume.percentiles())
            .field("merge", &self.merge.percentiles())
            .field("emit", &self.emit.percentiles())
            .field("finalize", &self.finalize.percentiles())
            .finish()
    }
}
