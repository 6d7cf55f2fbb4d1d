use crate::config::ParallelConfig;

/// Default bound on tasks in flight within one wave.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Execution options for the parallel task executor.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Maximum tasks running concurrently inside a wave
    pub max_parallel: usize,

    /// Enable visual progress bars
    pub progress_bar: bool,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            progress_bar: false,
        }
    }
}

impl ExecutionOpts {
    pub fn from_config(cfg: &ParallelConfig) -> Self {
        Self {
            max_parallel: cfg.max_parallel.max(1),
            progress_bar: cfg.progress_bar,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }
}
