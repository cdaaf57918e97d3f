//! Partition of decoder layers into pipeline stages.

use crate::api::error::{ModelError, ModelResult};
use std::ops::Range;

/// Contiguous layer ranges (`inter_pp` stages) and the row-shard count
/// (`intra_pp`) used by every projection inside a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    stages: Vec<Range<usize>>,
    shards: usize,
}

impl PipelinePlan {
    pub fn new(n_layers: usize, inter_pp: usize, intra_pp: usize) -> ModelResult<Self> {
        if inter_pp == 0 || inter_pp > n_layers {
            return Err(ModelError::InvalidConfig(format!(
                "inter_pp {} must be in 1..={} (number of layers)",
                inter_pp, n_layers
            )));
        }
        if intra_pp == 0 {
            return Err(ModelError::InvalidConfig("intra_pp must be >= 1".into()));
        }

        let base = n_layers / inter_pp;
        let extra = n_layers % inter_pp;
        let mut stages = Vec::with_capacity(inter_pp);
        let mut start = 0;
        for s in 0..inter_pp {
            let len = base + usize::from(s < extra);
            stages.push(start..start + len);
            start += len;
        }

        Ok(Self { stages, shards: intra_pp })
    }

    pub fn stages(&self) -> &[Range<usize>] {
        &self.stages
    }

    pub fn shards(&self) -> usize {
        self.shards
    }
}
