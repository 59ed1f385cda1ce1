//! # Scenestack Pipeline
//!
//! Batch processing of multispectral Landsat scenes into yearly
//! composite spectral indices.
//!
//! The pipeline, per year and per index:
//! 1. locate the seven single-band files of every scene ([`band`])
//! 2. compute the index for each scene ([`index`])
//! 3. force the per-scene arrays onto a common grid ([`reconcile`])
//! 4. average them and tabulate statistics ([`aggregate`])
//! 5. write the statistics table and the averaged raster ([`report`])
//!
//! [`batch`] drives the whole loop; [`stack`] builds per-scene
//! multiband stacks as an independent product.

pub mod aggregate;
pub mod band;
pub mod batch;
pub mod index;
pub mod layout;
pub mod reconcile;
pub mod report;
pub mod stack;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregate::{average, stats_record, StatsRecord};
    pub use crate::band::{discover_scenes, BandRole, Scene};
    pub use crate::batch::{
        run_batch_from_stacks, run_batches, BatchConfig, BatchSummary, SkippedScene,
    };
    pub use crate::index::{compute_index, compute_index_from_stack, IndexKind};
    pub use crate::reconcile::{reconcile, ReshapePath};
    pub use crate::stack::build_stack;
    pub use scenestack_core::prelude::*;
}
