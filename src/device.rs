//! A portable description of data-parallel kernels in the style of GPU compute kernels.
//!
//! A kernel is launched on a two-dimensional grid of work-groups, each consisting of a
//! three-dimensional block of work-items. Grid dimensions are limited to
//! [`MAX_GRID_DIMENSION`] groups per axis, so large launches fold the group index into two
//! dimensions, see [`grid_for`]. Backends decide how work-groups are scheduled. Work-items must
//! not make assumptions about the order in which they run.
use rayon::prelude::*;

mod add_sources;

pub use add_sources::{AddSourcesKernel, SourceRecords};

/// Maximum number of work-groups along one grid axis.
pub const MAX_GRID_DIMENSION: usize = 65535;

/// Grid dimensions `[gx, gy]` with `gx ≤ MAX_GRID_DIMENSION` and `gx · gy ≥ num_groups`.
pub fn grid_for(num_groups: usize) -> [usize; 2] {
    let mut gx = num_groups;
    let mut gy = 1;
    while gx > MAX_GRID_DIMENSION {
        gx = (gx + 1) / 2;
        gy *= 2;
    }
    [gx, gy]
}

/// Identifies a single work-item of a launch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub group_id: [usize; 2],
    pub num_groups: [usize; 2],
    pub local_id: [usize; 3],
}

impl WorkItem {
    /// The linear work-group index `gx_id + gx · gy_id`, or `None` if it overflows.
    pub fn linear_group_id(&self) -> Option<usize> {
        self.num_groups[0]
            .checked_mul(self.group_id[1])?
            .checked_add(self.group_id[0])
    }
}

pub trait ComputeKernel: Sync {
    /// Number of work-items along each axis of a work-group.
    fn work_group_size(&self) -> [usize; 3];

    fn execute(&self, item: WorkItem);
}

/// Schedules the work-groups of a launch.
pub trait Backend {
    fn launch<K: ComputeKernel + ?Sized>(&self, kernel: &K, grid: [usize; 2]);
}

fn execute_group<K: ComputeKernel + ?Sized>(kernel: &K, group_id: [usize; 2], num_groups: [usize; 2]) {
    let [nx, ny, nz] = kernel.work_group_size();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                kernel.execute(WorkItem {
                    group_id,
                    num_groups,
                    local_id: [i, j, k],
                });
            }
        }
    }
}

/// Runs all work-groups one after another on the calling thread.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SerialBackend;

impl Backend for SerialBackend {
    fn launch<K: ComputeKernel + ?Sized>(&self, kernel: &K, grid: [usize; 2]) {
        let [gx, gy] = grid;
        for y in 0..gy {
            for x in 0..gx {
                execute_group(kernel, [x, y], grid);
            }
        }
    }
}

/// Runs work-groups in parallel on the rayon thread pool. The work-items of a group run
/// sequentially.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RayonBackend;

impl Backend for RayonBackend {
    fn launch<K: ComputeKernel + ?Sized>(&self, kernel: &K, grid: [usize; 2]) {
        let [gx, gy] = grid;
        (0..gy).into_par_iter().for_each(|y| {
            (0..gx)
                .into_par_iter()
                .for_each(|x| execute_group(kernel, [x, y], grid));
        });
    }
}
