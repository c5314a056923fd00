use crate::assembly::AtomicField;
use crate::device::{grid_for, Backend, ComputeKernel, WorkItem};
use crate::error::Error;
use crate::mesh::local_index;
use crate::{AtomicScalar, Real};

/// Point sources located inside elements, for example adjoint sources at receivers.
///
/// Each record has a force vector and Lagrange interpolation weights along the three reference
/// axes of its element. Records are numbered locally; `global_record` maps each local record to
/// its global record index, which selects the element the record lies in.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRecords<T, const NGLL: usize> {
    source_vectors: Vec<[T; 3]>,
    xi: Vec<[T; NGLL]>,
    eta: Vec<[T; NGLL]>,
    gamma: Vec<[T; NGLL]>,
    global_record: Vec<usize>,
}

impl<T, const NGLL: usize> Default for SourceRecords<T, NGLL> {
    fn default() -> Self {
        Self {
            source_vectors: Vec::new(),
            xi: Vec::new(),
            eta: Vec::new(),
            gamma: Vec::new(),
            global_record: Vec::new(),
        }
    }
}

impl<T: Copy, const NGLL: usize> SourceRecords<T, NGLL> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, global_record: usize, source: [T; 3], xi: [T; NGLL], eta: [T; NGLL], gamma: [T; NGLL]) {
        self.global_record.push(global_record);
        self.source_vectors.push(source);
        self.xi.push(xi);
        self.eta.push(eta);
        self.gamma.push(gamma);
    }

    pub fn len(&self) -> usize {
        self.source_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_vectors.is_empty()
    }
}

/// Adds point sources to the acceleration field, one work-group per record and one work-item
/// per GLL point of the record's element.
///
/// Work-item `(i, j, k)` of record `r` adds `s_r · xi_r[i] · eta_r[j] · gamma_r[k]` to the
/// global node at `(i, j, k)`. Records may share elements and nodes, so contributions are added
/// atomically.
pub struct AddSourcesKernel<'a, T: AtomicScalar, const NGLL: usize> {
    acceleration: &'a AtomicField<T>,
    ibool: &'a [usize],
    records: &'a SourceRecords<T, NGLL>,
    record_element: &'a [usize],
}

impl<'a, T, const NGLL: usize> AddSourcesKernel<'a, T, NGLL>
where
    T: Real + AtomicScalar,
{
    /// Create the kernel, checking that every record refers to valid elements and nodes.
    ///
    /// `record_element` maps global record indices to elements and `ibool` is the
    /// local-to-global map of the mesh.
    pub fn try_new(
        acceleration: &'a AtomicField<T>,
        ibool: &'a [usize],
        records: &'a SourceRecords<T, NGLL>,
        record_element: &'a [usize],
    ) -> Result<Self, Error> {
        let ngll3 = NGLL * NGLL * NGLL;
        let num_elements = ibool.len() / ngll3;
        for (local, &global) in records.global_record.iter().enumerate() {
            let element = *record_element.get(global).ok_or_else(|| {
                Error::InvalidTopology(format!(
                    "source record {local} refers to global record {global}, \
                     but only {} records have elements",
                    record_element.len()
                ))
            })?;
            if element >= num_elements {
                return Err(Error::InvalidTopology(format!(
                    "global record {global} lies in element {element}, but the mesh has {num_elements} elements"
                )));
            }
            let nodes = &ibool[ngll3 * element..ngll3 * (element + 1)];
            if let Some(&iglob) = nodes.iter().find(|&&iglob| 3 * iglob + 2 >= acceleration.len()) {
                return Err(Error::InvalidTopology(format!(
                    "global node {iglob} of element {element} is outside the acceleration field"
                )));
            }
        }

        Ok(Self {
            acceleration,
            ibool,
            records,
            record_element,
        })
    }

    pub fn grid(&self) -> [usize; 2] {
        grid_for(self.records.len())
    }

    /// Launch the kernel on the given backend.
    pub fn launch(&self, backend: &impl Backend) {
        backend.launch(self, self.grid());
    }
}

impl<'a, T, const NGLL: usize> ComputeKernel for AddSourcesKernel<'a, T, NGLL>
where
    T: Real + AtomicScalar,
{
    fn work_group_size(&self) -> [usize; 3] {
        [NGLL; 3]
    }

    fn execute(&self, item: WorkItem) {
        let Some(irec_local) = item.linear_group_id() else {
            return;
        };
        // The grid may contain more groups than records
        if irec_local >= self.records.len() {
            return;
        }

        let [i, j, k] = item.local_id;
        let irec = self.records.global_record[irec_local];
        let ispec = self.record_element[irec];
        let iglob = self.ibool[local_index::<NGLL>(i, j, k) + NGLL * NGLL * NGLL * ispec];

        let weight = self.records.xi[irec_local][i] * self.records.eta[irec_local][j] * self.records.gamma[irec_local][k];
        let source = &self.records.source_vectors[irec_local];
        for c in 0..3 {
            self.acceleration.fetch_add(3 * iglob + c, source[c] * weight);
        }
    }
}
