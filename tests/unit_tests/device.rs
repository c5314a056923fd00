use globe_sem::assembly::AtomicField;
use globe_sem::device::{grid_for, AddSourcesKernel, Backend, RayonBackend, SerialBackend, SourceRecords};
use globe_sem::mesh::procedural::create_box_mesh;
use globe_sem::mesh::{local_index, RegionTag, SpectralMesh};
use globe_sem::quadrature::GllOperator;
use globe_sem::Error;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Point3, Vector3};

const NGLL: usize = 5;

fn mesh() -> SpectralMesh<f64, NGLL> {
    create_box_mesh([2, 2, 1], &Point3::origin(), &Vector3::new(2.0, 2.0, 1.0), RegionTag::Crust).unwrap()
}

/// Global record, source vector and reference coordinates of each local record.
const SOURCES: [(usize, [f64; 3], [f64; 3]); 3] = [
    (1, [1.0, -2.0, 0.5], [0.3, -0.7, 0.0]),
    (2, [0.0, 3.0, 1.0], [-1.0, 0.9, 0.25]),
    (3, [2.0, 0.0, -1.0], [0.5, 0.5, -0.5]),
];

/// Global records 0..4 lie in elements 3, 0, 0 and 2. Only records 1, 2 and 3 are local.
const RECORD_ELEMENT: [usize; 4] = [3, 0, 0, 2];

fn records(operator: &GllOperator<f64, NGLL>) -> SourceRecords<f64, NGLL> {
    let weights = |xi: f64| {
        let mut array = [0.0; NGLL];
        array.copy_from_slice(operator.interpolation_weights(xi).as_slice());
        array
    };
    let mut records = SourceRecords::new();
    for (global, source, [x, y, z]) in SOURCES {
        records.push(global, source, weights(x), weights(y), weights(z));
    }
    records
}

fn serial_reference(mesh: &SpectralMesh<f64, NGLL>, operator: &GllOperator<f64, NGLL>) -> DVector<f64> {
    let mut acceleration = DVector::zeros(3 * mesh.num_global_nodes());
    for (global, source, [x, y, z]) in SOURCES {
        let element = RECORD_ELEMENT[global];
        let wx = operator.interpolation_weights(x);
        let wy = operator.interpolation_weights(y);
        let wz = operator.interpolation_weights(z);
        for k in 0..NGLL {
            for j in 0..NGLL {
                for i in 0..NGLL {
                    let iglob = mesh.element_nodes(element)[local_index::<NGLL>(i, j, k)];
                    for c in 0..3 {
                        acceleration[3 * iglob + c] += source[c] * wx[i] * wy[j] * wz[k];
                    }
                }
            }
        }
    }
    acceleration
}

fn run(backend: &impl Backend) -> (DVector<f64>, DVector<f64>) {
    let mesh = mesh();
    let operator = GllOperator::new();
    let records = records(&operator);

    let initial = DVector::from_fn(3 * mesh.num_global_nodes(), |i, _| 0.25 * (i % 4) as f64);
    let acceleration = AtomicField::from(&initial);
    let kernel = AddSourcesKernel::try_new(&acceleration, mesh.ibool(), &records, &RECORD_ELEMENT).unwrap();
    assert_eq!(kernel.grid(), [3, 1]);
    kernel.launch(backend);

    let expected = initial + serial_reference(&mesh, &operator);
    (DVector::from(acceleration), expected)
}

#[test]
fn sources_are_added_on_serial_backend() {
    let (result, expected) = run(&SerialBackend);
    assert_matrix_eq!(result, expected, comp = abs, tol = 1e-14);
}

#[test]
fn sources_are_added_on_rayon_backend() {
    let (result, expected) = run(&RayonBackend);
    assert_matrix_eq!(result, expected, comp = abs, tol = 1e-14);
}

#[test]
fn surplus_work_groups_are_ignored() {
    let mesh = create_box_mesh::<f64, 2>([1, 1, 1], &Point3::origin(), &Vector3::repeat(1.0), RegionTag::Crust).unwrap();
    let num_records = 70_001;
    let mut records = SourceRecords::new();
    for _ in 0..num_records {
        records.push(0, [1.0, 0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 0.0]);
    }
    let record_element = [0];

    let acceleration = AtomicField::<f64>::zeros(3 * mesh.num_global_nodes());
    let kernel = AddSourcesKernel::try_new(&acceleration, mesh.ibool(), &records, &record_element).unwrap();
    let [gx, gy] = kernel.grid();
    assert_eq!(grid_for(num_records), [gx, gy]);
    assert!(gx * gy > num_records);
    kernel.launch(&RayonBackend);

    let values = acceleration.into_values();
    let corner = mesh.element_nodes(0)[local_index::<2>(0, 0, 0)];
    assert_eq!(values[3 * corner], num_records as f64);
    assert_eq!(values.iter().sum::<f64>(), num_records as f64);
}

#[test]
fn records_outside_the_mesh_are_rejected() {
    let mesh = mesh();
    let acceleration = AtomicField::<f64>::zeros(3 * mesh.num_global_nodes());
    let mut records = SourceRecords::new();
    records.push(1, [1.0; 3], [0.2; NGLL], [0.2; NGLL], [0.2; NGLL]);

    let missing_record = AddSourcesKernel::try_new(&acceleration, mesh.ibool(), &records, &[0]);
    assert!(matches!(missing_record, Err(Error::InvalidTopology(_))));

    let missing_element = AddSourcesKernel::try_new(&acceleration, mesh.ibool(), &records, &[0, 4]);
    assert!(matches!(missing_element, Err(Error::InvalidTopology(_))));

    let short_field = AtomicField::<f64>::zeros(3);
    let outside_field = AddSourcesKernel::try_new(&short_field, mesh.ibool(), &records, &[0, 1]);
    assert!(matches!(outside_field, Err(Error::InvalidTopology(_))));

    assert!(AddSourcesKernel::try_new(&acceleration, mesh.ibool(), &records, &[0, 3]).is_ok());
}
