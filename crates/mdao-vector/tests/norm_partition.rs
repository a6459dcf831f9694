use std::ops::Range;
use std::sync::Arc;

use approx::assert_relative_eq;
use mdao_vector::mdao_comm::{Communicator, SerialComm, ThreadComm};
use mdao_vector::{MultiVector, VarSetLayout, VectorInfo, VectorOptions};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const N_COLUMNS: usize = 2;
const STATES: usize = 24;
const RESIDUALS: usize = 16;

/// Row-major global data for the two sets of the test vector.
fn global_data(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let states = (0..STATES * N_COLUMNS).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let residuals = (0..RESIDUALS * N_COLUMNS).map(|_| rng.gen_range(-1.0..1.0)).collect();
    (states, residuals)
}

/// Rows of a set of `len` rows owned by `rank` when split evenly over `size` ranks.
fn even_rows(len: usize, rank: usize, size: usize) -> Range<usize> {
    let per_rank = len / size;
    rank * per_rank..(rank + 1) * per_rank
}

fn local_vector(
    comm: Arc<dyn Communicator>,
    data: &(Vec<f64>, Vec<f64>),
    states: Range<usize>,
    residuals: Range<usize>,
) -> MultiVector {
    let layout = VarSetLayout::from_sets([("states", states.len()), ("residuals", residuals.len())]).unwrap();
    let (s, r) = (layout.id("states").unwrap(), layout.id("residuals").unwrap());
    let mut vec = MultiVector::allocate(
        layout,
        VectorOptions::new().with_columns(N_COLUMNS),
        comm,
        Arc::new(VectorInfo::new()),
    )
    .unwrap();
    vec.assign_set(s, &data.0[states.start * N_COLUMNS..states.end * N_COLUMNS]).unwrap();
    vec.assign_set(r, &data.1[residuals.start * N_COLUMNS..residuals.end * N_COLUMNS]).unwrap();
    vec
}

#[test]
fn test_norm_is_group_size_invariant() {
    let data = global_data(42);
    let serial = local_vector(Arc::new(SerialComm), &data, 0..STATES, 0..RESIDUALS).norm().unwrap();

    let expected: f64 = data.0.iter().chain(&data.1).map(|v| v * v).sum::<f64>().sqrt();
    assert_relative_eq!(serial, expected, max_relative = 1e-14);

    for size in [1, 2, 4] {
        let norms = ThreadComm::run(size, |comm| {
            let rank = comm.rank();
            let vec = local_vector(
                Arc::new(comm),
                &data,
                even_rows(STATES, rank, size),
                even_rows(RESIDUALS, rank, size),
            );
            vec.norm().unwrap()
        });
        for norm in &norms {
            assert_eq!(norm.to_bits(), norms[0].to_bits(), "ranks disagree for size {size}");
            assert_relative_eq!(*norm, serial, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_norm_with_uneven_partition() {
    let data = global_data(7);
    let serial = local_vector(Arc::new(SerialComm), &data, 0..STATES, 0..RESIDUALS).norm().unwrap();

    // rank 0 owns a short slice of states and none of the residuals
    let norms = ThreadComm::run(2, |comm| {
        let (states, residuals) = if comm.rank() == 0 {
            (0..5, 0..0)
        } else {
            (5..STATES, 0..RESIDUALS)
        };
        local_vector(Arc::new(comm), &data, states, residuals).norm().unwrap()
    });
    assert_relative_eq!(norms[0], serial, max_relative = 1e-12);
    assert_relative_eq!(norms[1], serial, max_relative = 1e-12);
}

#[test]
fn test_dot_matches_norm_across_ranks() {
    let data = global_data(3);
    let results = ThreadComm::run(4, |comm| {
        let rank = comm.rank();
        let vec = local_vector(
            Arc::new(comm),
            &data,
            even_rows(STATES, rank, 4),
            even_rows(RESIDUALS, rank, 4),
        );
        let dots = vec.dot(&vec).unwrap();
        let column_norms = vec.column_norms().unwrap();
        (dots, column_norms, vec.norm().unwrap())
    });
    for (dots, column_norms, norm) in results {
        assert_relative_eq!(dots.iter().sum::<f64>(), norm * norm, max_relative = 1e-12);
        for (d, n) in dots.iter().zip(&column_norms) {
            assert_relative_eq!(d.sqrt(), *n, max_relative = 1e-12);
        }
    }
}
