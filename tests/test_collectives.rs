use std::sync::Arc;

use assert_matches::assert_matches;
use lockstep::{Config, Error, SharedBuffer};
use rand::Rng;

fn run_add(config: Config, a: Vec<f64>, b: Vec<f64>) -> eyre::Result<Vec<f64>> {
    let a = Arc::new(a);
    let b = Arc::new(b);
    let out = Arc::new(SharedBuffer::new(a.len()));
    let sums = Arc::clone(&out);
    let guards = lockstep::execute(config, move |control| {
        lockstep::vector_add(&control, &a, &b, &sums)
    })?;
    for result in guards.join() {
        result??;
    }
    Ok(out.to_vec())
}

fn run_dot(config: Config, a: Vec<f64>, b: Vec<f64>) -> eyre::Result<Vec<f64>> {
    let a = Arc::new(a);
    let b = Arc::new(b);
    let guards = lockstep::execute(config, move |control| {
        lockstep::vector_dot(&control, &a, &b)
    })?;
    let mut totals = Vec::new();
    for result in guards.join() {
        totals.push(result??);
    }
    Ok(totals)
}

/// `a = [0, 1, ..., len)`, `b = [len, len - 1, ..., 1]`.
fn ramp_inputs(len: usize) -> (Vec<f64>, Vec<f64>) {
    let a = (0..len).map(|i| i as f64).collect();
    let b = (0..len).map(|i| (len - i) as f64).collect();
    (a, b)
}

fn random_inputs(len: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = rand::rng();
    let a = (0..len).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect();
    let b = (0..len).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect();
    (a, b)
}

/// The dot product `vector_dot` must produce, computed sequentially with the
/// same block partition and the same ascending reduction order.
fn reference_dot(a: &[f64], b: &[f64], peers: usize) -> f64 {
    let mut partials = vec![0.0; peers];
    for (index, partial) in partials.iter_mut().enumerate() {
        for i in lockstep::local_range(index, peers, a.len()) {
            *partial += a[i] * b[i];
        }
    }
    let mut total = partials[0];
    for &partial in &partials[1..] {
        total += partial;
    }
    total
}

#[test]
fn add_four_workers() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_add(Config::Process(4), a, b)?, vec![10.0; 10]);
    Ok(())
}

#[test]
fn dot_four_workers() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    // sum of i * (10 - i) for i in 0..10
    assert_eq!(run_dot(Config::Process(4), a, b)?, vec![210.0; 4]);
    Ok(())
}

#[test]
fn dot_uneven_split() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_dot(Config::Process(3), a, b)?, vec![210.0; 3]);
    Ok(())
}

#[test]
fn add_more_workers_than_elements() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(3);
    assert_eq!(run_add(Config::Process(8), a, b)?, vec![3.0; 3]);
    Ok(())
}

#[test]
fn dot_more_workers_than_elements() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(3);
    // sum of i * (3 - i) for i in 0..3
    assert_eq!(run_dot(Config::Process(8), a, b)?, vec![4.0; 8]);
    Ok(())
}

#[test]
fn single_worker_matches_multi_worker() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    let single = run_dot(Config::Thread, a.clone(), b.clone())?;
    let multi = run_dot(Config::Process(5), a.clone(), b.clone())?;
    assert_eq!(single, vec![210.0; 1]);
    assert_eq!(multi, vec![210.0; 5]);
    assert_eq!(run_add(Config::Thread, a.clone(), b.clone())?, run_add(Config::Process(5), a, b)?);
    Ok(())
}

#[test]
fn dot_thread_backend() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_dot(Config::Thread, a, b)?, vec![210.0; 1]);
    Ok(())
}

#[test]
fn dot_spin_backend() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_dot(Config::ProcessSpin(4), a, b)?, vec![210.0; 4]);
    Ok(())
}

#[test]
fn dot_pool_backend() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_dot(Config::Pool(4), a, b)?, vec![210.0; 4]);
    Ok(())
}

#[test]
fn add_pool_backend() -> eyre::Result<()> {
    let (a, b) = ramp_inputs(10);
    assert_eq!(run_add(Config::Pool(4), a, b)?, vec![10.0; 10]);
    Ok(())
}

#[test]
fn empty_vectors_are_a_no_op() -> eyre::Result<()> {
    assert_eq!(run_add(Config::Process(4), Vec::new(), Vec::new())?, Vec::<f64>::new());
    assert_eq!(run_dot(Config::Process(4), Vec::new(), Vec::new())?, vec![0.0; 4]);
    Ok(())
}

#[test]
fn dot_matches_sequential_reference() -> eyre::Result<()> {
    let (a, b) = random_inputs(100);
    for config in [Config::Process(3), Config::ProcessSpin(4), Config::Pool(5)] {
        let totals = run_dot(config, a.clone(), b.clone())?;
        let expected = reference_dot(&a, &b, config.peers());
        for total in &totals {
            assert_eq!(total.to_bits(), expected.to_bits(), "{config:?}");
        }
        let naive: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!((totals[0] - naive).abs() < 1e-9, "{config:?}");
    }
    Ok(())
}

#[test]
fn results_reproducible_for_fixed_worker_count() -> eyre::Result<()> {
    let (a, b) = random_inputs(257);
    let first = run_dot(Config::Process(4), a.clone(), b.clone())?;
    let second = run_dot(Config::Process(4), a, b)?;
    assert_eq!(first[0].to_bits(), second[0].to_bits());
    for total in &first {
        assert_eq!(total.to_bits(), first[0].to_bits());
    }
    Ok(())
}

#[test]
fn length_mismatch_is_reported() -> eyre::Result<()> {
    let a = Arc::new(vec![1.0, 2.0]);
    let b = Arc::new(vec![1.0]);
    let guards = lockstep::execute(Config::Process(2), move |control| {
        lockstep::vector_dot(&control, &a, &b)
    })?;
    for result in guards.join() {
        assert_matches!(result?, Err(Error::LengthMismatch));
    }
    Ok(())
}

#[test]
fn add_length_mismatch_is_reported() -> eyre::Result<()> {
    let a = Arc::new(vec![1.0, 2.0]);
    let b = Arc::new(vec![1.0, 2.0]);
    let out = Arc::new(SharedBuffer::new(5));
    let guards = lockstep::execute(Config::Process(2), move |control| {
        lockstep::vector_add(&control, &a, &b, &out)
    })?;
    for result in guards.join() {
        assert_matches!(result?, Err(Error::LengthMismatch));
    }
    Ok(())
}
