//! Initialization logic: launch configurations and worker lifecycle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use log::{debug, error};

use crate::error::{Error, Result};
use crate::factory::{ThreadControl, ThreadFactory};
use crate::rendezvous::{BlockingBarrier, Rendezvous, SingleThread, SpinBarrier};

/// Possible configurations for launching a parallel region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Config {
    /// One worker on one thread.
    Thread,
    /// Native threads with an OS-blocking barrier.
    Process(usize),
    /// Native threads with a spinning barrier, for short phases.
    ProcessSpin(usize),
    /// A dedicated worker pool with an OS-blocking barrier.
    Pool(usize),
}

impl Config {
    /// The number of workers this configuration launches.
    pub fn peers(&self) -> usize {
        match *self {
            Config::Thread => 1,
            Config::Process(peers) | Config::ProcessSpin(peers) | Config::Pool(peers) => peers,
        }
    }

    /// The rendezvous backend this configuration installs in the factory.
    fn rendezvous(&self) -> Arc<dyn Rendezvous> {
        match *self {
            Config::Thread => Arc::new(SingleThread),
            Config::Process(peers) | Config::Pool(peers) => Arc::new(BlockingBarrier::new(peers)),
            Config::ProcessSpin(peers) => Arc::new(SpinBarrier::new(peers)),
        }
    }
}

/// Launches a parallel region and runs `func` once per worker.
///
/// This method builds a [`ThreadFactory`] with the configuration's rendezvous
/// backend, launches one worker per peer, and invokes the supplied function
/// with that worker's [`ThreadControl`]. The returned [`WorkerGuards`] can be
/// `join`ed to retrieve the workers' results.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use lockstep::{Config, SharedBuffer};
///
/// let a = Arc::new(vec![1.0, 2.0, 3.0]);
/// let b = Arc::new(vec![3.0, 2.0, 1.0]);
/// let out = Arc::new(SharedBuffer::new(3));
///
/// let sums = Arc::clone(&out);
/// let guards = lockstep::execute(Config::Process(2), move |control| {
///     lockstep::vector_add(&control, &a, &b, &sums)
/// }).unwrap();
///
/// for result in guards.join() {
///     result.unwrap().unwrap();
/// }
/// assert_eq!(out.to_vec(), vec![4.0; 3]);
/// ```
pub fn execute<T, F>(config: Config, func: F) -> Result<WorkerGuards<T>>
where
    T: Send + 'static,
    F: Fn(ThreadControl) -> T + Send + Sync + 'static,
{
    let peers = config.peers();
    if peers == 0 {
        return Err(Error::NoWorkers);
    }
    match config {
        Config::Pool(_) => execute_pooled(config.rendezvous(), peers, func),
        _ => execute_with(config.rendezvous(), peers, func),
    }
}

/// Launches a parallel region of `peers` native threads coordinated by a
/// caller-supplied rendezvous.
///
/// This is the injection point for synchronization mechanisms the crate does
/// not ship: anything implementing [`Rendezvous`] for `peers` participants can
/// coordinate the region.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use lockstep::rendezvous::BlockingBarrier;
///
/// let barrier = Arc::new(BlockingBarrier::new(3));
/// let guards = lockstep::execute_with(barrier, 3, |control| {
///     control.sync();
///     control.index()
/// }).unwrap();
///
/// let indices: Vec<_> = guards.join().into_iter().map(Result::unwrap).collect();
/// assert_eq!(indices, vec![0, 1, 2]);
/// ```
pub fn execute_with<T, F>(
    rendezvous: Arc<dyn Rendezvous>,
    peers: usize,
    func: F,
) -> Result<WorkerGuards<T>>
where
    T: Send + 'static,
    F: Fn(ThreadControl) -> T + Send + Sync + 'static,
{
    if peers == 0 {
        return Err(Error::NoWorkers);
    }
    let factory = Arc::new(ThreadFactory::new(rendezvous));
    let logic = Arc::new(func);
    debug!("spawning {peers} worker threads");
    let mut guards = Vec::with_capacity(peers);
    for index in 0..peers {
        let clone = Arc::clone(&logic);
        let control = factory.control(index, peers);
        guards.push(
            thread::Builder::new()
                .name(format!("{}:work-{index}", crate::THREAD_NAME_PREFIX))
                .spawn(move || (*clone)(control))
                .map_err(Error::Spawn)?,
        );
    }
    Ok(WorkerGuards {
        inner: Some(GuardsInner::Threads(guards)),
    })
}

/// Launches a parallel region on a dedicated pool of exactly `peers` threads.
fn execute_pooled<T, F>(
    rendezvous: Arc<dyn Rendezvous>,
    peers: usize,
    func: F,
) -> Result<WorkerGuards<T>>
where
    T: Send + 'static,
    F: Fn(ThreadControl) -> T + Send + Sync + 'static,
{
    let factory = Arc::new(ThreadFactory::new(rendezvous));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(peers)
        .thread_name(|index| format!("{}:pool-{index}", crate::THREAD_NAME_PREFIX))
        .build()
        .map_err(Error::PoolBuild)?;
    let (results_send, results_recv) = crossbeam_channel::bounded(peers);
    let logic = Arc::new(func);
    debug!("launching {peers} pool workers");
    pool.spawn_broadcast(move |context| {
        let control = factory.control(context.index(), context.num_threads());
        let result = panic::catch_unwind(AssertUnwindSafe(|| (*logic)(control)))
            .map_err(Error::from_panic_payload);
        // If the guards were forgotten there is no listener; nothing to do.
        let _ = results_send.send((context.index(), result));
    });
    Ok(WorkerGuards {
        inner: Some(GuardsInner::Pool {
            _pool: pool,
            results: results_recv,
            peers,
        }),
    })
}

/// Maintains handles to the launched workers of a parallel region.
///
/// Dropping the guards waits for the workers to finish; panics observed while
/// reaping are logged rather than resurfaced. Use [`join`](Self::join) to
/// retrieve per-worker results instead.
#[derive(Debug)]
pub struct WorkerGuards<T: Send + 'static> {
    inner: Option<GuardsInner<T>>,
}

#[derive(Debug)]
enum GuardsInner<T: Send + 'static> {
    Threads(Vec<thread::JoinHandle<T>>),
    Pool {
        // Kept alive until every worker has reported in.
        _pool: rayon::ThreadPool,
        results: Receiver<(usize, Result<T>)>,
        peers: usize,
    },
}

impl<T: Send + 'static> WorkerGuards<T> {
    /// Waits on the workers and returns their results in worker-index order.
    ///
    /// A worker that panicked yields [`Error::WorkerPanic`] in its slot.
    pub fn join(mut self) -> Vec<Result<T>> {
        match self.inner.take() {
            None => Vec::new(),
            Some(GuardsInner::Threads(guards)) => guards
                .into_iter()
                .map(|guard| guard.join().map_err(Error::from_panic_payload))
                .collect(),
            Some(GuardsInner::Pool { results, peers, .. }) => {
                let mut collected: Vec<Option<Result<T>>> = (0..peers).map(|_| None).collect();
                for _ in 0..peers {
                    match results.recv() {
                        Ok((index, result)) => collected[index] = Some(result),
                        Err(_) => break,
                    }
                }
                collected
                    .into_iter()
                    .map(|slot| {
                        slot.unwrap_or_else(|| {
                            Err(Error::WorkerPanic("worker produced no result".to_string()))
                        })
                    })
                    .collect()
            }
        }
    }
}

impl<T: Send + 'static> Drop for WorkerGuards<T> {
    fn drop(&mut self) {
        match self.inner.take() {
            None => {}
            Some(GuardsInner::Threads(guards)) => {
                for guard in guards {
                    if guard.join().is_err() {
                        error!("worker thread panicked");
                    }
                }
            }
            Some(GuardsInner::Pool { results, peers, .. }) => {
                for _ in 0..peers {
                    match results.recv() {
                        Ok((index, Err(err))) => error!("pool worker {index} failed: {err}"),
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
            }
        }
    }
}
