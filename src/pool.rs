use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::debug;

use crate::decoder::{decode_archive, DecodeOptions, DecodeStats};
use crate::errors::DecodeError;
use crate::sink::Sink;

/// Archives decoded concurrently unless the caller says otherwise.
pub const DEFAULT_WORKERS: usize = 4;

/// Decodes a batch of archives on a bounded worker pool.
///
/// Each archive is decoded by exactly one worker; workers share nothing
/// but the sink, which must tolerate concurrent appends. Results come back
/// in input order, one per path, but no cross-file ordering of appended
/// samples is promised: a sink that cares must accept out-of-order writes.
///
/// Passing `0` for `workers` selects [`DEFAULT_WORKERS`].
pub fn decode_archives<S: Sink + Sync>(
    paths: &[PathBuf],
    sink: &S,
    options: &DecodeOptions,
    workers: usize,
) -> Vec<Result<DecodeStats, DecodeError>> {
    let workers = match workers {
        0 => DEFAULT_WORKERS,
        n => n,
    }
    .min(paths.len().max(1));
    let next_index = AtomicUsize::new(0);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let next_index = &next_index;
            handles.push(scope.spawn(move || {
                let mut produced = Vec::new();
                loop {
                    let index = next_index.fetch_add(1, Ordering::Relaxed);
                    if index >= paths.len() {
                        break;
                    }
                    let path = &paths[index];
                    debug!(worker, path = %path.display(), "decoding archive");
                    produced.push((index, decode_archive(path, sink, options)));
                }
                produced
            }));
        }

        let mut results: Vec<Option<Result<DecodeStats, DecodeError>>> =
            (0..paths.len()).map(|_| None).collect();
        for handle in handles {
            for (index, result) in handle.join().expect("archive worker panicked") {
                results[index] = Some(result);
            }
        }
        results
            .into_iter()
            .map(|slot| slot.expect("every archive is decoded exactly once"))
            .collect()
    })
}
