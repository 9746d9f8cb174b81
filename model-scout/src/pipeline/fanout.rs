//! Per-item concurrent work where one failing item cannot take down its siblings.

use std::future::Future;

use log::error;
use tokio::task::JoinSet;

/// Run `task` for every item concurrently and collect the outputs in input order.
///
/// Each item runs in its own task. If a task panics or is cancelled, that item's output is
/// `fallback(index)` and the other items are unaffected.
pub async fn fan_out<I, T, F, Fut, D>(items: Vec<I>, task: F, fallback: D) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    D: Fn(usize) -> T,
{
    let count = items.len();
    let mut set = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let work = task(item);
        set.spawn(async move { (index, work.await) });
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, output)) => slots[index] = Some(output),
            Err(err) => error!("fan-out task failed: {}", err),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| fallback(index)))
        .collect()
}
