//! Order-preserving async map with a concurrency cap.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join_all;

/// Apply `worker` to every item with at most `limit` workers in flight.
///
/// Results come back in input order. Each worker claims the next unclaimed
/// index, so a slow item never blocks the others. The first error is
/// returned once every in-flight worker has been polled to completion or
/// dropped. A `limit` of 0 or 1 runs the items one after another.
pub async fn map_with_limit<T, R, E, F, Fut>(items: &[T], limit: usize, worker: F) -> Result<Vec<R>, E>
where
    F: Fn(&T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    if limit <= 1 {
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(worker(item, i).await?);
        }
        return Ok(out);
    }

    let next = AtomicUsize::new(0);
    let (next, worker) = (&next, &worker);
    let runners = (0..limit.min(items.len())).map(move |_| async move {
        let mut done = Vec::new();
        loop {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(i) else { break };
            done.push((i, worker(item, i).await?));
        }
        Ok::<_, E>(done)
    });

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    for batch in try_join_all(runners).await? {
        for (i, r) in batch {
            slots[i] = Some(r);
        }
    }
    // Every index below `items.len()` was claimed by exactly one runner.
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_preserves_input_order() {
        let items = vec![30u64, 10, 20, 5];
        let out = map_with_limit(&items, 3, |ms, i| {
            let ms = *ms;
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, Infallible>((i, ms))
            }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![(0, 30), (1, 10), (2, 20), (3, 5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let (in_flight, peak) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let (in_flight, peak) = (&in_flight, &peak);
        let items: Vec<u32> = (0..10).collect();

        map_with_limit(&items, 3, move |_, _| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        })
        .await
        .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_limit_one_is_sequential() {
        let order = std::sync::Mutex::new(Vec::new());
        let items = vec!["a", "b", "c"];
        let out = map_with_limit(&items, 1, |s, _| {
            order.lock().unwrap().push(*s);
            let s = s.to_uppercase();
            async move { Ok::<_, Infallible>(s) }
        })
        .await
        .unwrap();
        assert_eq!(out, vec!["A", "B", "C"]);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_limit_zero_treated_as_one() {
        let items = vec![1, 2];
        let out = map_with_limit(&items, 0, |n, _| {
            let n = *n;
            async move { Ok::<_, Infallible>(n * 2) }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let items: Vec<u8> = Vec::new();
        let out = map_with_limit(&items, 4, |_, _| async { Ok::<u8, Infallible>(0) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_item_does_not_hold_back_the_rest() {
        let items: Vec<u64> = (0..10).map(|i| if i == 2 { 500 } else { 10 }).collect();
        let finished = std::sync::Mutex::new(Vec::new());
        let finished = &finished;
        let start = tokio::time::Instant::now();

        let out = map_with_limit(&items, 3, |ms, i| {
            let ms = *ms;
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                finished.lock().unwrap().push(i);
                Ok::<_, Infallible>(i * 100)
            }
        })
        .await
        .unwrap();

        assert_eq!(out, (0..10).map(|i| i * 100).collect::<Vec<_>>());
        // The other two workers drain the remaining items meanwhile.
        assert_eq!(finished.lock().unwrap().last(), Some(&2));
        assert!(start.elapsed() < Duration::from_millis(510));
    }

    #[tokio::test]
    async fn test_first_error_propagates() {
        let items = vec![1, 2, 3, 4];
        let result = map_with_limit(&items, 2, |n, _| {
            let n = *n;
            async move {
                if n == 3 {
                    Err(format!("bad {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "bad 3");
    }
}
