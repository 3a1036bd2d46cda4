use crate::buffer::BoundedQueue;
use crate::domain::WorkItem;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Push one `WorkItem::Stop` per worker.
///
/// Uses `try_enqueue` and retries while the queue is full, giving up once
/// every worker has already exited: a blocking enqueue could wait forever
/// when the remaining consumers left through the stop flag instead of a
/// sentinel. Returns how many sentinels were enqueued.
pub fn deliver_sentinels<R>(
    queue: &BoundedQueue<WorkItem>,
    workers: &[JoinHandle<R>],
    retry_delay: Duration,
) -> usize {
    let mut delivered = 0;
    while delivered < workers.len() {
        if workers.iter().all(JoinHandle::is_finished) {
            debug!(delivered, "all workers exited before every sentinel was delivered");
            break;
        }
        match queue.try_enqueue(WorkItem::Stop) {
            Ok(()) => delivered += 1,
            Err(_) => std::thread::sleep(retry_delay),
        }
    }
    delivered
}
