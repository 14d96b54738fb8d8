//! Item count batches
//!
//! Keys are fetched with bounded concurrency and each result is reported as
//! soon as it arrives. The whole batch runs under one deadline; when it
//! passes with keys still missing (slow or failed), the browser is told so
//! it can stop waiting for the rest.

use std::sync::Arc;
use std::time::Duration;

use canopy_core::ContainerKey;
use canopy_store::StoreClient;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::browser::{BrowserId, CounterId};
use crate::message::Message;

pub(super) fn spawn_counts<S>(
    browser: BrowserId,
    counter: CounterId,
    keys: Vec<ContainerKey>,
    store: Arc<S>,
    msg_tx: mpsc::Sender<Message>,
    concurrency: usize,
    deadline: Duration,
) -> JoinHandle<()>
where
    S: StoreClient + Sync + 'static,
{
    tokio::spawn(async move {
        let started = Instant::now();
        let total = keys.len();
        let mut failed = 0usize;
        let fetches = stream::iter(keys)
            .map(|key| {
                let store = store.clone();
                async move {
                    let result = store
                        .fetch_container_count(key)
                        .await
                        .map_err(|e| e.to_string());
                    (key, result)
                }
            })
            .buffer_unordered(concurrency.max(1));

        let report = fetches.for_each(|(key, result)| {
            if result.is_err() {
                failed += 1;
            }
            let msg_tx = msg_tx.clone();
            async move {
                let msg = Message::CountFetched {
                    browser,
                    counter,
                    key,
                    result,
                };
                if msg_tx.send(msg).await.is_err() {
                    debug!("Engine gone, dropping count of {}", key);
                }
            }
        });

        let finished = tokio::time::timeout(deadline, report).await.is_ok();
        if finished && failed == 0 {
            debug!("Count batch {} finished ({} keys)", counter, total);
            return;
        }
        if finished {
            debug!(
                "Count batch {} finished with {}/{} failed keys",
                counter, failed, total
            );
            tokio::time::sleep_until(started + deadline).await;
        }
        warn!(
            "Count batch {} passed its {}ms deadline",
            counter,
            deadline.as_millis()
        );
        let _ = msg_tx
            .send(Message::CountTimedOut { browser, counter })
            .await;
    })
}
