//! Consumes inbound actions from the bus and feeds them to a fixed pool of
//! workers. Actions are partitioned by session id so a session is only ever
//! handled by one worker, in arrival order.

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    dto::action::InboundAction,
    services::dispatcher::Dispatcher,
    state::bus::{BusError, MessageBus},
};

/// Worker index for `session_id` among `workers`.
pub fn partition(session_id: Uuid, workers: usize) -> usize {
    (session_id.as_u128() % workers.max(1) as u128) as usize
}

/// Take the bus's action queue and start `workers` sequential workers.
///
/// Actions published before this call stay queued and are dispatched once the
/// consumer runs.
pub fn spawn_action_consumer(
    dispatcher: Dispatcher,
    bus: Arc<dyn MessageBus>,
    workers: usize,
) -> Result<JoinHandle<()>, BusError> {
    let workers = workers.max(1);
    let mut actions = bus.consume_actions()?;

    let queues: Vec<mpsc::UnboundedSender<InboundAction>> = (0..workers)
        .map(|index| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_worker(index, dispatcher.clone(), rx));
            tx
        })
        .collect();

    Ok(tokio::spawn(async move {
        while let Some(action) = actions.recv().await {
            let index = partition(action.game_session_id, workers);
            if queues[index].send(action).is_err() {
                error!(worker = index, "action worker stopped; dropping action");
            }
        }
        debug!("action queue closed; stopping consumer");
    }))
}

async fn run_worker(
    index: usize,
    dispatcher: Dispatcher,
    mut queue: mpsc::UnboundedReceiver<InboundAction>,
) {
    while let Some(action) = queue.recv().await {
        let session = action.game_session_id;
        if let Err(err) = dispatcher.dispatch(action).await {
            error!(worker = index, session = %session, error = %err, "failed to process action");
        }
    }
    debug!(worker = index, "action worker stopped");
}
