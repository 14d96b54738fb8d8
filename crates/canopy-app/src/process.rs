//! Message processing
//!
//! Runs TEA updates to completion (following up chained messages) and hands
//! every resulting action to the action layer.

use std::sync::Arc;

use canopy_store::StoreClient;
use tokio::sync::mpsc;

use crate::actions::{handle_action, TaskMap};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message<S>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    store: &Arc<S>,
    tasks: &TaskMap,
) where
    S: StoreClient + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(
                action,
                msg_tx.clone(),
                store.clone(),
                tasks.clone(),
                &state.settings.loading,
            );
        }

        // Continue with follow-up message
        msg = result.message;
    }
}
