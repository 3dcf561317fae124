use futures::StreamExt;
use tracing::{info, warn};

use crate::conversation::ChatMessage;
use crate::relay_client::RelayClient;
use crate::render::RenderSurface;
use crate::session::{Effect, Session, SlotId, UiEvent};

/// Dispatches one event, applies its effects, and runs any relay exchange it
/// started to completion.
pub async fn handle_event(
    session: &mut Session,
    client: &RelayClient,
    surface: &mut dyn RenderSurface,
    event: UiEvent,
) {
    let mut requests = Vec::new();
    for effect in session.dispatch(event) {
        if let Effect::SendToRelay { slot, messages } = &effect {
            requests.push((*slot, messages.clone()));
        }
        surface.apply(&effect);
    }
    for (slot, messages) in requests {
        drive_reply(session, client, surface, slot, &messages).await;
    }
}

/// Folds the relay's reply into the session, one render effect per delta.
pub async fn drive_reply(
    session: &mut Session,
    client: &RelayClient,
    surface: &mut dyn RenderSurface,
    slot: SlotId,
    messages: &[ChatMessage],
) {
    let failure = match client.send(messages).await {
        Ok(reply) => {
            let mut deltas = reply.into_deltas();
            let mut failure = None;
            while let Some(item) = deltas.next().await {
                match item {
                    Ok(delta) => {
                        for effect in session.dispatch(UiEvent::ReplyChunk { slot, delta }) {
                            surface.apply(&effect);
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            failure
        }
        Err(e) => Some(e),
    };

    let event = match failure {
        None => {
            info!("Reply for slot {} complete", slot);
            UiEvent::ReplyFinished { slot }
        }
        Some(e) => {
            warn!("Reply for slot {} failed: {}", slot, e);
            UiEvent::ReplyFailed {
                slot,
                error: e.to_string(),
            }
        }
    };
    for effect in session.dispatch(event) {
        surface.apply(&effect);
    }
}
