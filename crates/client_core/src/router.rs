//! Inbound event dispatch.
//!
//! Every transport event and every decoded server event is handled to
//! completion, in arrival order, before the next one is looked at. Failures
//! are isolated to the event that caused them.

use std::sync::Arc;

use shared::protocol::{MessageRecord, ServerEvent, WireMessage};
use tracing::{debug, info, warn};

use crate::{
    identity::SessionContext,
    navigation::Navigation,
    render::{Clock, ConversationView, MessageRenderer},
    roster::RosterStore,
    session::TransportSession,
    transport::TransportEvent,
};

pub const WELCOME_NOTICE: &str = "您已成功加入聊天室！";

pub fn joined_notice(username: &str) -> String {
    format!("{username} 加入了聊天室")
}

pub fn left_notice(username: &str) -> String {
    format!("{username} 离开了聊天室")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Continue,
    Navigate(Navigation),
}

pub struct EventRouter {
    renderer: MessageRenderer,
    roster: RosterStore,
    conversation: ConversationView,
    alerts: Vec<String>,
}

impl EventRouter {
    pub fn new(context: &SessionContext, clock: Arc<dyn Clock>) -> Self {
        Self {
            renderer: MessageRenderer::new(context, clock),
            roster: RosterStore::default(),
            conversation: ConversationView::default(),
            alerts: Vec::new(),
        }
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn conversation(&self) -> &ConversationView {
        &self.conversation
    }

    pub fn renderer(&self) -> &MessageRenderer {
        &self.renderer
    }

    /// Blocking notices raised so far, oldest first.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    pub fn handle_transport(
        &mut self,
        session: &mut TransportSession,
        event: TransportEvent,
    ) -> RouteOutcome {
        match event {
            TransportEvent::Connected => {
                info!(username = %session.context().identity(), "websocket connected");
                session.on_transport_connected();
                RouteOutcome::Continue
            }
            TransportEvent::Frame(frame) => match ServerEvent::decode(&frame) {
                Ok(event) => self.dispatch(session, event),
                Err(err) => {
                    warn!("dropping inbound frame: {err}");
                    RouteOutcome::Continue
                }
            },
            TransportEvent::Disconnected { reason } => {
                info!(?reason, "websocket disconnected");
                session.on_transport_disconnected();
                RouteOutcome::Continue
            }
        }
    }

    pub fn dispatch(&mut self, session: &mut TransportSession, event: ServerEvent) -> RouteOutcome {
        match event {
            ServerEvent::JoinSuccess(payload) => {
                self.roster.replace(payload.online_users);
                self.renderer
                    .add_system_message(&mut self.conversation, WELCOME_NOTICE);
                session.on_join_success();
            }
            ServerEvent::JoinError(rejected) => {
                warn!(reason = %rejected.message, "join rejected by server");
                self.alerts.push(rejected.message);
                session.on_join_error();
                return RouteOutcome::Navigate(Navigation::Entry);
            }
            ServerEvent::NewMessage(wire) => {
                let record = self.validate(wire);
                self.renderer.render(&mut self.conversation, &record);
            }
            ServerEvent::UserJoined(presence) => {
                self.renderer
                    .add_system_message(&mut self.conversation, joined_notice(&presence.username));
            }
            ServerEvent::UserLeft(presence) => {
                self.renderer
                    .add_system_message(&mut self.conversation, left_notice(&presence.username));
            }
            ServerEvent::UpdateUsers(payload) => {
                self.roster.replace(payload.online_users);
            }
            ServerEvent::Unknown { name } => {
                debug!(event = %name, "ignoring unknown server event");
            }
        }
        RouteOutcome::Continue
    }

    fn validate(&self, wire: WireMessage) -> MessageRecord {
        match MessageRecord::try_from(wire.clone()) {
            Ok(record) => record,
            Err(err) => {
                warn!(username = %wire.username, "rendering message as plain text: {err}");
                MessageRecord::degraded(wire)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
