//! The chat screen: one session, one router, one compose field, driven by a
//! single select loop.

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use shared::protocol::ClientRequest;
use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    identity::{resolve_identity, SessionContext},
    input::{InputController, KeyPress},
    navigation::Navigation,
    render::{Clock, SystemClock, ViewNode},
    roster::RosterView,
    router::{EventRouter, RouteOutcome},
    session::TransportSession,
    transport::{TransportConnector, TransportError, TransportEvent},
};

/// Upper bound on waiting for the socket to flush `leave_room` and close.
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// User interaction on the chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Key(KeyPress),
    /// Field content changed; cursor in chars, `None` for end of text.
    Input {
        value: String,
        cursor: Option<usize>,
    },
    /// Send button.
    Click,
    Emoji(String),
    ToggleEmoji,
    ClickOutside,
    Logout,
    Unload,
}

/// Receives everything the page renders, in order.
pub trait PageObserver: Send {
    fn entry_appended(&mut self, _entry: &ViewNode) {}
    fn roster_changed(&mut self, _roster: &RosterView) {}
    fn alert(&mut self, _message: &str) {}
    fn navigated(&mut self, _target: &Navigation) {}
}

pub enum PageLoad {
    Ready(Box<ChatPage>),
    Redirect(Navigation),
}

enum Step {
    Transport(TransportEvent),
    Ui(UiAction),
}

pub struct ChatPage {
    session: TransportSession,
    router: EventRouter,
    input: InputController,
    clock: Arc<dyn Clock>,
    events_tx: mpsc::Sender<TransportEvent>,
    events_rx: mpsc::Receiver<TransportEvent>,
    published_entries: usize,
    published_roster: u64,
}

impl ChatPage {
    pub fn load(
        location: &Url,
        settings: &ClientSettings,
        connector: Arc<dyn TransportConnector>,
    ) -> PageLoad {
        Self::load_with_clock(location, settings, connector, Arc::new(SystemClock))
    }

    /// Resolves the identity from `location`. Without one the page redirects
    /// to the entry screen and never touches the connector.
    pub fn load_with_clock(
        location: &Url,
        settings: &ClientSettings,
        connector: Arc<dyn TransportConnector>,
        clock: Arc<dyn Clock>,
    ) -> PageLoad {
        let context = match resolve_identity(location) {
            Ok(context) => context,
            Err(err) => {
                warn!(%location, "redirecting to entry screen: {err}");
                return PageLoad::Redirect(Navigation::Entry);
            }
        };

        let (events_tx, events_rx) = mpsc::channel(settings.event_channel_capacity.max(1));
        PageLoad::Ready(Box::new(Self {
            router: EventRouter::new(&context, Arc::clone(&clock)),
            session: TransportSession::new(context, connector),
            input: InputController::default(),
            clock,
            events_tx,
            events_rx,
            published_entries: 0,
            published_roster: 0,
        }))
    }

    pub fn context(&self) -> &SessionContext {
        self.session.context()
    }

    pub fn session(&self) -> &TransportSession {
        &self.session
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn start(&mut self) -> Result<(), TransportError> {
        self.session.connect(self.events_tx.clone())
    }

    pub async fn next_transport_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }

    /// Runs until the page navigates away or unloads. A closed UI channel
    /// counts as unload.
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::Receiver<UiAction>,
        observer: &mut dyn PageObserver,
    ) -> Option<Navigation> {
        loop {
            let step = tokio::select! {
                Some(event) = self.events_rx.recv() => Step::Transport(event),
                action = ui_rx.recv() => Step::Ui(action.unwrap_or(UiAction::Unload)),
            };
            let flow = match step {
                Step::Transport(event) => self.handle_transport_event(event, observer),
                Step::Ui(action) => self.handle_ui_action(action, observer),
            };
            if let ControlFlow::Break(target) = flow {
                self.await_transport_close().await;
                info!(?target, "chat page closed");
                return target;
            }
        }
    }

    /// Waits, up to [`CLOSE_GRACE`], for the transport to confirm a requested
    /// close. Frames arriving meanwhile are discarded.
    pub async fn await_transport_close(&mut self) {
        if !self.session.is_closing() {
            return;
        }
        let events_rx = &mut self.events_rx;
        let confirmed = timeout(CLOSE_GRACE, async {
            while let Some(event) = events_rx.recv().await {
                if let TransportEvent::Disconnected { reason } = event {
                    debug!(?reason, "transport close confirmed");
                    return true;
                }
            }
            false
        })
        .await;

        match confirmed {
            Ok(true) => self.session.on_transport_disconnected(),
            _ => warn!("transport did not confirm close"),
        }
    }

    pub fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        observer: &mut dyn PageObserver,
    ) -> ControlFlow<Option<Navigation>> {
        let outcome = self.router.handle_transport(&mut self.session, event);
        self.publish(observer);
        match outcome {
            RouteOutcome::Continue => ControlFlow::Continue(()),
            RouteOutcome::Navigate(target) => {
                observer.navigated(&target);
                ControlFlow::Break(Some(target))
            }
        }
    }

    pub fn handle_ui_action(
        &mut self,
        action: UiAction,
        observer: &mut dyn PageObserver,
    ) -> ControlFlow<Option<Navigation>> {
        match action {
            UiAction::Key(press) => {
                let request = self.input.on_key(press, self.clock.as_ref());
                self.send(request);
            }
            UiAction::Input { value, cursor } => self.input.set_value(value, cursor),
            UiAction::Click => {
                let request = self.input.submit(self.clock.as_ref());
                self.send(request);
            }
            UiAction::Emoji(glyph) => self.input.insert_emoji(&glyph),
            UiAction::ToggleEmoji => self.input.toggle_emoji_picker(),
            UiAction::ClickOutside => self.input.on_click_outside(),
            UiAction::Logout => {
                self.session.disconnect();
                let target = Navigation::Entry;
                observer.navigated(&target);
                return ControlFlow::Break(Some(target));
            }
            UiAction::Unload => {
                self.session.disconnect();
                return ControlFlow::Break(None);
            }
        }
        ControlFlow::Continue(())
    }

    fn send(&mut self, request: Option<ClientRequest>) {
        if let Some(request) = request {
            if !self.session.send(&request) {
                debug!(state = ?self.session.state(), "compose submit not delivered");
            }
        }
    }

    fn publish(&mut self, observer: &mut dyn PageObserver) {
        let entries = self.router.conversation().entries();
        for entry in entries.iter().skip(self.published_entries) {
            observer.entry_appended(entry);
        }
        self.published_entries = entries.len();

        let roster = self.router.roster();
        if roster.revision() != self.published_roster {
            self.published_roster = roster.revision();
            observer.roster_changed(roster.view());
        }

        for alert in self.router.take_alerts() {
            observer.alert(&alert);
        }
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
