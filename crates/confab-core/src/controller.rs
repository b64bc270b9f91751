//! The session controller actor.
//!
//! One task owns the `SessionState` and everything that can touch it:
//! commands from the owning view, completions from spawned API calls,
//! frames from the realtime subscription, and typewriter ticks all funnel
//! into a single `tokio::select!` loop. Each event runs through the
//! reducer; the returned effects are interpreted here -- spawning HTTP
//! work, tearing down and reopening the channel subscription as one atomic
//! transition, driving the playback slot, and forwarding view-facing
//! effects.
//!
//! State reaches the presentation layer two ways: a `watch` channel carries
//! the full [`SessionSnapshot`] after every applied event, and an mpsc of
//! [`ViewEvent`] carries one-shot imperatives (scroll, notices).

use chrono::Utc;
use confab_types::chat::{ChatItem, Rating};
use confab_types::ids::{ChatId, FeedbackId, ItemId, VisitorId};
use confab_types::wire::ChannelFrame;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use std::sync::Arc;

use crate::ports::{ChannelSubscription, ChatApi, RealtimeConnector, VisitorStore};
use crate::session::state::{CHAT_NAME_LIMIT, PAGE_SIZE, TOP_SCROLL_THRESHOLD, TYPEWRITER_INTERVAL};
use crate::session::{Effect, SessionEvent, SessionState, Severity};
use crate::typewriter::Typewriter;

/// Commands the owning view can issue.
#[derive(Debug, Clone)]
pub enum Command {
    /// The externally supplied conversation identifier changed.
    SwitchChat { chat_id: Option<ChatId> },
    /// Submit a question.
    Send { question: String },
    /// The scroll position changed; near-top positions trigger pagination.
    ScrollChanged { offset_from_top: f32 },
    /// Create or update feedback on an answered item.
    SubmitFeedback {
        item_id: ItemId,
        rating: Rating,
        comment: String,
        existing: Option<FeedbackId>,
    },
    /// Stop the controller and release its resources.
    Shutdown,
}

/// One-shot imperatives forwarded to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Stick the scroll position to the newest item once rendered.
    ScrollToBottom,
    /// `count` older items were prepended; compensate the scroll offset.
    HistoryPrepended { count: usize },
    /// A conversation was created lazily for the first exchange.
    ConversationCreated { chat_id: ChatId },
    /// User-visible notification.
    Notice { severity: Severity, message: String },
}

/// Immutable copy of the observable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub chat_id: Option<ChatId>,
    pub chat_name: Option<String>,
    pub items: Vec<ChatItem>,
    /// Whether the assistant is occupied with an exchange.
    pub typing: bool,
    /// Revealed prefix of the answer being played back.
    pub typing_buffer: String,
    pub loading_initial: bool,
    pub loading_more: bool,
    pub has_more: bool,
    pub page: u32,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            chat_id: state.chat_id.clone(),
            chat_name: state.chat_name.clone(),
            items: state.items.clone(),
            typing: state.is_busy(),
            typing_buffer: state.typing_buffer.clone(),
            loading_initial: state.loading_initial,
            loading_more: state.loading_more,
            has_more: state.has_more,
            page: state.page,
        }
    }
}

/// The controller task is gone; the session can no longer be driven.
#[derive(Debug, thiserror::Error)]
#[error("session controller is no longer running")]
pub struct EngineClosed;

/// Cheap, cloneable handle for driving a running controller.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn switch_chat(&self, chat_id: Option<ChatId>) -> Result<(), EngineClosed> {
        self.command(Command::SwitchChat { chat_id }).await
    }

    pub async fn send(&self, question: impl Into<String>) -> Result<(), EngineClosed> {
        self.command(Command::Send {
            question: question.into(),
        })
        .await
    }

    pub async fn scroll_changed(&self, offset_from_top: f32) -> Result<(), EngineClosed> {
        self.command(Command::ScrollChanged { offset_from_top }).await
    }

    pub async fn submit_feedback(
        &self,
        item_id: ItemId,
        rating: Rating,
        comment: impl Into<String>,
        existing: Option<FeedbackId>,
    ) -> Result<(), EngineClosed> {
        self.command(Command::SubmitFeedback {
            item_id,
            rating,
            comment: comment.into(),
            existing,
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<(), EngineClosed> {
        self.command(Command::Shutdown).await
    }

    /// The current state snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A watch receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    async fn command(&self, command: Command) -> Result<(), EngineClosed> {
        self.commands.send(command).await.map_err(|_| EngineClosed)
    }
}

/// Spawn a controller for one session.
///
/// Returns the driving handle, the stream of view-facing effects, and the
/// controller task handle. The controller stops when `Shutdown` is sent or
/// every `SessionHandle` is dropped.
pub fn spawn<A, R, V>(
    api: A,
    connector: R,
    visitor: V,
    initial_chat: Option<ChatId>,
) -> (SessionHandle, mpsc::Receiver<ViewEvent>, JoinHandle<()>)
where
    A: ChatApi,
    R: RealtimeConnector,
    V: VisitorStore,
{
    let (commands_tx, commands_rx) = mpsc::channel(32);
    let (events_tx, events_rx) = mpsc::channel(64);
    let (view_tx, view_rx) = mpsc::channel(64);
    let (connects_tx, connects_rx) = mpsc::channel(4);
    let state = SessionState::new(None);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::from(&state));

    let controller = SessionController {
        api: Arc::new(api),
        connector: Arc::new(connector),
        visitor: Arc::new(visitor),
        state,
        typewriter: Typewriter::new(TYPEWRITER_INTERVAL),
        channel: None,
        initial_chat,
        events_tx,
        events_rx,
        commands_rx,
        connects_tx,
        connects_rx,
        view_tx,
        snapshot_tx,
    };
    let task = tokio::spawn(controller.run());

    (
        SessionHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
        },
        view_rx,
        task,
    )
}

/// A realtime subscription that finished connecting.
struct Connected {
    chat_id: ChatId,
    subscription: ChannelSubscription,
}

struct SessionController<A, R, V> {
    api: Arc<A>,
    connector: Arc<R>,
    visitor: Arc<V>,
    state: SessionState,
    typewriter: Typewriter,
    channel: Option<ChannelSubscription>,
    initial_chat: Option<ChatId>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    commands_rx: mpsc::Receiver<Command>,
    connects_tx: mpsc::Sender<Connected>,
    connects_rx: mpsc::Receiver<Connected>,
    view_tx: mpsc::Sender<ViewEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<A, R, V> SessionController<A, R, V>
where
    A: ChatApi,
    R: RealtimeConnector,
    V: VisitorStore,
{
    async fn run(mut self) {
        let initial = self.initial_chat.take();
        self.apply(SessionEvent::ChatSwitched { chat_id: initial }).await;

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    let Some(command) = command else { break };
                    if matches!(command, Command::Shutdown) {
                        break;
                    }
                    self.handle_command(command).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.apply(event).await;
                }
                Some(connected) = self.connects_rx.recv() => {
                    self.adopt_subscription(connected);
                }
                frame = Self::next_frame(&mut self.channel) => {
                    match frame {
                        Some(frame) => {
                            let event = Self::frame_event(frame);
                            self.apply(event).await;
                        }
                        None => {
                            tracing::info!("realtime channel closed by the server");
                            self.channel = None;
                        }
                    }
                }
            }
        }

        self.disconnect_channel();
        self.typewriter.cancel();
        tracing::debug!("session controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SwitchChat { chat_id } => {
                self.apply(SessionEvent::ChatSwitched { chat_id }).await;
            }
            Command::Send { question } => {
                let now = Utc::now();
                self.apply(SessionEvent::SendStarted {
                    temp_id: ItemId::temp(now.timestamp_millis()),
                    question,
                    at: now,
                })
                .await;
            }
            Command::ScrollChanged { offset_from_top } => {
                if offset_from_top <= TOP_SCROLL_THRESHOLD {
                    let page = self.state.page + 1;
                    self.apply(SessionEvent::HistoryRequested { page }).await;
                }
            }
            Command::SubmitFeedback {
                item_id,
                rating,
                comment,
                existing,
            } => {
                self.apply(SessionEvent::FeedbackSubmitted {
                    item_id,
                    rating,
                    comment,
                    existing,
                })
                .await;
            }
            // Handled by the run loop before dispatch.
            Command::Shutdown => {}
        }
    }

    /// Run one event through the reducer, perform its effects, and publish
    /// the resulting snapshot.
    async fn apply(&mut self, event: SessionEvent) {
        let effects = self.state.apply(event);
        for effect in effects {
            self.perform(effect).await;
        }
        let _ = self.snapshot_tx.send(SessionSnapshot::from(&self.state));
    }

    async fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::FetchHistory { chat_id, page } => self.spawn_fetch(chat_id, page),
            Effect::DispatchSend { question } => self.spawn_send(question),
            Effect::DispatchFeedback {
                item_id,
                rating,
                comment,
                existing,
            } => self.spawn_feedback(item_id, rating, comment, existing),
            Effect::ConnectChannel { chat_id } => self.spawn_connect(chat_id),
            Effect::DisconnectChannel => self.disconnect_channel(),
            Effect::StartPlayback => self.typewriter.start(self.events_tx.clone()),
            Effect::StopPlayback => self.typewriter.cancel(),
            Effect::StoreVisitorId { visitor_id } => {
                if let Err(error) = self.visitor.store(&visitor_id) {
                    tracing::warn!(error = %error, "failed to persist visitor identity");
                }
            }
            Effect::ScrollToBottom => self.forward(ViewEvent::ScrollToBottom).await,
            Effect::HistoryPrepended { count } => {
                self.forward(ViewEvent::HistoryPrepended { count }).await;
            }
            Effect::ConversationCreated { chat_id } => {
                self.forward(ViewEvent::ConversationCreated { chat_id }).await;
            }
            Effect::Notify { severity, message } => {
                self.forward(ViewEvent::Notice { severity, message }).await;
            }
        }
    }

    async fn forward(&self, event: ViewEvent) {
        let _ = self.view_tx.send(event).await;
    }

    fn spawn_fetch(&self, chat_id: ChatId, page: u32) {
        let api = Arc::clone(&self.api);
        let visitor = Arc::clone(&self.visitor);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let visitor_id = load_visitor(visitor.as_ref());
            let event = match api
                .fetch_history(&chat_id, page, PAGE_SIZE, visitor_id.as_ref())
                .await
            {
                Ok(data) => SessionEvent::HistoryLoaded {
                    chat_id,
                    page,
                    data,
                },
                Err(error) => SessionEvent::HistoryFailed {
                    chat_id,
                    page,
                    error,
                },
            };
            let _ = events.send(event).await;
        });
    }

    /// The send pipeline: create the conversation first when none exists,
    /// then submit the question. Both completions flow back as events so
    /// reconciliation always runs against current state.
    fn spawn_send(&self, question: String) {
        let api = Arc::clone(&self.api);
        let visitor = Arc::clone(&self.visitor);
        let events = self.events_tx.clone();
        let chat_id = self.state.chat_id.clone();
        tokio::spawn(async move {
            let mut visitor_id = load_visitor(visitor.as_ref());
            let chat_id = match chat_id {
                Some(id) => id,
                None => {
                    let name = chat_name_from(&question);
                    match api.create_chat(&name, visitor_id.as_ref()).await {
                        Ok(created) => {
                            let id = created.id.clone();
                            if created.visitor_id.is_some() {
                                visitor_id = created.visitor_id.clone();
                            }
                            if events
                                .send(SessionEvent::ChatCreated { chat: created })
                                .await
                                .is_err()
                            {
                                return;
                            }
                            id
                        }
                        Err(error) => {
                            let _ = events.send(SessionEvent::SendFailed { error }).await;
                            return;
                        }
                    }
                }
            };
            let event = match api
                .send_question(&question, Some(&chat_id), visitor_id.as_ref())
                .await
            {
                Ok(reply) => SessionEvent::SendCompleted { reply },
                Err(error) => SessionEvent::SendFailed { error },
            };
            let _ = events.send(event).await;
        });
    }

    fn spawn_feedback(
        &self,
        item_id: ItemId,
        rating: Rating,
        comment: String,
        existing: Option<FeedbackId>,
    ) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = match &existing {
                Some(feedback_id) => api.update_feedback(feedback_id, rating, &comment).await,
                None => api.create_feedback(&item_id, rating, &comment).await,
            };
            let event = match result {
                Ok(feedback) => SessionEvent::FeedbackSaved {
                    item_id,
                    feedback,
                    updated: existing.is_some(),
                },
                Err(error) => SessionEvent::FeedbackFailed { error },
            };
            let _ = events.send(event).await;
        });
    }

    /// Open a subscription in the background. The old subscription is
    /// already gone (the reducer emits `DisconnectChannel` first), so frame
    /// delivery for the previous session has ended before this starts.
    fn spawn_connect(&mut self, chat_id: ChatId) {
        self.disconnect_channel();
        let connector = Arc::clone(&self.connector);
        let connects = self.connects_tx.clone();
        tokio::spawn(async move {
            match connector.connect(&chat_id).await {
                Ok(subscription) => {
                    let _ = connects
                        .send(Connected {
                            chat_id,
                            subscription,
                        })
                        .await;
                }
                Err(error) => {
                    tracing::warn!(chat_id = %chat_id, error = %error, "realtime connect failed");
                }
            }
        });
    }

    fn adopt_subscription(&mut self, connected: Connected) {
        if Some(&connected.chat_id) == self.state.chat_id.as_ref() {
            tracing::debug!(chat_id = %connected.chat_id, "realtime channel connected");
            self.channel = Some(connected.subscription);
        } else {
            // The session moved on while the connect was in flight;
            // dropping the subscription cancels it.
            tracing::debug!(chat_id = %connected.chat_id, "discarding stale realtime connection");
        }
    }

    fn disconnect_channel(&mut self) {
        if let Some(subscription) = self.channel.take() {
            subscription.close();
        }
    }

    async fn next_frame(channel: &mut Option<ChannelSubscription>) -> Option<ChannelFrame> {
        match channel {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    fn frame_event(frame: ChannelFrame) -> SessionEvent {
        match frame {
            ChannelFrame::ChatReceive {
                chat_id,
                question,
                answer,
            } => {
                let now = Utc::now();
                SessionEvent::BroadcastReceived {
                    chat_id,
                    question,
                    answer,
                    temp_id: ItemId::temp(now.timestamp_millis()),
                    at: now,
                }
            }
            ChannelFrame::ChatResponse(envelope) => SessionEvent::AckReceived { envelope },
        }
    }
}

fn load_visitor<V: VisitorStore>(store: &V) -> Option<VisitorId> {
    match store.load() {
        Ok(visitor_id) => visitor_id,
        Err(error) => {
            tracing::warn!(error = %error, "failed to load visitor identity");
            None
        }
    }
}

/// Derive a conversation name from its first question.
fn chat_name_from(question: &str) -> String {
    let mut name: String = question.chars().take(CHAT_NAME_LIMIT).collect();
    if question.chars().count() > CHAT_NAME_LIMIT {
        name.push_str("...");
    }
    name
}
