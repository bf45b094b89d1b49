//! Chat session — conversation state, tour control, and message dispatch.

use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::intent::TOUR_INTENT_ID;
use crate::catalog::{IntentCatalog, TourScript, TourStep};
use crate::config::BotConfig;
use crate::nav::Navigator;
use crate::session::event::SessionEvent;
use crate::session::message::ChatMessage;

/// Token that, combined with a tour-intent match, chains a free-text message
/// into starting the guided tour.
const START_TOKEN: &str = "start";

/// Closing line when the tour runs to completion.
const TOUR_CONCLUSION: &str = "That concludes our tour! Feel free to explore the platform \
                               and ask if you have any questions.";

/// Closing line when the tour is ended explicitly.
const TOUR_ENDED: &str = "Tour ended. Is there anything else I can help you with?";

const HELP_NAVIGATION_REPLY: &str = "Our platform has several main sections: Home for \
                                     viewing posts, Create Post for sharing content, \
                                     Communities for joining groups, and more. What would \
                                     you like help finding?";

const ASK_QUESTION_REPLY: &str = "What question do you have about our platform? I can help \
                                  with features, posting, communities, and more.";

/// Predefined UI shortcuts that bypass free-text intent matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    StartTour,
    HelpNavigation,
    AskQuestion,
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start_tour" => Ok(Self::StartTour),
            "help_navigation" => Ok(Self::HelpNavigation),
            "ask_question" => Ok(Self::AskQuestion),
            _ => Err(format!("Unknown quick action: {s}")),
        }
    }
}

/// Point-in-time copy of the session for REST reads.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub is_open: bool,
    pub is_tour_active: bool,
    pub current_tour_step: usize,
    pub messages: Vec<ChatMessage>,
}

/// Mutable session fields, guarded by one lock.
#[derive(Debug)]
struct SessionState {
    is_open: bool,
    messages: Vec<ChatMessage>,
    is_tour_active: bool,
    tour_step: usize,
    /// One-shot guard for `initialize()`. `clear()` does not touch this;
    /// it re-seeds through its own explicit path.
    welcomed: bool,
}

struct SessionInner {
    catalog: IntentCatalog,
    tour: TourScript,
    navigator: Arc<dyn Navigator>,
    config: BotConfig,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    rng: Mutex<StdRng>,
}

/// A single chatbot session: message history, open/closed state, and tour
/// progress. Exactly one instance exists per active UI surface; nothing is
/// persisted across sessions. The handle is cheap to clone — all clones share
/// the same state.
///
/// All mutation happens in response to discrete calls. The only deferred work
/// is the fixed-delay bot reply, spawned per submission with no cancellation:
/// a reply scheduled before the widget closes still lands afterwards.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    /// Create a session with an entropy-seeded response picker.
    pub fn new(
        catalog: IntentCatalog,
        tour: TourScript,
        navigator: Arc<dyn Navigator>,
        config: BotConfig,
    ) -> Self {
        Self::build(catalog, tour, navigator, config, StdRng::from_entropy())
    }

    /// Create a session with a deterministic response picker. Tests use this
    /// to pin which canned response gets selected.
    pub fn with_rng_seed(
        catalog: IntentCatalog,
        tour: TourScript,
        navigator: Arc<dyn Navigator>,
        config: BotConfig,
        seed: u64,
    ) -> Self {
        Self::build(catalog, tour, navigator, config, StdRng::seed_from_u64(seed))
    }

    fn build(
        catalog: IntentCatalog,
        tour: TourScript,
        navigator: Arc<dyn Navigator>,
        config: BotConfig,
        rng: StdRng,
    ) -> Self {
        let (events, _) = broadcast::channel(config.broadcast_capacity);
        Self {
            inner: Arc::new(SessionInner {
                catalog,
                tour,
                navigator,
                config,
                state: RwLock::new(SessionState {
                    is_open: false,
                    messages: Vec::new(),
                    is_tour_active: false,
                    tour_step: 0,
                    welcomed: false,
                }),
                events,
                rng: Mutex::new(rng),
            }),
        }
    }

    /// Subscribe to session events. Each connected UI surface calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Seed the welcome message. Called once by the owning surface at
    /// session construction; further calls are a no-op.
    pub async fn initialize(&self) {
        {
            let mut state = self.inner.state.write().await;
            if state.welcomed {
                return;
            }
            state.welcomed = true;
        }
        self.append(ChatMessage::bot(self.inner.config.welcome_message.clone()))
            .await;
    }

    // ── Visibility ──────────────────────────────────────────────────

    /// Flip the widget's open/closed state.
    pub async fn toggle(&self) {
        let open = {
            let mut state = self.inner.state.write().await;
            state.is_open = !state.is_open;
            state.is_open
        };
        let _ = self.inner.events.send(SessionEvent::Visibility { open });
    }

    /// Open the widget.
    pub async fn open(&self) {
        self.set_open(true).await;
    }

    /// Close the widget. Pending delayed replies still land while closed.
    pub async fn close(&self) {
        self.set_open(false).await;
    }

    async fn set_open(&self, open: bool) {
        {
            let mut state = self.inner.state.write().await;
            state.is_open = open;
        }
        let _ = self.inner.events.send(SessionEvent::Visibility { open });
    }

    pub async fn is_open(&self) -> bool {
        self.inner.state.read().await.is_open
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Full message history, in insertion order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state.read().await.messages.clone()
    }

    pub async fn is_tour_active(&self) -> bool {
        self.inner.state.read().await.is_tour_active
    }

    pub async fn current_tour_step(&self) -> usize {
        self.inner.state.read().await.tour_step
    }

    /// Snapshot of the whole session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read().await;
        SessionSnapshot {
            is_open: state.is_open,
            is_tour_active: state.is_tour_active,
            current_tour_step: state.tour_step,
            messages: state.messages.clone(),
        }
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Submit free-text user input.
    ///
    /// Blank input is rejected as a no-op. Otherwise the user message is
    /// appended immediately and a bot reply is scheduled after the configured
    /// delay on an independent task, so rapid submissions never block each
    /// other; with equal delays the replies land in submission order.
    pub async fn submit_user_message(&self, content: &str) {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            debug!("Ignoring blank submission");
            return;
        }

        let message = ChatMessage::user(trimmed);
        let trigger_id = message.id;
        self.append(message).await;

        let session = self.clone();
        let text = trimmed.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(session.inner.config.reply_delay).await;
            session.respond_to(&text, trigger_id).await;
        });
    }

    /// Compute and append the bot reply for one submission.
    async fn respond_to(&self, text: &str, trigger_id: Uuid) {
        let intent = self.inner.catalog.match_input(text);
        let response = {
            let mut rng = self.inner.rng.lock().await;
            let idx = rng.gen_range(0..intent.responses.len());
            intent.responses[idx].clone()
        };
        debug!(intent = %intent.id, trigger = %trigger_id, "Dispatching bot reply");
        self.append(ChatMessage::bot(response)).await;

        if intent.id == TOUR_INTENT_ID && text.to_lowercase().contains(START_TOKEN) {
            self.start_tour().await;
        }
    }

    /// Execute a recognized quick action.
    pub async fn execute_quick_action(&self, action: QuickAction) {
        match action {
            QuickAction::StartTour => self.start_tour().await,
            QuickAction::HelpNavigation => {
                self.append(ChatMessage::bot(HELP_NAVIGATION_REPLY)).await;
            }
            QuickAction::AskQuestion => {
                self.append(ChatMessage::bot(ASK_QUESTION_REPLY)).await;
            }
        }
    }

    /// Execute a quick action by wire id. Unrecognized ids are a no-op.
    pub async fn execute_quick_action_id(&self, action_id: &str) {
        match action_id.parse::<QuickAction>() {
            Ok(action) => self.execute_quick_action(action).await,
            Err(_) => debug!(action_id, "Ignoring unknown quick action"),
        }
    }

    /// Clear the history and re-seed a fresh welcome message. The
    /// conversation is never left empty after this returns.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.write().await;
            state.messages.clear();
        }
        let _ = self.inner.events.send(SessionEvent::Cleared);
        self.append(ChatMessage::bot(self.inner.config.clear_message.clone()))
            .await;
    }

    // ── Tour control ────────────────────────────────────────────────

    /// Start (or restart) the guided tour at step 0. Valid from any state;
    /// calling this while a tour is active resets progress.
    pub async fn start_tour(&self) {
        let step = {
            let mut state = self.inner.state.write().await;
            state.is_tour_active = true;
            state.tour_step = 0;
            self.inner
                .tour
                .step(0)
                .expect("tour script is non-empty")
                .clone()
        };
        let _ = self.inner.events.send(SessionEvent::TourState {
            active: true,
            step: 0,
        });
        if let Some(link) = &step.link {
            self.inner.navigator.navigate_to(link);
        }
        self.append(ChatMessage::bot(step.bot_line())).await;
    }

    /// Advance to the next tour step, or conclude when already on the last
    /// step. A no-op while no tour is active.
    pub async fn advance_tour(&self) {
        enum Outcome {
            Step(TourStep, usize),
            Concluded(usize),
            Idle,
        }

        let outcome = {
            let mut state = self.inner.state.write().await;
            if !state.is_tour_active {
                Outcome::Idle
            } else if self.inner.tour.is_last(state.tour_step) {
                state.is_tour_active = false;
                Outcome::Concluded(state.tour_step)
            } else {
                state.tour_step += 1;
                let step = self
                    .inner
                    .tour
                    .step(state.tour_step)
                    .expect("advance stays within the script")
                    .clone();
                Outcome::Step(step, state.tour_step)
            }
        };

        match outcome {
            Outcome::Idle => debug!("Ignoring tour advance while idle"),
            Outcome::Concluded(step) => {
                let _ = self.inner.events.send(SessionEvent::TourState {
                    active: false,
                    step,
                });
                self.append(ChatMessage::bot(TOUR_CONCLUSION)).await;
            }
            Outcome::Step(step, index) => {
                let _ = self.inner.events.send(SessionEvent::TourState {
                    active: true,
                    step: index,
                });
                if let Some(link) = &step.link {
                    self.inner.navigator.navigate_to(link);
                }
                self.append(ChatMessage::bot(step.bot_line())).await;
            }
        }
    }

    /// End the tour. Unconditionally accepted: ending an already-idle tour
    /// still appends the closing message, matching the shipped behavior.
    pub async fn end_tour(&self) {
        let step = {
            let mut state = self.inner.state.write().await;
            state.is_tour_active = false;
            state.tour_step
        };
        let _ = self.inner.events.send(SessionEvent::TourState {
            active: false,
            step,
        });
        self.append(ChatMessage::bot(TOUR_ENDED)).await;
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn append(&self, message: ChatMessage) {
        debug!(sender = %message.sender, id = %message.id, "Appending message");
        {
            let mut state = self.inner.state.write().await;
            state.messages.push(message.clone());
        }
        let _ = self
            .inner
            .events
            .send(SessionEvent::MessageAdded { message });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::nav::RecordingNavigator;
    use crate::session::message::Sender;

    fn test_session(delay: Duration) -> (ChatSession, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::new());
        let config = BotConfig {
            reply_delay: delay,
            ..BotConfig::default()
        };
        let session = ChatSession::with_rng_seed(
            IntentCatalog::builtin(),
            TourScript::builtin(),
            Arc::clone(&nav) as Arc<dyn Navigator>,
            config,
            7,
        );
        (session, nav)
    }

    fn greeting_responses() -> Vec<String> {
        IntentCatalog::builtin()
            .intents()
            .iter()
            .find(|i| i.id == "greeting")
            .unwrap()
            .responses
            .clone()
    }

    #[tokio::test]
    async fn initialize_seeds_exactly_one_welcome() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.initialize().await;
        session.initialize().await;
        session.initialize().await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert!(messages[0].content.contains("Welcome"));
    }

    #[tokio::test]
    async fn clear_reseeds_single_welcome() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.initialize().await;
        session.execute_quick_action(QuickAction::AskQuestion).await;
        assert_eq!(session.messages().await.len(), 2);

        session.clear().await;
        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Bot);
    }

    #[tokio::test]
    async fn clear_reseeds_even_after_initialize() {
        // The mount-time guard must not suppress clear()'s own re-seed.
        let (session, _) = test_session(Duration::from_millis(5));
        session.initialize().await;
        session.clear().await;
        assert_eq!(session.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn blank_submission_is_rejected() {
        let (session, _) = test_session(Duration::from_millis(1));
        session.submit_user_message("").await;
        session.submit_user_message("   \t\n").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(session.messages().await.is_empty());
    }

    #[tokio::test]
    async fn user_message_appends_immediately() {
        let (session, _) = test_session(Duration::from_secs(60));
        session.submit_user_message("hi there").await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "hi there");
    }

    #[tokio::test]
    async fn greeting_reply_is_one_of_the_canned_strings() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.submit_user_message("hi there").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Bot);
        assert!(greeting_responses().contains(&messages[1].content));
    }

    #[tokio::test]
    async fn response_selection_is_deterministic_with_seed() {
        let (a, _) = test_session(Duration::from_millis(5));
        let (b, _) = test_session(Duration::from_millis(5));
        a.submit_user_message("hello").await;
        b.submit_user_message("hello").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(a.messages().await[1].content, b.messages().await[1].content);
    }

    #[tokio::test]
    async fn two_quick_submissions_keep_fifo_order() {
        let (session, _) = test_session(Duration::from_millis(40));
        session.submit_user_message("hello").await;
        session.submit_user_message("thanks").await;

        // Both user messages are in before either delayed reply resolves.
        assert_eq!(session.messages().await.len(), 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let messages = session.messages().await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].content, "thanks");
        // Replies land in submission order: greeting reply, then thanks reply.
        assert!(greeting_responses().contains(&messages[2].content));
        assert!(messages[3].content.contains("welcome") || messages[3].content.contains("Happy"));
    }

    #[tokio::test]
    async fn reply_lands_even_while_widget_closed() {
        let (session, _) = test_session(Duration::from_millis(10));
        assert!(!session.is_open().await);
        session.submit_user_message("hello").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn tour_intent_with_start_token_starts_tour() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.submit_user_message("start the tour please").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(session.is_tour_active().await);
        assert_eq!(session.current_tour_step().await, 0);

        let messages = session.messages().await;
        // user, intent reply, first step announcement
        assert_eq!(messages.len(), 3);
        assert!(messages[2].content.starts_with("Welcome to Our Platform:"));
    }

    #[tokio::test]
    async fn tour_intent_without_start_token_only_replies() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.submit_user_message("can I get a walkthrough?").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!session.is_tour_active().await);
        assert_eq!(session.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn quick_action_start_tour() {
        let (session, nav) = test_session(Duration::from_millis(5));
        session.execute_quick_action(QuickAction::StartTour).await;

        assert!(session.is_tour_active().await);
        assert_eq!(session.current_tour_step().await, 0);

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert!(messages[0].content.contains("Welcome to Our Platform"));
        // First step has no link, so nothing was navigated yet.
        assert!(nav.routes().is_empty());
    }

    #[tokio::test]
    async fn quick_action_by_id_and_unknown_ids() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.execute_quick_action_id("help_navigation").await;
        session.execute_quick_action_id("bogus_action").await;
        session.execute_quick_action_id("").await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("main sections"));
    }

    #[tokio::test]
    async fn advancing_navigates_linked_steps() {
        let (session, nav) = test_session(Duration::from_millis(5));
        session.start_tour().await;
        session.advance_tour().await; // home, "/"
        session.advance_tour().await; // create-post, "/create"
        session.advance_tour().await; // communities, "/communities"

        assert_eq!(nav.routes(), vec!["/", "/create", "/communities"]);
        assert_eq!(session.current_tour_step().await, 3);
        assert!(session.is_tour_active().await);
    }

    #[tokio::test]
    async fn full_tour_run_concludes() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.start_tour().await;

        // Steps 1..=4 — the walk through the whole script.
        for _ in 0..4 {
            session.advance_tour().await;
        }
        assert!(session.is_tour_active().await);
        assert_eq!(session.current_tour_step().await, 4);

        // Advancing from the last step concludes.
        session.advance_tour().await;
        assert!(!session.is_tour_active().await);

        let messages = session.messages().await;
        assert!(messages.last().unwrap().content.contains("concludes our tour"));
    }

    #[tokio::test]
    async fn advance_while_idle_is_noop() {
        let (session, nav) = test_session(Duration::from_millis(5));
        session.advance_tour().await;
        assert!(session.messages().await.is_empty());
        assert!(nav.routes().is_empty());
        assert!(!session.is_tour_active().await);
    }

    #[tokio::test]
    async fn restarting_tour_resets_progress() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.start_tour().await;
        session.advance_tour().await;
        session.advance_tour().await;
        assert_eq!(session.current_tour_step().await, 2);

        session.start_tour().await;
        assert_eq!(session.current_tour_step().await, 0);
        assert!(session.is_tour_active().await);
    }

    #[tokio::test]
    async fn end_tour_during_active_tour() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.start_tour().await;
        session.advance_tour().await;
        session.end_tour().await;

        assert!(!session.is_tour_active().await);
        let messages = session.messages().await;
        assert!(messages.last().unwrap().content.starts_with("Tour ended."));
    }

    #[tokio::test]
    async fn end_tour_when_idle_still_appends_message() {
        // Ending is unconditionally accepted; an idle end still says goodbye.
        let (session, _) = test_session(Duration::from_millis(5));
        session.end_tour().await;

        assert!(!session.is_tour_active().await);
        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("Tour ended."));
    }

    #[tokio::test]
    async fn toggle_flips_visibility() {
        let (session, _) = test_session(Duration::from_millis(5));
        assert!(!session.is_open().await);
        session.toggle().await;
        assert!(session.is_open().await);
        session.toggle().await;
        assert!(!session.is_open().await);
    }

    #[tokio::test]
    async fn open_and_close_are_idempotent() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.open().await;
        session.open().await;
        assert!(session.is_open().await);
        session.close().await;
        session.close().await;
        assert!(!session.is_open().await);
    }

    #[tokio::test]
    async fn events_are_broadcast() {
        let (session, _) = test_session(Duration::from_millis(5));
        let mut rx = session.subscribe();

        session.initialize().await;
        match rx.recv().await.unwrap() {
            SessionEvent::MessageAdded { message } => assert_eq!(message.sender, Sender::Bot),
            other => panic!("Expected MessageAdded, got {other:?}"),
        }

        session.toggle().await;
        match rx.recv().await.unwrap() {
            SessionEvent::Visibility { open } => assert!(open),
            other => panic!("Expected Visibility, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn snapshot_reflects_state() {
        let (session, _) = test_session(Duration::from_millis(5));
        session.initialize().await;
        session.start_tour().await;

        let snapshot = session.snapshot().await;
        assert!(snapshot.is_tour_active);
        assert_eq!(snapshot.current_tour_step, 0);
        assert_eq!(snapshot.messages.len(), 2);
        assert!(!snapshot.is_open);
    }

    #[test]
    fn quick_action_parsing() {
        assert_eq!("start_tour".parse::<QuickAction>(), Ok(QuickAction::StartTour));
        assert_eq!(
            "help_navigation".parse::<QuickAction>(),
            Ok(QuickAction::HelpNavigation)
        );
        assert_eq!("ask_question".parse::<QuickAction>(), Ok(QuickAction::AskQuestion));
        assert!("startTour".parse::<QuickAction>().is_err());
    }
}
