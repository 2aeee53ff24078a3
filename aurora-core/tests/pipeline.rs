//! Integration tests for formatting and the conversation controller, using
//! in-process collaborators instead of the real services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aurora_core::{
    ChatCompletion, CompletionError, ContentBlock, ControllerState, ConversationController,
    ConversationHistory, FAILURE_REPLY, FALLBACK_REPLY, FormattedMessage, IgnoreReason,
    MediaSearch, Message, MessageFormatter, Reply, ResolverError, Role, SubmitOutcome, TrackSearch,
};
use tokio::sync::Notify;

/// Media search answering from a fixed table and counting calls.
#[derive(Default)]
struct TableMedia {
    urls: HashMap<String, String>,
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl TableMedia {
    fn with(mut self, query: &str, url: &str) -> Self {
        self.urls.insert(query.to_string(), url.to_string());
        self
    }

    fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }
}

impl MediaSearch for TableMedia {
    async fn search(&self, query: &str) -> Result<Option<String>, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|q| q == query) {
            return Err(ResolverError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.urls.get(query).cloned())
    }
}

/// Track search returning a fixed id and recording the texts it saw.
#[derive(Default)]
struct FixedTrack {
    track_id: Option<String>,
    seen: Mutex<Vec<String>>,
}

impl FixedTrack {
    fn returning(track_id: &str) -> Self {
        Self {
            track_id: Some(track_id.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl TrackSearch for FixedTrack {
    async fn search(&self, text: &str) -> Result<Option<String>, ResolverError> {
        self.seen.lock().unwrap().push(text.to_string());
        Ok(self.track_id.clone())
    }
}

fn formatter(
    media: TableMedia,
    track: FixedTrack,
) -> (
    MessageFormatter<Arc<TableMedia>, Arc<FixedTrack>>,
    Arc<TableMedia>,
    Arc<FixedTrack>,
) {
    let media = Arc::new(media);
    let track = Arc::new(track);
    (
        MessageFormatter::new(Arc::clone(&media), Arc::clone(&track)),
        media,
        track,
    )
}

#[tokio::test]
async fn plain_text_is_single_block() {
    let (fmt, media, track) = formatter(TableMedia::default(), FixedTrack::default());

    let blocks = fmt.format("I had a long day at work.", true).await;

    assert_eq!(blocks, vec![ContentBlock::text("I had a long day at work.")]);
    assert_eq!(media.calls.load(Ordering::SeqCst), 0);
    assert_eq!(track.calls(), 0);
}

#[tokio::test]
async fn empty_content_yields_no_blocks() {
    let (fmt, _, _) = formatter(TableMedia::default(), FixedTrack::default());

    assert!(fmt.format("", true).await.is_empty());
    assert!(fmt.format("", false).await.is_empty());
}

#[tokio::test]
async fn absolute_url_is_used_without_lookup() {
    let (fmt, media, _) = formatter(TableMedia::default().with("calm", "https://other"), FixedTrack::default());

    let blocks = fmt.format("A ![calm](https://x/y.gif) B", false).await;

    assert_eq!(
        blocks,
        vec![
            ContentBlock::text("A "),
            ContentBlock::image("https://x/y.gif", "calm"),
            ContentBlock::text(" B"),
        ]
    );
    assert_eq!(media.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unresolved_placeholder_is_dropped() {
    let (fmt, media, _) = formatter(TableMedia::default(), FixedTrack::default());

    let blocks = fmt.format("![calm]()", true).await;

    assert!(blocks.is_empty());
    assert_eq!(media.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn placeholder_resolves_through_media_search() {
    let (fmt, _, _) = formatter(
        TableMedia::default().with("calm", "https://g/img.gif"),
        FixedTrack::default(),
    );

    let blocks = fmt.format("![calm]()", true).await;

    assert_eq!(blocks, vec![ContentBlock::image("https://g/img.gif", "calm")]);
}

#[tokio::test]
async fn failed_lookup_keeps_the_rest_of_the_message() {
    let (fmt, _, _) = formatter(
        TableMedia::default()
            .with("hug", "https://g/hug.gif")
            .failing_on("calm"),
        FixedTrack::default(),
    );

    let blocks = fmt.format("Breathe. ![calm]() You matter. ![hug]()", false).await;

    assert_eq!(
        blocks,
        vec![
            ContentBlock::text("Breathe. "),
            ContentBlock::text(" You matter. "),
            ContentBlock::image("https://g/hug.gif", "hug"),
        ]
    );
}

#[tokio::test]
async fn placeholder_without_alt_is_dropped_without_lookup() {
    let (fmt, media, _) = formatter(TableMedia::default(), FixedTrack::default());

    let blocks = fmt.format("hi ![]() there", false).await;

    assert_eq!(blocks, vec![ContentBlock::text("hi "), ContentBlock::text(" there")]);
    assert_eq!(media.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn blocks_follow_source_order_not_completion_order() {
    let (fmt, media, _) = formatter(
        TableMedia::default()
            .with("slow", "https://g/slow.gif")
            .with("fast", "https://g/fast.gif")
            .delayed("slow", Duration::from_secs(5)),
        FixedTrack::default(),
    );

    let started = tokio::time::Instant::now();
    let blocks = fmt.format("![slow]() and ![fast]()", false).await;

    assert_eq!(
        blocks,
        vec![
            ContentBlock::image("https://g/slow.gif", "slow"),
            ContentBlock::text(" and "),
            ContentBlock::image("https://g/fast.gif", "fast"),
        ]
    );
    assert_eq!(media.calls.load(Ordering::SeqCst), 2);
    // Lookups overlap, so the total is the slowest lookup rather than the sum.
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn assistant_music_mention_appends_embed_last() {
    let (fmt, _, track) = formatter(
        TableMedia::default().with("music", "https://g/music.gif"),
        FixedTrack::returning("track123"),
    );

    let content = "I can recommend a song ![music]() to lift you up.";
    let blocks = fmt.format(content, true).await;

    assert_eq!(
        blocks,
        vec![
            ContentBlock::text("I can recommend a song "),
            ContentBlock::image("https://g/music.gif", "music"),
            ContentBlock::text(" to lift you up."),
            ContentBlock::embed("track123"),
        ]
    );
    assert_eq!(track.seen.lock().unwrap().as_slice(), [content.to_string()]);
}

#[tokio::test]
async fn recommend_a_song_gets_embed() {
    let (fmt, _, _) = formatter(TableMedia::default(), FixedTrack::returning("track123"));

    let blocks = fmt.format("can you recommend a song", true).await;

    assert_eq!(blocks.last(), Some(&ContentBlock::embed("track123")));
    assert_eq!(blocks.len(), 2);
}

#[tokio::test]
async fn user_messages_are_never_enriched() {
    let (fmt, _, track) = formatter(TableMedia::default(), FixedTrack::returning("track123"));

    let blocks = fmt.format("play some music", false).await;

    assert_eq!(blocks, vec![ContentBlock::text("play some music")]);
    assert_eq!(track.calls(), 0);
}

#[tokio::test]
async fn keyword_check_ignores_resolved_alt_text() {
    // The resolved URL mentions "track" and "play"; only the message text counts.
    let (fmt, _, track) = formatter(
        TableMedia::default().with("calm", "https://g/track-playlist.gif"),
        FixedTrack::returning("t1"),
    );

    let blocks = fmt.format("Rest now ![calm]()", true).await;

    assert_eq!(
        blocks,
        vec![
            ContentBlock::text("Rest now "),
            ContentBlock::image("https://g/track-playlist.gif", "calm"),
        ]
    );
    assert_eq!(track.calls(), 0);
}

#[tokio::test]
async fn no_track_found_means_no_embed() {
    let (fmt, _, track) = formatter(TableMedia::default(), FixedTrack::default());

    let blocks = fmt.format("Let me play you something", true).await;

    assert_eq!(blocks, vec![ContentBlock::text("Let me play you something")]);
    assert_eq!(track.calls(), 1);
}

#[tokio::test]
async fn formatting_is_deterministic() {
    let (fmt, media, _) = formatter(
        TableMedia::default().with("calm", "https://g/calm.gif"),
        FixedTrack::returning("t1"),
    );

    let content = "Here is a song for you ![calm]()";
    let first = fmt.format(content, true).await;
    let second = fmt.format(content, true).await;

    assert_eq!(first, second);
    // No caching between calls.
    assert_eq!(media.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn history_formatting_skips_system_and_keeps_order() {
    let (fmt, _, _) = formatter(
        TableMedia::default().with("hug", "https://g/hug.gif"),
        FixedTrack::returning("t1"),
    );

    let mut history = ConversationHistory::new("system prompt mentioning music");
    history.push(Message::user("play me a song"));
    history.push(Message::assistant("Sending a ![hug]()"));

    let formatted = fmt.format_history(history.messages()).await;

    assert_eq!(
        formatted,
        vec![
            FormattedMessage {
                role: Role::User,
                blocks: vec![ContentBlock::text("play me a song")],
            },
            FormattedMessage {
                role: Role::Assistant,
                blocks: vec![
                    ContentBlock::text("Sending a "),
                    ContentBlock::image("https://g/hug.gif", "hug"),
                ],
            },
        ]
    );
}

enum Script {
    Text(&'static str),
    Empty,
    Fail,
}

/// Completion gateway following a script and recording transcripts.
struct Scripted {
    script: Script,
    transcripts: Mutex<Vec<Vec<Message>>>,
}

impl Scripted {
    fn new(script: Script) -> Self {
        Self {
            script,
            transcripts: Mutex::new(Vec::new()),
        }
    }
}

impl ChatCompletion for Scripted {
    async fn complete(&self, messages: &[Message]) -> Result<Reply, CompletionError> {
        self.transcripts.lock().unwrap().push(messages.to_vec());
        match self.script {
            Script::Text(text) => Ok(Reply::Text(text.to_string())),
            Script::Empty => Ok(Reply::Empty),
            Script::Fail => Err(CompletionError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            }),
        }
    }
}

#[tokio::test]
async fn submit_appends_user_and_assistant_turns() {
    let controller = ConversationController::new(
        Scripted::new(Script::Text("I'm here for you ![hug]()")),
        ConversationHistory::new("be kind"),
    );

    let outcome = controller.submit("  I feel lonely  ", &[]).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Replied(Message::assistant("I'm here for you ![hug]()"))
    );
    assert_eq!(
        controller.history(),
        vec![
            Message::system("be kind"),
            Message::user("I feel lonely"),
            Message::assistant("I'm here for you ![hug]()"),
        ]
    );

    let transcripts = controller.completion().transcripts.lock().unwrap().clone();
    assert_eq!(transcripts.len(), 1);
    assert_eq!(
        transcripts[0],
        vec![Message::system("be kind"), Message::user("I feel lonely")]
    );
}

#[tokio::test]
async fn full_history_is_sent_on_later_turns() {
    let controller = ConversationController::new(
        Scripted::new(Script::Text("ok")),
        ConversationHistory::default(),
    );

    controller.submit("one", &[]).await;
    controller.submit("two", &[]).await;

    let transcripts = controller.completion().transcripts.lock().unwrap().clone();
    assert_eq!(transcripts[1].len(), 4);
    assert_eq!(transcripts[1][3], Message::user("two"));
    assert_eq!(controller.len(), 5);
}

#[tokio::test]
async fn empty_reply_uses_fallback_text() {
    let controller =
        ConversationController::new(Scripted::new(Script::Empty), ConversationHistory::default());

    let outcome = controller.submit("hello?", &[]).await;

    assert_eq!(outcome, SubmitOutcome::Replied(Message::assistant(FALLBACK_REPLY)));
    assert_eq!(controller.len(), 3);
}

#[tokio::test]
async fn failure_appends_generic_message_and_recovers() {
    let controller =
        ConversationController::new(Scripted::new(Script::Fail), ConversationHistory::default());

    let outcome = controller.submit("hello?", &[]).await;

    assert_eq!(outcome, SubmitOutcome::Replied(Message::assistant(FAILURE_REPLY)));
    assert_eq!(controller.state(), ControllerState::Idle);

    let history = controller.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2], Message::assistant("Something went wrong. Please try again."));

    // Still usable afterwards.
    assert!(matches!(
        controller.submit("again", &[]).await,
        SubmitOutcome::Replied(_)
    ));
    assert_eq!(controller.len(), 5);
}

/// Completion gateway that holds every request until released.
struct Gated {
    release: Arc<Notify>,
}

impl ChatCompletion for Gated {
    async fn complete(&self, _messages: &[Message]) -> Result<Reply, CompletionError> {
        self.release.notified().await;
        Ok(Reply::Text("thanks for waiting".to_string()))
    }
}

#[tokio::test]
async fn second_submit_while_awaiting_reply_is_ignored() {
    let release = Arc::new(Notify::new());
    let controller = Arc::new(ConversationController::new(
        Gated {
            release: Arc::clone(&release),
        },
        ConversationHistory::default(),
    ));

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit("first", &[]).await }
    });

    while !controller.is_typing() {
        tokio::task::yield_now().await;
    }

    let second = controller.submit("second", &[]).await;
    assert_eq!(second, SubmitOutcome::Ignored(IgnoreReason::Busy));

    release.notify_one();
    let outcome = first.await.unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Replied(Message::assistant("thanks for waiting"))
    );
    assert_eq!(controller.state(), ControllerState::Idle);

    let history = controller.history();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|m| m.content != "second"));
}

/// Completion gateway that never answers.
struct Silent;

impl ChatCompletion for Silent {
    async fn complete(&self, _messages: &[Message]) -> Result<Reply, CompletionError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn abandoned_submit_still_closes_the_turn() {
    let controller = ConversationController::new(Silent, ConversationHistory::default());
    let mut revisions = controller.subscribe();

    let result = tokio::time::timeout(Duration::from_secs(1), controller.submit("hello", &[])).await;
    assert!(result.is_err());

    assert_eq!(controller.state(), ControllerState::Idle);
    let history = controller.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1], Message::user("hello"));
    assert_eq!(history[2].role, Role::Assistant);
    assert_eq!(history[2].content, FAILURE_REPLY);
    assert_eq!(*revisions.borrow_and_update(), 3);

    // The slot is free again.
    let again = tokio::time::timeout(Duration::from_secs(1), controller.submit("still there?", &[])).await;
    assert!(again.is_err());
    assert_eq!(controller.len(), 5);
}
