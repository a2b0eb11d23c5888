//! Single-flight memoized cache for companion replies.
//!
//! One reply per post id, generated at most once no matter how many
//! callers race for it. A plain lookup never triggers work; callers
//! request work explicitly and either start a generation flight or
//! join the one already in the air. Flights run as detached tasks, so
//! a caller that stops waiting does not cancel a generation other
//! callers (or the cache itself) still want.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::characters;
use crate::error::{Result, SpotterError};
use crate::feed::Post;
use crate::providers::{CompletionProvider, GenerationOptions, GenerationRequest};

// ============================================================================
// Reply model
// ============================================================================

/// A generated companion reply, keyed by the post it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionReply {
    /// Id of the post this reply answers.
    pub post_id: String,
    /// Id of the companion character that wrote it.
    pub character_id: String,
    /// Reply text.
    pub text: String,
    /// When the reply was generated, UTC.
    pub generated_at: DateTime<Utc>,
}

impl CompanionReply {
    /// Build a reply stamped with the current time.
    pub fn new(post_id: &str, character_id: &str, text: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            character_id: character_id.to_string(),
            text: text.to_string(),
            generated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Flight bookkeeping
// ============================================================================

/// Outcome published by a settled generation flight. Cloned to every
/// caller that joined the flight.
type FlightOutcome = Result<CompanionReply>;

/// Receiver half of a flight's outcome channel. Starts at `None` and
/// flips to `Some` exactly once, when the flight settles.
type FlightReceiver = watch::Receiver<Option<FlightOutcome>>;

/// How a caller's request for a reply was admitted.
enum Admission {
    /// The reply was already cached.
    Cached(CompanionReply),
    /// A flight for this post was already in the air; wait on it.
    Joined(FlightReceiver),
    /// This caller started the flight; wait on it.
    Started(FlightReceiver),
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    flights_started: AtomicU64,
    flights_joined: AtomicU64,
    flights_failed: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Completed replies currently cached.
    pub entries: usize,
    /// Generation flights currently in the air.
    pub pending: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing cached.
    pub misses: u64,
    /// Generation flights started.
    pub flights_started: u64,
    /// Callers that joined an existing flight instead of starting one.
    pub flights_joined: u64,
    /// Flights that settled with an error.
    pub flights_failed: u64,
}

// ============================================================================
// The cache
// ============================================================================

/// Single-flight reply cache.
///
/// `ResponseCache` is a cheap clone-handle over shared state: clone it
/// at the composition root and hand copies to every screen that shows
/// replies. For any post id there is at most one generation flight in
/// the air; concurrent demand joins it, and the settled outcome (reply
/// or error) reaches every waiter. Failures are not retried by the
/// cache itself; the pending marker is cleared so the next explicit
/// call starts a fresh flight.
///
/// The async operations must run inside a Tokio runtime, since flights
/// are spawned as detached tasks.
#[derive(Clone)]
pub struct ResponseCache {
    provider: Arc<dyn CompletionProvider>,
    options: GenerationOptions,
    replies: Arc<DashMap<String, CompanionReply>>,
    pending: Arc<Mutex<HashMap<String, FlightReceiver>>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("provider", &self.provider.name())
            .field("entries", &self.replies.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ResponseCache {
    /// Create an empty cache over the given provider.
    pub fn new(provider: Arc<dyn CompletionProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            replies: Arc::new(DashMap::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Look up the cached reply for a post. Pure read: never blocks on
    /// generation and never triggers one.
    pub fn get(&self, post_id: &str) -> Option<CompanionReply> {
        match self.replies.get(post_id) {
            Some(entry) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Return the reply for a post, generating it if needed.
    ///
    /// At most one generation flight runs per post id: concurrent
    /// callers join the flight already in the air and all receive its
    /// settled outcome. A failed flight clears its pending marker, so
    /// the next call starts over.
    ///
    /// # Errors
    ///
    /// Propagates the flight's error to every caller waiting on it.
    pub async fn ensure_loaded(&self, post: &Post) -> Result<CompanionReply> {
        if let Some(entry) = self.replies.get(&post.id) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.value().clone());
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let rx = match self.admit_or_join(post) {
            Admission::Cached(reply) => return Ok(reply),
            Admission::Joined(rx) | Admission::Started(rx) => rx,
        };
        Self::await_outcome(rx, &post.id).await
    }

    /// Ensure replies for a whole feed slice, preserving order.
    ///
    /// Posts sharing an id share a flight, like any other concurrent
    /// demand.
    pub async fn ensure_all(&self, posts: &[Post]) -> Vec<Result<CompanionReply>> {
        join_all(posts.iter().map(|post| self.ensure_loaded(post))).await
    }

    /// Warm the cache for a post without waiting on the result.
    ///
    /// Fire-and-forget: failures are logged by the flight and
    /// absorbed. Safe to call while the post scrolls into view; if a
    /// flight is already in the air this is a no-op join.
    pub fn submit_prefetch(&self, post: &Post) {
        if self.replies.contains_key(&post.id) {
            return;
        }
        debug!(post_id = %post.id, "prefetch requested");
        let _ = self.admit_or_join(post);
    }

    /// Drop any cached reply for the post and generate a fresh one.
    ///
    /// If a flight for the post is already in the air, its result is
    /// awaited instead of stacking a second call.
    pub async fn refresh(&self, post: &Post) -> Result<CompanionReply> {
        self.replies.remove(&post.id);
        self.ensure_loaded(post).await
    }

    /// Install a post's upstream-computed reply, if it carries one and
    /// nothing is cached yet. Never overwrites.
    pub fn seed(&self, post: &Post) -> bool {
        let Some(reply) = &post.preset_reply else {
            return false;
        };
        let mut installed = false;
        self.replies.entry(post.id.clone()).or_insert_with(|| {
            installed = true;
            reply.clone()
        });
        if installed {
            debug!(post_id = %post.id, character = %reply.character_id, "seeded preset reply");
        }
        installed
    }

    /// Seed every post in a feed slice. Returns how many replies were
    /// installed.
    pub fn seed_all(&self, posts: &[Post]) -> usize {
        posts.iter().filter(|post| self.seed(post)).count()
    }

    /// Drop the cached reply for a post. Returns whether one existed.
    /// Does not touch a flight in the air.
    pub fn invalidate(&self, post_id: &str) -> bool {
        self.replies.remove(post_id).is_some()
    }

    /// Drop every cached reply. Flights in the air settle normally.
    pub fn clear(&self) {
        self.replies.clear();
    }

    /// Number of cached replies.
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    /// Whether no replies are cached.
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Number of generation flights currently in the air.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("flight admission lock poisoned").len()
    }

    /// Snapshot of cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.replies.len(),
            pending: self.pending_count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            flights_started: self.counters.flights_started.load(Ordering::Relaxed),
            flights_joined: self.counters.flights_joined.load(Ordering::Relaxed),
            flights_failed: self.counters.flights_failed.load(Ordering::Relaxed),
        }
    }

    // ------------------------------------------------------------------------
    // Flight admission and settlement
    // ------------------------------------------------------------------------

    /// Decide, under the admission lock, whether this demand is served
    /// from cache, joins the flight in the air, or starts one.
    fn admit_or_join(&self, post: &Post) -> Admission {
        let mut pending = self.pending.lock().expect("flight admission lock poisoned");

        // A flight may have settled between the lock-free check and here.
        if let Some(entry) = self.replies.get(&post.id) {
            return Admission::Cached(entry.value().clone());
        }

        if let Some(rx) = pending.get(&post.id) {
            if rx.has_changed().is_ok() {
                self.counters.flights_joined.fetch_add(1, Ordering::Relaxed);
                return Admission::Joined(rx.clone());
            }
            // Sender gone without settling (flight task died); replace it.
            warn!(post_id = %post.id, "stale flight marker found, starting a new flight");
        }

        let (tx, rx) = watch::channel(None);
        pending.insert(post.id.clone(), rx.clone());
        self.counters.flights_started.fetch_add(1, Ordering::Relaxed);
        drop(pending);

        self.spawn_flight(post, tx);
        Admission::Started(rx)
    }

    /// Launch the detached generation task for a post.
    fn spawn_flight(&self, post: &Post, tx: watch::Sender<Option<FlightOutcome>>) {
        let companion = characters::companion_for(post.category);
        let request = GenerationRequest::for_post(post, companion, self.options.clone());
        let cache = self.clone();
        let post_id = post.id.clone();
        let character_id = companion.id;

        tokio::spawn(async move {
            debug!(post_id = %post_id, companion = character_id, "generation flight started");
            let outcome = match cache.provider.complete(request).await {
                Ok(completion) => {
                    Ok(CompanionReply::new(&post_id, character_id, &completion.text))
                }
                Err(err) => {
                    cache.counters.flights_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(post_id = %post_id, error = %err, "generation flight failed");
                    Err(err)
                }
            };
            cache.settle(&post_id, outcome, &tx);
        });
    }

    /// Record a flight's outcome and publish it to the waiters.
    ///
    /// The reply map and pending set are updated before the outcome is
    /// sent, so a caller that misses the broadcast still finds the
    /// entry on its next lookup.
    fn settle(&self, post_id: &str, outcome: FlightOutcome, tx: &watch::Sender<Option<FlightOutcome>>) {
        {
            let mut pending = self.pending.lock().expect("flight admission lock poisoned");
            if let Ok(reply) = &outcome {
                self.replies.insert(post_id.to_string(), reply.clone());
            }
            pending.remove(post_id);
        }
        // No receivers is fine: a prefetch nobody waited on.
        let _ = tx.send(Some(outcome));
    }

    /// Wait for a flight to settle and clone out its outcome.
    async fn await_outcome(mut rx: FlightReceiver, post_id: &str) -> Result<CompanionReply> {
        let settled = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map(|outcome| outcome.clone())
            .map_err(|_| {
                SpotterError::Generation(format!(
                    "reply flight for {post_id} ended before settling"
                ))
            })?;
        settled.unwrap_or_else(|| {
            Err(SpotterError::Generation(format!(
                "reply flight for {post_id} settled without an outcome"
            )))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
