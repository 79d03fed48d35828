//! Ties the quiz engine to fact resolution and analytics.
//!
//! Answering never waits on a fact: the resolution is spawned on the tokio
//! runtime and the caller gets a [`FactTicket`] to await whenever it likes.

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::core::LowLevelClient;
use crate::error::{QuizError, ResolutionError};
use crate::facts::{Fact, FactResolver};
use crate::quiz::{Question, QuizSession};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Handle to a fact resolution running in the background. Results are keyed by
/// subject; a ticket outlives advances and restarts of the game that issued it.
#[derive(Debug)]
pub struct FactTicket {
    subject: String,
    handle: JoinHandle<Result<Fact, ResolutionError>>,
}

impl FactTicket {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<Fact, ResolutionError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ResolutionError::Interrupted { subject: self.subject, reason: e.to_string() }),
        }
    }
}

#[derive(Debug)]
pub struct QuizGame<C: LowLevelClient + 'static> {
    session: QuizSession,
    resolver: FactResolver<C>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl<C: LowLevelClient + 'static> QuizGame<C> {
    pub fn start(
        questions: Vec<Question>,
        resolver: FactResolver<C>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Result<Self, QuizError> {
        let session = QuizSession::start(questions)?;
        analytics.track(AnalyticsEvent::quiz_start());
        Ok(Self { session, resolver, analytics })
    }

    /// Answer the current question and start resolving the fact for its
    /// subject. Returns `None` if the session was not awaiting an answer.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(target = "flag_quiz::game", skip(self))]
    pub fn submit_answer(&mut self, option: &str) -> Option<FactTicket> {
        let outcome = self.session.submit_answer(option)?;
        self.analytics
            .track(AnalyticsEvent::answer_submitted(outcome.question_index, outcome.correct));
        debug!(correct = outcome.correct, subject = %outcome.subject, "answer recorded");

        // Tie the result to this session now, not when the task first runs.
        let epoch = self.resolver.session_epoch();
        let resolver = self.resolver.clone();
        let subject = outcome.subject;
        let task_subject = subject.clone();
        let handle = tokio::spawn(async move { resolver.resolve_in_session(epoch, &task_subject).await });
        Some(FactTicket { subject, handle })
    }

    pub fn advance(&mut self) -> bool {
        let moved = self.session.advance();
        if moved && self.session.is_finished() {
            self.analytics
                .track(AnalyticsEvent::quiz_complete(self.session.score(), self.session.total()));
        }
        moved
    }

    /// Start the same questions over with an empty fact cache. In-flight
    /// tickets keep running.
    pub fn restart(&mut self) {
        self.resolver.clear_session_cache();
        self.session.restart();
        self.analytics.track(AnalyticsEvent::quiz_restart());
    }

    pub fn restart_with(&mut self, questions: Vec<Question>) -> Result<(), QuizError> {
        self.session.restart_with(questions)?;
        self.resolver.clear_session_cache();
        self.analytics.track(AnalyticsEvent::quiz_restart());
        Ok(())
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }
}
