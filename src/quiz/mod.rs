//! Quiz progression engine.
//!
//! A `QuizSession` walks an ordered list of questions through three phases:
//! `AwaitingAnswer` → `Answered` → (next question | `Finished`). Transitions are
//! synchronous and never fail; calls made in the wrong phase are ignored.

pub mod catalog;

pub use catalog::Catalog;

use crate::error::QuizError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What the player is shown: a flag image or a literal question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Flag(String),
    Text(String),
}

/// One multiple-choice question. Validated on construction, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion", into = "RawQuestion")]
pub struct Question {
    prompt: Prompt,
    options: Vec<String>,
    correct_answer: String,
}

/// Wire shape of a question: `{"flagUrl" | "text", "options", "correctAnswer"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flag_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    options: Vec<String>,
    correct_answer: String,
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuizError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let prompt = match (raw.flag_url, raw.text) {
            (Some(url), None) => Prompt::Flag(url),
            (None, Some(text)) => Prompt::Text(text),
            _ => {
                return Err(QuizError::InvalidInput(
                    "a question needs exactly one of flagUrl or text".to_string(),
                ))
            }
        };
        Question::new(prompt, raw.options, raw.correct_answer)
    }
}

impl From<Question> for RawQuestion {
    fn from(question: Question) -> Self {
        let (flag_url, text) = match question.prompt {
            Prompt::Flag(url) => (Some(url), None),
            Prompt::Text(text) => (None, Some(text)),
        };
        Self { flag_url, text, options: question.options, correct_answer: question.correct_answer }
    }
}

impl Question {
    pub fn new(
        prompt: Prompt,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuizError> {
        let correct_answer = correct_answer.into();
        let prompt_body = match &prompt {
            Prompt::Flag(url) => url,
            Prompt::Text(text) => text,
        };
        if prompt_body.trim().is_empty() {
            return Err(QuizError::InvalidInput("question prompt is empty".to_string()));
        }
        if options.is_empty() {
            return Err(QuizError::InvalidInput("question has no options".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = options.iter().find(|option| !seen.insert(option.as_str())) {
            return Err(QuizError::InvalidInput(format!("duplicate option '{}'", duplicate)));
        }
        if !options.contains(&correct_answer) {
            return Err(QuizError::InvalidInput(format!(
                "correct answer '{}' is not among the options",
                correct_answer
            )));
        }
        Ok(Self { prompt, options, correct_answer })
    }

    /// Flag question: which country does the flag at `url` belong to?
    pub fn flag<S: Into<String>>(
        url: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuizError> {
        Self::new(Prompt::Flag(url.into()), options.into_iter().map(Into::into).collect(), correct_answer)
    }

    pub fn text<S: Into<String>>(
        text: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuizError> {
        Self::new(Prompt::Text(text.into()), options.into_iter().map(Into::into).collect(), correct_answer)
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Exact string comparison; no case or whitespace folding.
    pub fn is_correct(&self, option: &str) -> bool {
        option == self.correct_answer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    AwaitingAnswer,
    Answered,
    Finished,
}

/// Result of an accepted answer. `subject` is the country whose fact the caller
/// should resolve next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_index: usize,
    pub correct: bool,
    pub subject: String,
}

/// Progress through one run of a question list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    selected: Option<String>,
    phase: Phase,
}

impl QuizSession {
    pub fn start(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::InvalidInput("a quiz needs at least one question".to_string()));
        }
        Ok(Self {
            questions,
            current_index: 0,
            score: 0,
            selected: None,
            phase: Phase::AwaitingAnswer,
        })
    }

    /// Record `option` as the answer to the current question.
    ///
    /// Returns `None` without touching the session unless it is awaiting an
    /// answer, so a repeated submission cannot score twice.
    pub fn submit_answer(&mut self, option: &str) -> Option<AnswerOutcome> {
        if self.phase != Phase::AwaitingAnswer {
            return None;
        }
        let question = &self.questions[self.current_index];
        let correct = question.is_correct(option);
        if correct {
            self.score += 1;
        }
        let subject = question.correct_answer.clone();
        self.selected = Some(option.to_string());
        self.phase = Phase::Answered;
        Some(AnswerOutcome { question_index: self.current_index, correct, subject })
    }

    /// Move past an answered question. Returns `false` (and does nothing) in
    /// any other phase.
    pub fn advance(&mut self) -> bool {
        if self.phase != Phase::Answered {
            return false;
        }
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.selected = None;
            self.phase = Phase::AwaitingAnswer;
        } else {
            self.phase = Phase::Finished;
        }
        true
    }

    /// Back to the first question of the same list.
    pub fn restart(&mut self) {
        self.current_index = 0;
        self.score = 0;
        self.selected = None;
        self.phase = Phase::AwaitingAnswer;
    }

    /// Start over on a new question list. On error the session is left as it was.
    pub fn restart_with(&mut self, questions: Vec<Question>) -> Result<(), QuizError> {
        *self = Self::start(questions)?;
        Ok(())
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question on screen. Stays on the last question once finished.
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Whether the selected answer was right; `None` while awaiting an answer.
    pub fn last_answer_correct(&self) -> Option<bool> {
        self.selected.as_deref().map(|s| self.current_question().is_correct(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_questions() -> Vec<Question> {
        vec![
            Question::flag("https://flagcdn.com/w320/a.png", ["A", "B", "C"], "B").unwrap(),
            Question::flag("https://flagcdn.com/w320/x.png", ["X", "Y"], "X").unwrap(),
        ]
    }

    #[test]
    fn start_rejects_empty_list() {
        assert!(matches!(QuizSession::start(vec![]), Err(QuizError::InvalidInput(_))));
    }

    #[test]
    fn start_state() {
        let session = QuizSession::start(two_questions()).unwrap();
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.score(), 0);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.selected(), None);
        assert_eq!(session.last_answer_correct(), None);
    }

    #[test]
    fn question_validation() {
        assert!(Question::flag("u", Vec::<String>::new(), "A").is_err());
        assert!(Question::flag("u", ["A", "A", "B"], "A").is_err());
        assert!(Question::flag("u", ["A", "B"], "C").is_err());
        assert!(Question::flag(" ", ["A", "B"], "A").is_err());
        assert!(Question::text("Capital of Peru?", ["Lima", "Cusco"], "Lima").is_ok());
    }

    #[test]
    fn correct_and_wrong_answers() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        let outcome = session.submit_answer("B").unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.subject, "B");
        assert_eq!(session.score(), 1);
        assert_eq!(session.phase(), Phase::Answered);

        let mut session = QuizSession::start(two_questions()).unwrap();
        let outcome = session.submit_answer("C").unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.subject, "B");
        assert_eq!(session.score(), 0);
        assert_eq!(session.selected(), Some("C"));
        assert_eq!(session.last_answer_correct(), Some(false));
    }

    #[test]
    fn answers_are_compared_exactly() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        assert!(!session.submit_answer("b").unwrap().correct);

        let mut session = QuizSession::start(two_questions()).unwrap();
        assert!(!session.submit_answer(" B").unwrap().correct);
    }

    #[test]
    fn repeated_submission_is_ignored() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        session.submit_answer("B");
        let snapshot = session.clone();
        assert_eq!(session.submit_answer("B"), None);
        assert_eq!(session.submit_answer("A"), None);
        assert_eq!(session, snapshot);
    }

    #[test]
    fn advance_only_after_answer() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        assert!(!session.advance());
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn full_run_scores_one_of_two() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        session.submit_answer("B");
        assert_eq!((session.score(), session.phase()), (1, Phase::Answered));

        assert!(session.advance());
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.selected(), None);

        session.submit_answer("Y");
        assert_eq!((session.score(), session.phase()), (1, Phase::Answered));

        assert!(session.advance());
        assert!(session.is_finished());
        assert_eq!(session.score(), 1);
        assert_eq!(session.total(), 2);

        assert!(!session.advance());
        assert_eq!(session.submit_answer("X"), None);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn restart_resets_progress() {
        let mut session = QuizSession::start(two_questions()).unwrap();
        session.submit_answer("B");
        session.advance();
        session.restart();
        assert_eq!(session, QuizSession::start(two_questions()).unwrap());

        assert!(session.restart_with(vec![]).is_err());
        assert_eq!(session.total(), 2);
    }

    #[test]
    fn questions_deserialize_with_validation() {
        let json = r#"[
            {"flagUrl": "https://flagcdn.com/w320/jp.png", "options": ["South Korea", "China", "Japan"], "correctAnswer": "Japan"},
            {"text": "Largest country by area?", "options": ["Russia", "Canada"], "correctAnswer": "Russia"}
        ]"#;
        let questions: Vec<Question> = serde_json::from_str(json).unwrap();
        assert_eq!(questions[0].prompt(), &Prompt::Flag("https://flagcdn.com/w320/jp.png".into()));
        assert_eq!(questions[1].correct_answer(), "Russia");

        let both = r#"{"flagUrl": "u", "text": "t", "options": ["A"], "correctAnswer": "A"}"#;
        assert!(serde_json::from_str::<Question>(both).is_err());
        let missing = r#"{"flagUrl": "u", "options": ["A"], "correctAnswer": "B"}"#;
        assert!(serde_json::from_str::<Question>(missing).is_err());

        let written = serde_json::to_value(&questions[0]).unwrap();
        assert_eq!(written["flagUrl"], "https://flagcdn.com/w320/jp.png");
        assert!(written.get("text").is_none());
    }
}
