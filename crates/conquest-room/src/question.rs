//! Trivia questions: the bank, loading it, and drawing from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use conquest_protocol::QuestionView;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options` of the right answer.
    pub correct: usize,
}

impl Question {
    pub fn new(prompt: impl Into<String>, options: &[&str], correct: usize) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
        }
    }

    /// What players get to see: everything but `correct`.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            prompt: self.prompt.clone(),
            options: self.options.clone(),
        }
    }

    fn check(&self) -> Result<(), &'static str> {
        if self.prompt.trim().is_empty() {
            return Err("empty prompt");
        }
        if self.options.len() < 2 {
            return Err("fewer than two options");
        }
        if self.correct >= self.options.len() {
            return Err("correct index out of range");
        }
        Ok(())
    }
}

/// Failures while building or loading a [`QuestionBank`].
#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("cannot read question file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse question file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question bank is empty")]
    Empty,

    #[error("question {index} is invalid: {reason}")]
    Invalid { index: usize, reason: &'static str },
}

/// A validated, non-empty set of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// # Errors
    /// `Empty` for no questions, `Invalid` for the first malformed one.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }
        for (index, q) in questions.iter().enumerate() {
            q.check()
                .map_err(|reason| QuestionBankError::Invalid { index, reason })?;
        }
        Ok(Self { questions })
    }

    /// Parses a JSON array of `{prompt, options, correct}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, QuestionBankError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, QuestionBankError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| QuestionBankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), questions = bank.len(), "question bank loaded");
        Ok(bank)
    }

    /// The questions bundled with the server.
    pub fn builtin() -> Self {
        let questions = vec![
            Question::new("2+2*2=?", &["6", "8", "4", "10"], 0),
            Question::new("Capital of France?", &["Lyon", "Paris", "Marseille", "Nice"], 1),
            Question::new("How many sides does a hexagon have?", &["5", "6", "7", "8"], 1),
            Question::new("Largest planet in the Solar System?", &["Saturn", "Earth", "Jupiter", "Neptune"], 2),
            Question::new("Chemical symbol for gold?", &["Ag", "Go", "Gd", "Au"], 3),
            Question::new("Who painted the Mona Lisa?", &["Leonardo da Vinci", "Michelangelo", "Raphael", "Donatello"], 0),
            Question::new("Boiling point of water at sea level (°C)?", &["90", "100", "110", "120"], 1),
            Question::new("Which ocean is the largest?", &["Atlantic", "Indian", "Arctic", "Pacific"], 3),
            Question::new("How many continents are there?", &["5", "6", "7", "8"], 2),
            Question::new("Square root of 81?", &["9", "8", "7", "6"], 0),
            Question::new("Fastest land animal?", &["Lion", "Cheetah", "Horse", "Pronghorn"], 1),
            Question::new("Which gas do plants absorb?", &["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"], 2),
        ];
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Supplies the next question for a round.
pub trait QuestionSource {
    fn next_question(&mut self) -> Question;
}

/// Draws uniformly at random, with replacement, from a shared bank.
pub struct Dealer {
    bank: Arc<QuestionBank>,
    rng: StdRng,
}

impl Dealer {
    /// `seed` makes the sequence reproducible; `None` seeds from the OS.
    pub fn new(bank: Arc<QuestionBank>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { bank, rng }
    }
}

impl QuestionSource for Dealer {
    fn next_question(&mut self) -> Question {
        let index = self.rng.random_range(0..self.bank.questions.len());
        self.bank.questions[index].clone()
    }
}
