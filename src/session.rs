//! Sampler / session state machine.
//!
//! Groups are handed out one at a time without replacement. When the pool is
//! exhausted it is refilled from the groups already shown (a cycle wrap). Each
//! presented group owes exactly one scored attempt: either an explicit category
//! guess on its first question, or an implicit wrong when the player moves on
//! without guessing.

use serde::Serialize;

use crate::catalog::{Catalog, QuestionGroup};
use crate::error::{QuizError, Result};
use crate::random::{RandomSource, pick_index};

/// Label shown instead of the category while it is still being guessed.
pub const HIDDEN_CATEGORY: &str = "-";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No catalog loaded.
    Idle,
    /// Catalog loaded, no active group.
    Ready,
    /// A group is active and its category prompt is resolved or past.
    Presenting,
    /// First question of the active group, category not guessed yet.
    AwaitingCategoryAnswer,
}

impl SessionState {
    pub fn is_presenting(self) -> bool {
        matches!(self, Self::Presenting | Self::AwaitingCategoryAnswer)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Guessed { correct: bool },
    Skipped,
}

#[derive(Clone, Debug)]
struct Presentation {
    group: usize,
    cursor: usize,
    resolution: Option<Resolution>,
}

/// Result of drawing a new group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Draw {
    /// Catalog index of the drawn group.
    pub group: usize,
    /// The pool was empty and had to be refilled before this draw.
    pub cycle_completed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Same group, moved to the question at this (0-based) position.
    NextQuestion(usize),
    /// The group ran out of questions and a new one was drawn.
    NewGroup(Draw),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuessOutcome {
    pub correct: bool,
    /// The true category, for the reveal.
    pub category: String,
}

/// Snapshot of what the presentation layer needs for the active group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CurrentView {
    pub category: String,
    pub question_text: String,
    /// 1-based.
    pub question_index: usize,
    pub question_count: usize,
    pub score: u32,
    pub attempts: u32,
}

pub struct Session<R> {
    rng: R,
    catalog: Option<Catalog>,
    available: Vec<usize>,
    used: Vec<usize>,
    current: Option<Presentation>,
    score: u32,
    attempts: u32,
}

impl<R: RandomSource> Session<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            catalog: None,
            available: Vec::new(),
            used: Vec::new(),
            current: None,
            score: 0,
            attempts: 0,
        }
    }

    /// Take ownership of a freshly parsed catalog. An empty catalog is refused
    /// and leaves the session exactly as it was.
    pub fn load(&mut self, catalog: Catalog) -> Result<()> {
        if catalog.is_empty() {
            return Err(QuizError::EmptyCatalog);
        }
        log::info!("session loaded {} groups", catalog.len());
        self.catalog = Some(catalog);
        self.reset_pools();
        Ok(())
    }

    /// Start over with the loaded catalog: full pool, zero score.
    pub fn restart(&mut self) -> Result<()> {
        if self.catalog.is_none() {
            return Err(QuizError::NotLoaded);
        }
        self.reset_pools();
        Ok(())
    }

    fn reset_pools(&mut self) {
        let len = self.catalog.as_ref().map_or(0, Catalog::len);
        self.available = (0..len).collect();
        self.used.clear();
        self.current = None;
        self.score = 0;
        self.attempts = 0;
    }

    /// Leave the active group (charging an implicit wrong if its category was
    /// never guessed), refill the pool if needed and draw the next group.
    pub fn start_new_group(&mut self) -> Result<Draw> {
        if self.catalog.is_none() {
            return Err(QuizError::NotLoaded);
        }
        self.conclude_current();

        let mut cycle_completed = false;
        if self.available.is_empty() {
            self.available = std::mem::take(&mut self.used);
            cycle_completed = true;
            log::info!(
                "cycle completed: score {}/{}, refilling {} groups",
                self.score,
                self.attempts,
                self.available.len()
            );
        }

        let pos = pick_index(&mut self.rng, self.available.len());
        let group = self.available.remove(pos);
        self.used.push(group);
        self.current = Some(Presentation {
            group,
            cursor: 0,
            resolution: None,
        });
        log::debug!("drew group {} ({} left in cycle)", group, self.available.len());

        Ok(Draw {
            group,
            cycle_completed,
        })
    }

    /// Move to the next question of the active group, or to a new group once
    /// the questions run out. Skipping past an unguessed first question counts
    /// as a wrong attempt.
    pub fn advance(&mut self) -> Result<Advance> {
        let len = self.current_group().ok_or(QuizError::NotPresenting)?.len();
        let Some(p) = self.current.as_mut() else {
            return Err(QuizError::NotPresenting);
        };

        if p.cursor == 0 && p.resolution.is_none() {
            p.resolution = Some(Resolution::Skipped);
            self.attempts += 1;
            log::debug!("group {} skipped without a guess", p.group);
        }
        p.cursor += 1;
        let cursor = p.cursor;

        if cursor >= len {
            Ok(Advance::NewGroup(self.start_new_group()?))
        } else {
            Ok(Advance::NextQuestion(cursor))
        }
    }

    /// Score a category guess for the active group. Only the first guess on
    /// the first question counts; anything else returns `Ok(None)` and leaves
    /// the score untouched.
    pub fn submit_category_guess(&mut self, candidate: &str) -> Result<Option<GuessOutcome>> {
        let category = self
            .current_group()
            .ok_or(QuizError::NotPresenting)?
            .category()
            .to_string();
        let Some(p) = self.current.as_mut() else {
            return Err(QuizError::NotPresenting);
        };
        if p.cursor != 0 || p.resolution.is_some() {
            log::debug!("ignoring guess {:?} for group {}", candidate, p.group);
            return Ok(None);
        }

        let correct = candidate == category;
        p.resolution = Some(Resolution::Guessed { correct });
        self.attempts += 1;
        if correct {
            self.score += 1;
        }
        Ok(Some(GuessOutcome { correct, category }))
    }

    /// Close the active group without drawing a new one. Used when a finished
    /// cycle should end the game instead of wrapping.
    pub fn end_cycle(&mut self) {
        self.conclude_current();
    }

    fn conclude_current(&mut self) {
        if let Some(p) = self.current.take() {
            if p.resolution.is_none() {
                self.attempts += 1;
                log::debug!("group {} left without a guess", p.group);
            }
        }
    }

    pub fn current_view(&self) -> Option<CurrentView> {
        let p = self.current.as_ref()?;
        let group = self.current_group()?;
        let hidden = p.cursor == 0 && p.resolution.is_none();
        Some(CurrentView {
            category: if hidden {
                HIDDEN_CATEGORY.to_string()
            } else {
                group.category().to_string()
            },
            question_text: group.question(p.cursor).unwrap_or_default().to_string(),
            question_index: p.cursor + 1,
            question_count: group.len(),
            score: self.score,
            attempts: self.attempts,
        })
    }

    pub fn state(&self) -> SessionState {
        match (&self.catalog, &self.current) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::Ready,
            (Some(_), Some(p)) if p.cursor == 0 && p.resolution.is_none() => {
                SessionState::AwaitingCategoryAnswer
            }
            (Some(_), Some(_)) => SessionState::Presenting,
        }
    }

    pub fn current_group(&self) -> Option<&QuestionGroup> {
        let p = self.current.as_ref()?;
        self.catalog.as_ref()?.get(p.group)
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Groups not yet shown in the current cycle.
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Mutable access to the injected random source, shared with the
    /// controller for shuffling the category grid.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
