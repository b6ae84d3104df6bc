//! Maps the game's external commands (load, next, guess, reset, timer and
//! dialog callbacks) onto a [`Session`] and reports everything the
//! presentation layer needs through an injected [`Host`].
//!
//! The controller never touches timers or dialogs itself: it hands the host a
//! [`Ticket`] and the host calls back with it. Tickets that were cancelled or
//! superseded in the meantime are ignored, so a late timer never acts on
//! stale state.

use serde::Serialize;

use crate::catalog::parse_catalog;
use crate::config::{CyclePolicy, QuizConfig};
use crate::error::{QuizError, Result};
use crate::random::{RandomSource, shuffle};
use crate::session::{Advance, CurrentView, Draw, GuessOutcome, Session, SessionState};
use crate::timer::{Ticket, TicketSlot};

pub const REPLAY_PROMPT: &str = "Play again?";

/// Presentation, timer and dialog collaborator.
pub trait Host {
    fn render(&mut self, view: &QuizView);
    /// Call [`Quiz::fire`] with `ticket` after `delay_ms`.
    fn schedule(&mut self, ticket: Ticket, delay_ms: u32);
    /// Best effort: the controller ignores the ticket anyway.
    fn cancel(&mut self, ticket: Ticket);
    /// Ask the player; answer with [`Quiz::confirmed`].
    fn confirm(&mut self, ticket: Ticket, prompt: &str);
    fn notify(&mut self, notice: Notice);
}

/// One-shot messages for the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Verdict { correct: bool, category: String },
    CycleCompleted { score: u32, attempts: u32 },
    GameOver { score: u32, attempts: u32 },
    Error { message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    NextGroup,
    PromptReplay,
    AwaitReplayAnswer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    None,
    Correct,
    Incorrect,
    /// The true category after a wrong guess.
    Answer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub label: String,
    pub mark: OptionMark,
    pub enabled: bool,
}

/// Everything needed to draw one frame of the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuizView {
    pub phase: Phase,
    pub state: SessionState,
    pub current: Option<CurrentView>,
    pub score: u32,
    pub attempts: u32,
    pub remaining: usize,
    pub options: Vec<CategoryOption>,
    pub message: Option<String>,
}

pub struct Quiz<R> {
    session: Session<R>,
    config: QuizConfig,
    timer: TicketSlot<Deferred>,
    loads: TicketSlot<()>,
    options: Vec<String>,
    last_guess: Option<(String, GuessOutcome)>,
    phase: Phase,
}

impl<R: RandomSource> Quiz<R> {
    pub fn new(config: QuizConfig, rng: R) -> Self {
        Self {
            session: Session::new(rng),
            config,
            timer: TicketSlot::new(),
            loads: TicketSlot::new(),
            options: Vec::new(),
            last_guess: None,
            phase: Phase::Playing,
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn session(&self) -> &Session<R> {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ticket for a catalog fetch about to start. Any earlier in-flight load
    /// is superseded.
    pub fn begin_load(&mut self) -> Ticket {
        let (ticket, old) = self.loads.schedule(());
        if let Some(old) = old {
            log::debug!("load {} superseded by {}", old.id(), ticket.id());
        }
        ticket
    }

    /// Complete a load started with [`Quiz::begin_load`]. Returns `Ok(false)`
    /// when the ticket is stale and the result was dropped.
    pub fn finish_load<H: Host>(
        &mut self,
        host: &mut H,
        ticket: Ticket,
        text: Result<String>,
    ) -> Result<bool> {
        if self.loads.take(ticket).is_none() {
            log::warn!("dropping stale load {}", ticket.id());
            return Ok(false);
        }
        let loaded = text.and_then(|text| self.install(host, &text));
        match loaded {
            Ok(()) => {
                host.render(&self.view());
                Ok(true)
            }
            Err(e) => {
                self.report(host, &e);
                host.render(&self.view());
                Err(e)
            }
        }
    }

    /// Load text that is already in hand (e.g. a picked file).
    pub fn load_text<H: Host>(&mut self, host: &mut H, text: &str) -> Result<()> {
        let ticket = self.begin_load();
        self.finish_load(host, ticket, Ok(text.to_string())).map(|_| ())
    }

    fn install<H: Host>(&mut self, host: &mut H, text: &str) -> Result<()> {
        let catalog = parse_catalog(text, self.config.max_groups);
        self.session.load(catalog)?;
        self.cancel_timer(host);
        self.phase = Phase::Playing;
        self.shuffle_options();
        self.next_group(host)
    }

    /// "Show next": next question of the active group, or a new group.
    pub fn next<H: Host>(&mut self, host: &mut H) -> Result<()> {
        if self.phase == Phase::GameOver {
            return Ok(());
        }
        self.cancel_timer(host);
        let res = match self.session.state() {
            state if state.is_presenting() => self.advance(host),
            SessionState::Ready => self.next_group(host),
            _ => Err(QuizError::NotLoaded),
        };
        self.finish(host, res)
    }

    fn advance<H: Host>(&mut self, host: &mut H) -> Result<()> {
        let leaving = self
            .session
            .current_view()
            .is_some_and(|v| v.question_index >= v.question_count);
        if leaving && self.replay_due() {
            self.game_over(host);
            return Ok(());
        }
        match self.session.advance()? {
            Advance::NextQuestion(_) => {}
            Advance::NewGroup(draw) => self.after_draw(host, draw),
        }
        Ok(())
    }

    fn next_group<H: Host>(&mut self, host: &mut H) -> Result<()> {
        if self.replay_due() {
            self.game_over(host);
            return Ok(());
        }
        let draw = self.session.start_new_group()?;
        self.after_draw(host, draw);
        Ok(())
    }

    fn replay_due(&self) -> bool {
        self.config.cycle_policy == CyclePolicy::AskToReplay
            && self.session.remaining() == 0
            && self.session.state() != SessionState::Idle
    }

    fn after_draw<H: Host>(&mut self, host: &mut H, draw: Draw) {
        self.last_guess = None;
        if draw.cycle_completed {
            host.notify(Notice::CycleCompleted {
                score: self.session.score(),
                attempts: self.session.attempts(),
            });
        }
    }

    fn game_over<H: Host>(&mut self, host: &mut H) {
        self.session.end_cycle();
        self.phase = Phase::GameOver;
        let (score, attempts) = (self.session.score(), self.session.attempts());
        log::info!("game over: {}/{}", score, attempts);
        host.notify(Notice::GameOver { score, attempts });
        self.schedule(host, Deferred::PromptReplay, self.config.replay_prompt_delay_ms);
    }

    /// Guess the category of the active group. `Ok(None)` when the guess does
    /// not count (already answered, past the first question, game over).
    pub fn guess<H: Host>(&mut self, host: &mut H, category: &str) -> Result<Option<GuessOutcome>> {
        if self.phase == Phase::GameOver {
            return Ok(None);
        }
        let outcome = match self.session.submit_category_guess(category) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.report(host, &e);
                return Err(e);
            }
        };

        self.last_guess = Some((category.to_string(), outcome.clone()));
        host.notify(Notice::Verdict {
            correct: outcome.correct,
            category: outcome.category.clone(),
        });
        self.schedule(host, Deferred::NextGroup, self.config.feedback_delay_ms);
        host.render(&self.view());
        Ok(Some(outcome))
    }

    /// Timer callback. Returns whether the ticket was live.
    pub fn fire<H: Host>(&mut self, host: &mut H, ticket: Ticket) -> bool {
        if self.timer.live() != Some(ticket) {
            log::debug!("ignoring stale timer {}", ticket.id());
            return false;
        }
        let Some(action) = self.timer.peek().copied() else {
            return false;
        };
        match action {
            Deferred::NextGroup => {
                self.timer.take(ticket);
                let res = self.next_group(host);
                let _ = self.finish(host, res);
            }
            Deferred::PromptReplay => {
                self.timer.take(ticket);
                let (confirm, _) = self.timer.schedule(Deferred::AwaitReplayAnswer);
                host.confirm(confirm, REPLAY_PROMPT);
            }
            Deferred::AwaitReplayAnswer => {
                log::warn!("timer {} is waiting for an answer, not a fire", ticket.id());
                return false;
            }
        }
        true
    }

    /// Answer to [`Host::confirm`]. Returns whether the ticket was live.
    pub fn confirmed<H: Host>(&mut self, host: &mut H, ticket: Ticket, yes: bool) -> bool {
        let awaiting = self.timer.live() == Some(ticket)
            && self.timer.peek() == Some(&Deferred::AwaitReplayAnswer);
        if !awaiting {
            log::debug!("ignoring stale answer {}", ticket.id());
            return false;
        }
        self.timer.take(ticket);
        if yes {
            let _ = self.reset(host);
        } else {
            host.render(&self.view());
        }
        true
    }

    /// Start over with the loaded catalog. Cancels pending timers, dialogs and
    /// in-flight loads.
    pub fn reset<H: Host>(&mut self, host: &mut H) -> Result<()> {
        self.cancel_timer(host);
        if let Some(load) = self.loads.cancel() {
            log::debug!("reset cancelled load {}", load.id());
        }
        let res = self.session.restart().and_then(|()| {
            self.phase = Phase::Playing;
            self.shuffle_options();
            self.next_group(host)
        });
        self.finish(host, res)
    }

    pub fn view(&self) -> QuizView {
        let state = self.session.state();
        let enabled = self.phase == Phase::Playing && state == SessionState::AwaitingCategoryAnswer;
        let options = self
            .options
            .iter()
            .map(|label| {
                let mark = match &self.last_guess {
                    Some((chosen, o)) if chosen == label => {
                        if o.correct {
                            OptionMark::Correct
                        } else {
                            OptionMark::Incorrect
                        }
                    }
                    Some((_, o)) if &o.category == label => OptionMark::Answer,
                    _ => OptionMark::None,
                };
                CategoryOption {
                    label: label.clone(),
                    mark,
                    enabled,
                }
            })
            .collect();
        let message = match self.phase {
            Phase::GameOver => Some(format!(
                "Game Over! Final Score: {}/{}",
                self.session.score(),
                self.session.attempts()
            )),
            Phase::Playing => None,
        };

        QuizView {
            phase: self.phase,
            state,
            current: self.session.current_view(),
            score: self.session.score(),
            attempts: self.session.attempts(),
            remaining: self.session.remaining(),
            options,
            message,
        }
    }

    fn shuffle_options(&mut self) {
        let mut labels: Vec<String> = Vec::new();
        if let Some(catalog) = self.session.catalog() {
            for group in catalog {
                if !labels.iter().any(|l| l == group.category()) {
                    labels.push(group.category().to_string());
                }
            }
        }
        shuffle(self.session.rng_mut(), &mut labels);
        self.options = labels;
        self.last_guess = None;
    }

    fn schedule<H: Host>(&mut self, host: &mut H, action: Deferred, delay_ms: u32) {
        let (ticket, old) = self.timer.schedule(action);
        if let Some(old) = old {
            host.cancel(old);
        }
        host.schedule(ticket, delay_ms);
    }

    fn cancel_timer<H: Host>(&mut self, host: &mut H) {
        if let Some(ticket) = self.timer.cancel() {
            host.cancel(ticket);
        }
    }

    fn report<H: Host>(&self, host: &mut H, e: &QuizError) {
        log::warn!("{}", e);
        host.notify(Notice::Error {
            message: e.to_string(),
        });
    }

    fn finish<H: Host>(&mut self, host: &mut H, res: Result<()>) -> Result<()> {
        if let Err(e) = &res {
            self.report(host, e);
        }
        host.render(&self.view());
        res
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingHost;
    use super::*;
    use crate::random::testing::Sequence;

    const DATA: &str = "A \"a1\" \"a2\"\nB \"b1\"";

    fn quiz(policy: CyclePolicy) -> (Quiz<Sequence>, RecordingHost) {
        let config = QuizConfig {
            cycle_policy: policy,
            ..QuizConfig::default()
        };
        let mut q = Quiz::new(config, Sequence::zero());
        let mut host = RecordingHost::default();
        q.load_text(&mut host, DATA).unwrap();
        (q, host)
    }

    #[test]
    fn load_starts_first_group_and_renders() {
        let (q, host) = quiz(CyclePolicy::Continue);
        let v = host.last_view();
        assert_eq!(v.state, SessionState::AwaitingCategoryAnswer);
        assert_eq!(v.current.as_ref().unwrap().question_text, "a1");
        assert_eq!(v.options.len(), 2);
        assert!(v.options.iter().all(|o| o.enabled && o.mark == OptionMark::None));
        assert_eq!(q.phase(), Phase::Playing);
    }

    #[test]
    fn empty_text_is_reported() {
        let mut q = Quiz::new(QuizConfig::default(), Sequence::zero());
        let mut host = RecordingHost::default();
        assert_eq!(q.load_text(&mut host, "\n\n"), Err(QuizError::EmptyCatalog));
        assert!(matches!(host.notices[0], Notice::Error { .. }));
        assert_eq!(host.last_view().state, SessionState::Idle);
    }

    #[test]
    fn stale_load_is_dropped() {
        let mut q = Quiz::new(QuizConfig::default(), Sequence::zero());
        let mut host = RecordingHost::default();
        let first = q.begin_load();
        let second = q.begin_load();
        assert_eq!(q.finish_load(&mut host, first, Ok(DATA.into())), Ok(false));
        assert_eq!(q.session().state(), SessionState::Idle);
        assert_eq!(q.finish_load(&mut host, second, Ok(DATA.into())), Ok(true));
        assert_eq!(q.session().catalog().unwrap().len(), 2);
    }

    #[test]
    fn source_failure_is_reported_once() {
        let mut q = Quiz::new(QuizConfig::default(), Sequence::zero());
        let mut host = RecordingHost::default();
        let t = q.begin_load();
        let err = QuizError::source_unavailable("data.txt", "404");
        assert_eq!(q.finish_load(&mut host, t, Err(err.clone())), Err(err));
        assert_eq!(host.notices.len(), 1);
    }

    #[test]
    fn guess_marks_options_and_schedules_next_group() {
        let (mut q, mut host) = quiz(CyclePolicy::Continue);
        let outcome = q.guess(&mut host, "B").unwrap().unwrap();
        assert!(!outcome.correct);

        let v = host.last_view();
        let mark = |label: &str| v.options.iter().find(|o| o.label == label).unwrap().mark;
        assert_eq!(mark("B"), OptionMark::Incorrect);
        assert_eq!(mark("A"), OptionMark::Answer);
        assert!(v.options.iter().all(|o| !o.enabled));
        assert_eq!(host.scheduled, vec![(host.last_scheduled(), 1000)]);

        let t = host.last_scheduled();
        assert!(q.fire(&mut host, t));
        let v = host.last_view();
        assert_eq!(v.current.as_ref().unwrap().question_text, "b1");
        assert!(v.options.iter().all(|o| o.mark == OptionMark::None));
    }

    #[test]
    fn next_cancels_pending_advance() {
        let (mut q, mut host) = quiz(CyclePolicy::Continue);
        q.guess(&mut host, "A").unwrap();
        let pending = host.last_scheduled();
        q.next(&mut host).unwrap();
        assert_eq!(host.cancelled, vec![pending]);
        assert_eq!(host.last_view().current.as_ref().unwrap().question_text, "a2");
        assert!(!q.fire(&mut host, pending));
        assert_eq!(host.last_view().current.as_ref().unwrap().question_text, "a2");
    }

    #[test]
    fn reset_cancels_pending_advance_and_zeroes_scores() {
        let (mut q, mut host) = quiz(CyclePolicy::Continue);
        q.guess(&mut host, "A").unwrap();
        let pending = host.last_scheduled();
        q.reset(&mut host).unwrap();
        assert!(!q.fire(&mut host, pending));
        let v = host.last_view();
        assert_eq!((v.score, v.attempts), (0, 0));
        assert_eq!(v.state, SessionState::AwaitingCategoryAnswer);
    }

    #[test]
    fn continue_policy_notifies_cycle_once() {
        let (mut q, mut host) = quiz(CyclePolicy::Continue);
        q.next(&mut host).unwrap(); // a2, A skipped
        q.next(&mut host).unwrap(); // b1
        q.next(&mut host).unwrap(); // wrap to a1
        let cycles: Vec<_> = host
            .notices
            .iter()
            .filter(|n| matches!(n, Notice::CycleCompleted { .. }))
            .collect();
        assert_eq!(cycles, [&Notice::CycleCompleted { score: 0, attempts: 2 }]);
        assert_eq!(q.phase(), Phase::Playing);
    }

    #[test]
    fn ask_to_replay_ends_game_and_restarts_on_yes() {
        let (mut q, mut host) = quiz(CyclePolicy::AskToReplay);
        q.guess(&mut host, "A").unwrap();
        let t = host.last_scheduled();
        q.fire(&mut host, t); // b1
        q.guess(&mut host, "A").unwrap();
        let t = host.last_scheduled();
        q.fire(&mut host, t); // pool empty -> game over

        let v = host.last_view();
        assert_eq!(v.phase, Phase::GameOver);
        assert_eq!(v.message.as_deref(), Some("Game Over! Final Score: 1/2"));
        assert_eq!(host.scheduled.last().unwrap().1, 1500);

        // commands are ignored until the dialog is answered
        q.next(&mut host).unwrap();
        assert_eq!(q.guess(&mut host, "B").unwrap(), None);

        let t = host.last_scheduled();
        assert!(q.fire(&mut host, t));
        let (ticket, prompt) = host.confirms.last().cloned().unwrap();
        assert_eq!(prompt, REPLAY_PROMPT);
        assert!(q.confirmed(&mut host, ticket, true));

        let v = host.last_view();
        assert_eq!(v.phase, Phase::Playing);
        assert_eq!((v.score, v.attempts, v.remaining), (0, 0, 1));
    }

    #[test]
    fn declining_replay_stays_game_over() {
        let (mut q, mut host) = quiz(CyclePolicy::AskToReplay);
        q.next(&mut host).unwrap();
        q.next(&mut host).unwrap();
        q.next(&mut host).unwrap(); // leaving b1 with empty pool
        assert_eq!(q.phase(), Phase::GameOver);
        assert_eq!(q.session().attempts(), 2);

        let t = host.last_scheduled();
        q.fire(&mut host, t);
        let (ticket, _) = host.confirms.last().cloned().unwrap();
        assert!(q.confirmed(&mut host, ticket, false));
        assert!(!q.confirmed(&mut host, ticket, true));
        assert_eq!(q.phase(), Phase::GameOver);
    }

    #[test]
    fn next_before_load_reports_not_loaded() {
        let mut q = Quiz::new(QuizConfig::default(), Sequence::zero());
        let mut host = RecordingHost::default();
        assert_eq!(q.next(&mut host), Err(QuizError::NotLoaded));
        assert_eq!(
            host.notices,
            [Notice::Error {
                message: "no catalog loaded".into()
            }]
        );
    }
}
