//! Category Quiz core crate.
//!
//! A data file of `category "question" "question" ...` lines is parsed into a
//! [`Catalog`]; a [`Session`] hands out groups without replacement and keeps
//! score; a [`Quiz`] controller maps the game's commands onto the session and
//! drives a [`Host`] (the DOM adapter in the browser, a recording host in
//! tests). Everything except the `web` module is plain Rust and tests natively.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod random;
pub mod session;
pub mod timer;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use catalog::{Catalog, QuestionGroup, parse_catalog, parse_line, serialize_line};
pub use config::{CyclePolicy, QuizConfig};
pub use controller::{CategoryOption, Host, Notice, OptionMark, Phase, Quiz, QuizView};
pub use error::QuizError;
pub use random::{RandomSource, RngSource};
pub use session::{Advance, CurrentView, Draw, GuessOutcome, Session, SessionState};
pub use timer::{Ticket, TicketSlot};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;
