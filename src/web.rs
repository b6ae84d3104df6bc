//! Browser adapter: owns the DOM, real timers and the confirm dialog, and
//! forwards page events into the [`Quiz`] controller.
//!
//! The quiz lives in a thread-local cell. It is only borrowed synchronously
//! inside an event handler or timer callback, never across an `.await`, and
//! the confirm dialog is opened from its own zero-delay timeout so a blocking
//! `window.confirm` never runs while the quiz is borrowed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Once;

use gloo_net::http::Request;
use rand::rngs::StdRng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Document, Element, HtmlInputElement, window};

use crate::config::QuizConfig;
use crate::controller::{Host, Notice, OptionMark, Phase, Quiz, QuizView};
use crate::error::QuizError;
use crate::random::RngSource;
use crate::timer::Ticket;

type WebQuiz = Quiz<RngSource<StdRng>>;

// Element ids shared with the page's markup / stylesheet.
const QUESTION_ID: &str = "questionText";
const CATEGORY_ID: &str = "categoryName";
const PROGRESS_ID: &str = "questionProgress";
const SCORE_ID: &str = "score";
const ATTEMPTS_ID: &str = "totalAttempts";
const GRID_ID: &str = "categoryGrid";
const NEXT_ID: &str = "nextButton";
const RESET_ID: &str = "resetButton";
const NOTICE_ID: &str = "notice";
const FILE_INPUT_ID: &str = "fileInput";

struct App {
    quiz: WebQuiz,
    host: WebHost,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

static LOGGER: Once = Once::new();

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    LOGGER.call_once(|| {
        wasm_logger::init(wasm_logger::Config::default());
        log::info!("Logging initialized");
    });
}

fn with_app<T>(f: impl FnOnce(&mut WebQuiz, &mut WebHost) -> T) -> Option<T> {
    APP.with(|cell| {
        let mut slot = cell.borrow_mut();
        let app = slot.as_mut()?;
        Some(f(&mut app.quiz, &mut app.host))
    })
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// --- Entry points -------------------------------------------------------------

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    start(QuizConfig::default())
}

/// Like `start_game`, with a JSON config object (missing fields use defaults).
#[wasm_bindgen]
pub fn start_game_with_config(config_json: &str) -> Result<(), JsValue> {
    start(QuizConfig::from_json(config_json).map_err(js_err)?)
}

fn start(config: QuizConfig) -> Result<(), JsValue> {
    if APP.with(|cell| cell.borrow().is_some()) {
        return Err(JsValue::from_str("game already started"));
    }
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    ensure_layout(&doc)?;
    let app = App {
        quiz: Quiz::new(config, RngSource::from_entropy()),
        host: WebHost {
            document: doc.clone(),
            timers: HashMap::new(),
        },
    };
    let data_url = app.quiz.config().data_url.clone();
    APP.with(|cell| cell.replace(Some(app)));

    wire_listeners(&doc)?;
    set_text(&doc, QUESTION_ID, "Loading questions...");
    fetch_catalog(data_url);
    Ok(())
}

/// Load catalog text supplied by the page (pasted, generated, ...).
#[wasm_bindgen]
pub fn load_catalog_text(text: &str) -> Result<(), JsValue> {
    with_app(|quiz, host| quiz.load_text(host, text))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(js_err)
}

#[wasm_bindgen]
pub fn next_question() -> Result<(), JsValue> {
    with_app(|quiz, host| quiz.next(host))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(js_err)
}

/// Returns whether the guess was correct, or `undefined` when it did not count.
#[wasm_bindgen]
pub fn guess_category(category: &str) -> Result<Option<bool>, JsValue> {
    with_app(|quiz, host| quiz.guess(host, category))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map(|o| o.map(|o| o.correct))
        .map_err(js_err)
}

#[wasm_bindgen]
pub fn reset_game() -> Result<(), JsValue> {
    with_app(|quiz, host| quiz.reset(host))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(js_err)
}

/// Current view as JSON, for pages that render themselves.
#[wasm_bindgen]
pub fn quiz_snapshot() -> Result<String, JsValue> {
    let view =
        with_app(|quiz, _| quiz.view()).ok_or_else(|| JsValue::from_str("game not started"))?;
    serde_json::to_string(&view).map_err(js_err)
}

// --- Loading ------------------------------------------------------------------

fn fetch_catalog(url: String) {
    let Some(ticket) = with_app(|quiz, _| quiz.begin_load()) else {
        return;
    };
    spawn_local(async move {
        let text = fetch_text(&url).await;
        with_app(|quiz, host| {
            let _ = quiz.finish_load(host, ticket, text);
        });
    });
}

async fn fetch_text(url: &str) -> Result<String, QuizError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| QuizError::source_unavailable(url, e.to_string()))?;
    if !resp.ok() {
        return Err(QuizError::source_unavailable(
            url,
            format!("HTTP {}", resp.status()),
        ));
    }
    resp.text()
        .await
        .map_err(|e| QuizError::source_unavailable(url, e.to_string()))
}

fn load_picked_file(input: &HtmlInputElement) {
    let Some(file) = input.files().and_then(|files| files.get(0)) else {
        return;
    };
    let Some(ticket) = with_app(|quiz, _| quiz.begin_load()) else {
        return;
    };
    spawn_local(async move {
        let name = file.name();
        let text = match JsFuture::from(file.text()).await {
            Ok(value) => value
                .as_string()
                .ok_or_else(|| QuizError::source_unavailable(&name, "file is not text")),
            Err(e) => Err(QuizError::source_unavailable(&name, format!("{:?}", e))),
        };
        with_app(|quiz, host| {
            let _ = quiz.finish_load(host, ticket, text);
        });
    });
}

// --- Host ---------------------------------------------------------------------

struct WebHost {
    document: Document,
    timers: HashMap<Ticket, i32>,
}

fn set_timeout(delay_ms: u32, f: impl FnOnce() + 'static) -> Result<i32, JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let callback = Closure::once_into_js(f);
    win.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        i32::try_from(delay_ms).unwrap_or(i32::MAX),
    )
}

impl Host for WebHost {
    fn render(&mut self, view: &QuizView) {
        if let Err(e) = render(&self.document, view) {
            log::error!("render failed: {:?}", e);
        }
    }

    fn schedule(&mut self, ticket: Ticket, delay_ms: u32) {
        let handle = set_timeout(delay_ms, move || {
            with_app(|quiz, host| {
                host.timers.remove(&ticket);
                quiz.fire(host, ticket);
            });
        });
        match handle {
            Ok(handle) => {
                self.timers.insert(ticket, handle);
            }
            Err(e) => log::error!("could not schedule timer {}: {:?}", ticket.id(), e),
        }
    }

    fn cancel(&mut self, ticket: Ticket) {
        if let (Some(handle), Some(win)) = (self.timers.remove(&ticket), window()) {
            win.clear_timeout_with_handle(handle);
        }
    }

    fn confirm(&mut self, ticket: Ticket, prompt: &str) {
        let prompt = prompt.to_string();
        let res = set_timeout(0, move || {
            let yes = window()
                .and_then(|w| w.confirm_with_message(&prompt).ok())
                .unwrap_or(false);
            with_app(|quiz, host| quiz.confirmed(host, ticket, yes));
        });
        if let Err(e) = res {
            log::error!("could not open confirm dialog: {:?}", e);
        }
    }

    fn notify(&mut self, notice: Notice) {
        let text = match &notice {
            Notice::Verdict { correct: true, .. } => "Correct!".to_string(),
            Notice::Verdict {
                correct: false,
                category,
            } => format!("Wrong, it was {}", category),
            Notice::CycleCompleted { score, attempts } => {
                format!("All categories seen ({}/{}). Starting a new round.", score, attempts)
            }
            Notice::GameOver { .. } => String::new(),
            Notice::Error { message } => message.clone(),
        };
        set_text(&self.document, NOTICE_ID, &text);
    }
}

// --- Rendering ----------------------------------------------------------------

fn set_text(doc: &Document, id: &str, text: &str) {
    if let Some(el) = doc.get_element_by_id(id) {
        el.set_text_content(Some(text));
    }
}

fn render(doc: &Document, view: &QuizView) -> Result<(), JsValue> {
    let question = match (&view.message, &view.current) {
        (Some(message), _) => message.clone(),
        (None, Some(current)) => current.question_text.clone(),
        (None, None) => "Select a category to start!".to_string(),
    };
    set_text(doc, QUESTION_ID, &question);

    match &view.current {
        Some(current) if view.phase == Phase::Playing => {
            set_text(doc, CATEGORY_ID, &current.category);
            set_text(
                doc,
                PROGRESS_ID,
                &format!("{}/{}", current.question_index, current.question_count),
            );
        }
        _ => {
            set_text(doc, CATEGORY_ID, "");
            set_text(doc, PROGRESS_ID, "");
        }
    }
    set_text(doc, SCORE_ID, &view.score.to_string());
    set_text(doc, ATTEMPTS_ID, &view.attempts.to_string());

    let Some(grid) = doc.get_element_by_id(GRID_ID) else {
        return Ok(());
    };
    grid.set_inner_html("");
    for option in &view.options {
        let button = doc.create_element("button")?;
        button.set_text_content(Some(&option.label));
        button.set_attribute("data-category", &option.label)?;
        let classes = button.class_list();
        classes.add_1("category-button")?;
        match option.mark {
            OptionMark::Correct => classes.add_1("correct")?,
            OptionMark::Incorrect => classes.add_1("incorrect")?,
            OptionMark::Answer => classes.add_1("answer")?,
            OptionMark::None => {}
        }
        if !option.enabled {
            classes.add_1("disabled")?;
        }
        grid.append_child(&button)?;
    }
    Ok(())
}

// Create any element the page did not provide.
fn ensure_layout(doc: &Document) -> Result<(), JsValue> {
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
    let ensure = |id: &str, tag: &str, text: &str| -> Result<Element, JsValue> {
        if let Some(el) = doc.get_element_by_id(id) {
            return Ok(el);
        }
        let el = doc.create_element(tag)?;
        el.set_id(id);
        el.set_text_content(Some(text));
        body.append_child(&el)?;
        Ok(el)
    };
    ensure(QUESTION_ID, "div", "")?;
    ensure(CATEGORY_ID, "div", "")?;
    ensure(PROGRESS_ID, "div", "")?;
    ensure(SCORE_ID, "span", "0")?;
    ensure(ATTEMPTS_ID, "span", "0")?;
    ensure(GRID_ID, "div", "")?;
    ensure(NEXT_ID, "button", "Next")?;
    ensure(RESET_ID, "button", "Reset")?;
    ensure(NOTICE_ID, "div", "")?;
    Ok(())
}

// --- Event wiring -------------------------------------------------------------

fn on_click(el: &Element, f: impl FnMut(web_sys::MouseEvent) + 'static) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(web_sys::MouseEvent)>);
    el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn wire_listeners(doc: &Document) -> Result<(), JsValue> {
    // One delegated listener for the whole grid; buttons are rebuilt on every render.
    if let Some(grid) = doc.get_element_by_id(GRID_ID) {
        on_click(&grid, |evt| {
            let Some(button) = evt
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest(".category-button").ok().flatten())
            else {
                return;
            };
            if button.class_list().contains("disabled") {
                return;
            }
            if let Some(category) = button.get_attribute("data-category") {
                with_app(|quiz, host| {
                    let _ = quiz.guess(host, &category);
                });
            }
        })?;
    }

    if let Some(next) = doc.get_element_by_id(NEXT_ID) {
        on_click(&next, |_| {
            with_app(|quiz, host| {
                let _ = quiz.next(host);
            });
        })?;
    }

    if let Some(reset) = doc.get_element_by_id(RESET_ID) {
        on_click(&reset, |_| {
            with_app(|quiz, host| {
                let _ = quiz.reset(host);
            });
        })?;
    }

    if let Some(input) = doc
        .get_element_by_id(FILE_INPUT_ID)
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    {
        let target = input.clone();
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            load_picked_file(&target);
        }) as Box<dyn FnMut(_)>);
        input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}
