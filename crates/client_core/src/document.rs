use std::{
    collections::{BTreeSet, HashMap},
    sync::{Mutex, MutexGuard},
};

use maud::Markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Rendering surface the page controllers write to. Elements are addressed
/// by id, the way the pages' templates name them.
pub trait Document: Send + Sync {
    fn render(&self, element: &str, html: Markup);
    fn set_text(&self, element: &str, text: &str);
    fn set_class(&self, element: &str, class: &str, enabled: bool);
    fn set_width(&self, element: &str, percent: f64);
    fn toast(&self, toast: Toast);
    /// Blocking yes/no prompt.
    fn confirm(&self, prompt: &str) -> bool;
    fn navigate(&self, location: &str);
}

#[derive(Default)]
struct MemoryState {
    html: HashMap<String, String>,
    text: HashMap<String, String>,
    classes: HashMap<String, BTreeSet<String>>,
    widths: HashMap<String, f64>,
    toasts: Vec<Toast>,
    prompts: Vec<String>,
    navigations: Vec<String>,
    confirm_answer: bool,
}

/// Document that records everything written to it.
#[derive(Default)]
pub struct MemoryDocument {
    state: Mutex<MemoryState>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering_confirm(answer: bool) -> Self {
        let document = Self::default();
        document.state().confirm_answer = answer;
        document
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn html(&self, element: &str) -> Option<String> {
        self.state().html.get(element).cloned()
    }

    pub fn text(&self, element: &str) -> Option<String> {
        self.state().text.get(element).cloned()
    }

    pub fn has_class(&self, element: &str, class: &str) -> bool {
        self.state()
            .classes
            .get(element)
            .is_some_and(|classes| classes.contains(class))
    }

    pub fn width(&self, element: &str) -> Option<f64> {
        self.state().widths.get(element).copied()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.state().toasts.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }
}

impl Document for MemoryDocument {
    fn render(&self, element: &str, html: Markup) {
        self.state()
            .html
            .insert(element.to_string(), html.into_string());
    }

    fn set_text(&self, element: &str, text: &str) {
        self.state()
            .text
            .insert(element.to_string(), text.to_string());
    }

    fn set_class(&self, element: &str, class: &str, enabled: bool) {
        let mut state = self.state();
        let classes = state.classes.entry(element.to_string()).or_default();
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn set_width(&self, element: &str, percent: f64) {
        self.state().widths.insert(element.to_string(), percent);
    }

    fn toast(&self, toast: Toast) {
        self.state().toasts.push(toast);
    }

    fn confirm(&self, prompt: &str) -> bool {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());
        state.confirm_answer
    }

    fn navigate(&self, location: &str) {
        self.state().navigations.push(location.to_string());
    }
}
