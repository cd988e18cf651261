//! Client core for the vocabulary course: backend access, the session gate,
//! the lesson exercise sequencer and the page controllers that render
//! through a [`document::Document`].

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod document;
pub mod exercises;
pub mod pages;
pub mod progress;
pub mod router;
pub mod session;
pub mod token_store;

pub use api::{ApiClient, ApiRequest, Backend, HttpApiClient, Method};
pub use app::{ActivePage, App};
pub use config::{load_settings, Settings};
pub use document::{Document, MemoryDocument, Toast, ToastKind};
pub use exercises::{LessonSequencer, SequenceError};
pub use progress::{ProgressReporter, ProgressSavePolicy};
pub use router::Route;
pub use session::{AuthSource, SessionGate, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod api_tests;

#[cfg(test)]
#[path = "tests/exercises_tests.rs"]
mod exercises_tests;

#[cfg(test)]
#[path = "tests/lesson_tests.rs"]
mod lesson_tests;

#[cfg(test)]
#[path = "tests/pages_tests.rs"]
mod pages_tests;

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod session_tests;

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod app_tests;
