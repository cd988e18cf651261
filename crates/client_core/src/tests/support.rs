//! Fakes shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::WordId,
    error::{ApiException, ErrorCode},
    protocol::Word,
};

use crate::{
    api::{ApiClient, ApiRequest, Backend, Method},
    audio::MediaLoader,
};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Answers from a fixed table keyed by endpoint; anything else is a 404.
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<HashMap<String, Result<Value, ApiException>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, endpoint: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Ok(body));
    }

    pub fn fail(&self, endpoint: &str, err: ApiException) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.endpoint == endpoint)
            .collect()
    }
}

#[async_trait]
impl ApiClient for ScriptedApi {
    async fn call(&self, endpoint: &str, request: ApiRequest) -> Result<Value, ApiException> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            endpoint: endpoint.to_string(),
            body: request.body,
        });
        self.responses
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| Err(ApiException::from_status(404, None)))
    }
}

pub fn backend(api: &Arc<ScriptedApi>) -> Backend {
    Backend::new(Arc::clone(api) as Arc<dyn ApiClient>)
}

pub fn api_error(code: ErrorCode, message: &str) -> ApiException {
    ApiException::new(code, message)
}

/// Media loader whose outcome is chosen per URL.
#[derive(Default)]
pub struct FakeMedia {
    failing: HashSet<String>,
    slow: HashSet<String>,
    requested: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn slow(mut self, url: &str) -> Self {
        self.slow.insert(url.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaLoader for FakeMedia {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.slow.contains(url) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing.contains(url) {
            return Err(anyhow!("404 for {url}"));
        }
        Ok(())
    }
}

const TRANSLATIONS: [&str; 12] = [
    "книга", "перо", "небо", "земля", "вода", "солнце", "луна", "дом", "путь", "свет",
    "милосердие", "знание",
];

pub fn word(id: i64, translation: &str) -> Word {
    Word {
        id: WordId(id),
        arabic: format!("كلمة{id}"),
        translation: translation.to_string(),
        transcription: format!("kalima{id}"),
        audio_url: Some(format!("/media/audio/{id}.mp3")),
        image_url: None,
        example_verse: String::new(),
        example_translation: String::new(),
        is_learned: false,
        accuracy: 0.0,
    }
}

/// `count` words (at most 12) with distinct translations.
pub fn words(count: usize) -> Vec<Word> {
    TRANSLATIONS
        .iter()
        .take(count)
        .enumerate()
        .map(|(index, translation)| word(index as i64 + 1, translation))
        .collect()
}

pub fn lesson_json(lesson_id: i64, words: &[Word]) -> Value {
    json!({
        "lesson": {
            "id": lesson_id,
            "title": "Урок 1",
            "block_title": "Блок 1",
            "progress": { "is_completed": false, "accuracy": 0.0, "time_spent": 0 }
        },
        "words": words,
    })
}
