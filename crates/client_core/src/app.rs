use std::sync::Arc;

use maud::html;
use shared::error::ApiException;
use tracing::{error, info, warn};
use url::Url;

use crate::{
    api::{ApiClient, Backend, HttpApiClient},
    audio::{HttpMediaLoader, MediaLoader},
    config::Settings,
    document::Document,
    pages::{
        block::BlockPage,
        block_test::BlockTestPage,
        courses::CoursesPage,
        dashboard::DashboardPage,
        lesson::{LessonPage, LessonSettings},
        profile::ProfilePage,
        progress::ProgressPage,
    },
    router::{Route, NAV_IDS},
    session::{SessionGate, SessionState},
    token_store::{FileTokenStore, TokenStore},
};

pub const APP_CONTAINER: &str = "app-container";
pub const STARTUP_FAILED: &str = "Ошибка загрузки приложения";

pub enum ActivePage {
    Dashboard(DashboardPage),
    Progress(ProgressPage),
    Courses(CoursesPage),
    Profile(ProfilePage),
    Block(BlockPage),
    Lesson(Box<LessonPage>),
    BlockTest(BlockTestPage),
}

/// Application shell: owns the shared services and the page on screen.
pub struct App {
    settings: Settings,
    backend: Backend,
    session: SessionGate,
    document: Arc<dyn Document>,
    media: Arc<dyn MediaLoader>,
    route: Option<Route>,
    page: Option<ActivePage>,
}

impl App {
    pub fn new(
        settings: Settings,
        client: Arc<dyn ApiClient>,
        tokens: Arc<dyn TokenStore>,
        document: Arc<dyn Document>,
        media: Arc<dyn MediaLoader>,
    ) -> Self {
        let backend = Backend::new(client);
        let session = SessionGate::new(backend.clone(), tokens);
        Self {
            settings,
            backend,
            session,
            document,
            media,
            route: None,
            page: None,
        }
    }

    /// Wires the HTTP client, file token store and media loader from
    /// settings. A failure is shown as the start-up error screen.
    pub fn from_settings(
        settings: Settings,
        document: Arc<dyn Document>,
    ) -> Result<Self, ApiException> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(settings.token_path.clone()));
        let client = match HttpApiClient::new(
            settings.api_base.clone(),
            settings.csrf_token.clone(),
            Arc::clone(&tokens),
        ) {
            Ok(client) => client,
            Err(err) => {
                error!(error = %err, "app: failed to build api client");
                show_error_screen(document.as_ref(), STARTUP_FAILED);
                return Err(err);
            }
        };
        let media: Arc<dyn MediaLoader> = Arc::new(HttpMediaLoader::new(&settings.api_base));
        Ok(Self::new(settings, Arc::new(client), tokens, document, media))
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    pub fn page(&self) -> Option<&ActivePage> {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> Option<&mut ActivePage> {
        self.page.as_mut()
    }

    /// Resolves the session, then opens the page the entry URL points at.
    pub async fn initialize(&mut self, entry_url: &Url) -> Route {
        let state = self.session.initialize(Some(entry_url)).await;
        match state {
            SessionState::Authenticated { user, source } => {
                info!(username = %user.username, ?source, "app: session ready");
            }
            SessionState::Anonymous => warn!("app: starting without a session"),
        }
        let path = self
            .session
            .cleaned_url()
            .unwrap_or(entry_url)
            .path()
            .to_string();

        self.document.set_class("loading-screen", "hidden", true);
        self.document.set_class("bottom-nav", "visible", true);

        let route = Route::parse(&path);
        if let Err(err) = self.open(route).await {
            warn!(%route, error = %err, "app: page failed to load");
        }
        route
    }

    /// Replaces the page on screen. Load errors are already rendered by the
    /// page itself.
    pub async fn open(&mut self, route: Route) -> Result<(), ApiException> {
        info!(%route, "app: opening page");
        self.set_active_nav(route);
        self.document.set_class(APP_CONTAINER, "loading", true);
        self.route = Some(route);

        let backend = self.backend.clone();
        let document = Arc::clone(&self.document);
        let (page, result) = match route {
            Route::Dashboard => {
                let mut page = DashboardPage::new(backend, document);
                let result = page.initialize().await;
                (ActivePage::Dashboard(page), result)
            }
            Route::Progress => {
                let mut page = ProgressPage::new(backend, document);
                let result = page.initialize().await;
                if result.is_ok() {
                    page.load_summary().await;
                }
                (ActivePage::Progress(page), result)
            }
            Route::Courses => {
                let mut page = CoursesPage::new(backend, document);
                let result = page.initialize().await;
                (ActivePage::Courses(page), result)
            }
            Route::Profile => {
                let mut page = ProfilePage::new(backend, document);
                let result = page.initialize().await;
                (ActivePage::Profile(page), result)
            }
            Route::Block(block_id) => {
                let mut page = BlockPage::new(block_id, backend, document);
                let result = page.initialize().await;
                (ActivePage::Block(page), result)
            }
            Route::Lesson(lesson_id) => {
                let mut page = LessonPage::new(
                    lesson_id,
                    backend,
                    document,
                    Arc::clone(&self.media),
                    LessonSettings::from(&self.settings),
                );
                let result = page.initialize().await;
                (ActivePage::Lesson(Box::new(page)), result)
            }
            Route::BlockTest(block_id) => {
                let mut page = BlockTestPage::new(block_id, backend, document);
                let result = page.initialize().await;
                (ActivePage::BlockTest(page), result)
            }
        };
        self.page = Some(page);
        self.document.set_class(APP_CONTAINER, "loading", false);
        result
    }

    pub async fn navigate_to(&mut self, path: &str) -> Result<(), ApiException> {
        let route = Route::parse(path);
        self.document.navigate(&route.path());
        self.open(route).await
    }

    /// Logs out from the profile page; other pages ignore it.
    pub fn logout(&mut self) -> bool {
        match &self.page {
            Some(ActivePage::Profile(page)) => page.logout(&mut self.session),
            _ => false,
        }
    }

    fn set_active_nav(&self, route: Route) {
        let active = route.nav_id();
        for nav in NAV_IDS {
            self.document.set_class(nav, "active", nav == active);
        }
    }
}

pub fn show_error_screen(document: &dyn Document, message: &str) {
    document.render(
        APP_CONTAINER,
        html! {
            div class="error-screen" {
                div class="error-content" {
                    i class="fas fa-exclamation-triangle" {}
                    h2 { "Ошибка" }
                    p { (message) }
                    button class="btn-primary" data-action="reload" { "Попробовать снова" }
                }
            }
        },
    );
}
