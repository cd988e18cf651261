use std::fmt;

use shared::domain::{BlockId, LessonId};

/// Screens the app can show. Unknown paths fall back to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Progress,
    Courses,
    Profile,
    Block(BlockId),
    Lesson(LessonId),
    BlockTest(BlockId),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let segments = match segments.as_slice() {
            ["app", rest @ ..] => rest,
            rest => rest,
        };
        match segments {
            ["progress"] => Route::Progress,
            ["courses"] => Route::Courses,
            ["profile"] => Route::Profile,
            ["block", id] => id.parse().map_or(Route::Dashboard, |id| Route::Block(BlockId(id))),
            ["lesson", id] => id
                .parse()
                .map_or(Route::Dashboard, |id| Route::Lesson(LessonId(id))),
            ["block-test", id] => id
                .parse()
                .map_or(Route::Dashboard, |id| Route::BlockTest(BlockId(id))),
            _ => Route::Dashboard,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/dashboard/".to_string(),
            Route::Progress => "/progress/".to_string(),
            Route::Courses => "/courses/".to_string(),
            Route::Profile => "/profile/".to_string(),
            Route::Block(id) => format!("/app/block/{id}/"),
            Route::Lesson(id) => format!("/app/lesson/{id}/"),
            Route::BlockTest(id) => format!("/app/block-test/{id}/"),
        }
    }

    /// Bottom navigation entry highlighted for this screen.
    pub fn nav_id(&self) -> &'static str {
        match self {
            Route::Progress => "nav-progress",
            Route::Courses | Route::Block(_) | Route::Lesson(_) | Route::BlockTest(_) => "nav-courses",
            Route::Profile => "nav-profile",
            Route::Dashboard => "nav-dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub const NAV_IDS: [&str; 4] = ["nav-dashboard", "nav-progress", "nav-courses", "nav-profile"];
