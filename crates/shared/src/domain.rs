use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(BlockId);
id_newtype!(LessonId);
id_newtype!(WordId);
id_newtype!(TestId);
id_newtype!(StudySessionId);

/// Screens of a lesson run, in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Cards,
    TrueFalse,
    Audio,
    Writing,
    Results,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Cards,
        Stage::TrueFalse,
        Stage::Audio,
        Stage::Writing,
        Stage::Results,
    ];

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Cards => Some(Stage::TrueFalse),
            Stage::TrueFalse => Some(Stage::Audio),
            Stage::Audio => Some(Stage::Writing),
            Stage::Writing => Some(Stage::Results),
            Stage::Results => None,
        }
    }

    pub fn position(self) -> usize {
        match self {
            Stage::Cards => 0,
            Stage::TrueFalse => 1,
            Stage::Audio => 2,
            Stage::Writing => 3,
            Stage::Results => 4,
        }
    }

    pub fn is_exercise(self) -> bool {
        matches!(self, Stage::TrueFalse | Stage::Audio | Stage::Writing)
    }

    /// Width of the lesson progress bar, in percent.
    pub fn progress_percent(self) -> f64 {
        self.position() as f64 / (Self::ORDER.len() - 1) as f64 * 100.0
    }

    /// DOM id suffix of the stage container (`stage-{slug}`).
    pub fn slug(self) -> &'static str {
        match self {
            Stage::Cards => "cards",
            Stage::TrueFalse => "exercise1",
            Stage::Audio => "exercise2",
            Stage::Writing => "exercise3",
            Stage::Results => "results",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Cards => "cards",
            Stage::TrueFalse => "true_false",
            Stage::Audio => "audio",
            Stage::Writing => "writing",
            Stage::Results => "results",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::Morning => "Утро",
            TimeSlot::Afternoon => "День",
            TimeSlot::Evening => "Вечер",
            TimeSlot::Night => "Ночь",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_fixed() {
        let mut walked = vec![Stage::Cards];
        while let Some(next) = walked.last().and_then(|stage| stage.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Stage::ORDER.to_vec());
    }

    #[test]
    fn only_quiz_stages_are_exercises() {
        let exercises: Vec<Stage> = Stage::ORDER
            .into_iter()
            .filter(|stage| stage.is_exercise())
            .collect();
        assert_eq!(exercises, vec![Stage::TrueFalse, Stage::Audio, Stage::Writing]);
    }

    #[test]
    fn progress_bar_spans_all_stages() {
        assert_eq!(Stage::Cards.progress_percent(), 0.0);
        assert_eq!(Stage::Audio.progress_percent(), 50.0);
        assert_eq!(Stage::Results.progress_percent(), 100.0);
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let raw = serde_json::to_string(&LessonId(42)).expect("serialize");
        assert_eq!(raw, "42");
    }
}
