use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{info, warn};

use crate::core::track::Track;
use crate::error::{ArchiveError, Result};
use crate::models::{AudioFormat, PrefixRules, SourcePayload, TrackDescriptor};
use crate::sources::{get_text, Collector, TrackStream};

const NAME: &str = "openuni";
const MAIN_URL: &str = "https://openuni.io";
const ARTIST: &str = "Открытый университет";
const STATE_PREFIX: &str = "window.__INITIAL_STATE__ = ";

/// Courses worth archiving, by portal course id.
const COURSES: &[(&str, &str)] = &[
    ("1", "culture-as-polytics"),
    ("2", "big-transit"),
    ("3", "road-to-market"),
    ("5", "new-human"),
    ("6", "restate"),
    ("7", "after-empire"),
];

/// Open University lectures. Pages carry their data as a JSON blob assigned
/// to `window.__INITIAL_STATE__` in an inline script.
pub struct OpenUniversity {
    client: Client,
}

struct Lesson {
    course_id: String,
    playlist: String,
    index: usize,
    number: u64,
}

impl OpenUniversity {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    fn page_state(&self, path: &str) -> Result<Value> {
        let html = get_text(&self.client, &format!("{MAIN_URL}{path}"))?;
        initial_state(&html)
    }

    fn lesson_track(&self, lesson: &Lesson) -> Result<Track> {
        let path = lesson_path(&lesson.course_id, lesson.number);
        let state = self.page_state(&path)?;
        lesson_from_state(&state, &path, &lesson.playlist, lesson.index)
    }
}

impl Collector for OpenUniversity {
    fn name(&self) -> &str {
        NAME
    }

    fn tracks<'a>(&'a self) -> Result<TrackStream<'a>> {
        let root = self.page_state("/")?;
        let lessons = lesson_list(&root)?;
        Ok(Box::new(
            lessons
                .into_iter()
                .map(move |lesson| self.lesson_track(&lesson)),
        ))
    }
}

fn source_error(reason: impl Into<String>) -> ArchiveError {
    ArchiveError::source(NAME, reason)
}

fn lesson_path(course_id: &str, number: u64) -> String {
    format!("/course/{course_id}/lesson/{number}/")
}

/// Parses the JSON assigned in the page's single initial-state script.
pub fn initial_state(html: &str) -> Result<Value> {
    let document = Html::parse_document(html);
    let script_sel =
        Selector::parse("script").map_err(|e| source_error(format!("bad selector: {e}")))?;

    let states: Vec<String> = document
        .select(&script_sel)
        .map(|script| script.text().collect::<String>())
        .filter(|text| text.trim_start().starts_with(STATE_PREFIX))
        .collect();
    let [state] = states.as_slice() else {
        return Err(source_error(format!(
            "expected one initial state script, found {}",
            states.len()
        )));
    };

    let json = state.trim().trim_start_matches(STATE_PREFIX).trim_end_matches(';');
    serde_json::from_str(json).map_err(|e| source_error(format!("initial state is not json: {e}")))
}

fn lesson_list(root: &Value) -> Result<Vec<Lesson>> {
    let courses = root
        .pointer("/store/courses/byId")
        .and_then(Value::as_object)
        .ok_or_else(|| source_error("no courses in initial state"))?;

    let mut lessons = Vec::new();
    for (course_id, course) in courses {
        let Some((_, name)) = COURSES.iter().find(|(id, _)| id == course_id) else {
            warn!("course {} is not supported", course_id);
            continue;
        };
        let playlist = format!("{course_id}-{name}");
        info!(
            "playlist {}: {} aka {}",
            course_id,
            course["title"].as_str().unwrap_or_default(),
            playlist
        );

        let items = course["lessons"]
            .as_array()
            .ok_or_else(|| source_error(format!("course {course_id} has no lessons")))?;
        if course["lessons_count"].as_u64() != Some(items.len() as u64) {
            return Err(source_error(format!(
                "course {course_id} announces {} lessons but lists {}",
                course["lessons_count"],
                items.len()
            )));
        }
        for (index, item) in items.iter().enumerate() {
            let number = item["number"].as_u64().unwrap_or_default();
            if number != index as u64 + 1 {
                return Err(source_error(format!(
                    "course {course_id}: lesson #{} has number {number}",
                    index + 1
                )));
            }
            lessons.push(Lesson {
                course_id: course_id.clone(),
                playlist: playlist.clone(),
                index,
                number,
            });
        }
    }
    Ok(lessons)
}

fn field<'v>(value: &'v Value, key: &str) -> Result<&'v str> {
    value[key]
        .as_str()
        .ok_or_else(|| source_error(format!("lesson has no {key:?}")))
}

/// Builds the track of one lesson page. Titles without the speaker get
/// `Speaker A и Speaker B: «Title»`.
fn lesson_from_state(state: &Value, path: &str, playlist: &str, index: usize) -> Result<Track> {
    let infos = state
        .pointer("/store/lessons/completeInfo")
        .and_then(Value::as_object)
        .ok_or_else(|| source_error(format!("{path} has no lesson info")))?;
    let mut values = infos.values();
    let (Some(info), None) = (values.next(), values.next()) else {
        return Err(source_error(format!(
            "{path} describes {} lessons instead of one",
            infos.len()
        )));
    };

    let raw_title = field(info, "title")?;
    let lecturers: Vec<String> = info["lecturers"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|l| {
                    format!(
                        "{} {}",
                        l["first_name"].as_str().unwrap_or_default(),
                        l["last_name"].as_str().unwrap_or_default()
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    let title = if raw_title.contains(": «") {
        raw_title.to_string()
    } else {
        format!("{}: «{}»", lecturers.join(" и "), raw_title)
    };
    let url = format!("{}{}", field(info, "audio")?, field(info, "audio_filename")?);

    Ok(Track::new(
        TrackDescriptor {
            title,
            created: format!("{:02}", index + 1),
            permalink: raw_title.to_string(),
            permalink_url: format!("{MAIN_URL}{path}"),
            artist: ARTIST.to_string(),
            artist_normalized: NAME.to_string(),
            playlist: playlist.to_string(),
            audio_format: AudioFormat::Mp3,
            prefix_rules: PrefixRules::default(),
        },
        SourcePayload::DirectUrl { url },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_initial_state_extraction() {
        let html = r#"<html><head>
            <script>var other = 1;</script>
            <script>window.__INITIAL_STATE__ = {"store": {"x": 1}};</script>
            </head><body></body></html>"#;
        let state = initial_state(html).unwrap();
        assert_eq!(state, json!({"store": {"x": 1}}));
    }

    #[test]
    fn test_missing_initial_state() {
        let err = initial_state("<html><script>var a;</script></html>").unwrap_err();
        assert!(matches!(err, ArchiveError::Source { .. }));
    }

    fn root_state(lessons_count: u64) -> Value {
        json!({"store": {"courses": {"byId": {
            "4": {"title": "Unsupported", "lessons_count": 1, "lessons": [{"number": 1}]},
            "7": {
                "title": "После империи",
                "lessons_count": lessons_count,
                "lessons": [{"number": 1}, {"number": 2}]
            }
        }}}})
    }

    #[test]
    fn test_lesson_list_skips_unknown_courses() {
        let lessons = lesson_list(&root_state(2)).unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].playlist, "7-after-empire");
        assert_eq!(lesson_path(&lessons[1].course_id, lessons[1].number), "/course/7/lesson/2/");
    }

    #[test]
    fn test_lesson_count_mismatch() {
        assert!(lesson_list(&root_state(3)).is_err());
    }

    fn lesson_state(title: &str) -> Value {
        json!({"store": {"lessons": {"completeInfo": {"17": {
            "title": title,
            "lecturers": [
                {"first_name": "Иван", "last_name": "Петров"},
                {"first_name": "Анна", "last_name": "Сидорова"}
            ],
            "audio": "https://cdn.openuni.io/audio/",
            "audio_filename": "lesson-2.mp3"
        }}}}})
    }

    #[test]
    fn test_lesson_title_gets_lecturers() {
        let track = lesson_from_state(
            &lesson_state("Империя"),
            "/course/7/lesson/2/",
            "7-after-empire",
            1,
        )
        .unwrap();

        let d = track.describe();
        assert_eq!(d.title, "Иван Петров и Анна Сидорова: «Империя»");
        assert_eq!(d.created, "02");
        assert_eq!(d.permalink_url, "https://openuni.io/course/7/lesson/2/");
        assert_eq!(
            track.payload(),
            &SourcePayload::DirectUrl {
                url: "https://cdn.openuni.io/audio/lesson-2.mp3".to_string()
            }
        );
        assert_eq!(
            track.relative_path().unwrap(),
            PathBuf::from("openuni/7-after-empire/02-Империя.mp3")
        );
    }

    #[test]
    fn test_decorated_title_kept() {
        let track = lesson_from_state(
            &lesson_state("Петров: «Империя»"),
            "/course/7/lesson/2/",
            "7-after-empire",
            1,
        )
        .unwrap();
        assert_eq!(track.describe().title, "Петров: «Империя»");
        assert_eq!(
            track.relative_path().unwrap(),
            PathBuf::from("openuni/7-after-empire/02-Петров \u{2014} «Империя».mp3")
        );
    }
}
