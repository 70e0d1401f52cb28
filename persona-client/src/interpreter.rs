//! Normalizes analysis payloads into a fixed [`AnalysisResult`].
//!
//! The backend does not guarantee which fields are present, so every score
//! falls back to `0.0`, the message to `""`, and interpretation never fails.
//!
//! ```text
//! {
//!   "confidence": 0.55,
//!   "message": "8편의 영화를 분석하여 ...",
//!   "data": {
//!     "personality": { "openness": 0.67, ... },
//!     "values": { "creativity_innovation": 0.75, ... }
//!   }
//! }
//! ```

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Shown when the message carries no "<n>편" count.
pub const DEFAULT_MOVIES_ANALYZED: &str = "5";

static MOVIE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)편").expect("movie count pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 5] = [
        PersonalityTrait::Openness,
        PersonalityTrait::Conscientiousness,
        PersonalityTrait::Extraversion,
        PersonalityTrait::Agreeableness,
        PersonalityTrait::Neuroticism,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PersonalityTrait::Openness => "openness",
            PersonalityTrait::Conscientiousness => "conscientiousness",
            PersonalityTrait::Extraversion => "extraversion",
            PersonalityTrait::Agreeableness => "agreeableness",
            PersonalityTrait::Neuroticism => "neuroticism",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PersonalityTrait::Openness => "개방성",
            PersonalityTrait::Conscientiousness => "성실성",
            PersonalityTrait::Extraversion => "외향성",
            PersonalityTrait::Agreeableness => "친화성",
            PersonalityTrait::Neuroticism => "신경성",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDimension {
    CreativityInnovation,
    SocialConnection,
    AchievementSuccess,
    HarmonyStability,
    AuthenticityDepth,
}

impl ValueDimension {
    pub const ALL: [ValueDimension; 5] = [
        ValueDimension::CreativityInnovation,
        ValueDimension::SocialConnection,
        ValueDimension::AchievementSuccess,
        ValueDimension::HarmonyStability,
        ValueDimension::AuthenticityDepth,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ValueDimension::CreativityInnovation => "creativity_innovation",
            ValueDimension::SocialConnection => "social_connection",
            ValueDimension::AchievementSuccess => "achievement_success",
            ValueDimension::HarmonyStability => "harmony_stability",
            ValueDimension::AuthenticityDepth => "authenticity_depth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ValueDimension::CreativityInnovation => "창의성·혁신",
            ValueDimension::SocialConnection => "사회적 관계",
            ValueDimension::AchievementSuccess => "성취·성공",
            ValueDimension::HarmonyStability => "조화·안정",
            ValueDimension::AuthenticityDepth => "진정성·깊이",
        }
    }
}

/// Big Five scores, each expected in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PersonalityScores {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl PersonalityScores {
    pub fn get(&self, t: PersonalityTrait) -> f64 {
        match t {
            PersonalityTrait::Openness => self.openness,
            PersonalityTrait::Conscientiousness => self.conscientiousness,
            PersonalityTrait::Extraversion => self.extraversion,
            PersonalityTrait::Agreeableness => self.agreeableness,
            PersonalityTrait::Neuroticism => self.neuroticism,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (PersonalityTrait, f64)> + '_ {
        PersonalityTrait::ALL.into_iter().map(|t| (t, self.get(t)))
    }

    /// Trait with the highest score; ties go to the earlier trait.
    pub fn dominant(&self) -> PersonalityTrait {
        self.entries()
            .fold((PersonalityTrait::Openness, f64::MIN), |best, (t, score)| {
                if score > best.1 { (t, score) } else { best }
            })
            .0
    }

    fn from_object(obj: Option<&Value>) -> Self {
        let score = |t: PersonalityTrait| number(obj.and_then(|o| o.get(t.key())));
        Self {
            openness: score(PersonalityTrait::Openness),
            conscientiousness: score(PersonalityTrait::Conscientiousness),
            extraversion: score(PersonalityTrait::Extraversion),
            agreeableness: score(PersonalityTrait::Agreeableness),
            neuroticism: score(PersonalityTrait::Neuroticism),
        }
    }
}

/// Value-dimension scores, each expected in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ValueScores {
    pub creativity_innovation: f64,
    pub social_connection: f64,
    pub achievement_success: f64,
    pub harmony_stability: f64,
    pub authenticity_depth: f64,
}

impl ValueScores {
    pub fn get(&self, d: ValueDimension) -> f64 {
        match d {
            ValueDimension::CreativityInnovation => self.creativity_innovation,
            ValueDimension::SocialConnection => self.social_connection,
            ValueDimension::AchievementSuccess => self.achievement_success,
            ValueDimension::HarmonyStability => self.harmony_stability,
            ValueDimension::AuthenticityDepth => self.authenticity_depth,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (ValueDimension, f64)> + '_ {
        ValueDimension::ALL.into_iter().map(|d| (d, self.get(d)))
    }

    fn from_object(obj: Option<&Value>) -> Self {
        let score = |d: ValueDimension| number(obj.and_then(|o| o.get(d.key())));
        Self {
            creativity_innovation: score(ValueDimension::CreativityInnovation),
            social_connection: score(ValueDimension::SocialConnection),
            achievement_success: score(ValueDimension::AchievementSuccess),
            harmony_stability: score(ValueDimension::HarmonyStability),
            authenticity_depth: score(ValueDimension::AuthenticityDepth),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub confidence: f64,
    pub message: String,
    pub personality: PersonalityScores,
    pub values: ValueScores,
    /// Display only. Scraped from `message`, never used for decisions.
    pub movies_analyzed: String,
    /// Optional prose summary from `data.personality.personality_summary`.
    pub summary: Option<String>,
}

impl AnalysisResult {
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round().max(0.0) as u32
    }
}

/// Total over any JSON input.
pub fn interpret(raw: &Value) -> AnalysisResult {
    let message = raw
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = raw.get("data");
    let personality = data.and_then(|d| d.get("personality"));
    let summary = personality
        .and_then(|p| p.get("personality_summary"))
        .and_then(Value::as_str)
        .map(str::to_string);

    AnalysisResult {
        confidence: number(raw.get("confidence")),
        movies_analyzed: movies_analyzed(&message),
        personality: PersonalityScores::from_object(personality),
        values: ValueScores::from_object(data.and_then(|d| d.get("values"))),
        message,
        summary,
    }
}

/// Digits immediately before `편` in `message`, else [`DEFAULT_MOVIES_ANALYZED`].
pub fn movies_analyzed(message: &str) -> String {
    MOVIE_COUNT
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_MOVIES_ANALYZED.to_string())
}

fn number(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_yields_all_defaults() {
        let result = interpret(&json!({}));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.message, "");
        assert_eq!(result.personality, PersonalityScores::default());
        assert_eq!(result.values, ValueScores::default());
        assert_eq!(result.movies_analyzed, "5");
        assert!(result.summary.is_none());
    }

    #[test]
    fn non_object_inputs_are_tolerated() {
        for raw in [json!(null), json!([1, 2]), json!("text"), json!(3)] {
            let result = interpret(&raw);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.personality, PersonalityScores::default());
        }
    }

    #[test]
    fn extracts_movie_count_from_message() {
        assert_eq!(
            interpret(&json!({"message": "12편의 영화를 분석..."})).movies_analyzed,
            "12"
        );
        assert_eq!(interpret(&json!({"message": "분석 완료"})).movies_analyzed, "5");
        assert_eq!(movies_analyzed("총 3 편"), "5");
    }

    #[test]
    fn full_payload_is_read() {
        let raw = json!({
            "success": true,
            "confidence": 0.5559,
            "message": "8편의 영화를 분석하여 도출된 결과입니다.",
            "data": {
                "personality": {
                    "openness": 0.67,
                    "conscientiousness": 0.59,
                    "extraversion": 0.72,
                    "agreeableness": 0.65,
                    "neuroticism": 0.43,
                    "movies_analyzed": 8,
                    "personality_summary": "창의적이고 사회적인 성격"
                },
                "values": {
                    "creativity_innovation": 0.75,
                    "social_connection": 0.68,
                    "harmony_stability": 0.41
                }
            }
        });
        let result = interpret(&raw);

        assert_eq!(result.confidence_percent(), 56);
        assert_eq!(result.movies_analyzed, "8");
        assert_eq!(result.personality.extraversion, 0.72);
        assert_eq!(result.personality.dominant(), PersonalityTrait::Extraversion);
        assert_eq!(result.values.get(ValueDimension::SocialConnection), 0.68);
        assert_eq!(result.values.achievement_success, 0.0);
        assert_eq!(result.summary.as_deref(), Some("창의적이고 사회적인 성격"));
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_zero() {
        let result = interpret(&json!({
            "confidence": "high",
            "message": 42,
            "data": {"personality": {"openness": "0.9"}, "values": []}
        }));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.message, "");
        assert_eq!(result.personality.openness, 0.0);
    }
}
