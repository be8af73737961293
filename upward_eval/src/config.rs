// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

use crate::status::StatusLevel;

/// The label used when a response does not say which shift or department it
/// comes from.
pub const UNKNOWN_LABEL: &str = "unknown";

/// The target name of a report that covers every evaluated supervisor.
pub const CONSOLIDATED_TARGET: &str = "consolidated";

/// The identifier of a competency (a single evaluable statement).
///
/// Identifiers are never empty and carry no surrounding whitespace.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompetencyId(pub(crate) String);

impl CompetencyId {
    pub fn new(id: &str) -> Option<CompetencyId> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(CompetencyId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CompetencyId {
    type Error = EvaluationErrors;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        CompetencyId::new(&value).ok_or(EvaluationErrors::InvalidIdentifier(value))
    }
}

impl From<CompetencyId> for String {
    fn from(id: CompetencyId) -> String {
        id.0
    }
}

impl Display for CompetencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identifier of a criterion (a reporting bucket for competencies).
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CriterionId(pub(crate) String);

impl CriterionId {
    pub fn new(id: &str) -> Option<CriterionId> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(CriterionId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CriterionId {
    type Error = EvaluationErrors;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        CriterionId::new(&value).ok_or(EvaluationErrors::InvalidIdentifier(value))
    }
}

impl From<CriterionId> for String {
    fn from(id: CriterionId) -> String {
        id.0
    }
}

impl Display for CriterionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated answer on the 1 to 5 scale.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Score> {
        if (Score::MIN..=Score::MAX).contains(&value) {
            Some(Score(value))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Parses a score written as text ("4", " 5 ", "3.0").
    pub fn parse(s: &str) -> Option<Score> {
        s.trim().parse::<f64>().ok().and_then(Score::from_f64)
    }

    /// Reads a score out of a raw document value.
    ///
    /// Only whole numbers between 1 and 5 are accepted, either as JSON numbers
    /// or as numeric strings. Anything else (booleans, nulls, 4.5, 7, "often")
    /// is rejected.
    pub fn from_json(value: &JSValue) -> Option<Score> {
        match value {
            JSValue::Number(n) => n.as_f64().and_then(Score::from_f64),
            JSValue::String(s) => Score::parse(s),
            _ => None,
        }
    }

    fn from_f64(x: f64) -> Option<Score> {
        if x.fract() == 0.0 && x >= Score::MIN as f64 && x <= Score::MAX as f64 {
            Some(Score(x as u8))
        } else {
            None
        }
    }
}

impl TryFrom<u8> for Score {
    type Error = EvaluationErrors;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value).ok_or(EvaluationErrors::InvalidScore(value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

/// The two families of criteria.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Category {
    /// The core leadership points.
    #[serde(rename = "core_12")]
    Core,
    /// The additional relational categories.
    #[serde(rename = "additional")]
    Additional,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Core => "core_12",
            Category::Additional => "additional",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
}

fn default_true() -> bool {
    true
}

/// A single evaluable leadership statement.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The criterion this competency was explicitly filed under, if any.
    /// It is not validated here: unknown values fall back to the text rules.
    #[serde(rename = "criterionId", default)]
    pub criterion_id: Option<String>,
    #[serde(default)]
    pub order: u32,
    /// The organizational levels that answer this competency. Empty means all.
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Competency {
    pub fn new(id: CompetencyId, name: &str) -> Competency {
        Competency {
            id,
            name: name.to_string(),
            description: String::new(),
            criterion_id: None,
            order: 0,
            levels: Vec::new(),
            active: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Competency {
        self.description = description.to_string();
        self
    }

    pub fn with_criterion(mut self, criterion_id: &str) -> Competency {
        self.criterion_id = Some(criterion_id.to_string());
        self
    }

    pub fn with_order(mut self, order: u32) -> Competency {
        self.order = order;
        self
    }

    pub fn belongs_to(&self, level: &str) -> bool {
        self.levels.is_empty()
            || self
                .levels
                .iter()
                .any(|l| l.trim().eq_ignore_ascii_case(level.trim()))
    }
}

/// A survey submission as stored by the document store, before validation.
///
/// The answers are kept as raw values: the store does not enforce any shape.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(rename = "evaluatorId", default)]
    pub evaluator_id: String,
    #[serde(rename = "evaluatedId", default)]
    pub evaluated_id: String,
    #[serde(rename = "evaluatedName", default)]
    pub evaluated_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub answers: serde_json::Map<String, JSValue>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A validated survey submission.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Response {
    pub evaluator_id: String,
    pub evaluated_id: String,
    pub evaluated_name: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub answers: HashMap<CompetencyId, Score>,
    pub comment: Option<String>,
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompetencyAverage {
    pub average: f64,
    /// The number of responses that answered this competency.
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyResult {
    pub competency_id: CompetencyId,
    pub name: String,
    pub criterion_id: CriterionId,
    pub average: f64,
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionAggregate {
    pub criterion: Criterion,
    /// The mean of the averages of the competencies filed under this criterion.
    pub average_score: f64,
    pub competency_count: usize,
    pub status: StatusLevel,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub criterion_id: CriterionId,
    pub criterion_name: String,
    pub status: StatusLevel,
    pub topics: Vec<String>,
}

/// Everything a report needs about one target (a supervisor or the consolidated view).
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub target: String,
    pub response_count: usize,
    pub evaluator_count: usize,
    /// Competencies with at least one answer, in catalog order.
    pub competencies: Vec<CompetencyResult>,
    /// Criteria with data, best first.
    pub criteria: Vec<CriterionAggregate>,
    /// 0.0 when there is no data.
    pub overall_average: f64,
    /// None when there is no data.
    pub status: Option<StatusLevel>,
    pub strengths: Vec<CriterionAggregate>,
    /// Weakest first.
    pub improvement_areas: Vec<CriterionAggregate>,
    pub comments: Vec<String>,
    pub shifts: BTreeMap<String, usize>,
    pub departments: BTreeMap<String, usize>,
    pub score_distribution: BTreeMap<u8, usize>,
    pub recommendations: Vec<Recommendation>,
}

impl AggregationResult {
    pub fn has_data(&self) -> bool {
        !self.criteria.is_empty()
    }
}

/// Errors raised while assembling a catalog or a set of inputs.
///
/// The aggregation itself does not fail.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EvaluationErrors {
    EmptyCatalog,
    UnknownCriterion(String),
    DuplicateCriterion(String),
    DuplicateCompetency(String),
    InvalidIdentifier(String),
    InvalidScore(u8),
}

impl Error for EvaluationErrors {}

impl Display for EvaluationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationErrors::EmptyCatalog => write!(f, "the catalog has no criteria"),
            EvaluationErrors::UnknownCriterion(id) => write!(f, "unknown criterion {:?}", id),
            EvaluationErrors::DuplicateCriterion(id) => {
                write!(f, "criterion {:?} is defined more than once", id)
            }
            EvaluationErrors::DuplicateCompetency(id) => {
                write!(f, "competency {:?} is defined more than once", id)
            }
            EvaluationErrors::InvalidIdentifier(id) => write!(f, "invalid identifier {:?}", id),
            EvaluationErrors::InvalidScore(s) => {
                write!(f, "score {} is outside of the 1 to 5 scale", s)
            }
        }
    }
}

// ********* Configuration **********

/// How many items each section of a report holds.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AggregationRules {
    pub strengths_count: usize,
    pub improvement_areas_count: usize,
    pub comments_limit: usize,
}

impl AggregationRules {
    pub const DEFAULT_RULES: AggregationRules = AggregationRules {
        strengths_count: 3,
        improvement_areas_count: 3,
        comments_limit: 5,
    };
}

impl Default for AggregationRules {
    fn default() -> Self {
        AggregationRules::DEFAULT_RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_are_trimmed() {
        assert_eq!(CompetencyId::new(" c1 ").unwrap().as_str(), "c1");
        assert_eq!(CompetencyId::new("   "), None);
        assert_eq!(CriterionId::new(""), None);
        let res: Result<CompetencyId, _> = serde_json::from_value(json!(""));
        assert!(res.is_err());
    }

    #[test]
    fn scores_from_documents() {
        assert_eq!(Score::from_json(&json!(4)).map(|s| s.value()), Some(4));
        assert_eq!(Score::from_json(&json!(" 5 ")).map(|s| s.value()), Some(5));
        assert_eq!(Score::from_json(&json!(3.0)).map(|s| s.value()), Some(3));
        for bad in [json!(4.5), json!(0), json!(6), json!("often"), json!(true), json!(null)] {
            assert_eq!(Score::from_json(&bad), None, "{}", bad);
        }
        assert_eq!(Score::try_from(9), Err(EvaluationErrors::InvalidScore(9)));
    }

    #[test]
    fn competency_levels() {
        let c = Competency::new(CompetencyId::new("c1").unwrap(), "Comunicación");
        assert!(c.belongs_to("operativo"));
        let js = json!({"id": "c2", "name": "Respeto", "levels": ["Operativo"]});
        let c: Competency = serde_json::from_value(js).unwrap();
        assert!(c.active);
        assert!(c.belongs_to("operativo"));
        assert!(!c.belongs_to("administrativo"));
    }
}
