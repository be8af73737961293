use log::warn;
use serde_json::Value as JSValue;
use std::collections::HashSet;

use crate::catalog::Catalog;
pub use crate::config::*;

/// A builder for collecting survey responses.
///
/// The builder validates the raw submissions as they are added, and keeps
/// track of the answers it had to discard.
///
/// ```
/// pub use upward_eval::builder::Builder;
/// pub use upward_eval::{AggregationRules, Catalog, Competency, CompetencyId};
/// # use upward_eval::EvaluationErrors;
///
/// let catalog = Catalog::standard();
/// let mut builder = Builder::new(&catalog, &AggregationRules::DEFAULT_RULES)?
///     .competencies(&[Competency::new(CompetencyId::new("q1").unwrap(), "Comunicación")])?;
///
/// builder.add_response_simple(&[("q1", 5)])?;
/// builder.add_response_simple(&[("q1", 4)])?;
///
/// let result = builder.aggregate();
/// assert_eq!(result.overall_average, 4.5);
/// # Ok::<(), EvaluationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _catalog: Catalog,
    pub(crate) _rules: AggregationRules,
    pub(crate) _competencies: Vec<Competency>,
    pub(crate) _responses: Vec<Response>,
    pub(crate) _malformed_answers: usize,
}

impl Builder {
    pub fn new(catalog: &Catalog, rules: &AggregationRules) -> Result<Builder, EvaluationErrors> {
        Ok(Builder {
            _catalog: catalog.clone(),
            _rules: *rules,
            _competencies: Vec::new(),
            _responses: Vec::new(),
            _malformed_answers: 0,
        })
    }

    /// Sets the competencies of the survey.
    ///
    /// Competency identifiers must be unique.
    pub fn competencies(self, comps: &[Competency]) -> Result<Builder, EvaluationErrors> {
        let mut seen: HashSet<&CompetencyId> = HashSet::new();
        for c in comps.iter() {
            if !seen.insert(&c.id) {
                return Err(EvaluationErrors::DuplicateCompetency(c.id.to_string()));
            }
        }
        Ok(Builder {
            _competencies: comps.to_vec(),
            ..self
        })
    }

    /// Adds an anonymous response made of (competency, score) pairs.
    pub fn add_response_simple(&mut self, answers: &[(&str, u8)]) -> Result<(), EvaluationErrors> {
        let mut raw = RawResponse::default();
        for (cid, score) in answers.iter() {
            raw.answers
                .insert(cid.to_string(), JSValue::Number((*score).into()));
        }
        self.add_raw_response(&raw)
    }

    /// Adds a response as it was read from a document store.
    ///
    /// Answers that are not whole numbers between 1 and 5 are dropped with a
    /// warning, and the rest of the response is kept.
    pub fn add_raw_response(&mut self, raw: &RawResponse) -> Result<(), EvaluationErrors> {
        let (response, malformed) = validate_response(raw);
        self._malformed_answers += malformed;
        self.add_response(response)
    }

    pub fn add_response(&mut self, response: Response) -> Result<(), EvaluationErrors> {
        self._responses.push(response);
        Ok(())
    }

    pub fn responses(&self) -> &[Response] {
        &self._responses
    }

    /// The number of answers that were discarded during validation.
    pub fn malformed_answers(&self) -> usize {
        self._malformed_answers
    }

    /// The consolidated aggregation over all the responses.
    pub fn aggregate(&self) -> AggregationResult {
        crate::run_aggregation(
            CONSOLIDATED_TARGET,
            &self._responses,
            &self._competencies,
            &self._catalog,
            &self._rules,
        )
    }

    /// The aggregation of the responses about one supervisor.
    pub fn aggregate_for(&self, evaluated_id: &str) -> AggregationResult {
        let responses = crate::responses_for(&self._responses, evaluated_id);
        crate::run_aggregation(
            evaluated_id,
            &responses,
            &self._competencies,
            &self._catalog,
            &self._rules,
        )
    }

    pub fn aggregate_by_evaluated(&self) -> Vec<AggregationResult> {
        crate::run_aggregation_by_evaluated(
            &self._responses,
            &self._competencies,
            &self._catalog,
            &self._rules,
        )
    }
}

/// Turns a raw submission into a validated response.
///
/// Returns the response and the number of answers that were dropped. Null
/// answers count as unanswered and are not reported.
pub fn validate_response(raw: &RawResponse) -> (Response, usize) {
    let mut response = Response {
        evaluator_id: raw.evaluator_id.trim().to_string(),
        evaluated_id: raw.evaluated_id.trim().to_string(),
        evaluated_name: raw.evaluated_name.clone(),
        department: raw.department.clone(),
        shift: raw.shift.clone(),
        comment: raw.comment.clone(),
        ..Response::default()
    };
    let mut malformed: usize = 0;
    for (key, value) in raw.answers.iter() {
        if value.is_null() {
            continue;
        }
        match (CompetencyId::new(key), Score::from_json(value)) {
            (Some(cid), Some(score)) => {
                response.answers.insert(cid, score);
            }
            _ => {
                warn!(
                    "validate_response: evaluator {:?}: dropping answer {:?} = {}",
                    response.evaluator_id, key, value
                );
                malformed += 1;
            }
        }
    }
    (response, malformed)
}
