mod config;
use log::{debug, info, warn};

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

pub mod builder;
pub mod catalog;
pub mod classifier;
pub mod manual;
pub mod status;

pub use crate::catalog::Catalog;
pub use crate::config::*;
pub use crate::status::StatusLevel;

/// Runs the aggregation for one target.
///
/// Arguments:
/// * `target` the name of the report target (a supervisor or [CONSOLIDATED_TARGET])
/// * `responses` the validated responses that belong to this target
/// * `competencies` the competencies of the survey. Inactive and duplicated
/// competencies are dropped, and the rest is put in presentation order.
/// * `catalog` the criteria and their classification rules
/// * `rules` the sizes of the report sections
///
/// This never fails: without data, the result is empty with an overall
/// average of 0.0 and no status.
pub fn run_aggregation(
    target: &str,
    responses: &[Response],
    competencies: &[Competency],
    catalog: &Catalog,
    rules: &AggregationRules,
) -> AggregationResult {
    info!(
        "run_aggregation: target {:?}: processing {} responses over {} competencies",
        target,
        responses.len(),
        competencies.len()
    );

    let checked = checks(competencies);
    let classified = classify_competencies(&checked, catalog);
    let averages = compute_competency_averages(responses, &checked);
    debug!("run_aggregation: competency averages: {:?}", averages);

    let aggregates = group_classified(&classified, &averages, catalog);
    let ranked = rank_criteria(&aggregates);
    let overall = overall_average(&ranked);
    let status = if ranked.is_empty() {
        None
    } else {
        Some(StatusLevel::from_average(overall))
    };

    let strengths = top_strengths(&ranked, rules.strengths_count);
    let improvement_areas = top_improvement_areas(&ranked, rules.improvement_areas_count);
    let recommendations: Vec<Recommendation> = improvement_areas
        .iter()
        .filter(|agg| agg.status.needs_attention())
        .map(|agg| Recommendation {
            criterion_id: agg.criterion.id.clone(),
            criterion_name: agg.criterion.name.clone(),
            status: agg.status,
            topics: catalog.recommendations(&agg.criterion.id).to_vec(),
        })
        .collect();

    let competency_results: Vec<CompetencyResult> = classified
        .iter()
        .filter_map(|(c, cid)| {
            averages.get(&c.id).map(|avg| CompetencyResult {
                competency_id: c.id.clone(),
                name: c.name.clone(),
                criterion_id: cid.clone(),
                average: avg.average,
                count: avg.count,
            })
        })
        .collect();

    for agg in ranked.iter() {
        info!(
            "run_aggregation: {:?}: {:.2} over {} competencies ({})",
            agg.criterion.id,
            agg.average_score,
            agg.competency_count,
            agg.status.label()
        );
    }

    AggregationResult {
        target: target.to_string(),
        response_count: responses.len(),
        evaluator_count: count_evaluators(responses),
        competencies: competency_results,
        criteria: ranked,
        overall_average: overall,
        status,
        strengths,
        improvement_areas,
        comments: extract_comments(responses, rules.comments_limit),
        shifts: group_by_shift(responses),
        departments: group_by_department(responses),
        score_distribution: score_distribution(responses, &checked),
        recommendations,
    }
}

/// Runs one aggregation per evaluated supervisor, in the order in which they
/// first appear in the responses.
///
/// The target of each result is the name of the supervisor when one of the
/// responses carries it, otherwise the id.
pub fn run_aggregation_by_evaluated(
    responses: &[Response],
    competencies: &[Competency],
    catalog: &Catalog,
    rules: &AggregationRules,
) -> Vec<AggregationResult> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Response>> = HashMap::new();
    for r in responses.iter() {
        let key = label_or_unknown(Some(&r.evaluated_id));
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(r.clone());
    }

    let mut res: Vec<AggregationResult> = Vec::new();
    for key in order.iter() {
        let group = groups.get(key).map(|v| v.as_slice()).unwrap_or(&[]);
        let target = group
            .iter()
            .filter_map(|r| r.evaluated_name.as_deref())
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(key.as_str());
        res.push(run_aggregation(target, group, competencies, catalog, rules));
    }
    res
}

/// The responses that evaluate the given supervisor.
pub fn responses_for(responses: &[Response], evaluated_id: &str) -> Vec<Response> {
    responses
        .iter()
        .filter(|r| r.evaluated_id.trim() == evaluated_id.trim())
        .cloned()
        .collect()
}

/// The average answer of every competency, and how many responses answered it.
///
/// Competencies that nobody answered are not part of the result.
pub fn compute_competency_averages(
    responses: &[Response],
    competencies: &[Competency],
) -> HashMap<CompetencyId, CompetencyAverage> {
    let mut res: HashMap<CompetencyId, CompetencyAverage> = HashMap::new();
    for c in competencies.iter() {
        let mut total: u64 = 0;
        let mut count: usize = 0;
        for r in responses.iter() {
            if let Some(score) = r.answers.get(&c.id) {
                total += score.value() as u64;
                count += 1;
            }
        }
        if count > 0 {
            res.insert(
                c.id.clone(),
                CompetencyAverage {
                    average: total as f64 / count as f64,
                    count,
                },
            );
        } else {
            debug!("compute_competency_averages: no answer for {}", c.id);
        }
    }
    res
}

/// Groups the competency averages by criterion, in the order of the catalog.
///
/// The average of a criterion is the mean of the averages of its
/// competencies: every competency weighs the same, no matter how many
/// responses it received. Criteria without any answered competency are left
/// out.
pub fn group_by_criterion(
    competencies: &[Competency],
    averages: &HashMap<CompetencyId, CompetencyAverage>,
    catalog: &Catalog,
) -> Vec<CriterionAggregate> {
    let classified = classify_competencies(competencies, catalog);
    group_classified(&classified, averages, catalog)
}

/// Sorts the criteria from the best to the worst average.
///
/// Equal averages keep their relative order.
pub fn rank_criteria(aggregates: &[CriterionAggregate]) -> Vec<CriterionAggregate> {
    let mut res = aggregates.to_vec();
    res.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(Ordering::Equal)
    });
    res
}

/// The mean of the criterion averages, or 0.0 without criteria.
pub fn overall_average(aggregates: &[CriterionAggregate]) -> f64 {
    let values: Vec<f64> = aggregates.iter().map(|a| a.average_score).collect();
    mean(&values).unwrap_or(0.0)
}

/// The first `n` criteria of a ranked list.
pub fn top_strengths(ranked: &[CriterionAggregate], n: usize) -> Vec<CriterionAggregate> {
    ranked.iter().take(n).cloned().collect()
}

/// The last `n` criteria of a ranked list, weakest first.
pub fn top_improvement_areas(ranked: &[CriterionAggregate], n: usize) -> Vec<CriterionAggregate> {
    ranked.iter().rev().take(n).cloned().collect()
}

/// The non-blank comments, in submission order, up to `limit`.
pub fn extract_comments(responses: &[Response], limit: usize) -> Vec<String> {
    responses
        .iter()
        .filter_map(|r| r.comment.as_deref())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(limit)
        .map(|s| s.to_string())
        .collect()
}

/// Counts the responses per shift. Responses without a shift are counted
/// under [UNKNOWN_LABEL].
pub fn group_by_shift(responses: &[Response]) -> BTreeMap<String, usize> {
    count_labels(responses.iter().map(|r| r.shift.as_deref()))
}

/// Counts the responses per department. Responses without a department are
/// counted under [UNKNOWN_LABEL].
pub fn group_by_department(responses: &[Response]) -> BTreeMap<String, usize> {
    count_labels(responses.iter().map(|r| r.department.as_deref()))
}

/// How many times each score was given to the listed competencies.
/// All the scores from 1 to 5 are present in the result.
pub fn score_distribution(
    responses: &[Response],
    competencies: &[Competency],
) -> BTreeMap<u8, usize> {
    let ids: HashSet<&CompetencyId> = competencies.iter().map(|c| &c.id).collect();
    let mut res: BTreeMap<u8, usize> = (Score::MIN..=Score::MAX).map(|s| (s, 0)).collect();
    for r in responses.iter() {
        for (cid, score) in r.answers.iter() {
            if ids.contains(cid) {
                *res.entry(score.value()).or_insert(0) += 1;
            }
        }
    }
    res
}

/// The number of distinct evaluators. Anonymous responses are not counted.
pub fn count_evaluators(responses: &[Response]) -> usize {
    responses
        .iter()
        .map(|r| r.evaluator_id.trim())
        .filter(|s| !s.is_empty())
        .collect::<HashSet<&str>>()
        .len()
}

fn count_labels<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, usize> {
    let mut res: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *res.entry(label_or_unknown(label)).or_insert(0) += 1;
    }
    res
}

fn label_or_unknown(label: Option<&str>) -> String {
    match label.map(|s| s.trim()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn classify_competencies<'a>(
    competencies: &'a [Competency],
    catalog: &Catalog,
) -> Vec<(&'a Competency, CriterionId)> {
    competencies
        .iter()
        .map(|c| (c, catalog.classify_competency(c)))
        .collect()
}

fn group_classified(
    classified: &[(&Competency, CriterionId)],
    averages: &HashMap<CompetencyId, CompetencyAverage>,
    catalog: &Catalog,
) -> Vec<CriterionAggregate> {
    let mut buckets: HashMap<&CriterionId, Vec<f64>> = HashMap::new();
    for (c, cid) in classified.iter() {
        if let Some(avg) = averages.get(&c.id) {
            buckets.entry(cid).or_default().push(avg.average);
        }
    }
    debug!("group_classified: buckets: {:?}", buckets);

    catalog
        .criteria()
        .iter()
        .filter_map(|criterion| {
            let values = buckets.get(&criterion.id)?;
            let average_score = mean(values)?;
            Some(CriterionAggregate {
                criterion: criterion.clone(),
                average_score,
                competency_count: values.len(),
                status: StatusLevel::from_average(average_score),
            })
        })
        .collect()
}

// Keeps the active competencies, once each, in presentation order.
fn checks(competencies: &[Competency]) -> Vec<Competency> {
    let mut seen: HashSet<&CompetencyId> = HashSet::new();
    let mut res: Vec<Competency> = Vec::new();
    for c in competencies.iter() {
        if !c.active {
            debug!("checks: skipping inactive competency {}", c.id);
            continue;
        }
        if !seen.insert(&c.id) {
            warn!("checks: competency {} is listed more than once, keeping the first one", c.id);
            continue;
        }
        res.push(c.clone());
    }
    res.sort_by_key(|c| c.order);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cid(s: &str) -> CompetencyId {
        CompetencyId::new(s).unwrap()
    }

    fn competency(id: &str, criterion: &str) -> Competency {
        Competency::new(cid(id), id).with_criterion(criterion)
    }

    fn response(answers: &[(&str, u8)]) -> Response {
        Response {
            answers: answers
                .iter()
                .map(|(k, v)| (cid(k), Score::new(*v).unwrap()))
                .collect(),
            ..Response::default()
        }
    }

    fn aggregate(id: &str, average_score: f64) -> CriterionAggregate {
        let catalog = Catalog::standard();
        let criterion = catalog
            .criterion(&CriterionId::new(id).unwrap())
            .unwrap()
            .clone();
        CriterionAggregate {
            criterion,
            average_score,
            competency_count: 1,
            status: StatusLevel::from_average(average_score),
        }
    }

    #[test]
    fn unanswered_competencies_are_left_out() {
        let competencies = vec![competency("c1", "liderazgo"), competency("c2", "liderazgo")];
        let responses = vec![response(&[("c1", 4)]), response(&[("c1", 2)])];
        let averages = compute_competency_averages(&responses, &competencies);
        assert_eq!(averages.len(), 1);
        assert_eq!(
            averages.get(&cid("c1")),
            Some(&CompetencyAverage {
                average: 3.0,
                count: 2
            })
        );
        assert!(!averages.contains_key(&cid("c2")));
    }

    #[test]
    fn mean_of_means() {
        let competencies = vec![competency("a", "respeto"), competency("b", "respeto")];
        let mut responses = vec![response(&[("a", 5)])];
        for _ in 0..100 {
            responses.push(response(&[("b", 1)]));
        }
        let averages = compute_competency_averages(&responses, &competencies);
        let groups = group_by_criterion(&competencies, &averages, &Catalog::standard());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].criterion.id.as_str(), "respeto");
        assert_eq!(groups[0].average_score, 3.0);
        assert_eq!(groups[0].competency_count, 2);
    }

    #[test]
    fn groups_follow_the_catalog_order() {
        let competencies = vec![
            competency("x", "ejemplo"),
            competency("y", "liderazgo"),
            competency("z", "comunicacion"),
        ];
        let responses = vec![response(&[("x", 3), ("y", 4), ("z", 5)])];
        let averages = compute_competency_averages(&responses, &competencies);
        let groups = group_by_criterion(&competencies, &averages, &Catalog::standard());
        let ids: Vec<&str> = groups.iter().map(|g| g.criterion.id.as_str()).collect();
        assert_eq!(ids, vec!["liderazgo", "comunicacion", "ejemplo"]);
    }

    #[test]
    fn ranking_is_stable() {
        let aggregates = vec![
            aggregate("liderazgo", 3.0),
            aggregate("comunicacion", 4.0),
            aggregate("respeto", 4.0),
            aggregate("seguridad", 2.0),
        ];
        let ranked = rank_criteria(&aggregates);
        let ids: Vec<&str> = ranked.iter().map(|a| a.criterion.id.as_str()).collect();
        assert_eq!(ids, vec!["comunicacion", "respeto", "liderazgo", "seguridad"]);
    }

    #[test]
    fn strengths_and_improvement_areas() {
        let ranked = rank_criteria(&[
            aggregate("liderazgo", 3.0),
            aggregate("comunicacion", 4.8),
            aggregate("respeto", 4.1),
            aggregate("seguridad", 2.0),
            aggregate("equidad", 3.5),
        ]);
        let best = top_strengths(&ranked, 3);
        assert_eq!(best.len(), 3);
        assert_eq!(best[0].criterion.id.as_str(), "comunicacion");
        assert_eq!(best[1].criterion.id.as_str(), "respeto");
        assert_eq!(best[2].criterion.id.as_str(), "equidad");
        let worst = top_improvement_areas(&ranked, 3);
        assert_eq!(worst[0].criterion.id.as_str(), "seguridad");
        assert_eq!(worst[1].criterion.id.as_str(), "liderazgo");
        assert_eq!(worst[2].criterion.id.as_str(), "equidad");
    }

    #[test]
    fn fewer_criteria_than_requested() {
        let ranked = rank_criteria(&[aggregate("liderazgo", 3.0)]);
        assert_eq!(top_strengths(&ranked, 3).len(), 1);
        assert_eq!(top_improvement_areas(&ranked, 3).len(), 1);
        assert!(top_strengths(&[], 3).is_empty());
    }

    #[test]
    fn overall_is_a_mean_of_criteria() {
        let aggregates = vec![aggregate("liderazgo", 3.0), aggregate("respeto", 4.0)];
        assert_eq!(overall_average(&aggregates), 3.5);
        assert_eq!(overall_average(&[]), 0.0);
    }

    #[test]
    fn end_to_end_single_criterion() {
        init();
        let competencies = vec![competency("c1", "liderazgo"), competency("c2", "liderazgo")];
        let responses = vec![response(&[("c1", 5), ("c2", 3)]), response(&[("c1", 4)])];

        let averages = compute_competency_averages(&responses, &competencies);
        assert_eq!(averages[&cid("c1")].average, 4.5);
        assert_eq!(averages[&cid("c1")].count, 2);
        assert_eq!(averages[&cid("c2")].average, 3.0);
        assert_eq!(averages[&cid("c2")].count, 1);

        let result = run_aggregation(
            CONSOLIDATED_TARGET,
            &responses,
            &competencies,
            &Catalog::standard(),
            &AggregationRules::DEFAULT_RULES,
        );
        assert_eq!(result.criteria.len(), 1);
        assert_eq!(result.criteria[0].criterion.id.as_str(), "liderazgo");
        assert_eq!(result.criteria[0].average_score, 3.75);
        assert_eq!(result.overall_average, 3.75);
        assert_eq!(result.status, Some(StatusLevel::Regular));
        assert_eq!(result.status.map(|s| s.label()), Some("Regular"));
        assert_eq!(result.response_count, 2);
        assert_eq!(result.competencies.len(), 2);
        // Regular calls for training.
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].criterion_id.as_str(), "liderazgo");
        assert!(!result.recommendations[0].topics.is_empty());
    }

    #[test]
    fn comments_skip_blank_entries() {
        let comments = vec![Some("A"), Some(""), None, Some("B")];
        let responses: Vec<Response> = comments
            .iter()
            .map(|c| Response {
                comment: c.map(|s| s.to_string()),
                ..Response::default()
            })
            .collect();
        assert_eq!(extract_comments(&responses, 5), vec!["A", "B"]);
        assert_eq!(extract_comments(&responses, 1), vec!["A"]);
        assert!(extract_comments(&responses, 0).is_empty());
    }

    #[test]
    fn empty_input() {
        let result = run_aggregation(
            CONSOLIDATED_TARGET,
            &[],
            &[competency("c1", "liderazgo")],
            &Catalog::standard(),
            &AggregationRules::DEFAULT_RULES,
        );
        assert!(!result.has_data());
        assert!(result.criteria.is_empty());
        assert_eq!(result.overall_average, 0.0);
        assert_eq!(result.status, None);
        assert!(result.strengths.is_empty());
        assert!(result.comments.is_empty());
        assert!(result.shifts.is_empty());
        assert_eq!(result.score_distribution.values().sum::<usize>(), 0);

        let no_competencies = run_aggregation(
            CONSOLIDATED_TARGET,
            &[response(&[("c1", 4)])],
            &[],
            &Catalog::standard(),
            &AggregationRules::DEFAULT_RULES,
        );
        assert!(!no_competencies.has_data());
        assert_eq!(no_competencies.response_count, 1);
    }

    #[test]
    fn shifts_and_departments() {
        let mut r1 = response(&[]);
        r1.shift = Some("Matutino".to_string());
        r1.department = Some("Producción".to_string());
        let mut r2 = response(&[]);
        r2.shift = Some("  ".to_string());
        let mut r3 = response(&[]);
        r3.shift = Some("Matutino".to_string());
        let r4 = response(&[]);
        let responses = vec![r1, r2, r3, r4];

        let shifts = group_by_shift(&responses);
        assert_eq!(shifts.get("Matutino"), Some(&2));
        assert_eq!(shifts.get(UNKNOWN_LABEL), Some(&2));
        assert_eq!(shifts.len(), 2);

        let departments = group_by_department(&responses);
        assert_eq!(departments.get("Producción"), Some(&1));
        assert_eq!(departments.get(UNKNOWN_LABEL), Some(&3));
    }

    #[test]
    fn distribution_counts_catalog_answers() {
        let competencies = vec![competency("c1", "liderazgo")];
        let responses = vec![
            response(&[("c1", 5), ("other", 1)]),
            response(&[("c1", 5)]),
            response(&[("c1", 2)]),
        ];
        let dist = score_distribution(&responses, &competencies);
        assert_eq!(dist.len(), 5);
        assert_eq!(dist[&5], 2);
        assert_eq!(dist[&2], 1);
        assert_eq!(dist[&1], 0);
    }

    #[test]
    fn inactive_and_duplicate_competencies() {
        let mut inactive = competency("c2", "respeto");
        inactive.active = false;
        let competencies = vec![
            competency("c1", "liderazgo").with_order(2),
            inactive,
            competency("c1", "seguridad").with_order(1),
            competency("c3", "comunicacion").with_order(1),
        ];
        let responses = vec![response(&[("c1", 4), ("c2", 1), ("c3", 5)])];
        let result = run_aggregation(
            CONSOLIDATED_TARGET,
            &responses,
            &competencies,
            &Catalog::standard(),
            &AggregationRules::DEFAULT_RULES,
        );
        let ids: Vec<&str> = result
            .competencies
            .iter()
            .map(|c| c.competency_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c3", "c1"]);
        assert_eq!(result.competencies[1].criterion_id.as_str(), "liderazgo");
        assert!(result
            .criteria
            .iter()
            .all(|c| c.criterion.id.as_str() != "respeto"));
    }

    #[test]
    fn split_by_evaluated() {
        let competencies = vec![competency("c1", "liderazgo")];
        let mut r1 = response(&[("c1", 5)]);
        r1.evaluated_id = "sup-2".to_string();
        r1.evaluated_name = Some("Ana".to_string());
        r1.evaluator_id = "e1".to_string();
        let mut r2 = response(&[("c1", 3)]);
        r2.evaluated_id = "sup-1".to_string();
        r2.evaluator_id = "e1".to_string();
        let mut r3 = response(&[("c1", 4)]);
        r3.evaluated_id = "sup-2".to_string();
        r3.evaluator_id = "e2".to_string();
        let responses = vec![r1, r2, r3];

        let results = run_aggregation_by_evaluated(
            &responses,
            &competencies,
            &Catalog::standard(),
            &AggregationRules::DEFAULT_RULES,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].target, "Ana");
        assert_eq!(results[0].overall_average, 4.5);
        assert_eq!(results[0].evaluator_count, 2);
        assert_eq!(results[1].target, "sup-1");
        assert_eq!(results[1].overall_average, 3.0);

        assert_eq!(responses_for(&responses, "sup-2").len(), 2);
        assert!(responses_for(&responses, "sup-9").is_empty());
    }
}
