// Renderers for the aggregation results.

use serde_json::{json, Value as JSValue};
use std::path::Path;

use crate::survey::{config_reader::OutputConfig, *};

const PAGE_BREAK: &str = "\u{000C}";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ReportFormat {
    Json,
    Text,
    Html,
}

impl ReportFormat {
    pub fn parse(s: &str) -> SurveyResult<ReportFormat> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "text" | "txt" => Ok(ReportFormat::Text),
            "html" => Ok(ReportFormat::Html),
            _ => UnknownFormatSnafu { format: s }.fail(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
            ReportFormat::Html => "html",
        }
    }
}

/// Averages are reported with 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn ids(aggregates: &[CriterionAggregate]) -> Vec<String> {
    aggregates
        .iter()
        .map(|a| a.criterion.id.to_string())
        .collect()
}

pub fn result_to_json(r: &AggregationResult) -> JSValue {
    let criteria: Vec<JSValue> = r
        .criteria
        .iter()
        .map(|a| {
            json!({
                "average": round2(a.average_score),
                "category": a.criterion.category.as_str(),
                "competencyCount": a.competency_count,
                "id": a.criterion.id,
                "name": a.criterion.name,
                "status": a.status.label(),
            })
        })
        .collect();
    let competencies: Vec<JSValue> = r
        .competencies
        .iter()
        .map(|c| {
            json!({
                "average": round2(c.average),
                "count": c.count,
                "criterion": c.criterion_id,
                "id": c.competency_id,
                "name": c.name,
            })
        })
        .collect();
    let recommendations: Vec<JSValue> = r
        .recommendations
        .iter()
        .map(|rec| {
            json!({
                "criterion": rec.criterion_id,
                "status": rec.status.label(),
                "topics": rec.topics,
            })
        })
        .collect();
    json!({
        "comments": r.comments,
        "competencies": competencies,
        "criteria": criteria,
        "departments": r.departments,
        "evaluatorCount": r.evaluator_count,
        "improvementAreas": ids(&r.improvement_areas),
        "overallAverage": round2(r.overall_average),
        "recommendations": recommendations,
        "responseCount": r.response_count,
        "scoreDistribution": r.score_distribution,
        "shifts": r.shifts,
        "status": r.status.map(|s| s.label()),
        "strengths": ids(&r.strengths),
        "target": r.target,
    })
}

pub fn render(
    format: ReportFormat,
    config: &OutputConfig,
    results: &[AggregationResult],
    summary: &JSValue,
) -> BSurveyResult<String> {
    let res = match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(summary).context(SerializingJsonSnafu {})?
        }
        ReportFormat::Text => render_text(config, results),
        ReportFormat::Html => render_html(config, results),
    };
    Ok(res)
}

/// One page per target, separated by form feeds.
pub fn render_text(config: &OutputConfig, results: &[AggregationResult]) -> String {
    let pages: Vec<String> = results.iter().map(|r| text_page(config, r)).collect();
    let separator = format!("{}\n", PAGE_BREAK);
    pages.join(separator.as_str())
}

fn text_page(config: &OutputConfig, r: &AggregationResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(config.title.clone());
    let subtitle: Vec<&str> = [config.organization.as_deref(), config.period.as_deref()]
        .iter()
        .flatten()
        .cloned()
        .collect();
    if !subtitle.is_empty() {
        lines.push(subtitle.join(" - "));
    }
    lines.push(format!("Target: {}", r.target));
    lines.push(format!(
        "Responses: {}    Evaluators: {}",
        r.response_count, r.evaluator_count
    ));
    lines.push(String::new());

    if !r.has_data() {
        lines.push("No data for this target.".to_string());
        lines.push(String::new());
        return lines.join("\n");
    }

    if let Some(status) = r.status {
        lines.push(format!(
            "Overall average: {:.2} ({})",
            round2(r.overall_average),
            status.label()
        ));
        lines.push(String::new());
    }

    lines.push("Criteria".to_string());
    for a in r.criteria.iter() {
        lines.push(format!(
            "  {:<32} {:>5.2}  {}",
            a.criterion.name,
            round2(a.average_score),
            a.status.label()
        ));
    }
    lines.push(String::new());

    lines.push("Strengths".to_string());
    for (idx, a) in r.strengths.iter().enumerate() {
        lines.push(format!(
            "  {}. {} ({:.2})",
            idx + 1,
            a.criterion.name,
            round2(a.average_score)
        ));
    }
    lines.push("Improvement areas".to_string());
    for (idx, a) in r.improvement_areas.iter().enumerate() {
        lines.push(format!(
            "  {}. {} ({:.2})",
            idx + 1,
            a.criterion.name,
            round2(a.average_score)
        ));
    }
    lines.push(String::new());

    if !r.recommendations.is_empty() {
        lines.push("Recommended training".to_string());
        for rec in r.recommendations.iter() {
            lines.push(format!(
                "  - {}: {}",
                rec.criterion_name,
                rec.topics.join("; ")
            ));
        }
        lines.push(String::new());
    }

    if !r.comments.is_empty() {
        lines.push("Comments".to_string());
        for c in r.comments.iter() {
            lines.push(format!("  - {}", c));
        }
        lines.push(String::new());
    }

    lines.push("Shifts".to_string());
    for (shift, count) in r.shifts.iter() {
        lines.push(format!("  {}: {}", shift, count));
    }
    lines.push("Score distribution".to_string());
    for (score, count) in r.score_distribution.iter() {
        lines.push(format!("  {}: {}", score, count));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// A printable document with one section per target.
pub fn render_html(config: &OutputConfig, results: &[AggregationResult]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(&config.title)));
    out.push_str(
        "<style>\n\
         body { font-family: sans-serif; }\n\
         section.page { break-after: page; page-break-after: always; }\n\
         section.page:last-child { break-after: auto; page-break-after: auto; }\n\
         table { border-collapse: collapse; }\n\
         th, td { border: 1px solid #ccc; padding: 2px 8px; }\n\
         .status { color: #fff; padding: 0 6px; border-radius: 3px; }\n\
         </style>\n</head>\n<body>\n",
    );
    for r in results.iter() {
        out.push_str(&html_section(config, r));
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn status_badge(status: StatusLevel) -> String {
    format!(
        "<span class=\"status\" style=\"background-color: {}\">{}</span>",
        status.color(),
        status.label()
    )
}

fn html_section(config: &OutputConfig, r: &AggregationResult) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"page\">\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape(&config.title)));
    if let Some(period) = config.period.as_deref() {
        out.push_str(&format!("<p class=\"period\">{}</p>\n", escape(period)));
    }
    out.push_str(&format!("<h2>{}</h2>\n", escape(&r.target)));
    out.push_str(&format!(
        "<p>Responses: {} &middot; Evaluators: {}</p>\n",
        r.response_count, r.evaluator_count
    ));

    match r.status {
        None => out.push_str("<p>No data for this target.</p>\n"),
        Some(status) => {
            out.push_str(&format!(
                "<p>Overall average: <strong>{:.2}</strong> {}</p>\n",
                round2(r.overall_average),
                status_badge(status)
            ));
            out.push_str("<table>\n<tr><th>Criterion</th><th>Average</th><th>Status</th></tr>\n");
            for a in r.criteria.iter() {
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>\n",
                    escape(&a.criterion.name),
                    round2(a.average_score),
                    status_badge(a.status)
                ));
            }
            out.push_str("</table>\n");
            out.push_str(&html_list("Strengths", &r.strengths));
            out.push_str(&html_list("Improvement areas", &r.improvement_areas));
        }
    }

    if !r.recommendations.is_empty() {
        out.push_str("<h3>Recommended training</h3>\n<ul>\n");
        for rec in r.recommendations.iter() {
            out.push_str(&format!(
                "<li>{}: {}</li>\n",
                escape(&rec.criterion_name),
                escape(&rec.topics.join("; "))
            ));
        }
        out.push_str("</ul>\n");
    }
    if !r.comments.is_empty() {
        out.push_str("<h3>Comments</h3>\n<ul>\n");
        for c in r.comments.iter() {
            out.push_str(&format!("<li>{}</li>\n", escape(c)));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
    out
}

fn html_list(title: &str, aggregates: &[CriterionAggregate]) -> String {
    let mut out = format!("<h3>{}</h3>\n<ol>\n", title);
    for a in aggregates.iter() {
        out.push_str(&format!(
            "<li>{} ({:.2})</li>\n",
            escape(&a.criterion.name),
            round2(a.average_score)
        ));
    }
    out.push_str("</ol>\n");
    out
}

fn escape(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&#39;"),
            c => res.push(c),
        }
    }
    res
}

/// Writes a report to a file, or to the standard output for `stdout` (or an
/// empty path).
pub fn write_output(path: &str, content: &str) -> BSurveyResult<()> {
    if path.is_empty() || path == "stdout" {
        println!("{}", content);
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path })?;
        }
    }
    fs::write(path, content).context(WritingOutputSnafu { path })?;
    info!("write_output: report written to {:?}", path);
    Ok(())
}
