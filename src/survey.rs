use log::{debug, info, warn};

use upward_eval::builder::Builder;
use upward_eval::*;

use snafu::{prelude::*, ErrorCompat, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::survey::config_reader::*;
use crate::survey::render::ReportFormat;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_msforms;
pub mod render;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading the entry {index} of {path}: {source}"))]
    ParsingJsonDocument {
        source: serde_json::Error,
        path: String,
        index: usize,
    },
    #[snafu(display("The file {path} does not contain an array of {key}"))]
    UnexpectedJson { path: String, key: String },
    #[snafu(display("Expected a positive index or an Excel column, got {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error serializing the summary: {source}"))]
    SerializingJson { source: serde_json::Error },

    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no data"))]
    EmptyExcel {},
    #[snafu(display(
        "The workbook {path} has several worksheets: excelWorksheetName must be provided"
    ))]
    MissingWorksheetName { path: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("No column of {path} matches a competency"))]
    MissingHeaderColumn { path: String },

    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },

    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Invalid catalog {path}: {source}"))]
    Catalog {
        source: EvaluationErrors,
        path: String,
    },
    #[snafu(display("Invalid survey: {source}"))]
    Evaluation { source: EvaluationErrors },
    #[snafu(display("Provider not implemented: {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown report format: {format}"))]
    UnknownFormat { format: String },
    #[snafu(display("Error writing the report to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The summary differs from the reference {path}"))]
    SummaryMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;
pub type BSurveyResult<T> = Result<T, Box<SurveyError>>;

fn build_summary_js(config: &OutputConfig, results: &[AggregationResult]) -> JSValue {
    let results_js: Vec<JSValue> = results.iter().map(render::result_to_json).collect();
    json!({
        "config": config,
        "results": results_js })
}

fn resolve_path(root: &Path, path: &str) -> String {
    let p: PathBuf = root.join(path);
    p.as_path().display().to_string()
}

fn read_response_data(
    root: &Path,
    cfs: &FileSource,
    competencies: &[Competency],
) -> BSurveyResult<Vec<RawResponse>> {
    let p = resolve_path(root, &cfs.file_path);
    info!("Attempting to read response file {:?}", p);
    let raw_responses = match cfs.provider.as_str() {
        "json" => io_json::read_json_responses(p),
        "csv" => io_csv::read_csv_responses(p, cfs, competencies),
        "msforms_likert" => io_msforms::read_msforms_likert(p, cfs, competencies),
        x => {
            return Err(Box::new(SurveyError::UnknownProvider {
                provider: x.to_string(),
            }))
        }
    }?;
    match cfs.evaluated_id.as_deref() {
        Some(eid) => {
            let res: Vec<RawResponse> = raw_responses
                .into_iter()
                .filter(|r| r.evaluated_id.trim() == eid.trim())
                .collect();
            debug!("read_response_data: {} responses about {:?}", res.len(), eid);
            Ok(res)
        }
        None => Ok(raw_responses),
    }
}

fn load_catalog(root: &Path, catalog_path: &Option<String>) -> BSurveyResult<Catalog> {
    match catalog_path {
        Some(p) => io_json::read_catalog(resolve_path(root, p)),
        None => Ok(Catalog::standard()),
    }
}

fn report_format(config: &SurveyConfig) -> SurveyResult<ReportFormat> {
    match config.output_settings.report_format.as_deref() {
        Some(f) => ReportFormat::parse(f),
        None => Ok(ReportFormat::Json),
    }
}

fn check_summary(summary_path: String, pretty_js_stats: &str) -> BSurveyResult<()> {
    let summary_ref = read_summary(summary_path.clone())?;
    debug!("check_summary: reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return Err(Box::new(SurveyError::SummaryMismatch { path: summary_path }));
    }
    info!("check_summary: the summary matches {:?}", summary_path);
    Ok(())
}

/// Runs the whole survey: reading, aggregation, reporting and the optional
/// comparison with a reference summary.
///
/// Arguments:
/// * `config` the survey
/// * `root` the directory against which the relative paths are resolved
/// * `check_summary_path` a reference JSON summary
/// * `out` where to write the report. It overrides the output directory of the
/// configuration. Without either, the report goes to the standard output.
pub fn run_survey(
    config: &SurveyConfig,
    root: &Path,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> BSurveyResult<()> {
    info!("config: {:?}", config);
    let format = report_format(config)?;
    let rules = config.aggregation_rules();

    let catalog = load_catalog(root, &config.catalog_path)?;
    info!("Using the catalog version {:?}", catalog.version());

    let competencies = io_json::read_competencies(
        resolve_path(root, &config.competency_source.file_path),
        config.competency_source.level.as_deref(),
    )?;

    if config.response_sources.is_empty() {
        warn!("run_survey: no response sources");
    }

    let mut builder = Builder::new(&catalog, &rules)
        .and_then(|b| b.competencies(&competencies))
        .context(EvaluationSnafu {})?;
    for cfs in config.response_sources.iter() {
        let raw_responses = read_response_data(root, cfs, &competencies)?;
        for raw in raw_responses.iter() {
            builder.add_raw_response(raw).context(EvaluationSnafu {})?;
        }
    }
    if builder.malformed_answers() > 0 {
        warn!(
            "run_survey: {} answers were dropped because they are not scores between 1 and 5",
            builder.malformed_answers()
        );
    }
    info!("run_survey: {} responses", builder.responses().len());

    let mut results: Vec<AggregationResult> = vec![builder.aggregate()];
    if config.output_settings.by_evaluated.unwrap_or(false) {
        results.extend(builder.aggregate_by_evaluated());
    }

    let output_config = OutputConfig {
        title: config.output_settings.report_title.clone(),
        period: config.output_settings.period.clone(),
        organization: config.output_settings.organization.clone(),
        catalog_version: catalog.version().to_string(),
    };

    // Assemble the final json
    let summary_js = build_summary_js(&output_config, &results);
    let pretty_js_stats =
        serde_json::to_string_pretty(&summary_js).context(SerializingJsonSnafu {})?;

    let report = render::render(format, &output_config, &results, &summary_js)?;
    let out_path = match (out, config.output_settings.output_directory.as_deref()) {
        (Some(p), _) => p,
        (None, Some(dir)) => resolve_path(
            root,
            &Path::new(dir)
                .join(format!("report.{}", format.extension()))
                .display()
                .to_string(),
        ),
        (None, None) => "stdout".to_string(),
    };
    render::write_output(&out_path, &report)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        check_summary(summary_p, &pretty_js_stats)?;
    }

    Ok(())
}

pub fn run_survey_file(
    config_path: String,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> BSurveyResult<()> {
    let config = read_config(&config_path)?;
    let config_p = Path::new(config_path.as_str());
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    run_survey(&config, root_p, check_summary_path, out)
}

/// Applies the command line on top of the configuration file, or builds a
/// configuration from the command line alone.
fn config_from_args(args: &Args) -> BSurveyResult<(SurveyConfig, PathBuf)> {
    let (mut config, root) = match args.config.clone() {
        Some(config_path) => {
            let config = read_config(&config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => {
            let competencies = match args.competencies.clone() {
                Some(p) => p,
                None => whatever_from_args("--competencies is required without --config")?,
            };
            if args.input.is_none() {
                whatever_from_args::<()>("--input is required without --config")?;
            }
            let config = SurveyConfig {
                output_settings: OutputSettings {
                    report_title: "Upward evaluation".to_string(),
                    period: None,
                    organization: None,
                    output_directory: None,
                    report_format: None,
                    by_evaluated: None,
                },
                response_sources: Vec::new(),
                competency_source: CompetencySource {
                    file_path: competencies,
                    level: None,
                },
                catalog_path: None,
                rules: None,
            };
            (config, PathBuf::new())
        }
    };

    if let Some(input) = args.input.clone() {
        let provider = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
        config.response_sources = vec![FileSource::new(&provider, &input)];
    }
    if let Some(p) = args.competencies.clone() {
        config.competency_source.file_path = p;
    }
    if let Some(eid) = args.evaluated.clone() {
        for cfs in config.response_sources.iter_mut() {
            cfs.evaluated_id = Some(eid.clone());
        }
    }
    if let Some(f) = args.format.clone() {
        config.output_settings.report_format = Some(f);
    }
    if args.by_evaluated {
        config.output_settings.by_evaluated = Some(true);
    }
    Ok((config, root))
}

fn whatever_from_args<T>(message: &str) -> SurveyResult<T> {
    whatever!("{}", message)
}

pub fn run_with_args(args: &Args) -> BSurveyResult<()> {
    debug!("args: {:?}", args);
    let (config, root) = config_from_args(args)?;
    run_survey(&config, &root, args.reference.clone(), args.out.clone())
}

fn run_survey_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let test_dir = option_env!("UPEVAL_TEST_DIR")
        .map(|s| s.to_string())
        .unwrap_or(format!("{}/tests", env!("CARGO_MANIFEST_DIR")));
    info!("Running test {}", test_name);
    let res = run_survey_file(
        format!("{}/{}/{}", test_dir, test_name, config_lpath),
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        Some("stdout".to_string()),
    );
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        panic!("test {} failed: {}", test_name, e);
    }
}

pub fn test_wrapper(test_name: &str) {
    run_survey_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn basic_json() {
        init();
        test_wrapper("basic_json");
    }

    #[test]
    fn csv_by_evaluated() {
        init();
        test_wrapper("csv_by_evaluated");
    }

    #[test]
    fn custom_catalog() {
        init();
        test_wrapper("custom_catalog");
    }

    #[test]
    fn unknown_provider() {
        let mut config = read_config(&format!(
            "{}/tests/basic_json/basic_json_config.json",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap();
        config.response_sources[0].provider = "ess".to_string();
        let root = PathBuf::from(format!("{}/tests/basic_json", env!("CARGO_MANIFEST_DIR")));
        let res = run_survey(&config, &root, None, Some("stdout".to_string()));
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn reference_mismatch() {
        let dir = format!("{}/tests/basic_json", env!("CARGO_MANIFEST_DIR"));
        let res = run_survey_file(
            format!("{}/basic_json_config.json", dir),
            Some(format!("{}/../csv_by_evaluated/csv_by_evaluated_expected_summary.json", dir)),
            Some("stdout".to_string()),
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::SummaryMismatch { .. })
        ));
    }

    #[test]
    fn arguments_without_config() {
        let dir = format!("{}/tests/csv_by_evaluated", env!("CARGO_MANIFEST_DIR"));
        let args = Args {
            config: None,
            reference: None,
            out: Some("stdout".to_string()),
            input: Some(format!("{}/responses.csv", dir)),
            input_type: None,
            competencies: Some(format!("{}/competencies.json", dir)),
            evaluated: Some("sup-02".to_string()),
            format: Some("text".to_string()),
            by_evaluated: true,
            verbose: false,
        };
        let (config, _) = config_from_args(&args).unwrap();
        assert_eq!(config.response_sources.len(), 1);
        assert_eq!(config.response_sources[0].provider, "csv");
        assert_eq!(
            config.response_sources[0].evaluated_id.as_deref(),
            Some("sup-02")
        );
        assert_eq!(config.output_settings.by_evaluated, Some(true));
        assert!(run_with_args(&args).is_ok());

        let missing = Args {
            competencies: None,
            ..args
        };
        assert!(config_from_args(&missing).is_err());
    }
}
