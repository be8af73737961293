use crate::survey::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportTitle")]
    pub report_title: String,
    #[serde(rename = "period")]
    pub period: Option<String>,
    #[serde(rename = "organization")]
    pub organization: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "reportFormat")]
    pub report_format: Option<String>,
    #[serde(rename = "byEvaluated")]
    pub by_evaluated: Option<bool>,
}

/// The description of a survey, as written in the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "catalogVersion")]
    pub catalog_version: String,
    pub organization: Option<String>,
    pub period: Option<String>,
    pub title: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "evaluatedId")]
    pub evaluated_id: Option<String>,
    #[serde(rename = "firstAnswerColumnIndex")]
    _first_answer_column_index: Option<JSValue>,
    #[serde(rename = "firstAnswerRowIndex")]
    _first_answer_row_index: Option<JSValue>,
    #[serde(rename = "evaluatorColumnIndex")]
    pub evaluator_column_index: Option<JSValue>,
    #[serde(rename = "evaluatedColumnIndex")]
    pub evaluated_column_index: Option<JSValue>,
    #[serde(rename = "evaluatedNameColumnIndex")]
    pub evaluated_name_column_index: Option<JSValue>,
    #[serde(rename = "departmentColumnIndex")]
    pub department_column_index: Option<JSValue>,
    #[serde(rename = "shiftColumnIndex")]
    pub shift_column_index: Option<JSValue>,
    #[serde(rename = "commentColumnIndex")]
    pub comment_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "choices")]
    pub choices: Option<Vec<String>>,
}

impl FileSource {
    /// A source with all the defaults.
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            evaluated_id: None,
            _first_answer_column_index: None,
            _first_answer_row_index: None,
            evaluator_column_index: None,
            evaluated_column_index: None,
            evaluated_name_column_index: None,
            department_column_index: None,
            shift_column_index: None,
            comment_column_index: None,
            excel_worksheet_name: None,
            choices: None,
        }
    }

    /// The first column that may hold answers (0-based).
    pub fn first_answer_column_index(&self) -> SurveyResult<usize> {
        Ok(read_optional_column(&self._first_answer_column_index)?.unwrap_or(0))
    }

    /// The first row with data (0-based). The row 0 is the header.
    pub fn first_answer_row_index(&self) -> SurveyResult<usize> {
        match &self._first_answer_row_index {
            None => Ok(1),
            x => {
                let row = read_js_int(x)?;
                if row < 2 {
                    whatever!(
                        "firstAnswerRowIndex is {} but the first row is the header",
                        row
                    )
                }
                Ok(row - 1)
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CompetencySource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub level: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyRules {
    #[serde(rename = "strengthsCount")]
    pub strengths_count: Option<usize>,
    #[serde(rename = "improvementAreasCount")]
    pub improvement_areas_count: Option<usize>,
    #[serde(rename = "commentsLimit")]
    pub comments_limit: Option<usize>,
}

impl SurveyRules {
    pub fn aggregation_rules(&self) -> AggregationRules {
        let d = AggregationRules::DEFAULT_RULES;
        AggregationRules {
            strengths_count: self.strengths_count.unwrap_or(d.strengths_count),
            improvement_areas_count: self
                .improvement_areas_count
                .unwrap_or(d.improvement_areas_count),
            comments_limit: self.comments_limit.unwrap_or(d.comments_limit),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "responseSources")]
    pub response_sources: Vec<FileSource>,
    #[serde(rename = "competencySource")]
    pub competency_source: CompetencySource,
    #[serde(rename = "catalogPath")]
    pub catalog_path: Option<String>,
    pub rules: Option<SurveyRules>,
}

impl SurveyConfig {
    pub fn aggregation_rules(&self) -> AggregationRules {
        self.rules
            .as_ref()
            .map(|r| r.aggregation_rules())
            .unwrap_or_default()
    }
}

pub fn read_config(path: &str) -> BSurveyResult<SurveyConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

pub fn read_summary(path: String) -> BSurveyResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu {
        path: path.clone(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// Reads an optional column index and turns it into a 0-based position.
pub fn read_optional_column(x: &Option<JSValue>) -> SurveyResult<Option<usize>> {
    if x.is_some() {
        read_js_int(x).map(|idx| Some(idx - 1))
    } else {
        Ok(None)
    }
}

// 1-based indexes, written as numbers or as Excel-style columns.
fn read_js_int(x: &Option<JSValue>) -> SurveyResult<usize> {
    let res = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            excel_column(s)
        }
        Some(JSValue::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    match res {
        Some(idx) if idx >= 1 => Ok(idx),
        _ => ParsingJsonNumberSnafu {
            value: format!("{:?}", x),
        }
        .fail(),
    }
}

fn excel_column(s: &str) -> Option<usize> {
    s.to_ascii_lowercase().chars().try_fold(0usize, |acc, c| {
        acc.checked_mul(26)?
            .checked_add((c as usize) - ('a' as usize) + 1)
    })
}
