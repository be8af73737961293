use std::collections::HashMap;
use std::path::Path;

use upward_eval::classifier::normalize;

use crate::survey::{config_reader::read_optional_column, *};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Generates an evaluator id for the rows that do not carry one.
pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Given the header of a file (names of each of the columns), and the competencies,
/// finds the column of each competency.
///
/// A column matches a competency when its name is the id or the name of the
/// competency, compared without case or accents. Competencies without a
/// column are left unanswered.
pub fn get_col_index_mapping(
    competencies: &[Competency],
    header: &[Option<String>],
    first_col: usize,
    skipped: &[usize],
) -> Vec<(usize, CompetencyId)> {
    let mut col_names: HashMap<String, usize> = HashMap::new();
    for (idx, name) in header.iter().enumerate().skip(first_col) {
        if let Some(s) = name {
            if !skipped.contains(&idx) {
                col_names.entry(normalize(s)).or_insert(idx);
            }
        }
    }
    debug!("get_col_index_mapping: col_names: {:?}", col_names);

    let mut col_indexes: Vec<(usize, CompetencyId)> = Vec::new();
    for c in competencies.iter() {
        let idx = col_names
            .get(&normalize(c.id.as_str()))
            .or_else(|| col_names.get(&normalize(&c.name)));
        match idx {
            Some(idx) => col_indexes.push((*idx, c.id.clone())),
            None => debug!("get_col_index_mapping: no column for competency {}", c.id),
        }
    }
    col_indexes
}

/// The positions of the metadata of a response.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MetadataColumns {
    pub evaluator: Option<usize>,
    pub evaluated: Option<usize>,
    pub evaluated_name: Option<usize>,
    pub department: Option<usize>,
    pub shift: Option<usize>,
    pub comment: Option<usize>,
}

impl MetadataColumns {
    pub fn from_source(cfs: &FileSource) -> SurveyResult<MetadataColumns> {
        Ok(MetadataColumns {
            evaluator: read_optional_column(&cfs.evaluator_column_index)?,
            evaluated: read_optional_column(&cfs.evaluated_column_index)?,
            evaluated_name: read_optional_column(&cfs.evaluated_name_column_index)?,
            department: read_optional_column(&cfs.department_column_index)?,
            shift: read_optional_column(&cfs.shift_column_index)?,
            comment: read_optional_column(&cfs.comment_column_index)?,
        })
    }

    pub fn indexes(&self) -> Vec<usize> {
        [
            self.evaluator,
            self.evaluated,
            self.evaluated_name,
            self.department,
            self.shift,
            self.comment,
        ]
        .iter()
        .flatten()
        .cloned()
        .collect()
    }

    /// Copies the metadata of a row into a response.
    ///
    /// `cell` returns the text of a column, or None when the cell is empty.
    pub fn fill(&self, raw: &mut RawResponse, cell: impl Fn(usize) -> Option<String>) {
        let text = |idx: Option<usize>| idx.and_then(&cell);
        if let Some(s) = text(self.evaluator) {
            raw.evaluator_id = s;
        }
        if let Some(s) = text(self.evaluated) {
            raw.evaluated_id = s;
        }
        raw.evaluated_name = text(self.evaluated_name);
        raw.department = text(self.department);
        raw.shift = text(self.shift);
        raw.comment = text(self.comment);
    }
}

/// The trimmed content of a text cell, None when blank.
pub fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
