// Primitives for reading CSV files.

use std::fs::File;

use serde_json::Value as JSValue;

use crate::survey::{
    io_common::{get_col_index_mapping, make_default_id, non_blank, MetadataColumns},
    *,
};

/// Reads one response per row.
///
/// The header is the first row. The cells are passed as text: the scores
/// are validated later, with the other kinds of inputs.
pub fn read_csv_responses(
    path: String,
    cfs: &FileSource,
    competencies: &[Competency],
) -> BSurveyResult<Vec<RawResponse>> {
    let default_id = make_default_id(&path);
    let first_col = cfs.first_answer_column_index()?;
    let first_row = cfs.first_answer_row_index()?;
    let meta = MetadataColumns::from_source(cfs)?;

    let mut records = get_records(&path)?;
    let header_record = records
        .next()
        .context(MissingHeaderColumnSnafu { path: path.clone() })?
        .context(CsvLineParseSnafu { lineno: 1usize })?;
    let header: Vec<Option<String>> = header_record.iter().map(non_blank).collect();
    debug!("read_csv_responses: header: {:?}", header);

    let col_indexes = get_col_index_mapping(competencies, &header, first_col, &meta.indexes());
    if col_indexes.is_empty() {
        return Err(Box::new(SurveyError::MissingHeaderColumn { path }));
    }

    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }

    let mut res: Vec<RawResponse> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_responses: lineno: {:?}: empty line", lineno);
            continue;
        }
        let cell = |i: usize| line.get(i).and_then(non_blank);

        let mut raw = RawResponse {
            evaluator_id: default_id(lineno),
            ..RawResponse::default()
        };
        meta.fill(&mut raw, &cell);
        for (col_idx, cid) in col_indexes.iter() {
            if let Some(s) = cell(*col_idx) {
                raw.answers.insert(cid.to_string(), JSValue::String(s));
            }
        }
        debug!("read_csv_responses: lineno: {:?} response: {:?}", lineno, raw);
        res.push(raw);
    }
    Ok(res)
}

fn get_records(path: &String) -> BSurveyResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}
