use calamine::{open_workbook, DataType, Reader, Xlsx};
use serde_json::{json, Value as JSValue};
use std::collections::HashMap;

use upward_eval::classifier::normalize;

use crate::survey::{
    io_common::{get_col_index_mapping, make_default_id, MetadataColumns},
    *,
};

/// Reads the Excel export of a Microsoft Forms 'Likert' question.
///
/// Each statement is a column, and each cell contains the label of the option
/// that was selected. The labels are turned into scores with the `choices` of
/// the source (the first choice is worth 1).
pub fn read_msforms_likert(
    path: String,
    cfs: &FileSource,
    competencies: &[Competency],
) -> BSurveyResult<Vec<RawResponse>> {
    let default_id = make_default_id(&path);
    let first_col = cfs.first_answer_column_index()?;
    let first_row = cfs.first_answer_row_index()?;
    let meta = MetadataColumns::from_source(cfs)?;

    let wrange = get_range(&path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_msforms_likert: header: {:?}", header);
    let header_names: Vec<Option<String>> = header.iter().map(cell_text).collect();

    let col_indexes = get_col_index_mapping(competencies, &header_names, first_col, &meta.indexes());
    debug!("read_msforms_likert: col_indexes: {:?}", col_indexes);
    if col_indexes.is_empty() {
        return Err(Box::new(SurveyError::MissingHeaderColumn { path }));
    }

    let scores = get_likert_scores(cfs);
    debug!("read_msforms_likert: scores: {:?}", scores);

    let mut res: Vec<RawResponse> = Vec::new();
    for (idx, row) in wrange.rows().enumerate().skip(first_row) {
        let lineno = idx + 1;
        if row.iter().all(|c| cell_text(c).is_none()) {
            debug!("read_msforms_likert: lineno: {:?}: empty row", lineno);
            continue;
        }
        let cell = |i: usize| row.get(i).and_then(cell_text);

        let mut raw = RawResponse {
            evaluator_id: default_id(lineno),
            ..RawResponse::default()
        };
        meta.fill(&mut raw, &cell);

        for (col_idx, cid) in col_indexes.iter() {
            let v = row.get(*col_idx).cloned().unwrap_or(DataType::Empty);
            let value: JSValue = match v {
                DataType::String(s) => likert_value(&scores, &s),
                DataType::Float(f) => json!(f),
                DataType::Int(i) => json!(i),
                DataType::Empty => {
                    // No choice made, skip.
                    continue;
                }
                _ => {
                    return Err(Box::new(SurveyError::ExcelWrongCellType {
                        lineno,
                        content: format!("{:?} IN {:?}", v, row),
                    }));
                }
            };
            raw.answers.insert(cid.to_string(), value);
        }
        debug!("read_msforms_likert: lineno: {:?} response: {:?}", lineno, raw);
        res.push(raw);
    }
    Ok(res)
}

fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        DataType::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

// The labels of the options, lowest score first.
fn get_likert_scores(cfs: &FileSource) -> HashMap<String, usize> {
    cfs.choices
        .clone()
        .unwrap_or_default()
        .iter()
        .enumerate()
        // The scores start at 1
        .map(|(idx, s)| (normalize(s), idx + 1))
        .collect()
}

// Unknown labels are kept as they are: they are reported when the answers
// are validated.
fn likert_value(scores: &HashMap<String, usize>, label: &str) -> JSValue {
    match scores.get(&normalize(label)) {
        Some(score) => json!(score),
        None => JSValue::String(label.to_string()),
    }
}

fn get_range(path: &String, cfs: &FileSource) -> BSurveyResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(SurveyError::EmptyExcel {})),
            [(worksheet_name, wrange)] => {
                debug!(
                    "get_range: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => Err(Box::new(SurveyError::MissingWorksheetName { path: path.clone() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_to_scores() {
        let mut cfs = FileSource::new("msforms_likert", "form.xlsx");
        cfs.choices = Some(
            ["Nunca", "Casi nunca", "A veces", "Casi siempre", "Siempre"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let scores = get_likert_scores(&cfs);
        assert_eq!(likert_value(&scores, "Siempre"), json!(5));
        assert_eq!(likert_value(&scores, " casi NUNCA "), json!(2));
        assert_eq!(likert_value(&scores, "Jamás"), json!("Jamás"));
    }

    #[test]
    fn cells() {
        assert_eq!(cell_text(&DataType::String(" Ana ".to_string())), Some("Ana".to_string()));
        assert_eq!(cell_text(&DataType::String("  ".to_string())), None);
        assert_eq!(cell_text(&DataType::Float(3.0)), Some("3".to_string()));
        assert_eq!(cell_text(&DataType::Int(12)), Some("12".to_string()));
        assert_eq!(cell_text(&DataType::Empty), None);
    }

    #[test]
    fn missing_workbook() {
        let res = read_msforms_likert(
            "no_such_file.xlsx".to_string(),
            &FileSource::new("msforms_likert", "no_such_file.xlsx"),
            &[],
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::OpeningExcel { .. })
        ));
    }
}
