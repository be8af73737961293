// Readers for the JSON exports: responses, competencies and catalogs.

use serde_json::Value as JSValue;
use upward_eval::catalog::CatalogDefinition;

use crate::survey::*;

pub fn read_json_responses(path: String) -> BSurveyResult<Vec<RawResponse>> {
    let items = read_json_items(&path, "responses")?;
    let mut res: Vec<RawResponse> = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawResponse = serde_json::from_value(item).context(ParsingJsonDocumentSnafu {
            path: path.clone(),
            index,
        })?;
        res.push(raw);
    }
    debug!("read_json_responses: {} responses in {:?}", res.len(), path);
    Ok(res)
}

/// Reads the competencies that are active and apply to the given level.
pub fn read_competencies(path: String, level: Option<&str>) -> BSurveyResult<Vec<Competency>> {
    let items = read_json_items(&path, "competencies")?;
    let mut res: Vec<Competency> = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let c: Competency = serde_json::from_value(item).context(ParsingJsonDocumentSnafu {
            path: path.clone(),
            index,
        })?;
        if !c.active {
            debug!("read_competencies: {} is not active", c.id);
            continue;
        }
        if let Some(l) = level {
            if !c.belongs_to(l) {
                debug!("read_competencies: {} does not apply to level {:?}", c.id, l);
                continue;
            }
        }
        res.push(c);
    }
    info!("read_competencies: {} competencies in {:?}", res.len(), path);
    Ok(res)
}

pub fn read_catalog(path: String) -> BSurveyResult<Catalog> {
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: path.clone() })?;
    let def: CatalogDefinition =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path: path.clone() })?;
    let catalog = Catalog::from_definition(&def).context(CatalogSnafu { path })?;
    Ok(catalog)
}

// Either a plain array, or an object holding the array under `key`.
fn read_json_items(path: &str, key: &str) -> BSurveyResult<Vec<JSValue>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    match js {
        JSValue::Array(items) => Ok(items),
        JSValue::Object(mut obj) => match obj.remove(key) {
            Some(JSValue::Array(items)) => Ok(items),
            _ => Err(Box::new(SurveyError::UnexpectedJson {
                path: path.to_string(),
                key: key.to_string(),
            })),
        },
        _ => Err(Box::new(SurveyError::UnexpectedJson {
            path: path.to_string(),
            key: key.to_string(),
        })),
    }
}
