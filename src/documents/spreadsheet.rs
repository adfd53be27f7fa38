//! Multi-sheet `.xlsx` workbooks from JSON rows.
//!
//! `sheets` arrives either as `[{ "name": .., "data": [[..], ..] }, ..]` or as
//! `{ "<sheet name>": [[..], ..], .. }`; object keys keep their order.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use thiserror::Error;

use super::common::{epoch_millis, sanitize_filename};

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Le tableau sheets est vide")]
    EmptyArray,
    #[error("L'objet sheets est vide")]
    EmptyObject,
    #[error("Format sheets invalide")]
    InvalidFormat,
    #[error("Données de feuille invalides")]
    RowsNotArray(String),
    #[error("Génération Excel impossible: {0}")]
    Xlsx(#[from] XlsxError),
}

impl SpreadsheetError {
    /// Problems with the request itself, as opposed to the writer failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Xlsx(_))
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidFormat => Some("sheets doit être un array ou un objet".to_string()),
            Self::RowsNotArray(name) => Some(format!(
                "Les données du sheet \"{}\" doivent être un tableau",
                name
            )),
            _ => None,
        }
    }
}

/// One worksheet: its name and its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    pub name: String,
    pub rows: Vec<Value>,
}

fn rows_of(name: &str, data: Option<&Value>) -> Result<Vec<Value>, SpreadsheetError> {
    match data {
        Some(Value::Array(rows)) => Ok(rows.clone()),
        _ => Err(SpreadsheetError::RowsNotArray(name.to_string())),
    }
}

pub fn parse_sheets(sheets: &Value) -> Result<Vec<SheetSpec>, SpreadsheetError> {
    match sheets {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(SpreadsheetError::EmptyArray);
            }
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let name = item
                        .get("name")
                        .and_then(Value::as_str)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Sheet{}", index + 1));
                    let rows = rows_of(&name, item.get("data"))?;
                    Ok(SheetSpec { name, rows })
                })
                .collect()
        }
        Value::Object(map) => {
            if map.is_empty() {
                return Err(SpreadsheetError::EmptyObject);
            }
            map.iter()
                .map(|(name, data)| {
                    let rows = rows_of(name, Some(data))?;
                    Ok(SheetSpec {
                        name: name.clone(),
                        rows,
                    })
                })
                .collect()
        }
        _ => Err(SpreadsheetError::InvalidFormat),
    }
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        Value::Array(_) | Value::Object(_) => {
            sheet.write_string(row, col, value.to_string())?;
        }
    }
    Ok(())
}

/// Write every sheet and return the `.xlsx` bytes.
pub fn build_workbook(sheets: &[SheetSpec]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();

    for spec in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&spec.name)?;

        for (r, row) in spec.rows.iter().enumerate() {
            let r = r as u32;
            match row {
                Value::Array(cells) => {
                    for (c, cell) in cells.iter().enumerate() {
                        write_cell(sheet, r, c as u16, cell)?;
                    }
                }
                other => write_cell(sheet, r, 0, other)?,
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// `<sanitized name>.xlsx`, or `rapport_<epoch ms>.xlsx` without a name.
pub fn workbook_filename(requested: Option<&str>) -> String {
    match requested.filter(|n| !n.is_empty()) {
        Some(name) => format!("{}.xlsx", sanitize_filename(name)),
        None => format!("rapport_{}.xlsx", epoch_millis()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array_form_with_default_names() {
        let sheets = parse_sheets(&json!([
            {"name": "Ventes", "data": [["A", 1]]},
            {"data": []}
        ]))
        .unwrap();
        assert_eq!(sheets[0].name, "Ventes");
        assert_eq!(sheets[1].name, "Sheet2");
        assert!(sheets[1].rows.is_empty());
    }

    #[test]
    fn test_parse_object_form_keeps_order() {
        let sheets = parse_sheets(&json!({"Zeta": [[1]], "Alpha": [[2]], "Mid": []})).unwrap();
        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_sheets(&json!([])), Err(SpreadsheetError::EmptyArray)));
        assert!(matches!(parse_sheets(&json!({})), Err(SpreadsheetError::EmptyObject)));
        assert!(matches!(parse_sheets(&json!("x")), Err(SpreadsheetError::InvalidFormat)));

        let err = parse_sheets(&json!([{"name": "Bad", "data": "nope"}])).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Données de feuille invalides");
        assert_eq!(
            err.details().unwrap(),
            "Les données du sheet \"Bad\" doivent être un tableau"
        );
    }

    #[test]
    fn test_build_workbook_with_mixed_cells() {
        let sheets = parse_sheets(&json!({
            "Données": [
                ["Nom", "Qté", "OK", null, {"nested": true}],
                ["Balai", 12.5, false, null, [1, 2]],
                "ligne seule"
            ],
            "Vide": []
        }))
        .unwrap();
        let bytes = build_workbook(&sheets).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_invalid_sheet_name_is_a_writer_error() {
        let sheets = vec![SheetSpec {
            name: "bad/name".into(),
            rows: vec![],
        }];
        let err = build_workbook(&sheets).unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_workbook_filename() {
        assert_eq!(workbook_filename(Some("Bilan 2026")), "Bilan_2026.xlsx");
        assert!(workbook_filename(None).starts_with("rapport_"));
        assert!(workbook_filename(Some("")).ends_with(".xlsx"));
    }
}
