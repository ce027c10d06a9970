//! Column checks and typing for uploaded patient tables.
//!
//! Validation happens once, when a [`RawTable`] becomes a [`Dataset`]:
//!
//! - the required columns (`Age`, `Gender`, `Admission Type`) must exist
//! - numeric columns (`Age`, `Billing Amount`) must only hold numbers
//! - every other used column stays text
//!
//! After this step nothing downstream re-reads string cells.
//!
//! # Example
//!
//! ```rust,ignore
//! use healthdash::parser::parse_bytes_auto;
//! use healthdash::validation::build_dataset;
//!
//! let parsed = parse_bytes_auto(b"Age,Gender,Admission Type\n40,M,Emergency")?;
//! let dataset = build_dataset(parsed)?;
//! assert_eq!(dataset.records[0].age, Some(40));
//! ```

use crate::error::{IngestError, IngestResult};
use crate::models::{
    Dataset, Record, COL_ADMISSION_TYPE, COL_AGE, COL_BILLING_AMOUNT, COL_DATE_OF_ADMISSION,
    COL_GENDER, COL_MEDICAL_CONDITION, REQUIRED_COLUMNS,
};
use crate::parser::{normalize_cell, ParseResult, RawRow, RawTable};

/// Fail with [`IngestError::MissingColumns`] listing every absent required column.
pub fn check_required_columns(headers: &[String]) -> IngestResult<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::MissingColumns(missing))
    }
}

/// Parse a finite number. `None` for anything else.
pub fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a whole number, accepting integral floats such as `40.0`.
pub fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    parse_number(value)
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Turn a parsed table into a typed [`Dataset`].
///
/// Derived columns are left empty; see [`crate::transform::derive_columns`].
pub fn build_dataset(parsed: ParseResult) -> IngestResult<Dataset> {
    let ParseResult {
        table,
        encoding,
        delimiter,
    } = parsed;

    check_required_columns(&table.headers)?;
    let columns = ColumnIndex::new(&table);

    let records = table
        .rows
        .into_iter()
        .map(|row| columns.record(&table.headers, row))
        .collect::<IngestResult<Vec<_>>>()?;

    Ok(Dataset {
        has_diagnosis_column: columns.medical_condition.is_some(),
        headers: table.headers,
        records,
        encoding,
        delimiter,
        admission_month_usable: false,
    })
}

/// Positions of the columns the pipeline reads.
struct ColumnIndex {
    age: usize,
    gender: usize,
    admission_type: usize,
    medical_condition: Option<usize>,
    admission_date: Option<usize>,
    billing_amount: Option<usize>,
}

impl ColumnIndex {
    /// Required columns must have been checked already.
    fn new(table: &RawTable) -> Self {
        Self {
            age: table.column_index(COL_AGE).unwrap_or_default(),
            gender: table.column_index(COL_GENDER).unwrap_or_default(),
            admission_type: table.column_index(COL_ADMISSION_TYPE).unwrap_or_default(),
            medical_condition: table.column_index(COL_MEDICAL_CONDITION),
            admission_date: table.column_index(COL_DATE_OF_ADMISSION),
            billing_amount: table.column_index(COL_BILLING_AMOUNT),
        }
    }

    fn record(&self, headers: &[String], row: RawRow) -> IngestResult<Record> {
        let text = |idx: usize| {
            row.cells
                .get(idx)
                .and_then(|c| normalize_cell(c))
                .map(String::from)
        };
        let optional_text = |idx: Option<usize>| idx.and_then(text);

        let age = match text(self.age) {
            Some(v) => Some(
                parse_integer(&v).ok_or_else(|| non_numeric(headers, self.age, &row, v))?,
            ),
            None => None,
        };

        let billing_amount = match optional_text(self.billing_amount) {
            Some(v) => Some(parse_number(&v).ok_or_else(|| {
                non_numeric(headers, self.billing_amount.unwrap_or_default(), &row, v)
            })?),
            None => None,
        };

        Ok(Record {
            age,
            gender: text(self.gender),
            admission_type: text(self.admission_type),
            medical_condition: optional_text(self.medical_condition),
            // Kept verbatim; the sentinel is resolved during derivation
            admission_date: self
                .admission_date
                .and_then(|idx| row.cells.get(idx))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(String::from),
            billing_amount,
            admission_month: None,
            diagnosis: None,
            line: row.line,
            cells: row.cells,
        })
    }
}

fn non_numeric(headers: &[String], idx: usize, row: &RawRow, value: String) -> IngestError {
    IngestError::NonNumeric {
        column: headers.get(idx).cloned().unwrap_or_default(),
        line: row.line,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn parsed(csv: &str) -> ParseResult {
        ParseResult {
            table: parse_str(csv, ',').unwrap(),
            encoding: "utf-8".to_string(),
            delimiter: ',',
        }
    }

    #[test]
    fn test_required_columns_present() {
        let headers: Vec<String> = vec!["Age".into(), "Gender".into(), "Admission Type".into()];
        assert!(check_required_columns(&headers).is_ok());
    }

    #[test]
    fn test_required_columns_missing() {
        let headers: Vec<String> = vec!["Age".into(), "Name".into()];
        match check_required_columns(&headers) {
            Err(IngestError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Gender", "Admission Type"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("40"), Some(40));
        assert_eq!(parse_integer("40.0"), Some(40));
        assert_eq!(parse_integer("-3"), Some(-3));
        assert_eq!(parse_integer("40.5"), None);
        assert_eq!(parse_integer("forty"), None);
        assert_eq!(parse_integer("inf"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number("18856.28"), Some(18856.28));
        assert_eq!(parse_number("-502.5"), Some(-502.5));
        assert_eq!(parse_number("$100"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_build_dataset_types_columns() {
        let csv = "Name,Age,Gender,Admission Type,Medical Condition,Date of Admission,Billing Amount\n\
                   Ann,40,F,Emergency,Flu,2023-01-05,100.5\n\
                   Bob,,M,,,########,\n";
        let dataset = build_dataset(parsed(csv)).unwrap();

        assert!(dataset.has_diagnosis_column);
        assert!(!dataset.admission_month_usable);
        assert_eq!(dataset.len(), 2);

        let ann = &dataset.records[0];
        assert_eq!(ann.age, Some(40));
        assert_eq!(ann.gender.as_deref(), Some("F"));
        assert_eq!(ann.admission_type.as_deref(), Some("Emergency"));
        assert_eq!(ann.medical_condition.as_deref(), Some("Flu"));
        assert_eq!(ann.admission_date.as_deref(), Some("2023-01-05"));
        assert_eq!(ann.billing_amount, Some(100.5));
        assert_eq!(ann.cells[0], "Ann");
        assert_eq!(ann.line, 2);

        let bob = &dataset.records[1];
        assert_eq!(bob.age, None);
        assert_eq!(bob.admission_type, None);
        assert_eq!(bob.medical_condition, None);
        assert_eq!(bob.admission_date.as_deref(), Some("########"));
        assert_eq!(bob.billing_amount, None);
    }

    #[test]
    fn test_build_dataset_without_optional_columns() {
        let dataset = build_dataset(parsed("Age,Gender,Admission Type\n30,F,Urgent")).unwrap();
        assert!(!dataset.has_diagnosis_column);
        assert_eq!(dataset.records[0].medical_condition, None);
        assert_eq!(dataset.records[0].admission_date, None);
        assert_eq!(dataset.records[0].billing_amount, None);
    }

    #[test]
    fn test_missing_value_markers_are_absent() {
        let csv = "Age,Gender,Admission Type,Billing Amount\nNaN,NA,null,N/A";
        let dataset = build_dataset(parsed(csv)).unwrap();
        let record = &dataset.records[0];
        assert_eq!(record.age, None);
        assert_eq!(record.gender, None);
        assert_eq!(record.admission_type, None);
        assert_eq!(record.billing_amount, None);
    }

    #[test]
    fn test_non_numeric_age_is_rejected() {
        let csv = "Age,Gender,Admission Type\n40,M,Urgent\nforty,F,Urgent";
        match build_dataset(parsed(csv)) {
            Err(IngestError::NonNumeric { column, line, value }) => {
                assert_eq!(column, "Age");
                assert_eq!(line, 3);
                assert_eq!(value, "forty");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_billing_is_rejected() {
        let csv = "Age,Gender,Admission Type,Billing Amount\n40,M,Urgent,lots";
        let err = build_dataset(parsed(csv)).unwrap_err();
        assert!(err.to_string().contains("Billing Amount"));
    }

    #[test]
    fn test_missing_required_column_rejected() {
        let err = build_dataset(parsed("Age,Gender\n40,M")).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns(_)));
    }
}
