//! Column type inference.
//!
//! Inference is a single-sample heuristic: the first non-missing value of a
//! column decides its type. Mixed columns are not detected here; a value that
//! does not fit its column is rejected by the store at insert time.

use crate::input::CellValue;
use crate::schema::ColumnType;

/// Infer a column type from its values.
///
/// Returns [`ColumnType::Numeric`] when the first non-missing value is a number,
/// [`ColumnType::Text`] otherwise (including all-missing columns).
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a CellValue>,
{
    match values.into_iter().find(|v| !v.is_null()) {
        Some(CellValue::Number(_)) => ColumnType::Numeric,
        _ => ColumnType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_null_sample_decides() {
        let column = vec![
            CellValue::Null,
            CellValue::Null,
            CellValue::Number(3.5),
            CellValue::Text("x".to_string()),
        ];
        assert_eq!(infer_column_type(&column), ColumnType::Numeric);
    }

    #[test]
    fn test_text_sample() {
        let column = vec![CellValue::Text("a".to_string()), CellValue::Number(1.0)];
        assert_eq!(infer_column_type(&column), ColumnType::Text);
    }

    #[test]
    fn test_all_missing_defaults_to_text() {
        let column = vec![CellValue::Null, CellValue::Null];
        assert_eq!(infer_column_type(&column), ColumnType::Text);
        assert_eq!(infer_column_type(&Vec::<CellValue>::new()), ColumnType::Text);
    }
}
