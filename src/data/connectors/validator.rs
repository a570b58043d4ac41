use crate::error::{CoevoError, Result};
use polars::prelude::*;

pub struct DataValidator;

impl DataValidator {
    /// Every label column must be numeric and contain only 0/1 values.
    pub fn validate_labels(df: &DataFrame, label_columns: &[&str]) -> Result<()> {
        for name in label_columns {
            let column = df.column(name)?;
            if !matches!(
                column.dtype(),
                DataType::Boolean
                    | DataType::Float64
                    | DataType::Float32
                    | DataType::Int64
                    | DataType::Int32
                    | DataType::UInt64
                    | DataType::UInt32
            ) {
                return Err(CoevoError::DataLoading(format!(
                    "Label column '{}' must be numeric or boolean, found {:?}",
                    name,
                    column.dtype()
                )));
            }
            let values = column.cast(&DataType::Float64)?;
            for (row, value) in values.f64()?.into_iter().enumerate() {
                match value {
                    Some(v) if v == 0.0 || v == 1.0 => {}
                    Some(v) => {
                        return Err(CoevoError::DataLoading(format!(
                            "Label column '{}' has non-binary value {} at row {}",
                            name, v, row
                        )));
                    }
                    None => {
                        return Err(CoevoError::DataLoading(format!(
                            "Label column '{}' has a missing value at row {}",
                            name, row
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(CoevoError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Columns with null values and their null counts.
    pub fn check_nulls(df: &DataFrame) -> Vec<(String, usize)> {
        df.get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect()
    }
}
