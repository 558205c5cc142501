use serde_json::Value;

use super::error::FilterError;

/// Builds a parameterized WHERE fragment from the `filters` JSON grammar.
///
/// Grammar per field: `{"column": value}` for implicit equality, or
/// `{"column": {"$op": data}}` with the operator subset below. Columns are
/// checked against the endpoint's whitelist; everything else is rejected
/// before any SQL is assembled.
pub struct WhereBuilder {
    params: Vec<Value>,
    param_index: usize,
}

impl WhereBuilder {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            params: vec![],
            param_index: starting_param_index,
        }
    }

    /// Returns the conjunction of all field conditions plus the bound params.
    /// An empty filters object yields no conditions.
    pub fn generate(
        filters: &Value,
        whitelist: &[&str],
        starting_param_index: usize,
    ) -> Result<(Vec<String>, Vec<Value>), FilterError> {
        let obj = filters.as_object().ok_or_else(|| {
            FilterError::InvalidFilters("filters must be a JSON object".to_string())
        })?;

        let mut builder = Self::new(starting_param_index);
        let mut conditions = vec![];

        for (column, value) in obj {
            if !whitelist.contains(&column.as_str()) {
                return Err(FilterError::UnknownColumn(column.clone()));
            }
            match value {
                Value::Object(ops) => {
                    for (op, data) in ops {
                        conditions.push(builder.condition(column, op, data)?);
                    }
                }
                other => conditions.push(builder.equality(column, other)),
            }
        }

        Ok((conditions, builder.params))
    }

    fn equality(&mut self, column: &str, data: &Value) -> String {
        let quoted = quote(column);
        if data.is_null() {
            format!("{} IS NULL", quoted)
        } else {
            format!("{} = {}", quoted, self.param(data.clone()))
        }
    }

    fn condition(&mut self, column: &str, op: &str, data: &Value) -> Result<String, FilterError> {
        let quoted = quote(column);
        let sql = match op {
            "$eq" => return Ok(self.equality(column, data)),
            "$ne" | "$neq" => {
                if data.is_null() {
                    format!("{} IS NOT NULL", quoted)
                } else {
                    format!("{} <> {}", quoted, self.param(data.clone()))
                }
            }
            "$gt" => format!("{} > {}", quoted, self.param(data.clone())),
            "$gte" => format!("{} >= {}", quoted, self.param(data.clone())),
            "$lt" => format!("{} < {}", quoted, self.param(data.clone())),
            "$lte" => format!("{} <= {}", quoted, self.param(data.clone())),
            "$like" => format!("{} LIKE {}", quoted, self.param(data.clone())),
            "$ilike" => format!("{} ILIKE {}", quoted, self.param(data.clone())),
            "$in" => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$in requires an array".to_string())
                })?;
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", quoted, placeholders.join(", "))
            }
            "$between" => {
                let values = data.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
                    FilterError::InvalidOperatorData(
                        "$between requires exactly 2 values".to_string(),
                    )
                })?;
                format!(
                    "{} BETWEEN {} AND {}",
                    quoted,
                    self.param(values[0].clone()),
                    self.param(values[1].clone())
                )
            }
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        };
        Ok(sql)
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

fn quote(column: &str) -> String {
    format!("\"{}\"", column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[&str] = &["status", "year", "plate"];

    #[test]
    fn implicit_equality() {
        let (conds, params) =
            WhereBuilder::generate(&json!({"status": "available"}), COLUMNS, 0).unwrap();
        assert_eq!(conds, vec![r#""status" = $1"#]);
        assert_eq!(params, vec![json!("available")]);
    }

    #[test]
    fn operator_conditions_share_param_numbering() {
        let (conds, params) = WhereBuilder::generate(
            &json!({"year": {"$gte": 2020, "$lte": 2024}}),
            COLUMNS,
            2,
        )
        .unwrap();
        assert_eq!(conds.len(), 2);
        assert!(conds.contains(&r#""year" >= $3"#.to_string()));
        assert!(conds.contains(&r#""year" <= $4"#.to_string()));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn rejects_unknown_column() {
        let err = WhereBuilder::generate(&json!({"password_hash": "x"}), COLUMNS, 0).unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn(_)));
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (conds, params) =
            WhereBuilder::generate(&json!({"plate": {"$in": []}}), COLUMNS, 0).unwrap();
        assert_eq!(conds, vec!["1=0"]);
        assert!(params.is_empty());
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let (conds, params) =
            WhereBuilder::generate(&json!({"status": null}), COLUMNS, 0).unwrap();
        assert_eq!(conds, vec![r#""status" IS NULL"#]);
        assert!(params.is_empty());
    }
}
