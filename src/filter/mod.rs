pub mod error;
pub mod params;
pub mod where_clause;

pub use error::FilterError;
pub use params::{ListParams, Pagination, SortDirection};
pub use where_clause::WhereBuilder;

use serde_json::Value;

/// Assembles the paged SELECT and the matching COUNT for a list endpoint.
///
/// Scope pinning happens through `and_eq`/`and_raw` before the caller's
/// `filters`/`sortBy` are applied, so client-supplied parameters can narrow a
/// listing but never widen it past the resolved scope.
pub struct ListQuery<'a> {
    table: String,
    columns: &'a [&'a str],
    scope_conditions: Vec<(String, Option<Value>)>,
}

#[derive(Debug)]
pub struct BuiltQuery {
    pub select_sql: String,
    pub count_sql: String,
    pub params: Vec<Value>,
}

impl<'a> ListQuery<'a> {
    pub fn new(table: &str, columns: &'a [&'a str]) -> Result<Self, FilterError> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            columns,
            scope_conditions: vec![],
        })
    }

    /// Pin a column to a value (scope enforcement). The column is a trusted
    /// literal supplied by the handler, never client input.
    pub fn and_eq(mut self, column: &str, value: Value) -> Self {
        self.scope_conditions
            .push((format!("\"{}\" = $?", column), Some(value)));
        self
    }

    /// Add a handler-supplied condition with a single `$?` placeholder for
    /// the bound value (used for subquery scoping across joins).
    pub fn and_raw(mut self, condition: &str, value: Value) -> Self {
        self.scope_conditions
            .push((condition.to_string(), Some(value)));
        self
    }

    pub fn build(self, params: &ListParams) -> Result<BuiltQuery, FilterError> {
        let mut bound: Vec<Value> = vec![];
        let mut conditions: Vec<String> = vec![];

        for (template, value) in self.scope_conditions {
            if let Some(value) = value {
                bound.push(value);
                conditions.push(template.replace("$?", &format!("${}", bound.len())));
            } else {
                conditions.push(template);
            }
        }

        if let Some(filters) = params.filters_value()? {
            let (filter_conditions, filter_params) =
                WhereBuilder::generate(&filters, self.columns, bound.len())?;
            conditions.extend(filter_conditions);
            bound.extend(filter_params);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sort_column = match params.sort_by.as_deref() {
            None => "id".to_string(),
            Some(column) => {
                if !self.columns.contains(&column) && column != "id" {
                    return Err(FilterError::UnknownColumn(column.to_string()));
                }
                column.to_string()
            }
        };
        let direction = params.sort_direction()?;

        let select_sql = format!(
            "SELECT * FROM \"{}\"{} ORDER BY \"{}\" {} LIMIT {} OFFSET {}",
            self.table,
            where_clause,
            sort_column,
            direction.to_sql(),
            params.page_size(),
            params.offset(),
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM \"{}\"{}",
            self.table, where_clause
        );

        Ok(BuiltQuery {
            select_sql,
            count_sql,
            params: bound,
        })
    }
}

fn validate_identifier(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CAR_COLUMNS: &[&str] = &["company_id", "status", "year", "plate"];

    #[test]
    fn builds_paged_select_and_count() {
        let params = ListParams {
            page: Some(2),
            page_size: Some(10),
            sort_by: Some("year".to_string()),
            sort_order: Some("desc".to_string()),
            filters: Some(r#"{"status":"available"}"#.to_string()),
        };
        let built = ListQuery::new("cars", CAR_COLUMNS)
            .unwrap()
            .and_eq("company_id", json!(7))
            .build(&params)
            .unwrap();

        assert_eq!(
            built.select_sql,
            r#"SELECT * FROM "cars" WHERE "company_id" = $1 AND "status" = $2 ORDER BY "year" DESC LIMIT 10 OFFSET 10"#
        );
        assert_eq!(
            built.count_sql,
            r#"SELECT COUNT(*) FROM "cars" WHERE "company_id" = $1 AND "status" = $2"#
        );
        assert_eq!(built.params, vec![json!(7), json!("available")]);
    }

    #[test]
    fn raw_scope_condition_numbers_params_first() {
        let params = ListParams::default();
        let built = ListQuery::new("bookings", &["status", "car_id"])
            .unwrap()
            .and_raw(
                "\"car_id\" IN (SELECT id FROM cars WHERE company_id = $?)",
                json!(7),
            )
            .build(&params)
            .unwrap();
        assert!(built
            .select_sql
            .contains("\"car_id\" IN (SELECT id FROM cars WHERE company_id = $1)"));
        assert_eq!(built.params, vec![json!(7)]);
    }

    #[test]
    fn rejects_unlisted_sort_column() {
        let params = ListParams {
            sort_by: Some("password_hash".to_string()),
            ..Default::default()
        };
        let err = ListQuery::new("users", &["email", "role"])
            .unwrap()
            .build(&params)
            .unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn(_)));
    }

    #[test]
    fn rejects_bad_table_name() {
        assert!(ListQuery::new("cars; DROP TABLE cars", CAR_COLUMNS).is_err());
    }
}
