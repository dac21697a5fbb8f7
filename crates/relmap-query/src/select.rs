//! SELECT builder with table aliases, joins and named parameters.

use relmap_core::{PLACEHOLDER_PREFIX, Statement, Value, quote_ident};

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    const fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// `"left_alias"."left_column" = "right_alias"."right_column"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left_alias: String,
    pub left_column: String,
    pub right_alias: String,
    pub right_column: String,
}

impl JoinCondition {
    pub fn new(
        left_alias: impl Into<String>,
        left_column: impl Into<String>,
        right_alias: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        Self {
            left_alias: left_alias.into(),
            left_column: left_column.into(),
            right_alias: right_alias.into(),
            right_column: right_column.into(),
        }
    }

    fn to_sql(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            quote_ident(&self.left_alias),
            quote_ident(&self.left_column),
            quote_ident(&self.right_alias),
            quote_ident(&self.right_column)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    /// Quoted, qualified table name.
    pub table: String,
    pub alias: String,
    pub on: Vec<JoinCondition>,
}

/// One selected column and the alias it is returned under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub table_alias: String,
    pub column_name: String,
    pub alias: String,
}

/// A SELECT over one root table plus joins.
///
/// Conditions added with [`where_eq`](Self::where_eq) get generated
/// placeholders (`:key0`, `:key1`, ...); raw conditions can reference
/// parameters registered with [`add_parameter`](Self::add_parameter).
#[derive(Debug, Clone)]
pub struct SelectQuery {
    from: String,
    root_alias: String,
    columns: Vec<SelectColumn>,
    joins: Vec<Join>,
    conditions: Vec<String>,
    params: Vec<(String, Value)>,
    order_by: Vec<String>,
    limit: Option<u64>,
    next_key: usize,
}

impl SelectQuery {
    /// Select from `table` (quoted, qualified) under `alias`.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            root_alias: alias.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            next_key: 0,
        }
    }

    #[must_use]
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    #[must_use]
    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn column(
        &mut self,
        table_alias: impl Into<String>,
        column_name: impl Into<String>,
        alias: impl Into<String>,
    ) -> &mut Self {
        self.columns.push(SelectColumn {
            table_alias: table_alias.into(),
            column_name: column_name.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn join(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: Vec<JoinCondition>,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            alias: alias.into(),
            on,
        });
        self
    }

    /// `"alias"."column" = :keyN`, or `IS NULL` for a NULL value.
    pub fn where_eq(&mut self, alias: &str, column: &str, value: Value) -> &mut Self {
        let target = format!("{}.{}", quote_ident(alias), quote_ident(column));
        if value.is_null() {
            self.conditions.push(format!("{target} IS NULL"));
        } else {
            let name = format!("{PLACEHOLDER_PREFIX}key{}", self.next_key);
            self.next_key += 1;
            self.conditions.push(format!("{target} = {name}"));
            self.params.push((name, value));
        }
        self
    }

    /// Add a raw SQL condition, ANDed with the others.
    pub fn where_raw(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    /// Register a parameter for raw conditions. `identifier` excludes the prefix.
    pub fn add_parameter(&mut self, identifier: &str, value: Value) -> &mut Self {
        self.params
            .push((format!("{PLACEHOLDER_PREFIX}{identifier}"), value));
        self
    }

    /// Order by a column of one of the joined tables.
    pub fn order_by(&mut self, alias: &str, column: &str, descending: bool) -> &mut Self {
        let direction = if descending { "DESC" } else { "ASC" };
        self.order_by.push(format!(
            "{}.{} {direction}",
            quote_ident(alias),
            quote_ident(column)
        ));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Render the SQL text and parameters.
    #[must_use]
    pub fn to_statement(&self) -> Statement {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| {
                    format!(
                        "{}.{} AS {}",
                        quote_ident(&c.table_alias),
                        quote_ident(&c.column_name),
                        quote_ident(&c.alias)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {columns} FROM {} AS {}",
            self.from,
            quote_ident(&self.root_alias)
        );
        for join in &self.joins {
            let on = join
                .on
                .iter()
                .map(JoinCondition::to_sql)
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(&format!(
                " {} {} AS {} ON {on}",
                join.kind.keyword(),
                join.table,
                quote_ident(&join.alias)
            ));
        }
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Statement::with_params(sql, self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_all_columns() {
        let query = SelectQuery::new("\"blogs\"", "t0");
        assert_eq!(query.to_statement().sql(), "SELECT * FROM \"blogs\" AS \"t0\"");
    }

    #[test]
    fn test_select_with_join_and_conditions() {
        let mut query = SelectQuery::new("\"blogs\"", "t0");
        query
            .column("t0", "blog_id", "t0_blog_id")
            .column("t1", "title", "t1_title")
            .join(
                JoinKind::Left,
                "\"posts\"",
                "t1",
                vec![JoinCondition::new("t1", "blog_id", "t0", "blog_id")],
            )
            .where_eq("t0", "blog_id", Value::BigInt(4))
            .where_eq("t0", "url", Value::Null)
            .order_by("t1", "title", true)
            .limit(10);

        let stmt = query.to_statement();
        assert_eq!(
            stmt.sql(),
            "SELECT \"t0\".\"blog_id\" AS \"t0_blog_id\", \"t1\".\"title\" AS \"t1_title\" \
             FROM \"blogs\" AS \"t0\" \
             LEFT JOIN \"posts\" AS \"t1\" ON \"t1\".\"blog_id\" = \"t0\".\"blog_id\" \
             WHERE \"t0\".\"blog_id\" = :key0 AND \"t0\".\"url\" IS NULL \
             ORDER BY \"t1\".\"title\" DESC LIMIT 10"
        );
        assert_eq!(stmt.params(), &[(":key0".to_string(), Value::BigInt(4))]);
    }

    #[test]
    fn test_raw_condition_with_parameter() {
        let mut query = SelectQuery::new("\"posts\"", "t0");
        query
            .where_raw("\"t0\".\"title\" LIKE :pattern")
            .add_parameter("pattern", Value::Text("Hello%".into()));
        let stmt = query.to_statement();
        assert!(stmt.sql().ends_with("WHERE \"t0\".\"title\" LIKE :pattern"));
        assert_eq!(stmt.param(":pattern"), Some(&Value::Text("Hello%".into())));
    }
}
