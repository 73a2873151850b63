use crate::adapter::DatabaseAdapter;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    /// Quoted with the adapter's identifier symbol
    Ident(String),
    /// Emitted verbatim
    Expr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Join {
    kind: JoinKind,
    table: String,
    on: String,
}

/// Builder for `SELECT` statements.
///
/// Identifiers are quoted and the limit clause rendered by whichever adapter
/// assembles the statement, so the output always begins with `SELECT` and
/// routes as a read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    distinct: bool,
    columns: Vec<Column>,
    from: Option<String>,
    joins: Vec<Join>,
    conditions: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<(String, Direction)>,
    limit: Option<(u64, u64)>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(Column::Ident(name.into()));
        self
    }

    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .extend(names.into_iter().map(|n| Column::Ident(n.into())));
        self
    }

    /// Raw expression such as `COUNT(*) AS n`
    pub fn column_expr(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(Column::Expr(expr.into()));
        self
    }

    pub fn join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    /// Add a condition; all conditions are combined with `AND`
    pub fn and_where(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having.push(condition.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, count: u64, offset: u64) -> Self {
        self.limit = Some((count, offset));
        self
    }

    /// Limit to one page of `per_page` rows, pages start at 1
    pub fn limit_page(self, page: u64, per_page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page, offset)
    }

    /// Render the statement using `adapter`'s quoting and limit dialect
    pub fn assemble<A: DatabaseAdapter + ?Sized>(&self, adapter: &A) -> Result<String> {
        let mut sql = String::from("SELECT");
        if self.distinct {
            sql.push_str(" DISTINCT");
        }

        sql.push(' ');
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let rendered: Vec<String> = self
                .columns
                .iter()
                .map(|c| match c {
                    Column::Ident(name) if name == "*" => name.clone(),
                    Column::Ident(name) => adapter.quote_identifier(name),
                    Column::Expr(expr) => expr.clone(),
                })
                .collect();
            sql.push_str(&rendered.join(", "));
        }

        if let Some(table) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&adapter.quote_identifier(table));
        }

        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            };
            sql.push_str(keyword);
            sql.push_str(&adapter.quote_identifier(&join.table));
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_expr(&self.conditions));
        }

        if !self.group_by.is_empty() {
            let cols: Vec<String> = self
                .group_by
                .iter()
                .map(|c| adapter.quote_identifier(c))
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&where_expr(&self.having));
        }

        if !self.order_by.is_empty() {
            let cols: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, dir)| {
                    let dir = match dir {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", adapter.quote_identifier(c), dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&cols.join(", "));
        }

        match self.limit {
            Some((count, offset)) => adapter.limit(&sql, count, offset),
            None => Ok(sql),
        }
    }
}

/// `(a) AND (b) AND (c)`
pub fn where_expr<S: AsRef<str>>(conditions: &[S]) -> String {
    conditions
        .iter()
        .map(|c| format!("({})", c.as_ref()))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterConfig, SqliteAdapter};

    fn adapter() -> SqliteAdapter {
        SqliteAdapter::new(AdapterConfig::in_memory("primary"))
    }

    #[test]
    fn test_where_expr() {
        assert_eq!(where_expr(&["a = 1"]), "(a = 1)");
        assert_eq!(where_expr(&["a = 1", "b = 2"]), "(a = 1) AND (b = 2)");
        assert_eq!(where_expr::<&str>(&[]), "");
    }

    #[test]
    fn test_bare_select() {
        let sql = Select::new().column_expr("1").assemble(&adapter()).unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn test_full_select() {
        let sql = Select::new()
            .distinct()
            .columns(["id", "name"])
            .column_expr("COUNT(*) AS n")
            .from("users")
            .left_join("orders", "orders.user_id = users.id")
            .and_where("active = 1")
            .and_where("age > ?")
            .group_by("id")
            .having("n > 1")
            .order_by("name", Direction::Desc)
            .limit(10, 20)
            .assemble(&adapter())
            .unwrap();

        assert_eq!(
            sql,
            "SELECT DISTINCT \"id\", \"name\", COUNT(*) AS n FROM \"users\" \
             LEFT JOIN \"orders\" ON orders.user_id = users.id \
             WHERE (active = 1) AND (age > ?) GROUP BY \"id\" HAVING (n > 1) \
             ORDER BY \"name\" DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_star_and_schema_qualified_table() {
        let sql = Select::new()
            .column("*")
            .from("main.users")
            .assemble(&adapter())
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"main\".\"users\"");
    }

    #[test]
    fn test_limit_page() {
        let sql = Select::new()
            .from("t")
            .limit_page(3, 25)
            .assemble(&adapter())
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" LIMIT 25 OFFSET 50");
    }

    #[test]
    fn test_zero_limit_is_rejected_by_adapter() {
        let result = Select::new().from("t").limit(0, 0).assemble(&adapter());
        assert!(result.is_err());
    }
}
