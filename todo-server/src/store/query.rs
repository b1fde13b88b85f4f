use chrono::{DateTime, Utc};
use scylla::value::{CqlTimestamp, CqlValue};

/// A CQL statement together with its bound parameter values.
///
/// The query text and the value list are built as two strictly parallel
/// sequences, so the n-th placeholder always corresponds to the n-th
/// value.
#[derive(Debug, Clone)]
pub struct Statement {
    cql: String,
    values: Vec<CqlValue>,
}

impl Statement {
    /// Returns the query text sent to the cluster.
    pub fn cql(&self) -> &str {
        &self.cql
    }

    /// Returns the bound parameter values, in placeholder order.
    pub fn values(&self) -> &[CqlValue] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<CqlValue>) {
        (self.cql, self.values)
    }

    /// Renders the statement with every placeholder substituted by the
    /// display form of its parameter, in parameter order.
    ///
    /// For logging only. The interpolated text is never executed; the
    /// cluster always receives the placeholder form with bound values.
    pub fn interpolated(&self) -> String {
        let mut rendered = String::with_capacity(self.cql.len());
        let mut values = self.values.iter();
        for (i, piece) in self.cql.split('?').enumerate() {
            if i > 0 {
                match values.next() {
                    Some(value) => rendered.push_str(&display_value(value)),
                    None => rendered.push('?'),
                }
            }
            rendered.push_str(piece);
        }
        rendered
    }
}

fn display_value(value: &CqlValue) -> String {
    match value {
        CqlValue::Text(text) => format!("'{}'", text),
        CqlValue::Uuid(id) => id.to_string(),
        CqlValue::Int(count) => count.to_string(),
        CqlValue::Timestamp(millis) => millis.0.to_string(),
        other => format!("{:?}", other),
    }
}

/// Assembles query text and bound values for statements whose clauses
/// depend on which optional inputs are present.
///
/// Clause keywords are chosen by tracking what has already been emitted:
/// the first predicate starts the WHERE clause and later ones are ANDed,
/// whichever predicate happens to come first.
#[derive(Debug)]
pub struct QueryBuilder {
    cql: String,
    values: Vec<CqlValue>,
    has_assignment: bool,
    has_predicate: bool,
}

impl QueryBuilder {
    pub fn new(base: &str) -> Self {
        Self {
            cql: base.to_string(),
            values: Vec::new(),
            has_assignment: false,
            has_predicate: false,
        }
    }

    /// Binds a value for a placeholder already present in the base text.
    pub fn bind(&mut self, value: CqlValue) {
        self.values.push(value);
    }

    /// Appends a `column = ?` assignment to the SET list.
    pub fn assign(&mut self, column: &str, value: CqlValue) {
        if self.has_assignment {
            self.cql.push_str(", ");
        } else {
            self.cql.push_str(" SET ");
            self.has_assignment = true;
        }
        self.cql.push_str(column);
        self.cql.push_str(" = ?");
        self.values.push(value);
    }

    /// Appends a `column = ?` equality predicate to the WHERE clause.
    pub fn filter(&mut self, column: &str, value: CqlValue) {
        if self.has_predicate {
            self.cql.push_str(" AND ");
        } else {
            self.cql.push_str(" WHERE ");
            self.has_predicate = true;
        }
        self.cql.push_str(column);
        self.cql.push_str(" = ?");
        self.values.push(value);
    }

    /// Appends the row-count cap. The query language offers no offset,
    /// so this is the only pagination control.
    pub fn limit(&mut self, count: i32) {
        self.cql.push_str(" LIMIT ?");
        self.values.push(CqlValue::Int(count));
    }

    /// Marks the statement as a filtered full scan over non-indexed
    /// columns.
    pub fn allow_filtering(&mut self) {
        self.cql.push_str(" ALLOW FILTERING");
    }

    pub fn build(self) -> Statement {
        Statement {
            cql: self.cql,
            values: self.values,
        }
    }
}

/// Converts a timestamp to its millisecond CQL representation.
pub fn timestamp_value(at: DateTime<Utc>) -> CqlValue {
    CqlValue::Timestamp(CqlTimestamp(at.timestamp_millis()))
}
