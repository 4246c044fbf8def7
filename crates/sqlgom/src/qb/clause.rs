//! Clause accumulator: WHERE/OR/IN fragments that own their arguments.

use crate::value::Value;

/// Kind of a filter clause; decides the connective placed before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Where,
    Or,
    In,
}

impl ClauseKind {
    fn connective(self) -> &'static str {
        match self {
            ClauseKind::Where | ClauseKind::In => "AND",
            ClauseKind::Or => "OR",
        }
    }
}

/// One raw fragment plus the values for its `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub fragment: String,
    pub args: Vec<Value>,
}

/// Ordered clause list. Arguments are stored with their clause, so render
/// order and argument order cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseList {
    clauses: Vec<Clause>,
}

impl ClauseList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ClauseKind, fragment: impl Into<String>, args: Vec<Value>) {
        self.clauses.push(Clause {
            kind,
            fragment: fragment.into(),
            args,
        });
    }

    pub fn push_where(&mut self, fragment: impl Into<String>, args: Vec<Value>) {
        self.push(ClauseKind::Where, fragment, args);
    }

    pub fn push_or(&mut self, fragment: impl Into<String>, args: Vec<Value>) {
        self.push(ClauseKind::Or, fragment, args);
    }

    /// `column IN (?, ?, ...)`, one placeholder per value. An empty list adds
    /// nothing.
    pub fn push_in(&mut self, column: &str, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.push(
            ClauseKind::In,
            format!("{column} IN ({placeholders})"),
            values,
        );
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// Total number of bound arguments across all clauses.
    pub fn arg_count(&self) -> usize {
        self.clauses.iter().map(|c| c.args.len()).sum()
    }

    /// Append ` WHERE a AND b OR c` to `sql` and the clause arguments to
    /// `args`. Each clause after the first is preceded by its own kind's
    /// connective. Nothing is written when the list is empty.
    pub fn render(&self, sql: &mut String, args: &mut Vec<Value>) {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i == 0 {
                sql.push_str(" WHERE ");
            } else {
                sql.push(' ');
                sql.push_str(clause.kind.connective());
                sql.push(' ');
            }
            sql.push_str(&clause.fragment);
            args.extend(clause.args.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectives_follow_each_clause_kind() {
        let mut list = ClauseList::new();
        list.push_where("a = ?", vec![Value::Int(1)]);
        list.push_or("b = ?", vec![Value::Int(2)]);
        list.push_in("c", vec![Value::Int(3), Value::Int(4)]);

        let (mut sql, mut args) = (String::new(), Vec::new());
        list.render(&mut sql, &mut args);
        assert_eq!(sql, " WHERE a = ? OR b = ? AND c IN (?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn leading_or_still_opens_with_where() {
        let mut list = ClauseList::new();
        list.push_or("x IS NULL", vec![]);
        let (mut sql, mut args) = (String::new(), Vec::new());
        list.render(&mut sql, &mut args);
        assert_eq!(sql, " WHERE x IS NULL");
        assert!(args.is_empty());
    }

    #[test]
    fn empty_in_is_skipped() {
        let mut list = ClauseList::new();
        list.push_in("id", vec![]);
        assert!(list.is_empty());
    }
}
