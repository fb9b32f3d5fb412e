//! Per-row validity cost matrix, n tokens by m columns.
//!
//! Cell `(t, c)` costs 0 when token `t` independently satisfies column `c`'s
//! validator, 1 otherwise. The matrix is rebuilt for every row and never
//! shared across rows.

use crate::{align::AlignmentFailure, schema::Schema};

#[derive(Debug, Clone)]
pub struct ValidityMatrix {
    costs: Vec<u8>,
    tokens: usize,
    columns: usize,
}

impl ValidityMatrix {
    /// Evaluates every token against every column validator.
    ///
    /// Rows with fewer tokens than columns can never be aligned (extra
    /// tokens only ever come from unescaped delimiters, never missing data),
    /// so the degenerate case short-circuits before any search runs.
    pub fn build(tokens: &[&str], schema: &Schema) -> Result<Self, AlignmentFailure> {
        let n = tokens.len();
        let m = schema.len();
        if n < m {
            return Err(AlignmentFailure::Infeasible);
        }
        let mut costs = vec![1u8; n * m];
        for (t, token) in tokens.iter().enumerate() {
            for (c, column) in schema.columns().iter().enumerate() {
                // An empty fragment in a comma-absorbing column is tolerated
                // as a stray delimiter; it is dropped again at join time.
                let valid = column.is_valid(token)
                    || (token.trim().is_empty() && column.allows_commas());
                if valid {
                    costs[t * m + c] = 0;
                }
            }
        }
        Ok(ValidityMatrix {
            costs,
            tokens: n,
            columns: m,
        })
    }

    pub fn cost(&self, token: usize, column: usize) -> u32 {
        u32::from(self.costs[token * self.columns + column])
    }

    pub fn token_count(&self) -> usize {
        self.tokens
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Schema};

    fn sample_schema() -> Schema {
        Schema::build(vec![
            Column::string("name", false, false, false),
            Column::integer("age", false),
        ])
        .unwrap()
    }

    #[test]
    fn build_marks_valid_cells_zero() {
        let schema = sample_schema();
        let matrix = ValidityMatrix::build(&["alice", "30"], &schema).unwrap();
        assert_eq!(matrix.cost(0, 0), 0);
        assert_eq!(matrix.cost(0, 1), 1);
        assert_eq!(matrix.cost(1, 0), 0);
        assert_eq!(matrix.cost(1, 1), 0);
    }

    #[test]
    fn build_rejects_fewer_tokens_than_columns() {
        let schema = sample_schema();
        let result = ValidityMatrix::build(&["alice"], &schema);
        assert_eq!(result.unwrap_err(), AlignmentFailure::Infeasible);
    }

    #[test]
    fn empty_token_is_tolerated_in_comma_columns() {
        let schema = Schema::build(vec![
            Column::string("tags", false, true, false),
            Column::integer("age", false),
        ])
        .unwrap();
        let matrix = ValidityMatrix::build(&["a", "", "30"], &schema).unwrap();
        assert_eq!(matrix.cost(1, 0), 0);
        assert_eq!(matrix.cost(1, 1), 1);
    }
}
