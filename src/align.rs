//! Token-to-column alignment: the shortest-path search over the layered DAG
//! implied by a row's validity matrix, plus the row-level orchestration that
//! turns a raw line into a typed record or a tagged invalid entry.
//!
//! Nodes are `(t, c)` pairs with `t` tokens consumed and `c` columns filled;
//! the source is `(0, 0)` and the sole sink `(n, m)`. An *advance* edge
//! `(t, c) -> (t+1, c+1)` assigns token `t` as the final fragment of column
//! `c` at weight `cost[t][c]`; a *merge* edge `(t, c) -> (t+1, c)` absorbs
//! token `t` into column `c` at weight 0 and exists only when the column
//! allows embedded commas. `t` strictly increases along every edge, so a
//! single forward pass in token order computes minimum distances and a
//! saturated count of minimum-cost paths. Ties are terminal: two structurally
//! different regroupings that both satisfy every validator cannot be resolved
//! without fabricating data, so no tie-break heuristic is applied.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, warn};
use thiserror::Error;

use crate::{
    data::{Value, parse_typed_value},
    matrix::ValidityMatrix,
    schema::Schema,
};

/// Why a row could not be aligned. Per-row and non-fatal: the file-level
/// operation records these and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlignmentFailure {
    /// No zero-cost alignment exists for this row under the schema.
    #[error("no feasible alignment")]
    Infeasible,
    /// More than one minimum-cost alignment ties; the row cannot be repaired
    /// without guessing which commas were data.
    #[error("multiple alignments tie")]
    Ambiguous,
}

/// Options applied per file or per row.
#[derive(Debug, Clone)]
pub struct AlignOptions {
    /// Treat the first line as a header: excluded from processing, never
    /// validated.
    pub has_header: bool,
    /// Collect the competing alignments of ambiguous rows for diagnostics.
    pub show_alternatives: bool,
    /// Field delimiter, comma unless overridden.
    pub delimiter: char,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions {
            has_header: true,
            show_alternatives: false,
            delimiter: ',',
        }
    }
}

/// A repaired row: the reconstructed field text and the typed value per
/// column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<String>,
    values: Vec<Option<Value>>,
}

impl Record {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Display cells for export: the reconstructed field text as it appeared
    /// in the source (no typed re-rendering), or the column's empty
    /// representation for nulls.
    pub fn display_cells(&self, schema: &Schema) -> Vec<String> {
        self.fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                if field.is_empty() {
                    schema.column_at(idx).empty_value().to_string()
                } else {
                    field.clone()
                }
            })
            .collect()
    }
}

/// Outcome of aligning one row, tagged with its 0-based source line index.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Valid {
        line_index: usize,
        record: Record,
    },
    Invalid {
        line_index: usize,
        reason: AlignmentFailure,
        raw: String,
        /// Competing reconstructions, populated for ambiguous rows when
        /// requested via [`AlignOptions::show_alternatives`].
        alternatives: Vec<Vec<String>>,
    },
}

impl RowOutcome {
    pub fn line_index(&self) -> usize {
        match self {
            RowOutcome::Valid { line_index, .. } | RowOutcome::Invalid { line_index, .. } => {
                *line_index
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RowOutcome::Valid { .. })
    }
}

const UNREACHED: u32 = u32::MAX;

/// How many path-enumeration candidates to surface for one ambiguous row.
const MAX_ALTERNATIVES: usize = 8;

enum SearchOutcome {
    /// Sink unreachable: no alignment at any cost.
    Unreachable,
    /// Multiple minimum-cost paths tie at `min_cost`.
    Tied { min_cost: u32 },
    /// Exactly one minimum-cost path.
    Unique {
        min_cost: u32,
        path: Vec<(usize, usize)>,
    },
}

struct Distances {
    dist: Vec<u32>,
    count: Vec<u8>,
    width: usize,
}

impl Distances {
    fn at(&self, t: usize, c: usize) -> u32 {
        self.dist[t * self.width + c]
    }
}

/// Forward pass over the layered DAG, filling minimum distances and a path
/// count saturated at 2 per node.
fn forward_pass(matrix: &ValidityMatrix, schema: &Schema) -> Distances {
    let n = matrix.token_count();
    let m = matrix.column_count();
    let width = m + 1;
    let mut dist = vec![UNREACHED; (n + 1) * width];
    let mut count = vec![0u8; (n + 1) * width];
    dist[0] = 0;
    count[0] = 1;

    for t in 0..n {
        for c in 0..=m.min(t) {
            let node = t * width + c;
            let here = dist[node];
            if here == UNREACHED {
                continue;
            }
            if c == m {
                continue;
            }
            let through = count[node];
            // Advance: token t closes out column c.
            relax(
                &mut dist,
                &mut count,
                (t + 1) * width + c + 1,
                here + matrix.cost(t, c),
                through,
            );
            // Merge: token t is absorbed as an extra fragment of column c.
            if schema.column_at(c).allows_commas() {
                relax(
                    &mut dist,
                    &mut count,
                    (t + 1) * width + c,
                    here,
                    through,
                );
            }
        }
    }
    Distances { dist, count, width }
}

fn relax(dist: &mut [u32], count: &mut [u8], node: usize, candidate: u32, through: u8) {
    if candidate < dist[node] {
        dist[node] = candidate;
        count[node] = through;
    } else if candidate == dist[node] {
        // Counts beyond "more than one" never change the decision.
        count[node] = count[node].saturating_add(through).min(2);
    }
}

fn search(matrix: &ValidityMatrix, schema: &Schema) -> SearchOutcome {
    let n = matrix.token_count();
    let m = matrix.column_count();
    let distances = forward_pass(matrix, schema);
    let sink = n * distances.width + m;
    let min_cost = distances.dist[sink];
    if min_cost == UNREACHED {
        return SearchOutcome::Unreachable;
    }
    if distances.count[sink] > 1 {
        return SearchOutcome::Tied { min_cost };
    }

    // Unique optimum: walk back from the sink. At every node on the path
    // exactly one incoming edge attains the distance, otherwise the sink
    // count would exceed one.
    let mut path = vec![(n, m)];
    let (mut t, mut c) = (n, m);
    while t > 0 {
        let here = distances.at(t, c);
        let advanced = c > 0
            && distances.at(t - 1, c - 1) != UNREACHED
            && distances.at(t - 1, c - 1) + matrix.cost(t - 1, c - 1) == here;
        if advanced {
            t -= 1;
            c -= 1;
        } else {
            // Must have merged into column c.
            t -= 1;
        }
        path.push((t, c));
    }
    path.reverse();
    SearchOutcome::Unique { min_cost, path }
}

/// Enumerates every minimum-cost path, capped, for ambiguity diagnostics.
fn minimum_cost_paths(matrix: &ValidityMatrix, schema: &Schema, cap: usize) -> Vec<Vec<(usize, usize)>> {
    let n = matrix.token_count();
    let m = matrix.column_count();
    let distances = forward_pass(matrix, schema);
    if distances.at(n, m) == UNREACHED {
        return Vec::new();
    }

    let mut paths = Vec::new();
    let mut suffix = vec![(n, m)];
    collect_paths(matrix, schema, &distances, &mut suffix, &mut paths, cap);
    paths
}

fn collect_paths(
    matrix: &ValidityMatrix,
    schema: &Schema,
    distances: &Distances,
    suffix: &mut Vec<(usize, usize)>,
    paths: &mut Vec<Vec<(usize, usize)>>,
    cap: usize,
) {
    if paths.len() >= cap {
        return;
    }
    let (t, c) = *suffix.last().expect("suffix is never empty");
    if t == 0 {
        let mut path = suffix.clone();
        path.reverse();
        paths.push(path);
        return;
    }
    let here = distances.at(t, c);
    if c > 0
        && distances.at(t - 1, c - 1) != UNREACHED
        && distances.at(t - 1, c - 1) + matrix.cost(t - 1, c - 1) == here
    {
        suffix.push((t - 1, c - 1));
        collect_paths(matrix, schema, distances, suffix, paths, cap);
        suffix.pop();
    }
    if c < matrix.column_count()
        && schema.column_at(c).allows_commas()
        && distances.at(t - 1, c) == here
    {
        suffix.push((t - 1, c));
        collect_paths(matrix, schema, distances, suffix, paths, cap);
        suffix.pop();
    }
}

/// Rebuilds per-column field text from a path: each column receives the
/// contiguous token run mapped to it, trimmed, with empty fragments dropped
/// and the remainder rejoined on the delimiter.
fn reconstruct_fields(
    path: &[(usize, usize)],
    tokens: &[&str],
    columns: usize,
    delimiter: char,
) -> Vec<String> {
    let mut fragments: Vec<Vec<&str>> = vec![Vec::new(); columns];
    for step in path.windows(2) {
        let (token, column) = step[0];
        let fragment = tokens[token].trim();
        if !fragment.is_empty() {
            fragments[column].push(fragment);
        }
    }
    let separator = delimiter.to_string();
    fragments
        .into_iter()
        .map(|parts| parts.into_iter().join(&separator))
        .collect()
}

/// Columns the reconstruction left empty that do not admit nulls. The search
/// tolerates empty fragments inside comma columns, so the null rule has to be
/// re-checked on the joined values.
fn null_violation(fields: &[String], schema: &Schema) -> Option<usize> {
    fields
        .iter()
        .enumerate()
        .find(|(idx, field)| field.is_empty() && !schema.column_at(*idx).is_nullable())
        .map(|(idx, _)| idx)
}

/// Aligns one raw line against the schema.
///
/// Row-level failures (infeasible, ambiguous) are recovered into the
/// returned [`RowOutcome`]; only defect-level errors propagate, such as a
/// typed conversion rejecting a value its validator accepted.
pub fn align_row(
    raw: &str,
    line_index: usize,
    schema: &Schema,
    options: &AlignOptions,
) -> Result<RowOutcome> {
    let line = raw.trim();
    let tokens: Vec<&str> = line.split(options.delimiter).collect();

    let matrix = match ValidityMatrix::build(&tokens, schema) {
        Ok(matrix) => matrix,
        Err(reason) => {
            warn!(
                "Line {line_index}: {} token(s) cannot fill {} column(s)",
                tokens.len(),
                schema.len()
            );
            return Ok(invalid(line_index, reason, line, Vec::new()));
        }
    };

    match search(&matrix, schema) {
        SearchOutcome::Unreachable => {
            warn!("Line {line_index}: no alignment path exists");
            Ok(invalid(line_index, AlignmentFailure::Infeasible, line, Vec::new()))
        }
        SearchOutcome::Tied { min_cost } => {
            warn!("Line {line_index}: multiple alignments tie at cost {min_cost}");
            let alternatives = if options.show_alternatives && min_cost == 0 {
                minimum_cost_paths(&matrix, schema, MAX_ALTERNATIVES)
                    .iter()
                    .map(|path| reconstruct_fields(path, &tokens, schema.len(), options.delimiter))
                    .filter(|fields| null_violation(fields, schema).is_none())
                    .collect()
            } else {
                Vec::new()
            };
            Ok(invalid(line_index, AlignmentFailure::Ambiguous, line, alternatives))
        }
        SearchOutcome::Unique { min_cost, path } => {
            if min_cost > 0 {
                debug!("Line {line_index}: best alignment still costs {min_cost}");
                return Ok(invalid(line_index, AlignmentFailure::Infeasible, line, Vec::new()));
            }
            debug!("Line {line_index}: unique zero-cost path {path:?}");
            let fields = reconstruct_fields(&path, &tokens, schema.len(), options.delimiter);
            if let Some(column) = null_violation(&fields, schema) {
                warn!(
                    "Line {line_index}: null value landed in non-nullable column '{}'",
                    schema.column_at(column).name()
                );
                return Ok(invalid(line_index, AlignmentFailure::Infeasible, line, Vec::new()));
            }
            let values = fields
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    parse_typed_value(field, schema.column_at(idx)).with_context(|| {
                        format!(
                            "Line {line_index}: column '{}' accepted a value its type rejects",
                            schema.column_at(idx).name()
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RowOutcome::Valid {
                line_index,
                record: Record { fields, values },
            })
        }
    }
}

fn invalid(
    line_index: usize,
    reason: AlignmentFailure,
    raw: &str,
    alternatives: Vec<Vec<String>>,
) -> RowOutcome {
    RowOutcome::Invalid {
        line_index,
        reason,
        raw: raw.to_string(),
        alternatives,
    }
}
