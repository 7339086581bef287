//! Assembles SELECT statement text from resolved clauses.
//!
//! ```text
//! select
//! 	distinct
//! 	s.student_id       as StudentId,
//! 	null               as Remarks
//! from
//! 	PQ_Student as s
//! 		inner join PQ_ClassRoom as c on
//! 			s.class_room_id = c.class_room_id
//! where
//! 	s.student_id > 0
//! order by
//! 	s.student_id
//! ```

use crate::aliases::ResolvedColumn;
use crate::compiler::WhereLine;
use crate::config::LineEnding;
use crate::joins::JoinClause;

/// Upper bound on cleanup sweeps over the WHERE lines.
pub const MAX_CLEANUP_PASSES: usize = 15;

/// Width charged to a `null` select item.
const NULL_COLUMN_WIDTH: usize = 15;

/// What a select-list entry renders.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    Column(ResolvedColumn),
    /// Name of a bound parameter.
    Parameter(String),
    Null,
}

impl SelectColumn {
    fn text(&self) -> String {
        match self {
            SelectColumn::Column(c) => c.qualified(),
            SelectColumn::Parameter(name) => name.clone(),
            SelectColumn::Null => "null".to_string(),
        }
    }

    fn width(&self) -> usize {
        match self {
            SelectColumn::Null => NULL_COLUMN_WIDTH,
            SelectColumn::Column(c) => c.alias.len() + 1 + c.column.len() + 4,
            SelectColumn::Parameter(name) => name.len() + 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectEntry {
    pub column: SelectColumn,
    pub alias: Option<String>,
}

/// Aligned width of the select list: the first multiple of ten strictly
/// greater than the widest entry, plus two.
pub fn aligned_width(entries: &[SelectEntry]) -> usize {
    let widest = entries.iter().map(|e| e.column.width()).max().unwrap_or(0);
    (widest / 10 + 1) * 10 + 2
}

/// Select-list lines, `as` clauses aligned.
pub fn render_select_list(distinct: bool, entries: &[SelectEntry]) -> Vec<String> {
    let width = aligned_width(entries);
    let mut lines = Vec::with_capacity(entries.len() + 1);
    if distinct {
        lines.push("\tdistinct".to_string());
    }
    for (i, entry) in entries.iter().enumerate() {
        let mut line = match (&entry.column, &entry.alias) {
            (SelectColumn::Null, Some(alias)) => {
                format!("\tnull{}as {}", " ".repeat(width - 7), alias)
            }
            (column, Some(alias)) => format!(
                "\t{}{} as {}",
                column.text(),
                " ".repeat(width - column.width()),
                alias
            ),
            (column, None) => format!("\t{}", column.text()),
        };
        if i + 1 < entries.len() {
            line.push(',');
        }
        lines.push(line);
    }
    lines
}

/// Remove always-true conditions and the empty groups they leave behind.
/// Returns the number of sweeps made.
pub fn strip_always_true(lines: &mut Vec<WhereLine>) -> usize {
    let mut passes = 0;
    while passes < MAX_CLEANUP_PASSES {
        passes += 1;
        if !sweep(lines) {
            break;
        }
    }
    passes
}

fn sweep(lines: &mut Vec<WhereLine>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < lines.len() {
        if lines[i].is_always_true() {
            let depth = lines[i].depth();
            let opened_group = matches!(lines[i], WhereLine::Condition { connective: None, .. });
            lines.remove(i);
            if opened_group {
                rehome(lines, i, depth);
            }
            changed = true;
            i = i.saturating_sub(1);
            continue;
        }

        let empty_group = match (&lines[i], lines.get(i + 1)) {
            (WhereLine::Open { depth }, Some(WhereLine::Close { .. })) => Some(*depth),
            _ => None,
        };
        if let Some(depth) = empty_group {
            lines.drain(i..=i + 1);
            let bound = i > 0
                && matches!(lines[i - 1], WhereLine::Connective { depth: d, .. } if d == depth);
            if bound {
                lines.remove(i - 1);
                i -= 1;
            } else {
                rehome(lines, i, depth);
            }
            changed = true;
            i = i.saturating_sub(1);
            continue;
        }

        i += 1;
    }
    changed
}

/// The sibling now at `index` opens its group: drop its connective.
fn rehome(lines: &mut Vec<WhereLine>, index: usize, depth: usize) {
    let bare_connective = matches!(
        lines.get(index),
        Some(WhereLine::Connective { depth: d, .. }) if *d == depth
    );
    if bare_connective {
        lines.remove(index);
        return;
    }
    if let Some(WhereLine::Condition {
        depth: d,
        connective,
        ..
    }) = lines.get_mut(index)
    {
        if *d == depth {
            *connective = None;
        }
    }
}

/// Resolved parts of a SELECT statement.
#[derive(Debug, Clone, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<SelectEntry>,
    pub from_table: String,
    pub from_alias: String,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Vec<WhereLine>>,
    pub order_by: Vec<ResolvedColumn>,
}

impl SelectStatement {
    /// Statement text, every line terminated by `ending`.
    pub fn render(mut self, ending: LineEnding) -> String {
        let mut lines = vec!["select".to_string()];
        lines.extend(render_select_list(self.distinct, &self.columns));

        lines.push("from".to_string());
        lines.push(format!("\t{} as {}", self.from_table, self.from_alias));
        for join in &self.joins {
            lines.extend(join.render_lines());
        }

        if let Some(mut filter) = self.filter.take() {
            let passes = strip_always_true(&mut filter);
            tracing::debug!(passes, remaining = filter.len(), "cleaned where clause");
            if !filter.is_empty() {
                lines.push("where".to_string());
                lines.extend(filter.iter().map(WhereLine::render));
            }
        }

        if !self.order_by.is_empty() {
            lines.push("order by".to_string());
            let last = self.order_by.len() - 1;
            for (i, column) in self.order_by.iter().enumerate() {
                let comma = if i < last { "," } else { "" };
                lines.push(format!("\t{}{}", column.qualified(), comma));
            }
        }

        let ending = ending.as_str();
        let mut text = lines.join(ending);
        text.push_str(ending);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LogicalOp;
    use crate::compiler::ALWAYS_TRUE;
    use crate::schema::{DataKind, EntityRef, EntitySchema};
    use pretty_assertions::assert_eq;

    fn resolved(alias: &str, column: &str) -> ResolvedColumn {
        ResolvedColumn {
            alias: alias.to_string(),
            entity: EntityRef::new(EntitySchema::new("E")),
            property: column.to_string(),
            column: column.to_string(),
            kind: DataKind::Int,
        }
    }

    fn entry(column: SelectColumn, alias: Option<&str>) -> SelectEntry {
        SelectEntry {
            column,
            alias: alias.map(str::to_string),
        }
    }

    fn cond(depth: usize, connective: Option<LogicalOp>, text: &str) -> WhereLine {
        WhereLine::Condition {
            depth,
            connective,
            text: text.to_string(),
        }
    }

    fn render(lines: &[WhereLine]) -> Vec<String> {
        lines.iter().map(WhereLine::render).collect()
    }

    #[test]
    fn test_aligned_width_buckets() {
        // "s.student_id" is 12 chars, width 16 -> bucket 20 -> 22
        let entries = vec![entry(SelectColumn::Column(resolved("s", "student_id")), None)];
        assert_eq!(aligned_width(&entries), 22);
        // exactly 20 -> next bucket
        let entries = vec![entry(SelectColumn::Parameter("@param_ab_cdefgh".into()), None)];
        assert_eq!(aligned_width(&entries), 32);
    }

    #[test]
    fn test_select_list_alignment() {
        let entries = vec![
            entry(SelectColumn::Column(resolved("s", "student_id")), Some("Id")),
            entry(SelectColumn::Null, Some("Remarks")),
            entry(SelectColumn::Parameter("@param_age".into()), Some("Age")),
            entry(SelectColumn::Column(resolved("s", "first_name")), None),
        ];
        assert_eq!(
            render_select_list(true, &entries),
            vec![
                "\tdistinct".to_string(),
                "\ts.student_id       as Id,".to_string(),
                "\tnull               as Remarks,".to_string(),
                "\t@param_age         as Age,".to_string(),
                "\ts.first_name".to_string(),
            ]
        );
    }

    #[test]
    fn test_strip_first_leaf_rehomes_connective() {
        let mut lines = vec![
            cond(1, None, ALWAYS_TRUE),
            cond(1, Some(LogicalOp::And), "s.student_id > 0"),
        ];
        strip_always_true(&mut lines);
        assert_eq!(render(&lines), vec!["\ts.student_id > 0"]);
    }

    #[test]
    fn test_strip_bound_leaf() {
        let mut lines = vec![
            cond(1, None, "s.student_id > 0"),
            cond(1, Some(LogicalOp::Or), ALWAYS_TRUE),
        ];
        strip_always_true(&mut lines);
        assert_eq!(render(&lines), vec!["\ts.student_id > 0"]);
    }

    #[test]
    fn test_strip_collapses_bound_group() {
        let mut lines = vec![
            cond(1, None, "a.x = 1"),
            WhereLine::Connective { depth: 1, op: LogicalOp::And },
            WhereLine::Open { depth: 1 },
            cond(2, None, ALWAYS_TRUE),
            cond(2, Some(LogicalOp::Or), ALWAYS_TRUE),
            WhereLine::Close { depth: 1 },
        ];
        strip_always_true(&mut lines);
        assert_eq!(render(&lines), vec!["\ta.x = 1"]);
    }

    #[test]
    fn test_strip_collapses_leading_group() {
        let mut lines = vec![
            WhereLine::Open { depth: 1 },
            cond(2, None, ALWAYS_TRUE),
            cond(2, Some(LogicalOp::And), ALWAYS_TRUE),
            WhereLine::Close { depth: 1 },
            WhereLine::Connective { depth: 1, op: LogicalOp::Or },
            WhereLine::Open { depth: 1 },
            cond(2, None, "a.x = 1"),
            cond(2, Some(LogicalOp::And), "a.y = 2"),
            WhereLine::Close { depth: 1 },
        ];
        strip_always_true(&mut lines);
        assert_eq!(
            render(&lines),
            vec!["\t(", "\t\ta.x = 1", "\t\tand a.y = 2", "\t)"]
        );
    }

    #[test]
    fn test_strip_everything() {
        let mut lines = vec![cond(1, None, ALWAYS_TRUE)];
        strip_always_true(&mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_statement_layout() {
        let statement = SelectStatement {
            distinct: false,
            columns: vec![entry(SelectColumn::Column(resolved("s", "student_id")), None)],
            from_table: "PQ_Student".to_string(),
            from_alias: "s".to_string(),
            joins: Vec::new(),
            filter: Some(vec![cond(1, None, ALWAYS_TRUE)]),
            order_by: vec![resolved("s", "student_id"), resolved("s", "first_name")],
        };
        assert_eq!(
            statement.render(LineEnding::Crlf),
            "select\r\n\ts.student_id\r\nfrom\r\n\tPQ_Student as s\r\norder by\r\n\ts.student_id,\r\n\ts.first_name\r\n"
        );
    }
}
