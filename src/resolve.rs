//! Reconciliation of overlapping statement and function spans into clean
//! per-line ownership.
//!
//! Istanbul-style statement spans nest: a class declaration statement spans
//! every method body inside it, and an `if` statement spans its branches.
//! Counting those spans as-is would attribute blank lines and braces inside
//! methods to the outer statement and then count the inner statements a
//! second time. The resolver subtracts nested spans so that every line ends
//! up owned by at most one statement.

use std::collections::BTreeSet;

use crate::error::{IncrcovError, Result};
use crate::model::{FileInstrumentation, LineSet};

/// Resolve one file's raw instrumentation into `instrumented` and
/// `executed` line sets.
///
/// The subtraction proceeds in the order the statements were given:
///
/// 1. Each statement's line set loses every function span that is a strict
///    subset of it (whole methods nested inside an outer statement).
/// 2. Each statement's remaining line set is subtracted from every earlier
///    statement whose current set strictly contains it (loop and
///    conditional statements lose the lines of their inner branches).
/// 3. Whatever remains across all statements is `instrumented`; the union
///    of the remains of statements with a nonzero execution count is
///    `executed`.
pub fn resolve(file: &FileInstrumentation) -> Result<LineSet> {
    let function_lines: Vec<BTreeSet<u32>> =
        file.functions.iter().map(|range| range.lines()).collect();

    // Ownership sets per statement, in processing order.
    let mut statement_lines: Vec<(&str, BTreeSet<u32>)> = Vec::new();

    for (id, range) in &file.statements {
        let mut lines = range.lines();

        // Exclude whole nested functions before their child statements are
        // subtracted, so empty lines inside method bodies are not kept by
        // the outer statement.
        for function in &function_lines {
            if is_strict_subset(function, &lines) {
                lines = &lines - function;
            }
        }

        // This statement is inside an earlier statement's range: remove the
        // inner lines from the outer owner.
        for (_, earlier) in statement_lines.iter_mut() {
            if is_strict_subset(&lines, earlier) {
                *earlier = &*earlier - &lines;
            }
        }

        statement_lines.push((id.as_str(), lines));
    }

    let mut instrumented = BTreeSet::new();
    for (_, lines) in &statement_lines {
        instrumented.extend(lines.iter().copied());
    }

    // Counts and statements are paired by construction; a mismatch in
    // either direction means the report is inconsistent.
    let mut executed = BTreeSet::new();
    for (id, lines) in &statement_lines {
        let count = file.counts.get(*id).ok_or_else(|| {
            IncrcovError::MalformedInstrumentation(format!(
                "no execution count for statement id '{id}'"
            ))
        })?;
        if *count > 0 {
            executed.extend(lines.iter().copied());
        }
    }
    for id in file.counts.keys() {
        if !file.statements.iter().any(|(sid, _)| sid == id) {
            return Err(IncrcovError::MalformedInstrumentation(format!(
                "execution count references unknown statement id '{id}'"
            )));
        }
    }

    Ok(LineSet {
        instrumented,
        executed,
    })
}

/// True when `a` is a strict subset of `b` (all of `a` is in `b`, and `b`
/// has at least one extra line).
fn is_strict_subset(a: &BTreeSet<u32>, b: &BTreeSet<u32>) -> bool {
    a.len() < b.len() && a.is_subset(b)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::LineRange;

    fn file(
        statements: Vec<(&str, u32, u32)>,
        functions: Vec<(u32, u32)>,
        counts: Vec<(&str, u64)>,
    ) -> FileInstrumentation {
        FileInstrumentation {
            statements: statements
                .into_iter()
                .map(|(id, start, end)| (id.to_string(), LineRange::new(start, end)))
                .collect(),
            functions: functions
                .into_iter()
                .map(|(start, end)| LineRange::new(start, end))
                .collect(),
            counts: counts
                .into_iter()
                .map(|(id, count)| (id.to_string(), count))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn lines(numbers: &[u32]) -> BTreeSet<u32> {
        numbers.iter().copied().collect()
    }

    #[test]
    fn test_nested_function_is_subtracted() {
        // One statement spanning 7-10 with a function body at 8-9 nested
        // inside it. Only the statement's own lines 7 and 10 remain.
        let input = file(vec![("0", 7, 10)], vec![(8, 9)], vec![("0", 1)]);
        let result = resolve(&input).unwrap();
        assert_eq!(result.instrumented, lines(&[7, 10]));
        assert_eq!(result.executed, lines(&[7, 10]));
    }

    #[test]
    fn test_function_equal_to_statement_is_kept() {
        // A function spanning exactly the statement's range is not a
        // strict subset; nothing is subtracted.
        let input = file(vec![("0", 3, 6)], vec![(3, 6)], vec![("0", 2)]);
        let result = resolve(&input).unwrap();
        assert_eq!(result.instrumented, lines(&[3, 4, 5, 6]));
    }

    #[test]
    fn test_inner_statement_removed_from_outer() {
        // An `if` spanning 1-5 whose body statement spans 2-4. The inner
        // statement owns 2-4; the outer keeps only 1 and 5.
        let input = file(
            vec![("0", 1, 5), ("1", 2, 4)],
            vec![],
            vec![("0", 1), ("1", 0)],
        );
        let result = resolve(&input).unwrap();
        assert_eq!(result.instrumented, lines(&[1, 2, 3, 4, 5]));
        // Only the outer statement executed; the inner body never ran.
        assert_eq!(result.executed, lines(&[1, 5]));
    }

    #[test]
    fn test_executed_subset_of_instrumented() {
        let input = file(
            vec![("0", 1, 3), ("1", 5, 5), ("2", 2, 2)],
            vec![],
            vec![("0", 0), ("1", 7), ("2", 1)],
        );
        let result = resolve(&input).unwrap();
        assert!(result.executed.is_subset(&result.instrumented));
        assert_eq!(result.executed, lines(&[2, 5]));
    }

    #[test]
    fn test_no_line_double_owned() {
        // Deeply nested statements: each line must be owned exactly once,
        // so the union of ownership sets equals the instrumented set and
        // the sizes add up.
        let input = file(
            vec![("0", 1, 10), ("1", 2, 8), ("2", 3, 4)],
            vec![],
            vec![("0", 1), ("1", 1), ("2", 0)],
        );
        let result = resolve(&input).unwrap();
        assert_eq!(result.instrumented, lines(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        // Statement "2" (3-4) never ran and owns its lines exclusively.
        assert_eq!(result.executed, lines(&[1, 2, 5, 6, 7, 8, 9, 10]));
    }

    #[test]
    fn test_deterministic() {
        let input = file(
            vec![("0", 1, 6), ("1", 2, 3), ("2", 5, 5)],
            vec![(2, 3)],
            vec![("0", 4), ("1", 0), ("2", 4)],
        );
        let first = resolve(&input).unwrap();
        let second = resolve(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_file() {
        let input = file(vec![], vec![], vec![]);
        let result = resolve(&input).unwrap();
        assert!(result.instrumented.is_empty());
        assert!(result.executed.is_empty());
    }

    #[test]
    fn test_missing_count_is_error() {
        let input = file(vec![("0", 1, 2)], vec![], vec![]);
        let err = resolve(&input).unwrap_err();
        assert!(matches!(
            err,
            IncrcovError::MalformedInstrumentation(_)
        ));
    }

    #[test]
    fn test_unknown_count_id_is_error() {
        let input = file(vec![("0", 1, 2)], vec![], vec![("0", 1), ("9", 3)]);
        let err = resolve(&input).unwrap_err();
        assert!(matches!(
            err,
            IncrcovError::MalformedInstrumentation(_)
        ));
    }

    #[test]
    fn test_statement_with_inverted_range_contributes_nothing() {
        let input = file(vec![("0", 9, 5), ("1", 1, 1)], vec![], vec![("0", 1), ("1", 1)]);
        let result = resolve(&input).unwrap();
        assert_eq!(result.instrumented, lines(&[1]));
    }
}
