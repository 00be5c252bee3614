//! Conceptual evaluation flow.
//!
//! Splits a query into runs of tokens that share an operator precedence class
//! and orders the runs NOT, proximity, AND, OR. The ordering illustrates how
//! precedence binds terms; it is not an execution plan of any search engine.

use crate::query::lexer::{tokenize, Token};
use crate::query::vocabulary::{BooleanOp, Operator, ProximityOp};
use serde::Serialize;
use std::fmt::Write;

/// Category of a flow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowStepKind {
    Parse,
    TermSearch,
    Exclusion,
    Proximity,
    Intersection,
    Union,
    Results,
}

/// One step of the conceptual evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStep {
    /// 1-based position in the flow
    pub step: usize,
    pub operation: String,
    pub input: String,
    pub output: String,
    pub description: String,
    pub kind: FlowStepKind,
    pub performance_note: Option<String>,
}

/// Proximity windows up to this many words are cheap to verify
const TIGHT_PROXIMITY: u32 = 5;
/// Proximity windows above this many words are expensive
const WIDE_PROXIMITY: u32 = 20;

/// Describe how `query` conceptually evaluates
pub fn analyze_flow(query: &str) -> Vec<FlowStep> {
    let tokens = tokenize(query, 0);
    let mut planner = FlowPlanner::new();
    planner.plan(query, &tokens)
}

/// Contiguous tokens sharing one operator precedence class
#[derive(Debug)]
struct Run<'t> {
    tokens: Vec<&'t Token>,
    class: Option<u8>,
}

impl Run<'_> {
    fn max_precedence(&self) -> u8 {
        self.tokens.iter().map(|t| t.precedence).max().unwrap_or(0)
    }

    /// The first operator of the highest class in the run
    fn dominant(&self) -> Option<Operator> {
        let top = self.max_precedence();
        self.tokens
            .iter()
            .filter(|t| t.precedence == top)
            .find_map(|t| t.operator)
    }

    fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn operands(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| t.is_operand())
            .map(|t| t.text.as_str())
            .collect()
    }
}

struct FlowPlanner {
    steps: Vec<FlowStep>,
}

impl FlowPlanner {
    fn new() -> Self {
        Self { steps: Vec::new() }
    }

    fn plan(&mut self, query: &str, tokens: &[Token]) -> Vec<FlowStep> {
        self.push(
            "Parse Query",
            query.trim().to_string(),
            format!("{} tokens", tokens.len()),
            "Tokenize the query and resolve operator precedence".to_string(),
            FlowStepKind::Parse,
            None,
        );

        let mut runs = split_runs(tokens);
        // Stable: runs of the same class keep their reading order
        runs.sort_by(|a, b| b.max_precedence().cmp(&a.max_precedence()));

        for run in &runs {
            self.plan_run(run);
        }

        let last_result = self
            .steps
            .last()
            .map(|s| s.output.clone())
            .unwrap_or_default();
        self.push(
            "Return Results",
            last_result,
            "Matching documents".to_string(),
            "Combine the intermediate result sets and return matches".to_string(),
            FlowStepKind::Results,
            None,
        );

        std::mem::take(&mut self.steps)
    }

    fn plan_run(&mut self, run: &Run<'_>) {
        let input = run.text();
        let output = format!("R{}", self.steps.len());
        let terms = run.operands().join(", ");

        let Some(op) = run.dominant() else {
            self.push(
                "Term Search",
                input,
                output,
                format!("Look up documents containing: {}", terms),
                FlowStepKind::TermSearch,
                Some("Fast - direct index lookup".to_string()),
            );
            return;
        };

        let (operation, description, kind, note) = match op {
            Operator::Boolean(BooleanOp::Not) => (
                "NOT Exclusion".to_string(),
                format!("Remove documents containing: {}", terms),
                FlowStepKind::Exclusion,
                "Moderate - exclusion pass over the candidate set".to_string(),
            ),
            Operator::Boolean(BooleanOp::And) => (
                "AND Intersection".to_string(),
                format!("Keep documents containing all of: {}", terms),
                FlowStepKind::Intersection,
                "Fast - index intersection".to_string(),
            ),
            Operator::Boolean(BooleanOp::AndAny) => (
                "ANDANY Match".to_string(),
                format!("Require the left side, rank by any of: {}", terms),
                FlowStepKind::Intersection,
                "Fast - index intersection with optional terms".to_string(),
            ),
            Operator::Boolean(BooleanOp::Or) => (
                "OR Union".to_string(),
                format!("Collect documents containing any of: {}", terms),
                FlowStepKind::Union,
                "Fast - index union".to_string(),
            ),
            Operator::Proximity(prox) => (
                format!("Proximity {}", op),
                format!("{} ({})", op.description(), terms),
                FlowStepKind::Proximity,
                proximity_note(prox),
            ),
        };

        self.push(operation, input, output, description, kind, Some(note));
    }

    fn push(
        &mut self,
        operation: impl Into<String>,
        input: String,
        output: String,
        description: String,
        kind: FlowStepKind,
        performance_note: Option<String>,
    ) {
        self.steps.push(FlowStep {
            step: self.steps.len() + 1,
            operation: operation.into(),
            input,
            output,
            description,
            kind,
            performance_note,
        });
    }
}

fn proximity_note(op: ProximityOp) -> String {
    match op {
        ProximityOp::W(n) | ProximityOp::Pre(n) if n <= TIGHT_PROXIMITY => {
            format!("Moderate - tight window of {} words, position check on few candidates", n)
        }
        ProximityOp::W(n) | ProximityOp::Pre(n) if n <= WIDE_PROXIMITY => {
            format!("Slower - window of {} words needs word positions", n)
        }
        ProximityOp::W(n) | ProximityOp::Pre(n) => {
            format!("Slow - wide window of {} words scans many positions", n)
        }
        _ => "Moderate - positional check".to_string(),
    }
}

/// Start a new run whenever an operator's class differs from the run's class
fn split_runs(tokens: &[Token]) -> Vec<Run<'_>> {
    let mut runs: Vec<Run<'_>> = Vec::new();
    let mut current = Run {
        tokens: Vec::new(),
        class: None,
    };

    for token in tokens {
        if token.is_operator() {
            match current.class {
                Some(class) if class != token.precedence => {
                    let next = Run {
                        tokens: Vec::new(),
                        class: Some(token.precedence),
                    };
                    runs.push(std::mem::replace(&mut current, next));
                }
                None => current.class = Some(token.precedence),
                _ => {}
            }
        }
        current.tokens.push(token);
    }

    if !current.tokens.is_empty() {
        runs.push(current);
    }
    runs
}

/// Render flow steps as a plain-text report
pub fn format_flow_report(steps: &[FlowStep]) -> String {
    let mut out = String::new();
    for step in steps {
        let _ = writeln!(out, "Step {}: {}", step.step, step.operation);
        if !step.input.is_empty() {
            let _ = writeln!(out, "  Input:  {}", step.input);
        }
        let _ = writeln!(out, "  Output: {}", step.output);
        let _ = writeln!(out, "  {}", step.description);
        if let Some(note) = &step.performance_note {
            let _ = writeln!(out, "  Performance: {}", note);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operations(query: &str) -> Vec<String> {
        analyze_flow(query).into_iter().map(|s| s.operation).collect()
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(operations(""), vec!["Parse Query", "Return Results"]);
    }

    #[test]
    fn test_single_term() {
        let steps = analyze_flow("apple");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].kind, FlowStepKind::TermSearch);
        assert_eq!(steps[1].step, 2);
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(
            operations("apple OR pear AND plum W/3 fig NOT kiwi"),
            vec![
                "Parse Query",
                "NOT Exclusion",
                "Proximity W/3",
                "AND Intersection",
                "OR Union",
                "Return Results",
            ]
        );
    }

    #[test]
    fn test_same_class_shares_a_run() {
        let steps = analyze_flow("a AND b AND c");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].input, "a AND b AND c");
        assert_eq!(steps[1].description, "Keep documents containing all of: a, b, c");
    }

    #[test]
    fn test_runs_keep_reading_order_within_class() {
        let steps = analyze_flow("a OR b AND c OR d");
        let ops: Vec<_> = steps.iter().map(|s| s.input.as_str()).collect();
        assert_eq!(ops, vec!["a OR b AND c OR d", "AND c", "a OR b", "OR d", "R3"]);
    }

    #[test]
    fn test_proximity_notes_scale() {
        let tight = analyze_flow("a W/2 b");
        let wide = analyze_flow("a W/200 b");
        assert!(tight[1].performance_note.as_deref().unwrap().starts_with("Moderate"));
        assert!(wide[1].performance_note.as_deref().unwrap().starts_with("Slow -"));
    }

    #[test]
    fn test_steps_are_numbered() {
        let steps = analyze_flow("a AND b OR c");
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step, i + 1);
        }
        assert_eq!(steps.last().unwrap().kind, FlowStepKind::Results);
    }

    #[test]
    fn test_report() {
        let report = format_flow_report(&analyze_flow("a OR b"));
        assert!(report.contains("Step 2: OR Union"));
        assert!(report.contains("Performance: Fast - index union"));
    }
}
