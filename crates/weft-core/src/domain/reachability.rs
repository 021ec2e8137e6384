//! Execution counting over the step graph.
//!
//! A step reached through several incoming edges runs once per arrival, so the
//! count is taken over edges without deduplicating visited steps:
//! `runs(s) = 1 + Σ runs(successor)`. Results are memoised per step, which keeps
//! the walk linear in the number of edges even for stacked diamonds.

use crate::domain::flow::StepGraph;
use crate::domain::ids::StepId;
use crate::CoreError;
use std::collections::{HashMap, HashSet};

/// Number of executions triggered from each step reachable from a start step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCounts {
    start: StepId,
    per_step: HashMap<StepId, usize>,
}

impl RunCounts {
    /// Walk the graph from `start`, rejecting unknown ids and cycles
    pub fn compute<G: StepGraph + ?Sized>(graph: &G, start: &StepId) -> Result<Self, CoreError> {
        if graph.step(start).is_none() {
            return Err(CoreError::StartStepNotFound(start.to_string()));
        }

        let mut counter = Counter::new(graph);
        counter.visit(start)?;

        Ok(Self {
            start: start.clone(),
            per_step: counter.memo,
        })
    }

    /// Total executions for one run from the start step
    pub fn total(&self) -> usize {
        self.runs_from(&self.start)
    }

    /// Executions triggered by one execution of `step` (including itself)
    pub fn runs_from(&self, step: &StepId) -> usize {
        self.per_step.get(step).copied().unwrap_or(0)
    }

    /// Executions lost when one execution of `step` does not fan out
    pub fn skipped_below<G: StepGraph + ?Sized>(&self, graph: &G, step: &StepId) -> usize {
        graph
            .successors(step)
            .map(|next| {
                next.iter()
                    .fold(0usize, |acc, id| acc.saturating_add(self.runs_from(id)))
            })
            .unwrap_or(0)
    }

    /// Number of distinct steps reachable from the start step
    pub fn reachable_steps(&self) -> usize {
        self.per_step.len()
    }
}

/// Count executions produced by running the graph from `start`
pub fn count_runs<G: StepGraph + ?Sized>(graph: &G, start: &StepId) -> Result<usize, CoreError> {
    RunCounts::compute(graph, start).map(|counts| counts.total())
}

/// Check every listed root for dangling successors and cycles
pub fn check_graph<'a, G, I>(graph: &G, roots: I) -> Result<(), CoreError>
where
    G: StepGraph + ?Sized,
    I: IntoIterator<Item = &'a StepId>,
{
    let mut counter = Counter::new(graph);
    for root in roots {
        if graph.step(root).is_none() {
            return Err(CoreError::StartStepNotFound(root.to_string()));
        }
        counter.visit(root)?;
    }
    Ok(())
}

struct Counter<'g, G: ?Sized> {
    graph: &'g G,
    memo: HashMap<StepId, usize>,
    on_stack: HashSet<StepId>,
}

impl<'g, G: StepGraph + ?Sized> Counter<'g, G> {
    fn new(graph: &'g G) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            on_stack: HashSet::new(),
        }
    }

    fn visit(&mut self, id: &StepId) -> Result<usize, CoreError> {
        if let Some(runs) = self.memo.get(id) {
            return Ok(*runs);
        }
        if !self.on_stack.insert(id.clone()) {
            return Err(CoreError::CycleDetected(id.to_string()));
        }

        let graph = self.graph;
        let successors = graph.successors(id).unwrap_or(&[]);

        let mut runs = 1usize;
        for next in successors {
            if graph.step(next).is_none() {
                return Err(CoreError::UnresolvedSuccessor {
                    step: id.to_string(),
                    successor: next.to_string(),
                });
            }
            runs = runs.saturating_add(self.visit(next)?);
        }

        self.on_stack.remove(id);
        self.memo.insert(id.clone(), runs);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::Step;

    fn graph(steps: Vec<Step>) -> HashMap<StepId, Step> {
        steps.into_iter().map(|s| (s.id.clone(), s)).collect()
    }

    #[test]
    fn test_single_step() {
        let g = graph(vec![Step::new("a", "echo")]);
        assert_eq!(count_runs(&g, &"a".into()).unwrap(), 1);
    }

    #[test]
    fn test_linear_chain() {
        let g = graph(vec![
            Step::new("a", "echo").with_next(["b"]),
            Step::new("b", "echo").with_next(["c"]),
            Step::new("c", "echo"),
        ]);
        assert_eq!(count_runs(&g, &"a".into()).unwrap(), 3);
    }

    #[test]
    fn test_diamond_counts_each_arrival() {
        let g = graph(vec![
            Step::new("a", "echo").with_next(["b", "c"]),
            Step::new("b", "echo").with_next(["d"]),
            Step::new("c", "echo").with_next(["d"]),
            Step::new("d", "echo"),
        ]);
        let counts = RunCounts::compute(&g, &"a".into()).unwrap();
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.runs_from(&"b".into()), 2);
        assert_eq!(counts.reachable_steps(), 4);
        assert_eq!(counts.skipped_below(&g, &"a".into()), 4);
        assert_eq!(counts.skipped_below(&g, &"d".into()), 0);
    }

    #[test]
    fn test_repeated_edges() {
        // test1 -> [test2, test2], test2 -> [test3, test3, final],
        // test3 -> [test4 x3], test4 -> [final, final]
        let g = graph(vec![
            Step::new("test1", "echo").with_next(["test2", "test2"]),
            Step::new("test2", "echo").with_next(["test3", "test3", "final"]),
            Step::new("test3", "echo").with_next(["test4", "test4", "test4"]),
            Step::new("test4", "echo").with_next(["final", "final"]),
            Step::new("final", "echo"),
        ]);
        // test4 = 3, test3 = 10, test2 = 22, test1 = 45
        assert_eq!(count_runs(&g, &"test1".into()).unwrap(), 45);
    }

    #[test]
    fn test_unknown_start() {
        let g = graph(vec![Step::new("a", "echo")]);
        assert_eq!(
            count_runs(&g, &"nope".into()),
            Err(CoreError::StartStepNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_unknown_successor() {
        let g = graph(vec![Step::new("a", "echo").with_next(["ghost"])]);
        assert_eq!(
            count_runs(&g, &"a".into()),
            Err(CoreError::UnresolvedSuccessor {
                step: "a".to_string(),
                successor: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn test_cycle_detected() {
        let g = graph(vec![
            Step::new("a", "echo").with_next(["b"]),
            Step::new("b", "echo").with_next(["c"]),
            Step::new("c", "echo").with_next(["a"]),
        ]);
        assert!(matches!(
            count_runs(&g, &"a".into()),
            Err(CoreError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_self_loop_detected() {
        let g = graph(vec![Step::new("a", "echo").with_next(["a"])]);
        assert_eq!(
            count_runs(&g, &"a".into()),
            Err(CoreError::CycleDetected("a".to_string()))
        );
    }

    #[test]
    fn test_check_graph_covers_unreachable_steps() {
        let g = graph(vec![
            Step::new("a", "echo"),
            Step::new("x", "echo").with_next(["x"]),
        ]);
        let roots = [StepId::from("a"), StepId::from("x")];
        assert!(check_graph(&g, roots.iter()).is_err());
    }
}
