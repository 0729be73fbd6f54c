//! Wave Scheduler (C6) — Kahn's topological sort by level (spec.md §4.1).
//!
//! No direct teacher precedent (the coordination crate has no DAG
//! scheduler); this is new code following the spec's level-by-level Kahn
//! algorithm directly.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::plan::{ExecutionPlan, TaskId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("plan contains a cycle involving tasks: {0:?}")]
    Cycle(Vec<TaskId>),
}

/// One wave: a set of tasks that may execute concurrently, in the input
/// order (spec.md §4.1, "order within a wave is the input order, stable").
pub type Wave = Vec<TaskId>;

/// `schedule(tasks) -> waves[]` (spec.md §4.1).
///
/// Unknown dependency ids (referencing a task not present in the plan) are
/// silently ignored, per spec.md §9's open question 1 — preserved as-is,
/// with a `tracing::warn!` added so the behavior is at least observable.
pub fn schedule(plan: &ExecutionPlan) -> Result<Vec<Wave>, ScheduleError> {
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    let known_ids: HashSet<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in &plan.tasks {
        in_degree.entry(task.id.as_str()).or_insert(0);
        for dep in &task.depends_on {
            if !known_ids.contains(dep.as_str()) {
                tracing::warn!(
                    task_id = %task.id,
                    unknown_dependency = %dep,
                    "ignoring dependency on unknown task id"
                );
                continue;
            }
            *in_degree.entry(task.id.as_str()).or_insert(0) += 1;
            dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut waves = Vec::new();
    let mut remaining: HashSet<&str> = known_ids.clone();
    let mut frontier: VecDeque<&str> = plan
        .tasks
        .iter()
        .map(|t| t.id.as_str())
        .filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0)
        .collect();

    while !frontier.is_empty() {
        // Stable input order within the wave.
        let mut wave_ids: Vec<&str> = frontier.drain(..).collect();
        wave_ids.sort_by_key(|id| plan.tasks.iter().position(|t| t.id == *id).unwrap());

        for id in &wave_ids {
            remaining.remove(id);
        }

        let mut next_frontier_set = HashSet::new();
        for id in &wave_ids {
            if let Some(deps) = dependents.get(id) {
                for dependent in deps {
                    let deg = in_degree.get_mut(dependent).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        next_frontier_set.insert(*dependent);
                    }
                }
            }
        }

        waves.push(wave_ids.into_iter().map(String::from).collect());
        frontier = next_frontier_set.into_iter().collect();
    }

    if !remaining.is_empty() {
        let mut cycle_members: Vec<TaskId> = remaining.into_iter().map(String::from).collect();
        cycle_members.sort();
        return Err(ScheduleError::Cycle(cycle_members));
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AgentId, ExecutionPlanTask};

    fn task(id: &str, deps: &[&str]) -> ExecutionPlanTask {
        ExecutionPlanTask::new(id, AgentId::Scaffold, "goal").depends_on(deps.to_vec())
    }

    #[test]
    fn empty_plan_yields_empty_waves() {
        let plan = ExecutionPlan::new(vec![]);
        assert_eq!(schedule(&plan).unwrap(), Vec::<Vec<String>>::new());
    }

    #[test]
    fn linear_plan_one_task_per_wave() {
        let plan = ExecutionPlan::new(vec![task("a", &[]), task("b", &["a"])]);
        let waves = schedule(&plan).unwrap();
        assert_eq!(waves, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn diamond_plan_matches_scenario_2() {
        // scaffold -> {page, state} -> interaction (spec.md §8 Scenario 2).
        let plan = ExecutionPlan::new(vec![
            task("scaffold", &[]),
            task("page", &["scaffold"]),
            task("state", &["scaffold"]),
            task("interaction", &["page", "state"]),
        ]);
        let waves = schedule(&plan).unwrap();
        assert_eq!(
            waves,
            vec![
                vec!["scaffold".to_string()],
                vec!["page".to_string(), "state".to_string()],
                vec!["interaction".to_string()],
            ]
        );
    }

    #[test]
    fn cycle_reports_all_cycle_members() {
        let plan = ExecutionPlan::new(vec![task("a", &["b"]), task("b", &["a"])]);
        let err = schedule(&plan).unwrap_err();
        match err {
            ScheduleError::Cycle(mut ids) => {
                ids.sort();
                assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
            }
        }
    }

    #[test]
    fn unknown_dependency_is_ignored() {
        let plan = ExecutionPlan::new(vec![task("a", &["ghost"])]);
        let waves = schedule(&plan).unwrap();
        assert_eq!(waves, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn scheduling_soundness_invariant() {
        let plan = ExecutionPlan::new(vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["b"]),
        ]);
        let waves = schedule(&plan).unwrap();
        let wave_of = |id: &str| waves.iter().position(|w| w.contains(&id.to_string())).unwrap();
        assert!(wave_of("a") < wave_of("b"));
        assert!(wave_of("b") < wave_of("c"));
    }
}
