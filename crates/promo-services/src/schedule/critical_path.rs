//! Critical path method over a project's phase or task network
//!
//! Offsets are working days from the schedule anchor (project start, else
//! the earliest node start). Durations are working days in `[start, end)`,
//! so finish offsets and finish dates are exclusive.

use std::collections::HashMap;

use chrono::NaiveDate;
use promo_contracts::dependencies::{DependencyGraph, Edge};
use promo_core::calendar::WorkingCalendar;
use promo_core::error::StructuralError;
use promo_core::traits::{Id, Identifiable, Schedulable};
use promo_models::dependency::Dependency;
use promo_models::project::Project;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// One schedulable node reduced to what the passes need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleNode {
    pub id: Id,
    pub duration: i64,
    /// Offset of the node's own start date, used when it has no prerequisite
    pub own_start: Option<i64>,
}

/// Nodes plus the validated dependency graph between them
#[derive(Debug, Clone, Default)]
pub struct ScheduleNetwork {
    nodes: HashMap<Id, ScheduleNode>,
    graph: DependencyGraph,
}

impl ScheduleNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ScheduleNode) {
        self.graph.add_node(node.id);
        self.nodes.insert(node.id, node);
    }

    /// Adds the edge when both ends are known nodes; returns whether it was kept.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.nodes.contains_key(&edge.prerequisite) || !self.nodes.contains_key(&edge.dependent)
        {
            warn!(
                prerequisite = edge.prerequisite,
                dependent = edge.dependent,
                "dependency references an unknown node, skipped"
            );
            return false;
        }
        self.graph.add_edge(edge);
        true
    }

    /// Build from dated items; returns the network and the anchor used.
    pub fn from_schedulables<T: Schedulable, N>(
        items: &[T],
        dependencies: &[Dependency<N>],
        calendar: &WorkingCalendar,
        anchor: Option<NaiveDate>,
    ) -> (Self, Option<NaiveDate>) {
        let anchor = anchor.or_else(|| items.iter().filter_map(|i| i.start_date()).min());
        let mut network = Self::new();
        for item in items {
            let duration = match (item.start_date(), item.end_date()) {
                (Some(start), Some(end)) => calendar.working_days_between(start, end).max(0),
                _ => 0,
            };
            let own_start = match (anchor, item.start_date()) {
                (Some(anchor), Some(start)) => Some(calendar.working_days_between(anchor, start)),
                _ => None,
            };
            network.add_node(ScheduleNode {
                id: item.id(),
                duration,
                own_start,
            });
        }
        for dep in dependencies {
            network.add_edge(Edge::from(dep));
        }
        (network, anchor)
    }

    pub fn node(&self, id: Id) -> Option<&ScheduleNode> {
        self.nodes.get(&id)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Per-node CPM figures; dates are present only when the schedule has an anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSchedule {
    pub id: Id,
    pub duration: i64,
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
    pub float: i64,
    pub is_critical: bool,
    pub earliest_start_date: Option<NaiveDate>,
    pub earliest_finish_date: Option<NaiveDate>,
    pub latest_start_date: Option<NaiveDate>,
    pub latest_finish_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    pub id: Id,
    /// Working days between the node's earliest finish and the deadline
    pub margin_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPathAnalysis {
    pub anchor: Option<NaiveDate>,
    /// In topological order
    pub nodes: Vec<NodeSchedule>,
    /// Longest chain of critical nodes, prerequisite first
    pub critical_path: Vec<Id>,
    pub critical_path_duration: i64,
    /// Latest earliest-finish in the network
    pub network_finish: i64,
    pub network_finish_date: Option<NaiveDate>,
    pub bottlenecks: Vec<Bottleneck>,
}

impl CriticalPathAnalysis {
    pub fn node(&self, id: Id) -> Option<&NodeSchedule> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn critical_nodes(&self) -> impl Iterator<Item = &NodeSchedule> {
        self.nodes.iter().filter(|n| n.is_critical)
    }
}

/// Offsets handed to the backward pass and the bottleneck search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassBounds {
    /// Seeds latest finishes; defaults to the network finish
    pub target_finish: Option<i64>,
    /// Deadline for bottleneck margins; defaults to the seed
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CriticalPathCalculator {
    calendar: WorkingCalendar,
}

impl CriticalPathCalculator {
    pub fn new(calendar: WorkingCalendar) -> Self {
        Self { calendar }
    }

    /// Phase network of a project, seeded with the project's target end
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn analyze_phases(
        &self,
        project: &Project,
        deadline: Option<NaiveDate>,
    ) -> Result<CriticalPathAnalysis, StructuralError> {
        let (network, anchor) = ScheduleNetwork::from_schedulables(
            &project.phases,
            &project.phase_dependencies,
            &self.calendar,
            project.start_date,
        );
        self.analyze_network(&network, anchor, project.end_date, deadline)
    }

    /// Task network of a project, across all phases
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub fn analyze_tasks(
        &self,
        project: &Project,
        deadline: Option<NaiveDate>,
    ) -> Result<CriticalPathAnalysis, StructuralError> {
        let tasks: Vec<_> = project.tasks().cloned().collect();
        let (network, anchor) = ScheduleNetwork::from_schedulables(
            &tasks,
            &project.task_dependencies,
            &self.calendar,
            project.start_date,
        );
        self.analyze_network(&network, anchor, project.end_date, deadline)
    }

    /// Run both passes and attach calendar dates when an anchor is known
    pub fn analyze_network(
        &self,
        network: &ScheduleNetwork,
        anchor: Option<NaiveDate>,
        target_end: Option<NaiveDate>,
        deadline: Option<NaiveDate>,
    ) -> Result<CriticalPathAnalysis, StructuralError> {
        let to_offset = |date: Option<NaiveDate>| match (anchor, date) {
            (Some(anchor), Some(date)) => Some(self.calendar.working_days_between(anchor, date)),
            _ => None,
        };
        let bounds = PassBounds {
            target_finish: to_offset(target_end),
            deadline: to_offset(deadline),
        };

        let mut analysis = self.compute(network, bounds)?;
        if let Some(anchor) = anchor {
            let date = |offset: i64| Some(self.calendar.date_at(anchor, offset));
            for node in &mut analysis.nodes {
                node.earliest_start_date = date(node.earliest_start);
                node.earliest_finish_date = date(node.earliest_finish);
                node.latest_start_date = date(node.latest_start);
                node.latest_finish_date = date(node.latest_finish);
            }
            analysis.network_finish_date = date(analysis.network_finish);
        }
        analysis.anchor = anchor;
        Ok(analysis)
    }

    /// Forward and backward pass on offsets only
    pub fn compute(
        &self,
        network: &ScheduleNetwork,
        bounds: PassBounds,
    ) -> Result<CriticalPathAnalysis, StructuralError> {
        let graph = network.graph();
        let order = graph.topological_order()?;
        let duration = |id: Id| network.node(id).map_or(0, |n| n.duration);

        // Forward pass
        let mut es: HashMap<Id, i64> = HashMap::with_capacity(order.len());
        let mut ef: HashMap<Id, i64> = HashMap::with_capacity(order.len());
        for &id in &order {
            let dur = duration(id);
            let start = graph
                .predecessors(id)
                .map(|edge| forward_constraint(edge, es[&edge.prerequisite], ef[&edge.prerequisite], dur))
                .max()
                .or_else(|| network.node(id).and_then(|n| n.own_start))
                .unwrap_or(0)
                .max(0);
            es.insert(id, start);
            ef.insert(id, start + dur);
        }

        let network_finish = ef.values().copied().max().unwrap_or(0);
        let seed = bounds.target_finish.unwrap_or(network_finish);

        // Backward pass
        let mut ls: HashMap<Id, i64> = HashMap::with_capacity(order.len());
        let mut lf: HashMap<Id, i64> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let dur = duration(id);
            let finish = graph
                .successors(id)
                .map(|edge| backward_constraint(edge, ls[&edge.dependent], lf[&edge.dependent], dur))
                .fold(seed, i64::min);
            lf.insert(id, finish);
            ls.insert(id, finish - dur);
        }

        let min_float = order
            .iter()
            .map(|id| ls[id] - es[id])
            .min()
            .unwrap_or(0);

        let nodes: Vec<NodeSchedule> = order
            .iter()
            .map(|&id| {
                let float = ls[&id] - es[&id];
                NodeSchedule {
                    id,
                    duration: duration(id),
                    earliest_start: es[&id],
                    earliest_finish: ef[&id],
                    latest_start: ls[&id],
                    latest_finish: lf[&id],
                    float,
                    is_critical: float == min_float,
                    earliest_start_date: None,
                    earliest_finish_date: None,
                    latest_start_date: None,
                    latest_finish_date: None,
                }
            })
            .collect();

        let (critical_path, critical_path_duration) = longest_critical_chain(graph, &order, &nodes, &es, &ef);

        let deadline = bounds.deadline.unwrap_or(seed);
        let bottlenecks = bottlenecks(&nodes, deadline);

        debug!(
            nodes = nodes.len(),
            network_finish,
            critical_path_duration,
            min_float,
            "critical path computed"
        );

        Ok(CriticalPathAnalysis {
            anchor: None,
            nodes,
            critical_path,
            critical_path_duration,
            network_finish,
            network_finish_date: None,
            bottlenecks,
        })
    }
}

/// Earliest start the edge allows for its dependent
fn forward_constraint(edge: &Edge, pre_es: i64, pre_ef: i64, dep_duration: i64) -> i64 {
    let kind = edge.dependency_type;
    let reference = if kind.from_prerequisite_finish() { pre_ef } else { pre_es };
    let bound = reference + i64::from(edge.lag_days);
    if kind.constrains_dependent_finish() {
        bound - dep_duration
    } else {
        bound
    }
}

/// Latest finish the edge allows for its prerequisite
fn backward_constraint(edge: &Edge, dep_ls: i64, dep_lf: i64, pre_duration: i64) -> i64 {
    let kind = edge.dependency_type;
    let reference = if kind.constrains_dependent_finish() { dep_lf } else { dep_ls };
    let bound = reference - i64::from(edge.lag_days);
    if kind.from_prerequisite_finish() {
        bound
    } else {
        bound + pre_duration
    }
}

/// Longest duration chain through critical nodes joined by driving edges.
///
/// An edge drives its dependent when it alone fixes the dependent's
/// earliest start. A critical node with no driving critical prerequisite
/// starts a chain of its own.
fn longest_critical_chain(
    graph: &DependencyGraph,
    order: &[Id],
    nodes: &[NodeSchedule],
    es: &HashMap<Id, i64>,
    ef: &HashMap<Id, i64>,
) -> (Vec<Id>, i64) {
    let by_id: HashMap<Id, &NodeSchedule> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut best: HashMap<Id, i64> = HashMap::new();
    let mut parent: HashMap<Id, Id> = HashMap::new();

    for &id in order {
        let node = by_id[&id];
        if !node.is_critical {
            continue;
        }
        let mut length = node.duration;
        for edge in graph.predecessors(id) {
            let Some(&prior) = best.get(&edge.prerequisite) else {
                continue;
            };
            let driving = forward_constraint(edge, es[&edge.prerequisite], ef[&edge.prerequisite], node.duration)
                == es[&id];
            if driving && prior + node.duration > length {
                length = prior + node.duration;
                parent.insert(id, edge.prerequisite);
            }
        }
        best.insert(id, length);
    }

    let Some((&end, &length)) = order
        .iter()
        .filter_map(|id| best.get_key_value(id))
        .fold(None, |acc: Option<(&Id, &i64)>, (id, len)| match acc {
            Some((_, best_len)) if best_len >= len => acc,
            _ => Some((id, len)),
        })
    else {
        return (Vec::new(), 0);
    };

    let mut path = vec![end];
    let mut cursor = end;
    while let Some(&p) = parent.get(&cursor) {
        path.push(p);
        cursor = p;
    }
    path.reverse();
    (path, length)
}

fn bottlenecks(nodes: &[NodeSchedule], deadline: i64) -> Vec<Bottleneck> {
    let margins: Vec<Bottleneck> = nodes
        .iter()
        .filter(|n| n.is_critical)
        .map(|n| Bottleneck {
            id: n.id,
            margin_days: deadline - n.earliest_finish,
        })
        .collect();
    let Some(smallest) = margins.iter().map(|b| b.margin_days).min() else {
        return Vec::new();
    };
    margins
        .into_iter()
        .filter(|b| b.margin_days == smallest)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::dependency::{DependencyType, PhaseDependency};
    use promo_models::phase::Phase;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn network(nodes: &[(Id, i64)], edges: &[Edge]) -> ScheduleNetwork {
        let mut network = ScheduleNetwork::new();
        for &(id, duration) in nodes {
            network.add_node(ScheduleNode {
                id,
                duration,
                own_start: None,
            });
        }
        for &edge in edges {
            network.add_edge(edge);
        }
        network
    }

    fn typed(p: Id, d: Id, t: DependencyType, lag: u32) -> Edge {
        Edge {
            prerequisite: p,
            dependent: d,
            dependency_type: t,
            lag_days: lag,
        }
    }

    #[test]
    fn test_linear_chain_is_fully_critical() {
        let net = network(
            &[(1, 5), (2, 3), (3, 7)],
            &[Edge::new(1, 2), Edge::new(2, 3)],
        );
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        assert_eq!(cpm.critical_path_duration, 15);
        assert_eq!(cpm.critical_path, vec![1, 2, 3]);
        assert!(cpm.nodes.iter().all(|n| n.float == 0 && n.is_critical));
        assert_eq!(cpm.node(3).unwrap().earliest_start, 8);
    }

    #[test]
    fn test_parallel_branch_has_float() {
        // 1 -> 2 (10) -> 4, 1 -> 3 (4) -> 4
        let net = network(
            &[(1, 2), (2, 10), (3, 4), (4, 1)],
            &[Edge::new(1, 2), Edge::new(1, 3), Edge::new(2, 4), Edge::new(3, 4)],
        );
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        assert_eq!(cpm.node(3).unwrap().float, 6);
        assert!(!cpm.node(3).unwrap().is_critical);
        assert_eq!(cpm.critical_path, vec![1, 2, 4]);
        assert_eq!(cpm.critical_path_duration, 13);
        assert_eq!(cpm.network_finish, 13);
    }

    #[test]
    fn test_lag_pushes_dependent() {
        let net = network(&[(1, 5), (2, 5)], &[typed(1, 2, DependencyType::FinishToStart, 3)]);
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        assert_eq!(cpm.node(2).unwrap().earliest_start, 8);
        assert_eq!(cpm.network_finish, 13);
    }

    #[test]
    fn test_start_to_start_overlaps() {
        let net = network(&[(1, 10), (2, 4)], &[typed(1, 2, DependencyType::StartToStart, 2)]);
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        let second = cpm.node(2).unwrap();
        assert_eq!(second.earliest_start, 2);
        assert_eq!(second.earliest_finish, 6);
        assert_eq!(second.float, 4);
        assert!(cpm.node(1).unwrap().is_critical);
    }

    #[test]
    fn test_finish_to_finish_aligns_finishes() {
        let net = network(&[(1, 10), (2, 4)], &[typed(1, 2, DependencyType::FinishToFinish, 0)]);
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        let second = cpm.node(2).unwrap();
        assert_eq!(second.earliest_start, 6);
        assert_eq!(second.earliest_finish, 10);
        assert_eq!(second.float, 0);
    }

    #[test]
    fn test_start_to_finish_gates_dependent_finish_on_prerequisite_start() {
        // prerequisite starts at 10; dependent (4 days) may finish no earlier than 10 + 1
        let mut net = ScheduleNetwork::new();
        net.add_node(ScheduleNode { id: 1, duration: 5, own_start: Some(10) });
        net.add_node(ScheduleNode { id: 2, duration: 4, own_start: None });
        net.add_edge(typed(1, 2, DependencyType::StartToFinish, 1));
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        let second = cpm.node(2).unwrap();
        assert_eq!(second.earliest_start, 7);
        assert_eq!(second.earliest_finish, 11);

        // the same pair as finish-to-start would start after 15 + 1
        let mut fs = ScheduleNetwork::new();
        fs.add_node(ScheduleNode { id: 1, duration: 5, own_start: Some(10) });
        fs.add_node(ScheduleNode { id: 2, duration: 4, own_start: None });
        fs.add_edge(typed(1, 2, DependencyType::FinishToStart, 1));
        let cpm = CriticalPathCalculator::default()
            .compute(&fs, PassBounds::default())
            .unwrap();
        assert_eq!(cpm.node(2).unwrap().earliest_start, 16);
    }

    #[test]
    fn test_backward_pass_honours_start_to_finish() {
        // 1 -SF-> 2: LS(1) <= LF(2) - lag
        let mut net = ScheduleNetwork::new();
        net.add_node(ScheduleNode { id: 1, duration: 5, own_start: Some(10) });
        net.add_node(ScheduleNode { id: 2, duration: 4, own_start: None });
        net.add_edge(typed(1, 2, DependencyType::StartToFinish, 1));
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        // network finish = 15 (node 1); LF(2) = 15, LS(1) <= 14 but also LF(1) = 15 -> LS 10
        let first = cpm.node(1).unwrap();
        assert_eq!(first.latest_start, 10);
        assert_eq!(first.float, 0);
        let second = cpm.node(2).unwrap();
        assert_eq!(second.latest_finish, 15);
        assert_eq!(second.float, 4);
    }

    #[test]
    fn test_isolated_node_forms_its_own_path() {
        let net = network(&[(1, 4)], &[]);
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap();
        assert_eq!(cpm.critical_path, vec![1]);
        assert_eq!(cpm.critical_path_duration, 4);
        assert!(cpm.node(1).unwrap().is_critical);
    }

    #[test]
    fn test_target_finish_seeds_backward_pass() {
        let net = network(&[(1, 5), (2, 5)], &[Edge::new(1, 2)]);
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds { target_finish: Some(12), deadline: None })
            .unwrap();
        assert!(cpm.nodes.iter().all(|n| n.float == 2 && n.is_critical));

        let late = CriticalPathCalculator::default()
            .compute(&net, PassBounds { target_finish: Some(8), deadline: None })
            .unwrap();
        assert!(late.nodes.iter().all(|n| n.float == -2));
    }

    #[test]
    fn test_bottleneck_has_smallest_margin() {
        let net = network(
            &[(1, 3), (2, 3), (3, 2)],
            &[Edge::new(1, 2), Edge::new(2, 3)],
        );
        let cpm = CriticalPathCalculator::default()
            .compute(&net, PassBounds { target_finish: None, deadline: Some(10) })
            .unwrap();
        assert_eq!(cpm.bottlenecks, vec![Bottleneck { id: 3, margin_days: 2 }]);
    }

    #[test]
    fn test_unknown_dependency_endpoints_are_skipped() {
        let mut net = network(&[(1, 2)], &[]);
        assert!(!net.add_edge(Edge::new(1, 99)));
        assert_eq!(net.graph().edge_count(), 0);
    }

    #[test]
    fn test_cyclic_input_is_reported() {
        let net = network(&[(1, 1), (2, 1)], &[Edge::new(1, 2), Edge::new(2, 1)]);
        let err = CriticalPathCalculator::default()
            .compute(&net, PassBounds::default())
            .unwrap_err();
        assert!(matches!(err, StructuralError::CyclicGraph { .. }));
    }

    #[test]
    fn test_phases_on_calendar_dates() {
        // Mon 2024-01-01 .. Fri 2024-01-05 (4 working days), then 5 more
        let mut project = Project::new(1, "Le Clos").with_dates(d(2024, 1, 1), d(2024, 1, 31));
        project.phases = vec![
            Phase::new(1, 1, "Études", 1).with_dates(d(2024, 1, 1), d(2024, 1, 5)),
            Phase::new(2, 1, "Permis", 2).with_dates(d(2024, 1, 8), d(2024, 1, 15)),
        ];
        project.phase_dependencies = vec![PhaseDependency::new(1, 2)];

        let cpm = CriticalPathCalculator::default()
            .analyze_phases(&project, None)
            .unwrap();
        let permits = cpm.node(2).unwrap();
        assert_eq!(permits.duration, 5);
        assert_eq!(permits.earliest_start, 4);
        // offset 4 from Monday is Friday the 5th: the chained phase could start earlier
        assert_eq!(permits.earliest_start_date, Some(d(2024, 1, 5)));
        assert_eq!(cpm.network_finish, 9);
        assert_eq!(cpm.network_finish_date, Some(d(2024, 1, 12)));
        // target end (22 working days) leaves slack on the chain
        assert!(cpm.nodes.iter().all(|n| n.float == 13));
    }

    #[test]
    fn test_missing_dates_mean_zero_duration() {
        let mut project = Project::new(1, "Sans dates");
        project.phases = vec![Phase::new(1, 1, "Inconnue", 1)];
        let cpm = CriticalPathCalculator::default()
            .analyze_phases(&project, None)
            .unwrap();
        assert_eq!(cpm.anchor, None);
        assert_eq!(cpm.node(1).unwrap().duration, 0);
        assert_eq!(cpm.node(1).unwrap().earliest_start_date, None);
    }
}
