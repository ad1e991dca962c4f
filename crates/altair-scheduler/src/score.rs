use crate::types::SchedulingContext;
use altair_core::{Node, ResourceQuantities, ScoredNode};
use tracing::debug;

/// Scoring function trait. Scores are bounded to [0, 1], higher is better.
pub trait ScoreFunction: Send + Sync {
    /// Score a node for the given pod
    fn score(&self, context: &SchedulingContext, node: &Node) -> f64;

    /// Name of the scoring function
    fn name(&self) -> &str;
}

fn allocatable(node: &Node) -> ResourceQuantities {
    node.status
        .as_ref()
        .and_then(|s| s.allocatable.as_ref())
        .map(ResourceQuantities::from_quantity_map)
        .unwrap_or_default()
}

/// Score per-container CPU fit: +1 when the request fits the node's
/// allocatable CPU, −0.5 when it exceeds it, averaged over containers
pub struct ResourceFit;

impl ScoreFunction for ResourceFit {
    fn score(&self, context: &SchedulingContext, node: &Node) -> f64 {
        let Some(spec) = &context.pod.spec else {
            return 0.0;
        };
        if spec.containers.is_empty() {
            return 0.0;
        }

        let node_resources = allocatable(node);
        if node_resources.cpu_millicores == 0 {
            return 0.0;
        }

        let mut total = 0.0;
        for container in &spec.containers {
            let request_cpu = container
                .resources
                .as_ref()
                .and_then(|r| r.requests.as_ref())
                .and_then(|req| req.get("cpu"))
                .and_then(|q| ResourceQuantities::parse_cpu(&q.0).ok())
                .unwrap_or(0);

            if request_cpu <= node_resources.cpu_millicores {
                total += 1.0;
            } else {
                total -= 0.5;
            }
        }

        (total / spec.containers.len() as f64).clamp(0.0, 1.0)
    }

    fn name(&self) -> &str {
        "ResourceFit"
    }
}

/// Prefer less utilized nodes. Usage is read from the node's capacity field
/// against its allocatable field, averaged over CPU and memory.
pub struct LeastUtilized;

impl ScoreFunction for LeastUtilized {
    fn score(&self, _context: &SchedulingContext, node: &Node) -> f64 {
        let alloc = allocatable(node);
        let used = node
            .status
            .as_ref()
            .and_then(|s| s.capacity.as_ref())
            .map(ResourceQuantities::from_quantity_map)
            .unwrap_or_default();

        // A zero allocatable denominator counts as fully utilized
        let cpu_fraction = if alloc.cpu_millicores > 0 {
            used.cpu_millicores as f64 / alloc.cpu_millicores as f64
        } else {
            1.0
        };
        let memory_fraction = if alloc.memory_bytes > 0 {
            used.memory_bytes as f64 / alloc.memory_bytes as f64
        } else {
            1.0
        };

        let score = 1.0 - ((cpu_fraction + memory_fraction) / 2.0).min(1.0);

        debug!(
            "Node {} utilization score {:.3} (cpu {:.3}, memory {:.3})",
            node.metadata.name.as_deref().unwrap_or("unknown"),
            score,
            cpu_fraction,
            memory_fraction
        );

        score
    }

    fn name(&self) -> &str {
        "LeastUtilized"
    }
}

/// Soft node-selector affinity: 1.0 when every selector label matches the
/// node (or no selector is declared), 0.0 otherwise
pub struct SelectorAffinity;

impl ScoreFunction for SelectorAffinity {
    fn score(&self, context: &SchedulingContext, node: &Node) -> f64 {
        let Some(selector) = context
            .pod
            .spec
            .as_ref()
            .and_then(|s| s.node_selector.as_ref())
        else {
            return 1.0;
        };

        let labels = node.metadata.labels.as_ref();

        for (key, value) in selector {
            if labels.and_then(|l| l.get(key)) != Some(value) {
                return 0.0;
            }
        }

        1.0
    }

    fn name(&self) -> &str {
        "SelectorAffinity"
    }
}

/// Penalize unhealthy nodes based on their reported conditions
pub struct NodeStability;

impl ScoreFunction for NodeStability {
    fn score(&self, _context: &SchedulingContext, node: &Node) -> f64 {
        let mut score: f64 = 1.0;

        if let Some(conditions) = node.status.as_ref().and_then(|s| s.conditions.as_ref()) {
            for condition in conditions {
                match condition.type_.as_str() {
                    "Ready" => {
                        if condition.status != "True" {
                            score -= 0.5;
                        }
                    }
                    "DiskPressure" => {
                        if condition.status == "True" {
                            score -= 0.3;
                        }
                    }
                    "MemoryPressure" => {
                        if condition.status == "True" {
                            score -= 0.2;
                        }
                    }
                    _ => {}
                }
            }
        }

        score.max(0.0)
    }

    fn name(&self) -> &str {
        "NodeStability"
    }
}

/// Default scoring functions
pub fn default_scorers() -> Vec<Box<dyn ScoreFunction>> {
    vec![
        Box::new(ResourceFit),
        Box::new(LeastUtilized),
        Box::new(SelectorAffinity),
        Box::new(NodeStability),
    ]
}

/// Composite score: the unweighted mean of every scoring function
pub fn composite_score(
    scorers: &[Box<dyn ScoreFunction>],
    context: &SchedulingContext,
    node: &Node,
) -> f64 {
    if scorers.is_empty() {
        return 0.0;
    }

    let total: f64 = scorers.iter().map(|s| s.score(context, node)).sum();
    total / scorers.len() as f64
}

/// Score every candidate, preserving input order
pub fn score_candidates(
    scorers: &[Box<dyn ScoreFunction>],
    context: &SchedulingContext,
    nodes: Vec<Node>,
) -> Vec<ScoredNode> {
    nodes
        .into_iter()
        .map(|node| {
            let score = composite_score(scorers, context, &node);
            debug!(
                "Node {} composite score {:.3}",
                node.metadata.name.as_deref().unwrap_or("unknown"),
                score
            );
            ScoredNode { node, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use altair_core::{Pod, RankedSet};
    use k8s_openapi::api::core::v1::{
        Container, NodeCondition, NodeStatus, PodSpec, ResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        let mut map = BTreeMap::new();
        map.insert("cpu".to_string(), Quantity(cpu.to_string()));
        map.insert("memory".to_string(), Quantity(memory.to_string()));
        map
    }

    fn create_test_node(name: &str, allocatable: (&str, &str), capacity: (&str, &str)) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        node.status = Some(NodeStatus {
            allocatable: Some(quantities(allocatable.0, allocatable.1)),
            capacity: Some(quantities(capacity.0, capacity.1)),
            ..Default::default()
        });
        node
    }

    fn create_test_pod(cpu: &str, memory: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some("test-pod".to_string());
        pod.spec = Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(quantities(cpu, memory)),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        });
        pod
    }

    fn with_condition(mut node: Node, type_: &str, status: &str) -> Node {
        node.status
            .get_or_insert_with(Default::default)
            .conditions
            .get_or_insert_with(Vec::new)
            .push(NodeCondition {
                type_: type_.to_string(),
                status: status.to_string(),
                ..Default::default()
            });
        node
    }

    #[test]
    fn test_resource_fit_bounds() {
        let node = create_test_node("n", ("2", "4Gi"), ("0", "0"));
        let fitting = create_test_pod("1", "1Gi");
        let oversized = create_test_pod("4", "1Gi");

        let fit = ResourceFit.score(&SchedulingContext::new(fitting), &node);
        assert!((fit - 1.0).abs() < f64::EPSILON);

        // A single over-requesting container scores −0.5, clamped to 0
        let unfit = ResourceFit.score(&SchedulingContext::new(oversized), &node);
        assert!(unfit.abs() < f64::EPSILON);
    }

    #[test]
    fn test_resource_fit_zero_without_containers_or_cpu() {
        let node = create_test_node("n", ("2", "4Gi"), ("0", "0"));
        let empty_pod = Pod {
            spec: Some(PodSpec::default()),
            ..Default::default()
        };
        assert_eq!(ResourceFit.score(&SchedulingContext::new(empty_pod), &node), 0.0);

        let no_cpu_node = create_test_node("n2", ("0", "4Gi"), ("0", "0"));
        let pod = create_test_pod("1", "1Gi");
        assert_eq!(
            ResourceFit.score(&SchedulingContext::new(pod), &no_cpu_node),
            0.0
        );
    }

    #[test]
    fn test_least_utilized() {
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        // Half the CPU and half the memory in use
        let half = create_test_node("half", ("4", "8Gi"), ("2", "4Gi"));
        let score = LeastUtilized.score(&context, &half);
        assert!((score - 0.5).abs() < 1e-9);

        // Fully used caps at zero
        let full = create_test_node("full", ("2", "2Gi"), ("4", "8Gi"));
        assert!(LeastUtilized.score(&context, &full).abs() < 1e-9);
    }

    #[test]
    fn test_selector_affinity_all_or_nothing() {
        let mut pod = create_test_pod("1", "1Gi");
        let mut selector = BTreeMap::new();
        selector.insert("disk".to_string(), "ssd".to_string());
        pod.spec.as_mut().unwrap().node_selector = Some(selector);
        let context = SchedulingContext::new(pod);

        let mut matching = create_test_node("m", ("4", "8Gi"), ("0", "0"));
        let mut labels = BTreeMap::new();
        labels.insert("disk".to_string(), "ssd".to_string());
        matching.metadata.labels = Some(labels);

        let mismatched = create_test_node("x", ("4", "8Gi"), ("0", "0"));

        assert_eq!(SelectorAffinity.score(&context, &matching), 1.0);
        assert_eq!(SelectorAffinity.score(&context, &mismatched), 0.0);
    }

    #[test]
    fn test_stability_deductions() {
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        let healthy = with_condition(
            create_test_node("h", ("4", "8Gi"), ("0", "0")),
            "Ready",
            "True",
        );
        assert_eq!(NodeStability.score(&context, &healthy), 1.0);

        let not_ready = with_condition(
            create_test_node("nr", ("4", "8Gi"), ("0", "0")),
            "Ready",
            "False",
        );
        assert!((NodeStability.score(&context, &not_ready) - 0.5).abs() < 1e-9);

        let pressured = with_condition(
            with_condition(
                with_condition(
                    create_test_node("p", ("4", "8Gi"), ("0", "0")),
                    "Ready",
                    "False",
                ),
                "DiskPressure",
                "True",
            ),
            "MemoryPressure",
            "True",
        );
        // 1.0 − 0.5 − 0.3 − 0.2 floors at 0
        assert_eq!(NodeStability.score(&context, &pressured), 0.0);
    }

    #[test]
    fn test_every_sub_score_in_unit_interval() {
        let scorers = default_scorers();
        let context = SchedulingContext::new(create_test_pod("8", "32Gi"));
        let nodes = vec![
            create_test_node("a", ("0", "0"), ("0", "0")),
            with_condition(
                create_test_node("b", ("1", "1Gi"), ("9", "9Gi")),
                "Ready",
                "False",
            ),
            create_test_node("c", ("16", "64Gi"), ("1", "1Gi")),
        ];

        for node in &nodes {
            for scorer in &scorers {
                let s = scorer.score(&context, node);
                assert!((0.0..=1.0).contains(&s), "{} out of bounds: {}", scorer.name(), s);
            }
            let composite = composite_score(&scorers, &context, node);
            assert!((0.0..=1.0).contains(&composite));
        }
    }

    #[test]
    fn test_composite_is_unweighted_mean() {
        let scorers = default_scorers();
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));
        let node = create_test_node("n", ("4", "8Gi"), ("2", "4Gi"));

        let parts: Vec<f64> = scorers.iter().map(|s| s.score(&context, &node)).collect();
        let mean = parts.iter().sum::<f64>() / parts.len() as f64;

        assert!((composite_score(&scorers, &context, &node) - mean).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_is_stable_on_ties() {
        let scorers = default_scorers();
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        // Identical nodes score identically; input order must survive
        let x = create_test_node("X", ("4", "8Gi"), ("1", "1Gi"));
        let y = create_test_node("Y", ("4", "8Gi"), ("1", "1Gi"));

        let scored = score_candidates(&scorers, &context, vec![x, y]);
        let mut ranked = RankedSet {
            pod: context.pod.clone(),
            scored_nodes: scored,
            attempt: Default::default(),
        };
        ranked.sort_by_score();

        let names: Vec<_> = ranked
            .scored_nodes
            .iter()
            .map(|s| s.node.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["X", "Y"]);
        assert_eq!(ranked.scored_nodes[0].score, ranked.scored_nodes[1].score);
    }

    #[test]
    fn test_scoring_is_pure() {
        let scorers = default_scorers();
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));
        let node = create_test_node("n", ("4", "8Gi"), ("2", "4Gi"));

        let first = composite_score(&scorers, &context, &node);
        let second = composite_score(&scorers, &context, &node);
        assert_eq!(first, second);
    }
}
