use crate::types::{FilterResult, SchedulingContext};
use altair_core::{Node, ResourceQuantities};
use k8s_openapi::api::core::v1::{NodeSelectorTerm, Taint, Toleration};
use std::collections::BTreeMap;
use tracing::debug;

/// Filter predicate trait
pub trait FilterPredicate: Send + Sync {
    /// Filter a node for the given pod
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult;

    /// Name of the filter
    fn name(&self) -> &str;
}

fn node_name(node: &Node) -> String {
    node.metadata
        .name
        .clone()
        .unwrap_or_else(|| "unknown".to_string())
}

/// Filter out nodes marked unschedulable
pub struct NodeSchedulable;

impl FilterPredicate for NodeSchedulable {
    fn filter(&self, _context: &SchedulingContext, node: &Node) -> FilterResult {
        let name = node_name(node);

        let unschedulable = node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);

        if unschedulable {
            FilterResult::fail(name, "Node is marked unschedulable".to_string())
        } else {
            FilterResult::pass(name)
        }
    }

    fn name(&self) -> &str {
        "NodeSchedulable"
    }
}

/// Filter on required node affinity terms.
///
/// Terms OR together: one satisfied term admits the node. Within a term,
/// every match expression must hold.
pub struct NodeAffinityMatch;

impl FilterPredicate for NodeAffinityMatch {
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult {
        let name = node_name(node);

        let required = context
            .pod
            .spec
            .as_ref()
            .and_then(|s| s.affinity.as_ref())
            .and_then(|a| a.node_affinity.as_ref())
            .and_then(|na| na.required_during_scheduling_ignored_during_execution.as_ref());

        let Some(required) = required else {
            // No declared affinity passes trivially
            return FilterResult::pass(name);
        };

        let empty = BTreeMap::new();
        let labels = node.metadata.labels.as_ref().unwrap_or(&empty);

        if required
            .node_selector_terms
            .iter()
            .any(|term| matches_selector_term(term, labels))
        {
            FilterResult::pass(name)
        } else {
            FilterResult::fail(name, "Node affinity not satisfied".to_string())
        }
    }

    fn name(&self) -> &str {
        "NodeAffinityMatch"
    }
}

/// Check one selector term against node labels. Every expression must hold.
fn matches_selector_term(term: &NodeSelectorTerm, labels: &BTreeMap<String, String>) -> bool {
    let Some(expressions) = &term.match_expressions else {
        return true;
    };

    for expr in expressions {
        let label_value = labels.get(&expr.key);
        let values = expr.values.as_deref().unwrap_or(&[]);

        let holds = match expr.operator.as_str() {
            "In" => label_value.is_some_and(|v| values.contains(v)),
            "NotIn" => !label_value.is_some_and(|v| values.contains(v)),
            "Exists" => label_value.is_some(),
            "DoesNotExist" => label_value.is_none(),
            other => {
                debug!("Ignoring unsupported node-affinity operator {}", other);
                true
            }
        };

        if !holds {
            return false;
        }
    }

    true
}

/// Filter on taints: every taint on the node must be tolerated by the pod
pub struct TaintTolerationMatch;

impl FilterPredicate for TaintTolerationMatch {
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult {
        let name = node_name(node);

        let Some(taints) = node.spec.as_ref().and_then(|s| s.taints.as_ref()) else {
            return FilterResult::pass(name);
        };

        let no_tolerations = Vec::new();
        let tolerations = context
            .pod
            .spec
            .as_ref()
            .and_then(|s| s.tolerations.as_ref())
            .unwrap_or(&no_tolerations);

        for taint in taints {
            if !tolerates_taint(tolerations, taint) {
                return FilterResult::fail(
                    name,
                    format!(
                        "Pod does not tolerate taint: {}={}",
                        taint.key, taint.effect
                    ),
                );
            }
        }

        FilterResult::pass(name)
    }

    fn name(&self) -> &str {
        "TaintTolerationMatch"
    }
}

/// A toleration covers a taint when the keys match, the effect is empty or
/// equal, and the operator is Exists or the values are equal.
fn tolerates_taint(tolerations: &[Toleration], taint: &Taint) -> bool {
    tolerations.iter().any(|toleration| {
        let key_matches = toleration.key.as_deref().unwrap_or("") == taint.key;
        let effect_matches = toleration
            .effect
            .as_deref()
            .map_or(true, |e| e.is_empty() || e == taint.effect);
        let value_matches = toleration.operator.as_deref() == Some("Exists")
            || toleration.value.as_deref().unwrap_or("")
                == taint.value.as_deref().unwrap_or("");

        key_matches && effect_matches && value_matches
    })
}

/// Filter on resource fit: summed container requests must fit into the
/// node's allocatable CPU and memory
pub struct PodFitsResources;

impl FilterPredicate for PodFitsResources {
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult {
        let name = node_name(node);

        let allocatable = node
            .status
            .as_ref()
            .and_then(|s| s.allocatable.as_ref())
            .map(ResourceQuantities::from_quantity_map)
            .unwrap_or_default();

        let requested = ResourceQuantities::pod_requests(&context.pod);

        debug!(
            "Node {} allocatable: {} milli CPU, {} bytes memory; pod requests {} milli, {} bytes",
            name,
            allocatable.cpu_millicores,
            allocatable.memory_bytes,
            requested.cpu_millicores,
            requested.memory_bytes
        );

        if requested.cpu_millicores > allocatable.cpu_millicores {
            return FilterResult::fail(
                name,
                format!(
                    "Insufficient CPU: requested {} milli, available {} milli",
                    requested.cpu_millicores, allocatable.cpu_millicores
                ),
            );
        }

        if requested.memory_bytes > allocatable.memory_bytes {
            return FilterResult::fail(
                name,
                format!(
                    "Insufficient memory: requested {} bytes, available {} bytes",
                    requested.memory_bytes, allocatable.memory_bytes
                ),
            );
        }

        FilterResult::pass(name)
    }

    fn name(&self) -> &str {
        "PodFitsResources"
    }
}

/// Default predicate chain, applied in order with per-node short-circuit
pub fn default_predicates() -> Vec<Box<dyn FilterPredicate>> {
    vec![
        Box::new(NodeSchedulable),
        Box::new(NodeAffinityMatch),
        Box::new(TaintTolerationMatch),
        Box::new(PodFitsResources),
    ]
}

/// Apply the predicate chain to every node, preserving input order.
/// The result is the subset of nodes passing all predicates.
pub fn filter_nodes(
    context: &SchedulingContext,
    nodes: &[Node],
    predicates: &[Box<dyn FilterPredicate>],
) -> Vec<Node> {
    let mut feasible = Vec::new();

    for node in nodes {
        let mut passed = true;

        for predicate in predicates {
            let result = predicate.filter(context, node);
            if !result.passed {
                debug!(
                    "Node {} filtered out by {}: {}",
                    result.node_name,
                    predicate.name(),
                    result.reason.unwrap_or_default()
                );
                passed = false;
                break;
            }
        }

        if passed {
            feasible.push(node.clone());
        }
    }

    feasible
}

#[cfg(test)]
mod tests {
    use super::*;
    use altair_core::Pod;
    use k8s_openapi::api::core::v1::{
        Affinity, Container, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSpec,
        NodeStatus, PodSpec, ResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn create_test_node(name: &str, cpu: &str, memory: &str) -> Node {
        let mut allocatable = BTreeMap::new();
        allocatable.insert("cpu".to_string(), Quantity(cpu.to_string()));
        allocatable.insert("memory".to_string(), Quantity(memory.to_string()));

        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        node.status = Some(NodeStatus {
            allocatable: Some(allocatable),
            ..Default::default()
        });
        node
    }

    fn create_test_pod(cpu: &str, memory: &str) -> Pod {
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), Quantity(cpu.to_string()));
        requests.insert("memory".to_string(), Quantity(memory.to_string()));

        let mut pod = Pod::default();
        pod.metadata.name = Some("test-pod".to_string());
        pod.spec = Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(requests),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        });
        pod
    }

    fn with_labels(mut node: Node, labels: &[(&str, &str)]) -> Node {
        let map: BTreeMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        node.metadata.labels = Some(map);
        node
    }

    fn with_required_affinity(mut pod: Pod, key: &str, operator: &str, values: &[&str]) -> Pod {
        let requirement = NodeSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| v.to_string()).collect())
            },
        };

        let affinity = Affinity {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: vec![NodeSelectorTerm {
                        match_expressions: Some(vec![requirement]),
                        ..Default::default()
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        pod.spec.get_or_insert_with(Default::default).affinity = Some(affinity);
        pod
    }

    #[test]
    fn test_resource_fit_pass_and_fail() {
        // Spec scenario: A is too small, B fits
        let node_a = create_test_node("A", "0.5", "128Mi");
        let node_b = create_test_node("B", "2", "4Gi");
        let pod = create_test_pod("1", "256Mi");
        let context = SchedulingContext::new(pod);

        let predicates = default_predicates();
        let survivors = filter_nodes(&context, &[node_a, node_b], &predicates);

        let names: Vec<_> = survivors
            .iter()
            .map(|n| n.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn test_resource_fit_fail_memory() {
        let node = create_test_node("node1", "4", "128Mi");
        let pod = create_test_pod("1", "256Mi");
        let context = SchedulingContext::new(pod);

        let result = PodFitsResources.filter(&context, &node);
        assert!(!result.passed);
        assert!(result.reason.unwrap().contains("Insufficient memory"));
    }

    #[test]
    fn test_missing_requests_are_zero_demand() {
        let node = create_test_node("node1", "0.1", "1Ki");
        let mut pod = Pod::default();
        pod.spec = Some(PodSpec {
            containers: vec![Container::default()],
            ..Default::default()
        });
        let context = SchedulingContext::new(pod);

        assert!(PodFitsResources.filter(&context, &node).passed);
    }

    #[test]
    fn test_unschedulable_node_excluded() {
        let mut node = create_test_node("node1", "4", "8Gi");
        node.spec = Some(NodeSpec {
            unschedulable: Some(true),
            ..Default::default()
        });
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        let result = NodeSchedulable.filter(&context, &node);
        assert!(!result.passed);
    }

    #[test]
    fn test_taint_without_toleration_excluded() {
        // Spec scenario: tainted node excluded regardless of resources
        let mut node = create_test_node("node1", "16", "64Gi");
        node.spec = Some(NodeSpec {
            taints: Some(vec![Taint {
                key: "dedicated".to_string(),
                effect: "NoSchedule".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        let result = TaintTolerationMatch.filter(&context, &node);
        assert!(!result.passed);
        assert!(result.reason.unwrap().contains("dedicated"));
    }

    #[test]
    fn test_matching_toleration_admits_tainted_node() {
        let mut node = create_test_node("node1", "4", "8Gi");
        node.spec = Some(NodeSpec {
            taints: Some(vec![Taint {
                key: "dedicated".to_string(),
                effect: "NoSchedule".to_string(),
                value: Some("batch".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let mut pod = create_test_pod("1", "1Gi");
        pod.spec.as_mut().unwrap().tolerations = Some(vec![Toleration {
            key: Some("dedicated".to_string()),
            operator: Some("Exists".to_string()),
            effect: Some("NoSchedule".to_string()),
            ..Default::default()
        }]);
        let context = SchedulingContext::new(pod);

        assert!(TaintTolerationMatch.filter(&context, &node).passed);
    }

    #[test]
    fn test_toleration_value_mismatch_excluded() {
        let mut node = create_test_node("node1", "4", "8Gi");
        node.spec = Some(NodeSpec {
            taints: Some(vec![Taint {
                key: "dedicated".to_string(),
                effect: "NoSchedule".to_string(),
                value: Some("batch".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let mut pod = create_test_pod("1", "1Gi");
        pod.spec.as_mut().unwrap().tolerations = Some(vec![Toleration {
            key: Some("dedicated".to_string()),
            operator: Some("Equal".to_string()),
            value: Some("web".to_string()),
            ..Default::default()
        }]);
        let context = SchedulingContext::new(pod);

        assert!(!TaintTolerationMatch.filter(&context, &node).passed);
    }

    #[test]
    fn test_affinity_zone_mismatch_excluded() {
        // Spec scenario: required zone us-west-1a vs node in us-west-1b
        let node = with_labels(
            create_test_node("node1", "16", "64Gi"),
            &[("zone", "us-west-1b")],
        );
        let pod = with_required_affinity(create_test_pod("1", "1Gi"), "zone", "In", &["us-west-1a"]);
        let context = SchedulingContext::new(pod);

        let result = NodeAffinityMatch.filter(&context, &node);
        assert!(!result.passed);
    }

    #[test]
    fn test_affinity_operators() {
        let node = with_labels(create_test_node("node1", "4", "8Gi"), &[("zone", "us-west-1a")]);
        let base = create_test_pod("1", "1Gi");

        let matching = with_required_affinity(base.clone(), "zone", "In", &["us-west-1a"]);
        assert!(NodeAffinityMatch
            .filter(&SchedulingContext::new(matching), &node)
            .passed);

        let not_in = with_required_affinity(base.clone(), "zone", "NotIn", &["us-west-1a"]);
        assert!(!NodeAffinityMatch
            .filter(&SchedulingContext::new(not_in), &node)
            .passed);

        let exists = with_required_affinity(base.clone(), "zone", "Exists", &[]);
        assert!(NodeAffinityMatch
            .filter(&SchedulingContext::new(exists), &node)
            .passed);

        let does_not_exist = with_required_affinity(base, "gpu", "DoesNotExist", &[]);
        assert!(NodeAffinityMatch
            .filter(&SchedulingContext::new(does_not_exist), &node)
            .passed);
    }

    #[test]
    fn test_no_affinity_passes_trivially() {
        let node = create_test_node("node1", "4", "8Gi");
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));

        assert!(NodeAffinityMatch.filter(&context, &node).passed);
    }

    #[test]
    fn test_filter_preserves_order_and_is_idempotent() {
        let nodes = vec![
            create_test_node("n1", "4", "8Gi"),
            create_test_node("n2", "0.1", "8Gi"),
            create_test_node("n3", "4", "8Gi"),
            create_test_node("n4", "8", "16Gi"),
        ];
        let context = SchedulingContext::new(create_test_pod("1", "1Gi"));
        let predicates = default_predicates();

        let first = filter_nodes(&context, &nodes, &predicates);
        let names: Vec<_> = first
            .iter()
            .map(|n| n.metadata.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["n1", "n3", "n4"]);

        // Same input, same output
        let second = filter_nodes(&context, &nodes, &predicates);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.metadata.name, b.metadata.name);
        }
    }
}
