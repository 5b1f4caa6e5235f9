//! C++ listing generation from the evaluation order.
//!
//! One statement per node, rendered from a match over the operator kind.
//! The listing is assembled entirely in memory; nothing touches the
//! filesystem here, so a failed emission leaves no partial artifact.

use std::collections::{BTreeMap, HashMap};

use evalgen_core::{BuildContext, Graph, Node, NodeId, OpKind};

use crate::error::CompileError;
use crate::naming::{sanitize_ident, unique_idents};
use crate::schedule::EvaluationOrder;
use crate::weights::constant_keys;

/// Generates the evaluator class listing for a transformed graph.
pub struct ListingGenerator<'a> {
    graph: &'a Graph,
    ctx: &'a BuildContext,
}

impl<'a> ListingGenerator<'a> {
    pub fn new(graph: &'a Graph, ctx: &'a BuildContext) -> Self {
        Self { graph, ctx }
    }

    /// Render the full listing for the given order and class name.
    pub fn generate(
        &self,
        order: &EvaluationOrder,
        class_name: &str,
    ) -> Result<String, CompileError> {
        let keys = constant_keys(self.graph);
        let params = unique_idents(
            self.graph
                .nodes()
                .filter(|node| matches!(node.kind, OpKind::Input))
                .map(|node| (node.id, node.name.as_str())),
        );
        let states = state_members(self.graph);

        let vars: HashMap<NodeId, String> = order
            .nodes
            .iter()
            .filter_map(|&id| self.graph.node(id))
            .map(|node| {
                (
                    node.id,
                    format!("v{}_{}", node.id.0, sanitize_ident(&node.name)),
                )
            })
            .collect();

        // Render every statement first so an unsupported operator fails
        // before any text is considered complete.
        let mut body = String::new();
        for &id in &order.nodes {
            let node = self
                .graph
                .node(id)
                .ok_or_else(|| CompileError::InvalidGraph {
                    message: format!("evaluation order names a dead node: {id}"),
                })?;
            body.push_str("        ");
            body.push_str(&self.statement(node, &vars, &keys, &params, &states)?);
            body.push('\n');
        }

        let terminals: Vec<NodeId> = self
            .graph
            .outputs()
            .iter()
            .copied()
            .filter(|&id| {
                self.graph
                    .node(id)
                    .map(|n| !matches!(n.kind, OpKind::StateOutput { .. }))
                    .unwrap_or(false)
            })
            .collect();
        let return_type = if terminals.len() == 1 {
            "Vec".to_string()
        } else {
            "std::vector<Vec>".to_string()
        };
        let return_stmt = match terminals.as_slice() {
            [single] => format!("return {};", vars[single]),
            many => {
                let list: Vec<&str> = many.iter().map(|id| vars[id].as_str()).collect();
                format!("return std::vector<Vec>{{{}}};", list.join(", "))
            }
        };

        let scalar = self.ctx.precision.cpp_type();
        let param_list: Vec<String> = params
            .values()
            .map(|name| format!("const Vec& {name}"))
            .collect();

        let mut out = String::new();
        out.push_str(&format!(
            "// Generated by evalgen from model '{}'. Do not edit.\n",
            self.ctx.model_name
        ));
        out.push_str("#pragma once\n\n");
        out.push_str("#include <cmath>\n#include <cstddef>\n#include <vector>\n\n");
        out.push_str(&preamble(scalar));
        out.push_str(&format!("class {class_name} {{\npublic:\n"));
        out.push_str("    using Vec = evalgen_detail::Vec;\n");

        if !keys.is_empty() {
            out.push_str("\n    // Constants; populate from the weights dump before evaluating.\n");
            for key in keys.values() {
                out.push_str(&format!("    Vec {key};\n"));
            }
        }

        if !states.is_empty() {
            out.push_str("\n    // Recurrent state, one member per split past value.\n");
            for member in states.values() {
                out.push_str(&format!("    Vec {};\n", member.name));
            }
            out.push_str("\n    // Seed the recurrent state with its declared initial values.\n");
            out.push_str("    void reset() {\n");
            for member in states.values() {
                out.push_str(&format!(
                    "        {}.assign({}, Vec::value_type({}));\n",
                    member.name, member.len, member.initial
                ));
            }
            out.push_str("    }\n");
        }

        out.push_str(&format!(
            "\n    {return_type} evaluate({}) {{\n",
            param_list.join(", ")
        ));
        out.push_str(&body);
        out.push_str(&format!("        {return_stmt}\n"));
        out.push_str("    }\n};\n");

        Ok(out)
    }

    /// Render the statement computing one node from its already-emitted
    /// inputs.
    fn statement(
        &self,
        node: &Node,
        vars: &HashMap<NodeId, String>,
        keys: &BTreeMap<NodeId, String>,
        params: &BTreeMap<NodeId, String>,
        states: &BTreeMap<String, StateMember>,
    ) -> Result<String, CompileError> {
        let var = &vars[&node.id];
        let arg = |id: &NodeId| vars[id].clone();

        let stmt = match (&node.kind, node.inputs.as_slice()) {
            (OpKind::Input, []) => {
                format!("const Vec& {var} = {};", params[&node.id])
            }
            (OpKind::Constant(_), []) => {
                format!("const Vec& {var} = {};", keys[&node.id])
            }
            (OpKind::Plus, [a, b]) => {
                format!("Vec {var} = evalgen_detail::add({}, {});", arg(a), arg(b))
            }
            (OpKind::Minus, [a, b]) => {
                format!("Vec {var} = evalgen_detail::sub({}, {});", arg(a), arg(b))
            }
            (OpKind::ElementTimes, [a, b]) => {
                format!("Vec {var} = evalgen_detail::mul({}, {});", arg(a), arg(b))
            }
            (OpKind::Times, [m, v]) => {
                format!(
                    "Vec {var} = evalgen_detail::matvec({}, {});",
                    arg(m),
                    arg(v)
                )
            }
            (OpKind::Sigmoid, [a]) => {
                format!("Vec {var} = evalgen_detail::map_sigmoid({});", arg(a))
            }
            (OpKind::Tanh, [a]) => {
                format!("Vec {var} = evalgen_detail::map_tanh({});", arg(a))
            }
            (OpKind::Relu, [a]) => {
                format!("Vec {var} = evalgen_detail::map_relu({});", arg(a))
            }
            (OpKind::Exp, [a]) => {
                format!("Vec {var} = evalgen_detail::map_exp({});", arg(a))
            }
            (OpKind::Log, [a]) => {
                format!("Vec {var} = evalgen_detail::map_log({});", arg(a))
            }
            (OpKind::Softmax, [a]) => {
                format!("Vec {var} = evalgen_detail::softmax({});", arg(a))
            }
            (OpKind::StateInput { state, .. }, []) => {
                let member = member_name(states, state);
                format!("Vec {var} = {member};")
            }
            (OpKind::StateOutput { state }, [a]) => {
                let member = member_name(states, state);
                format!("{member} = {};", arg(a))
            }
            (OpKind::Unsupported(tag), _) => {
                return Err(CompileError::UnsupportedOperator {
                    node: node.name.clone(),
                    op: tag.clone(),
                })
            }
            // Past values and output markers must not survive the
            // transform passes; there is no template for them.
            (OpKind::PastValue { .. } | OpKind::OutputMarker, _) => {
                return Err(CompileError::UnsupportedOperator {
                    node: node.name.clone(),
                    op: node.kind.to_string(),
                })
            }
            (kind, inputs) => {
                return Err(CompileError::UnsupportedGraph {
                    node: node.name.clone(),
                    message: format!("{kind} cannot take {} operand(s)", inputs.len()),
                })
            }
        };
        Ok(stmt)
    }
}

/// A recurrent-state class member derived from a split past value.
struct StateMember {
    name: String,
    len: usize,
    initial: f64,
}

/// Collect state members from the StateInput nodes, keyed by state name.
/// Member identifiers are uniqued the same way as constants.
fn state_members(graph: &Graph) -> BTreeMap<String, StateMember> {
    let inputs: Vec<&Node> = graph
        .nodes()
        .filter(|node| matches!(node.kind, OpKind::StateInput { .. }))
        .collect();
    let idents = unique_idents(inputs.iter().map(|node| (node.id, node.name.as_str())));

    let mut members = BTreeMap::new();
    for node in inputs {
        if let OpKind::StateInput { state, initial } = &node.kind {
            let len = node.shape.iter().product::<usize>().max(1);
            members.insert(
                state.clone(),
                StateMember {
                    name: format!("state_{}", idents[&node.id]),
                    len,
                    initial: *initial,
                },
            );
        }
    }
    members
}

fn member_name(states: &BTreeMap<String, StateMember>, state: &str) -> String {
    states
        .get(state)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| format!("state_{}", sanitize_ident(state)))
}

/// Fixed helper namespace emitted above the class.
fn preamble(scalar: &str) -> String {
    format!(
        r#"namespace evalgen_detail {{

using Vec = std::vector<{scalar}>;

inline Vec add(const Vec& a, const Vec& b) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = a[i] + b[i];
    return r;
}}

inline Vec sub(const Vec& a, const Vec& b) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = a[i] - b[i];
    return r;
}}

inline Vec mul(const Vec& a, const Vec& b) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = a[i] * b[i];
    return r;
}}

inline Vec matvec(const Vec& m, const Vec& v) {{
    const std::size_t cols = v.size();
    const std::size_t rows = cols == 0 ? 0 : m.size() / cols;
    Vec r(rows, Vec::value_type(0));
    for (std::size_t i = 0; i < rows; ++i)
        for (std::size_t j = 0; j < cols; ++j)
            r[i] += m[i * cols + j] * v[j];
    return r;
}}

inline Vec map_sigmoid(const Vec& a) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i)
        r[i] = Vec::value_type(1) / (Vec::value_type(1) + std::exp(-a[i]));
    return r;
}}

inline Vec map_tanh(const Vec& a) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = std::tanh(a[i]);
    return r;
}}

inline Vec map_relu(const Vec& a) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i)
        r[i] = a[i] > Vec::value_type(0) ? a[i] : Vec::value_type(0);
    return r;
}}

inline Vec map_exp(const Vec& a) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = std::exp(a[i]);
    return r;
}}

inline Vec map_log(const Vec& a) {{
    Vec r(a.size());
    for (std::size_t i = 0; i < a.size(); ++i) r[i] = std::log(a[i]);
    return r;
}}

inline Vec softmax(const Vec& a) {{
    Vec r(a.size());
    Vec::value_type hi = a.empty() ? Vec::value_type(0) : a[0];
    for (std::size_t i = 1; i < a.size(); ++i)
        if (a[i] > hi) hi = a[i];
    Vec::value_type sum = 0;
    for (std::size_t i = 0; i < a.size(); ++i) {{
        r[i] = std::exp(a[i] - hi);
        sum += r[i];
    }}
    for (std::size_t i = 0; i < a.size(); ++i) r[i] /= sum;
    return r;
}}

}}  // namespace evalgen_detail

"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::plan;
    use crate::transform::{split_past_values, strip_output_markers};
    use evalgen_core::{GraphBuilder, ModelDescription, ModelNode, Precision};

    fn decl(name: &str, op: &str, inputs: &[&str]) -> ModelNode {
        ModelNode {
            name: name.to_string(),
            op: op.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            shape: vec![],
            values: None,
            initial: None,
        }
    }

    fn constant(name: &str, values: Vec<f64>) -> ModelNode {
        ModelNode {
            name: name.to_string(),
            op: "constant".to_string(),
            inputs: vec![],
            shape: vec![values.len()],
            values: Some(values),
            initial: None,
        }
    }

    fn generate(nodes: Vec<ModelNode>, outputs: &[&str]) -> Result<String, CompileError> {
        let model = ModelDescription {
            name: "emit-test".to_string(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            nodes,
        };
        let mut ctx = BuildContext::default();
        let mut g = GraphBuilder::convert(&mut ctx, &model)?;
        strip_output_markers(&mut g)?;
        split_past_values(&mut g)?;
        let order = plan(&g)?;
        ListingGenerator::new(&g, &ctx).generate(&order, "Evaluator")
    }

    #[test]
    fn marker_scenario_returns_producer_directly() {
        let listing = generate(
            vec![
                decl("x", "input", &[]),
                constant("one", vec![1.0]),
                decl("sum", "plus", &["x", "one"]),
                decl("out", "output", &["sum"]),
            ],
            &["out"],
        )
        .unwrap();

        assert!(listing.contains("Vec v2_sum = evalgen_detail::add(v0_x, v1_one);"));
        assert!(listing.contains("return v2_sum;"));
        // The marker itself leaves no trace.
        assert!(!listing.contains("out"), "listing: {listing}");
    }

    #[test]
    fn class_name_and_entry_point() {
        let model = ModelDescription {
            name: "emit-test".to_string(),
            outputs: vec!["y".to_string()],
            nodes: vec![decl("x", "input", &[]), decl("y", "relu", &["x"])],
        };
        let mut ctx = BuildContext::default();
        let g = GraphBuilder::convert(&mut ctx, &model).unwrap();
        let order = plan(&g).unwrap();
        let listing = ListingGenerator::new(&g, &ctx)
            .generate(&order, "TinyNet")
            .unwrap();

        assert!(listing.contains("class TinyNet {"));
        assert!(listing.contains("Vec evaluate(const Vec& x) {"));
        assert!(listing.contains("// Generated by evalgen from model 'emit-test'."));
    }

    #[test]
    fn precision_selects_element_type() {
        let model = ModelDescription {
            name: String::new(),
            outputs: vec!["x".to_string()],
            nodes: vec![decl("x", "input", &[])],
        };
        let mut ctx = BuildContext {
            precision: Precision::F64,
            ..Default::default()
        };
        let g = GraphBuilder::convert(&mut ctx, &model).unwrap();
        let order = plan(&g).unwrap();
        let listing = ListingGenerator::new(&g, &ctx)
            .generate(&order, "Evaluator")
            .unwrap();
        assert!(listing.contains("using Vec = std::vector<double>;"));
    }

    #[test]
    fn constants_become_members() {
        let listing = generate(
            vec![
                decl("x", "input", &[]),
                constant("w", vec![0.5, 0.5]),
                decl("y", "element_times", &["w", "x"]),
            ],
            &["y"],
        )
        .unwrap();
        assert!(listing.contains("    Vec w;\n"));
        assert!(listing.contains("const Vec& v1_w = w;"));
    }

    #[test]
    fn recurrence_emits_state_member_and_update() {
        let mut past = decl("h_prev", "past_value", &["h"]);
        past.initial = Some(0.5);
        past.shape = vec![3];
        let listing = generate(
            vec![
                decl("x", "input", &[]),
                past,
                decl("h", "plus", &["x", "h_prev"]),
            ],
            &["h"],
        )
        .unwrap();

        assert!(listing.contains("Vec state_h_prev;"));
        assert!(listing.contains("state_h_prev.assign(3, Vec::value_type(0.5));"));
        // Read before update: the copy statement precedes the writeback.
        let read = listing.find("Vec v1_h_prev = state_h_prev;").unwrap();
        let write = listing.find("state_h_prev = v2_h;").unwrap();
        assert!(read < write);
        assert!(listing.contains("return v2_h;"));
    }

    #[test]
    fn multiple_outputs_return_a_vector() {
        let listing = generate(
            vec![
                decl("x", "input", &[]),
                decl("a", "sigmoid", &["x"]),
                decl("b", "tanh", &["x"]),
            ],
            &["a", "b"],
        )
        .unwrap();
        assert!(listing.contains("std::vector<Vec> evaluate"));
        assert!(listing.contains("return std::vector<Vec>{v1_a, v2_b};"));
    }

    #[test]
    fn unsupported_operator_fails_naming_the_node() {
        let err = generate(
            vec![decl("x", "input", &[]), decl("mystery", "FooOp", &["x"])],
            &["mystery"],
        )
        .unwrap_err();
        match err {
            CompileError::UnsupportedOperator { node, op } => {
                assert_eq!(node, "mystery");
                assert_eq!(op, "FooOp");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
