//! Model fixtures and brute-force reference inference for workspace tests.
//!
//! Models come from JSON files under `fixtures/models/` or from the builders
//! below. The reference functions enumerate joint assignments, so keep the
//! number of unobserved variables small when calling them.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use ctp_core::{BayesNet, DataSet, Potential, Variable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// One variable of a JSON model.
#[derive(Debug, Deserialize)]
pub struct VariableFixture {
    pub name: String,
    pub states: Vec<String>,
}

/// A discrete network as stored on disk. CPT cells are row-major over
/// `[child, parents...]` with parents in edge order.
#[derive(Debug, Deserialize)]
pub struct ModelFixture {
    pub name: String,
    pub variables: Vec<VariableFixture>,
    pub edges: Vec<(String, String)>,
    pub cpts: HashMap<String, Vec<f64>>,
    #[serde(default)]
    pub latent: Vec<String>,
}

impl ModelFixture {
    /// Build the network.
    ///
    /// # Panics
    /// Panics if the fixture does not describe a valid network.
    pub fn to_model(&self) -> BayesNet {
        let mut net = BayesNet::new(&self.name);
        for v in &self.variables {
            let variable = Variable::new(&v.name, v.states.clone())
                .unwrap_or_else(|e| panic!("fixture variable {}: {e}", v.name));
            net.add_node(variable)
                .unwrap_or_else(|e| panic!("fixture node {}: {e}", v.name));
        }
        for (parent, child) in &self.edges {
            net.add_edge(parent, child)
                .unwrap_or_else(|e| panic!("fixture edge {parent} -> {child}: {e}"));
        }
        for (name, cells) in &self.cpts {
            let family = net.family(name).unwrap_or_else(|e| panic!("fixture cpt {name}: {e}"));
            let cpt = Potential::from_cells(family, cells.clone())
                .unwrap_or_else(|e| panic!("fixture cpt {name}: {e}"));
            net.set_cpt(name, cpt)
                .unwrap_or_else(|e| panic!("fixture cpt {name}: {e}"));
        }
        net
    }

    /// Columns for a dataset over the non-latent variables.
    pub fn observed_variables(&self, model: &BayesNet) -> Vec<Variable> {
        model
            .variables()
            .into_iter()
            .filter(|v| !self.latent.iter().any(|l| l == v.name()))
            .collect()
    }
}

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load a model fixture by file stem, e.g. `"sprinkler"`.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_model_fixture(name: &str) -> ModelFixture {
    let path = fixtures_root().join("models").join(format!("{name}.json"));
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load and build a model fixture.
pub fn load_model(name: &str) -> BayesNet {
    load_model_fixture(name).to_model()
}

/// The three-variable chain `x -> y -> z`.
pub fn xyz_chain() -> BayesNet {
    load_model("xyz_chain")
}

/// The classic cloudy/sprinkler/rain/wet network; its moral graph has a
/// four-cycle, so triangulation is exercised.
pub fn sprinkler() -> BayesNet {
    load_model("sprinkler")
}

/// A two-level latent tree with four observed leaves.
pub fn latent_tree() -> BayesNet {
    load_model("latent_tree")
}

/// A binary chain `v0 -> v1 -> ... -> v{len-1}`. Each variable copies its
/// parent with probability `stay`.
pub fn binary_chain(len: usize, stay: f64) -> BayesNet {
    let mut net = BayesNet::new(&format!("chain{len}"));
    let vars: Vec<Variable> = (0..len).map(|i| binary(&format!("v{i}"))).collect();
    for v in &vars {
        net.add_node(v.clone()).unwrap_or_else(|e| panic!("chain node: {e}"));
    }
    for pair in vars.windows(2) {
        net.add_edge(&pair[0], &pair[1])
            .unwrap_or_else(|e| panic!("chain edge: {e}"));
    }
    for (i, v) in vars.iter().enumerate() {
        let family = net.family(v).unwrap_or_else(|e| panic!("chain family: {e}"));
        let cells = if i == 0 {
            vec![0.5, 0.5]
        } else {
            vec![stay, 1.0 - stay, 1.0 - stay, stay]
        };
        let cpt = Potential::from_cells(family, cells).unwrap_or_else(|e| panic!("chain cpt: {e}"));
        net.set_cpt(v, cpt).unwrap_or_else(|e| panic!("chain cpt: {e}"));
    }
    net
}

/// A binary random DAG over `n` variables. `edge_bits[k]` decides the k-th
/// forward pair `(i, j)`, `i < j`, taken in row order; at most `max_parents`
/// parents per child. CPT cells come from `weights` cycled.
pub fn random_dag(n: usize, edge_bits: &[bool], max_parents: usize, weights: &[f64]) -> BayesNet {
    let mut net = BayesNet::new("random");
    let vars: Vec<Variable> = (0..n).map(|i| binary(&format!("r{i}"))).collect();
    for v in &vars {
        net.add_node(v.clone()).unwrap_or_else(|e| panic!("random node: {e}"));
    }
    let mut k = 0;
    let mut parents = vec![0usize; n];
    for i in 0..n {
        for j in i + 1..n {
            let wanted = edge_bits.get(k).copied().unwrap_or(false);
            k += 1;
            if wanted && parents[j] < max_parents {
                net.add_edge(&vars[i], &vars[j])
                    .unwrap_or_else(|e| panic!("random edge: {e}"));
                parents[j] += 1;
            }
        }
    }
    let mut w = weights.iter().copied().cycle();
    for v in &vars {
        let family = net.family(v).unwrap_or_else(|e| panic!("random family: {e}"));
        let size: usize = family.iter().map(Variable::cardinality).product();
        let cells = (0..size).map(|_| w.next().unwrap_or(1.0).max(1e-3)).collect();
        let mut cpt = Potential::from_cells(family, cells).unwrap_or_else(|e| panic!("random cpt: {e}"));
        cpt.normalize_conditional(v)
            .unwrap_or_else(|e| panic!("random cpt: {e}"));
        net.set_cpt(v, cpt).unwrap_or_else(|e| panic!("random cpt: {e}"));
    }
    net
}

/// A binary variable named `name`.
pub fn binary(name: &str) -> Variable {
    Variable::with_cardinality(name, 2).unwrap_or_else(|e| panic!("variable {name}: {e}"))
}

/// Draw `cases` complete samples by forward sampling from a seeded RNG.
pub fn sample_dataset(model: &BayesNet, columns: &[Variable], cases: usize, seed: u64) -> DataSet {
    let mut rng = StdRng::seed_from_u64(seed);

    let order = topological(model);
    let mut data = DataSet::new(columns.to_vec());
    for _ in 0..cases {
        let mut assignment: BTreeMap<Variable, usize> = BTreeMap::new();
        for v in &order {
            let cpt = model.cpt(v).unwrap_or_else(|e| panic!("sample cpt: {e}"));
            let u: f64 = rng.gen();
            let mut acc = 0.0;
            let mut drawn = v.cardinality() - 1;
            for s in 0..v.cardinality() {
                let mut point: Vec<(&Variable, usize)> = vec![(v, s)];
                point.extend(assignment.iter().map(|(k, &x)| (k, x)));
                acc += cpt.value(&point).unwrap_or(0.0);
                if u < acc {
                    drawn = s;
                    break;
                }
            }
            assignment.insert(v.clone(), drawn);
        }
        let row: Vec<usize> = columns.iter().map(|c| assignment[c]).collect();
        data.add_complete(&row)
            .unwrap_or_else(|e| panic!("sample case: {e}"));
    }
    data
}

fn topological(model: &BayesNet) -> Vec<Variable> {
    let mut order: Vec<Variable> = Vec::new();
    let mut pending = model.variables();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|v| {
            let ready = model
                .parents(v)
                .map(|ps| ps.iter().all(|p| order.contains(p)))
                .unwrap_or(true);
            if ready {
                order.push(v.clone());
            }
            !ready
        });
        assert!(pending.len() < before, "model is not a DAG");
    }
    order
}

/// Log joint `ln P(assignment)` of a complete assignment.
fn log_joint(model: &BayesNet, assignment: &[(&Variable, usize)]) -> f64 {
    model
        .discrete_nodes()
        .map(|node| {
            node.cpt()
                .value(assignment)
                .unwrap_or_else(|e| panic!("log joint: {e}"))
                .ln()
        })
        .sum()
}

/// Enumerate every completion of `evidence`, calling `f` with the full
/// assignment and its log joint.
fn enumerate(
    model: &BayesNet,
    evidence: &[(Variable, usize)],
    mut f: impl FnMut(&[(&Variable, usize)], f64),
) {
    let variables = model.variables();
    let hidden: Vec<&Variable> = variables
        .iter()
        .filter(|v| !evidence.iter().any(|(e, _)| e == *v))
        .collect();
    let mut states = vec![0usize; hidden.len()];
    loop {
        let mut assignment: Vec<(&Variable, usize)> =
            evidence.iter().map(|(v, s)| (v, *s)).collect();
        assignment.extend(hidden.iter().copied().zip(states.iter().copied()));
        let lj = log_joint(model, &assignment);
        f(&assignment, lj);

        let mut pos = hidden.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            states[pos] += 1;
            if states[pos] < hidden[pos].cardinality() {
                break;
            }
            states[pos] = 0;
        }
    }
}

/// `ln P(evidence)` via log-sum-exp over all completions.
pub fn brute_force_log_likelihood(model: &BayesNet, evidence: &[(Variable, usize)]) -> f64 {
    let mut terms = Vec::new();
    enumerate(model, evidence, |_, lj| terms.push(lj));
    log_sum_exp(&terms)
}

/// `P(evidence)` by direct summation.
pub fn brute_force_likelihood(model: &BayesNet, evidence: &[(Variable, usize)]) -> f64 {
    let mut total = 0.0;
    enumerate(model, evidence, |_, lj| total += lj.exp());
    total
}

/// Normalized posterior over `query` (in that order) given `evidence`.
pub fn brute_force_marginal(
    model: &BayesNet,
    query: &[Variable],
    evidence: &[(Variable, usize)],
) -> Potential {
    let mut result = Potential::zeros(query.to_vec()).unwrap_or_else(|e| panic!("marginal: {e}"));
    enumerate(model, evidence, |assignment, lj| {
        let states: Vec<usize> = query
            .iter()
            .map(|q| {
                assignment
                    .iter()
                    .find(|(v, _)| *v == q)
                    .map(|(_, s)| *s)
                    .unwrap_or_else(|| panic!("query variable {q} not in model"))
            })
            .collect();
        let point = Potential::indicator(query, &states).unwrap_or_else(|e| panic!("marginal: {e}"));
        result
            .add_scaled(&point, lj.exp())
            .unwrap_or_else(|e| panic!("marginal: {e}"));
    });
    result.normalize();
    result
}

/// Numerically stable `ln Σ exp(terms)`.
pub fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

/// Largest absolute cell difference between two potentials over the same
/// variables in the same order.
pub fn max_cell_diff(a: &Potential, b: &Potential) -> f64 {
    assert_eq!(a.scope(), b.scope(), "scopes differ");
    a.cells()
        .iter()
        .zip(b.cells())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
