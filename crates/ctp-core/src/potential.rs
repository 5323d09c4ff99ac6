//! Tabular potentials over discrete variables.
//!
//! Cells are stored row-major over the scope: the last scope variable varies
//! fastest. Every operation that builds a new scope documents its order,
//! because callers index cells by it.

use std::collections::HashSet;

use rand::Rng;

use crate::errors::{CtpResult, ModelError};
use crate::variable::Variable;

/// A non-negative table over an ordered scope of distinct variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    scope: Vec<Variable>,
    cells: Vec<f64>,
}

impl Potential {
    /// The multiplicative identity: empty scope, a single cell of 1.0.
    pub fn identity() -> Self {
        Self {
            scope: Vec::new(),
            cells: vec![1.0],
        }
    }

    /// All-zero table over `scope`.
    pub fn zeros(scope: Vec<Variable>) -> CtpResult<Self> {
        check_distinct(&scope)?;
        let size = scope.iter().map(Variable::cardinality).product();
        Ok(Self {
            scope,
            cells: vec![0.0; size],
        })
    }

    /// Uniform joint distribution over `scope`.
    pub fn uniform(scope: Vec<Variable>) -> CtpResult<Self> {
        let mut p = Self::zeros(scope)?;
        let value = 1.0 / p.cells.len() as f64;
        p.cells.iter_mut().for_each(|c| *c = value);
        Ok(p)
    }

    /// Table with explicit cells in row-major order.
    pub fn from_cells(scope: Vec<Variable>, cells: Vec<f64>) -> CtpResult<Self> {
        check_distinct(&scope)?;
        let size: usize = scope.iter().map(Variable::cardinality).product();
        if cells.len() != size {
            return Err(invalid(format!(
                "scope needs {size} cells, got {}",
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|c| !(**c >= 0.0) || !c.is_finite()) {
            return Err(invalid(format!("cell value {bad} is not a finite non-negative number")));
        }
        Ok(Self { scope, cells })
    }

    /// 1.0 at the given joint state of `variables`, 0.0 elsewhere.
    pub fn indicator(variables: &[Variable], states: &[usize]) -> CtpResult<Self> {
        if variables.len() != states.len() {
            return Err(invalid(format!(
                "indicator over {} variables given {} states",
                variables.len(),
                states.len()
            )));
        }
        let mut p = Self::zeros(variables.to_vec())?;
        let mut offset = 0;
        for (stride, (var, &state)) in strides(&p.scope).into_iter().zip(variables.iter().zip(states)) {
            if !var.is_valid_state(state) {
                return Err(invalid(format!("state {state} out of range for {var}")));
            }
            offset += stride * state;
        }
        p.cells[offset] = 1.0;
        Ok(p)
    }

    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [f64] {
        &mut self.cells
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.scope.contains(variable)
    }

    /// Total mass.
    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Cell value at a joint state. `assignment` may mention extra variables.
    pub fn value(&self, assignment: &[(&Variable, usize)]) -> CtpResult<f64> {
        let mut offset = 0;
        for (stride, var) in strides(&self.scope).into_iter().zip(&self.scope) {
            let state = assignment
                .iter()
                .find(|(v, _)| *v == var)
                .map(|(_, s)| *s)
                .ok_or_else(|| invalid(format!("assignment misses {var}")))?;
            if !var.is_valid_state(state) {
                return Err(invalid(format!("state {state} out of range for {var}")));
            }
            offset += stride * state;
        }
        Ok(self.cells[offset])
    }

    /// Pointwise product. Result scope: this scope, then the other's new variables.
    pub fn times(&self, other: &Potential) -> Potential {
        if other.is_scalar() {
            let factor = other.cells[0];
            return Potential {
                scope: self.scope.clone(),
                cells: self.cells.iter().map(|c| c * factor).collect(),
            };
        }
        if self.is_scalar() {
            let factor = self.cells[0];
            return Potential {
                scope: other.scope.clone(),
                cells: other.cells.iter().map(|c| c * factor).collect(),
            };
        }

        let mut scope = self.scope.clone();
        scope.extend(other.scope.iter().filter(|v| !self.scope.contains(v)).cloned());

        let cards: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let left = strides_in(&scope, self);
        let right = strides_in(&scope, other);
        let mut cells = Vec::with_capacity(cards.iter().product());
        for_each_offset(&cards, &[left.as_slice(), right.as_slice()], |offsets| {
            cells.push(self.cells[offsets[0]] * other.cells[offsets[1]]);
        });
        Potential { scope, cells }
    }

    /// Sum over `variables`. Variables outside the scope are ignored.
    /// Result keeps the remaining variables in their current order.
    pub fn sum_out(&self, variables: &[Variable]) -> Potential {
        let keep: Vec<Variable> = self
            .scope
            .iter()
            .filter(|v| !variables.contains(v))
            .cloned()
            .collect();
        if keep.len() == self.scope.len() {
            return self.clone();
        }
        self.sum_onto(keep)
    }

    /// Sum onto `keep`, which must be a subset of the scope. Result scope is `keep`'s order.
    pub fn marginalize(&self, keep: &[Variable]) -> CtpResult<Potential> {
        check_distinct(keep)?;
        if let Some(missing) = keep.iter().find(|v| !self.scope.contains(v)) {
            return Err(invalid(format!("cannot marginalize onto {missing}: not in scope")));
        }
        Ok(self.sum_onto(keep.to_vec()))
    }

    fn sum_onto(&self, keep: Vec<Variable>) -> Potential {
        let target_strides = strides(&keep);
        let mapped: Vec<usize> = self
            .scope
            .iter()
            .map(|v| {
                keep.iter()
                    .position(|k| k == v)
                    .map_or(0, |i| target_strides[i])
            })
            .collect();
        let size = keep.iter().map(Variable::cardinality).product();
        let mut cells = vec![0.0; size];
        let cards: Vec<usize> = self.scope.iter().map(Variable::cardinality).collect();
        let mut source = 0;
        for_each_offset(&cards, &[mapped.as_slice()], |offsets| {
            cells[offsets[0]] += self.cells[source];
            source += 1;
        });
        Potential { scope: keep, cells }
    }

    /// Fix `variable` at `state` and drop it from the scope.
    /// Projecting on a variable outside the scope returns a copy.
    pub fn project(&self, variable: &Variable, state: usize) -> CtpResult<Potential> {
        let Some(position) = self.scope.iter().position(|v| v == variable) else {
            return Ok(self.clone());
        };
        if !variable.is_valid_state(state) {
            return Err(invalid(format!("state {state} out of range for {variable}")));
        }
        let source_strides = strides(&self.scope);
        let base = source_strides[position] * state;

        let scope: Vec<Variable> = self
            .scope
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, v)| v.clone())
            .collect();
        let kept_strides: Vec<usize> = source_strides
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, s)| *s)
            .collect();
        let cards: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let mut cells = Vec::with_capacity(cards.iter().product());
        for_each_offset(&cards, &[kept_strides.as_slice()], |offsets| {
            cells.push(self.cells[base + offsets[0]]);
        });
        Ok(Potential { scope, cells })
    }

    /// Divide by the total mass and return it. A zero-mass table is left as is.
    pub fn normalize(&mut self) -> f64 {
        let total = self.sum();
        if total > 0.0 {
            self.cells.iter_mut().for_each(|c| *c /= total);
        }
        total
    }

    /// Normalize over `variable` for every configuration of the other variables.
    /// Configurations without mass become uniform.
    pub fn normalize_conditional(&mut self, variable: &Variable) -> CtpResult<()> {
        let (position, stride, others, other_strides) = self.split_on(variable)?;
        let card = self.scope[position].cardinality();
        let cells = &mut self.cells;
        for_each_offset(&others, &[other_strides.as_slice()], |offsets| {
            let base = offsets[0];
            let total: f64 = (0..card).map(|k| cells[base + k * stride]).sum();
            for k in 0..card {
                let cell = &mut cells[base + k * stride];
                *cell = if total > 0.0 { *cell / total } else { 1.0 / card as f64 };
            }
        });
        Ok(())
    }

    /// Fill with random values and normalize over `variable`.
    pub fn randomize_conditional<R: Rng>(
        &mut self,
        variable: &Variable,
        rng: &mut R,
    ) -> CtpResult<()> {
        self.cells
            .iter_mut()
            .for_each(|c| *c = 1.0 - rng.gen::<f64>());
        self.normalize_conditional(variable)
    }

    /// `self += weight * other`. Scopes must hold the same variables, in any order.
    pub fn add_scaled(&mut self, other: &Potential, weight: f64) -> CtpResult<()> {
        if other.scope.len() != self.scope.len() {
            return Err(invalid(format!(
                "cannot add potentials over {:?} and {:?}",
                self.scope, other.scope
            )));
        }
        if other.scope == self.scope {
            self.cells
                .iter_mut()
                .zip(&other.cells)
                .for_each(|(c, o)| *c += weight * o);
            return Ok(());
        }
        let aligned = other.marginalize(&self.scope)?;
        self.cells
            .iter_mut()
            .zip(&aligned.cells)
            .for_each(|(c, o)| *c += weight * o);
        Ok(())
    }

    /// `self += other`.
    pub fn add_assign(&mut self, other: &Potential) -> CtpResult<()> {
        self.add_scaled(other, 1.0)
    }

    /// Add `value` to every cell.
    pub fn add_constant(&mut self, value: f64) {
        self.cells.iter_mut().for_each(|c| *c += value);
    }

    /// Largest absolute cell difference against a potential over the same variables.
    pub fn max_abs_diff(&self, other: &Potential) -> CtpResult<f64> {
        if other.scope.len() != self.scope.len() {
            return Err(invalid("scopes differ".to_string()));
        }
        let aligned = other.marginalize(&self.scope)?;
        Ok(self
            .cells
            .iter()
            .zip(&aligned.cells)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max))
    }

    fn split_on(&self, variable: &Variable) -> CtpResult<(usize, usize, Vec<usize>, Vec<usize>)> {
        let position = self
            .scope
            .iter()
            .position(|v| v == variable)
            .ok_or_else(|| invalid(format!("{variable} not in scope")))?;
        let all = strides(&self.scope);
        let mut others = Vec::with_capacity(self.scope.len() - 1);
        let mut other_strides = Vec::with_capacity(self.scope.len() - 1);
        for (i, v) in self.scope.iter().enumerate() {
            if i != position {
                others.push(v.cardinality());
                other_strides.push(all[i]);
            }
        }
        Ok((position, all[position], others, other_strides))
    }
}

fn invalid(reason: String) -> crate::errors::CtpError {
    ModelError::InvalidPotential { reason }.into()
}

fn check_distinct(scope: &[Variable]) -> CtpResult<()> {
    let mut seen = HashSet::with_capacity(scope.len());
    for v in scope {
        if !seen.insert(v) {
            return Err(invalid(format!("{v} appears twice in scope")));
        }
    }
    Ok(())
}

/// Row-major strides of a scope.
fn strides(scope: &[Variable]) -> Vec<usize> {
    let mut result = vec![1; scope.len()];
    for i in (0..scope.len().saturating_sub(1)).rev() {
        result[i] = result[i + 1] * scope[i + 1].cardinality();
    }
    result
}

/// Stride in `operand` of every variable of `target` (0 when absent).
fn strides_in(target: &[Variable], operand: &Potential) -> Vec<usize> {
    let own = strides(&operand.scope);
    target
        .iter()
        .map(|v| {
            operand
                .scope
                .iter()
                .position(|o| o == v)
                .map_or(0, |i| own[i])
        })
        .collect()
}

/// Walk every joint state of `cards` in row-major order, tracking one offset
/// per stride vector.
fn for_each_offset(cards: &[usize], strides: &[&[usize]], mut f: impl FnMut(&[usize])) {
    let total: usize = cards.iter().product();
    let mut counter = vec![0usize; cards.len()];
    let mut offsets = vec![0usize; strides.len()];
    for _ in 0..total {
        f(&offsets);
        let mut digit = cards.len();
        while digit > 0 {
            digit -= 1;
            counter[digit] += 1;
            for (offset, s) in offsets.iter_mut().zip(strides) {
                *offset += s[digit];
            }
            if counter[digit] < cards[digit] {
                break;
            }
            for (offset, s) in offsets.iter_mut().zip(strides) {
                *offset -= s[digit] * cards[digit];
            }
            counter[digit] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, card: usize) -> Variable {
        Variable::with_cardinality(name, card).unwrap()
    }

    #[test]
    fn times_aligns_shared_variables() {
        let a = var("a", 2);
        let b = var("b", 3);
        let pa = Potential::from_cells(vec![a.clone()], vec![0.25, 0.75]).unwrap();
        let pab =
            Potential::from_cells(vec![b.clone(), a.clone()], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap();
        let product = pa.times(&pab);
        assert_eq!(product.scope(), &[a.clone(), b.clone()]);
        // (a=1, b=2) picks pab[b=2, a=1] = 6.0 times 0.75.
        let v = product.value(&[(&a, 1), (&b, 2)]).unwrap();
        assert!((v - 4.5).abs() < 1e-12);
    }

    #[test]
    fn sum_out_and_marginalize_agree() {
        let a = var("a", 2);
        let b = var("b", 2);
        let p = Potential::from_cells(vec![a.clone(), b.clone()], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let by_sum = p.sum_out(&[a.clone()]);
        let by_marg = p.marginalize(&[b.clone()]).unwrap();
        assert_eq!(by_sum, by_marg);
        assert!((by_sum.cells()[0] - 0.4).abs() < 1e-12);
        assert!((by_sum.cells()[1] - 0.6).abs() < 1e-12);
        assert!(p.marginalize(&[var("c", 2)]).is_err());
    }

    #[test]
    fn marginalize_can_reorder() {
        let a = var("a", 2);
        let b = var("b", 3);
        let p = Potential::from_cells(
            vec![a.clone(), b.clone()],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let swapped = p.marginalize(&[b.clone(), a.clone()]).unwrap();
        assert_eq!(swapped.cells(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn project_fixes_state() {
        let a = var("a", 2);
        let b = var("b", 3);
        let p = Potential::from_cells(
            vec![a.clone(), b.clone()],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let on_b = p.project(&b, 1).unwrap();
        assert_eq!(on_b.scope(), &[a.clone()]);
        assert_eq!(on_b.cells(), &[2.0, 5.0]);
        let on_a = p.project(&a, 1).unwrap();
        assert_eq!(on_a.cells(), &[4.0, 5.0, 6.0]);
        assert!(p.project(&a, 2).is_err());
    }

    #[test]
    fn normalize_conditional_handles_zero_mass() {
        let a = var("a", 2);
        let b = var("b", 2);
        let mut p =
            Potential::from_cells(vec![a.clone(), b.clone()], vec![1.0, 0.0, 3.0, 0.0]).unwrap();
        p.normalize_conditional(&a).unwrap();
        // b=0 column normalized over a; b=1 column had no mass.
        assert_eq!(p.cells(), &[0.25, 0.5, 0.75, 0.5]);
    }

    #[test]
    fn indicator_and_identity() {
        let a = var("a", 3);
        let ind = Potential::indicator(&[a.clone()], &[2]).unwrap();
        assert_eq!(ind.cells(), &[0.0, 0.0, 1.0]);
        let same = Potential::identity().times(&ind);
        assert_eq!(same, ind);
        assert!(Potential::indicator(&[a], &[3]).is_err());
    }

    #[test]
    fn add_scaled_aligns_scope_order() {
        let a = var("a", 2);
        let b = var("b", 2);
        let mut p = Potential::zeros(vec![a.clone(), b.clone()]).unwrap();
        let q = Potential::from_cells(vec![b.clone(), a.clone()], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        p.add_scaled(&q, 2.0).unwrap();
        assert_eq!(p.cells(), &[2.0, 6.0, 4.0, 8.0]);
    }

    #[test]
    fn from_cells_validates() {
        let a = var("a", 2);
        assert!(Potential::from_cells(vec![a.clone()], vec![1.0]).is_err());
        assert!(Potential::from_cells(vec![a.clone()], vec![1.0, -1.0]).is_err());
        assert!(Potential::from_cells(vec![a.clone(), a], vec![1.0; 4]).is_err());
    }
}
