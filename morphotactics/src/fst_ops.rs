//! Structural operations on the mutable transducer the compiler builds:
//! per-rule chain construction, copying one automaton into another,
//! finality bookkeeping, verification, determinism probes, optimization.

use rustfst::prelude::determinize::{determinize_with_config, DeterminizeConfig, DeterminizeType};
use rustfst::prelude::rm_epsilon::rm_epsilon;
use rustfst::prelude::{CoreFst, ExpandedFst, MutableFst, StateIterator};
use rustfst::prelude::{minimize_with_config, MinimizeConfig, TropicalWeight, VectorFst};
use rustfst::{Label, Semiring, StateId, SymbolTable, Tr, Trs};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Builds the linear transducer for one rule: `lower` consumed on the
/// input tape, `upper` emitted on the output tape, the shorter side padded
/// with epsilons, and the rule weight carried on the first arc. A rule
/// empty on both tapes still gets a single weighted eps:eps arc so it owns
/// a final vertex distinct from the slot entry.
///
/// Returns the chain and its last state. No state is marked final; the
/// caller decides finality when wiring continuations.
pub(crate) fn rule_transducer(
    lower: &[Label],
    upper: &[Label],
    weight: f32,
) -> Result<(VectorFst<TropicalWeight>, StateId)> {
    let mut fst = VectorFst::<TropicalWeight>::new();
    let len = lower.len().max(upper.len()).max(1);
    let mut state = fst.add_state();
    fst.set_start(state)?;
    for i in 0..len {
        let next = fst.add_state();
        let ilabel = lower.get(i).copied().unwrap_or(0);
        let olabel = upper.get(i).copied().unwrap_or(0);
        let w = if i == 0 {
            TropicalWeight::new(weight)
        } else {
            TropicalWeight::one()
        };
        fst.add_tr(state, Tr::new(ilabel, olabel, w, next))?;
        state = next;
    }
    Ok((fst, state))
}

/// Copies `src` into `dst` arc by arc, identifying `src`'s start state
/// with `entry` and allocating a fresh contiguous block for the rest.
/// Arc labels pass through `relabel` so an automaton interned against a
/// different symbol table can be re-expressed in `dst`'s terms.
///
/// Final weights of `src` are not carried over; the caller inspects them
/// through the returned state map. This is what makes it safe to
/// materialize a slot before its continuations exist.
pub(crate) fn splice(
    dst: &mut VectorFst<TropicalWeight>,
    src: &VectorFst<TropicalWeight>,
    entry: StateId,
    relabel: &mut dyn FnMut(Label) -> Result<Label>,
) -> Result<Vec<StateId>> {
    let src_start = src
        .start()
        .ok_or_else(|| Error::MalformedFst("source automaton has no start state".into()))?;
    let mut map = Vec::with_capacity(src.num_states());
    for state in src.states_iter() {
        map.push(if state == src_start {
            entry
        } else {
            dst.add_state()
        });
    }
    for state in src.states_iter() {
        for tr in src.get_trs(state)?.trs() {
            let ilabel = relabel(tr.ilabel)?;
            let olabel = relabel(tr.olabel)?;
            dst.add_tr(
                map[state as usize],
                Tr::new(ilabel, olabel, tr.weight, map[tr.nextstate as usize]),
            )?;
        }
    }
    Ok(map)
}

/// Re-expresses a label from `src` against `dst`, interning the symbol if
/// it is new. Epsilon maps to epsilon.
pub(crate) fn translate_label(
    src: &SymbolTable,
    dst: &mut SymbolTable,
    label: Label,
) -> Result<Label> {
    if label == 0 {
        return Ok(0);
    }
    let symbol = src
        .get_symbol(label)
        .ok_or_else(|| Error::MalformedFst(format!("label {label} missing from symbol table")))?;
    Ok(dst.add_symbol(symbol))
}

/// Marks `state` final with `weight`, combining by the tropical sum (min)
/// when the state is already accepting.
pub(crate) fn add_final_weight(
    fst: &mut VectorFst<TropicalWeight>,
    state: StateId,
    weight: f32,
) -> Result<()> {
    let combined = match fst.final_weight(state)? {
        Some(existing) => existing.value().min(weight),
        None => weight,
    };
    fst.set_final(state, combined)?;
    Ok(())
}

/// Structural soundness: a start state exists, every arc lands inside the
/// automaton, and no weight is NaN.
pub(crate) fn verify(fst: &VectorFst<TropicalWeight>) -> bool {
    let num_states = fst.num_states();
    match fst.start() {
        Some(start) if (start as usize) < num_states => {}
        _ => return false,
    }
    for state in fst.states_iter() {
        let Ok(trs) = fst.get_trs(state) else {
            return false;
        };
        for tr in trs.trs() {
            if tr.nextstate as usize >= num_states || tr.weight.value().is_nan() {
                return false;
            }
        }
        match fst.final_weight(state) {
            Ok(Some(w)) if w.value().is_nan() => return false,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    true
}

fn labels_unique(
    fst: &VectorFst<TropicalWeight>,
    pick: impl Fn(&Tr<TropicalWeight>) -> Label,
) -> Result<bool> {
    let mut seen = HashSet::new();
    for state in fst.states_iter() {
        seen.clear();
        for tr in fst.get_trs(state)?.trs() {
            if !seen.insert(pick(tr)) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// No state has two outgoing arcs sharing an input label (epsilon counts
/// as a label).
pub(crate) fn is_input_deterministic(fst: &VectorFst<TropicalWeight>) -> Result<bool> {
    labels_unique(fst, |tr| tr.ilabel)
}

/// No state has two outgoing arcs sharing an output label.
pub(crate) fn is_output_deterministic(fst: &VectorFst<TropicalWeight>) -> Result<bool> {
    labels_unique(fst, |tr| tr.olabel)
}

/// Epsilon removal, functional determinization, minimization.
///
/// Callers are responsible for only optimizing automata whose weighted
/// alternatives must not collapse; the compiler checks determinism first.
pub(crate) fn optimize_fst(fst: &mut VectorFst<TropicalWeight>) -> Result<()> {
    rm_epsilon(fst)?;
    let determinized: VectorFst<TropicalWeight> = determinize_with_config(
        fst,
        DeterminizeConfig {
            delta: 1e-7,
            det_type: DeterminizeType::DeterminizeFunctional,
        },
    )?;
    *fst = determinized;
    minimize_with_config(
        fst,
        MinimizeConfig {
            delta: 1e-7,
            allow_nondet: true,
        },
    )?;
    Ok(())
}
