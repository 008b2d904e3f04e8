//! The morphotactics compiler: turns a set of slots into one weighted
//! transducer over the tropical semiring.
//!
//! Continuation dependencies may be cyclic, so a slot cannot simply be
//! concatenated onto its continuations' automata — the continuation may
//! still be under construction at that point. Instead the compiler makes
//! two passes over the continuation graph: the first materializes every
//! reachable slot's per-rule automata into the master transducer and
//! records where each rule ends, the second installs the epsilon arcs that
//! realize the continuations. By the time any cross-reference is wired,
//! every entry vertex it could name already exists.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;
use rustfst::prelude::rm_epsilon::rm_epsilon;
use rustfst::prelude::{
    CoreFst, ExpandedFst, Fst, MutableFst, StateIterator, TropicalWeight, VectorFst,
};
use rustfst::{Semiring, StateId, SymbolTable, Tr};

use crate::error::{Error, Result};
use crate::fst_ops::{
    add_final_weight, is_input_deterministic, is_output_deterministic, optimize_fst,
    rule_transducer, splice, translate_label, verify,
};
use crate::slot::{Continuation, Slot, SlotKind, ROOT};
use crate::symbols::intern_labels;

/// Recursive depth-first search, polymorphic in its per-vertex actions.
/// Runs in O(|V| + |E|) when the callbacks are O(1). On first visit of a
/// vertex it calls `visit`, recurses over `neighbors(vertex)`, then calls
/// `finish`; on a repeat visit it calls `revisit` and stops.
fn dfs<S, N, V, R, F>(
    state: &mut S,
    visited: &mut BTreeSet<String>,
    vertex: &str,
    neighbors: &N,
    visit: &mut V,
    revisit: &mut R,
    finish: &mut F,
) -> Result<()>
where
    N: Fn(&str) -> Vec<String>,
    V: FnMut(&mut S, &str) -> Result<()>,
    R: FnMut(&mut S, &str) -> Result<()>,
    F: FnMut(&mut S, &str) -> Result<()>,
{
    if visited.contains(vertex) {
        return revisit(state, vertex);
    }
    visit(state, vertex)?;
    visited.insert(vertex.to_string());
    for neighbor in neighbors(vertex) {
        dfs(state, visited, &neighbor, neighbors, visit, revisit, finish)?;
    }
    finish(state, vertex)
}

/// Shared mutable state of one compile call: the master transducer, its
/// symbol table, and the side tables threading data between the passes.
/// Keeping the per-slot final vertices here rather than on the slots keeps
/// `Slot` a plain value type.
struct Build {
    fst: VectorFst<TropicalWeight>,
    symbols: SymbolTable,
    start_states: BTreeMap<String, StateId>,
    final_states: BTreeMap<String, Vec<StateId>>,
}

/// Compiles a lexicon into a single transducer accepting the lower
/// alphabet and emitting the upper, with path weights accumulated in the
/// tropical semiring.
///
/// Slots unreachable from any starting slot are omitted. The language and
/// weights of the result do not depend on the order of `slots`, only the
/// internal vertex numbering does.
///
/// Errors: no starting slot, duplicate slot names, a continuation naming a
/// slot absent from `slots`, or structural verification failure.
pub fn compile(slots: Vec<Slot>) -> Result<VectorFst<TropicalWeight>> {
    let mut slot_map: BTreeMap<String, Slot> = BTreeMap::new();
    for slot in slots {
        let name = slot.name.clone();
        if slot_map.insert(name.clone(), slot).is_some() {
            return Err(Error::DuplicateSlotName { slot: name });
        }
    }

    let starting: Vec<String> = slot_map
        .values()
        .filter(|slot| slot.start)
        .map(|slot| slot.name.clone())
        .collect();
    if starting.is_empty() {
        return Err(Error::NoStartingSlot);
    }

    // resolve the continuation graph before allocating anything
    for slot in slot_map.values() {
        for target in slot.continuation_targets() {
            if !slot_map.contains_key(target) {
                return Err(Error::DanglingContinuation {
                    slot: slot.name.clone(),
                    target: target.to_string(),
                });
            }
        }
    }

    let neighbors = |vertex: &str| -> Vec<String> {
        if vertex == ROOT {
            starting.clone()
        } else {
            slot_map[vertex]
                .continuation_targets()
                .into_iter()
                .map(String::from)
                .collect()
        }
    };

    let mut build = Build {
        fst: VectorFst::new(),
        symbols: SymbolTable::new(),
        start_states: BTreeMap::new(),
        final_states: BTreeMap::new(),
    };

    // pass 1: copy every reachable slot's automata into the master
    let mut visited = BTreeSet::new();
    dfs(
        &mut build,
        &mut visited,
        ROOT,
        &neighbors,
        &mut |build, vertex| materialize_slot(build, &slot_map, vertex),
        &mut |_, _| Ok(()),
        &mut |_, _| Ok(()),
    )?;
    debug!(
        "materialized {} slots into {} states",
        build.start_states.len() - 1,
        build.fst.num_states()
    );

    // pass 2: every entry vertex now exists, so wire the continuations
    let mut visited = BTreeSet::new();
    dfs(
        &mut build,
        &mut visited,
        ROOT,
        &neighbors,
        &mut |build, vertex| wire_slot(build, &slot_map, &starting, vertex),
        &mut |_, _| Ok(()),
        &mut |_, _| Ok(()),
    )?;

    let Build {
        mut fst, symbols, ..
    } = build;

    if !verify(&fst) {
        return Err(Error::MalformedFst(
            "structural verification failed after wiring".into(),
        ));
    }

    // epsilon arcs from the wiring would interfere with the determinism
    // inspection below
    rm_epsilon(&mut fst)?;

    if is_input_deterministic(&fst)? && is_output_deterministic(&fst)? {
        debug!("deterministic on both tapes; optimizing");
        optimize_fst(&mut fst)?;
    } else {
        // determinization would fold distinct weighted paths
        debug!("non-deterministic; returning unoptimized");
    }

    let symbols = Arc::new(symbols);
    fst.set_input_symbols(symbols.clone());
    fst.set_output_symbols(symbols);
    Ok(fst)
}

/// Pass-1 action: allocate the slot's entry vertex and copy its automata
/// in. A guesser's acceptor is spliced whole, one final vertex per
/// accepting state; a rule list becomes one linear transducer per rule,
/// one final vertex each, in rule order.
fn materialize_slot(
    build: &mut Build,
    slot_map: &BTreeMap<String, Slot>,
    vertex: &str,
) -> Result<()> {
    let Build {
        fst,
        symbols,
        start_states,
        final_states,
    } = build;

    if vertex == ROOT {
        let root = fst.add_state();
        fst.set_start(root)?;
        start_states.insert(ROOT.to_string(), root);
        return Ok(());
    }

    let slot = &slot_map[vertex];
    let entry = fst.add_state();

    match &slot.kind {
        SlotKind::Guesser { acceptor, .. } => {
            let map = splice(fst, &acceptor.fsa, entry, &mut |label| {
                translate_label(&acceptor.symbols, symbols, label)
            })?;
            // the acceptor's own notion of finality survives only here:
            // its accepting states become the guesser's final vertices
            let mut finals = Vec::new();
            for state in acceptor.fsa.states_iter() {
                if let Some(weight) = acceptor.fsa.final_weight(state)? {
                    if weight != TropicalWeight::zero() {
                        finals.push(map[state as usize]);
                    }
                }
            }
            final_states.insert(vertex.to_string(), finals);
        }
        SlotKind::Rules(rules) => {
            let mut finals = Vec::with_capacity(rules.len());
            for rule in rules {
                let lower = intern_labels(symbols, &rule.lower);
                let upper = intern_labels(symbols, &rule.upper);
                let (chain, last) = rule_transducer(&lower, &upper, rule.weight)?;
                let map = splice(fst, &chain, entry, &mut |label| Ok(label))?;
                finals.push(map[last as usize]);
            }
            final_states.insert(vertex.to_string(), finals);
        }
    }

    start_states.insert(vertex.to_string(), entry);
    Ok(())
}

/// Pass-2 action: for the virtual root, free epsilon arcs to every
/// starting slot (starting slots never implicitly concatenate — each one
/// hangs off the root separately). For a slot, each rule's final vertex
/// gets its continuations installed; a guesser applies its single
/// continuation list to every final vertex it produced.
fn wire_slot(
    build: &mut Build,
    slot_map: &BTreeMap<String, Slot>,
    starting: &[String],
    vertex: &str,
) -> Result<()> {
    let Build {
        fst,
        start_states,
        final_states,
        ..
    } = build;

    if vertex == ROOT {
        let root = start_states[ROOT];
        for name in starting {
            let entry = start_states[name.as_str()];
            fst.add_tr(root, Tr::new(0, 0, TropicalWeight::one(), entry))?;
        }
        return Ok(());
    }

    let slot = &slot_map[vertex];
    let finals = &final_states[vertex];
    match &slot.kind {
        SlotKind::Guesser { continuations, .. } => {
            for &from in finals {
                wire_continuations(fst, start_states, from, continuations)?;
            }
        }
        SlotKind::Rules(rules) => {
            for (rule, &from) in rules.iter().zip(finals) {
                wire_continuations(fst, start_states, from, &rule.continuations)?;
            }
        }
    }
    Ok(())
}

fn wire_continuations(
    fst: &mut VectorFst<TropicalWeight>,
    start_states: &BTreeMap<String, StateId>,
    from: StateId,
    continuations: &[Continuation],
) -> Result<()> {
    for continuation in continuations {
        match &continuation.target {
            None => add_final_weight(fst, from, continuation.weight)?,
            Some(target) => {
                let entry = start_states[target.as_str()];
                fst.add_tr(
                    from,
                    Tr::new(0, 0, TropicalWeight::new(continuation.weight), entry),
                )?;
            }
        }
    }
    Ok(())
}
