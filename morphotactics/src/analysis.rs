//! Composing input strings with a compiled transducer and decoding the
//! weighted analyses. The compiler itself never calls into this module;
//! it exists for callers (and tests) that want to run analyses without
//! standing up their own composition pipeline.

use std::cmp::Ordering;

use itertools::Itertools;
use rustfst::prelude::compose::compose;
use rustfst::prelude::*;
use rustfst::{Semiring, SymbolTable, Tr};

use crate::error::{Error, Result};
use crate::symbols::{decode_labels, lookup_labels};

/// Composes a linear acceptor for `input` with `fst` (on its input tape).
/// `Ok(None)` when some character of `input` is outside the alphabet, in
/// which case nothing can match.
pub(crate) fn compose_with_input(
    fst: &VectorFst<TropicalWeight>,
    symbols: &SymbolTable,
    input: &str,
) -> Result<Option<VectorFst<TropicalWeight>>> {
    let Some(labels) = lookup_labels(symbols, input) else {
        return Ok(None);
    };
    let mut acceptor = VectorFst::<TropicalWeight>::new();
    let mut state = acceptor.add_state();
    acceptor.set_start(state)?;
    for label in labels {
        let next = acceptor.add_state();
        acceptor.add_tr(state, Tr::new(label, label, TropicalWeight::one(), next))?;
        state = next;
    }
    acceptor.set_final(state, TropicalWeight::one())?;

    let mut machine = fst.clone();
    tr_sort(&mut acceptor, OLabelCompare {});
    tr_sort(&mut machine, ILabelCompare {});
    let composed: VectorFst<TropicalWeight> = compose(acceptor, machine)?;
    Ok(Some(composed))
}

/// Whether the automaton admits at least one accepting path for `input`.
pub(crate) fn has_accepting_path(
    fst: &VectorFst<TropicalWeight>,
    symbols: &SymbolTable,
    input: &str,
) -> bool {
    match compose_with_input(fst, symbols, input) {
        Ok(Some(composed)) => composed.paths_iter().next().is_some(),
        _ => false,
    }
}

/// All analyses of `input`: every upper-tape string reachable along an
/// accepting path, with its accumulated weight, cheapest first. Distinct
/// paths emitting the same string are reported separately; the compiler
/// goes out of its way not to collapse them.
pub fn analyses(fst: &VectorFst<TropicalWeight>, input: &str) -> Result<Vec<(String, f32)>> {
    let symbols = fst
        .input_symbols()
        .ok_or_else(|| Error::MalformedFst("transducer carries no input symbol table".into()))?;
    let output_symbols = fst
        .output_symbols()
        .ok_or_else(|| Error::MalformedFst("transducer carries no output symbol table".into()))?;
    let Some(composed) = compose_with_input(fst, symbols, input)? else {
        return Ok(Vec::new());
    };
    let results = composed
        .paths_iter()
        .map(|path| (decode_labels(output_symbols, &path.olabels), *path.weight.value()))
        .sorted_by(|(_, w1), (_, w2)| w1.partial_cmp(w2).unwrap_or(Ordering::Equal))
        .collect();
    Ok(results)
}

/// The cheapest analysis of `input`. `Error::NoAnalysis` when the
/// transducer rejects it.
pub fn analyze(fst: &VectorFst<TropicalWeight>, input: &str) -> Result<(String, f32)> {
    analyses(fst, input)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoAnalysis {
            input: input.to_string(),
        })
}

/// Whether `input` is in the transducer's lower-tape language.
pub fn accepts(fst: &VectorFst<TropicalWeight>, input: &str) -> bool {
    analyses(fst, input).map(|a| !a.is_empty()).unwrap_or(false)
}
