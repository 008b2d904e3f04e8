//! Stem guessing: compiling a minimal-word constraint into an acceptor.
//!
//! A stem guesser is a special slot that recognizes out-of-vocabulary stems
//! by their surface shape instead of listing them, so affix slots around it
//! can still be segmented off. The constraint language is a small regex
//! over phone classes: `()` scopes concatenate, `[]` unions, `.` is sigma
//! (any symbol of the alphabet, never epsilon), and `?` `*` `+` quantify
//! the preceding atom. A single character that is a key of the alphabet
//! expands to the union of that class's symbols; any other character
//! stands for itself. Long vowels are assumed pre-expanded by the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustfst::prelude::closure::{closure, ClosureType};
use rustfst::prelude::concat::concat;
use rustfst::prelude::union::union;
use rustfst::prelude::{ExpandedFst, MutableFst, TropicalWeight, VectorFst};
use rustfst::{Semiring, SymbolTable, Tr};

use crate::analysis::has_accepting_path;
use crate::error::{Error, Result};
use crate::fst_ops::optimize_fst;
use crate::slot::{Alphabet, Continuation, Slot, SlotKind};

/// A compiled minimal-word constraint: the acceptor plus the symbol table
/// its labels were interned against.
#[derive(Debug, Clone)]
pub struct StemAcceptor {
    pub fsa: VectorFst<TropicalWeight>,
    pub symbols: Arc<SymbolTable>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Scope,
    Union,
    Sigma,
    Symbol,
    Processed,
}

struct Frame {
    kind: FrameKind,
    fst: VectorFst<TropicalWeight>,
}

fn empty_acceptor() -> Result<VectorFst<TropicalWeight>> {
    let mut fst = VectorFst::<TropicalWeight>::new();
    let s = fst.add_state();
    fst.set_start(s)?;
    fst.set_final(s, TropicalWeight::one())?;
    Ok(fst)
}

/// Linear acceptor for one symbol, one arc per character.
fn symbol_acceptor(symt: &mut SymbolTable, symbol: &str) -> Result<VectorFst<TropicalWeight>> {
    let mut fst = VectorFst::<TropicalWeight>::new();
    let mut state = fst.add_state();
    fst.set_start(state)?;
    for c in symbol.chars() {
        let label = symt.add_symbol(c.to_string());
        let next = fst.add_state();
        fst.add_tr(state, Tr::new(label, label, TropicalWeight::one(), next))?;
        state = next;
    }
    fst.set_final(state, TropicalWeight::one())?;
    Ok(fst)
}

/// Union over a set of symbols. An empty set accepts nothing.
fn symbols_acceptor<'a>(
    symt: &mut SymbolTable,
    symbols: impl IntoIterator<Item = &'a str>,
) -> Result<VectorFst<TropicalWeight>> {
    let mut fst: Option<VectorFst<TropicalWeight>> = None;
    for symbol in symbols {
        let piece = symbol_acceptor(symt, symbol)?;
        match fst.as_mut() {
            None => fst = Some(piece),
            Some(f) => union(f, &piece)?,
        }
    }
    match fst {
        Some(f) => Ok(f),
        None => {
            // no symbols: a start state with no accepting path
            let mut f = VectorFst::<TropicalWeight>::new();
            let s = f.add_state();
            f.set_start(s)?;
            Ok(f)
        }
    }
}

/// One atom of the constraint: a class key expands to its symbols, any
/// other character stands for itself.
fn atom_acceptor(
    symt: &mut SymbolTable,
    c: char,
    alphabet: &Alphabet,
) -> Result<VectorFst<TropicalWeight>> {
    match alphabet.get(&c) {
        Some(class) => symbols_acceptor(symt, class.iter().map(String::as_str)),
        None => symbol_acceptor(symt, &c.to_string()),
    }
}

/// Sigma: any single symbol of the alphabet. Phone classes may overlap, so
/// the symbols are deduplicated first.
fn sigma_acceptor(symt: &mut SymbolTable, alphabet: &Alphabet) -> Result<VectorFst<TropicalWeight>> {
    let symbols: BTreeSet<&str> = alphabet
        .values()
        .flat_map(|class| class.iter().map(String::as_str))
        .collect();
    symbols_acceptor(symt, symbols)
}

impl StemAcceptor {
    /// Scans the constraint left to right, maintaining a stack of partial
    /// acceptors, then concatenates the stack and optimizes the result.
    ///
    /// Brackets and parentheses must balance and do not nest. Inside a
    /// bracketed group every character loses operator meaning and folds in
    /// as an atom; the first atom after `[` seeds the union. A quantifier
    /// applies a closure to the acceptor on top of the stack, so `(…)` and
    /// `[…]` quantify as a whole once closed. `X*` additionally admits the
    /// empty string when the star ends a one-frame constraint or `X` is
    /// sigma.
    pub fn compile(constraint: &str, alphabet: &Alphabet) -> Result<StemAcceptor> {
        let mut symt = SymbolTable::new();
        let mut brackets: Vec<char> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let chars: Vec<char> = constraint.chars().collect();

        for (i, &c) in chars.iter().enumerate() {
            match c {
                '[' | '(' => {
                    if !brackets.is_empty() {
                        // groups do not nest
                        return Err(if c == '[' {
                            Error::UnmatchedBracket
                        } else {
                            Error::UnmatchedParen
                        });
                    }
                    brackets.push(c);
                    frames.push(Frame {
                        kind: if c == '[' {
                            FrameKind::Union
                        } else {
                            FrameKind::Scope
                        },
                        fst: empty_acceptor()?,
                    });
                }
                ')' => {
                    if brackets.pop() != Some('(') {
                        return Err(Error::UnmatchedParen);
                    }
                    if let Some(top) = frames.last_mut() {
                        top.kind = FrameKind::Processed;
                    }
                }
                ']' => {
                    if brackets.pop() != Some('[') {
                        return Err(Error::UnmatchedBracket);
                    }
                    if let Some(top) = frames.last_mut() {
                        top.kind = FrameKind::Processed;
                    }
                }
                _ if !brackets.is_empty() => {
                    // fold the atom into the open group
                    let atom = atom_acceptor(&mut symt, c, alphabet)?;
                    let top = frames.last_mut().ok_or(Error::UnmatchedBracket)?;
                    match top.kind {
                        FrameKind::Scope => concat(&mut top.fst, &atom)?,
                        FrameKind::Union => {
                            if top.fst.num_states() == 1 {
                                // seed: don't union with the empty string
                                concat(&mut top.fst, &atom)?;
                            } else {
                                union(&mut top.fst, &atom)?;
                            }
                        }
                        _ => unreachable!("open group frame is always scope or union"),
                    }
                }
                '.' => {
                    if alphabet.is_empty() {
                        return Err(Error::MissingAlphabet);
                    }
                    frames.push(Frame {
                        kind: FrameKind::Sigma,
                        fst: sigma_acceptor(&mut symt, alphabet)?,
                    });
                }
                '?' => {
                    if i == 0 {
                        return Err(Error::EmptyQuantifier);
                    }
                    let top = frames.last_mut().ok_or(Error::EmptyQuantifier)?;
                    union(&mut top.fst, &empty_acceptor()?)?;
                }
                '*' => {
                    if i == 0 {
                        return Err(Error::EmptyQuantifier);
                    }
                    let top = frames.last_mut().ok_or(Error::EmptyQuantifier)?;
                    closure(&mut top.fst, ClosureType::ClosureStar);
                    let whole_constraint = frames.len() == 1 && i == chars.len() - 1;
                    let top = frames.last_mut().ok_or(Error::EmptyQuantifier)?;
                    if whole_constraint || top.kind == FrameKind::Sigma {
                        union(&mut top.fst, &empty_acceptor()?)?;
                    }
                }
                '+' => {
                    if i == 0 {
                        return Err(Error::EmptyQuantifier);
                    }
                    let top = frames.last_mut().ok_or(Error::EmptyQuantifier)?;
                    closure(&mut top.fst, ClosureType::ClosurePlus);
                }
                _ => {
                    frames.push(Frame {
                        kind: FrameKind::Symbol,
                        fst: atom_acceptor(&mut symt, c, alphabet)?,
                    });
                }
            }
        }

        if let Some(&open) = brackets.last() {
            return Err(if open == '(' {
                Error::UnmatchedParen
            } else {
                Error::UnmatchedBracket
            });
        }

        let mut fsa = empty_acceptor()?;
        for frame in frames {
            concat(&mut fsa, &frame.fst)?;
        }
        optimize_fst(&mut fsa)?;
        Ok(StemAcceptor {
            fsa,
            symbols: Arc::new(symt),
        })
    }

    /// Whether `input` is in the acceptor's language.
    pub fn accepts(&self, input: &str) -> bool {
        has_accepting_path(&self.fsa, &self.symbols, input)
    }
}

impl Slot {
    /// Builds a stem-guesser slot: the constraint is compiled eagerly and
    /// the continuations apply uniformly to every accepting state of the
    /// acceptor.
    pub fn stem_guesser(
        min_word_constraint: &str,
        name: &str,
        continuations: Vec<Continuation>,
        alphabet: &Alphabet,
        start: bool,
    ) -> Result<Slot> {
        Self::check_name(name)?;
        if continuations.is_empty() {
            return Err(Error::EmptyContinuations {
                slot: name.to_string(),
            });
        }
        let acceptor = StemAcceptor::compile(min_word_constraint, alphabet)?;
        Ok(Slot {
            name: name.to_string(),
            start,
            kind: SlotKind::Guesser {
                acceptor,
                continuations,
            },
        })
    }
}
