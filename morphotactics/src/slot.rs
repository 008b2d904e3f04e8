//! The slot model: named groups of rules with weighted continuations.
//!
//! A slot is analogous to a continuation class in LEXC: a group of rules
//! that can all serve as the continuation to some other class' rule. A rule
//! may name a slot that has not been declared yet; compilation resolves the
//! reference, so rules are effectively processed lazily.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::stem_guesser::StemAcceptor;

/// Phone classes for stem guessing: class character to the symbols it
/// expands to. Symbols may be multi-character tokens (`"kw"`, `"a:"`).
pub type Alphabet = BTreeMap<char, Vec<String>>;

/// Reserved name of the virtual root the compiler hangs starting slots on.
pub(crate) const ROOT: &str = "start";

/// Where a rule goes after matching: another slot, or nowhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    /// Target slot name; `None` means the rule ends at an accepting state.
    pub target: Option<String>,
    /// Cost of entering the continuation. For a terminal this becomes the
    /// final weight of the accepting state.
    pub weight: f32,
}

impl Continuation {
    /// Continue into the slot called `target`.
    pub fn to(target: impl Into<String>, weight: f32) -> Self {
        Continuation {
            target: Some(target.into()),
            weight,
        }
    }

    /// Terminal continuation: the rule's destination is an accepting state.
    pub fn stop(weight: f32) -> Self {
        Continuation {
            target: None,
            weight,
        }
    }
}

/// One morphotactic rule.
///
/// `lower` is consumed from the input tape during analysis and `upper` is
/// emitted on the output tape; `weight` is the cost of selecting this rule
/// from the slot's entry state.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub upper: String,
    pub lower: String,
    pub continuations: Vec<Continuation>,
    pub weight: f32,
}

impl Rule {
    pub fn new(
        upper: impl Into<String>,
        lower: impl Into<String>,
        continuations: Vec<Continuation>,
        weight: f32,
    ) -> Self {
        Rule {
            upper: upper.into(),
            lower: lower.into(),
            continuations,
            weight,
        }
    }
}

/// A named morpheme class; one vertex of the continuation graph.
#[derive(Debug, Clone)]
pub struct Slot {
    pub name: String,
    /// Marks the slot as a root of the lexicon; any legal word begins by
    /// matching one of a starting slot's rules.
    pub start: bool,
    pub(crate) kind: SlotKind,
}

/// A slot either lists rules or carries a pre-compiled stem acceptor.
#[derive(Debug, Clone)]
pub(crate) enum SlotKind {
    Rules(Vec<Rule>),
    Guesser {
        acceptor: StemAcceptor,
        continuations: Vec<Continuation>,
    },
}

impl Slot {
    /// Builds a regular slot. Refuses the reserved root name and any rule
    /// with an empty continuation list.
    pub fn new(name: &str, rules: Vec<Rule>, start: bool) -> Result<Slot> {
        Self::check_name(name)?;
        for rule in &rules {
            if rule.continuations.is_empty() {
                return Err(Error::EmptyContinuations {
                    slot: name.to_string(),
                });
            }
        }
        Ok(Slot {
            name: name.to_string(),
            start,
            kind: SlotKind::Rules(rules),
        })
    }

    pub(crate) fn check_name(name: &str) -> Result<()> {
        if name == ROOT {
            return Err(Error::ReservedSlotName);
        }
        Ok(())
    }

    /// The slot's rules; empty for a stem guesser.
    pub fn rules(&self) -> &[Rule] {
        match &self.kind {
            SlotKind::Rules(rules) => rules,
            SlotKind::Guesser { .. } => &[],
        }
    }

    /// Names of the slots this slot can continue into. Terminal
    /// continuations contribute nothing.
    pub(crate) fn continuation_targets(&self) -> BTreeSet<&str> {
        let continuations: Box<dyn Iterator<Item = &Continuation>> = match &self.kind {
            SlotKind::Rules(rules) => Box::new(rules.iter().flat_map(|r| r.continuations.iter())),
            SlotKind::Guesser { continuations, .. } => Box::new(continuations.iter()),
        };
        continuations.filter_map(|c| c.target.as_deref()).collect()
    }
}
