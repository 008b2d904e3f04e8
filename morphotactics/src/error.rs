//! Error taxonomy for lexicon construction and compilation.

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building slots or compiling a lexicon.
///
/// All variants are fatal to the operation that raised them; no partial
/// transducer is ever returned.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("need at least 1 slot to be a starting slot")]
    NoStartingSlot,

    #[error("slot {slot:?} is declared more than once")]
    DuplicateSlotName { slot: String },

    #[error("\"start\" is reserved for the virtual root and cannot name a slot")]
    ReservedSlotName,

    #[error(
        "slot {slot:?}: every rule needs at least one continuation; \
         use Continuation::stop to mark a terminal"
    )]
    EmptyContinuations { slot: String },

    #[error("slot {slot:?} continues to {target:?}, which is not in the lexicon")]
    DanglingContinuation { slot: String, target: String },

    #[error("unmatched brackets")]
    UnmatchedBracket,

    #[error("unmatched parentheses")]
    UnmatchedParen,

    #[error("quantifier with nothing to repeat")]
    EmptyQuantifier,

    #[error("alphabet required if the constraint includes sigma")]
    MissingAlphabet,

    #[error("FST malformed: {0}")]
    MalformedFst(String),

    #[error("no analysis for {input:?}")]
    NoAnalysis { input: String },

    /// A fault surfaced by the underlying FST library.
    #[error(transparent)]
    Fst(#[from] anyhow::Error),
}
