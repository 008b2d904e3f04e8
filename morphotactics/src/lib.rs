//! Compile declarative morphotactic lexicons into weighted finite-state
//! transducers over the tropical semiring.
//!
//! A lexicon is a set of [`Slot`]s: named groups of rules, each rule a
//! (upper, lower, continuations, weight) quadruple. Continuations name
//! other slots — cycles allowed — or terminate at an accepting state.
//! [`compile`] resolves the continuation graph into a single
//! `VectorFst<TropicalWeight>` that consumes the lower alphabet and emits
//! the upper, so composing an input word against it yields every analysis
//! with its accumulated cost. Out-of-vocabulary stems are handled by
//! [`Slot::stem_guesser`], which compiles a phonotactic constraint into an
//! acceptor and splices it in as an ordinary slot.
//!
//! ```
//! use morphotactics::{analyze, compile, Continuation, Rule, Slot};
//!
//! let fst = compile(vec![
//!     Slot::new(
//!         "Subject",
//!         vec![Rule::new("ni-", "ni", vec![Continuation::to("Stem", 0.0)], 0.0)],
//!         true,
//!     )?,
//!     Slot::new(
//!         "Stem",
//!         vec![Rule::new("kwa", "kwa", vec![Continuation::stop(0.0)], 0.0)],
//!         false,
//!     )?,
//! ])?;
//!
//! let (analysis, weight) = analyze(&fst, "nikwa")?;
//! assert_eq!(analysis, "ni-kwa");
//! assert_eq!(weight, 0.0);
//! # Ok::<(), morphotactics::Error>(())
//! ```
//!
//! The compiler preserves weighted non-determinism: a lexicon whose
//! transducer is not deterministic on both tapes is returned without
//! determinization, so alternative analyses of the same word keep their
//! separate weights.

pub mod analysis;
pub mod compiler;
pub mod error;
mod fst_ops;
pub mod slot;
pub mod stem_guesser;
mod symbols;

pub use analysis::{accepts, analyses, analyze};
pub use compiler::compile;
pub use error::{Error, Result};
pub use slot::{Alphabet, Continuation, Rule, Slot};
pub use stem_guesser::StemAcceptor;
