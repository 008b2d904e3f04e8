//! Character-level interning against a rustfst symbol table.
//!
//! Multi-character tokens such as `"kw"` or `"a:"` are sequences of
//! character labels, so a token expands to a chain of arcs rather than a
//! single label. Label 0 is epsilon by symbol-table convention.

use rustfst::{Label, SymbolTable};

/// Interns every character of `text`, returning the label sequence.
pub(crate) fn intern_labels(symt: &mut SymbolTable, text: &str) -> Vec<Label> {
    text.chars().map(|c| symt.add_symbol(c.to_string())).collect()
}

/// Looks up the label sequence for `text` without extending the table.
/// `None` if any character is unknown, in which case no path can match it.
pub(crate) fn lookup_labels(symt: &SymbolTable, text: &str) -> Option<Vec<Label>> {
    text.chars().map(|c| symt.get_label(c.to_string())).collect()
}

/// Concatenates the symbols for a label sequence, skipping epsilons.
pub(crate) fn decode_labels(symt: &SymbolTable, labels: &[Label]) -> String {
    labels
        .iter()
        .filter(|&&l| l != 0)
        .filter_map(|&l| symt.get_symbol(l))
        .collect()
}
