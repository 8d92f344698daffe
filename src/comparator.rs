//! # Filename Comparators
//!
//! Entries inside a directory node are kept sorted under an injected, total
//! ordering. Which ordering applies is a property of the filesystem, chosen
//! at creation time and recorded in the directory header flags: plain byte
//! order, case-insensitive, Unicode-NFC-insensitive, or both combined.
//!
//! The comparator must stay fixed for the lifetime of an on-disk tree.
//! Reopening a tree under a different ordering makes the sorted invariant
//! meaningless and the lookup results undefined; this module offers
//! [`comparator_for_flags`] so the opener derives the comparator from the
//! same persisted flags every time.
//!
//! Case folding uses `str::to_lowercase`, normalization uses Unicode NFC.
//! Both allocate per comparison; directory fanout is small enough (at most
//! a dozen comparisons per level) that this has never shown up in profiles.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::config::{FLAG_CASE_FOLD, FLAG_NFC};

/// A total ordering over filenames.
///
/// Implementations must be consistent: for the lifetime of a tree, equal
/// inputs compare equal and the relation is transitive. The engine performs
/// binary searches and sorted inserts under this ordering and persists the
/// resulting order to disk.
pub trait NameComparator: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// Identifier for diagnostics.
    fn name(&self) -> &'static str;
}

/// Byte-wise UTF-8 ordering. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryNameComparator;

impl NameComparator for BinaryNameComparator {
    #[inline]
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

/// Case-insensitive ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFoldComparator;

impl NameComparator for CaseFoldComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.to_lowercase().cmp(&b.to_lowercase())
    }

    fn name(&self) -> &'static str {
        "case-fold"
    }
}

/// Ordering insensitive to Unicode composition differences. "é" spelled as
/// a single code point and as "e" plus a combining accent compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NfcComparator;

impl NameComparator for NfcComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.nfc().cmp(b.nfc())
    }

    fn name(&self) -> &'static str {
        "nfc"
    }
}

/// Case-insensitive ordering over NFC-normalized names.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFoldNfcComparator;

impl NameComparator for CaseFoldNfcComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let a: String = a.nfc().collect::<String>().to_lowercase();
        let b: String = b.nfc().collect::<String>().to_lowercase();
        a.cmp(&b)
    }

    fn name(&self) -> &'static str {
        "case-fold-nfc"
    }
}

/// Maps directory header flag bits to the comparator they select.
pub fn comparator_for_flags(flags: u32) -> Box<dyn NameComparator> {
    match (flags & FLAG_CASE_FOLD != 0, flags & FLAG_NFC != 0) {
        (false, false) => Box::new(BinaryNameComparator),
        (true, false) => Box::new(CaseFoldComparator),
        (false, true) => Box::new(NfcComparator),
        (true, true) => Box::new(CaseFoldNfcComparator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_orders_by_bytes() {
        let cmp = BinaryNameComparator;
        assert_eq!(cmp.compare("a", "b"), Ordering::Less);
        assert_eq!(cmp.compare("Z", "a"), Ordering::Less);
        assert_eq!(cmp.compare("same", "same"), Ordering::Equal);
    }

    #[test]
    fn case_fold_treats_cases_equal() {
        let cmp = CaseFoldComparator;
        assert_eq!(cmp.compare("Foo", "foo"), Ordering::Equal);
        assert_eq!(cmp.compare("FOO", "fop"), Ordering::Less);
    }

    #[test]
    fn nfc_treats_composition_forms_equal() {
        let cmp = NfcComparator;
        // U+00E9 vs "e" + U+0301
        assert_eq!(cmp.compare("caf\u{e9}", "cafe\u{301}"), Ordering::Equal);
        assert_eq!(cmp.compare("caf\u{e9}", "cafe"), Ordering::Greater);
    }

    #[test]
    fn case_fold_nfc_combines_both() {
        let cmp = CaseFoldNfcComparator;
        assert_eq!(cmp.compare("CAF\u{c9}", "cafe\u{301}"), Ordering::Equal);
    }

    #[test]
    fn flags_select_comparator() {
        assert_eq!(comparator_for_flags(0).name(), "binary");
        assert_eq!(comparator_for_flags(FLAG_CASE_FOLD).name(), "case-fold");
        assert_eq!(comparator_for_flags(FLAG_NFC).name(), "nfc");
        assert_eq!(
            comparator_for_flags(FLAG_CASE_FOLD | FLAG_NFC).name(),
            "case-fold-nfc"
        );
    }
}
