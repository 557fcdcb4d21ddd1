//! Selector tables
//!
//! Each interface revision numbers the user-client methods differently. The
//! numbering is kept as one literal table per revision, in the same declared
//! order, so the two can be audited side by side. Adding a revision means
//! adding a table.

use std::fmt;

use crate::version::AgxVersion;

/// Selector value meaning "this revision has no such method".
pub const SELECTOR_INVALID: u32 = u32::MAX;

/// Symbolic user-client method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorLabel {
    GetGlobalIds,
    SetApi,
    CreateCommandQueue,
    FreeCommandQueue,
    AllocateMem,
    FreeMem,
    CreateShmem,
    FreeShmem,
    CreateNotificationQueue,
    FreeNotificationQueue,
    SubmitCommandBuffers,
    GetVersion,
    Invalid,
}

impl SelectorLabel {
    /// Every real method, in declared order.
    pub const ALL: [SelectorLabel; 12] = [
        SelectorLabel::GetGlobalIds,
        SelectorLabel::SetApi,
        SelectorLabel::CreateCommandQueue,
        SelectorLabel::FreeCommandQueue,
        SelectorLabel::AllocateMem,
        SelectorLabel::FreeMem,
        SelectorLabel::CreateShmem,
        SelectorLabel::FreeShmem,
        SelectorLabel::CreateNotificationQueue,
        SelectorLabel::FreeNotificationQueue,
        SelectorLabel::SubmitCommandBuffers,
        SelectorLabel::GetVersion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SelectorLabel::GetGlobalIds => "GET_GLOBAL_IDS",
            SelectorLabel::SetApi => "SET_API",
            SelectorLabel::CreateCommandQueue => "CREATE_COMMAND_QUEUE",
            SelectorLabel::FreeCommandQueue => "FREE_COMMAND_QUEUE",
            SelectorLabel::AllocateMem => "ALLOCATE_MEM",
            SelectorLabel::FreeMem => "FREE_MEM",
            SelectorLabel::CreateShmem => "CREATE_SHMEM",
            SelectorLabel::FreeShmem => "FREE_SHMEM",
            SelectorLabel::CreateNotificationQueue => "CREATE_NOTIFICATION_QUEUE",
            SelectorLabel::FreeNotificationQueue => "FREE_NOTIFICATION_QUEUE",
            SelectorLabel::SubmitCommandBuffers => "SUBMIT_COMMAND_BUFFERS",
            SelectorLabel::GetVersion => "GET_VERSION",
            SelectorLabel::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for SelectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How much we trust a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorStatus {
    /// Observed working on the revision.
    Verified,
    /// Inferred from neighbouring selectors, never exercised.
    Unverified,
    /// Not yet found on this revision.
    Unknown,
    /// Gone from this revision.
    Removed,
}

impl SelectorStatus {
    pub fn name(self) -> &'static str {
        match self {
            SelectorStatus::Verified => "verified",
            SelectorStatus::Unverified => "unverified",
            SelectorStatus::Unknown => "unknown",
            SelectorStatus::Removed => "removed",
        }
    }
}

/// One row of a selector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorEntry {
    pub label: SelectorLabel,
    pub selector: u32,
    pub status: SelectorStatus,
}

const fn entry(label: SelectorLabel, selector: u32, status: SelectorStatus) -> SelectorEntry {
    SelectorEntry {
        label,
        selector,
        status,
    }
}

use SelectorLabel as L;
use SelectorStatus::{Removed, Unknown, Unverified, Verified};

/// macOS 13 (verified), 14 (unverified) and 15 (only SET_API,
/// CREATE_COMMAND_QUEUE, ALLOCATE_MEM and CREATE_NOTIFICATION_QUEUE verified).
pub const V13_SELECTORS: [SelectorEntry; 12] = [
    entry(L::GetGlobalIds, 0x6, Verified),
    entry(L::SetApi, 0x7, Verified),
    entry(L::CreateCommandQueue, 0x8, Verified),
    entry(L::FreeCommandQueue, 0x9, Verified),
    entry(L::AllocateMem, 0xA, Verified),
    entry(L::FreeMem, 0xB, Verified),
    entry(L::CreateShmem, 0xF, Verified),
    entry(L::FreeShmem, 0x10, Verified),
    entry(L::CreateNotificationQueue, 0x11, Verified),
    entry(L::FreeNotificationQueue, 0x12, Verified),
    entry(L::SubmitCommandBuffers, 0x1E, Verified),
    entry(L::GetVersion, 0x2A, Verified),
];

/// macOS 26.
pub const V26_SELECTORS: [SelectorEntry; 12] = [
    entry(L::GetGlobalIds, SELECTOR_INVALID, Unknown),
    entry(L::SetApi, SELECTOR_INVALID, Removed),
    entry(L::CreateCommandQueue, 0x7, Verified),
    entry(L::FreeCommandQueue, 0x8, Unverified),
    entry(L::AllocateMem, 0x9, Verified),
    entry(L::FreeMem, 0xA, Unverified),
    entry(L::CreateShmem, 0xE, Verified),
    entry(L::FreeShmem, 0xF, Unverified),
    entry(L::CreateNotificationQueue, 0x10, Verified),
    entry(L::FreeNotificationQueue, 0x11, Unverified),
    entry(L::SubmitCommandBuffers, 0x1D, Unverified),
    entry(L::GetVersion, 0x2A, Unverified),
];

/// Every label appears once, in declared order, and no two real entries share
/// a selector.
const fn table_is_well_formed(table: &[SelectorEntry]) -> bool {
    if table.len() != SelectorLabel::ALL.len() {
        return false;
    }
    let mut i = 0;
    while i < table.len() {
        if table[i].label as usize != SelectorLabel::ALL[i] as usize {
            return false;
        }
        if table[i].selector != SELECTOR_INVALID {
            let mut j = i + 1;
            while j < table.len() {
                if table[j].selector == table[i].selector {
                    return false;
                }
                j += 1;
            }
        }
        i += 1;
    }
    true
}

const _: () = assert!(table_is_well_formed(&V13_SELECTORS));
const _: () = assert!(table_is_well_formed(&V26_SELECTORS));

/// The selector table for `version`.
pub fn table_for(version: AgxVersion) -> &'static [SelectorEntry] {
    match version {
        AgxVersion::V13 => &V13_SELECTORS,
        AgxVersion::V26 => &V26_SELECTORS,
    }
}

/// Selector for `label` on `version`, or [`SELECTOR_INVALID`].
pub fn selector(version: AgxVersion, label: SelectorLabel) -> u32 {
    table_for(version)
        .iter()
        .find(|e| e.label == label)
        .map(|e| e.selector)
        .unwrap_or(SELECTOR_INVALID)
}

/// Label for a raw selector on `version`, or [`SelectorLabel::Invalid`].
///
/// Entries are scanned in declared order; the first match wins. Entries
/// holding [`SELECTOR_INVALID`] never match.
pub fn selector_label(version: AgxVersion, selector: u32) -> SelectorLabel {
    if selector == SELECTOR_INVALID {
        return SelectorLabel::Invalid;
    }
    table_for(version)
        .iter()
        .find(|e| e.selector == selector)
        .map(|e| e.label)
        .unwrap_or(SelectorLabel::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_roundtrip_all_revisions() {
        for version in AgxVersion::ALL {
            for label in SelectorLabel::ALL {
                let code = selector(version, label);
                if code != SELECTOR_INVALID {
                    assert_eq!(selector_label(version, code), label, "{} {}", version, label);
                }
            }
        }
    }

    #[test]
    fn test_v13_selectors() {
        assert_eq!(selector(AgxVersion::V13, SelectorLabel::SetApi), 0x7);
        assert_eq!(selector(AgxVersion::V13, SelectorLabel::AllocateMem), 0xA);
        assert_eq!(selector(AgxVersion::V13, SelectorLabel::SubmitCommandBuffers), 0x1E);
        assert_eq!(selector_label(AgxVersion::V13, 0x6), SelectorLabel::GetGlobalIds);
    }

    #[test]
    fn test_v26_missing_selectors() {
        assert_eq!(selector(AgxVersion::V26, SelectorLabel::SetApi), SELECTOR_INVALID);
        assert_eq!(selector(AgxVersion::V26, SelectorLabel::GetGlobalIds), SELECTOR_INVALID);
        assert_eq!(selector(AgxVersion::V26, SelectorLabel::AllocateMem), 0x9);
        assert_eq!(selector_label(AgxVersion::V26, 0x6), SelectorLabel::Invalid);
    }

    #[test]
    fn test_invalid_label_and_unknown_codes() {
        for version in AgxVersion::ALL {
            assert_eq!(selector(version, SelectorLabel::Invalid), SELECTOR_INVALID);
            assert_eq!(selector_label(version, SELECTOR_INVALID), SelectorLabel::Invalid);
            assert_eq!(selector_label(version, 0), SelectorLabel::Invalid);
            assert_eq!(selector_label(version, 0x1000), SelectorLabel::Invalid);
        }
    }

    #[test]
    fn test_same_code_different_meaning() {
        // 0x7 is SET_API on 13 but CREATE_COMMAND_QUEUE on 26
        assert_eq!(selector_label(AgxVersion::V13, 0x7), SelectorLabel::SetApi);
        assert_eq!(selector_label(AgxVersion::V26, 0x7), SelectorLabel::CreateCommandQueue);
    }

    #[test]
    fn test_well_formed_check_rejects_duplicates() {
        let mut table = V13_SELECTORS;
        table[3].selector = table[2].selector;
        assert!(!table_is_well_formed(&table));

        let mut table = V26_SELECTORS;
        table.swap(0, 1);
        assert!(!table_is_well_formed(&table));
    }
}
