//! User access permissions (the `/P` entry).

use bitflags::bitflags;

/// Bits that must be set in every `/P` value this crate writes: the
/// reserved high bits plus bits 7 and 8.
pub const RESERVED_PERMISSION_BITS: u32 = 0xFFFF_F0C0;

bitflags! {
    /// Permission bits of the `/P` entry (ISO 32000-1, table 22).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document (possibly degraded, see `HIGH_PRINT`).
        const PRINT = 0x0000_0004;
        /// Modify the contents by operations other than the ones below.
        const EDIT = 0x0000_0008;
        /// Copy or extract text and graphics.
        const COPY = 0x0000_0010;
        /// Add or modify annotations, fill in form fields.
        const EDIT_NOTES = 0x0000_0020;
        /// Fill in existing form fields, including signature fields.
        const FILL_AND_SIGN = 0x0000_0100;
        /// Extract text and graphics for accessibility.
        const ACCESSIBLE = 0x0000_0200;
        /// Insert, rotate, or delete pages and create bookmarks.
        const DOC_ASSEMBLY = 0x0000_0400;
        /// Print at full quality.
        const HIGH_PRINT = 0x0000_0800;
    }
}

impl Permissions {
    /// The `/P` value for a new document granting `self`.
    pub const fn p_value(self) -> u32 {
        RESERVED_PERMISSION_BITS | self.bits()
    }

    /// Permissions granted by a raw `/P` value; reserved bits are ignored.
    pub const fn from_p_value(p: u32) -> Self {
        Self::from_bits_truncate(p)
    }

    /// Parse a comma-separated list such as `print,copy`, or `all`/`none`.
    pub fn parse_list(list: &str) -> Option<Self> {
        let mut perms = Self::empty();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            perms |= match item.to_ascii_lowercase().as_str() {
                "all" => Self::all(),
                "none" => Self::empty(),
                "print" => Self::PRINT,
                "edit" => Self::EDIT,
                "copy" => Self::COPY,
                "edit-notes" | "editnotes" => Self::EDIT_NOTES,
                "fill-and-sign" | "fillandsign" => Self::FILL_AND_SIGN,
                "accessible" => Self::ACCESSIBLE,
                "doc-assembly" | "docassembly" => Self::DOC_ASSEMBLY,
                "high-print" | "highprint" => Self::HIGH_PRINT,
                _ => return None,
            };
        }
        Some(perms)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::all()
    }
}
