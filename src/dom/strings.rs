//! Node string storage with zero-copy support
//!
//! Two storage modes:
//! - Ref: (offset, len) referencing the document's retained source buffer
//!   (zero-copy, produced by the parser for strings that needed no decoding)
//! - Owned: strings that needed entity decoding or whitespace normalization,
//!   and every string assigned through the DOM

/// Storage slot for one node or attribute string
#[derive(Debug, Clone, Default)]
pub(crate) enum StrSlot {
    /// No string ("" when resolved)
    #[default]
    Empty,
    /// References the retained source buffer: (byte offset, byte length)
    Ref(u32, u32),
    /// Copied string
    Owned(Box<str>),
}

impl StrSlot {
    #[inline]
    pub fn empty() -> Self {
        StrSlot::Empty
    }

    /// Slot referencing `start..end` of the source buffer. Empty ranges
    /// collapse to the empty slot.
    #[inline]
    pub fn from_range(start: usize, end: usize) -> Self {
        if start == end {
            StrSlot::Empty
        } else {
            StrSlot::Ref(start as u32, (end - start) as u32)
        }
    }

    /// Slot owning a copy of `s`
    #[inline]
    pub fn from_owned(s: impl Into<Box<str>>) -> Self {
        let boxed = s.into();
        if boxed.is_empty() {
            StrSlot::Empty
        } else {
            StrSlot::Owned(boxed)
        }
    }

    /// Resolve against the retained buffer the Ref variant indexes into
    #[inline]
    pub fn resolve<'a>(&'a self, buffer: &'a str) -> &'a str {
        match self {
            StrSlot::Empty => "",
            StrSlot::Ref(offset, len) => {
                let start = *offset as usize;
                let end = start + *len as usize;
                buffer.get(start..end).unwrap_or("")
            }
            StrSlot::Owned(s) => s,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, StrSlot::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_slot() {
        let buffer = "<root>hello</root>";
        let slot = StrSlot::from_range(6, 11);
        assert_eq!(slot.resolve(buffer), "hello");
    }

    #[test]
    fn test_owned_slot() {
        let slot = StrSlot::from_owned("decoded & text");
        assert_eq!(slot.resolve(""), "decoded & text");
    }

    #[test]
    fn test_empty_collapse() {
        assert!(StrSlot::from_range(4, 4).is_empty());
        assert!(StrSlot::from_owned(String::new()).is_empty());
        assert_eq!(StrSlot::empty().resolve("buffer"), "");
    }

    #[test]
    fn test_out_of_range_resolves_empty() {
        let slot = StrSlot::from_range(10, 20);
        assert_eq!(slot.resolve("short"), "");
    }
}
