//! Cross-reference entries.

use std::fmt;

/// Generation given to freed object numbers so they are never reused.
pub const GENERATION_UNREUSABLE: u16 = 65535;

/// How an object number is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    /// Type 0 / `f`
    Free,
    /// Type 1 / `n`
    InUse,
    /// Type 2: stored inside an object stream
    InUseCompressed,
}

impl Usage {
    /// Numeric type used in cross-reference streams.
    pub fn type_code(self) -> u64 {
        match self {
            Usage::Free => 0,
            Usage::InUse => 1,
            Usage::InUseCompressed => 2,
        }
    }
}

/// One cross-reference entry.
///
/// `offset` depends on `usage`: byte offset for `InUse`, next free object
/// number for `Free`, index within the object stream for `InUseCompressed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub number: u32,
    pub generation: u16,
    pub usage: Usage,
    pub offset: u64,
    /// Containing object stream for `InUseCompressed` entries.
    pub stream_number: Option<u32>,
}

impl XRefEntry {
    pub fn in_use(number: u32, generation: u16, offset: u64) -> Self {
        Self {
            number,
            generation,
            usage: Usage::InUse,
            offset,
            stream_number: None,
        }
    }

    pub fn free(number: u32, generation: u16, next_free: u64) -> Self {
        Self {
            number,
            generation,
            usage: Usage::Free,
            offset: next_free,
            stream_number: None,
        }
    }

    /// Compressed objects always have generation 0.
    pub fn compressed(number: u32, stream_number: u32, index: u64) -> Self {
        Self {
            number,
            generation: 0,
            usage: Usage::InUseCompressed,
            offset: index,
            stream_number: Some(stream_number),
        }
    }

    /// Free entry whose number may not be handed out again.
    pub fn unreusable(number: u32) -> Self {
        Self::free(number, GENERATION_UNREUSABLE, 0)
    }

    /// Entry for a freshly registered object, before it has been written.
    pub fn fresh(number: u32) -> Self {
        Self::in_use(number, 0, 0)
    }

    pub fn is_free(&self) -> bool {
        self.usage == Usage::Free
    }

    pub fn is_in_use(&self) -> bool {
        !self.is_free()
    }

    pub fn is_unreusable(&self) -> bool {
        self.is_free() && self.generation == GENERATION_UNREUSABLE
    }
}

impl fmt::Display for XRefEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.usage {
            Usage::Free => write!(f, "{} {} free -> {}", self.number, self.generation, self.offset),
            Usage::InUse => write!(f, "{} {} @{}", self.number, self.generation, self.offset),
            Usage::InUseCompressed => write!(
                f,
                "{} in stream {}[{}]",
                self.number,
                self.stream_number.unwrap_or_default(),
                self.offset
            ),
        }
    }
}
