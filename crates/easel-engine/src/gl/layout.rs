use std::fmt;

/// Components per vertex for one attribute.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum AttribSize {
    One = 1,
    #[default]
    Two = 2,
    Three = 3,
    Four = 4,
}

impl AttribSize {
    #[inline]
    pub const fn count(self) -> u32 {
        self as u32
    }

    pub const fn from_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }
}

/// Numeric type of one attribute component as stored in the buffer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ComponentType {
    #[default]
    Float32,
    Int8,
    Uint8,
    Int16,
    Uint16,
}

impl ComponentType {
    #[inline]
    pub const fn byte_size(self) -> u32 {
        match self {
            ComponentType::Float32 => 4,
            ComponentType::Int8 | ComponentType::Uint8 => 1,
            ComponentType::Int16 | ComponentType::Uint16 => 2,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::Float32 => "f32",
            ComponentType::Int8 => "i8",
            ComponentType::Uint8 => "u8",
            ComponentType::Int16 => "i16",
            ComponentType::Uint16 => "u16",
        };
        f.write_str(name)
    }
}

/// Complete byte layout of one vertex attribute inside its buffer.
///
/// `stride == 0` means tightly packed. `offset` is the byte offset of the first
/// element.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct AttribLayout {
    pub size: AttribSize,
    pub component: ComponentType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl AttribLayout {
    /// Bytes of one element.
    #[inline]
    pub const fn element_size(&self) -> u32 {
        self.size.count() * self.component.byte_size()
    }

    /// Distance between consecutive elements, resolving `stride == 0`.
    #[inline]
    pub const fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.element_size()
        } else {
            self.stride
        }
    }

    /// Bytes a buffer must hold for vertices `first..first + count`.
    ///
    /// Zero when `count` is zero.
    pub const fn required_bytes(&self, first: u32, count: u32) -> u64 {
        if count == 0 {
            return 0;
        }
        let last = first as u64 + count as u64 - 1;
        self.offset as u64 + last * self.effective_stride() as u64 + self.element_size() as u64
    }
}

impl fmt::Display for AttribLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}{} stride {} offset {}",
            self.component,
            self.size.count(),
            if self.normalized { " normalized" } else { "" },
            self.stride,
            self.offset
        )
    }
}
