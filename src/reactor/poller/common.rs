/// Readiness a registration waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    /// Wait until the descriptor is readable.
    pub const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    /// Wait until the descriptor is writable.
    pub const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };

    /// Returns `true` if this interest includes readability.
    pub fn is_readable(&self) -> bool {
        self.read
    }

    /// Returns `true` if this interest includes writability.
    pub fn is_writable(&self) -> bool {
        self.write
    }
}
