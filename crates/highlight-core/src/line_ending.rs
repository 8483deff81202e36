//! Line terminator kinds.
//!
//! A [`Document`](crate::document::Document) keeps the terminator of every
//! line instead of normalizing on load, because character indices must count
//! the separator exactly as it appears in the source text (two characters
//! for CRLF, one for LF or bare CR, zero after the final line).

/// The terminator that followed a document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac-style bare CR (`'\r'`).
    Cr,
    /// No terminator; only valid on the final line of a document.
    None,
}

impl LineEnding {
    /// Number of characters the terminator occupies in the document.
    pub fn width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Lf | Self::Cr => 1,
            Self::Crlf => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(LineEnding::None.width(), 0);
        assert_eq!(LineEnding::Lf.width(), 1);
        assert_eq!(LineEnding::Cr.width(), 1);
        assert_eq!(LineEnding::Crlf.width(), 2);
    }
}
