use core::fmt;

/// Problems with the layout of a cartridge image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    BadMagic([u8; 4]),
    /// NES 2.0 headers are recognised but not supported.
    Nes20Header,
    TooManyBanks { kind: &'static str, count: u8 },
    Truncated {
        section: &'static str,
        expected: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    Format(FormatError),
    UnsupportedMapper(u8),
}

impl CartridgeError {
    pub fn is_format_error(&self) -> bool {
        matches!(self, CartridgeError::Format(_))
    }
}

impl From<FormatError> for CartridgeError {
    fn from(value: FormatError) -> Self {
        CartridgeError::Format(value)
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic(magic) => {
                write!(f, "bad iNES magic {:02X?}, expected \"NES\\x1A\"", magic)
            }
            FormatError::Nes20Header => write!(f, "NES 2.0 headers are not supported"),
            FormatError::TooManyBanks { kind, count } => {
                write!(f, "{} bank count {} exceeds 32", kind, count)
            }
            FormatError::Truncated {
                section,
                expected,
                available,
            } => write!(
                f,
                "image truncated in {}: need {} bytes, {} left",
                section, expected, available
            ),
        }
    }
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::Format(err) => write!(f, "invalid cartridge image: {}", err),
            CartridgeError::UnsupportedMapper(id) => write!(f, "unsupported mapper {}", id),
        }
    }
}

impl core::error::Error for FormatError {}

impl core::error::Error for CartridgeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            CartridgeError::Format(err) => Some(err),
            CartridgeError::UnsupportedMapper(_) => None,
        }
    }
}
