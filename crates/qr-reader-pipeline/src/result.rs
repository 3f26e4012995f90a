use qr_reader_core::DecodedSymbol;

/// Item delivered through the result mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recognition {
    /// A located symbol, decoded or not (see [`DecodedSymbol::is_valid`]).
    Symbol(DecodedSymbol),
    /// A frame could not be staged; the decoder is still at its previous size
    /// and nothing was decoded for that frame.
    Degraded {
        width: u16,
        height: u16,
        reason: String,
    },
}

impl Recognition {
    pub fn symbol(&self) -> Option<&DecodedSymbol> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            Self::Degraded { .. } => None,
        }
    }

    pub fn into_symbol(self) -> Option<DecodedSymbol> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            Self::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}
