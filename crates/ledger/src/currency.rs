use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Currency of a monetary amount. Amounts themselves are stored as signed
/// integer minor units (cents) next to their currency code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
}

impl Currency {
    /// Returns the ISO 4217 code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            other => Err(LedgerError::InvalidCurrency(other.to_string())),
        }
    }
}
