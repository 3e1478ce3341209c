// src/core/protocol/field.rs

//! The closed set of SIP2 variable-length field identifiers.

use std::fmt;
use strum_macros::EnumIter;
use tracing::warn;

/// Generates the `Field` enum together with its static code table.
macro_rules! define_fields {
    ($(($variant:ident, $code:literal)),* $(,)?) => {
        /// A two-letter SIP2 field identifier.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
        pub enum Field {
            $($variant,)*
            /// Sentinel for identifiers that are not in the table.
            Unknown,
        }

        const FIELD_CODES: &[(Field, &str)] = &[
            $((Field::$variant, $code),)*
        ];
    };
}

define_fields! {
    (PatronIdentifier, "AA"),
    (ItemIdentifier, "AB"),
    (TerminalPassword, "AC"),
    (PatronPassword, "AD"),
    (PersonalName, "AE"),
    (ScreenMessage, "AF"),
    (PrintLine, "AG"),
    (DueDate, "AH"),
    (TitleIdentifier, "AJ"),
    (BlockedCardMsg, "AL"),
    (LibraryName, "AM"),
    (TerminalLocation, "AN"),
    (InstitutionId, "AO"),
    (CurrentLocation, "AP"),
    (PermanentLocation, "AQ"),
    (HoldItems, "AS"),
    (OverdueItems, "AT"),
    (ChargedItems, "AU"),
    (FineItems, "AV"),
    (SequenceNumber, "AY"),
    (Checksum, "AZ"),
    (HomeAddress, "BD"),
    (EmailAddress, "BE"),
    (HomePhoneNumber, "BF"),
    (Owner, "BG"),
    (CurrencyType, "BH"),
    (Cancel, "BI"),
    (TransactionId, "BK"),
    (ValidPatron, "BL"),
    (RenewedItems, "BM"),
    (UnrenewedItems, "BN"),
    (FeeAcknowledged, "BO"),
    (StartItem, "BP"),
    (EndItem, "BQ"),
    (QueuePosition, "BR"),
    (PickupLocation, "BS"),
    (FeeType, "BT"),
    (RecallItems, "BU"),
    (FeeAmount, "BV"),
    (ExpirationDate, "BW"),
    (SupportedMessages, "BX"),
    (HoldType, "BY"),
    (HoldItemsLimit, "BZ"),
    (OverdueItemsLimit, "CA"),
    (ChargedItemsLimit, "CB"),
    (FeeLimit, "CC"),
    (UnavailableHoldItems, "CD"),
    (HoldQueueLength, "CF"),
    (FeeIdentifier, "CG"),
    (ItemProperties, "CH"),
    (SecurityInhibit, "CI"),
    (RecallDate, "CJ"),
    (MediaType, "CK"),
    (SortBin, "CL"),
    (HoldPickupDate, "CM"),
    (LoginUserId, "CN"),
    (LoginPassword, "CO"),
    (LocationCode, "CP"),
    (ValidPatronPassword, "CQ"),
}

impl Field {
    /// Looks up a two-character code. Returns `None` for unmapped codes.
    pub fn parse(code: &str) -> Option<Field> {
        FIELD_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(field, _)| *field)
    }

    /// Total lookup: unmapped codes resolve to [`Field::Unknown`] and are logged.
    pub fn from_code(code: &str) -> Field {
        Self::parse(code).unwrap_or_else(|| {
            warn!("Unknown field code '{}'", code);
            Field::Unknown
        })
    }

    /// The two-letter wire code, or `"??"` for the sentinel.
    pub fn code(&self) -> &'static str {
        FIELD_CODES
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, code)| *code)
            .unwrap_or("??")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.code(), self)
    }
}
