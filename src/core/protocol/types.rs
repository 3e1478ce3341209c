// src/core/protocol/types.rs

//! Closed sub-code tables carried inside SIP2 fixed and variable fields.
//!
//! Every table offers a fallible `parse` and a total `code`. Decoders use
//! [`lookup`] so that an unrecognized code is logged and becomes `None`
//! instead of failing the whole message.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use tracing::warn;

/// Generates a code table enum with `parse` and `code`.
macro_rules! define_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            /// Looks up a wire code.
            pub fn parse(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// The wire code of this value.
            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)*
                }
            }
        }
    };
}

/// Parses `code` with `parse`, logging unknown values under `kind`.
pub fn lookup<T>(kind: &str, code: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(code);
    if parsed.is_none() {
        warn!("Unrecognized {} code '{}', ignoring", kind, code);
    }
    parsed
}

define_codes! {
    /// SC Status `status code` (1 char).
    StatusCode {
        ScOk => "0",
        PrinterOutOfPaper => "1",
        ShuttingDown => "2",
    }
}

define_codes! {
    /// The currencies the gateway recognizes. This is intentionally a small
    /// subset; anything else decodes to `None`.
    CurrencyType {
        Usd => "USD",
        Cad => "CAD",
        Gbp => "GBP",
        Frf => "FRF",
        Dem => "DEM",
        Itl => "ITL",
        Esp => "ESP",
        Jpy => "JPY",
    }
}

define_codes! {
    /// Fee type (2 chars).
    FeeType {
        Other => "01",
        Administrative => "02",
        Damage => "03",
        Overdue => "04",
        Processing => "05",
        Rental => "06",
        Replacement => "07",
        ComputerAccessCharge => "08",
        HoldFee => "09",
    }
}

define_codes! {
    /// Payment type (2 chars).
    PaymentType {
        Cash => "00",
        Visa => "01",
        CreditCard => "02",
    }
}

define_codes! {
    /// Item circulation status (2 chars).
    CirculationStatus {
        Other => "01",
        OnOrder => "02",
        Available => "03",
        Charged => "04",
        ChargedNotToBeRecalled => "05",
        InProcess => "06",
        Recalled => "07",
        WaitingOnHoldShelf => "08",
        WaitingToBeReshelved => "09",
        InTransit => "10",
        ClaimedReturned => "11",
        Lost => "12",
        Missing => "13",
    }
}

define_codes! {
    /// Item security marker (2 chars).
    SecurityMarker {
        Other => "00",
        NoMarker => "01",
        TattleTape => "02",
        WhisperTape => "03",
    }
}

define_codes! {
    /// Item media type (3 chars).
    MediaType {
        Other => "000",
        Book => "001",
        Magazine => "002",
        BoundJournal => "003",
        AudioTape => "004",
        VideoTape => "005",
        CdOrCdrom => "006",
        Diskette => "007",
        BookWithDiskette => "008",
        BookWithCd => "009",
        BookWithAudioTape => "010",
    }
}

define_codes! {
    /// Patron language (3 chars).
    Language {
        Unknown => "000",
        English => "001",
        French => "002",
        German => "003",
        Italian => "004",
        Dutch => "005",
        Swedish => "006",
        Finnish => "007",
        Spanish => "008",
        Danish => "009",
        Portuguese => "010",
        CanadianFrench => "011",
        Norwegian => "012",
        Hebrew => "013",
        Japanese => "014",
        Russian => "015",
        Arabic => "016",
        Polish => "017",
        Greek => "018",
        Chinese => "019",
        Korean => "020",
        NorthAmericanSpanish => "021",
        Tamil => "022",
        Malay => "023",
        UnitedKingdom => "024",
        Icelandic => "025",
        Belgian => "026",
        Taiwanese => "027",
    }
}

define_codes! {
    /// Hold request mode (1 char).
    HoldMode {
        Add => "+",
        Delete => "-",
        Change => "*",
    }
}

define_codes! {
    /// Hold type (1 char).
    HoldType {
        Other => "1",
        AnyCopyOfTitle => "2",
        SpecificCopy => "3",
        AnyCopyAtSingleBranch => "4",
    }
}

define_codes! {
    /// The item list a Patron Information request asks for (10-char summary).
    SummaryItem {
        HoldItems => "0",
        OverdueItems => "1",
        ChargedItems => "2",
        FineItems => "3",
        RecallItems => "4",
        UnavailableHolds => "5",
    }
}

impl SummaryItem {
    const WIDTH: usize = 10;

    /// Decodes the 10-char summary: the first `Y` selects the list.
    pub fn from_summary(summary: &str) -> Option<SummaryItem> {
        summary
            .chars()
            .position(|c| c == 'Y' || c == 'y')
            .and_then(|pos| SummaryItem::parse(&pos.to_string()))
    }

    /// Renders the 10-char summary for an optional selection.
    pub fn to_summary(item: Option<SummaryItem>) -> String {
        let mut summary = vec![' '; Self::WIDTH];
        if let Some(item) = item
            && let Ok(pos) = item.code().parse::<usize>()
        {
            summary[pos] = 'Y';
        }
        summary.into_iter().collect()
    }
}

bitflags! {
    /// The 14-position patron status field. Each set flag renders as `Y`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PatronStatus: u16 {
        const CHARGE_PRIVILEGES_DENIED     = 1 << 0;
        const RENEWAL_PRIVILEGES_DENIED    = 1 << 1;
        const RECALL_PRIVILEGES_DENIED     = 1 << 2;
        const HOLD_PRIVILEGES_DENIED       = 1 << 3;
        const CARD_REPORTED_LOST           = 1 << 4;
        const TOO_MANY_ITEMS_CHARGED       = 1 << 5;
        const TOO_MANY_ITEMS_OVERDUE       = 1 << 6;
        const TOO_MANY_RENEWALS            = 1 << 7;
        const TOO_MANY_CLAIMS_OF_RETURN    = 1 << 8;
        const TOO_MANY_ITEMS_LOST          = 1 << 9;
        const EXCESSIVE_OUTSTANDING_FINES  = 1 << 10;
        const EXCESSIVE_OUTSTANDING_FEES   = 1 << 11;
        const RECALL_OVERDUE               = 1 << 12;
        const TOO_MANY_ITEMS_BILLED        = 1 << 13;
    }
}

impl PatronStatus {
    /// Width of the patron status field on the wire.
    pub const WIDTH: usize = 14;

    /// Renders the flags as 14 characters of `Y` or space.
    pub fn to_wire(&self) -> String {
        (0..Self::WIDTH)
            .map(|bit| {
                if self.bits() & (1 << bit) != 0 {
                    'Y'
                } else {
                    ' '
                }
            })
            .collect()
    }

    /// Parses 14 characters of `Y`/`y` or anything else.
    pub fn from_wire(s: &str) -> PatronStatus {
        let bits = s
            .chars()
            .take(Self::WIDTH)
            .enumerate()
            .filter(|(_, c)| *c == 'Y' || *c == 'y')
            .fold(0u16, |acc, (bit, _)| acc | (1 << bit));
        PatronStatus::from_bits_truncate(bits)
    }
}

bitflags! {
    /// The 16-position supported messages field (`BX`) of an ACS Status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SupportedMessages: u16 {
        const PATRON_STATUS_REQUEST = 1 << 0;
        const CHECKOUT              = 1 << 1;
        const CHECKIN               = 1 << 2;
        const BLOCK_PATRON          = 1 << 3;
        const SC_ACS_STATUS         = 1 << 4;
        const REQUEST_SC_ACS_RESEND = 1 << 5;
        const LOGIN                 = 1 << 6;
        const PATRON_INFORMATION    = 1 << 7;
        const END_PATRON_SESSION    = 1 << 8;
        const FEE_PAID              = 1 << 9;
        const ITEM_INFORMATION      = 1 << 10;
        const ITEM_STATUS_UPDATE    = 1 << 11;
        const PATRON_ENABLE         = 1 << 12;
        const HOLD                  = 1 << 13;
        const RENEW                 = 1 << 14;
        const RENEW_ALL             = 1 << 15;
    }
}

impl Default for SupportedMessages {
    fn default() -> Self {
        SupportedMessages::all()
    }
}

impl SupportedMessages {
    /// Width of the `BX` field on the wire.
    pub const WIDTH: usize = 16;

    /// Renders the flags as 16 characters of `Y` or `N`.
    pub fn to_wire(&self) -> String {
        (0..Self::WIDTH)
            .map(|bit| {
                if self.bits() & (1 << bit) != 0 {
                    'Y'
                } else {
                    'N'
                }
            })
            .collect()
    }

    /// Parses 16 characters of `Y`/`N`.
    pub fn from_wire(s: &str) -> SupportedMessages {
        let bits = s
            .chars()
            .take(Self::WIDTH)
            .enumerate()
            .filter(|(_, c)| *c == 'Y' || *c == 'y')
            .fold(0u16, |acc, (bit, _)| acc | (1 << bit));
        SupportedMessages::from_bits_truncate(bits)
    }
}

impl Default for CirculationStatus {
    fn default() -> Self {
        CirculationStatus::Other
    }
}

impl Default for SecurityMarker {
    fn default() -> Self {
        SecurityMarker::Other
    }
}

impl Default for FeeType {
    fn default() -> Self {
        FeeType::Other
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Unknown
    }
}
