//! Classification of raw status-feed tokens.
//!
//! The console reports either an idle marker or a title identifier. Title
//! identifiers are routed to exactly one lookup strategy by an ordered set of
//! prefix/shape rules; the first rule that matches wins.

/// Literal idle marker emitted by the status feed.
pub const IDLE_MARKER: &str = "NO_GAME_RUNNING";

/// Human-readable idle phrase some feed builds send instead of [`IDLE_MARKER`].
pub const IDLE_PHRASE: &str = "No game running";

/// Prefix of PS4-family retail title ids.
pub const RETAIL_A_PREFIX: &str = "CUSA";

/// Prefix of PS5-family retail title ids.
pub const RETAIL_B_PREFIX: &str = "PPSA";

/// System application prefix; never treated as homebrew.
pub const RESERVED_PREFIX: &str = "NPXS";

/// Length of a homebrew title id (four letters + five digits by convention).
pub const HOMEBREW_ID_LEN: usize = 9;

/// Lookup strategy a status key is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// No title is running.
    Idle,
    /// PS4-family retail title (`CUSA…`).
    RetailA,
    /// PS5-family retail title (`PPSA…`).
    RetailB,
    /// Fixed-length homebrew identifier.
    Homebrew,
    /// Anything else; displayed verbatim.
    Unknown,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RetailA => "retail_a",
            Self::RetailB => "retail_b",
            Self::Homebrew => "homebrew",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this kind has an external lookup strategy.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::RetailA | Self::RetailB | Self::Homebrew)
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim a raw feed line into a status key.
pub fn normalize(raw: &str) -> &str {
    raw.trim()
}

pub fn is_idle(key: &str) -> bool {
    key == IDLE_MARKER || key.eq_ignore_ascii_case(IDLE_PHRASE)
}

/// Classify a normalized status key. Rules are evaluated in a fixed order.
pub fn classify(key: &str) -> StatusKind {
    if is_idle(key) {
        return StatusKind::Idle;
    }
    if key.starts_with(RETAIL_A_PREFIX) {
        return StatusKind::RetailA;
    }
    if key.starts_with(RETAIL_B_PREFIX) {
        return StatusKind::RetailB;
    }
    if is_homebrew_id(key) {
        return StatusKind::Homebrew;
    }
    StatusKind::Unknown
}

fn is_homebrew_id(key: &str) -> bool {
    key.len() == HOMEBREW_ID_LEN
        && key.bytes().all(|b| b.is_ascii_alphanumeric())
        && !key.starts_with(RESERVED_PREFIX)
}
