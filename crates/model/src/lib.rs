use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Milliseconds since the unix epoch, according to the system clock.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp_ms: i64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, bid: Decimal, ask: Decimal, timestamp_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            bid,
            ask,
            timestamp_ms,
        }
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp_ms: i64,
}

impl Bar {
    pub fn new(
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp_ms,
        }
    }
}

/// Aggregation window unit of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Tick,
    Second,
    Minute,
    Hour,
    Day,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "TICK",
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
        }
    }
}

/// Which side of the quote a bar was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteType {
    Bid,
    Ask,
    Mid,
    Last,
}

impl QuoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "BID",
            Self::Ask => "ASK",
            Self::Mid => "MID",
            Self::Last => "LAST",
        }
    }
}

/// Key for a bar stream: instrument plus window descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarType {
    pub symbol: String,
    pub step: u32,
    pub resolution: Resolution,
    pub quote_type: QuoteType,
}

impl BarType {
    pub fn new(
        symbol: impl Into<String>,
        step: u32,
        resolution: Resolution,
        quote_type: QuoteType,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            step,
            resolution,
            quote_type,
        }
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}[{}]",
            self.symbol,
            self.step,
            self.resolution.as_str(),
            self.quote_type.as_str()
        )
    }
}

impl FromStr for Resolution {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TICK" => Ok(Self::Tick),
            "SECOND" => Ok(Self::Second),
            "MINUTE" => Ok(Self::Minute),
            "HOUR" => Ok(Self::Hour),
            "DAY" => Ok(Self::Day),
            _ => Err(ParseModelError(format!("unknown resolution '{s}'"))),
        }
    }
}

impl FromStr for QuoteType {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BID" => Ok(Self::Bid),
            "ASK" => Ok(Self::Ask),
            "MID" => Ok(Self::Mid),
            "LAST" => Ok(Self::Last),
            _ => Err(ParseModelError(format!("unknown quote type '{s}'"))),
        }
    }
}

/// Error parsing a model value from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModelError(String);

impl fmt::Display for ParseModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseModelError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    Tick(Tick),
    Bar(BarType, Bar),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Tick(tick) => &tick.symbol,
            Self::Bar(bar_type, _) => &bar_type.symbol,
        }
    }
}
