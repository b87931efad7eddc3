use core::{fmt, str::FromStr};

use heapless::String;
use nom::{
    IResult, Parser,
    character::complete::{char, digit1, u16, u32},
    combinator::{opt, rest},
    sequence::preceded,
};

/// Largest raw value a 10-bit converter produces.
pub const MAX_RAW_VALUE: u16 = 1023;

/// Capacity for one encoded line, `4294967.295,65535\n` is 18 bytes.
pub const RECORD_BUFFER_SIZE: usize = 24;

const MAX_FRACTION_DIGITS: usize = 3;

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    Malformed,
    OutOfRange(u16),
    TimestampOverflow,
    FormatError,
}

impl From<nom::Err<nom::error::Error<&str>>> for RecordError {
    fn from(_err: nom::Err<nom::error::Error<&str>>) -> Self {
        #[cfg(feature = "log")]
        debug!("Parsing error {:?} => RecordError", _err);
        RecordError::Malformed
    }
}

impl From<fmt::Error> for RecordError {
    fn from(_: fmt::Error) -> Self {
        RecordError::FormatError
    }
}

/// One sample as it travels over the serial link.
///
/// The text form is `<seconds>.<millis>,<raw>`, the seconds field being the
/// uptime at emission and not the time since the previous sample.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub uptime_ms: u32,
    pub value: u16,
}

impl Record {
    pub const fn new(uptime_ms: u32, value: u16) -> Self {
        Self { uptime_ms, value }
    }

    /// Encodes the record as one line including the trailing `\n`.
    pub fn encode(&self) -> Result<String<RECORD_BUFFER_SIZE>, RecordError> {
        Ok(heapless::format!(RECORD_BUFFER_SIZE; "{}\n", self)?)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03},{}", self.uptime_ms / 1000, self.uptime_ms % 1000, self.value)
    }
}

// <secs>[.<frac>],<raw>[,<ignored>...]
// 1.234,512
fn record_fields(input: &str) -> IResult<&str, (u32, Option<&str>, u16, &str)> {
    (u32, opt(preceded(char('.'), digit1)), preceded(char(','), u16), rest).parse(input)
}

impl FromStr for Record {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (_, (secs, fraction, value, tail)) = record_fields(line.trim())?;
        if !tail.is_empty() && !tail.starts_with(',') {
            return Err(RecordError::Malformed);
        }

        let fraction_ms = match fraction {
            None => 0,
            Some(digits) if digits.len() > MAX_FRACTION_DIGITS => return Err(RecordError::Malformed),
            Some(digits) => {
                let scale = 10u32.pow((MAX_FRACTION_DIGITS - digits.len()) as u32);
                digits.parse::<u32>().map_err(|_| RecordError::Malformed)? * scale
            }
        };
        let uptime_ms = secs
            .checked_mul(1000)
            .and_then(|ms| ms.checked_add(fraction_ms))
            .ok_or(RecordError::TimestampOverflow)?;

        if value > MAX_RAW_VALUE {
            return Err(RecordError::OutOfRange(value));
        }
        Ok(Record { uptime_ms, value })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn display_uses_three_decimals() {
        assert_eq!(std::format!("{}", Record::new(0, 0)), "0.000,0");
        assert_eq!(std::format!("{}", Record::new(4000, 300)), "4.000,300");
        assert_eq!(std::format!("{}", Record::new(1234, 512)), "1.234,512");
        assert_eq!(std::format!("{}", Record::new(61_005, 1023)), "61.005,1023");
    }

    #[test]
    fn display_is_exact_at_counter_limit() {
        assert_eq!(std::format!("{}", Record::new(u32::MAX, 1023)), "4294967.295,1023");
    }

    #[test]
    fn encode_appends_line_feed() {
        let line = Record::new(4000, 300).encode().unwrap();
        assert_eq!(line.as_str(), "4.000,300\n");

        let widest = Record::new(u32::MAX, u16::MAX).encode().unwrap();
        assert_eq!(widest.as_str(), "4294967.295,65535\n");
    }

    #[test]
    fn parse_emitted_line() {
        let record: Record = "1.234,512\n".parse().unwrap();
        assert_eq!(record, Record::new(1234, 512));

        let record: Record = "4.000,300\r\n".parse().unwrap();
        assert_eq!(record, Record::new(4000, 300));
    }

    #[test]
    fn parse_short_fraction_and_whole_seconds() {
        assert_eq!("4.5,7".parse::<Record>().unwrap(), Record::new(4500, 7));
        assert_eq!("4.05,7".parse::<Record>().unwrap(), Record::new(4050, 7));
        assert_eq!("12,1".parse::<Record>().unwrap(), Record::new(12_000, 1));
    }

    #[test]
    fn parse_ignores_extra_fields() {
        assert_eq!("2.000,10,20,30".parse::<Record>().unwrap(), Record::new(2000, 10));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!("".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("512".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("abc,12".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("1.234;512".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("1.2345,512".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("1.234,512x".parse::<Record>(), Err(RecordError::Malformed));
        assert_eq!("1.234,-5".parse::<Record>(), Err(RecordError::Malformed));
    }

    #[test]
    fn parse_rejects_values_beyond_ten_bits() {
        assert_eq!("1.000,1023".parse::<Record>().unwrap().value, 1023);
        assert_eq!("1.000,1024".parse::<Record>(), Err(RecordError::OutOfRange(1024)));
    }

    #[test]
    fn parse_rejects_timestamp_overflow() {
        assert_eq!("4294967.295,1".parse::<Record>().unwrap().uptime_ms, u32::MAX);
        assert_eq!("4294967.296,1".parse::<Record>(), Err(RecordError::TimestampOverflow));
        assert_eq!("4294968,1".parse::<Record>(), Err(RecordError::TimestampOverflow));
    }

    #[test]
    fn encoded_line_parses_back() {
        for (uptime_ms, value) in [(0, 0), (999, 1), (4000, 300), (3_600_000, 1023)] {
            let record = Record::new(uptime_ms, value);
            let line = record.encode().unwrap();
            assert_eq!(line.as_str().parse::<Record>().unwrap(), record);
        }
    }
}
