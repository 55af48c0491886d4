//! # Plate — License Plates as Integers
//!
//! A plate segment is read as a number: base 36 (`0-9`, `A-Z`) when it
//! contains any letter, plain decimal otherwise. The nearest primes to that
//! number are rendered back in the same radix, so `AB` (= 371) maps to
//! nearby base-36 codes and `1234` to nearby decimal ones.
//!
//! [`analyze_plate`] handles the usual two-part `XXX-YYYY` form: each half
//! and their concatenation are looked up independently.

use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;

use crate::error::PrimeError;
use crate::nearest::NearestPrimeLocator;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Accepted length of each half of a two-part plate.
pub const PART_LENGTH: std::ops::RangeInclusive<usize> = 2..=5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Radix {
    Decimal,
    Base36,
}

impl Radix {
    fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Base36 => 36,
        }
    }
}

/// Format `value` in `radix`, uppercase, no padding.
pub fn render(value: u64, radix: Radix) -> String {
    match radix {
        Radix::Decimal => value.to_string(),
        Radix::Base36 => {
            if value == 0 {
                return "0".to_string();
            }
            let mut digits = Vec::new();
            let mut v = value;
            while v > 0 {
                digits.push(BASE36_DIGITS[(v % 36) as usize]);
                v /= 36;
            }
            digits.reverse();
            String::from_utf8_lossy(&digits).into_owned()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateCode {
    text: String,
    radix: Radix,
    value: u64,
}

impl PlateCode {
    pub fn parse(raw: &str) -> Result<Self, PrimeError> {
        let text = raw.trim().to_ascii_uppercase();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(PrimeError::InvalidPlate(raw.to_string()));
        }
        let radix = if text.bytes().any(|b| b.is_ascii_alphabetic()) {
            Radix::Base36
        } else {
            Radix::Decimal
        };
        let value = u64::from_str_radix(&text, radix.base()).map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => PrimeError::PlateOverflow(raw.to_string()),
            _ => PrimeError::InvalidPlate(raw.to_string()),
        })?;
        Ok(PlateCode { text, radix, value })
    }

    /// Normalized (trimmed, uppercase) form.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn has_letters(&self) -> bool {
        self.radix == Radix::Base36
    }

    /// Render `value` in this plate's radix.
    pub fn render(&self, value: u64) -> String {
        render(value, self.radix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateMatch {
    pub prime: u64,
    /// The prime in the plate's own radix.
    pub plate: String,
    pub base36: String,
    pub distance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateAnalysis {
    pub original: String,
    pub has_letters: bool,
    pub value: u64,
    pub closest_primes: Vec<PlateMatch>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateReport {
    pub part1: PlateAnalysis,
    pub part2: PlateAnalysis,
    pub full: PlateAnalysis,
}

/// The `k` primes closest to `code`'s value, rendered in its radix.
pub fn nearest_plates(locator: &NearestPrimeLocator, code: &PlateCode, k: usize) -> PlateAnalysis {
    let nearest = locator.nearest(code.value(), k);
    PlateAnalysis {
        original: code.text().to_string(),
        has_letters: code.has_letters(),
        value: code.value(),
        closest_primes: nearest
            .entries
            .iter()
            .map(|e| PlateMatch {
                prime: e.prime,
                plate: code.render(e.prime),
                base36: render(e.prime, Radix::Base36),
                distance: e.distance,
            })
            .collect(),
        complete: nearest.complete,
    }
}

/// Split a `PART1-PART2` plate and look up both halves and the joined code.
pub fn analyze_plate(
    locator: &NearestPrimeLocator,
    raw: &str,
    k: usize,
) -> Result<PlateReport, PrimeError> {
    let (left, right) = raw
        .split_once('-')
        .ok_or_else(|| PrimeError::InvalidPlate(raw.to_string()))?;
    let part1 = PlateCode::parse(left)?;
    let part2 = PlateCode::parse(right)?;
    if !PART_LENGTH.contains(&part1.text().len()) || !PART_LENGTH.contains(&part2.text().len()) {
        return Err(PrimeError::InvalidPlate(raw.to_string()));
    }
    let full = PlateCode::parse(&format!("{}{}", part1.text(), part2.text()))?;

    let mut full_analysis = nearest_plates(locator, &full, k);
    full_analysis.original = format!("{}-{}", part1.text(), part2.text());
    Ok(PlateReport {
        part1: nearest_plates(locator, &part1, k),
        part2: nearest_plates(locator, &part2, k),
        full: full_analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PrimeOracle;
    use crate::table::PrimeTable;
    use std::sync::Arc;

    fn locator() -> NearestPrimeLocator {
        let table = Arc::new(PrimeTable::build(100_000));
        NearestPrimeLocator::new(Arc::new(PrimeOracle::new(table)))
    }

    #[test]
    fn parse_picks_radix() {
        let d = PlateCode::parse(" 1234 ").unwrap();
        assert_eq!(d.radix(), Radix::Decimal);
        assert_eq!(d.value(), 1234);

        let b = PlateCode::parse("ab").unwrap();
        assert_eq!(b.text(), "AB");
        assert_eq!(b.radix(), Radix::Base36);
        assert_eq!(b.value(), 10 * 36 + 11);
        assert!(b.has_letters());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(PlateCode::parse(""), Err(PrimeError::InvalidPlate("".into())));
        assert!(matches!(PlateCode::parse("AB 12"), Err(PrimeError::InvalidPlate(_))));
        assert!(matches!(PlateCode::parse("Ä1"), Err(PrimeError::InvalidPlate(_))));
        assert!(matches!(
            PlateCode::parse("ZZZZZZZZZZZZZZZZ"),
            Err(PrimeError::PlateOverflow(_))
        ));
        assert!(matches!(
            PlateCode::parse("99999999999999999999"),
            Err(PrimeError::PlateOverflow(_))
        ));
    }

    #[test]
    fn render_round_trips_through_parse() {
        for text in ["Z", "AB", "7XK2", "ZZZZZ", "A0"] {
            let code = PlateCode::parse(text).unwrap();
            assert_eq!(code.render(code.value()), text.trim_start_matches('0'));
        }
        assert_eq!(render(0, Radix::Base36), "0");
        assert_eq!(render(35, Radix::Base36), "Z");
        assert_eq!(render(36, Radix::Base36), "10");
        assert_eq!(render(1234, Radix::Decimal), "1234");
    }

    #[test]
    fn nearest_plates_in_same_radix() {
        let l = locator();
        let code = PlateCode::parse("AB").unwrap();
        let analysis = nearest_plates(&l, &code, 3);
        // AB = 371 = 7 · 53; nearest primes 373, 367, 379
        assert_eq!(
            analysis
                .closest_primes
                .iter()
                .map(|m| (m.prime, m.plate.as_str()))
                .collect::<Vec<_>>(),
            vec![(373, "AD"), (367, "A7"), (379, "AJ")]
        );
        assert!(analysis.complete);
    }

    #[test]
    fn analyze_two_part_plate() {
        let l = locator();
        let report = analyze_plate(&l, "ab-12", 2).unwrap();
        assert_eq!(report.part1.original, "AB");
        assert_eq!(report.part2.original, "12");
        assert!(!report.part2.has_letters);
        assert_eq!(report.part2.closest_primes[0].plate, "11");
        assert_eq!(report.full.original, "AB-12");
        assert!(report.full.has_letters);
        assert_eq!(report.full.value, PlateCode::parse("AB12").unwrap().value());
    }

    #[test]
    fn analyze_rejects_bad_shapes() {
        let l = locator();
        assert!(analyze_plate(&l, "AB12", 2).is_err());
        assert!(analyze_plate(&l, "A-12", 2).is_err());
        assert!(analyze_plate(&l, "ABCDEF-12", 2).is_err());
    }
}
