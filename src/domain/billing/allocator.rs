use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::value_objects::{BillingLocation, InvoiceNumber, ValueObjectError};

/// Derives the next invoice number for a date+office, given the numbers
/// already allocated in that series.
///
/// The bare `DDMMYYYY-OFFICE` number is used first; once taken, letters
/// `A`, `B`, ... disambiguate, continuing `Z` -> `AA` since the format
/// admits multi-letter suffixes.
///
/// The caller's read-then-allocate sequence is not sufficient for
/// correctness under concurrent submission: the invoice store must still
/// enforce uniqueness with an atomic check-and-insert, and a collision at
/// that point surfaces as a conflict, never a silent retry.
pub fn allocate(
  date: NaiveDate,
  location: BillingLocation,
  existing: &[InvoiceNumber],
) -> Result<InvoiceNumber, ValueObjectError> {
  let prefix = InvoiceNumber::prefix_for(date, location);
  let taken: BTreeSet<&str> = existing
    .iter()
    .filter(|n| n.date_office_prefix() == prefix)
    .map(|n| n.value())
    .collect();

  if !taken.contains(prefix.as_str()) {
    return InvoiceNumber::new(prefix);
  }

  for n in 0.. {
    let candidate = format!("{}-{}", prefix, alpha_suffix(n));
    if !taken.contains(candidate.as_str()) {
      return InvoiceNumber::new(candidate);
    }
  }
  unreachable!("suffix sequence is unbounded")
}

/// 0 -> "A", 25 -> "Z", 26 -> "AA", spreadsheet-column style.
fn alpha_suffix(mut n: usize) -> String {
  let mut out = Vec::new();
  loop {
    out.push(b'A' + (n % 26) as u8);
    if n < 26 {
      break;
    }
    n = n / 26 - 1;
  }
  out.reverse();
  String::from_utf8(out).expect("suffix bytes are ASCII")
}
