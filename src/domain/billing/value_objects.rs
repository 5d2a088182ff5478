use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid currency code: {0}")]
  InvalidCurrency(String),
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),
  #[error("Invalid exchange rate: {0}")]
  InvalidExchangeRate(String),
  #[error("Invalid invoice number: {0}")]
  InvalidInvoiceNumber(String),
  #[error("Invalid billing location: {0}")]
  InvalidBillingLocation(String),
  #[error("Invalid timesheet status: {0}")]
  InvalidTimesheetStatus(String),
}

// Currency - ISO 4217, the set the practice bills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
  INR,
  USD,
  EUR,
  GBP,
  SGD,
  AED,
}

impl Currency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Currency::INR => "INR",
      Currency::USD => "USD",
      Currency::EUR => "EUR",
      Currency::GBP => "GBP",
      Currency::SGD => "SGD",
      Currency::AED => "AED",
    }
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      Currency::INR => "₹",
      Currency::USD => "$",
      Currency::EUR => "€",
      Currency::GBP => "£",
      Currency::SGD => "S$",
      Currency::AED => "د.إ",
    }
  }
}

impl FromStr for Currency {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "INR" => Ok(Currency::INR),
      "USD" => Ok(Currency::USD),
      "EUR" => Ok(Currency::EUR),
      "GBP" => Ok(Currency::GBP),
      "SGD" => Ok(Currency::SGD),
      "AED" => Ok(Currency::AED),
      _ => Err(ValueObjectError::InvalidCurrency(format!(
        "Unsupported currency: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for Currency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Money - Amount with currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
  pub amount: Decimal,
  pub currency: Currency,
}

impl Money {
  pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValueObjectError> {
    if amount.is_sign_negative() {
      return Err(ValueObjectError::InvalidAmount(
        "Amount cannot be negative".to_string(),
      ));
    }
    Ok(Self { amount, currency })
  }

  pub fn zero(currency: Currency) -> Self {
    Self {
      amount: Decimal::ZERO,
      currency,
    }
  }

  pub fn add(&self, other: &Money) -> Result<Money, ValueObjectError> {
    if self.currency != other.currency {
      return Err(ValueObjectError::InvalidAmount(
        "Cannot add amounts with different currencies".to_string(),
      ));
    }
    Ok(Money {
      amount: self.amount + other.amount,
      currency: self.currency,
    })
  }

  pub fn multiply(&self, factor: Decimal) -> Money {
    Money {
      amount: self.amount * factor,
      currency: self.currency,
    }
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
  }
}

// Exchange Rate - Source-currency to invoice-currency conversion factor.
// Positive, at most 4 decimal places; supplied by the user, never fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value <= Decimal::ZERO {
      return Err(ValueObjectError::InvalidExchangeRate(
        "Exchange rate must be positive".to_string(),
      ));
    }
    if value.scale() > 4 {
      return Err(ValueObjectError::InvalidExchangeRate(
        "Exchange rate cannot have more than 4 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

impl fmt::Display for ExchangeRate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Exchange Rate Map - Per-draft rates keyed by source currency.
// A rate is required for every breakdown currency other than the invoice
// currency before the draft total is final.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRateMap(BTreeMap<Currency, ExchangeRate>);

impl ExchangeRateMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, currency: Currency, rate: ExchangeRate) {
    self.0.insert(currency, rate);
  }

  pub fn remove(&mut self, currency: Currency) -> Option<ExchangeRate> {
    self.0.remove(&currency)
  }

  pub fn get(&self, currency: Currency) -> Option<ExchangeRate> {
    self.0.get(&currency).copied()
  }

  pub fn contains(&self, currency: Currency) -> bool {
    self.0.contains_key(&currency)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (Currency, ExchangeRate)> + '_ {
    self.0.iter().map(|(c, r)| (*c, *r))
  }
}

// Billing Location - Office the invoice is raised from; maps 1:1 to the
// office code embedded in the invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingLocation {
  Delhi,
  Mumbai,
  Bengaluru,
  London,
}

impl BillingLocation {
  pub fn office_code(&self) -> &'static str {
    match self {
      BillingLocation::Delhi => "D",
      BillingLocation::Mumbai => "M",
      BillingLocation::Bengaluru => "B",
      BillingLocation::London => "LT",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      BillingLocation::Delhi => "delhi",
      BillingLocation::Mumbai => "mumbai",
      BillingLocation::Bengaluru => "bengaluru",
      BillingLocation::London => "london",
    }
  }
}

impl FromStr for BillingLocation {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "delhi" | "d" => Ok(BillingLocation::Delhi),
      "mumbai" | "m" => Ok(BillingLocation::Mumbai),
      "bengaluru" | "b" => Ok(BillingLocation::Bengaluru),
      "london" | "lt" => Ok(BillingLocation::London),
      _ => Err(ValueObjectError::InvalidBillingLocation(format!(
        "Unknown billing location: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for BillingLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

lazy_static! {
  static ref INVOICE_NUMBER_RE: Regex =
    Regex::new(r"^\d{8}-(D|M|B|LT)(-[A-Z]+)?$").expect("invalid invoice number regex");
}

// Invoice Number - DDMMYYYY-OFFICE[-SUFFIX]. Manually entered numbers go
// through the same format check as allocated ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot be empty".to_string(),
      ));
    }
    if !INVOICE_NUMBER_RE.is_match(trimmed) {
      return Err(ValueObjectError::InvalidInvoiceNumber(format!(
        "Invoice number '{}' does not match DDMMYYYY-OFFICE[-SUFFIX]",
        trimmed
      )));
    }
    Ok(Self(trimmed.to_string()))
  }

  /// Date+office prefix for a given invoice date and billing location.
  pub fn prefix_for(date: NaiveDate, location: BillingLocation) -> String {
    format!("{}-{}", date.format("%d%m%Y"), location.office_code())
  }

  /// The DDMMYYYY-OFFICE part, without any disambiguating suffix.
  pub fn date_office_prefix(&self) -> &str {
    let mut parts = self.0.splitn(3, '-');
    let date = parts.next().unwrap_or("");
    let office = parts.next().unwrap_or("");
    &self.0[..date.len() + 1 + office.len()]
  }

  pub fn suffix(&self) -> Option<&str> {
    self.0.splitn(3, '-').nth(2)
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for InvoiceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Timesheet Status - Only approved entries are billable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimesheetStatus {
  Draft,
  Submitted,
  Approved,
}

impl TimesheetStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      TimesheetStatus::Draft => "draft",
      TimesheetStatus::Submitted => "submitted",
      TimesheetStatus::Approved => "approved",
    }
  }

  pub fn is_billable(&self) -> bool {
    matches!(self, TimesheetStatus::Approved)
  }
}

impl FromStr for TimesheetStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "draft" => Ok(TimesheetStatus::Draft),
      "submitted" => Ok(TimesheetStatus::Submitted),
      "approved" => Ok(TimesheetStatus::Approved),
      _ => Err(ValueObjectError::InvalidTimesheetStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}
