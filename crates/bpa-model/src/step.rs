//! Wizard steps, modes and record kinds

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique editing-session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The nine wizard steps, in navigation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Core asset details (root record)
    Details,
    /// Uploaded documents (managed externally)
    Documents,
    /// The four canonical bank accounts
    Accounts,
    /// Fee rows
    Fees,
    /// Beneficiary rows
    Beneficiaries,
    /// Installment rows
    PaymentPlan,
    /// Financial summary singleton
    FinancialSummary,
    /// Closure singleton
    Closure,
    /// Read-only review (terminal)
    Review,
}

impl StepKind {
    /// All steps in navigation order
    pub const ALL: [StepKind; 9] = [
        StepKind::Details,
        StepKind::Documents,
        StepKind::Accounts,
        StepKind::Fees,
        StepKind::Beneficiaries,
        StepKind::PaymentPlan,
        StepKind::FinancialSummary,
        StepKind::Closure,
        StepKind::Review,
    ];

    /// Zero-based position in the wizard
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Step at a zero-based position
    ///
    /// # Errors
    /// `ModelError::StepOutOfRange` if `index > 8`
    pub fn from_index(index: usize) -> Result<Self, ModelError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ModelError::StepOutOfRange(index))
    }

    /// Following step, `None` on the terminal step
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Preceding step, `None` on the first step
    #[inline]
    #[must_use]
    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Whether this is the terminal review step
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, StepKind::Review)
    }

    /// Record kind persisted by this step, if any
    #[must_use]
    pub fn record_kind(self) -> Option<RecordKind> {
        match self {
            StepKind::Details => Some(RecordKind::Details),
            StepKind::Documents => Some(RecordKind::Document),
            StepKind::Accounts => Some(RecordKind::Account),
            StepKind::Fees => Some(RecordKind::Fee),
            StepKind::Beneficiaries => Some(RecordKind::Beneficiary),
            StepKind::PaymentPlan => Some(RecordKind::PaymentPlan),
            StepKind::FinancialSummary => Some(RecordKind::FinancialSummary),
            StepKind::Closure => Some(RecordKind::Closure),
            StepKind::Review => None,
        }
    }

    /// Stable snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Details => "details",
            StepKind::Documents => "documents",
            StepKind::Accounts => "accounts",
            StepKind::Fees => "fees",
            StepKind::Beneficiaries => "beneficiaries",
            StepKind::PaymentPlan => "payment_plan",
            StepKind::FinancialSummary => "financial_summary",
            StepKind::Closure => "closure",
            StepKind::Review => "review",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editing mode of the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardMode {
    /// New asset, nothing persisted yet
    #[default]
    Create,
    /// Existing asset, writes allowed
    Edit,
    /// Existing asset, read-only navigation
    View,
}

impl WizardMode {
    /// Lowercase name used in locations
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WizardMode::Create => "create",
            WizardMode::Edit => "edit",
            WizardMode::View => "view",
        }
    }

    /// Whether saves are permitted in this mode
    #[inline]
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(self, WizardMode::View)
    }
}

impl fmt::Display for WizardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WizardMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "new" => Ok(WizardMode::Create),
            "edit" => Ok(WizardMode::Edit),
            "view" => Ok(WizardMode::View),
            other => Err(ModelError::UnknownMode(other.to_string())),
        }
    }
}

/// Kinds of backend records the stepper reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Asset details (root)
    Details,
    /// Asset document
    Document,
    /// Bank account
    Account,
    /// Fee
    Fee,
    /// Beneficiary
    Beneficiary,
    /// Payment plan installment
    PaymentPlan,
    /// Financial summary
    FinancialSummary,
    /// Closure
    Closure,
    /// Unit (parent of booking/purchase)
    Unit,
    /// Unit booking
    Booking,
    /// Unit purchase
    Purchase,
}

impl RecordKind {
    /// Stable snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Details => "details",
            RecordKind::Document => "document",
            RecordKind::Account => "account",
            RecordKind::Fee => "fee",
            RecordKind::Beneficiary => "beneficiary",
            RecordKind::PaymentPlan => "payment_plan",
            RecordKind::FinancialSummary => "financial_summary",
            RecordKind::Closure => "closure",
            RecordKind::Unit => "unit",
            RecordKind::Booking => "booking",
            RecordKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "details" => RecordKind::Details,
            "document" | "documents" => RecordKind::Document,
            "account" | "accounts" => RecordKind::Account,
            "fee" | "fees" => RecordKind::Fee,
            "beneficiary" | "beneficiaries" => RecordKind::Beneficiary,
            "payment_plan" => RecordKind::PaymentPlan,
            "financial_summary" => RecordKind::FinancialSummary,
            "closure" => RecordKind::Closure,
            "unit" => RecordKind::Unit,
            "booking" => RecordKind::Booking,
            "purchase" => RecordKind::Purchase,
            other => return Err(ModelError::UnknownRecordKind(other.to_string())),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_order_is_contiguous() {
        for (i, step) in StepKind::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(StepKind::from_index(i).unwrap(), *step);
        }
        assert!(StepKind::from_index(9).is_err());
    }

    #[test]
    fn step_neighbours() {
        assert_eq!(StepKind::Details.prev(), None);
        assert_eq!(StepKind::Details.next(), Some(StepKind::Documents));
        assert_eq!(StepKind::Review.next(), None);
        assert_eq!(StepKind::Review.prev(), Some(StepKind::Closure));
        assert!(StepKind::Review.is_terminal());
        assert_eq!(StepKind::Review.record_kind(), None);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("EDIT".parse::<WizardMode>().unwrap(), WizardMode::Edit);
        assert_eq!(" view ".parse::<WizardMode>().unwrap(), WizardMode::View);
        assert!("delete".parse::<WizardMode>().is_err());
        assert!(WizardMode::View.is_read_only());
    }

    #[test]
    fn record_kind_parsing() {
        assert_eq!("payment-plan".parse::<RecordKind>().unwrap(), RecordKind::PaymentPlan);
        assert_eq!("accounts".parse::<RecordKind>().unwrap(), RecordKind::Account);
        assert!("ledger".parse::<RecordKind>().is_err());
    }
}
