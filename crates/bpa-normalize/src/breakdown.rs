//! Financial breakdown table
//!
//! The breakdown is a fixed 24-row table. Each conceptual row is assembled
//! from four independently named wire fields; the names are irregular, so the
//! index-to-field mapping is spelled out rather than derived.

use crate::mapping::LabelRef;
use bpa_model::{BreakdownRow, BREAKDOWN_ROWS};
use serde_json::{Map, Value};

/// Wire field names of one breakdown row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownSpec {
    /// Row label
    pub label: LabelRef,
    /// Amount outside escrow
    pub out: &'static str,
    /// Amount within escrow
    pub within: &'static str,
    /// Total amount
    pub total: &'static str,
    /// Amount excluding capital
    pub except: &'static str,
}

impl BreakdownSpec {
    /// The four wire field names in column order
    #[inline]
    #[must_use]
    pub fn columns(&self) -> [&'static str; 4] {
        [self.out, self.within, self.total, self.except]
    }
}

/// Row index to wire field names
pub static BREAKDOWN: [BreakdownSpec; BREAKDOWN_ROWS] = [
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_CASH_RECEIVED",
            fallback: "Cash Received from Unit Holders",
        },
        out: "cashReceivedOut",
        within: "cashReceivedWithin",
        total: "cashReceivedTotal",
        except: "cashReceivedExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_LAND_COST",
            fallback: "Land Cost",
        },
        out: "landCostOut",
        within: "landCostWithin",
        total: "landCostTotal",
        except: "landCostExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_CONSTRUCTION_COST",
            fallback: "Construction Cost",
        },
        out: "constructionCostOut",
        within: "constructionCostWithin",
        total: "constructionCostTotal",
        except: "constructionCostExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_MARKETING",
            fallback: "Marketing Expense",
        },
        out: "marketingExpOut",
        within: "marketingExpWithin",
        total: "marketingTotal",
        except: "marketingExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_PROJECT_MGMT",
            fallback: "Project Management Expense",
        },
        out: "projectMgmtExpOut",
        within: "projectMgmtExpWithin",
        total: "projectMgmtExpTotal",
        except: "projectMgmtExpExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_MORTGAGE",
            fallback: "Mortgage",
        },
        out: "mortgageAmountOut",
        within: "mortgageAmountWithin",
        total: "mortgageTotal",
        except: "mortgageExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_VAT",
            fallback: "VAT Payment",
        },
        out: "vatPaymentOut",
        within: "vatPaymentWithin",
        total: "vatPaymentTotal",
        except: "vatExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_OQOOD",
            fallback: "Oqood Fees",
        },
        out: "oqoodAmountOut",
        within: "oqoodAmountWithin",
        total: "oqoodTotal",
        except: "oqoodExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_REFUND",
            fallback: "Refund to Unit Holders",
        },
        out: "refundOut",
        within: "refundWithin",
        total: "refundTotal",
        except: "refundExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_BAL_RETENTION",
            fallback: "Balance in Retention Account",
        },
        out: "balanceInRetentionAccOut",
        within: "balanceInRetentionAccWithin",
        total: "balanceInRetentionAccTotal",
        except: "balanceInRetentionAccExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_BAL_TRUST",
            fallback: "Balance in Trust Account",
        },
        out: "balanceInTrustAccOut",
        within: "balanceInTrustAccWithin",
        total: "balanceInTrustAccTotal",
        except: "balanceInTrustAccExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_BAL_SUBCONS",
            fallback: "Balance in Sub-Construction Account",
        },
        out: "balanceInSubsConsOut",
        within: "balanceInSubsConsWithin",
        total: "balanceInSubsConsTotal",
        except: "balanceInSubsConsExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_TECHNICAL_FEE",
            fallback: "Technical Fees",
        },
        out: "technicalFeeOut",
        within: "technicalFeeWithin",
        total: "technicalFeeTotal",
        except: "technicalFeeExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_UNIDENTIFIED",
            fallback: "Unidentified Funds",
        },
        out: "unIdentifiedFundOut",
        within: "unIdentifiedFundWithin",
        total: "unIdentifiedFundTotal",
        except: "unIdentifiedFundExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_LOAN_INSTALLMENT",
            fallback: "Loan Installments",
        },
        out: "loanInstallmentOut",
        within: "loanInstallmentWithin",
        total: "loanInstallmentTotal",
        except: "loanInstallmentExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_INFRA_COST",
            fallback: "Infrastructure Cost",
        },
        out: "infraCostOut",
        within: "infraCostWithin",
        total: "infraCostTotal",
        except: "infraCostExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_OTHERS",
            fallback: "Others",
        },
        out: "othersCostOut",
        within: "othersCostWithin",
        total: "othersCostTotal",
        except: "othersCostExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_TRANSFERRED",
            fallback: "Transferred to Other Accounts",
        },
        out: "transferredAmtOut",
        within: "transferredAmtWithin",
        total: "transferredAmtTotal",
        except: "transferredAmtExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_DEV_EQUITY",
            fallback: "Developer Equity",
        },
        out: "developerEquitycostOut",
        within: "developerEquitycostWithin",
        total: "developerEquitycostTotal",
        except: "developerEquitycostExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_MANAGER_FUNDS",
            fallback: "Manager Funds",
        },
        out: "managerFundsOut",
        within: "managerFundsWithin",
        total: "managerFundsTotal",
        except: "managerFundsExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_BANK_CHARGES",
            fallback: "Bank Charges",
        },
        out: "bankChargesOut",
        within: "bankChargesWithin",
        total: "bankChargesTotal",
        except: "bankChargesExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_DEV_REIMBURSE",
            fallback: "Developer Reimbursement",
        },
        out: "developerReimburseOut",
        within: "developerReimburseWithin",
        total: "developerReimburseTotal",
        except: "developerReimburseExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_UNIT_REG_FEES",
            fallback: "Unit Registration Fees",
        },
        out: "unitRegFeesOut",
        within: "unitRegFeesWithin",
        total: "unitRegFeesTotal",
        except: "unitRegFeesExceptCapVal",
    },
    BreakdownSpec {
        label: LabelRef {
            config_id: "CDL_FS_CREDIT_INTEREST",
            fallback: "Credit Interest / Profit",
        },
        out: "creditInterestProfitOut",
        within: "creditInterestProfitWithin",
        total: "creditInterestProfitTotal",
        except: "creditInterestProfitExceptCapVal",
    },
];

/// Display text of one breakdown cell
///
/// Absent and `null` cells render as `""`; numbers keep their wire formatting.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => crate::normalizer::canonical_number_text(s),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Read all rows from a flat wire object
#[must_use]
pub fn rows_from_wire(wire: &Map<String, Value>) -> Vec<BreakdownRow> {
    BREAKDOWN
        .iter()
        .map(|spec| BreakdownRow {
            out: cell_text(wire.get(spec.out)),
            within: cell_text(wire.get(spec.within)),
            total: cell_text(wire.get(spec.total)),
            except: cell_text(wire.get(spec.except)),
        })
        .collect()
}

/// Write rows into a flat wire object; blank cells become `null`
///
/// Rows beyond the table are ignored; missing rows are written as `null`.
pub fn rows_into_wire(rows: &[BreakdownRow], wire: &mut Map<String, Value>) {
    let blank = BreakdownRow::default();
    for (i, spec) in BREAKDOWN.iter().enumerate() {
        let row = rows.get(i).unwrap_or(&blank);
        let cells = [&row.out, &row.within, &row.total, &row.except];
        for (name, cell) in spec.columns().into_iter().zip(cells) {
            wire.insert(name.to_string(), crate::normalizer::number_to_wire(cell));
        }
    }
}
