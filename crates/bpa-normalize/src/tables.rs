//! Per-kind mapping tables
//!
//! Wire names follow the backend DTOs (mixed prefixes and casing included);
//! form names are the flat keys the wizard edits.

use crate::mapping::{Coercion, FieldDefault, FieldMapping};
use bpa_model::{FormRecord, RecordKind};

/// Form field referencing the parent asset on child records
pub const ASSET_REF: &str = "assetId";
/// Form field referencing the parent unit on booking/purchase records
pub const UNIT_REF: &str = "unitId";
/// Property id whose assets must name a building
pub const BUILDING_PROPERTY_ID: &str = "3";

const ASSET_DTO: &[&str] = &["realEstateAssetDTO", "id"];

fn building_name_required(record: &FormRecord) -> bool {
    record.text("propertyId").trim() == BUILDING_PROPERTY_ID
}

/// Asset details (root record)
pub static DETAILS: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("buildPartnerId", &["buildPartnerDTO", "id"], Coercion::Id)
        .label("CDL_BPA_BUILD_PARTNER", "Build Partner")
        .required(),
    FieldMapping::new("buildPartnerName", &["buildPartnerDTO", "bpName"], Coercion::Text),
    FieldMapping::new("buildPartnerCif", &["buildPartnerDTO", "bpCifrera"], Coercion::Text),
    FieldMapping::new("projectReference", &["reaId"], Coercion::Text)
        .label("CDL_BPA_PROJECT_REF", "Project Reference")
        .required(),
    FieldMapping::new("assetCif", &["reaCif"], Coercion::Text),
    FieldMapping::new("assetName", &["reaName"], Coercion::Text)
        .label("CDL_BPA_PROJECT_NAME", "Project Name")
        .required(),
    FieldMapping::new("assetNameLocal", &["reaNameLocal"], Coercion::Text),
    FieldMapping::new("registrationNumber", &["reaReraNumber"], Coercion::Text)
        .label("CDL_BPA_RERA_NUMBER", "RERA Registration Number")
        .required(),
    FieldMapping::new("propertyId", &["reaPropertyIdDTO", "id"], Coercion::Id)
        .label("CDL_BPA_PROPERTY_ID", "Property ID"),
    FieldMapping::new("assetTypeId", &["reaTypeDTO", "id"], Coercion::Id),
    FieldMapping::new("assetTypeName", &["reaTypeDTO", "settingValue"], Coercion::Text),
    FieldMapping::new("statusId", &["reaStatusDTO", "id"], Coercion::Id),
    FieldMapping::new("statusName", &["reaStatusDTO", "settingValue"], Coercion::Text),
    FieldMapping::new("buildingName", &["reaBuildingName"], Coercion::Text)
        .label("CDL_BPA_BUILDING_NAME", "Building Name")
        .required_when(building_name_required),
    FieldMapping::new("location", &["reaLocation"], Coercion::Text),
    FieldMapping::new("noOfUnits", &["reaNoOfUnits"], Coercion::Integer)
        .label("CDL_BPA_NO_OF_UNITS", "Number of Units"),
    FieldMapping::new("startDate", &["reaStartDate"], Coercion::Date)
        .label("CDL_BPA_START_DATE", "Project Start Date")
        .required(),
    FieldMapping::new("completionDate", &["reaCompletionDate"], Coercion::Date)
        .label("CDL_BPA_COMPLETION_DATE", "Project Completion Date")
        .required(),
    FieldMapping::new("percentComplete", &["reaPercentComplete"], Coercion::Percent)
        .label("CDL_BPA_PERCENT_COMPLETE", "Percent Complete"),
    FieldMapping::new("constructionCost", &["reaConstructionCost"], Coercion::Number)
        .label("CDL_BPA_CONSTRUCTION_COST", "Construction Cost"),
    FieldMapping::new(
        "constructionCostCurrencyId",
        &["reaConstructionCostCurrencyDTO", "id"],
        Coercion::Id,
    ),
    FieldMapping::new("retentionPercent", &["reaRetentionPercent"], Coercion::Percent)
        .label("CDL_BPA_RETENTION_PERCENT", "Retention %")
        .required(),
    FieldMapping::new(
        "additionalRetentionPercent",
        &["reaAdditionalRetentionPercent"],
        Coercion::Percent,
    )
    .label("CDL_BPA_ADDITIONAL_RETENTION_PERCENT", "Additional Retention %")
    .required(),
    FieldMapping::new("totalRetentionPercent", &["reaTotalRetentionPercent"], Coercion::Percent)
        .label("CDL_BPA_TOTAL_RETENTION_PERCENT", "Total Retention %"),
    FieldMapping::new("retentionEffectiveDate", &["reaRetentionEffectiveDate"], Coercion::Date),
    FieldMapping::new("remarks", &["reaRemarks"], Coercion::Text),
    FieldMapping::new("specialApproval", &["reaSpecialApproval"], Coercion::Bool)
        .default_to(FieldDefault::Bool(false)),
];

/// Uploaded document metadata
pub static DOCUMENT: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("documentName", &["rtdDocumentName"], Coercion::Text),
    FieldMapping::new("documentTypeId", &["documentTypeDTO", "id"], Coercion::Id),
    FieldMapping::new("documentTypeName", &["documentTypeDTO", "settingValue"], Coercion::Text),
    FieldMapping::new("uploadDate", &["rtdUploadDate"], Coercion::Date),
    FieldMapping::new("location", &["rtdLocation"], Coercion::Text),
    FieldMapping::new("size", &["rtdSize"], Coercion::Integer),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Bank account (one per canonical slot)
pub static ACCOUNT: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("accountType", &["accountType"], Coercion::AccountType),
    FieldMapping::new("accountNumber", &["accountNumber"], Coercion::Text)
        .label("CDL_BPA_ACCOUNT_NUMBER", "Account Number")
        .required(),
    FieldMapping::new("ibanNumber", &["ibanNumber"], Coercion::Text)
        .label("CDL_BPA_IBAN", "IBAN"),
    FieldMapping::new("accountTitle", &["accountTitle"], Coercion::Text),
    FieldMapping::new("currencyCode", &["currencyCode"], Coercion::Text)
        .label("CDL_BPA_ACCOUNT_CURRENCY", "Currency")
        .required(),
    FieldMapping::new("dateOpened", &["dateOpened"], Coercion::Date)
        .label("CDL_BPA_DATE_OPENED", "Date Opened"),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Fee row
pub static FEE: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("feeCategoryId", &["feeCategoryDTO", "id"], Coercion::Id)
        .label("CDL_BPA_FEE_CATEGORY", "Fee Category")
        .required(),
    FieldMapping::new("feeCategoryName", &["feeCategoryDTO", "settingValue"], Coercion::Text),
    FieldMapping::new("frequencyId", &["feeFrequencyDTO", "id"], Coercion::Id)
        .label("CDL_BPA_FEE_FREQUENCY", "Frequency")
        .required(),
    FieldMapping::new("amount", &["debitAmount"], Coercion::Number)
        .label("CDL_BPA_FEE_AMOUNT", "Debit Amount")
        .required(),
    FieldMapping::new("feePercentage", &["feePercentage"], Coercion::Percent)
        .label("CDL_BPA_FEE_PERCENTAGE", "Fee %"),
    FieldMapping::new("vatPercentage", &["vatPercentage"], Coercion::Percent)
        .label("CDL_BPA_VAT_PERCENTAGE", "VAT %"),
    FieldMapping::new("collectionDate", &["feeCollectionDate"], Coercion::Date)
        .label("CDL_BPA_FEE_COLLECTION_DATE", "Fee to be Collected")
        .required(),
    FieldMapping::new("currencyId", &["feeCurrencyDTO", "id"], Coercion::Id),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Beneficiary row
pub static BENEFICIARY: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("beneficiaryRef", &["reabBeneficiaryId"], Coercion::Text)
        .label("CDL_BPA_BENE_REF", "Beneficiary ID")
        .required(),
    FieldMapping::new("beneficiaryName", &["reabName"], Coercion::Text)
        .label("CDL_BPA_BENE_NAME", "Beneficiary Name")
        .required(),
    FieldMapping::new("beneficiaryTypeId", &["reabTypeDTO", "id"], Coercion::Id),
    FieldMapping::new("beneficiaryTypeName", &["reabTypeDTO", "settingValue"], Coercion::Text),
    FieldMapping::new("bankName", &["reabBank"], Coercion::Text)
        .label("CDL_BPA_BENE_BANK", "Bank")
        .required(),
    FieldMapping::new("swiftCode", &["reabSwift"], Coercion::Text),
    FieldMapping::new("routingCode", &["reabRoutingCode"], Coercion::Text),
    FieldMapping::new("accountNumber", &["reabBeneAccount"], Coercion::Text)
        .label("CDL_BPA_BENE_ACCOUNT", "Account Number")
        .required(),
    FieldMapping::new("transferTypeId", &["reabTransferTypeDTO", "id"], Coercion::Id),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Payment plan installment row
pub static PAYMENT_PLAN: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("installmentNumber", &["reappInstallmentNumber"], Coercion::Integer)
        .label("CDL_BPA_INSTALLMENT_NUMBER", "Installment Number")
        .required(),
    FieldMapping::new(
        "installmentPercentage",
        &["reappInstallmentPercentage"],
        Coercion::Percent,
    )
    .label("CDL_BPA_INSTALLMENT_PERCENTAGE", "Installment %")
    .required(),
    FieldMapping::new(
        "projectCompletionPercentage",
        &["reappProjectCompletionPercentage"],
        Coercion::Percent,
    )
    .label("CDL_BPA_COMPLETION_PERCENTAGE", "Project Completion %")
    .required(),
    FieldMapping::new("installmentDate", &["reappInstallmentDate"], Coercion::Date),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Financial summary scalar fields (the breakdown has its own table)
pub static FINANCIAL_SUMMARY: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("estimatedRevenue", &["reafsEstRevenue"], Coercion::Number)
        .label("CDL_FS_EST_REVENUE", "Estimated Revenue"),
    FieldMapping::new(
        "estimatedConstructionCost",
        &["reafsEstConstructionCost"],
        Coercion::Number,
    )
    .label("CDL_FS_EST_CONSTRUCTION_COST", "Estimated Construction Cost"),
    FieldMapping::new("estimatedLandCost", &["reafsEstLandCost"], Coercion::Number),
    FieldMapping::new(
        "estimatedMarketingExpense",
        &["reafsEstMarketingExpense"],
        Coercion::Number,
    ),
    FieldMapping::new(
        "estimatedProjectManagementExpense",
        &["reafsEstProjectMgmtExpense"],
        Coercion::Number,
    ),
    FieldMapping::new("estimateDate", &["reafsEstimatedDate"], Coercion::Date),
    FieldMapping::new("actualSoldValue", &["reafsActualSoldValue"], Coercion::Number),
    FieldMapping::new(
        "actualConstructionCost",
        &["reafsActualConstructionCost"],
        Coercion::Number,
    ),
    FieldMapping::new("actualLandCost", &["reafsActualLandCost"], Coercion::Number),
    FieldMapping::new(
        "actualMarketingExpense",
        &["reafsActualMarketingExp"],
        Coercion::Number,
    ),
    FieldMapping::new("actualDate", &["reafsActualDate"], Coercion::Date),
    FieldMapping::new("creditInterest", &["reafsCreditInterest"], Coercion::Number),
    FieldMapping::new(
        "retentionPayment",
        &["reafsPaymentForRetentionAcc"],
        Coercion::Number,
    ),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Closure singleton
pub static CLOSURE: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("totalIncomeFund", &["reacTotalIncomeFund"], Coercion::Number)
        .label("CDL_BPA_CLOSURE_INCOME_FUND", "Total Income Fund")
        .required(),
    FieldMapping::new("totalPayment", &["reacTotalPayment"], Coercion::Number)
        .label("CDL_BPA_CLOSURE_TOTAL_PAYMENT", "Total Payment")
        .required(),
    FieldMapping::new("checkGuaranteeDoc", &["reacCheckGuaranteeDoc"], Coercion::Text),
    FieldMapping::new("closureDate", &["reacClosureDate"], Coercion::Date)
        .label("CDL_BPA_CLOSURE_DATE", "Closure Date"),
    FieldMapping::new("enabled", &["reacEnabled"], Coercion::Bool)
        .default_to(FieldDefault::Bool(false)),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Unit (parent of booking and purchase)
pub static UNIT: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new("unitRefId", &["unitRefId"], Coercion::Text)
        .label("CDL_UNIT_REF", "Unit Reference")
        .required(),
    FieldMapping::new("unitNo", &["unitNoOqood"], Coercion::Text),
    FieldMapping::new("floor", &["floor"], Coercion::Text),
    FieldMapping::new("towerName", &["towerName"], Coercion::Text),
    FieldMapping::new("unitStatusId", &["unitStatusDTO", "id"], Coercion::Id),
    FieldMapping::new("grossSaleAmount", &["grossSalePrice"], Coercion::Number),
    FieldMapping::new(ASSET_REF, ASSET_DTO, Coercion::Id),
];

/// Unit booking (references the unit)
pub static BOOKING: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new(UNIT_REF, &["unitDTO", "id"], Coercion::Id),
    FieldMapping::new("bookingDate", &["ubBookingDate"], Coercion::Date),
    FieldMapping::new("bookingAmount", &["ubAmountPaid"], Coercion::Number),
    FieldMapping::new("receiptNumber", &["ubReceiptNumber"], Coercion::Text),
];

/// Unit purchase (references the unit)
pub static PURCHASE: &[FieldMapping] = &[
    FieldMapping::new("id", &["id"], Coercion::Id).server_generated(),
    FieldMapping::new(UNIT_REF, &["unitDTO", "id"], Coercion::Id),
    FieldMapping::new("purchaseDate", &["upPurchaseDate"], Coercion::Date),
    FieldMapping::new("purchasePrice", &["upUnitPurchasePrice"], Coercion::Number),
    FieldMapping::new("agreementNumber", &["upSpaAgreementNumber"], Coercion::Text),
    FieldMapping::new("agreementSigned", &["upAgreementSigned"], Coercion::Bool)
        .default_to(FieldDefault::Bool(false)),
];

/// Mapping table for a record kind
#[must_use]
pub fn mappings(kind: RecordKind) -> &'static [FieldMapping] {
    match kind {
        RecordKind::Details => DETAILS,
        RecordKind::Document => DOCUMENT,
        RecordKind::Account => ACCOUNT,
        RecordKind::Fee => FEE,
        RecordKind::Beneficiary => BENEFICIARY,
        RecordKind::PaymentPlan => PAYMENT_PLAN,
        RecordKind::FinancialSummary => FINANCIAL_SUMMARY,
        RecordKind::Closure => CLOSURE,
        RecordKind::Unit => UNIT,
        RecordKind::Booking => BOOKING,
        RecordKind::Purchase => PURCHASE,
    }
}

/// Mapping for one form field of a kind
#[must_use]
pub fn mapping(kind: RecordKind, field: &str) -> Option<&'static FieldMapping> {
    mappings(kind).iter().find(|m| m.field == field)
}

/// Form field referencing the parent record, if the kind has one
#[must_use]
pub fn parent_field(kind: RecordKind) -> Option<&'static str> {
    match kind {
        RecordKind::Details => None,
        RecordKind::Booking | RecordKind::Purchase => Some(UNIT_REF),
        _ => Some(ASSET_REF),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [RecordKind; 11] = [
        RecordKind::Details,
        RecordKind::Document,
        RecordKind::Account,
        RecordKind::Fee,
        RecordKind::Beneficiary,
        RecordKind::PaymentPlan,
        RecordKind::FinancialSummary,
        RecordKind::Closure,
        RecordKind::Unit,
        RecordKind::Booking,
        RecordKind::Purchase,
    ];

    #[test]
    fn form_names_are_unique_per_kind() {
        for kind in ALL {
            let names: HashSet<&str> = mappings(kind).iter().map(|m| m.field).collect();
            assert_eq!(names.len(), mappings(kind).len(), "{kind}");
        }
    }

    #[test]
    fn wire_paths_are_unique_per_kind() {
        for kind in ALL {
            let paths: HashSet<Vec<&str>> = mappings(kind).iter().map(|m| m.wire.to_vec()).collect();
            assert_eq!(paths.len(), mappings(kind).len(), "{kind}");
        }
    }

    #[test]
    fn every_kind_has_server_id() {
        for kind in ALL {
            let id = mapping(kind, "id").unwrap();
            assert!(id.server_generated);
        }
    }

    #[test]
    fn parent_references_are_declared() {
        for kind in ALL {
            if let Some(field) = parent_field(kind) {
                assert!(mapping(kind, field).is_some(), "{kind} lacks {field}");
            }
        }
    }

    #[test]
    fn building_name_requirement_follows_property() {
        let building = mapping(RecordKind::Details, "buildingName").unwrap();
        let plain = FormRecord::new().with("propertyId", bpa_model::FieldValue::Id(1));
        let tower = FormRecord::new().with("propertyId", bpa_model::FieldValue::Id(3));
        assert!(!building.requirement.applies(&plain));
        assert!(building.requirement.applies(&tower));
    }
}
