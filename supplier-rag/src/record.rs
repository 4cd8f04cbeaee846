//! Supplier-contract records and the declared text-field schema.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// One raw dataset row: column name to cell value, `None` for a null cell.
pub type RawRow = HashMap<String, Option<String>>;

/// The text fields every supplier-contract row must supply.
///
/// These are the fields indexed for ranked search and rendered into the
/// grounding prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    SupplierName,
    SupplierType,
    RiskLevel,
    ComplianceIssues,
    KeyTerms,
    PastPerformance,
    NegotiateRecommendation,
    SupplyChainDisruption,
    QualityMetrics,
    CostMetrics,
}

impl TextField {
    /// All declared text fields, in dataset column order.
    pub const ALL: [TextField; 10] = [
        TextField::SupplierName,
        TextField::SupplierType,
        TextField::RiskLevel,
        TextField::ComplianceIssues,
        TextField::KeyTerms,
        TextField::PastPerformance,
        TextField::NegotiateRecommendation,
        TextField::SupplyChainDisruption,
        TextField::QualityMetrics,
        TextField::CostMetrics,
    ];

    /// The dataset column name for this field.
    pub fn column(self) -> &'static str {
        match self {
            TextField::SupplierName => "supplier_name",
            TextField::SupplierType => "supplier_type",
            TextField::RiskLevel => "risk_level",
            TextField::ComplianceIssues => "compliance_issues",
            TextField::KeyTerms => "key_terms",
            TextField::PastPerformance => "past_performance",
            TextField::NegotiateRecommendation => "negotiate_recommendation",
            TextField::SupplyChainDisruption => "supply_chain_disruption",
            TextField::QualityMetrics => "quality_metrics",
            TextField::CostMetrics => "cost_metrics",
        }
    }

    /// The human-readable label used when rendering a record into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            TextField::SupplierName => "Supplier_Name",
            TextField::SupplierType => "Supplier_Type",
            TextField::RiskLevel => "Risk_Level",
            TextField::ComplianceIssues => "Compliance_Issues",
            TextField::KeyTerms => "Key_Terms",
            TextField::PastPerformance => "Past_Performance",
            TextField::NegotiateRecommendation => "Negotiate_Recommendation",
            TextField::SupplyChainDisruption => "Supply_Chain_Disruption",
            TextField::QualityMetrics => "Quality_Metrics",
            TextField::CostMetrics => "Cost_Metrics",
        }
    }

    /// Look up a field by its dataset column name.
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == column)
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One supplier-contract entry.
///
/// Declared text fields are always present; a null cell in the source row
/// is stored as an empty string. Every other column is carried through
/// untouched in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierRecord {
    /// Unique identifier, taken from the keyword column.
    pub id: String,
    pub supplier_name: String,
    pub supplier_type: String,
    pub risk_level: String,
    pub compliance_issues: String,
    pub key_terms: String,
    pub past_performance: String,
    pub negotiate_recommendation: String,
    pub supply_chain_disruption: String,
    pub quality_metrics: String,
    pub cost_metrics: String,
    /// Columns that are neither the identifier nor a declared text field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Option<String>>,
}

impl SupplierRecord {
    /// Return the normalised value of a declared text field.
    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::SupplierName => &self.supplier_name,
            TextField::SupplierType => &self.supplier_type,
            TextField::RiskLevel => &self.risk_level,
            TextField::ComplianceIssues => &self.compliance_issues,
            TextField::KeyTerms => &self.key_terms,
            TextField::PastPerformance => &self.past_performance,
            TextField::NegotiateRecommendation => &self.negotiate_recommendation,
            TextField::SupplyChainDisruption => &self.supply_chain_disruption,
            TextField::QualityMetrics => &self.quality_metrics,
            TextField::CostMetrics => &self.cost_metrics,
        }
    }

    fn field_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::SupplierName => &mut self.supplier_name,
            TextField::SupplierType => &mut self.supplier_type,
            TextField::RiskLevel => &mut self.risk_level,
            TextField::ComplianceIssues => &mut self.compliance_issues,
            TextField::KeyTerms => &mut self.key_terms,
            TextField::PastPerformance => &mut self.past_performance,
            TextField::NegotiateRecommendation => &mut self.negotiate_recommendation,
            TextField::SupplyChainDisruption => &mut self.supply_chain_disruption,
            TextField::QualityMetrics => &mut self.quality_metrics,
            TextField::CostMetrics => &mut self.cost_metrics,
        }
    }

    /// Look up any column by name: the identifier, a declared text field,
    /// or a pass-through column. Null pass-through cells read as `""`.
    pub fn column(&self, name: &str) -> Option<&str> {
        if let Some(field) = TextField::from_column(name) {
            return Some(self.field(field));
        }
        self.extra.get(name).map(|value| value.as_deref().unwrap_or(""))
    }

    /// Build a record from a raw row, normalising every declared text field.
    ///
    /// The caller has already checked that the declared columns exist and
    /// extracted the identifier.
    pub(crate) fn from_row(id: String, keyword_field: &str, row: &RawRow) -> Self {
        let mut record = SupplierRecord {
            id,
            supplier_name: String::new(),
            supplier_type: String::new(),
            risk_level: String::new(),
            compliance_issues: String::new(),
            key_terms: String::new(),
            past_performance: String::new(),
            negotiate_recommendation: String::new(),
            supply_chain_disruption: String::new(),
            quality_metrics: String::new(),
            cost_metrics: String::new(),
            extra: BTreeMap::new(),
        };

        for (column, value) in row {
            if column == keyword_field {
                continue;
            }
            match TextField::from_column(column) {
                Some(field) => *record.field_mut(field) = normalize(value.as_deref()),
                None => {
                    record.extra.insert(column.clone(), value.clone());
                }
            }
        }
        record
    }
}

/// Coerce a cell to the string form the index ranks over.
pub(crate) fn normalize(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}
