use serde::{Deserialize, Serialize};

/// Kinds of prepaid compute commitment we audit.
///
/// Each kind has its own listing and usage endpoints; see
/// [`crate::billing::BillingClients`] for the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
pub enum CommitmentType {
    #[serde(rename = "Reserved Instance")]
    #[value(name = "ri", alias = "reserved-instance")]
    ReservedInstance,
    #[serde(rename = "Savings Plan")]
    #[value(name = "sp", alias = "savings-plan")]
    SavingsPlan,
}

impl CommitmentType {
    /// Every supported kind, in report order.
    pub const ALL: [CommitmentType; 2] = [CommitmentType::ReservedInstance, CommitmentType::SavingsPlan];

    /// Label used in the report `type` column.
    pub fn label(&self) -> &'static str {
        match self {
            CommitmentType::ReservedInstance => "Reserved Instance",
            CommitmentType::SavingsPlan => "Savings Plan",
        }
    }

    /// Fixed follow-up text attached to every finding of this kind.
    pub fn recommendation(&self) -> &'static str {
        match self {
            CommitmentType::ReservedInstance => "Consider SKU change, reassignment, or exchange",
            CommitmentType::SavingsPlan => "Investigate workloads; consider changes",
        }
    }
}

impl std::fmt::Display for CommitmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for CommitmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', ' '], "-").as_str() {
            "ri" | "reserved-instance" | "reservation" => Ok(CommitmentType::ReservedInstance),
            "sp" | "savings-plan" => Ok(CommitmentType::SavingsPlan),
            _ => Err(format!("unknown commitment type: {}", s)),
        }
    }
}

/// A reservation order or savings plan order as listed by the billing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    /// ARM resource ID, e.g. `/providers/Microsoft.Capacity/reservationOrders/{guid}`
    pub id: String,
    /// Display name, falling back to the resource name
    pub name: String,
    pub kind: CommitmentType,
    /// Billing boundary: a subscription, resource group, or `Shared`
    pub scope: String,
    /// Order identifier the usage endpoints hang off
    pub order_id: String,
}

/// One utilization sample for a commitment in the current billing period.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    /// 0-100. `None` when the API omitted the field.
    pub utilization: Option<f64>,
    pub scope: String,
}

/// An underutilized commitment destined for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: CommitmentType,
    pub name: String,
    pub utilization: f64,
    pub scope: String,
    pub recommendation: String,
}
