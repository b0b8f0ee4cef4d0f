use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MeterStatus {
    Active,
    Inactive,
    Faulty,
}

text_enum!(MeterStatus, "meter status", {
    Active => "active",
    Inactive => "inactive",
    Faulty => "faulty",
});

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Meter {
    pub id: Uuid,
    pub meter_number: String,
    pub customer_id: Uuid,
    pub location: Option<String>,
    pub installation_date: Option<Date>,
    #[sqlx(try_from = "String")]
    pub status: MeterStatus,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

/// Meter row joined with its owner, as listed on the meters screen.
#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeterWithCustomer {
    #[sqlx(flatten)]
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub meter: Meter,
    pub customer_name: String,
    pub account_number: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct NewMeter {
    pub meter_number: String,
    pub customer_id: Uuid,
    pub location: Option<String>,
    pub installation_date: Option<Date>,
    #[cfg_attr(feature = "serde", serde(default = "default_meter_status"))]
    pub status: MeterStatus,
}

#[cfg(feature = "serde")]
fn default_meter_status() -> MeterStatus {
    MeterStatus::Active
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct MeterUpdate {
    pub location: Option<String>,
    pub installation_date: Option<Date>,
    pub status: Option<MeterStatus>,
}

impl MeterUpdate {
    pub fn apply(&self, meter: &mut Meter) {
        if let Some(v) = &self.location {
            meter.location = Some(v.clone());
        }
        if let Some(v) = self.installation_date {
            meter.installation_date = Some(v);
        }
        if let Some(v) = self.status {
            meter.status = v;
        }
    }
}
