use time::OffsetDateTime;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CustomerStatus {
    Active,
    Inactive,
}

text_enum!(CustomerStatus, "customer status", {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Customer {
    pub id: Uuid,
    pub account_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CustomerStatus,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct NewCustomer {
    pub account_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_customer_status"))]
    pub status: CustomerStatus,
}

#[cfg(feature = "serde")]
fn default_customer_status() -> CustomerStatus {
    CustomerStatus::Active
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct CustomerUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<CustomerStatus>,
}

impl CustomerUpdate {
    pub fn apply(&self, customer: &mut Customer) {
        if let Some(v) = &self.full_name {
            customer.full_name = v.clone();
        }
        if let Some(v) = &self.email {
            customer.email = Some(v.clone());
        }
        if let Some(v) = &self.phone {
            customer.phone = Some(v.clone());
        }
        if let Some(v) = &self.address {
            customer.address = Some(v.clone());
        }
        if let Some(v) = self.status {
            customer.status = v;
        }
    }
}

/// Rows that go away with a customer when it is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct CustomerDependents {
    pub meters: i64,
    pub bills: i64,
}

impl CustomerDependents {
    pub fn is_empty(&self) -> bool {
        self.meters == 0 && self.bills == 0
    }
}
