/// A status/role/method string that does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Text-backed enum plumbing shared by every status column.
///
/// Generates `as_str`, `FromStr`, `TryFrom<String>` and `Display` from a
/// list of `Variant => "text"` pairs.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::domain::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::domain::UnknownVariant;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod activity;
pub mod bill;
pub mod customer;
pub mod dashboard;
pub mod meter;
pub mod meter_reading;
pub mod payment;
pub mod user;

pub use activity::{ActivityEntry, NewActivity};
pub use bill::{Bill, BillStatus, BillWithCustomer, NewBill};
pub use customer::{Customer, CustomerDependents, CustomerStatus, CustomerUpdate, NewCustomer};
pub use dashboard::{DashboardStats, MonthlyRevenue};
pub use meter::{Meter, MeterStatus, MeterUpdate, MeterWithCustomer, NewMeter};
pub use meter_reading::{MeterReading, NewReading, ReadingWithMeter};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentWithBill};
pub use user::{NewUser, User, UserRole};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_text() {
        for status in BillStatus::ALL {
            assert_eq!(status.as_str().parse::<BillStatus>().unwrap(), *status);
        }
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::try_from(method.to_string()).unwrap(), *method);
        }
    }

    #[test]
    fn unknown_text_names_the_column_kind() {
        let err = "archived".parse::<MeterStatus>().unwrap_err();
        assert_eq!(err.kind, "meter status");
        assert_eq!(err.to_string(), "unknown meter status 'archived'");
    }
}
