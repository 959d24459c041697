//! Payment Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::{domain::orders::models::OrderUuid, uuids::TypedUuid};

/// Payment UUID
pub type PaymentUuid = TypedUuid<Payment>;

/// Payment method accepted at checkout.
///
/// Closed enumeration: an unrecognized method string fails fast, before any
/// order exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    Wallet,
    BankTransfer,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::BankTransfer => "bank-transfer",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized payment method")]
pub struct UnknownPaymentMethod;

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "card" => Ok(Self::Card),
            "wallet" => Ok(Self::Wallet),
            "bank-transfer" => Ok(Self::BankTransfer),
            _ => Err(UnknownPaymentMethod),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized payment status")]
pub struct UnknownPaymentStatus;

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownPaymentStatus),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment Model
#[derive(Debug, Clone)]
pub struct Payment {
    pub uuid: PaymentUuid,
    pub order_uuid: OrderUuid,
    pub amount: u64,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub paid_at: Timestamp,
    pub created_at: Timestamp,
}

/// New Payment Model
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub uuid: PaymentUuid,
    pub order_uuid: OrderUuid,
    pub amount: u64,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub paid_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_round_trips_through_strings() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::Wallet,
            PaymentMethod::BankTransfer,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>(), Ok(method));
        }
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        assert_eq!(
            "carrier-pigeon".parse::<PaymentMethod>(),
            Err(UnknownPaymentMethod)
        );
    }
}
