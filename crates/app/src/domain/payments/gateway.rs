//! Payment Gateway
//!
//! Contract for the external payment processor. The real integration lives
//! outside this system; [`SimulatedGateway`] stands in for it and authorizes
//! everything unless explicitly built to decline.

use async_trait::async_trait;
use mockall::automock;
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

use crate::domain::{orders::models::OrderUuid, payments::models::PaymentMethod};

/// Successful authorization issued by the processor.
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    pub transaction_id: String,
}

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("payment declined")]
    Declined,
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize `amount` for the given order. Synchronous request-reply;
    /// a decline is a normal business outcome, not an infrastructure fault.
    async fn authorize(
        &self,
        order: OrderUuid,
        amount: u64,
        method: PaymentMethod,
    ) -> Result<PaymentAuthorization, PaymentGatewayError>;
}

/// Stand-in processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGateway {
    decline_all: bool,
}

impl SimulatedGateway {
    #[must_use]
    pub const fn new() -> Self {
        Self { decline_all: false }
    }

    /// A gateway that declines every authorization, for failure-path tests
    /// and drills.
    #[must_use]
    pub const fn declining() -> Self {
        Self { decline_all: true }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(
        &self,
        _order: OrderUuid,
        _amount: u64,
        _method: PaymentMethod,
    ) -> Result<PaymentAuthorization, PaymentGatewayError> {
        if self.decline_all {
            return Err(PaymentGatewayError::Declined);
        }

        Ok(PaymentAuthorization {
            transaction_id: generate_transaction_id(),
        })
    }
}

fn generate_transaction_id() -> String {
    let mut bytes = [0u8; 12];

    OsRng.fill_bytes(&mut bytes);

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

    format!("txn_{hex}")
}
