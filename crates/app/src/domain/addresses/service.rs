//! Addresses service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        addresses::{
            errors::AddressesServiceError,
            models::{Address, NewAddress},
            repository::PgAddressesRepository,
        },
        users::models::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgAddressesService {
    db: Db,
    repository: PgAddressesRepository,
}

impl PgAddressesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAddressesRepository::new(),
        }
    }
}

#[async_trait]
impl AddressesService for PgAddressesService {
    async fn create_address(
        &self,
        user: UserUuid,
        address: NewAddress,
    ) -> Result<Address, AddressesServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_address(&mut tx, user, address).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn list_addresses(&self, user: UserUuid) -> Result<Vec<Address>, AddressesServiceError> {
        let mut tx = self.db.begin().await?;

        let addresses = self.repository.list_addresses(&mut tx, user).await?;

        tx.commit().await?;

        Ok(addresses)
    }
}

#[automock]
#[async_trait]
pub trait AddressesService: Send + Sync {
    /// Creates a new delivery address for the given user.
    async fn create_address(
        &self,
        user: UserUuid,
        address: NewAddress,
    ) -> Result<Address, AddressesServiceError>;

    /// Retrieves the user's saved addresses.
    async fn list_addresses(&self, user: UserUuid) -> Result<Vec<Address>, AddressesServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::addresses::models::AddressUuid,
        test::{TestContext, helpers},
    };

    use super::*;

    #[tokio::test]
    async fn create_address_returns_created_row() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = AddressUuid::new();

        let address = ctx
            .addresses
            .create_address(
                ctx.user_uuid,
                NewAddress {
                    uuid,
                    recipient: "Ada Lovelace".to_string(),
                    line1: "12 Analytical Row".to_string(),
                    line2: None,
                    city: "London".to_string(),
                    postal_code: "N1 7AA".to_string(),
                    country: "GB".to_string(),
                },
            )
            .await?;

        assert_eq!(address.uuid, uuid);
        assert_eq!(address.user_uuid, ctx.user_uuid);
        assert_eq!(address.recipient, "Ada Lovelace");
        assert!(address.deleted_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_address_unknown_user_returns_invalid_reference() {
        let ctx = TestContext::new().await;

        let result = ctx
            .addresses
            .create_address(
                UserUuid::new(),
                NewAddress {
                    uuid: AddressUuid::new(),
                    recipient: "Nobody".to_string(),
                    line1: "1 Nowhere".to_string(),
                    line2: None,
                    city: "Nulltown".to_string(),
                    postal_code: "00000".to_string(),
                    country: "GB".to_string(),
                },
            )
            .await;

        assert!(
            matches!(result, Err(AddressesServiceError::InvalidReference)),
            "expected InvalidReference, got {result:?}"
        );
    }

    #[tokio::test]
    async fn list_addresses_returns_only_own_addresses() -> TestResult {
        let ctx = TestContext::new().await;

        let own = helpers::create_address(&ctx, ctx.user_uuid).await?;

        let other_user = ctx.create_user("somebody-else").await;
        helpers::create_address(&ctx, other_user).await?;

        let addresses = ctx.addresses.list_addresses(ctx.user_uuid).await?;

        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses.first().map(|a| a.uuid), Some(own.uuid));

        Ok(())
    }

    #[tokio::test]
    async fn list_addresses_empty_when_none_created() -> TestResult {
        let ctx = TestContext::new().await;

        let addresses = ctx.addresses.list_addresses(ctx.user_uuid).await?;

        assert!(addresses.is_empty());

        Ok(())
    }
}
