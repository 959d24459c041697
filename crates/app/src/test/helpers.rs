//! Test Helpers

use checkout::discounts::DiscountWindow;
use jiff::{Timestamp, ToSpan};
use rust_decimal::Decimal;

use crate::{
    domain::{
        addresses::{
            AddressesServiceError,
            models::{Address, AddressUuid, NewAddress},
        },
        products::{
            ProductsServiceError,
            models::{NewProduct, Product, ProductUpdate, ProductUuid},
        },
        users::models::UserUuid,
    },
    test::TestContext,
};

use crate::domain::{addresses::AddressesService, products::ProductsService};

pub(crate) async fn create_product(
    ctx: &TestContext,
    name: &str,
    price: u64,
    stock: u64,
) -> Result<Product, ProductsServiceError> {
    ctx.products
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: name.to_string(),
            price,
            stock_quantity: stock,
            discount: None,
        })
        .await
}

/// A product whose discount window is active right now.
pub(crate) async fn create_discounted_product(
    ctx: &TestContext,
    name: &str,
    price: u64,
    stock: u64,
    percent: u32,
) -> Result<Product, ProductsServiceError> {
    let now = Timestamp::now();

    ctx.products
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: name.to_string(),
            price,
            stock_quantity: stock,
            discount: Some(DiscountWindow::new(
                Decimal::from(percent),
                now - 1.hour(),
                now + 1.hour(),
            )),
        })
        .await
}

/// Change only the catalog price, keeping name and discount as they are.
pub(crate) async fn set_price(
    ctx: &TestContext,
    product: ProductUuid,
    price: u64,
) -> Result<Product, ProductsServiceError> {
    let current = ctx.products.get_product(product).await?;

    ctx.products
        .update_product(
            product,
            ProductUpdate {
                name: current.name,
                price,
                discount: current.discount,
            },
        )
        .await
}

pub(crate) async fn create_address(
    ctx: &TestContext,
    user: UserUuid,
) -> Result<Address, AddressesServiceError> {
    ctx.addresses
        .create_address(
            user,
            NewAddress {
                uuid: AddressUuid::new(),
                recipient: "Test Recipient".to_string(),
                line1: "1 Example Street".to_string(),
                line2: None,
                city: "Exampleton".to_string(),
                postal_code: "EX1 2MP".to_string(),
                country: "GB".to_string(),
            },
        )
        .await
}
