//! Login and cart checks against the Swag Labs demo storefront

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::assertion::{assert_contains, assert_equals};
use crate::driver::Locator;
use crate::runner::{TestCase, TestClass, TestContext};

pub const CLASS_NAME: &str = "SwagLabsTest";

const BACKPACK: &str = "Sauce Labs Backpack";

pub fn class() -> TestClass {
    TestClass::new(CLASS_NAME)
        .with_case(ValidLoginAndAddToCart)
        .with_case(InvalidLogin)
}

/// Fill in the login form and submit it
async fn login(ctx: &TestContext, username: &str, password: &str) -> Result<()> {
    ctx.find(Locator::id("user-name"))
        .await?
        .type_text(username)
        .await?;
    ctx.find(Locator::id("password"))
        .await?
        .type_text(password)
        .await?;
    ctx.find(Locator::id("login-button")).await?.click().await?;
    Ok(())
}

pub struct ValidLoginAndAddToCart;

#[async_trait]
impl TestCase for ValidLoginAndAddToCart {
    fn name(&self) -> &str {
        "testValidLoginAndAddToCart"
    }

    fn title(&self) -> &str {
        "Valid Login & Add to Cart Test"
    }

    fn priority(&self) -> i32 {
        1
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        ctx.open("").await.context("Failed to open login page")?;
        login(ctx, "standard_user", "secret_sauce")
            .await
            .context("Failed to log in")?;
        ctx.info("Logged in as standard_user");

        ctx.find(Locator::id("add-to-cart-sauce-labs-backpack"))
            .await?
            .click()
            .await?;
        ctx.find(Locator::class_name("shopping_cart_link"))
            .await?
            .click()
            .await?;

        let item = ctx
            .find(Locator::class_name("inventory_item_name"))
            .await?
            .text()
            .await?;
        assert_equals(item.as_str(), BACKPACK, "")?;

        ctx.pass("Valid login and cart verification passed ✅");
        Ok(())
    }
}

pub struct InvalidLogin;

#[async_trait]
impl TestCase for InvalidLogin {
    fn name(&self) -> &str {
        "testInvalidLogin"
    }

    fn title(&self) -> &str {
        "Invalid Login Test"
    }

    fn priority(&self) -> i32 {
        2
    }

    async fn run(&self, ctx: &TestContext) -> Result<()> {
        ctx.open("").await.context("Failed to open login page")?;
        login(ctx, "locked_out_user", "wrong_password")
            .await
            .context("Failed to submit login form")?;

        let error = ctx
            .find(Locator::css("h3[data-test='error']"))
            .await?
            .text()
            .await?;
        assert_contains(&error, "Epic sadface", "")?;

        ctx.pass("Invalid login displayed error correctly ❌");
        Ok(())
    }
}
