//! Scripted in-memory browser used by unit tests
//!
//! Emulates just enough of the Swag Labs storefront for the built-in suite:
//! a login form, an inventory page with one add-to-cart button and a cart.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::driver::capabilities::Capabilities;
use crate::driver::traits::{BrowserDriver, BrowserSession, ElementRef, Locator};
use crate::error::SessionError;

pub const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Blank,
    Login,
    Inventory,
    Cart,
}

/// Knobs and counters shared between a fake driver and its sessions
#[derive(Debug)]
pub struct FakeState {
    pub reachable: bool,
    pub screenshot_fails: bool,
    pub acquire_panics: bool,
    pub screenshot_panics: bool,
    pub close_panics: bool,
    /// Text shown for the cart item instead of what was actually added
    pub mislabel_cart: Option<String>,
    pub acquired: usize,
    pub closed: usize,
    pub screenshots: usize,
    /// Every command issued, in order
    pub journal: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            reachable: true,
            screenshot_fails: false,
            acquire_panics: false,
            screenshot_panics: false,
            close_panics: false,
            mislabel_cart: None,
            acquired: 0,
            closed: 0,
            screenshots: 0,
            journal: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let browser = Self::new();
        browser.state().reachable = false;
        browser
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn acquire(
        &self,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BrowserSession>, SessionError> {
        // Flags are read without holding the lock so a panic does not poison it
        let panics = self.state().acquire_panics;
        if panics {
            panic!("driver crashed while creating a session");
        }
        let mut state = self.state();
        if !state.reachable {
            return Err(SessionError::Unreachable {
                endpoint: capabilities.endpoint.clone(),
                reason: "connection refused".into(),
            });
        }
        state.acquired += 1;
        state.journal.push(format!("acquire {}", capabilities.browser.w3c_name()));
        Ok(Arc::new(FakeSession {
            id: format!("fake-{}", state.acquired),
            capabilities: capabilities.clone(),
            shared: self.state.clone(),
            page: Mutex::new(PageState::default()),
        }))
    }
}

#[derive(Debug)]
struct PageState {
    page: Page,
    username: String,
    password: String,
    error: Option<String>,
    cart: Vec<String>,
    closed: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: Page::Blank,
            username: String::new(),
            password: String::new(),
            error: None,
            cart: Vec::new(),
            closed: false,
        }
    }
}

pub struct FakeSession {
    id: String,
    capabilities: Capabilities,
    shared: Arc<Mutex<FakeState>>,
    page: Mutex<PageState>,
}

impl FakeSession {
    fn record(&self, entry: String) {
        self.shared.lock().unwrap().journal.push(entry);
    }

    fn live(&self) -> Result<MutexGuard<'_, PageState>, SessionError> {
        let page = self.page.lock().unwrap();
        if page.closed {
            return Err(SessionError::Invalid(format!("session {} was closed", self.id)));
        }
        Ok(page)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.record(format!("navigate {}", url));
        let mut page = self.live()?;
        page.page = Page::Login;
        page.username.clear();
        page.password.clear();
        page.error = None;
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, SessionError> {
        self.record(format!("find {}", locator));
        let page = self.live()?;
        let name = match (page.page, locator) {
            (Page::Login, Locator::Id(id))
                if id == "user-name" || id == "password" || id == "login-button" =>
            {
                id.as_str()
            }
            (Page::Login, Locator::Css(css))
                if css == "h3[data-test='error']" && page.error.is_some() =>
            {
                "error"
            }
            (Page::Inventory, Locator::Id(id)) if id == "add-to-cart-sauce-labs-backpack" => {
                "add-backpack"
            }
            (Page::Inventory | Page::Cart, Locator::ClassName(class))
                if class == "shopping_cart_link" =>
            {
                "cart-link"
            }
            (Page::Cart, Locator::ClassName(class))
                if class == "inventory_item_name" && !page.cart.is_empty() =>
            {
                "cart-item"
            }
            _ => return Err(SessionError::NoSuchElement(locator.to_string())),
        };
        Ok(ElementRef(name.to_string()))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), SessionError> {
        self.record(format!("click {}", element.0));
        let mut page = self.live()?;
        match element.0.as_str() {
            "login-button" => {
                if page.username == "standard_user" && page.password == "secret_sauce" {
                    page.page = Page::Inventory;
                } else if page.username == "locked_out_user" && page.password == "secret_sauce" {
                    page.error =
                        Some("Epic sadface: Sorry, this user has been locked out.".to_string());
                } else {
                    page.error = Some(
                        "Epic sadface: Username and password do not match any user in this service"
                            .to_string(),
                    );
                }
            }
            "add-backpack" => page.cart.push("Sauce Labs Backpack".to_string()),
            "cart-link" => page.page = Page::Cart,
            _ => {}
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.record(format!("type {} {}", element.0, text));
        let mut page = self.live()?;
        match element.0.as_str() {
            "user-name" => page.username.push_str(text),
            "password" => page.password.push_str(text),
            other => {
                return Err(SessionError::Command {
                    error: "element not interactable".into(),
                    message: format!("{} does not accept text", other),
                })
            }
        }
        Ok(())
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String, SessionError> {
        self.record(format!("text {}", element.0));
        let page = self.live()?;
        let text = match element.0.as_str() {
            "error" => page.error.clone().unwrap_or_default(),
            "cart-item" => {
                let mislabel = self.shared.lock().unwrap().mislabel_cart.clone();
                mislabel.unwrap_or_else(|| page.cart[0].clone())
            }
            "login-button" => "Login".to_string(),
            _ => String::new(),
        };
        Ok(text)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.record("screenshot".to_string());
        drop(self.live()?);
        let panics = self.shared.lock().unwrap().screenshot_panics;
        if panics {
            panic!("screenshot buffer overflow");
        }
        let mut shared = self.shared.lock().unwrap();
        if shared.screenshot_fails {
            return Err(SessionError::Command {
                error: "unable to capture screen".into(),
                message: "screenshot disabled".into(),
            });
        }
        shared.screenshots += 1;
        Ok(PNG_BYTES.to_vec())
    }

    async fn maximize_window(&self) -> Result<(), SessionError> {
        self.record("maximize".to_string());
        drop(self.live()?);
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        let panics = self.shared.lock().unwrap().close_panics;
        if panics {
            panic!("driver crashed while closing the session");
        }
        let mut page = self.page.lock().unwrap();
        if page.closed {
            return Ok(());
        }
        page.closed = true;
        drop(page);
        let mut shared = self.shared.lock().unwrap();
        shared.closed += 1;
        shared.journal.push("close".to_string());
        Ok(())
    }
}
