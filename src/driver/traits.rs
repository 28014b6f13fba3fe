use crate::driver::capabilities::Capabilities;
use crate::error::SessionError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Element locator for page elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Select by `id` attribute
    Id(String),
    /// Select by a single CSS class name
    ClassName(String),
    /// Select by CSS selector
    Css(String),
    /// Select by XPath
    XPath(String),
    /// Select an anchor by its exact visible text
    LinkText(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// Translate into a W3C `(using, value)` pair
    ///
    /// W3C WebDriver has no id or class strategies, so both are expressed
    /// as CSS selectors the same way Selenium clients do it.
    pub fn to_w3c(&self) -> (&'static str, String) {
        match self {
            Locator::Id(id) => ("css selector", format!("[id=\"{}\"]", escape_css(id))),
            Locator::ClassName(class) => ("css selector", format!(".{}", escape_css(class))),
            Locator::Css(css) => ("css selector", css.clone()),
            Locator::XPath(xpath) => ("xpath", xpath.clone()),
            Locator::LinkText(text) => ("link text", text.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "By.id: {}", v),
            Locator::ClassName(v) => write!(f, "By.className: {}", v),
            Locator::Css(v) => write!(f, "By.cssSelector: {}", v),
            Locator::XPath(v) => write!(f, "By.xpath: {}", v),
            Locator::LinkText(v) => write!(f, "By.linkText: {}", v),
        }
    }
}

fn escape_css(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Opaque reference to an element inside one browser session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// One exclusive remote browser context
///
/// Implementations serialize their own commands; the runner never issues
/// two commands against the same session concurrently.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Session identifier assigned by the remote end
    fn session_id(&self) -> &str;

    /// Capabilities the session was requested with
    fn capabilities(&self) -> &Capabilities;

    /// Navigate the current top-level browsing context
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Find the first element matching a locator
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, SessionError>;

    async fn click(&self, element: &ElementRef) -> Result<(), SessionError>;

    /// Type text into an element
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), SessionError>;

    /// Rendered text of an element
    async fn element_text(&self, element: &ElementRef) -> Result<String, SessionError>;

    /// Capture the current viewport as PNG bytes
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    async fn maximize_window(&self) -> Result<(), SessionError> {
        Ok(())
    }

    /// End the remote session
    async fn close(&self) -> Result<(), SessionError>;
}

/// Factory for browser sessions
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Establish a new session for the given capability set
    async fn acquire(
        &self,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BrowserSession>, SessionError>;
}

/// Element handle borrowed from an active session
pub struct Element<'a> {
    session: &'a dyn BrowserSession,
    element: ElementRef,
    locator: Locator,
}

impl<'a> Element<'a> {
    /// Locate an element in the given session
    pub async fn locate(
        session: &'a dyn BrowserSession,
        locator: Locator,
    ) -> Result<Element<'a>, SessionError> {
        let element = session.find_element(&locator).await?;
        log::debug!("Located {} as {}", locator, element.0);
        Ok(Self {
            session,
            element,
            locator,
        })
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub async fn click(&self) -> Result<(), SessionError> {
        self.session.click(&self.element).await
    }

    pub async fn type_text(&self, text: &str) -> Result<(), SessionError> {
        self.session.send_keys(&self.element, text).await
    }

    pub async fn text(&self) -> Result<String, SessionError> {
        self.session.element_text(&self.element).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_w3c_mapping() {
        assert_eq!(
            Locator::id("user-name").to_w3c(),
            ("css selector", "[id=\"user-name\"]".to_string())
        );
        assert_eq!(
            Locator::class_name("shopping_cart_link").to_w3c(),
            ("css selector", ".shopping_cart_link".to_string())
        );
        assert_eq!(
            Locator::css("h3[data-test='error']").to_w3c(),
            ("css selector", "h3[data-test='error']".to_string())
        );
        assert_eq!(Locator::xpath("//a").to_w3c().0, "xpath");
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::id("password").to_string(), "By.id: password");
        assert_eq!(
            Locator::LinkText("Logout".into()).to_string(),
            "By.linkText: Logout"
        );
    }

    #[test]
    fn test_id_quotes_are_escaped() {
        let (_, value) = Locator::id("we\"ird").to_w3c();
        assert_eq!(value, "[id=\"we\\\"ird\"]");
    }
}
