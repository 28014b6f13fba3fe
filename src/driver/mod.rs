pub mod capabilities;
#[cfg(test)]
pub mod fake;
pub mod traits;
pub mod webdriver;

use colored::Colorize;

pub use capabilities::{BrowserKind, Capabilities};
pub use traits::{BrowserDriver, BrowserSession, Element, ElementRef, Locator};
pub use webdriver::RemoteWebDriver;

/// Print the browser identifiers with a known capability mapping
pub fn list_browsers() {
    println!("{}", "Known browser identifiers:".bold());
    for name in BrowserKind::KNOWN {
        let kind = name
            .parse::<BrowserKind>()
            .unwrap_or_else(|never| match never {});
        println!("  {:<8} -> browserName \"{}\"", name.cyan(), kind.w3c_name());
    }
    println!(
        "  {}",
        "Any other identifier is sent to the remote end verbatim".dimmed()
    );
}
