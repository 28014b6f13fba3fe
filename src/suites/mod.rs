pub mod swag_labs;

use colored::Colorize;

use crate::runner::TestClass;

/// Every built-in test class
pub fn all() -> Vec<TestClass> {
    vec![swag_labs::class()]
}

/// Print the built-in classes and their tests in execution order
pub fn list() {
    for class in all() {
        println!("{}", class.name().bold());
        for case in class.cases() {
            println!("  {:<28} {}", case.name().cyan(), case.title().dimmed());
        }
    }
}
