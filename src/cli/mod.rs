pub mod cases;
pub mod quote;
pub mod setup;
pub mod ui;
