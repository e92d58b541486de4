//! # Pricewatch Alert
//!
//! Turns scraped records into a styled HTML email and delivers it over
//! SMTP. Delivery failures surface as [`pricewatch_core::PricewatchError::Alert`]
//! and are absorbed by the task-runner boundary like any other run failure.

pub mod mailer;
pub mod template;

pub use mailer::AlertMailer;
pub use template::{html_body, render_table};
