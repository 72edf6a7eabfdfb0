// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod archive;
pub mod direction;
pub mod normalize;
pub mod orchestrate;
pub mod report;
pub mod retention;

#[cfg(test)]
mod tests;
