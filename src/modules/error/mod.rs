// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MailbotError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type MailbotResult<T, E = MailbotError> = std::result::Result<T, E>;

impl MailbotError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailbotError::Generic { code, .. } => *code,
        }
    }
}
