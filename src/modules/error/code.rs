// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,
    MissingConfiguration = 10020,
    ExceedsLimitation = 10040,

    // Authentication and authorization errors (20000–20999)
    MissingCredential = 20000,
    CredentialRefreshFailed = 20010,

    // Resource errors (30000–30999)
    ResourceNotFound = 30000,
    AlreadyExists = 30010,

    // Network connection errors (40000–40999)
    NetworkError = 40000,
    HttpResponseError = 40030,

    // Mail source errors (50000–50999)
    MailApiCallFailed = 50000,
    MalformedMessage = 50010,

    // Object store errors (60000–60999)
    ObjectUploadFailed = 60000,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}
