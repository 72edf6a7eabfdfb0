// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// A message whose From header mentions the organization's own domain is
    /// treated as outbound and skips content classification. The match is a
    /// case-insensitive substring test over the whole header value, so it
    /// covers both `user@domain` and `"Name" <user@domain>` forms.
    pub fn of(sender: &str, org_domain: &str) -> Self {
        if sender.to_lowercase().contains(&org_domain.to_lowercase()) {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }
}
