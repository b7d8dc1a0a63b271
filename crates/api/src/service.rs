//! Shared request validation: framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: parse with these, then call the store.

use tethered_core::{InteractionKind, UserRole};

use crate::ServiceError;

/// Default and maximum page size for interaction listings.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Validate and normalize a display name. Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() || trimmed.chars().count() > 64 {
        return Err(ServiceError::BadRequest("name must be 1-64 characters".into()));
    }
    Ok(trimmed)
}

pub fn parse_role(raw: &str) -> Result<UserRole, ServiceError> {
    UserRole::parse(raw.trim()).ok_or_else(|| {
        ServiceError::BadRequest("role must be \"student\" or \"parent\"".into())
    })
}

pub fn parse_interaction_kind(raw: &str) -> Result<InteractionKind, ServiceError> {
    InteractionKind::parse(raw.trim()).ok_or_else(|| {
        ServiceError::BadRequest(
            "kind must be one of \"check_in\", \"reply\", \"prompt_answer\"".into(),
        )
    })
}

/// Validate an avatar URL: http(s) only, bounded length. Empty clears it.
pub fn validate_avatar_url(raw: &str) -> Result<Option<String>, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > 2048 || !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ServiceError::BadRequest("avatar_url must be an http(s) URL".into()));
    }
    Ok(Some(trimmed.to_string()))
}

pub fn clamp_list_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Mina").is_ok());
        assert_eq!(validate_name("  Jun  ").unwrap(), "Jun");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(65)).is_err());
        assert!(validate_name(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_parse_role_and_kind() {
        assert_eq!(parse_role("parent").unwrap(), UserRole::Parent);
        assert!(parse_role("teacher").is_err());
        assert_eq!(
            parse_interaction_kind(" prompt_answer ").unwrap(),
            InteractionKind::PromptAnswer
        );
        assert!(parse_interaction_kind("like").is_err());
    }

    #[test]
    fn test_validate_avatar_url() {
        assert_eq!(validate_avatar_url("").unwrap(), None);
        assert_eq!(
            validate_avatar_url(" https://cdn.example/a.png ").unwrap().as_deref(),
            Some("https://cdn.example/a.png")
        );
        assert!(validate_avatar_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_clamp_list_limit() {
        assert_eq!(clamp_list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_list_limit(Some(0)), 1);
        assert_eq!(clamp_list_limit(Some(1000)), MAX_LIST_LIMIT);
    }
}
