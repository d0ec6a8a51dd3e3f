/// Name of the cookie holding the visitor's consent decision.
pub const COOKIE_NAME: &str = "gtm_consent";

/// Lifetime of the consent cookie, counted from the last decision.
pub const COOKIE_EXPIRY_DAYS: u32 = 365;
