// contour-providers/src/ua.rs
// ============================================================================
// Module: User-Agent Parser
// Description: Pattern-table classification of user-agent strings.
// Purpose: Derive OS name and device type for condition evaluation.
// Dependencies: contour-core, regex-lite
// ============================================================================

//! ## Overview
//! The parser classifies user-agent strings with an ordered pattern table:
//! bot signatures first, then tablet, mobile, and desktop signatures, with
//! the OS name derived independently. Unrecognized agents yield `None`
//! fields; parsing never fails.
//!
//! Security posture: user-agent strings are untrusted; patterns are fixed at
//! construction and matching is bounded by the input length.

// ============================================================================
// SECTION: Imports
// ============================================================================

use contour_core::ParsedUserAgent;
use contour_core::UserAgentParser;
use regex_lite::Regex;

// ============================================================================
// SECTION: Pattern Tables
// ============================================================================

/// Ordered OS signatures, first match wins.
const OS_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\b(iphone|ipad|ipod|ios)\b", "iOS"),
    (r"(?i)\bandroid\b", "Android"),
    (r"(?i)\bwindows\b", "Windows"),
    (r"(?i)\b(macintosh|mac os x|macos)\b", "macOS"),
    (r"(?i)\b(linux|x11)\b", "Linux"),
];

/// Bot signatures checked before device classification.
const BOT_PATTERN: &str = r"(?i)(bot|crawler|spider|slurp|curl|wget)\b";
/// Tablet signatures.
const TABLET_PATTERN: &str = r"(?i)\b(ipad|tablet|kindle|silk)\b";
/// Mobile signatures.
const MOBILE_PATTERN: &str = r"(?i)\b(iphone|ipod|mobile|phone)\b";
/// Desktop signatures.
const DESKTOP_PATTERN: &str = r"(?i)\b(windows|macintosh|linux|x11|cros)\b";

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Pattern-table user-agent parser.
pub struct PatternUserAgentParser {
    /// Compiled OS signatures paired with their OS names.
    os_patterns: Vec<(Regex, &'static str)>,
    /// Compiled bot signature.
    bot: Option<Regex>,
    /// Compiled tablet signature.
    tablet: Option<Regex>,
    /// Compiled mobile signature.
    mobile: Option<Regex>,
    /// Compiled desktop signature.
    desktop: Option<Regex>,
}

impl PatternUserAgentParser {
    /// Builds the parser, compiling the fixed pattern tables.
    #[must_use]
    pub fn new() -> Self {
        let os_patterns = OS_PATTERNS
            .iter()
            .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|regex| (regex, *name)))
            .collect();
        Self {
            os_patterns,
            bot: Regex::new(BOT_PATTERN).ok(),
            tablet: Regex::new(TABLET_PATTERN).ok(),
            mobile: Regex::new(MOBILE_PATTERN).ok(),
            desktop: Regex::new(DESKTOP_PATTERN).ok(),
        }
    }

    /// Classifies the device type for a user-agent string.
    fn device_type(&self, user_agent: &str) -> Option<&'static str> {
        let matches = |pattern: &Option<Regex>| {
            pattern.as_ref().is_some_and(|regex| regex.is_match(user_agent))
        };
        if matches(&self.bot) {
            return Some("bot");
        }
        if matches(&self.tablet) {
            return Some("tablet");
        }
        if matches(&self.mobile) {
            return Some("mobile");
        }
        // Android without a mobile marker is conventionally a tablet.
        if user_agent.to_ascii_lowercase().contains("android") {
            return Some("tablet");
        }
        if matches(&self.desktop) {
            return Some("desktop");
        }
        None
    }
}

impl Default for PatternUserAgentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentParser for PatternUserAgentParser {
    fn parse(&self, user_agent: &str) -> ParsedUserAgent {
        let os_name = self
            .os_patterns
            .iter()
            .find(|(regex, _)| regex.is_match(user_agent))
            .map(|(_, name)| (*name).to_string());
        let device_type = self.device_type(user_agent).map(str::to_string);
        ParsedUserAgent {
            os_name,
            device_type,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
