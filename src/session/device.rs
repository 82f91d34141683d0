use serde::{Deserialize, Serialize};

/// Coarse client category inferred from the user agent at login.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

const TABLET_MARKERS: &[&str] = &["ipad", "tablet"];
const MOBILE_MARKERS: &[&str] = &["iphone", "android", "mobile"];

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "desktop" => Self::Desktop,
            "mobile" => Self::Mobile,
            "tablet" => Self::Tablet,
            _ => Self::Unknown,
        }
    }

    /// Tablet markers win over mobile ones, anything unrecognized is a desktop.
    pub fn classify(user_agent: Option<&str>) -> Self {
        let user_agent = match user_agent.map(str::trim) {
            Some(ua) if !ua.is_empty() => ua.to_lowercase(),
            _ => return Self::Unknown,
        };

        if TABLET_MARKERS.iter().any(|m| user_agent.contains(m)) {
            Self::Tablet
        } else if MOBILE_MARKERS.iter().any(|m| user_agent.contains(m)) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}
