//! Device OS classification.
//!
//! Inventory `os_type` strings are free-form ("IOS", "cisco ios-xe",
//! "Arista EOS 4.30"). Normalization maps them onto a small set of OS
//! families that drive command vocabulary, username tables, and parser
//! dispatch. Unrecognized values are carried through, never rejected.

use std::fmt;

/// Known device OS families plus a catch-all for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceOs {
    CiscoIos,
    AristaEos,
    JuniperJunos,
    SonicCli,
    /// Unrecognized OS string, kept lowercased for display and lookups.
    Other(String),
}

/// Normalization table, checked in order. First match wins, so IOS is
/// probed before EOS ("CISCO IOS" must not fall through to a shorter key).
const OS_KEYS: [(&str, DeviceOsTag); 4] = [
    ("IOS", DeviceOsTag::CiscoIos),
    ("EOS", DeviceOsTag::AristaEos),
    ("JUNOS", DeviceOsTag::JuniperJunos),
    ("SONIC", DeviceOsTag::SonicCli),
];

#[derive(Clone, Copy)]
enum DeviceOsTag {
    CiscoIos,
    AristaEos,
    JuniperJunos,
    SonicCli,
}

impl DeviceOs {
    /// Map a raw inventory OS string to an OS family.
    ///
    /// Matching is case-insensitive: an exact key match first, then a
    /// substring match in either direction. Anything else becomes
    /// `Other` with the lowercased raw value; an empty string becomes
    /// `Other("unknown")`. Total and deterministic.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Other("unknown".to_string());
        }

        let upper = trimmed.to_uppercase();
        for (key, tag) in OS_KEYS {
            if upper == key {
                return tag.into();
            }
        }
        for (key, tag) in OS_KEYS {
            if upper.contains(key) || key.contains(upper.as_str()) {
                return tag.into();
            }
        }

        Self::Other(trimmed.to_lowercase())
    }

    /// Canonical tag used for command tables, username tables and logs.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::CiscoIos => "cisco_ios",
            Self::AristaEos => "arista_eos",
            Self::JuniperJunos => "juniper_junos",
            Self::SonicCli => "sonic_cli",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the Cisco-specific username extras apply. Matches on the
    /// tag so carried-through values like "cisco_nxos" also qualify.
    #[must_use]
    pub fn is_cisco_family(&self) -> bool {
        self.tag().contains("cisco")
    }
}

impl From<DeviceOsTag> for DeviceOs {
    fn from(tag: DeviceOsTag) -> Self {
        match tag {
            DeviceOsTag::CiscoIos => Self::CiscoIos,
            DeviceOsTag::AristaEos => Self::AristaEos,
            DeviceOsTag::JuniperJunos => Self::JuniperJunos,
            DeviceOsTag::SonicCli => Self::SonicCli,
        }
    }
}

impl fmt::Display for DeviceOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
