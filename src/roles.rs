//! Semantic role flags attached to a classified column.
//!
//! Roles are independent tags stored in a single bitfield. A few pairs are
//! mutually exclusive; [`RoleSet::try_from_roles`] rejects them so callers
//! that build role sets by hand get an error rather than a silent drop.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RoleConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Location,
    City,
    Zip,
    Score,
    Company,
    Status,
    Industry,
    Segment,
    BusinessModel,
    Level,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Location,
        Role::City,
        Role::Zip,
        Role::Score,
        Role::Company,
        Role::Status,
        Role::Industry,
        Role::Segment,
        Role::BusinessModel,
        Role::Level,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Location => "location",
            Role::City => "city",
            Role::Zip => "zip",
            Role::Score => "score",
            Role::Company => "company",
            Role::Status => "status",
            Role::Industry => "industry",
            Role::Segment => "segment",
            Role::BusinessModel => "business_model",
            Role::Level => "level",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role pairs that may not be set on the same column.
const EXCLUSIVE_PAIRS: &[(Role, Role)] = &[(Role::Location, Role::Status), (Role::Score, Role::Level)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u16);

impl RoleSet {
    pub const fn empty() -> Self {
        RoleSet(0)
    }

    pub fn try_from_roles<I>(roles: I) -> Result<Self, RoleConflict>
    where
        I: IntoIterator<Item = Role>,
    {
        let set = roles
            .into_iter()
            .fold(RoleSet::empty(), |acc, role| RoleSet(acc.0 | role.bit()));
        set.validate()?;
        Ok(set)
    }

    pub fn validate(self) -> Result<(), RoleConflict> {
        for (first, second) in EXCLUSIVE_PAIRS {
            if self.contains(*first) && self.contains(*second) {
                return Err(RoleConflict {
                    first: *first,
                    second: *second,
                });
            }
        }
        Ok(())
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter().map(Role::as_str).collect::<Vec<_>>();
        f.write_str(&names.join(","))
    }
}

impl Serialize for RoleSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let roles = Vec::<Role>::deserialize(deserializer)?;
        RoleSet::try_from_roles(roles).map_err(serde::de::Error::custom)
    }
}
