use thiserror::Error;

use crate::roles::Role;

/// Fatal problems with an uploaded table; the load is aborted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("No rows found in input")]
    NoRows,
    #[error("No columns detected in input")]
    NoColumns,
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("Row {row} has {found} field(s) but {expected} column(s) were detected")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Roles '{first}' and '{second}' cannot be set on the same column")]
pub struct RoleConflict {
    pub first: Role,
    pub second: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Profile '{profile}' region '{region}' references unknown code '{code}'")]
    UnknownRegionCode {
        profile: String,
        region: String,
        code: String,
    },
    #[error("Profile '{profile}' lists code '{code}' in more than one region")]
    CodeInMultipleRegions { profile: String, code: String },
    #[error("Profile '{profile}' maps name '{name}' to more than one code")]
    AmbiguousName { profile: String, name: String },
    #[error("Profile id '{0}' is registered more than once")]
    DuplicateProfile(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Column '{0}' not found in dataset")]
pub struct UnknownColumn(pub String);
