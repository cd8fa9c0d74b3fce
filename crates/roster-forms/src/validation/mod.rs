#![forbid(unsafe_code)]

//! Field validation with composable rules.
//!
//! This module provides:
//! - A core [`Validator`] trait that sees the field value and the whole form
//! - Built-in rules ([`Required`], [`Email`], [`Phone`], [`MinLength`],
//!   [`MaxLength`]) with Portuguese default messages
//! - Composition ([`And`], [`Or`], [`Not`], ordered [`RuleSet`]s)
//! - Error messages with `{param}` interpolation and stable codes for i18n
//!
//! # Example
//!
//! ```rust
//! use roster_forms::validation::{And, Email, FormValues, Required, Validator};
//!
//! let ctx = FormValues::new();
//! let email = And::new(Required::new(), Email::new());
//! assert!(email.validate(&"ana@example.pt".into(), &ctx).is_valid());
//! assert!(!email.validate(&"ana".into(), &ctx).is_valid());
//! ```

mod validators;

pub use validators::{
    // Composition
    All,
    And,
    // Error codes
    ERROR_CODE_CUSTOM,
    ERROR_CODE_EMAIL,
    ERROR_CODE_MAX_LENGTH,
    ERROR_CODE_MIN_LENGTH,
    ERROR_CODE_NOT,
    ERROR_CODE_PHONE,
    ERROR_CODE_REQUIRED,
    DEFAULT_PHONE_MIN_DIGITS,
    // Built-in validators
    Email,
    MaxLength,
    MinLength,
    Not,
    Or,
    Phone,
    Required,
    // Values
    FieldValue,
    FormRules,
    FormValues,
    // Builder
    RuleSet,
    RuleSetBuilder,
    // Core types
    ValidationError,
    ValidationResult,
    Validator,
};
