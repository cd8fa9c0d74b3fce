#![forbid(unsafe_code)]

//! Roster forms: field validation rules and the form state controller.
//!
//! # Key Components
//!
//! - [`validation`] - the [`Validator`](validation::Validator) trait,
//!   built-in rules and ordered [`RuleSet`](validation::RuleSet)s
//! - [`form`] - [`FormController`](form::FormController): values, errors,
//!   touched/dirty tracking and async submit
//!
//! # Role in Roster
//! This crate knows no user records; it borrows only the email shape check
//! from `roster-core`. The facade builds the user form out of these pieces
//! and hands the submitted [`FormValues`](validation::FormValues) to the
//! domain layer.

pub mod form;
pub mod validation;

pub use form::{EditPolicy, FieldProps, FormController, FormMsg, SubmitOutcome};
pub use validation::{FieldValue, FormRules, FormValues, RuleSet, ValidationResult, Validator};
