//! Reference ("multi-hop") expansion.
//!
//! A first-pass result set can mention material it does not contain: a
//! file path, a function name, a constant defined elsewhere. The
//! [`ReferenceExpander`] lifts such references out of retrieved text with
//! the lexical [`rules`] and runs a bounded number of follow-up searches
//! to pull the referenced material in.

pub mod expander;
pub mod extractor;
pub mod rules;

pub use expander::{ExpansionConfig, ExpansionResult, ExpansionSection, ReferenceExpander};
pub use extractor::ReferenceExtractor;
pub use rules::{
    CallRule, CamelCaseRule, ConstantRule, DecoratorRule, ExtractionRule, FilePathRule,
    KnownTermsRule, QuotedIdentifierRule, default_rules,
};
