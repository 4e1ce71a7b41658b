pub mod field;
pub mod form;
pub mod rule;

pub use field::{Field, FieldType, ordered_fields};
pub use form::FormSpec;
pub use rule::{ConditionalRule, RuleAction, RuleOperator};
