//! Closed set of filter operators.

/// What a filter leaf's `value` must look like for a given operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// No `value` key.
    None,
    /// Any non-null scalar or tree.
    Value,
    /// A list of values.
    List,
    /// A number (or numeric string).
    Number,
    /// A regular expression.
    Pattern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    Within,
    NotWithin,
    Exists,
    NotExists,
    Contains,
    NotContains,
    StartingWith,
    NotStartingWith,
    EndingWith,
    NotEndingWith,
    RegexMatch,
    NotRegexMatch,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
    LengthEquals,
    LengthGreaterThan,
    LengthLessThan,
    Subset,
    Intersects,
}

impl Operator {
    pub const ALL: [Operator; 27] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Within,
        Operator::NotWithin,
        Operator::Exists,
        Operator::NotExists,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartingWith,
        Operator::NotStartingWith,
        Operator::EndingWith,
        Operator::NotEndingWith,
        Operator::RegexMatch,
        Operator::NotRegexMatch,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::IsTrue,
        Operator::IsFalse,
        Operator::LengthEquals,
        Operator::LengthGreaterThan,
        Operator::LengthLessThan,
        Operator::Subset,
        Operator::Intersects,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Operator::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Within => "within",
            Operator::NotWithin => "not_within",
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartingWith => "starting_with",
            Operator::NotStartingWith => "not_starting_with",
            Operator::EndingWith => "ending_with",
            Operator::NotEndingWith => "not_ending_with",
            Operator::RegexMatch => "regex_match",
            Operator::NotRegexMatch => "not_regex_match",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::IsTrue => "is_true",
            Operator::IsFalse => "is_false",
            Operator::LengthEquals => "length_equals",
            Operator::LengthGreaterThan => "length_greater_than",
            Operator::LengthLessThan => "length_less_than",
            Operator::Subset => "subset",
            Operator::Intersects => "intersects",
        }
    }

    pub fn operand_kind(self) -> OperandKind {
        match self {
            Operator::Exists
            | Operator::NotExists
            | Operator::IsEmpty
            | Operator::IsNotEmpty
            | Operator::IsTrue
            | Operator::IsFalse => OperandKind::None,
            Operator::Equals
            | Operator::NotEquals
            | Operator::Contains
            | Operator::NotContains
            | Operator::StartingWith
            | Operator::NotStartingWith
            | Operator::EndingWith
            | Operator::NotEndingWith => OperandKind::Value,
            Operator::Within | Operator::NotWithin | Operator::Subset | Operator::Intersects => {
                OperandKind::List
            }
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual
            | Operator::LengthEquals
            | Operator::LengthGreaterThan
            | Operator::LengthLessThan => OperandKind::Number,
            Operator::RegexMatch | Operator::NotRegexMatch => OperandKind::Pattern,
        }
    }

    /// The positive operator this one negates, if any.
    ///
    /// Negated operators hold universally over matches, so an absent attribute satisfies them.
    pub fn negates(self) -> Option<Operator> {
        match self {
            Operator::NotEquals => Some(Operator::Equals),
            Operator::NotWithin => Some(Operator::Within),
            Operator::NotContains => Some(Operator::Contains),
            Operator::NotStartingWith => Some(Operator::StartingWith),
            Operator::NotEndingWith => Some(Operator::EndingWith),
            Operator::NotRegexMatch => Some(Operator::RegexMatch),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operator::parse("equal"), None);
        assert_eq!(Operator::parse("EQUALS"), None);
    }

    #[test]
    fn negated_operators_pair_with_a_positive_one() {
        for op in Operator::ALL {
            if let Some(positive) = op.negates() {
                assert!(op.as_str().starts_with("not_"));
                assert_eq!(positive.negates(), None);
                assert_eq!(op.operand_kind(), positive.operand_kind());
            }
        }
    }
}
