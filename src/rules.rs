use crate::types::Category;

/// Keyword rule mapping a Slither detector description onto a category.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub keywords: &'static [&'static str],
    pub category: Category,
    pub message: &'static str,
}

pub const RULE_VULNERABILITY: Rule = Rule {
    id: "SA001",
    keywords: &["reentrancy", "vulnerability"],
    category: Category::Vulnerability,
    message: "Exploitable pattern reported by a Slither detector",
};

pub const RULE_INEFFICIENCY: Rule = Rule {
    id: "SA002",
    keywords: &["gas", "optimization"],
    category: Category::Inefficiency,
    message: "Gas usage that can be reduced",
};

pub const RULE_BEST_PRACTICE: Rule = Rule {
    id: "SA003",
    keywords: &[],
    category: Category::BestPractice,
    message: "Any other detector output (fallback)",
};

/// Rules in evaluation order; the first match wins.
pub fn all_rules() -> &'static [Rule] {
    &[RULE_VULNERABILITY, RULE_INEFFICIENCY, RULE_BEST_PRACTICE]
}

pub fn categorize(description: &str) -> Category {
    let lower = description.to_lowercase();

    all_rules()
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
        .map(|rule| rule.category)
        .unwrap_or(Category::BestPractice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrancy_is_a_vulnerability() {
        assert_eq!(
            categorize("Reentrancy in Bank.withdraw(uint256) (Bank.sol#10-20)"),
            Category::Vulnerability
        );
    }

    #[test]
    fn vulnerability_wins_over_gas() {
        assert_eq!(
            categorize("Known vulnerability that also wastes gas"),
            Category::Vulnerability
        );
    }

    #[test]
    fn gas_and_optimization_are_inefficiencies() {
        assert_eq!(categorize("Loop uses too much GAS"), Category::Inefficiency);
        assert_eq!(
            categorize("State variable optimization: should be constant"),
            Category::Inefficiency
        );
    }

    #[test]
    fn everything_else_is_best_practice() {
        assert_eq!(
            categorize("Pragma version ^0.8.0 allows old versions"),
            Category::BestPractice
        );
        assert_eq!(categorize(""), Category::BestPractice);
    }
}
