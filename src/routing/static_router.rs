use super::Department;

const RULES: &[(&[&str], Department)] = &[
    (&["bill", "invoice", "charge"], Department::Billing),
    (&["error", "bug", "fail"], Department::Technical),
    (&["feature", "product", "buy"], Department::Product),
];

/// Keyword baseline with no policy, state or feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRouter;

impl StaticRouter {
    /// First rule with a matching substring wins.
    pub fn route(query: &str) -> Department {
        let query = query.to_lowercase();
        RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| query.contains(k)))
            .map_or(Department::GeneralSupport, |(_, department)| *department)
    }
}
