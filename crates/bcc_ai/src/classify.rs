/// Deterministic complexity classifier.
///
/// Decides whether a query with no exact match needs grounded retrieval.
/// A case-insensitive substring test against the configured trigger terms;
/// any single hit is sufficient.
#[derive(Debug, Clone)]
pub struct ComplexityClassifier {
    triggers: Vec<String>,
}

impl ComplexityClassifier {
    pub fn new(trigger_keywords: &[String]) -> Self {
        Self {
            triggers: trigger_keywords.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn is_complex(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.triggers.iter().any(|t| lowered.contains(t))
    }
}
