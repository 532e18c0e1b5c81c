//! Request complexity and priority classification.
//!
//! Pure functions over the inquiry text; the model selector combines both
//! signals to pick a tier.

/// Estimated complexity of an inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Routing priority derived from customer-declared urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    High,
}

/// Keywords that mark an inquiry as complex regardless of length.
/// The customer base writes in Korean; keep the list in sync with the
/// support team's triage guide.
const COMPLEXITY_KEYWORDS: &[&str] = &["복잡한", "상세한", "분석", "설명", "해결방법"];

/// Short messages are simple; long messages or ones that hit a complexity
/// keyword are complex; everything else is medium. The length and keyword
/// checks are independent, so a short message with a keyword still counts
/// as complex.
pub fn classify_complexity(message: &str, _category: &str) -> Complexity {
    let lowered = message.to_lowercase();
    let has_keyword = COMPLEXITY_KEYWORDS.iter().any(|k| lowered.contains(k));

    if has_keyword || message.chars().count() > 200 {
        return Complexity::Complex;
    }
    if message.chars().count() < 50 {
        return Complexity::Simple;
    }
    Complexity::Medium
}

/// Map an urgency label onto a routing priority. Unknown labels are
/// treated as normal rather than rejected.
pub fn classify_priority(urgency: &str) -> Priority {
    match urgency.to_lowercase().as_str() {
        "high" | "urgent" | "critical" => Priority::High,
        _ => Priority::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_simple() {
        assert_eq!(classify_complexity("hi", "general"), Complexity::Simple);
        assert_eq!(classify_complexity("", "general"), Complexity::Simple);
    }

    #[test]
    fn test_long_message_is_complex() {
        let message = "a".repeat(250);
        assert_eq!(classify_complexity(&message, "general"), Complexity::Complex);
    }

    #[test]
    fn test_keyword_overrides_short_length() {
        // Under 50 characters but contains a complexity keyword.
        let message = "분석 부탁드립니다";
        assert!(message.chars().count() < 50);
        assert_eq!(classify_complexity(message, "general"), Complexity::Complex);
    }

    #[test]
    fn test_midlength_message_is_medium() {
        let message = "문의드립니다. 어제 주문한 상품이 아직 도착하지 않았는데 배송 상태를 알 수 있을까요? 빠른 확인 부탁드립니다.";
        let count = message.chars().count();
        assert!((50..=200).contains(&count));
        assert_eq!(classify_complexity(message, "general"), Complexity::Medium);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify_complexity("hi", "general"), Complexity::Simple);
        }
    }

    #[test]
    fn test_priority_mapping() {
        assert_eq!(classify_priority("low"), Priority::Normal);
        assert_eq!(classify_priority("normal"), Priority::Normal);
        assert_eq!(classify_priority("medium"), Priority::Normal);
        assert_eq!(classify_priority("high"), Priority::High);
        assert_eq!(classify_priority("urgent"), Priority::High);
        assert_eq!(classify_priority("critical"), Priority::High);
        assert_eq!(classify_priority("HIGH"), Priority::High);
        assert_eq!(classify_priority("unknown"), Priority::Normal);
        assert_eq!(classify_priority(""), Priority::Normal);
    }
}
