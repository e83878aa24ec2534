//! Post-processing of the model's final reply into a short answer.
//!
//! A [`Normalizer`] is an ordered list of [`NormalizeStep`]s, each a pure
//! function of the current candidate and the [`QueryContext`]. Steps run in
//! order and later steps see the output of earlier ones.

pub mod extract;
pub mod steps;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

pub use extract::{extract_core_answer, should_use_extracted};

/// Sentinel answer for "no usable answer".
pub const NOT_FOUND: &str = "Not found";

static FORMAT_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"请用(\w+.*?)(回答|输出)").unwrap());

#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query: String,
    /// Text between `请用` and `回答`/`输出`, or `"plain text"`.
    pub format_req: String,
}

impl QueryContext {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let format_req = detect_format_requirement(&query);
        Self { query, format_req }
    }
}

pub fn detect_format_requirement(query: &str) -> String {
    FORMAT_REQUIREMENT
        .captures(query)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| "plain text".to_string())
}

pub trait NormalizeStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, candidate: String, ctx: &QueryContext) -> String;
}

pub struct Normalizer {
    steps: Vec<Box<dyn NormalizeStep>>,
}

impl Normalizer {
    pub fn new(steps: Vec<Box<dyn NormalizeStep>>) -> Self {
        Self { steps }
    }

    /// The full cleaning pipeline applied to batch answers.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(steps::StripLineBreaks),
            Box::new(steps::CoreAnswer),
            Box::new(steps::StripAttribution),
            Box::new(steps::StripClarifyingRequests),
            Box::new(steps::TidyPunctuation),
            Box::new(steps::FailureSentinel),
            Box::new(steps::FormatRequirement),
            Box::new(steps::StripDisclaimers),
            Box::new(steps::EmptySentinel),
        ])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn normalize(&self, raw: &str, query: &str) -> String {
        let ctx = QueryContext::new(query);
        self.steps.iter().fold(raw.to_string(), |candidate, step| {
            let next = step.apply(candidate, &ctx);
            trace!("normalize {}: {:?}", step.name(), next);
            next
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_requirement() {
        assert_eq!(detect_format_requirement("请用阿拉伯数字回答：现在是几点"), "阿拉伯数字");
        assert_eq!(detect_format_requirement("请用英文大写输出品牌"), "英文大写");
        assert_eq!(detect_format_requirement("现在是几点"), "plain text");
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            Normalizer::standard().step_names(),
            vec![
                "strip_line_breaks",
                "core_answer",
                "strip_attribution",
                "strip_clarifying_requests",
                "tidy_punctuation",
                "failure_sentinel",
                "format_requirement",
                "strip_disclaimers",
                "empty_sentinel",
            ]
        );
    }

    #[test]
    fn test_arabic_digits_from_time_reply() {
        let n = Normalizer::standard();
        assert_eq!(n.normalize("现在是下午3点", "请用阿拉伯数字回答：现在是几点"), "3");
    }

    #[test]
    fn test_missing_file_reply_becomes_not_found() {
        let n = Normalizer::standard();
        assert_eq!(n.normalize("File not found.", "report.pdf 里的总金额是多少"), NOT_FOUND);
        assert_eq!(n.normalize("\n\n", "随便"), NOT_FOUND);
    }

    #[test]
    fn test_multiline_reply_with_source_note() {
        let n = Normalizer::standard();
        let raw = "数据来源：库存表。\n商品A库存为 42 件。\n以上信息仅供参考";
        assert_eq!(n.normalize(raw, "商品A库存数量是多少"), "42");
    }

    #[test]
    fn test_uppercase_answer() {
        let n = Normalizer::standard();
        assert_eq!(n.normalize("品牌是 Nike", "请用英文大写回答品牌"), "NIKE");
    }
}
