use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::{
    extract_core_answer, longest_match, should_use_extracted, strip_all, ATTRIBUTION,
    CLARIFYING_REQUESTS, UPPERCASE_WORD,
};
use super::{NormalizeStep, QueryContext, NOT_FOUND};

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LEADING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[，。、；]").unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[，。、；]$").unwrap());
static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static COLOUR_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(red|blue|green|yellow|black|white|gray|grey|purple|orange|brown|pink|cyan|magenta)")
        .unwrap()
});
static DISCLAIMER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(以上信息仅供参考|建议.*?获取|搜索.*?失败|无法.*?获取)[^.]*\.?").unwrap()
});

/// Maximum length kept for a `文本` format requirement.
const PLAIN_TEXT_LIMIT: usize = 200;
/// Replies at least this long are kept even when they mention a failure.
const FAILURE_LENGTH_LIMIT: usize = 50;

pub struct StripLineBreaks;

impl NormalizeStep for StripLineBreaks {
    fn name(&self) -> &'static str {
        "strip_line_breaks"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        LINE_BREAK.replace_all(candidate.trim(), "").into_owned()
    }
}

pub struct CoreAnswer;

impl NormalizeStep for CoreAnswer {
    fn name(&self) -> &'static str {
        "core_answer"
    }

    fn apply(&self, candidate: String, ctx: &QueryContext) -> String {
        let extracted = extract_core_answer(&candidate, &ctx.query);
        if should_use_extracted(&candidate, &extracted, &ctx.query) {
            extracted
        } else {
            candidate
        }
    }
}

pub struct StripAttribution;

impl NormalizeStep for StripAttribution {
    fn name(&self) -> &'static str {
        "strip_attribution"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        strip_all(&ATTRIBUTION, &candidate)
    }
}

pub struct StripClarifyingRequests;

impl NormalizeStep for StripClarifyingRequests {
    fn name(&self) -> &'static str {
        "strip_clarifying_requests"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        strip_all(&CLARIFYING_REQUESTS, &candidate)
    }
}

pub struct TidyPunctuation;

impl NormalizeStep for TidyPunctuation {
    fn name(&self) -> &'static str {
        "tidy_punctuation"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        let collapsed = collapse_whitespace(&candidate);
        let trimmed = LEADING_PUNCT.replace(&collapsed, "");
        TRAILING_PUNCT.replace(&trimmed, "").into_owned()
    }
}

pub struct FailureSentinel;

impl FailureSentinel {
    fn looks_failed(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("not found")
            || lower.contains("error")
            || text.contains("无法获取")
            || text.contains("搜索失败")
            || text.trim().is_empty()
    }
}

impl NormalizeStep for FailureSentinel {
    fn name(&self) -> &'static str {
        "failure_sentinel"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        let short = candidate.chars().count() < FAILURE_LENGTH_LIMIT;
        if (short && Self::looks_failed(&candidate))
            || candidate.to_lowercase().contains("not found in file")
        {
            NOT_FOUND.to_string()
        } else {
            candidate
        }
    }
}

pub struct FormatRequirement;

impl NormalizeStep for FormatRequirement {
    fn name(&self) -> &'static str {
        "format_requirement"
    }

    fn apply(&self, candidate: String, ctx: &QueryContext) -> String {
        let req = ctx.format_req.as_str();

        if req.contains("阿拉伯数字") {
            FIRST_INTEGER
                .find(&candidate)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| NOT_FOUND.to_string())
        } else if req.contains("小写英文") {
            let lower = candidate.to_lowercase();
            match COLOUR_WORD.find(&lower) {
                Some(m) => m.as_str().to_string(),
                None => lower,
            }
        } else if req.contains("英文大写") || req.contains("大写英文") {
            let upper = candidate.to_uppercase();
            match longest_match(&UPPERCASE_WORD, &upper) {
                Some(word) => word.to_string(),
                None => upper,
            }
        } else if req.contains("文本") {
            collapse_whitespace(&candidate)
                .chars()
                .take(PLAIN_TEXT_LIMIT)
                .collect()
        } else {
            candidate
        }
    }
}

pub struct StripDisclaimers;

impl NormalizeStep for StripDisclaimers {
    fn name(&self) -> &'static str {
        "strip_disclaimers"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        let cleaned = DISCLAIMER.replace_all(&candidate, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            candidate
        } else {
            cleaned.to_string()
        }
    }
}

pub struct EmptySentinel;

impl NormalizeStep for EmptySentinel {
    fn name(&self) -> &'static str {
        "empty_sentinel"
    }

    fn apply(&self, candidate: String, _ctx: &QueryContext) -> String {
        if candidate.trim().is_empty() {
            NOT_FOUND.to_string()
        } else {
            candidate
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}
