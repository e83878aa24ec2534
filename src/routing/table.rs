use serde::{Deserialize, Serialize};

/// Trigger keywords for one agent. `special` keywords are the
/// higher-precision list and are checked before any general list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentKeywords {
    pub agent: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub special: Vec<String>,
}

impl AgentKeywords {
    fn new(agent: &str, keywords: &[&str], special: &[&str]) -> Self {
        Self {
            agent: agent.to_string(),
            keywords: to_strings(keywords),
            special: to_strings(special),
        }
    }
}

/// Immutable routing configuration handed to [`super::Router::new`].
///
/// Keywords are matched against the lower-cased query, so they must be
/// lower-case themselves to ever match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingTable {
    pub agents: Vec<AgentKeywords>,
    pub fallback_agent: String,
    #[serde(default)]
    pub priority_keywords: Vec<String>,
    #[serde(default)]
    pub media_family: Vec<String>,
    #[serde(default)]
    pub media_umbrella: Option<String>,
    #[serde(default)]
    pub media_triggers: Vec<String>,
    #[serde(default)]
    pub web_content_keywords: Vec<String>,
}

impl RoutingTable {
    /// Every agent name the table can emit.
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let candidates = self
            .agents
            .iter()
            .map(|a| a.agent.as_str())
            .chain(std::iter::once(self.fallback_agent.as_str()))
            .chain(self.media_umbrella.as_deref());
        for name in candidates {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for RoutingTable {
    fn default() -> Self {
        let agents = vec![
            AgentKeywords::new(
                "multi_format_agent",
                &[
                    "文件", "pdf", "excel", "ppt", "image", "视频", "音频", "mp3", "mp4", "文档",
                    "表格", "幻灯片",
                ],
                &[
                    ".xlsx", ".xls", ".txt", ".pptx", ".png", ".jpg", ".jpeg", ".bmp", ".wav",
                ],
            ),
            AgentKeywords::new(
                "time_agent",
                &[
                    "时间", "日期", "现在", "几点", "今天", "明天", "星期", "月份", "年份",
                    "当前时间",
                ],
                &[],
            ),
            AgentKeywords::new(
                "delivery_agent",
                &[
                    "订单", "下单", "查询订单", "发货", "快递", "配送", "物流", "运输", "派送",
                    "收货地址",
                ],
                &[],
            ),
            AgentKeywords::new(
                "inventory_agent",
                &[
                    "库存", "补货", "查看库存", "库存状态", "剩余数量", "存货", "库存量",
                    "库存查询", "库存管理",
                ],
                &[],
            ),
            AgentKeywords::new(
                "web_agent",
                &[
                    "网页", "网站", "url", "http", "https", "京东", "商品", "产品信息", "网页内容",
                    "网址", "链接", "浏览器",
                ],
                &["jd.com", "taobao.com", "tmall.com", "商品编号", "产品id"],
            ),
            AgentKeywords::new(
                "github_agent",
                &[
                    "github", "git", "仓库", "代码", "开源", "版本", "release", "issue", "问题",
                    "提交", "分支", "pull request",
                ],
                &["github.com", "repo", "repository", "star", "fork"],
            ),
            AgentKeywords::new(
                "media_agent",
                &[
                    "视频", "音频", "mp4", "mp3", "wav", "avi", "mov", "mkv", "时长", "帧", "截图",
                    "声音", "录音", "播放",
                ],
                &[],
            ),
            AgentKeywords::new(
                "pdf_agent",
                &[
                    "pdf", "文档", "文本", "文字", "提取", "图片数量", "页数", "内容", "阅读",
                    "转换",
                ],
                &[".pdf", "adobe", "acrobat", "扫描件"],
            ),
            AgentKeywords::new(
                "video_agent",
                &[
                    "视频", "mp4", "avi", "mov", "mkv", "时长", "帧", "截图", "时间点", "播放",
                    "剪辑", "分辨率",
                ],
                &[".mp4", ".avi", ".mov", ".mkv", "视频文件", "影片"],
            ),
            AgentKeywords::new(
                "external_search_agent",
                &[
                    "搜索", "查询", "查找", "了解", "知道", "信息", "数据", "统计", "报告", "分析",
                    "微博", "weibo", "抖音", "外部", "网络", "在线", "最新", "实时", "热点", "新闻",
                    "百度", "搜索不到", "无法访问", "没有权限", "图片", "内容", "详情", "具体",
                    "增长", "同比", "增加", "提升", "减少", "下降", "成交额", "销售额", "破千万",
                    "百分比", "%", "电商", "大促", "618", "双11", "战报", "数字", "数值", "多少",
                ],
                &[
                    "微博.com", "weibo.com", "baidu.com", "搜索不到", "无法访问", "没有权限",
                    "受限", "外部资源", "网络内容", "实时数据", "最新消息", "同比增长",
                    "增长数据",
                ],
            ),
        ];

        Self {
            agents,
            fallback_agent: "external_search_agent".to_string(),
            priority_keywords: to_strings(&[
                "增长", "同比", "数据", "统计", "百分比", "%", "成交额", "销售额", "破千万", "微博",
                "weibo", "最新", "实时", "百度", "搜索",
            ]),
            media_family: to_strings(&["video_agent", "pdf_agent", "media_agent"]),
            media_umbrella: Some("media_agent".to_string()),
            media_triggers: to_strings(&["视频", "音频", "媒体"]),
            web_content_keywords: to_strings(&[
                "微博", "weibo", "网页", "网站", "京东", "电商", "新闻", "热点", "百度", "搜索",
                "最新", "实时", "图片", "内容", "数据", "增长",
            ]),
        }
    }
}
