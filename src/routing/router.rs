use tracing::debug;

use super::table::RoutingTable;

/// Keyword-containment intent router.
///
/// Pure and deterministic: the same query always yields the same ordered,
/// duplicate-free, non-empty agent list.
#[derive(Debug, Clone)]
pub struct Router {
    table: RoutingTable,
}

fn contains_any(query: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| query.contains(kw.as_str()))
}

fn push_unique(selected: &mut Vec<String>, agent: &str) {
    if !selected.iter().any(|a| a == agent) {
        selected.push(agent.to_string());
    }
}

impl Router {
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn route(&self, query: &str) -> Vec<String> {
        let table = &self.table;
        let query = query.to_lowercase();
        let mut selected: Vec<String> = Vec::new();

        let priority = contains_any(&query, &table.priority_keywords);
        if priority {
            push_unique(&mut selected, &table.fallback_agent);
        }

        for entry in &table.agents {
            if contains_any(&query, &entry.special) {
                push_unique(&mut selected, &entry.agent);
            }
        }

        for entry in &table.agents {
            if contains_any(&query, &entry.keywords) {
                push_unique(&mut selected, &entry.agent);
            }
        }

        if let Some(umbrella) = &table.media_umbrella {
            if contains_any(&query, &table.media_triggers) {
                push_unique(&mut selected, umbrella);
            }
            self.collapse_media(&mut selected, umbrella);
        }

        if contains_any(&query, &table.web_content_keywords) {
            push_unique(&mut selected, &table.fallback_agent);
        }

        if selected.is_empty() {
            selected.push(table.fallback_agent.clone());
        }

        if priority {
            if let Some(pos) = selected.iter().position(|a| *a == table.fallback_agent) {
                let fallback = selected.remove(pos);
                selected.insert(0, fallback);
            }
        }

        debug!("Routed query to {:?}", selected);
        selected
    }

    /// More than one media-family agent collapses to the umbrella agent,
    /// which keeps its own slot or takes the slot of the first one removed.
    fn collapse_media(&self, selected: &mut Vec<String>, umbrella: &str) {
        let family = &self.table.media_family;
        let media_count = selected.iter().filter(|a| family.contains(a)).count();
        if media_count <= 1 {
            return;
        }

        let first_slot = selected.iter().position(|a| family.contains(a));
        let had_umbrella = selected.iter().any(|a| a == umbrella);
        selected.retain(|a| a == umbrella || !family.contains(a));

        if !had_umbrella {
            let slot = first_slot.unwrap_or(selected.len()).min(selected.len());
            selected.insert(slot, umbrella.to_string());
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RoutingTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::table::AgentKeywords;

    fn small_table() -> RoutingTable {
        RoutingTable {
            agents: vec![
                AgentKeywords {
                    agent: "time_agent".to_string(),
                    keywords: vec!["几点".to_string()],
                    special: vec![],
                },
                AgentKeywords {
                    agent: "pdf_agent".to_string(),
                    keywords: vec!["文档".to_string()],
                    special: vec![],
                },
                AgentKeywords {
                    agent: "video_agent".to_string(),
                    keywords: vec!["剪辑".to_string()],
                    special: vec![],
                },
            ],
            fallback_agent: "search".to_string(),
            priority_keywords: vec!["最新".to_string()],
            media_family: vec![
                "video_agent".to_string(),
                "pdf_agent".to_string(),
                "media_agent".to_string(),
            ],
            media_umbrella: Some("media_agent".to_string()),
            media_triggers: vec![],
            web_content_keywords: vec![],
        }
    }

    #[test]
    fn test_exclusive_keyword_selects_agent() {
        let router = Router::default();
        let agents = router.route("请查询订单 A1024 的状态");
        assert!(agents.contains(&"delivery_agent".to_string()));

        let agents = router.route("帮我看看补货计划");
        assert!(agents.contains(&"inventory_agent".to_string()));
    }

    #[test]
    fn test_query_is_lowercased() {
        let router = Router::default();
        let agents = router.route("Which GITHUB release fixed this?");
        assert!(agents.contains(&"github_agent".to_string()));
    }

    #[test]
    fn test_no_keywords_falls_back() {
        let router = Router::default();
        assert_eq!(router.route("hello there"), vec!["external_search_agent"]);
    }

    #[test]
    fn test_priority_keyword_puts_fallback_first() {
        let router = Router::default();
        let agents = router.route("github.com 上这个仓库最新的 release 是什么");

        assert_eq!(agents[0], "external_search_agent");
        assert!(agents.contains(&"github_agent".to_string()));
    }

    #[test]
    fn test_media_family_collapses_to_umbrella() {
        let router = Router::default();
        let agents = router.route("这个 mp4 视频和 pdf 文档分别多长");

        assert!(agents.contains(&"media_agent".to_string()));
        assert!(!agents.contains(&"video_agent".to_string()));
        assert!(!agents.contains(&"pdf_agent".to_string()));
    }

    #[test]
    fn test_collapse_inserts_umbrella_when_missing() {
        let router = Router::new(small_table());
        let agents = router.route("几点的文档需要剪辑");

        assert_eq!(agents, vec!["time_agent", "media_agent"]);
    }

    #[test]
    fn test_single_media_agent_is_kept() {
        let router = Router::new(small_table());
        assert_eq!(router.route("这份文档"), vec!["pdf_agent"]);
    }

    #[test]
    fn test_special_keywords_come_before_general() {
        let router = Router::default();
        let agents = router.route("jd.com 上这个商品");

        assert_eq!(agents[0], "web_agent");
    }

    #[test]
    fn test_file_extension_selects_file_agent() {
        let router = Router::default();
        assert_eq!(router.route("椅子是什么颜色 chair.png"), vec!["multi_format_agent"]);
        assert_eq!(router.route("第二列合计 Sales.XLSX"), vec!["multi_format_agent"]);
    }

    #[test]
    fn test_web_content_ensures_fallback() {
        let router = Router::default();
        let agents = router.route("这个网页");

        assert_eq!(agents, vec!["web_agent", "external_search_agent"]);
    }

    #[test]
    fn test_output_never_empty_and_unique() {
        let router = Router::default();
        for query in ["", "   ", "视频 视频 视频", "最新 最新 数据", "abc"] {
            let agents = router.route(query);
            assert!(!agents.is_empty(), "empty routing for {query:?}");

            let mut deduped = agents.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(deduped.len(), agents.len(), "duplicates for {query:?}");
        }
    }
}
