//! Tag graph
//!
//! Groups a list of links by tag and lays the groups out in two columns:
//! tags on the left, each tag's links in a column to its right, centered
//! on the tag. A link with several tags appears once under each of them.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Link, DEFAULT_TAG_COLOR};

/// Key and color of the bucket for links without tags
pub const UNTAGGED_KEY: &str = "untagged";
pub const UNTAGGED_COLOR: &str = "#6b7280";
const UNTAGGED_NAME: &str = "Untagged";

/// Fill color of link nodes
pub const LINK_NODE_COLOR: &str = "#3b82f6";

const TAG_X: f64 = 100.0;
const TAG_START_Y: f64 = 100.0;
const TAG_SPACING: f64 = 120.0;
const LINK_X: f64 = 350.0;
const LINK_SPACING: f64 = 80.0;

/// Links sharing one tag
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    /// `None` for the untagged bucket
    pub tag_id: Option<Uuid>,
    pub name: String,
    pub color: String,
    pub link_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Tag,
    Link,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    /// Target of a link node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TagGraph {
    pub groups: Vec<TagGroup>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Display label of a link: title, else domain, else a placeholder
pub fn link_label(link: &Link) -> &str {
    if !link.title.is_empty() {
        &link.title
    } else if !link.domain.is_empty() {
        &link.domain
    } else {
        "Untitled link"
    }
}

/// Build the grouped graph for `links`; groups appear in first-seen order
pub fn build_graph(links: &[Link]) -> TagGraph {
    let mut groups: Vec<TagGroup> = Vec::new();

    for link in links {
        if link.tags.is_empty() {
            let index = group_index(&mut groups, None, || TagGroup {
                tag_id: None,
                name: UNTAGGED_NAME.to_string(),
                color: UNTAGGED_COLOR.to_string(),
                link_ids: Vec::new(),
            });
            groups[index].link_ids.push(link.id);
            continue;
        }

        for tag in &link.tags {
            let index = group_index(&mut groups, Some(tag.id), || TagGroup {
                tag_id: Some(tag.id),
                name: tag.name.clone(),
                color: if tag.color.is_empty() {
                    DEFAULT_TAG_COLOR.to_string()
                } else {
                    tag.color.clone()
                },
                link_ids: Vec::new(),
            });
            groups[index].link_ids.push(link.id);
        }
    }

    let mut graph = TagGraph::default();
    for (i, group) in groups.iter().enumerate() {
        let key = group
            .tag_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| UNTAGGED_KEY.to_string());
        let tag_node = format!("tag-{}", key);
        let tag_y = TAG_START_Y + i as f64 * TAG_SPACING;

        graph.nodes.push(GraphNode {
            id: tag_node.clone(),
            kind: NodeKind::Tag,
            label: group.name.clone(),
            x: TAG_X,
            y: tag_y,
            color: group.color.clone(),
            url: None,
        });

        let column_top = tag_y - group.link_ids.len() as f64 * LINK_SPACING / 2.0;
        for (j, link_id) in group.link_ids.iter().enumerate() {
            let Some(link) = links.iter().find(|l| l.id == *link_id) else {
                continue;
            };
            let link_node = format!("link-{}-{}", key, link.id);

            graph.nodes.push(GraphNode {
                id: link_node.clone(),
                kind: NodeKind::Link,
                label: link_label(link).to_string(),
                x: LINK_X,
                y: column_top + j as f64 * LINK_SPACING,
                color: LINK_NODE_COLOR.to_string(),
                url: Some(link.url.clone()),
            });
            graph.edges.push(GraphEdge {
                id: format!("edge-{}", graph.edges.len()),
                source: tag_node.clone(),
                target: link_node,
                color: group.color.clone(),
            });
        }
    }

    graph.groups = groups;
    graph
}

fn group_index(
    groups: &mut Vec<TagGroup>,
    tag_id: Option<Uuid>,
    create: impl FnOnce() -> TagGroup,
) -> usize {
    match groups.iter().position(|g| g.tag_id == tag_id) {
        Some(index) => index,
        None => {
            groups.push(create());
            groups.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkStatus, MetadataStatus, Tag};
    use chrono::Utc;

    fn tag(name: &str, color: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    fn link(title: &str, domain: &str, tags: Vec<Tag>) -> Link {
        let now = Utc::now();
        Link {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            url: format!("https://{}/", domain),
            normalized_url: format!("https://{}/", domain),
            domain: domain.to_string(),
            title: title.to_string(),
            description: String::new(),
            note: String::new(),
            og_image: None,
            favicon: None,
            site_name: None,
            published_time: None,
            status: LinkStatus::Inbox,
            favorite: false,
            collection_id: None,
            metadata_status: MetadataStatus::Pending,
            metadata_error: None,
            created_at: now,
            updated_at: now,
            last_visited_at: None,
            tags,
        }
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let rust = tag("rust", "#ff0000");
        let web = tag("web", "");
        let links = vec![
            link("A", "a.test", vec![rust.clone()]),
            link("B", "b.test", vec![]),
            link("C", "c.test", vec![web.clone(), rust.clone()]),
        ];

        let graph = build_graph(&links);
        let names: Vec<&str> = graph.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["rust", "Untagged", "web"]);
        assert_eq!(graph.groups[0].link_ids, vec![links[0].id, links[2].id]);
        assert_eq!(graph.groups[1].color, UNTAGGED_COLOR);
        assert_eq!(graph.groups[2].color, DEFAULT_TAG_COLOR);

        // 3 tag nodes + 4 link appearances
        assert_eq!(graph.nodes.len(), 7);
        assert_eq!(graph.edges.len(), 4);
    }

    #[test]
    fn test_layout_positions() {
        let rust = tag("rust", "#ff0000");
        let links = vec![
            link("A", "a.test", vec![rust.clone()]),
            link("B", "b.test", vec![rust.clone()]),
            link("C", "c.test", vec![]),
        ];

        let graph = build_graph(&links);
        let tag_nodes: Vec<&GraphNode> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Tag)
            .collect();
        assert_eq!((tag_nodes[0].x, tag_nodes[0].y), (100.0, 100.0));
        assert_eq!((tag_nodes[1].x, tag_nodes[1].y), (100.0, 220.0));

        let link_ys: Vec<f64> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Link)
            .map(|n| n.y)
            .collect();
        // Two links centered on y=100, one on y=220
        assert_eq!(link_ys, vec![20.0, 100.0, 180.0]);
        assert!(graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Link)
            .all(|n| n.x == 350.0));
        assert_eq!(graph.edges[0].color, "#ff0000");
    }

    #[test]
    fn test_link_labels() {
        assert_eq!(link_label(&link("Title", "a.test", vec![])), "Title");
        assert_eq!(link_label(&link("", "a.test", vec![])), "a.test");
        assert_eq!(link_label(&link("", "", vec![])), "Untitled link");
    }

    #[test]
    fn test_empty_input() {
        let graph = build_graph(&[]);
        assert!(graph.groups.is_empty());
        assert!(graph.nodes.is_empty());
    }
}
