//! Year-grouped sidebar navigation.

use crate::types::{Post, SidebarGroup, SidebarItem};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::warn;

/// Group posts by the UTC year of their date, newest year first.
///
/// Items keep the order of `posts`, so a newest-first post list gives
/// newest-first items within each year.
pub fn build_sidebar(posts: &[Post]) -> Vec<SidebarGroup> {
    let mut years: BTreeMap<i32, Vec<SidebarItem>> = BTreeMap::new();
    for post in posts {
        let Ok(date) = NaiveDate::parse_from_str(&post.date, "%Y-%m-%d") else {
            warn!(page_id = %post.page_id, date = %post.date, "skipping post with malformed date");
            continue;
        };
        years.entry(date.year()).or_default().push(SidebarItem {
            text: post.title.clone(),
            link: post.url.clone(),
        });
    }

    years
        .into_iter()
        .rev()
        .map(|(year, items)| SidebarGroup {
            text: year.to_string(),
            items,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PageStatus;

    fn post(title: &str, date: &str) -> Post {
        let slug = title.to_lowercase();
        Post {
            page_id: slug.clone(),
            title: title.into(),
            url: format!("/blog/{slug}"),
            slug,
            date: date.into(),
            date_for_sidebar: date.get(5..).unwrap_or_default().into(),
            tags: vec![],
            description: String::new(),
            status: PageStatus::Published,
        }
    }

    #[test]
    fn single_post_single_group() {
        let sidebar = build_sidebar(&[post("Foo", "2023-11-14")]);
        assert_eq!(
            sidebar,
            vec![SidebarGroup {
                text: "2023".into(),
                items: vec![SidebarItem {
                    text: "Foo".into(),
                    link: "/blog/foo".into()
                }],
            }]
        );
    }

    #[test]
    fn years_are_descending_and_items_keep_order() {
        let sidebar = build_sidebar(&[
            post("C", "2024-02-01"),
            post("B", "2023-06-01"),
            post("A", "2023-01-01"),
            post("Z", "2021-12-31"),
        ]);
        let shape: Vec<(&str, Vec<&str>)> = sidebar
            .iter()
            .map(|g| {
                (
                    g.text.as_str(),
                    g.items.iter().map(|i| i.text.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                ("2024", vec!["C"]),
                ("2023", vec!["B", "A"]),
                ("2021", vec!["Z"]),
            ]
        );
    }

    #[test]
    fn unsorted_input_still_groups_by_year() {
        let sidebar = build_sidebar(&[post("Old", "2020-01-01"), post("New", "2022-01-01")]);
        let years: Vec<&str> = sidebar.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(years, vec!["2022", "2020"]);
    }

    #[test]
    fn malformed_date_is_skipped() {
        let sidebar = build_sidebar(&[post("Bad", "someday"), post("Good", "2023-01-01")]);
        assert_eq!(sidebar.len(), 1);
        assert_eq!(sidebar[0].items.len(), 1);
    }

    #[test]
    fn no_posts_no_groups() {
        assert!(build_sidebar(&[]).is_empty());
    }
}
