//! Composite grouping of a single region listing
//!
//! A composite (replication group / database cluster) replaces its members in
//! the flat list. Members are only folded away when their composite appears in
//! the same listing; orphaned members stay standalone.

use crate::models::RawResource;
use std::collections::{HashMap, HashSet};

/// One logical inventory entry before enrichment
#[derive(Debug, Clone, PartialEq)]
pub enum ListedResource {
    Standalone(RawResource),
    Composite {
        group: RawResource,
        /// Declared members in declaration order; `None` if not in the listing
        members: Vec<(String, Option<RawResource>)>,
    },
}

impl ListedResource {
    pub fn resource(&self) -> &RawResource {
        match self {
            ListedResource::Standalone(resource) => resource,
            ListedResource::Composite { group, .. } => group,
        }
    }

    pub fn member_ids(&self) -> Vec<String> {
        match self {
            ListedResource::Standalone(_) => Vec::new(),
            ListedResource::Composite { members, .. } => {
                members.iter().map(|(id, _)| id.clone()).collect()
            }
        }
    }

    /// Id whose utilization stands for this entry
    pub fn metrics_target(&self) -> &str {
        match self {
            ListedResource::Standalone(resource) => &resource.id,
            ListedResource::Composite { group, .. } => group
                .composite
                .as_ref()
                .and_then(|c| c.primary_member.as_deref())
                .unwrap_or(&group.id),
        }
    }
}

/// Fold members into their composites, keeping listing order
pub fn group_listing(listing: Vec<RawResource>) -> Vec<ListedResource> {
    let group_ids: HashSet<String> = listing
        .iter()
        .filter(|r| r.composite.is_some())
        .map(|r| r.id.clone())
        .collect();

    // Each member belongs to exactly one group: the one its group_id names
    // when present, else the first group declaring it
    let mut owner: HashMap<String, String> = HashMap::new();
    for group in listing.iter().filter(|r| r.composite.is_some()) {
        for member in group.composite.iter().flat_map(|c| c.members.iter()) {
            owner.entry(member.clone()).or_insert_with(|| group.id.clone());
        }
    }
    for resource in &listing {
        if let Some(group_id) = resource.group_id.as_ref().filter(|g| group_ids.contains(*g)) {
            owner.insert(resource.id.clone(), group_id.clone());
        }
    }

    // Members referencing a present group, or declared by one
    let mut absorbed: HashMap<String, RawResource> = HashMap::new();
    let mut order: Vec<RawResource> = Vec::with_capacity(listing.len());

    for resource in listing {
        if resource.composite.is_none() && owner.contains_key(&resource.id) {
            absorbed.insert(resource.id.clone(), resource);
        } else {
            order.push(resource);
        }
    }

    order
        .into_iter()
        .map(|resource| match resource.composite.clone() {
            None => ListedResource::Standalone(resource),
            Some(info) => {
                let mut member_ids: Vec<String> = info
                    .members
                    .iter()
                    .filter(|id| owner.get(*id).map_or(true, |o| *o == resource.id))
                    .cloned()
                    .collect();
                // Members pointing at this group without being declared by it
                let mut undeclared: Vec<&RawResource> = absorbed
                    .values()
                    .filter(|m| {
                        m.group_id.as_deref() == Some(resource.id.as_str())
                            && !member_ids.contains(&m.id)
                    })
                    .collect();
                undeclared.sort_by(|a, b| a.id.cmp(&b.id));
                member_ids.extend(undeclared.into_iter().map(|m| m.id.clone()));

                let members = member_ids
                    .into_iter()
                    .map(|id| {
                        let member = absorbed.get(&id).cloned();
                        (id, member)
                    })
                    .collect();
                ListedResource::Composite {
                    group: resource,
                    members,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShapeAttributes;
    use chrono::Utc;

    fn raw(id: &str) -> RawResource {
        RawResource::new(id, Utc::now(), ShapeAttributes::new())
    }

    fn ids(listed: &[ListedResource]) -> Vec<&str> {
        listed.iter().map(|l| l.resource().id.as_str()).collect()
    }

    #[test]
    fn test_members_fold_into_present_group() {
        let listing = vec![
            raw("sessions-001").member_of("sessions"),
            raw("standalone"),
            raw("sessions").composite_of(
                vec!["sessions-001".into(), "sessions-002".into()],
                Some("sessions-001".into()),
            ),
            raw("sessions-002").member_of("sessions"),
        ];

        let listed = group_listing(listing);
        assert_eq!(ids(&listed), vec!["standalone", "sessions"]);

        let group = &listed[1];
        assert_eq!(group.member_ids(), vec!["sessions-001", "sessions-002"]);
        assert_eq!(group.metrics_target(), "sessions-001");
        match group {
            ListedResource::Composite { members, .. } => {
                assert!(members.iter().all(|(_, m)| m.is_some()));
            }
            other => panic!("expected composite, got {:?}", other),
        }
    }

    #[test]
    fn test_orphan_member_stays_standalone() {
        let listed = group_listing(vec![raw("cache-001").member_of("elsewhere"), raw("b")]);
        assert_eq!(ids(&listed), vec!["cache-001", "b"]);
        assert!(matches!(listed[0], ListedResource::Standalone(_)));
    }

    #[test]
    fn test_missing_member_is_kept_as_none() {
        let listed = group_listing(vec![raw("db-cluster").composite_of(vec!["db-1".into()], None)]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metrics_target(), "db-cluster");
        match &listed[0] {
            ListedResource::Composite { members, .. } => {
                assert_eq!(members, &vec![("db-1".to_string(), None)]);
            }
            other => panic!("expected composite, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_member_belongs_to_one_group() {
        let listed = group_listing(vec![
            raw("g1").composite_of(vec!["m".into(), "a".into()], None),
            raw("g2").composite_of(vec!["m".into(), "b".into()], None),
            raw("m"),
            raw("a"),
            raw("b"),
        ]);
        assert_eq!(ids(&listed), vec!["g1", "g2"]);
        assert_eq!(listed[0].member_ids(), vec!["m", "a"]);
        assert_eq!(listed[1].member_ids(), vec!["b"]);
    }

    #[test]
    fn test_shared_member_follows_its_group_id() {
        let listed = group_listing(vec![
            raw("g1").composite_of(vec!["m".into()], None),
            raw("g2").composite_of(vec!["m".into()], None),
            raw("m").member_of("g2"),
        ]);
        assert!(listed[0].member_ids().is_empty());
        assert_eq!(listed[1].member_ids(), vec!["m"]);
        match &listed[1] {
            ListedResource::Composite { members, .. } => assert!(members[0].1.is_some()),
            other => panic!("expected composite, got {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_member_joins_its_group() {
        let listed = group_listing(vec![
            raw("grp").composite_of(vec!["grp-001".into()], None),
            raw("grp-001").member_of("grp"),
            raw("grp-002").member_of("grp"),
        ]);
        assert_eq!(ids(&listed), vec!["grp"]);
        assert_eq!(listed[0].member_ids(), vec!["grp-001", "grp-002"]);
    }
}
