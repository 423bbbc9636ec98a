//! Identifier reconciliation for loaded page collections.
//!
//! # Responsibility
//! - Detect id collisions between pages and between features.
//! - Merge records that collided and are the same record; give distinct
//!   colliders a fresh id.
//!
//! # Invariants
//! - Output has no repeated id across pages and features combined.
//! - Records removed by a merge never receive a new id.
//! - Running the reconciler on its own output changes nothing.
//!
//! Page ids and feature ids are checked against one shared `used` set, so a
//! feature whose id equals an earlier page id is reassigned.

mod ids;

pub use ids::{IdGenerator, RandomIdGenerator, SequenceIdGenerator};

use crate::model::page::{Feature, Page};
use log::{debug, info};
use std::collections::HashSet;
use uuid::Uuid;

/// Knobs for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Also merge same-name pages (and same notes/date features) whose ids
    /// differ. Off by default: only id collisions are examined.
    pub merge_semantic_duplicates: bool,
}

/// Counters describing what one run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub merged_pages: usize,
    pub collapsed_features: usize,
    pub reassigned_page_ids: usize,
    pub reassigned_feature_ids: usize,
}

impl ReconcileReport {
    /// Returns whether the run left the collection untouched.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Reconciled pages plus the change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub pages: Vec<Page>,
    pub report: ReconcileReport,
}

/// Reconciles with default options and random UUID v4 ids.
pub fn reconcile(pages: Vec<Page>) -> ReconcileOutcome {
    Reconciler::new(RandomIdGenerator).run(pages)
}

/// Configurable reconciler.
pub struct Reconciler<G: IdGenerator> {
    options: ReconcileOptions,
    ids: G,
}

impl<G: IdGenerator> Reconciler<G> {
    pub fn new(ids: G) -> Self {
        Self::with_options(ids, ReconcileOptions::default())
    }

    pub fn with_options(ids: G, options: ReconcileOptions) -> Self {
        Self { options, ids }
    }

    /// Runs one sweep over `pages` in input order.
    ///
    /// Each page compares only against later pages; earlier ones already
    /// settled their relation to it. The first holder of an id keeps it.
    pub fn run(&mut self, mut pages: Vec<Page>) -> ReconcileOutcome {
        let mut report = ReconcileReport::default();
        let mut taken: HashSet<Uuid> = pages.iter().flat_map(Page::ids).collect();
        let mut used: HashSet<Uuid> = HashSet::with_capacity(taken.len());

        let page_total = pages.len();
        let mut page_deleted = vec![false; page_total];
        let mut page_needs_id = vec![false; page_total];
        let mut feature_needs_id: Vec<Vec<bool>> = vec![Vec::new(); page_total];

        for index in 0..page_total {
            if page_deleted[index] {
                continue;
            }

            for other in (index + 1)..page_total {
                if page_deleted[other] {
                    continue;
                }
                let same_id = pages[other].id == pages[index].id;
                let same_record = pages[other].is_same_record(&pages[index]);
                if same_record && (same_id || self.options.merge_semantic_duplicates) {
                    let absorbed = std::mem::take(&mut pages[other].features);
                    pages[index].features.extend(absorbed);
                    page_deleted[other] = true;
                    page_needs_id[other] = false;
                    report.merged_pages += 1;
                    debug!(
                        "event=reconcile_merge module=reconcile kind=page survivor={} absorbed={}",
                        pages[index].id, pages[other].id
                    );
                } else if same_id {
                    page_needs_id[other] = true;
                }
            }

            if !used.insert(pages[index].id) {
                page_needs_id[index] = true;
            }

            let sweep = self.sweep_features(&mut pages[index].features, &mut used);
            report.collapsed_features += sweep.collapsed;
            feature_needs_id[index] = sweep.needs_id;
        }

        for (index, page) in pages.iter_mut().enumerate() {
            if page_deleted[index] {
                continue;
            }
            if page_needs_id[index] {
                let fresh = self.fresh_id(&mut taken);
                debug!(
                    "event=reconcile_reassign module=reconcile kind=page from={} to={}",
                    page.id, fresh
                );
                page.id = fresh;
                report.reassigned_page_ids += 1;
            }
            for (feature, needs_id) in page.features.iter_mut().zip(&feature_needs_id[index]) {
                if *needs_id {
                    let fresh = self.fresh_id(&mut taken);
                    debug!(
                        "event=reconcile_reassign module=reconcile kind=feature from={} to={}",
                        feature.id, fresh
                    );
                    feature.id = fresh;
                    report.reassigned_feature_ids += 1;
                }
            }
        }

        let pages: Vec<Page> = pages
            .into_iter()
            .zip(page_deleted)
            .filter_map(|(page, deleted)| (!deleted).then_some(page))
            .collect();

        info!(
            "event=reconcile module=reconcile status=ok pages_in={} pages_out={} merged_pages={} collapsed_features={} reassigned_pages={} reassigned_features={}",
            page_total,
            pages.len(),
            report.merged_pages,
            report.collapsed_features,
            report.reassigned_page_ids,
            report.reassigned_feature_ids
        );

        ReconcileOutcome { pages, report }
    }

    /// Feature-level analogue of the page sweep, scoped to one page.
    ///
    /// Duplicates are dropped from `features` before returning; the returned
    /// flags line up with the surviving features.
    fn sweep_features(&self, features: &mut Vec<Feature>, used: &mut HashSet<Uuid>) -> FeatureSweep {
        let total = features.len();
        let mut deleted = vec![false; total];
        let mut needs_id = vec![false; total];

        for index in 0..total {
            if deleted[index] {
                continue;
            }
            for other in (index + 1)..total {
                if deleted[other] {
                    continue;
                }
                let same_id = features[other].id == features[index].id;
                let same_record = features[other].is_same_record(&features[index]);
                if same_record && (same_id || self.options.merge_semantic_duplicates) {
                    deleted[other] = true;
                    needs_id[other] = false;
                } else if same_id {
                    needs_id[other] = true;
                }
            }
            if !used.insert(features[index].id) {
                needs_id[index] = true;
            }
        }

        let collapsed = deleted.iter().filter(|flag| **flag).count();
        let (kept, needs_id): (Vec<Feature>, Vec<bool>) = std::mem::take(features)
            .into_iter()
            .zip(deleted)
            .zip(needs_id)
            .filter_map(|((feature, deleted), needs_id)| (!deleted).then_some((feature, needs_id)))
            .unzip();
        *features = kept;

        FeatureSweep {
            needs_id,
            collapsed,
        }
    }

    fn fresh_id(&mut self, taken: &mut HashSet<Uuid>) -> Uuid {
        loop {
            let candidate = self.ids.next_id();
            if taken.insert(candidate) {
                return candidate;
            }
        }
    }
}

struct FeatureSweep {
    needs_id: Vec<bool>,
    collapsed: usize,
}

#[cfg(test)]
mod tests {
    use super::{reconcile, ReconcileOptions, Reconciler, SequenceIdGenerator};
    use crate::model::page::{Feature, Page};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn feature(notes: &str, day: i64) -> Feature {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        Feature::new(base + Duration::days(day), false, notes)
    }

    fn page_with(id: Uuid, name: &str, features: Vec<Feature>) -> Page {
        let mut page = Page::with_id(id, name);
        page.features = features;
        page
    }

    fn all_ids(pages: &[Page]) -> Vec<Uuid> {
        pages.iter().flat_map(Page::ids).collect()
    }

    fn assert_unique_ids(pages: &[Page]) {
        let ids = all_ids(pages);
        let unique: HashSet<Uuid> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "ids must be globally unique");
    }

    #[test]
    fn merges_same_id_same_name_pages_and_unions_features() {
        let id = Uuid::new_v4();
        let first = page_with(id, "abstract", vec![feature("a", 1), feature("b", 2)]);
        let second = page_with(
            id,
            "abstract",
            vec![feature("c", 3), feature("d", 4), feature("e", 5)],
        );

        let outcome = reconcile(vec![first, second]);

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].name, "abstract");
        assert_eq!(outcome.pages[0].id, id);
        assert_eq!(outcome.pages[0].features.len(), 5);
        assert_eq!(outcome.report.merged_pages, 1);
        assert_eq!(outcome.report.reassigned_page_ids, 0);
        assert_unique_ids(&outcome.pages);
    }

    #[test]
    fn distinct_pages_sharing_an_id_keep_first_and_reassign_second() {
        let id = Uuid::new_v4();
        let outcome = reconcile(vec![
            page_with(id, "abstract", Vec::new()),
            page_with(id, "nature", Vec::new()),
        ]);

        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.pages[0].name, "abstract");
        assert_eq!(outcome.pages[0].id, id);
        assert_eq!(outcome.pages[1].name, "nature");
        assert_ne!(outcome.pages[1].id, id);
        assert_eq!(outcome.report.reassigned_page_ids, 1);
        assert_unique_ids(&outcome.pages);
    }

    #[test]
    fn challenge_flag_makes_same_name_pages_distinct() {
        let id = Uuid::new_v4();
        let mut challenge = page_with(id, "abstract", Vec::new());
        challenge.is_challenge = true;

        let outcome = reconcile(vec![page_with(id, "abstract", Vec::new()), challenge]);

        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.report.merged_pages, 0);
        assert_eq!(outcome.report.reassigned_page_ids, 1);
    }

    #[test]
    fn same_id_same_notes_and_date_features_collapse() {
        let shot = feature("same shot", 0);
        let copy = shot.clone();
        let outcome = reconcile(vec![page_with(Uuid::new_v4(), "nature", vec![shot, copy])]);

        assert_eq!(outcome.pages[0].features.len(), 1);
        assert_eq!(outcome.report.collapsed_features, 1);
        assert_eq!(outcome.report.reassigned_feature_ids, 0);
    }

    #[test]
    fn same_id_features_with_different_notes_are_reassigned() {
        let shot = feature("first", 0);
        let mut other = feature("second", 0);
        other.id = shot.id;
        let original = shot.id;

        let outcome = reconcile(vec![page_with(Uuid::new_v4(), "nature", vec![shot, other])]);

        let features = &outcome.pages[0].features;
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, original);
        assert_ne!(features[1].id, original);
        assert_eq!(outcome.report.reassigned_feature_ids, 1);
    }

    #[test]
    fn merged_page_copies_of_shared_features_collapse() {
        let id = Uuid::new_v4();
        let shared = feature("shared", 1);
        let first = page_with(id, "abstract", vec![shared.clone(), feature("own", 2)]);
        let second = page_with(id, "abstract", vec![shared, feature("extra", 3)]);

        let outcome = reconcile(vec![first, second]);

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].features.len(), 3);
        assert_eq!(outcome.report.collapsed_features, 1);
    }

    #[test]
    fn feature_ids_collide_with_page_ids_in_one_namespace() {
        let page_id = Uuid::new_v4();
        let mut clash = feature("clash", 0);
        clash.id = page_id;

        let outcome = reconcile(vec![page_with(page_id, "street", vec![clash])]);

        assert_eq!(outcome.pages[0].id, page_id);
        assert_ne!(outcome.pages[0].features[0].id, page_id);
        assert_eq!(outcome.report.reassigned_feature_ids, 1);
    }

    #[test]
    fn feature_ids_repeated_across_pages_are_reassigned() {
        let shot = feature("shot", 0);
        let copy = shot.clone();
        let outcome = reconcile(vec![
            page_with(Uuid::new_v4(), "abstract", vec![shot]),
            page_with(Uuid::new_v4(), "nature", vec![copy]),
        ]);

        assert_eq!(outcome.pages[0].features.len(), 1);
        assert_eq!(outcome.pages[1].features.len(), 1);
        assert_eq!(outcome.report.reassigned_feature_ids, 1);
        assert_unique_ids(&outcome.pages);
    }

    #[test]
    fn three_way_collision_merges_duplicates_and_reassigns_the_rest() {
        let id = Uuid::new_v4();
        let outcome = reconcile(vec![
            page_with(id, "abstract", vec![feature("a", 1)]),
            page_with(id, "nature", vec![feature("n", 2)]),
            page_with(id, "abstract", vec![feature("b", 3)]),
            page_with(id, "nature", vec![feature("m", 4)]),
        ]);

        let names: Vec<&str> = outcome.pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["abstract", "nature"]);
        assert_eq!(outcome.pages[0].id, id);
        assert_eq!(outcome.pages[0].features.len(), 2);
        assert_eq!(outcome.pages[1].features.len(), 2);
        assert_eq!(outcome.report.merged_pages, 2);
        assert_eq!(outcome.report.reassigned_page_ids, 1);
        assert_unique_ids(&outcome.pages);
    }

    #[test]
    fn second_run_is_a_noop() {
        let id = Uuid::new_v4();
        let shot = feature("same shot", 0);
        let first = reconcile(vec![
            page_with(id, "abstract", vec![shot.clone(), shot.clone()]),
            page_with(id, "nature", vec![shot]),
            page_with(id, "abstract", vec![feature("x", 9)]),
        ]);
        assert!(!first.report.is_noop());

        let second = reconcile(first.pages.clone());
        assert!(second.report.is_noop());
        assert_eq!(second.pages, first.pages);
    }

    #[test]
    fn fresh_ids_skip_values_already_present_in_input() {
        let reused = Uuid::from_u128(1);
        let colliding = Uuid::from_u128(7);
        let ids = SequenceIdGenerator::new([reused, Uuid::from_u128(2)]);
        let mut reconciler = Reconciler::new(ids);

        let outcome = reconciler.run(vec![
            page_with(reused, "people", Vec::new()),
            page_with(colliding, "abstract", Vec::new()),
            page_with(colliding, "nature", Vec::new()),
        ]);

        assert_eq!(outcome.pages[2].id, Uuid::from_u128(2));
        assert_unique_ids(&outcome.pages);
    }

    #[test]
    fn semantic_option_merges_duplicates_with_different_ids() {
        let date_feature = feature("dup", 1);
        let mut twin = date_feature.clone();
        twin.id = Uuid::new_v4();
        let pages = vec![
            page_with(Uuid::new_v4(), "abstract", vec![date_feature]),
            page_with(Uuid::new_v4(), "abstract", vec![twin]),
        ];

        let default_run = reconcile(pages.clone());
        assert_eq!(default_run.pages.len(), 2);

        let options = ReconcileOptions {
            merge_semantic_duplicates: true,
        };
        let outcome = Reconciler::with_options(SequenceIdGenerator::default(), options).run(pages);
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].features.len(), 1);
        assert_eq!(outcome.report.merged_pages, 1);
        assert_eq!(outcome.report.collapsed_features, 1);
    }

    #[test]
    fn empty_input_stays_empty() {
        let outcome = reconcile(Vec::new());
        assert!(outcome.pages.is_empty());
        assert!(outcome.report.is_noop());
    }
}
