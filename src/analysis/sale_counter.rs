// src/analysis/sale_counter.rs
//
// Per-stream sale counting engine.
//
// Each frame:
//   1. Split detections into boxes (container) and pizzas (content)
//   2. Skip the frame unless both groups are present
//   3. Test every (box, pizza) pair in input order for strict containment
//   4. Credit a contained pair only if neither side is already credited
//
// Credits are permanent, so a pizza sitting in its box for hundreds of
// frames is one sale. First box in input order wins a pizza that fits in
// several boxes at once.

use super::association::AssociationTable;
use super::containment::contains;
use super::sales_ledger::{SaleRecord, SalesLedger};
use crate::types::{Config, Detection, LabelsConfig, TrackId, UntrackedPolicy};
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

/// How a contained (box, pizza) pair was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict {
    /// Neither side credited yet: a new sale
    New,
    /// The box already holds this exact pizza
    Stable,
    /// Box holds another pizza, or pizza is held by another box
    Conflict,
    /// A side has no track id and the policy is to ignore such pairs
    Untracked,
}

/// Per-frame summary returned by [`SaleCounter::ingest_frame_at`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Cumulative sales after this frame
    pub count: u64,
    /// Both classes were present, so pairs were evaluated
    pub evaluated: bool,
    pub contained_pairs: u32,
    pub new_sales: u32,
    pub stable_matches: u32,
    pub conflicts: u32,
    pub untracked_skipped: u32,
}

pub struct SaleCounter {
    container_label: String,
    content_label: String,
    untracked: UntrackedPolicy,
    associations: AssociationTable,
    ledger: SalesLedger,
}

impl SaleCounter {
    pub fn new(labels: &LabelsConfig, untracked: UntrackedPolicy) -> Self {
        Self {
            container_label: labels.container.trim().to_string(),
            content_label: labels.content.trim().to_string(),
            untracked,
            associations: AssociationTable::new(),
            ledger: SalesLedger::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.labels, config.association.untracked)
    }

    /// Feed one frame stamped with the local wall clock. Returns the
    /// cumulative sale count.
    pub fn ingest(&mut self, detections: &[Detection]) -> u64 {
        self.ingest_at(detections, Local::now().naive_local())
    }

    pub fn ingest_at(&mut self, detections: &[Detection], now: NaiveDateTime) -> u64 {
        self.ingest_frame_at(detections, now).count
    }

    pub fn ingest_frame_at(
        &mut self,
        detections: &[Detection],
        now: NaiveDateTime,
    ) -> FrameOutcome {
        let containers: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.label == self.container_label)
            .collect();
        let contents: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.label == self.content_label)
            .collect();

        let mut outcome = FrameOutcome {
            count: self.ledger.count(),
            ..Default::default()
        };

        if containers.is_empty() || contents.is_empty() {
            return outcome;
        }
        outcome.evaluated = true;

        // Untracked detections cannot be found in the table again, so within
        // a frame each detection takes part in at most one new sale.
        let mut claimed_containers = vec![false; containers.len()];
        let mut claimed_contents = vec![false; contents.len()];

        for (i, container) in containers.iter().enumerate() {
            for (j, content) in contents.iter().enumerate() {
                if !contains(&container.bbox, &content.bbox) {
                    continue;
                }
                outcome.contained_pairs += 1;

                let mut verdict = self.resolve(container.track_id, content.track_id);
                if verdict == PairVerdict::New && (claimed_containers[i] || claimed_contents[j]) {
                    verdict = PairVerdict::Conflict;
                }

                match verdict {
                    PairVerdict::New => {
                        self.associations
                            .insert(container.track_id, content.track_id);
                        let record = self
                            .ledger
                            .record(now, container.track_id, content.track_id);
                        info!(
                            "🍕 Sale #{}: box {} ← pizza {} at {} {}",
                            record.count,
                            fmt_id(container.track_id),
                            fmt_id(content.track_id),
                            record.date_string(),
                            record.time_string()
                        );
                        claimed_containers[i] = true;
                        claimed_contents[j] = true;
                        outcome.new_sales += 1;
                    }
                    PairVerdict::Stable => outcome.stable_matches += 1,
                    PairVerdict::Conflict => {
                        debug!(
                            "Conflicting match ignored: box {} / pizza {}",
                            fmt_id(container.track_id),
                            fmt_id(content.track_id)
                        );
                        outcome.conflicts += 1;
                    }
                    PairVerdict::Untracked => outcome.untracked_skipped += 1,
                }
            }
        }

        outcome.count = self.ledger.count();
        outcome
    }

    /// Decide what a contained pair means given the credits so far.
    pub fn resolve(
        &self,
        container_id: Option<TrackId>,
        content_id: Option<TrackId>,
    ) -> PairVerdict {
        match (container_id, content_id) {
            (Some(container), Some(content)) => match self.associations.content_of(container) {
                Some(Some(existing)) if existing == content => PairVerdict::Stable,
                Some(_) => PairVerdict::Conflict,
                None if self.associations.is_content_credited(content) => PairVerdict::Conflict,
                None => PairVerdict::New,
            },
            _ if self.untracked == UntrackedPolicy::Ignore => PairVerdict::Untracked,
            (Some(container), None) => {
                if self.associations.is_container_credited(container) {
                    PairVerdict::Conflict
                } else {
                    PairVerdict::New
                }
            }
            (None, Some(content)) => {
                if self.associations.is_content_credited(content) {
                    PairVerdict::Conflict
                } else {
                    PairVerdict::New
                }
            }
            (None, None) => PairVerdict::New,
        }
    }

    /// One-shot pop of the latest sale recorded since the previous drain.
    pub fn drain_new_event(&mut self) -> Option<SaleRecord> {
        self.ledger.drain_new_event()
    }

    pub fn count(&self) -> u64 {
        self.ledger.count()
    }

    pub fn associations(&self) -> &AssociationTable {
        &self.associations
    }

    pub fn history(&self) -> &[SaleRecord] {
        self.ledger.history()
    }
}

fn fmt_id(id: Option<TrackId>) -> String {
    id.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn boxed(x1: f32, y1: f32, x2: f32, y2: f32, id: Option<TrackId>) -> Detection {
        Detection::new("box", [x1, y1, x2, y2], id)
    }

    fn pizza(x1: f32, y1: f32, x2: f32, y2: f32, id: Option<TrackId>) -> Detection {
        Detection::new("pizza", [x1, y1, x2, y2], id)
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 7)
            .unwrap()
            .and_hms_opt(17, 5, 55)
            .unwrap()
    }

    fn counter(policy: UntrackedPolicy) -> SaleCounter {
        SaleCounter::new(&LabelsConfig::default(), policy)
    }

    #[test]
    fn test_box_pizza_scenario() {
        let mut counter = counter(UntrackedPolicy::Count);

        let frame1 = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, Some(20)),
        ];
        assert_eq!(counter.ingest_at(&frame1, now()), 1);
        let record = counter.drain_new_event().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.date_string(), "07/06/2025");
        assert_eq!(record.time_string(), "17:05:55");

        assert_eq!(counter.ingest_at(&frame1, now()), 1);
        assert!(counter.drain_new_event().is_none());

        let frame3 = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(60.0, 60.0, 90.0, 90.0, Some(21)),
        ];
        assert_eq!(counter.ingest_at(&frame3, now()), 1);
        assert!(counter.drain_new_event().is_none());
    }

    #[test]
    fn test_one_class_missing_is_skipped() {
        let mut counter = counter(UntrackedPolicy::Count);

        let only_boxes = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            boxed(200.0, 0.0, 300.0, 100.0, Some(11)),
        ];
        let outcome = counter.ingest_frame_at(&only_boxes, now());
        assert!(!outcome.evaluated);
        assert_eq!(outcome.count, 0);
        assert!(counter.drain_new_event().is_none());

        assert_eq!(counter.ingest_at(&[], now()), 0);
        assert!(counter.associations().is_empty());
    }

    #[test]
    fn test_same_pair_counted_once_over_many_frames() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
            pizza(10.0, 10.0, 90.0, 90.0, Some(2)),
        ];

        let mut drained = 0;
        for _ in 0..300 {
            counter.ingest_at(&frame, now());
            if counter.drain_new_event().is_some() {
                drained += 1;
            }
        }
        assert_eq!(counter.count(), 1);
        assert_eq!(drained, 1);
    }

    #[test]
    fn test_touching_edge_never_counts() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
            pizza(0.0, 10.0, 50.0, 50.0, Some(2)),
        ];
        assert_eq!(counter.ingest_at(&frame, now()), 0);
    }

    #[test]
    fn test_pizza_cannot_move_to_second_box() {
        let mut counter = counter(UntrackedPolicy::Count);
        counter.ingest_at(
            &[
                boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
                pizza(10.0, 10.0, 50.0, 50.0, Some(7)),
            ],
            now(),
        );
        counter.drain_new_event();

        let outcome = counter.ingest_frame_at(
            &[
                boxed(200.0, 0.0, 300.0, 100.0, Some(2)),
                pizza(210.0, 10.0, 250.0, 50.0, Some(7)),
            ],
            now(),
        );
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.conflicts, 1);
        assert!(!counter.associations().is_container_credited(2));
    }

    #[test]
    fn test_first_box_wins_overlapping_boxes() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
            boxed(5.0, 5.0, 95.0, 95.0, Some(2)),
            pizza(10.0, 10.0, 50.0, 50.0, Some(3)),
        ];

        let outcome = counter.ingest_frame_at(&frame, now());
        assert_eq!(outcome.new_sales, 1);
        assert_eq!(outcome.conflicts, 1);
        assert_eq!(counter.associations().container_of(3), Some(Some(1)));
    }

    #[test]
    fn test_several_sales_in_one_frame() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            pizza(10.0, 10.0, 50.0, 50.0, Some(20)),
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            boxed(200.0, 0.0, 300.0, 100.0, Some(11)),
            pizza(210.0, 10.0, 250.0, 50.0, Some(21)),
        ];

        assert_eq!(counter.ingest_at(&frame, now()), 2);
        let record = counter.drain_new_event().unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.container_id, Some(11));
        assert!(counter.drain_new_event().is_none());
        assert_eq!(counter.history().len(), 2);
    }

    #[test]
    fn test_other_classes_ignored() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            Detection::new("person", [0.0, 0.0, 500.0, 500.0], Some(99)),
            boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
            Detection::new("cup", [10.0, 10.0, 20.0, 20.0], Some(98)),
        ];
        let outcome = counter.ingest_frame_at(&frame, now());
        assert!(!outcome.evaluated);
        assert_eq!(outcome.count, 0);
    }

    #[test]
    fn test_count_is_monotonic() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frames = vec![
            vec![boxed(0.0, 0.0, 100.0, 100.0, Some(1))],
            vec![
                boxed(0.0, 0.0, 100.0, 100.0, Some(1)),
                pizza(10.0, 10.0, 50.0, 50.0, Some(2)),
            ],
            vec![pizza(10.0, 10.0, 50.0, 50.0, Some(2))],
            vec![
                boxed(0.0, 0.0, 100.0, 100.0, Some(3)),
                pizza(10.0, 10.0, 50.0, 50.0, Some(2)),
            ],
            vec![
                boxed(0.0, 0.0, 100.0, 100.0, Some(3)),
                pizza(10.0, 10.0, 50.0, 50.0, Some(4)),
            ],
            vec![],
        ];

        let mut last = 0;
        for frame in &frames {
            let count = counter.ingest_at(frame, now());
            assert!(count >= last);
            last = count;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_untracked_pizza_credits_tracked_box_once() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, None),
        ];

        assert_eq!(counter.ingest_at(&frame, now()), 1);
        assert_eq!(counter.ingest_at(&frame, now()), 1);
        assert_eq!(counter.associations().content_of(10), Some(None));
    }

    #[test]
    fn test_credited_box_ignores_later_tracked_pizza() {
        let mut counter = counter(UntrackedPolicy::Count);
        let first = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, None),
        ];
        let second = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, Some(20)),
        ];

        assert_eq!(counter.ingest_at(&first, now()), 1);
        let outcome = counter.ingest_frame_at(&second, now());
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.conflicts, 1);
        assert_eq!(counter.associations().content_of(10), Some(None));
        assert!(!counter.associations().is_content_credited(20));
    }

    #[test]
    fn test_untracked_pair_counts_every_frame() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, None),
            pizza(10.0, 10.0, 50.0, 50.0, None),
        ];

        assert_eq!(counter.ingest_at(&frame, now()), 1);
        assert_eq!(counter.ingest_at(&frame, now()), 2);
        assert!(counter.associations().is_empty());
    }

    #[test]
    fn test_untracked_pizza_in_two_boxes_counts_once_per_frame() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, None),
            boxed(5.0, 5.0, 95.0, 95.0, None),
            pizza(10.0, 10.0, 50.0, 50.0, None),
        ];

        let outcome = counter.ingest_frame_at(&frame, now());
        assert_eq!(outcome.new_sales, 1);
        assert_eq!(outcome.conflicts, 1);
    }

    #[test]
    fn test_ignore_policy_skips_untracked_pairs() {
        let mut counter = counter(UntrackedPolicy::Ignore);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, None),
            boxed(200.0, 0.0, 300.0, 100.0, None),
            pizza(210.0, 10.0, 250.0, 50.0, Some(21)),
        ];

        let outcome = counter.ingest_frame_at(&frame, now());
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.untracked_skipped, 2);
        assert!(counter.drain_new_event().is_none());
    }

    #[test]
    fn test_non_finite_box_does_not_abort_frame() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(f32::NAN, 0.0, 100.0, 100.0, Some(1)),
            boxed(200.0, 0.0, 300.0, 100.0, Some(2)),
            pizza(210.0, 10.0, 250.0, 50.0, Some(3)),
        ];
        assert_eq!(counter.ingest_at(&frame, now()), 1);
        assert_eq!(counter.associations().content_of(2), Some(Some(3)));
    }

    #[test]
    fn test_ingest_uses_wall_clock() {
        let mut counter = counter(UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, Some(20)),
        ];

        let before = Local::now().naive_local();
        assert_eq!(counter.ingest(&frame), 1);
        let record = counter.drain_new_event().unwrap();
        assert_eq!(record.count, 1);
        assert!(record.recorded_at >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_labels_are_trimmed() {
        let labels = LabelsConfig {
            container: " box ".to_string(),
            content: "pizza\n".to_string(),
        };
        let mut counter = SaleCounter::new(&labels, UntrackedPolicy::Count);
        let frame = vec![
            boxed(0.0, 0.0, 100.0, 100.0, Some(10)),
            pizza(10.0, 10.0, 50.0, 50.0, Some(20)),
        ];
        assert_eq!(counter.ingest_at(&frame, now()), 1);
    }
}
