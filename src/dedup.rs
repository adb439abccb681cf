use log::debug;

use std::cmp::Ordering;

use crate::geometry::{ iou, BBox };

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;

/// What decides which box of an overlapping cluster survives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankKey {
    /// largest box wins, whatever the detector thought of it
    Area,
    Confidence,
    /// `(1 - w) * area / max_area + w * confidence`
    Weighted { confidence_weight: f32 },
}

impl Default for RankKey {
    fn default() -> Self {
        RankKey::Area
    }
}

impl RankKey {

    fn scores(&self, boxes: &[BBox]) -> Vec<f32> {
        match *self {
            RankKey::Area => boxes.iter().map(BBox::area).collect(),
            RankKey::Confidence => boxes.iter().map(|b| b.confidence).collect(),
            RankKey::Weighted { confidence_weight } => {
                let w = confidence_weight.max(0.0).min(1.0);
                let max_area = boxes.iter().map(BBox::area).fold(0.0, f32::max);
                boxes.iter().map(|b| {
                    let area = if max_area > 0.0 { b.area() / max_area } else { 0.0 };
                    (1.0 - w) * area + w * b.confidence
                }).collect()
            }
        }
    }
}

/// Greedy suppression of overlapping detector proposals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    pub iou_threshold: f32,
    pub rank: RankKey,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self { iou_threshold: DEFAULT_IOU_THRESHOLD, rank: RankKey::Area }
    }
}

impl Deduplicator {

    pub fn new(iou_threshold: f32, rank: RankKey) -> Self {
        Self { iou_threshold, rank }
    }

    /// Returns the kept boxes in the order they were selected.
    ///
    /// Candidates are visited best-first by the rank key; ties keep input order.
    /// Every remaining candidate whose IoU with a kept box reaches the threshold
    /// is dropped.
    pub fn deduplicate(&self, boxes: &[BBox]) -> Vec<BBox> {
        if boxes.is_empty() {
            return Vec::new();
        }

        let scores = self.rank.scores(boxes);
        let mut idxs: Vec<usize> = (0..boxes.len()).collect();
        // sort_by is stable, so equal scores stay first-seen first
        idxs.sort_by(|a, b| scores[*b].partial_cmp(&scores[*a]).unwrap_or(Ordering::Equal));

        let mut keep = Vec::new();
        let mut remaining = idxs;
        while !remaining.is_empty() {
            let best = boxes[remaining[0]];
            keep.push(best);
            remaining = remaining[1..].iter()
                .copied()
                .filter(|j| iou(&best, &boxes[*j]) < self.iou_threshold)
                .collect();
        }
        debug!("dedup kept {} of {} proposals ({:?})", keep.len(), boxes.len(), self.rank);
        keep
    }
}

/// Area-ranked deduplication.
pub fn deduplicate(boxes: &[BBox], iou_threshold: f32) -> Vec<BBox> {
    Deduplicator::new(iou_threshold, RankKey::Area).deduplicate(boxes)
}

#[cfg(test)]
mod test {

    use super::{ deduplicate, Deduplicator, RankKey, DEFAULT_IOU_THRESHOLD };
    use crate::geometry::{ iou, BBox };

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> BBox {
        BBox::new(x1, y1, x2, y2, confidence, 0)
    }

    fn cluttered() -> Vec<BBox> {
        vec![
            bbox(12.0, 10.0, 88.0, 40.0, 0.95),
            bbox(0.0, 0.0, 100.0, 50.0, 0.41),
            bbox(5.0, 2.0, 95.0, 45.0, 0.70),
            bbox(300.0, 300.0, 380.0, 330.0, 0.88),
            bbox(305.0, 298.0, 379.0, 331.0, 0.91),
            bbox(600.0, 20.0, 610.0, 30.0, 0.30),
        ]
    }

    #[test]
    fn empty_input() {
        assert!(deduplicate(&[], DEFAULT_IOU_THRESHOLD).is_empty());
    }

    #[test]
    fn nested_box_is_suppressed() {
        let outer = bbox(0.0, 0.0, 100.0, 100.0, 0.5);
        let inner = bbox(10.0, 10.0, 90.0, 90.0, 0.99);
        let kept = deduplicate(&[inner, outer], 0.4);
        assert_eq!(kept, vec![outer]);
    }

    #[test]
    fn disjoint_boxes_survive() {
        let a = bbox(0.0, 0.0, 50.0, 50.0, 0.5);
        let b = bbox(200.0, 200.0, 250.0, 250.0, 0.5);
        assert_eq!(deduplicate(&[a, b], 0.4), vec![a, b]);
    }

    #[test]
    fn kept_order_is_by_area() {
        let small = bbox(0.0, 0.0, 10.0, 10.0, 0.9);
        let big = bbox(100.0, 100.0, 200.0, 200.0, 0.1);
        assert_eq!(deduplicate(&[small, big], 0.4), vec![big, small]);
    }

    #[test]
    fn equal_area_keeps_first_seen() {
        let first = bbox(0.0, 0.0, 100.0, 100.0, 0.2);
        let second = bbox(10.0, 0.0, 110.0, 100.0, 0.9);
        assert_eq!(deduplicate(&[first, second], 0.4), vec![first]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = bbox(0.0, 0.0, 100.0, 100.0, 0.5);
        let b = bbox(50.0, 0.0, 150.0, 100.0, 0.5);
        // iou is a hair under 1/3
        assert_eq!(deduplicate(&[a, b], 0.3).len(), 1);
        assert_eq!(deduplicate(&[a, b], 0.34).len(), 2);
    }

    #[test]
    fn dedup_is_idempotent_and_keeps_largest() {
        let boxes = cluttered();
        let once = deduplicate(&boxes, 0.4);
        let twice = deduplicate(&once, 0.4);
        assert_eq!(once, twice);
        assert!(once.len() <= boxes.len());
        assert_eq!(once[0], boxes[1]);
        assert_eq!(once.len(), 3);
    }

    // xorshift, enough to scatter boxes reproducibly
    fn next(state: &mut u32) -> f32 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        (*state % 10_000) as f32 / 10_000.0
    }

    fn generated_set(state: &mut u32) -> Vec<BBox> {
        let count = (next(state) * 12.0) as usize;
        (0..count).map(|_| {
            let x1 = next(state) * 200.0;
            let y1 = next(state) * 200.0;
            let w = next(state) * 80.0;
            let h = next(state) * 40.0;
            bbox(x1, y1, x1 + w, y1 + h, next(state))
        }).collect()
    }

    #[test]
    fn generated_sets_hold_dedup_properties() {
        let mut state = 0x2545_f491;
        for _ in 0..500 {
            let boxes = generated_set(&mut state);
            for rank in &[RankKey::Area, RankKey::Confidence, RankKey::Weighted { confidence_weight: 0.5 }] {
                let dedup = Deduplicator::new(DEFAULT_IOU_THRESHOLD, *rank);
                let once = dedup.deduplicate(&boxes);
                assert!(once.len() <= boxes.len());
                let twice = dedup.deduplicate(&once);
                // weighted scores are relative to the set's largest area, so only membership is stable
                assert_eq!(twice.len(), once.len(), "not idempotent for {:?}", boxes);
                assert!(twice.iter().all(|b| once.contains(b)));
                if *rank != (RankKey::Weighted { confidence_weight: 0.5 }) {
                    assert_eq!(twice, once);
                }
            }

            let kept = deduplicate(&boxes, DEFAULT_IOU_THRESHOLD);
            if let Some(largest) = boxes.iter().fold(None, |best: Option<&BBox>, b| match best {
                Some(prev) if prev.area() >= b.area() => Some(prev),
                _ => Some(b),
            }) {
                assert_eq!(kept[0], *largest);
            }
            for a in &boxes {
                for b in &boxes {
                    assert_eq!(iou(a, b), iou(b, a));
                }
            }
        }
    }

    #[test]
    fn confidence_rank_prefers_confident_box() {
        let dedup = Deduplicator::new(0.4, RankKey::Confidence);
        let kept = dedup.deduplicate(&cluttered());
        assert_eq!(kept[0], cluttered()[0]);
        assert_eq!(kept[1], cluttered()[4]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn weighted_rank_blends_area_and_confidence() {
        let big_unsure = bbox(0.0, 0.0, 100.0, 50.0, 0.1);
        let small_sure = bbox(5.0, 5.0, 95.0, 45.0, 0.99);
        let boxes = [big_unsure, small_sure];
        // small_sure has 72% of the area
        let area_leaning = Deduplicator::new(0.4, RankKey::Weighted { confidence_weight: 0.1 });
        assert_eq!(area_leaning.deduplicate(&boxes), vec![big_unsure]);
        let confidence_leaning = Deduplicator::new(0.4, RankKey::Weighted { confidence_weight: 0.9 });
        assert_eq!(confidence_leaning.deduplicate(&boxes), vec![small_sure]);
    }

    #[test]
    fn class_id_passes_through() {
        let plate = BBox::new(0.0, 0.0, 10.0, 10.0, 0.8, 7);
        assert_eq!(deduplicate(&[plate], 0.4)[0].class_id, 7);
    }
}
