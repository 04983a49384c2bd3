// THEORY:
// The region detector is the engine of the spatial grouping stage. It turns the
// binary mask from the color segmenter into at most one `TargetBox`.
//
// Algorithm:
// 1.  **Outside flood**: every background pixel reachable from the image border is
//     marked "outside". Background uses the complementary connectivity of the
//     foreground (8-connected objects, 4-connected background, or the reverse), so
//     a diagonal gap never lets the outside leak into an object's hole.
// 2.  **Filled growing**: whatever is not outside is a filled object: the foreground
//     plus any holes (and anything nested inside those holes). A raster scan seeds
//     a stack-based flood fill at every unlabeled filled pixel. Each fill is exactly
//     one outer boundary, which is all we care about; interior structure is ignored.
// 3.  **Border following**: starting from the fill's first pixel in raster order,
//     the outer border is walked pixel centre to pixel centre until the walk returns
//     to its first step. The enclosed polygon area (shoelace) is the region's area,
//     so a solid w x h block measures (w - 1)(h - 1) and a one pixel wide line
//     measures zero.
// 4.  **Selection**: the largest area wins, ties going to the first region found in
//     scan order. A zero area or one below the minimum means there is no target.
//
// Like every other per-frame stage it is a stateless utility. All scratch buffers
// are local to a call and dropped before it returns.

use crate::core_modules::color_segmenter::Mask;
use crate::core_modules::region::{Region, TargetBox};
use serde::{Deserialize, Serialize};

/// Which neighbors make two foreground pixels part of the same region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Connectivity::Four => &[(0, 1), (0, -1), (1, 0), (-1, 0)],
            Connectivity::Eight => &[
                (0, 1),
                (0, -1),
                (1, 0),
                (-1, 0),
                (1, 1),
                (1, -1),
                (-1, 1),
                (-1, -1),
            ],
        }
    }

    /// Neighbor ring in counterclockwise screen order, starting east.
    fn ring(self) -> &'static [(i32, i32)] {
        match self {
            Connectivity::Four => &[(1, 0), (0, -1), (-1, 0), (0, 1)],
            Connectivity::Eight => &[
                (1, 0),
                (1, -1),
                (0, -1),
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
        }
    }

    fn complement(self) -> Self {
        match self {
            Connectivity::Four => Connectivity::Eight,
            Connectivity::Eight => Connectivity::Four,
        }
    }
}

/// Thresholds the selector applies to the regions of a single mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorParams {
    pub min_area: f64,
    pub connectivity: Connectivity,
}

pub mod region_detector {
    use super::*;

    /// Extracts every externally connected region of `mask`, in raster scan order
    /// of their first pixel.
    pub fn find_regions(mask: &Mask, connectivity: Connectivity) -> Vec<Region> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let outside = flood_outside(mask, connectivity.complement());
        // 0 is unlabeled, region `id` is stored as `id + 1`.
        let mut labels = vec![0usize; width * height];
        let mut regions = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                if outside[index] || labels[index] != 0 {
                    continue;
                }
                let region = grow_region(
                    mask,
                    (x, y),
                    &outside,
                    &mut labels,
                    connectivity,
                    regions.len(),
                );
                regions.push(region);
            }
        }

        regions
    }

    /// Picks the single target for this frame, or `None`.
    pub fn select_target(mask: &Mask, params: &SelectorParams) -> Option<TargetBox> {
        let regions = find_regions(mask, params.connectivity);
        select_largest(&regions, params.min_area).map(|region| region.bounding_box)
    }

    /// The largest region by area, first-found on ties, if it reaches `min_area`.
    pub fn select_largest(regions: &[Region], min_area: f64) -> Option<&Region> {
        let mut best: Option<&Region> = None;
        for region in regions {
            if best.is_none_or(|b| region.area > b.area) {
                best = Some(region);
            }
        }
        best.filter(|region| {
            region.area > 0.0
                && region.area >= min_area
                && region.bounding_box.width > 0
                && region.bounding_box.height > 0
        })
    }

    /// Polygon area enclosed by a closed chain of pixel centres.
    pub fn shoelace_area(contour: &[(usize, usize)]) -> f64 {
        let n = contour.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = contour[i];
                let (x1, y1) = contour[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();
        twice.unsigned_abs() as f64 / 2.0
    }

    /// Marks every background pixel connected to the image border.
    fn flood_outside(mask: &Mask, background: Connectivity) -> Vec<bool> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let mut outside = vec![false; width * height];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        let seed =
            |x: usize, y: usize, outside: &mut Vec<bool>, stack: &mut Vec<(usize, usize)>| {
                let index = y * width + x;
                if !outside[index] && !mask.is_set(x as u32, y as u32) {
                    outside[index] = true;
                    stack.push((x, y));
                }
            };
        for x in 0..width {
            seed(x, 0, &mut outside, &mut stack);
            seed(x, height - 1, &mut outside, &mut stack);
        }
        for y in 0..height {
            seed(0, y, &mut outside, &mut stack);
            seed(width - 1, y, &mut outside, &mut stack);
        }

        while let Some((x, y)) = stack.pop() {
            for &(dx, dy) in background.offsets() {
                let Some((nx, ny)) = neighbor(x, y, dx, dy, width, height) else {
                    continue;
                };
                let index = ny * width + nx;
                if !outside[index] && !mask.is_set(nx as u32, ny as u32) {
                    outside[index] = true;
                    stack.push((nx, ny));
                }
            }
        }

        outside
    }

    /// Flood-fills one filled region from `seed` and aggregates it.
    fn grow_region(
        mask: &Mask,
        seed: (usize, usize),
        outside: &[bool],
        labels: &mut [usize],
        connectivity: Connectivity,
        id: usize,
    ) -> Region {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let label = id + 1;
        let mut stack = vec![seed];
        labels[seed.1 * width + seed.0] = label;

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut foreground_pixels = 0u64;

        while let Some((x, y)) = stack.pop() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            if mask.is_set(x as u32, y as u32) {
                foreground_pixels += 1;
            }

            for &(dx, dy) in connectivity.offsets() {
                let Some((nx, ny)) = neighbor(x, y, dx, dy, width, height) else {
                    continue;
                };
                let index = ny * width + nx;
                if labels[index] == 0 && !outside[index] {
                    labels[index] = label;
                    stack.push((nx, ny));
                }
            }
        }

        let contour = trace_outer_border(labels, width, height, seed, label, connectivity);

        Region {
            id,
            bounding_box: TargetBox::new(
                min_x as u32,
                min_y as u32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ),
            area: shoelace_area(&contour),
            foreground_pixels,
        }
    }

    /// Walks the outer border of the region labeled `label`, starting at its first
    /// pixel in raster order. Returns the visited pixel centres in walk order; pixels
    /// on one pixel wide spurs appear once per pass.
    fn trace_outer_border(
        labels: &[usize],
        width: usize,
        height: usize,
        start: (usize, usize),
        label: usize,
        connectivity: Connectivity,
    ) -> Vec<(usize, usize)> {
        let ring = connectivity.ring();
        let n = ring.len();
        let member = |(x, y): (usize, usize), dir: usize| {
            let (dx, dy) = ring[dir % n];
            neighbor(x, y, dx, dy, width, height)
                .filter(|&(nx, ny)| labels[ny * width + nx] == label)
        };
        let direction_to = |from: (usize, usize), to: (usize, usize)| {
            let step = (to.0 as i64 - from.0 as i64, to.1 as i64 - from.1 as i64);
            ring.iter()
                .position(|&(dx, dy)| (dx as i64, dy as i64) == step)
                .unwrap_or(0)
        };

        // The pixel west of `start` is never part of the region, so search clockwise
        // from west for the first step of the walk.
        let west = n / 2;
        let Some(first) = (0..n).find_map(|k| member(start, west + n - k)) else {
            return vec![start];
        };

        let mut contour = Vec::new();
        let (mut previous, mut current) = (first, start);
        loop {
            let back = direction_to(current, previous);
            let next = (1..=n)
                .find_map(|k| member(current, back + k))
                .unwrap_or(previous);
            contour.push(current);
            if next == start && current == first {
                break;
            }
            previous = current;
            current = next;
        }
        contour
    }

    #[inline]
    fn neighbor(
        x: usize,
        y: usize,
        dx: i32,
        dy: i32,
        width: usize,
        height: usize,
    ) -> Option<(usize, usize)> {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        (nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64)
            .then_some((nx as usize, ny as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::region_detector::*;
    use super::*;

    fn params(min_area: f64) -> SelectorParams {
        SelectorParams {
            min_area,
            connectivity: Connectivity::Eight,
        }
    }

    fn region(id: usize, area: f64, bounding_box: TargetBox) -> Region {
        Region {
            id,
            bounding_box,
            area,
            foreground_pixels: area as u64,
        }
    }

    #[test]
    fn empty_mask_has_no_target() {
        let mask = Mask::new(64, 48);
        assert!(find_regions(&mask, Connectivity::Eight).is_empty());
        assert_eq!(select_target(&mask, &params(1.0)), None);
    }

    #[test]
    fn zero_sized_mask_is_handled() {
        let mask = Mask::new(0, 0);
        assert!(find_regions(&mask, Connectivity::Eight).is_empty());
    }

    #[test]
    fn single_square_reports_tight_box_and_area() {
        let mut mask = Mask::new(200, 200);
        mask.fill_rect(100, 100, 40, 40);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bounding_box, TargetBox::new(100, 100, 40, 40));
        // Border runs through pixel centres: 39 x 39.
        assert_eq!(regions[0].area, 1521.0);
        assert_eq!(regions[0].foreground_pixels, 1600);
        assert_eq!(
            select_target(&mask, &params(400.0)),
            Some(TargetBox::new(100, 100, 40, 40))
        );
    }

    #[test]
    fn below_threshold_region_is_no_target() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(10, 10, 15, 20); // 300 px
        assert_eq!(select_target(&mask, &params(400.0)), None);
    }

    #[test]
    fn area_exactly_at_threshold_qualifies() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(10, 10, 21, 21);
        assert_eq!(find_regions(&mask, Connectivity::Eight)[0].area, 400.0);
        assert!(select_target(&mask, &params(400.0)).is_some());
    }

    #[test]
    fn twenty_pixel_square_falls_short_of_threshold() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(10, 10, 20, 20);
        assert_eq!(find_regions(&mask, Connectivity::Eight)[0].area, 361.0);
        assert_eq!(select_target(&mask, &params(400.0)), None);
    }

    #[test]
    fn thin_line_has_zero_area_and_never_locks() {
        let mut mask = Mask::new(600, 100);
        mask.fill_rect(10, 50, 500, 1);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 0.0);
        assert_eq!(regions[0].foreground_pixels, 500);
        assert_eq!(select_target(&mask, &params(400.0)), None);
        assert_eq!(select_target(&mask, &params(0.0)), None);
    }

    #[test]
    fn single_pixel_and_diagonal_line_are_degenerate() {
        let mut mask = Mask::new(40, 40);
        mask.set(3, 3, true);
        for i in 10..30 {
            mask.set(i, i, true);
        }
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|region| region.area == 0.0));
        assert_eq!(select_largest(&regions, 0.0), None);
    }

    #[test]
    fn staircase_edge_gives_half_pixel_area() {
        // Two rows offset by one: the border cuts a triangle off each end.
        let mut mask = Mask::new(20, 20);
        mask.fill_rect(5, 5, 4, 1);
        mask.fill_rect(6, 6, 4, 1);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3.0);
    }

    #[test]
    fn four_connected_border_is_traced_the_same_way() {
        let mut mask = Mask::new(30, 30);
        mask.fill_rect(5, 5, 10, 6);
        let regions = find_regions(&mask, Connectivity::Four);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 45.0);
    }

    #[test]
    fn largest_region_wins_and_smaller_are_ignored() {
        let mut mask = Mask::new(300, 200);
        mask.fill_rect(5, 5, 25, 25);
        mask.fill_rect(150, 100, 40, 40);
        mask.fill_rect(250, 10, 10, 10);
        assert_eq!(
            select_target(&mask, &params(400.0)),
            Some(TargetBox::new(150, 100, 40, 40))
        );
    }

    #[test]
    fn ties_go_to_first_region_in_scan_order() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(60, 60, 10, 10);
        mask.fill_rect(5, 70, 10, 10);
        mask.fill_rect(40, 5, 10, 10);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 3);
        let best = select_largest(&regions, 1.0).unwrap();
        assert_eq!(best.bounding_box, TargetBox::new(40, 5, 10, 10));
    }

    #[test]
    fn selection_uses_area_not_box_size() {
        let regions = vec![
            region(0, 300.0, TargetBox::new(0, 0, 100, 100)),
            region(1, 500.0, TargetBox::new(100, 100, 40, 40)),
        ];
        let best = select_largest(&regions, 400.0).unwrap();
        assert_eq!(best.bounding_box.center().x, 120.0);
        assert_eq!(select_largest(&regions[..1], 400.0), None);
    }

    #[test]
    fn holes_count_towards_area() {
        let mut mask = Mask::new(50, 50);
        mask.fill_rect(10, 10, 20, 20);
        for y in 15..25 {
            for x in 15..25 {
                mask.set(x, y, false);
            }
        }
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 361.0);
        assert_eq!(regions[0].foreground_pixels, 300);
    }

    #[test]
    fn islands_inside_holes_are_not_separate_regions() {
        let mut mask = Mask::new(60, 60);
        mask.fill_rect(10, 10, 30, 30);
        for y in 14..36 {
            for x in 14..36 {
                mask.set(x, y, false);
            }
        }
        mask.fill_rect(20, 20, 5, 5);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 841.0);
    }

    #[test]
    fn diagonal_touch_joins_only_under_eight_connectivity() {
        let mut mask = Mask::new(20, 20);
        mask.fill_rect(2, 2, 3, 3);
        mask.fill_rect(5, 5, 3, 3);
        assert_eq!(find_regions(&mask, Connectivity::Eight).len(), 1);
        assert_eq!(find_regions(&mask, Connectivity::Four).len(), 2);
    }

    #[test]
    fn regions_touching_the_border_are_found() {
        let mut mask = Mask::new(30, 30);
        mask.fill_rect(0, 0, 30, 5);
        let regions = find_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bounding_box, TargetBox::new(0, 0, 30, 5));
    }
}
