//! Scripted observer movement.

/// A polyline the observer follows at constant speed.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverPath {
    waypoints: Vec<[f32; 2]>,
    /// Distance covered per frame.
    speed: f32,
    /// Cumulative distance at each waypoint.
    distances: Vec<f32>,
}

impl ObserverPath {
    /// Creates a path through `waypoints` (`[x, z]`) covering `speed` units
    /// per frame.
    ///
    /// An empty waypoint list keeps the observer at the origin. A
    /// non-positive speed keeps it at the first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<[f32; 2]>, speed: f32) -> Self {
        let waypoints = if waypoints.is_empty() {
            vec![[0.0, 0.0]]
        } else {
            waypoints
        };

        let mut distances = Vec::with_capacity(waypoints.len());
        let mut total = 0.0;
        distances.push(total);
        for pair in waypoints.windows(2) {
            total += distance(pair[0], pair[1]);
            distances.push(total);
        }

        Self {
            waypoints,
            speed: speed.max(0.0),
            distances,
        }
    }

    /// Straight line from `start` to `end`.
    #[must_use]
    pub fn line(start: [f32; 2], end: [f32; 2], speed: f32) -> Self {
        Self::new(vec![start, end], speed)
    }

    /// Square spiral around `center` whose legs grow by `step` each turn.
    #[must_use]
    pub fn spiral(center: [f32; 2], step: f32, turns: usize, speed: f32) -> Self {
        const DIRECTIONS: [[f32; 2]; 4] = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];

        let mut waypoints = Vec::with_capacity(turns + 1);
        let mut point = center;
        waypoints.push(point);
        for turn in 0..turns {
            let [dx, dz] = DIRECTIONS[turn % 4];
            let length = step * (turn + 1) as f32;
            point = [point[0] + dx * length, point[1] + dz * length];
            waypoints.push(point);
        }
        Self::new(waypoints, speed)
    }

    /// Returns the waypoints.
    #[must_use]
    pub fn waypoints(&self) -> &[[f32; 2]] {
        &self.waypoints
    }

    /// Returns the total length of the path.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    /// Returns how many frames it takes to reach the end, including frame 0.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        if self.speed <= 0.0 {
            return 1;
        }
        (self.length() / self.speed).ceil() as usize + 1
    }

    /// Returns the observer position at `frame`. Past the end the observer
    /// stays on the last waypoint.
    #[must_use]
    pub fn position_at(&self, frame: usize) -> [f32; 2] {
        let travelled = (frame as f32 * self.speed).min(self.length());

        // First segment whose end lies at or past the travelled distance.
        let segment = self
            .distances
            .iter()
            .skip(1)
            .position(|&d| d >= travelled)
            .unwrap_or(0);

        let start = self.waypoints[segment];
        let Some(&end) = self.waypoints.get(segment + 1) else {
            return start;
        };

        let span = self.distances[segment + 1] - self.distances[segment];
        if span <= f32::EPSILON {
            return end;
        }
        let t = (travelled - self.distances[segment]) / span;
        [
            start[0] + (end[0] - start[0]) * t,
            start[1] + (end[1] - start[1]) * t,
        ]
    }

    /// Iterates over every frame's position from start to end.
    pub fn positions(&self) -> impl Iterator<Item = [f32; 2]> + '_ {
        (0..self.frame_count()).map(|frame| self.position_at(frame))
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}
