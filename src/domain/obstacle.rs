//! Axis-aligned rectangular obstacles making up a maze.

use thiserror::Error;

use super::Position;

/// Which build-time rule created an obstacle. Both kinds behave identically otherwise.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ObstacleKind {
    /// Small square at a lattice corner; always physically present.
    Post,
    /// Rectangle along a lattice edge; hidden where the maze has an open passage.
    Wall,
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Obstacle {
    kind: ObstacleKind,
    center: Position,
    horizontal_size: f64,
    vertical_size: f64,
    corners: Corners,
    visible: bool,
}

impl Obstacle {
    /// Create a hidden obstacle of `horizontal_size` × `vertical_size` around `center`.
    pub fn new(
        kind: ObstacleKind,
        center: Position,
        horizontal_size: f64,
        vertical_size: f64,
    ) -> Self {
        Self {
            kind,
            center,
            horizontal_size,
            vertical_size,
            corners: Corners::new(center, horizontal_size, vertical_size),
            visible: false,
        }
    }

    pub fn post(center: Position, size: f64) -> Self {
        Self::new(ObstacleKind::Post, center, size, size)
    }

    pub fn wall(center: Position, horizontal_size: f64, vertical_size: f64) -> Self {
        Self::new(ObstacleKind::Wall, center, horizontal_size, vertical_size)
    }

    pub fn kind(&self) -> ObstacleKind {
        self.kind
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn horizontal_size(&self) -> f64 {
        self.horizontal_size
    }

    pub fn vertical_size(&self) -> f64 {
        self.vertical_size
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self) {
        self.set_visibility(true);
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Move the obstacle, keeping its size. Holders of the obstacle are not notified.
    pub fn set_center(&mut self, center: Position) {
        self.center = center;
        self.corners = Corners::new(center, self.horizontal_size, self.vertical_size);
    }

    /// Swap the horizontal and vertical extents around the obstacle's own center.
    pub fn switch_sides(&mut self) -> Result<(), ObstacleError> {
        if self.kind != ObstacleKind::Wall {
            return Err(ObstacleError::NotAWall(self.kind));
        }
        std::mem::swap(&mut self.horizontal_size, &mut self.vertical_size);
        self.corners = Corners::new(self.center, self.horizontal_size, self.vertical_size);
        Ok(())
    }

    pub fn upper_left_corner(&self) -> Position {
        self.corners.upper_left
    }

    pub fn upper_right_corner(&self) -> Position {
        self.corners.upper_right
    }

    pub fn lower_left_corner(&self) -> Position {
        self.corners.lower_left
    }

    pub fn lower_right_corner(&self) -> Position {
        self.corners.lower_right
    }

    /// Inclusive point-in-rectangle test.
    pub fn check_overlap(&self, position: Position) -> bool {
        position.x() >= self.corners.upper_left.x()
            && position.x() <= self.corners.upper_right.x()
            && position.y() >= self.corners.lower_left.y()
            && position.y() <= self.corners.upper_left.y()
    }

    /// Boundary segments in the order left, top, right, bottom.
    pub fn edges(&self) -> [LineSegment; 4] {
        let Corners {
            upper_left,
            upper_right,
            lower_left,
            lower_right,
        } = self.corners;
        [
            LineSegment::new(lower_left, upper_left),
            LineSegment::new(upper_left, upper_right),
            LineSegment::new(upper_right, lower_right),
            LineSegment::new(lower_right, lower_left),
        ]
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ObstacleError {
    #[error("only walls can switch sides, got {0:?}")]
    NotAWall(ObstacleKind),
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
struct Corners {
    upper_left: Position,
    upper_right: Position,
    lower_left: Position,
    lower_right: Position,
}

impl Corners {
    fn new(center: Position, horizontal_size: f64, vertical_size: f64) -> Self {
        let (h, v) = (horizontal_size / 2.0, vertical_size / 2.0);
        Self {
            upper_left: Position::new(center.x() - h, center.y() + v),
            upper_right: Position::new(center.x() + h, center.y() + v),
            lower_left: Position::new(center.x() - h, center.y() - v),
            lower_right: Position::new(center.x() + h, center.y() - v),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LineSegment {
    p1: Position,
    p2: Position,
}

impl LineSegment {
    pub fn new(p1: Position, p2: Position) -> Self {
        Self { p1, p2 }
    }

    pub fn start(&self) -> Position {
        self.p1
    }

    pub fn end(&self) -> Position {
        self.p2
    }

    pub fn direction(&self) -> Position {
        self.p2 - self.p1
    }

    pub fn midpoint(&self) -> Position {
        (self.p1 + self.p2) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_obstacle_is_hidden_on_construction() {
        let post = Obstacle::post(Position::new(100.0, 100.0), 12.0);
        assert!(!post.is_visible());
        assert_eq!(post.kind(), ObstacleKind::Post);
    }

    #[test]
    fn test_obstacle_visibility_toggle() {
        let mut wall = Obstacle::wall(Position::new(0.0, 0.0), 166.0, 12.0);
        wall.set_visible();
        assert!(wall.is_visible());
        wall.set_visibility(false);
        assert!(!wall.is_visible());
    }

    #[test]
    fn test_obstacle_corners() {
        let wall = Obstacle::wall(Position::new(200.0, 100.0), 160.0, 12.0);
        assert_abs_diff_eq!(wall.upper_left_corner(), Position::new(120.0, 106.0));
        assert_abs_diff_eq!(wall.upper_right_corner(), Position::new(280.0, 106.0));
        assert_abs_diff_eq!(wall.lower_left_corner(), Position::new(120.0, 94.0));
        assert_abs_diff_eq!(wall.lower_right_corner(), Position::new(280.0, 94.0));
    }

    #[test]
    fn test_obstacle_set_center() {
        let mut post = Obstacle::post(Position::new(0.0, 0.0), 10.0);
        post.set_center(Position::new(50.0, -20.0));
        assert_abs_diff_eq!(post.center(), Position::new(50.0, -20.0));
        assert_abs_diff_eq!(post.upper_left_corner(), Position::new(45.0, -15.0));
        assert_abs_diff_eq!(post.lower_right_corner(), Position::new(55.0, -25.0));
        assert_abs_diff_eq!(post.horizontal_size(), 10.0);
    }

    #[test]
    fn test_wall_switch_sides_keeps_own_center() {
        let mut wall = Obstacle::wall(Position::new(30.0, 40.0), 100.0, 10.0);
        wall.switch_sides().unwrap();
        assert_abs_diff_eq!(wall.horizontal_size(), 10.0);
        assert_abs_diff_eq!(wall.vertical_size(), 100.0);
        assert_abs_diff_eq!(wall.center(), Position::new(30.0, 40.0));
        assert_abs_diff_eq!(wall.upper_left_corner(), Position::new(25.0, 90.0));
        assert_abs_diff_eq!(wall.lower_right_corner(), Position::new(35.0, -10.0));
    }

    #[test]
    fn test_post_switch_sides() {
        let mut post = Obstacle::post(Position::new(0.0, 0.0), 10.0);
        assert_eq!(
            post.switch_sides(),
            Err(ObstacleError::NotAWall(ObstacleKind::Post))
        );
    }

    #[rstest]
    #[case::center(Position::new(10.0, 20.0), true)]
    #[case::corner(Position::new(15.0, 22.0), true)]
    #[case::edge(Position::new(5.0, 19.0), true)]
    #[case::right_of(Position::new(15.1, 20.0), false)]
    #[case::below(Position::new(10.0, 17.9), false)]
    #[case::far_away(Position::new(-100.0, 300.0), false)]
    fn test_obstacle_check_overlap(#[case] position: Position, #[case] expected: bool) {
        let wall = Obstacle::wall(Position::new(10.0, 20.0), 10.0, 4.0);
        assert_eq!(wall.check_overlap(position), expected);
    }

    #[test]
    fn test_obstacle_edges() {
        let post = Obstacle::post(Position::new(0.2, 0.3), 0.2);

        for (edge, expected) in std::iter::zip(
            post.edges(),
            [
                LineSegment::new(Position::new(0.1, 0.2), Position::new(0.1, 0.4)),
                LineSegment::new(Position::new(0.1, 0.4), Position::new(0.3, 0.4)),
                LineSegment::new(Position::new(0.3, 0.4), Position::new(0.3, 0.2)),
                LineSegment::new(Position::new(0.3, 0.2), Position::new(0.1, 0.2)),
            ],
        ) {
            assert_abs_diff_eq!(edge, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_line_segment_midpoint() {
        let segment = LineSegment::new(Position::new(0.0, 0.0), Position::new(4.0, -2.0));
        assert_abs_diff_eq!(segment.midpoint(), Position::new(2.0, -1.0));
        assert_abs_diff_eq!(segment.direction(), Position::new(4.0, -2.0));
    }

    impl AbsDiffEq for LineSegment {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            Position::abs_diff_eq(&self.p1, &other.p1, epsilon)
                && Position::abs_diff_eq(&self.p2, &other.p2, epsilon)
        }
    }
}
